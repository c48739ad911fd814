use crate::error::{Error, Result};
use crate::helpers::set::{IntSet, StringSet};

/// Recipients of a message: users by id, parties (departments) and tags by
/// numeric id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    users: StringSet,
    parties: IntSet,
    tags: IntSet,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(users: StringSet, parties: IntSet, tags: IntSet) -> Self {
        Self { users, parties, tags }
    }

    pub fn add_user(&mut self, user: impl Into<String>) -> &mut Self {
        self.users.push(user);
        self
    }

    pub fn add_party(&mut self, party: i64) -> &mut Self {
        self.parties.push(party);
        self
    }

    pub fn add_tag(&mut self, tag: i64) -> &mut Self {
        self.tags.push(tag);
        self
    }

    pub fn users(&self) -> &StringSet {
        &self.users
    }

    pub fn parties(&self) -> &IntSet {
        &self.parties
    }

    pub fn tags(&self) -> &IntSet {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.parties.is_empty() && self.tags.is_empty()
    }

    /// A send needs at least one recipient.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Validation("empty target set".to_owned()));
        }
        Ok(())
    }
}
