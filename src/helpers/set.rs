//! Id lists that travel as a single `|`-joined string, e.g. `"id0|id1|id2"`.

use std::fmt;
use std::slice::Iter;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const SET_SEP: &str = "|";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringSet(Vec<String>);

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: impl Into<String>) {
        self.0.push(id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for StringSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for StringSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(SET_SEP))
    }
}

impl Serialize for StringSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.join(SET_SEP))
    }
}

impl<'de> Deserialize<'de> for StringSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(Self::default());
        }
        Ok(raw.split(SET_SEP).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntSet(Vec<i64>);

impl IntSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: i64) {
        self.0.push(id);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> Iter<'_, i64> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

impl FromIterator<i64> for IntSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for IntSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.0.iter().map(i64::to_string).collect::<Vec<_>>().join(SET_SEP);
        f.write_str(&joined)
    }
}

impl Serialize for IntSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IntSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Ok(Self::default());
        }
        raw.split(SET_SEP)
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|e| de::Error::custom(format!("wxwork: unmarshal int {v:?} error: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn strings(ids: &[&str]) -> StringSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn string_set_encodes_pipe_joined() {
        assert_eq!(serde_json::to_string(&StringSet::new()).unwrap(), r#""""#);
        assert_eq!(serde_json::to_string(&strings(&["id0"])).unwrap(), r#""id0""#);
        assert_eq!(serde_json::to_string(&strings(&["id0", "id1", "id2"])).unwrap(), r#""id0|id1|id2""#);
    }

    #[test]
    fn string_set_decodes() {
        let decoded: StringSet = serde_json::from_str(r#""""#).unwrap();
        assert!(decoded.is_empty());

        let decoded: StringSet = serde_json::from_str(r#""id0|id1|id2""#).unwrap();
        assert_eq!(decoded, strings(&["id0", "id1", "id2"]));

        let decoded: StringSet = serde_json::from_str(r#""id0|id1||id2""#).unwrap();
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded, strings(&["id0", "id1", "", "id2"]));
    }

    #[test]
    fn string_set_rejects_non_string_json() {
        for raw in ["id0", r#""id0|id1|id2"#, "12"] {
            assert!(serde_json::from_str::<StringSet>(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn int_set_encodes_pipe_joined() {
        assert_eq!(serde_json::to_string(&IntSet::new()).unwrap(), r#""""#);
        assert_eq!(serde_json::to_string(&IntSet::from_iter([0])).unwrap(), r#""0""#);
        assert_eq!(serde_json::to_string(&IntSet::from_iter([0, 1, 2])).unwrap(), r#""0|1|2""#);
    }

    #[test]
    fn int_set_decodes() {
        let decoded: IntSet = serde_json::from_str(r#""""#).unwrap();
        assert!(decoded.is_empty());

        let decoded: IntSet = serde_json::from_str(r#""0|1|2""#).unwrap();
        assert_eq!(decoded.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn int_set_rejects_malformed_elements() {
        for raw in ["id0", r#""id0|id1|id2"#, r#""|"#, r#""id""#, r#""1|x|3""#, r#""1||3""#] {
            assert!(serde_json::from_str::<IntSet>(raw).is_err(), "{raw}");
        }
    }
}
