use std::fmt;
use std::str::FromStr;

use http::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::client::Client;
use crate::api::target::TargetSet;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::helpers::set::{IntSet, StringSet};

const SEND_PATH: &str = "cgi-bin/message/send";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgType {
    Text,
    Image,
    Voice,
    Video,
    File,
    News,
    #[serde(rename = "textcard")]
    TextCard,
    Markdown,
    #[serde(rename = "miniprogram_notice")]
    MiniProgramNotice,
}

impl MsgType {
    pub const ALL: [MsgType; 9] = [
        MsgType::Text,
        MsgType::Image,
        MsgType::Voice,
        MsgType::Video,
        MsgType::File,
        MsgType::News,
        MsgType::TextCard,
        MsgType::Markdown,
        MsgType::MiniProgramNotice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MsgType::Text => "text",
            MsgType::Image => "image",
            MsgType::Voice => "voice",
            MsgType::Video => "video",
            MsgType::File => "file",
            MsgType::News => "news",
            MsgType::TextCard => "textcard",
            MsgType::Markdown => "markdown",
            MsgType::MiniProgramNotice => "miniprogram_notice",
        }
    }
}

impl FromStr for MsgType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MsgType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownMessageType(s.to_owned()))
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub content: String,
}

impl Text {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub media_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub media_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub media_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub media_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub articles: Vec<NewsArticle>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "picurl")]
    pub pic_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCard {
    pub url: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "btntxt", default, skip_serializing_if = "String::is_empty")]
    pub button_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markdown {
    pub content: String,
}

impl Markdown {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniProgramNotice {
    #[serde(rename = "appid")]
    pub app_id: String,
    pub page: String,
    pub title: String,
    pub description: String,
    pub emphasis_first_item: bool,
    pub content_items: Vec<KeyValuePair>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub key: String,
    pub value: String,
}

/// Message payload. Serialized as a single field named after its type,
/// e.g. `"text": {"content": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Message {
    #[serde(rename = "text")]
    Text(Text),
    #[serde(rename = "image")]
    Image(Image),
    #[serde(rename = "voice")]
    Voice(Voice),
    #[serde(rename = "video")]
    Video(Video),
    #[serde(rename = "file")]
    File(File),
    #[serde(rename = "news")]
    News(News),
    #[serde(rename = "textcard")]
    TextCard(TextCard),
    #[serde(rename = "markdown")]
    Markdown(Markdown),
    #[serde(rename = "miniprogram_notice")]
    MiniProgramNotice(MiniProgramNotice),
}

impl Message {
    pub fn kind(&self) -> MsgType {
        match self {
            Message::Text(_) => MsgType::Text,
            Message::Image(_) => MsgType::Image,
            Message::Voice(_) => MsgType::Voice,
            Message::Video(_) => MsgType::Video,
            Message::File(_) => MsgType::File,
            Message::News(_) => MsgType::News,
            Message::TextCard(_) => MsgType::TextCard,
            Message::Markdown(_) => MsgType::Markdown,
            Message::MiniProgramNotice(_) => MsgType::MiniProgramNotice,
        }
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Message {
                fn from(payload: $variant) -> Self {
                    Message::$variant(payload)
                }
            }
        )+
    };
}

impl_from_payload!(Text, Image, Voice, Video, File, News, TextCard, Markdown, MiniProgramNotice);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Confidential message: recipients cannot forward it.
    pub safe: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendResult {
    /// Recipients the server refused. Empty when everyone was reached.
    pub invalid_targets: TargetSet,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    #[serde(rename = "touser", skip_serializing_if = "StringSet::is_empty")]
    to_user: StringSet,
    #[serde(rename = "toparty", skip_serializing_if = "IntSet::is_empty")]
    to_party: IntSet,
    #[serde(rename = "totag", skip_serializing_if = "IntSet::is_empty")]
    to_tag: IntSet,
    #[serde(rename = "agentid")]
    agent_id: i64,
    #[serde(rename = "msgtype")]
    msg_type: MsgType,
    #[serde(flatten)]
    message: &'a Message,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    safe: bool,
}

impl<'a> SendRequest<'a> {
    fn new(agent_id: i64, targets: &TargetSet, message: &'a Message, opts: SendOptions) -> Result<Self> {
        if agent_id == 0 {
            return Err(Error::Validation("invalid agent id".to_owned()));
        }
        targets.validate()?;

        Ok(Self {
            to_user: targets.users().clone(),
            to_party: targets.parties().clone(),
            to_tag: targets.tags().clone(),
            agent_id,
            msg_type: message.kind(),
            message,
            safe: opts.safe,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default, rename = "invaliduser")]
    invalid_user: StringSet,
    #[serde(default, rename = "invalidparty")]
    invalid_party: IntSet,
    #[serde(default, rename = "invalidtag")]
    invalid_tag: IntSet,
}

/// `cgi-bin/message/send`.
#[derive(Debug, Clone, Copy)]
pub struct MessageService<'a> {
    client: &'a Client,
}

impl<'a> MessageService<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Sends `message` as application `agent_id` to `targets`.
    ///
    /// The agent id and the target set are checked before any request is
    /// built; neither a token nor the network is touched when they are invalid.
    pub async fn send(
        &self,
        ctx: &Context,
        agent_id: i64,
        targets: &TargetSet,
        message: &Message,
        opts: SendOptions,
    ) -> Result<SendResult> {
        let body = SendRequest::new(agent_id, targets, message, opts)?;
        let request = self.client.new_request(Method::POST, SEND_PATH, Some(&body))?;
        let response: SendResponse = self.client.execute(ctx, request).await?;

        let invalid_targets =
            TargetSet::from_parts(response.invalid_user, response.invalid_party, response.invalid_tag);
        if invalid_targets.is_empty() {
            info!(agent_id, msg_type = %message.kind(), "message sent");
        } else {
            warn!(
                agent_id,
                msg_type = %message.kind(),
                invalid_users = %invalid_targets.users(),
                invalid_parties = %invalid_targets.parties(),
                invalid_tags = %invalid_targets.tags(),
                "message sent, some targets were rejected"
            );
        }
        Ok(SendResult { invalid_targets })
    }
}
