//! WeChat Work API surface: the client and the message service.

pub mod client;
pub mod message;
pub mod target;

pub use client::Client;
pub use message::{Message, MessageService, MsgType, SendOptions, SendResult};
pub use target::TargetSet;
