use std::path::Path;

use anyhow::{Context as _, Result};
use clap::Parser;
use tracing::{debug, error, info};
use wxwork::api::message::{Markdown, Message, MsgType, SendOptions, Text, TextCard};
use wxwork::api::target::TargetSet;
use wxwork::config::loader;
use wxwork::utils::constants::DEFAULT_CONFIG_PATH;
use wxwork::utils::logging::{self, LogLevel};

#[derive(Parser)]
#[command(author, version, about = "Send a WeChat Work application message", long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,

    /// Recipient user id, repeatable
    #[arg(long = "user")]
    users: Vec<String>,
    /// Recipient party (department) id, repeatable
    #[arg(long = "party")]
    parties: Vec<i64>,
    /// Recipient tag id, repeatable
    #[arg(long = "tag")]
    tags: Vec<i64>,

    /// text, markdown or textcard
    #[arg(long, default_value = "text")]
    msg_type: String,
    #[arg(long)]
    content: String,
    /// Text card title
    #[arg(long)]
    title: Option<String>,
    /// Text card link
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    safe: bool,
}

impl Args {
    fn targets(&self) -> TargetSet {
        let mut targets = TargetSet::new();
        for user in &self.users {
            targets.add_user(user.as_str());
        }
        for party in &self.parties {
            targets.add_party(*party);
        }
        for tag in &self.tags {
            targets.add_tag(*tag);
        }
        targets
    }

    fn message(&self) -> Result<Message> {
        let message: Message = match self.msg_type.parse::<MsgType>()? {
            MsgType::Text => Text::new(&self.content).into(),
            MsgType::Markdown => Markdown::new(&self.content).into(),
            MsgType::TextCard => TextCard {
                url: self.url.clone().context("--url is required for textcard messages")?,
                title: self.title.clone().context("--title is required for textcard messages")?,
                description: self.content.clone(),
                button_text: String::new(),
            }
            .into(),
            other => anyhow::bail!("message type {other} cannot be sent from the command line"),
        };
        Ok(message)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config and set up logging
    // -------------------------------

    let args = Args::parse();
    let service_config = match loader::file_to_config(Path::new(&args.config)).await {
        Ok(service_config) => service_config,
        Err(err) => {
            logging::run_fallback(args.log_level);
            error!(config = %args.config, error = format!("{err:#}"), "cannot load config");
            return Err(err);
        }
    };
    logging::run(&service_config, args.log_level);
    debug!(config = %args.config, "config loaded");

    // -------------------------------
    // 2. Build the message before touching the network
    // -------------------------------

    let targets = args.targets();
    let message = args.message()?;

    // -------------------------------
    // 3. Token source, transport and client
    // -------------------------------

    let ctx = service_config.context()?;
    let client = service_config.client(&ctx)?;
    info!(
        credentials = service_config.credentials.kind(),
        base_url = %client.base_url(),
        "client ready"
    );

    // -------------------------------
    // 4. Send
    // -------------------------------

    let result = client
        .message()
        .send(&ctx, service_config.api.agent_id, &targets, &message, SendOptions { safe: args.safe })
        .await?;

    let invalid = &result.invalid_targets;
    if invalid.is_empty() {
        println!("sent");
    } else {
        println!(
            "sent; invalid users: {:?}, invalid parties: {:?}, invalid tags: {:?}",
            invalid.users().to_string(),
            invalid.parties().to_string(),
            invalid.tags().to_string()
        );
    }
    Ok(())
}
