//! Terminal front-end for the novas chat client.

mod transcript;

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use novas_chat::{
    ChatApi, ChatClient, ChatOptions, ClientConfig, HttpChatApi, HttpChatTransport,
    MemorySettingsStore, PendingChat, PendingChatStore,
};
use novas_parts::observability::init_observability;

use crate::transcript::{load_transcript, render_message, render_transcript, replay_capture};

#[derive(Parser)]
#[command(name = "novas", version, about = "Render and stream novas chat messages", long_about = None)]
struct Cli {
    /// Base URL of the chat API.
    #[arg(long, env = "NOVAS_API_BASE_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a JSON transcript (array of messages or `{"messages": [...]}`).
    Render { transcript: PathBuf },
    /// Rebuild and render the assistant message of a captured SSE response.
    Replay { capture: PathBuf },
    /// List the chats known to the backend.
    Chats,
    /// Send a message and print the reply as it streams.
    Chat {
        /// Message to send.
        message: String,
        /// Continue an existing chat instead of creating one.
        #[arg(long)]
        chat_id: Option<String>,
        #[arg(long, default_value = novas_chat::api::DEFAULT_FOCUS_MODE)]
        focus_mode: String,
        #[arg(long, default_value = novas_chat::api::DEFAULT_OPTIMIZATION_MODE)]
        optimization_mode: String,
        /// Fail the send after this many seconds without a chunk.
        #[arg(long)]
        idle_timeout_secs: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_observability();
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config = config.base_url(base_url);
    }
    let renderer = novas_plugins::default_renderer();

    match cli.command {
        Command::Render { transcript } => {
            let messages = load_transcript(&transcript)?;
            println!("{}", render_transcript(&renderer, &messages));
        }
        Command::Replay { capture } => {
            let message = replay_capture(&capture)?;
            println!("{}", render_message(&renderer, &message));
        }
        Command::Chats => {
            let api = HttpChatApi::new(config)?;
            for chat in api.list_chats().await? {
                println!("{}\t{}", chat.id, chat.title);
            }
        }
        Command::Chat {
            message,
            chat_id,
            focus_mode,
            optimization_mode,
            idle_timeout_secs,
        } => {
            if let Some(secs) = idle_timeout_secs {
                config = config.stream_idle_timeout(std::time::Duration::from_secs(secs));
            }
            let pending = PendingChatStore::new();
            let (chat_id, follow_up) = match chat_id {
                Some(chat_id) => (chat_id, Some(message)),
                None => {
                    let staged = PendingChat {
                        message: Some(message),
                        options: ChatOptions {
                            focus_mode,
                            optimization_mode,
                        },
                        files: Vec::new(),
                    };
                    (pending.stage(staged), None)
                }
            };
            let mut client = ChatClient::new(
                chat_id,
                &config,
                Arc::new(HttpChatApi::new(config.clone())?),
                Arc::new(HttpChatTransport::new(&config)?),
                Arc::new(MemorySettingsStore::new()),
                pending,
            );

            let result = run_chat(&mut client, follow_up).await;
            for notification in client.session_mut().take_notifications() {
                eprintln!("{notification}");
            }
            result?;

            if let Some(reply) = client.session().messages().last() {
                println!("\n{}", render_message(&renderer, reply));
            }
            eprintln!("{} [{}]", client.session().title(), client.session().chat_id());
        }
    }
    Ok(())
}

async fn run_chat(client: &mut ChatClient, follow_up: Option<String>) -> anyhow::Result<()> {
    client.initialize().await.context("failed to open chat")?;
    if let Some(message) = follow_up {
        let mut printed = 0;
        client
            .send_observed(&message, |reply| {
                let text = reply.text_content();
                if let Some(delta) = text.get(printed..) {
                    print!("{delta}");
                    let _ = std::io::stdout().flush();
                    printed = text.len();
                }
            })
            .await
            .context("failed to send message")?;
    }
    Ok(())
}
