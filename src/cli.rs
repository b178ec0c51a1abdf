//! pace - Conversation Client
//!
//! Terminal front-end for the speed-reading chat: persisted history, reading
//! statistics, and narration of assistant replies.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pacechat::conversation::{
    ChatController, CommandNarrator, ConversationStore, HttpRelayClient, Message, NarrationState,
    Narrator, Sender,
};
use pacechat::Config;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pace")]
#[command(about = "Speed-reading chat client")]
#[command(version)]
struct Cli {
    /// Relay server URL
    #[arg(long, env = "PACECHAT_SERVER_URL")]
    server: Option<String>,

    /// Directory holding the persisted conversation
    #[arg(long, env = "PACECHAT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to the YAML config file
    #[arg(short, long, env = "PACECHAT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,

    /// Send one message and print the reply
    Send {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },

    /// Send the contents of a text file as a message
    File {
        /// Path to the file
        path: PathBuf,
    },

    /// Print the conversation
    History {
        /// Print stored markup instead of plain text
        #[arg(long)]
        raw: bool,
    },

    /// Print reading statistics
    Stats,

    /// Read an assistant message aloud
    Speak {
        /// Message index as shown by `history`
        index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,pacechat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let chat = build_controller(&cli)?;

    match cli.command {
        Commands::Chat => run_chat(&chat).await,
        Commands::Send { message } => {
            let text = message.join(" ");
            report_submit(&chat, chat.submit(&text).await).await
        }
        Commands::File { path } => {
            let index = chat.submit_file(&path).await?;
            report_submit(&chat, index).await
        }
        Commands::History { raw } => {
            let store = chat.store().lock().await;
            for (i, message) in store.messages().iter().enumerate() {
                print_message(i, message, raw);
            }
            Ok(())
        }
        Commands::Stats => {
            print_stats(&*chat.store().lock().await);
            Ok(())
        }
        Commands::Speak { index } => speak_and_wait(&chat, index).await,
    }
}

fn build_controller(cli: &Cli) -> Result<ChatController> {
    let mut client = Config::from_yaml_and_env(cli.config.as_deref())?.client;
    if let Some(server) = &cli.server {
        client.server_url = server.clone();
    }
    if let Some(dir) = &cli.data_dir {
        client.data_dir = Some(dir.clone());
    }

    let storage = Arc::new(client.file_store()?);
    let narrator = CommandNarrator::from_env().map(|n| Box::new(n) as Box<dyn Narrator>);
    let store = ConversationStore::initialize(storage, narrator, client.default_wpm);
    let relay = Arc::new(
        HttpRelayClient::new(&client.server_url).context("Failed to create relay client")?,
    );

    Ok(ChatController::new(store, relay, client.response_delay()))
}

async fn run_chat(chat: &ChatController) -> Result<()> {
    {
        let store = chat.store().lock().await;
        println!("Session #{}. Type /help for commands.", store.session_count());
        for (i, message) in store.messages().iter().enumerate() {
            print_message(i, message, false);
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        chat.store().lock().await.refresh_narration();
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => print_help(),
            ("/stats", _) => print_stats(&*chat.store().lock().await),
            ("/history", _) => {
                let store = chat.store().lock().await;
                for (i, message) in store.messages().iter().enumerate() {
                    print_message(i, message, false);
                }
            }
            ("/speak", arg) => match arg.trim().parse::<usize>() {
                Ok(index) => {
                    let state = chat.store().lock().await.toggle_speech(index);
                    report_narration(chat, state).await;
                }
                Err(_) => println!("usage: /speak <index>"),
            },
            ("/file", path) if !path.trim().is_empty() => {
                let result = match chat.submit_file(path.trim()).await {
                    Ok(index) => report_submit(chat, index).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    println!("{:#}", e);
                }
            }
            ("/file", _) => println!("usage: /file <path>"),
            _ if line.is_empty() => {}
            _ => {
                println!("…");
                let index = chat.submit(line).await;
                if let Err(e) = report_submit(chat, index).await {
                    println!("{:#}", e);
                }
            }
        }
    }

    chat.store().lock().await.stop_narration();
    Ok(())
}

async fn speak_and_wait(chat: &ChatController, index: usize) -> Result<()> {
    let state = chat.store().lock().await.toggle_speech(index);
    report_narration(chat, state).await;
    if state != NarrationState::Started {
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                chat.store().lock().await.stop_narration();
                return Ok(());
            }
            _ = tokio::time::sleep(Duration::from_millis(200)) => {
                if chat.store().lock().await.refresh_narration().is_none() {
                    return Ok(());
                }
            }
        }
    }
}

async fn report_submit(chat: &ChatController, index: Option<usize>) -> Result<()> {
    let Some(index) = index else {
        bail!("Nothing sent (empty message or a request is already in flight)");
    };
    let store = chat.store().lock().await;
    if let Some(message) = store.messages().get(index) {
        print_message(index, message, false);
    }
    Ok(())
}

async fn report_narration(chat: &ChatController, state: NarrationState) {
    match state {
        NarrationState::Started => println!("Speaking… (/speak again to stop)"),
        NarrationState::Stopped => println!("Stopped."),
        NarrationState::Ignored => println!("Only assistant messages can be read aloud."),
        NarrationState::Unavailable => {
            let store = chat.store().lock().await;
            if let Some(last) = store.messages().last() {
                println!("{}", last.plain_text().trim());
            }
        }
    }
}

fn print_message(index: usize, message: &Message, raw: bool) {
    let text = if raw || !message.is_assistant() {
        message.content.clone()
    } else {
        message.plain_text().trim().to_string()
    };
    match message.sender {
        Sender::User => println!("[{}] you: {}", index, text),
        Sender::Assistant => match message.wpm {
            Some(wpm) => println!("[{}] assistant ({:.0} wpm): {}", index, wpm, text),
            None => println!("[{}] assistant: {}", index, text),
        },
    }
}

fn print_stats(store: &ConversationStore) {
    let stats = store.statistics();
    println!("Session:       #{}", store.session_count());
    println!("Messages:      {}", store.messages().len());
    println!("Words read:    {}", stats.total_words);
    println!("Current speed: {:.0} wpm", store.current_wpm());
    println!("Average speed: {:.0} wpm", stats.average_wpm);
}

fn print_help() {
    println!("/speak <index>  read an assistant message aloud (again to stop)");
    println!("/file <path>    send the contents of a text file");
    println!("/history        show the conversation");
    println!("/stats          show reading statistics");
    println!("/quit           leave");
}
