use std::{io::Write, path::Path, sync::Arc};

use anyhow::Context;
use chat_client::{get_chat_config, ChatMessage, ChatRole, ChatSession, JsonFileTranscriptStore};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const HELP: &str = "Commands: /attach <file.pdf>, /detach, /reset, /quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_chat_config().context("Failed to load chat client configuration")?;
    let store = Arc::new(JsonFileTranscriptStore::new(&config.transcript_path));
    let mut session = ChatSession::open(&config, store).await;

    println!("Medical triage assistant. {HELP}");
    for message in session.messages() {
        print_message(message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => println!("{HELP}"),
            ("/reset", _) => {
                session.reset().await?;
                println!("Conversation cleared.");
            }
            ("/detach", _) => {
                session.clear_attachment();
                println!("Attachment removed.");
            }
            ("/attach", path) if !path.is_empty() => {
                match session.attach_file(Path::new(path)).await {
                    Ok(attachment) => println!(
                        "Attached {} ({} pages). It will be sent with your next message.",
                        attachment.file_name, attachment.page_count
                    ),
                    Err(err) => println!("{err}"),
                }
            }
            ("/attach", _) => println!("Usage: /attach <file.pdf>"),
            _ if line.is_empty() && session.pending_attachment().is_none() => {}
            _ => send(&mut session, line).await?,
        }
        prompt()?;
    }

    Ok(())
}

async fn send(session: &mut ChatSession, input: &str) -> anyhow::Result<()> {
    let mut printed = 0usize;
    print!("assistant> ");
    let result = session
        .submit(input, |message| {
            if let Some(new_text) = message.content.get(printed..) {
                print!("{new_text}");
                std::io::stdout().flush().ok();
            }
            printed = message.content.len();
        })
        .await;
    println!();

    if let Err(err) = result {
        println!("Something went wrong: {err}");
    }
    Ok(())
}

fn print_message(message: &ChatMessage) {
    let speaker = match message.role {
        ChatRole::User => "you",
        ChatRole::Assistant => "assistant",
    };
    println!("{speaker}> {}", message.display());
}

fn prompt() -> anyhow::Result<()> {
    print!("you> ");
    std::io::stdout().flush()?;
    Ok(())
}
