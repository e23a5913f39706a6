use std::io::Write;

use anyhow::Result;
use dotenv::dotenv;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use wallet_chat::client::{ChatSession, SubmitOutcome};
use wallet_chat::config;

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let endpoint = config::proxy_url();
    println!("AI Wallet Manager ({})", endpoint);
    println!("Ask me anything about your wallet, transactions, or Web3 operations.");
    println!("Ctrl-C cancels a reply in progress; at the prompt, Ctrl-C or /quit exits.\n");

    let mut session = ChatSession::new(endpoint);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    // Installing the handler replaces the default SIGINT behaviour for the whole run
    let canceller = session.canceller();
    let (quit_tx, mut quit_rx) = mpsc::unbounded_channel::<()>();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !canceller.cancel() && quit_tx.send(()).is_err() {
                break;
            }
        }
    });

    prompt()?;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = quit_rx.recv() => {
                println!();
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if line.is_empty() {
            prompt()?;
            continue;
        }

        let outcome = session
            .submit_with(line, |text| {
                print!("{}", text);
                let _ = std::io::stdout().flush();
            })
            .await;

        match outcome {
            SubmitOutcome::Completed => println!(),
            SubmitOutcome::Aborted => println!("\n(cancelled)"),
            SubmitOutcome::Failed(_) => {
                if let Some(reply) = session.messages().last() {
                    println!("\n{}", reply.content);
                }
            }
            SubmitOutcome::Ignored => {}
        }

        if let Some(id) = session.session_id() {
            debug!("Upstream session: {}", id);
        }

        prompt()?;
    }

    Ok(())
}
