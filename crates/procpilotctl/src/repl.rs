//! REPL - conversational interface
//!
//! Reads one line at a time, hands it to the [`Session`] and prints the
//! reply. EOF or `/exit` ends the loop.

use crate::display::Display;
use crate::session::{Reply, Session};
use anyhow::Result;
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use tracing::debug;

pub async fn run(session: &mut Session, display: Display) -> Result<()> {
    session.refresh_known_processes().await;
    print_welcome(session, display);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", display.prompt());
        io::stdout().flush()?;

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("Error reading input: {}", e);
                continue;
            }
            None => break,
        };

        let reply = if needs_spinner(session, &line) {
            let spinner = display.spinner("thinking...");
            let reply = session.handle(&line).await;
            spinner.finish_and_clear();
            reply
        } else {
            session.handle(&line).await
        };

        if matches!(reply, Reply::Exit) {
            break;
        }
        if let Some(text) = display.render(&reply) {
            println!("{}\n", text);
        }
    }

    let conversation = session.conversation();
    debug!(
        "session {} ended after {} turns",
        conversation.session_id(),
        conversation.len()
    );
    println!("Bye.");
    Ok(())
}

/// Free text may wait on the model; commands and selections do not
fn needs_spinner(session: &Session, line: &str) -> bool {
    let line = line.trim();
    session.has_ai()
        && !line.is_empty()
        && !line.starts_with('/')
        && line.parse::<usize>().is_err()
}

fn print_welcome(session: &Session, display: Display) {
    let title = format!("procpilotctl v{}", crate::VERSION);
    if display.use_color() {
        println!("{}", title.bold());
    } else {
        println!("{}", title);
    }
    let mode = if session.has_ai() {
        "AI assistance on"
    } else {
        "heuristic mode (no AI backend configured)"
    };
    println!("{}. Type /help for commands, /exit to leave.\n", mode);
}
