//! Terminal input mapped onto shell events.
//!
//! Enter retries, `q` closes the window, Ctrl-C quits. End of input is
//! ignored so the launcher also works with stdin redirected.

use std::io::BufRead;

use kirlian_shell::ShellEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Event for one line typed in the launcher terminal.
pub fn parse_line(line: &str) -> Option<ShellEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "r" | "retry" => Some(ShellEvent::Retry),
        "q" | "quit" | "close" => Some(ShellEvent::WindowClosed),
        _ => None,
    }
}

/// Feed Ctrl-C and stdin lines into `events`.
///
/// Stdin is read on a plain thread, never in the runtime's blocking pool,
/// so a pending read cannot hold up runtime shutdown.
pub fn spawn_terminal_events(events: mpsc::Sender<ShellEvent>) {
    let signals = events.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Cannot listen for Ctrl-C");
                return;
            }
            debug!("Ctrl-C received");
            if signals.send(ShellEvent::QuitRequested).await.is_err() {
                return;
            }
        }
    });

    let spawned = std::thread::Builder::new()
        .name("kirlian-stdin".to_string())
        .spawn(move || forward_lines(std::io::stdin().lock(), &events));
    if let Err(e) = spawned {
        warn!(error = %e, "Cannot read terminal input; Enter and q are disabled");
    }
}

fn forward_lines<R: BufRead>(input: R, events: &mpsc::Sender<ShellEvent>) {
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        match parse_line(&line) {
            Some(event) => {
                if events.blocking_send(event).is_err() {
                    return;
                }
            }
            None => debug!(input = %line.trim(), "Ignoring terminal input"),
        }
    }
    debug!("Terminal input closed");
}
