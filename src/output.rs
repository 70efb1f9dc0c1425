//! Terminal rendering for voice sessions and backend records.

use crate::backend::protocol::ChatExchange;
use crate::conversation::{Message, Role};
use crate::turn::sink::SessionSink;
use crate::turn::state::Phase;
use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Clear the current terminal line (replaces the interim transcript)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

fn paint(color: &str, text: &str, colored: bool) -> String {
    if colored {
        format!("{color}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// One chat line, prefixed with the speaker.
pub fn format_message(message: &Message, assistant: &str, colored: bool) -> String {
    match message.role() {
        Role::User => format!("{} {}", paint(GREEN, "you ›", colored), message.content()),
        Role::Assistant => format!(
            "{} {}",
            paint(CYAN, &format!("{assistant} ›"), colored),
            message.content()
        ),
    }
}

pub fn format_phase(phase: Phase, colored: bool) -> String {
    let label = match phase {
        Phase::Inactive => "⏸  inactive  (:start to talk, :q to quit)",
        Phase::Listening => "🎤 listening…",
        Phase::Processing => "💭 thinking…",
        Phase::Speaking => "🔊 speaking…",
    };
    paint(DIM, label, colored)
}

pub fn format_exchange(exchange: &ChatExchange, assistant: &str, colored: bool) -> String {
    let mut out = String::new();
    if !exchange.timestamp.is_empty() {
        out.push_str(&paint(DIM, &exchange.timestamp, colored));
        out.push('\n');
    }
    out.push_str(&format_message(
        &Message::user(exchange.user_message.as_str()),
        assistant,
        colored,
    ));
    if let Some(path) = &exchange.file_path {
        out.push_str(&paint(DIM, &format!(" [{path}]"), colored));
    }
    out.push('\n');
    out.push_str(&format_message(
        &Message::assistant(exchange.ai_response.as_str()),
        assistant,
        colored,
    ));
    out
}

/// Prints the conversation as it happens.
///
/// Messages go to stdout; phase, interim text and notices go to stderr so
/// piping the output yields a clean transcript.
pub struct TerminalSink {
    assistant: String,
    colored: bool,
    quiet: bool,
    interim_shown: bool,
}

impl TerminalSink {
    pub fn new(assistant: impl Into<String>, colored: bool, quiet: bool) -> Self {
        Self {
            assistant: assistant.into(),
            colored,
            quiet,
            interim_shown: false,
        }
    }

    fn clear_interim(&mut self) {
        if self.interim_shown {
            clear_line();
            self.interim_shown = false;
        }
    }
}

impl SessionSink for TerminalSink {
    fn message(&mut self, message: &Message) -> crate::error::Result<()> {
        self.clear_interim();
        let mut stdout = io::stdout().lock();
        writeln!(
            stdout,
            "{}",
            format_message(message, &self.assistant, self.colored)
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn interim(&mut self, text: &str) {
        if self.quiet {
            return;
        }
        clear_line();
        eprint!("{}", paint(DIM, text, self.colored));
        self.interim_shown = true;
    }

    fn notice(&mut self, text: &str) {
        self.clear_interim();
        eprintln!("{}", paint(YELLOW, text, self.colored));
    }

    fn phase(&mut self, phase: Phase) {
        if self.quiet {
            return;
        }
        self.clear_interim();
        eprintln!("{}", format_phase(phase, self.colored));
    }

    fn finish(&mut self) -> Option<String> {
        self.clear_interim();
        if !self.quiet {
            eprintln!("{}", paint(BOLD, "bye!", self.colored));
        }
        None
    }

    fn name(&self) -> &'static str {
        "terminal"
    }
}
