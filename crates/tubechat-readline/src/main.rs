mod commands;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use tubechat_core::chat::{ChatSession, Rejection, SubmitOutcome};
use tubechat_core::conversation::{ChatMessage, ConversationEvent, MessageRole};
use tubechat_core::selection::{SelectableTranscript, ToggleOutcome};
use tubechat_core::stream::{FailureReason, StreamOutcome};
use tubechat_core::{MAX_SELECTION, TranscriptSource};
use tubechat_infrastructure::{ConfigService, JsonTranscriptStore};
use tubechat_interaction::GeminiTransport;

use commands::{COMMANDS, ReplCommand, VideoRef};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|cmd| cmd.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// Prints one assistant message incrementally as its content grows.
#[derive(Default)]
struct StreamPrinter {
    target: Option<usize>,
    printed: String,
}

impl StreamPrinter {
    /// Adopts the message at `index` if it is the assistant half of a new pair.
    ///
    /// Chunks may already have been applied by the time the event is seen,
    /// so this goes by role rather than by pending state.
    fn track(&mut self, index: usize, message: &ChatMessage) {
        if message.role == MessageRole::Assistant {
            self.target = Some(index);
        }
    }

    fn render(&mut self, message: &ChatMessage) {
        match message.content.strip_prefix(self.printed.as_str()) {
            Some(rest) if !rest.is_empty() => {
                if message.errored {
                    print!("{}", rest.red());
                } else {
                    print!("{}", rest.bright_blue());
                }
            }
            Some(_) => {}
            // Replaced by a fallback text.
            None => {
                println!();
                print!("{}", message.content.red());
            }
        }
        let _ = std::io::stdout().flush();
        self.printed = message.content.clone();
    }
}

/// The main entry point for the tubechat readline REPL.
///
/// Loads the configuration, opens the transcript store and the Gemini
/// transport, then reads commands and questions until `/quit`. While a
/// response streams, Ctrl-C cancels it instead of exiting.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    // ===== Backend Initialization =====
    let config_service = ConfigService::new();
    let config = config_service
        .get_config()
        .context("Failed to load tubechat configuration")?;
    let store_path = config_service.transcript_store_path(&config)?;
    tracing::info!("[Bootstrap] Transcript store: {}", store_path.display());

    let source: Arc<dyn TranscriptSource> = Arc::new(JsonTranscriptStore::new(&store_path));
    let transport = GeminiTransport::from_config(&config.gemini);
    let has_api_key = transport.has_api_key();
    let session = ChatSession::with_settings(source, Arc::new(transport), config.chat.clone());

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== tubechat ===".bright_magenta().bold());
    println!(
        "{}",
        "Type '/videos' to list transcripts, '/toggle <id|#row>' to select, '/help' for more."
            .bright_black()
    );
    if !has_api_key {
        print_credential_banner();
    }
    if let Some(greeting) = session.messages().await.first() {
        println!("{}", greeting.content.bright_blue());
    }
    println!();

    let mut listing: Vec<SelectableTranscript> = Vec::new();

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let command = ReplCommand::parse(&line);
                if !matches!(command, ReplCommand::Empty) {
                    let _ = rl.add_history_entry(line.trim());
                }

                match command {
                    ReplCommand::Empty => continue,
                    ReplCommand::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    ReplCommand::Help => print_help(),
                    ReplCommand::Videos => {
                        listing = session.refresh().await;
                        print_listing(&listing);
                    }
                    ReplCommand::Refresh => {
                        listing = session.refresh().await;
                        println!(
                            "{}",
                            format!("Loaded {} transcript(s).", listing.len()).bright_black()
                        );
                        print_missing_selection(&session, &listing).await;
                    }
                    ReplCommand::Toggle(video) => {
                        if listing.is_empty() {
                            listing = session.refresh().await;
                        }
                        toggle(&session, &listing, video).await;
                    }
                    ReplCommand::Reset => {
                        session.reset_selection().await;
                        println!("{}", "Selection cleared.".bright_black());
                    }
                    ReplCommand::Clear => {
                        session.clear().await;
                        if let Some(greeting) = session.messages().await.first() {
                            println!("{}", greeting.content.bright_blue());
                        }
                    }
                    ReplCommand::Ask(question) => {
                        println!("{}", format!("> {}", question).green());
                        ask(&session, &question).await;
                        if session.credential_alert() {
                            print_credential_banner();
                        }
                    }
                    ReplCommand::Invalid(usage) => println!("{}", usage.yellow()),
                    ReplCommand::Unknown(command) => {
                        println!("{}", format!("Unknown command: {}", command).bright_black());
                    }
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

/// Submits `question` and prints the response as it streams in.
async fn ask(session: &ChatSession, question: &str) {
    let mut events = session.subscribe();
    let mut printer = StreamPrinter::default();
    let submit = session.submit(question);
    tokio::pin!(submit);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            event = events.recv() => match event {
                Ok(ConversationEvent::Appended { index }) => {
                    if let Some(message) = session.message(index).await {
                        printer.track(index, &message);
                        if printer.target == Some(index) {
                            printer.render(&message);
                        }
                    }
                }
                Ok(ConversationEvent::Updated { index }) if printer.target == Some(index) => {
                    if let Some(message) = session.message(index).await {
                        printer.render(&message);
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "[Repl] Event receiver lagged");
                }
                Err(RecvError::Closed) => break (&mut submit).await,
            },
            _ = tokio::signal::ctrl_c(), if session.is_busy() => {
                if session.cancel() {
                    println!();
                    println!("{}", "Cancelling...".yellow());
                }
            }
        }
    };

    match outcome {
        SubmitOutcome::Rejected(rejection) => {
            println!("{}", rejection_text(rejection).yellow());
        }
        SubmitOutcome::Finished(finished) => {
            // Catch up on anything not yet printed, including fallbacks.
            if let Some(message) = session.message(finished.index()).await {
                printer.render(&message);
            }
            println!();
            if let StreamOutcome::Failed {
                reason: FailureReason::Cancelled,
                ..
            } = finished
            {
                println!("{}", "Response cancelled.".bright_black());
            }
            println!();
        }
    }
}

async fn toggle(session: &ChatSession, listing: &[SelectableTranscript], video: VideoRef) {
    let video_id = match video {
        VideoRef::Id(id) => id,
        VideoRef::Position(position) => match listing.get(position - 1) {
            Some(row) => row.record.video_id.clone(),
            None => {
                println!(
                    "{}",
                    format!("No row #{} in the last listing.", position).yellow()
                );
                return;
            }
        },
    };

    match session.toggle_selection(&video_id).await {
        ToggleOutcome::Added => println!("{}", format!("Selected {}", video_id).green()),
        ToggleOutcome::Removed => {
            println!("{}", format!("Deselected {}", video_id).bright_black())
        }
        ToggleOutcome::AtCapacity => println!(
            "{}",
            format!(
                "Already {} videos selected; deselect one first.",
                MAX_SELECTION
            )
            .yellow()
        ),
    }
    let selection = session.selection().await;
    println!(
        "{}",
        format!(
            "Selection ({}/{}): {}",
            selection.len(),
            selection.max(),
            selection.selected_ids().join(", ")
        )
        .bright_black()
    );
}

fn print_listing(listing: &[SelectableTranscript]) {
    if listing.is_empty() {
        println!("{}", "No transcripts captured yet.".bright_black());
        return;
    }
    for (row, item) in listing.iter().enumerate() {
        let mark = match (item.selected, item.selectable) {
            (true, _) => "[x]",
            (false, true) => "[ ]",
            (false, false) => "[-]",
        };
        let line = format!(
            "{:>3} {} {} ({}, {})",
            format!("#{}", row + 1),
            mark,
            item.title,
            item.record.video_id,
            item.record.fetched_at.format("%Y-%m-%d")
        );
        if item.selected {
            println!("{}", line.green());
        } else if item.selectable {
            println!("{}", line);
        } else {
            println!("{}", line.bright_black());
        }
    }
}

async fn print_missing_selection(session: &ChatSession, listing: &[SelectableTranscript]) {
    let selection = session.selection().await;
    let missing: Vec<&str> = selection
        .selected_ids()
        .iter()
        .filter(|id| !listing.iter().any(|row| &row.record.video_id == *id))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        println!(
            "{}",
            format!("Selected but no longer available: {}", missing.join(", ")).yellow()
        );
    }
}

fn rejection_text(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::EmptyQuestion => "Please type a question.",
        Rejection::NoSelection => "Select at least one video first (/videos, /toggle).",
        Rejection::MissingTranscripts => {
            "None of the selected videos has a transcript. Try /refresh."
        }
        Rejection::Busy => "Still answering the previous question.",
    }
}

fn print_credential_banner() {
    println!(
        "{}",
        "Gemini API key is missing or invalid. Set GEMINI_API_KEY or [gemini] api_key in config.toml, then restart."
            .on_red()
            .white()
            .bold()
    );
}

fn print_help() {
    println!("{}", "Commands:".bright_magenta());
    println!("  /videos            list captured transcripts");
    println!("  /toggle <id|#row>  select or deselect a video (max {MAX_SELECTION})");
    println!("  /reset             clear the selection");
    println!("  /refresh           re-read the transcript store");
    println!("  /clear             clear the conversation");
    println!("  /help              show this help");
    println!("  /quit              exit");
    println!("{}", "Anything else is sent as a question about the selected videos.".bright_black());
}
