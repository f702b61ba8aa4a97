//! Parsing of REPL input lines.

/// Slash commands offered for completion, in help order.
pub const COMMANDS: &[&str] = &[
    "/videos", "/toggle", "/reset", "/refresh", "/clear", "/help", "/quit",
];

/// A video named on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoRef {
    /// A video id as stored in the transcript source.
    Id(String),
    /// A 1-based row number from the last `/videos` listing.
    Position(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Videos,
    Toggle(VideoRef),
    Reset,
    Refresh,
    Clear,
    Help,
    Quit,
    /// Anything that is not a command is a question about the selection.
    Ask(String),
    /// A command with a bad argument; carries the usage line.
    Invalid(&'static str),
    Unknown(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed == "quit" || trimmed == "exit" {
            return Self::Quit;
        }
        if !trimmed.starts_with('/') {
            return Self::Ask(trimmed.to_string());
        }

        let (command, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (trimmed, ""),
        };

        match command {
            "/videos" | "/list" => Self::Videos,
            "/toggle" | "/t" => match parse_video_ref(argument) {
                Some(video) => Self::Toggle(video),
                None => Self::Invalid("Usage: /toggle <video-id | #row>"),
            },
            "/reset" => Self::Reset,
            "/refresh" => Self::Refresh,
            "/clear" => Self::Clear,
            "/help" | "/?" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

fn parse_video_ref(argument: &str) -> Option<VideoRef> {
    if argument.is_empty() || argument.contains(char::is_whitespace) {
        return None;
    }
    match argument.strip_prefix('#') {
        Some(row) => match row.parse::<usize>() {
            Ok(position) if position > 0 => Some(VideoRef::Position(position)),
            _ => None,
        },
        None => Some(VideoRef::Id(argument.to_string())),
    }
}
