use thiserror::Error;

pub type Result<T> = std::result::Result<T, UpliftError>;

#[derive(Error, Debug)]
pub enum UpliftError {
    #[error("Not a git repository: {0} (run from the root of a git working tree)")]
    NotARepository(String),
    #[error("Failed to launch `{tool}`: {source}")]
    ToolInvocation {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed: {stderr}")]
    ToolExecution { command: String, stderr: String },
    #[error("Unknown timezone '{input}'{}", suggestion_suffix(.suggestions))]
    InvalidTimezone {
        input: String,
        suggestions: Vec<String>,
    },
    #[error("Adoption date {date} is in the future (today is {today} in {timezone})")]
    FutureDate {
        date: String,
        today: String,
        timezone: String,
    },
    #[error("Invalid window length for {which} window: {days} (must be at least 1 day)")]
    InvalidWindowLength { which: &'static str, days: i64 },
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Interrupted while reading `{0}`")]
    Cancelled(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpliftError {
    /// Errors that only cost one query its contribution; everything else aborts.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, UpliftError::ToolExecution { .. })
    }
}

fn suggestion_suffix(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!("; did you mean {}?", suggestions.join(", "))
    }
}
