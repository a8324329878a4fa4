//! The only place `git` argument tokens are assembled.

use crate::model::AnalysisWindow;
use crate::window::window_bounds;
use chrono::SecondsFormat;
use chrono_tz::Tz;

pub const PROGRAM: &str = "git";

/// Separator between committer timestamp and subject in commit-log output.
pub const COMMIT_FIELD_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryQuery {
    /// `<committer ISO-8601>|<subject>` per commit
    CommitLog,
    /// `<insertions>\t<deletions>\t<path>` per changed file
    NumStat,
    /// one changed path per line
    NameOnly,
    /// one line per commit; what third parties pipe into `wc -l`
    Oneline,
}

impl HistoryQuery {
    pub fn label(&self) -> &'static str {
        match self {
            HistoryQuery::CommitLog => "commit log",
            HistoryQuery::NumStat => "line changes",
            HistoryQuery::NameOnly => "changed files",
            HistoryQuery::Oneline => "commit count",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    timezone: Tz,
    include_merges: bool,
}

impl QueryBuilder {
    pub fn new(timezone: Tz, include_merges: bool) -> Self {
        Self {
            timezone,
            include_merges,
        }
    }

    /// `git log` tokens restricted to the window's local calendar days.
    /// Queries that print paths turn off `core.quotePath` so non-ASCII names
    /// come through verbatim instead of as quoted octal escapes.
    pub fn log_args(&self, query: HistoryQuery, window: &AnalysisWindow) -> Vec<String> {
        let (since, until) = window_bounds(window, &self.timezone);
        let mut args = Vec::new();
        if matches!(query, HistoryQuery::NumStat | HistoryQuery::NameOnly) {
            args.push("-c".to_string());
            args.push("core.quotePath=false".to_string());
        }
        args.extend([
            "log".to_string(),
            format!("--since={}", since.to_rfc3339_opts(SecondsFormat::Secs, false)),
            format!("--until={}", until.to_rfc3339_opts(SecondsFormat::Secs, false)),
        ]);
        if !self.include_merges {
            args.push("--no-merges".to_string());
        }
        match query {
            HistoryQuery::CommitLog => {
                args.push(format!("--pretty=format:%cI{COMMIT_FIELD_SEPARATOR}%s"));
            }
            HistoryQuery::NumStat => {
                args.push("--numstat".to_string());
                args.push("--pretty=format:".to_string());
            }
            HistoryQuery::NameOnly => {
                args.push("--name-only".to_string());
                args.push("--pretty=format:".to_string());
            }
            HistoryQuery::Oneline => args.push("--oneline".to_string()),
        }
        args
    }

    /// Shell command that reproduces the commit count for `window`.
    pub fn verification_command(&self, window: &AnalysisWindow) -> String {
        format!(
            "{} | wc -l",
            render_command(&self.log_args(HistoryQuery::Oneline, window))
        )
    }
}

pub fn remote_url_args() -> Vec<String> {
    ["config", "--get", "remote.origin.url"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// `git` plus `args`, quoted so it can be pasted into a POSIX shell.
pub fn render_command(args: &[String]) -> String {
    std::iter::once(PROGRAM.to_string())
        .chain(args.iter().map(|a| shell_quote(a)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(token: &str) -> String {
    let plain = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_=:./+@,".contains(c));
    if plain {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}
