//! Drives one before/after analysis: windows first, then every query for the
//! before window, then every query for the after window.

use crate::aggregate::{FileChangeCounts, TopLimits, WindowAccumulator};
use crate::classify::{Classifier, Tier};
use crate::error::{Result, UpliftError};
use crate::git::{remote_url_args, CommandRunner, HistoryQuery, QueryBuilder};
use crate::model::{AnalysisOutput, AnalysisWindow, LineChangeTotals, WindowSummary, SCHEMA_VERSION};
use crate::parse::{self, NumStatEntry};
use crate::progress::StatusIndicator;
use crate::report;
use crate::window;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

pub const LOCAL_REPOSITORY: &str = "Local repository";

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub adoption_date: NaiveDate,
    pub tool: String,
    pub days_before: i64,
    pub days_after: i64,
    pub timezone: String,
    pub limits: TopLimits,
    pub include_merges: bool,
    /// Tier for commit messages that match no keyword.
    pub uncategorized: Tier,
}

impl AnalysisOptions {
    pub fn new(adoption_date: NaiveDate) -> Self {
        Self {
            adoption_date,
            tool: "AI Coding Tool".to_string(),
            days_before: 30,
            days_after: 30,
            timezone: "UTC".to_string(),
            limits: TopLimits::default(),
            include_merges: true,
            uncategorized: Tier::Medium,
        }
    }
}

/// Validates the inputs, then queries history window by window.
///
/// Input errors surface before any process is spawned. A query whose `git`
/// invocation fails contributes nothing (with a warning) instead of failing the
/// run; a missing binary or an interrupt aborts it.
pub fn analyze<R: CommandRunner>(
    runner: &R,
    options: &AnalysisOptions,
    status: &StatusIndicator,
) -> Result<AnalysisOutput> {
    let resolved = window::compute(
        options.adoption_date,
        options.days_before,
        options.days_after,
        &options.timezone,
    )?;
    let windows = resolved.windows;

    let mut analyzer = Analyzer {
        runner,
        status,
        classifier: Classifier::new(options.uncategorized),
        queries: QueryBuilder::new(resolved.timezone, options.include_merges),
        timezone: resolved.timezone,
        limits: options.limits,
        warnings: Vec::new(),
    };

    let before = analyzer.summarize("before", &windows.before)?;
    let after = analyzer.summarize("after", &windows.after)?;
    let comparison = report::compare(&before, &after);
    let repository = analyzer.repository_label()?;

    Ok(AnalysisOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository,
        tool: options.tool.clone(),
        adoption_date: options.adoption_date,
        timezone: resolved.timezone.name().to_string(),
        verification: vec![
            analyzer.queries.verification_command(&windows.before),
            analyzer.queries.verification_command(&windows.after),
        ],
        before,
        after,
        comparison,
        warnings: analyzer.warnings,
    })
}

struct Analyzer<'a, R: CommandRunner> {
    runner: &'a R,
    status: &'a StatusIndicator,
    classifier: Classifier,
    queries: QueryBuilder,
    timezone: Tz,
    limits: TopLimits,
    warnings: Vec<String>,
}

impl<'a, R: CommandRunner> Analyzer<'a, R> {
    fn summarize(&mut self, label: &str, window: &AnalysisWindow) -> Result<WindowSummary> {
        info!(
            window = label,
            start = %window.start,
            end = %window.end,
            days = window.day_count,
            "summarizing window"
        );

        let classifier = self.classifier.clone();
        let tz = self.timezone;
        let mut acc = self.run_query(
            label,
            HistoryQuery::CommitLog,
            window,
            WindowAccumulator::new(*window),
            |lines| {
                let mut acc = WindowAccumulator::new(*window);
                for commit in parse::commit_records(lines, tz) {
                    acc.add_commit(&commit, &classifier);
                }
                acc
            },
        )?;

        let line_changes = self.run_query(
            label,
            HistoryQuery::NumStat,
            window,
            LineChangeTotals::default(),
            |lines| {
                let mut totals = LineChangeTotals::default();
                for entry in parse::numstat_entries(lines) {
                    match entry {
                        NumStatEntry::Text {
                            insertions,
                            deletions,
                            ..
                        } => totals.add_text(insertions, deletions),
                        NumStatEntry::Binary { .. } => totals.add_binary(),
                    }
                }
                totals
            },
        )?;

        let file_changes = self.run_query(
            label,
            HistoryQuery::NameOnly,
            window,
            FileChangeCounts::new(),
            |lines| {
                let mut counts = FileChangeCounts::new();
                for path in parse::changed_paths(lines) {
                    counts.increment(path);
                }
                counts
            },
        )?;

        debug!(
            window = label,
            commits = acc.commit_count(),
            files = file_changes.len(),
            "window reduced"
        );
        acc.set_line_changes(line_changes);
        acc.set_file_changes(file_changes);
        Ok(acc.finish(self.limits))
    }

    /// Streams one query through `reduce`. If `git` exits non-zero the partial
    /// reduction is thrown away and `empty` stands in for it.
    fn run_query<T>(
        &mut self,
        label: &str,
        query: HistoryQuery,
        window: &AnalysisWindow,
        empty: T,
        reduce: impl FnOnce(&mut dyn Iterator<Item = String>) -> T,
    ) -> Result<T> {
        let args = self.queries.log_args(query, window);
        let status = self.status;
        status.stage(format!("{label}: reading {}", query.label()));

        let outcome = self.runner.run_streaming(&args).and_then(|stream| {
            let mut failure = None;
            let mut lines = stream.map_while(|item| match item {
                Ok(line) => {
                    status.line_read();
                    Some(line)
                }
                Err(err) => {
                    failure = Some(err);
                    None
                }
            });
            let reduced = reduce(&mut lines);
            drop(lines);
            match failure {
                Some(err) => Err(err),
                None => Ok(reduced),
            }
        });

        match outcome {
            Ok(value) => {
                debug!(
                    window = label,
                    query = query.label(),
                    lines = status.lines_in_stage(),
                    "query finished"
                );
                Ok(value)
            }
            Err(err) if err.is_recoverable() => {
                warn!(window = label, query = query.label(), error = %err, "query failed, counting it as empty");
                self.warnings
                    .push(format!("{label} window {}: {err}", query.label()));
                Ok(empty)
            }
            Err(err) => Err(err),
        }
    }

    /// Only an interrupt is fatal here; any other failure means "no usable remote".
    fn repository_label(&self) -> Result<String> {
        match self.runner.run_captured(&remote_url_args()) {
            Ok(url) => Ok(describe_remote(url.trim())),
            Err(err @ UpliftError::Cancelled(_)) => Err(err),
            Err(err) => {
                debug!(error = %err, "no origin remote");
                Ok(LOCAL_REPOSITORY.to_string())
            }
        }
    }
}

/// GitHub remotes are shown by repository name; anything else stays anonymous.
pub fn describe_remote(url: &str) -> String {
    if !url.contains("github.com") {
        return LOCAL_REPOSITORY.to_string();
    }
    url.trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .map(|name| name.trim_end_matches(".git"))
        .filter(|name| !name.is_empty())
        .unwrap_or(LOCAL_REPOSITORY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::LineStream;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const BEFORE: &str = "2025-05-22";
    const AFTER: &str = "2025-06-21";

    /// Canned `git` output keyed by window start and query shape.
    #[derive(Default)]
    struct FixtureRunner {
        streams: HashMap<(&'static str, HistoryQuery), Vec<String>>,
        failures: HashMap<(&'static str, HistoryQuery), fn(String) -> UpliftError>,
        remote: Option<String>,
        interrupt_remote: bool,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FixtureRunner {
        fn lines(mut self, since: &'static str, query: HistoryQuery, lines: Vec<String>) -> Self {
            self.streams.insert((since, query), lines);
            self
        }

        fn fail(mut self, since: &'static str, query: HistoryQuery, err: fn(String) -> UpliftError) -> Self {
            self.failures.insert((since, query), err);
            self
        }

        fn key(args: &[String]) -> (String, HistoryQuery) {
            let since = args
                .iter()
                .find_map(|a| a.strip_prefix("--since="))
                .map(|s| s[..10].to_string())
                .unwrap_or_default();
            let query = if args.iter().any(|a| a == "--numstat") {
                HistoryQuery::NumStat
            } else if args.iter().any(|a| a == "--name-only") {
                HistoryQuery::NameOnly
            } else if args.iter().any(|a| a == "--oneline") {
                HistoryQuery::Oneline
            } else {
                HistoryQuery::CommitLog
            };
            (since, query)
        }
    }

    impl CommandRunner for FixtureRunner {
        fn run_captured(&self, args: &[String]) -> Result<String> {
            self.calls.borrow_mut().push(args.to_vec());
            if self.interrupt_remote {
                return Err(UpliftError::Cancelled(args.join(" ")));
            }
            self.remote.clone().ok_or_else(|| UpliftError::ToolExecution {
                command: args.join(" "),
                stderr: String::new(),
            })
        }

        fn run_streaming(&self, args: &[String]) -> Result<LineStream<'_>> {
            self.calls.borrow_mut().push(args.to_vec());
            let (since, query) = Self::key(args);
            let lines = self
                .streams
                .iter()
                .find(|((s, q), _)| *s == since && *q == query)
                .map(|(_, lines)| lines.clone())
                .unwrap_or_default();
            let tail = self
                .failures
                .iter()
                .find(|((s, q), _)| *s == since && *q == query)
                .map(|(_, make)| make(args.join(" ")));
            Ok(Box::new(lines.into_iter().map(Ok).chain(tail.map(Err))))
        }
    }

    fn execution_failure(command: String) -> UpliftError {
        UpliftError::ToolExecution {
            command,
            stderr: "fatal: shallow clone".to_string(),
        }
    }

    fn commits(date: &str, messages: &[&str]) -> Vec<String> {
        messages
            .iter()
            .map(|m| format!("{date}T12:00:00+00:00|{m}"))
            .collect()
    }

    fn repeated(date: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{date}T09:{:02}:00+00:00|commit {i}", i % 60)).collect()
    }

    fn options() -> AnalysisOptions {
        AnalysisOptions::new(NaiveDate::from_ymd_opt(2025, 6, 21).unwrap())
    }

    #[test]
    fn ten_before_twenty_five_after() {
        let runner = FixtureRunner::default()
            .lines(BEFORE, HistoryQuery::CommitLog, repeated("2025-06-01", 10))
            .lines(AFTER, HistoryQuery::CommitLog, repeated("2025-07-01", 25));

        let out = analyze(&runner, &options(), &StatusIndicator::hidden()).unwrap();

        assert_eq!(out.before.commit_count, 10);
        assert_eq!(out.after.commit_count, 25);
        assert!((out.before.daily_rate - 1.0 / 3.0).abs() < 1e-12);
        assert!((out.after.daily_rate - 25.0 / 30.0).abs() < 1e-12);
        assert!((out.comparison.percentage_change.unwrap() - 150.0).abs() < 1e-9);
        assert!((out.comparison.multiplier.unwrap() - 2.5).abs() < 1e-9);
        assert_eq!(out.repository, LOCAL_REPOSITORY);
        assert!(out.warnings.is_empty());
        assert_eq!(out.verification.len(), 2);
        assert!(out.verification[0].contains("--since=2025-05-22T00:00:00+00:00"));
        assert!(out.verification[1].ends_with("--oneline | wc -l"));
    }

    #[test]
    fn window_summary_combines_all_three_queries() {
        let runner = FixtureRunner::default()
            .lines(
                AFTER,
                HistoryQuery::CommitLog,
                commits("2025-06-25", &["refactor: fix typo", "docs: readme", "wip"])
                    .into_iter()
                    .chain(["garbage line".to_string()])
                    .collect(),
            )
            .lines(
                AFTER,
                HistoryQuery::NumStat,
                ["12\t4\tfoo.go", "", "-\t-\tbinary.png", "3\t0\tbar.go"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            )
            .lines(
                AFTER,
                HistoryQuery::NameOnly,
                ["a", "", "b", "a", "b", "c", "a", "b"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            );

        let mut opts = options();
        opts.limits = TopLimits { files: 2, days: 5 };
        let out = analyze(&runner, &opts, &StatusIndicator::hidden()).unwrap();
        let after = out.after;

        assert_eq!(after.commit_count, 3);
        assert_eq!(after.complexity.high, 1);
        assert_eq!(after.complexity.low, 1);
        assert_eq!(after.complexity.medium, 1);
        assert_eq!(after.lines.insertions, 15);
        assert_eq!(after.lines.deletions, 4);
        assert_eq!(after.lines.binary_files_skipped, 1);
        let files: Vec<_> = after.top_files.iter().map(|f| (f.path.as_str(), f.changes)).collect();
        assert_eq!(files, vec![("a", 3), ("b", 3)]);
        assert_eq!(after.top_days.len(), 1);
        assert_eq!(after.top_days[0].commits, 3);

        assert_eq!(out.before.commit_count, 0);
        assert_eq!(out.comparison.multiplier, None);
    }

    #[test]
    fn failed_query_degrades_to_empty_and_warns() {
        let runner = FixtureRunner::default()
            .lines(BEFORE, HistoryQuery::CommitLog, repeated("2025-06-01", 4))
            .lines(BEFORE, HistoryQuery::NumStat, vec!["100\t100\tpartial.rs".to_string()])
            .fail(BEFORE, HistoryQuery::NumStat, execution_failure)
            .lines(AFTER, HistoryQuery::CommitLog, repeated("2025-07-01", 8));

        let out = analyze(&runner, &options(), &StatusIndicator::hidden()).unwrap();

        assert_eq!(out.before.lines, LineChangeTotals::default());
        assert_eq!(out.before.commit_count, 4);
        assert_eq!(out.after.commit_count, 8);
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].starts_with("before window line changes"));
    }

    #[test]
    fn cancellation_discards_everything() {
        let runner = FixtureRunner::default()
            .lines(BEFORE, HistoryQuery::CommitLog, repeated("2025-06-01", 3))
            .fail(BEFORE, HistoryQuery::CommitLog, UpliftError::Cancelled);

        let err = analyze(&runner, &options(), &StatusIndicator::hidden()).unwrap_err();
        assert!(matches!(err, UpliftError::Cancelled(_)));
        // nothing after the interrupted query ran
        assert_eq!(runner.calls.borrow().len(), 1);
    }

    #[test]
    fn invalid_input_spawns_nothing() {
        let runner = FixtureRunner::default();

        let mut opts = options();
        opts.days_before = 0;
        assert!(matches!(
            analyze(&runner, &opts, &StatusIndicator::hidden()),
            Err(UpliftError::InvalidWindowLength { .. })
        ));

        let mut opts = options();
        opts.timezone = "Mars/Olympus_Mons".to_string();
        assert!(matches!(
            analyze(&runner, &opts, &StatusIndicator::hidden()),
            Err(UpliftError::InvalidTimezone { .. })
        ));

        let opts = AnalysisOptions::new(Utc::now().date_naive() + chrono::Days::new(3));
        assert!(matches!(
            analyze(&runner, &opts, &StatusIndicator::hidden()),
            Err(UpliftError::FutureDate { .. })
        ));

        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn windows_are_queried_in_order() {
        let runner = FixtureRunner::default();
        analyze(&runner, &options(), &StatusIndicator::hidden()).unwrap();

        let order: Vec<_> = runner
            .calls
            .borrow()
            .iter()
            .map(|args| FixtureRunner::key(args))
            .collect();
        let expected: Vec<_> = [BEFORE, AFTER]
            .iter()
            .flat_map(|since| {
                [HistoryQuery::CommitLog, HistoryQuery::NumStat, HistoryQuery::NameOnly]
                    .map(|q| (since.to_string(), q))
            })
            .chain([(String::new(), HistoryQuery::CommitLog)])
            .collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn github_remote_becomes_repository_name() {
        let runner = FixtureRunner {
            remote: Some("git@github.com:seeyebe/git-uplift.git\n".to_string()),
            ..Default::default()
        };
        let out = analyze(&runner, &options(), &StatusIndicator::hidden()).unwrap();
        assert_eq!(out.repository, "git-uplift");

        assert_eq!(describe_remote("https://github.com/org/tool.git"), "tool");
        assert_eq!(describe_remote("https://gitlab.com/org/tool.git"), LOCAL_REPOSITORY);
    }

    #[test]
    fn interrupt_during_remote_lookup_is_not_mistaken_for_no_remote() {
        let runner = FixtureRunner {
            interrupt_remote: true,
            ..Default::default()
        };
        let err = analyze(&runner, &options(), &StatusIndicator::hidden()).unwrap_err();
        assert!(matches!(err, UpliftError::Cancelled(_)));
    }
}
