use crate::aggregate::TopLimits;
use crate::analysis::{analyze, AnalysisOptions};
use crate::cache::CommandCache;
use crate::classify::Tier;
use crate::git::{CancelFlag, GitRunner};
use crate::output::{output_json, output_report};
use crate::progress::StatusIndicator;
use crate::window::parse_adoption_date;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "git-uplift")]
#[command(about = "Compare commit activity before and after adopting a coding tool")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Date you started using the tool (YYYY-MM-DD)")]
    pub start_date: String,

    #[arg(long, default_value = "AI Coding Tool", help = "Name of the tool, used in the report")]
    pub tool: String,

    #[arg(long, default_value_t = 30, allow_negative_numbers = true, help = "Days to analyze on each side of the start date")]
    pub days: i64,

    #[arg(long, allow_negative_numbers = true, help = "Days before the start date (overrides --days)")]
    pub days_before: Option<i64>,

    #[arg(long, allow_negative_numbers = true, help = "Days from the start date on (overrides --days)")]
    pub days_after: Option<i64>,

    #[arg(long, env = "GIT_UPLIFT_TZ", default_value = "UTC", help = "IANA timezone that defines calendar days")]
    pub timezone: String,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..), help = "How many of the most changed files to list")]
    pub top_files: u64,

    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..), help = "How many of the busiest days to list")]
    pub top_days: u64,

    #[arg(long, value_enum, default_value_t = Tier::Medium, help = "Tier for commit messages that match no keyword")]
    pub uncategorized: Tier,

    #[arg(long, help = "Leave merge commits out of every count")]
    pub no_merges: bool,

    #[arg(long, help = "Path to git repository (defaults to the current directory)")]
    pub repo: Option<PathBuf>,

    #[arg(short, long, help = "Show detailed metrics and debug logging")]
    pub verbose: bool,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,

    #[arg(short, long, help = "Do not show the progress spinner")]
    pub quiet: bool,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn options(&self, adoption_date: NaiveDate) -> AnalysisOptions {
        AnalysisOptions {
            adoption_date,
            tool: self.tool.clone(),
            days_before: self.days_before.unwrap_or(self.days),
            days_after: self.days_after.unwrap_or(self.days),
            timezone: self.timezone.clone(),
            limits: TopLimits {
                files: usize::try_from(self.top_files).unwrap_or(usize::MAX),
                days: usize::try_from(self.top_days).unwrap_or(usize::MAX),
            },
            include_merges: !self.no_merges,
            uncategorized: self.uncategorized,
        }
    }

    pub fn execute(self) -> Result<()> {
        let adoption = parse_adoption_date(&self.start_date).context("Invalid --start-date")?;
        let options = self.options(adoption);

        let runner = GitRunner::open(self.repo.as_ref(), CommandCache::new())
            .context("Failed to open git repository")?
            .with_cancel_flag(interrupt_flag());
        tracing::debug!(repo = %runner.path().display(), "opened repository");

        let status = if self.quiet || self.json || !console::Term::stderr().is_term() {
            StatusIndicator::hidden()
        } else {
            StatusIndicator::spinner()
        };
        let analysis = analyze(&runner, &options, &status);
        status.finish();
        let output = analysis.context("Failed to analyze repository history")?;

        if self.json {
            output_json(&output)?;
        } else {
            output_report(&output, self.verbose)?;
        }
        Ok(())
    }
}

/// Ctrl-C raises the returned flag instead of terminating outright, so the
/// running `git` is killed and partial results are discarded.
fn interrupt_flag() -> CancelFlag {
    let flag = CancelFlag::new();
    let handler = flag.clone();
    if let Err(err) = ctrlc::set_handler(move || handler.cancel()) {
        tracing::warn!(error = %err, "could not install interrupt handler");
    }
    flag
}
