//! Before/after commit-activity analysis over a git history.
//!
//! [`analysis::analyze`] computes the two windows, streams `git log` output for
//! each through the parsers, and reduces it into [`model::WindowSummary`] values
//! plus a [`model::ProductivityComparison`].

pub mod aggregate;
pub mod analysis;
pub mod cache;
pub mod classify;
pub mod cli;
pub mod error;
pub mod git;
pub mod model;
pub mod output;
pub mod parse;
pub mod progress;
pub mod report;
pub mod window;
