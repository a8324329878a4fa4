pub mod query;
pub mod runner;

pub use query::{remote_url_args, render_command, HistoryQuery, QueryBuilder};
pub use runner::{CancelFlag, CommandRunner, GitRunner, LineStream};
