//! CLI command handlers, one file per subcommand.

mod completions;
mod fetch;
mod resolve;
mod scan;

pub use completions::{run_completions, run_man};
pub use fetch::{run_fetch, FetchArgs};
pub use resolve::run_resolve;
pub use scan::run_scan;
