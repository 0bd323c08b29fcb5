pub mod config;
pub mod error;
pub mod logging;

pub mod batch;
pub mod extract;
pub mod http;
pub mod probe;
pub mod queue;
pub mod resolver;
pub mod scan;
pub mod url_model;

pub use error::{Error, Result};
pub use queue::{DownloadQueue, Task, TaskId, TaskStatus};
pub use resolver::{ResolvedLink, Resolver};
