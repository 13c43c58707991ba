//! Engine module for the collection core: querying, paging, metadata, merging, progress.

pub mod arg_parser;
pub mod channel;
pub mod fetcher;
pub mod handlers;
pub mod merger;
pub mod metadata;
pub mod progress;
pub mod query_space;
pub mod state;
pub mod tools;
pub mod transport;

// Re-export commonly used items
pub use arg_parser::Cli;
pub use channel::{ProgressReceiver, ProgressReporter, ProgressSender, progress_channel};
pub use fetcher::{FetchOptions, PagedFetcher};
pub use handlers::handle_run;
pub use merger::{CategoryJoin, JoinKey, KeyPerQuery, MergeStrategy, OuterJoin, merge, merge_by, outer_join};
pub use metadata::MetadataResolver;
pub use progress::{BarObserver, LogObserver, ProgressObserver, dispatch};
pub use query_space::QuerySpace;
pub use state::RunState;
pub use transport::{Clock, HttpTransport, RawResponse, SystemClock, Transport};
