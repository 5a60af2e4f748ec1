//! Service layer: the update pipeline and the pieces it drives.

pub mod convert;
pub mod fetch;
pub mod history;
pub mod scheduler;
pub mod update;

pub use convert::{ConvertError, Converter, OfficeConverter};
pub use fetch::{build_client, FetchError, Fetcher, HttpFetcher};
pub use history::{HistoryEntry, HistoryObserver, LoggingObserver};
pub use scheduler::{SchedulerError, UpdateScheduler};
pub use update::{PassReport, PipelineError, UpdatePipeline};
