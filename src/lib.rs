//! logvault - per-application log indexing, filterable search and
//! rule-based alerting on top of Tantivy.
//!
//! The crate covers two independent paths:
//! - **Search**: ingested [`model::LogRecord`]s are indexed per
//!   application name under a configured root; a declarative
//!   [`search::SearchConfiguration`] is compiled into a native boolean
//!   query and executed by [`search::LogSearcher`], which returns typed
//!   [`model::LogView`]s in ascending `log_time` order. The searcher also
//!   implements the adaptive time-window algorithm answering "the N
//!   entries immediately before timestamp T" without density statistics.
//! - **Alerting**: an ordered list of [`alert::AlertExpression`]s is
//!   compiled once into a pure predicate and applied per incoming record
//!   by [`alert::AlertService`].
//!
//! ```no_run
//! use logvault::index::IndexStore;
//! use logvault::search::{LogSearcher, SearchConfiguration, WantAll};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = IndexStore::new("/var/lib/logvault");
//! let handle = store.resolve(&["my-app"])?.ok_or("no such index")?;
//!
//! let config = SearchConfiguration::new(100).search_all(WantAll::Log);
//! let logs = LogSearcher::new().search(&handle, &config)?;
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod config;
pub mod error;
pub mod index;
pub mod model;
pub mod search;
pub mod stats;

pub use alert::{AlertExpression, AlertService};
pub use config::EngineConfig;
pub use error::{AppError, Result};
pub use index::{AppIndex, IndexStore, MultiHandle};
pub use model::{ExceptionData, LogLevel, LogRecord, LogType, LogView};
pub use search::{LogSearcher, MonitorQuery, SearchConfiguration, SearchMethod, WantAll};
pub use stats::StatisticsService;
