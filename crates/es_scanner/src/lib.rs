pub mod budget;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod feeds;
pub mod filters;
pub mod logging;
pub mod manager;
pub mod signals;
pub mod temporal;
pub mod trust;

pub use budget::{Clock, Deadline, SystemClock};
pub use cli::{handle_command, ScanArgs, ScannerCommands};
pub use config::{Heuristics, ScannerConfig};
pub use feeds::RssTransport;
pub use manager::ScanManager;

pub mod prelude {
    pub use super::manager::ScanManager;
    pub use super::config::ScannerConfig;
    pub use es_core::{ArticleCandidate, Error, Result, ScanRequest, ScanResult};
}
