pub mod error;
pub mod feed;
pub mod storage;
pub mod types;

pub use error::Error;
pub use feed::FeedTransport;
pub use storage::{ArticleStorage, CatalogStorage};
pub use types::*;

pub type Result<T> = std::result::Result<T, Error>;
