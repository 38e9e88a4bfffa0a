pub mod config;
mod errors;

pub use config::FetcherConfig;
pub use errors::{FetchError, FetchResult};
