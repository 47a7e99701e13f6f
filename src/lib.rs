pub mod api;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod scanner;
pub mod services;
pub mod sources;

pub use config::Config;
pub use error::{FetchError, ScanError};
pub use fetcher::{RetryPolicy, RetryableFetcher};
pub use scanner::Scanner;
