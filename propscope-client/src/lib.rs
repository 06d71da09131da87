//! PropScope Client
//!
//! REST access to the listing API plus the [`Pager`] that drives
//! infinite-scroll listing views: pages accumulate per filter, a filter
//! change resets them, and transient failures are retried with backoff.

pub mod config;
pub mod error;
pub mod pager;
pub mod rest;
pub mod retry;

pub use config::{ClientConfig, ClientConfigError};
pub use error::ClientError;
pub use pager::{FetchOutcome, Pager};
pub use rest::{PageFetcher, PageQuery, RestClient};
pub use retry::RetryPolicy;
