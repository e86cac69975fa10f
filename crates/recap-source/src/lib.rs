//! Subject content source.
//!
//! Authenticates against the content gateway, resumes stored sessions and
//! fetches a subject's profile flags and current story items.

pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::{ContentSource, HttpContentSource};
pub use config::SourceConfig;
pub use error::{SourceError, SourceResult};
pub use session::Session;
