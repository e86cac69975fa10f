//! Recap video composition.
//!
//! Builds a render timeline from collected highlight assets and drives a
//! render service until the composed video URL is available.

pub mod client;
pub mod config;
pub mod error;
pub mod timeline;

pub use client::{RenderStatus, ShotstackClient, VideoComposer};
pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use timeline::{build_timeline, build_timeline_with_rng, Effect, RenderRequest};
