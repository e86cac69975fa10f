//! Request handlers.

pub mod health;
pub mod queue;

pub use health::*;
pub use queue::*;
