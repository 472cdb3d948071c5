//! Shared tracing setup for the echowatch binaries.

mod subscriber;

pub use subscriber::{init, init_with_level};
