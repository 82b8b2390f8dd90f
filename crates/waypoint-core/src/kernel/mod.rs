//! # Waypoint Core Kernel
//!
//! Crate-wide plumbing shared by every subsystem:
//!
//! - **Core Constants**: default file locations and the application name,
//!   in the `constants` submodule.
//! - **Error Handling**: the unified [`Error`](error::Error) type that wraps
//!   each subsystem's error enum, and the matching `Result` alias.
pub mod constants;
pub mod error;

pub use error::{Error, Result};
