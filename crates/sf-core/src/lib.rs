//! # sf-core
//!
//! Shared foundation types for specfit: the [`Error`] enum and [`Result`]
//! alias used by every shape entry point.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub use error::{Error, Result};
