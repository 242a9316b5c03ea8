//! Web Utils Smoke Harness
//!
//! This crate builds a WASM module that exercises the import surface a web
//! host provides: console logging, assertions, the clock, HTTPS requests,
//! browser and origin info, and a file-system shim. Every exported check
//! calls one capability and reports SUCCESS or FAILURE.
//!
//! The checks run against any [`WebHost`]. The wasm32 build binds it to the
//! `env` imports; native builds and tests use [`mock::MockHost`].

pub mod buffer;
pub mod checks;
pub mod config;
pub mod error;
pub mod ffi;
pub mod host;
pub mod mock;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use checks::{Check, CheckOutcome, CheckStatus, Harness, ScenarioReport};
pub use config::HarnessConfig;
pub use error::{CheckError, CheckResult, ConfigError};
pub use host::{FileHandle, FileMode, HttpsRequest, HttpsResponse, WebHost, Whence};
