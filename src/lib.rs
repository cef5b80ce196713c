//! # driver_osvr - OSVR tracking exposed as an HMD driver provider
//!
//! Builds as a driver plugin for VR runtimes that load providers through
//! `HmdDriverFactory`. Provides:
//! - The `IHmdDriverProvider_001` factory export and provider vtable
//! - An OSVR ClientKit session with a pose callback on `/display`
//! - Head-mounted display enumeration and lookup
//!
//! ## Quick Start
//! ```no_run
//! use driver_osvr::Provider;
//! use std::time::Duration;
//!
//! let provider = Provider::from_env();
//! provider.init("/tmp/config", "/tmp/driver").unwrap();
//!
//! let poses = provider.poses();
//! let sample = poses.recv_timeout(Duration::from_secs(1)).unwrap();
//! println!("pos: {:?}", sample.translation);
//! provider.cleanup();
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod tracking;
pub mod clientkit;
pub mod pose;
pub mod hmd;
pub mod provider;
pub mod logging;
pub mod ffi;

pub use error::DriverError;
pub use types::*;
pub use config::DriverConfig;
pub use hmd::HmdDevice;
pub use provider::Provider;

/// Result type alias for driver operations.
pub type Result<T> = std::result::Result<T, DriverError>;
