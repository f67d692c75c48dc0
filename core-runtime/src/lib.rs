//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the feed carousel core:
//! - Logging and tracing infrastructure
//! - Host configuration (bridges injected by the platform)
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the carousel depends on.
//! It establishes the logging conventions and the event broadcasting
//! mechanism used to surface carousel, slot and navigation activity to the
//! presentation layer.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
