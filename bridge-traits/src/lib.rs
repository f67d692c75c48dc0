//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the feed carousel core and the
//! platform that embeds it. Each trait represents a capability the core needs
//! but cannot provide portably.
//!
//! ## Traits
//!
//! ### Media
//! - [`DecoderFactory`](decoder::DecoderFactory) - Creates decoders and reports host support
//! - [`VideoDecoder`](decoder::VideoDecoder) - Opaque per-slot decoder (load, play, pause, quality)
//! - [`PreviewRenderer`](render::PreviewRenderer) - Paints a preview while a stream loads
//!
//! ### Input
//! - [`GestureSource`](input::GestureSource) - Keyboard, wheel, touch and button input plus viewport size
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! use core_runtime::error::Error;
//!
//! let decoder_factory = builder.decoder_factory
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "DecoderFactory".to_string(),
//!         message: "No decoder implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it and keep messages actionable.
//!
//! ## Thread Safety
//!
//! On native targets every bridge must be `Send + Sync` so it can live inside
//! the carousel event-loop task. On `wasm32` the bounds are relaxed, see
//! [`platform`].

pub mod decoder;
pub mod error;
pub mod input;
pub mod logging;
pub mod platform;
pub mod render;

pub use error::BridgeError;

// Re-export commonly used types
pub use decoder::{
    DecoderEvent, DecoderEventKind, DecoderFactory, DecoderListener, DecoderState, QualityTier,
    SubscriptionId, SurfaceId, VideoDecoder,
};
pub use input::{GestureSource, InputSink, KeyCode, NavButton, RawInput, TouchPhase, Viewport};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use render::PreviewRenderer;
