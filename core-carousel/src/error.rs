//! # Carousel Error Types

use crate::ring::StreamId;
use crate::slot::SlotId;
use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while building or driving the carousel.
#[derive(Error, Debug)]
pub enum CarouselError {
    // ========================================================================
    // Ring Errors
    // ========================================================================
    /// The carousel was given no streams. Fatal: nothing can be shown.
    #[error("Stream ring is empty")]
    EmptyRing,

    /// The same stream id appears twice in the feed.
    #[error("Duplicate stream id in feed: {0}")]
    DuplicateStream(StreamId),

    /// A jump referenced a stream that is not in the ring.
    #[error("Stream not found: {0}")]
    NotFound(StreamId),

    /// The feed manifest could not be parsed.
    #[error("Invalid feed manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    // ========================================================================
    // Slot Errors
    // ========================================================================
    /// A decoder could not bind to its output surface.
    #[error("{slot} failed to attach: {message}")]
    Attach { slot: SlotId, message: String },

    /// A stream failed to load into a slot.
    #[error("{slot} failed to load {stream}: {message}")]
    Load {
        slot: SlotId,
        stream: StreamId,
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The host cannot run the decoder at all.
    #[error("Video decoder is not supported in this environment")]
    UnsupportedEnvironment,

    #[error("Invalid carousel configuration: {0}")]
    InvalidConfig(String),

    #[error("Carousel is not initialized")]
    NotInitialized,

    /// A second transition was started before the first one issued its loads.
    #[error("A transition is already in flight")]
    TransitionInFlight,

    #[error("Carousel has been released")]
    Released,

    // ========================================================================
    // Wrapped Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl CarouselError {
    /// Returns `true` if the carousel cannot start or continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CarouselError::EmptyRing
                | CarouselError::DuplicateStream(_)
                | CarouselError::Manifest(_)
                | CarouselError::UnsupportedEnvironment
                | CarouselError::InvalidConfig(_)
                | CarouselError::Runtime(_)
        )
    }

    /// Returns `true` if the error is confined to a single slot.
    pub fn is_slot_local(&self) -> bool {
        matches!(self, CarouselError::Attach { .. } | CarouselError::Load { .. })
    }
}

/// Result type for carousel operations.
pub type Result<T> = std::result::Result<T, CarouselError>;
