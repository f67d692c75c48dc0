//! Video decoder bridge traits and supporting types.
//!
//! The carousel never decodes media itself. Each host ships a
//! [`DecoderFactory`] producing opaque [`VideoDecoder`] instances (an HLS
//! player bound to a `<video>` element on the web, a native player view on
//! mobile). The core only drives them: load a URL, play, pause, toggle mute
//! and steer quality selection.
//!
//! Decoders report progress asynchronously through listeners registered with
//! [`VideoDecoder::subscribe`]. Every [`DecoderEvent`] carries the source URL
//! the decoder was working on when it fired, which lets the core discard
//! notifications that belong to a load it has since superseded.

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of the output surface (media element) a decoder renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u8);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Handle returned by event subscriptions, used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Generate a new subscription identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Construct an identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One rendition of a stream as advertised by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTier {
    /// Display name (e.g. `"720p60"`).
    pub name: String,
    /// Peak bitrate in bits per second.
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
}

impl QualityTier {
    pub fn new(name: impl Into<String>, bitrate: u64, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            bitrate,
            width,
            height,
        }
    }
}

/// Coarse decoder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoderState {
    /// Nothing loaded, or a load is still resolving.
    Idle,
    /// Source resolved; qualities are known and playback can start.
    Ready,
    Buffering,
    Playing,
    Ended,
}

impl DecoderState {
    /// Returns `true` once the decoder has moved past the initial load.
    pub fn is_ready(&self) -> bool {
        !matches!(self, DecoderState::Idle)
    }
}

/// Kind of notification emitted by a decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderEventKind {
    Ready,
    Playing,
    Buffering,
    Ended,
    /// Network, manifest or decode failure for the current source.
    Error { message: String },
}

impl DecoderEventKind {
    /// The decoder state this notification implies, if any.
    pub fn implied_state(&self) -> Option<DecoderState> {
        match self {
            DecoderEventKind::Ready => Some(DecoderState::Ready),
            DecoderEventKind::Playing => Some(DecoderState::Playing),
            DecoderEventKind::Buffering => Some(DecoderState::Buffering),
            DecoderEventKind::Ended => Some(DecoderState::Ended),
            DecoderEventKind::Error { .. } => None,
        }
    }
}

/// Notification delivered to decoder listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderEvent {
    pub kind: DecoderEventKind,
    /// URL of the load this event belongs to, when the decoder knows it.
    pub source: Option<String>,
}

impl DecoderEvent {
    pub fn new(kind: DecoderEventKind, source: Option<String>) -> Self {
        Self { kind, source }
    }
}

/// Callback invoked by decoders for every emitted event.
#[cfg(not(target_arch = "wasm32"))]
pub type DecoderListener = Arc<dyn Fn(DecoderEvent) + Send + Sync>;

#[cfg(target_arch = "wasm32")]
pub type DecoderListener = Arc<dyn Fn(DecoderEvent)>;

/// Opaque per-slot decoder capability.
///
/// Control calls are synchronous and must not block; only binding to a
/// surface and issuing a load are asynchronous. `load` resolves once the
/// request has been issued, not when the media is ready: readiness arrives
/// later as a [`DecoderEventKind::Ready`] event. A second `load` issued
/// before the first resolves supersedes it.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait VideoDecoder: PlatformSendSync {
    /// Bind the decoder to its output surface.
    async fn attach(&self, surface: SurfaceId) -> Result<()>;

    /// Start loading `url`, replacing whatever was loaded before.
    async fn load(&self, url: &str) -> Result<()>;

    fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn is_paused(&self) -> bool;

    fn set_muted(&self, muted: bool);

    fn is_muted(&self) -> bool;

    /// Toggle automatic (adaptive) quality selection.
    fn set_auto_quality_mode(&self, enabled: bool);

    fn is_auto_quality_mode(&self) -> bool;

    /// Pin a specific tier. Pinning implicitly disables automatic mode.
    fn set_quality(&self, tier: &QualityTier);

    fn quality(&self) -> Option<QualityTier>;

    /// Tiers available for the current source; empty until the decoder is ready.
    fn qualities(&self) -> Vec<QualityTier>;

    fn state(&self) -> DecoderState;

    fn subscribe(&self, listener: DecoderListener) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);

    /// Free native resources. Called exactly once per decoder.
    fn release(&self);
}

/// Produces decoder instances for the host platform.
pub trait DecoderFactory: PlatformSendSync {
    /// Whether the host can run the decoder at all.
    fn is_supported(&self) -> bool;

    fn create(&self) -> Result<Box<dyn VideoDecoder>>;
}
