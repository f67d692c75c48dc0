//! Input and viewport bridge.
//!
//! Hosts translate their native input (DOM events, UIKit gesture
//! recognisers, winit events) into [`RawInput`] values and push them through
//! the sink registered with [`GestureSource::subscribe`]. The core keeps no
//! global listener state: every subscription is explicit and must be undone
//! with [`GestureSource::unsubscribe`] at teardown.

use crate::{decoder::SubscriptionId, error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Keys relevant to feed navigation. Anything else is reported as `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Other(u32),
}

impl KeyCode {
    /// Map a legacy DOM `keyCode` value.
    pub fn from_dom_key_code(code: u32) -> Self {
        match code {
            33 => KeyCode::PageUp,
            34 => KeyCode::PageDown,
            38 => KeyCode::ArrowUp,
            40 => KeyCode::ArrowDown,
            other => KeyCode::Other(other),
        }
    }
}

/// On-screen navigation buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavButton {
    Previous,
    Next,
}

/// Touch gesture phases, with the vertical position in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TouchPhase {
    Start { y: f64 },
    Move { y: f64 },
    End,
    Cancel,
}

/// Visible area of the feed surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

/// Raw, un-normalised input event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RawInput {
    Key(KeyCode),
    /// Wheel/trackpad scroll; positive `delta_y` scrolls down.
    Wheel { delta_y: f64 },
    Touch(TouchPhase),
    Button(NavButton),
    /// The viewport was resized.
    Resize(Viewport),
}

/// Receiver for raw input pushed by a [`GestureSource`].
#[cfg(not(target_arch = "wasm32"))]
pub type InputSink = Arc<dyn Fn(RawInput) + Send + Sync>;

#[cfg(target_arch = "wasm32")]
pub type InputSink = Arc<dyn Fn(RawInput)>;

/// Injected source of navigation input and viewport geometry.
pub trait GestureSource: PlatformSendSync {
    /// Start forwarding input to `sink`.
    fn subscribe(&self, sink: InputSink) -> Result<SubscriptionId>;

    /// Stop forwarding input for `id`. Unknown ids yield an error.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// Current viewport size.
    fn viewport(&self) -> Viewport;
}
