//! Preview rendering bridge.
//!
//! While a stream is still loading the host can paint a blurred still of the
//! last decoded frame so the switch never shows an empty surface. The core
//! decides when to draw; the host decides how.

use crate::{decoder::SurfaceId, platform::PlatformSendSync};

pub trait PreviewRenderer: PlatformSendSync {
    /// Paint one preview frame for `stream_id` onto `surface`.
    fn draw_preview(&self, surface: SurfaceId, stream_id: &str);

    /// Remove any preview from `surface`.
    fn clear_preview(&self, _surface: SurfaceId) {}
}
