//! # Core Configuration Module
//!
//! Holds the host bridges and runtime settings the feed carousel needs.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance. It enforces fail-fast validation so a host that forgets to
//! inject a required bridge gets an actionable error at startup instead of a
//! silent black screen.
//!
//! ## Required Dependencies
//!
//! - `DecoderFactory` - Creates the per-slot video decoders
//!
//! ## Optional Dependencies
//!
//! - `GestureSource` - Keyboard, wheel, touch and button input
//! - `PreviewRenderer` - Paints a preview while the active stream loads
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .decoder_factory(Arc::new(MyDecoderFactory))
//!     .gesture_source(Arc::new(MyGestureSource))
//!     .enable_gesture_input(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: no decoder factory was injected
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{DecoderFactory, GestureSource, PreviewRenderer};
use std::sync::Arc;

/// Upper bound on the event bus buffer; larger values only hide slow consumers.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the feed carousel.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Creates decoders and reports host support (required)
    pub decoder_factory: Arc<dyn DecoderFactory>,

    /// Source of navigation input and viewport geometry (optional)
    pub gesture_source: Option<Arc<dyn GestureSource>>,

    /// Preview painter used while the active stream loads (optional)
    pub preview_renderer: Option<Arc<dyn PreviewRenderer>>,

    /// Capacity of the broadcast event bus
    pub event_buffer_size: usize,

    /// Features flags
    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("decoder_factory", &"DecoderFactory { ... }")
            .field(
                "gesture_source",
                &self
                    .gesture_source
                    .as_ref()
                    .map(|_| "GestureSource { ... }"),
            )
            .field(
                "preview_renderer",
                &self
                    .preview_renderer
                    .as_ref()
                    .map(|_| "PreviewRenderer { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
///
/// Enabling a feature requires the matching bridge; [`CoreConfig::validate`]
/// rejects inconsistent combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// Draw previews while the active stream loads (requires PreviewRenderer)
    pub enable_previews: bool,

    /// Route host input into navigation (requires GestureSource)
    pub enable_gesture_input: bool,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Event buffer size is within bounds
    /// - Feature flags are consistent with available bridges
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_previews && self.preview_renderer.is_none() {
            return Err(Error::Config(
                "Previews enabled but no PreviewRenderer provided. \
                 Disable the feature or inject a PreviewRenderer implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_gesture_input && self.gesture_source.is_none() {
            return Err(Error::Config(
                "Gesture input enabled but no GestureSource provided. \
                 Disable the feature or inject a GestureSource implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Renderer to use for previews, if the feature is on.
    pub fn active_preview_renderer(&self) -> Option<Arc<dyn PreviewRenderer>> {
        if self.features.enable_previews {
            self.preview_renderer.clone()
        } else {
            None
        }
    }

    /// Gesture source to subscribe to, if the feature is on.
    pub fn active_gesture_source(&self) -> Option<Arc<dyn GestureSource>> {
        if self.features.enable_gesture_input {
            self.gesture_source.clone()
        } else {
            None
        }
    }
}

fn decoder_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "DecoderFactory".to_string(),
        message: "DecoderFactory implementation is required to create playback decoders. \
                 Web: inject an HLS.js-backed factory bound to the feed's media elements. \
                 Mobile: inject the platform player (AVPlayer/ExoPlayer). \
                 Tests: inject a fake factory."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    decoder_factory: Option<Arc<dyn DecoderFactory>>,
    gesture_source: Option<Arc<dyn GestureSource>>,
    preview_renderer: Option<Arc<dyn PreviewRenderer>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the decoder factory (required).
    pub fn decoder_factory(mut self, factory: Arc<dyn DecoderFactory>) -> Self {
        self.decoder_factory = Some(factory);
        self
    }

    /// Sets the gesture source.
    pub fn gesture_source(mut self, source: Arc<dyn GestureSource>) -> Self {
        self.gesture_source = Some(source);
        self
    }

    /// Sets the preview renderer.
    pub fn preview_renderer(mut self, renderer: Arc<dyn PreviewRenderer>) -> Self {
        self.preview_renderer = Some(renderer);
        self
    }

    /// Sets the event bus capacity. Defaults to [`DEFAULT_EVENT_BUFFER_SIZE`].
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_previews(mut self, enabled: bool) -> Self {
        self.features.enable_previews = enabled;
        self
    }

    pub fn enable_gesture_input(mut self, enabled: bool) -> Self {
        self.features.enable_gesture_input = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The decoder factory is missing
    /// - Configuration values are invalid
    /// - Feature flags are inconsistent with available bridges
    pub fn build(self) -> Result<CoreConfig> {
        let decoder_factory = self
            .decoder_factory
            .ok_or_else(decoder_factory_missing_error)?;

        let config = CoreConfig {
            decoder_factory,
            gesture_source: self.gesture_source,
            preview_renderer: self.preview_renderer,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;

        Ok(config)
    }
}
