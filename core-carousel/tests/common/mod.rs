//! Shared mock bridges for the carousel integration tests.
//!
//! The decoders are scripted and synchronous: `load` emits `Ready` (or an
//! error) before it resolves and `play` emits `Playing` immediately, so a
//! `settle()` barrier observes the complete effect of every transition.

#![allow(dead_code)]

use bridge_traits::{
    error::Result as BridgeResult, BridgeError, DecoderEvent, DecoderEventKind, DecoderFactory,
    DecoderListener, DecoderState, GestureSource, InputSink, PreviewRenderer, QualityTier,
    RawInput, SubscriptionId, SurfaceId, VideoDecoder, Viewport,
};
use core_carousel::{BusyPolicy, CarouselConfig, NavigationConfig, Stream};
use core_runtime::config::CoreConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const THROTTLE: Duration = Duration::from_millis(400);

pub fn url_for(id: &str) -> String {
    format!("https://cdn.example.test/live/{id}.m3u8")
}

pub fn streams(ids: &[&str]) -> Vec<Stream> {
    ids.iter().map(|id| Stream::new(*id, url_for(id))).collect()
}

pub fn carousel_config(policy: BusyPolicy) -> CarouselConfig {
    CarouselConfig::new(NavigationConfig::new(THROTTLE, policy))
}

pub fn tiers() -> Vec<QualityTier> {
    vec![
        QualityTier::new("1080p", 6_000_000, 1920, 1080),
        QualityTier::new("160p", 230_000, 284, 160),
        QualityTier::new("720p", 3_000_000, 1280, 720),
    ]
}

// ============================================================================
// Decoder script
// ============================================================================

/// Behaviour shared by every decoder a factory creates.
#[derive(Default)]
pub struct Script {
    /// Remaining `load()` failures per url. `u32::MAX` fails forever.
    load_failures: Mutex<HashMap<String, u32>>,
    /// Urls that emit an `Error` event instead of `Ready`.
    error_events: Mutex<HashMap<String, u32>>,
    /// Urls that never become ready.
    stalled: Mutex<Vec<String>>,
    /// Urls whose `load()` takes this long to resolve.
    delays: Mutex<HashMap<String, Duration>>,
    /// Remaining `attach()` failures, across all decoders.
    attach_failures: Mutex<u32>,
    /// Tiers reported once a source is ready.
    tiers: Mutex<Vec<QualityTier>>,
    /// Host refuses unmuted autoplay and mutes instead.
    autoplay_requires_mute: Mutex<bool>,
}

impl Script {
    pub fn new() -> Arc<Self> {
        let script = Self::default();
        *script.tiers.lock() = tiers();
        Arc::new(script)
    }

    pub fn fail_loads(&self, id: &str, times: u32) {
        self.load_failures.lock().insert(url_for(id), times);
    }

    pub fn error_events(&self, id: &str, times: u32) {
        self.error_events.lock().insert(url_for(id), times);
    }

    pub fn stall(&self, id: &str) {
        self.stalled.lock().push(url_for(id));
    }

    pub fn delay_loads(&self, id: &str, delay: Duration) {
        self.delays.lock().insert(url_for(id), delay);
    }

    pub fn unstall(&self, id: &str) {
        self.stalled.lock().retain(|url| url != &url_for(id));
    }

    pub fn fail_attaches(&self, times: u32) {
        *self.attach_failures.lock() = times;
    }

    pub fn set_tiers(&self, tiers: Vec<QualityTier>) {
        *self.tiers.lock() = tiers;
    }

    pub fn require_muted_autoplay(&self) {
        *self.autoplay_requires_mute.lock() = true;
    }

    fn take(map: &Mutex<HashMap<String, u32>>, url: &str) -> bool {
        let mut map = map.lock();
        match map.get_mut(url) {
            Some(remaining) if *remaining == u32::MAX => true,
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// MockVideoDecoder
// ============================================================================

struct DecoderInner {
    surface: Option<SurfaceId>,
    source: Option<String>,
    state: DecoderState,
    paused: bool,
    muted: bool,
    auto_quality: bool,
    quality: Option<QualityTier>,
    listeners: HashMap<SubscriptionId, DecoderListener>,
    loads: Vec<String>,
    play_calls: usize,
    pin_calls: usize,
    unsubscribes: usize,
    releases: usize,
}

/// Scripted decoder. Clones share state, so tests keep a handle to every
/// decoder the factory hands out.
#[derive(Clone)]
pub struct MockVideoDecoder {
    inner: Arc<Mutex<DecoderInner>>,
    script: Arc<Script>,
}

impl MockVideoDecoder {
    fn new(script: Arc<Script>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DecoderInner {
                surface: None,
                source: None,
                state: DecoderState::Idle,
                paused: true,
                muted: false,
                auto_quality: true,
                quality: None,
                listeners: HashMap::new(),
                loads: Vec::new(),
                play_calls: 0,
                pin_calls: 0,
                unsubscribes: 0,
                releases: 0,
            })),
            script,
        }
    }

    /// Deliver an event to all listeners, as the host decoder would.
    pub fn emit(&self, kind: DecoderEventKind, source: Option<String>) {
        let listeners: Vec<DecoderListener> =
            self.inner.lock().listeners.values().cloned().collect();
        let event = DecoderEvent::new(kind, source);
        for listener in listeners {
            listener(event.clone());
        }
    }

    /// Make the current source ready, e.g. after a stall.
    pub fn become_ready(&self) {
        let source = {
            let mut inner = self.inner.lock();
            inner.state = DecoderState::Ready;
            inner.source.clone()
        };
        self.emit(DecoderEventKind::Ready, source);
    }

    pub fn source(&self) -> Option<String> {
        self.inner.lock().source.clone()
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.inner.lock().surface
    }

    pub fn loads(&self) -> Vec<String> {
        self.inner.lock().loads.clone()
    }

    pub fn load_count(&self) -> usize {
        self.inner.lock().loads.len()
    }

    pub fn paused(&self) -> bool {
        self.inner.lock().paused
    }

    pub fn muted(&self) -> bool {
        self.inner.lock().muted
    }

    pub fn auto_quality(&self) -> bool {
        self.inner.lock().auto_quality
    }

    pub fn pinned_quality(&self) -> Option<QualityTier> {
        self.inner.lock().quality.clone()
    }

    pub fn play_calls(&self) -> usize {
        self.inner.lock().play_calls
    }

    pub fn pin_calls(&self) -> usize {
        self.inner.lock().pin_calls
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn unsubscribes(&self) -> usize {
        self.inner.lock().unsubscribes
    }

    pub fn releases(&self) -> usize {
        self.inner.lock().releases
    }
}

#[async_trait::async_trait]
impl VideoDecoder for MockVideoDecoder {
    async fn attach(&self, surface: SurfaceId) -> BridgeResult<()> {
        {
            let mut failures = self.script.attach_failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(BridgeError::SurfaceUnavailable(surface.to_string()));
            }
        }
        self.inner.lock().surface = Some(surface);
        Ok(())
    }

    async fn load(&self, url: &str) -> BridgeResult<()> {
        let delay = self.script.delays.lock().get(url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        {
            let mut inner = self.inner.lock();
            inner.loads.push(url.to_string());
            if Script::take(&self.script.load_failures, url) {
                return Err(BridgeError::LoadFailed(format!("{url}: 404")));
            }
            inner.source = Some(url.to_string());
            inner.state = DecoderState::Idle;
            inner.paused = true;
            inner.quality = None;
        }

        if Script::take(&self.script.error_events, url) {
            self.emit(
                DecoderEventKind::Error {
                    message: "manifest unavailable".to_string(),
                },
                Some(url.to_string()),
            );
        } else if !self.script.stalled.lock().iter().any(|stalled| stalled == url) {
            self.inner.lock().state = DecoderState::Ready;
            self.emit(DecoderEventKind::Ready, Some(url.to_string()));
        }
        Ok(())
    }

    fn play(&self) -> BridgeResult<()> {
        let source = {
            let mut inner = self.inner.lock();
            if !inner.state.is_ready() {
                return Err(BridgeError::OperationFailed("no source ready".to_string()));
            }
            inner.play_calls += 1;
            if !inner.muted && *self.script.autoplay_requires_mute.lock() {
                inner.muted = true;
            }
            inner.paused = false;
            if inner.state == DecoderState::Playing {
                return Ok(());
            }
            inner.state = DecoderState::Playing;
            inner.source.clone()
        };
        self.emit(DecoderEventKind::Playing, source);
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        let mut inner = self.inner.lock();
        inner.paused = true;
        if inner.state == DecoderState::Playing {
            inner.state = DecoderState::Ready;
        }
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.inner.lock().paused
    }

    fn set_muted(&self, muted: bool) {
        self.inner.lock().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.inner.lock().muted
    }

    fn set_auto_quality_mode(&self, enabled: bool) {
        self.inner.lock().auto_quality = enabled;
    }

    fn is_auto_quality_mode(&self) -> bool {
        self.inner.lock().auto_quality
    }

    fn set_quality(&self, tier: &QualityTier) {
        let mut inner = self.inner.lock();
        inner.auto_quality = false;
        inner.pin_calls += 1;
        inner.quality = Some(tier.clone());
    }

    fn quality(&self) -> Option<QualityTier> {
        self.inner.lock().quality.clone()
    }

    fn qualities(&self) -> Vec<QualityTier> {
        if self.inner.lock().state.is_ready() {
            self.script.tiers.lock().clone()
        } else {
            Vec::new()
        }
    }

    fn state(&self) -> DecoderState {
        self.inner.lock().state
    }

    fn subscribe(&self, listener: DecoderListener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.inner.lock().listeners.insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        inner.listeners.remove(&id);
        inner.unsubscribes += 1;
    }

    fn release(&self) {
        let mut inner = self.inner.lock();
        inner.releases += 1;
        inner.source = None;
        inner.state = DecoderState::Idle;
    }
}

// ============================================================================
// MockDecoderFactory
// ============================================================================

pub struct MockDecoderFactory {
    supported: bool,
    script: Arc<Script>,
    created: Mutex<Vec<MockVideoDecoder>>,
}

impl MockDecoderFactory {
    pub fn new(script: Arc<Script>) -> Arc<Self> {
        Arc::new(Self {
            supported: true,
            script,
            created: Mutex::new(Vec::new()),
        })
    }

    pub fn unsupported() -> Arc<Self> {
        Arc::new(Self {
            supported: false,
            script: Script::new(),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Decoder behind slot `n` (1-based), in creation order.
    pub fn decoder(&self, slot: u8) -> MockVideoDecoder {
        self.created.lock()[usize::from(slot - 1)].clone()
    }

    pub fn decoders(&self) -> Vec<MockVideoDecoder> {
        self.created.lock().clone()
    }

    /// Decoder currently holding `id`'s url.
    pub fn decoder_for(&self, id: &str) -> Option<MockVideoDecoder> {
        let url = url_for(id);
        self.created
            .lock()
            .iter()
            .find(|decoder| decoder.source().as_deref() == Some(url.as_str()))
            .cloned()
    }

    pub fn total_loads(&self) -> usize {
        self.created.lock().iter().map(MockVideoDecoder::load_count).sum()
    }
}

impl DecoderFactory for MockDecoderFactory {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn create(&self) -> BridgeResult<Box<dyn VideoDecoder>> {
        if !self.supported {
            return Err(BridgeError::NotAvailable("video decoder".to_string()));
        }
        let decoder = MockVideoDecoder::new(Arc::clone(&self.script));
        self.created.lock().push(decoder.clone());
        Ok(Box::new(decoder))
    }
}

// ============================================================================
// MockGestureSource
// ============================================================================

pub struct MockGestureSource {
    viewport: Viewport,
    sinks: Mutex<HashMap<SubscriptionId, InputSink>>,
    unsubscribes: Mutex<usize>,
}

impl MockGestureSource {
    pub fn new(viewport: Viewport) -> Arc<Self> {
        Arc::new(Self {
            viewport,
            sinks: Mutex::new(HashMap::new()),
            unsubscribes: Mutex::new(0),
        })
    }

    /// Push input to every subscriber.
    pub fn push(&self, input: RawInput) {
        let sinks: Vec<InputSink> = self.sinks.lock().values().cloned().collect();
        for sink in sinks {
            sink(input);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn unsubscribes(&self) -> usize {
        *self.unsubscribes.lock()
    }
}

impl GestureSource for MockGestureSource {
    fn subscribe(&self, sink: InputSink) -> BridgeResult<SubscriptionId> {
        let id = SubscriptionId::new();
        self.sinks.lock().insert(id, sink);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> BridgeResult<()> {
        *self.unsubscribes.lock() += 1;
        self.sinks
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| BridgeError::UnknownSubscription(id.to_string()))
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }
}

// ============================================================================
// MockPreviewRenderer
// ============================================================================

#[derive(Default)]
pub struct MockPreviewRenderer {
    draws: Mutex<Vec<(SurfaceId, String)>>,
    clears: Mutex<Vec<SurfaceId>>,
}

impl MockPreviewRenderer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn draws_for(&self, stream_id: &str) -> usize {
        self.draws
            .lock()
            .iter()
            .filter(|(_, id)| id == stream_id)
            .count()
    }

    pub fn clears(&self) -> Vec<SurfaceId> {
        self.clears.lock().clone()
    }
}

impl PreviewRenderer for MockPreviewRenderer {
    fn draw_preview(&self, surface: SurfaceId, stream_id: &str) {
        self.draws.lock().push((surface, stream_id.to_string()));
    }

    fn clear_preview(&self, surface: SurfaceId) {
        self.clears.lock().push(surface);
    }
}

// ============================================================================
// Config helpers
// ============================================================================

pub fn core_config(factory: Arc<MockDecoderFactory>) -> CoreConfig {
    CoreConfig::builder()
        .decoder_factory(factory)
        .build()
        .expect("valid core config")
}
