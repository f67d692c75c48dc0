//! Feed carousel demonstration
//!
//! Drives a carousel over a small in-memory feed with simulated decoders and
//! prints what the presentation layer would see.
//!
//! Run with:
//! ```bash
//! # Pretty logs
//! cargo run -p core-carousel --example feed_demo
//!
//! # JSON logs with a custom filter
//! cargo run -p core-carousel --example feed_demo -- json "core_carousel=trace"
//! ```

use anyhow::Context;
use bridge_traits::{
    error::Result as BridgeResult, DecoderEvent, DecoderEventKind, DecoderFactory,
    DecoderListener, DecoderState, LogLevel, QualityTier, SubscriptionId, SurfaceId, VideoDecoder,
};
use core_carousel::{
    BusyPolicy, CarouselConfig, CarouselSnapshot, FeedCarousel, Manifest, NavigationConfig,
};
use core_runtime::config::CoreConfig;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const FEED: &str = r#"{
  "streams": [
    { "id": "alpine",  "stream": { "playbackUrl": "https://cdn.example.test/alpine.m3u8?token=abc",  "title": "Alpine lake" } },
    { "id": "harbour", "stream": { "playbackUrl": "https://cdn.example.test/harbour.m3u8?token=def", "title": "Harbour cam" } },
    { "id": "desert",  "stream": { "playbackUrl": "https://cdn.example.test/desert.m3u8?token=ghi",  "title": "Desert night" } },
    { "id": "forest",  "stream": { "playbackUrl": "https://cdn.example.test/forest.m3u8?token=jkl",  "title": "Forest trail" } },
    { "id": "city",    "stream": { "playbackUrl": "https://cdn.example.test/city.m3u8?token=mno",    "title": "City rooftop" } }
  ]
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        _ => LogFormat::Pretty,
    };

    let mut logging = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Debug);
    if let Some(filter) = args.get(2) {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging).context("failed to initialise logging")?;

    let streams = Manifest::from_json(FEED)?.into_streams();
    let core = CoreConfig::builder()
        .decoder_factory(Arc::new(SimulatedFactory))
        .build()?;
    let config = CarouselConfig::new(NavigationConfig::new(
        Duration::from_millis(300),
        BusyPolicy::QueueLatest,
    ));

    let mut carousel = FeedCarousel::start(core, config, streams).await?;
    let mut events = carousel.events();
    let printer = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(event = %serde_json::to_string(&event).unwrap_or_default(), "Carousel event");
        }
    });

    print_snapshot("initial", &carousel.settle().await?);

    carousel.advance_one().await?;
    print_snapshot("after advance", &carousel.settle().await?);

    tokio::time::sleep(Duration::from_millis(350)).await;
    carousel.jump_to("city").await?;
    print_snapshot("after jump", &carousel.settle().await?);

    carousel.toggle_mute().await?;
    print_snapshot("after unmute", &carousel.settle().await?);

    if let Err(err) = carousel.jump_to("volcano").await {
        info!(error = %err, "Jump rejected");
    }

    carousel.shutdown().await;
    printer.abort();
    Ok(())
}

fn print_snapshot(label: &str, snapshot: &CarouselSnapshot) {
    println!("--- {label} ({:?}) ---", snapshot.state);
    for slot in &snapshot.slots {
        println!(
            "  slot-{} {:<10} {:<8} paused={} quality={}",
            slot.slot_id,
            slot.role.as_str(),
            slot.stream_id.as_ref().map(|id| id.as_str()).unwrap_or("-"),
            slot.paused,
            slot.quality_name.as_deref().unwrap_or("auto"),
        );
    }
}

// ============================================================================
// Simulated host decoder
// ============================================================================

struct SimulatedFactory;

impl DecoderFactory for SimulatedFactory {
    fn is_supported(&self) -> bool {
        true
    }

    fn create(&self) -> BridgeResult<Box<dyn VideoDecoder>> {
        Ok(Box::new(SimulatedDecoder::default()))
    }
}

#[derive(Default)]
struct SimulatedDecoder {
    inner: Arc<Mutex<SimulatedState>>,
}

#[derive(Default)]
struct SimulatedState {
    source: Option<String>,
    ready: bool,
    playing: bool,
    muted: bool,
    manual_quality: bool,
    quality: Option<QualityTier>,
    listeners: HashMap<SubscriptionId, DecoderListener>,
}

impl SimulatedState {
    fn notify(&self, kind: DecoderEventKind) {
        let event = DecoderEvent::new(kind, self.source.clone());
        for listener in self.listeners.values() {
            listener(event.clone());
        }
    }
}

#[async_trait::async_trait]
impl VideoDecoder for SimulatedDecoder {
    async fn attach(&self, _surface: SurfaceId) -> BridgeResult<()> {
        Ok(())
    }

    async fn load(&self, url: &str) -> BridgeResult<()> {
        {
            let mut state = self.inner.lock();
            state.source = Some(url.to_string());
            state.ready = false;
            state.playing = false;
        }

        // Manifest fetch happens in the background.
        let inner = Arc::clone(&self.inner);
        let url = url.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            let mut state = inner.lock();
            if state.source.as_deref() == Some(url.as_str()) {
                state.ready = true;
                state.notify(DecoderEventKind::Ready);
            }
        });
        Ok(())
    }

    fn play(&self) -> BridgeResult<()> {
        let mut state = self.inner.lock();
        if !state.playing {
            state.playing = true;
            state.notify(DecoderEventKind::Playing);
        }
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.inner.lock().playing = false;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        !self.inner.lock().playing
    }

    fn set_muted(&self, muted: bool) {
        self.inner.lock().muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.inner.lock().muted
    }

    fn set_auto_quality_mode(&self, enabled: bool) {
        let mut state = self.inner.lock();
        state.manual_quality = !enabled;
        if enabled {
            state.quality = None;
        }
    }

    fn is_auto_quality_mode(&self) -> bool {
        !self.inner.lock().manual_quality
    }

    fn set_quality(&self, tier: &QualityTier) {
        let mut state = self.inner.lock();
        state.manual_quality = true;
        state.quality = Some(tier.clone());
    }

    fn quality(&self) -> Option<QualityTier> {
        self.inner.lock().quality.clone()
    }

    fn qualities(&self) -> Vec<QualityTier> {
        if !self.inner.lock().ready {
            return Vec::new();
        }
        vec![
            QualityTier::new("720p60", 4_500_000, 1280, 720),
            QualityTier::new("480p", 1_500_000, 852, 480),
            QualityTier::new("160p", 230_000, 284, 160),
        ]
    }

    fn state(&self) -> DecoderState {
        let state = self.inner.lock();
        match (state.ready, state.playing) {
            (false, _) => DecoderState::Idle,
            (true, false) => DecoderState::Ready,
            (true, true) => DecoderState::Playing,
        }
    }

    fn subscribe(&self, listener: DecoderListener) -> SubscriptionId {
        let id = SubscriptionId::new();
        self.inner.lock().listeners.insert(id, listener);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.lock().listeners.remove(&id);
    }

    fn release(&self) {
        let mut state = self.inner.lock();
        state.source = None;
        state.listeners.clear();
    }
}
