//! # Loading Previews
//!
//! While the on-screen stream is loading the host paints a preview (a
//! blurred still of the last frame) over the surface. The drawing loop is a
//! cancellable task keyed by `(slot, stream)`: when the key changes the old
//! task is cancelled before a new one starts, and a cancelled task never
//! draws again.

use crate::ring::StreamId;
use crate::slot::SlotId;
use bridge_traits::PreviewRenderer;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Identity of a preview task.
pub type PreviewKey = (SlotId, StreamId);

struct PreviewTask {
    key: PreviewKey,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct PreviewScheduler {
    renderer: Option<Arc<dyn PreviewRenderer>>,
    frame_interval: Duration,
    current: Option<PreviewTask>,
}

impl PreviewScheduler {
    /// A scheduler without a renderer never spawns anything.
    pub fn new(renderer: Option<Arc<dyn PreviewRenderer>>, frame_interval: Duration) -> Self {
        Self {
            renderer,
            frame_interval,
            current: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn active_key(&self) -> Option<&PreviewKey> {
        self.current.as_ref().map(|task| &task.key)
    }

    /// Make the running task match `desired`: keep it if the key is
    /// unchanged, otherwise cancel it and start the new one (if any).
    pub fn sync(&mut self, desired: Option<PreviewKey>) {
        if self.active_key() == desired.as_ref() {
            return;
        }

        self.cancel();

        let (Some(renderer), Some(key)) = (self.renderer.as_ref(), desired) else {
            return;
        };

        let token = CancellationToken::new();
        let handle = tokio::spawn(draw_loop(
            Arc::clone(renderer),
            key.clone(),
            self.frame_interval,
            token.clone(),
        ));
        trace!(slot = %key.0, stream = %key.1, "Preview started");
        self.current = Some(PreviewTask { key, token, handle });
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.current.take() {
            task.token.cancel();
            task.handle.abort();
            if let Some(renderer) = &self.renderer {
                renderer.clear_preview(task.key.0.surface());
            }
            trace!(slot = %task.key.0, stream = %task.key.1, "Preview cancelled");
        }
    }
}

impl Drop for PreviewScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn draw_loop(
    renderer: Arc<dyn PreviewRenderer>,
    (slot, stream): PreviewKey,
    frame_interval: Duration,
    token: CancellationToken,
) {
    let surface = slot.surface();
    let mut ticker = tokio::time::interval(frame_interval);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                if token.is_cancelled() {
                    break;
                }
                renderer.draw_preview(surface, stream.as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::SurfaceId;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingRenderer {
        draws: Mutex<Vec<(SurfaceId, String)>>,
        clears: Mutex<Vec<SurfaceId>>,
    }

    impl RecordingRenderer {
        fn draws_for(&self, stream: &str) -> usize {
            self.draws
                .lock()
                .iter()
                .filter(|(_, s)| s == stream)
                .count()
        }
    }

    impl PreviewRenderer for RecordingRenderer {
        fn draw_preview(&self, surface: SurfaceId, stream_id: &str) {
            self.draws.lock().push((surface, stream_id.to_string()));
        }

        fn clear_preview(&self, surface: SurfaceId) {
            self.clears.lock().push(surface);
        }
    }

    fn key(slot: SlotId, stream: &str) -> PreviewKey {
        (slot, StreamId::from(stream))
    }

    #[tokio::test(start_paused = true)]
    async fn test_draws_until_cancelled() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut scheduler =
            PreviewScheduler::new(Some(renderer.clone()), Duration::from_millis(10));

        scheduler.sync(Some(key(SlotId::FIRST, "a")));
        tokio::time::sleep(Duration::from_millis(55)).await;
        let drawn = renderer.draws_for("a");
        assert!(drawn >= 5, "expected several frames, got {}", drawn);

        scheduler.sync(None);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(renderer.draws_for("a"), drawn);
        assert_eq!(*renderer.clears.lock(), vec![SurfaceId(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rekey_replaces_task() {
        let renderer = Arc::new(RecordingRenderer::default());
        let mut scheduler =
            PreviewScheduler::new(Some(renderer.clone()), Duration::from_millis(10));

        scheduler.sync(Some(key(SlotId::FIRST, "a")));
        tokio::time::sleep(Duration::from_millis(25)).await;

        // Same key keeps the running task.
        scheduler.sync(Some(key(SlotId::FIRST, "a")));
        assert!(renderer.clears.lock().is_empty());

        scheduler.sync(Some(key(SlotId::FIRST, "b")));
        let stale = renderer.draws_for("a");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(renderer.draws_for("a"), stale);
        assert!(renderer.draws_for("b") > 0);
        assert_eq!(scheduler.active_key(), Some(&key(SlotId::FIRST, "b")));
    }

    #[tokio::test]
    async fn test_disabled_without_renderer() {
        let mut scheduler = PreviewScheduler::new(None, Duration::from_millis(10));
        assert!(!scheduler.is_enabled());
        scheduler.sync(Some(key(SlotId::SECOND, "a")));
        assert!(scheduler.active_key().is_none());
    }
}
