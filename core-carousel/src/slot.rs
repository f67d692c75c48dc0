//! # Playback Slots
//!
//! A slot is one long-lived decoder binding. The pool is fixed at three
//! slots; a slot keeps its decoder for its whole life and is rebound to new
//! streams as the window slides.
//!
//! ## Deferred effects
//!
//! Play/pause, quality and mute changes only reach the decoder once it has
//! reported readiness for the bound stream. Earlier requests are kept as a
//! single pending [`SlotEffect`]; a newer request replaces it, so readiness
//! replays only the latest one.

use crate::abr::{AbrDirective, AdaptiveBitrateController};
use crate::ring::{Stream, StreamId};
use crate::snapshot::SlotSnapshot;
use bridge_traits::{
    DecoderEvent, DecoderListener, SubscriptionId, SurfaceId, VideoDecoder,
};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Number of slots in the pool.
pub const SLOT_COUNT: usize = 3;

/// Slot identifier, `1..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(u8);

impl SlotId {
    pub const FIRST: SlotId = SlotId(1);
    pub const SECOND: SlotId = SlotId(2);
    pub const THIRD: SlotId = SlotId(3);
    pub const ALL: [SlotId; SLOT_COUNT] = [Self::FIRST, Self::SECOND, Self::THIRD];

    pub fn new(id: u8) -> Option<Self> {
        (1..=SLOT_COUNT as u8).contains(&id).then_some(Self(id))
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Position in the slot array.
    pub fn index(&self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Each slot renders into its own surface.
    pub fn surface(&self) -> SurfaceId {
        SurfaceId(self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

/// A slot's relationship to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    Active,
    Next,
    Prev,
    /// Not needed by the window (rings shorter than three streams).
    Unassigned,
}

impl SlotRole {
    pub fn is_active(&self) -> bool {
        matches!(self, SlotRole::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotRole::Active => "active",
            SlotRole::Next => "next",
            SlotRole::Prev => "prev",
            SlotRole::Unassigned => "unassigned",
        }
    }
}

impl fmt::Display for SlotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoder notification routed to the orchestrator.
#[derive(Debug, Clone)]
pub struct SlotSignal {
    pub slot: SlotId,
    pub event: DecoderEvent,
}

/// Desired decoder state for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotEffect {
    pub play: bool,
    pub abr: AbrDirective,
    /// `None` leaves the decoder's mute state alone.
    pub muted: Option<bool>,
}

impl SlotEffect {
    /// Preloading: paused on the cheapest rendition.
    pub fn standby() -> Self {
        Self {
            play: false,
            abr: AbrDirective::PinLowest,
            muted: None,
        }
    }

    pub fn on_screen(play: bool, muted: bool) -> Self {
        Self {
            play,
            abr: AbrDirective::Auto,
            muted: Some(muted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    stream_id: StreamId,
    url: String,
    /// Bumped on every bind so load results from older bindings can be told apart.
    generation: u64,
}

/// A load ready to be issued against a slot's decoder.
pub struct LoadTask {
    pub slot: SlotId,
    pub stream_id: StreamId,
    pub url: String,
    pub attempt: u8,
    pub generation: u64,
    /// Counts towards the running transition (retries do not).
    pub blocking: bool,
    decoder: Arc<dyn VideoDecoder>,
}

impl fmt::Debug for LoadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadTask")
            .field("slot", &self.slot)
            .field("stream_id", &self.stream_id)
            .field("attempt", &self.attempt)
            .field("generation", &self.generation)
            .field("blocking", &self.blocking)
            .finish()
    }
}

/// Result of issuing a [`LoadTask`].
#[derive(Debug)]
pub struct LoadOutcome {
    pub slot: SlotId,
    pub stream_id: StreamId,
    pub attempt: u8,
    pub generation: u64,
    pub blocking: bool,
    pub result: bridge_traits::error::Result<()>,
}

impl LoadTask {
    /// Issue the load. Resolves once the decoder accepted the request.
    pub async fn run(self) -> LoadOutcome {
        let result = self.decoder.load(&self.url).await;
        LoadOutcome {
            slot: self.slot,
            stream_id: self.stream_id,
            attempt: self.attempt,
            generation: self.generation,
            blocking: self.blocking,
            result,
        }
    }

    pub fn boxed(self) -> BoxFuture<'static, LoadOutcome> {
        Box::pin(self.run())
    }
}

/// One reusable decoder binding.
pub struct PlaybackSlot {
    id: SlotId,
    decoder: Arc<dyn VideoDecoder>,
    subscription: Option<SubscriptionId>,
    binding: Option<Binding>,
    generation: u64,
    role: SlotRole,
    abr_enabled: bool,
    loading: bool,
    paused: bool,
    muted: bool,
    degraded: bool,
    attached: bool,
    ready: bool,
    pin_deferred: bool,
    pending_effect: Option<SlotEffect>,
    load_attempts: u8,
    failures: u8,
    quality_name: Option<String>,
    released: bool,
}

impl fmt::Debug for PlaybackSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSlot")
            .field("id", &self.id)
            .field("stream_id", &self.stream_id())
            .field("role", &self.role)
            .field("ready", &self.ready)
            .field("loading", &self.loading)
            .field("paused", &self.paused)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl PlaybackSlot {
    pub fn new(id: SlotId, decoder: Arc<dyn VideoDecoder>) -> Self {
        let muted = decoder.is_muted();
        Self {
            id,
            decoder,
            subscription: None,
            binding: None,
            generation: 0,
            role: SlotRole::Unassigned,
            abr_enabled: false,
            loading: false,
            paused: true,
            muted,
            degraded: false,
            attached: false,
            ready: false,
            pin_deferred: false,
            pending_effect: None,
            load_attempts: 0,
            failures: 0,
            quality_name: None,
            released: false,
        }
    }

    /// Forward decoder events into `signals`, tagged with this slot's id.
    pub fn subscribe(&mut self, signals: UnboundedSender<SlotSignal>) {
        if self.subscription.is_some() || self.released {
            return;
        }

        let slot = self.id;
        let listener: DecoderListener = Arc::new(move |event: DecoderEvent| {
            // Receiver gone means the carousel is shutting down.
            let _ = signals.send(SlotSignal { slot, event });
        });
        self.subscription = Some(self.decoder.subscribe(listener));
    }

    pub async fn attach(&mut self) -> bridge_traits::error::Result<()> {
        self.decoder.attach(self.id.surface()).await?;
        self.attached = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    pub fn stream_id(&self) -> Option<&StreamId> {
        self.binding.as_ref().map(|binding| &binding.stream_id)
    }

    pub fn is_bound_to(&self, id: &StreamId) -> bool {
        self.stream_id() == Some(id)
    }

    pub fn abr_enabled(&self) -> bool {
        self.abr_enabled
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Failures since the binding last played.
    pub fn failures(&self) -> u8 {
        self.failures
    }

    /// Count a failed load or decoder error and return the running total.
    pub fn record_failure(&mut self) -> u8 {
        self.failures = self.failures.saturating_add(1);
        self.failures
    }

    /// The binding reached Ready or Playing; the retry allowance starts over.
    pub fn clear_failures(&mut self) {
        self.failures = 0;
    }

    pub fn pending_effect(&self) -> Option<SlotEffect> {
        self.pending_effect
    }

    pub fn decoder(&self) -> &dyn VideoDecoder {
        self.decoder.as_ref()
    }

    // ------------------------------------------------------------------
    // Binding
    // ------------------------------------------------------------------

    /// Point the slot at a new stream. The decoder content is only replaced
    /// once the returned binding is loaded via [`PlaybackSlot::load_task`].
    pub fn bind(&mut self, stream: &Stream, role: SlotRole) {
        self.generation += 1;
        self.binding = Some(Binding {
            stream_id: stream.id.clone(),
            url: stream.playback_url.clone(),
            generation: self.generation,
        });
        self.role = role;
        self.abr_enabled = role.is_active();
        self.paused = !role.is_active();
        self.loading = true;
        self.ready = false;
        self.degraded = false;
        self.pin_deferred = false;
        self.pending_effect = None;
        self.load_attempts = 0;
        self.failures = 0;
        self.quality_name = None;
    }

    /// Drop the binding; the slot is parked paused on the lowest tier.
    pub fn unbind(&mut self) {
        if self.binding.take().is_some() {
            debug!(slot = %self.id, "Slot unbound");
        }
        self.role = SlotRole::Unassigned;
        self.abr_enabled = false;
        self.loading = false;
        self.paused = true;
        self.pin_deferred = false;
        if self.ready {
            self.apply(SlotEffect::standby());
        } else {
            self.pending_effect = None;
        }
    }

    /// Next load for the current binding, counting the attempt.
    pub fn load_task(&mut self, blocking: bool) -> Option<LoadTask> {
        if self.released || !self.attached {
            return None;
        }
        let binding = self.binding.as_ref()?;
        self.load_attempts = self.load_attempts.saturating_add(1);
        Some(LoadTask {
            slot: self.id,
            stream_id: binding.stream_id.clone(),
            url: binding.url.clone(),
            attempt: self.load_attempts,
            generation: binding.generation,
            blocking,
            decoder: Arc::clone(&self.decoder),
        })
    }

    /// Whether a load result still concerns the current binding.
    pub fn owns_load(&self, outcome: &LoadOutcome) -> bool {
        self.binding.as_ref().is_some_and(|binding| {
            binding.generation == outcome.generation && outcome.attempt == self.load_attempts
        })
    }

    /// Whether a decoder event belongs to the current binding.
    ///
    /// Events without a source are attributed to whatever is bound.
    pub fn owns_event(&self, event: &DecoderEvent) -> bool {
        match (&self.binding, &event.source) {
            (Some(binding), Some(source)) => &binding.url == source,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    // ------------------------------------------------------------------
    // Roles and effects
    // ------------------------------------------------------------------

    /// Relabel a retained slot. Logical state changes now; the decoder sees
    /// the effect once it is ready.
    pub fn set_role(&mut self, role: SlotRole, effect: SlotEffect) {
        self.role = role;
        self.abr_enabled = role.is_active();
        self.request(effect);
    }

    /// Apply `effect` now if the decoder is ready, otherwise keep it as the
    /// single pending effect.
    pub fn request(&mut self, effect: SlotEffect) {
        self.paused = !effect.play;
        if let Some(muted) = effect.muted {
            self.muted = muted;
        }

        if self.ready && !self.released {
            self.pending_effect = None;
            self.apply(effect);
        } else {
            self.pending_effect = Some(effect);
        }
    }

    fn apply(&mut self, effect: SlotEffect) {
        let decoder = self.decoder.as_ref();

        if let Some(muted) = effect.muted {
            if decoder.is_muted() != muted {
                decoder.set_muted(muted);
            }
        }

        let outcome = AdaptiveBitrateController::new().apply(effect.abr, decoder);
        self.pin_deferred = outcome.is_deferred();

        let result = if effect.play {
            decoder.play()
        } else {
            decoder.pause()
        };
        if let Err(err) = result {
            warn!(slot = %self.id, error = %err, play = effect.play, "Decoder rejected playback change");
        }

        self.sync_from_decoder();
    }

    /// Mark the binding ready and replay the latest pending effect.
    ///
    /// Returns `true` the first time readiness is seen for this binding.
    pub fn mark_ready(&mut self) -> bool {
        let first = !self.ready;
        self.ready = true;
        if let Some(effect) = self.pending_effect.take() {
            self.apply(effect);
        } else if self.pin_deferred && !self.role.is_active() {
            self.retry_deferred_pin();
        } else {
            self.sync_from_decoder();
        }
        first
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Re-attempt a pin that could not be applied before tiers were known.
    pub fn retry_deferred_pin(&mut self) {
        if !self.pin_deferred || self.role.is_active() || !self.ready {
            return;
        }
        let outcome = AdaptiveBitrateController::new().on_demote(self.decoder.as_ref());
        self.pin_deferred = outcome.is_deferred();
        self.sync_from_decoder();
    }

    /// Refresh the fields the decoder is authoritative for. Play state stays
    /// logical: hosts may report a pause until the first frame renders.
    fn sync_from_decoder(&mut self) {
        self.muted = self.decoder.is_muted();
        self.quality_name = self.decoder.quality().map(|tier| tier.name);
    }

    pub fn mark_degraded(&mut self) {
        self.degraded = true;
        self.loading = false;
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Unsubscribe and free the decoder. Safe to call more than once.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.pending_effect = None;

        if let Some(subscription) = self.subscription.take() {
            self.decoder.unsubscribe(subscription);
        }
        self.decoder.release();
        debug!(slot = %self.id, "Slot released");
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            slot_id: self.id.get(),
            role: self.role,
            stream_id: self.stream_id().cloned(),
            loading: self.loading,
            paused: self.paused,
            muted: self.muted,
            quality_name: self.quality_name.clone(),
            abr_enabled: self.abr_enabled,
            degraded: self.degraded,
        }
    }
}

impl Drop for PlaybackSlot {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_ids() {
        assert_eq!(SlotId::new(0), None);
        assert_eq!(SlotId::new(4), None);
        assert_eq!(SlotId::new(2), Some(SlotId::SECOND));
        assert_eq!(SlotId::THIRD.index(), 2);
        assert_eq!(SlotId::FIRST.surface(), SurfaceId(1));
        assert_eq!(SlotId::SECOND.to_string(), "slot-2");
    }

    #[test]
    fn role_names() {
        assert_eq!(SlotRole::Active.to_string(), "active");
        assert!(SlotRole::Active.is_active());
        assert!(!SlotRole::Prev.is_active());
    }

    #[test]
    fn effects() {
        let standby = SlotEffect::standby();
        assert!(!standby.play);
        assert_eq!(standby.abr, AbrDirective::PinLowest);
        assert_eq!(standby.muted, None);

        let on_screen = SlotEffect::on_screen(true, false);
        assert_eq!(on_screen.abr, AbrDirective::Auto);
        assert_eq!(on_screen.muted, Some(false));
    }
}
