//! # Carousel Orchestrator
//!
//! Keeps the three playback slots bound to the window around the ring
//! cursor.
//!
//! ## Transitions
//!
//! ```text
//! Uninitialized ──initialize──> Transitioning ──loads issued──> Steady
//!                                     ^                            │
//!                                     └─────────── begin ──────────┘
//! ```
//!
//! A transition moves the cursor, then reconciles slots with the new window:
//!
//! - slots whose stream is still in the window are **retained** and only
//!   relabelled (promotion plays and enables ABR, demotion pauses and pins
//!   the lowest tier);
//! - the remaining slots are **rebound** to the window members nobody holds,
//!   active member first, and a load is issued for each;
//! - slots left over on short rings become `Unassigned`.
//!
//! A step evicts and loads exactly one slot; a jump may rebind up to three.
//!
//! The orchestrator itself never awaits a load. [`CarouselOrchestrator::begin`]
//! hands back [`LoadTask`]s and the caller reports each result through
//! [`CarouselOrchestrator::finish_load`]. Once every load of a transition has
//! been issued the orchestrator is steady again and accepts the next intent.
//!
//! ## Failures
//!
//! A load error (from `load()` or a decoder `Error` event for the bound
//! source) is retried once. The second failure degrades the slot and emits a
//! [`CarouselEvent::Fault`]; the other slots and navigation carry on.

use crate::config::CarouselConfig;
use crate::error::{CarouselError, Result};
use crate::navigation::NavAction;
use crate::ring::{StreamId, StreamRing};
use crate::slot::{LoadOutcome, LoadTask, PlaybackSlot, SlotEffect, SlotId, SlotRole, SlotSignal};
use crate::snapshot::{CarouselSnapshot, CarouselState};
use bridge_traits::{DecoderEventKind, DecoderFactory};
use core_runtime::events::{CarouselEvent, CoreEvent, EventBus, FaultKind, NavigationEvent, SlotEvent};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

/// First settled-state invariant that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("expected exactly one active slot, found {0}")]
    ActiveCount(usize),

    #[error("active slot holds {found:?}, ring cursor is on {expected}")]
    ActiveMismatch {
        expected: StreamId,
        found: Option<StreamId>,
    },

    #[error("stream {0} is bound to more than one slot")]
    DuplicateBinding(StreamId),

    #[error("bound streams {found:?} differ from window {expected:?}")]
    WindowMismatch {
        expected: Vec<StreamId>,
        found: Vec<StreamId>,
    },

    #[error("{0} has ABR state inconsistent with its role")]
    AbrMismatch(SlotId),

    #[error("{0} has a play state inconsistent with its role")]
    PlaybackMismatch(SlotId),
}

/// Summary of one applied intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub active_slot: SlotId,
    pub active_stream: StreamId,
    /// Slots that were pointed at a new stream.
    pub rebound: Vec<SlotId>,
    /// Slots that kept their stream but changed role.
    pub relabelled: Vec<SlotId>,
}

/// A transition that has been applied to slot state but whose loads still
/// have to be issued.
#[derive(Debug)]
pub struct Transition {
    pub report: TransitionReport,
    pub loads: Vec<LoadTask>,
}

pub struct CarouselOrchestrator {
    ring: StreamRing,
    slots: [PlaybackSlot; 3],
    state: CarouselState,
    config: CarouselConfig,
    events: EventBus,
    muted: bool,
    user_paused: bool,
    /// Blocking loads of the running transition not yet issued.
    outstanding: usize,
    /// Set once the first transition (initial binding) settled.
    initialized: bool,
    last_report: Option<TransitionReport>,
    last_error: Option<String>,
}

impl CarouselOrchestrator {
    /// Create the slot pool.
    ///
    /// # Errors
    ///
    /// - [`CarouselError::UnsupportedEnvironment`] if the host cannot run the
    ///   decoder; a fault event is emitted once
    /// - [`CarouselError::Bridge`] if a decoder cannot be created
    pub fn new(
        mut ring: StreamRing,
        factory: &dyn DecoderFactory,
        config: CarouselConfig,
        events: EventBus,
        signals: UnboundedSender<SlotSignal>,
    ) -> Result<Self> {
        if !factory.is_supported() {
            warn!("The current host does not support the video decoder");
            let _ = events.emit(CoreEvent::Carousel(CarouselEvent::Fault {
                kind: FaultKind::UnsupportedEnvironment,
                slot_id: None,
                stream_id: None,
                message: CarouselError::UnsupportedEnvironment.to_string(),
            }));
            return Err(CarouselError::UnsupportedEnvironment);
        }

        let create = |id: SlotId| -> Result<PlaybackSlot> {
            let decoder = Arc::from(factory.create()?);
            let mut slot = PlaybackSlot::new(id, decoder);
            slot.subscribe(signals.clone());
            debug!(slot = %id, "Created decoder");
            Ok(slot)
        };
        let slots = [
            create(SlotId::FIRST)?,
            create(SlotId::SECOND)?,
            create(SlotId::THIRD)?,
        ];

        if let Some(initial) = &config.initial_stream {
            if ring.jump(initial).is_err() {
                warn!(stream = %initial, "Initial stream not in feed, starting at the head");
            }
        }

        let muted = config.start_muted;
        Ok(Self {
            ring,
            slots,
            state: CarouselState::Uninitialized,
            config,
            events,
            muted,
            user_paused: false,
            outstanding: 0,
            initialized: false,
            last_report: None,
            last_error: None,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> CarouselState {
        self.state
    }

    pub fn is_steady(&self) -> bool {
        self.state == CarouselState::Steady
    }

    pub fn is_transitioning(&self) -> bool {
        self.state == CarouselState::Transitioning
    }

    pub fn ring(&self) -> &StreamRing {
        &self.ring
    }

    pub fn slot(&self, id: SlotId) -> &PlaybackSlot {
        &self.slots[id.index()]
    }

    pub fn slots(&self) -> &[PlaybackSlot] {
        &self.slots
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_user_paused(&self) -> bool {
        self.user_paused
    }

    pub fn last_report(&self) -> Option<&TransitionReport> {
        self.last_report.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn active_slot(&self) -> Option<&PlaybackSlot> {
        self.slots.iter().find(|slot| slot.role().is_active())
    }

    /// `(slot, stream)` that should show a loading preview right now.
    pub fn preview_target(&self) -> Option<(SlotId, StreamId)> {
        let slot = self.active_slot()?;
        if slot.is_loading() && !slot.is_degraded() && self.state != CarouselState::Released {
            slot.stream_id().map(|id| (slot.id(), id.clone()))
        } else {
            None
        }
    }

    // ========================================================================
    // Initialisation
    // ========================================================================

    /// Attach every decoder and bind the initial window.
    ///
    /// Returns the loads to issue; the carousel is `Transitioning` until all
    /// of them have been reported through [`finish_load`](Self::finish_load).
    #[instrument(skip(self), fields(stream = %self.ring.current().id))]
    pub async fn initialize(&mut self) -> Result<Vec<LoadTask>> {
        match self.state {
            CarouselState::Uninitialized => {}
            CarouselState::Released => return Err(CarouselError::Released),
            _ => return Ok(Vec::new()),
        }

        for index in 0..self.slots.len() {
            self.attach_slot(index).await;
        }

        let members = self.ring.window().members();
        let mut loads = Vec::with_capacity(members.len());
        let mut rebound = Vec::with_capacity(members.len());

        for (index, (stream_id, role)) in members.into_iter().enumerate() {
            let id = self.slots[index].id();
            if let Some(task) = self.bind_slot(id, &stream_id, role) {
                loads.push(task);
            }
            rebound.push(id);
        }
        for index in rebound.len()..self.slots.len() {
            self.slots[index].unbind();
        }

        let active_slot = rebound[0];
        self.last_report = Some(TransitionReport {
            active_slot,
            active_stream: self.ring.current().id.clone(),
            rebound,
            relabelled: Vec::new(),
        });

        self.begin_issuing(loads.len());
        info!(
            active = %self.ring.current().id,
            streams = self.ring.len(),
            "Carousel bound initial window"
        );
        Ok(loads)
    }

    async fn attach_slot(&mut self, index: usize) {
        let max_attempts = self.config.max_attach_attempts;
        let id = self.slots[index].id();

        for attempt in 1..=max_attempts {
            match self.slots[index].attach().await {
                Ok(()) => return,
                Err(err) if attempt < max_attempts => {
                    warn!(slot = %id, attempt, error = %err, "Attach failed, retrying");
                }
                Err(err) => {
                    let error = CarouselError::Attach {
                        slot: id,
                        message: err.to_string(),
                    };
                    self.slots[index].mark_degraded();
                    self.emit(CoreEvent::Slot(SlotEvent::Degraded {
                        slot_id: id.get(),
                        stream_id: None,
                        reason: error.to_string(),
                    }));
                    self.fault(FaultKind::Attach, Some(id), None, &error);
                }
            }
        }
    }

    /// Drive a freshly created orchestrator to its first steady state,
    /// issuing loads one after the other.
    pub async fn start(&mut self) -> Result<()> {
        let loads = self.initialize().await?;
        self.drive(loads).await;
        Ok(())
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Apply `action` to slot state and return the loads it needs.
    ///
    /// A jump to the stream already on screen is a no-op transition.
    ///
    /// # Errors
    ///
    /// - [`CarouselError::NotInitialized`] / [`CarouselError::Released`]
    /// - [`CarouselError::TransitionInFlight`] while a previous transition is
    ///   still issuing loads
    /// - [`CarouselError::NotFound`] for a jump to an unknown stream; the
    ///   cursor does not move
    #[instrument(skip(self, action), fields(action = %action))]
    pub fn begin(&mut self, action: &NavAction) -> Result<Transition> {
        match self.state {
            CarouselState::Uninitialized => return Err(CarouselError::NotInitialized),
            CarouselState::Released => return Err(CarouselError::Released),
            CarouselState::Transitioning => return Err(CarouselError::TransitionInFlight),
            CarouselState::Steady => {}
        }

        match action {
            NavAction::Step(direction) => {
                self.ring.step(*direction);
            }
            NavAction::Jump(id) => {
                self.check_jump_target(id)?;
                if self.is_current(id) {
                    debug!(stream = %id, "Jump target already on screen");
                    let report = self.report_unchanged();
                    return Ok(Transition {
                        report,
                        loads: Vec::new(),
                    });
                }
                self.ring.jump(id)?;
            }
        }

        let transition = self.reconcile();
        self.begin_issuing(transition.loads.len());
        info!(
            active = %transition.report.active_stream,
            slot = %transition.report.active_slot,
            rebound = transition.report.rebound.len(),
            "Transition started"
        );
        Ok(transition)
    }

    /// Apply `action` and issue its loads before returning.
    pub async fn apply(&mut self, action: &NavAction) -> Result<TransitionReport> {
        let Transition { report, loads } = self.begin(action)?;
        self.drive(loads).await;
        Ok(report)
    }

    /// Issue loads sequentially, including any retries they trigger.
    pub async fn drive(&mut self, loads: Vec<LoadTask>) {
        let mut queue = loads;
        while let Some(task) = queue.pop() {
            let outcome = task.run().await;
            queue.extend(self.finish_load(outcome));
        }
    }

    /// Whether `id` is the stream on screen.
    pub fn is_current(&self, id: &StreamId) -> bool {
        &self.ring.current().id == id
    }

    /// Report and reject jumps to unknown streams.
    pub fn check_jump_target(&mut self, id: &StreamId) -> Result<()> {
        if self.ring.contains(id) {
            return Ok(());
        }
        let error = CarouselError::NotFound(id.clone());
        self.emit(CoreEvent::Navigation(NavigationEvent::JumpTargetMissing {
            stream_id: id.to_string(),
        }));
        self.fault(FaultKind::NotFound, None, Some(id), &error);
        Err(error)
    }

    fn report_unchanged(&self) -> TransitionReport {
        let active_slot = self
            .active_slot()
            .map(PlaybackSlot::id)
            .unwrap_or(SlotId::FIRST);
        TransitionReport {
            active_slot,
            active_stream: self.ring.current().id.clone(),
            rebound: Vec::new(),
            relabelled: Vec::new(),
        }
    }

    /// Bring slot bindings in line with the ring's current window.
    fn reconcile(&mut self) -> Transition {
        let window = self.ring.window();
        let members = window.members();
        let moved = self
            .active_slot()
            .and_then(PlaybackSlot::stream_id)
            .is_some_and(|id| id != &window.active);
        if moved {
            // A fresh promotion clears an explicit pause.
            self.user_paused = false;
        }

        // Retain slots still holding a window member.
        let mut held: HashSet<StreamId> = HashSet::new();
        let mut free: Vec<SlotId> = Vec::new();
        let mut relabelled = Vec::new();

        for index in 0..self.slots.len() {
            let id = self.slots[index].id();
            let role = self.slots[index]
                .stream_id()
                .filter(|stream| !held.contains(*stream))
                .and_then(|stream| window.role_of(stream).map(|role| (stream.clone(), role)));

            match role {
                Some((stream, role)) => {
                    held.insert(stream);
                    if self.slots[index].role() != role {
                        self.relabel(id, role);
                        relabelled.push(id);
                    }
                }
                None => free.push(id),
            }
        }

        // Rebind free slots to missing members, active first.
        let mut loads = Vec::new();
        let mut rebound = Vec::new();
        let mut free = free.into_iter();
        for (stream_id, role) in members.iter().filter(|(id, _)| !held.contains(id)) {
            let Some(slot) = free.next() else { break };
            if let Some(task) = self.bind_slot(slot, stream_id, *role) {
                loads.push(task);
            }
            rebound.push(slot);
        }

        for slot in free {
            if self.slots[slot.index()].stream_id().is_some() {
                debug!(slot = %slot, "Parking slot outside the window");
            }
            self.slots[slot.index()].unbind();
        }

        let active_slot = self
            .active_slot()
            .map(PlaybackSlot::id)
            .unwrap_or(SlotId::FIRST);
        let report = TransitionReport {
            active_slot,
            active_stream: window.active,
            rebound,
            relabelled,
        };
        self.last_report = Some(report.clone());
        Transition { report, loads }
    }

    fn relabel(&mut self, id: SlotId, role: SlotRole) {
        let effect = self.effect_for(role);
        let slot = &mut self.slots[id.index()];
        let from = slot.role();
        slot.set_role(role, effect);

        let stream_id = slot.stream_id().map(ToString::to_string).unwrap_or_default();
        info!(slot = %id, stream = %stream_id, from = %from, to = %role, "Slot relabelled");
        self.emit(CoreEvent::Slot(SlotEvent::RoleChanged {
            slot_id: id.get(),
            stream_id,
            from: from.to_string(),
            to: role.to_string(),
        }));
    }

    fn bind_slot(&mut self, id: SlotId, stream_id: &StreamId, role: SlotRole) -> Option<LoadTask> {
        let stream = self.ring.get(stream_id)?.clone();
        let effect = self.effect_for(role);

        let slot = &mut self.slots[id.index()];
        slot.bind(&stream, role);
        slot.request(effect);
        info!(slot = %id, stream = %stream.id, role = %role, "Slot bound");
        self.emit(CoreEvent::Slot(SlotEvent::Bound {
            slot_id: id.get(),
            stream_id: stream.id.to_string(),
            role: role.to_string(),
        }));

        let slot = &mut self.slots[id.index()];
        if !slot.is_attached() {
            // Attach already failed for good; nothing can be loaded.
            slot.mark_degraded();
            return None;
        }
        slot.load_task(true)
    }

    fn effect_for(&self, role: SlotRole) -> SlotEffect {
        if role.is_active() {
            self.active_effect()
        } else {
            SlotEffect::standby()
        }
    }

    fn active_effect(&self) -> SlotEffect {
        SlotEffect::on_screen(!self.user_paused, self.muted)
    }

    fn begin_issuing(&mut self, loads: usize) {
        self.outstanding = loads;
        if loads == 0 {
            self.settle();
        } else {
            self.state = CarouselState::Transitioning;
        }
    }

    fn settle(&mut self) {
        self.state = CarouselState::Steady;
        let Some(report) = self.last_report.clone() else {
            return;
        };

        if !self.initialized {
            self.initialized = true;
            self.emit(CoreEvent::Carousel(CarouselEvent::Initialized {
                active_stream_id: report.active_stream.to_string(),
                stream_count: self.ring.len(),
            }));
        } else {
            self.emit(CoreEvent::Carousel(CarouselEvent::TransitionSettled {
                active_stream_id: report.active_stream.to_string(),
                active_slot_id: report.active_slot.get(),
                rebound_slots: report.rebound.iter().map(SlotId::get).collect(),
            }));
        }
        debug!(active = %report.active_stream, "Transition settled");
    }

    // ========================================================================
    // Load results and decoder signals
    // ========================================================================

    /// Record that a load was issued (or failed to issue).
    ///
    /// Returns retry loads, if any.
    pub fn finish_load(&mut self, outcome: LoadOutcome) -> Vec<LoadTask> {
        if outcome.blocking && self.state == CarouselState::Transitioning {
            self.outstanding = self.outstanding.saturating_sub(1);
        }

        let mut retries = Vec::new();
        if self.state != CarouselState::Released {
            let slot = &self.slots[outcome.slot.index()];
            if !slot.owns_load(&outcome) {
                debug!(
                    slot = %outcome.slot,
                    stream = %outcome.stream_id,
                    "Ignoring result of superseded load"
                );
            } else if let Err(err) = &outcome.result {
                let message = err.to_string();
                retries.extend(self.on_load_failure(outcome.slot, message));
            }
        }

        if self.state == CarouselState::Transitioning && self.outstanding == 0 {
            self.settle();
        }
        retries
    }

    /// Apply a decoder notification. Returns retry loads, if any.
    pub fn handle_signal(&mut self, signal: SlotSignal) -> Vec<LoadTask> {
        if self.state == CarouselState::Released {
            return Vec::new();
        }

        let id = signal.slot;
        let index = id.index();
        if !self.slots[index].owns_event(&signal.event) {
            debug!(
                slot = %id,
                source = ?signal.event.source,
                "Ignoring event for superseded source"
            );
            return Vec::new();
        }
        if self.slots[index].is_degraded() {
            return Vec::new();
        }

        let stream_id = self.slots[index]
            .stream_id()
            .map(ToString::to_string)
            .unwrap_or_default();

        match signal.event.kind {
            DecoderEventKind::Ready => {
                let slot = &mut self.slots[index];
                let first = slot.mark_ready();
                slot.clear_failures();
                slot.set_loading(true);
                if slot.role().is_active() {
                    // Hosts may refuse unmuted autoplay; follow what the decoder did.
                    self.muted = slot.is_muted();
                }
                if first {
                    debug!(slot = %id, stream = %stream_id, "Slot ready");
                    self.emit(CoreEvent::Slot(SlotEvent::Ready {
                        slot_id: id.get(),
                        stream_id,
                    }));
                }
            }
            DecoderEventKind::Playing => {
                let slot = &mut self.slots[index];
                if !slot.is_ready() {
                    slot.mark_ready();
                }
                slot.clear_failures();
                slot.retry_deferred_pin();
                slot.set_loading(false);
            }
            DecoderEventKind::Buffering => {
                let slot = &mut self.slots[index];
                if !slot.is_ready() {
                    slot.mark_ready();
                }
                slot.retry_deferred_pin();
                slot.set_loading(true);
            }
            DecoderEventKind::Ended => {
                debug!(slot = %id, stream = %stream_id, "Stream ended");
                self.slots[index].set_loading(true);
            }
            DecoderEventKind::Error { message } => {
                warn!(slot = %id, stream = %stream_id, error = %message, "Decoder error");
                return self.on_load_failure(id, message).into_iter().collect();
            }
        }
        Vec::new()
    }

    fn on_load_failure(&mut self, id: SlotId, message: String) -> Option<LoadTask> {
        let max_attempts = self.config.max_load_attempts;
        let slot = &mut self.slots[id.index()];
        let stream = slot.stream_id()?.clone();

        if slot.record_failure() < max_attempts {
            let task = slot.load_task(false)?;
            warn!(
                slot = %id,
                stream = %stream,
                attempt = task.attempt,
                error = %message,
                "Load failed, retrying"
            );
            self.emit(CoreEvent::Slot(SlotEvent::LoadRetrying {
                slot_id: id.get(),
                stream_id: stream.to_string(),
                attempt: task.attempt,
            }));
            return Some(task);
        }

        slot.mark_degraded();
        let error = CarouselError::Load {
            slot: id,
            stream: stream.clone(),
            message,
        };
        self.emit(CoreEvent::Slot(SlotEvent::Degraded {
            slot_id: id.get(),
            stream_id: Some(stream.to_string()),
            reason: error.to_string(),
        }));
        self.fault(FaultKind::Load, Some(id), Some(&stream), &error);
        None
    }

    // ========================================================================
    // User controls
    // ========================================================================

    /// Flip the carousel-wide mute preference and apply it to the active
    /// slot. Returns the new preference.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        self.refresh_active();
        if let Some(slot) = self.active_slot() {
            if slot.is_ready() {
                self.muted = slot.is_muted();
            }
        }
        info!(muted = self.muted, "Mute toggled");
        self.muted
    }

    /// Pause or resume the active slot. Returns whether it is now paused.
    pub fn toggle_play_pause(&mut self) -> bool {
        self.user_paused = !self.user_paused;
        self.refresh_active();
        info!(paused = self.user_paused, "Playback toggled");
        self.user_paused
    }

    fn refresh_active(&mut self) {
        if self.state == CarouselState::Released {
            return;
        }
        let effect = self.active_effect();
        if let Some(index) = self.slots.iter().position(|slot| slot.role().is_active()) {
            self.slots[index].request(effect);
        }
    }

    // ========================================================================
    // Faults, snapshots, invariants
    // ========================================================================

    fn fault(
        &mut self,
        kind: FaultKind,
        slot: Option<SlotId>,
        stream: Option<&StreamId>,
        error: &CarouselError,
    ) {
        let message = error.to_string();
        warn!(kind = ?kind, error = %message, "Carousel fault");
        self.last_error = Some(message.clone());
        self.emit(CoreEvent::Carousel(CarouselEvent::Fault {
            kind,
            slot_id: slot.map(|id| id.get()),
            stream_id: stream.map(ToString::to_string),
            message,
        }));
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is fine.
        let _ = self.events.emit(event);
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        let active = self.active_slot();
        CarouselSnapshot {
            state: self.state,
            active_slot_id: active.map(|slot| slot.id().get()),
            active_stream_id: active.and_then(|slot| slot.stream_id().cloned()),
            slots: self.slots.iter().map(PlaybackSlot::snapshot).collect(),
            muted: self.muted,
            last_error: self.last_error.clone(),
        }
    }

    /// Check the settled-state invariants.
    pub fn verify_invariants(&self) -> std::result::Result<(), InvariantViolation> {
        let active: Vec<&PlaybackSlot> = self
            .slots
            .iter()
            .filter(|slot| slot.role().is_active())
            .collect();
        if active.len() != 1 {
            return Err(InvariantViolation::ActiveCount(active.len()));
        }

        let current = &self.ring.current().id;
        if active[0].stream_id() != Some(current) {
            return Err(InvariantViolation::ActiveMismatch {
                expected: current.clone(),
                found: active[0].stream_id().cloned(),
            });
        }

        let mut seen = HashSet::new();
        for stream in self.slots.iter().filter_map(PlaybackSlot::stream_id) {
            if !seen.insert(stream.clone()) {
                return Err(InvariantViolation::DuplicateBinding(stream.clone()));
            }
        }

        let mut expected: Vec<StreamId> = self
            .ring
            .window()
            .members()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let mut found: Vec<StreamId> = seen.into_iter().collect();
        expected.sort();
        found.sort();
        if expected != found {
            return Err(InvariantViolation::WindowMismatch { expected, found });
        }

        for slot in &self.slots {
            if slot.abr_enabled() != slot.role().is_active() {
                return Err(InvariantViolation::AbrMismatch(slot.id()));
            }

            let expected_paused = !slot.role().is_active() || self.user_paused;
            if slot.is_paused() != expected_paused {
                return Err(InvariantViolation::PlaybackMismatch(slot.id()));
            }
        }

        Ok(())
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Unsubscribe and release every decoder. Idempotent.
    pub fn release(&mut self) {
        if self.state == CarouselState::Released {
            return;
        }
        for slot in self.slots.iter_mut() {
            slot.release();
        }
        self.state = CarouselState::Released;
        self.outstanding = 0;
        info!("Carousel released");
        self.emit(CoreEvent::Carousel(CarouselEvent::Released));
    }
}

impl Drop for CarouselOrchestrator {
    fn drop(&mut self) {
        self.release();
    }
}
