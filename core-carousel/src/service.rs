//! # Feed Carousel Service
//!
//! Runs the carousel on a single task so that slot state, the navigation
//! gates and the preview scheduler are only ever touched from one place.
//!
//! ## Architecture
//!
//! ```text
//!  GestureSource ──Input──┐
//!  FeedCarousel ──Command─┼──> event loop ──begin/finish_load──> CarouselOrchestrator
//!  decoders ───SlotSignal─┘        │                                   │
//!                                  ├── load futures (FuturesUnordered) ─┘
//!                                  ├── watch::Sender<CarouselSnapshot>
//!                                  └── EventBus (CoreEvent)
//! ```
//!
//! The loop prefers finished loads over decoder signals over commands, so a
//! transition settles before the next piece of input is judged busy or not.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut carousel = FeedCarousel::start(core_config, carousel_config, streams).await?;
//! carousel.settle().await?;
//! carousel.advance_one().await?;
//! let snapshot = carousel.settle().await?;
//! println!("now showing {:?}", snapshot.active_stream_id);
//! carousel.shutdown().await;
//! ```

use crate::config::CarouselConfig;
use crate::error::{CarouselError, Result};
use crate::navigation::{Direction, InputDisposition, NavAction, NavigationController};
use crate::orchestrator::{CarouselOrchestrator, Transition};
use crate::preview::PreviewScheduler;
use crate::ring::{Stream, StreamId, StreamRing};
use crate::slot::{LoadOutcome, LoadTask, SlotSignal};
use crate::snapshot::CarouselSnapshot;
use bridge_traits::{GestureSource, InputSink, RawInput, SubscriptionId};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, NavigationEvent};
use core_runtime::logging::redact_url;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

enum Command {
    Input(RawInput),
    Navigate {
        action: NavAction,
        reply: oneshot::Sender<Result<InputDisposition>>,
    },
    ToggleMute(oneshot::Sender<bool>),
    TogglePlayPause(oneshot::Sender<bool>),
    Settle(oneshot::Sender<CarouselSnapshot>),
    Shutdown(Option<oneshot::Sender<()>>),
}

/// Handle to a running carousel.
///
/// Dropping the handle shuts the carousel down.
pub struct FeedCarousel {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<CarouselSnapshot>,
    events: EventBus,
    task: Option<JoinHandle<()>>,
}

impl FeedCarousel {
    /// Validate configuration, create and attach the decoders, bind the
    /// initial window and start the event loop.
    ///
    /// Returns as soon as the initial loads are scheduled; use
    /// [`settle`](Self::settle) to wait for them.
    ///
    /// # Errors
    ///
    /// - [`CarouselError::Runtime`] / [`CarouselError::InvalidConfig`] for bad
    ///   configuration
    /// - [`CarouselError::EmptyRing`] / [`CarouselError::DuplicateStream`]
    /// - [`CarouselError::UnsupportedEnvironment`] if the host cannot decode;
    ///   the fault is also published on the event bus
    pub async fn start(
        core: CoreConfig,
        config: CarouselConfig,
        streams: Vec<Stream>,
    ) -> Result<Self> {
        core.validate()?;
        config.validate().map_err(CarouselError::InvalidConfig)?;
        let ring = StreamRing::new(streams)?;

        let events = EventBus::new(core.event_buffer_size);
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let mut orchestrator = CarouselOrchestrator::new(
            ring,
            core.decoder_factory.as_ref(),
            config.clone(),
            events.clone(),
            signal_tx,
        )?;
        let loads = orchestrator.initialize().await?;

        let gesture_source = core.active_gesture_source();
        let viewport = gesture_source
            .as_ref()
            .map(|source| source.viewport())
            .unwrap_or_default();
        let navigation = NavigationController::new(config.navigation.clone(), viewport);
        let preview = PreviewScheduler::new(
            core.active_preview_renderer(),
            config.preview_frame_interval,
        );

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let gesture = match gesture_source {
            Some(source) => Some(subscribe_input(source, command_tx.clone())?),
            None => None,
        };

        let (snapshot_tx, snapshot_rx) = watch::channel(orchestrator.snapshot());

        let mut event_loop = EventLoop {
            orchestrator,
            navigation,
            preview,
            signals: signal_rx,
            commands: command_rx,
            loads: FuturesUnordered::new(),
            snapshots: snapshot_tx,
            events: events.clone(),
            gesture,
            settle_waiters: Vec::new(),
        };
        event_loop.schedule(loads);

        info!(viewport = ?viewport, "Feed carousel started");
        let task = tokio::spawn(event_loop.run());

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            events,
            task: Some(task),
        })
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub async fn advance_one(&self) -> Result<InputDisposition> {
        self.navigate(NavAction::Step(Direction::Advance)).await
    }

    pub async fn retreat_one(&self) -> Result<InputDisposition> {
        self.navigate(NavAction::Step(Direction::Retreat)).await
    }

    /// Jump straight to `id`.
    ///
    /// # Errors
    ///
    /// [`CarouselError::NotFound`] if `id` is not in the feed. The carousel
    /// stays where it is.
    pub async fn jump_to(&self, id: impl Into<StreamId>) -> Result<InputDisposition> {
        self.navigate(NavAction::Jump(id.into())).await
    }

    /// Run `action` through the navigation gates.
    pub async fn navigate(&self, action: NavAction) -> Result<InputDisposition> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Navigate { action, reply })?;
        response.await.map_err(|_| CarouselError::Released)?
    }

    /// Feed one raw input event, as a [`GestureSource`] would.
    pub fn submit_input(&self, input: RawInput) -> Result<()> {
        self.send(Command::Input(input))
    }

    // ========================================================================
    // Playback controls
    // ========================================================================

    /// Returns the new mute preference.
    pub async fn toggle_mute(&self) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Command::ToggleMute(reply))?;
        response.await.map_err(|_| CarouselError::Released)
    }

    /// Returns whether the active stream is now paused.
    pub async fn toggle_play_pause(&self) -> Result<bool> {
        let (reply, response) = oneshot::channel();
        self.send(Command::TogglePlayPause(reply))?;
        response.await.map_err(|_| CarouselError::Released)
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Wait until no load is in flight, no intent is pending and every
    /// queued decoder notification has been applied.
    pub async fn settle(&self) -> Result<CarouselSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Settle(reply))?;
        response.await.map_err(|_| CarouselError::Released)
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> CarouselSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that is notified whenever the snapshot changes.
    pub fn watch(&self) -> watch::Receiver<CarouselSnapshot> {
        self.snapshots.clone()
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Release all decoders and input subscriptions and stop the loop.
    /// Calling it again is a no-op.
    pub async fn shutdown(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown(Some(reply))).is_ok() {
            let _ = done.await;
        }
        if let Err(err) = task.await {
            warn!(error = %err, "Carousel task ended abnormally");
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| CarouselError::Released)
    }
}

impl Drop for FeedCarousel {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.commands.send(Command::Shutdown(None));
        }
    }
}

fn subscribe_input(
    source: Arc<dyn GestureSource>,
    commands: mpsc::UnboundedSender<Command>,
) -> Result<(Arc<dyn GestureSource>, SubscriptionId)> {
    let sink: InputSink = Arc::new(move |input: RawInput| {
        let _ = commands.send(Command::Input(input));
    });
    let id = source.subscribe(sink)?;
    debug!(subscription = %id, "Subscribed to gesture input");
    Ok((source, id))
}

// ============================================================================
// Event loop
// ============================================================================

struct EventLoop {
    orchestrator: CarouselOrchestrator,
    navigation: NavigationController,
    preview: PreviewScheduler,
    signals: mpsc::UnboundedReceiver<SlotSignal>,
    commands: mpsc::UnboundedReceiver<Command>,
    loads: FuturesUnordered<BoxFuture<'static, LoadOutcome>>,
    snapshots: watch::Sender<CarouselSnapshot>,
    events: EventBus,
    gesture: Option<(Arc<dyn GestureSource>, SubscriptionId)>,
    settle_waiters: Vec<oneshot::Sender<CarouselSnapshot>>,
}

impl EventLoop {
    async fn run(mut self) {
        self.after_step();

        loop {
            tokio::select! {
                biased;

                Some(outcome) = self.loads.next(), if !self.loads.is_empty() => {
                    let retries = self.orchestrator.finish_load(outcome);
                    self.schedule(retries);
                }
                Some(signal) = self.signals.recv() => {
                    let retries = self.orchestrator.handle_signal(signal);
                    self.schedule(retries);
                }
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => {
                        self.shutdown();
                        if let Some(reply) = reply {
                            let _ = reply.send(());
                        }
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
            }

            self.after_step();
        }

        debug!("Carousel event loop stopped");
    }

    fn schedule(&mut self, loads: Vec<LoadTask>) {
        for task in loads {
            debug!(
                slot = %task.slot,
                stream = %task.stream_id,
                url = %redact_url(&task.url),
                attempt = task.attempt,
                "Issuing load"
            );
            self.loads.push(task.boxed());
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Input(input) => {
                let busy = self.orchestrator.is_transitioning();
                let disposition = self.navigation.on_input(input, Instant::now(), busy);
                self.dispatch(disposition);
            }
            Command::Navigate { action, reply } => {
                let result = self.navigate(action);
                let _ = reply.send(result);
            }
            Command::ToggleMute(reply) => {
                let _ = reply.send(self.orchestrator.toggle_mute());
            }
            Command::TogglePlayPause(reply) => {
                let _ = reply.send(self.orchestrator.toggle_play_pause());
            }
            Command::Settle(reply) => self.settle_waiters.push(reply),
            // Handled by the loop itself.
            Command::Shutdown(_) => {}
        }
    }

    fn navigate(&mut self, action: NavAction) -> Result<InputDisposition> {
        if let NavAction::Jump(id) = &action {
            self.orchestrator.check_jump_target(id)?;
        }
        let busy = self.orchestrator.is_transitioning();
        let disposition = self.navigation.on_action(action, Instant::now(), busy);
        self.dispatch(disposition.clone());
        Ok(disposition)
    }

    fn dispatch(&mut self, disposition: InputDisposition) {
        match disposition {
            InputDisposition::Accepted(intent) => {
                self.emit(NavigationEvent::IntentAccepted {
                    action: intent.action.to_string(),
                });
                self.begin(&intent.action);
            }
            InputDisposition::Queued(action) => {
                self.emit(NavigationEvent::IntentQueued {
                    action: action.to_string(),
                });
            }
            InputDisposition::Dropped(action, reason) => {
                self.emit(NavigationEvent::IntentDropped {
                    action: action.to_string(),
                    reason: reason.as_str().to_string(),
                });
            }
            InputDisposition::Ignored => {}
        }
    }

    fn begin(&mut self, action: &NavAction) {
        match self.orchestrator.begin(action) {
            Ok(Transition { loads, .. }) => self.schedule(loads),
            // Faults are already on the event bus.
            Err(err) => debug!(action = %action, error = %err, "Transition not started"),
        }
    }

    fn emit(&self, event: NavigationEvent) {
        let _ = self.events.emit(CoreEvent::Navigation(event));
    }

    /// Bookkeeping after every loop iteration.
    fn after_step(&mut self) {
        self.drain_signals();

        if self.orchestrator.is_steady() {
            if let Some(intent) = self.navigation.take_pending() {
                debug!(action = %intent.action, "Running queued intent");
                self.begin(&intent.action);
                self.drain_signals();
            }
        }

        self.preview.sync(self.orchestrator.preview_target());

        let snapshot = self.orchestrator.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot.clone();
                true
            }
        });

        if self.is_settled() {
            for waiter in self.settle_waiters.drain(..) {
                let _ = waiter.send(snapshot.clone());
            }
        }
    }

    /// Apply decoder notifications that are already queued.
    fn drain_signals(&mut self) {
        while let Ok(signal) = self.signals.try_recv() {
            let retries = self.orchestrator.handle_signal(signal);
            self.schedule(retries);
        }
    }

    fn is_settled(&self) -> bool {
        self.loads.is_empty()
            && !self.orchestrator.is_transitioning()
            && self.navigation.pending().is_none()
    }

    fn shutdown(&mut self) {
        self.preview.cancel();
        if let Some((source, id)) = self.gesture.take() {
            if let Err(err) = source.unsubscribe(id) {
                warn!(error = %err, "Failed to unsubscribe from gesture input");
            }
        }
        self.loads.clear();
        self.orchestrator.release();

        let snapshot = self.orchestrator.snapshot();
        self.snapshots.send_replace(snapshot.clone());
        for waiter in self.settle_waiters.drain(..) {
            let _ = waiter.send(snapshot.clone());
        }
        info!("Feed carousel shut down");
    }
}
