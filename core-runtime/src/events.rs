//! # Event Bus System
//!
//! Provides an event-driven channel between the carousel core and whatever
//! presents it, using `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enums for carousel, slot and navigation activity
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Orchestrator ├──────────────>│           │     subscribe    ┌──────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ Presentation │
//! ┌──────────────┐     emit      │ (broadcast│                  └──────────────┘
//! │ Feed service ├──────────────>│  channel) ├─────────────────>  Analytics, …
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CarouselEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Carousel(CarouselEvent::Initialized {
//!         active_stream_id: "stream-0".to_string(),
//!         stream_count: 12,
//!     }))
//!     .ok();
//!
//! assert!(subscriber.try_recv().is_ok());
//! ```
//!
//! ## Error Channel
//!
//! Every decoder-reported failure is funneled into a single
//! [`CarouselEvent::Fault`] event. Subscribers interested only in failures can
//! filter on [`EventSeverity::Error`].
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. Treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Carousel lifecycle and transitions
    Carousel(CarouselEvent),
    /// Per-slot binding and decoder activity
    Slot(SlotEvent),
    /// Input normalisation outcomes
    Navigation(NavigationEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Carousel(e) => e.description(),
            CoreEvent::Slot(e) => e.description(),
            CoreEvent::Navigation(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Carousel(CarouselEvent::Fault { .. }) => EventSeverity::Error,
            CoreEvent::Slot(SlotEvent::Degraded { .. }) => EventSeverity::Error,
            CoreEvent::Slot(SlotEvent::LoadRetrying { .. }) => EventSeverity::Warning,
            CoreEvent::Navigation(NavigationEvent::JumpTargetMissing { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Carousel(CarouselEvent::Initialized { .. })
            | CoreEvent::Carousel(CarouselEvent::TransitionSettled { .. })
            | CoreEvent::Carousel(CarouselEvent::Released) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Carousel Events
// ============================================================================

/// Category of a fault funneled through the error channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// The host cannot run the decoder at all.
    UnsupportedEnvironment,
    /// A decoder could not bind to its output surface.
    Attach,
    /// A stream failed to load.
    Load,
    /// A jump referenced an unknown stream.
    NotFound,
}

/// Events describing the carousel as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CarouselEvent {
    /// All three slots were bound for the first time.
    Initialized {
        active_stream_id: String,
        stream_count: usize,
    },
    /// A navigation intent was fully applied.
    TransitionSettled {
        active_stream_id: String,
        active_slot_id: u8,
        /// Slots that had to load a new stream.
        rebound_slots: Vec<u8>,
    },
    /// A failure surfaced to the presentation layer.
    Fault {
        kind: FaultKind,
        slot_id: Option<u8>,
        stream_id: Option<String>,
        message: String,
    },
    /// Every decoder and subscription was released.
    Released,
}

impl CarouselEvent {
    fn description(&self) -> &str {
        match self {
            CarouselEvent::Initialized { .. } => "Carousel initialized",
            CarouselEvent::TransitionSettled { .. } => "Transition settled",
            CarouselEvent::Fault { .. } => "Carousel fault",
            CarouselEvent::Released => "Carousel released",
        }
    }
}

// ============================================================================
// Slot Events
// ============================================================================

/// Events scoped to one playback slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SlotEvent {
    /// A slot was (re)bound to a stream and a load was issued.
    Bound {
        slot_id: u8,
        stream_id: String,
        role: String,
    },
    /// A retained slot changed role without reloading.
    RoleChanged {
        slot_id: u8,
        stream_id: String,
        from: String,
        to: String,
    },
    /// The decoder reported readiness for the bound stream.
    Ready { slot_id: u8, stream_id: String },
    /// A failed load is being retried.
    LoadRetrying {
        slot_id: u8,
        stream_id: String,
        attempt: u8,
    },
    /// The slot gave up and is showing stale or blank content.
    Degraded {
        slot_id: u8,
        stream_id: Option<String>,
        reason: String,
    },
}

impl SlotEvent {
    fn description(&self) -> &str {
        match self {
            SlotEvent::Bound { .. } => "Slot bound to stream",
            SlotEvent::RoleChanged { .. } => "Slot role changed",
            SlotEvent::Ready { .. } => "Slot ready",
            SlotEvent::LoadRetrying { .. } => "Retrying slot load",
            SlotEvent::Degraded { .. } => "Slot degraded",
        }
    }
}

// ============================================================================
// Navigation Events
// ============================================================================

/// Events describing how raw input was normalised.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NavigationEvent {
    /// An intent was handed to the orchestrator.
    IntentAccepted { action: String },
    /// An intent was parked until the running transition settles.
    IntentQueued { action: String },
    /// An intent was discarded.
    IntentDropped { action: String, reason: String },
    /// A jump referenced an unknown stream.
    JumpTargetMissing { stream_id: String },
}

impl NavigationEvent {
    fn description(&self) -> &str {
        match self {
            NavigationEvent::IntentAccepted { .. } => "Navigation intent accepted",
            NavigationEvent::IntentQueued { .. } => "Navigation intent queued",
            NavigationEvent::IntentDropped { .. } => "Navigation intent dropped",
            NavigationEvent::JumpTargetMissing { .. } => "Jump target not found",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// When a subscriber falls behind by more than `capacity` events it
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none. Callers that do not care use `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventSeverity, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let faults = EventStream::new(event_bus.subscribe())
///     .filter(|event| event.severity() == EventSeverity::Error);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn degraded(slot_id: u8) -> CoreEvent {
        CoreEvent::Slot(SlotEvent::Degraded {
            slot_id,
            stream_id: Some("stream-3".to_string()),
            reason: "manifest 404".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Carousel(CarouselEvent::Released)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let event = CoreEvent::Carousel(CarouselEvent::TransitionSettled {
            active_stream_id: "b".to_string(),
            active_slot_id: 3,
            rebound_slots: vec![1],
        });
        bus.emit(event.clone()).ok();

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| event.severity() == EventSeverity::Error);

        bus.emit(CoreEvent::Navigation(NavigationEvent::IntentAccepted {
            action: "advance".to_string(),
        }))
        .ok();
        bus.emit(degraded(2)).ok();

        assert_eq!(stream.recv().await.unwrap(), degraded(2));
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for slot in 1..=5 {
            bus.emit(degraded(slot)).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(degraded(1).severity(), EventSeverity::Error);

        let retry = CoreEvent::Slot(SlotEvent::LoadRetrying {
            slot_id: 1,
            stream_id: "a".to_string(),
            attempt: 2,
        });
        assert_eq!(retry.severity(), EventSeverity::Warning);

        let settled = CoreEvent::Carousel(CarouselEvent::TransitionSettled {
            active_stream_id: "a".to_string(),
            active_slot_id: 1,
            rebound_slots: vec![],
        });
        assert_eq!(settled.severity(), EventSeverity::Info);

        let queued = CoreEvent::Navigation(NavigationEvent::IntentQueued {
            action: "retreat".to_string(),
        });
        assert_eq!(queued.severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_description() {
        assert_eq!(degraded(1).description(), "Slot degraded");
        assert_eq!(
            CoreEvent::Carousel(CarouselEvent::Released).description(),
            "Carousel released"
        );
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Carousel(CarouselEvent::Fault {
            kind: FaultKind::Load,
            slot_id: Some(2),
            stream_id: Some("c".to_string()),
            message: "timeout".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Carousel");
        assert_eq!(json["payload"]["event"], "Fault");
        assert_eq!(json["payload"]["kind"], "load");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
