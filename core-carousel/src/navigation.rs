//! # Navigation Controller
//!
//! Turns keyboard, wheel, touch and button input into navigation intents.
//!
//! Every candidate intent passes the same gates, in order:
//!
//! 1. **Gesture lock**: a continuous wheel or touch gesture yields at most
//!    one intent. Wheel gestures end after `wheel_idle_reset` of silence,
//!    touch gestures on end/cancel.
//! 2. **Throttle window**: an intent within `throttle_window` of the last
//!    accepted one is dropped, so a burst inside one window collapses into a
//!    single transition.
//! 3. **Busy policy**: while a transition is issuing its loads the intent is
//!    dropped ([`BusyPolicy::Drop`]) or parked as the single pending intent
//!    ([`BusyPolicy::QueueLatest`]).
//!
//! Jumps skip the first two gates; they come from the router or explicit UI,
//! never from a physical gesture.

use crate::config::{BusyPolicy, NavigationConfig};
use crate::ring::StreamId;
use bridge_traits::{KeyCode, NavButton, RawInput, TouchPhase, Viewport};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Advance,
    Retreat,
}

impl Direction {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ArrowDown | KeyCode::PageDown => Some(Direction::Advance),
            KeyCode::ArrowUp | KeyCode::PageUp => Some(Direction::Retreat),
            KeyCode::Other(_) => None,
        }
    }

    pub fn from_button(button: NavButton) -> Self {
        match button {
            NavButton::Next => Direction::Advance,
            NavButton::Previous => Direction::Retreat,
        }
    }

    /// Scrolling down moves forward through the feed.
    pub fn from_wheel(delta_y: f64) -> Option<Self> {
        if delta_y > 0.0 {
            Some(Direction::Advance)
        } else if delta_y < 0.0 {
            Some(Direction::Retreat)
        } else {
            None
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Advance => Direction::Retreat,
            Direction::Retreat => Direction::Advance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavAction {
    Step(Direction),
    Jump(StreamId),
}

impl fmt::Display for NavAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavAction::Step(Direction::Advance) => f.write_str("advance"),
            NavAction::Step(Direction::Retreat) => f.write_str("retreat"),
            NavAction::Jump(id) => write!(f, "jump:{}", id),
        }
    }
}

/// A normalised navigation request. Consumed at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub action: NavAction,
    pub timestamp: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    GestureLocked,
    Throttled,
    Busy,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::GestureLocked => "gesture_locked",
            DropReason::Throttled => "throttled",
            DropReason::Busy => "busy",
        }
    }
}

/// What happened to one piece of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDisposition {
    /// Hand the intent to the orchestrator now.
    Accepted(NavigationIntent),
    /// Parked until the running transition settles.
    Queued(NavAction),
    Dropped(NavAction, DropReason),
    /// Not navigation input (unmapped key, sub-threshold swipe, resize...).
    Ignored,
}

impl InputDisposition {
    pub fn is_accepted(&self) -> bool {
        matches!(self, InputDisposition::Accepted(_))
    }

    /// The action this input resolved to, whatever happened to it.
    pub fn action(&self) -> Option<&NavAction> {
        match self {
            InputDisposition::Accepted(intent) => Some(&intent.action),
            InputDisposition::Queued(action) | InputDisposition::Dropped(action, _) => Some(action),
            InputDisposition::Ignored => None,
        }
    }
}

#[derive(Debug, Default)]
struct WheelGesture {
    last_event: Option<Instant>,
    fired: bool,
}

#[derive(Debug, Default)]
struct TouchGesture {
    start_y: Option<f64>,
    fired: bool,
}

#[derive(Debug)]
pub struct NavigationController {
    config: NavigationConfig,
    viewport: Viewport,
    last_accepted: Option<Instant>,
    pending: Option<NavigationIntent>,
    wheel: WheelGesture,
    touch: TouchGesture,
}

impl NavigationController {
    pub fn new(config: NavigationConfig, viewport: Viewport) -> Self {
        Self {
            config,
            viewport,
            last_accepted: None,
            pending: None,
            wheel: WheelGesture::default(),
            touch: TouchGesture::default(),
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pending(&self) -> Option<&NavigationIntent> {
        self.pending.as_ref()
    }

    /// Swipe distance, in pixels, that counts as a gesture.
    pub fn swipe_threshold(&self) -> f64 {
        self.viewport.height * self.config.swipe_threshold_ratio
    }

    /// Normalise one raw input event. `busy` reports whether the
    /// orchestrator is mid-transition.
    pub fn on_input(&mut self, input: RawInput, now: Instant, busy: bool) -> InputDisposition {
        match input {
            RawInput::Key(key) => match Direction::from_key(key) {
                Some(direction) => self.submit(NavAction::Step(direction), now, busy),
                None => InputDisposition::Ignored,
            },
            RawInput::Button(button) => {
                self.submit(NavAction::Step(Direction::from_button(button)), now, busy)
            }
            RawInput::Wheel { delta_y } => self.on_wheel(delta_y, now, busy),
            RawInput::Touch(phase) => self.on_touch(phase, now, busy),
            RawInput::Resize(viewport) => {
                self.viewport = viewport;
                InputDisposition::Ignored
            }
        }
    }

    /// Submit an explicit action (UI controls, router).
    pub fn on_action(&mut self, action: NavAction, now: Instant, busy: bool) -> InputDisposition {
        self.submit(action, now, busy)
    }

    /// Release the parked intent once the orchestrator is steady again.
    pub fn take_pending(&mut self) -> Option<NavigationIntent> {
        self.pending.take()
    }

    fn on_wheel(&mut self, delta_y: f64, now: Instant, busy: bool) -> InputDisposition {
        let Some(direction) = Direction::from_wheel(delta_y) else {
            return InputDisposition::Ignored;
        };

        let continuing = self
            .wheel
            .last_event
            .is_some_and(|last| now.saturating_duration_since(last) < self.config.wheel_idle_reset);
        self.wheel.last_event = Some(now);

        if !continuing {
            self.wheel.fired = false;
        }
        if self.wheel.fired {
            debug!("Wheel gesture already produced an intent");
            return InputDisposition::Dropped(NavAction::Step(direction), DropReason::GestureLocked);
        }

        let disposition = self.submit(NavAction::Step(direction), now, busy);
        if matches!(
            disposition,
            InputDisposition::Accepted(_) | InputDisposition::Queued(_)
        ) {
            self.wheel.fired = true;
        }
        disposition
    }

    fn on_touch(&mut self, phase: TouchPhase, now: Instant, busy: bool) -> InputDisposition {
        match phase {
            TouchPhase::Start { y } => {
                self.touch = TouchGesture {
                    start_y: Some(y),
                    fired: false,
                };
                InputDisposition::Ignored
            }
            TouchPhase::Move { y } => {
                let Some(start_y) = self.touch.start_y else {
                    return InputDisposition::Ignored;
                };
                // Finger moving up reveals the next stream.
                let travel = start_y - y;
                let direction = if travel > 0.0 {
                    Direction::Advance
                } else {
                    Direction::Retreat
                };
                if self.touch.fired {
                    return InputDisposition::Dropped(
                        NavAction::Step(direction),
                        DropReason::GestureLocked,
                    );
                }
                if travel.abs() < self.swipe_threshold() {
                    return InputDisposition::Ignored;
                }

                let disposition = self.submit(NavAction::Step(direction), now, busy);
                if matches!(
                    disposition,
                    InputDisposition::Accepted(_) | InputDisposition::Queued(_)
                ) {
                    self.touch.fired = true;
                }
                disposition
            }
            TouchPhase::End | TouchPhase::Cancel => {
                self.touch = TouchGesture::default();
                InputDisposition::Ignored
            }
        }
    }

    fn submit(&mut self, action: NavAction, now: Instant, busy: bool) -> InputDisposition {
        let is_jump = matches!(action, NavAction::Jump(_));

        if !is_jump {
            if let Some(last) = self.last_accepted {
                if now.saturating_duration_since(last) < self.config.throttle_window {
                    debug!(action = %action, "Intent throttled");
                    return InputDisposition::Dropped(action, DropReason::Throttled);
                }
            }
        }

        let intent = NavigationIntent {
            action,
            timestamp: now,
        };

        if busy {
            return match self.config.busy_policy {
                BusyPolicy::Drop => {
                    debug!(action = %intent.action, "Intent dropped, transition in flight");
                    InputDisposition::Dropped(intent.action, DropReason::Busy)
                }
                BusyPolicy::QueueLatest => {
                    let action = intent.action.clone();
                    if let Some(replaced) = self.pending.replace(intent) {
                        debug!(replaced = %replaced.action, "Pending intent replaced");
                    }
                    if !is_jump {
                        self.last_accepted = Some(now);
                    }
                    InputDisposition::Queued(action)
                }
            };
        }

        if !is_jump {
            self.last_accepted = Some(now);
        }
        InputDisposition::Accepted(intent)
    }
}
