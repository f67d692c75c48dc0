//! Read-only views of carousel state for the presentation layer.

use crate::ring::StreamId;
use crate::slot::SlotRole;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarouselState {
    Uninitialized,
    Steady,
    /// A transition was accepted and its loads are still being issued.
    Transitioning,
    Released,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub slot_id: u8,
    pub role: SlotRole,
    pub stream_id: Option<StreamId>,
    pub loading: bool,
    pub paused: bool,
    pub muted: bool,
    pub quality_name: Option<String>,
    pub abr_enabled: bool,
    pub degraded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarouselSnapshot {
    pub state: CarouselState,
    /// Slot currently on screen.
    pub active_slot_id: Option<u8>,
    pub active_stream_id: Option<StreamId>,
    pub slots: Vec<SlotSnapshot>,
    /// Carousel-wide mute preference.
    pub muted: bool,
    /// Most recent fault message, if any.
    pub last_error: Option<String>,
}

impl CarouselSnapshot {
    pub fn uninitialized() -> Self {
        Self {
            state: CarouselState::Uninitialized,
            active_slot_id: None,
            active_stream_id: None,
            slots: Vec::new(),
            muted: true,
            last_error: None,
        }
    }

    pub fn slot(&self, slot_id: u8) -> Option<&SlotSnapshot> {
        self.slots.iter().find(|slot| slot.slot_id == slot_id)
    }

    pub fn active_slot(&self) -> Option<&SlotSnapshot> {
        self.active_slot_id.and_then(|id| self.slot(id))
    }

    /// Slot holding `stream_id`, if any.
    pub fn slot_for(&self, stream_id: &StreamId) -> Option<&SlotSnapshot> {
        self.slots
            .iter()
            .find(|slot| slot.stream_id.as_ref() == Some(stream_id))
    }

    /// Role → stream mapping, independent of which slot plays which role.
    pub fn role_mapping(&self) -> BTreeMap<SlotRole, StreamId> {
        self.slots
            .iter()
            .filter_map(|slot| slot.stream_id.clone().map(|id| (slot.role, id)))
            .collect()
    }

    /// The active stream is still loading and not paused by the user, i.e. a
    /// spinner should be visible.
    pub fn is_buffering(&self) -> bool {
        self.active_slot()
            .is_some_and(|slot| slot.loading && !slot.paused)
    }
}
