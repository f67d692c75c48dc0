//! # Feed Carousel Module
//!
//! Vertical live-stream carousel: a ring of streams shown one at a time,
//! backed by a fixed pool of three decoders.
//!
//! ## Overview
//!
//! This module handles:
//! - The stream ring and the `prev / active / next` window around its cursor
//! - Three reusable playback slots, rebound as the window slides
//! - Adaptive bitrate on the active slot, lowest tier on the preloaders
//! - Input normalisation (keys, wheel, touch, buttons) with gesture lock,
//!   throttling and a busy policy
//! - Loading previews on the active surface
//! - Retry and degrade handling for attach and load failures
//!
//! Hosts inject decoders, input and preview painting through the
//! `bridge-traits` crate; [`FeedCarousel`] runs everything on one task and
//! publishes [`CarouselSnapshot`]s and `CoreEvent`s.

pub mod abr;
pub mod config;
pub mod error;
pub mod navigation;
pub mod orchestrator;
pub mod preview;
pub mod ring;
pub mod service;
pub mod slot;
pub mod snapshot;

pub use abr::{AbrDirective, AbrOutcome, AdaptiveBitrateController};
pub use config::{BusyPolicy, CarouselConfig, NavigationConfig};
pub use error::{CarouselError, Result};
pub use navigation::{
    Direction, DropReason, InputDisposition, NavAction, NavigationController, NavigationIntent,
};
pub use orchestrator::{CarouselOrchestrator, InvariantViolation, Transition, TransitionReport};
pub use preview::{PreviewKey, PreviewScheduler};
pub use ring::{Manifest, Stream, StreamId, StreamRing, Window};
pub use service::FeedCarousel;
pub use slot::{LoadOutcome, LoadTask, PlaybackSlot, SlotEffect, SlotId, SlotRole, SlotSignal};
pub use snapshot::{CarouselSnapshot, CarouselState, SlotSnapshot};
