//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-carousel`, `core-runtime`, `bridge-traits`). Host
//! applications can depend on `feed-carousel-workspace` and enable the
//! documented features without needing to wire each crate individually.

#[cfg(feature = "carousel")]
pub use bridge_traits;
#[cfg(feature = "carousel")]
pub use core_carousel;
#[cfg(feature = "carousel")]
pub use core_runtime;
