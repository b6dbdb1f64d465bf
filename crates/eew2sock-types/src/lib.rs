//! Shared type definitions for the EEW-to-WebSocket bridge.
//!
//! This crate is the single source of truth for the data that flows through
//! the bridge: the decoded upstream event ([`EewEvent`]), the projected map
//! coordinates ([`MapCoordinates`]), and the fully-populated registry record
//! ([`EewRecord`]) that is served to WebSocket clients.
//!
//! # Modules
//!
//! - [`event`] -- Upstream event payload as decoded from the message bus
//! - [`record`] -- Registry record and projected coordinate types

pub mod event;
pub mod record;

// Re-export all public types at crate root for convenience.
pub use event::EewEvent;
pub use record::{EewRecord, MapCoordinates, MapPoint};
