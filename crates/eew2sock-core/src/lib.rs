//! Event registry, ingestion, and wire protocol for the EEW-to-WebSocket bridge.
//!
//! This crate owns everything between the message bus and the socket:
//! upstream events are projected onto the client maps, stored in a shared
//! registry, aged out by a periodic maintenance loop, and serialized into
//! fixed-size binary packets on request.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `eew2sock.yaml` into
//!   strongly-typed structs.
//! - [`projection`] -- [`Projector`] trait and the equirectangular
//!   implementation for both client maps.
//! - [`registry`] -- [`EventRegistry`], the lock-guarded record collection.
//! - [`ingest`] -- [`Ingestor`], the validate/project/upsert path.
//! - [`maintenance`] -- [`Maintenance`], the 1 Hz eviction loop.
//! - [`protocol`] -- Binary snapshot packet encoding and decoding.
//!
//! [`Projector`]: projection::Projector
//! [`EventRegistry`]: registry::EventRegistry
//! [`Ingestor`]: ingest::Ingestor
//! [`Maintenance`]: maintenance::Maintenance

pub mod config;
pub mod ingest;
pub mod maintenance;
pub mod projection;
pub mod protocol;
pub mod registry;
