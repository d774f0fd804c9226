//! Address resolution for a single network interface.
//!
//! One `ArpService` owns the pending, resolved and denied tables and the
//! transport. Any number of `ArpInstance` handles share it, each bound to
//! its own protocol station address. The host drives the service by
//! calling `tick` every `ServiceConfig::tick_interval` and `poll` (or
//! `on_frame_received`) when frames arrive.

// Code style
#![forbid(private_in_public)]
// Safety
#![deny(overflowing_literals)]
#![deny(unused_must_use)]
// Disable some clippy lints
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::new_without_default)]
// No-std when not running tests
#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate alloc;

mod address;
mod cache;
mod config;
mod deferred;
mod error;
mod event;
mod handler;
mod instance;
mod service;
mod timer;
mod transport;

pub use self::address::{AddressEntry, AddressFamily, AddressKind, AddressMatch};
pub use self::cache::{CacheEntry, CacheTable, EntryId, Lookup, Waiter};
pub use self::config::*;
pub use self::deferred::DeferredQueue;
pub use self::error::{ArpError, ArpResult};
pub use self::event::{AddressBuffer, Event};
pub use self::instance::{ArpInstance, FindData, InstanceId, Resolution};
pub use self::service::{ArpService, CacheStats};
pub use self::transport::{Transport, TransportError};

pub use d7net;
