//! Smart Parking Core - Shared domain types.
//!
//! This crate provides the types exchanged with the Smart Parking backend:
//! - `client` - Session store and API gateway built on these types
//! - `cli` - Command-line front end that renders them
//!
//! # Architecture
//!
//! The core crate contains only types and small pure helpers - no I/O, no
//! HTTP clients, no persistence. This keeps it usable from any front end.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, email addresses, statuses, slots, bookings and
//!   user profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
