//! Smart Parking Client - Session store and API gateway.
//!
//! This crate is everything a front end needs to talk to the Smart Parking
//! backend:
//! - [`SessionStore`] - the authenticated user and tokens, persisted across
//!   restarts and observable through [`SessionEvent`]s
//! - [`ApiClient`] - the single point of contact with the backend, with
//!   bearer injection, single-flight token refresh and error classification
//! - [`fallback`] - demo data for read screens when the backend is down
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use smart_parking_client::{ApiClient, ClientConfig, FileStore, SessionStore};
//!
//! let config = ClientConfig::from_env()?;
//! let session = SessionStore::new(Arc::new(FileStore::new(&config.session_file)));
//! session.check_auth_status();
//!
//! let client = ApiClient::new(&config, session)?;
//! let slots = client.available_slots_or_demo().await?;
//! if slots.is_demo() {
//!     // show the demo banner
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod session;

pub use api::*;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, FieldErrors};
pub use fallback::{DataOrigin, Fetched, with_demo_fallback};
pub use gateway::{ApiClient, ApiRequest, ApiResponse, REFRESH_ENDPOINT, RequestBody};
pub use session::{
    AuthState, AuthTokens, FileStore, KeyValueStore, MemoryStore, SessionEvent, SessionStore,
};
