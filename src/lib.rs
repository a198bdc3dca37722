//! # Cardbox
//!
//! A multi-tenant flashcard service with spaced-repetition scheduling,
//! usable both as a standalone binary and as a library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! cardbox = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cardbox::server::{AppState, create_router};
//! use cardbox::store::SqliteStore;
//!
//! let store = SqliteStore::new("./data/cardbox.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState {
//!     store: Arc::new(store),
//! });
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the `cardbox` binary. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod review;
pub mod server;
pub mod srs;
pub mod store;
pub mod suggest;
pub mod types;
