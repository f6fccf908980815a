//! Larder — local-first household inventory core
//!
//! Tracks perishable items across the fridge and pantry, keeps shopping
//! lists and saved recipes, and reconciles everything with a remote backend
//! through a durable pending-operation queue. Local state is authoritative
//! for rendering; the remote store is an eventually-consistent mirror.
//!
//! - **State**: explicit [`state::AppState`] object, optimistic mutations
//!   persisted locally before any network traffic
//! - **Queue**: last-writer-wins compacted operation log that survives
//!   restarts and outages
//! - **Sync**: drain-then-pull cycles that silently degrade to offline mode
//! - **Alerts**: expiration-date arithmetic feeding the platform scheduler
//!
//! # Quick Start
//!
//! ```ignore
//! use larder::state::AppState;
//! use larder::storage::FileStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(FileStore::new()?);
//! let mut state = AppState::load(store, "user-1")?;
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod queue;
pub mod remote;
pub mod scheduler;
pub mod state;
pub mod storage;
pub mod telemetry;
