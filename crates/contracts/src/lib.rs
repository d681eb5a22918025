//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - One `DispatchRequest` per logical send, keyed by `request_id`
//! - One `DispatchOutcome` per dispatch call, persisted through `StatusStore`
//! - Backends are interchangeable behind `DeliveryBackend`

mod backend;
mod clock;
mod config;
mod error;
mod outcome;
mod request;
mod store;

pub use backend::{DeliveryBackend, LocalDeliveryBackend};
pub use clock::{Clock, SleepFuture};
pub use config::*;
pub use error::*;
pub use outcome::*;
pub use request::DispatchRequest;
pub use store::StatusStore;
