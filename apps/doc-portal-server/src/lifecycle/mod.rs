//! Document lifecycle
//!
//! The pure transition rules (`Transition`) and the service that runs them
//! against the store, the artifact checks and the event bus
//! (`DocumentLifecycle`).

mod error;
mod service;
mod status;
mod transition;

pub use error::{LifecycleError, Result};
pub use service::{DocumentLifecycle, NewDocument};
pub use status::{DocumentStatus, ParseStatusError};
pub use transition::Transition;
