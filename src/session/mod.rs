//! Client-side session mirror for the hosted auth platform.
//!
//! ARCHITECTURE
//! ============
//! `provider` defines the auth seam and `memory` an in-process implementation.
//! `store` holds the single owned `Session`; `propagator` keeps it in sync with
//! an auth client and wraps the account operations; `registry` maps browser
//! session ids to propagators for the HTTP layer.

pub mod memory;
pub mod propagator;
pub mod provider;
pub mod registry;
pub mod store;
pub mod token;

pub use propagator::{AuthOperationState, CompanionProfiles, PropagatorOptions, SessionPropagator, SignUp};
pub use provider::{AuthBackend, AuthError, Identity};
pub use registry::SessionRegistry;
pub use store::SessionStatus;
