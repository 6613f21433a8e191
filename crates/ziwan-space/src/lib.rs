//! Space creation coordinator.
//!
//! [`SpaceService`] implements [`ziwan_core::SpaceManager`] on top of any
//! [`ziwan_core::SpaceStore`]: it resolves the quota level of a request,
//! validates it, and creates the space (plus the admin membership of a team
//! space) in one transaction while holding a per-user lock from
//! [`UserLocks`].

pub mod lock;
pub mod service;

pub use lock::{UserLockGuard, UserLocks};
pub use service::{ServiceConfig, SpaceService, DEFAULT_SPACE_NAME};
