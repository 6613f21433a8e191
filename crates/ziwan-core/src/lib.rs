//! Core types and traits for the ziwan space service.
//!
//! This crate holds the domain model shared by the storage backends and the
//! space coordinator: quota levels, the space validator, the access check and
//! the collaborator traits the coordinator is written against.

pub mod access;
pub mod error;
pub mod level;
pub mod manager;
pub mod provision;
pub mod repository;
pub mod space;
pub mod user;
pub mod validate;

pub use access::check_access;
pub use error::{ErrorCode, SpaceError, StorageError};
pub use level::{LevelQuota, RequiredAuth, SpaceLevel};
pub use manager::SpaceManager;
pub use provision::{NoopProvisioner, ProvisionError, ProvisionMode, SpaceProvisioner};
pub use repository::{SpaceReader, SpaceStore, SpaceTransaction};
pub use space::{
    CreateSpaceRequest, NewSpace, Space, SpaceDraft, SpaceId, SpaceMembership, SpaceRole,
    SpaceType, UserId,
};
pub use user::{Authorizer, RoleAuthorizer, User, UserRole};
pub use validate::{NameCheck, ValidationMode};
