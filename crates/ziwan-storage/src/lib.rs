//! Storage backends for spaces and memberships.

pub mod memory;
pub mod mysql;
pub mod sharding;

pub use memory::InMemorySpaceStore;
pub use mysql::{MySqlOptions, MySqlSpaceStore};
pub use sharding::{picture_table_name, PictureTableProvisioner};
pub use ziwan_core::error::StorageError;
pub use ziwan_core::repository::{SpaceReader, SpaceStore, SpaceTransaction};
