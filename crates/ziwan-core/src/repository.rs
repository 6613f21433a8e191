use crate::error::StorageError;
use crate::space::{NewSpace, Space, SpaceId, SpaceMembership, SpaceType, UserId};
use async_trait::async_trait;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Read access to committed spaces and memberships.
#[async_trait]
pub trait SpaceReader: Send + Sync + 'static {
    /// Returns the space with the given id, if any.
    async fn get(&self, id: SpaceId) -> Result<Option<Space>>;

    /// Returns every space owned by `owner`, ordered by id.
    async fn spaces_of(&self, owner: UserId) -> Result<Vec<Space>>;

    /// Returns the members of a space.
    async fn members(&self, space: SpaceId) -> Result<Vec<SpaceMembership>>;
}

/// A store that can open transactions for multi-row writes.
#[async_trait]
pub trait SpaceStore: SpaceReader {
    type Transaction: SpaceTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;
}

/// A unit of work over a [`SpaceStore`].
///
/// Writes become visible to readers only after [`commit`](Self::commit).
/// Dropping a transaction without committing rolls every write back.
#[async_trait]
pub trait SpaceTransaction: Send + 'static {
    /// Checks whether `owner` already has a space of `space_type`.
    ///
    /// Sees writes made earlier in the same transaction.
    async fn space_exists(&mut self, owner: UserId, space_type: SpaceType) -> Result<bool>;

    /// Inserts a space and returns the row as stored, or `None` if the
    /// backend did not report an id for it.
    ///
    /// Returns `Err(Conflict)` if `owner` already has a space of that type.
    async fn insert_space(&mut self, space: &NewSpace) -> Result<Option<Space>>;

    /// Inserts a membership row.
    async fn insert_member(&mut self, member: &SpaceMembership) -> Result<()>;

    /// Makes every write of this transaction durable and visible.
    async fn commit(self) -> Result<()>;
}
