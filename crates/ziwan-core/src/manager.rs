use crate::error::Result;
use crate::level::{LevelQuota, SpaceLevel};
use crate::space::{CreateSpaceRequest, Space, SpaceId, SpaceMembership};
use crate::user::User;
use async_trait::async_trait;

#[async_trait]
pub trait SpaceManager: Send + Sync + 'static {
    /// Creates a space owned by `user` and returns its id.
    async fn create_space(&self, request: CreateSpaceRequest, user: &User) -> Result<SpaceId>;

    /// Returns the space if `user` may access it.
    ///
    /// Fails with `NotFound` for unknown ids and `Forbidden` for spaces the
    /// user neither owns nor administers.
    async fn get_space(&self, id: SpaceId, user: &User) -> Result<Space>;

    /// Returns the spaces owned by `user`, ordered by id.
    async fn spaces_of(&self, user: &User) -> Result<Vec<Space>>;

    /// Returns the members of a space visible to `user`.
    async fn members(&self, id: SpaceId, user: &User) -> Result<Vec<SpaceMembership>>;

    /// Fails with `Forbidden` unless `user` owns `space` or is elevated.
    fn check_access(&self, user: &User, space: &Space) -> Result<()>;

    /// Lists every space level with its quota.
    fn levels(&self) -> Vec<(SpaceLevel, LevelQuota)> {
        SpaceLevel::all()
            .iter()
            .map(|level| (*level, level.quota()))
            .collect()
    }
}
