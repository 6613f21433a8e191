use async_trait::async_trait;
use jiff::Timestamp;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use ziwan_core::error::StorageError;
use ziwan_core::repository::{Result, SpaceReader, SpaceStore, SpaceTransaction};
use ziwan_core::{NewSpace, Space, SpaceId, SpaceMembership, SpaceType, UserId};

#[derive(Debug, Default)]
struct State {
    spaces: BTreeMap<SpaceId, Space>,
    members: Vec<SpaceMembership>,
    last_space_id: i64,
}

impl State {
    fn owns(&self, owner: UserId, space_type: SpaceType) -> bool {
        self.spaces
            .values()
            .any(|s| s.owner == owner && s.space_type == space_type)
    }
}

/// In-memory implementation of the space store.
///
/// Transactions are serializable: a transaction holds the store's lock from
/// [`begin`](SpaceStore::begin) until it is committed or dropped, and its
/// writes are staged until commit. Insert enforces the same
/// `(owner, space type)` uniqueness as the MySQL schema.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpaceStore {
    state: Arc<Mutex<State>>,
}

impl InMemorySpaceStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpaceReader for InMemorySpaceStore {
    async fn get(&self, id: SpaceId) -> Result<Option<Space>> {
        Ok(self.state.lock().await.spaces.get(&id).cloned())
    }

    async fn spaces_of(&self, owner: UserId) -> Result<Vec<Space>> {
        let state = self.state.lock().await;
        Ok(state
            .spaces
            .values()
            .filter(|s| s.owner == owner)
            .cloned()
            .collect())
    }

    async fn members(&self, space: SpaceId) -> Result<Vec<SpaceMembership>> {
        let state = self.state.lock().await;
        Ok(state
            .members
            .iter()
            .filter(|m| m.space_id == space)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SpaceStore for InMemorySpaceStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        let state = Arc::clone(&self.state).lock_owned().await;
        Ok(InMemoryTransaction {
            state,
            spaces: Vec::new(),
            members: Vec::new(),
        })
    }
}

/// A transaction over an [`InMemorySpaceStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<State>,
    spaces: Vec<Space>,
    members: Vec<SpaceMembership>,
}

#[async_trait]
impl SpaceTransaction for InMemoryTransaction {
    async fn space_exists(&mut self, owner: UserId, space_type: SpaceType) -> Result<bool> {
        let staged = self
            .spaces
            .iter()
            .any(|s| s.owner == owner && s.space_type == space_type);
        Ok(staged || self.state.owns(owner, space_type))
    }

    async fn insert_space(&mut self, space: &NewSpace) -> Result<Option<Space>> {
        if self.space_exists(space.owner, space.space_type).await? {
            return Err(StorageError::Conflict(format!(
                "space(user_id={}, space_type={})",
                space.owner, space.space_type
            )));
        }

        // ids are consumed even if the transaction rolls back
        self.state.last_space_id += 1;
        let id = SpaceId::new(self.state.last_space_id);
        let stored = space.clone().into_space(id, Timestamp::now());
        self.spaces.push(stored.clone());
        Ok(Some(stored))
    }

    async fn insert_member(&mut self, member: &SpaceMembership) -> Result<()> {
        let duplicate = self
            .state
            .members
            .iter()
            .chain(self.members.iter())
            .any(|m| m.space_id == member.space_id && m.user_id == member.user_id);
        if duplicate {
            return Err(StorageError::Conflict(format!(
                "space_user(space_id={}, user_id={})",
                member.space_id, member.user_id
            )));
        }
        self.members.push(member.clone());
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        let spaces = std::mem::take(&mut self.spaces);
        let members = std::mem::take(&mut self.members);
        for space in spaces {
            self.state.spaces.insert(space.id, space);
        }
        self.state.members.extend(members);
        Ok(())
    }
}
