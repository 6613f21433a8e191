use crate::lock::UserLocks;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;
use ziwan_core::error::Result;
use ziwan_core::validate::{self, ValidationMode};
use ziwan_core::{
    Authorizer, CreateSpaceRequest, NameCheck, NewSpace, NoopProvisioner, ProvisionMode, Space,
    SpaceDraft, SpaceError, SpaceId, SpaceLevel, SpaceManager, SpaceMembership, SpaceProvisioner,
    SpaceRole, SpaceStore, SpaceTransaction, SpaceType, StorageError, User,
};

/// Name given to spaces created without one.
pub const DEFAULT_SPACE_NAME: &str = "default space";

/// Tunables of [`SpaceService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServiceConfig {
    /// How long a creation waits for another creation by the same user.
    #[builder(default = Duration::from_secs(5))]
    pub lock_wait: Duration,
    #[builder(default)]
    pub name_check: NameCheck,
    #[builder(default)]
    pub provision_mode: ProvisionMode,
    #[builder(default = DEFAULT_SPACE_NAME.to_string(), setter(into))]
    pub default_name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Creates spaces and enforces their quota and access rules.
///
/// Creation runs under a per-user lock and inside a single store
/// transaction: the existence check, the space row, the admin membership of a
/// team space and (optionally) the provisioning hook either all take effect or
/// none does.
pub struct SpaceService<S, A, P = NoopProvisioner> {
    store: Arc<S>,
    authorizer: Arc<A>,
    provisioner: Arc<P>,
    locks: UserLocks,
    config: ServiceConfig,
}

impl<S: SpaceStore, A: Authorizer> SpaceService<S, A, NoopProvisioner> {
    /// Creates a service without a provisioning hook.
    pub fn new(store: S, authorizer: A, config: ServiceConfig) -> Self {
        Self::with_provisioner(store, authorizer, NoopProvisioner, config)
    }
}

impl<S: SpaceStore, A: Authorizer, P: SpaceProvisioner> SpaceService<S, A, P> {
    pub fn with_provisioner(store: S, authorizer: A, provisioner: P, config: ServiceConfig) -> Self {
        Self {
            store: Arc::new(store),
            authorizer: Arc::new(authorizer),
            provisioner: Arc::new(provisioner),
            locks: UserLocks::new(),
            config,
        }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Normalizes a creation request into a validated space owned by `user`.
    ///
    /// Level policy, first match wins: no level or common gets the common
    /// quota; professional and flagship get their quota for elevated users and
    /// fail with `Unauthorized` for everyone else. Unknown levels are left for
    /// the validator to reject.
    fn prepare(&self, request: CreateSpaceRequest, user: &User) -> Result<NewSpace> {
        let elevated = self.authorizer.is_elevated(user);
        let mut draft = SpaceDraft::from(request);

        if draft.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            draft.name = Some(self.config.default_name.clone());
        }

        match draft.level.map(SpaceLevel::from_value) {
            None => draft.assign_level(SpaceLevel::Common),
            Some(Some(level)) if !level.requires_elevation() || elevated => {
                draft.assign_level(level)
            }
            Some(Some(level)) => {
                return Err(SpaceError::Unauthorized(format!(
                    "the {level} level requires administrator rights"
                )));
            }
            Some(None) => {}
        }

        draft.space_type.get_or_insert(SpaceType::Private.value());

        validate::fill_quota(&mut draft);
        validate::validate(&draft, ValidationMode::Create, self.config.name_check)?;

        let space = validate::into_new_space(draft, user.id)?;
        if space.level != SpaceLevel::Common && !elevated {
            return Err(SpaceError::Unauthorized(format!(
                "the {} level requires administrator rights",
                space.level
            )));
        }
        Ok(space)
    }

    /// Runs the creation transaction. Dropping the transaction on any error
    /// path rolls back every write made so far.
    async fn persist(&self, space: NewSpace) -> Result<(SpaceId, Option<Space>)> {
        let mut tx = self.store.begin().await?;

        if tx.space_exists(space.owner, space.space_type).await? {
            return Err(SpaceError::DuplicateSpace);
        }

        let created = tx.insert_space(&space).await.map_err(|e| match e {
            e @ StorageError::Conflict(_) => SpaceError::from(e),
            e => SpaceError::Persistence(format!("failed to create space: {e}")),
        })?;

        if space.space_type == SpaceType::Team {
            let space_id = created.as_ref().map(|c| c.id).ok_or_else(|| {
                SpaceError::Persistence("failed to create team member: space has no id".into())
            })?;
            let member = SpaceMembership {
                space_id,
                user_id: space.owner,
                role: SpaceRole::Admin,
            };
            tx.insert_member(&member).await.map_err(|e| {
                SpaceError::Persistence(format!("failed to create team member: {e}"))
            })?;
        }

        if self.config.provision_mode == ProvisionMode::WithinTransaction {
            if let Some(created) = &created {
                self.provisioner
                    .on_space_created(created)
                    .await
                    .map_err(|e| SpaceError::Provisioning(e.to_string()))?;
            }
        }

        tx.commit().await?;
        let id = created.as_ref().map_or(SpaceId::UNASSIGNED, |c| c.id);
        Ok((id, created))
    }
}

#[async_trait]
impl<S: SpaceStore, A: Authorizer, P: SpaceProvisioner> SpaceManager for SpaceService<S, A, P> {
    async fn create_space(&self, request: CreateSpaceRequest, user: &User) -> Result<SpaceId> {
        let space = self.prepare(request, user)?;
        debug!(
            user_id = %user.id,
            level = %space.level,
            space_type = %space.space_type,
            "creating space"
        );

        let (id, created) = {
            let _guard = self
                .locks
                .acquire(user.id, self.config.lock_wait)
                .await
                .ok_or(SpaceError::LockTimeout(user.id))?;
            self.persist(space).await?
        };

        if self.config.provision_mode == ProvisionMode::AfterCommit {
            if let Some(created) = &created {
                if let Err(e) = self.provisioner.on_space_created(created).await {
                    warn!(space_id = %id, error = %e, "space provisioning failed after commit");
                }
            }
        }

        info!(space_id = %id, user_id = %user.id, "space created");
        Ok(id)
    }

    async fn get_space(&self, id: SpaceId, user: &User) -> Result<Space> {
        let space = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| SpaceError::NotFound(format!("space {id}")))?;
        self.check_access(user, &space)?;
        Ok(space)
    }

    async fn spaces_of(&self, user: &User) -> Result<Vec<Space>> {
        Ok(self.store.spaces_of(user.id).await?)
    }

    async fn members(&self, id: SpaceId, user: &User) -> Result<Vec<SpaceMembership>> {
        self.get_space(id, user).await?;
        Ok(self.store.members(id).await?)
    }

    fn check_access(&self, user: &User, space: &Space) -> Result<()> {
        ziwan_core::check_access(self.authorizer.as_ref(), user, space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use ziwan_core::repository::Result as StorageResult;
    use ziwan_core::{ProvisionError, RoleAuthorizer, SpaceReader, UserId, UserRole};
    use ziwan_storage::memory::InMemoryTransaction;
    use ziwan_storage::InMemorySpaceStore;

    type TestService = SpaceService<InMemorySpaceStore, RoleAuthorizer>;

    fn service() -> TestService {
        SpaceService::new(
            InMemorySpaceStore::new(),
            RoleAuthorizer,
            ServiceConfig::default(),
        )
    }

    fn user(id: i64) -> User {
        User::new(UserId::new(id), format!("user-{id}"), UserRole::User)
    }

    fn admin(id: i64) -> User {
        User::new(UserId::new(id), format!("admin-{id}"), UserRole::Admin)
    }

    fn request(name: &str, level: Option<i32>, space_type: Option<i32>) -> CreateSpaceRequest {
        CreateSpaceRequest {
            name: Some(name.to_string()),
            level,
            space_type,
        }
    }

    const PRIVATE: Option<i32> = Some(0);
    const TEAM: Option<i32> = Some(1);

    #[tokio::test]
    async fn blank_request_creates_default_common_space() {
        let service = service();
        let alice = user(1);

        let id = service
            .create_space(request("", None, PRIVATE), &alice)
            .await
            .unwrap();

        let space = service.get_space(id, &alice).await.unwrap();
        let common = SpaceLevel::Common.quota();
        assert_eq!(space.name, DEFAULT_SPACE_NAME);
        assert_eq!(space.level, SpaceLevel::Common);
        assert_eq!(space.space_type, SpaceType::Private);
        assert_eq!(space.max_size, common.max_size);
        assert_eq!(space.max_count, common.max_count);
        assert_eq!(space.owner, alice.id);
    }

    #[tokio::test]
    async fn missing_type_defaults_to_private() {
        let service = service();
        let alice = user(1);

        let id = service
            .create_space(CreateSpaceRequest::default(), &alice)
            .await
            .unwrap();

        let space = service.get_space(id, &alice).await.unwrap();
        assert_eq!(space.space_type, SpaceType::Private);
        assert_eq!(space.name, DEFAULT_SPACE_NAME);
    }

    #[tokio::test]
    async fn second_space_of_same_type_is_rejected() {
        let service = service();
        let alice = user(1);

        service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();
        let err = service
            .create_space(request("again", None, PRIVATE), &alice)
            .await
            .unwrap_err();

        assert!(matches!(err, SpaceError::DuplicateSpace));
        let owned = service.store().spaces_of(alice.id).await.unwrap();
        assert_eq!(owned.len(), 1);
    }

    #[tokio::test]
    async fn one_space_per_type_not_per_user() {
        let service = service();
        let alice = user(1);

        service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();
        service
            .create_space(request("ours", None, TEAM), &alice)
            .await
            .unwrap();

        let owned = service.spaces_of(&alice).await.unwrap();
        assert_eq!(owned.len(), 2);
        assert_eq!(owned[0].space_type, SpaceType::Private);
        assert_eq!(owned[1].space_type, SpaceType::Team);
        assert!(service.spaces_of(&user(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_gets_flagship_team_space_with_membership() {
        let service = service();
        let bob = admin(2);

        let id = service
            .create_space(request("studio", Some(2), TEAM), &bob)
            .await
            .unwrap();

        let space = service.get_space(id, &bob).await.unwrap();
        let flagship = SpaceLevel::Flagship.quota();
        assert_eq!(space.level, SpaceLevel::Flagship);
        assert_eq!(space.max_size, flagship.max_size);
        assert_eq!(space.max_count, flagship.max_count);

        let members = service.members(id, &bob).await.unwrap();
        assert_eq!(
            members,
            vec![SpaceMembership {
                space_id: id,
                user_id: bob.id,
                role: SpaceRole::Admin,
            }]
        );
    }

    #[tokio::test]
    async fn admin_gets_professional_quota() {
        let service = service();
        let bob = admin(2);

        let id = service
            .create_space(request("work", Some(1), PRIVATE), &bob)
            .await
            .unwrap();

        let space = service.get_space(id, &bob).await.unwrap();
        assert_eq!(space.level, SpaceLevel::Professional);
        assert_eq!(space.max_count, SpaceLevel::Professional.quota().max_count);
    }

    #[tokio::test]
    async fn private_space_has_no_membership() {
        let service = service();
        let alice = user(1);

        let id = service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();

        assert!(service.members(id, &alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn regular_user_cannot_request_paid_levels() {
        let service = service();
        let carol = user(3);

        for level in [1, 2] {
            let err = service
                .create_space(request("big", Some(level), PRIVATE), &carol)
                .await
                .unwrap_err();
            assert!(matches!(err, SpaceError::Unauthorized(_)));
            assert_eq!(err.code().value(), 40101);
        }

        assert!(service.store().spaces_of(carol.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_level_and_type_are_parameter_errors() {
        let service = service();

        let err = service
            .create_space(request("x", Some(9), PRIVATE), &admin(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::Param(_)));

        let err = service
            .create_space(request("x", None, Some(4)), &user(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::Param(_)));
    }

    #[tokio::test]
    async fn strict_name_check_rejects_long_names() {
        let config = ServiceConfig::builder().name_check(NameCheck::Strict).build();
        let strict = SpaceService::new(InMemorySpaceStore::new(), RoleAuthorizer, config);
        let long = "n".repeat(21);

        let err = strict
            .create_space(request(&long, None, PRIVATE), &user(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::Param(_)));

        // the literal check keeps accepting the same name
        service()
            .create_space(request(&long, None, PRIVATE), &user(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn access_is_limited_to_owner_and_admins() {
        let service = service();
        let alice = user(1);

        let id = service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();

        assert!(service.get_space(id, &admin(9)).await.is_ok());
        let err = service.get_space(id, &user(2)).await.unwrap_err();
        assert!(matches!(err, SpaceError::Forbidden(_)));

        let err = service
            .get_space(SpaceId::new(999), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creations_by_one_user_yield_one_space() {
        let service = Arc::new(service());
        let alice = user(1);

        let mut handles = vec![];
        for _ in 0..8 {
            let service = Arc::clone(&service);
            let alice = alice.clone();
            handles.push(tokio::spawn(async move {
                service
                    .create_space(request("team", None, TEAM), &alice)
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, SpaceError::DuplicateSpace)),
            }
        }

        assert_eq!(created, 1);
        let owned = service.store().spaces_of(alice.id).await.unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(service.store().members(owned[0].id).await.unwrap().len(), 1);
        assert_eq!(service.locks.in_flight(), 0);
    }

    #[tokio::test]
    async fn lock_wait_expiry_is_reported() {
        let config = ServiceConfig::builder()
            .lock_wait(Duration::from_millis(20))
            .build();
        let service = SpaceService::new(InMemorySpaceStore::new(), RoleAuthorizer, config);
        let alice = user(1);

        let held = service
            .locks
            .acquire(alice.id, Duration::from_secs(1))
            .await
            .unwrap();
        let err = service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::LockTimeout(id) if id == alice.id));
        drop(held);

        service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();
    }

    #[derive(Debug, Clone, Copy)]
    enum Fault {
        /// Every membership insert fails.
        Members,
        /// Every space insert fails with a non-conflict error.
        Insert,
        /// Space inserts succeed but report no id.
        NoId,
    }

    /// In-memory store with an injected failure.
    struct FaultyStore {
        inner: InMemorySpaceStore,
        fault: Fault,
    }

    struct FaultyTx {
        inner: InMemoryTransaction,
        fault: Fault,
    }

    fn faulty(fault: Fault) -> SpaceService<FaultyStore, RoleAuthorizer> {
        SpaceService::new(
            FaultyStore {
                inner: InMemorySpaceStore::new(),
                fault,
            },
            RoleAuthorizer,
            ServiceConfig::default(),
        )
    }

    #[async_trait]
    impl SpaceReader for FaultyStore {
        async fn get(&self, id: SpaceId) -> StorageResult<Option<Space>> {
            self.inner.get(id).await
        }

        async fn spaces_of(&self, owner: UserId) -> StorageResult<Vec<Space>> {
            self.inner.spaces_of(owner).await
        }

        async fn members(&self, space: SpaceId) -> StorageResult<Vec<SpaceMembership>> {
            self.inner.members(space).await
        }
    }

    #[async_trait]
    impl SpaceStore for FaultyStore {
        type Transaction = FaultyTx;

        async fn begin(&self) -> StorageResult<FaultyTx> {
            Ok(FaultyTx {
                inner: self.inner.begin().await?,
                fault: self.fault,
            })
        }
    }

    #[async_trait]
    impl SpaceTransaction for FaultyTx {
        async fn space_exists(&mut self, owner: UserId, space_type: SpaceType) -> StorageResult<bool> {
            self.inner.space_exists(owner, space_type).await
        }

        async fn insert_space(&mut self, space: &NewSpace) -> StorageResult<Option<Space>> {
            match self.fault {
                Fault::Insert => Err(StorageError::Unavailable("disk full".to_string())),
                Fault::NoId => self.inner.insert_space(space).await.map(|_| None),
                Fault::Members => self.inner.insert_space(space).await,
            }
        }

        async fn insert_member(&mut self, member: &SpaceMembership) -> StorageResult<()> {
            match self.fault {
                Fault::Members => Err(StorageError::Unavailable("connection reset".to_string())),
                _ => self.inner.insert_member(member).await,
            }
        }

        async fn commit(self) -> StorageResult<()> {
            self.inner.commit().await
        }
    }

    #[tokio::test]
    async fn failed_membership_rolls_back_the_space() {
        let service = faulty(Fault::Members);
        let alice = user(1);

        let err = service
            .create_space(request("team", None, TEAM), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::Persistence(msg) if msg.contains("team member")));
        assert!(service.store().inner.spaces_of(alice.id).await.unwrap().is_empty());

        // private spaces do not touch the membership table
        service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_space_insert_is_a_persistence_error() {
        let service = faulty(Fault::Insert);
        let alice = user(1);

        let err = service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, SpaceError::Persistence(msg) if msg.starts_with("failed to create space")),
            "got {err:?}"
        );
        assert_eq!(err.code().value(), 50001);
        assert!(service.store().inner.spaces_of(alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn private_space_without_id_is_committed_as_unassigned() {
        let service = faulty(Fault::NoId);
        let alice = user(1);

        let id = service
            .create_space(request("mine", None, PRIVATE), &alice)
            .await
            .unwrap();
        assert_eq!(id, SpaceId::UNASSIGNED);
        assert_eq!(service.spaces_of(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn team_space_without_id_rolls_back() {
        let service = faulty(Fault::NoId);
        let alice = user(1);

        let err = service
            .create_space(request("team", None, TEAM), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::Persistence(msg) if msg.contains("team member")));
        assert!(service.spaces_of(&alice).await.unwrap().is_empty());
    }

    #[derive(Default)]
    struct TrackingState {
        spaces: Vec<Space>,
        last_id: i64,
        open: HashMap<UserId, usize>,
        peak: HashMap<UserId, usize>,
    }

    /// Store without any exclusion of its own. Records how many creation
    /// transactions per owner are open at the same time.
    #[derive(Default)]
    struct TrackingStore {
        state: Arc<Mutex<TrackingState>>,
    }

    struct TrackingTx {
        state: Arc<Mutex<TrackingState>>,
        owner: Option<UserId>,
        staged: Vec<Space>,
    }

    impl Drop for TrackingTx {
        fn drop(&mut self) {
            if let Some(owner) = self.owner {
                let mut state = self.state.lock().unwrap();
                if let Some(open) = state.open.get_mut(&owner) {
                    *open -= 1;
                }
            }
        }
    }

    #[async_trait]
    impl SpaceReader for TrackingStore {
        async fn get(&self, id: SpaceId) -> StorageResult<Option<Space>> {
            let state = self.state.lock().unwrap();
            Ok(state.spaces.iter().find(|s| s.id == id).cloned())
        }

        async fn spaces_of(&self, owner: UserId) -> StorageResult<Vec<Space>> {
            let state = self.state.lock().unwrap();
            Ok(state.spaces.iter().filter(|s| s.owner == owner).cloned().collect())
        }

        async fn members(&self, _space: SpaceId) -> StorageResult<Vec<SpaceMembership>> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl SpaceStore for TrackingStore {
        type Transaction = TrackingTx;

        async fn begin(&self) -> StorageResult<TrackingTx> {
            Ok(TrackingTx {
                state: Arc::clone(&self.state),
                owner: None,
                staged: vec![],
            })
        }
    }

    #[async_trait]
    impl SpaceTransaction for TrackingTx {
        async fn space_exists(&mut self, owner: UserId, space_type: SpaceType) -> StorageResult<bool> {
            let exists = {
                let mut state = self.state.lock().unwrap();
                if self.owner.replace(owner).is_none() {
                    let open = state.open.entry(owner).or_default();
                    *open += 1;
                    let open = *open;
                    let peak = state.peak.entry(owner).or_default();
                    *peak = (*peak).max(open);
                }
                state
                    .spaces
                    .iter()
                    .any(|s| s.owner == owner && s.space_type == space_type)
            };
            // keep the transaction open long enough for a racing creation to show up
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(exists)
        }

        async fn insert_space(&mut self, space: &NewSpace) -> StorageResult<Option<Space>> {
            let mut state = self.state.lock().unwrap();
            state.last_id += 1;
            let stored = space
                .clone()
                .into_space(SpaceId::new(state.last_id), jiff::Timestamp::now());
            self.staged.push(stored.clone());
            Ok(Some(stored))
        }

        async fn insert_member(&mut self, _member: &SpaceMembership) -> StorageResult<()> {
            Ok(())
        }

        async fn commit(mut self) -> StorageResult<()> {
            let staged = std::mem::take(&mut self.staged);
            self.state.lock().unwrap().spaces.extend(staged);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn creations_by_one_user_run_one_at_a_time() {
        let service = Arc::new(SpaceService::new(
            TrackingStore::default(),
            RoleAuthorizer,
            ServiceConfig::default(),
        ));
        let users = [user(1), user(2)];

        let mut handles = vec![];
        for i in 0..16 {
            let service = Arc::clone(&service);
            let owner = users[i % 2].clone();
            let space_type = if i % 4 < 2 { PRIVATE } else { TEAM };
            handles.push(tokio::spawn(async move {
                service
                    .create_space(request("shared", None, space_type), &owner)
                    .await
            }));
        }

        for handle in handles {
            if let Err(err) = handle.await.unwrap() {
                assert!(matches!(err, SpaceError::DuplicateSpace), "got {err:?}");
            }
        }

        let state = service.store().state.lock().unwrap();
        for owner in &users {
            assert_eq!(state.peak.get(&owner.id), Some(&1));
            assert_eq!(state.open.get(&owner.id), Some(&0));
            let owned: Vec<_> = state.spaces.iter().filter(|s| s.owner == owner.id).collect();
            assert_eq!(owned.len(), 2);
        }
    }

    #[derive(Default)]
    struct RecordingProvisioner {
        seen: Mutex<Vec<Space>>,
        fail: bool,
    }

    impl RecordingProvisioner {
        fn seen_ids(&self) -> Vec<SpaceId> {
            self.seen.lock().unwrap().iter().map(|s| s.id).collect()
        }
    }

    #[async_trait]
    impl SpaceProvisioner for RecordingProvisioner {
        async fn on_space_created(&self, space: &Space) -> std::result::Result<(), ProvisionError> {
            self.seen.lock().unwrap().push(space.clone());
            if self.fail {
                return Err(ProvisionError("table quota exceeded".to_string()));
            }
            Ok(())
        }
    }

    fn provisioned(
        mode: ProvisionMode,
        fail: bool,
    ) -> SpaceService<InMemorySpaceStore, RoleAuthorizer, RecordingProvisioner> {
        SpaceService::with_provisioner(
            InMemorySpaceStore::new(),
            RoleAuthorizer,
            RecordingProvisioner {
                fail,
                ..Default::default()
            },
            ServiceConfig::builder().provision_mode(mode).build(),
        )
    }

    #[tokio::test]
    async fn disabled_hook_is_not_called() {
        let service = provisioned(ProvisionMode::Disabled, true);

        service
            .create_space(request("team", None, TEAM), &user(1))
            .await
            .unwrap();
        assert!(service.provisioner.seen_ids().is_empty());
    }

    #[tokio::test]
    async fn hook_failure_within_transaction_rolls_back() {
        let service = provisioned(ProvisionMode::WithinTransaction, true);
        let alice = user(1);

        let err = service
            .create_space(request("team", None, TEAM), &alice)
            .await
            .unwrap_err();
        assert!(matches!(err, SpaceError::Provisioning(_)));
        assert_eq!(service.provisioner.seen_ids().len(), 1);
        assert!(service.store().spaces_of(alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hook_failure_after_commit_keeps_the_space() {
        let service = provisioned(ProvisionMode::AfterCommit, true);
        let alice = user(1);

        let id = service
            .create_space(request("team", None, TEAM), &alice)
            .await
            .unwrap();
        assert_eq!(service.provisioner.seen_ids(), vec![id]);
        assert!(service.get_space(id, &alice).await.is_ok());
    }

    #[tokio::test]
    async fn hook_sees_the_stored_row() {
        for mode in [ProvisionMode::WithinTransaction, ProvisionMode::AfterCommit] {
            let service = provisioned(mode, false);
            let alice = user(1);

            let id = service
                .create_space(request("team", Some(2), TEAM), &admin(1))
                .await
                .unwrap();
            let stored = service.get_space(id, &alice).await.unwrap();
            assert_eq!(*service.provisioner.seen.lock().unwrap(), vec![stored]);
        }
    }

    #[test]
    fn levels_lists_every_tier() {
        let levels = service().levels();
        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].0, SpaceLevel::Common);
        assert_eq!(levels[2].1.max_count, 10000);
    }
}
