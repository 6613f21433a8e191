use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::{MySqlDatabaseError, MySqlPoolOptions, MySqlRow};
use sqlx::{MySql, MySqlPool, Row, Transaction};
use std::time::Duration;
use tracing::debug;
use ziwan_core::error::StorageError;
use ziwan_core::repository::{Result, SpaceReader, SpaceStore, SpaceTransaction};
use ziwan_core::{
    NewSpace, Space, SpaceId, SpaceLevel, SpaceMembership, SpaceRole, SpaceType, UserId,
};

/// Schema of the `space` table.
pub const SPACE_DDL: &str = include_str!("../ddl/mysql/space.sql");
/// Schema of the `space_user` table.
pub const SPACE_USER_DDL: &str = include_str!("../ddl/mysql/space_user.sql");
/// Schema of the `picture` template table.
pub const PICTURE_DDL: &str = include_str!("../ddl/mysql/picture.sql");

/// Connection settings for [`MySqlSpaceStore::connect_with`].
#[derive(Debug, Clone)]
pub struct MySqlOptions {
    pub max_connections: u32,
    /// How long to wait for a free pooled connection.
    pub acquire_timeout: Duration,
    /// Server-side limit for a single `SELECT`, applied per connection.
    pub statement_timeout: Option<Duration>,
}

impl Default for MySqlOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
            statement_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// MySQL implementation of the space store.
///
/// The `(user_id, space_type)` unique key on `space` is the authoritative
/// guard for the one-space-per-type rule; violations are reported as
/// [`StorageError::Conflict`].
#[derive(Debug, Clone)]
pub struct MySqlSpaceStore {
    pool: MySqlPool,
}

impl MySqlSpaceStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool with default options.
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with(database_url, MySqlOptions::default()).await
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect_with(database_url: &str, options: MySqlOptions) -> Result<Self> {
        let statement_timeout = options.statement_timeout;
        let pool = MySqlPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    if let Some(timeout) = statement_timeout {
                        sqlx::query("SET SESSION max_execution_time = ?")
                            .bind(timeout.as_millis() as u64)
                            .execute(&mut *conn)
                            .await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Creates the tables used by this store if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        for ddl in [SPACE_DDL, SPACE_USER_DDL, PICTURE_DDL] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        }
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// ER_LOCK_DEADLOCK: InnoDB picked this transaction as the victim.
const ER_LOCK_DEADLOCK: u16 = 1213;

/// A duplicate key, or a deadlock between two inserts racing for the same
/// unique key.
fn is_conflict(err: &sqlx::Error) -> bool {
    is_unique_violation(err)
        || err
            .as_database_error()
            .and_then(|e| e.try_downcast_ref::<MySqlDatabaseError>())
            .is_some_and(|e| e.number() == ER_LOCK_DEADLOCK)
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn parse_space(row: &MySqlRow) -> Result<Space> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let level_raw: i32 = row.try_get("space_level").map_err(map_sqlx_error)?;
    let type_raw: i32 = row.try_get("space_type").map_err(map_sqlx_error)?;
    let created_raw: i64 = row.try_get("create_time").map_err(map_sqlx_error)?;

    let level = SpaceLevel::from_value(level_raw).ok_or_else(|| {
        StorageError::InvalidData(format!("space {id} has unknown level {level_raw}"))
    })?;
    let space_type = SpaceType::from_value(type_raw).ok_or_else(|| {
        StorageError::InvalidData(format!("space {id} has unknown type {type_raw}"))
    })?;
    let created_at = Timestamp::from_second(created_raw).map_err(|e| {
        StorageError::InvalidData(format!("invalid create_time '{created_raw}': {e}"))
    })?;

    Ok(Space {
        id: SpaceId::new(id),
        name: row.try_get("space_name").map_err(map_sqlx_error)?,
        level,
        space_type,
        max_size: row.try_get("max_size").map_err(map_sqlx_error)?,
        max_count: row.try_get("max_count").map_err(map_sqlx_error)?,
        total_size: row.try_get("total_size").map_err(map_sqlx_error)?,
        total_count: row.try_get("total_count").map_err(map_sqlx_error)?,
        owner: UserId::new(row.try_get("user_id").map_err(map_sqlx_error)?),
        created_at,
    })
}

fn parse_member(row: &MySqlRow) -> Result<SpaceMembership> {
    let role_raw: String = row.try_get("space_role").map_err(map_sqlx_error)?;
    let role = SpaceRole::from_value(&role_raw)
        .ok_or_else(|| StorageError::InvalidData(format!("unknown space role '{role_raw}'")))?;

    Ok(SpaceMembership {
        space_id: SpaceId::new(row.try_get("space_id").map_err(map_sqlx_error)?),
        user_id: UserId::new(row.try_get("user_id").map_err(map_sqlx_error)?),
        role,
    })
}

const SPACE_COLUMNS: &str = "id, space_name, space_level, space_type, max_size, max_count, \
                             total_size, total_count, user_id, create_time";

#[async_trait]
impl SpaceReader for MySqlSpaceStore {
    async fn get(&self, id: SpaceId) -> Result<Option<Space>> {
        let row = sqlx::query(&format!(
            "SELECT {SPACE_COLUMNS} FROM space WHERE id = ? LIMIT 1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(parse_space).transpose()
    }

    async fn spaces_of(&self, owner: UserId) -> Result<Vec<Space>> {
        let rows = sqlx::query(&format!(
            "SELECT {SPACE_COLUMNS} FROM space WHERE user_id = ? ORDER BY id"
        ))
        .bind(owner.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(parse_space).collect()
    }

    async fn members(&self, space: SpaceId) -> Result<Vec<SpaceMembership>> {
        let rows = sqlx::query(
            r#"
            SELECT space_id, user_id, space_role
            FROM space_user
            WHERE space_id = ?
            ORDER BY id
            "#,
        )
        .bind(space.get())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(parse_member).collect()
    }
}

#[async_trait]
impl SpaceStore for MySqlSpaceStore {
    type Transaction = MySqlSpaceTransaction;

    async fn begin(&self) -> Result<Self::Transaction> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(MySqlSpaceTransaction { tx })
    }
}

/// A transaction over a [`MySqlSpaceStore`]. Rolled back on drop unless committed.
pub struct MySqlSpaceTransaction {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl SpaceTransaction for MySqlSpaceTransaction {
    async fn space_exists(&mut self, owner: UserId, space_type: SpaceType) -> Result<bool> {
        // A plain consistent read. Locking reads on a missing row only take
        // gap locks, which two creators can both hold and then deadlock on
        // insert. A racing insert instead waits on the first one's
        // `uk_user_type` entry and fails with a duplicate key.
        let exists = sqlx::query(
            r#"
            SELECT 1
            FROM space
            WHERE user_id = ?
              AND space_type = ?
            LIMIT 1
            "#,
        )
        .bind(owner.get())
        .bind(space_type.value())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?
        .is_some();

        Ok(exists)
    }

    async fn insert_space(&mut self, space: &NewSpace) -> Result<Option<Space>> {
        let created_at = Timestamp::now().as_second();
        let result = sqlx::query(
            r#"
            INSERT INTO space (space_name, space_level, space_type, max_size, max_count,
                               total_size, total_count, user_id, create_time)
            VALUES (?, ?, ?, ?, ?, 0, 0, ?, ?)
            "#,
        )
        .bind(&space.name)
        .bind(space.level.value())
        .bind(space.space_type.value())
        .bind(space.max_size)
        .bind(space.max_count)
        .bind(space.owner.get())
        .bind(created_at)
        .execute(&mut *self.tx)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_id(),
            Err(err) if is_conflict(&err) => {
                return Err(StorageError::Conflict(format!(
                    "space(user_id={}, space_type={})",
                    space.owner, space.space_type
                )))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };
        debug!(space_id = id, owner = %space.owner, "inserted space row");
        if id == 0 {
            return Ok(None);
        }

        let created_at = Timestamp::from_second(created_at).map_err(|e| {
            StorageError::InvalidData(format!("invalid create_time '{created_at}': {e}"))
        })?;
        Ok(Some(space.clone().into_space(SpaceId::new(id as i64), created_at)))
    }

    async fn insert_member(&mut self, member: &SpaceMembership) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO space_user (space_id, user_id, space_role, create_time)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(member.space_id.get())
        .bind(member.user_id.get())
        .bind(member.role.as_str())
        .bind(Timestamp::now().as_second())
        .execute(&mut *self.tx)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StorageError::Conflict(format!(
                "space_user(space_id={}, user_id={})",
                member.space_id, member.user_id
            ))),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }
}
