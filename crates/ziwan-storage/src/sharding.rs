use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::info;
use ziwan_core::{ProvisionError, Space, SpaceLevel, SpaceProvisioner, SpaceType};

/// Name of the picture table that holds the pictures of `space`.
///
/// Team spaces of the flagship level get a table of their own; every other
/// space shares the `picture` table.
pub fn picture_table_name(space: &Space) -> String {
    if needs_own_table(space) {
        format!("picture_{}", space.id)
    } else {
        "picture".to_string()
    }
}

fn needs_own_table(space: &Space) -> bool {
    space.space_type == SpaceType::Team && space.level == SpaceLevel::Flagship
}

/// Creates a dedicated picture table for team spaces of the flagship level.
///
/// The table is cloned from the `picture` template with
/// `CREATE TABLE IF NOT EXISTS ... LIKE`, so running the hook twice is
/// harmless. MySQL commits implicitly around DDL; install this provisioner
/// with `ProvisionMode::AfterCommit`.
#[derive(Debug, Clone)]
pub struct PictureTableProvisioner {
    pool: MySqlPool,
}

impl PictureTableProvisioner {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SpaceProvisioner for PictureTableProvisioner {
    async fn on_space_created(&self, space: &Space) -> Result<(), ProvisionError> {
        if !needs_own_table(space) {
            return Ok(());
        }

        // the table name is derived from the numeric id only
        let table = picture_table_name(space);
        sqlx::query(&format!("CREATE TABLE IF NOT EXISTS `{table}` LIKE picture"))
            .execute(&self.pool)
            .await
            .map_err(|e| ProvisionError(format!("failed to create table {table}: {e}")))?;

        info!(space_id = %space.id, table = %table, "provisioned picture table");
        Ok(())
    }
}
