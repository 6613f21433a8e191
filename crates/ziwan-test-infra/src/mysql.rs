use crate::{Result, TestInfraError};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers::{ContainerAsync, GenericImage};
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct MysqlConfig {
    #[builder(default = "ziwan".to_string())]
    database: String,
    #[builder(default = "ziwan".to_string())]
    username: String,
    #[builder(default = "ziwan".to_string())]
    password: String,
    /// How often to retry connecting while the server finishes starting.
    #[builder(default = 20)]
    connect_attempts: u32,
}

/// Test fixture for a disposable MySQL server.
///
/// The container is removed when the fixture is dropped.
pub struct MySqlServer {
    container: ContainerAsync<GenericImage>,
    config: MysqlConfig,
}

impl MySqlServer {
    /// Starts a MySQL container suitable for integration tests.
    pub async fn new(config: MysqlConfig) -> Result<Self> {
        let container = GenericImage::new("mysql", "8.4")
            .with_exposed_port(3306_u16.tcp())
            .with_wait_for(WaitFor::message_on_stderr("ready for connections"))
            .with_env_var("MYSQL_DATABASE", config.database.as_str())
            .with_env_var("MYSQL_USER", config.username.as_str())
            .with_env_var("MYSQL_PASSWORD", config.password.as_str())
            .with_env_var("MYSQL_ROOT_PASSWORD", "root")
            .start()
            .await?;

        Ok(Self { container, config })
    }

    pub async fn database_url(&self) -> Result<String> {
        let host = self.container.get_host().await?;
        let port = self.container.get_host_port_ipv4(3306).await?;
        Ok(format!(
            "mysql://{}:{}@{}:{}/{}",
            self.config.username, self.config.password, host, port, self.config.database
        ))
    }

    /// Opens a pool, retrying while the server is still initializing.
    ///
    /// The "ready for connections" log line is printed once by the bootstrap
    /// server before the real one starts, so the first attempts may fail.
    pub async fn pool(&self, max_connections: u32) -> Result<MySqlPool> {
        let url = self.database_url().await?;
        let attempts = self.config.connect_attempts.max(1);
        let mut last_error = None;

        for _ in 0..attempts {
            match MySqlPoolOptions::new()
                .max_connections(max_connections)
                .connect(&url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(err) => {
                    last_error = Some(err);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            }
        }

        Err(TestInfraError::NotReady {
            attempts,
            last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Runs each statement against `pool`, in order.
    pub async fn apply_schema(pool: &MySqlPool, statements: &[&str]) -> Result<()> {
        for statement in statements {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }

    /// Returns the underlying container reference.
    pub fn container(&self) -> &ContainerAsync<GenericImage> {
        &self.container
    }
}
