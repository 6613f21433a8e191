mod cli;

use crate::cli::{Command, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use ziwan_core::{
    CreateSpaceRequest, LevelQuota, NoopProvisioner, RoleAuthorizer, SpaceLevel,
    SpaceManager, SpaceProvisioner, SpaceStore, User, UserId, UserRole,
};
use ziwan_space::{ServiceConfig, SpaceService};
use ziwan_storage::{InMemorySpaceStore, MySqlOptions, MySqlSpaceStore, PictureTableProvisioner};

#[derive(Serialize)]
struct LevelView {
    level: SpaceLevel,
    value: i32,
    #[serde(flatten)]
    quota: LevelQuota,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;
    config.check()?;
    init_tracing(config.log_format);

    info!(
        storage_backend = %config.storage,
        lock_wait_ms = config.lock_wait_ms,
        "starting ziwan-space"
    );

    let service_config = ServiceConfig::builder()
        .lock_wait(Duration::from_millis(config.lock_wait_ms))
        .name_check(config.name_check.into())
        .provision_mode(config.provision_mode.into())
        .build();

    match config.storage {
        StorageBackendArg::InMemory => {
            run(
                InMemorySpaceStore::new(),
                NoopProvisioner,
                service_config,
                config.command,
            )
            .await
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .context("mysql dsn is required when storage backend is mysql")?;
            let options = MySqlOptions {
                max_connections: config.mysql_max_connections,
                ..MySqlOptions::default()
            };
            let store = MySqlSpaceStore::connect_with(&dsn, options)
                .await
                .context("failed to connect to mysql")?;
            if config.migrate {
                store.migrate().await.context("failed to create tables")?;
            }
            let provisioner = PictureTableProvisioner::new(store.pool().clone());
            run(store, provisioner, service_config, config.command).await
        }
    }
}

fn init_tracing(format: LogFormatArg) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormatArg::Text => builder.init(),
        LogFormatArg::Json => builder.json().init(),
    }
}

async fn run<S: SpaceStore, P: SpaceProvisioner>(
    store: S,
    provisioner: P,
    config: ServiceConfig,
    command: Command,
) -> anyhow::Result<()> {
    let service = SpaceService::with_provisioner(store, RoleAuthorizer, provisioner, config);

    match command {
        Command::Create {
            user_id,
            user_name,
            admin,
            name,
            level,
            space_type,
        } => {
            let role = if admin { UserRole::Admin } else { UserRole::User };
            let user = User::new(UserId::new(user_id), user_name, role);
            let request = CreateSpaceRequest {
                name,
                level,
                space_type,
            };

            let id = service
                .create_space(request, &user)
                .await
                .map_err(|e| anyhow::anyhow!("[{}] {e}", e.code().value()))?;
            let space = service.get_space(id, &user).await?;
            println!("{}", serde_json::to_string_pretty(&space)?);
        }
        Command::Levels => {
            let levels: Vec<LevelView> = service
                .levels()
                .into_iter()
                .map(|(level, quota)| LevelView {
                    level,
                    value: level.value(),
                    quota,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&levels)?);
        }
    }

    Ok(())
}
