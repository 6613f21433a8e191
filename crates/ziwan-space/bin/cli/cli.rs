use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::{Display, Formatter};
use ziwan_core::{NameCheck, ProvisionMode};

pub const STORAGE_BACKEND_ENV: &str = "ZIWAN_SPACE_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "ZIWAN_SPACE_MYSQL_DSN";
pub const MYSQL_MAX_CONNECTIONS_ENV: &str = "ZIWAN_SPACE_MYSQL_MAX_CONNECTIONS";
pub const LOCK_WAIT_MS_ENV: &str = "ZIWAN_SPACE_LOCK_WAIT_MS";
pub const NAME_CHECK_ENV: &str = "ZIWAN_SPACE_NAME_CHECK";
pub const PROVISION_MODE_ENV: &str = "ZIWAN_SPACE_PROVISION_MODE";
pub const LOG_FORMAT_ENV: &str = "ZIWAN_SPACE_LOG_FORMAT";

pub const DEFAULT_LOCK_WAIT_MS: u64 = 5_000;
pub const DEFAULT_MYSQL_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NameCheckArg {
    Literal,
    Strict,
}

impl From<NameCheckArg> for NameCheck {
    fn from(value: NameCheckArg) -> Self {
        match value {
            NameCheckArg::Literal => NameCheck::Literal,
            NameCheckArg::Strict => NameCheck::Strict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProvisionModeArg {
    Disabled,
    WithinTransaction,
    AfterCommit,
}

impl From<ProvisionModeArg> for ProvisionMode {
    fn from(value: ProvisionModeArg) -> Self {
        match value {
            ProvisionModeArg::Disabled => ProvisionMode::Disabled,
            ProvisionModeArg::WithinTransaction => ProvisionMode::WithinTransaction,
            ProvisionModeArg::AfterCommit => ProvisionMode::AfterCommit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "ziwan-space", about = "Create and inspect picture spaces")]
pub struct CLI {
    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = MYSQL_MAX_CONNECTIONS_ENV, default_value_t = DEFAULT_MYSQL_MAX_CONNECTIONS)]
    pub mysql_max_connections: u32,

    /// Create missing tables before running the command.
    #[arg(long)]
    pub migrate: bool,

    #[arg(long, env = LOCK_WAIT_MS_ENV, default_value_t = DEFAULT_LOCK_WAIT_MS)]
    pub lock_wait_ms: u64,

    #[arg(long, env = NAME_CHECK_ENV, value_enum, default_value_t = NameCheckArg::Literal)]
    pub name_check: NameCheckArg,

    #[arg(
        long,
        env = PROVISION_MODE_ENV,
        value_enum,
        default_value_t = ProvisionModeArg::Disabled
    )]
    pub provision_mode: ProvisionModeArg,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

impl CLI {
    /// Rejects flag combinations that clap cannot express.
    pub fn check(&self) -> anyhow::Result<()> {
        if self.storage == StorageBackendArg::Mysql
            && self.provision_mode == ProvisionModeArg::WithinTransaction
        {
            anyhow::bail!(
                "picture tables are created with DDL, which commits implicitly; \
                 use --provision-mode after-commit with the mysql backend"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a space and print it as JSON.
    Create {
        #[arg(long)]
        user_id: i64,
        #[arg(long, default_value = "cli")]
        user_name: String,
        /// Act as an administrator.
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        name: Option<String>,
        /// 0 = common, 1 = professional, 2 = flagship.
        #[arg(long)]
        level: Option<i32>,
        /// 0 = private, 1 = team.
        #[arg(long = "type")]
        space_type: Option<i32>,
    },
    /// Print every space level with its quota.
    Levels,
}
