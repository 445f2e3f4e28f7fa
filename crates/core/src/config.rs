use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::fetch::FetchMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverTag {
    Mysql,
    Postgres,
}

impl DriverTag {
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Mysql => 3306,
            Self::Postgres => 5432,
        }
    }

    #[must_use]
    pub fn default_charset(self) -> &'static str {
        match self {
            Self::Mysql => "utf8mb4",
            Self::Postgres => "UTF8",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub ca_path: Option<String>,
    pub client_cert_path: Option<String>,
    pub client_key_path: Option<String>,
    pub verify: bool,
    /// PostgreSQL-specific `sslmode` value (`disable`, `require`, `verify-full`, ...).
    pub sslmode: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self { ca_path: None, client_cert_path: None, client_key_path: None, verify: true, sslmode: None }
    }
}

/// Structured database connection descriptor (spec.md §6). A JSON or
/// other structured-file loader may populate this; the loader itself is
/// outside the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub driver: DriverTag,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub charset: String,
    pub fetch_mode: FetchMode,
    pub tls: TlsOptions,
}

impl ConnectionDescriptor {
    #[must_use]
    pub fn new(driver: DriverTag, host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            driver,
            host: host.into(),
            port: driver.default_port(),
            username: String::new(),
            password: String::new(),
            database: database.into(),
            charset: driver.default_charset().to_string(),
            fetch_mode: FetchMode::Associative,
            tls: TlsOptions::default(),
        }
    }

    /// Reads `DB_DRIVER`, `DB_HOST`, `DB_USERNAME`, `DB_PASSWORD`,
    /// `DB_DATABASE`, `DB_CHARSET`, `DB_SSL_*` (spec.md §6). Returns
    /// `None` if `DB_DRIVER`/`DB_DATABASE` are unset or unrecognized;
    /// this is a convenience, not the config-file loader (out of scope).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let driver = match env::var("DB_DRIVER").ok()?.to_ascii_lowercase().as_str() {
            "mysql" => DriverTag::Mysql,
            "postgres" | "postgresql" | "pgsql" => DriverTag::Postgres,
            _ => return None,
        };
        let database = env::var("DB_DATABASE").ok()?;
        let host = env::var("DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mut descriptor = Self::new(driver, host, database);
        if let Ok(username) = env::var("DB_USERNAME") {
            descriptor.username = username;
        }
        if let Ok(password) = env::var("DB_PASSWORD") {
            descriptor.password = password;
        }
        if let Ok(charset) = env::var("DB_CHARSET") {
            descriptor.charset = charset;
        }
        descriptor.tls.verify = env::var("DB_SSL_VERIFY").map(|v| v != "0").unwrap_or(true);
        if env::var("DB_SSL_ENABLE").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")) {
            descriptor.tls.ca_path = env::var("DB_SSL_CA").ok();
            descriptor.tls.client_cert_path = env::var("DB_SSL_CERT").ok();
            descriptor.tls.client_key_path = env::var("DB_SSL_KEY").ok();
        }
        Some(descriptor)
    }

    /// Parses `DB_READ_HOSTS` (comma-separated) into read-replica
    /// descriptors sharing this descriptor's credentials and database.
    #[must_use]
    pub fn read_replicas_from_env(&self) -> Vec<Self> {
        env::var("DB_READ_HOSTS")
            .ok()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|host| !host.is_empty())
                    .map(|host| Self { host: host.to_string(), ..self.clone() })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBounds {
    pub min_connections: usize,
    pub max_connections: usize,
}

impl Default for PoolBounds {
    fn default() -> Self {
        Self { min_connections: 1, max_connections: 10 }
    }
}

/// Pool descriptor (spec.md §6): one write, zero or more reads, bounds,
/// timeouts, and health-check configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDescriptor {
    pub write: ConnectionDescriptor,
    pub read: Vec<ConnectionDescriptor>,
    pub bounds: PoolBounds,
    pub connection_timeout: Duration,
    pub health_checks: bool,
    pub health_check_interval: Duration,
}

impl PoolDescriptor {
    #[must_use]
    pub fn single(write: ConnectionDescriptor) -> Self {
        Self {
            write,
            read: Vec::new(),
            bounds: PoolBounds::default(),
            connection_timeout: Duration::from_secs(5),
            health_checks: true,
            health_check_interval: Duration::from_secs(30),
        }
    }
}

/// Free-form extra settings a loader may stash alongside a descriptor
/// (e.g. server version overrides used in tests), mirroring the
/// dialect crates' `ConnectionConfig::extra` escape hatch.
pub type ExtraSettings = BTreeMap<String, String>;
