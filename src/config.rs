use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONNECTION_STRING: &str = "file:relstore.db";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RelstoreConfig {
    #[serde(default)]
    pub database: DatabaseOptions,
}

/// Where and how to open the relation store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseOptions {
    pub connection_string: ConnectionString,
    /// Pool size for client/server engines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_open_conns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_timeout_ms: Option<u64>,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_STRING)
    }
}

impl DatabaseOptions {
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: ConnectionString(connection_string.into()),
            max_open_conns: None,
            busy_timeout_ms: None,
        }
    }

    pub fn busy_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.busy_timeout_ms.unwrap_or(DEFAULT_BUSY_TIMEOUT_MS))
    }
}

/// A database connection string.
///
/// `postgres://` and `postgresql://` URLs select PostgreSQL; `file:` URIs,
/// bare paths and `:memory:` select SQLite.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionString(pub String);

impl ConnectionString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_postgres(&self) -> bool {
        self.0.starts_with("postgres://") || self.0.starts_with("postgresql://")
    }

    /// In-memory SQLite: `:memory:` or an empty path, or `mode=memory` in the URI query.
    pub fn is_memory(&self) -> bool {
        if self.is_postgres() {
            return false;
        }
        let (path, query) = self.sqlite_location();
        path == ":memory:"
            || path.is_empty()
            || query.is_some_and(|q| q.split('&').any(|param| param == "mode=memory"))
    }

    /// Filesystem path of a SQLite database, `None` for in-memory or PostgreSQL.
    ///
    /// URI query parameters are not part of the path.
    pub fn sqlite_path(&self) -> Option<PathBuf> {
        if self.is_postgres() || self.is_memory() {
            return None;
        }
        let (path, _) = self.sqlite_location();
        Some(PathBuf::from(path))
    }

    fn sqlite_location(&self) -> (&str, Option<&str>) {
        let location = self.0.strip_prefix("file:").unwrap_or(&self.0);
        let location = location.strip_prefix("//").unwrap_or(location);
        match location.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (location, None),
        }
    }
}

impl std::fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("relstore.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<RelstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: RelstoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &RelstoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
