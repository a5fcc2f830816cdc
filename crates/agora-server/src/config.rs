use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use agora_store::{StorageKind, StoreOptions};

use crate::error::{ServerError, ServerResult};

/// Environment variable consulted when no `--config` path is given.
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

/// Deployment environment. Selects the log format and default level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Env {
    #[default]
    Local,
    Dev,
    Prod,
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Local => "local",
            Self::Dev => "dev",
            Self::Prod => "prod",
        };
        f.write_str(s)
    }
}

impl FromStr for Env {
    type Err = ServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(ServerError::Config(format!("unknown env: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub enforce_references: bool,
}

impl StorageConfig {
    pub fn options(&self) -> StoreOptions {
        StoreOptions {
            enforce_references: self.enforce_references,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpServerConfig {
    pub address: SocketAddr,
    /// Upper bound on producing a response, in seconds.
    pub timeout_secs: u64,
    /// Longest a live stream may stay silent before a keep-alive is sent.
    pub idle_timeout_secs: u64,
}

impl HttpServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            timeout_secs: 5,
            idle_timeout_secs: 60,
        }
    }
}

/// Top-level service configuration, read from TOML.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub env: Env,
    pub storage: StorageConfig,
    pub http_server: HttpServerConfig,
}

impl ServiceConfig {
    pub fn from_toml_str(source: &str) -> ServerResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path`.
    pub fn load(path: &Path) -> ServerResult<Self> {
        if !path.exists() {
            return Err(ServerError::Config(format!(
                "config file does not exist: {}",
                path.display()
            )));
        }
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Load from `explicit`, falling back to `$CONFIG_PATH`.
    pub fn resolve(explicit: Option<&Path>) -> ServerResult<Self> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let path = Self::resolve_path(explicit, from_env)?;
        Self::load(&path)
    }

    fn resolve_path(
        explicit: Option<&Path>,
        from_env: Option<PathBuf>,
    ) -> ServerResult<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or(from_env.filter(|p| !p.as_os_str().is_empty()))
            .ok_or_else(|| {
                ServerError::Config(format!(
                    "no config path: pass --config or set {CONFIG_PATH_ENV}"
                ))
            })
    }

    fn validate(&self) -> ServerResult<()> {
        if self.http_server.timeout_secs == 0 {
            return Err(ServerError::Config(
                "http_server.timeout_secs must be positive".into(),
            ));
        }
        if self.http_server.idle_timeout_secs == 0 {
            return Err(ServerError::Config(
                "http_server.idle_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
