//! Driver factory.
//!
//! [`SqlPlus`] locates the sqlplus executable under an Oracle home and builds
//! sessions for it, each with its own child environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use plusql_core::error::ConfigError;
use plusql_core::{Error, Result};

use crate::config::{ConnectTarget, DEFAULT_CLIENT_ENCODING, ShellConfig};
use crate::connection::ShellConnection;
use crate::process::{Launcher, SystemLauncher};

#[cfg(windows)]
const BINARY_NAME: &str = "sqlplus.exe";
#[cfg(not(windows))]
const BINARY_NAME: &str = "sqlplus";

/// Factory for SQL*Plus sessions.
#[derive(Clone)]
pub struct SqlPlus {
    oracle_home: PathBuf,
    binary: PathBuf,
    client_encoding: String,
    environment: HashMap<String, String>,
}

impl std::fmt::Debug for SqlPlus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlPlus")
            .field("oracle_home", &self.oracle_home)
            .field("binary", &self.binary)
            .field("client_encoding", &self.client_encoding)
            .finish_non_exhaustive()
    }
}

impl SqlPlus {
    /// Use `ORACLE_HOME` from the current environment.
    pub fn from_env() -> Result<Self> {
        Self::with_environment(None, current_environment())
    }

    /// Use an explicit Oracle home; the current environment is still the base
    /// for child processes.
    pub fn new(oracle_home: impl Into<PathBuf>) -> Result<Self> {
        Self::with_environment(Some(oracle_home.into()), current_environment())
    }

    /// Build a factory from an explicit environment.
    ///
    /// `oracle_home` wins over the `ORACLE_HOME` entry of `environment`.
    pub fn with_environment(
        oracle_home: Option<PathBuf>,
        environment: HashMap<String, String>,
    ) -> Result<Self> {
        let oracle_home = oracle_home
            .or_else(|| {
                environment
                    .get("ORACLE_HOME")
                    .filter(|home| !home.is_empty())
                    .map(PathBuf::from)
            })
            .ok_or_else(|| config_error("No OracleHome Settings.".to_string()))?;
        let binary = locate_binary(&oracle_home)?;
        tracing::debug!(binary = %binary.display(), "Located sqlplus");

        Ok(Self {
            oracle_home,
            binary,
            client_encoding: DEFAULT_CLIENT_ENCODING.to_string(),
            environment,
        })
    }

    /// Set the client character set for sessions built from now on.
    pub fn client_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.client_encoding = encoding.into();
        self
    }

    pub fn oracle_home(&self) -> &Path {
        &self.oracle_home
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// A session configuration for these credentials; adjust it before
    /// passing it to [`ShellConnection::connect`].
    pub fn config(
        &self,
        user: impl Into<String>,
        password: impl Into<String>,
        target: ConnectTarget,
    ) -> ShellConfig {
        ShellConfig::new()
            .binary(self.binary.clone())
            .oracle_home(self.oracle_home.clone())
            .environment(self.environment.clone())
            .client_encoding(self.client_encoding.clone())
            .user(user)
            .password(password)
            .target(target)
    }

    /// Open a session and spawn its first shell.
    #[allow(clippy::result_large_err)]
    pub fn connect(
        &self,
        user: impl Into<String>,
        password: impl Into<String>,
        target: ConnectTarget,
        sysdba: bool,
    ) -> Result<ShellConnection> {
        self.connect_with(SystemLauncher, user, password, target, sysdba)
    }

    /// Like [`SqlPlus::connect`], with a custom launcher.
    #[allow(clippy::result_large_err)]
    pub fn connect_with<L: Launcher>(
        &self,
        launcher: L,
        user: impl Into<String>,
        password: impl Into<String>,
        target: ConnectTarget,
        sysdba: bool,
    ) -> Result<ShellConnection<L>> {
        let config = self.config(user, password, target).sysdba(sysdba);
        ShellConnection::connect_with(launcher, config)
    }
}

/// Find the sqlplus executable: `<home>/bin/sqlplus`, then `<home>/sqlplus`
/// (the layout of Instant Client).
pub fn locate_binary(oracle_home: &Path) -> Result<PathBuf> {
    let candidates = [
        oracle_home.join("bin").join(BINARY_NAME),
        oracle_home.join(BINARY_NAME),
    ];
    candidates
        .iter()
        .find(|path| path.is_file())
        .cloned()
        .ok_or_else(|| {
            config_error(format!(
                "{} is not a valid sqlplus path.",
                candidates[1].display()
            ))
        })
}

fn current_environment() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

fn config_error(message: String) -> Error {
    Error::Config(ConfigError {
        message,
        source: None,
    })
}
