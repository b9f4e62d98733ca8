//! Shell session configuration.
//!
//! Holds everything needed to start SQL*Plus: the binary, credentials, the
//! connect target and the child environment. The environment is explicit; the
//! driver never reads or mutates the parent process environment.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use plusql_core::error::ConfigError;
use plusql_core::{Error, Result};

use crate::encoding::Codec;
use crate::process::Invocation;
use crate::protocol::{ErrorCodeMatcher, SHELL_FLAGS};

/// Client character set used when none is configured.
pub const DEFAULT_CLIENT_ENCODING: &str = "AL32UTF8";

/// Language and territory half of `NLS_LANG`.
pub const NLS_LANG_PREFIX: &str = "American_America";

/// Stand-in for the password wherever a connect string is shown.
pub const PASSWORD_MASK: &str = "XXXXX";

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectTarget {
    /// A net service name or easy-connect string, appended as `@dsn`
    Dsn(String),
    /// A local instance, selected through `ORACLE_SID`
    Sid(String),
}

impl ConnectTarget {
    /// Build a target from optional parts; exactly one must be given.
    pub fn from_parts(dsn: Option<&str>, sid: Option<&str>) -> Result<Self> {
        match (dsn, sid) {
            (Some(dsn), None) => Ok(ConnectTarget::Dsn(dsn.to_string())),
            (None, Some(sid)) => Ok(ConnectTarget::Sid(sid.to_string())),
            (None, None) => Err(config_error("No DSN or SID Settings.")),
            (Some(_), Some(_)) => Err(config_error("DSN and SID Both are specified.")),
        }
    }

    pub fn dsn(&self) -> Option<&str> {
        match self {
            ConnectTarget::Dsn(dsn) => Some(dsn),
            ConnectTarget::Sid(_) => None,
        }
    }

    pub fn sid(&self) -> Option<&str> {
        match self {
            ConnectTarget::Sid(sid) => Some(sid),
            ConnectTarget::Dsn(_) => None,
        }
    }
}

/// Shell session configuration.
#[derive(Clone)]
pub struct ShellConfig {
    /// Path to the sqlplus executable
    pub binary: PathBuf,
    /// Oracle installation directory, exported as `ORACLE_HOME`
    pub oracle_home: Option<PathBuf>,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: Option<String>,
    /// Connect target; required before connecting
    pub target: Option<ConnectTarget>,
    /// Connect with the SYSDBA privilege
    pub sysdba: bool,
    /// Client character set (default: AL32UTF8)
    pub client_encoding: String,
    /// Base child environment
    pub environment: HashMap<String, String>,
    /// Deadline for each round-trip (default: none)
    pub statement_timeout: Option<Duration>,
    /// Native error-code prefixes to recognize
    pub error_codes: ErrorCodeMatcher,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("sqlplus"),
            oracle_home: None,
            user: String::new(),
            password: None,
            target: None,
            sysdba: false,
            client_encoding: DEFAULT_CLIENT_ENCODING.to_string(),
            environment: HashMap::new(),
            statement_timeout: None,
            error_codes: ErrorCodeMatcher::default(),
        }
    }
}

impl ShellConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sqlplus executable.
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Set the Oracle home.
    pub fn oracle_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.oracle_home = Some(home.into());
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connect target.
    pub fn target(mut self, target: ConnectTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Connect through a net service name.
    pub fn dsn(self, dsn: impl Into<String>) -> Self {
        self.target(ConnectTarget::Dsn(dsn.into()))
    }

    /// Connect to a local instance.
    pub fn sid(self, sid: impl Into<String>) -> Self {
        self.target(ConnectTarget::Sid(sid.into()))
    }

    /// Enable or disable `as sysdba`.
    pub fn sysdba(mut self, enabled: bool) -> Self {
        self.sysdba = enabled;
        self
    }

    /// Set the client character set, e.g. `JA16SJIS`.
    pub fn client_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.client_encoding = encoding.into();
        self
    }

    /// Replace the base child environment.
    pub fn environment(mut self, environment: HashMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Set one base environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set the default round-trip deadline.
    pub fn statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = Some(timeout);
        self
    }

    /// Set the recognized error-code prefixes.
    pub fn error_codes(mut self, matcher: ErrorCodeMatcher) -> Self {
        self.error_codes = matcher;
        self
    }

    /// Check that the configuration can start a session.
    pub fn validate(&self) -> Result<()> {
        if self.target.is_none() {
            return Err(config_error("No DSN or SID Settings."));
        }
        if self.user.is_empty() {
            return Err(config_error("No user specified."));
        }
        Ok(())
    }

    /// `user/password[@dsn][ as sysdba]`
    pub fn connect_string(&self) -> String {
        self.render_connect_string(self.password.as_deref().unwrap_or_default())
    }

    /// The connect string with the password masked. Safe to log.
    pub fn redacted_connect_string(&self) -> String {
        self.render_connect_string(PASSWORD_MASK)
    }

    fn render_connect_string(&self, password: &str) -> String {
        let mut connect = format!("{}/{}", self.user, password);
        if let Some(ConnectTarget::Dsn(dsn)) = &self.target {
            connect.push('@');
            connect.push_str(dsn);
        }
        if self.sysdba {
            connect.push_str(" as sysdba");
        }
        connect
    }

    /// `American_America.<client encoding>`
    pub fn nls_lang(&self) -> String {
        format!("{NLS_LANG_PREFIX}.{}", self.client_encoding)
    }

    /// The complete child environment: the base map plus `ORACLE_HOME`,
    /// `NLS_LANG` and, for SID targets, `ORACLE_SID`.
    pub fn child_environment(&self) -> HashMap<String, String> {
        let mut env = self.environment.clone();
        if let Some(home) = &self.oracle_home {
            env.insert("ORACLE_HOME".to_string(), home.display().to_string());
        }
        env.insert("NLS_LANG".to_string(), self.nls_lang());
        if let Some(ConnectTarget::Sid(sid)) = &self.target {
            env.insert("ORACLE_SID".to_string(), sid.clone());
        }
        env
    }

    /// Codec for the configured client character set.
    pub fn codec(&self) -> Codec {
        Codec::resolve(Some(&self.nls_lang()))
    }

    /// Program, arguments and environment for one shell.
    pub fn invocation(&self) -> Invocation {
        let mut args: Vec<String> = SHELL_FLAGS.iter().map(|flag| (*flag).to_string()).collect();
        args.push(self.connect_string());
        Invocation {
            program: self.binary.clone(),
            args,
            env: self.child_environment(),
        }
    }
}

impl std::fmt::Debug for ShellConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellConfig")
            .field("binary", &self.binary)
            .field("oracle_home", &self.oracle_home)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| PASSWORD_MASK))
            .field("target", &self.target)
            .field("sysdba", &self.sysdba)
            .field("client_encoding", &self.client_encoding)
            .field("env_vars", &self.environment.len())
            .field("statement_timeout", &self.statement_timeout)
            .finish_non_exhaustive()
    }
}

fn config_error(message: &str) -> Error {
    Error::Config(ConfigError {
        message: message.to_string(),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scott() -> ShellConfig {
        ShellConfig::new()
            .binary("/opt/oracle/bin/sqlplus")
            .oracle_home("/opt/oracle")
            .user("scott")
            .password("tiger")
    }

    #[test]
    fn test_config_builder() {
        let config = scott()
            .dsn("orcl")
            .client_encoding("JA16SJIS")
            .statement_timeout(Duration::from_secs(5))
            .env("PATH", "/usr/bin");

        assert_eq!(config.binary, PathBuf::from("/opt/oracle/bin/sqlplus"));
        assert_eq!(config.user, "scott");
        assert_eq!(config.password.as_deref(), Some("tiger"));
        assert_eq!(config.target, Some(ConnectTarget::Dsn("orcl".to_string())));
        assert_eq!(config.statement_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.codec(), Codec::ShiftJis);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config() {
        let config = ShellConfig::default();
        assert_eq!(config.client_encoding, DEFAULT_CLIENT_ENCODING);
        assert_eq!(config.codec(), Codec::Utf8);
        assert!(!config.sysdba);
        assert!(config.statement_timeout.is_none());
        assert_eq!(config.error_codes.prefixes(), ["ORA", "SP2", "TNS"]);
    }

    #[test]
    fn test_target_from_parts() {
        assert_eq!(
            ConnectTarget::from_parts(Some("orcl"), None).unwrap(),
            ConnectTarget::Dsn("orcl".to_string())
        );
        assert_eq!(
            ConnectTarget::from_parts(None, Some("ORCL")).unwrap().sid(),
            Some("ORCL")
        );

        let neither = ConnectTarget::from_parts(None, None).unwrap_err();
        assert_eq!(neither.to_string(), "Configuration error: No DSN or SID Settings.");
        let both = ConnectTarget::from_parts(Some("orcl"), Some("ORCL")).unwrap_err();
        assert_eq!(both.to_string(), "Configuration error: DSN and SID Both are specified.");
    }

    #[test]
    fn test_validate() {
        assert!(scott().validate().is_err());
        assert!(ShellConfig::new().dsn("orcl").validate().is_err());
        assert!(scott().sid("ORCL").validate().is_ok());
    }

    #[test]
    fn test_connect_string() {
        assert_eq!(scott().dsn("orcl").connect_string(), "scott/tiger@orcl");
        assert_eq!(scott().sid("ORCL").connect_string(), "scott/tiger");
        assert_eq!(
            scott().dsn("//db:1521/pdb").sysdba(true).connect_string(),
            "scott/tiger@//db:1521/pdb as sysdba"
        );
    }

    #[test]
    fn test_redacted_connect_string() {
        let config = scott().dsn("orcl").sysdba(true);
        assert_eq!(config.redacted_connect_string(), "scott/XXXXX@orcl as sysdba");

        // The mask is positional, so a password equal to the user name stays hidden.
        let same = ShellConfig::new().user("tiger").password("tiger").dsn("tiger");
        assert_eq!(same.redacted_connect_string(), "tiger/XXXXX@tiger");
    }

    #[test]
    fn test_child_environment() {
        let env = scott().sid("ORCL").env("PATH", "/usr/bin").child_environment();
        assert_eq!(env["ORACLE_HOME"], "/opt/oracle");
        assert_eq!(env["NLS_LANG"], "American_America.AL32UTF8");
        assert_eq!(env["ORACLE_SID"], "ORCL");
        assert_eq!(env["PATH"], "/usr/bin");

        let env = scott().dsn("orcl").env("ORACLE_SID", "STALE").child_environment();
        assert_eq!(env["ORACLE_SID"], "STALE");
        let env = scott().dsn("orcl").child_environment();
        assert!(!env.contains_key("ORACLE_SID"));
    }

    #[test]
    fn test_nls_lang_overrides_base() {
        let env = scott()
            .dsn("orcl")
            .env("NLS_LANG", "Japanese_Japan.JA16EUC")
            .client_encoding("UTF8")
            .child_environment();
        assert_eq!(env["NLS_LANG"], "American_America.UTF8");
    }

    #[test]
    fn test_invocation() {
        let invocation = scott().dsn("orcl").invocation();
        assert_eq!(invocation.program, PathBuf::from("/opt/oracle/bin/sqlplus"));
        assert_eq!(
            invocation.args,
            ["-S", "-L", "-M", "HTML ON", "scott/tiger@orcl"]
        );
        assert_eq!(invocation.env["NLS_LANG"], "American_America.AL32UTF8");
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", scott().dsn("orcl"));
        assert!(debug.contains("scott"));
        assert!(debug.contains("XXXXX"));
        assert!(!debug.contains("tiger"));
    }
}
