//! plusql - typed result sets from Oracle's SQL*Plus shell.
//!
//! plusql runs `sqlplus` as a child process, pipes statements into it and
//! parses the HTML it prints back into rows:
//!
//! - No Oracle client library linkage; only the `sqlplus` executable
//! - Rows as ordered column-name to value maps, serializable with serde
//! - Native error codes (`ORA-00942`, `SP2-0734`, ...) on failed statements
//! - Per-statement timeouts
//!
//! # Quick Start
//!
//! ```ignore
//! use plusql::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let driver = SqlPlus::from_env()?;
//!     let mut conn = driver.connect("scott", "tiger", ConnectTarget::Dsn("orcl".into()), false)?;
//!
//!     let rows = conn.execute("select empno, ename from emp")?;
//!     for row in &rows {
//!         let empno: i64 = row.get_named("EMPNO")?;
//!         let ename: String = row.get_named("ENAME")?;
//!         println!("{empno} {ename}");
//!     }
//!
//!     match conn.execute("select * from missing") {
//!         Err(e) if e.codes().iter().any(|c| c == "ORA-00942") => println!("no such table"),
//!         other => println!("{other:?}"),
//!     }
//!     Ok(())
//! }
//! ```

// Re-export all public types from sub-crates
pub use plusql_core::{
    ColumnInfo, ConfigError, ConnectionError, ConnectionErrorKind, Error, FromValue, QueryError,
    QueryErrorKind, Result, Row, TypeError, Value,
};

pub use plusql_shell::{
    ChildProcess, Codec, ConnectTarget, ConnectionState, ErrorCodeMatcher, Invocation, Launcher,
    ProcessOutput, ShellConfig, ShellConnection, ShellProcess, SqlPlus, SystemLauncher,
    locate_binary,
};

/// Markup parsing and statement framing, for callers that run the shell
/// themselves.
pub mod protocol {
    pub use plusql_shell::protocol::{
        DATE_FORMAT_DIRECTIVE, DELIMITER, DIRECTIVES, ERROR_EXIT_DIRECTIVE, SHELL_FLAGS,
        frame_statement, parse, terminate_statement,
    };
}

/// Prelude module for convenient imports.
///
/// ```ignore
/// use plusql::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ConnectTarget, Error, FromValue, Result, Row, ShellConfig, ShellConnection, SqlPlus, Value,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_parses_shell_output() {
        let rows = crate::protocol::parse(
            "<table><tr><th>EMPNO</th><th>ENAME</th></tr>\
             <tr><td align=\"right\">7369</td><td>SMITH</td></tr></table>",
        );
        let row: &Row = &rows[0];
        assert_eq!(row.get_named::<i64>("EMPNO").unwrap(), 7369);
        assert_eq!(row.get_named::<String>("ENAME").unwrap(), "SMITH");
        assert_eq!(row.get_by_name("ENAME"), Some(&Value::Text("SMITH".to_string())));
    }

    #[test]
    fn test_config_through_facade() {
        let config = ShellConfig::new()
            .user("scott")
            .password("tiger")
            .target(ConnectTarget::Dsn("orcl".to_string()));
        assert_eq!(config.redacted_connect_string(), "scott/XXXXX@orcl");
        let err: Error = ConnectTarget::from_parts(None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
