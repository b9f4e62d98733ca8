//! SQL*Plus driver for plusql.
//!
//! This crate drives Oracle's `sqlplus` command-line shell as a child
//! process instead of speaking the Oracle Net protocol. It provides:
//!
//! - Statement framing (error-exit and date-format directives)
//! - An HTML result-set parser for `-M "HTML ON"` output
//! - Native error-code extraction (`ORA-`, `SP2-`, `TNS-`)
//! - Client character set handling driven by `NLS_LANG`
//! - Per-statement timeouts and transparent process respawn
//!
//! # Example
//!
//! ```rust,ignore
//! use plusql_shell::{ConnectTarget, SqlPlus};
//!
//! let driver = SqlPlus::from_env()?;
//! let mut conn = driver.connect("scott", "tiger", ConnectTarget::Dsn("orcl".into()), false)?;
//!
//! for row in conn.execute("select empno, ename from emp")? {
//!     println!("{}", row.to_json());
//! }
//! ```

pub mod config;
pub mod connection;
pub mod driver;
pub mod encoding;
pub mod process;
pub mod protocol;

pub use config::{ConnectTarget, ShellConfig};
pub use connection::{ConnectionState, ShellConnection};
pub use driver::{SqlPlus, locate_binary};
pub use encoding::Codec;
pub use process::{ChildProcess, Invocation, Launcher, ProcessOutput, ShellProcess, SystemLauncher};
pub use protocol::ErrorCodeMatcher;
