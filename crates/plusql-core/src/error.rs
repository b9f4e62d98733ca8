//! Error types for plusql operations.

use std::fmt;
use std::time::Duration;

/// The primary error type for all plusql operations.
#[derive(Debug)]
pub enum Error {
    /// Session-related errors (spawn, dead process, closed session)
    Connection(ConnectionError),
    /// Statement execution errors reported by the shell
    Query(QueryError),
    /// Typed accessor errors
    Type(TypeError),
    /// Configuration errors
    Config(ConfigError),
    /// I/O errors
    Io(std::io::Error),
    /// The round-trip exceeded its deadline
    Timeout(Duration),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to spawn the shell process
    Connect,
    /// Process pipes broke during a round-trip
    Disconnected,
    /// The session was explicitly closed
    Closed,
}

/// An error reported by the shell for a statement batch.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    /// Native error codes in order of appearance, e.g. `ORA-00904`.
    pub codes: Vec<String>,
    pub message: String,
    pub sql: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// One or more native error codes were recognized in the output
    NativeCodes,
    /// Failure status without a recognizable code; message holds the raw output
    Unrecognized,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Did the round-trip exceed its deadline?
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }

    /// Is this an error that leaves the session needing a fresh process?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(c) => matches!(
                c.kind,
                ConnectionErrorKind::Connect | ConnectionErrorKind::Disconnected
            ),
            Error::Io(_) | Error::Timeout(_) => true,
            _ => false,
        }
    }

    /// Native error codes carried by a statement error, empty otherwise.
    pub fn codes(&self) -> &[String] {
        match self {
            Error::Query(q) => &q.codes,
            _ => &[],
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl QueryError {
    /// Does the code list contain the given code (e.g. `"ORA-00942"`)?
    pub fn has_code(&self, code: &str) -> bool {
        self.codes.iter().any(|c| c == code)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => write!(f, "Execute Sql Error {}", e),
            Error::Type(e) => write!(f, "Type error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Timeout(d) => write!(f, "TimedOut over[{} second]", d.as_secs_f64()),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            QueryErrorKind::NativeCodes => write!(f, "[{}]", self.codes.join(", ")),
            QueryErrorKind::Unrecognized => write!(f, "{}", self.message),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for plusql operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_code_helpers() {
        let query = QueryError {
            kind: QueryErrorKind::NativeCodes,
            codes: vec!["ORA-00904".to_string(), "SP2-0042".to_string()],
            message: "ORA-00904: invalid identifier".to_string(),
            sql: Some("select x from dual;".to_string()),
        };

        assert!(query.has_code("ORA-00904"));
        assert!(!query.has_code("ORA-00942"));

        let err = Error::Query(query);
        assert_eq!(err.codes(), ["ORA-00904", "SP2-0042"]);
        assert_eq!(err.sql(), Some("select x from dual;"));
        assert_eq!(
            err.to_string(),
            "Execute Sql Error [ORA-00904, SP2-0042]"
        );
    }

    #[test]
    fn unrecognized_error_displays_raw_text() {
        let err = Error::Query(QueryError {
            kind: QueryErrorKind::Unrecognized,
            codes: Vec::new(),
            message: "Segmentation fault".to_string(),
            sql: None,
        });
        assert!(err.codes().is_empty());
        assert_eq!(err.to_string(), "Execute Sql Error Segmentation fault");
    }

    #[test]
    fn timeout_and_connection_flags() {
        let timeout = Error::Timeout(Duration::from_millis(1500));
        assert!(timeout.is_timeout());
        assert!(timeout.is_connection_error());
        assert_eq!(timeout.to_string(), "TimedOut over[1.5 second]");

        let dead = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: "broken pipe".to_string(),
            source: None,
        });
        assert!(dead.is_connection_error());
        assert!(!dead.is_timeout());

        let closed = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Closed,
            message: "session closed".to_string(),
            source: None,
        });
        assert!(!closed.is_connection_error());
    }

    #[test]
    fn io_error_is_the_source() {
        let err = Error::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "I/O error: pipe closed");
    }
}
