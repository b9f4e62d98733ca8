//! SQL*Plus stdin/stdout protocol.
//!
//! A round-trip pipes one statement batch into a fresh shell and reads
//! everything it prints until it exits:
//!
//! ```text
//! WHENEVER SQLERROR EXIT SQL.SQLCODE
//!
//! ALTER SESSION SET NLS_DATE_FORMAT='yyyy-mm-dd hh24:mi:ss';
//!
//! <statement>;
//! ```
//!
//! The first directive turns any SQL error into a non-zero exit status, the
//! second pins date rendering so dates parse back predictably. The output is
//! an HTML document (see [`result_set`]).

pub mod codes;
pub mod reader;
pub mod result_set;

pub use codes::ErrorCodeMatcher;
pub use reader::{MarkupReader, Token};
pub use result_set::{CellKind, MarkupState, parse};

/// Exit with the SQL error code on the first failing statement.
pub const ERROR_EXIT_DIRECTIVE: &str = "WHENEVER SQLERROR EXIT SQL.SQLCODE";

/// Render dates as `yyyy-mm-dd hh24:mi:ss`.
pub const DATE_FORMAT_DIRECTIVE: &str =
    "ALTER SESSION SET NLS_DATE_FORMAT='yyyy-mm-dd hh24:mi:ss';";

/// Directives in the order they are prepended. The last one ends up first.
pub const DIRECTIVES: [&str; 2] = [DATE_FORMAT_DIRECTIVE, ERROR_EXIT_DIRECTIVE];

/// Statement delimiter.
pub const DELIMITER: char = ';';

/// Silent, no login retry, HTML markup output.
pub const SHELL_FLAGS: [&str; 4] = ["-S", "-L", "-M", "HTML ON"];

/// Append the delimiter unless the statement already ends with one.
///
/// Trailing whitespace is kept; the delimiter goes after it.
pub fn terminate_statement(sql: &str) -> String {
    let mut sql = sql.to_string();
    if !sql.trim_end().ends_with(DELIMITER) {
        sql.push(DELIMITER);
    }
    sql
}

/// Frame a statement for the wire: terminate it, then prepend each directive
/// followed by a blank line.
///
/// Framing an already framed batch is harmless; the directives simply run
/// twice.
pub fn frame_statement(sql: &str) -> String {
    DIRECTIVES
        .iter()
        .fold(terminate_statement(sql), |batch, directive| {
            format!("{directive}\n\n{batch}")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminate_statement() {
        assert_eq!(terminate_statement("select 1 from dual"), "select 1 from dual;");
        assert_eq!(terminate_statement("select 1 from dual;"), "select 1 from dual;");
        assert_eq!(
            terminate_statement("select 1 from dual;  \n"),
            "select 1 from dual;  \n"
        );
        assert_eq!(terminate_statement("commit \n"), "commit \n;");
    }

    #[test]
    fn test_frame_statement() {
        let framed = frame_statement("select 1 from dual");
        assert_eq!(
            framed,
            "WHENEVER SQLERROR EXIT SQL.SQLCODE\n\n\
             ALTER SESSION SET NLS_DATE_FORMAT='yyyy-mm-dd hh24:mi:ss';\n\n\
             select 1 from dual;"
        );
        assert!(framed.starts_with(ERROR_EXIT_DIRECTIVE));
        assert!(framed.ends_with(';'));
    }

    #[test]
    fn test_reframing_keeps_statement_and_order() {
        let once = frame_statement("select 1 from dual");
        let twice = frame_statement(&once);

        assert!(twice.starts_with(ERROR_EXIT_DIRECTIVE));
        assert!(twice.ends_with(&once));
        assert_eq!(twice.matches(ERROR_EXIT_DIRECTIVE).count(), 2);
        assert_eq!(twice.matches(DATE_FORMAT_DIRECTIVE).count(), 2);
        assert_eq!(twice.matches("select 1 from dual;").count(), 1);
    }
}
