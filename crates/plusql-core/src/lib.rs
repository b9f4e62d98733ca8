//! Core types for plusql.
//!
//! This crate provides the shared vocabulary of the driver crates:
//!
//! - `Error` taxonomy for spawn failures, timeouts and statement errors
//! - `Value` for a single decoded cell
//! - `Row` for an ordered column-name to value mapping

pub mod error;
pub mod row;
pub mod value;

pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result,
    TypeError,
};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
