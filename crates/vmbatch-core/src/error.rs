use std::num::ParseIntError;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::remote::RemoteError;
use crate::domain::request::RecordField;

/// Core error type for the vmbatch runtime
///
/// Everything in here is structural: it stops the batch before any
/// provisioning starts. Per-record failures never surface as a `CoreError`,
/// they travel as [`crate::WorkflowError`] inside a [`crate::BatchResult`].
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The input file could not be turned into provisioning requests
    #[error("Input error: {0}")]
    InputError(#[from] ParseError),

    /// The management endpoint could not be reached or refused the session
    #[error("Remote error: {0}")]
    RemoteError(#[from] RemoteError),
}

/// Structural failure while reading the input records
///
/// `record` is the 1-based record number, `line` the physical line the
/// record starts on.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The input file could not be opened
    #[error("failed to open input file {}: {source}", path.display())]
    Open {
        /// Path that was opened
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader rejected the record (I/O or encoding failure)
    #[error("failed to read record {record} (line {line}): {source}")]
    Read {
        /// 1-based record number
        record: usize,
        /// Source line, 0 when unknown
        line: u64,
        /// Underlying reader error
        #[source]
        source: csv::Error,
    },

    /// The record does not have the fixed number of fields
    #[error("invalid number of fields in record {record} (line {line}): expected {expected}, found {found}")]
    FieldCount {
        /// 1-based record number
        record: usize,
        /// Source line
        line: u64,
        /// Required field count
        expected: usize,
        /// Field count actually present
        found: usize,
    },

    /// An integer-typed field is not a non-negative base-10 integer
    #[error("failed to parse {field} in record {record} (line {line}): {value:?}: {source}")]
    InvalidInteger {
        /// 1-based record number
        record: usize,
        /// Source line
        line: u64,
        /// The offending field
        field: RecordField,
        /// Raw text of the field
        value: String,
        /// Underlying integer parse error
        #[source]
        source: ParseIntError,
    },
}

impl ParseError {
    /// 1-based number of the record that failed, if the failure is tied to one
    pub fn record(&self) -> Option<usize> {
        match self {
            ParseError::Open { .. } => None,
            ParseError::Read { record, .. }
            | ParseError::FieldCount { record, .. }
            | ParseError::InvalidInteger { record, .. } => Some(*record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_error_display() {
        let field_count = ParseError::FieldCount {
            record: 2,
            line: 2,
            expected: 16,
            found: 15,
        };
        assert_eq!(
            field_count.to_string(),
            "invalid number of fields in record 2 (line 2): expected 16, found 15"
        );

        let source = "x".parse::<u32>().unwrap_err();
        let invalid = ParseError::InvalidInteger {
            record: 3,
            line: 4,
            field: RecordField::CpuCores,
            value: "x".to_string(),
            source,
        };
        assert!(invalid
            .to_string()
            .starts_with("failed to parse cpuCores in record 3 (line 4): \"x\""));

        let config =
            CoreError::ConfigurationError("concurrency limit must be positive".to_string());
        assert_eq!(
            config.to_string(),
            "Configuration error: concurrency limit must be positive"
        );
    }

    #[test]
    fn test_record_accessor() {
        let open = ParseError::Open {
            path: PathBuf::from("missing.csv"),
            source: IoError::new(ErrorKind::NotFound, "file not found"),
        };
        assert_eq!(open.record(), None);
        assert!(open.to_string().contains("missing.csv"));

        let count = ParseError::FieldCount {
            record: 7,
            line: 9,
            expected: 16,
            found: 3,
        };
        assert_eq!(count.record(), Some(7));
    }

    #[test]
    fn test_from_parse_error() {
        let error: CoreError = ParseError::FieldCount {
            record: 1,
            line: 1,
            expected: 16,
            found: 2,
        }
        .into();

        match error {
            CoreError::InputError(inner) => assert_eq!(inner.record(), Some(1)),
            _ => panic!("Expected InputError variant"),
        }
    }
}
