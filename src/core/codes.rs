//! SCORM 1.2 wire error codes.
//!
//! Content packages branch on these numerically, so the string forms and the
//! message table are part of the external contract.

use serde::Serialize;
use std::fmt;

/// Error code reported through `LMSGetLastError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    NoError,
    GeneralException,
    InvalidArgument,
    ElementCannotHaveChildren,
    ElementNotAnArray,
    NotInitialized,
    CommitFailure,
    GeneralSetFailure,
    NotImplemented,
    InvalidSetValueKeyword,
    ReadOnly,
    WriteOnly,
    IncorrectDataType,
    ValueOutOfRange,
}

const ALL_CODES: [ErrorCode; 14] = [
    ErrorCode::NoError,
    ErrorCode::GeneralException,
    ErrorCode::InvalidArgument,
    ErrorCode::ElementCannotHaveChildren,
    ErrorCode::ElementNotAnArray,
    ErrorCode::NotInitialized,
    ErrorCode::CommitFailure,
    ErrorCode::GeneralSetFailure,
    ErrorCode::NotImplemented,
    ErrorCode::InvalidSetValueKeyword,
    ErrorCode::ReadOnly,
    ErrorCode::WriteOnly,
    ErrorCode::IncorrectDataType,
    ErrorCode::ValueOutOfRange,
];

pub const UNKNOWN_ERROR: &str = "Unknown error";

impl ErrorCode {
    pub fn all() -> &'static [ErrorCode] {
        &ALL_CODES
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NoError => "0",
            ErrorCode::GeneralException => "101",
            ErrorCode::InvalidArgument => "201",
            ErrorCode::ElementCannotHaveChildren => "202",
            ErrorCode::ElementNotAnArray => "203",
            ErrorCode::NotInitialized => "301",
            ErrorCode::CommitFailure => "351",
            ErrorCode::GeneralSetFailure => "391",
            ErrorCode::NotImplemented => "401",
            ErrorCode::InvalidSetValueKeyword => "402",
            ErrorCode::ReadOnly => "403",
            ErrorCode::WriteOnly => "404",
            ErrorCode::IncorrectDataType => "405",
            ErrorCode::ValueOutOfRange => "406",
        }
    }

    /// Parses the numeric wire form. Surrounding whitespace is tolerated.
    pub fn parse(code: &str) -> Option<ErrorCode> {
        let code = code.trim();
        ALL_CODES.iter().copied().find(|c| c.as_str() == code)
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::NoError => "No error",
            ErrorCode::GeneralException => "General exception",
            ErrorCode::InvalidArgument => "Invalid argument error",
            ErrorCode::ElementCannotHaveChildren => "Element cannot have children",
            ErrorCode::ElementNotAnArray => "Element not an array - cannot have count",
            ErrorCode::NotInitialized => "Not initialized",
            ErrorCode::CommitFailure => "Commit failure",
            ErrorCode::GeneralSetFailure => "General set failure",
            ErrorCode::NotImplemented => "Not implemented error",
            ErrorCode::InvalidSetValueKeyword => "Invalid set value, element is a keyword",
            ErrorCode::ReadOnly => "Element is read only",
            ErrorCode::WriteOnly => "Element is write only",
            ErrorCode::IncorrectDataType => "Incorrect data type",
            ErrorCode::ValueOutOfRange => "Value out of range",
        }
    }

    pub fn is_error(self) -> bool {
        self != ErrorCode::NoError
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `LMSGetErrorString` lookup: unknown codes map to "Unknown error".
pub fn error_string(code: &str) -> &'static str {
    ErrorCode::parse(code)
        .map(ErrorCode::message)
        .unwrap_or(UNKNOWN_ERROR)
}

/// `LMSGetDiagnostic` text for a code: the code plus its table message.
pub fn diagnostic(code: &str) -> String {
    let code = code.trim();
    format!("Error {}: {}", code, error_string(code))
}
