//! The eight SCORM 1.2 API functions as content calls them: by exact,
//! case-sensitive name, with string arguments and string results.

use crate::core::codes::ErrorCode;
use crate::core::runtime::Scorm12Runtime;
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub const TRUE: &str = "true";
pub const FALSE: &str = "false";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApiFunction {
    LMSInitialize,
    LMSFinish,
    LMSGetValue,
    LMSSetValue,
    LMSCommit,
    LMSGetLastError,
    LMSGetErrorString,
    LMSGetDiagnostic,
}

const ALL_FUNCTIONS: [ApiFunction; 8] = [
    ApiFunction::LMSInitialize,
    ApiFunction::LMSFinish,
    ApiFunction::LMSGetValue,
    ApiFunction::LMSSetValue,
    ApiFunction::LMSCommit,
    ApiFunction::LMSGetLastError,
    ApiFunction::LMSGetErrorString,
    ApiFunction::LMSGetDiagnostic,
];

impl ApiFunction {
    pub fn all() -> &'static [ApiFunction] {
        &ALL_FUNCTIONS
    }

    pub fn name(self) -> &'static str {
        match self {
            ApiFunction::LMSInitialize => "LMSInitialize",
            ApiFunction::LMSFinish => "LMSFinish",
            ApiFunction::LMSGetValue => "LMSGetValue",
            ApiFunction::LMSSetValue => "LMSSetValue",
            ApiFunction::LMSCommit => "LMSCommit",
            ApiFunction::LMSGetLastError => "LMSGetLastError",
            ApiFunction::LMSGetErrorString => "LMSGetErrorString",
            ApiFunction::LMSGetDiagnostic => "LMSGetDiagnostic",
        }
    }

    /// Exact match only: `lmsinitialize` is not `LMSInitialize`.
    pub fn from_name(name: &str) -> Option<ApiFunction> {
        ALL_FUNCTIONS.iter().copied().find(|f| f.name() == name)
    }

    /// Calls that go through the rate limiter's set/commit buckets.
    pub fn is_set_value(self) -> bool {
        self == ApiFunction::LMSSetValue
    }

    pub fn is_commit(self) -> bool {
        self == ApiFunction::LMSCommit
    }

    /// Error accessors must not disturb the last error they report.
    pub fn is_error_accessor(self) -> bool {
        matches!(
            self,
            ApiFunction::LMSGetLastError
                | ApiFunction::LMSGetErrorString
                | ApiFunction::LMSGetDiagnostic
        )
    }

    /// Result returned when the call is refused before reaching the runtime.
    pub fn refusal(self) -> &'static str {
        match self {
            ApiFunction::LMSGetValue
            | ApiFunction::LMSGetErrorString
            | ApiFunction::LMSGetDiagnostic => "",
            ApiFunction::LMSGetLastError => ErrorCode::GeneralException.as_str(),
            _ => FALSE,
        }
    }
}

impl fmt::Display for ApiFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn wire_bool(ok: bool) -> String {
    let result = if ok { TRUE } else { FALSE };
    result.to_string()
}

fn arg<'a>(args: &[&'a str], index: usize) -> &'a str {
    args.get(index).copied().unwrap_or("")
}

impl Scorm12Runtime {
    /// Executes one wire call. Missing arguments read as `""`.
    pub fn invoke(&mut self, function: ApiFunction, args: &[&str]) -> String {
        let result = match function {
            ApiFunction::LMSInitialize => wire_bool(self.initialize()),
            ApiFunction::LMSFinish => wire_bool(self.finish()),
            ApiFunction::LMSGetValue => self.get_value(arg(args, 0)),
            ApiFunction::LMSSetValue => wire_bool(self.set_value(arg(args, 0), arg(args, 1))),
            ApiFunction::LMSCommit => wire_bool(self.commit()),
            ApiFunction::LMSGetLastError => self.last_error().as_str().to_string(),
            ApiFunction::LMSGetErrorString => self.error_string(arg(args, 0)).to_string(),
            ApiFunction::LMSGetDiagnostic => self.diagnostic(arg(args, 0)),
        };
        debug!(call = %function, last_error = %self.last_error(), "api call");
        result
    }

    /// [`invoke`](Self::invoke) by function name. Unknown names fail with
    /// `101` and return `"false"`.
    pub fn invoke_by_name(&mut self, name: &str, args: &[&str]) -> String {
        match ApiFunction::from_name(name) {
            Some(function) => self.invoke(function, args),
            None => {
                debug!(call = name, "unknown api function");
                self.reject(ErrorCode::GeneralException);
                FALSE.to_string()
            }
        }
    }
}
