//! Error types for the engine

use crate::value::JsValue;
use serde::Serialize;
use thiserror::Error;

/// Source location information for error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    /// Byte offset into the source text
    pub offset: u32,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// JScript-style numeric error code.
///
/// Script-visible Error objects carry it in their `number` property as the
/// full 0x800Axxxx value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    pub const OUT_OF_MEMORY: ErrorCode = ErrorCode(7);
    pub const STACK_OVERFLOW: ErrorCode = ErrorCode(28);
    pub const UNSUPPORTED_ACTION: ErrorCode = ErrorCode(445);
    pub const PROPERTY_NOT_SUPPORTED: ErrorCode = ErrorCode(438);
    pub const MISSING_ARG: ErrorCode = ErrorCode(449);
    pub const SYNTAX: ErrorCode = ErrorCode(1002);
    pub const MISSING_SEMICOLON: ErrorCode = ErrorCode(1004);
    pub const MISSING_LPAREN: ErrorCode = ErrorCode(1005);
    pub const MISSING_RPAREN: ErrorCode = ErrorCode(1006);
    pub const MISSING_RBRACKET: ErrorCode = ErrorCode(1007);
    pub const EXPECTED_IDENTIFIER: ErrorCode = ErrorCode(1010);
    pub const MISSING_RBRACE: ErrorCode = ErrorCode(1009);
    pub const INVALID_CHARACTER: ErrorCode = ErrorCode(1014);
    pub const UNTERMINATED_STRING: ErrorCode = ErrorCode(1015);
    pub const MISPLACED_RETURN: ErrorCode = ErrorCode(1018);
    pub const INVALID_BREAK: ErrorCode = ErrorCode(1019);
    pub const INVALID_CONTINUE: ErrorCode = ErrorCode(1020);
    pub const LABEL_REDEFINED: ErrorCode = ErrorCode(1025);
    pub const LABEL_NOT_FOUND: ErrorCode = ErrorCode(1026);
    pub const DUPLICATE_DECLARATION: ErrorCode = ErrorCode(1050);
    pub const NUMBER_EXPECTED: ErrorCode = ErrorCode(5001);
    pub const FUNCTION_EXPECTED: ErrorCode = ErrorCode(5002);
    pub const STRING_EXPECTED: ErrorCode = ErrorCode(5005);
    pub const DATE_EXPECTED: ErrorCode = ErrorCode(5006);
    pub const OBJECT_EXPECTED: ErrorCode = ErrorCode(5007);
    pub const ILLEGAL_ASSIGN: ErrorCode = ErrorCode(5008);
    pub const UNDEFINED_VARIABLE: ErrorCode = ErrorCode(5009);
    pub const BOOLEAN_EXPECTED: ErrorCode = ErrorCode(5010);
    pub const INVALID_LENGTH: ErrorCode = ErrorCode(5029);
    pub const REGEXP_EXPECTED: ErrorCode = ErrorCode(5016);
    pub const REGEXP_SYNTAX: ErrorCode = ErrorCode(5017);
    pub const INVALID_PROTOTYPE: ErrorCode = ErrorCode(5034);
    pub const OBJECT_NOT_EXTENSIBLE: ErrorCode = ErrorCode(5041);
    pub const NONCONFIGURABLE_REDEFINED: ErrorCode = ErrorCode(5042);
    pub const NONWRITABLE_MODIFIED: ErrorCode = ErrorCode(5043);
    pub const CONST_ASSIGNMENT: ErrorCode = ErrorCode(5045);
    pub const JSON_SYNTAX: ErrorCode = ErrorCode(5051);
    pub const KEY_NOT_OBJECT: ErrorCode = ErrorCode(5052);

    /// The HRESULT-like value exposed as `Error.prototype.number`
    pub fn number(self) -> i32 {
        (0x800A_0000_u32 | u32::from(self.0)) as i32
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.number() as u32)
    }
}

/// Which Error constructor an engine-raised error maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    Error,
    Eval,
    Range,
    Reference,
    Syntax,
    Type,
    Uri,
}

impl ErrorKind {
    /// Constructor name, e.g. `"TypeError"`
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Error => "Error",
            ErrorKind::Eval => "EvalError",
            ErrorKind::Range => "RangeError",
            ErrorKind::Reference => "ReferenceError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Uri => "URIError",
        }
    }

    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::Error,
        ErrorKind::Eval,
        ErrorKind::Range,
        ErrorKind::Reference,
        ErrorKind::Syntax,
        ErrorKind::Type,
        ErrorKind::Uri,
    ];
}

/// Main error type for the engine
#[derive(Debug, Clone, Error)]
pub enum JsError {
    /// Compile-time error; aborts the whole compilation unit
    #[error("SyntaxError: {message} at {location}")]
    Syntax {
        code: ErrorCode,
        message: String,
        location: SourceLocation,
    },

    /// Error raised by the engine itself (TypeError, ReferenceError, ...).
    /// Catchable; materialized as an Error object when script observes it.
    #[error("{}: {message}", .kind.name())]
    Runtime {
        kind: ErrorKind,
        code: ErrorCode,
        message: String,
    },

    /// A script-level `throw` (or a runtime error already materialized)
    #[error("Uncaught exception: {message}")]
    Thrown { value: JsValue, message: String },

    /// Allocation failure. Not catchable by script.
    #[error("Out of memory")]
    OutOfMemory,

    /// A host callback failed without exception details
    #[error("Host error: {message}")]
    Host { message: String },

    /// The host already handled the report for this failure
    #[error("Error already reported")]
    AlreadyReported,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn syntax_error(code: ErrorCode, message: impl Into<String>, location: SourceLocation) -> Self {
        JsError::Syntax {
            code,
            message: message.into(),
            location,
        }
    }

    pub fn runtime(kind: ErrorKind, code: ErrorCode, message: impl Into<String>) -> Self {
        JsError::Runtime {
            kind,
            code,
            message: message.into(),
        }
    }

    pub fn type_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::runtime(ErrorKind::Type, code, message)
    }

    /// `'name' is undefined`
    pub fn reference_error(name: &str) -> Self {
        Self::runtime(
            ErrorKind::Reference,
            ErrorCode::UNDEFINED_VARIABLE,
            format!("'{}' is undefined", name),
        )
    }

    pub fn range_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::runtime(ErrorKind::Range, code, message)
    }

    pub fn object_expected() -> Self {
        Self::type_error(ErrorCode::OBJECT_EXPECTED, "Object expected")
    }

    pub fn function_expected() -> Self {
        Self::type_error(ErrorCode::FUNCTION_EXPECTED, "Function expected")
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    /// Whether script-level `try`/`catch` may observe this error
    pub fn is_catchable(&self) -> bool {
        matches!(self, JsError::Runtime { .. } | JsError::Thrown { .. })
    }

    /// Error code reported to the host
    pub fn code(&self) -> ErrorCode {
        match self {
            JsError::Syntax { code, .. } | JsError::Runtime { code, .. } => *code,
            JsError::OutOfMemory => ErrorCode::OUT_OF_MEMORY,
            JsError::Thrown { .. }
            | JsError::Host { .. }
            | JsError::AlreadyReported
            | JsError::Internal(_) => ErrorCode::UNSUPPORTED_ACTION,
        }
    }

    /// The thrown value, if this is a script exception that already has one
    pub fn thrown_value(&self) -> Option<&JsValue> {
        match self {
            JsError::Thrown { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Failure reported by a host object callback.
#[derive(Debug, Clone, Default)]
pub struct HostError {
    pub message: String,
    /// Script-visible exception value. Without one the failure is not
    /// catchable by script.
    pub exception: Option<JsValue>,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            exception: None,
        }
    }

    pub fn with_exception(message: impl Into<String>, exception: JsValue) -> Self {
        Self {
            message: message.into(),
            exception: Some(exception),
        }
    }
}

impl From<HostError> for JsError {
    fn from(err: HostError) -> Self {
        match err.exception {
            Some(value) => JsError::Thrown {
                value,
                message: err.message,
            },
            None => JsError::Host {
                message: err.message,
            },
        }
    }
}

impl From<crate::gc::GcError> for JsError {
    fn from(_: crate::gc::GcError) -> Self {
        JsError::OutOfMemory
    }
}

/// Package handed to the host error callback for an unhandled failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// Numeric error code (`0x800Axxxx`)
    pub code: i32,
    pub message: String,
    /// The source line the failure points at, if known
    pub source_line: Option<String>,
    pub line: u32,
    pub column: u32,
    /// Name of the compilation unit
    pub unit: String,
    /// Instruction offset inside the unit, for runtime failures
    pub offset: Option<u32>,
}

impl ErrorReport {
    /// Serialize as JSON for host logging
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
