use core::fmt;
use std::sync::Arc;

use crate::consts::{ERR_NS, XDB_ERR_NS};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error codes raised by the engine.
///
/// W3C codes are used where the XQuery (Update / Full-Text) specifications
/// define one; structural table failures use project codes (`XDB####`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Structural
    XDB0001, // position out of range / not addressable
    XDB0002, // table capacity exhausted
    XDB0003, // update primitive is not pending
    XDB0004, // malformed builder event stream
    // Update conflicts
    XUDY0015, // multiple rename on the same target
    XUDY0016, // multiple replace node on the same target
    XUDY0017, // multiple replace value on the same target
    XUTY0008, // invalid update target
    // Evaluation
    XPST0008, // unbound variable
    XPTY0004, // type error
    FODC0002, // input retrieval failure
    FODC0006, // input is not well-formed
    FTDY0020, // malformed full-text predicate
    FOER0000,
    // Fallback / unknown (kept last)
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::XDB0001 => "xdb:XDB0001",
            ErrorCode::XDB0002 => "xdb:XDB0002",
            ErrorCode::XDB0003 => "xdb:XDB0003",
            ErrorCode::XDB0004 => "xdb:XDB0004",
            ErrorCode::XUDY0015 => "err:XUDY0015",
            ErrorCode::XUDY0016 => "err:XUDY0016",
            ErrorCode::XUDY0017 => "err:XUDY0017",
            ErrorCode::XUTY0008 => "err:XUTY0008",
            ErrorCode::XPST0008 => "err:XPST0008",
            ErrorCode::XPTY0004 => "err:XPTY0004",
            ErrorCode::FODC0002 => "err:FODC0002",
            ErrorCode::FODC0006 => "err:FODC0006",
            ErrorCode::FTDY0020 => "err:FTDY0020",
            ErrorCode::FOER0000 => "err:FOER0000",
            ErrorCode::Unknown => "err:UNKNOWN",
        }
    }

    pub fn from_code(s: &str) -> Self {
        use ErrorCode::*;
        match s {
            "xdb:XDB0001" => XDB0001,
            "xdb:XDB0002" => XDB0002,
            "xdb:XDB0003" => XDB0003,
            "xdb:XDB0004" => XDB0004,
            "err:XUDY0015" => XUDY0015,
            "err:XUDY0016" => XUDY0016,
            "err:XUDY0017" => XUDY0017,
            "err:XUTY0008" => XUTY0008,
            "err:XPST0008" => XPST0008,
            "err:XPTY0004" => XPTY0004,
            "err:FODC0002" => FODC0002,
            "err:FODC0006" => FODC0006,
            "err:FTDY0020" => FTDY0020,
            "err:FOER0000" => FOER0000,
            _ => Unknown,
        }
    }

    /// Namespace URI the code lives in.
    pub fn namespace(&self) -> &'static str {
        if self.as_str().starts_with("xdb:") { XDB_ERR_NS } else { ERR_NS }
    }

    /// Update conflicts abort the whole pending batch.
    pub fn is_update_conflict(&self) -> bool {
        matches!(self, ErrorCode::XUDY0015 | ErrorCode::XUDY0016 | ErrorCode::XUDY0017)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>, // optional chained cause
}

impl Error {
    pub fn from_code(code: ErrorCode, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), source: None }
    }

    pub fn invalid_position(pre: usize, len: usize) -> Self {
        Self::from_code(ErrorCode::XDB0001, format!("position {pre} out of range (table size {len})"))
    }

    pub fn capacity_exceeded(requested: usize, max: usize) -> Self {
        Self::from_code(ErrorCode::XDB0002, format!("table capacity exceeded: {requested} nodes requested, {max} addressable"))
    }

    pub fn malformed_events(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XDB0004, msg)
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::XPTY0004, msg)
    }

    /// Compose an error with a source cause.
    pub fn with_source(mut self, source: impl Into<Option<Arc<dyn std::error::Error + Send + Sync>>>) -> Self {
        self.source = source.into();
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::from_code(ErrorCode::FODC0002, e.to_string())
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        let code = match e {
            quick_xml::Error::Io(_) => ErrorCode::FODC0002,
            _ => ErrorCode::FODC0006,
        };
        Error::from_code(code, e.to_string()).with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {} ({})", self.message, self.code)
    }
}
