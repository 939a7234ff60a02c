//! Device link capability and error types.
//!
//! This module defines:
//! - `DeviceLink` trait - named-variable read/write against a remote controller
//! - `LinkError` enum - error types for link operations
//! - `PlcType` / `PlcValue` - the typed value model carried over the link
//!
//! String-keyed symbol access lives only behind this trait. Callers build
//! symbol names through [`crate::plc`] and never format them by hand.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error types for device link operations.
///
/// Link errors are always surfaced to the caller, never swallowed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    /// Operation attempted on a closed link.
    #[error("Device link is not open")]
    NotOpen,

    /// Connection could not be established or was lost.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The controller did not answer in time.
    #[error("Device link timeout on '{0}'")]
    Timeout(String),

    /// The controller does not know the symbol.
    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),

    /// The value read or written does not have the requested type.
    #[error("Type mismatch on '{symbol}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Symbol name.
        symbol: String,
        /// Requested type.
        expected: PlcType,
        /// Type actually carried.
        found: PlcType,
    },
}

/// PLC data types used by the rig's symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlcType {
    /// `BOOL`
    Bool,
    /// `INT` (16-bit signed)
    Int,
    /// `UINT` (16-bit unsigned)
    UInt,
    /// `UDINT` (32-bit unsigned)
    UDInt,
    /// `LREAL` (64-bit float)
    LReal,
    /// `STRING`
    String,
}

impl fmt::Display for PlcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "BOOL",
            Self::Int => "INT",
            Self::UInt => "UINT",
            Self::UDInt => "UDINT",
            Self::LReal => "LREAL",
            Self::String => "STRING",
        };
        f.write_str(name)
    }
}

/// A typed value read from or written to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlcValue {
    /// `BOOL`
    Bool(bool),
    /// `INT`
    Int(i16),
    /// `UINT`
    UInt(u16),
    /// `UDINT`
    UDInt(u32),
    /// `LREAL`
    LReal(f64),
    /// `STRING`
    String(String),
}

impl PlcValue {
    /// The PLC type carried by this value.
    pub const fn plc_type(&self) -> PlcType {
        match self {
            Self::Bool(_) => PlcType::Bool,
            Self::Int(_) => PlcType::Int,
            Self::UInt(_) => PlcType::UInt,
            Self::UDInt(_) => PlcType::UDInt,
            Self::LReal(_) => PlcType::LReal,
            Self::String(_) => PlcType::String,
        }
    }

    /// Default (zero) value of a PLC type.
    pub fn zero(ty: PlcType) -> Self {
        match ty {
            PlcType::Bool => Self::Bool(false),
            PlcType::Int => Self::Int(0),
            PlcType::UInt => Self::UInt(0),
            PlcType::UDInt => Self::UDInt(0),
            PlcType::LReal => Self::LReal(0.0),
            PlcType::String => Self::String(String::new()),
        }
    }

    fn mismatch(&self, symbol: &str, expected: PlcType) -> LinkError {
        LinkError::TypeMismatch {
            symbol: symbol.to_string(),
            expected,
            found: self.plc_type(),
        }
    }

    /// Extract a `BOOL`.
    pub fn to_bool(&self, symbol: &str) -> Result<bool, LinkError> {
        match self {
            Self::Bool(v) => Ok(*v),
            other => Err(other.mismatch(symbol, PlcType::Bool)),
        }
    }

    /// Extract an `INT`.
    pub fn to_int(&self, symbol: &str) -> Result<i16, LinkError> {
        match self {
            Self::Int(v) => Ok(*v),
            other => Err(other.mismatch(symbol, PlcType::Int)),
        }
    }

    /// Extract a `UINT`.
    pub fn to_uint(&self, symbol: &str) -> Result<u16, LinkError> {
        match self {
            Self::UInt(v) => Ok(*v),
            other => Err(other.mismatch(symbol, PlcType::UInt)),
        }
    }

    /// Extract a `UDINT`.
    pub fn to_udint(&self, symbol: &str) -> Result<u32, LinkError> {
        match self {
            Self::UDInt(v) => Ok(*v),
            other => Err(other.mismatch(symbol, PlcType::UDInt)),
        }
    }

    /// Extract an `LREAL`.
    pub fn to_lreal(&self, symbol: &str) -> Result<f64, LinkError> {
        match self {
            Self::LReal(v) => Ok(*v),
            other => Err(other.mismatch(symbol, PlcType::LReal)),
        }
    }

    /// Extract a `STRING`.
    pub fn to_text(&self, symbol: &str) -> Result<String, LinkError> {
        match self {
            Self::String(v) => Ok(v.clone()),
            other => Err(other.mismatch(symbol, PlcType::String)),
        }
    }
}

impl fmt::Display for PlcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::UDInt(v) => write!(f, "{v}"),
            Self::LReal(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// Trait defining the interface to a remote controller.
///
/// Every read and write is an independent request/response pair; there are
/// no transactions spanning several symbols.
///
/// # Lifecycle
///
/// 1. `open()` - Called once before any access
/// 2. `read()` / `write()` - Named-variable access
/// 3. `close()` - Called at the end of the run
pub trait DeviceLink: Send {
    /// Returns the link's identifier (e.g., "simulation", "ads").
    fn name(&self) -> &'static str;

    /// Open the connection.
    ///
    /// # Errors
    /// Return `LinkError::Connection` if the controller cannot be reached.
    fn open(&mut self) -> Result<(), LinkError>;

    /// Close the connection. Closing a closed link is a no-op.
    fn close(&mut self) -> Result<(), LinkError>;

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;

    /// Read a named variable of the given type.
    fn read(&self, symbol: &str, ty: PlcType) -> Result<PlcValue, LinkError>;

    /// Write a named variable.
    fn write(&self, symbol: &str, value: PlcValue) -> Result<(), LinkError>;

    /// Read a `BOOL` symbol.
    fn read_bool(&self, symbol: &str) -> Result<bool, LinkError> {
        self.read(symbol, PlcType::Bool)?.to_bool(symbol)
    }

    /// Read an `INT` symbol.
    fn read_int(&self, symbol: &str) -> Result<i16, LinkError> {
        self.read(symbol, PlcType::Int)?.to_int(symbol)
    }

    /// Read a `UINT` symbol.
    fn read_uint(&self, symbol: &str) -> Result<u16, LinkError> {
        self.read(symbol, PlcType::UInt)?.to_uint(symbol)
    }

    /// Read a `UDINT` symbol.
    fn read_udint(&self, symbol: &str) -> Result<u32, LinkError> {
        self.read(symbol, PlcType::UDInt)?.to_udint(symbol)
    }

    /// Read an `LREAL` symbol.
    fn read_lreal(&self, symbol: &str) -> Result<f64, LinkError> {
        self.read(symbol, PlcType::LReal)?.to_lreal(symbol)
    }

    /// Read a `STRING` symbol.
    fn read_text(&self, symbol: &str) -> Result<String, LinkError> {
        self.read(symbol, PlcType::String)?.to_text(symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_error_display() {
        let err = LinkError::UnknownSymbol("GVL.astAxes[99].stStatus.bDone".to_string());
        assert!(err.to_string().contains("astAxes[99]"));

        let err = LinkError::TypeMismatch {
            symbol: "x".to_string(),
            expected: PlcType::Bool,
            found: PlcType::LReal,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch on 'x': expected BOOL, found LREAL"
        );
    }

    #[test]
    fn typed_extraction_checks_type() {
        assert_eq!(PlcValue::Bool(true).to_bool("b"), Ok(true));
        assert_eq!(PlcValue::LReal(1.5).to_lreal("f"), Ok(1.5));
        assert_eq!(PlcValue::UDInt(17).to_udint("n"), Ok(17));
        assert!(matches!(
            PlcValue::Int(3).to_bool("b"),
            Err(LinkError::TypeMismatch {
                expected: PlcType::Bool,
                found: PlcType::Int,
                ..
            })
        ));
    }

    #[test]
    fn zero_value_has_requested_type() {
        for ty in [
            PlcType::Bool,
            PlcType::Int,
            PlcType::UInt,
            PlcType::UDInt,
            PlcType::LReal,
            PlcType::String,
        ] {
            assert_eq!(PlcValue::zero(ty).plc_type(), ty);
        }
    }
}
