use std::fmt;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use strum::{Display, EnumIter};

use super::value::Value;

/// Why the server produced a particular value.
///
/// Only [`Reason::Static`] results are eligible for caching: they cannot
/// change without a configuration push, which the event stream reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reason {
    Static,
    Default,
    TargetingMatch,
    Split,
    Disabled,
    Cached,
    Unknown,
    Error,
    /// Anything the server sends that this client does not know yet.
    Other(String),
}

impl Reason {
    /// Parse the wire string. Exact, case-sensitive match.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "STATIC" => Self::Static,
            "DEFAULT" => Self::Default,
            "TARGETING_MATCH" => Self::TargetingMatch,
            "SPLIT" => Self::Split,
            "DISABLED" => Self::Disabled,
            "CACHED" => Self::Cached,
            "UNKNOWN" => Self::Unknown,
            "ERROR" => Self::Error,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Static => "STATIC",
            Self::Default => "DEFAULT",
            Self::TargetingMatch => "TARGETING_MATCH",
            Self::Split => "SPLIT",
            Self::Disabled => "DISABLED",
            Self::Cached => "CACHED",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_cacheable(&self) -> bool {
        matches!(self, Self::Static)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Reason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The flag types the evaluation service can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum FlagKind {
    Boolean,
    String,
    Integer,
    Float,
    Object,
}

/// A resolved value of any flag type, as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    String(String),
    Int(i64),
    Float(f64),
    Structure(Value),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            Self::Bool(_) => FlagKind::Boolean,
            Self::String(_) => FlagKind::String,
            Self::Int(_) => FlagKind::Integer,
            Self::Float(_) => FlagKind::Float,
            Self::Structure(_) => FlagKind::Object,
        }
    }
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionDetails<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub reason: Reason,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub flag_metadata: IndexMap<String, Value>,
}

impl<T> ResolutionDetails<T> {
    /// Convert the value, keeping variant, reason and metadata. `None` if
    /// `f` rejects the value.
    pub fn try_map<U>(&self, f: impl FnOnce(&T) -> Option<U>) -> Option<ResolutionDetails<U>> {
        Some(ResolutionDetails {
            value: f(&self.value)?,
            variant: self.variant.clone(),
            reason: self.reason.clone(),
            flag_metadata: self.flag_metadata.clone(),
        })
    }
}

// ── Typed access ─────────────────────────────────────────────────────

/// A Rust type a flag can be resolved into.
pub trait FlagType: Sized + Send + 'static {
    const KIND: FlagKind;

    fn from_flag_value(value: &FlagValue) -> Option<Self>;
}

impl FlagType for bool {
    const KIND: FlagKind = FlagKind::Boolean;

    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FlagType for String {
    const KIND: FlagKind = FlagKind::String;

    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FlagType for i64 {
    const KIND: FlagKind = FlagKind::Integer;

    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl FlagType for f64 {
    const KIND: FlagKind = FlagKind::Float;

    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Float(n) => Some(*n),
            _ => None,
        }
    }
}

impl FlagType for Value {
    const KIND: FlagKind = FlagKind::Object;

    fn from_flag_value(value: &FlagValue) -> Option<Self> {
        match value {
            FlagValue::Structure(v) => Some(v.clone()),
            _ => None,
        }
    }
}
