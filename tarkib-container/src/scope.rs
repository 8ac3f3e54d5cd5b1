//! Component scope markers.
//!
//! Every descriptor carries a scope marker. Only [`Scope::Singleton`]
//! has distinct behavior: each component is created exactly once at
//! startup. The other markers are accepted for compatibility with
//! descriptor producers, logged, and wired as singletons.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared lifetime of a component.
///
/// # Examples
/// ```
/// use tarkib_container::scope::Scope;
///
/// assert_eq!(Scope::default(), Scope::Singleton);
/// assert_eq!("transient".parse::<Scope>().unwrap(), Scope::Transient);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// One instance for the whole composition, created at startup.
    #[default]
    Singleton,

    /// Per-scope lifetime. Accepted, treated as [`Scope::Singleton`].
    Scoped,

    /// Per-resolve lifetime. Accepted, treated as [`Scope::Singleton`].
    Transient,
}

impl Scope {
    /// Returns `true` if this marker is the one the container honors.
    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "Singleton"),
            Scope::Scoped => write!(f, "Scoped"),
            Scope::Transient => write!(f, "Transient"),
        }
    }
}

/// Error returned when parsing an unknown scope marker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scope marker `{0}` (expected singleton, scoped or transient)")]
pub struct ParseScopeError(String);

impl FromStr for Scope {
    type Err = ParseScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "singleton" => Ok(Scope::Singleton),
            "scoped" => Ok(Scope::Scoped),
            "transient" | "prototype" => Ok(Scope::Transient),
            _ => Err(ParseScopeError(s.to_string())),
        }
    }
}
