//! Error types for Tarkib composition.
//!
//! Every fatal condition aborts the whole composition. Messages name the
//! types involved and, where it helps, suggest what to change.

use std::fmt;

use tarkib_support::rendering::render_chain;

use crate::key::TypeKey;

/// Boxed error returned by user code (post-construct hooks, entry actions).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all Tarkib operations.
#[derive(Debug, thiserror::Error)]
pub enum TarkibError {
    /// A component declares more than one constructor.
    #[error("{}", .0)]
    AmbiguousConstructor(AmbiguousConstructorError),

    /// A component declares no constructor at all.
    #[error("Component {component} declares no constructor\n  Hint: add a constructor to its descriptor")]
    MissingConstructor { component: TypeKey },

    /// A constructor parameter's capability has no implementation.
    #[error("{}", .0)]
    UnresolvedDependency(UnresolvedDependencyError),

    /// A capability has several implementations and the resolution
    /// policy cannot pick one.
    #[error("{}", .0)]
    AmbiguousImplementation(AmbiguousImplementationError),

    /// Adding a dependency edge would close a cycle.
    #[error("{}", .0)]
    CyclicDependency(CyclicDependencyError),

    /// Two descriptors were supplied for the same concrete type.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// The context already holds an instance of this type.
    #[error("Instance of {key} is already present in the context")]
    DuplicateInstance { key: TypeKey },

    /// The context holds no instance of this type.
    #[error("No instance of {key} in the context")]
    NotFound { key: TypeKey },

    /// A dependency was requested before it was constructed.
    ///
    /// Topological ordering makes this impossible; seeing it means the
    /// engine is broken, not the configuration.
    #[error("{dependency} was not constructed before its dependent {dependent}")]
    DependencyNotYetConstructed {
        dependency: TypeKey,
        dependent: TypeKey,
    },

    /// A constructor returned an error.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// A post-construct hook returned an error.
    #[error("Post-construct hook of {key} failed: {source}")]
    PostConstructFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// An entry action returned an error.
    #[error("Entry point {key} failed: {source}")]
    EntryPointFailed {
        key: TypeKey,
        #[source]
        source: BoxError,
    },

    /// A stored value did not have the requested type.
    #[error("Type mismatch for {key}: expected {expected}")]
    TypeMismatch {
        key: TypeKey,
        expected: &'static str,
    },
}

impl TarkibError {
    /// Wraps a user error raised while constructing `key`.
    pub fn construction(key: TypeKey, source: impl Into<BoxError>) -> Self {
        TarkibError::ConstructionFailed {
            key,
            source: source.into(),
        }
    }
}

/// Error when a component declares several constructors.
#[derive(Debug)]
pub struct AmbiguousConstructorError {
    pub component: TypeKey,
    /// How many constructors were declared
    pub count: usize,
}

impl fmt::Display for AmbiguousConstructorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous constructor: {} declares {} constructors",
            self.component, self.count
        )?;
        write!(f, "\n  Hint: a component must have exactly one constructor")
    }
}

/// Error when a capability has no registered implementation.
///
/// Includes the dependent that asked for it and similar capabilities
/// that ARE registered.
#[derive(Debug)]
pub struct UnresolvedDependencyError {
    /// The capability that was requested
    pub requested: TypeKey,
    /// The component whose constructor asked for it (if known)
    pub required_by: Option<TypeKey>,
    /// Similar capabilities that are registered ("did you mean?")
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnresolvedDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unresolved dependency: no component implements {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: Did you forget to declare a component providing {}?",
            self.requested.short_name()
        )
    }
}

/// Error when a single implementation cannot be chosen.
#[derive(Debug)]
pub struct AmbiguousImplementationError {
    pub capability: TypeKey,
    /// The implementations in contention, in registration order
    pub candidates: Vec<TypeKey>,
    /// The component whose constructor asked for it (if known)
    pub required_by: Option<TypeKey>,
}

impl fmt::Display for AmbiguousImplementationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ambiguous implementation: {} is provided by {} components",
            self.capability,
            self.candidates.len()
        )?;
        for candidate in &self.candidates {
            write!(f, "\n    - {candidate}")?;
        }
        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }
        write!(
            f,
            "\n  Hint: Give one implementation a higher priority or inject all of them as a collection"
        )
    }
}

/// Error when a dependency cycle is detected.
///
/// Shows the full chain so you can see WHERE the cycle is.
#[derive(Debug)]
pub struct CyclicDependencyError {
    /// The participating types, in dependency order.
    /// Example: ["A", "B", "A"] (A is needed by B, which is needed by A)
    pub chain: Vec<TypeKey>,
}

impl fmt::Display for CyclicDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cyclic dependency detected:\n  ")?;

        let names: Vec<String> = self.chain.iter().map(|k| k.short_name()).collect();
        write!(f, "{}", render_chain(&names))?;

        write!(
            f,
            "\n  Hint: Break the cycle by extracting the shared part into its own component"
        )
    }
}

/// Error when two descriptors name the same concrete type.
#[derive(Debug)]
pub struct AlreadyRegisteredError {
    pub key: TypeKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component already registered: {}", self.key)?;
        write!(
            f,
            "\n  Hint: each concrete type may be described only once"
        )
    }
}

/// Convenient Result type for Tarkib operations.
pub type Result<T> = std::result::Result<T, TarkibError>;
