//! Capability registry: which components provide which capability.
//!
//! Built once from the descriptor set. Each capability maps to its
//! implementations in discovery order; a [`ResolutionPolicy`] decides
//! which one a single-valued constructor parameter receives.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tarkib_support::rendering::suggest_similar;
use tracing::{debug, instrument, warn};

use crate::descriptor::{CastFn, Cardinality, ComponentDescriptor, Dependency, Erased, Instance};
use crate::error::{
    AlreadyRegisteredError, AmbiguousImplementationError, Result, TarkibError,
    UnresolvedDependencyError,
};
use crate::key::TypeKey;

/// How a single-valued parameter is resolved when a capability has
/// several implementations.
///
/// Collection parameters ([`Dependency::all`]) always receive every
/// implementation, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The first implementation in discovery order wins.
    #[default]
    FirstRegistered,
    /// More than one implementation is an error.
    RejectAmbiguous,
    /// The implementation with the highest priority wins; a tie at the
    /// top is an error.
    HighestPriority,
}

impl fmt::Display for ResolutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPolicy::FirstRegistered => write!(f, "first"),
            ResolutionPolicy::RejectAmbiguous => write!(f, "reject"),
            ResolutionPolicy::HighestPriority => write!(f, "priority"),
        }
    }
}

/// Error returned when parsing an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resolution policy `{0}` (expected first, reject or priority)")]
pub struct ParsePolicyError(String);

impl FromStr for ResolutionPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" | "first_registered" => Ok(ResolutionPolicy::FirstRegistered),
            "reject" | "reject_ambiguous" => Ok(ResolutionPolicy::RejectAmbiguous),
            "priority" | "highest_priority" => Ok(ResolutionPolicy::HighestPriority),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// One component providing a capability.
#[derive(Clone)]
pub struct Implementation {
    component: TypeKey,
    priority: i32,
    cast: CastFn,
}

impl Implementation {
    /// The concrete component type.
    pub fn component(&self) -> TypeKey {
        self.component
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Views `instance` through this capability.
    pub(crate) fn cast(&self, instance: &Instance) -> Option<Erased> {
        (self.cast)(instance)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("component", &self.component)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Maps each capability to the components implementing it.
#[derive(Debug)]
pub struct CapabilityRegistry {
    implementations: HashMap<TypeKey, Vec<Implementation>>,
    /// Capabilities in first-seen order
    capabilities: Vec<TypeKey>,
    policy: ResolutionPolicy,
}

impl CapabilityRegistry {
    /// Builds the registry from the descriptor set.
    ///
    /// A component without capabilities is kept (it can still be
    /// constructed and run) but logged, since nothing can depend on it.
    ///
    /// # Errors
    /// [`TarkibError::AlreadyRegistered`] if two descriptors share a
    /// concrete type.
    #[instrument(skip_all, name = "registry_build", fields(policy = %policy))]
    pub fn build(descriptors: &[ComponentDescriptor], policy: ResolutionPolicy) -> Result<Self> {
        let mut registry = Self {
            implementations: HashMap::new(),
            capabilities: Vec::new(),
            policy,
        };
        let mut seen = HashSet::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let component = descriptor.key();
            if !seen.insert(component) {
                return Err(TarkibError::AlreadyRegistered(AlreadyRegisteredError {
                    key: component,
                }));
            }

            if descriptor.capabilities().is_empty() {
                warn!(
                    component = %component,
                    "Component implements no capability; nothing can depend on it"
                );
            }

            for capability in descriptor.capabilities() {
                let key = capability.key();
                debug!(capability = %key, component = %component, "Registered implementation");

                let implementations = registry.implementations.entry(key).or_insert_with(|| {
                    registry.capabilities.push(key);
                    Vec::new()
                });
                implementations.push(Implementation {
                    component,
                    priority: descriptor.priority(),
                    cast: capability.cast_fn().clone(),
                });
            }
        }

        debug!(
            capabilities = registry.capabilities.len(),
            components = seen.len(),
            "Capability registry built"
        );
        Ok(registry)
    }

    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Implementations of `capability` in registration order (may be empty).
    pub fn implementations(&self, capability: &TypeKey) -> &[Implementation] {
        self.implementations
            .get(capability)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Known capabilities in first-seen order.
    pub fn capabilities(&self) -> &[TypeKey] {
        &self.capabilities
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Resolves `capability` to one implementation using the policy.
    ///
    /// # Errors
    /// - [`TarkibError::UnresolvedDependency`]: no implementation
    /// - [`TarkibError::AmbiguousImplementation`]: the policy cannot choose
    pub fn resolve(&self, capability: &TypeKey) -> Result<&Implementation> {
        self.resolve_for(capability, None)
    }

    /// Like [`resolve`](Self::resolve), naming the dependent in errors.
    pub fn resolve_for(
        &self,
        capability: &TypeKey,
        required_by: Option<TypeKey>,
    ) -> Result<&Implementation> {
        let candidates = self.resolve_all_for(capability, required_by)?;

        let chosen = match self.policy {
            ResolutionPolicy::FirstRegistered => candidates.first(),
            ResolutionPolicy::RejectAmbiguous => match candidates {
                [only] => Some(only),
                _ => {
                    return Err(self.ambiguous(capability, candidates.iter(), required_by));
                }
            },
            ResolutionPolicy::HighestPriority => {
                let top = candidates.iter().map(|c| c.priority).max();
                let mut best = candidates.iter().filter(|c| Some(c.priority) == top);
                match (best.next(), best.next()) {
                    (Some(winner), None) => Some(winner),
                    _ => {
                        let tied = candidates.iter().filter(|c| Some(c.priority) == top);
                        return Err(self.ambiguous(capability, tied, required_by));
                    }
                }
            }
        };

        chosen.ok_or_else(|| self.unresolved(capability, required_by))
    }

    /// Resolves `capability` to all of its implementations.
    ///
    /// # Errors
    /// [`TarkibError::UnresolvedDependency`] if there are none.
    pub fn resolve_all(&self, capability: &TypeKey) -> Result<&[Implementation]> {
        self.resolve_all_for(capability, None)
    }

    /// Like [`resolve_all`](Self::resolve_all), naming the dependent in errors.
    pub fn resolve_all_for(
        &self,
        capability: &TypeKey,
        required_by: Option<TypeKey>,
    ) -> Result<&[Implementation]> {
        match self.implementations(capability) {
            [] => Err(self.unresolved(capability, required_by)),
            found => Ok(found),
        }
    }

    /// Resolves a constructor parameter of `dependent`.
    pub fn resolve_dependency(
        &self,
        dependency: &Dependency,
        dependent: TypeKey,
    ) -> Result<Vec<&Implementation>> {
        let capability = dependency.capability();
        match dependency.cardinality() {
            Cardinality::One => Ok(vec![self.resolve_for(&capability, Some(dependent))?]),
            Cardinality::All => Ok(self
                .resolve_all_for(&capability, Some(dependent))?
                .iter()
                .collect()),
        }
    }

    fn unresolved(&self, capability: &TypeKey, required_by: Option<TypeKey>) -> TarkibError {
        let available: Vec<&str> = self.capabilities.iter().map(|k| k.type_name()).collect();

        TarkibError::UnresolvedDependency(UnresolvedDependencyError {
            requested: *capability,
            required_by,
            suggestions: suggest_similar(capability.type_name(), &available, 3),
        })
    }

    fn ambiguous<'a>(
        &self,
        capability: &TypeKey,
        candidates: impl Iterator<Item = &'a Implementation>,
        required_by: Option<TypeKey>,
    ) -> TarkibError {
        let candidates: Vec<TypeKey> = candidates.map(|c| c.component).collect();
        warn!(
            capability = %capability,
            candidates = ?candidates,
            policy = %self.policy,
            "Cannot choose an implementation"
        );

        TarkibError::AmbiguousImplementation(AmbiguousImplementationError {
            capability: *capability,
            candidates,
            required_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Store: Send + Sync {}
    trait Metrics: Send + Sync {}

    struct MemoryStore;
    impl Store for MemoryStore {}
    struct DiskStore;
    impl Store for DiskStore {}
    struct Standalone;

    fn memory(priority: i32) -> ComponentDescriptor {
        ComponentDescriptor::builder::<MemoryStore>()
            .provides::<dyn Store>(|it| it)
            .priority(priority)
            .constructor([], |_| Ok(MemoryStore))
            .build()
    }

    fn disk(priority: i32) -> ComponentDescriptor {
        ComponentDescriptor::builder::<DiskStore>()
            .provides::<dyn Store>(|it| it)
            .priority(priority)
            .constructor([], |_| Ok(DiskStore))
            .build()
    }

    fn store() -> TypeKey {
        TypeKey::of::<dyn Store>()
    }

    #[test]
    fn implementations_keep_discovery_order() {
        let registry =
            CapabilityRegistry::build(&[disk(0), memory(0)], ResolutionPolicy::default()).unwrap();

        let components: Vec<TypeKey> = registry
            .implementations(&store())
            .iter()
            .map(Implementation::component)
            .collect();
        assert_eq!(
            components,
            vec![TypeKey::of::<DiskStore>(), TypeKey::of::<MemoryStore>()]
        );
    }

    #[test]
    fn first_registered_wins_by_default() {
        let registry =
            CapabilityRegistry::build(&[memory(0), disk(10)], ResolutionPolicy::default()).unwrap();
        assert_eq!(
            registry.resolve(&store()).unwrap().component(),
            TypeKey::of::<MemoryStore>()
        );
    }

    #[test]
    fn reject_policy_fails_on_two_implementations() {
        let registry =
            CapabilityRegistry::build(&[memory(0), disk(0)], ResolutionPolicy::RejectAmbiguous)
                .unwrap();

        match registry.resolve(&store()) {
            Err(TarkibError::AmbiguousImplementation(err)) => {
                assert_eq!(err.candidates.len(), 2);
            }
            other => panic!("Expected AmbiguousImplementation, got: {other:?}"),
        }
    }

    #[test]
    fn reject_policy_accepts_single_implementation() {
        let registry =
            CapabilityRegistry::build(&[memory(0)], ResolutionPolicy::RejectAmbiguous).unwrap();
        assert!(registry.resolve(&store()).is_ok());
    }

    #[test]
    fn priority_policy_picks_highest() {
        let registry =
            CapabilityRegistry::build(&[memory(1), disk(5)], ResolutionPolicy::HighestPriority)
                .unwrap();
        assert_eq!(
            registry.resolve(&store()).unwrap().component(),
            TypeKey::of::<DiskStore>()
        );
    }

    #[test]
    fn priority_policy_rejects_tie() {
        let registry =
            CapabilityRegistry::build(&[memory(3), disk(3)], ResolutionPolicy::HighestPriority)
                .unwrap();
        assert!(matches!(
            registry.resolve(&store()),
            Err(TarkibError::AmbiguousImplementation(_))
        ));
    }

    #[test]
    fn collection_resolution_ignores_policy() {
        let registry =
            CapabilityRegistry::build(&[memory(0), disk(0)], ResolutionPolicy::RejectAmbiguous)
                .unwrap();
        let dependent = TypeKey::of::<Standalone>();
        let all = registry
            .resolve_dependency(&Dependency::all::<dyn Store>(), dependent)
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn unresolved_names_capability_and_dependent() {
        let registry = CapabilityRegistry::build(&[memory(0)], ResolutionPolicy::default()).unwrap();
        let dependent = TypeKey::of::<Standalone>();

        match registry.resolve_dependency(&Dependency::one::<dyn Metrics>(), dependent) {
            Err(TarkibError::UnresolvedDependency(err)) => {
                assert_eq!(err.requested, TypeKey::of::<dyn Metrics>());
                assert_eq!(err.required_by, Some(dependent));
            }
            other => panic!("Expected UnresolvedDependency, got: {other:?}"),
        }
    }

    #[test]
    fn empty_collection_is_unresolved() {
        let registry = CapabilityRegistry::build(&[], ResolutionPolicy::default()).unwrap();
        assert!(matches!(
            registry.resolve_all(&TypeKey::of::<dyn Metrics>()),
            Err(TarkibError::UnresolvedDependency(_))
        ));
    }

    #[test]
    fn component_without_capabilities_is_accepted() {
        let standalone = ComponentDescriptor::builder::<Standalone>()
            .constructor([], |_| Ok(Standalone))
            .build();
        let registry =
            CapabilityRegistry::build(&[standalone], ResolutionPolicy::default()).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_descriptor_fails() {
        let result = CapabilityRegistry::build(&[memory(0), memory(1)], ResolutionPolicy::default());
        assert!(matches!(result, Err(TarkibError::AlreadyRegistered(_))));
    }

    #[test]
    fn policy_parse() {
        assert_eq!("first".parse::<ResolutionPolicy>(), Ok(ResolutionPolicy::FirstRegistered));
        assert_eq!("Reject".parse::<ResolutionPolicy>(), Ok(ResolutionPolicy::RejectAmbiguous));
        assert_eq!("highest_priority".parse::<ResolutionPolicy>(), Ok(ResolutionPolicy::HighestPriority));
        assert!("last".parse::<ResolutionPolicy>().is_err());
    }
}
