//! Component descriptors: the declared shape of a component.
//!
//! A [`ComponentDescriptor`] is everything the core knows about a
//! component: its concrete type, the capabilities (`dyn Trait`) it
//! provides, its constructor with the capabilities it needs, and an
//! optional post-construct hook. Descriptors are produced once, by the
//! `#[component]` macro or by hand, and never change afterwards.
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use tarkib_container::descriptor::{ComponentDescriptor, Dependency};
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! struct Scheduler {
//!     clock: Arc<dyn Clock>,
//! }
//!
//! let clock = ComponentDescriptor::builder::<FixedClock>()
//!     .provides::<dyn Clock>(|it| it)
//!     .constructor([], |_| Ok(FixedClock))
//!     .build();
//!
//! let scheduler = ComponentDescriptor::builder::<Scheduler>()
//!     .constructor([Dependency::one::<dyn Clock>()], |args| {
//!         Ok(Scheduler { clock: args.one()? })
//!     })
//!     .build();
//!
//! assert_eq!(scheduler.dependencies().len(), 1);
//! assert!(clock.implements(&tarkib_container::key::TypeKey::of::<dyn Clock>()));
//! ```

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{AmbiguousConstructorError, BoxError, Result, TarkibError};
use crate::key::TypeKey;
use crate::runner::Runnable;
use crate::scope::Scope;

/// A constructed component, type-erased.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A component viewed through one capability: a boxed `Arc<dyn Trait>`.
pub(crate) type Erased = Box<dyn Any + Send + Sync>;

/// Turns a component instance into one of its capability views.
pub(crate) type CastFn = Arc<dyn Fn(&Instance) -> Option<Erased> + Send + Sync>;

/// Builds a component from its resolved arguments.
pub(crate) type ConstructFn = Arc<dyn Fn(&mut Args) -> Result<Instance> + Send + Sync>;

/// Runs a post-construct hook against a freshly inserted instance.
pub(crate) type HookFn = Arc<dyn Fn(&Instance) -> Result<()> + Send + Sync>;

/// A capability a component provides, with the cast that exposes it.
#[derive(Clone)]
pub struct Capability {
    key: TypeKey,
    cast: CastFn,
}

impl Capability {
    /// The capability (`dyn Trait`) type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub(crate) fn cast_fn(&self) -> &CastFn {
        &self.cast
    }
}

impl fmt::Debug for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability({})", self.key)
    }
}

/// How many implementations a constructor parameter receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// One implementation, picked by the resolution policy.
    One,
    /// Every implementation, in registration order.
    All,
}

/// A constructor parameter: a capability and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dependency {
    capability: TypeKey,
    cardinality: Cardinality,
}

impl Dependency {
    /// Requests one implementation of `I`, injected as `Arc<I>`.
    pub fn one<I: ?Sized + 'static>() -> Self {
        Self {
            capability: TypeKey::of::<I>(),
            cardinality: Cardinality::One,
        }
    }

    /// Requests all implementations of `I`, injected as `Vec<Arc<I>>`.
    pub fn all<I: ?Sized + 'static>() -> Self {
        Self {
            capability: TypeKey::of::<I>(),
            cardinality: Cardinality::All,
        }
    }

    pub fn capability(&self) -> TypeKey {
        self.capability
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }
}

/// A component constructor: its parameters and the function building it.
#[derive(Clone)]
pub struct Constructor {
    params: Vec<Dependency>,
    build: ConstructFn,
}

impl Constructor {
    /// Parameters in declaration order.
    pub fn params(&self) -> &[Dependency] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: &mut Args) -> Result<Instance> {
        (self.build)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}

/// A resolved constructor argument.
pub(crate) enum Resolved {
    One(Erased),
    All(Vec<Erased>),
}

/// Resolved constructor arguments, consumed in parameter order.
///
/// Passed to the constructor function; each call to [`Args::one`] or
/// [`Args::all`] takes the next argument.
pub struct Args {
    component: TypeKey,
    values: std::vec::IntoIter<Resolved>,
    position: usize,
}

impl Args {
    pub(crate) fn new(component: TypeKey, values: Vec<Resolved>) -> Self {
        Self {
            component,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// The component being constructed.
    pub fn component(&self) -> TypeKey {
        self.component
    }

    /// Number of arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }

    /// Takes the next argument, declared with [`Dependency::one`].
    pub fn one<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<I>> {
        match self.next_value()? {
            Resolved::One(value) => downcast_erased(self.component, value),
            Resolved::All(_) => Err(self.mismatch("a single implementation", "a collection")),
        }
    }

    /// Takes the next argument, declared with [`Dependency::all`].
    pub fn all<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<I>>> {
        match self.next_value()? {
            Resolved::All(values) => values
                .into_iter()
                .map(|value| downcast_erased(self.component, value))
                .collect(),
            Resolved::One(_) => Err(self.mismatch("a collection", "a single implementation")),
        }
    }

    fn next_value(&mut self) -> Result<Resolved> {
        let position = self.position;
        self.position += 1;
        self.values.next().ok_or_else(|| {
            TarkibError::construction(
                self.component,
                format!("argument #{position} was requested but never declared"),
            )
        })
    }

    fn mismatch(&self, requested: &str, declared: &str) -> TarkibError {
        TarkibError::construction(
            self.component,
            format!(
                "argument #{} was requested as {requested} but declared as {declared}",
                self.position - 1
            ),
        )
    }
}

/// Recovers an `Arc<I>` from a capability view.
pub(crate) fn downcast_erased<I: ?Sized + Send + Sync + 'static>(
    key: TypeKey,
    value: Erased,
) -> Result<Arc<I>> {
    value
        .downcast::<Arc<I>>()
        .map(|boxed| *boxed)
        .map_err(|_| TarkibError::TypeMismatch {
            key,
            expected: type_name::<Arc<I>>(),
        })
}

/// The declared shape of one component.
///
/// Type-erased so descriptors of different components can live in one
/// collection. Use [`ComponentDescriptor::builder`] to create one.
#[derive(Clone)]
pub struct ComponentDescriptor {
    key: TypeKey,
    namespace: &'static str,
    scope: Scope,
    priority: i32,
    capabilities: Vec<Capability>,
    constructors: Vec<Constructor>,
    post_construct: Option<HookFn>,
}

impl ComponentDescriptor {
    /// Starts describing component `T`.
    pub fn builder<T: Send + Sync + 'static>() -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: ComponentDescriptor {
                key: TypeKey::of::<T>(),
                namespace: "",
                scope: Scope::Singleton,
                priority: 0,
                capabilities: Vec::new(),
                constructors: Vec::new(),
                post_construct: None,
            },
            _marker: PhantomData,
        }
    }

    /// The concrete component type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Module path the component was declared in (empty if unknown).
    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Priority used by [`ResolutionPolicy::HighestPriority`](crate::registry::ResolutionPolicy).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Returns `true` if this component provides `capability`.
    pub fn implements(&self, capability: &TypeKey) -> bool {
        self.capabilities.iter().any(|c| c.key == *capability)
    }

    /// All declared constructors (exactly one is valid).
    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// The single constructor of this component.
    ///
    /// # Errors
    /// - [`TarkibError::MissingConstructor`]: none declared
    /// - [`TarkibError::AmbiguousConstructor`]: more than one declared
    pub fn constructor(&self) -> Result<&Constructor> {
        match self.constructors.as_slice() {
            [constructor] => Ok(constructor),
            [] => Err(TarkibError::MissingConstructor {
                component: self.key,
            }),
            many => Err(TarkibError::AmbiguousConstructor(AmbiguousConstructorError {
                component: self.key,
                count: many.len(),
            })),
        }
    }

    /// Parameters of the first declared constructor (empty if none).
    pub fn dependencies(&self) -> &[Dependency] {
        self.constructors
            .first()
            .map(Constructor::params)
            .unwrap_or(&[])
    }

    pub fn has_post_construct(&self) -> bool {
        self.post_construct.is_some()
    }

    pub(crate) fn post_construct(&self) -> Option<&HookFn> {
        self.post_construct.as_ref()
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("key", &self.key)
            .field("namespace", &self.namespace)
            .field("scope", &self.scope)
            .field("priority", &self.priority)
            .field("capabilities", &self.capabilities)
            .field("constructors", &self.constructors)
            .field("post_construct", &self.post_construct.is_some())
            .finish()
    }
}

/// Typed builder for a [`ComponentDescriptor`].
pub struct DescriptorBuilder<T> {
    descriptor: ComponentDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    /// Sets the namespace used by [`scan`](crate::discovery::scan).
    pub fn namespace(mut self, namespace: &'static str) -> Self {
        self.descriptor.namespace = namespace;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.descriptor.scope = scope;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.descriptor.priority = priority;
        self
    }

    /// Declares that `T` provides capability `I`.
    ///
    /// The cast is usually just `|it| it`; the unsizing coercion from
    /// `Arc<T>` to `Arc<dyn Trait>` happens in the closure body.
    pub fn provides<I: ?Sized + Send + Sync + 'static>(mut self, cast: fn(Arc<T>) -> Arc<I>) -> Self {
        let key = TypeKey::of::<I>();
        if self.descriptor.implements(&key) {
            return self;
        }

        let cast: CastFn = Arc::new(move |instance: &Instance| {
            let concrete = Arc::clone(instance).downcast::<T>().ok()?;
            Some(Box::new(cast(concrete)) as Erased)
        });
        self.descriptor.capabilities.push(Capability { key, cast });
        self
    }

    /// Declares `T` as an entry point.
    pub fn runnable(self) -> Self
    where
        T: Runnable,
    {
        self.provides::<dyn Runnable>(|it| it)
    }

    /// Adds a constructor.
    ///
    /// `build` must consume the arguments in the order of `params`.
    /// Declaring more than one constructor is allowed here and rejected
    /// when the application is composed.
    pub fn constructor<F>(mut self, params: impl IntoIterator<Item = Dependency>, build: F) -> Self
    where
        F: Fn(&mut Args) -> Result<T> + Send + Sync + 'static,
    {
        let build: ConstructFn = Arc::new(move |args: &mut Args| {
            let value = build(args)?;
            Ok(Arc::new(value) as Instance)
        });
        self.descriptor.constructors.push(Constructor {
            params: params.into_iter().collect(),
            build,
        });
        self
    }

    /// Sets the post-construct hook, replacing any previous one.
    pub fn post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let key = self.descriptor.key;
        let hook: HookFn = Arc::new(move |instance: &Instance| {
            let this = instance
                .downcast_ref::<T>()
                .ok_or(TarkibError::TypeMismatch {
                    key,
                    expected: type_name::<T>(),
                })?;
            hook(this).map_err(|source| TarkibError::PostConstructFailed { key, source })
        });
        self.descriptor.post_construct = Some(hook);
        self
    }

    pub fn build(self) -> ComponentDescriptor {
        self.descriptor
    }
}
