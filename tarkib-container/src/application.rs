//! # The Application: composition root of Tarkib
//!
//! Collects component descriptors, composes them into a wired object
//! graph and runs the entry points.
//!
//! # Architecture
//! ```text
//! ApplicationBuilder ──build()──> Application ──compose()──> Composition
//!                                                               │
//!   descriptors → CapabilityRegistry → DependencyGraph          │
//!              → instantiate → Context                    run_entry_points()
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use tarkib_container::prelude::*;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English;
//! impl Greeter for English {
//!     fn greet(&self) -> String { "hello".into() }
//! }
//!
//! struct Main {
//!     greeter: Arc<dyn Greeter>,
//! }
//! impl Runnable for Main {
//!     fn run(&self) -> Result<(), BoxError> {
//!         assert_eq!(self.greeter.greet(), "hello");
//!         Ok(())
//!     }
//! }
//!
//! let composition = Application::builder()
//!     .component(
//!         ComponentDescriptor::builder::<English>()
//!             .provides::<dyn Greeter>(|it| it)
//!             .constructor([], |_| Ok(English))
//!             .build(),
//!     )
//!     .component(
//!         ComponentDescriptor::builder::<Main>()
//!             .runnable()
//!             .constructor([Dependency::one::<dyn Greeter>()], |args| {
//!                 Ok(Main { greeter: args.one()? })
//!             })
//!             .build(),
//!     )
//!     .build()
//!     .run()
//!     .expect("Failed to compose");
//!
//! assert_eq!(composition.context().len(), 2);
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::context::Context;
use crate::descriptor::{ComponentDescriptor, downcast_erased};
use crate::discovery;
use crate::engine;
use crate::error::{Result, TarkibError};
use crate::graph::DependencyGraph;
use crate::key::TypeKey;
use crate::provider::{ComponentSink, Provider};
use crate::registry::{CapabilityRegistry, ResolutionPolicy};
use crate::runner;

// ============================================================
// ApplicationBuilder
// ============================================================

/// Collects descriptors and settings for an [`Application`].
///
/// # Examples
/// ```rust,ignore
/// let app = Application::builder()
///     .resolution_policy(ResolutionPolicy::HighestPriority)
///     .export_graph(true)
///     .scan("my_app")
///     .add_provider(&StorageProvider)
///     .build();
/// ```
pub struct ApplicationBuilder {
    components: Vec<ComponentDescriptor>,
    policy: ResolutionPolicy,
    export_graph: bool,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self {
            components: Vec::new(),
            policy: ResolutionPolicy::default(),
            export_graph: false,
        }
    }

    /// How single-valued parameters pick among several implementations.
    pub fn resolution_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Log the dependency graph in DOT format (debug level) when composing.
    pub fn export_graph(mut self, export: bool) -> Self {
        self.export_graph = export;
        self
    }

    /// Adds one descriptor.
    pub fn component(mut self, descriptor: ComponentDescriptor) -> Self {
        self.components.push(descriptor);
        self
    }

    /// Adds several descriptors, keeping their order.
    pub fn components(mut self, descriptors: impl IntoIterator<Item = ComponentDescriptor>) -> Self {
        self.components.extend(descriptors);
        self
    }

    /// Adds the descriptors of a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(&mut self);
        self
    }

    /// Adds every `#[component]` registered under `root_namespace`.
    pub fn scan(mut self, root_namespace: &str) -> Self {
        self.components.extend(discovery::scan(root_namespace));
        self
    }

    pub fn build(self) -> Application {
        Application {
            components: self.components,
            policy: self.policy,
            export_graph: self.export_graph,
        }
    }
}

impl ComponentSink for ApplicationBuilder {
    fn add_component(&mut self, descriptor: ComponentDescriptor) {
        self.components.push(descriptor);
    }
}

// ═══════════════════════════════════════════
// Application
// ═══════════════════════════════════════════

/// A set of descriptors ready to be composed.
pub struct Application {
    components: Vec<ComponentDescriptor>,
    policy: ResolutionPolicy,
    export_graph: bool,
}

impl Application {
    /// Create a new builder.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// The collected descriptors, in discovery order.
    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.components
    }

    /// Wires every component without running entry points.
    ///
    /// Builds the registry and the graph (rejecting bad constructors,
    /// unresolved or ambiguous dependencies and cycles before anything is
    /// constructed), then instantiates in topological order.
    #[instrument(skip(self), name = "compose", fields(components = self.components.len()))]
    pub fn compose(self) -> Result<Composition> {
        info!(
            components = self.components.len(),
            policy = %self.policy,
            "Composing application"
        );

        let registry = CapabilityRegistry::build(&self.components, self.policy)?;
        let graph = DependencyGraph::build(&self.components, &registry)?;

        if self.export_graph {
            debug!("Dependency graph:\n{}", graph.to_dot());
        }

        let context = engine::instantiate(&graph, &self.components, &registry)?;

        info!(instances = context.len(), "Application composed successfully ✓");
        Ok(Composition {
            registry,
            graph,
            context,
        })
    }

    /// Composes, then invokes every entry point once.
    pub fn run(self) -> Result<Composition> {
        let composition = self.compose()?;
        composition.run_entry_points()?;
        Ok(composition)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("components", &self.components.len())
            .field("policy", &self.policy)
            .field("export_graph", &self.export_graph)
            .finish()
    }
}

// ═══════════════════════════════════════════
// Composition
// ═══════════════════════════════════════════

/// A fully wired application: registry, graph and instances.
///
/// Read-only; instances are `Send + Sync` and may be shared freely.
#[derive(Debug)]
pub struct Composition {
    registry: CapabilityRegistry,
    graph: DependencyGraph,
    context: Context,
}

impl Composition {
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// The dependency graph, for external rendering.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn into_context(self) -> Context {
        self.context
    }

    /// Invokes every entry point once; returns how many ran.
    pub fn run_entry_points(&self) -> Result<usize> {
        runner::run(&self.registry, &self.context)
    }

    /// Looks up the implementation of capability `I` chosen by the policy.
    ///
    /// ```rust,ignore
    /// let greeter: Arc<dyn Greeter> = composition.resolve()?;
    /// ```
    pub fn resolve<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        let implementation = self.registry.resolve(&TypeKey::of::<I>())?;
        self.view(implementation)
    }

    /// Looks up every implementation of capability `I`, in registration order.
    pub fn resolve_all<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<I>>> {
        self.registry
            .resolve_all(&TypeKey::of::<I>())?
            .iter()
            .map(|implementation| self.view(implementation))
            .collect()
    }

    fn view<I: ?Sized + Send + Sync + 'static>(
        &self,
        implementation: &crate::registry::Implementation,
    ) -> Result<Arc<I>> {
        let key = implementation.component();
        let instance = self.context.get(&key)?;
        let view = implementation
            .cast(instance)
            .ok_or(TarkibError::TypeMismatch {
                key,
                expected: std::any::type_name::<I>(),
            })?;
        downcast_erased(key, view)
    }
}

// ═══════════════════════════════════════════
// Entry surface
// ═══════════════════════════════════════════

/// Composes every component registered under `root_namespace` and runs
/// the entry points.
///
/// ```rust,ignore
/// fn main() -> tarkib::Result<()> {
///     tarkib::run(module_path!())?;
///     Ok(())
/// }
/// ```
pub fn run(root_namespace: &str) -> Result<Composition> {
    Application::builder().scan(root_namespace).build().run()
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Application, ApplicationBuilder, Composition, run};
    pub use crate::context::Context;
    pub use crate::descriptor::{Args, ComponentDescriptor, Dependency};
    pub use crate::error::{BoxError, TarkibError};
    pub use crate::key::TypeKey;
    pub use crate::provider::{ComponentSink, Provider};
    pub use crate::registry::ResolutionPolicy;
    pub use crate::runner::Runnable;
    pub use crate::scope::Scope;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════
