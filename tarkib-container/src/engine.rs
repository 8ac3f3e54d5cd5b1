//! Topological instantiation.
//!
//! Walks the dependency graph in topological order and constructs each
//! component exactly once:
//! 1. resolve its constructor parameters to already-built instances,
//! 2. call the constructor,
//! 3. insert the instance into the [`Context`],
//! 4. run its post-construct hook, if any.
//!
//! Any failure aborts the whole instantiation.

use std::collections::HashMap;

use tarkib_support::rendering::{PlanEntry, render_plan};
use tracing::{debug, enabled, instrument, warn, Level};

use crate::context::Context;
use crate::descriptor::{Args, Cardinality, ComponentDescriptor, Dependency, Resolved};
use crate::error::{Result, TarkibError};
use crate::graph::DependencyGraph;
use crate::key::TypeKey;
use crate::registry::CapabilityRegistry;

/// Constructs every component of `graph`.
///
/// # Errors
/// - [`TarkibError::MissingConstructor`]: a vertex has no descriptor
/// - [`TarkibError::DependencyNotYetConstructed`]: ordering defect
/// - [`TarkibError::ConstructionFailed`] / [`TarkibError::PostConstructFailed`]
/// - any resolution error from the registry
#[instrument(skip_all, name = "instantiate")]
pub fn instantiate(
    graph: &DependencyGraph,
    descriptors: &[ComponentDescriptor],
    registry: &CapabilityRegistry,
) -> Result<Context> {
    let by_key: HashMap<TypeKey, &ComponentDescriptor> =
        descriptors.iter().map(|d| (d.key(), d)).collect();

    let order = graph.topological_order();
    if enabled!(Level::DEBUG) {
        let plan: Vec<PlanEntry> = order
            .iter()
            .filter_map(|key| by_key.get(key))
            .map(|d| PlanEntry {
                type_name: d.key().short_name(),
                scope: d.scope().to_string(),
                has_post_construct: d.has_post_construct(),
            })
            .collect();
        debug!("Instantiation plan:\n{}", render_plan(&plan));
    }

    let mut context = Context::with_capacity(order.len());
    for key in &order {
        let descriptor = by_key
            .get(key)
            .ok_or(TarkibError::MissingConstructor { component: *key })?;
        construct(descriptor, registry, &mut context)?;
    }

    debug!(components = context.len(), "All components constructed");
    Ok(context)
}

/// Constructs one component, inserts it, then runs its hook.
fn construct(
    descriptor: &ComponentDescriptor,
    registry: &CapabilityRegistry,
    context: &mut Context,
) -> Result<()> {
    let key = descriptor.key();
    if !descriptor.scope().is_singleton() {
        warn!(
            component = %key,
            scope = %descriptor.scope(),
            "Only singleton scope is supported; constructing once"
        );
    }

    let constructor = descriptor.constructor()?;
    let values = constructor
        .params()
        .iter()
        .map(|dependency| resolve_argument(dependency, key, registry, context))
        .collect::<Result<Vec<_>>>()?;

    debug!(component = %key, arguments = values.len(), "Constructing");
    let instance = constructor.invoke(&mut Args::new(key, values))?;
    context.put(key, instance.clone())?;

    if let Some(hook) = descriptor.post_construct() {
        debug!(component = %key, "Invoking post-construct hook");
        hook(&instance)?;
    }

    Ok(())
}

/// Resolves one constructor parameter of `dependent` from the context.
fn resolve_argument(
    dependency: &Dependency,
    dependent: TypeKey,
    registry: &CapabilityRegistry,
    context: &Context,
) -> Result<Resolved> {
    let mut views = Vec::new();
    for implementation in registry.resolve_dependency(dependency, dependent)? {
        let component = implementation.component();
        let instance = context
            .get(&component)
            .map_err(|_| TarkibError::DependencyNotYetConstructed {
                dependency: component,
                dependent,
            })?;
        let view = implementation
            .cast(instance)
            .ok_or(TarkibError::TypeMismatch {
                key: component,
                expected: dependency.capability().type_name(),
            })?;
        views.push(view);
    }

    match dependency.cardinality() {
        Cardinality::All => Ok(Resolved::All(views)),
        Cardinality::One => views.pop().map(Resolved::One).ok_or_else(|| {
            TarkibError::construction(dependent, "no implementation resolved for a single parameter")
        }),
    }
}
