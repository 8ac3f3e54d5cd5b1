//! Entry points.
//!
//! Once every component is constructed, components providing the
//! [`Runnable`] capability are invoked, each exactly once, in
//! registration order.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::context::Context;
use crate::descriptor::downcast_erased;
use crate::error::{BoxError, Result, TarkibError};
use crate::key::TypeKey;
use crate::registry::CapabilityRegistry;

/// The entry-point capability.
///
/// Declare it with
/// [`DescriptorBuilder::runnable`](crate::descriptor::DescriptorBuilder::runnable)
/// or `#[component(runnable)]`.
pub trait Runnable: Send + Sync {
    /// The entry action. Called once, after the whole graph is wired.
    fn run(&self) -> std::result::Result<(), BoxError>;
}

/// Invokes every runnable component once.
///
/// There is no containment: the first failing entry action stops the
/// run and its error is returned. Returns the number of entry actions
/// invoked.
#[instrument(skip_all, name = "run_entry_points")]
pub fn run(registry: &CapabilityRegistry, context: &Context) -> Result<usize> {
    info!("Running...");

    let capability = TypeKey::of::<dyn Runnable>();
    let implementations = registry.implementations(&capability);
    if implementations.is_empty() {
        warn!("No runnable component registered; nothing to run");
        return Ok(0);
    }

    let keys: Vec<TypeKey> = implementations.iter().map(|i| i.component()).collect();
    let instances = context.get_all(&keys)?;

    for (implementation, instance) in implementations.iter().zip(instances) {
        let key = implementation.component();
        let view = implementation
            .cast(instance)
            .ok_or(TarkibError::TypeMismatch {
                key,
                expected: capability.type_name(),
            })?;
        let runnable: Arc<dyn Runnable> = downcast_erased(key, view)?;

        debug!(entry = %key, "Invoking entry point");
        runnable
            .run()
            .map_err(|source| TarkibError::EntryPointFailed { key, source })?;
    }

    Ok(implementations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ComponentDescriptor;
    use crate::registry::ResolutionPolicy;
    use parking_lot::Mutex;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    struct Alpha {
        log: Log,
    }

    impl Runnable for Alpha {
        fn run(&self) -> std::result::Result<(), BoxError> {
            self.log.lock().push("alpha");
            Err("alpha exploded".into())
        }
    }

    struct Beta {
        log: Log,
    }

    impl Runnable for Beta {
        fn run(&self) -> std::result::Result<(), BoxError> {
            self.log.lock().push("beta");
            Ok(())
        }
    }

    fn alpha(log: &Log) -> ComponentDescriptor {
        let log = Arc::clone(log);
        ComponentDescriptor::builder::<Alpha>()
            .runnable()
            .constructor([], move |_| Ok(Alpha { log: Arc::clone(&log) }))
            .build()
    }

    fn beta(log: &Log) -> ComponentDescriptor {
        let log = Arc::clone(log);
        ComponentDescriptor::builder::<Beta>()
            .runnable()
            .constructor([], move |_| Ok(Beta { log: Arc::clone(&log) }))
            .build()
    }

    #[test]
    fn runs_each_entry_point_once_in_registration_order() {
        let log = Log::default();
        let registry =
            CapabilityRegistry::build(&[beta(&log), beta_twin(&log)], ResolutionPolicy::default())
                .unwrap();

        let mut context = Context::new();
        context.put(TypeKey::of::<Beta>(), Arc::new(Beta { log: Arc::clone(&log) })).unwrap();
        context
            .put(TypeKey::of::<BetaTwin>(), Arc::new(BetaTwin { log: Arc::clone(&log) }))
            .unwrap();

        assert_eq!(run(&registry, &context).unwrap(), 2);
        assert_eq!(*log.lock(), vec!["beta", "twin"]);
    }

    struct BetaTwin {
        log: Log,
    }

    impl Runnable for BetaTwin {
        fn run(&self) -> std::result::Result<(), BoxError> {
            self.log.lock().push("twin");
            Ok(())
        }
    }

    fn beta_twin(log: &Log) -> ComponentDescriptor {
        let log = Arc::clone(log);
        ComponentDescriptor::builder::<BetaTwin>()
            .runnable()
            .constructor([], move |_| Ok(BetaTwin { log: Arc::clone(&log) }))
            .build()
    }

    #[test]
    fn failure_stops_the_run() {
        let log = Log::default();
        let registry =
            CapabilityRegistry::build(&[alpha(&log), beta(&log)], ResolutionPolicy::default())
                .unwrap();

        let mut context = Context::new();
        context.put(TypeKey::of::<Alpha>(), Arc::new(Alpha { log: Arc::clone(&log) })).unwrap();
        context.put(TypeKey::of::<Beta>(), Arc::new(Beta { log: Arc::clone(&log) })).unwrap();

        match run(&registry, &context) {
            Err(TarkibError::EntryPointFailed { key, source }) => {
                assert_eq!(key, TypeKey::of::<Alpha>());
                assert!(source.to_string().contains("alpha exploded"));
            }
            other => panic!("Expected EntryPointFailed, got: {other:?}"),
        }
        assert_eq!(*log.lock(), vec!["alpha"]);
    }

    #[test]
    fn nothing_to_run() {
        let registry = CapabilityRegistry::build(&[], ResolutionPolicy::default()).unwrap();
        assert_eq!(run(&registry, &Context::new()).unwrap(), 0);
    }

    #[test]
    fn runnable_missing_from_context_is_not_found() {
        let log = Log::default();
        let registry = CapabilityRegistry::build(&[beta(&log)], ResolutionPolicy::default()).unwrap();

        assert!(matches!(
            run(&registry, &Context::new()),
            Err(TarkibError::NotFound { .. })
        ));
        assert!(log.lock().is_empty());
    }
}
