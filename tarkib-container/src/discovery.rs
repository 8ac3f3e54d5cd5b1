//! Link-time component discovery.
//!
//! `#[component]` submits a [`ComponentRegistration`] for every
//! annotated type. [`scan`] collects the registrations below a root
//! namespace (a module path) and turns them into descriptors.

use tracing::{debug, instrument};

use crate::descriptor::ComponentDescriptor;

/// A component registration collected at link time.
pub struct ComponentRegistration {
    namespace: &'static str,
    describe: fn() -> ComponentDescriptor,
}

impl ComponentRegistration {
    /// Creates a registration; `namespace` is normally `module_path!()`.
    pub const fn new(namespace: &'static str, describe: fn() -> ComponentDescriptor) -> Self {
        Self { namespace, describe }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Produces the descriptor.
    pub fn describe(&self) -> ComponentDescriptor {
        (self.describe)()
    }
}

inventory::collect!(ComponentRegistration);

/// Returns `true` if `namespace` is `root` or nested below it.
///
/// An empty root matches everything.
///
/// ```
/// use tarkib_container::discovery::in_namespace;
///
/// assert!(in_namespace("app::services", "app"));
/// assert!(in_namespace("app", "app"));
/// assert!(!in_namespace("application", "app"));
/// ```
pub fn in_namespace(namespace: &str, root: &str) -> bool {
    if root.is_empty() {
        return true;
    }
    match namespace.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with("::"),
        None => false,
    }
}

/// Collects the descriptors of every registered component under `root`.
///
/// Link order is not meaningful, so the result is sorted by type name to
/// give a stable discovery order.
#[instrument(name = "scan")]
pub fn scan(root: &str) -> Vec<ComponentDescriptor> {
    let mut descriptors: Vec<ComponentDescriptor> = inventory::iter::<ComponentRegistration>
        .into_iter()
        .filter(|registration| in_namespace(registration.namespace, root))
        .map(ComponentRegistration::describe)
        .collect();
    descriptors.sort_by(|a, b| a.key().type_name().cmp(b.key().type_name()));

    debug!("Found {} components in `{root}`", descriptors.len());
    descriptors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::TypeKey;

    mod fixtures {
        use super::super::*;

        pub struct Zeta;
        pub struct Alpha;

        fn describe_zeta() -> ComponentDescriptor {
            ComponentDescriptor::builder::<Zeta>()
                .namespace(module_path!())
                .constructor([], |_| Ok(Zeta))
                .build()
        }

        fn describe_alpha() -> ComponentDescriptor {
            ComponentDescriptor::builder::<Alpha>()
                .namespace(module_path!())
                .constructor([], |_| Ok(Alpha))
                .build()
        }

        inventory::submit! {
            ComponentRegistration::new(module_path!(), describe_zeta)
        }

        inventory::submit! {
            ComponentRegistration::new(module_path!(), describe_alpha)
        }
    }

    #[test]
    fn namespace_matching() {
        assert!(in_namespace("a::b::c", "a::b"));
        assert!(!in_namespace("a::bc", "a::b"));
        assert!(in_namespace("anything", ""));
    }

    #[test]
    fn scan_finds_registered_components_sorted() {
        let descriptors = scan("tarkib_container::discovery::tests::fixtures");
        let keys: Vec<TypeKey> = descriptors.iter().map(ComponentDescriptor::key).collect();

        assert_eq!(
            keys,
            vec![TypeKey::of::<fixtures::Alpha>(), TypeKey::of::<fixtures::Zeta>()]
        );
        assert!(descriptors.iter().all(|d| d.namespace().ends_with("fixtures")));
    }

    #[test]
    fn scan_outside_root_finds_nothing() {
        assert!(scan("tarkib_container::nowhere").is_empty());
    }
}
