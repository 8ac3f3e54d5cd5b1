//! The instance store.
//!
//! Maps each concrete component type to its single instance. Written
//! only by the instantiation engine, in topological order, and read-only
//! once composition finishes.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::descriptor::Instance;
use crate::error::{Result, TarkibError};
use crate::key::TypeKey;

/// Append-only store of constructed components.
#[derive(Default)]
pub struct Context {
    instances: HashMap<TypeKey, Instance>,
    /// Insertion order
    order: Vec<TypeKey>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
        }
    }

    /// Inserts the instance of `key`.
    ///
    /// # Errors
    /// [`TarkibError::DuplicateInstance`] if `key` already has an instance.
    pub fn put(&mut self, key: TypeKey, instance: Instance) -> Result<()> {
        if self.instances.contains_key(&key) {
            return Err(TarkibError::DuplicateInstance { key });
        }

        trace!(component = %key, "Pushing instance into context");
        self.instances.insert(key, instance);
        self.order.push(key);
        Ok(())
    }

    /// Returns the instance of `key`.
    ///
    /// # Errors
    /// [`TarkibError::NotFound`] if nothing was inserted for `key`.
    pub fn get(&self, key: &TypeKey) -> Result<&Instance> {
        trace!(component = %key, "Looking up instance");
        self.instances
            .get(key)
            .ok_or(TarkibError::NotFound { key: *key })
    }

    /// Returns the instances of `keys`, in input order.
    ///
    /// Stops at the first missing key.
    pub fn get_all(&self, keys: &[TypeKey]) -> Result<Vec<&Instance>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Returns the instance of concrete type `T`.
    pub fn get_typed<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let key = TypeKey::of::<T>();
        let instance = Arc::clone(self.get(&key)?);
        instance
            .downcast::<T>()
            .map_err(|_| TarkibError::TypeMismatch {
                key,
                expected: type_name::<T>(),
            })
    }

    pub fn contains(&self, key: &TypeKey) -> bool {
        self.instances.contains_key(key)
    }

    /// Keys in the order their instances were inserted.
    pub fn keys(&self) -> &[TypeKey] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("instances", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database {
        url: &'static str,
    }
    struct Cache;

    #[test]
    fn put_and_get() {
        let mut context = Context::new();
        let key = TypeKey::of::<Database>();
        context.put(key, Arc::new(Database { url: "pg://" })).unwrap();

        assert!(context.contains(&key));
        assert_eq!(context.len(), 1);
        assert_eq!(context.get_typed::<Database>().unwrap().url, "pg://");
    }

    #[test]
    fn second_put_fails() {
        let mut context = Context::new();
        let key = TypeKey::of::<Cache>();
        context.put(key, Arc::new(Cache)).unwrap();

        match context.put(key, Arc::new(Cache)) {
            Err(TarkibError::DuplicateInstance { key: dup }) => assert_eq!(dup, key),
            other => panic!("Expected DuplicateInstance, got: {other:?}"),
        }
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn missing_key_not_found() {
        let context = Context::new();
        assert!(matches!(
            context.get(&TypeKey::of::<Cache>()),
            Err(TarkibError::NotFound { .. })
        ));
    }

    #[test]
    fn get_all_keeps_input_order_and_short_circuits() {
        let mut context = Context::new();
        context.put(TypeKey::of::<Database>(), Arc::new(Database { url: "" })).unwrap();
        context.put(TypeKey::of::<Cache>(), Arc::new(Cache)).unwrap();

        let found = context
            .get_all(&[TypeKey::of::<Cache>(), TypeKey::of::<Database>()])
            .unwrap();
        assert!(found[0].is::<Cache>());
        assert!(found[1].is::<Database>());

        let err = context
            .get_all(&[TypeKey::of::<Cache>(), TypeKey::of::<u8>(), TypeKey::of::<u16>()])
            .unwrap_err();
        match err {
            TarkibError::NotFound { key } => assert_eq!(key, TypeKey::of::<u8>()),
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn keys_follow_insertion_order() {
        let mut context = Context::new();
        context.put(TypeKey::of::<Cache>(), Arc::new(Cache)).unwrap();
        context.put(TypeKey::of::<Database>(), Arc::new(Database { url: "" })).unwrap();
        assert_eq!(
            context.keys(),
            &[TypeKey::of::<Cache>(), TypeKey::of::<Database>()]
        );
    }

    #[test]
    fn typed_lookup_with_wrong_instance_fails() {
        let mut context = Context::new();
        context.put(TypeKey::of::<Cache>(), Arc::new(5u32)).unwrap();
        assert!(matches!(
            context.get_typed::<Cache>(),
            Err(TarkibError::TypeMismatch { .. })
        ));
    }
}
