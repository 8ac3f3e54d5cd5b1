//! Provider trait: a module of related component descriptors.
//!
//! Providers group the descriptors of one area of an application, so
//! the composition root adds a handful of providers instead of listing
//! every component.
//!
//! # Examples
//! ```rust,ignore
//! struct StorageProvider;
//!
//! impl Provider for StorageProvider {
//!     fn register(&self, sink: &mut dyn ComponentSink) {
//!         sink.add_component(pool_descriptor());
//!         sink.add_component(repository_descriptor());
//!     }
//! }
//!
//! let app = Application::builder()
//!     .add_provider(&StorageProvider)
//!     .build();
//! ```

use crate::descriptor::ComponentDescriptor;

/// A module that contributes component descriptors.
pub trait Provider: Send + Sync {
    /// Adds this provider's descriptors to `sink`.
    ///
    /// Called once while the application is being assembled.
    fn register(&self, sink: &mut dyn ComponentSink);

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Receiver of descriptors contributed by a [`Provider`].
///
/// Implemented by [`ApplicationBuilder`](crate::application::ApplicationBuilder);
/// providers can be tested against any other implementation.
pub trait ComponentSink {
    fn add_component(&mut self, descriptor: ComponentDescriptor);
}

impl ComponentSink for Vec<ComponentDescriptor> {
    fn add_component(&mut self, descriptor: ComponentDescriptor) {
        self.push(descriptor);
    }
}
