//! Core container implementation for Tarkib.

pub mod application;
pub mod context;
pub mod descriptor;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod graph;
pub mod key;
pub mod provider;
pub mod registry;
pub mod runner;
pub mod scope;

pub use application::{Application, ApplicationBuilder, Composition, prelude, run};
pub use context::Context;
pub use descriptor::{Args, ComponentDescriptor, Dependency, DescriptorBuilder};
pub use error::{BoxError, Result, TarkibError};
pub use graph::DependencyGraph;
pub use key::TypeKey;
pub use registry::{CapabilityRegistry, ResolutionPolicy};
pub use runner::Runnable;
pub use scope::Scope;

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
