//! # Tarkib Macros
//!
//! The [`component`] attribute turns an inherent `impl` block into a
//! registered component: it builds the component descriptor from the
//! annotated constructor and hook, and submits it for link-time
//! discovery by `tarkib::run` and `ApplicationBuilder::scan`.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tarkib::component;
//!
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! pub struct English;
//!
//! #[component(provides(Greeter))]
//! impl English {
//!     fn new() -> Self {
//!         English
//!     }
//! }
//!
//! pub struct Main {
//!     greeter: Arc<dyn Greeter>,
//! }
//!
//! #[component(runnable)]
//! impl Main {
//!     #[constructor]
//!     fn create(greeter: Arc<dyn Greeter>) -> Self {
//!         Main { greeter }
//!     }
//!
//!     #[post_construct]
//!     fn ready(&self) {
//!         tracing::info!("ready");
//!     }
//! }
//! ```

use proc_macro::TokenStream;

mod component;

/// Registers the type of an inherent `impl` block as a component.
///
/// # Arguments
///
/// - `provides(TraitA, TraitB)` - capabilities the type implements
/// - `runnable` - the type is an entry point (implements `Runnable`)
/// - `priority = N` - weight under the highest-priority policy (default 0)
/// - `scope = "singleton"` - declared lifetime (default singleton)
///
/// # Method attributes
///
/// - `#[constructor]` marks the constructor; without one, `fn new` is used.
///   Parameters must be `Arc<dyn Trait>` (one implementation) or
///   `Vec<Arc<dyn Trait>>` (every implementation). It returns `Self` or a
///   `Result<Self, E>`.
/// - `#[post_construct]` marks a `&self` method run right after
///   construction. It returns `()` or a `Result<(), E>`.
#[proc_macro_attribute]
pub fn component(args: TokenStream, input: TokenStream) -> TokenStream {
    component::component_impl(args.into(), input.into())
        .unwrap_or_else(|err| err.write_errors())
        .into()
}
