//! # Tarkib: a minimal IoC container for Rust
//!
//! Components declare the capabilities (`dyn Trait`) they provide and the
//! ones their constructor needs. Tarkib discovers them, builds the
//! dependency graph, rejects cycles and unresolvable dependencies before
//! anything is constructed, instantiates every component exactly once in
//! topological order and finally runs the entry points.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tarkib::prelude::*;
//!
//! pub trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! pub struct SystemClock;
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! #[component(provides(Clock))]
//! impl SystemClock {
//!     fn new() -> Self { SystemClock }
//! }
//!
//! pub struct Main {
//!     clock: Arc<dyn Clock>,
//! }
//!
//! #[component(runnable)]
//! impl Main {
//!     fn new(clock: Arc<dyn Clock>) -> Self { Main { clock } }
//! }
//!
//! impl Runnable for Main {
//!     fn run(&self) -> Result<(), BoxError> {
//!         println!("now = {}", self.clock.now());
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> tarkib::Result<()> {
//!     tarkib::run(module_path!())?;
//!     Ok(())
//! }
//! ```

pub use tarkib_container::*;
pub use tarkib_macros::component;
pub use tarkib_support::*;

pub mod prelude {
    pub use tarkib_container::prelude::*;
    pub use tarkib_macros::component;
}
