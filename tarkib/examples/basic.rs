//! Basic example of Tarkib wiring.
//!
//! Run with `RUST_LOG=tarkib_container=debug` to see the discovery,
//! the instantiation plan and the dependency graph.

use std::sync::Arc;

use tarkib::prelude::*;
use tracing_subscriber::EnvFilter;

// === Capabilities ===

pub trait Storage: Send + Sync {
    fn describe(&self) -> String;
}

pub trait Greeting: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

// === Components ===

pub struct MemoryStorage;

impl Storage for MemoryStorage {
    fn describe(&self) -> String {
        "in-memory storage".to_string()
    }
}

#[component(provides(Storage))]
impl MemoryStorage {
    fn new() -> Self {
        MemoryStorage
    }
}

pub struct FriendlyGreeting {
    storage: Arc<dyn Storage>,
}

impl Greeting for FriendlyGreeting {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}! (backed by {})", self.storage.describe())
    }
}

#[component(provides(Greeting))]
impl FriendlyGreeting {
    fn new(storage: Arc<dyn Storage>) -> Self {
        FriendlyGreeting { storage }
    }

    #[post_construct]
    fn ready(&self) {
        println!("🔧 FriendlyGreeting ready");
    }
}

pub struct Main {
    greeting: Arc<dyn Greeting>,
}

#[component(runnable)]
impl Main {
    fn new(greeting: Arc<dyn Greeting>) -> Self {
        Main { greeting }
    }
}

impl Runnable for Main {
    fn run(&self) -> Result<(), BoxError> {
        println!("👋 {}", self.greeting.greet("world"));
        Ok(())
    }
}

fn main() -> tarkib::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tarkib_container=info")),
        )
        .init();

    let composition = Application::builder()
        .scan(module_path!())
        .export_graph(true)
        .build()
        .run()?;

    println!("✅ {} components wired", composition.context().len());
    println!("{}", composition.graph().to_dot());
    Ok(())
}
