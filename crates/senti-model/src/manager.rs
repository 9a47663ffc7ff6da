//! Lazy, exactly-once initialization of an expensive shared resource
//!
//! A [`ResourceManager`] starts out unbuilt. The first caller of
//! [`ResourceManager::acquire`] builds the resource through its
//! [`ResourceLoader`] while holding the build gate; concurrent callers queue
//! on the gate and re-check readiness once they get it. A failed build caches
//! nothing, so the next caller through the gate tries again.

use async_trait::async_trait;
use senti_core::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Builds the resource held by a [`ResourceManager`]
#[async_trait]
pub trait ResourceLoader<T: ?Sized + Send + Sync>: Send + Sync {
    /// Perform the (expensive) build
    async fn load(&self) -> Result<Arc<T>>;
}

/// Observable lifecycle state of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Unbuilt,
    Building,
    Ready,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Unbuilt => write!(f, "unbuilt"),
            ResourceState::Building => write!(f, "building"),
            ResourceState::Ready => write!(f, "ready"),
        }
    }
}

/// Owner of a lazily-built, immutable shared resource
pub struct ResourceManager<T: ?Sized + Send + Sync> {
    name: String,
    loader: Arc<dyn ResourceLoader<T>>,

    /// Set exactly once, under the gate
    ready: OnceLock<Arc<T>>,

    /// Serializes build attempts
    gate: Mutex<()>,

    building: AtomicBool,
    attempts: AtomicU64,
}

impl<T: ?Sized + Send + Sync> ResourceManager<T> {
    /// Create a manager that builds its resource with `loader`
    pub fn new(name: impl Into<String>, loader: Arc<dyn ResourceLoader<T>>) -> Self {
        Self {
            name: name.into(),
            loader,
            ready: OnceLock::new(),
            gate: Mutex::new(()),
            building: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
        }
    }

    /// Create a manager from a concrete loader
    pub fn with_loader<L>(name: impl Into<String>, loader: L) -> Self
    where
        L: ResourceLoader<T> + 'static,
    {
        Self::new(name, Arc::new(loader))
    }

    /// Get the resource, building it on first use.
    ///
    /// Once built the resource is returned without touching the gate.
    pub async fn acquire(&self) -> Result<Arc<T>> {
        if let Some(resource) = self.ready.get() {
            return Ok(Arc::clone(resource));
        }

        let _gate = self.gate.lock().await;

        // Another caller may have finished the build while we waited
        if let Some(resource) = self.ready.get() {
            debug!(resource = %self.name, "Resource built by a concurrent caller");
            return Ok(Arc::clone(resource));
        }

        self.build().await
    }

    /// Run one build attempt. Must be called with the gate held.
    async fn build(&self) -> Result<Arc<T>> {
        let _building = BuildingFlag::raise(&self.building);
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let start = Instant::now();

        info!(resource = %self.name, attempt, "Building resource");

        match self.loader.load().await {
            Ok(resource) => {
                // The gate is held, so the cell is still empty
                let _ = self.ready.set(Arc::clone(&resource));
                info!(
                    resource = %self.name,
                    attempt,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Resource ready"
                );
                Ok(resource)
            }
            Err(e) => {
                error!(
                    resource = %self.name,
                    attempt,
                    error = %e,
                    "Resource build failed"
                );
                Err(e)
            }
        }
    }

    /// Name of the managed resource
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> ResourceState {
        if self.ready.get().is_some() {
            ResourceState::Ready
        } else if self.building.load(Ordering::SeqCst) {
            ResourceState::Building
        } else {
            ResourceState::Unbuilt
        }
    }

    /// Whether the resource has been built
    pub fn is_ready(&self) -> bool {
        self.ready.get().is_some()
    }

    /// Number of build attempts made so far
    pub fn build_attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl<T: ?Sized + Send + Sync> fmt::Debug for ResourceManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("build_attempts", &self.build_attempts())
            .finish()
    }
}

/// Marks a build as in flight; cleared on drop so a cancelled build does not
/// leave the manager reporting `Building`
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
