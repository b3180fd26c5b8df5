//! Descriptor cache keyed by request type.
//!
//! Building a descriptor walks the field table and compiles a regex, so endpoints build once
//! and share the result. The cache is an explicit value; applications own one (usually behind
//! an `Arc`) and hand it to whatever registers routes.
//!
//! Concurrent first requests for the same type may each build a descriptor. Both builds are
//! equal, the last insert wins, and every caller gets a usable descriptor. Racing builds for
//! different templates are caught when the result is inserted: the later one fails with
//! [`BuildError::TemplateConflict`].

use crate::bindable::Bindable;
use crate::descriptor::RequestDescriptor;
use crate::error::BuildError;
use crate::metrics::BindMetrics;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

type Entry = Arc<dyn Any + Send + Sync>;

/// Thread-safe map from request type to its descriptor.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, Entry>>,
    builds: AtomicU64,
}

impl DescriptorCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached descriptor for `T`, if any.
    #[must_use]
    pub fn get<T: Bindable>(&self) -> Option<Arc<RequestDescriptor<T>>> {
        let entry = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            entries.get(&TypeId::of::<T>()).cloned()
        };
        entry.and_then(|entry| entry.downcast::<RequestDescriptor<T>>().ok())
    }

    /// Store a descriptor for `T`, or evict it when `descriptor` is `None`.
    pub fn set<T: Bindable>(&self, descriptor: Option<Arc<RequestDescriptor<T>>>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match descriptor {
            Some(descriptor) => {
                entries.insert(TypeId::of::<T>(), descriptor);
            }
            None => {
                entries.remove(&TypeId::of::<T>());
            }
        }
    }

    /// Remove the descriptor for `T`. Returns whether one was cached.
    pub fn evict<T: Bindable>(&self) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&TypeId::of::<T>()).is_some()
    }

    /// Cached descriptor for `T`, building and caching it on a miss.
    ///
    /// The build runs without holding the lock.
    ///
    /// # Errors
    ///
    /// Returns the [`BuildError`] of a failed build (nothing is cached), or
    /// [`BuildError::TemplateConflict`] when `T` is cached under a different template.
    pub fn get_or_build<T: Bindable>(
        &self,
        template: &str,
    ) -> Result<Arc<RequestDescriptor<T>>, BuildError> {
        if let Some(cached) = self.get::<T>() {
            BindMetrics::record_lookup(true);
            if cached.template() != template {
                return Err(conflict::<T>(cached.template(), template));
            }
            tracing::trace!(type_name = T::TYPE_NAME, "Descriptor cache hit");
            return Ok(cached);
        }
        BindMetrics::record_lookup(false);

        let started = Instant::now();
        let descriptor = match RequestDescriptor::<T>::build(template) {
            Ok(descriptor) => Arc::new(descriptor),
            Err(error) => {
                tracing::error!(
                    type_name = T::TYPE_NAME,
                    template,
                    error = %error,
                    "Failed to build request descriptor"
                );
                return Err(error);
            }
        };
        self.builds.fetch_add(1, Ordering::Relaxed);
        BindMetrics::record_build(T::TYPE_NAME, started.elapsed());
        tracing::debug!(
            type_name = T::TYPE_NAME,
            template,
            params = ?descriptor.path_params(),
            body = ?descriptor.body(),
            "Built request descriptor"
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let raced = entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<RequestDescriptor<T>>().ok());
        if let Some(raced) = raced {
            if raced.template() != template {
                return Err(conflict::<T>(raced.template(), template));
            }
        }
        entries.insert(TypeId::of::<T>(), Arc::clone(&descriptor) as Entry);
        Ok(descriptor)
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of descriptors built through [`get_or_build`](Self::get_or_build).
    #[must_use]
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

fn conflict<T: Bindable>(registered: &str, requested: &str) -> BuildError {
    tracing::warn!(
        type_name = T::TYPE_NAME,
        registered,
        requested,
        "Request type already registered with another template"
    );
    BuildError::TemplateConflict {
        type_name: T::TYPE_NAME,
        registered: registered.to_string(),
        requested: requested.to_string(),
    }
}
