//! Memoized descriptors, keyed by type.

use crate::descriptor::Descriptor;
use crate::entity::Entity;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Read-through cache of resolved [`Descriptor`]s.
///
/// Entries are written once per type and never evicted. Two threads missing
/// on the same type at the same time may both resolve it; the first insert is
/// kept and both get the stored `Arc`.
///
/// Create one at startup and share it (`Arc<DescriptorCache>`) between
/// sessions.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeId, Arc<Descriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the descriptor of `T`, resolving it on first use.
    pub fn get_or_resolve<T: Entity>(&self) -> Arc<Descriptor> {
        let key = TypeId::of::<T>();

        if let Some(found) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(found);
        }

        // Resolve without holding the lock.
        let resolved = Arc::new(Descriptor::resolve::<T>());
        tracing::trace!(
            target: "pgmap.cache",
            entity = resolved.type_name(),
            table = resolved.table_name(),
            "resolved entity descriptor"
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert(resolved))
    }

    /// Whether `T` has been resolved already.
    pub fn contains<T: Entity>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
