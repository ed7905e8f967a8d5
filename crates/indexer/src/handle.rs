use crate::bundle::IndexBundle;
use crate::error::Result;
use crate::persist::load;
use careguide_vector_store::{FlatL2Index, VectorIndex};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, hot-swappable reference to the live index bundle.
///
/// Readers take a snapshot per request and keep using it even if a rebuild
/// is swapped in while they work.
pub struct IndexHandle<I = FlatL2Index> {
    current: RwLock<Arc<IndexBundle<I>>>,
}

impl<I: VectorIndex> IndexHandle<I> {
    pub fn new(bundle: IndexBundle<I>) -> Self {
        Self {
            current: RwLock::new(Arc::new(bundle)),
        }
    }

    /// Load the published pair under `source`
    pub async fn open(source: &Path) -> Result<Self> {
        Ok(Self::new(load(source).await?))
    }

    pub fn snapshot(&self) -> Arc<IndexBundle<I>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the live bundle, returning the one it replaced
    pub fn swap(&self, bundle: IndexBundle<I>) -> Arc<IndexBundle<I>> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(bundle))
    }

    /// Load a freshly persisted pair and swap it in; on failure the live
    /// bundle is left untouched.
    pub async fn reload(&self, source: &Path) -> Result<Arc<IndexBundle<I>>> {
        let bundle = load(source).await?;
        log::info!("Swapping in reloaded index ({} chunks)", bundle.len());
        Ok(self.swap(bundle))
    }
}
