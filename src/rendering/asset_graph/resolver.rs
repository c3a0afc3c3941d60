use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;

use crate::io::FileId;
use crate::rendering::asset_graph::error::AssetError;

pub type LoadResult<T> = Result<Arc<T>, AssetError>;

/// Deduplicates loads by file id. The first caller for a key drives its load to completion, every other caller
/// (concurrent or later) awaits the very same cell and receives the same Arc (or the same error). The loads of the
/// other callers are dropped without ever being polled, so constructing them is cheap.
pub struct Resolver<T> {
    ref_cache: DashMap<FileId, Arc<OnceCell<LoadResult<T>>>>,
}

impl<T> Default for Resolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Resolver<T> {
    pub fn new() -> Self {
        Self {
            ref_cache: DashMap::with_capacity(100),
        }
    }

    pub async fn resolve<Fut>(&self, file_id: FileId, load: Fut) -> LoadResult<T>
    where
        Fut: Future<Output = Result<T, AssetError>>,
    {
        // The cell is inserted before the load runs, and the shard lock is released before awaiting it.
        let cell = Arc::clone(&*self.ref_cache.entry(file_id).or_default());

        cell.get_or_init(|| async move { load.await.map(Arc::new) })
            .await
            .clone()
    }

    /// The loaded asset, if the load has completed successfully.
    pub fn get(&self, file_id: FileId) -> Option<Arc<T>> {
        let cell = Arc::clone(&*self.ref_cache.get(&file_id)?);
        cell.get().and_then(|result| result.as_ref().ok().cloned())
    }

    pub fn is_loaded(&self, file_id: FileId) -> bool {
        self.get(file_id).is_some()
    }

    /// The amount of keys that have been requested so far, including failed and in-flight loads.
    pub fn len(&self) -> usize {
        self.ref_cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_cache.is_empty()
    }

    pub fn loaded(&self) -> Vec<Arc<T>> {
        self.ref_cache
            .iter()
            .filter_map(|entry| entry.value().get().and_then(|result| result.as_ref().ok().cloned()))
            .collect()
    }

    pub fn clear(&self) {
        self.ref_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::rendering::asset_graph::error::AssetError;
    use crate::rendering::asset_graph::resolver::Resolver;

    #[tokio::test]
    async fn concurrent_requests_share_one_load() {
        let resolver = Arc::new(Resolver::<String>::new());
        let invocations = Arc::new(AtomicUsize::new(0));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let resolver = resolver.clone();
            let invocations = invocations.clone();
            tasks.spawn(async move {
                resolver
                    .resolve(1, async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        Ok("model".to_string())
                    })
                    .await
            });
        }

        let results: Vec<_> = tasks.join_all().await;
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        let first = results[0].as_ref().expect("loaded");
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().expect("loaded")));
        }
    }

    #[tokio::test]
    async fn failures_are_cached_too() {
        let resolver = Resolver::<String>::new();

        let first = resolver
            .resolve(7, async {
                Err(AssetError::Fetch {
                    file_id: 7,
                    reason: "missing".into(),
                })
            })
            .await;
        assert!(first.is_err());

        let second = resolver
            .resolve(7, async { Ok("should not run".to_string()) })
            .await;
        assert!(second.is_err());
        assert!(!resolver.is_loaded(7));
        assert_eq!(resolver.len(), 1);
    }
}
