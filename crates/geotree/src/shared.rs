//! A lock around [`GeoTree`] for multi-threaded callers.
//!
//! The tree is single-threaded; queries read node counts that writers change,
//! so every operation, reads included, takes the same exclusive lock for the
//! length of one call.

use crate::error::GeoError;
use crate::geo::LonLat;
use crate::spatial::{GeoTree, Nearby, NearbyOptions};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to one externally synchronized tree.
#[derive(Debug)]
pub struct SharedGeoTree<K> {
    inner: Arc<Mutex<GeoTree<K>>>,
}

impl<K> Clone for SharedGeoTree<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: Eq + Hash + Clone> SharedGeoTree<K> {
    pub fn new(tree: GeoTree<K>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tree)),
        }
    }

    /// Takes the lock, ignoring poisoning.
    fn lock(&self) -> MutexGuard<'_, GeoTree<K>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, id: K, lon: f32, lat: f32) -> Result<bool, GeoError> {
        self.lock().insert(id, lon, lat)
    }

    pub fn remove(&self, id: &K) -> Result<LonLat, GeoError> {
        self.lock().remove(id)
    }

    pub fn erase(&self, id: &K) -> bool {
        self.lock().erase(id)
    }

    pub fn size(&self) -> usize {
        self.lock().size()
    }

    pub fn get_nearby(
        &self,
        lon: f32,
        lat: f32,
        k: usize,
        options: NearbyOptions,
    ) -> Result<Vec<Nearby<K>>, GeoError> {
        self.lock().get_nearby(lon, lat, k, options)
    }

    pub fn get_nearby_radius_by_count(
        &self,
        lon: f32,
        lat: f32,
        k: usize,
    ) -> Result<u32, GeoError> {
        self.lock().get_nearby_radius_by_count(lon, lat, k)
    }

    /// Run `f` with the lock held, for several operations that must see one state.
    pub fn with<R>(&self, f: impl FnOnce(&mut GeoTree<K>) -> R) -> R {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_concurrent_writers_and_readers() {
        let shared = SharedGeoTree::new(GeoTree::new(4));
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..250u32 {
                        let id = t * 1000 + i;
                        shared
                            .insert(id, (i % 360) as f32 - 180.0, (t * 20) as f32 - 40.0)
                            .unwrap();
                        let hits = shared
                            .get_nearby(0.0, 0.0, 3, NearbyOptions::default())
                            .unwrap();
                        assert!(!hits.is_empty());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.size(), 1000);
        shared.with(|tree| tree.verify()).unwrap();
        assert!(shared.erase(&0));
        assert!(matches!(shared.remove(&0), Err(GeoError::NotFound)));
        assert_eq!(shared.size(), 999);
    }
}
