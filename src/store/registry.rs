//! Live stores by index directory
//!
//! A store holds an exclusive lock on its files, so every component working
//! on one index has to share the same `Store`. The populator registers the
//! store it creates; online accessors then reuse it instead of opening the
//! files a second time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{Store, StoreOptions};
use crate::error::Result;

/// Open stores of one provider, keyed by index directory
#[derive(Default)]
pub struct OpenStores {
    stores: Mutex<HashMap<PathBuf, Weak<Store>>>,
}

impl OpenStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live store of `dir`, if any component still holds it
    pub fn get(&self, dir: &Path) -> Option<Arc<Store>> {
        self.stores.lock().get(dir).and_then(Weak::upgrade)
    }

    /// Record `store` as the owner of its directory, replacing a previous one
    pub fn register(&self, store: &Arc<Store>) {
        let mut stores = self.stores.lock();
        stores.retain(|_, s| s.strong_count() > 0);
        stores.insert(store.dir().to_path_buf(), Arc::downgrade(store));
    }

    /// The live store of `dir`, or the store opened from its files
    pub fn get_or_open(&self, dir: &Path, options: &StoreOptions) -> Result<Arc<Store>> {
        let mut stores = self.stores.lock();
        if let Some(store) = stores.get(dir).and_then(Weak::upgrade) {
            return Ok(store);
        }
        let store = Arc::new(Store::open(dir, options)?);
        stores.insert(dir.to_path_buf(), Arc::downgrade(&store));
        Ok(store)
    }

    /// Forget the store of `dir`; its holders keep it until they drop it
    pub fn remove(&self, dir: &Path) {
        self.stores.lock().remove(dir);
    }
}
