use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use hostpack_core::{package_key, Catalog, CatalogClient, CatalogEntry};

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: BTreeMap<String, Vec<CatalogEntry>>,
    lookups: AtomicUsize,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries
            .entry(package_key(&entry.id))
            .or_default()
            .push(entry);
    }

    pub fn with_entry(mut self, entry: CatalogEntry) -> Self {
        self.insert(entry);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl CatalogClient for MemoryCatalog {
    fn get_catalog(&self, id: &str) -> Result<Catalog> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let entries = self
            .entries
            .get(&package_key(id))
            .cloned()
            .unwrap_or_default();
        Ok(Catalog::new(id.trim(), entries))
    }
}
