use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::data::filter::{apply, FilterSpec, FilteredView};
use crate::data::model::{Dataset, DatasetVersion};

type CacheKey = (DatasetVersion, FilterSpec);

/// LRU memo of filtered row indices keyed by dataset version and spec.
///
/// A hit returns exactly what [`apply`] would; capacity 0 disables storage.
#[derive(Debug, Default)]
pub struct ViewCache {
    capacity: usize,
    entries: HashMap<CacheKey, Vec<usize>>,
    /// Least recently used at the front.
    order: VecDeque<CacheKey>,
    hits: u64,
    misses: u64,
}

impl ViewCache {
    pub fn new(capacity: usize) -> Self {
        ViewCache {
            capacity,
            ..Default::default()
        }
    }

    pub fn view<'a>(&mut self, dataset: &'a Dataset, spec: &FilterSpec) -> FilteredView<'a> {
        let key = (dataset.version(), spec.clone());
        if let Some(indices) = self.entries.get(&key) {
            let indices = indices.clone();
            self.hits += 1;
            self.touch(&key);
            debug!("View cache hit ({} records)", indices.len());
            return FilteredView::new(dataset, indices);
        }

        self.misses += 1;
        let view = apply(dataset, spec);
        if self.capacity > 0 {
            if self.entries.len() >= self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
            self.entries.insert(key.clone(), view.indices().to_vec());
            self.order.push_back(key);
        }
        view
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(pos) {
                self.order.push_back(k);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
