use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;

use crate::services::table::utils::clean_dataset_name;
use crate::services::table::{SourceFormat, Table};

/// One uploaded table and where it came from.
#[derive(Debug)]
pub struct StoredDataset {
    pub id: String,
    pub name: String,
    pub format: SourceFormat,
    pub uploaded_at: DateTime<Utc>,
    pub table: Arc<Table>,
}

/// Session-scoped registry of uploaded tables.
///
/// Only the tables themselves are kept; reports computed from them are not.
/// Idle entries expire after the configured TTL.
#[derive(Clone)]
pub struct DatasetStore {
    cache: Cache<String, Arc<StoredDataset>>,
    counter: Arc<AtomicU64>,
}

impl DatasetStore {
    pub fn new(max_datasets: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_datasets)
            .time_to_idle(ttl)
            .build();

        Self {
            cache,
            counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn insert(&self, name: &str, format: SourceFormat, table: Table) -> Arc<StoredDataset> {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        let id = format!(
            "{}_{}_{}",
            clean_dataset_name(name),
            Utc::now().timestamp_millis(),
            sequence
        );
        self.store(id, name, format, table)
    }

    /// Swaps in a new table under an existing id. Returns `None` if the id is unknown.
    ///
    /// The existence check and the write happen under the entry's lock, so a
    /// concurrent `remove` cannot be undone by a replacement.
    pub fn replace(
        &self,
        id: &str,
        name: &str,
        format: SourceFormat,
        table: Table,
    ) -> Option<Arc<StoredDataset>> {
        let dataset = Self::build(id.to_string(), name, format, table);
        let result = self
            .cache
            .entry_by_ref(id)
            .and_compute_with(move |existing| match existing {
                Some(_) => Op::Put(dataset),
                None => Op::Nop,
            });

        match result {
            CompResult::ReplacedWith(entry) => Some(entry.into_value()),
            _ => None,
        }
    }

    fn store(&self, id: String, name: &str, format: SourceFormat, table: Table) -> Arc<StoredDataset> {
        let dataset = Self::build(id.clone(), name, format, table);
        self.cache.insert(id, Arc::clone(&dataset));
        dataset
    }

    fn build(id: String, name: &str, format: SourceFormat, table: Table) -> Arc<StoredDataset> {
        Arc::new(StoredDataset {
            id,
            name: name.to_string(),
            format,
            uploaded_at: Utc::now(),
            table: Arc::new(table),
        })
    }

    pub fn get(&self, id: &str) -> Option<Arc<StoredDataset>> {
        self.cache.get(id)
    }

    pub fn remove(&self, id: &str) -> bool {
        self.cache.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::table::Column;

    fn store() -> DatasetStore {
        DatasetStore::new(8, Duration::from_secs(60))
    }

    fn one_column(value: f64) -> Table {
        Table::new(vec![Column::numeric("x", vec![Some(value)])]).unwrap()
    }

    #[test]
    fn insert_then_get() {
        let store = store();
        let stored = store.insert("Sales Q1.csv", SourceFormat::Csv, one_column(1.0));
        assert!(stored.id.starts_with("sales_q1_csv_"));

        let fetched = store.get(&stored.id).unwrap();
        assert_eq!(fetched.name, "Sales Q1.csv");
        assert_eq!(fetched.table.row_count(), 1);
    }

    #[test]
    fn ids_are_unique_for_same_name() {
        let store = store();
        let a = store.insert("data", SourceFormat::Csv, one_column(1.0));
        let b = store.insert("data", SourceFormat::Csv, one_column(2.0));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn replace_swaps_whole_table() {
        let store = store();
        let stored = store.insert("data", SourceFormat::Csv, one_column(1.0));
        let before = Arc::clone(&stored.table);

        let replaced = store
            .replace(&stored.id, "data-v2", SourceFormat::Csv, one_column(5.0))
            .unwrap();
        assert_eq!(replaced.id, stored.id);

        let current = store.get(&stored.id).unwrap();
        assert_eq!(current.name, "data-v2");
        assert_eq!(current.table.column("x").unwrap().as_numeric().unwrap(), &[Some(5.0)]);
        // earlier snapshots stay untouched
        assert_eq!(before.column("x").unwrap().as_numeric().unwrap(), &[Some(1.0)]);
    }

    #[test]
    fn replace_and_remove_unknown_ids() {
        let store = store();
        assert!(store
            .replace("nope", "x", SourceFormat::Csv, one_column(1.0))
            .is_none());
        assert!(!store.remove("nope"));

        let stored = store.insert("data", SourceFormat::Csv, one_column(1.0));
        assert!(store.remove(&stored.id));
        assert!(store.get(&stored.id).is_none());
    }

    #[test]
    fn replace_after_remove_does_not_restore() {
        let store = store();
        let stored = store.insert("data", SourceFormat::Csv, one_column(1.0));
        assert!(store.remove(&stored.id));

        assert!(store
            .replace(&stored.id, "data", SourceFormat::Csv, one_column(2.0))
            .is_none());
        assert!(store.get(&stored.id).is_none());
    }
}
