//! Shared fixtures: a temporary data directory, token names and a tiny
//! in-memory entity store standing in for the host database

use std::collections::BTreeMap;
use std::sync::Arc;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use rangeidx::config::WalSyncStrategy;
use rangeidx::provider::IndexProvider;
use rangeidx::{
    Config, EntityScan, IndexDescriptor, IndexType, RangeIndexProvider, Result, SchemaDescriptor,
    TokenNames, Value,
};
use tempfile::TempDir;

pub const PERSON: u32 = 1;
pub const KNOWS: u32 = 2;
pub const NAME: u32 = 10;
pub const AGE: u32 = 11;
pub const SINCE: u32 = 12;

pub const COLLISION_X: i64 = 4611686018427387905;
pub const COLLISION_Y: i64 = 4611686018427387907;

pub fn tokens() -> Arc<TokenNames> {
    Arc::new(
        TokenNames::new()
            .label(PERSON, "Person")
            .relationship_type(KNOWS, "KNOWS")
            .property_key(NAME, "name")
            .property_key(AGE, "age")
            .property_key(SINCE, "since"),
    )
}

/// A data directory with a range provider over it
pub struct TestHost {
    pub temp: TempDir,
    pub config: Config,
    pub provider: RangeIndexProvider,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_config(|builder| builder)
    }

    pub fn with_config(
        customize: impl FnOnce(rangeidx::config::ConfigBuilder) -> rangeidx::config::ConfigBuilder,
    ) -> Self {
        let temp = TempDir::new().unwrap();
        let builder = Config::builder()
            .data_dir(temp.path())
            .page_size(1024)
            .wal_sync_strategy(WalSyncStrategy::EveryWrite)
            .population_batch_size(16)
            .population_queue_capacity(4);
        let config = customize(builder).build();
        let provider = RangeIndexProvider::new(config.clone(), tokens()).unwrap();
        Self {
            temp,
            config,
            provider,
        }
    }

    pub fn completed(&self, prototype: &IndexDescriptor) -> IndexDescriptor {
        self.provider.complete_configuration(prototype)
    }
}

pub fn name_index(id: u64) -> IndexDescriptor {
    IndexDescriptor::prototype(
        id,
        "person_name",
        SchemaDescriptor::for_label(PERSON, &[NAME]),
        IndexType::Range,
    )
}

pub fn unique_name_index(id: u64) -> IndexDescriptor {
    IndexDescriptor::unique_prototype(
        id,
        "person_name_unique",
        SchemaDescriptor::for_label(PERSON, &[NAME]),
        IndexType::Range,
    )
}

pub fn unique_age_index(id: u64) -> IndexDescriptor {
    IndexDescriptor::unique_prototype(
        id,
        "person_age_unique",
        SchemaDescriptor::for_label(PERSON, &[AGE]),
        IndexType::Range,
    )
}

pub fn name_age_index(id: u64) -> IndexDescriptor {
    IndexDescriptor::prototype(
        id,
        "person_name_age",
        SchemaDescriptor::for_label(PERSON, &[NAME, AGE]),
        IndexType::Range,
    )
}

pub fn text(s: &str) -> Vec<Value> {
    vec![Value::text(s)]
}

pub fn int(n: i64) -> Vec<Value> {
    vec![Value::Int(n)]
}

// =============================================================================
// Entity Store
// =============================================================================

/// Indexed values per entity id, shared between the test and its scans
#[derive(Clone, Default)]
pub struct Entities {
    values: Arc<Mutex<BTreeMap<u64, Vec<Value>>>>,
}

impl Entities {
    pub fn new(initial: impl IntoIterator<Item = (u64, Vec<Value>)>) -> Self {
        Self {
            values: Arc::new(Mutex::new(initial.into_iter().collect())),
        }
    }

    pub fn set(&self, id: u64, values: Vec<Value>) -> Option<Vec<Value>> {
        self.values.lock().insert(id, values)
    }

    pub fn remove(&self, id: u64) -> Option<Vec<Value>> {
        self.values.lock().remove(&id)
    }

    pub fn snapshot(&self) -> BTreeMap<u64, Vec<Value>> {
        self.values.lock().clone()
    }

    pub fn scan(&self) -> Box<dyn EntityScan> {
        Box::new(EntityScanner {
            entities: self.clone(),
            next: 0,
        })
    }

    /// Scan that does not finish before `gate` fires or is dropped
    pub fn gated_scan(&self, gate: Receiver<()>) -> Box<dyn EntityScan> {
        Box::new(GatedScan {
            inner: EntityScanner {
                entities: self.clone(),
                next: 0,
            },
            gate: Some(gate),
        })
    }
}

/// Scans ids in ascending order, reading values at the time of the read
struct EntityScanner {
    entities: Entities,
    next: u64,
}

impl EntityScan for EntityScanner {
    fn next_ids(&mut self, max: usize) -> Result<Vec<u64>> {
        let values = self.entities.values.lock();
        let ids: Vec<u64> = values.range(self.next..).take(max).map(|(id, _)| *id).collect();
        if let Some(last) = ids.last() {
            self.next = last + 1;
        }
        Ok(ids)
    }

    fn read_values(&mut self, ids: &[u64]) -> Result<Vec<(u64, Vec<Value>)>> {
        let values = self.entities.values.lock();
        Ok(ids
            .iter()
            .filter_map(|id| values.get(id).map(|v| (*id, v.clone())))
            .collect())
    }
}

struct GatedScan {
    inner: EntityScanner,
    gate: Option<Receiver<()>>,
}

impl EntityScan for GatedScan {
    fn next_ids(&mut self, max: usize) -> Result<Vec<u64>> {
        let ids = self.inner.next_ids(max)?;
        if ids.is_empty() {
            if let Some(gate) = self.gate.take() {
                let _ = gate.recv();
                return self.inner.next_ids(max);
            }
        }
        Ok(ids)
    }

    fn read_values(&mut self, ids: &[u64]) -> Result<Vec<(u64, Vec<Value>)>> {
        self.inner.read_values(ids)
    }
}

/// Scan that fails on its first read
pub struct FailingScan;

impl EntityScan for FailingScan {
    fn next_ids(&mut self, _max: usize) -> Result<Vec<u64>> {
        Ok(vec![1, 2, 3])
    }

    fn read_values(&mut self, _ids: &[u64]) -> Result<Vec<(u64, Vec<Value>)>> {
        Err(rangeidx::IndexError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "store is gone",
        )))
    }
}
