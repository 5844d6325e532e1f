//! Schema and entity locks
//!
//! Schema changes take the schema lock exclusively. Data writes take it
//! shared, plus exclusive locks on the entities they change. The population
//! job reads each scan batch under shared entity locks, so a transaction
//! touching the same entities is ordered entirely before or after it.
//!
//! Locks are striped: each resource maps onto one of a fixed number of
//! `RwLock`s. Every acquisition goes through [`LockService::acquire_all`],
//! which takes the stripes in a global order, so two callers never wait on
//! each other in a cycle.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

/// Something that can be locked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockResource {
    /// Schema of one label or relationship type
    Schema(u32),
    Node(u64),
    Relationship(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Grants scoped locks on resources
pub trait LockService: Send + Sync {
    /// Lock every resource in its mode, blocking until all are held
    fn acquire_all(&self, requests: &[(LockResource, LockMode)]) -> LockGuard;

    fn acquire(&self, resource: LockResource, mode: LockMode) -> LockGuard {
        self.acquire_all(&[(resource, mode)])
    }
}

enum Held {
    Shared {
        _guard: ArcRwLockReadGuard<RawRwLock, ()>,
    },
    Exclusive {
        _guard: ArcRwLockWriteGuard<RawRwLock, ()>,
    },
}

/// Locks held until the guard is dropped
pub struct LockGuard {
    held: Vec<Held>,
}

impl LockGuard {
    /// Number of distinct stripes held
    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Whether any lock is held exclusively
    pub fn is_exclusive(&self) -> bool {
        self.held.iter().any(|h| matches!(h, Held::Exclusive { .. }))
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("stripes", &self.held.len())
            .field("exclusive", &self.is_exclusive())
            .finish()
    }
}

/// Lock service over fixed arrays of striped `RwLock`s
pub struct StripedLockService {
    schema: Vec<Arc<RwLock<()>>>,
    entities: Vec<Arc<RwLock<()>>>,
}

/// Stripe address; schema stripes order before entity stripes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stripe {
    Schema(usize),
    Entity(usize),
}

impl StripedLockService {
    pub const DEFAULT_STRIPES: usize = 128;

    pub fn new(stripes: usize) -> Self {
        let stripes = stripes.max(1);
        let make = || (0..stripes).map(|_| Arc::new(RwLock::new(()))).collect();
        Self {
            schema: make(),
            entities: make(),
        }
    }

    fn stripe(&self, resource: LockResource) -> Stripe {
        match resource {
            LockResource::Schema(token) => Stripe::Schema(token as usize % self.schema.len()),
            LockResource::Node(_) | LockResource::Relationship(_) => {
                let mut hasher = DefaultHasher::new();
                resource.hash(&mut hasher);
                Stripe::Entity((hasher.finish() % self.entities.len() as u64) as usize)
            }
        }
    }

    fn lock_of(&self, stripe: Stripe) -> &Arc<RwLock<()>> {
        match stripe {
            Stripe::Schema(i) => &self.schema[i],
            Stripe::Entity(i) => &self.entities[i],
        }
    }
}

impl Default for StripedLockService {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STRIPES)
    }
}

impl LockService for StripedLockService {
    fn acquire_all(&self, requests: &[(LockResource, LockMode)]) -> LockGuard {
        // One entry per stripe, in stripe order; exclusive wins over shared
        let mut wanted: BTreeMap<Stripe, LockMode> = BTreeMap::new();
        for (resource, mode) in requests {
            let entry = wanted.entry(self.stripe(*resource)).or_insert(*mode);
            *entry = (*entry).max(*mode);
        }

        let held = wanted
            .into_iter()
            .map(|(stripe, mode)| {
                let lock = self.lock_of(stripe);
                match mode {
                    LockMode::Shared => Held::Shared {
                        _guard: lock.read_arc(),
                    },
                    LockMode::Exclusive => Held::Exclusive {
                        _guard: lock.write_arc(),
                    },
                }
            })
            .collect();
        LockGuard { held }
    }
}

