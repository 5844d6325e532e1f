//! Index Provider Module
//!
//! Entry point the host database uses to create, open and drop indexes.
//!
//! ## Responsibilities
//! - Complete prototypes with provider and capability
//! - Reject prototypes this provider cannot serve
//! - Own the on-disk layout of its indexes
//! - Share one open store per index between populator and accessors
//! - Build populators and online accessors
//! - Report persisted state and failure messages
//!
//! ## Layout
//! ```text
//!   {data_dir}/
//!   └── range-1.0/
//!       ├── 17/                      one directory per index id
//!       │   ├── index.db
//!       │   └── index.wal
//!       └── archive-17-1700000000000 failed attempt, when archiving
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::accessor::IndexAccessor;
use crate::config::Config;
use crate::error::{IndexError, Result};
use crate::populator::IndexPopulator;
use crate::schema::{
    CapabilityTag, IndexDescriptor, IndexType, ProviderDescriptor, SchemaEntity, TokenNameLookup,
};
use crate::store::{IndexState, OpenStores, Store, DB_FILE};

/// Key of the native range provider
pub const RANGE_PROVIDER_KEY: &str = "range";

/// Version of the native range provider
pub const RANGE_PROVIDER_VERSION: &str = "1.0";

/// Serves one kind of index to the host database
pub trait IndexProvider: Send + Sync {
    fn provider_descriptor(&self) -> &ProviderDescriptor;

    /// Descriptor carrying this provider and its capability
    fn complete_configuration(&self, index: &IndexDescriptor) -> IndexDescriptor;

    /// Fail with `InvalidArgument` if this provider cannot create the index
    fn validate_prototype(&self, prototype: &IndexDescriptor) -> Result<()>;

    /// Populator for a new index. Call `create` on it to start.
    fn populator(&self, descriptor: &IndexDescriptor) -> Result<IndexPopulator>;

    /// Accessor for an index whose population completed
    fn online_accessor(&self, descriptor: &IndexDescriptor) -> Result<IndexAccessor>;

    /// State the index was left in. An index without files, or with files
    /// that cannot be used, is `Populating` and has to be rebuilt.
    fn initial_state(&self, descriptor: &IndexDescriptor) -> Result<IndexState>;

    /// Failure message of a failed index
    fn population_failure(&self, descriptor: &IndexDescriptor) -> Result<Option<String>>;

    /// Delete the files of an index
    fn drop_index(&self, descriptor: &IndexDescriptor) -> Result<()>;
}

// =============================================================================
// Range Index Provider
// =============================================================================

/// Provider of the native range index
pub struct RangeIndexProvider {
    descriptor: ProviderDescriptor,
    config: Config,
    tokens: Arc<dyn TokenNameLookup>,
    stores: Arc<OpenStores>,
}

impl RangeIndexProvider {
    pub fn new(config: Config, tokens: Arc<dyn TokenNameLookup>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            descriptor: ProviderDescriptor::new(RANGE_PROVIDER_KEY, RANGE_PROVIDER_VERSION),
            config,
            tokens,
            stores: Arc::new(OpenStores::new()),
        })
    }

    /// Directory holding every index of this provider
    pub fn root_dir(&self) -> PathBuf {
        self.config.data_dir.join(self.descriptor.name())
    }

    /// Directory of one index
    pub fn index_dir(&self, descriptor: &IndexDescriptor) -> PathBuf {
        self.root_dir().join(descriptor.id.to_string())
    }

    fn completed(&self, descriptor: &IndexDescriptor) -> Arc<IndexDescriptor> {
        Arc::new(self.complete_configuration(descriptor))
    }
}

impl IndexProvider for RangeIndexProvider {
    fn provider_descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn complete_configuration(&self, index: &IndexDescriptor) -> IndexDescriptor {
        let mut completed = index.clone();
        if completed.provider.is_none() {
            completed = completed.with_provider(self.descriptor.clone());
        }
        if completed.capability == CapabilityTag::NoCapability {
            completed = completed.with_capability(CapabilityTag::Range);
        }
        completed
    }

    fn validate_prototype(&self, prototype: &IndexDescriptor) -> Result<()> {
        let name = self.descriptor.name();
        if prototype.index_type != IndexType::Range {
            return Err(IndexError::InvalidArgument(format!(
                "The '{}' index provider does not support {:?} indexes: {}",
                name, prototype.index_type, prototype
            )));
        }
        let range_schema = matches!(
            prototype.schema.entity,
            SchemaEntity::Label(_) | SchemaEntity::RelationshipType(_)
        ) && !prototype.schema.property_ids.is_empty();
        if !range_schema {
            return Err(IndexError::InvalidArgument(format!(
                "The {} index schema is not a range index schema, which it is required to be for the '{}' index provider to be able to create an index.",
                prototype.schema.user_description(self.tokens.as_ref()),
                name
            )));
        }
        Ok(())
    }

    fn populator(&self, descriptor: &IndexDescriptor) -> Result<IndexPopulator> {
        self.validate_prototype(descriptor)?;
        Ok(IndexPopulator::new(
            self.completed(descriptor),
            self.index_dir(descriptor),
            &self.config,
            self.tokens.clone(),
            self.stores.clone(),
        ))
    }

    fn online_accessor(&self, descriptor: &IndexDescriptor) -> Result<IndexAccessor> {
        IndexAccessor::open(
            self.completed(descriptor),
            &self.index_dir(descriptor),
            &self.config,
            self.tokens.clone(),
            self.stores.clone(),
        )
    }

    fn initial_state(&self, descriptor: &IndexDescriptor) -> Result<IndexState> {
        let dir = self.index_dir(descriptor);
        if !dir.join(DB_FILE).exists() {
            return Ok(IndexState::Populating);
        }
        let header = match Store::read_header(&dir) {
            Ok(header) => header,
            Err(IndexError::Corruption(message)) => {
                tracing::warn!(
                    "Index {} has an unreadable header and will be rebuilt: {}",
                    descriptor.name,
                    message
                );
                return Ok(IndexState::Populating);
            }
            Err(e) => return Err(e),
        };
        if let Err(e) = header.validate(descriptor.slot_count()) {
            tracing::warn!(
                "Index {} does not match its stored layout and will be rebuilt: {}",
                descriptor.name,
                e
            );
            return Ok(IndexState::Populating);
        }
        Ok(header.state)
    }

    fn population_failure(&self, descriptor: &IndexDescriptor) -> Result<Option<String>> {
        let dir = self.index_dir(descriptor);
        if !dir.join(DB_FILE).exists() {
            return Ok(None);
        }
        let header = Store::read_header(&dir)?;
        Ok(match header.state {
            IndexState::Failed => Some(header.failure.unwrap_or_default()),
            IndexState::Populating | IndexState::Online => None,
        })
    }

    fn drop_index(&self, descriptor: &IndexDescriptor) -> Result<()> {
        let dir = self.index_dir(descriptor);
        self.stores.remove(&dir);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            tracing::info!("Dropped files of index {} at {:?}", descriptor.name, dir);
        }
        Ok(())
    }
}

// =============================================================================
// Provider Registry
// =============================================================================

/// Providers by name, with the configured default
pub struct IndexProviders {
    providers: HashMap<String, Arc<dyn IndexProvider>>,
    default_provider: String,
}

impl IndexProviders {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Registry holding the range provider, default per configuration
    pub fn with_range_provider(config: Config, tokens: Arc<dyn TokenNameLookup>) -> Result<Self> {
        let mut providers = Self::new(config.default_schema_provider.clone());
        providers.register(Arc::new(RangeIndexProvider::new(config, tokens)?))?;
        Ok(providers)
    }

    pub fn register(&mut self, provider: Arc<dyn IndexProvider>) -> Result<()> {
        let name = provider.provider_descriptor().name();
        if self.providers.contains_key(&name) {
            return Err(IndexError::InvalidArgument(format!(
                "Index provider '{}' is already registered",
                name
            )));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn IndexProvider>> {
        self.providers.get(name).cloned().ok_or_else(|| {
            IndexError::InvalidArgument(format!("No index provider named '{}'", name))
        })
    }

    /// Provider for a descriptor, falling back to the default
    pub fn provider_for(&self, descriptor: &IndexDescriptor) -> Result<Arc<dyn IndexProvider>> {
        match &descriptor.provider {
            Some(p) => self.lookup(&p.name()),
            None => self.default_provider(),
        }
    }

    pub fn default_provider(&self) -> Result<Arc<dyn IndexProvider>> {
        self.lookup(&self.default_provider)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }
}
