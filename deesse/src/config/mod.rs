use crate::collection::Collection;
use crate::error::{DeesseError, Result};
use crate::orchestrator::{run_operation, OperationPayload};
use crate::permissions::{Action, Context};
use crate::provider::Provider;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Reject a collection list in which two collections share a slug.
pub fn ensure_unique_slugs(collections: &[Collection]) -> Result<()> {
    let mut seen = HashSet::new();
    for col in collections {
        if !seen.insert(col.slug()) {
            return Err(DeesseError::Config(format!(
                "Duplicate collection slug '{}'",
                col.slug()
            )));
        }
    }
    Ok(())
}

/// Everything needed to open a [`Db`].
#[derive(Clone)]
pub struct Config {
    pub collections: Vec<Collection>,
    pub provider: Arc<dyn Provider>,
}

impl Config {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Config {
            collections: Vec::new(),
            provider,
        }
    }

    pub fn collection(mut self, collection: Collection) -> Self {
        self.collections.push(collection);
        self
    }
}

/// The CRUD entry point.
/// Owns the registered collections and the provider, and hands out
/// per-collection handles whose calls run through the orchestrator.
pub struct Db {
    collections: Vec<Collection>,
    index: HashMap<String, usize>,
    provider: Arc<dyn Provider>,
}

impl Db {
    /// Validate the configuration and initialize the provider once with every
    /// collection.
    pub async fn open(config: Config) -> Result<Self> {
        ensure_unique_slugs(&config.collections)?;

        log::info!(
            "Opening {} collections on the {} provider",
            config.collections.len(),
            config.provider.name()
        );
        config.provider.init(&config.collections).await?;

        let index = config
            .collections
            .iter()
            .enumerate()
            .map(|(i, col)| (col.slug().to_string(), i))
            .collect();

        Ok(Db {
            collections: config.collections,
            index,
            provider: config.provider,
        })
    }

    /// Get a handle to a registered collection, evaluating permissions
    /// against an anonymous context.
    pub fn collection(&self, slug: &str) -> Result<CollectionApi<'_>> {
        let Some(&i) = self.index.get(slug) else {
            return Err(DeesseError::Config(format!(
                "Collection '{slug}' is not registered"
            )));
        };
        Ok(CollectionApi {
            collection: &self.collections[i],
            provider: self.provider.as_ref(),
            ctx: Context::anonymous(),
        })
    }

    /// The registered collections, in registration order.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

/// A handle to one collection.
/// Every call runs the full hook and permission pipeline.
#[derive(Clone)]
pub struct CollectionApi<'a> {
    collection: &'a Collection,
    provider: &'a dyn Provider,
    ctx: Context,
}

impl<'a> CollectionApi<'a> {
    /// A handle evaluating permission predicates against `ctx`.
    pub fn with_context(&self, ctx: Context) -> CollectionApi<'a> {
        CollectionApi {
            collection: self.collection,
            provider: self.provider,
            ctx,
        }
    }

    pub fn collection(&self) -> &'a Collection {
        self.collection
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    async fn run(&self, action: Action, payload: OperationPayload) -> Result<Value> {
        run_operation(action, self.collection, self.provider, payload, &self.ctx).await
    }

    pub async fn create(&self, data: Value) -> Result<Value> {
        self.run(Action::Create, OperationPayload::create(data)).await
    }

    pub async fn read(&self, id: &str) -> Result<Value> {
        self.run(Action::Read, OperationPayload::read(id)).await
    }

    pub async fn update(&self, id: &str, partial: Value) -> Result<Value> {
        self.run(Action::Update, OperationPayload::update(id, partial))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<Value> {
        self.run(Action::Delete, OperationPayload::delete(id)).await
    }

    // ── Typed API (used by generated accessors) ─────────────────────

    pub async fn create_as<I: Serialize, O: DeserializeOwned>(&self, data: &I) -> Result<O> {
        let result = self.create(serde_json::to_value(data)?).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn read_as<O: DeserializeOwned>(&self, id: &str) -> Result<O> {
        Ok(serde_json::from_value(self.read(id).await?)?)
    }

    pub async fn update_as<I: Serialize, O: DeserializeOwned>(
        &self,
        id: &str,
        partial: &I,
    ) -> Result<O> {
        let result = self.update(id, serde_json::to_value(partial)?).await?;
        Ok(serde_json::from_value(result)?)
    }
}
