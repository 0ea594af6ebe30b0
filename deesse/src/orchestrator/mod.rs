//! The hook/permission pipeline every CRUD call runs through.
//!
//! Stages run strictly in order, each awaiting the previous one:
//!
//! ```text
//! beforeOperation -> before<Action> -> require id -> validate -> authorize
//!   -> provider -> after<Action> -> afterOperation -> afterSuccess
//! ```
//!
//! A failure at any stage skips the rest, gives `afterError` a chance to
//! observe it, and is returned to the caller unchanged.

use crate::collection::Collection;
use crate::error::{DeesseError, Result};
use crate::hooks::{ErrorEvent, HookPhase, HookRef, OperationEvent};
use crate::permissions::{Action, Context};
use crate::provider::{Provider, Record};
use crate::validation;
use serde_json::{json, Value};

/// Input of a single operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationPayload {
    pub id: Option<String>,
    pub data: Option<Value>,
}

impl OperationPayload {
    pub fn create(data: Value) -> Self {
        OperationPayload {
            id: None,
            data: Some(data),
        }
    }

    pub fn read(id: impl Into<String>) -> Self {
        OperationPayload {
            id: Some(id.into()),
            data: None,
        }
    }

    pub fn update(id: impl Into<String>, data: Value) -> Self {
        OperationPayload {
            id: Some(id.into()),
            data: Some(data),
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::read(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Hook(HookPhase),
    RequireId,
    Validate,
    Authorize,
    Provider,
}

const PIPELINE: [Stage; 9] = [
    Stage::Hook(HookPhase::BeforeOperation),
    Stage::Hook(HookPhase::BeforeAction),
    Stage::RequireId,
    Stage::Validate,
    Stage::Authorize,
    Stage::Provider,
    Stage::Hook(HookPhase::AfterAction),
    Stage::Hook(HookPhase::AfterOperation),
    Stage::Hook(HookPhase::AfterSuccess),
];

/// Working state threaded through the stages of one call.
struct Pipeline<'a> {
    action: Action,
    collection: &'a Collection,
    provider: &'a dyn Provider,
    ctx: &'a Context,
    id: Option<String>,
    data: Option<Value>,
    result: Option<Value>,
}

/// Run `action` on `collection` through the full pipeline.
pub async fn run_operation(
    action: Action,
    collection: &Collection,
    provider: &dyn Provider,
    payload: OperationPayload,
    ctx: &Context,
) -> Result<Value> {
    log::debug!(
        "{} {} id={:?} via {}",
        action,
        collection.slug(),
        payload.id,
        provider.name()
    );

    let mut pipeline = Pipeline {
        action,
        collection,
        provider,
        ctx,
        id: payload.id,
        data: payload.data,
        result: None,
    };

    let error = match pipeline.run().await {
        Ok(result) => return Ok(result),
        Err(error) => error,
    };

    log::warn!("{} on '{}' failed: {error}", action, collection.slug());

    if let Some(HookRef::Error(hook)) = collection.hooks().slot(HookPhase::AfterError, action) {
        let event = ErrorEvent {
            action,
            collection: collection.slug().to_string(),
            id: pipeline.id.clone(),
            kind: error.kind(),
            message: error.to_string(),
        };
        if let Err(hook_error) = hook.call(event).await {
            log::error!(
                "afterError hook on '{}' failed: {hook_error} (original error: {error})",
                collection.slug()
            );
            return Err(hook_error);
        }
    }

    Err(error)
}

impl<'a> Pipeline<'a> {
    async fn run(&mut self) -> Result<Value> {
        for stage in PIPELINE {
            match stage {
                Stage::Hook(phase) => self.run_hook(phase).await?,
                Stage::RequireId => self.require_id()?,
                Stage::Validate => self.validate()?,
                Stage::Authorize => self.authorize().await?,
                Stage::Provider => self.call_provider().await?,
            }
        }
        Ok(self.result.take().unwrap_or(Value::Null))
    }

    async fn run_hook(&mut self, phase: HookPhase) -> Result<()> {
        let collection = self.collection;
        let Some(hook) = collection.hooks().slot(phase, self.action) else {
            return Ok(());
        };

        match hook {
            HookRef::Operation(hook) => hook.call(self.event(phase)).await,
            HookRef::Transform(hook) => {
                let input = match phase {
                    HookPhase::BeforeAction => self.data.take(),
                    _ => self.result.take(),
                };
                let output = hook.call(input.unwrap_or(Value::Null)).await?;
                match phase {
                    HookPhase::BeforeAction => self.data = Some(output),
                    _ => self.result = Some(output),
                }
                Ok(())
            }
            HookRef::Observe(hook) => {
                let input = match phase {
                    HookPhase::BeforeAction => json!({ "id": self.id }),
                    _ => self.result.clone().unwrap_or(Value::Null),
                };
                hook.call(input).await
            }
            // afterError only runs outside the pipeline.
            HookRef::Error(_) => Ok(()),
        }
    }

    fn event(&self, phase: HookPhase) -> OperationEvent {
        OperationEvent {
            action: self.action,
            collection: self.collection.slug().to_string(),
            id: self.id.clone(),
            data: self.data.clone(),
            result: match phase {
                HookPhase::AfterOperation => self.result.clone(),
                _ => None,
            },
        }
    }

    fn require_id(&self) -> Result<()> {
        if self.action.requires_id() && self.id.as_deref().map_or(true, str::is_empty) {
            return Err(DeesseError::MissingId {
                action: self.action,
            });
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        match self.action {
            Action::Create | Action::Update => {
                validation::ensure_valid(self.collection, self.action, self.record()?)
            }
            Action::Read | Action::Delete => Ok(()),
        }
    }

    /// Evaluate the collection predicate, then field predicates: fields
    /// present in the payload for writes, every field for reads and deletes.
    async fn authorize(&self) -> Result<()> {
        let slug = self.collection.slug();
        if !self.collection.permissions().allows(self.action, self.ctx).await {
            return Err(DeesseError::PermissionDenied {
                action: self.action,
                collection: slug.to_string(),
                field: None,
            });
        }

        let payload = match self.action {
            Action::Create | Action::Update => Some(self.record()?),
            Action::Read | Action::Delete => None,
        };
        for (name, field) in self.collection.fields().iter() {
            if payload.map_or(false, |p| !p.contains_key(name)) {
                continue;
            }
            if !field.permission_set().allows(self.action, self.ctx).await {
                return Err(DeesseError::PermissionDenied {
                    action: self.action,
                    collection: slug.to_string(),
                    field: Some(name.to_string()),
                });
            }
        }
        Ok(())
    }

    async fn call_provider(&mut self) -> Result<()> {
        let slug = self.collection.slug();
        let result = match self.action {
            Action::Create => {
                let data = self.record()?.clone();
                Value::Object(self.provider.create(slug, data).await?)
            }
            Action::Read => Value::Object(self.provider.read(slug, self.id()?).await?),
            Action::Update => {
                let data = self.record()?.clone();
                Value::Object(self.provider.update(slug, self.id()?, data).await?)
            }
            Action::Delete => {
                let id = self.id()?;
                self.provider.delete(slug, id).await?;
                json!({ "success": true, "id": id })
            }
        };
        self.result = Some(result);
        Ok(())
    }

    fn id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or(DeesseError::MissingId { action: self.action })
    }

    /// The working data as a record. Writes need an object payload.
    fn record(&self) -> Result<&Record> {
        match &self.data {
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(DeesseError::Validation(format!(
                "{} payload for '{}' must be an object, got {other}",
                self.action,
                self.collection.slug()
            ))),
            None => Err(DeesseError::Validation(format!(
                "{} on '{}' requires a payload",
                self.action,
                self.collection.slug()
            ))),
        }
    }
}
