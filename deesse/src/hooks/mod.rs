//! Lifecycle hooks attached to a collection.
//!
//! Hooks are stored in a registry keyed by [`HookPhase`]. The type of the
//! callback held in a slot decides how the orchestrator treats its output:
//! a [`TransformHook`] replaces the working data or result, while
//! [`OperationHook`], [`ObserverHook`] and [`ErrorHook`] are observers whose
//! successful return is discarded.

use crate::error::{ErrorKind, Result};
use crate::permissions::Action;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type HookFuture<T> = BoxFuture<'static, Result<T>>;

/// Position of a hook in the operation pipeline, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    BeforeOperation,
    BeforeAction,
    AfterAction,
    AfterOperation,
    AfterSuccess,
    AfterError,
}

/// Payload handed to `beforeOperation` and `afterOperation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationEvent {
    pub action: Action,
    pub collection: String,
    pub id: Option<String>,
    pub data: Option<Value>,
    /// Only set for `afterOperation`.
    pub result: Option<Value>,
}

/// Payload handed to `afterError`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub action: Action,
    pub collection: String,
    pub id: Option<String>,
    pub kind: ErrorKind,
    pub message: String,
}

macro_rules! hook_type {
    ($(#[$meta:meta])* $name:ident, $input:ty, $output:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn Fn($input) -> HookFuture<$output> + Send + Sync>);

        impl $name {
            pub fn new<F, Fut>(f: F) -> Self
            where
                F: Fn($input) -> Fut + Send + Sync + 'static,
                Fut: Future<Output = Result<$output>> + Send + 'static,
            {
                $name(Arc::new(move |input: $input| f(input).boxed()))
            }

            pub async fn call(&self, input: $input) -> Result<$output> {
                (self.0)(input).await
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

hook_type!(
    /// Observes the whole operation (`beforeOperation`, `afterOperation`).
    OperationHook,
    OperationEvent,
    ()
);
hook_type!(
    /// Receives the working data or result and returns its replacement.
    TransformHook,
    Value,
    Value
);
hook_type!(
    /// Receives a value for inspection only.
    ObserverHook,
    Value,
    ()
);
hook_type!(
    /// Observes a failed operation. It cannot swallow the failure.
    ErrorHook,
    ErrorEvent,
    ()
);

/// A borrowed hook from a registry slot.
#[derive(Debug, Clone, Copy)]
pub enum HookRef<'a> {
    Operation(&'a OperationHook),
    Transform(&'a TransformHook),
    Observe(&'a ObserverHook),
    Error(&'a ErrorHook),
}

/// The ten optional lifecycle callbacks of a collection. Missing hooks are
/// skipped.
#[derive(Debug, Clone, Default)]
pub struct CollectionHooks {
    before_operation: Option<OperationHook>,
    before_create: Option<TransformHook>,
    before_update: Option<TransformHook>,
    before_delete: Option<ObserverHook>,
    after_operation: Option<OperationHook>,
    after_create: Option<TransformHook>,
    after_update: Option<TransformHook>,
    after_delete: Option<TransformHook>,
    after_success: Option<ObserverHook>,
    after_error: Option<ErrorHook>,
}

impl CollectionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the hook registered for `phase` when running `action`.
    pub fn slot(&self, phase: HookPhase, action: Action) -> Option<HookRef<'_>> {
        match (phase, action) {
            (HookPhase::BeforeOperation, _) => {
                self.before_operation.as_ref().map(HookRef::Operation)
            }
            (HookPhase::BeforeAction, Action::Create) => {
                self.before_create.as_ref().map(HookRef::Transform)
            }
            (HookPhase::BeforeAction, Action::Update) => {
                self.before_update.as_ref().map(HookRef::Transform)
            }
            (HookPhase::BeforeAction, Action::Delete) => {
                self.before_delete.as_ref().map(HookRef::Observe)
            }
            (HookPhase::BeforeAction, Action::Read) => None,
            (HookPhase::AfterAction, Action::Create) => {
                self.after_create.as_ref().map(HookRef::Transform)
            }
            (HookPhase::AfterAction, Action::Update) => {
                self.after_update.as_ref().map(HookRef::Transform)
            }
            (HookPhase::AfterAction, Action::Delete) => {
                self.after_delete.as_ref().map(HookRef::Transform)
            }
            (HookPhase::AfterAction, Action::Read) => None,
            (HookPhase::AfterOperation, _) => self.after_operation.as_ref().map(HookRef::Operation),
            (HookPhase::AfterSuccess, _) => self.after_success.as_ref().map(HookRef::Observe),
            (HookPhase::AfterError, _) => self.after_error.as_ref().map(HookRef::Error),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.before_operation.is_none()
            && self.before_create.is_none()
            && self.before_update.is_none()
            && self.before_delete.is_none()
            && self.after_operation.is_none()
            && self.after_create.is_none()
            && self.after_update.is_none()
            && self.after_delete.is_none()
            && self.after_success.is_none()
            && self.after_error.is_none()
    }

    // ── Registration ────────────────────────────────────────────────

    pub fn before_operation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(OperationEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.before_operation = Some(OperationHook::new(f));
        self
    }

    pub fn before_create<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.before_create = Some(TransformHook::new(f));
        self
    }

    pub fn before_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.before_update = Some(TransformHook::new(f));
        self
    }

    /// Receives `{"id": ...}` of the record about to be deleted.
    pub fn before_delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.before_delete = Some(ObserverHook::new(f));
        self
    }

    pub fn after_operation<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(OperationEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after_operation = Some(OperationHook::new(f));
        self
    }

    pub fn after_create<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.after_create = Some(TransformHook::new(f));
        self
    }

    pub fn after_update<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.after_update = Some(TransformHook::new(f));
        self
    }

    /// Receives `{"success": true, "id": ...}` after a delete.
    pub fn after_delete<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.after_delete = Some(TransformHook::new(f));
        self
    }

    pub fn after_success<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after_success = Some(ObserverHook::new(f));
        self
    }

    pub fn after_error<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ErrorEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after_error = Some(ErrorHook::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_registry_has_no_slots() {
        let hooks = CollectionHooks::new();
        assert!(hooks.is_empty());
        for action in Action::ALL {
            assert!(hooks.slot(HookPhase::BeforeOperation, action).is_none());
            assert!(hooks.slot(HookPhase::BeforeAction, action).is_none());
            assert!(hooks.slot(HookPhase::AfterError, action).is_none());
        }
    }

    #[test]
    fn test_delete_before_hook_is_an_observer() {
        let hooks = CollectionHooks::new()
            .before_delete(|_| async { Ok(()) })
            .after_delete(|result| async move { Ok(result) });

        assert!(matches!(
            hooks.slot(HookPhase::BeforeAction, Action::Delete),
            Some(HookRef::Observe(_))
        ));
        assert!(matches!(
            hooks.slot(HookPhase::AfterAction, Action::Delete),
            Some(HookRef::Transform(_))
        ));
        assert!(hooks.slot(HookPhase::BeforeAction, Action::Create).is_none());
    }

    #[test]
    fn test_read_has_no_action_hooks() {
        let hooks = CollectionHooks::new()
            .before_create(|data| async move { Ok(data) })
            .after_create(|data| async move { Ok(data) });

        assert!(hooks.slot(HookPhase::BeforeAction, Action::Read).is_none());
        assert!(hooks.slot(HookPhase::AfterAction, Action::Read).is_none());
    }

    #[tokio::test]
    async fn test_transform_hook_returns_replacement() {
        let hook = TransformHook::new(|mut data: Value| async move {
            data["title"] = json!("X");
            Ok(data)
        });
        let out = hook.call(json!({ "title": "raw" })).await.unwrap();
        assert_eq!(out, json!({ "title": "X" }));
    }
}
