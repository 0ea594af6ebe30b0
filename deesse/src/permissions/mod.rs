// Per-action permission predicates for fields and collections

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock};

/// One of the four CRUD actions a collection exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Whether this action needs an existing record id.
    pub fn requires_id(&self) -> bool {
        !matches!(self, Action::Create)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied context that permission predicates are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context(serde_json::Value);

impl Context {
    pub fn new(value: serde_json::Value) -> Self {
        Context(value)
    }

    /// An empty context, used when the caller supplies none.
    pub fn anonymous() -> Self {
        Context(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Look up a nested value by JSON pointer, e.g. `/user/role`.
    pub fn get(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.0.pointer(pointer)
    }

    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::anonymous()
    }
}

/// An async predicate deciding whether an action is allowed.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(Context) -> BoxFuture<'static, bool> + Send + Sync>);

impl Predicate {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Predicate(Arc::new(move |ctx: Context| f(ctx).boxed()))
    }

    /// A predicate that always permits. All calls share one instance, so
    /// default permission sets compare equal.
    pub fn allow() -> Self {
        static ALLOW: OnceLock<Predicate> = OnceLock::new();
        ALLOW.get_or_init(|| Predicate::new(|_| async { true })).clone()
    }

    /// A predicate that always refuses.
    pub fn deny() -> Self {
        Predicate::new(|_| async { false })
    }

    pub async fn check(&self, ctx: &Context) -> bool {
        (self.0)(ctx.clone()).await
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// One predicate per action. Every slot defaults to [`Predicate::allow`], so
/// overriding a single action leaves the other three permissive.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionSet {
    create: Predicate,
    read: Predicate,
    update: Predicate,
    delete: Predicate,
    overridden: [bool; 4],
}

impl Default for PermissionSet {
    fn default() -> Self {
        PermissionSet {
            create: Predicate::allow(),
            read: Predicate::allow(),
            update: Predicate::allow(),
            delete: Predicate::allow(),
            overridden: [false; 4],
        }
    }
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the predicate for `action`, keeping the others as they were.
    pub fn with(mut self, action: Action, predicate: Predicate) -> Self {
        *self.slot_mut(action) = predicate;
        self.overridden[action as usize] = true;
        self
    }

    pub fn create<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.with(Action::Create, Predicate::new(f))
    }

    pub fn read<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.with(Action::Read, Predicate::new(f))
    }

    pub fn update<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.with(Action::Update, Predicate::new(f))
    }

    pub fn delete<F, Fut>(self, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.with(Action::Delete, Predicate::new(f))
    }

    pub fn predicate(&self, action: Action) -> &Predicate {
        match action {
            Action::Create => &self.create,
            Action::Read => &self.read,
            Action::Update => &self.update,
            Action::Delete => &self.delete,
        }
    }

    fn slot_mut(&mut self, action: Action) -> &mut Predicate {
        match action {
            Action::Create => &mut self.create,
            Action::Read => &mut self.read,
            Action::Update => &mut self.update,
            Action::Delete => &mut self.delete,
        }
    }

    /// Whether `action` carries a caller-supplied predicate.
    pub fn is_overridden(&self, action: Action) -> bool {
        self.overridden[action as usize]
    }

    pub async fn allows(&self, action: Action, ctx: &Context) -> bool {
        self.predicate(action).check(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn admin_only() -> impl Fn(Context) -> futures::future::Ready<bool> + Send + Sync + 'static {
        |ctx: Context| {
            let is_admin = ctx.get("/user/role") == Some(&json!("admin"));
            futures::future::ready(is_admin)
        }
    }

    #[tokio::test]
    async fn test_defaults_allow_everything() {
        let perms = PermissionSet::new();
        for action in Action::ALL {
            assert!(perms.allows(action, &Context::anonymous()).await);
            assert!(!perms.is_overridden(action));
        }
    }

    #[tokio::test]
    async fn test_partial_override_keeps_other_defaults() {
        let perms = PermissionSet::new().create(admin_only());
        let guest = Context::new(json!({ "user": { "role": "guest" } }));
        let admin = Context::new(json!({ "user": { "role": "admin" } }));

        assert!(!perms.allows(Action::Create, &guest).await);
        assert!(perms.allows(Action::Create, &admin).await);
        assert!(perms.allows(Action::Read, &guest).await);
        assert!(perms.allows(Action::Update, &guest).await);
        assert!(perms.allows(Action::Delete, &guest).await);
        assert!(perms.is_overridden(Action::Create));
        assert!(!perms.is_overridden(Action::Delete));
    }

    #[tokio::test]
    async fn test_deny_refuses_whatever_the_context() {
        let perms = PermissionSet::new().with(Action::Delete, Predicate::deny());
        let admin = Context::new(json!({ "user": { "role": "admin" } }));

        assert!(!perms.allows(Action::Delete, &admin).await);
        assert!(perms.allows(Action::Read, &admin).await);
        assert_ne!(Predicate::deny(), Predicate::allow());
    }

    #[test]
    fn test_context_exposes_raw_value() {
        let value = json!({ "user": { "id": 7 } });
        let ctx = Context::new(value.clone());
        assert_eq!(ctx.value(), &value);
        assert_eq!(ctx.get("/user/id"), Some(&json!(7)));
        assert_eq!(Context::default().value(), &json!({}));
    }

    #[test]
    fn test_action_names() {
        assert_eq!(Action::Update.to_string(), "update");
        assert!(Action::Delete.requires_id());
        assert!(!Action::Create.requires_id());
    }
}
