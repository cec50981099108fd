use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Remote asynchronous task identifier. Monotonically increasing per index.
pub type TaskId = u64;
/// Serialized primary key, used verbatim as the remote `objectID`.
pub type ObjectId = String;
/// A record as sent to (or received from) the remote index.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A persisted object managed by the host's transactional store.
///
/// Implementations expose their fields by name. Relations are returned as
/// [`FieldValue::Entity`] or [`FieldValue::Collection`] so the extractor can
/// walk into them.
pub trait Entity: Send + Sync {
    /// Fully-qualified class name, the key used for metadata lookup.
    fn class_name(&self) -> &str;

    /// Current value of `name`, or `None` when the entity has no such field.
    fn field(&self, name: &str) -> Option<FieldValue>;
}

/// Read access to an entity's fields, possibly with some of them swapped for
/// values from a change-set or a pre-mutation snapshot.
///
/// Predicates and derived-value methods are written against this trait so the
/// same closure can be evaluated against current, previous and next state.
pub trait FieldSource {
    fn class_name(&self) -> &str;

    fn field(&self, name: &str) -> Option<FieldValue>;

    fn scalar(&self, name: &str) -> serde_json::Value {
        match self.field(name) {
            Some(FieldValue::Scalar(v)) => v,
            _ => serde_json::Value::Null,
        }
    }

    fn bool_field(&self, name: &str) -> bool {
        self.scalar(name).as_bool().unwrap_or(false)
    }
}

/// A dynamically-typed field value read from an [`Entity`].
#[derive(Clone)]
pub enum FieldValue {
    Scalar(serde_json::Value),
    Entity(Arc<dyn Entity>),
    Collection(Vec<Arc<dyn Entity>>),
}

impl FieldValue {
    pub fn null() -> Self {
        FieldValue::Scalar(serde_json::Value::Null)
    }

    pub fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(|v| v.as_bool())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(|v| v.as_i64())
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(|v| v.as_str())
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(v) => write!(f, "Scalar({})", v),
            FieldValue::Entity(e) => write!(f, "Entity({})", e.class_name()),
            FieldValue::Collection(items) => {
                let classes: Vec<&str> = items.iter().map(|e| e.class_name()).collect();
                write!(f, "Collection({:?})", classes)
            }
        }
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Scalar(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Scalar(serde_json::Value::String(v.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Scalar(serde_json::Value::String(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Scalar(serde_json::json!(v))
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Scalar(serde_json::json!(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Scalar(serde_json::json!(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Scalar(serde_json::json!(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Scalar(serde_json::Value::Bool(v))
    }
}

impl From<Arc<dyn Entity>> for FieldValue {
    fn from(v: Arc<dyn Entity>) -> Self {
        FieldValue::Entity(v)
    }
}

impl From<Vec<Arc<dyn Entity>>> for FieldValue {
    fn from(v: Vec<Arc<dyn Entity>>) -> Self {
        FieldValue::Collection(v)
    }
}

/// One field's transition inside a pending update.
#[derive(Debug, Clone)]
pub struct FieldChange {
    pub old: FieldValue,
    pub new: FieldValue,
}

/// The fields a pending update modifies, in the order the store reported them.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    changes: IndexMap<String, FieldChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        field: impl Into<String>,
        old: impl Into<FieldValue>,
        new: impl Into<FieldValue>,
    ) -> Self {
        self.insert(field, old, new);
        self
    }

    pub fn insert(
        &mut self,
        field: impl Into<String>,
        old: impl Into<FieldValue>,
        new: impl Into<FieldValue>,
    ) {
        self.changes.insert(
            field.into(),
            FieldChange {
                old: old.into(),
                new: new.into(),
            },
        );
    }

    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.changes.iter()
    }
}

/// Field values of an entity as they were loaded, before any pending mutation.
#[derive(Debug, Clone, Default)]
pub struct FieldSnapshot {
    values: IndexMap<String, FieldValue>,
}

impl FieldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.values.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for FieldSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FieldSnapshot {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Which state of an entity a [`FieldSource`] read observes.
///
/// Fields absent from the change-set or snapshot read through to the entity.
#[derive(Clone, Copy)]
pub enum FieldView<'a> {
    Current(&'a dyn Entity),
    Before(&'a dyn Entity, &'a ChangeSet),
    After(&'a dyn Entity, &'a ChangeSet),
    Snapshot(&'a dyn Entity, &'a FieldSnapshot),
}

impl FieldView<'_> {
    fn entity(&self) -> &dyn Entity {
        match *self {
            FieldView::Current(e)
            | FieldView::Before(e, _)
            | FieldView::After(e, _)
            | FieldView::Snapshot(e, _) => e,
        }
    }
}

impl FieldSource for FieldView<'_> {
    fn class_name(&self) -> &str {
        self.entity().class_name()
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let overridden = match *self {
            FieldView::Current(_) => None,
            FieldView::Before(_, changes) => changes.get(name).map(|c| c.old.clone()),
            FieldView::After(_, changes) => changes.get(name).map(|c| c.new.clone()),
            FieldView::Snapshot(_, snapshot) => snapshot.get(name).cloned(),
        };
        overridden.or_else(|| self.entity().field(name))
    }
}
