use crate::mapping::index::Index;
use crate::types::{ChangeSet, Entity, FieldSnapshot, FieldSource, FieldView};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Compiled accessor evaluated against some view of an entity.
pub type Accessor<T> = Arc<dyn Fn(&dyn FieldSource) -> T + Send + Sync>;

/// A persisted field copied into the index, possibly under another name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub target: String,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Property {
            target: name.clone(),
            name,
        }
    }

    pub fn renamed(name: impl Into<String>, target: impl Into<String>) -> Self {
        Property {
            name: name.into(),
            target: target.into(),
        }
    }
}

/// A derived value computed from the entity and stored under `target`.
#[derive(Clone)]
pub struct Method {
    pub target: String,
    compute: Accessor<serde_json::Value>,
}

impl Method {
    pub fn new<F>(target: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&dyn FieldSource) -> serde_json::Value + Send + Sync + 'static,
    {
        Method {
            target: target.into(),
            compute: Arc::new(compute),
        }
    }

    pub fn evaluate(&self, entity: &dyn Entity) -> serde_json::Value {
        (self.compute)(&FieldView::Current(entity))
    }

    /// `(value with the change-set applied, value before it)`.
    pub fn diff(
        &self,
        entity: &dyn Entity,
        changes: &ChangeSet,
    ) -> (serde_json::Value, serde_json::Value) {
        (
            (self.compute)(&FieldView::After(entity, changes)),
            (self.compute)(&FieldView::Before(entity, changes)),
        )
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method").field("target", &self.target).finish()
    }
}

/// Conditional predicate gating whether an entity belongs in the index.
#[derive(Clone)]
pub struct IndexIf {
    pub label: String,
    predicate: Accessor<bool>,
}

impl IndexIf {
    pub fn new<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn FieldSource) -> bool + Send + Sync + 'static,
    {
        IndexIf {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn evaluate(&self, entity: &dyn Entity) -> bool {
        (self.predicate)(&FieldView::Current(entity))
    }

    /// `(holds with the change-set applied, held before it)`.
    pub fn diff(&self, entity: &dyn Entity, changes: &ChangeSet) -> (bool, bool) {
        (
            (self.predicate)(&FieldView::After(entity, changes)),
            (self.predicate)(&FieldView::Before(entity, changes)),
        )
    }

    pub fn evaluate_with(&self, entity: &dyn Entity, original: &FieldSnapshot) -> bool {
        (self.predicate)(&FieldView::Snapshot(entity, original))
    }
}

impl fmt::Debug for IndexIf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexIf").field("label", &self.label).finish()
    }
}

/// Everything needed to index one entity class.
///
/// Built once per class by a [`MetadataLoader`] and shared read-only
/// afterwards; the property list and compiled closures act as the class's
/// accessor table.
#[derive(Debug, Clone)]
pub struct IndexMetadata {
    pub class: String,
    pub index: Index,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    pub index_ifs: Vec<IndexIf>,
    pub identifier_field_names: Vec<String>,
}

impl IndexMetadata {
    /// Metadata targeting an index named after the class, keyed by `id`.
    pub fn new(class: impl Into<String>) -> Self {
        let class = class.into();
        IndexMetadata {
            index: Index::for_class(&class),
            class,
            properties: Vec::new(),
            methods: Vec::new(),
            index_ifs: Vec::new(),
            identifier_field_names: vec!["id".to_string()],
        }
    }

    pub fn index(mut self, index: Index) -> Self {
        self.index = index;
        self
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(Property::new(name));
        self
    }

    pub fn property_as(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.properties.push(Property::renamed(name, target));
        self
    }

    pub fn method<F>(mut self, target: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&dyn FieldSource) -> serde_json::Value + Send + Sync + 'static,
    {
        self.methods.push(Method::new(target, compute));
        self
    }

    pub fn index_if<F>(mut self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn FieldSource) -> bool + Send + Sync + 'static,
    {
        self.index_ifs.push(IndexIf::new(label, predicate));
        self
    }

    pub fn identifiers<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identifier_field_names = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.methods.is_empty()
    }
}

/// Resolves the index mapping of an entity class.
///
/// `None` means the class is not indexable. The result for a class must not
/// change during the loader's lifetime.
pub trait MetadataLoader: Send + Sync {
    fn load(&self, class: &str) -> Option<IndexMetadata>;
}

/// Loader backed by mappings declared in code.
#[derive(Debug, Default, Clone)]
pub struct StaticLoader {
    mappings: HashMap<String, IndexMetadata>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metadata: IndexMetadata) -> Self {
        self.register(metadata);
        self
    }

    pub fn register(&mut self, metadata: IndexMetadata) {
        self.mappings.insert(metadata.class.clone(), metadata);
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }
}

impl MetadataLoader for StaticLoader {
    fn load(&self, class: &str) -> Option<IndexMetadata> {
        self.mappings.get(class).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldValue;
    use serde_json::json;

    struct Product {
        price: i64,
        stock: i64,
    }

    impl Entity for Product {
        fn class_name(&self) -> &str {
            "shop::Product"
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "price" => Some(self.price.into()),
                "stock" => Some(self.stock.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn test_new_metadata_defaults() {
        let meta = IndexMetadata::new("shop::Product");
        assert_eq!(meta.index.name, "Product");
        assert_eq!(meta.identifier_field_names, vec!["id"]);
        assert!(meta.is_empty());
    }

    #[test]
    fn test_index_if_diff_and_snapshot() {
        let in_stock = IndexIf::new("in_stock", |e| e.scalar("stock").as_i64().unwrap_or(0) > 0);
        let product = Product { price: 10, stock: 0 };

        assert!(!in_stock.evaluate(&product));

        let changes = ChangeSet::new().with("stock", 3i64, 0i64);
        assert_eq!(in_stock.diff(&product, &changes), (false, true));

        let original = FieldSnapshot::new().with("stock", 5i64);
        assert!(in_stock.evaluate_with(&product, &original));
    }

    #[test]
    fn test_method_diff() {
        let total = Method::new("total", |e| {
            json!(e.scalar("price").as_i64().unwrap_or(0) * e.scalar("stock").as_i64().unwrap_or(0))
        });
        let product = Product { price: 10, stock: 4 };
        assert_eq!(total.evaluate(&product), json!(40));

        let changes = ChangeSet::new().with("price", 5i64, 10i64);
        assert_eq!(total.diff(&product, &changes), (json!(40), json!(20)));
    }

    #[test]
    fn test_static_loader() {
        let loader = StaticLoader::new().with(IndexMetadata::new("shop::Product").property("price"));
        assert!(loader.load("shop::Product").is_some());
        assert!(loader.load("shop::Order").is_none());
    }
}
