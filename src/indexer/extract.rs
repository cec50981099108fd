//! Turns entities into remote records and stable object ids.

use crate::error::{Result, SyncError};
use crate::indexer::registry::MetadataRegistry;
use crate::types::{ChangeSet, Entity, FieldValue, ObjectId, Record};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

/// Relations are expanded up to this depth; deeper relation fields are
/// written as `null`.
pub const MAX_RELATION_DEPTH: usize = 2;

/// New object id, plus the previous one when a pending update changed an
/// identifier field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    pub key: ObjectId,
    pub old_key: Option<ObjectId>,
}

/// Encode ordered identifier values as an opaque object id: compact JSON,
/// then base64. Identical input always yields the identical id.
pub fn serialize_primary_key(values: &Record) -> Result<ObjectId> {
    let json = serde_json::to_string(values)?;
    Ok(STANDARD.encode(json))
}

pub fn deserialize_primary_key(key: &str) -> Result<Record> {
    let bytes = STANDARD.decode(key)?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SyncError::InvalidPrimaryKey(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(SyncError::InvalidPrimaryKey(e.to_string())),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(a) => a.is_empty(),
        Value::Object(_) => false,
    }
}

/// Field and key extraction against the classes known to a registry.
pub struct Extractor<'r> {
    registry: &'r mut MetadataRegistry,
}

impl<'r> Extractor<'r> {
    pub fn new(registry: &'r mut MetadataRegistry) -> Self {
        Extractor { registry }
    }

    pub fn primary_key(
        &mut self,
        entity: &dyn Entity,
        changes: Option<&ChangeSet>,
    ) -> Result<PrimaryKey> {
        let meta = self.registry.get(entity.class_name())?;

        let mut changed = false;
        let mut old_values = Record::new();
        let mut new_values = Record::new();

        for field in &meta.identifier_field_names {
            let (old, new) = match changes.and_then(|c| c.get(field)) {
                Some(change) => {
                    changed = true;
                    (
                        self.to_json(field, change.old.clone(), 0)?,
                        self.to_json(field, change.new.clone(), 0)?,
                    )
                }
                None => {
                    let current = self.property_value(entity, field, 0)?;
                    (current.clone(), current)
                }
            };

            if is_falsy(&new) {
                return Err(SyncError::NoPrimaryKey(format!(
                    "`{}` of `{}` has no value",
                    field,
                    entity.class_name()
                )));
            }

            old_values.insert(field.clone(), old);
            new_values.insert(field.clone(), new);
        }

        Ok(PrimaryKey {
            key: serialize_primary_key(&new_values)?,
            old_key: if changed {
                Some(serialize_primary_key(&old_values)?)
            } else {
                None
            },
        })
    }

    /// Index fields of `entity`. With a change-set only properties whose
    /// source field changed are included; derived values are always computed.
    pub fn fields(
        &mut self,
        entity: &dyn Entity,
        changes: Option<&ChangeSet>,
        depth: usize,
    ) -> Result<Record> {
        let meta = self.registry.get(entity.class_name())?;
        let mut fields = Record::new();

        for prop in &meta.properties {
            if changes.is_some_and(|c| !c.contains(&prop.name)) {
                continue;
            }
            let value = self.property_value(entity, &prop.name, depth)?;
            fields.insert(prop.target.clone(), value);
        }

        for method in &meta.methods {
            fields.insert(method.target.clone(), method.evaluate(entity));
        }

        Ok(fields)
    }

    fn property_value(&mut self, entity: &dyn Entity, field: &str, depth: usize) -> Result<Value> {
        match entity.field(field) {
            Some(value) => self.to_json(field, value, depth),
            None => Ok(Value::Null),
        }
    }

    fn to_json(&mut self, field: &str, value: FieldValue, depth: usize) -> Result<Value> {
        match value {
            FieldValue::Scalar(v) => Ok(v),
            FieldValue::Collection(items) => {
                if depth >= MAX_RELATION_DEPTH {
                    tracing::debug!("[SYNC] truncating `{}` at depth {}", field, depth);
                    return Ok(Value::Null);
                }
                let mut expanded = Vec::with_capacity(items.len());
                for item in &items {
                    self.ensure_indexable(field, item.as_ref())?;
                    expanded.push(Value::Object(self.fields(item.as_ref(), None, depth + 1)?));
                }
                Ok(Value::Array(expanded))
            }
            FieldValue::Entity(related) => {
                if depth >= MAX_RELATION_DEPTH {
                    tracing::debug!("[SYNC] truncating `{}` at depth {}", field, depth);
                    return Ok(Value::Null);
                }
                self.ensure_indexable(field, related.as_ref())?;
                Ok(Value::Object(self.fields(related.as_ref(), None, depth + 1)?))
            }
        }
    }

    fn ensure_indexable(&mut self, field: &str, related: &dyn Entity) -> Result<()> {
        if self.registry.has_metadata(related.class_name()) {
            Ok(())
        } else {
            Err(SyncError::NotAnAlgoliaEntity {
                field: field.to_string(),
                class: related.class_name().to_string(),
            })
        }
    }
}
