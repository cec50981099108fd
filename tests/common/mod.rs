#![allow(dead_code)]

use async_trait::async_trait;
use flapjack_sync::{
    EntityStore, Entity, FieldValue, IndexMetadata, Indexer, ObjectId, Record, RemoteIndex,
    SearchClient, SearchResponse, StaticLoader, SyncError, TaskId,
};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

// ============================================================
// Entities
// ============================================================

pub struct TestEntity {
    class: String,
    fields: RwLock<IndexMap<String, FieldValue>>,
}

impl TestEntity {
    pub fn new(class: &str, fields: Vec<(&str, FieldValue)>) -> Arc<Self> {
        Arc::new(TestEntity {
            class: class.to_string(),
            fields: RwLock::new(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
        })
    }

    pub fn set(&self, name: &str, value: impl Into<FieldValue>) {
        self.fields
            .write()
            .unwrap()
            .insert(name.to_string(), value.into());
    }
}

impl Entity for TestEntity {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.read().unwrap().get(name).cloned()
    }
}

pub const ARTICLE: &str = "app::Article";

pub fn article(id: i64, title: &str, published: bool) -> Arc<TestEntity> {
    TestEntity::new(
        ARTICLE,
        vec![
            ("id", id.into()),
            ("title", title.into()),
            ("published", published.into()),
        ],
    )
}

pub fn article_metadata() -> IndexMetadata {
    IndexMetadata::new(ARTICLE)
        .property("id")
        .property("title")
        .property("published")
        .index_if("published", |a| a.bool_field("published"))
}

pub fn dyn_entity(entity: &Arc<TestEntity>) -> Arc<dyn Entity> {
    entity.clone()
}

// ============================================================
// Remote client
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Save { index: String, objects: Vec<Record> },
    PartialUpdate { index: String, objects: Vec<Record> },
    Delete { index: String, ids: Vec<ObjectId> },
    Clear { index: String },
    SetSettings { index: String, settings: Record },
    DeleteIndex { index: String },
    Move { source: String, destination: String },
    Wait { index: String, task_id: TaskId },
}

#[derive(Default)]
struct MemoryState {
    next_task: TaskId,
    calls: Vec<Call>,
    objects: HashMap<String, IndexMap<ObjectId, Record>>,
    settings: HashMap<String, Record>,
    fail_writes: bool,
}

impl MemoryState {
    fn task(&mut self) -> TaskId {
        self.next_task += 1;
        self.next_task
    }

    fn check_writable(&self) -> flapjack_sync::Result<()> {
        if self.fail_writes {
            Err(SyncError::Remote("service unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

fn object_id(record: &Record) -> ObjectId {
    record
        .get("objectID")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// In-memory remote service that records every call.
#[derive(Clone, Default)]
pub struct MemoryClient {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that change remote state.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Wait { .. }))
            .collect()
    }

    pub fn reset_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn objects(&self, index: &str) -> IndexMap<ObjectId, Record> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub fn index_exists(&self, index: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.objects.contains_key(index) || state.settings.contains_key(index)
    }

    pub fn seed_settings(&self, index: &str, settings: Record) {
        self.state
            .lock()
            .unwrap()
            .settings
            .insert(index.to_string(), settings);
    }

    pub fn seed_object(&self, index: &str, record: Record) {
        self.state
            .lock()
            .unwrap()
            .objects
            .entry(index.to_string())
            .or_default()
            .insert(object_id(&record), record);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn as_client(&self) -> Arc<dyn SearchClient> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl SearchClient for MemoryClient {
    fn init_index(&self, name: &str) -> Arc<dyn RemoteIndex> {
        Arc::new(MemoryIndex {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    async fn delete_index(&self, name: &str) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::DeleteIndex {
            index: name.to_string(),
        });
        state.objects.remove(name);
        state.settings.remove(name);
        Ok(state.task())
    }

    async fn move_index(&self, source: &str, destination: &str) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::Move {
            source: source.to_string(),
            destination: destination.to_string(),
        });
        let objects = state.objects.remove(source).unwrap_or_default();
        let settings = state.settings.remove(source);
        state.objects.insert(destination.to_string(), objects);
        match settings {
            Some(s) => {
                state.settings.insert(destination.to_string(), s);
            }
            None => {
                state.settings.remove(destination);
            }
        }
        Ok(state.task())
    }
}

pub struct MemoryIndex {
    name: String,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl RemoteIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn save_objects(&self, objects: Vec<Record>) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::Save {
            index: self.name.clone(),
            objects: objects.clone(),
        });
        let stored = state.objects.entry(self.name.clone()).or_default();
        for record in objects {
            stored.insert(object_id(&record), record);
        }
        Ok(state.task())
    }

    async fn partial_update_objects(&self, objects: Vec<Record>) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::PartialUpdate {
            index: self.name.clone(),
            objects: objects.clone(),
        });
        let stored = state.objects.entry(self.name.clone()).or_default();
        for record in objects {
            let existing = stored.entry(object_id(&record)).or_default();
            for (k, v) in record {
                existing.insert(k, v);
            }
        }
        Ok(state.task())
    }

    async fn delete_objects(&self, object_ids: Vec<ObjectId>) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::Delete {
            index: self.name.clone(),
            ids: object_ids.clone(),
        });
        if let Some(stored) = state.objects.get_mut(&self.name) {
            for id in &object_ids {
                stored.shift_remove(id);
            }
        }
        Ok(state.task())
    }

    async fn clear_objects(&self) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::Clear {
            index: self.name.clone(),
        });
        state.objects.insert(self.name.clone(), IndexMap::new());
        Ok(state.task())
    }

    async fn get_settings(&self) -> flapjack_sync::Result<Option<Record>> {
        let state = self.state.lock().unwrap();
        if let Some(settings) = state.settings.get(&self.name) {
            return Ok(Some(settings.clone()));
        }
        Ok(state.objects.contains_key(&self.name).then(Record::new))
    }

    async fn set_settings(&self, settings: Record) -> flapjack_sync::Result<TaskId> {
        let mut state = self.state.lock().unwrap();
        state.check_writable()?;
        state.calls.push(Call::SetSettings {
            index: self.name.clone(),
            settings: settings.clone(),
        });
        let current = state.settings.entry(self.name.clone()).or_default();
        for (k, v) in settings {
            current.insert(k, v);
        }
        Ok(state.task())
    }

    async fn search(&self, query: &str, params: &Record) -> flapjack_sync::Result<SearchResponse> {
        let state = self.state.lock().unwrap();
        let Some(stored) = state.objects.get(&self.name) else {
            return Err(SyncError::IndexNotFound(self.name.clone()));
        };
        let needle = query.to_lowercase();
        let hits: Vec<Record> = stored
            .values()
            .filter(|record| {
                needle.is_empty()
                    || record.values().any(|v| {
                        v.as_str()
                            .is_some_and(|s| s.to_lowercase().contains(&needle))
                    })
            })
            .cloned()
            .collect();
        let hits_per_page = params
            .get("hitsPerPage")
            .and_then(Value::as_u64)
            .unwrap_or(20);
        let nb_hits = hits.len() as u64;
        Ok(SearchResponse {
            hits: hits.into_iter().take(hits_per_page as usize).collect(),
            nb_hits,
            page: 0,
            nb_pages: if nb_hits == 0 { 0 } else { 1 },
            hits_per_page,
            query: query.to_string(),
            extra: Record::new(),
        })
    }

    async fn wait_task(&self, task_id: TaskId) -> flapjack_sync::Result<()> {
        self.state.lock().unwrap().calls.push(Call::Wait {
            index: self.name.clone(),
            task_id,
        });
        Ok(())
    }
}

// ============================================================
// Local store
// ============================================================

#[derive(Default)]
pub struct MemoryStore {
    entities: IndexMap<String, Vec<Arc<TestEntity>>>,
    aliases: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entity: Arc<TestEntity>) {
        self.entities
            .entry(entity.class_name().to_string())
            .or_default()
            .push(entity);
    }

    pub fn add_class(&mut self, class: &str) {
        self.entities.entry(class.to_string()).or_default();
    }

    pub fn alias(&mut self, alias: &str, class: &str) {
        self.aliases.insert(alias.to_string(), class.to_string());
    }
}

impl EntityStore for MemoryStore {
    fn entity_classes(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    fn resolve_class(&self, name: &str) -> Option<String> {
        if self.entities.contains_key(name) {
            return Some(name.to_string());
        }
        self.aliases.get(name).cloned()
    }

    fn count(&self, class: &str) -> flapjack_sync::Result<usize> {
        Ok(self.entities.get(class).map_or(0, Vec::len))
    }

    fn load_batch(
        &self,
        class: &str,
        offset: usize,
        limit: usize,
    ) -> flapjack_sync::Result<Vec<Arc<dyn Entity>>> {
        Ok(self
            .entities
            .get(class)
            .map(|all| {
                all.iter()
                    .skip(offset)
                    .take(limit)
                    .map(|e| e.clone() as Arc<dyn Entity>)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn find(&self, class: &str, id: &Record) -> flapjack_sync::Result<Option<Arc<dyn Entity>>> {
        let Some(all) = self.entities.get(class) else {
            return Ok(None);
        };
        let found = all.iter().find(|entity| {
            id.iter().all(|(field, value)| {
                entity.field(field).and_then(|f| f.as_scalar().cloned()) == Some(value.clone())
            })
        });
        Ok(found.map(|e| e.clone() as Arc<dyn Entity>))
    }
}

// ============================================================
// Setup
// ============================================================

pub const ENV: &str = "test";

pub fn indexer(client: &MemoryClient, loader: StaticLoader) -> Indexer {
    Indexer::new(client.as_client(), Arc::new(loader), ENV)
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}
