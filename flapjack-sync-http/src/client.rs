use crate::types::{
    BatchAction, BatchRequest, OperationRequest, TaskResponse, TaskStatusResponse,
};
use async_trait::async_trait;
use flapjack_sync::{
    ObjectId, Record, RemoteIndex, SearchClient, SearchResponse, SyncConfig, SyncError, TaskId,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

fn algolia_url(app_id: &str) -> String {
    format!("https://{}-dsn.algolia.net", app_id)
}

fn index_path(index_name: &str) -> String {
    format!("/1/indexes/{}", urlencoding::encode(index_name))
}

/// Shared HTTP state of a client and every index handle it hands out.
struct Transport {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    api_key: String,
    poll_interval: Duration,
}

impl Transport {
    async fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("x-algolia-application-id", &self.app_id)
            .header("x-algolia-api-key", &self.api_key);
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SyncError::Remote(format!("{} {} failed: {}", method, path, e)))?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::IndexNotFound(path.to_string()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SyncError::Remote(format!(
                "{} {} returned {}: {}",
                method, path, status, text
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| SyncError::Remote(format!("invalid response from {}: {}", path, e)))
    }
}

/// [`SearchClient`] over the Algolia REST API, as served by Algolia or by a
/// flapjack server.
#[derive(Clone)]
pub struct HttpSearchClient {
    transport: Arc<Transport>,
}

impl HttpSearchClient {
    /// Client for the hosted Algolia application `app_id`.
    pub fn new(app_id: &str, api_key: &str) -> Self {
        Self::build(algolia_url(app_id), app_id, api_key, DEFAULT_TIMEOUT_SECS)
    }

    /// Client for an explicit base URL such as `http://localhost:7700`.
    pub fn with_host(host: &str, app_id: &str, api_key: &str) -> Self {
        Self::build(host.to_string(), app_id, api_key, DEFAULT_TIMEOUT_SECS)
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let base_url = config
            .host
            .clone()
            .unwrap_or_else(|| algolia_url(&config.application_id));
        let timeout = config
            .connection_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        tracing::info!("[SYNC] remote host {}", base_url);
        Ok(Self::build(
            base_url,
            &config.application_id,
            &config.api_key,
            timeout,
        ))
    }

    fn build(base_url: String, app_id: &str, api_key: &str, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        HttpSearchClient {
            transport: Arc::new(Transport {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                app_id: app_id.to_string(),
                api_key: api_key.to_string(),
                poll_interval: DEFAULT_POLL_INTERVAL,
            }),
        }
    }

    /// Delay between task status polls.
    pub fn poll_interval(self, interval: Duration) -> Self {
        let t = &self.transport;
        HttpSearchClient {
            transport: Arc::new(Transport {
                http: t.http.clone(),
                base_url: t.base_url.clone(),
                app_id: t.app_id.clone(),
                api_key: t.api_key.clone(),
                poll_interval: interval,
            }),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.transport.base_url
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    fn init_index(&self, name: &str) -> Arc<dyn RemoteIndex> {
        Arc::new(HttpIndex {
            name: name.to_string(),
            path: index_path(name),
            transport: Arc::clone(&self.transport),
        })
    }

    async fn delete_index(&self, name: &str) -> Result<TaskId, SyncError> {
        let resp: TaskResponse = self
            .transport
            .send(reqwest::Method::DELETE, &index_path(name), None)
            .await?;
        Ok(resp.task_id)
    }

    async fn move_index(&self, source: &str, destination: &str) -> Result<TaskId, SyncError> {
        let body = serde_json::to_value(OperationRequest {
            operation: "move",
            destination,
        })?;
        tracing::info!("[SYNC {}] moving to {}", source, destination);
        let resp: TaskResponse = self
            .transport
            .send(
                reqwest::Method::POST,
                &format!("{}/operation", index_path(source)),
                Some(body),
            )
            .await?;
        Ok(resp.task_id)
    }
}

/// One remote index.
pub struct HttpIndex {
    name: String,
    path: String,
    transport: Arc<Transport>,
}

impl HttpIndex {
    async fn write<B: Serialize>(
        &self,
        method: reqwest::Method,
        suffix: &str,
        body: B,
    ) -> Result<TaskId, SyncError> {
        let body = serde_json::to_value(body)?;
        let resp: TaskResponse = self
            .transport
            .send(method, &format!("{}{}", self.path, suffix), Some(body))
            .await?;
        Ok(resp.task_id)
    }

    async fn batch(&self, request: BatchRequest) -> Result<TaskId, SyncError> {
        self.write(reqwest::Method::POST, "/batch", request).await
    }
}

#[async_trait]
impl RemoteIndex for HttpIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn save_objects(&self, objects: Vec<Record>) -> Result<TaskId, SyncError> {
        self.batch(BatchRequest::objects(BatchAction::UpdateObject, objects))
            .await
    }

    async fn partial_update_objects(&self, objects: Vec<Record>) -> Result<TaskId, SyncError> {
        self.batch(BatchRequest::objects(
            BatchAction::PartialUpdateObject,
            objects,
        ))
        .await
    }

    async fn delete_objects(&self, object_ids: Vec<ObjectId>) -> Result<TaskId, SyncError> {
        self.batch(BatchRequest::deletions(object_ids)).await
    }

    async fn clear_objects(&self) -> Result<TaskId, SyncError> {
        self.write(reqwest::Method::POST, "/clear", Record::new())
            .await
    }

    async fn get_settings(&self) -> Result<Option<Record>, SyncError> {
        match self
            .transport
            .send::<Record>(
                reqwest::Method::GET,
                &format!("{}/settings", self.path),
                None,
            )
            .await
        {
            Ok(settings) => Ok(Some(settings)),
            Err(SyncError::IndexNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_settings(&self, settings: Record) -> Result<TaskId, SyncError> {
        self.write(reqwest::Method::PUT, "/settings", settings)
            .await
    }

    async fn search(&self, query: &str, params: &Record) -> Result<SearchResponse, SyncError> {
        let mut body = params.clone();
        body.insert(
            "query".to_string(),
            serde_json::Value::String(query.to_string()),
        );
        let result = self
            .transport
            .send(
                reqwest::Method::POST,
                &format!("{}/query", self.path),
                Some(serde_json::Value::Object(body)),
            )
            .await;
        match result {
            Err(SyncError::IndexNotFound(_)) => Err(SyncError::IndexNotFound(self.name.clone())),
            other => other,
        }
    }

    async fn wait_task(&self, task_id: TaskId) -> Result<(), SyncError> {
        let path = format!("{}/task/{}", self.path, task_id);
        loop {
            let status: TaskStatusResponse = self
                .transport
                .send(reqwest::Method::GET, &path, None)
                .await?;
            match status.status.as_str() {
                "published" => return Ok(()),
                "error" => {
                    return Err(SyncError::Remote(format!(
                        "task {} on {} failed: {}",
                        task_id,
                        self.name,
                        status.error.unwrap_or_default()
                    )))
                }
                _ => {
                    tracing::debug!("[SYNC {}] task {} not published yet", self.name, task_id);
                    tokio::time::sleep(self.transport.poll_interval).await;
                }
            }
        }
    }
}
