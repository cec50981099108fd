use flapjack_sync::{ObjectId, Record, TaskId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchAction {
    UpdateObject,
    PartialUpdateObject,
    DeleteObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOperation {
    pub action: BatchAction,
    pub body: Record,
}

/// Body of `POST /1/indexes/{index}/batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub requests: Vec<BatchOperation>,
}

impl BatchRequest {
    pub fn objects(action: BatchAction, objects: Vec<Record>) -> Self {
        BatchRequest {
            requests: objects
                .into_iter()
                .map(|body| BatchOperation { action, body })
                .collect(),
        }
    }

    pub fn deletions(object_ids: Vec<ObjectId>) -> Self {
        BatchRequest {
            requests: object_ids
                .into_iter()
                .map(|id| {
                    let mut body = Record::new();
                    body.insert("objectID".to_string(), serde_json::Value::String(id));
                    BatchOperation {
                        action: BatchAction::DeleteObject,
                        body,
                    }
                })
                .collect(),
        }
    }
}

/// Any write response; only the task id matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResponse {
    #[serde(rename = "taskID")]
    pub task_id: TaskId,
}

/// `GET /1/indexes/{index}/task/{id}`. Status is `published`,
/// `notPublished` or `error`.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatusResponse {
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /1/indexes/{index}/operation`.
#[derive(Debug, Clone, Serialize)]
pub struct OperationRequest<'a> {
    pub operation: &'a str,
    pub destination: &'a str,
}
