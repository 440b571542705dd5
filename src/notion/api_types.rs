//! Request and response shapes for the few remote API calls the checker issues.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPageChunkRequest {
    pub page_id: String,
    pub limit: u32,
    pub cursor: Cursor,
    pub chunk_number: u32,
    pub vertical_columns: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cursor {
    #[serde(default)]
    pub stack: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPageChunkResponse {
    #[serde(default)]
    pub record_map: RecordMap,
    #[serde(default)]
    pub cursor: Cursor,
}

/// Records keyed by table, then by id. Only blocks are interpreted; other
/// tables are carried through so the converter sees the full page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordMap {
    #[serde(default)]
    pub block: HashMap<String, BlockRecord>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl RecordMap {
    /// Merge another chunk's records into this one; later chunks win.
    pub fn merge(&mut self, other: RecordMap) {
        self.block.extend(other.block);
        for (table, records) in other.other {
            match (self.other.get_mut(&table), records) {
                (Some(Value::Object(existing)), Value::Object(incoming)) => {
                    existing.extend(incoming);
                }
                (_, records) => {
                    self.other.insert(table, records);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Block {
    pub fn is_page(&self) -> bool {
        self.block_type == "page"
    }

    pub fn is_alive(&self) -> bool {
        self.alive.unwrap_or(true)
    }

    /// Plain text of the `title` property, formatting runs dropped.
    pub fn title(&self) -> String {
        let runs = self
            .properties
            .as_ref()
            .and_then(|p| p.get("title"))
            .and_then(Value::as_array);
        let Some(runs) = runs else {
            return String::new();
        };
        runs.iter()
            .filter_map(|run| run.get(0).and_then(Value::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Html,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Html => "html",
            ExportFormat::Markdown => "markdown",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnqueueTaskRequest {
    pub task: ExportTask,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportTask {
    pub event_name: String,
    pub request: ExportRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub block_id: String,
    pub recursive: bool,
    pub export_options: ExportOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    pub export_type: ExportFormat,
    pub time_zone: String,
    pub locale: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueTaskResponse {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTasksRequest {
    pub task_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetTasksResponse {
    #[serde(default)]
    pub results: Vec<TaskResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskResult {
    pub id: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    #[serde(rename = "exportURL", default)]
    pub export_url: Option<String>,
    #[serde(default)]
    pub pages_exported: Option<u64>,
}
