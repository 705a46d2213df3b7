//! HTTP API data models.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jobwatch_core::api::split_arguments;
use serde::{Deserialize, Serialize};

// ============= Launch =============

/// Arguments as one whitespace-separated string or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskArguments {
    Line(String),
    List(Vec<String>),
}

impl Default for TaskArguments {
    fn default() -> Self {
        TaskArguments::List(Vec::new())
    }
}

impl TaskArguments {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            TaskArguments::Line(s) => split_arguments(&s),
            TaskArguments::List(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LaunchTaskRequest {
    pub task: String,
    #[serde(default)]
    pub arguments: TaskArguments,
}

#[derive(Debug, Serialize)]
pub struct LaunchTaskResponse {
    pub success: bool,
    pub task_id: String,
}

// ============= Status =============

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStatusResponse {
    pub output: String,
    pub error: String,
    pub finished: bool,
}

// ============= Health =============

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_id: String,
    pub uptime_seconds: f64,
    pub requests_handled: u64,
    pub tasks_launched: u64,
    pub timestamp: String,
}

// ============= Error Handling =============

#[derive(Debug)]
pub enum HttpServerError {
    InvalidRequest(String),
    NotFound,
    /// The task id is returned so the caller can still read the failure record.
    SpawnFailed { task_id: String, message: String },
    StoreUnavailable(String),
    Internal(String),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, error_code, message, task_id) = match self {
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg, None),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "task not found or expired".to_string(),
                None,
            ),
            Self::SpawnFailed { task_id, message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SPAWN_FAILED",
                message,
                Some(task_id),
            ),
            Self::StoreUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE", msg, None)
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None),
        };

        let mut body = serde_json::json!({
            "success": false,
            "error": message,
            "error_code": error_code,
        });
        if let Some(id) = task_id {
            body["task_id"] = serde_json::Value::String(id);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_request_string_arguments() {
        let json = r#"{"task":"rebuild","arguments":"--batch 50  --dry-run"}"#;
        let req: LaunchTaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.task, "rebuild");
        assert_eq!(req.arguments.into_vec(), vec!["--batch", "50", "--dry-run"]);
    }

    #[test]
    fn test_launch_request_list_arguments() {
        let json = r#"{"task":"rebuild","arguments":["a b","c"]}"#;
        let req: LaunchTaskRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.arguments.into_vec(), vec!["a b", "c"]);
    }

    #[test]
    fn test_launch_request_defaults() {
        let req: LaunchTaskRequest = serde_json::from_str(r#"{"task":"rebuild"}"#).unwrap();
        assert!(req.arguments.into_vec().is_empty());
    }

    #[test]
    fn test_spawn_failed_carries_task_id() {
        let resp = HttpServerError::SpawnFailed {
            task_id: "abc".to_string(),
            message: "boom".to_string(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
