//! HTTP route handlers.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use jobwatch_core::api::{resolve_task, LaunchError, Poll};

use crate::http::{
    models::*,
    state::AppState,
    validation::{validate_arguments, validate_task_name},
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tasks", post(launch_task_handler))
        .route("/api/v1/tasks/:task_id", get(task_status_handler))
        .route("/health", get(health_handler))
        .route("/api/v1/shutdown", post(shutdown_handler))
        .with_state(state)
}

/// POST /api/v1/tasks - start a catalog task in a worker process
async fn launch_task_handler(
    State(state): State<AppState>,
    Json(req): Json<LaunchTaskRequest>,
) -> Result<Json<LaunchTaskResponse>, HttpServerError> {
    state.record_request("/api/v1/tasks");

    validate_task_name(&req.task)?;
    let args = req.arguments.into_vec();
    validate_arguments(&args)?;

    let descriptor = resolve_task(&state.config.tasks, &req.task, &args)
        .ok_or_else(|| HttpServerError::InvalidRequest(format!("unknown task: {}", req.task)))?;

    match state.launcher.launch(&descriptor).await {
        Ok(task_id) => {
            state.record_launch();
            Ok(Json(LaunchTaskResponse {
                success: true,
                task_id: task_id.to_string(),
            }))
        }
        Err(LaunchError::Spawn { task_id, reason }) => {
            state.record_error();
            Err(HttpServerError::SpawnFailed {
                task_id: task_id.to_string(),
                message: format!("Failed to start task: {reason}"),
            })
        }
        Err(LaunchError::Store(e)) => {
            state.record_error();
            Err(HttpServerError::StoreUnavailable(e.to_string()))
        }
    }
}

/// GET /api/v1/tasks/:task_id - latest snapshot
async fn task_status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskStatusResponse>, HttpServerError> {
    state.record_request("/api/v1/tasks/:task_id");

    match state.reader.poll_str(&task_id).await {
        Ok(Poll::Found(status)) => Ok(Json(TaskStatusResponse {
            output: status.output,
            error: status.error,
            finished: status.finished,
        })),
        Ok(Poll::NotFound) => Err(HttpServerError::NotFound),
        Err(e) => {
            state.record_error();
            Err(HttpServerError::StoreUnavailable(e.to_string()))
        }
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, HttpServerError> {
    let stats = state
        .stats
        .read()
        .map_err(|_| HttpServerError::Internal("stats lock poisoned".to_string()))?;

    Ok(Json(HealthResponse {
        status: "healthy".into(),
        session_id: state.session_id.clone(),
        uptime_seconds: stats.uptime_seconds(),
        requests_handled: stats.requests_total,
        tasks_launched: stats.tasks_launched,
        timestamp: Local::now().to_rfc3339(),
    }))
}

/// POST /api/v1/shutdown - stop the HTTP server; running workers are not affected
async fn shutdown_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.record_request("/api/v1/shutdown");
    tracing::info!("Shutdown requested via API");
    let _ = state.shutdown_tx.send(());
    Json(serde_json::json!({
        "success": true,
        "message": "Server shutting down"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use jobwatch_core::api::{
        AppConfig, Launcher, SpawnError, StatusReader, StatusStore, TaskDescriptor, TaskId,
        TaskSpec, WorkerSpawner,
    };
    use jobwatch_plugins::store::SqliteStatusStore;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    struct FakeSpawner {
        fail: bool,
        seen: Mutex<Vec<TaskDescriptor>>,
    }

    #[async_trait]
    impl WorkerSpawner for FakeSpawner {
        async fn spawn(&self, _id: &TaskId, d: &TaskDescriptor) -> Result<(), SpawnError> {
            self.seen.lock().unwrap().push(d.clone());
            if self.fail {
                return Err(SpawnError::ProgramNotFound {
                    program: d.program.clone(),
                });
            }
            Ok(())
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        router: Router,
        spawner: Arc<FakeSpawner>,
    }

    fn harness(fail: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn StatusStore> = Arc::new(
            SqliteStatusStore::open(dir.path().join("s.db"), Duration::from_secs(5), 1 << 20)
                .unwrap(),
        );
        let spawner = Arc::new(FakeSpawner {
            fail,
            seen: Mutex::new(Vec::new()),
        });

        let mut cfg = AppConfig::default();
        cfg.tasks.insert(
            "rebuild".to_string(),
            TaskSpec {
                program: "manage".to_string(),
                args: vec!["rebuild".to_string()],
                description: None,
            },
        );

        let launcher = Launcher::new(store.clone(), spawner.clone(), Duration::from_secs(60));
        let (shutdown_tx, _) = broadcast::channel(1);
        let state = AppState::new(
            "test".to_string(),
            cfg,
            launcher,
            StatusReader::new(store),
            shutdown_tx,
        );
        Harness {
            _dir: dir,
            router: create_router(state),
            spawner,
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn launch_req(body: &str) -> Request<Body> {
        Request::post("/api/v1/tasks")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn launch_then_poll_pending_record() {
        let h = harness(false);
        let (status, body) = send(
            &h.router,
            launch_req(r#"{"task":"rebuild","arguments":"--all -v"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(
            h.spawner.seen.lock().unwrap()[0].args,
            vec!["rebuild", "--all", "-v"]
        );

        let id = body["task_id"].as_str().unwrap().to_string();
        let (status, body) = send(
            &h.router,
            Request::get(format!("/api/v1/tasks/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({"output": "", "error": "", "finished": false})
        );
    }

    #[tokio::test]
    async fn unknown_task_is_bad_request() {
        let h = harness(false);
        let (status, body) = send(&h.router, launch_req(r#"{"task":"drop_everything"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_REQUEST");
        assert!(h.spawner.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawn_failure_returns_id_of_finished_record() {
        let h = harness(true);
        let (status, body) = send(&h.router, launch_req(r#"{"task":"rebuild"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error_code"], "SPAWN_FAILED");

        let id = body["task_id"].as_str().unwrap().to_string();
        let (status, body) = send(
            &h.router,
            Request::get(format!("/api/v1/tasks/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["finished"], true);
        assert!(body["error"].as_str().unwrap().contains("manage"));
    }

    #[tokio::test]
    async fn unknown_or_malformed_id_is_not_found() {
        let h = harness(false);
        for id in [TaskId::new().to_string(), "not-a-uuid".to_string()] {
            let (status, body) = send(
                &h.router,
                Request::get(format!("/api/v1/tasks/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error_code"], "NOT_FOUND");
            assert_eq!(body["error"], "task not found or expired");
        }
    }

    #[tokio::test]
    async fn health_counts_requests() {
        let h = harness(false);
        send(&h.router, launch_req(r#"{"task":"rebuild"}"#)).await;
        let (status, body) = send(
            &h.router,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["tasks_launched"], 1);
        assert_eq!(body["requests_handled"], 1);
    }
}
