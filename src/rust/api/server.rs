//! HTTP front end for the prediction service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info, warn};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::schema::{details, FieldError, PredictionRequest, PredictionResponse};
use crate::pipeline::{ErrorKind, PredictionError};
use crate::service::PredictionService;

#[derive(Clone)]
pub struct ApiState {
    service: Arc<PredictionService>,
}

impl ApiState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self { service }
    }
}

/// Everything `POST /predict` can answer besides a prediction.
#[derive(Debug)]
pub enum ApiError {
    /// Body missing, not JSON, or not a non-empty object
    MalformedBody(String),
    /// Body is JSON but does not fit the request schema
    Validation(Vec<FieldError>),
    Prediction(PredictionError),
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        ApiError::Prediction(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

/// `{}`, `null`, arrays and scalars count as no data at all.
fn parse_request(body: Value) -> Result<PredictionRequest, ApiError> {
    match &body {
        Value::Object(fields) if !fields.is_empty() => {}
        other => {
            return Err(ApiError::MalformedBody(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    }
    let request: PredictionRequest = serde_json::from_value(body).map_err(|e| {
        ApiError::Validation(vec![FieldError {
            field: "body".into(),
            message: e.to_string(),
        }])
    })?;
    request.validate().map_err(ApiError::Validation)?;
    Ok(request)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MalformedBody(reason) => {
                warn!("Rejected malformed request body: {}", reason);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Invalid request. No JSON data received." }),
                )
            }
            ApiError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "Invalid input.", "details": details(&errors) }),
            ),
            ApiError::Prediction(err) => match err.kind() {
                ErrorKind::Client => (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": format!("Bad Request: {}", err) }),
                ),
                ErrorKind::Unavailable => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({ "error": "Service is not available. Check server logs." }),
                ),
                ErrorKind::Server => {
                    error!("Prediction failed on the server side: {}", err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({ "error": "An internal server error occurred." }),
                    )
                }
            },
        };
        (status, Json(body)).into_response()
    }
}

async fn health_handler(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "status": "up",
        "service": "ML Prediction API",
        "predictor": state.service.status().as_str(),
    }))
}

async fn predict_handler(
    State(state): State<ApiState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    // Refused before the body is looked at
    if !state.service.is_ready() {
        return Err(ApiError::Prediction(PredictionError::ServiceUnavailable {
            reason: state.service.status().as_str().to_string(),
        }));
    }

    let Json(body) = payload?;
    let request = parse_request(body)?;

    let label = state
        .service
        .predict(request.package_weight_gr, &request.package_size)?;

    Ok(Json(PredictionResponse {
        input_received: request,
        predicted_product_type: label,
    }))
}

pub fn create_router(service: Arc<PredictionService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/predict", post(predict_handler))
        .with_state(ApiState::new(service))
}

/// HTTP server running in a background task.
///
/// ```no_run
/// use shipclass::{ApiServer, ArtifactPaths, PredictionService};
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut service = PredictionService::new(ArtifactPaths::default());
/// let _ = service.load();
/// let handle = ApiServer::new("127.0.0.1:5000".parse()?, Arc::new(service))
///     .start()
///     .await?;
/// handle.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct ApiServer {
    addr: SocketAddr,
    service: Arc<PredictionService>,
}

impl ApiServer {
    pub fn new(addr: SocketAddr, service: Arc<PredictionService>) -> Self {
        Self { addr, service }
    }

    /// Binds the listener and starts serving.
    ///
    /// The server starts even if the service failed to load, so `/health`
    /// keeps answering while `/predict` returns 503.
    pub async fn start(self) -> Result<ApiServerHandle> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", self.addr))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read the bound API server address")?;

        info!("API server listening on http://{}", local_addr);
        if !self.service.is_ready() {
            warn!(
                "Prediction service is {}; /predict will answer 503",
                self.service.status().as_str()
            );
        }

        let router = create_router(self.service);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let graceful = axum::serve(listener, router).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });

            if let Err(e) = graceful.await {
                error!("API server error: {}", e);
            } else {
                info!("API server stopped");
            }
        });

        Ok(ApiServerHandle {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

pub struct ApiServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).map_err(|_| {
                anyhow::anyhow!("Failed to send shutdown signal to API server (receiver dropped)")
            })?;
        }
        self.task.await.context("API server task panicked")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactPaths;
    use crate::encoder::LabelEncoder;
    use crate::model::Predictor;
    use crate::pipeline::InferencePipeline;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use ndarray::ArrayView2;
    use tower::ServiceExt;

    struct SizeEcho;

    impl Predictor for SizeEcho {
        fn n_features(&self) -> usize {
            2
        }

        fn predict(&self, rows: ArrayView2<'_, f64>) -> Vec<usize> {
            rows.rows().into_iter().map(|r| r[1] as usize).collect()
        }
    }

    struct OutOfRange;

    impl Predictor for OutOfRange {
        fn n_features(&self) -> usize {
            2
        }

        fn predict(&self, _rows: ArrayView2<'_, f64>) -> Vec<usize> {
            vec![5]
        }
    }

    fn ready_service(model: impl Predictor + 'static) -> Arc<PredictionService> {
        let pipeline = InferencePipeline::new(
            model,
            LabelEncoder::fit(["Small Package", "Large Package"]).unwrap(),
            LabelEncoder::fit(["Smartphone", "Tablet"]).unwrap(),
        );
        Arc::new(PredictionService::with_pipeline(pipeline))
    }

    fn failed_service() -> Arc<PredictionService> {
        let dir = tempfile::tempdir().unwrap();
        let mut service = PredictionService::new(ArtifactPaths::in_dir(dir.path()));
        assert!(service.load().is_err());
        Arc::new(service)
    }

    async fn post_predict(router: Router, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(failed_service());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["status"], "up");
        assert_eq!(value["predictor"], "failed");
    }

    #[tokio::test]
    async fn test_predict_success() {
        let router = create_router(ready_service(SizeEcho));
        let (status, value) = post_predict(
            router,
            r#"{"package_weight_gr": 550.0, "package_size": "Large Package"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["predicted_product_type"], "Tablet");
        assert_eq!(value["input_received"]["package_size"], "Large Package");
        assert_eq!(value["input_received"]["package_weight_gr"], 550.0);
    }

    #[tokio::test]
    async fn test_unknown_size_is_400() {
        let router = create_router(ready_service(SizeEcho));
        let (status, value) = post_predict(
            router,
            r#"{"package_weight_gr": 300.0, "package_size": "Giant Package"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(value["error"].as_str().unwrap().contains("package_size"));
    }

    #[tokio::test]
    async fn test_schema_violations_are_422() {
        for body in [
            r#"{"package_weight_gr": 0, "package_size": "Small Package"}"#,
            r#"{"package_weight_gr": -5, "package_size": "Small Package"}"#,
            r#"{"package_weight_gr": 10, "package_size": ""}"#,
            r#"{"package_size": "Small Package"}"#,
            r#"{"package_weight_gr": 10, "package_size": "Small Package", "extra": 1}"#,
        ] {
            let router = create_router(ready_service(SizeEcho));
            let (status, value) = post_predict(router, body).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
            assert_eq!(value["error"], "Invalid input.");
            assert!(value["details"].is_array());
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let router = create_router(ready_service(SizeEcho));
        let (status, value) = post_predict(router, "not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Invalid request. No JSON data received.");
    }

    #[tokio::test]
    async fn test_empty_or_non_object_body_is_400() {
        for body in ["", "{}", "null", "[]", r#"[550.0, "Large Package"]"#, "42"] {
            let router = create_router(ready_service(SizeEcho));
            let (status, value) = post_predict(router, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{:?}", body);
            assert_eq!(value["error"], "Invalid request. No JSON data received.");
        }
    }

    #[tokio::test]
    async fn test_failed_service_is_503() {
        let router = create_router(failed_service());
        let (status, _) = post_predict(
            router,
            r#"{"package_weight_gr": 550.0, "package_size": "Large Package"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_mismatch_is_500() {
        let router = create_router(ready_service(OutOfRange));
        let (status, value) = post_predict(
            router,
            r#"{"package_weight_gr": 550.0, "package_size": "Large Package"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(value["error"], "An internal server error occurred.");
    }

    #[tokio::test]
    async fn test_server_start_and_shutdown() {
        let server = ApiServer::new("127.0.0.1:0".parse().unwrap(), ready_service(SizeEcho));
        let handle = server.start().await.unwrap();
        assert_ne!(handle.local_addr().port(), 0);
        handle.shutdown().await.unwrap();
    }
}
