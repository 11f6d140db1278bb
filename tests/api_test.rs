use std::sync::Arc;

use shipclass::dataset::{generate, DatasetConfig};
use shipclass::training::{train_and_save, TrainingConfig};
use shipclass::{ApiServer, ApiServerHandle, ArtifactPaths, ClientResponse, PredictClient, PredictionService};
use serde_json::json;
use tempfile::{tempdir, TempDir};

async fn start_trained_server() -> Result<(TempDir, ApiServerHandle), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let paths = ArtifactPaths::in_dir(dir.path());
    let records = generate(&DatasetConfig { rows: 1000, ..Default::default() })?;
    train_and_save(&records, &TrainingConfig::default(), &paths)?;

    let mut service = PredictionService::new(paths);
    service.load()?;
    let handle = ApiServer::new("127.0.0.1:0".parse()?, Arc::new(service)).start().await?;
    Ok((dir, handle))
}

#[tokio::test]
async fn test_client_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, handle) = start_trained_server().await?;
    let client = PredictClient::new(format!("http://{}/predict", handle.local_addr()))?;

    let response = client.predict("550.0", "Large Package").await?;
    let ClientResponse::Success(body) = response else {
        panic!("expected success, got {:?}", response);
    };
    assert_eq!(body["predicted_product_type"], "Tablet");
    assert_eq!(
        body["input_received"],
        json!({ "package_weight_gr": 550.0, "package_size": "Large Package" })
    );

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_client_sees_error_statuses() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, handle) = start_trained_server().await?;
    let client = PredictClient::new(format!("http://{}/predict", handle.local_addr()))?;

    match client.predict("300", "Giant Package").await? {
        ClientResponse::HttpError { status, body } => {
            assert_eq!(status, 400);
            assert!(body["error"].as_str().unwrap_or_default().starts_with("Bad Request"));
        }
        other => panic!("expected HTTP 400, got {:?}", other),
    }

    match client.predict("0", "Small Package").await? {
        ClientResponse::HttpError { status, body } => {
            assert_eq!(status, 422);
            assert_eq!(body["error"], "Invalid input.");
        }
        other => panic!("expected HTTP 422, got {:?}", other),
    }

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_failed_service_still_serves_health() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let mut service = PredictionService::new(ArtifactPaths::in_dir(dir.path()));
    assert!(service.load().is_err());

    let handle = ApiServer::new("127.0.0.1:0".parse()?, Arc::new(service)).start().await?;
    let base = format!("http://{}", handle.local_addr());

    let health = reqwest::get(format!("{}/health", base)).await?;
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await?;
    assert_eq!(body["status"], "up");
    assert_eq!(body["service"], "ML Prediction API");

    let client = PredictClient::new(format!("{}/predict", base))?;
    match client.predict("550", "Large Package").await? {
        ClientResponse::HttpError { status, .. } => assert_eq!(status, 503),
        other => panic!("expected HTTP 503, got {:?}", other),
    }

    handle.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_connection_refused() -> Result<(), Box<dyn std::error::Error>> {
    // Bind then drop to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")?.local_addr()?.port();
    let client = PredictClient::new(format!("http://127.0.0.1:{}/predict", port))?;

    let err = client.predict("300", "Small Package").await.unwrap_err();
    assert!(matches!(err, shipclass::ClientError::Connection { .. }), "{:?}", err);
    Ok(())
}
