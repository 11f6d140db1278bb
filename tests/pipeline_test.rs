use shipclass::dataset::{generate, read_csv, write_csv, DatasetConfig, LARGE_PACKAGE, SMALL_PACKAGE};
use shipclass::training::{train_and_save, TrainingConfig};
use shipclass::{
    ArtifactPaths, EncoderError, ErrorKind, LabelEncoder, PredictionError, PredictionService, ServiceStatus,
    Transformer,
};
use env_logger::{Builder, Env};
use tempfile::tempdir;

// Initialize test logger
fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn")).try_init();
}

#[test]
fn test_generate_train_serve() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempdir()?;
    let csv_path = dir.path().join("dataset").join("synthetic_shipping_data.csv");
    let paths = ArtifactPaths::in_dir(dir.path().join("artifacts"));

    write_csv(&csv_path, &generate(&DatasetConfig::default())?)?;
    let records = read_csv(&csv_path)?;
    let report = train_and_save(&records, &TrainingConfig::default(), &paths)?;
    assert!(report.test_accuracy > 0.8, "test accuracy {}", report.test_accuracy);
    assert!(paths.all_exist());

    let mut service = PredictionService::new(paths);
    assert_eq!(service.status(), ServiceStatus::Uninitialized);
    service.load()?;
    assert_eq!(service.status(), ServiceStatus::Ready);

    assert_eq!(service.predict(550.0, LARGE_PACKAGE)?, "Tablet");
    assert_eq!(service.predict(220.0, SMALL_PACKAGE)?, "Smartphone");
    Ok(())
}

#[test]
fn test_predictions_stay_in_target_classes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let paths = ArtifactPaths::in_dir(dir.path());
    let records = generate(&DatasetConfig { rows: 1000, ..Default::default() })?;
    train_and_save(&records, &TrainingConfig::default(), &paths)?;

    let types = LabelEncoder::load(&paths.type_encoder)?;
    let mut service = PredictionService::new(paths);
    service.load()?;

    for weight in [0.5, 50.0, 220.0, 385.0, 550.0, 2_000.0, 1e7] {
        for size in [SMALL_PACKAGE, LARGE_PACKAGE] {
            let label = service.predict(weight, size)?;
            assert!(types.classes().contains(&label), "{} not a known class", label);
            assert_eq!(service.predict(weight, size)?, label);
        }
    }
    Ok(())
}

#[test]
fn test_unknown_size_is_a_client_error() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let paths = ArtifactPaths::in_dir(dir.path());
    let records = generate(&DatasetConfig { rows: 500, ..Default::default() })?;
    train_and_save(&records, &TrainingConfig::default(), &paths)?;

    let mut service = PredictionService::new(paths);
    service.load()?;

    let err = service.predict(300.0, "Giant Package").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Client);
    assert!(matches!(
        err,
        PredictionError::InvalidFeature { field: "package_size", source: EncoderError::UnknownLabel(_), .. }
    ));
    Ok(())
}

#[test]
fn test_missing_artifact_fails_permanently() -> Result<(), Box<dyn std::error::Error>> {
    init();
    let dir = tempdir()?;
    let paths = ArtifactPaths::in_dir(dir.path());
    let records = generate(&DatasetConfig { rows: 200, ..Default::default() })?;
    train_and_save(&records, &TrainingConfig::default(), &paths)?;
    std::fs::remove_file(&paths.type_encoder)?;

    let mut service = PredictionService::new(paths.clone());
    assert!(service.load().is_err());
    let ServiceStatus::Failed { cause } = service.status() else {
        panic!("expected failed status, got {:?}", service.status());
    };
    assert!(cause.contains("product_type_encoder"), "{}", cause);

    // Restoring the file does not revive the service
    train_and_save(&records, &TrainingConfig::default(), &paths)?;
    assert!(service.load().is_err());

    for _ in 0..3 {
        let err = service.predict(550.0, LARGE_PACKAGE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(err, PredictionError::ServiceUnavailable { reason: cause.clone() });
    }
    Ok(())
}
