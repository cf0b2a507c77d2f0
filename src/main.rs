use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{bail, Context};

use waste_classifier::class_index::ClassIndexMap;
use waste_classifier::classifier::{Classifier, OnnxClassifier};
use waste_classifier::config::AppConfig;
use waste_classifier::handlers::{self, AppState};
use waste_classifier::preprocess::InputTensor;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cfg = AppConfig::from_env()?;

    let classes = ClassIndexMap::load(&cfg.class_indices_path)?;
    log::info!(
        "Loaded {} classes from {}",
        classes.len(),
        cfg.class_indices_path.display()
    );

    let classifier = OnnxClassifier::load(&cfg.model_path, cfg.image_size)?;
    log::info!("Loaded model from {}", cfg.model_path.display());

    // the model and the class file come from the same training run, so their sizes must agree
    let probe = classifier
        .predict(&InputTensor::zeros(cfg.image_size))
        .context("model failed on a blank probe image")?;
    if probe.len() != classes.len() {
        bail!(
            "model has {} outputs but {} lists {} classes",
            probe.len(),
            cfg.class_indices_path.display(),
            classes.len()
        );
    }

    let state = web::Data::new(AppState {
        classes,
        classifier: Arc::new(classifier),
        image_size: cfg.image_size,
        max_upload_bytes: cfg.max_upload_bytes,
    });

    log::info!("Server running at http://{}:{}", cfg.host, cfg.port);

    let mut server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(handlers::routes)
    });
    if let Some(workers) = cfg.workers {
        server = server.workers(workers);
    }

    server.bind(cfg.bind_addr())?.run().await?;
    Ok(())
}
