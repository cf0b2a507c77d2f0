//! Classifies a single image from disk with the same model and class file the
//! server uses. Handy for checking a freshly exported model by hand.
//!
//! Usage: `classify <image>`; paths and input size come from the same
//! environment variables as the server.

use std::env;

use anyhow::Context;

use waste_classifier::class_index::ClassIndexMap;
use waste_classifier::classifier::{resolve, Classifier, OnnxClassifier};
use waste_classifier::config::AppConfig;
use waste_classifier::preprocess::preprocess;

fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    let image_path = env::args()
        .nth(1)
        .context("usage: classify <image>")?;

    let cfg = AppConfig::from_env()?;
    let classes = ClassIndexMap::load(&cfg.class_indices_path)?;
    let classifier = OnnxClassifier::load(&cfg.model_path, cfg.image_size)?;

    let img = image::open(&image_path).with_context(|| format!("could not open {image_path}"))?;
    let tensor = preprocess(&img, cfg.image_size);

    let probabilities = classifier.predict(&tensor)?;
    println!("{probabilities:?}");

    let result = resolve(&probabilities, &classes)?;
    println!(
        "Predicted class: {}, Confidence: {:.2}",
        result.predicted_class, result.confidence
    );
    Ok(())
}
