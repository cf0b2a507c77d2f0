use std::path::Path;

use tract_onnx::prelude::*;

use crate::class_index::ClassIndexMap;
use crate::error::{ConfigError, ModelError};
use crate::models::PredictionResult;
use crate::preprocess::InputTensor;

/// Anything that turns a preprocessed image into one probability per class.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError>;
}

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// ONNX export of the fine-tuned network, run with tract.
///
/// The plan is built once and only read afterwards, so concurrent `predict`
/// calls share it without locking.
pub struct OnnxClassifier {
    plan: OnnxPlan,
    image_size: usize,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>, image_size: u32) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_err = |e: TractError| ConfigError::ModelLoad {
            path: path.display().to_string(),
            reason: format!("{e:#}"),
        };
        let side = image_size as usize;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(load_err)?
            .with_input_fact(0, f32::fact([1, side, side, 3]).into())
            .map_err(load_err)?
            .into_optimized()
            .map_err(load_err)?
            .into_runnable()
            .map_err(load_err)?;

        Ok(OnnxClassifier {
            plan,
            image_size: side,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError> {
        let expected = [1, self.image_size, self.image_size, 3];
        if input.shape() != expected {
            return Err(ModelError::Inference(format!(
                "input shape {:?} does not match {:?}",
                input.shape(),
                expected
            )));
        }

        let data: Vec<f32> = input.as_array().iter().copied().collect();
        let tensor = tract_ndarray::Array4::from_shape_vec(expected, data)
            .map_err(|e| ModelError::Inference(e.to_string()))?
            .into_tensor();

        let result = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ModelError::Inference(format!("{e:#}")))?;

        let output = result
            .first()
            .ok_or_else(|| ModelError::Inference("model produced no outputs".into()))?
            .to_array_view::<f32>()
            .map_err(|e| ModelError::Inference(format!("{e:#}")))?;

        Ok(output.iter().copied().collect())
    }
}

/// Index of the largest probability. Ties go to the lowest index; an empty
/// vector or any NaN yields `None`.
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            return None;
        }
        match best {
            Some((_, top)) if p <= top => {}
            _ => best = Some((i, p)),
        }
    }
    best.map(|(i, _)| i)
}

/// Runs the model and resolves the winning class through `classes`.
pub fn classify(
    classifier: &dyn Classifier,
    classes: &ClassIndexMap,
    input: &InputTensor,
) -> Result<PredictionResult, ModelError> {
    let probabilities = classifier.predict(input)?;
    resolve(&probabilities, classes)
}

/// Picks the winning class out of a probability vector.
pub fn resolve(
    probabilities: &[f32],
    classes: &ClassIndexMap,
) -> Result<PredictionResult, ModelError> {
    if probabilities.len() != classes.len() {
        return Err(ModelError::OutputShape {
            expected: classes.len(),
            actual: probabilities.len(),
        });
    }

    let index = argmax(probabilities)
        .ok_or_else(|| ModelError::Inference("probabilities contain NaN".into()))?;
    let confidence = probabilities[index];
    if !(0.0..=1.0).contains(&confidence) {
        return Err(ModelError::InvalidProbability {
            index,
            value: confidence,
        });
    }

    Ok(PredictionResult {
        predicted_class: classes.label_for(index)?.to_string(),
        confidence,
    })
}
