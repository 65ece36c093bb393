//! Model trainer: fits linear predictors for ingredient price change and
//! food waste on seeded synthetic data, and saves them as JSON.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use costbyte_core::error::{CostByteError, Result};
use costbyte_core::traits::Capability;
use costbyte_core::types::{TaskPayload, TaskResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::payload_str;

const SEED: u64 = 42;
const SAMPLES: usize = 1000;
const NOISE_STD: f64 = 0.1;

/// The model kinds this trainer knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    PricePrediction,
    WastePrediction,
}

impl ModelKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "price_prediction" => Some(Self::PricePrediction),
            "waste_prediction" => Some(Self::WastePrediction),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PricePrediction => "price_prediction",
            Self::WastePrediction => "waste_prediction",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            Self::PricePrediction => "price_model.json",
            Self::WastePrediction => "waste_model.json",
        }
    }

    pub fn feature_names(self) -> [&'static str; 4] {
        match self {
            Self::PricePrediction => ["season", "supplier_rating", "demand", "previous_price"],
            Self::WastePrediction => ["inventory_level", "shelf_life", "demand_prediction", "season"],
        }
    }

    /// True weights of the synthetic target.
    fn weights(self) -> [f64; 4] {
        match self {
            Self::PricePrediction => [0.5, 0.3, 0.2, -0.1],
            Self::WastePrediction => [0.6, 0.2, -0.4, 0.1],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
}

/// A fitted linear model as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub model_type: String,
    pub features: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub metrics: Metrics,
    pub trained_at: String,
}

impl LinearModel {
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.coefficients.len() {
            return Err(CostByteError::Capability(format!(
                "{} expects {} features, got {}",
                self.model_type,
                self.coefficients.len(),
                features.len()
            )));
        }
        Ok(self.intercept + dot(&self.coefficients, features))
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Seeded synthetic dataset for a model kind.
fn generate(kind: ModelKind) -> Result<(Vec<[f64; 4]>, Vec<f64>)> {
    let noise = Normal::new(0.0, NOISE_STD)
        .map_err(|e| CostByteError::Capability(format!("noise distribution: {e}")))?;
    let mut rng = StdRng::seed_from_u64(SEED);
    let weights = kind.weights();
    let mut xs = Vec::with_capacity(SAMPLES);
    let mut ys = Vec::with_capacity(SAMPLES);
    for _ in 0..SAMPLES {
        let x = [
            rng.gen_range(0.0..1.0),
            rng.gen_range(0.0..1.0),
            rng.gen_range(0.0..1.0),
            rng.gen_range(0.0..1.0),
        ];
        ys.push(dot(&weights, &x) + noise.sample(&mut rng));
        xs.push(x);
    }
    Ok((xs, ys))
}

/// Ordinary least squares with intercept. Returns `[b0, b1..b4]`.
fn fit_ols(xs: &[[f64; 4]], ys: &[f64]) -> Result<[f64; 5]> {
    // Normal equations (XᵀX) b = Xᵀy, X with a leading column of ones.
    let mut a = [[0.0f64; 6]; 5];
    for (x, &y) in xs.iter().zip(ys) {
        let row = [1.0, x[0], x[1], x[2], x[3]];
        for i in 0..5 {
            for j in 0..5 {
                a[i][j] += row[i] * row[j];
            }
            a[i][5] += row[i] * y;
        }
    }

    // Gauss-Jordan with partial pivoting.
    for col in 0..5 {
        let pivot = (col..5)
            .max_by(|&r1, &r2| a[r1][col].abs().total_cmp(&a[r2][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(CostByteError::Capability("training data is singular".into()));
        }
        a.swap(col, pivot);
        let p = a[col][col];
        for k in col..6 {
            a[col][k] /= p;
        }
        for r in 0..5 {
            if r != col {
                let factor = a[r][col];
                for k in col..6 {
                    a[r][k] -= factor * a[col][k];
                }
            }
        }
    }

    let mut b = [0.0; 5];
    for (i, coef) in b.iter_mut().enumerate() {
        *coef = a[i][5];
    }
    Ok(b)
}

fn evaluate(b: &[f64; 5], xs: &[[f64; 4]], ys: &[f64]) -> Metrics {
    let n = ys.len().max(1) as f64;
    let (mut abs, mut sq) = (0.0, 0.0);
    for (x, &y) in xs.iter().zip(ys) {
        let err = b[0] + dot(&b[1..], x) - y;
        abs += err.abs();
        sq += err * err;
    }
    let mse = sq / n;
    Metrics {
        mae: abs / n,
        mse,
        rmse: mse.sqrt(),
    }
}

/// Generate, split 80/20, fit and evaluate.
pub fn train(kind: ModelKind) -> Result<LinearModel> {
    let (xs, ys) = generate(kind)?;

    let mut idx: Vec<usize> = (0..xs.len()).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(SEED));
    let split = xs.len() * 4 / 5;
    let (train_idx, test_idx) = idx.split_at(split);

    let pick = |ids: &[usize]| -> (Vec<[f64; 4]>, Vec<f64>) {
        ids.iter().map(|&i| (xs[i], ys[i])).unzip()
    };
    let (x_train, y_train) = pick(train_idx);
    let (x_test, y_test) = pick(test_idx);

    let b = fit_ols(&x_train, &y_train)?;
    let metrics = evaluate(&b, &x_test, &y_test);

    Ok(LinearModel {
        model_type: kind.as_str().to_string(),
        features: kind.feature_names().iter().map(|s| s.to_string()).collect(),
        intercept: b[0],
        coefficients: b[1..].to_vec(),
        metrics,
        trained_at: Utc::now().to_rfc3339(),
    })
}

pub struct ModelTrainer {
    models_dir: PathBuf,
}

impl ModelTrainer {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn model_path(&self, kind: ModelKind) -> PathBuf {
        self.models_dir.join(kind.file_name())
    }

    /// Train and persist one model.
    pub async fn train_model(&self, kind: ModelKind) -> Result<(LinearModel, PathBuf)> {
        let path = self.model_path(kind);
        let target = path.clone();
        let model = tokio::task::spawn_blocking(move || -> Result<LinearModel> {
            let model = train(kind)?;
            save(&model, &target)?;
            Ok(model)
        })
        .await
        .map_err(|e| CostByteError::Capability(format!("training task failed: {e}")))??;

        tracing::info!(
            "🧠 Trained {} model (rmse {:.4}) → {}",
            kind.as_str(),
            model.metrics.rmse,
            path.display()
        );
        Ok((model, path))
    }

    /// Predict with a previously saved model.
    pub fn predict(&self, model_type: &str, features: &[f64]) -> Result<f64> {
        let kind = ModelKind::parse(model_type)
            .ok_or_else(|| CostByteError::Capability(format!("Unknown model type: {model_type}")))?;
        let path = self.model_path(kind);
        if !path.exists() {
            return Err(CostByteError::Capability(format!(
                "{} model not trained yet",
                kind.as_str()
            )));
        }
        let model: LinearModel = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        model.predict(features)
    }
}

fn save(model: &LinearModel, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(model)?)?;
    Ok(())
}

#[async_trait]
impl Capability for ModelTrainer {
    fn name(&self) -> &str {
        "model_trainer"
    }

    async fn execute(&self, payload: &TaskPayload) -> Result<TaskResult> {
        let model_type = payload_str(payload, "model_type", "price_prediction");
        let kind = ModelKind::parse(&model_type)
            .ok_or_else(|| CostByteError::Capability(format!("Unknown model type: {model_type}")))?;

        let (model, path) = self.train_model(kind).await?;
        Ok(TaskResult::new("train_model")
            .with("model_type", model_type)
            .with("metrics", serde_json::to_value(model.metrics)?)
            .with("model_path", path.display().to_string())
            .with("trained_at", model.trained_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fit_recovers_weights() {
        let model = train(ModelKind::PricePrediction).unwrap();
        let expected = ModelKind::PricePrediction.weights();
        for (got, want) in model.coefficients.iter().zip(expected) {
            assert!((got - want).abs() < 0.05, "coefficient {got} too far from {want}");
        }
        assert!(model.intercept.abs() < 0.05);
        // Noise std is 0.1, so a good fit lands near it.
        assert!(model.metrics.rmse > 0.07 && model.metrics.rmse < 0.13);
        assert!((model.metrics.rmse - model.metrics.mse.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_synthetic_noise_matches_configured_spread() {
        let kind = ModelKind::WastePrediction;
        let (xs, ys) = generate(kind).unwrap();
        assert_eq!(xs.len(), SAMPLES);
        let residuals: Vec<f64> = xs.iter().zip(&ys).map(|(x, y)| y - dot(&kind.weights(), x)).collect();
        let n = residuals.len() as f64;
        let mean = residuals.iter().sum::<f64>() / n;
        let std = (residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();
        assert!(mean.abs() < 0.02, "noise mean {mean}");
        assert!((std - NOISE_STD).abs() < 0.015, "noise std {std}");
    }

    #[test]
    fn test_training_is_deterministic() {
        let a = train(ModelKind::WastePrediction).unwrap();
        let b = train(ModelKind::WastePrediction).unwrap();
        assert_eq!(a.coefficients, b.coefficients);
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_predict_rejects_wrong_arity() {
        let model = train(ModelKind::PricePrediction).unwrap();
        assert!(model.predict(&[0.5, 0.5]).is_err());
        assert!(model.predict(&[0.5, 0.5, 0.5, 0.5]).is_ok());
    }

    #[tokio::test]
    async fn test_train_save_and_predict() {
        let dir = std::env::temp_dir().join("costbyte-trainer-test");
        std::fs::remove_dir_all(&dir).ok();
        let trainer = ModelTrainer::new(&dir);

        assert!(trainer.predict("waste_prediction", &[0.5; 4]).is_err());

        let mut payload = TaskPayload::new();
        payload.insert("model_type".into(), json!("waste_prediction"));
        let result = trainer.execute(&payload).await.unwrap();
        assert_eq!(result.task, "train_model");
        assert!(result.data["metrics"]["rmse"].as_f64().unwrap() > 0.0);
        assert!(dir.join("waste_model.json").exists());

        // 0.6*0.5 + 0.2*0.5 - 0.4*0.5 + 0.1*0.5 = 0.25
        let y = trainer.predict("waste_prediction", &[0.5; 4]).unwrap();
        assert!((y - 0.25).abs() < 0.05);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_unknown_model_type_fails() {
        let trainer = ModelTrainer::new(std::env::temp_dir().join("costbyte-trainer-unused"));
        let mut payload = TaskPayload::new();
        payload.insert("model_type".into(), json!("demand_forecast"));
        let err = trainer.execute(&payload).await.unwrap_err();
        assert!(err.to_string().contains("Unknown model type: demand_forecast"));
        assert!(trainer.predict("demand_forecast", &[0.0; 4]).is_err());
    }
}
