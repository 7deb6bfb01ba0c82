//! # CRF: Conditional Random Field de cadeia linear
//!
//! Score de uma sequência de tags `y` para os tokens `x`:
//!
//! ```text
//! score(y, x) = Σ_i [emission(y_i, x, i) + transition(y_{i-1}, y_i)]
//! ```
//!
//! Os pesos são serializáveis em JSON, o que permite trocar o modelo embutido
//! por um arquivo externo (`[recognizer] model_path`).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnonError, AnonResult};
use crate::features::FeatureVector;
use crate::tagger::Tag;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrfModel {
    /// Chave `feature|tag` → peso.
    pub emission_weights: HashMap<String, f64>,
    /// Matriz `[tag_anterior][tag_seguinte]`.
    pub transition_weights: Vec<Vec<f64>>,
}

impl CrfModel {
    pub fn new() -> Self {
        let n = Tag::COUNT;
        Self {
            emission_weights: HashMap::new(),
            transition_weights: vec![vec![0.0f64; n]; n],
        }
    }

    /// Carrega pesos de um arquivo JSON. Qualquer falha torna o modelo indisponível.
    pub fn from_json_file(path: &Path) -> AnonResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnonError::ModelUnavailable(format!("{}: {e}", path.display()))
        })?;
        let model: Self = serde_json::from_str(&content).map_err(|e| {
            AnonError::ModelUnavailable(format!("{}: {e}", path.display()))
        })?;
        let square = model.transition_weights.len() == Tag::COUNT
            && model.transition_weights.iter().all(|row| row.len() == Tag::COUNT);
        if !square {
            return Err(AnonError::ModelUnavailable(format!(
                "{}: matriz de transição deve ser {n}x{n}",
                path.display(),
                n = Tag::COUNT
            )));
        }
        Ok(model)
    }

    /// `Σ_k w_{k,tag} · f_k`
    pub fn emission_score(&self, features: &FeatureVector, tag: &Tag) -> f64 {
        let tag_label = tag.label();
        features
            .features
            .iter()
            .map(|(name, value)| {
                let key = format!("{name}|{tag_label}");
                value * self.emission_weights.get(&key).unwrap_or(&0.0)
            })
            .sum()
    }

    pub fn transition_score(&self, prev: &Tag, next: &Tag) -> f64 {
        self.transition_weights[prev.index()][next.index()]
    }

    pub fn set_emission(&mut self, feature: &str, tag: &Tag, weight: f64) {
        self.emission_weights
            .insert(format!("{feature}|{}", tag.label()), weight);
    }

    pub fn set_transition(&mut self, from: &Tag, to: &Tag, weight: f64) {
        self.transition_weights[from.index()][to.index()] = weight;
    }
}

impl Default for CrfModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Matriz `emission[token][tag]` na ordem de [`Tag::all`].
pub fn compute_emission_scores(model: &CrfModel, feature_vectors: &[FeatureVector]) -> Vec<Vec<f64>> {
    let tags = Tag::all();
    feature_vectors
        .iter()
        .map(|fv| tags.iter().map(|tag| model.emission_score(fv, tag)).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::EntityCategory;
    use std::io::Write;

    #[test]
    fn test_emission_score_positive() {
        let mut model = CrfModel::new();
        let tag = Tag::Begin(EntityCategory::Per);
        model.set_emission("is_capitalized", &tag, 2.5);

        let mut fv = FeatureVector::new(0);
        fv.insert("is_capitalized", 1.0);

        assert!((model.emission_score(&fv, &tag) - 2.5).abs() < 1e-9);
        assert!(model.emission_score(&fv, &Tag::Outside).abs() < 1e-9);
    }

    #[test]
    fn test_transition_score() {
        let mut model = CrfModel::new();
        let b_per = Tag::Begin(EntityCategory::Per);
        let i_per = Tag::Inside(EntityCategory::Per);
        model.set_transition(&b_per, &i_per, 3.0);
        assert!((model.transition_score(&b_per, &i_per) - 3.0).abs() < 1e-9);
        assert!(model.transition_score(&Tag::Outside, &i_per).abs() < 1e-9);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let mut model = CrfModel::new();
        model.set_emission("bias", &Tag::Outside, 1.0);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&model).unwrap().as_bytes())
            .unwrap();

        let loaded = CrfModel::from_json_file(file.path()).unwrap();
        assert_eq!(loaded.emission_weights.get("bias|O"), Some(&1.0));
    }

    #[test]
    fn test_bad_model_file_is_unavailable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"emission_weights": {}, "transition_weights": [[0.0]]}"#)
            .unwrap();
        let err = CrfModel::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, AnonError::ModelUnavailable(_)));

        let err = CrfModel::from_json_file(Path::new("/nao/existe.json")).unwrap_err();
        assert!(matches!(err, AnonError::ModelUnavailable(_)));
    }
}
