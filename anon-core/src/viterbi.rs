//! # Decodificação de Viterbi
//!
//! Programação dinâmica sobre os scores do CRF: a melhor sequência até o token
//! `i` com tag `t` depende só da melhor sequência até `i-1`, o que reduz a busca
//! de `O(T^N)` para `O(N × T²)`.
//!
//! ```text
//! viterbi[0][t] = emission(t, x_0)
//! viterbi[i][t] = max_{t'} [viterbi[i-1][t'] + transition(t', t)] + emission(t, x_i)
//! ```

use crate::crf::{compute_emission_scores, CrfModel};
use crate::features::FeatureVector;
use crate::tagger::Tag;

/// Penalidade extra para transições que violam o esquema BIO.
const INVALID_TRANSITION_PENALTY: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct ViterbiResult {
    pub best_sequence: Vec<Tag>,
    pub best_score: f64,
    /// Scores acumulados por token, na ordem de [`Tag::all`].
    pub step_scores: Vec<Vec<f64>>,
}

pub fn viterbi_decode(model: &CrfModel, feature_vectors: &[FeatureVector]) -> ViterbiResult {
    if feature_vectors.is_empty() {
        return ViterbiResult {
            best_sequence: vec![],
            best_score: 0.0,
            step_scores: vec![],
        };
    }

    let n_tokens = feature_vectors.len();
    let tags = Tag::all();
    let n_tags = tags.len();
    let emission = compute_emission_scores(model, feature_vectors);

    let mut viterbi: Vec<f64> = emission[0].clone();
    let mut backptr: Vec<Vec<usize>> = vec![vec![0usize; n_tags]; n_tokens];
    let mut step_scores: Vec<Vec<f64>> = Vec::with_capacity(n_tokens);
    step_scores.push(viterbi.clone());

    for i in 1..n_tokens {
        let mut next = vec![f64::NEG_INFINITY; n_tags];

        for t in 0..n_tags {
            let mut best_prev_score = f64::NEG_INFINITY;
            let mut best_prev = 0;
            for prev in 0..n_tags {
                let score = viterbi[prev] + model.transition_score(&tags[prev], &tags[t]);
                if score > best_prev_score {
                    best_prev_score = score;
                    best_prev = prev;
                }
            }

            let penalty = if Tag::is_valid_transition(&tags[best_prev], &tags[t]) {
                0.0
            } else {
                INVALID_TRANSITION_PENALTY
            };
            next[t] = best_prev_score + emission[i][t] - penalty;
            backptr[i][t] = best_prev;
        }

        viterbi = next;
        step_scores.push(viterbi.clone());
    }

    // Backtracking
    let (mut best_last, best_score) = best_in_slice(&viterbi);
    let mut best_sequence: Vec<Tag> = vec![Tag::Outside; n_tokens];
    best_sequence[n_tokens - 1] = tags[best_last].clone();
    for i in (0..n_tokens - 1).rev() {
        best_last = backptr[i + 1][best_last];
        best_sequence[i] = tags[best_last].clone();
    }

    ViterbiResult {
        best_sequence,
        best_score,
        step_scores,
    }
}

fn best_in_slice(scores: &[f64]) -> (usize, f64) {
    scores
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, &v)| (i, v))
        .unwrap_or((0, f64::NEG_INFINITY))
}

/// Softmax dos scores de um passo.
pub fn scores_to_probs(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return vec![];
    }
    let max_score = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|&s| (s - max_score).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / scores.len() as f64; scores.len()];
    }
    exps.iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagger::EntityCategory;

    fn fv(index: usize, capitalized: bool) -> FeatureVector {
        let mut fv = FeatureVector::new(index);
        fv.insert("bias", 1.0);
        if capitalized {
            fv.insert("is_capitalized", 1.0);
        }
        fv
    }

    #[test]
    fn test_viterbi_prefers_capitalized_as_per() {
        let mut model = CrfModel::new();
        model.set_emission("is_capitalized", &Tag::Begin(EntityCategory::Per), 5.0);
        model.set_emission("is_capitalized", &Tag::Outside, -3.0);
        model.set_emission("bias", &Tag::Outside, 1.0);

        let result = viterbi_decode(&model, &[fv(0, true), fv(1, false)]);
        assert_eq!(result.best_sequence[0], Tag::Begin(EntityCategory::Per));
        assert_eq!(result.best_sequence[1], Tag::Outside);
        assert_eq!(result.step_scores.len(), 2);
    }

    #[test]
    fn test_viterbi_respects_bio() {
        let mut model = CrfModel::new();
        // I-PER muito atraente sozinho, mas só é válido após B-PER
        model.set_emission("is_capitalized", &Tag::Inside(EntityCategory::Per), 4.0);
        model.set_emission("bias", &Tag::Outside, 1.0);
        for prev in Tag::all() {
            for next in Tag::all() {
                if !Tag::is_valid_transition(&prev, &next) {
                    model.set_transition(&prev, &next, -8.0);
                }
            }
        }
        let result = viterbi_decode(&model, &[fv(0, false), fv(1, true)]);
        let seq = &result.best_sequence;
        assert!(Tag::is_valid_transition(&seq[0], &seq[1]));
        assert_eq!(seq[0], Tag::Begin(EntityCategory::Per));
    }

    #[test]
    fn test_viterbi_empty() {
        let result = viterbi_decode(&CrfModel::new(), &[]);
        assert!(result.best_sequence.is_empty());
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = scores_to_probs(&[1.0, 2.0, 3.0, 0.5, -1.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
