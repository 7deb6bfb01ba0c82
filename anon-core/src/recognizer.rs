//! # Reconhecedor de entidades
//!
//! Encontra PII não estruturada (pessoas, organizações, locais) combinando o
//! motor de regras com o CRF: onde uma regra casa ela prevalece, no resto vale
//! a decodificação de Viterbi. As categorias do modelo são traduzidas para
//! [`PiiKind`] num único ponto (`From<EntityCategory>`).
//!
//! A disponibilidade do modelo é decidida uma vez, em [`EntityRecognizer::load`].
//! Sem modelo o reconhecedor devolve listas vazias e a detecção segue só com
//! os padrões.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::RecognizerConfig;
use crate::crf::CrfModel;
use crate::features::extract_features;
use crate::kind::PiiKind;
use crate::model::NerModel;
use crate::span::EntitySpan;
use crate::tagger::{tokens_to_spans, Tag, TaggedToken};
use crate::tokenizer::tokenize;
use crate::viterbi::{scores_to_probs, viterbi_decode};

/// Estado do modelo, decidido na construção.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RecognizerStatus {
    Ready,
    /// Desligado por configuração.
    Disabled,
    /// O modelo não pôde ser carregado.
    Unavailable(String),
}

pub struct EntityRecognizer {
    model: Option<NerModel>,
    status: RecognizerStatus,
}

impl EntityRecognizer {
    /// Nunca falha: um modelo ilegível vira [`RecognizerStatus::Unavailable`]
    /// com um único aviso no log.
    pub fn load(config: &RecognizerConfig) -> Self {
        if !config.enabled {
            info!("reconhecedor de entidades desligado; detecção apenas por padrões");
            return Self {
                model: None,
                status: RecognizerStatus::Disabled,
            };
        }

        let Some(path) = &config.model_path else {
            return Self::with_model(NerModel::build());
        };

        match CrfModel::from_json_file(path) {
            Ok(crf) => {
                info!(path = %path.display(), "pesos CRF carregados");
                Self::with_model(NerModel::with_crf(crf))
            }
            Err(e) => {
                warn!(error = %e, "modelo de entidades indisponível; detecção apenas por padrões");
                Self {
                    model: None,
                    status: RecognizerStatus::Unavailable(e.to_string()),
                }
            }
        }
    }

    pub fn with_model(model: NerModel) -> Self {
        Self {
            model: Some(model),
            status: RecognizerStatus::Ready,
        }
    }

    pub fn status(&self) -> &RecognizerStatus {
        &self.status
    }

    pub fn is_available(&self) -> bool {
        self.model.is_some()
    }

    /// Tags por token no modo híbrido (regra vence o CRF).
    pub fn tag(&self, text: &str) -> Vec<TaggedToken> {
        let Some(model) = &self.model else {
            return vec![];
        };
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![];
        }

        let feature_vectors = extract_features(&tokens, model.gazetteers());
        let rule_matches = model.rule_engine.apply(&tokens);
        let viterbi = viterbi_decode(&model.crf, &feature_vectors);

        tokens
            .into_iter()
            .enumerate()
            .map(|(i, token)| match &rule_matches[i] {
                Some(rm) => TaggedToken {
                    token,
                    tag: rm.tag.clone(),
                    confidence: rm.confidence,
                    rule: Some(rm.rule_name.clone()),
                },
                None => {
                    let tag = viterbi.best_sequence.get(i).cloned().unwrap_or(Tag::Outside);
                    let confidence = viterbi
                        .step_scores
                        .get(i)
                        .map(|scores| scores_to_probs(scores))
                        .and_then(|probs| probs.get(tag.index()).copied())
                        .unwrap_or(0.5);
                    TaggedToken {
                        token,
                        tag,
                        confidence,
                        rule: None,
                    }
                }
            })
            .collect()
    }

    /// Spans de PERSON, ORGANIZATION, LOCATION e MISC com confiança sempre preenchida.
    pub fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let tagged = self.tag(text);
        tokens_to_spans(&tagged)
            .into_iter()
            .map(|span| {
                let surface = &text[span.start..span.end];
                let confidence = span
                    .rule_confidence
                    .unwrap_or_else(|| heuristic_confidence(surface));
                EntitySpan::new(
                    surface,
                    PiiKind::from(span.category),
                    span.start,
                    span.end,
                    confidence,
                    span.rule.unwrap_or_else(|| "crf".to_string()),
                )
            })
            .collect()
    }
}

/// Confiança de um span sem score nativo: base 0.8, penalizada por spans curtos
/// (−0.2), com dígitos (−0.1) ou todo em maiúsculas (−0.15). Limitada a [0.1, 1.0].
pub fn heuristic_confidence(text: &str) -> f64 {
    let mut confidence: f64 = 0.8;
    if text.chars().count() < 3 {
        confidence -= 0.2;
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        confidence -= 0.1;
    }
    let has_cased = text.chars().any(char::is_alphabetic);
    let all_upper = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .all(char::is_uppercase);
    if has_cased && all_upper && text.chars().count() > 1 {
        confidence -= 0.15;
    }
    confidence.clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ready() -> EntityRecognizer {
        EntityRecognizer::load(&RecognizerConfig::default())
    }

    #[test]
    fn test_heuristic_confidence() {
        assert!((heuristic_confidence("Helena Prado") - 0.8).abs() < 1e-9);
        assert!((heuristic_confidence("Jo") - 0.6).abs() < 1e-9);
        assert!((heuristic_confidence("Lote 12") - 0.7).abs() < 1e-9);
        assert!((heuristic_confidence("ACME") - 0.65).abs() < 1e-9);
        // curto + dígito + maiúsculas
        assert!((heuristic_confidence("A1") - 0.35).abs() < 1e-9);
        assert!(heuristic_confidence("") >= 0.1);
    }

    #[test]
    fn test_rule_spans_keep_rule_confidence() {
        let spans = ready().recognize("A autora Mariana Fagundes Torres ajuizou ação.");
        let person = spans
            .iter()
            .find(|s| s.kind == PiiKind::Person)
            .expect("pessoa reconhecida");
        assert_eq!(person.text, "Mariana Fagundes Torres");
        assert_eq!(person.source, "person_gazetteer");
        assert!((person.confidence - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_crf_span_uses_heuristic() {
        let text = "a testemunha Odete Vasconcelos declarou";
        let spans = ready().recognize(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "Odete Vasconcelos");
        assert_eq!(spans[0].source, "crf");
        assert_eq!(&text[spans[0].start..spans[0].end], "Odete Vasconcelos");
        assert!((spans[0].confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_categories_map_to_kinds() {
        let spans = ready().recognize("O réu mora na Rua das Acácias e deve ao Banco Meridiano.");
        assert!(spans.iter().any(|s| s.kind == PiiKind::Location && s.text == "Rua das Acácias"));
        assert!(spans.iter().any(|s| s.kind == PiiKind::Organization && s.text == "Banco Meridiano"));
    }

    #[test]
    fn test_missing_model_degrades() {
        let config = RecognizerConfig {
            enabled: true,
            model_path: Some(PathBuf::from("/nao/existe/pesos.json")),
        };
        let recognizer = EntityRecognizer::load(&config);
        assert!(matches!(recognizer.status(), RecognizerStatus::Unavailable(_)));
        assert!(!recognizer.is_available());
        assert!(recognizer.recognize("Mariana Fagundes Torres").is_empty());
    }

    #[test]
    fn test_disabled_recognizer() {
        let config = RecognizerConfig {
            enabled: false,
            model_path: None,
        };
        let recognizer = EntityRecognizer::load(&config);
        assert_eq!(recognizer.status(), &RecognizerStatus::Disabled);
        assert!(recognizer.recognize("Mariana").is_empty());
    }
}
