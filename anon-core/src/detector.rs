//! # Detector de PII
//!
//! Junta os candidatos do reconhecedor e da biblioteca de padrões, descarta
//! termos de parada e candidatos de baixa confiança e resolve sobreposições
//! de forma gulosa:
//!
//! ```text
//! ordena por (início ↑, confiança ↓, comprimento ↓)
//! mantém o candidato se início ≥ fim do último mantido
//! ```
//!
//! A resolução não busca o ótimo global; uma região reclamada não é mais
//! disputada por candidatos posteriores.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use crate::config::AnonConfig;
use crate::error::AnonResult;
use crate::kind::PiiKind;
use crate::patterns::PatternLibrary;
use crate::recognizer::{EntityRecognizer, RecognizerStatus};
use crate::span::EntitySpan;
use crate::stop_terms::StopTerms;

pub struct Detector {
    patterns: PatternLibrary,
    recognizer: EntityRecognizer,
    stop_terms: StopTerms,
    min_confidence: f64,
    legacy_reclassify_phone: bool,
}

impl Detector {
    /// Falha apenas por configuração inválida; um modelo ausente só degrada a detecção.
    pub fn new(config: &AnonConfig) -> AnonResult<Self> {
        config.validate()?;
        Ok(Self {
            patterns: PatternLibrary::new()?,
            recognizer: EntityRecognizer::load(&config.recognizer),
            stop_terms: StopTerms::from_config(&config.detection)?,
            min_confidence: config.detection.min_confidence,
            legacy_reclassify_phone: config.detection.legacy_reclassify_phone,
        })
    }

    pub fn from_parts(
        patterns: PatternLibrary,
        recognizer: EntityRecognizer,
        stop_terms: StopTerms,
        min_confidence: f64,
    ) -> Self {
        Self {
            patterns,
            recognizer,
            stop_terms,
            min_confidence,
            legacy_reclassify_phone: true,
        }
    }

    pub fn recognizer_status(&self) -> &RecognizerStatus {
        self.recognizer.status()
    }

    pub fn patterns(&self) -> &PatternLibrary {
        &self.patterns
    }

    pub fn stop_terms(&self) -> &StopTerms {
        &self.stop_terms
    }

    /// Todos os candidatos, antes de qualquer filtro: modelo primeiro, depois padrões.
    pub fn candidates(&self, text: &str) -> Vec<EntitySpan> {
        let mut candidates = self.recognizer.recognize(text);
        candidates.extend(self.patterns.find_all(text));
        candidates
    }

    /// Spans aceitos numa página, ordenados e sem sobreposição.
    pub fn detect(&self, text: &str) -> Vec<EntitySpan> {
        let accepted: Vec<EntitySpan> = self
            .candidates(text)
            .into_iter()
            .filter(|span| self.accept(span))
            .collect();
        resolve_overlaps(accepted)
    }

    fn accept(&self, span: &EntitySpan) -> bool {
        if self.stop_terms.contains(&span.text) {
            warn!(kind = %span.kind, len = span.len(), "candidato descartado: termo de parada");
            debug!(text = %span.text, "termo de parada");
            return false;
        }
        if span.confidence < self.min_confidence {
            warn!(
                kind = %span.kind,
                len = span.len(),
                confidence = span.confidence,
                "candidato descartado: confiança abaixo do limiar"
            );
            debug!(text = %span.text, "baixa confiança");
            return false;
        }
        true
    }

    /// Uma lista de spans por página, na ordem do documento.
    pub fn detect_pages<S: AsRef<str>>(&self, pages: &[S]) -> Vec<Vec<EntitySpan>> {
        pages.iter().map(|page| self.detect(page.as_ref())).collect()
    }

    /// Visão legada do documento inteiro: a última página vence em colisão de
    /// texto e, depois, telefones com formato exato de CPF viram CPF.
    pub fn detect_all_pages<S: AsRef<str>>(&self, pages: &[S]) -> EntityIndex {
        debug!(pages = pages.len(), "detecção legada por documento");
        let mut index = EntityIndex::new();
        for spans in self.detect_pages(pages) {
            for span in spans {
                index.overwrite(span.text, span.kind);
            }
        }

        if self.legacy_reclassify_phone {
            let phones: Vec<String> = index
                .iter()
                .filter(|(text, kind)| *kind == PiiKind::Phone && self.patterns.is_tax_id_exact(text))
                .map(|(text, _)| text.to_string())
                .collect();
            for text in phones {
                index.overwrite(text, PiiKind::TaxId);
            }
        }
        index
    }
}

fn by_position(a: &EntitySpan, b: &EntitySpan) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| b.len().cmp(&a.len()))
}

/// Escalonamento guloso de intervalos. A ordenação é estável: candidatos
/// empatados mantêm a ordem de chegada.
pub fn resolve_overlaps(mut candidates: Vec<EntitySpan>) -> Vec<EntitySpan> {
    candidates.sort_by(by_position);

    let mut kept: Vec<EntitySpan> = Vec::with_capacity(candidates.len());
    let mut last_end = 0;
    for span in candidates {
        if kept.is_empty() || span.start >= last_end {
            last_end = span.end;
            kept.push(span);
        }
    }
    kept
}

/// Texto de PII → categoria, em ordem de inserção.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityIndex {
    entries: Vec<(String, PiiKind)>,
    positions: HashMap<String, usize>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Índice a partir dos spans por página; a primeira ocorrência define a categoria.
    pub fn from_pages(spans_per_page: &[Vec<EntitySpan>]) -> Self {
        let mut index = Self::new();
        for span in spans_per_page.iter().flatten() {
            index.insert(span.text.clone(), span.kind);
        }
        index
    }

    /// Insere se o texto ainda não existe. Retorna `true` se inseriu.
    pub fn insert(&mut self, text: impl Into<String>, kind: PiiKind) -> bool {
        let text = text.into();
        if self.positions.contains_key(&text) {
            return false;
        }
        self.positions.insert(text.clone(), self.entries.len());
        self.entries.push((text, kind));
        true
    }

    /// Insere ou troca a categoria, mantendo a posição original.
    pub fn overwrite(&mut self, text: impl Into<String>, kind: PiiKind) {
        let text = text.into();
        match self.positions.get(&text) {
            Some(&pos) => self.entries[pos].1 = kind,
            None => {
                self.insert(text, kind);
            }
        }
    }

    pub fn get(&self, text: &str) -> Option<PiiKind> {
        self.positions.get(text).map(|&pos| self.entries[pos].1)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.positions.contains_key(text)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PiiKind)> {
        self.entries.iter().map(|(text, kind)| (text.as_str(), *kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for EntityIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (text, kind) in &self.entries {
            map.serialize_entry(text, kind)?;
        }
        map.end()
    }
}

impl<S: Into<String>> FromIterator<(S, PiiKind)> for EntityIndex {
    fn from_iter<I: IntoIterator<Item = (S, PiiKind)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (text, kind) in iter {
            index.insert(text, kind);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str, start: usize, end: usize, confidence: f64) -> EntitySpan {
        EntitySpan::new(text, PiiKind::Person, start, end, confidence, "test")
    }

    fn detector() -> Detector {
        Detector::new(&AnonConfig::default()).unwrap()
    }

    #[test]
    fn test_overlap_earliest_start_wins() {
        let kept = resolve_overlaps(vec![
            span("João Silva", 0, 10, 0.9),
            span("Silva Pereira", 5, 18, 0.95),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "João Silva");
    }

    #[test]
    fn test_overlap_tie_break_confidence_then_length() {
        let kept = resolve_overlaps(vec![
            span("Ana", 0, 3, 0.7),
            span("Ana Silva", 0, 9, 0.7),
            span("Ana S", 0, 5, 0.9),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].text, "Ana S");

        let kept = resolve_overlaps(vec![span("Ana", 0, 3, 0.7), span("Ana Silva", 0, 9, 0.7)]);
        assert_eq!(kept[0].text, "Ana Silva");
    }

    #[test]
    fn test_overlap_keeps_adjacent() {
        let kept = resolve_overlaps(vec![span("B", 5, 8, 0.6), span("A", 0, 5, 0.6)]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].text, "A");
        assert_eq!(kept[1].text, "B");
    }

    #[test]
    fn test_end_to_end_page() {
        let text = "CPF: 123.456.789-09, contato: joao@ex.com";
        let spans = detector().detect(text);
        assert_eq!(spans.len(), 2, "{spans:?}");
        assert_eq!(spans[0].kind, PiiKind::TaxId);
        assert_eq!(spans[0].text, "123.456.789-09");
        assert_eq!(spans[1].kind, PiiKind::Email);
        assert_eq!(spans[1].text, "joao@ex.com");
    }

    #[test]
    fn test_stop_terms_never_returned() {
        let detector = detector();
        let text = "A Testemunha compareceu perante o Juiz. Processo de Ana Souza.";
        for span in detector.detect(text) {
            assert!(!detector.stop_terms().contains(&span.text), "{}", span.text);
        }
    }

    #[test]
    fn test_stop_term_rejects_pattern_match() {
        let mut config = AnonConfig::default();
        config.detection.extra_stop_terms = vec!["joao@ex.com".into()];
        let detector = Detector::new(&config).unwrap();
        let spans = detector.detect("contato: joao@ex.com");
        assert!(spans.iter().all(|s| s.kind != PiiKind::Email));
    }

    #[test]
    fn test_invalid_checksum_is_not_tax_id() {
        let spans = detector().detect("CPF 123.456.789-00 informado");
        assert!(spans.iter().all(|s| s.kind != PiiKind::TaxId));
    }

    #[test]
    fn test_threshold_filters() {
        let mut config = AnonConfig::default();
        config.detection.min_confidence = 0.99;
        let detector = Detector::new(&config).unwrap();
        assert!(detector.detect("contato: joao@ex.com").is_empty());
    }

    #[test]
    fn test_entity_index_first_occurrence_wins() {
        let pages = vec![
            vec![EntitySpan::new("Lins", PiiKind::Person, 0, 4, 0.9, "t")],
            vec![EntitySpan::new("Lins", PiiKind::Location, 0, 4, 0.9, "t")],
        ];
        let index = EntityIndex::from_pages(&pages);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Lins"), Some(PiiKind::Person));
    }

    #[test]
    fn test_entity_index_overwrite_keeps_position() {
        let mut index = EntityIndex::new();
        index.insert("a", PiiKind::Person);
        index.insert("b", PiiKind::Email);
        index.overwrite("a", PiiKind::Location);
        let entries: Vec<_> = index.iter().collect();
        assert_eq!(entries, vec![("a", PiiKind::Location), ("b", PiiKind::Email)]);
        assert_eq!(
            serde_json::to_string(&index).unwrap(),
            r#"{"a":"LOCATION","b":"EMAIL"}"#
        );
    }

    #[test]
    fn test_detect_all_pages_legacy() {
        let pages = ["contato: joao@ex.com", "e-mail joao@ex.com; CPF 529.982.247-25"];
        let index = detector().detect_all_pages(&pages);
        assert_eq!(index.get("joao@ex.com"), Some(PiiKind::Email));
        assert_eq!(index.get("529.982.247-25"), Some(PiiKind::TaxId));
    }

    #[test]
    fn test_detect_pages_keeps_order() {
        let pages = vec!["nada aqui".to_string(), "joao@ex.com".to_string()];
        let spans = detector().detect_pages(&pages);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].is_empty());
        assert_eq!(spans[1][0].kind, PiiKind::Email);
    }
}
