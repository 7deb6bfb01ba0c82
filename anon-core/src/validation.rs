//! # Validação pós-anonimização
//!
//! Confere o resultado da substituição contra o texto original e o
//! mapeamento:
//!
//! - **Integridade**: um original do mapeamento ainda presente em qualquer
//!   posição, sem diferenciar caixa, na página anonimizada correspondente.
//!   Cópias coladas a outras palavras também contam, pois a reescrita com
//!   fronteira de palavra as deixa para trás.
//! - **Termos de parada**: um termo de parada aparece menos vezes depois da
//!   substituição (vocabulário jurídico consumido por uma entidade).
//! - **Resíduos**: padrões de PII e trechos do tipo `telefone: ...` que
//!   sobraram no texto anonimizado.
//!
//! Achados não são erros. O relatório só reprova (`passed() == false`)
//! quando há violação de integridade; o nível de risco resume o resto.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ValidationConfig;
use crate::error::{AnonError, AnonResult};
use crate::kind::Severity;
use crate::mapping::Mapping;
use crate::patterns::PatternLibrary;
use crate::rewrite::{find_occurrences, MatchPolicy};
use crate::stop_terms::StopTerms;

const CONTEXT_CONFIDENCE: f64 = 0.7;

const CONTEXT_PATTERNS: &[(&str, &str)] = &[
    (
        "name_disclosure",
        r"(?i)\b(?:nome|sobrenome|apelido):[ \t]*\p{L}[\p{L} \t]*",
    ),
    (
        "phone_disclosure",
        r"(?i)\b(?:telefone|celular|fone):[ \t]*[\d(][\d \t()-]*\d",
    ),
    (
        "address_disclosure",
        r"(?i)\b(?:endereço|rua|avenida):[ \t]*[\p{L}\d][\p{L}\d \t,.-]*",
    ),
    (
        "birth_disclosure",
        r"(?i)\b(?:nascido|nasceu|idade):[ \t]*\d[\d/.-]*",
    ),
    (
        "document_disclosure",
        r"(?i)\b(?:cpf|rg|documento):[ \t]*\d[\d \t.-]*",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    IntegrityViolation,
    StopTermLoss,
    ResidualPattern,
    ContextDisclosure,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    /// Índice da página anonimizada.
    pub page: usize,
    /// Nome do padrão, da categoria de contexto ou do termo.
    pub category: String,
    pub text: String,
    /// Offsets em bytes na página anonimizada, quando há uma posição.
    pub span: Option<(usize, usize)>,
    pub confidence: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationStatistics {
    pub total_substitutions: usize,
    /// Diferença em bytes entre o texto anonimizado e o original.
    pub text_length_change: i64,
    pub high_severity_count: usize,
    pub medium_severity_count: usize,
    pub low_severity_count: usize,
    /// Percentual do texto anonimizado coberto por resíduos.
    pub coverage_percentage: f64,
    /// Confiança média dos resíduos.
    pub confidence_average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
    pub statistics: ValidationStatistics,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        !self
            .findings
            .iter()
            .any(|f| f.kind == FindingKind::IntegrityViolation)
    }

    pub fn findings_of(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }
}

pub struct Validator {
    config: ValidationConfig,
    patterns: PatternLibrary,
    stop_terms: StopTerms,
    context: Vec<(&'static str, Regex)>,
}

impl Validator {
    pub fn new(
        config: &ValidationConfig,
        patterns: PatternLibrary,
        stop_terms: StopTerms,
    ) -> AnonResult<Self> {
        let context = CONTEXT_PATTERNS
            .iter()
            .map(|(name, source)| Ok((*name, Regex::new(source)?)))
            .collect::<AnonResult<Vec<_>>>()?;
        Ok(Self {
            config: config.clone(),
            patterns,
            stop_terms,
            context,
        })
    }

    pub fn validate<O: AsRef<str>, A: AsRef<str>>(
        &self,
        original: &[O],
        anonymized: &[A],
        mapping: &Mapping,
    ) -> AnonResult<ValidationReport> {
        if original.len() != anonymized.len() {
            return Err(AnonError::PageCountMismatch {
                expected: original.len(),
                found: anonymized.len(),
            });
        }

        let leaks = if self.config.check_integrity {
            leak_patterns(mapping)?
        } else {
            Vec::new()
        };

        let mut findings = Vec::new();
        let mut residual = Vec::new();
        for (page, (before, after)) in original.iter().zip(anonymized).enumerate() {
            let (before, after) = (before.as_ref(), after.as_ref());
            if self.config.check_integrity {
                findings.extend(integrity(page, after, mapping, &leaks));
            }
            if self.config.check_stop_terms {
                findings.extend(self.stop_term_losses(page, before, after));
            }
            if self.config.scan_residual_pii {
                residual.extend(dedup_overlapping(self.residuals(page, after, mapping)));
            }
        }

        let anonymized_len: usize = anonymized.iter().map(|p| p.as_ref().len()).sum();
        let original_len: usize = original.iter().map(|p| p.as_ref().len()).sum();

        let mut statistics = ValidationStatistics {
            total_substitutions: mapping.len(),
            text_length_change: anonymized_len as i64 - original_len as i64,
            ..Default::default()
        };
        if !residual.is_empty() {
            let covered: usize = residual
                .iter()
                .filter_map(|f| f.span.map(|(s, e)| e - s))
                .sum();
            let total_confidence: f64 = residual.iter().map(|f| f.confidence).sum();
            statistics.coverage_percentage = if anonymized_len > 0 {
                round2(covered as f64 / anonymized_len as f64 * 100.0)
            } else {
                0.0
            };
            statistics.confidence_average = round2(total_confidence / residual.len() as f64);
        }
        findings.extend(residual);

        for finding in &findings {
            match finding.severity {
                Severity::High => statistics.high_severity_count += 1,
                Severity::Medium => statistics.medium_severity_count += 1,
                Severity::Low => statistics.low_severity_count += 1,
            }
        }

        let risk_level = assess_risk(&statistics);
        let recommendations = recommendations(&findings, &statistics);
        info!(
            findings = findings.len(),
            risk = ?risk_level,
            "validação concluída"
        );
        Ok(ValidationReport {
            findings,
            statistics,
            risk_level,
            recommendations,
        })
    }

    fn stop_term_losses(&self, page: usize, before: &str, after: &str) -> Vec<Finding> {
        let before = before.to_lowercase();
        let after = after.to_lowercase();
        let mut terms: Vec<&str> = self.stop_terms.iter().collect();
        terms.sort_unstable();

        terms
            .into_iter()
            .filter_map(|term| {
                let had = find_occurrences(&before, term, MatchPolicy::Boundary).len();
                if had == 0 {
                    return None;
                }
                let has = find_occurrences(&after, term, MatchPolicy::Boundary).len();
                if has >= had {
                    return None;
                }
                debug!(page, term, had, has, "termo de parada consumido");
                Some(Finding {
                    kind: FindingKind::StopTermLoss,
                    page,
                    category: "stop_term".to_string(),
                    text: term.to_string(),
                    span: None,
                    confidence: 1.0,
                    severity: Severity::Low,
                })
            })
            .collect()
    }

    fn residuals(&self, page: usize, text: &str, mapping: &Mapping) -> Vec<Finding> {
        // Valores fictícios emitidos pela própria substituição não são resíduo
        let issued: HashSet<&str> = mapping.values().collect();

        let pattern_hits = self
            .patterns
            .find_all(text)
            .into_iter()
            .filter(|span| !issued.contains(span.text.as_str()) && !self.stop_terms.contains(&span.text))
            .map(|span| Finding {
                kind: FindingKind::ResidualPattern,
                page,
                category: span.source.trim_start_matches("pattern:").to_string(),
                text: span.text,
                span: Some((span.start, span.end)),
                confidence: span.confidence,
                severity: span.severity,
            });

        let context_hits = self.context.iter().flat_map(|(name, regex)| {
            regex.find_iter(text).map(move |m| Finding {
                kind: FindingKind::ContextDisclosure,
                page,
                category: name.to_string(),
                text: m.as_str().to_string(),
                span: Some((m.start(), m.end())),
                confidence: CONTEXT_CONFIDENCE,
                severity: Severity::High,
            })
        });

        pattern_hits.chain(context_hits).collect()
    }
}

/// Uma busca sem caixa para cada original do mapeamento.
fn leak_patterns(mapping: &Mapping) -> AnonResult<Vec<(&str, Regex)>> {
    mapping
        .keys()
        .filter(|original| !original.is_empty())
        .map(|original| {
            let regex = RegexBuilder::new(&regex::escape(original))
                .case_insensitive(true)
                .build()?;
            Ok((original, regex))
        })
        .collect()
}

fn integrity(page: usize, text: &str, mapping: &Mapping, leaks: &[(&str, Regex)]) -> Vec<Finding> {
    // Trechos escritos pela própria substituição não são vazamento
    let inserted: Vec<(usize, usize)> = mapping
        .values()
        .flat_map(|replacement| {
            find_occurrences(text, replacement, MatchPolicy::Raw)
                .into_iter()
                .map(move |start| (start, start + replacement.len()))
        })
        .collect();

    leaks
        .iter()
        .filter_map(|(original, regex)| {
            let hit = regex.find_iter(text).find(|m| {
                !inserted
                    .iter()
                    .any(|&(s, e)| s <= m.start() && m.end() <= e)
            })?;
            warn!(page, len = original.len(), "original ainda presente após a substituição");
            Some(Finding {
                kind: FindingKind::IntegrityViolation,
                page,
                category: "integrity".to_string(),
                text: original.to_string(),
                span: Some((hit.start(), hit.end())),
                confidence: 1.0,
                severity: Severity::High,
            })
        })
        .collect()
}

/// Entre achados sobrepostos fica o de maior confiança.
fn dedup_overlapping(mut findings: Vec<Finding>) -> Vec<Finding> {
    findings.sort_by_key(|f| f.span.map_or(0, |(s, _)| s));
    let mut kept: Vec<Finding> = Vec::with_capacity(findings.len());
    for finding in findings {
        let Some((start, end)) = finding.span else {
            kept.push(finding);
            continue;
        };
        let clash = kept.iter().position(|k| {
            k.span
                .is_some_and(|(ks, ke)| start < ke && ks < end)
        });
        match clash {
            Some(idx) if finding.confidence > kept[idx].confidence => {
                kept[idx] = finding;
            }
            Some(_) => {}
            None => kept.push(finding),
        }
    }
    kept
}

fn assess_risk(stats: &ValidationStatistics) -> RiskLevel {
    if stats.high_severity_count > 0 {
        RiskLevel::High
    } else if stats.medium_severity_count > 2 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

fn recommendations(findings: &[Finding], stats: &ValidationStatistics) -> Vec<String> {
    let mut out = Vec::new();
    if findings.is_empty() {
        out.push("Nenhum dado pessoal restante; documento adequadamente anonimizado.".to_string());
        return out;
    }
    if findings
        .iter()
        .any(|f| f.kind == FindingKind::IntegrityViolation)
    {
        out.push("Originais do mapeamento continuam no texto: reprocesse o documento.".to_string());
    }
    if stats.high_severity_count > 0 {
        out.push(format!(
            "{} achado(s) de alta gravidade: revise a configuração de detecção.",
            stats.high_severity_count
        ));
    }
    if stats.medium_severity_count > 3 {
        out.push(format!(
            "{} achado(s) de gravidade média: considere ampliar os termos de parada.",
            stats.medium_severity_count
        ));
    }
    if findings.iter().any(|f| f.kind == FindingKind::StopTermLoss) {
        out.push("Termos jurídicos foram substituídos junto com entidades.".to_string());
    }
    if stats.coverage_percentage > 10.0 {
        out.push(format!(
            "{}% do texto ainda parece conter PII: possível excesso de detecção.",
            stats.coverage_percentage
        ));
    }
    if stats.confidence_average > 0.0 && stats.confidence_average < 0.7 {
        out.push(format!(
            "Confiança média baixa ({}): há provavelmente falsos positivos.",
            stats.confidence_average
        ));
    }
    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(
            &ValidationConfig::default(),
            PatternLibrary::new().unwrap(),
            StopTerms::builtin(),
        )
        .unwrap()
    }

    fn mapping(pairs: &[(&str, &str)]) -> Mapping {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_clean_output_passes() {
        let m = mapping(&[("123.456.789-09", "[TAX_ID_1]"), ("joao@exemplo.org", "[EMAIL_1]")]);
        let report = validator()
            .validate(
                &["CPF: 123.456.789-09, contato: joao@exemplo.org"],
                &["CPF: [TAX_ID_1], contato: [EMAIL_1]"],
                &m,
            )
            .unwrap();
        assert!(report.passed());
        assert!(report.findings.is_empty(), "{:?}", report.findings);
        assert_eq!(report.risk_level, RiskLevel::Low);
        assert_eq!(report.statistics.total_substitutions, 2);
    }

    #[test]
    fn test_integrity_violation_fails() {
        let m = mapping(&[("Ana Souza", "[PERSON_1]")]);
        let report = validator()
            .validate(&["Ana Souza chegou"], &["Ana Souza chegou"], &m)
            .unwrap();
        assert!(!report.passed());
        let finding = report
            .findings_of(FindingKind::IntegrityViolation)
            .next()
            .unwrap();
        assert_eq!(finding.span, Some((0, 9)));
        assert_eq!(report.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_integrity_catches_glued_copy() {
        // a reescrita com fronteira deixa a cópia colada intacta
        let m = mapping(&[("123.456.789-09", "[TAX_ID_1]")]);
        let report = validator()
            .validate(
                &["CPF 123.456.789-09 e ref A123.456.789-09"],
                &["CPF [TAX_ID_1] e ref A123.456.789-09"],
                &m,
            )
            .unwrap();
        assert!(!report.passed());
        let finding = report
            .findings_of(FindingKind::IntegrityViolation)
            .next()
            .unwrap();
        assert_eq!(finding.span, Some((22, 36)));
    }

    #[test]
    fn test_integrity_ignores_case() {
        let m = mapping(&[("Ana Souza", "[PERSON_1]")]);
        let report = validator()
            .validate(&["ANA SOUZA chegou"], &["ANA SOUZA chegou"], &m)
            .unwrap();
        assert!(!report.passed());
    }

    #[test]
    fn test_integrity_skips_inserted_replacements() {
        // "son" aparece dentro do placeholder, não no texto
        let m = mapping(&[("Son", "[PERSON_1]")]);
        let report = validator()
            .validate(&["Son chegou"], &["[PERSON_1] chegou"], &m)
            .unwrap();
        assert!(report.passed(), "{:?}", report.findings);
    }

    #[test]
    fn test_stop_term_loss() {
        let m = mapping(&[("Vara de Campinas", "[ORGANIZATION_1]")]);
        let report = validator()
            .validate(
                &["Processo na Vara de Campinas"],
                &["Processo na [ORGANIZATION_1]"],
                &m,
            )
            .unwrap();
        let lost: Vec<&str> = report
            .findings_of(FindingKind::StopTermLoss)
            .map(|f| f.text.as_str())
            .collect();
        assert!(lost.contains(&"vara"));
        assert!(!lost.contains(&"processo"));
        assert!(report.passed());
    }

    #[test]
    fn test_residual_phone_prefers_pattern_over_context() {
        let report = validator()
            .validate(
                &["telefone: (11) 98765-4321"],
                &["telefone: (11) 98765-4321"],
                &Mapping::new(),
            )
            .unwrap();
        let residual: Vec<&Finding> = report
            .findings
            .iter()
            .filter(|f| {
                matches!(
                    f.kind,
                    FindingKind::ResidualPattern | FindingKind::ContextDisclosure
                )
            })
            .collect();
        assert_eq!(residual.len(), 1);
        assert_eq!(residual[0].kind, FindingKind::ResidualPattern);
        assert_eq!(report.risk_level, RiskLevel::High);
        assert!(report.passed());
    }

    #[test]
    fn test_issued_fake_values_are_not_residue() {
        let m = mapping(&[("(11) 98765-4321", "(21) 91234-5678")]);
        let report = validator()
            .validate(&["ligue (11) 98765-4321"], &["ligue (21) 91234-5678"], &m)
            .unwrap();
        assert_eq!(report.findings_of(FindingKind::ResidualPattern).count(), 0);
    }

    #[test]
    fn test_medium_risk_needs_more_than_two() {
        let report = validator()
            .validate(
                &["CEPs 01310-100 e 04567-000 e 22222-333"],
                &["CEPs 01310-100 e 04567-000 e 22222-333"],
                &Mapping::new(),
            )
            .unwrap();
        assert_eq!(report.statistics.medium_severity_count, 3);
        assert_eq!(report.risk_level, RiskLevel::Medium);
        assert!(report.statistics.coverage_percentage > 0.0);
    }

    #[test]
    fn test_page_count_mismatch() {
        let err = validator()
            .validate(&["a", "b"], &["a"], &Mapping::new())
            .unwrap_err();
        assert!(matches!(err, AnonError::PageCountMismatch { expected: 2, found: 1 }));
    }
}
