//! # Reversão
//!
//! Inverte o mapeamento (substituto → original) e reescreve as páginas com a
//! mesma disciplina da anonimização: chave mais longa primeiro, sem reexaminar
//! o texto já restaurado. Se dois originais distintos compartilham um
//! substituto a inversão é ambígua e a reversão falha com
//! [`AnonError::AmbiguousReversal`].

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AnonError, AnonResult};
use crate::mapping::Mapping;
use crate::rewrite::{rewrite, MatchPolicy};

/// Resultado de uma reversão conferida contra o texto original.
#[derive(Debug, Clone, Serialize)]
pub struct RevertReport {
    pub pages: Vec<String>,
    /// Índices das páginas que não voltaram idênticas ao original.
    pub mismatched_pages: Vec<usize>,
}

impl RevertReport {
    pub fn is_exact(&self) -> bool {
        self.mismatched_pages.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReversalEngine {
    policy: MatchPolicy,
}

impl ReversalEngine {
    pub fn new() -> Self {
        Self {
            policy: MatchPolicy::Raw,
        }
    }

    /// Pares (substituto, original) na ordem do mapeamento.
    pub fn inverse(mapping: &Mapping) -> AnonResult<Vec<(String, String)>> {
        let mut owners: HashMap<&str, Vec<&str>> = HashMap::new();
        for (original, replacement) in mapping.iter() {
            owners.entry(replacement).or_default().push(original);
        }

        let ambiguous = mapping
            .values()
            .find(|replacement| owners.get(replacement).is_some_and(|o| o.len() > 1));
        if let Some(replacement) = ambiguous {
            let originals = owners[replacement].iter().map(|s| s.to_string()).collect();
            warn!(replacement, "substituto compartilhado por originais distintos");
            return Err(AnonError::AmbiguousReversal {
                replacement: replacement.to_string(),
                originals,
            });
        }

        Ok(mapping
            .iter()
            .map(|(original, replacement)| (replacement.to_string(), original.to_string()))
            .collect())
    }

    pub fn revert<S: AsRef<str>>(&self, pages: &[S], mapping: &Mapping) -> AnonResult<Vec<String>> {
        let inverse = Self::inverse(mapping)?;
        let pairs: Vec<(&str, &str)> = inverse
            .iter()
            .map(|(replacement, original)| (replacement.as_str(), original.as_str()))
            .collect();
        let reverted: Vec<String> = pages
            .iter()
            .map(|page| rewrite(page.as_ref(), &pairs, self.policy))
            .collect();
        info!(pages = reverted.len(), entries = pairs.len(), "reversão concluída");
        Ok(reverted)
    }

    /// Reverte e compara página a página com o original.
    pub fn revert_verified<A: AsRef<str>, O: AsRef<str>>(
        &self,
        anonymized: &[A],
        mapping: &Mapping,
        original: &[O],
    ) -> AnonResult<RevertReport> {
        if anonymized.len() != original.len() {
            return Err(AnonError::PageCountMismatch {
                expected: original.len(),
                found: anonymized.len(),
            });
        }
        let pages = self.revert(anonymized, mapping)?;
        let mismatched_pages: Vec<usize> = pages
            .iter()
            .zip(original)
            .enumerate()
            .filter(|(_, (reverted, original))| reverted.as_str() != original.as_ref())
            .map(|(i, _)| i)
            .collect();
        if !mismatched_pages.is_empty() {
            warn!(pages = ?mismatched_pages, "reversão não reproduziu o original");
        }
        Ok(RevertReport {
            pages,
            mismatched_pages,
        })
    }
}

impl Default for ReversalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> Mapping {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_revert_scenario() {
        let m = mapping(&[("123.456.789-09", "[TAX_ID_1]"), ("joao@ex.com", "[EMAIL_1]")]);
        let out = ReversalEngine::new()
            .revert(&["CPF: [TAX_ID_1], contato: [EMAIL_1]"], &m)
            .unwrap();
        assert_eq!(out, vec!["CPF: 123.456.789-09, contato: joao@ex.com"]);
    }

    #[test]
    fn test_ambiguous_reversal() {
        let m = mapping(&[("João", "[P_1]"), ("Maria", "[P_1]")]);
        let err = ReversalEngine::new().revert(&["[P_1] chegou"], &m).unwrap_err();
        match err {
            AnonError::AmbiguousReversal {
                replacement,
                originals,
            } => {
                assert_eq!(replacement, "[P_1]");
                assert_eq!(originals, vec!["João".to_string(), "Maria".to_string()]);
            }
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_longest_replacement_first() {
        // a máscara de RG é substring da máscara de CPF
        let m = mapping(&[("12.345.678-9", "XX.XXX.XXX-X"), ("123.456.789-09", "XXX.XXX.XXX-XX")]);
        let out = ReversalEngine::new()
            .revert(&["RG XX.XXX.XXX-X, CPF XXX.XXX.XXX-XX"], &m)
            .unwrap();
        assert_eq!(out[0], "RG 12.345.678-9, CPF 123.456.789-09");
    }

    #[test]
    fn test_restored_text_is_not_rewritten() {
        // o original contém outro substituto
        let m = mapping(&[("nota [A]", "[B]"), ("x", "[A]")]);
        let out = ReversalEngine::new().revert(&["[B] e [A]"], &m).unwrap();
        assert_eq!(out[0], "nota [A] e x");
    }

    #[test]
    fn test_revert_verified_reports_mismatch() {
        let m = mapping(&[("Ana", "[PERSON_1]")]);
        let engine = ReversalEngine::new();
        let report = engine
            .revert_verified(&["[PERSON_1] chegou", "nada"], &m, &["Ana chegou", "algo"])
            .unwrap();
        assert_eq!(report.mismatched_pages, vec![1]);
        assert!(!report.is_exact());

        let err = engine
            .revert_verified(&["[PERSON_1]"], &m, &["Ana", "extra"])
            .unwrap_err();
        assert!(matches!(err, AnonError::PageCountMismatch { expected: 2, found: 1 }));
    }
}
