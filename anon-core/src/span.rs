//! # Spans de PII
//!
//! Um [`EntitySpan`] é uma ocorrência detectada de PII numa página.
//! Offsets são em bytes sobre o texto original (`&text[start..end] == span.text`).

use serde::{Deserialize, Serialize};

use crate::kind::{PiiKind, Severity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Texto exato da ocorrência.
    pub text: String,
    pub kind: PiiKind,
    /// Byte inicial (inclusivo).
    pub start: usize,
    /// Byte final (exclusivo).
    pub end: usize,
    /// Confiança em [0, 1].
    pub confidence: f64,
    pub severity: Severity,
    /// Origem: nome do padrão (`pattern:cpf`), da regra ou `crf`.
    pub source: String,
}

impl EntitySpan {
    pub fn new(
        text: impl Into<String>,
        kind: PiiKind,
        start: usize,
        end: usize,
        confidence: f64,
        source: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            kind,
            start,
            end,
            confidence,
            severity: kind.severity(),
            source: source.into(),
        }
    }

    /// Comprimento em bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &EntitySpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}
