//! # Pipeline de Anonimização com Eventos Observáveis
//!
//! Coordena detecção → índice do documento → substituição → validação e
//! emite eventos em cada passo via um canal `mpsc`, para que o servidor
//! WebSocket transmita o progresso ao cliente.
//!
//! Um [`AnonymizationPipeline`] pertence a uma única sessão: os contadores
//! de placeholder vivem no motor de substituição e não são compartilhados.
//! Documentos processados em paralelo usam instâncias independentes, mas
//! podem compartilhar o mesmo [`Detector`] (modelo e léxicos carregados uma
//! única vez) via [`AnonymizationPipeline::with_detector`].
//!
//! Os eventos nunca carregam o texto original de uma entidade, apenas
//! categoria, substituto e contagem. O mapeamento completo só sai em `Done`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnonConfig;
use crate::detector::{Detector, EntityIndex};
use crate::error::AnonResult;
use crate::kind::PiiKind;
use crate::mapping::{Mapping, MappingStore};
use crate::pages::{PageSink, PageSource};
use crate::recognizer::RecognizerStatus;
use crate::reversal::{ReversalEngine, RevertReport};
use crate::span::EntitySpan;
use crate::substitution::SubstitutionEngine;
use crate::validation::{ValidationReport, Validator};

/// Eventos emitidos durante uma sessão de anonimização.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// Sessão iniciada; informa se o modelo de entidades está ativo.
    Started {
        pages: usize,
        recognizer: RecognizerStatus,
    },
    /// **Passo 1**: uma página foi analisada.
    PageScanned {
        page: usize,
        entities: usize,
        by_kind: BTreeMap<PiiKind, usize>,
    },
    /// **Passo 2**: um texto distinto recebeu substituto.
    EntityResolved {
        kind: PiiKind,
        replacement: String,
        occurrences: usize,
    },
    /// **Passo 3**: validação do resultado.
    Validated { report: ValidationReport },
    /// **Conclusão**: páginas anonimizadas e mapeamento.
    Done {
        pages: Vec<String>,
        mapping: Mapping,
        processing_ms: u64,
    },
    /// **Falha**: a sessão foi abortada.
    Error { code: String, message: String },
}

/// Resultado completo de uma sessão.
#[derive(Debug, Clone, Serialize)]
pub struct AnonymizationOutcome {
    pub pages: Vec<String>,
    pub mapping: Mapping,
    pub report: ValidationReport,
    pub spans_per_page: Vec<Vec<EntitySpan>>,
}

/// Arquivos produzidos por [`AnonymizationPipeline::process_document`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub output_path: PathBuf,
    pub mapping_path: PathBuf,
    pub outcome: AnonymizationOutcome,
}

pub struct AnonymizationPipeline {
    detector: Arc<Detector>,
    substitution: SubstitutionEngine,
    validator: Validator,
    reversal: ReversalEngine,
}

impl AnonymizationPipeline {
    /// Carrega um detector próprio a partir da configuração.
    pub fn new(config: &AnonConfig) -> AnonResult<Self> {
        Self::with_detector(Arc::new(Detector::new(config)?), config)
    }

    /// Nova sessão sobre um detector já carregado.
    pub fn with_detector(detector: Arc<Detector>, config: &AnonConfig) -> AnonResult<Self> {
        let validator = Validator::new(
            &config.validation,
            detector.patterns().clone(),
            detector.stop_terms().clone(),
        )?;
        let substitution = SubstitutionEngine::new(&config.substitution);
        Ok(Self::from_parts(detector, substitution, validator))
    }

    pub fn from_parts(
        detector: Arc<Detector>,
        substitution: SubstitutionEngine,
        validator: Validator,
    ) -> Self {
        Self {
            detector,
            substitution,
            validator,
            reversal: ReversalEngine::new(),
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Versão bloqueante: devolve o resultado completo ou o erro.
    pub fn run<S: AsRef<str>>(&mut self, pages: &[S]) -> AnonResult<AnonymizationOutcome> {
        self.execute(pages, &mut |_| {})
    }

    /// Executa a sessão enviando eventos pelo canal `tx`.
    ///
    /// Termina sempre com `Done` ou `Error`. Se o receptor for descartado no
    /// meio do caminho, o processamento continua até o fim e o resultado é
    /// devolvido normalmente.
    pub fn run_streaming<S: AsRef<str>>(
        &mut self,
        pages: &[S],
        tx: mpsc::Sender<PipelineEvent>,
    ) -> AnonResult<AnonymizationOutcome> {
        let start = Instant::now();
        let result = self.execute(pages, &mut |event| {
            let _ = tx.send(event);
        });
        let last = match &result {
            Ok(outcome) => PipelineEvent::Done {
                pages: outcome.pages.clone(),
                mapping: outcome.mapping.clone(),
                processing_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => PipelineEvent::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            },
        };
        let _ = tx.send(last);
        result
    }

    fn execute<S: AsRef<str>>(
        &mut self,
        pages: &[S],
        emit: &mut dyn FnMut(PipelineEvent),
    ) -> AnonResult<AnonymizationOutcome> {
        emit(PipelineEvent::Started {
            pages: pages.len(),
            recognizer: self.detector.recognizer_status().clone(),
        });

        // === Passo 1: Detecção por página ===
        let spans_per_page = self.detector.detect_pages(pages);
        for (page, spans) in spans_per_page.iter().enumerate() {
            let mut by_kind = BTreeMap::new();
            for span in spans {
                *by_kind.entry(span.kind).or_insert(0) += 1;
            }
            emit(PipelineEvent::PageScanned {
                page,
                entities: spans.len(),
                by_kind,
            });
        }

        // === Passo 2: Índice do documento e substituição ===
        let index = EntityIndex::from_pages(&spans_per_page);
        let (anonymized, mapping) = match self.substitution.substitute(pages, &index) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "substituição falhou");
                return Err(e);
            }
        };
        for (original, replacement) in mapping.iter() {
            let occurrences = spans_per_page
                .iter()
                .flatten()
                .filter(|span| span.text == original)
                .count();
            emit(PipelineEvent::EntityResolved {
                kind: index.get(original).unwrap_or(PiiKind::Misc),
                replacement: replacement.to_string(),
                occurrences,
            });
        }

        // === Passo 3: Validação ===
        let report = self.validator.validate(pages, &anonymized, &mapping)?;
        if !report.passed() {
            warn!("resultado com violação de integridade");
        }
        emit(PipelineEvent::Validated {
            report: report.clone(),
        });

        Ok(AnonymizationOutcome {
            pages: anonymized,
            mapping,
            report,
            spans_per_page,
        })
    }

    /// Reverte as páginas. Com os originais em mãos, aponta as páginas que
    /// não voltaram idênticas.
    pub fn revert_session<S: AsRef<str>>(
        &self,
        anonymized: &[S],
        mapping: &Mapping,
        original: Option<&[S]>,
    ) -> AnonResult<RevertReport> {
        match original {
            Some(original) => self.reversal.revert_verified(anonymized, mapping, original),
            None => Ok(RevertReport {
                pages: self.reversal.revert(anonymized, mapping)?,
                mismatched_pages: Vec::new(),
            }),
        }
    }

    /// Extrai, anonimiza, grava as páginas e o mapeamento ao lado do documento.
    pub fn process_document(
        &mut self,
        path: &Path,
        source: &dyn PageSource,
        sink: &dyn PageSink,
        store: &MappingStore,
    ) -> AnonResult<DocumentOutcome> {
        let pages = source.extract_pages(path)?;
        let outcome = self.run(&pages)?;
        let output_path = sink.write_pages(&outcome.pages, path)?;
        let mapping_path = store.save(&outcome.mapping, path)?;
        info!(
            output = %output_path.display(),
            mapping = %mapping_path.display(),
            "documento processado"
        );
        Ok(DocumentOutcome {
            output_path,
            mapping_path,
            outcome,
        })
    }
}
