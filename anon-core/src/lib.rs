//! # anon-core: Anonimização Reversível de Dados Pessoais
//!
//! Este crate detecta dados pessoais (PII) em documentos jurídicos em
//! Português Brasileiro, substitui cada valor distinto por um placeholder ou
//! valor fictício e guarda o mapeamento para reverter a operação depois.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui por páginas de texto, já extraídas do documento:
//!
//! 1.  **Detecção** ([`detector`]): por página, junta candidatos de
//!     [`patterns`] (CPF, CNPJ, RG, CEP, telefone, e-mail) e do
//!     reconhecedor de entidades ([`recognizer`]: regras + CRF/Viterbi),
//!     descarta termos de parada e resolve sobreposições.
//! 2.  **Índice do documento**: um texto distinto → uma categoria ([`PiiKind`]).
//! 3.  **Substituição** ([`substitution`]): gera o substituto de cada texto e
//!     reescreve as páginas, chave mais longa primeiro ([`rewrite`]).
//! 4.  **Validação** ([`validation`]): procura originais remanescentes e
//!     resíduos de PII.
//! 5.  **Mapeamento** ([`mapping`]) salvo ao lado do documento e usado na
//!     **reversão** ([`reversal`]).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use anon_core::{AnonConfig, AnonymizationPipeline};
//!
//! let mut pipeline = AnonymizationPipeline::new(&AnonConfig::default()).unwrap();
//! let outcome = pipeline
//!     .run(&["CPF: 123.456.789-09, contato: joao@ex.com"])
//!     .unwrap();
//! assert_eq!(outcome.pages[0], "CPF: [TAX_ID_1], contato: [EMAIL_1]");
//!
//! let reverted = pipeline
//!     .revert_session(&outcome.pages, &outcome.mapping, None)
//!     .unwrap();
//! assert_eq!(reverted.pages[0], "CPF: 123.456.789-09, contato: joao@ex.com");
//! ```

pub mod config;
pub mod corpus;
pub mod crf;
pub mod detector;
pub mod error;
pub mod features;
pub mod kind;
pub mod mapping;
pub mod model;
pub mod pages;
pub mod patterns;
pub mod pipeline;
pub mod recognizer;
pub mod reversal;
pub mod rewrite;
pub mod rule_based;
pub mod span;
pub mod stop_terms;
pub mod substitution;
pub mod tagger;
pub mod tokenizer;
pub mod validation;
pub mod viterbi;

pub use config::{AnonConfig, StructuredStrategy, SubstitutionMode};
pub use detector::{Detector, EntityIndex};
pub use error::{AnonError, AnonResult};
pub use kind::{PiiKind, Severity};
pub use mapping::{Mapping, MappingStore};
pub use pages::{PageSink, PageSource, TextPages};
pub use patterns::PatternLibrary;
pub use pipeline::{AnonymizationOutcome, AnonymizationPipeline, DocumentOutcome, PipelineEvent};
pub use recognizer::{EntityRecognizer, RecognizerStatus};
pub use reversal::{ReversalEngine, RevertReport};
pub use span::EntitySpan;
pub use substitution::SubstitutionEngine;
pub use validation::{RiskLevel, ValidationReport, Validator};
