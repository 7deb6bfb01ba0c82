//! # Erros do Núcleo de Anonimização
//!
//! Cada variante corresponde a uma condição que a camada de interface
//! precisa apresentar com uma mensagem distinta. Achados de integridade
//! não são erros: aparecem no [`crate::validation::ValidationReport`].

use std::path::PathBuf;

use thiserror::Error;

use crate::kind::PiiKind;

/// Resultado padrão das operações do crate.
pub type AnonResult<T> = Result<T, AnonError>;

#[derive(Error, Debug)]
pub enum AnonError {
    /// Configuração inválida ou ausente. Fatal na inicialização.
    #[error("configuração inválida: {0}")]
    Configuration(String),

    /// Padrão regex malformado na biblioteca de padrões.
    #[error("padrão inválido: {0}")]
    PatternCompilation(String),

    /// Modelo de entidades indisponível. O detector segue apenas com regex.
    #[error("modelo de entidades indisponível: {0}")]
    ModelUnavailable(String),

    /// Dois originais distintos produziram a mesma substituição.
    #[error("reversão ambígua: '{replacement}' corresponde a {originals:?}")]
    AmbiguousReversal {
        replacement: String,
        originals: Vec<String>,
    },

    /// Arquivo de mapeamento inexistente.
    #[error("mapeamento não encontrado: {0}")]
    MappingNotFound(PathBuf),

    /// Arquivo de mapeamento com conteúdo ilegível.
    #[error("mapeamento malformado em {path}: {source}")]
    MappingMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Falha de E/S (permissão, disco cheio, arquivo corrompido...).
    #[error("falha de E/S em {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listas de páginas com tamanhos diferentes (erro do chamador).
    #[error("número de páginas divergente: esperado {expected}, recebido {found}")]
    PageCountMismatch { expected: usize, found: usize },

    /// Gerador de valores fictícios não conseguiu um valor inédito.
    #[error("valores fictícios esgotados para {kind} após {attempts} tentativas")]
    FakeValuesExhausted { kind: PiiKind, attempts: usize },
}

impl AnonError {
    /// Código estável para a camada de interface.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ANON_CONFIGURATION",
            Self::PatternCompilation(_) => "ANON_PATTERN_COMPILATION",
            Self::ModelUnavailable(_) => "ANON_MODEL_UNAVAILABLE",
            Self::AmbiguousReversal { .. } => "ANON_AMBIGUOUS_REVERSAL",
            Self::MappingNotFound(_) => "ANON_MAPPING_NOT_FOUND",
            Self::MappingMalformed { .. } => "ANON_MAPPING_MALFORMED",
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::PermissionDenied => {
                "ANON_IO_PERMISSION"
            }
            Self::Io { .. } => "ANON_IO",
            Self::PageCountMismatch { .. } => "ANON_PAGE_COUNT_MISMATCH",
            Self::FakeValuesExhausted { .. } => "ANON_FAKE_VALUES_EXHAUSTED",
        }
    }

    /// Indica se existe um caminho degradado seguro para seguir em frente.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ModelUnavailable(_))
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<regex::Error> for AnonError {
    fn from(e: regex::Error) -> Self {
        Self::PatternCompilation(e.to_string())
    }
}
