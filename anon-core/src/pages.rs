//! # Fonte e destino de páginas
//!
//! O núcleo trabalha com listas de páginas já extraídas. Extração e
//! gravação de documentos ficam atrás de [`PageSource`] e [`PageSink`];
//! [`TextPages`] cobre texto puro com páginas separadas por `\f`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{AnonError, AnonResult};

pub const PAGE_BREAK: char = '\u{c}';

pub trait PageSource {
    /// Texto de cada página, na ordem do documento.
    fn extract_pages(&self, path: &Path) -> AnonResult<Vec<String>>;
}

pub trait PageSink {
    /// Grava as páginas anonimizadas e devolve o caminho efetivo.
    fn write_pages(&self, pages: &[String], anchor: &Path) -> AnonResult<PathBuf>;
}

#[derive(Debug, Clone, Default)]
pub struct TextPages;

impl TextPages {
    /// `dir/laudo.txt` → `dir/laudo_anon.txt`
    pub fn output_path(anchor: &Path) -> PathBuf {
        anchor.with_file_name(output_name(anchor))
    }
}

fn output_name(anchor: &Path) -> String {
    let stem = anchor
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}_anon.txt")
}

impl PageSource for TextPages {
    fn extract_pages(&self, path: &Path) -> AnonResult<Vec<String>> {
        let content = std::fs::read_to_string(path).map_err(|e| AnonError::io(path, e))?;
        if content.trim().is_empty() {
            warn!(path = %path.display(), "documento sem texto");
            return Ok(Vec::new());
        }
        Ok(content
            .split(PAGE_BREAK)
            .map(|page| page.trim().to_string())
            .collect())
    }
}

impl PageSink for TextPages {
    fn write_pages(&self, pages: &[String], anchor: &Path) -> AnonResult<PathBuf> {
        let content = pages.join(&PAGE_BREAK.to_string());
        let target = Self::output_path(anchor);
        match std::fs::write(&target, &content) {
            Ok(()) => {
                info!(path = %target.display(), pages = pages.len(), "documento anonimizado salvo");
                Ok(target)
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                let fallback = std::env::temp_dir()
                    .join(format!("documento_anonimizado_{}", output_name(anchor)));
                warn!(
                    denied = %target.display(),
                    path = %fallback.display(),
                    "sem permissão no diretório do documento; gravando no diretório temporário"
                );
                std::fs::write(&fallback, &content).map_err(|e| AnonError::io(&fallback, e))?;
                Ok(fallback)
            }
            Err(e) => Err(AnonError::io(&target, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_splits_on_form_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laudo.txt");
        std::fs::write(&path, "  Página um \n\u{c}Página dois\n").unwrap();
        let pages = TextPages.extract_pages(&path).unwrap();
        assert_eq!(pages, vec!["Página um", "Página dois"]);
    }

    #[test]
    fn test_blank_document_has_no_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vazio.txt");
        std::fs::write(&path, "  \n").unwrap();
        assert!(TextPages.extract_pages(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_document_is_not_found_io() {
        let err = TextPages
            .extract_pages(Path::new("/nao/existe/doc.txt"))
            .unwrap_err();
        match err {
            AnonError::Io { source, .. } => assert_eq!(source.kind(), ErrorKind::NotFound),
            other => panic!("erro inesperado: {other:?}"),
        }
    }

    #[test]
    fn test_write_next_to_anchor() {
        let dir = tempfile::tempdir().unwrap();
        let anchor = dir.path().join("processo.txt");
        let pages = vec!["[PERSON_1] chegou".to_string(), "fim".to_string()];
        let written = TextPages.write_pages(&pages, &anchor).unwrap();
        assert_eq!(written, dir.path().join("processo_anon.txt"));
        assert_eq!(TextPages.extract_pages(&written).unwrap(), pages);
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let anchor = dir.path().join("nao-existe").join("doc.txt");
        let err = TextPages.write_pages(&["x".to_string()], &anchor).unwrap_err();
        assert!(matches!(err, AnonError::Io { .. }));
    }
}
