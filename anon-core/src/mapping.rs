//! # Mapeamento original → substituição
//!
//! O [`Mapping`] guarda uma entrada por texto distinto de PII, na ordem em que
//! as entidades foram resolvidas. Em disco é um objeto JSON legível, gravado
//! ao lado do documento como `<nome-base><sufixo>` (padrão `_mapping.json`).
//!
//! A leitura distingue três falhas: arquivo inexistente
//! ([`AnonError::MappingNotFound`]), conteúdo malformado
//! ([`AnonError::MappingMalformed`]) e demais erros de E/S ([`AnonError::Io`]).

use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::info;

use crate::config::MappingConfig;
use crate::error::{AnonError, AnonResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insere `original → replacement`. Um original já presente não é alterado.
    pub fn insert(&mut self, original: impl Into<String>, replacement: impl Into<String>) -> bool {
        let original = original.into();
        if self.index.contains_key(&original) {
            return false;
        }
        self.index.insert(original.clone(), self.entries.len());
        self.entries.push((original, replacement.into()));
        true
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.index
            .get(original)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn contains_key(&self, original: &str) -> bool {
        self.index.contains_key(original)
    }

    /// Pares na ordem de inserção.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(original, replacement)| (original.as_str(), replacement.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(original, _)| original)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(_, replacement)| replacement)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (original, replacement) in iter {
            mapping.insert(original, replacement);
        }
        mapping
    }
}

impl Serialize for Mapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (original, replacement) in &self.entries {
            map.serialize_entry(original, replacement)?;
        }
        map.end()
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = Mapping;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("um objeto JSON de strings (original → substituição)")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut mapping = Mapping::new();
        while let Some((original, replacement)) = access.next_entry::<String, String>()? {
            if mapping.contains_key(&original) {
                return Err(de::Error::custom(format!("original duplicado: {original:?}")));
            }
            mapping.insert(original, replacement);
        }
        Ok(mapping)
    }
}

impl<'de> Deserialize<'de> for Mapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

/// Persistência do mapeamento ao lado do documento.
#[derive(Debug, Clone)]
pub struct MappingStore {
    suffix: String,
}

impl MappingStore {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn from_config(config: &MappingConfig) -> Self {
        Self::new(config.suffix.clone())
    }

    /// `dir/relatorio.pdf` → `dir/relatorio_mapping.json`
    pub fn path_for(&self, anchor: &Path) -> PathBuf {
        let stem = anchor
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        anchor.with_file_name(format!("{stem}{}", self.suffix))
    }

    pub fn save(&self, mapping: &Mapping, anchor: &Path) -> AnonResult<PathBuf> {
        let path = self.path_for(anchor);
        let json = serde_json::to_string_pretty(mapping).map_err(|e| {
            AnonError::io(&path, std::io::Error::new(ErrorKind::InvalidData, e))
        })?;
        std::fs::write(&path, json).map_err(|e| AnonError::io(&path, e))?;
        info!(path = %path.display(), entries = mapping.len(), "mapeamento salvo");
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> AnonResult<Mapping> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AnonError::MappingNotFound(path.to_path_buf()))
            }
            Err(e) => return Err(AnonError::io(path, e)),
        };
        // Bytes fora de UTF-8 também caem em `MappingMalformed`
        serde_json::from_slice(&bytes).map_err(|source| AnonError::MappingMalformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Default for MappingStore {
    fn default() -> Self {
        Self::from_config(&MappingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Mapping {
        [
            ("Mariana Fagundes Torres", "[PERSON_1]"),
            ("123.456.789-09", "[TAX_ID_1]"),
            ("São Paulo", "[LOCATION_1]"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_insert_keeps_first() {
        let mut mapping = Mapping::new();
        assert!(mapping.insert("Ana", "[PERSON_1]"));
        assert!(!mapping.insert("Ana", "[PERSON_2]"));
        assert_eq!(mapping.get("Ana"), Some("[PERSON_1]"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_json_preserves_order() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.find("Mariana").unwrap() < json.find("123.456").unwrap());
        assert!(json.find("123.456").unwrap() < json.find("São Paulo").unwrap());
        let back: Mapping = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_path_for_anchor() {
        let store = MappingStore::default();
        assert_eq!(
            store.path_for(Path::new("/docs/processo.pdf")),
            PathBuf::from("/docs/processo_mapping.json")
        );
    }

    #[test]
    fn test_save_and_load_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::default();
        let path = store.save(&sample(), &dir.path().join("ação.pdf")).unwrap();
        assert_eq!(path.file_name().unwrap(), "ação_mapping.json");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("São Paulo"));
        assert_eq!(store.load(&path).unwrap(), sample());
    }

    #[test]
    fn test_load_distinguishes_failures() {
        let dir = tempfile::tempdir().unwrap();
        let store = MappingStore::default();

        let missing = store.load(&dir.path().join("nada.json")).unwrap_err();
        assert!(matches!(missing, AnonError::MappingNotFound(_)));

        let bad = dir.path().join("ruim.json");
        std::fs::write(&bad, "{\"a\": 1").unwrap();
        let malformed = store.load(&bad).unwrap_err();
        assert!(matches!(malformed, AnonError::MappingMalformed { .. }));

        // Diretório no lugar do arquivo: nem ausente nem malformado
        let other = store.load(dir.path()).unwrap_err();
        assert!(matches!(other, AnonError::Io { .. }), "{other:?}");
    }

    #[test]
    fn test_duplicate_original_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc_mapping.json");
        std::fs::write(&path, r#"{"Ana": "[PERSON_1]", "Ana": "[PERSON_2]"}"#).unwrap();
        let err = MappingStore::default().load(&path).unwrap_err();
        assert!(matches!(err, AnonError::MappingMalformed { .. }), "{err:?}");
    }

    #[test]
    fn test_save_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let anchor = dir.path().join("nao-existe").join("doc.pdf");
        let err = MappingStore::default().save(&sample(), &anchor).unwrap_err();
        assert!(matches!(err, AnonError::Io { .. }));
    }
}
