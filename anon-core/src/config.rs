//! # Configuração
//!
//! Lida a partir de TOML. Todos os campos têm valor padrão, então um arquivo
//! vazio equivale a [`AnonConfig::default`].
//!
//! ```toml
//! [detection]
//! min_confidence = 0.6
//! extra_stop_terms = ["reclamada"]
//!
//! [substitution]
//! mode = "fake_value"
//! seed = 42
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnonError, AnonResult};
use crate::kind::PiiKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnonConfig {
    pub detection: DetectionConfig,
    pub recognizer: RecognizerConfig,
    pub substitution: SubstitutionConfig,
    pub mapping: MappingConfig,
    pub validation: ValidationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Candidatos abaixo deste limiar são descartados.
    pub min_confidence: f64,
    /// Termos somados à lista padrão de termos que nunca são PII.
    pub extra_stop_terms: Vec<String>,
    /// Arquivo com um termo por linha (`#` inicia comentário).
    pub stop_terms_file: Option<PathBuf>,
    /// Visão legada: telefone que casa exatamente com CPF vira CPF.
    pub legacy_reclassify_phone: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            extra_stop_terms: Vec::new(),
            stop_terms_file: None,
            legacy_reclassify_phone: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub enabled: bool,
    /// Pesos CRF em JSON. Sem caminho, usa o modelo embutido.
    pub model_path: Option<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    /// Contadores determinísticos por categoria: `[PERSON_1]`.
    #[default]
    Placeholder,
    /// Valores sintéticos marcados como fictícios.
    FakeValue,
}

/// Como identificadores estruturados (CPF, RG, CNPJ, CEP, telefone) são gerados no modo fictício.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuredStrategy {
    /// Dígitos trocados por letras, pontuação preservada: `XXX.XXX.XXX-XX`.
    #[default]
    Mask,
    /// Dígitos aleatórios no mesmo layout.
    Fake,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstitutionConfig {
    pub mode: SubstitutionMode,
    /// Deve conter `{kind}` e `{n}`.
    pub placeholder_format: String,
    pub structured: StructuredStrategy,
    /// Substituição ancorada em fronteira de palavra.
    pub preserve_structure: bool,
    pub max_fake_retries: usize,
    pub seed: u64,
}

impl Default for SubstitutionConfig {
    fn default() -> Self {
        Self {
            mode: SubstitutionMode::Placeholder,
            placeholder_format: "[{kind}_{n}]".to_string(),
            structured: StructuredStrategy::Mask,
            preserve_structure: true,
            max_fake_retries: 64,
            seed: 0x5EED,
        }
    }
}

impl SubstitutionConfig {
    /// Renderiza o placeholder para a `n`-ésima entidade de uma categoria.
    pub fn placeholder(&self, kind: PiiKind, n: usize) -> String {
        self.placeholder_format
            .replace("{kind}", kind.name())
            .replace("{n}", &n.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub suffix: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            suffix: "_mapping.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub check_integrity: bool,
    pub check_stop_terms: bool,
    pub scan_residual_pii: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            check_integrity: true,
            check_stop_terms: true,
            scan_residual_pii: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AnonConfig {
    pub fn from_toml_str(content: &str) -> AnonResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AnonError::Configuration(format!("TOML inválido: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> AnonResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnonError::Configuration(format!("não foi possível ler {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> AnonResult<()> {
        let threshold = self.detection.min_confidence;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AnonError::Configuration(format!(
                "detection.min_confidence fora de [0, 1]: {threshold}"
            )));
        }
        let format = &self.substitution.placeholder_format;
        if !format.contains("{kind}") || !format.contains("{n}") {
            return Err(AnonError::Configuration(format!(
                "substitution.placeholder_format precisa de {{kind}} e {{n}}: {format:?}"
            )));
        }
        if self.substitution.max_fake_retries == 0 {
            return Err(AnonError::Configuration(
                "substitution.max_fake_retries deve ser positivo".to_string(),
            ));
        }
        if self.mapping.suffix.trim().is_empty() {
            return Err(AnonError::Configuration(
                "mapping.suffix não pode ser vazio".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = AnonConfig::from_toml_str("").unwrap();
        assert_eq!(config.detection.min_confidence, 0.5);
        assert_eq!(config.substitution.mode, SubstitutionMode::Placeholder);
        assert_eq!(config.mapping.suffix, "_mapping.json");
        assert!(config.recognizer.enabled);
    }

    #[test]
    fn test_partial_sections() {
        let config = AnonConfig::from_toml_str(
            r#"
            [substitution]
            mode = "fake_value"
            structured = "fake"
            seed = 7

            [detection]
            extra_stop_terms = ["reclamada"]
            "#,
        )
        .unwrap();
        assert_eq!(config.substitution.mode, SubstitutionMode::FakeValue);
        assert_eq!(config.substitution.structured, StructuredStrategy::Fake);
        assert_eq!(config.substitution.seed, 7);
        assert_eq!(config.substitution.placeholder_format, "[{kind}_{n}]");
        assert_eq!(config.detection.extra_stop_terms, vec!["reclamada"]);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let err = AnonConfig::from_toml_str("[detection]\nmin_confidence = 1.5").unwrap_err();
        assert!(matches!(err, AnonError::Configuration(_)));
    }

    #[test]
    fn test_placeholder_format_needs_tokens() {
        let err = AnonConfig::from_toml_str("[substitution]\nplaceholder_format = \"<{kind}>\"")
            .unwrap_err();
        assert!(matches!(err, AnonError::Configuration(_)));
    }

    #[test]
    fn test_placeholder_render() {
        let cfg = SubstitutionConfig::default();
        assert_eq!(cfg.placeholder(PiiKind::TaxId, 1), "[TAX_ID_1]");
        assert_eq!(cfg.placeholder(PiiKind::Person, 12), "[PERSON_12]");
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = AnonConfig::load("/nao/existe/anon.toml").unwrap_err();
        assert!(matches!(err, AnonError::Configuration(_)));
    }
}
