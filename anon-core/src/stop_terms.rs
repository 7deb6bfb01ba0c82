//! # Termos de Parada
//!
//! Vocabulário jurídico e funcional que nunca deve ser tratado como PII,
//! mesmo quando um padrão ou o modelo o aponta. A comparação é feita sobre
//! o texto aparado e em minúsculas.

use std::collections::HashSet;
use std::path::Path;

use crate::config::DetectionConfig;
use crate::error::{AnonError, AnonResult};

const DEFAULT_STOP_TERMS: &[&str] = &[
    // Papéis processuais
    "delegacia", "delegado", "delegada", "juiz", "juíza", "promotor", "promotora",
    "advogado", "advogada", "defensor", "defensora", "escrivão", "escrivã",
    "testemunha", "réu", "ré", "vítima", "autor", "autora", "querelante",
    "investigado", "investigada", "denunciado", "denunciada", "acusado", "acusada",
    // Tempo
    "horário", "hora", "data", "dia", "semana", "mês", "ano", "manhã", "tarde", "noite",
    "segunda", "terça", "quarta", "quinta", "sexta", "sábado", "domingo",
    "janeiro", "fevereiro", "março", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
    // Preposições, artigos e conectivos
    "de", "da", "do", "das", "dos", "em", "na", "no", "nas", "nos",
    "para", "por", "com", "sem", "sob", "sobre", "entre", "contra", "durante",
    "o", "a", "os", "as", "um", "uma", "uns", "umas",
    "e", "ou", "mas", "porque", "quando", "onde", "como", "que", "se",
    // Atos processuais
    "processo", "inquérito", "ação", "procedimento", "audiência", "sessão",
    "depoimento", "oitiva", "interrogatório", "acareação", "reconhecimento",
    "perícia", "laudo", "exame", "auto", "termo", "ata", "certidão",
    // Documentos
    "documento", "identidade", "carteira", "passaporte", "título", "registro",
    "comprovante", "declaração", "atestado", "relatório",
    // Rótulos de campos de identificação
    "cpf", "cnpj", "rg", "cep", "email", "e-mail", "telefone", "celular",
    // Tratamentos
    "sr", "sra", "dr", "dra",
    // Órgãos genéricos
    "tribunal", "fórum", "vara", "comarca", "cartório", "tabelião", "ofício",
    "ministério", "secretaria", "departamento", "seção", "divisão",
    // Verbos processuais
    "presente", "ausente", "comparecer", "intimar", "notificar", "citar",
    "determinar", "ordenar", "deferir", "indeferir", "arquivar", "protocolar",
    // Normas
    "artigo", "parágrafo", "inciso", "alínea", "código", "lei", "decreto",
    "resolução", "portaria", "instrução", "normativa", "regulamento",
    // Direitos e garantias
    "direito", "garantia", "liberdade", "prisão", "fiança", "habeas", "corpus",
    "mandado", "ordem", "decisão", "sentença", "acórdão", "recurso",
    // Situação das partes
    "informado", "comunicado", "cientificado",
    "intimado", "citado", "convocado", "arrolado", "qualificado",
];

/// Conjunto imutável de termos de parada, já em minúsculas.
#[derive(Debug, Clone)]
pub struct StopTerms {
    terms: HashSet<String>,
}

impl StopTerms {
    /// Lista padrão embutida.
    pub fn builtin() -> Self {
        Self {
            terms: DEFAULT_STOP_TERMS.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// Lista padrão + termos extras + arquivo opcional.
    pub fn from_config(config: &DetectionConfig) -> AnonResult<Self> {
        let mut stop_terms = Self::builtin();
        stop_terms.extend(config.extra_stop_terms.iter().map(String::as_str));
        if let Some(path) = &config.stop_terms_file {
            stop_terms.extend_from_file(path)?;
        }
        Ok(stop_terms)
    }

    pub fn extend<'a>(&mut self, terms: impl IntoIterator<Item = &'a str>) {
        for term in terms {
            let normalized = term.trim().to_lowercase();
            if !normalized.is_empty() {
                self.terms.insert(normalized);
            }
        }
    }

    fn extend_from_file(&mut self, path: &Path) -> AnonResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AnonError::Configuration(format!(
                "lista de termos de parada ilegível em {}: {e}",
                path.display()
            ))
        })?;
        self.extend(
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or(""))
        );
        Ok(())
    }

    pub fn contains(&self, text: &str) -> bool {
        self.terms.contains(&text.trim().to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Default for StopTerms {
    fn default() -> Self {
        Self::builtin()
    }
}
