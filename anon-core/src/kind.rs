//! # Categorias de PII
//!
//! Conjunto fechado de categorias usado em todo o crate. Rótulos externos
//! (modelos NER, arquivos legados) passam por [`PiiKind::from_label`] uma única vez.
//!
//! | Categoria    | Exemplo                | Severidade |
//! |--------------|------------------------|------------|
//! | PERSON       | Maria Souza            | alta       |
//! | ORGANIZATION | Construtora Alfa Ltda  | média      |
//! | LOCATION     | Campinas               | média      |
//! | TAX_ID       | 123.456.789-09 (CPF)   | alta       |
//! | PHONE        | (11) 98765-4321        | alta       |
//! | EMAIL        | ana@exemplo.com        | alta       |
//! | POSTAL_CODE  | 01310-100 (CEP)        | média      |
//! | NATIONAL_ID  | 12.345.678-9 (RG)      | alta       |
//! | COMPANY_ID   | 11.222.333/0001-81     | alta       |
//! | MISC         | outros                 | baixa      |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tagger::EntityCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiKind {
    Person,
    Organization,
    Location,
    TaxId,
    Phone,
    Email,
    PostalCode,
    NationalId,
    CompanyId,
    Misc,
}

impl PiiKind {
    pub const ALL: [PiiKind; 10] = [
        PiiKind::Person,
        PiiKind::Organization,
        PiiKind::Location,
        PiiKind::TaxId,
        PiiKind::Phone,
        PiiKind::Email,
        PiiKind::PostalCode,
        PiiKind::NationalId,
        PiiKind::CompanyId,
        PiiKind::Misc,
    ];

    /// Nome canônico, também usado no token `{kind}` dos placeholders.
    pub fn name(&self) -> &'static str {
        match self {
            PiiKind::Person => "PERSON",
            PiiKind::Organization => "ORGANIZATION",
            PiiKind::Location => "LOCATION",
            PiiKind::TaxId => "TAX_ID",
            PiiKind::Phone => "PHONE",
            PiiKind::Email => "EMAIL",
            PiiKind::PostalCode => "POSTAL_CODE",
            PiiKind::NationalId => "NATIONAL_ID",
            PiiKind::CompanyId => "COMPANY_ID",
            PiiKind::Misc => "MISC",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PiiKind::Person
            | PiiKind::TaxId
            | PiiKind::NationalId
            | PiiKind::CompanyId
            | PiiKind::Email
            | PiiKind::Phone => Severity::High,
            PiiKind::Organization | PiiKind::Location | PiiKind::PostalCode => Severity::Medium,
            PiiKind::Misc => Severity::Low,
        }
    }

    /// Identificadores com layout de pontuação fixo, mascarados caractere a caractere.
    pub fn is_structured(&self) -> bool {
        matches!(
            self,
            PiiKind::TaxId
                | PiiKind::Phone
                | PiiKind::PostalCode
                | PiiKind::NationalId
                | PiiKind::CompanyId
        )
    }

    /// Normaliza rótulos externos (ex: "PER", "PESSOA", "CPF") para o conjunto interno.
    pub fn from_label(label: &str) -> Option<Self> {
        let upper = label.trim().to_uppercase();
        let kind = match upper.as_str() {
            "PER" | "PERSON" | "PESSOA" | "NOME" => PiiKind::Person,
            "ORG" | "ORGANIZATION" | "ORGANIZACAO" | "ORGANIZAÇÃO" | "EMPRESA" => {
                PiiKind::Organization
            }
            "LOC" | "GPE" | "LOCATION" | "LOCAL" | "ENDERECO" | "ENDEREÇO" => PiiKind::Location,
            "CPF" | "TAX_ID" => PiiKind::TaxId,
            "PHONE" | "TELEFONE" => PiiKind::Phone,
            "EMAIL" | "E-MAIL" => PiiKind::Email,
            "CEP" | "POSTAL_CODE" => PiiKind::PostalCode,
            "RG" | "NATIONAL_ID" => PiiKind::NationalId,
            "CNPJ" | "COMPANY_ID" => PiiKind::CompanyId,
            "MISC" => PiiKind::Misc,
            _ => return None,
        };
        Some(kind)
    }
}

impl From<EntityCategory> for PiiKind {
    fn from(cat: EntityCategory) -> Self {
        match cat {
            EntityCategory::Per => PiiKind::Person,
            EntityCategory::Org => PiiKind::Organization,
            EntityCategory::Loc => PiiKind::Location,
            EntityCategory::Misc => PiiKind::Misc,
        }
    }
}

impl fmt::Display for PiiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Gravidade de um dado exposto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_normalization() {
        assert_eq!(PiiKind::from_label("PER"), Some(PiiKind::Person));
        assert_eq!(PiiKind::from_label("pessoa"), Some(PiiKind::Person));
        assert_eq!(PiiKind::from_label("GPE"), Some(PiiKind::Location));
        assert_eq!(PiiKind::from_label("cnpj"), Some(PiiKind::CompanyId));
        assert_eq!(PiiKind::from_label("DATE"), None);
    }

    #[test]
    fn test_serde_uses_canonical_name() {
        for kind in PiiKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(PiiKind::TaxId.severity(), Severity::High);
        assert_eq!(PiiKind::PostalCode.severity(), Severity::Medium);
        assert_eq!(PiiKind::Misc.severity(), Severity::Low);
        assert!(Severity::High > Severity::Medium);
    }
}
