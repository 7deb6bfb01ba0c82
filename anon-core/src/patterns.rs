//! # Biblioteca de Padrões
//!
//! Expressões regulares fixas para identificadores brasileiros e contatos.
//! Todas são compiladas na construção: um padrão inválido é erro de
//! configuração, nunca erro por chamada.
//!
//! CPF e CNPJ passam ainda pelo dígito verificador oficial, o que descarta
//! sequências arbitrárias de dígitos (números de processo, protocolos).

use regex::Regex;

use crate::error::AnonResult;
use crate::kind::PiiKind;
use crate::span::EntitySpan;

const CPF: &str = r"\b\d{3}\.?\d{3}\.?\d{3}-?\d{2}\b";
const PHONE: &str = r"(?:\+55\s?)?(?:\(\d{2}\)\s?|\b\d{2}\s?|\b)(?:9\s?)?\d{4,5}-?\d{4}\b";
const EMAIL: &str = r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b";
const CEP: &str = r"\b\d{5}-?\d{3}\b";
const RG: &str = r"\b\d{1,2}\.?\d{3}\.?\d{3}-?[0-9Xx]\b";
const CNPJ: &str = r"\b\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}\b";

/// Um padrão nomeado da biblioteca.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub name: &'static str,
    pub kind: PiiKind,
    regex: Regex,
}

impl Pattern {
    fn new(name: &'static str, kind: PiiKind, source: &str) -> AnonResult<Self> {
        Ok(Self {
            name,
            kind,
            regex: Regex::new(source)?,
        })
    }

    /// Confiança fixa por padrão: identificadores com checksum e e-mail são mais seguros.
    pub fn confidence(&self) -> f64 {
        match self.kind {
            PiiKind::TaxId | PiiKind::CompanyId | PiiKind::Email => 0.95,
            _ => 0.9,
        }
    }

    fn is_valid(&self, candidate: &str) -> bool {
        match self.kind {
            PiiKind::TaxId => is_valid_cpf(candidate),
            PiiKind::CompanyId => is_valid_cnpj(candidate),
            _ => true,
        }
    }

    /// Todas as ocorrências válidas deste padrão no texto.
    pub fn find(&self, text: &str) -> Vec<EntitySpan> {
        self.regex
            .find_iter(text)
            .filter(|m| self.is_valid(m.as_str()))
            .map(|m| {
                EntitySpan::new(
                    m.as_str(),
                    self.kind,
                    m.start(),
                    m.end(),
                    self.confidence(),
                    format!("pattern:{}", self.name),
                )
            })
            .collect()
    }
}

/// Conjunto ordenado de padrões. A ordem desempata candidatos idênticos na detecção.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
    tax_id_exact: Regex,
}

impl PatternLibrary {
    pub fn new() -> AnonResult<Self> {
        Ok(Self {
            patterns: vec![
                Pattern::new("cpf", PiiKind::TaxId, CPF)?,
                Pattern::new("phone", PiiKind::Phone, PHONE)?,
                Pattern::new("email", PiiKind::Email, EMAIL)?,
                Pattern::new("cep", PiiKind::PostalCode, CEP)?,
                Pattern::new("rg", PiiKind::NationalId, RG)?,
                Pattern::new("cnpj", PiiKind::CompanyId, CNPJ)?,
            ],
            tax_id_exact: Regex::new(&format!("^(?:{CPF})$"))?,
        })
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Aplica todos os padrões, na ordem da biblioteca.
    pub fn find_all(&self, text: &str) -> Vec<EntitySpan> {
        self.patterns.iter().flat_map(|p| p.find(text)).collect()
    }

    /// Ocorrências de uma única categoria.
    pub fn find_kind(&self, kind: PiiKind, text: &str) -> Vec<EntitySpan> {
        self.patterns
            .iter()
            .filter(|p| p.kind == kind)
            .flat_map(|p| p.find(text))
            .collect()
    }

    /// O valor inteiro tem formato de CPF (sem verificar o checksum).
    pub fn is_tax_id_exact(&self, value: &str) -> bool {
        self.tax_id_exact.is_match(value)
    }
}

fn digits_of(s: &str) -> Vec<u32> {
    s.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Dígito verificador do CPF (módulo 11, pesos decrescentes a partir de `len + 1`).
fn cpf_check_digit(digits: &[u32]) -> u32 {
    let weight_start = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (weight_start - i as u32))
        .sum();
    let rest = (sum * 10) % 11;
    if rest == 10 {
        0
    } else {
        rest
    }
}

/// Valida o CPF pelo algoritmo oficial. Sequências repetidas (000.000.000-00) são rejeitadas.
pub fn is_valid_cpf(candidate: &str) -> bool {
    let digits = digits_of(candidate);
    if digits.len() != 11 || all_same(&digits) {
        return false;
    }
    cpf_check_digit(&digits[..9]) == digits[9] && cpf_check_digit(&digits[..10]) == digits[10]
}

const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

fn cnpj_check_digit(digits: &[u32]) -> u32 {
    let weights = &CNPJ_WEIGHTS[CNPJ_WEIGHTS.len() - digits.len()..];
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let rest = sum % 11;
    if rest < 2 {
        0
    } else {
        11 - rest
    }
}

/// Valida o CNPJ pelo algoritmo oficial.
pub fn is_valid_cnpj(candidate: &str) -> bool {
    let digits = digits_of(candidate);
    if digits.len() != 14 || all_same(&digits) {
        return false;
    }
    cnpj_check_digit(&digits[..12]) == digits[12] && cnpj_check_digit(&digits[..13]) == digits[13]
}
