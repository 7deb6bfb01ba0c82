//! # Features para o CRF
//!
//! Cada token vira um vetor esparso de features binárias: forma da palavra,
//! capitalização, afixos, vizinhança e pertença aos gazetteers. Em peças
//! jurídicas o contexto pesa muito ("a testemunha **Fulana**", "residente em
//! **Campinas**"), por isso as palavras vizinhas entram como features próprias.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// Features ativas de um token (mapa esparso nome → valor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: HashMap<String, f64>,
    pub token_index: usize,
}

impl FeatureVector {
    pub fn new(token_index: usize) -> Self {
        Self {
            features: HashMap::new(),
            token_index,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.features.insert(key.into(), value);
    }

    pub fn has(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }
}

/// Listas de palavras conhecidas (minúsculas), por categoria.
#[derive(Debug, Clone, Default)]
pub struct Gazetteers {
    pub persons: HashSet<String>,
    pub locations: HashSet<String>,
    pub organizations: HashSet<String>,
    pub misc: HashSet<String>,
}

impl Gazetteers {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Palavras que costumam anteceder o nome de uma parte no processo.
const PARTY_CUES: &[&str] = &[
    "autor", "autora", "réu", "ré", "testemunha", "vítima", "requerente", "requerido",
    "requerida", "reclamante", "reclamado", "reclamada", "advogado", "advogada",
    "sr", "sr.", "sra", "sra.", "dr", "dr.", "dra", "dra.", "senhor", "senhora",
];

/// Palavras que costumam anteceder um endereço ou cidade.
const PLACE_CUES: &[&str] = &[
    "residente", "domiciliado", "domiciliada", "rua", "avenida", "av.", "bairro",
    "cidade", "município", "comarca",
];

/// Vocabulário forense que aparece capitalizado sem ser nome próprio.
const LEGAL_VOCAB: &[&str] = &[
    "vara", "cível", "criminal", "juízo", "juiz", "juíza", "tribunal", "comarca", "foro",
    "fórum", "justiça", "ministério", "público", "processo", "autos", "excelência",
    "meritíssimo", "termo", "audiência", "sentença", "despacho", "certidão", "código",
    "lei", "artigo", "estado", "federal", "estadual", "municipal", "defensoria", "cartório",
    "delegacia", "polícia", "civil", "penal", "trabalho", "recurso", "apelação", "secretaria",
    "poder", "judiciário", "procuradoria", "promotoria", "nome", "endereço", "telefone",
    "direito", "excelentíssimo", "excelentíssima", "egrégio", "colendo",
];

/// `word` já em minúsculas.
pub fn is_legal_term(word: &str) -> bool {
    LEGAL_VOCAB.contains(&word)
}

pub fn extract_features(tokens: &[Token], gazetteers: &Gazetteers) -> Vec<FeatureVector> {
    (0..tokens.len())
        .map(|i| extract_for_token(tokens, i, gazetteers))
        .collect()
}

fn starts_upper(word: &str) -> bool {
    word.chars().next().map(char::is_uppercase).unwrap_or(false)
}

pub fn extract_for_token(tokens: &[Token], i: usize, gazetteers: &Gazetteers) -> FeatureVector {
    let mut fv = FeatureVector::new(i);
    let word = &tokens[i].text;
    let lower = word.to_lowercase();

    fv.insert(format!("word={lower}"), 1.0);
    fv.insert("bias", 1.0);

    // Capitalização
    if starts_upper(word) {
        fv.insert("is_capitalized", 1.0);
    }
    let all_upper = word.chars().all(|c| c.is_uppercase() || !c.is_alphabetic());
    if all_upper && word.chars().any(char::is_alphabetic) && word.chars().count() > 1 {
        fv.insert("is_all_caps", 1.0);
    }
    if word.chars().next().map(char::is_lowercase).unwrap_or(false) {
        fv.insert("is_lower_initial", 1.0);
    }
    if word.chars().skip(1).any(char::is_uppercase) {
        fv.insert("is_mixed_case", 1.0);
    }

    // Afixos
    let chars: Vec<char> = lower.chars().collect();
    for n in 2..=4 {
        if chars.len() >= n {
            let prefix: String = chars[..n].iter().collect();
            let suffix: String = chars[chars.len() - n..].iter().collect();
            fv.insert(format!("prefix{n}={prefix}"), 1.0);
            fv.insert(format!("suffix{n}={suffix}"), 1.0);
        }
    }

    if is_legal_term(&lower) {
        fv.insert("is_legal_term", 1.0);
    }

    // Forma
    if word.chars().all(char::is_numeric) {
        fv.insert("is_digit", 1.0);
    } else if word.chars().any(char::is_numeric) {
        fv.insert("has_digit", 1.0);
    }
    if word.contains('-') {
        fv.insert("has_hyphen", 1.0);
    }
    if word.ends_with('.') {
        fv.insert("is_abbreviation", 1.0);
    }
    if word.chars().count() == 1 && !word.chars().all(char::is_alphanumeric) {
        fv.insert("is_punctuation", 1.0);
    }
    if chars.len() <= 3 && !starts_upper(word) {
        fv.insert("is_short_lower", 1.0);
    }

    if i == 0 {
        fv.insert("BOS", 1.0);
    }
    if i + 1 == tokens.len() {
        fv.insert("EOS", 1.0);
    }

    // Contexto
    if i > 0 {
        let prev = tokens[i - 1].text.to_lowercase();
        if starts_upper(&tokens[i - 1].text) {
            fv.insert("prev_is_capitalized", 1.0);
        }
        if PARTY_CUES.contains(&prev.as_str()) {
            fv.insert("prev_is_party_cue", 1.0);
        }
        if PLACE_CUES.contains(&prev.as_str()) {
            fv.insert("prev_is_place_cue", 1.0);
        }
        if prev == ":" {
            fv.insert("after_colon", 1.0);
        }
        fv.insert(format!("prev_word={prev}"), 1.0);
    }
    if i > 1 {
        let prev2 = tokens[i - 2].text.to_lowercase();
        if PLACE_CUES.contains(&prev2.as_str()) {
            fv.insert("prev2_is_place_cue", 1.0);
        }
        fv.insert(format!("prev2_word={prev2}"), 1.0);
    }
    if let Some(next) = tokens.get(i + 1) {
        if starts_upper(&next.text) {
            fv.insert("next_is_capitalized", 1.0);
        }
        fv.insert(format!("next_word={}", next.text.to_lowercase()), 1.0);
    }

    // Gazetteers
    if gazetteers.persons.contains(&lower) {
        fv.insert("in_person_gazetteer", 1.0);
    }
    if gazetteers.locations.contains(&lower) {
        fv.insert("in_location_gazetteer", 1.0);
    }
    if gazetteers.organizations.contains(&lower) {
        fv.insert("in_org_gazetteer", 1.0);
    }
    if gazetteers.misc.contains(&lower) {
        fv.insert("in_misc_gazetteer", 1.0);
    }

    fv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn test_capitalization_feature() {
        let tokens = tokenize("Helena é testemunha");
        let features = extract_features(&tokens, &Gazetteers::default());
        assert!(features[0].has("is_capitalized"));
        assert!(!features[1].has("is_capitalized"));
    }

    #[test]
    fn test_affixes_are_lowercase() {
        let tokens = tokenize("Fagundes");
        let features = extract_features(&tokens, &Gazetteers::default());
        assert!(features[0].has("prefix2=fa"));
        assert!(features[0].has("suffix3=des"));
    }

    #[test]
    fn test_party_and_place_cues() {
        let tokens = tokenize("a testemunha Rosana, residente em Sorocaba");
        let features = extract_features(&tokens, &Gazetteers::default());
        assert!(features[2].has("prev_is_party_cue"));
        // "Sorocaba" está duas posições após "residente"
        assert!(features[6].has("prev2_is_place_cue"));
    }

    #[test]
    fn test_gazetteer_feature() {
        let tokens = tokenize("Jundiaí fica perto");
        let mut gaz = Gazetteers::default();
        gaz.locations.insert("jundiaí".to_string());
        let features = extract_features(&tokens, &gaz);
        assert!(features[0].has("in_location_gazetteer"));
    }

    #[test]
    fn test_legal_vocabulary() {
        let tokens = tokenize("Perante o Juízo da Vara");
        let features = extract_features(&tokens, &Gazetteers::default());
        assert_eq!(features.len(), 5);
        assert!(!features[0].has("is_legal_term"));
        assert!(features[1].has("is_lower_initial"));
        assert!(features[2].has("is_legal_term"));
        assert!(features[3].has("is_lower_initial"));
        assert!(features[4].has("is_legal_term"));
    }

    #[test]
    fn test_digit_shapes() {
        let tokens = tokenize("2023 Covid-19");
        let features = extract_features(&tokens, &Gazetteers::default());
        assert!(features[0].has("is_digit"));
        assert!(features[1].has("has_digit"));
    }
}
