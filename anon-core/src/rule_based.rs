//! # Motor de Regras
//!
//! Complementa o CRF com conhecimento explícito: gazetteers de nomes, cidades e
//! organizações, e padrões de contexto típicos de peças jurídicas:
//!
//! - tratamento seguido de nome ("Dra. Helena Prado" → PER)
//! - razão social com sufixo ("Construtora Alfa Ltda" → ORG)
//! - núcleo institucional ("Banco Meridiano" → ORG)
//! - logradouro ("Rua das Acácias" → LOC)
//!
//! Onde uma regra casa, ela prevalece sobre o CRF.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::features::is_legal_term;
use crate::tagger::{EntityCategory, Tag};
use crate::tokenizer::Token;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMatch {
    pub token_index: usize,
    pub tag: Tag,
    pub rule_name: String,
    pub confidence: f64,
}

/// Conectivos que podem aparecer dentro de nomes próprios ("Maria da Silva").
const NAME_CONNECTORS: &[&str] = &["da", "de", "do", "das", "dos", "e"];

pub struct RuleEngine {
    person_names: HashSet<String>,
    location_names: Vec<Vec<String>>,
    org_names: Vec<Vec<String>>,
    misc_names: Vec<Vec<String>>,
    person_titles: HashSet<String>,
    org_suffixes: HashSet<String>,
    org_heads: HashSet<String>,
    place_heads: HashSet<String>,
}

fn lower_set(words: &[&str]) -> HashSet<String> {
    words.iter().map(|s| s.to_lowercase()).collect()
}

fn phrase(name: &str) -> Vec<String> {
    name.split_whitespace().map(str::to_lowercase).collect()
}

fn starts_upper(word: &str) -> bool {
    word.chars().next().map(char::is_uppercase).unwrap_or(false)
}

impl RuleEngine {
    pub fn new() -> Self {
        Self {
            person_names: HashSet::new(),
            location_names: vec![],
            org_names: vec![],
            misc_names: vec![],
            person_titles: lower_set(&[
                "sr.", "sra.", "srta.", "dr.", "dra.", "prof.", "profa.", "exmo.", "exma.",
                "ilmo.", "ilma.", "des.", "min.", "senhor", "senhora", "doutor", "doutora",
                "desembargador", "desembargadora", "perito", "perita",
            ]),
            org_suffixes: lower_set(&["ltda", "eireli", "epp", "sa", "s/a", "inc", "cia"]),
            org_heads: lower_set(&[
                "banco", "construtora", "incorporadora", "associação", "fundação", "instituto",
                "companhia", "cooperativa", "sindicato", "escritório", "hospital", "clínica",
                "colégio", "faculdade", "universidade", "transportadora", "imobiliária",
            ]),
            place_heads: lower_set(&[
                "rua", "avenida", "av.", "travessa", "alameda", "praça", "rodovia", "rod.",
                "estrada", "largo", "bairro", "condomínio", "loteamento",
            ]),
        }
    }

    pub fn add_person(&mut self, name: &str) {
        for word in name.split_whitespace() {
            self.person_names.insert(word.to_lowercase());
        }
    }

    pub fn add_location(&mut self, name: &str) {
        let parts = phrase(name);
        if !parts.is_empty() {
            self.location_names.push(parts);
        }
    }

    pub fn add_org(&mut self, name: &str) {
        let parts = phrase(name);
        if !parts.is_empty() {
            self.org_names.push(parts);
        }
    }

    pub fn add_misc(&mut self, name: &str) {
        let parts = phrase(name);
        if !parts.is_empty() {
            self.misc_names.push(parts);
        }
    }

    /// Aplica todas as regras; posição `i` do retorno corresponde ao token `i`.
    pub fn apply(&self, tokens: &[Token]) -> Vec<Option<RuleMatch>> {
        let mut result: Vec<Option<RuleMatch>> = vec![None; tokens.len()];
        let lower: Vec<String> = tokens.iter().map(|t| t.text.to_lowercase()).collect();

        // 1. Frases conhecidas (mais longas primeiro dentro de cada lista)
        self.match_phrases(&lower, &self.org_names, EntityCategory::Org, "org_gazetteer", 0.93, &mut result);
        self.match_phrases(&lower, &self.location_names, EntityCategory::Loc, "location_gazetteer", 0.90, &mut result);
        self.match_phrases(&lower, &self.misc_names, EntityCategory::Misc, "misc_gazetteer", 0.88, &mut result);

        // 2. Nomes de pessoa: tokens capitalizados do gazetteer, unidos por conectivos
        let mut i = 0;
        while i < tokens.len() {
            if result[i].is_some()
                || !starts_upper(&tokens[i].text)
                || !self.person_names.contains(&lower[i])
            {
                i += 1;
                continue;
            }
            let end = self.extend_name(tokens, &lower, i, &result, |w| self.person_names.contains(w));
            mark(&mut result, i, end, EntityCategory::Per, "person_gazetteer", 0.92);
            i = end + 1;
        }

        // 3. Tratamento + nome capitalizado
        for i in 0..tokens.len().saturating_sub(1) {
            if !self.person_titles.contains(&lower[i]) || result[i + 1].is_some() {
                continue;
            }
            if starts_upper(&tokens[i + 1].text) && self.is_free_word(&lower[i + 1]) {
                let end = self.extend_name(tokens, &lower, i + 1, &result, |w| self.is_free_word(w));
                mark(&mut result, i + 1, end, EntityCategory::Per, "title_pattern", 0.80);
            }
        }

        // 4. Razão social: "Alfa Comércio Ltda" (capitalizadas antes do sufixo)
        for i in 1..tokens.len() {
            if !self.org_suffixes.contains(&lower[i]) || result[i].is_some() {
                continue;
            }
            let mut start = i;
            while start > 0
                && result[start - 1].is_none()
                && starts_upper(&tokens[start - 1].text)
                && tokens[start - 1].text.chars().any(char::is_alphabetic)
            {
                start -= 1;
            }
            if start < i {
                mark(&mut result, start, i, EntityCategory::Org, "org_suffix_pattern", 0.85);
            }
        }

        // 5. Núcleo institucional + nome: "Banco Meridiano"
        for i in 0..tokens.len().saturating_sub(1) {
            if !self.org_heads.contains(&lower[i])
                || !starts_upper(&tokens[i].text)
                || result[i].is_some()
                || result[i + 1].is_some()
                || !starts_upper(&tokens[i + 1].text)
                || !self.is_free_word(&lower[i + 1])
            {
                continue;
            }
            let end = self.extend_name(tokens, &lower, i + 1, &result, |w| self.is_free_word(w));
            mark(&mut result, i, end, EntityCategory::Org, "org_head_pattern", 0.82);
        }

        // 6. Logradouro: "Rua das Acácias"
        for i in 0..tokens.len().saturating_sub(1) {
            if !self.place_heads.contains(&lower[i]) || result[i].is_some() {
                continue;
            }
            let mut first = i + 1;
            while first < tokens.len() && NAME_CONNECTORS.contains(&lower[first].as_str()) {
                first += 1;
            }
            if first >= tokens.len()
                || result[first].is_some()
                || !starts_upper(&tokens[first].text)
                || !self.is_free_word(&lower[first])
            {
                continue;
            }
            let end = self.extend_name(tokens, &lower, first, &result, |w| self.is_free_word(w));
            mark(&mut result, i, end, EntityCategory::Loc, "address_pattern", 0.80);
        }

        result
    }

    /// Palavra que pode compor um nome sem gazetteer: nem tratamento, nem termo forense.
    fn is_free_word(&self, word: &str) -> bool {
        !self.person_titles.contains(word) && !is_legal_term(word)
    }

    /// Estende um nome a partir de `start` sobre tokens capitalizados aceitos por
    /// `accept`, atravessando conectivos apenas quando seguidos de outro nome.
    fn extend_name(
        &self,
        tokens: &[Token],
        lower: &[String],
        start: usize,
        result: &[Option<RuleMatch>],
        accept: impl Fn(&str) -> bool,
    ) -> usize {
        let mut end = start;
        let mut j = start + 1;
        while j < tokens.len() && result[j].is_none() {
            if NAME_CONNECTORS.contains(&lower[j].as_str()) {
                let next = j + 1;
                let continues = next < tokens.len()
                    && result[next].is_none()
                    && starts_upper(&tokens[next].text)
                    && accept(&lower[next]);
                if !continues {
                    break;
                }
                end = next;
                j = next + 1;
            } else if starts_upper(&tokens[j].text)
                && tokens[j].text.chars().any(char::is_alphabetic)
                && accept(&lower[j])
            {
                end = j;
                j += 1;
            } else {
                break;
            }
        }
        end
    }

    fn match_phrases(
        &self,
        lower: &[String],
        phrases: &[Vec<String>],
        category: EntityCategory,
        rule_name: &str,
        confidence: f64,
        result: &mut [Option<RuleMatch>],
    ) {
        let mut i = 0;
        while i < lower.len() {
            let best = phrases
                .iter()
                .filter(|p| {
                    i + p.len() <= lower.len()
                        && (i..i + p.len()).all(|k| result[k].is_none())
                        && p.iter().enumerate().all(|(k, part)| lower[i + k] == *part)
                })
                .map(Vec::len)
                .max();
            match best {
                Some(len) => {
                    mark(result, i, i + len - 1, category, rule_name, confidence);
                    i += len;
                }
                None => i += 1,
            }
        }
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Marca `start..=end` como `B-cat I-cat...`.
fn mark(
    result: &mut [Option<RuleMatch>],
    start: usize,
    end: usize,
    category: EntityCategory,
    rule_name: &str,
    confidence: f64,
) {
    for (k, slot) in result.iter_mut().enumerate().take(end + 1).skip(start) {
        *slot = Some(RuleMatch {
            token_index: k,
            tag: if k == start {
                Tag::Begin(category)
            } else {
                Tag::Inside(category)
            },
            rule_name: rule_name.to_string(),
            confidence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn tags_of(matches: &[Option<RuleMatch>]) -> Vec<String> {
        matches
            .iter()
            .map(|m| m.as_ref().map(|m| m.tag.label()).unwrap_or_else(|| "-".into()))
            .collect()
    }

    #[test]
    fn test_person_gazetteer_with_connector() {
        let mut engine = RuleEngine::new();
        engine.add_person("Maria");
        engine.add_person("Silva");

        let tokens = tokenize("Maria da Silva compareceu");
        let matches = engine.apply(&tokens);
        assert_eq!(tags_of(&matches), vec!["B-PER", "I-PER", "I-PER", "-"]);
    }

    #[test]
    fn test_lowercase_name_not_matched() {
        let mut engine = RuleEngine::new();
        engine.add_person("Rosa");
        let matches = engine.apply(&tokenize("uma rosa vermelha"));
        assert!(matches.iter().all(Option::is_none));
    }

    #[test]
    fn test_title_pattern() {
        let engine = RuleEngine::new();
        let tokens = tokenize("a Dra. Helena Prado atuou");
        let matches = engine.apply(&tokens);
        assert_eq!(tags_of(&matches), vec!["-", "-", "B-PER", "I-PER", "-"]);
        assert_eq!(matches[2].as_ref().unwrap().rule_name, "title_pattern");
    }

    #[test]
    fn test_title_does_not_swallow_forensic_terms() {
        let engine = RuleEngine::new();
        let matches = engine.apply(&tokenize("SENHOR DOUTOR JUIZ DE DIREITO"));
        assert!(matches.iter().all(Option::is_none));
    }

    #[test]
    fn test_org_suffix_pattern() {
        let engine = RuleEngine::new();
        let tokens = tokenize("a Construtora Horizonte Ltda foi citada");
        let matches = engine.apply(&tokens);
        // "Construtora" também é núcleo, mas a razão social completa vem antes
        assert_eq!(tags_of(&matches), vec!["-", "B-ORG", "I-ORG", "I-ORG", "-", "-"]);
        assert_eq!(matches[1].as_ref().unwrap().rule_name, "org_suffix_pattern");
    }

    #[test]
    fn test_org_head_pattern() {
        let engine = RuleEngine::new();
        let matches = engine.apply(&tokenize("conta no Banco Meridiano desde"));
        assert_eq!(tags_of(&matches), vec!["-", "-", "B-ORG", "I-ORG", "-"]);
    }

    #[test]
    fn test_address_pattern() {
        let engine = RuleEngine::new();
        let matches = engine.apply(&tokenize("reside na Rua das Acácias, 120"));
        assert_eq!(tags_of(&matches), vec!["-", "-", "B-LOC", "I-LOC", "I-LOC", "-", "-"]);
    }

    #[test]
    fn test_longest_phrase_wins() {
        let mut engine = RuleEngine::new();
        engine.add_location("Campo");
        engine.add_location("Campo Grande");
        let matches = engine.apply(&tokenize("mora em Campo Grande"));
        assert_eq!(tags_of(&matches), vec!["-", "-", "B-LOC", "I-LOC"]);
    }
}
