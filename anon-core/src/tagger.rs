//! # Esquema BIO
//!
//! O reconhecedor marca cada token com `B-X`, `I-X` ou `O`, onde X é uma das
//! quatro categorias do modelo. Sequências `B-X I-X...` viram um [`TokenSpan`].
//!
//! | Rótulo | Categoria      | PII correspondente |
//! |--------|----------------|--------------------|
//! | PER    | Pessoa         | PERSON             |
//! | ORG    | Organização    | ORGANIZATION       |
//! | LOC    | Local          | LOCATION           |
//! | MISC   | Miscelânea     | MISC               |

use serde::{Deserialize, Serialize};

use crate::tokenizer::Token;

/// Categorias do modelo de entidades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityCategory {
    Per,
    Org,
    Loc,
    Misc,
}

impl EntityCategory {
    pub const ALL: [EntityCategory; 4] = [
        EntityCategory::Per,
        EntityCategory::Org,
        EntityCategory::Loc,
        EntityCategory::Misc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityCategory::Per => "PER",
            EntityCategory::Org => "ORG",
            EntityCategory::Loc => "LOC",
            EntityCategory::Misc => "MISC",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "PER" => Some(EntityCategory::Per),
            "ORG" => Some(EntityCategory::Org),
            "LOC" => Some(EntityCategory::Loc),
            "MISC" => Some(EntityCategory::Misc),
            _ => None,
        }
    }
}

/// Tag BIO de um token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    /// Primeiro token de uma entidade.
    Begin(EntityCategory),
    /// Continuação da entidade iniciada antes.
    Inside(EntityCategory),
    Outside,
}

impl Tag {
    pub const COUNT: usize = 9;

    /// Rótulo textual ("B-PER", "I-ORG", "O"). Também é a chave dos pesos CRF.
    pub fn label(&self) -> String {
        match self {
            Tag::Begin(cat) => format!("B-{}", cat.name()),
            Tag::Inside(cat) => format!("I-{}", cat.name()),
            Tag::Outside => "O".to_string(),
        }
    }

    /// Índice nas matrizes de transição.
    pub fn index(&self) -> usize {
        match self {
            Tag::Outside => 0,
            Tag::Begin(EntityCategory::Per) => 1,
            Tag::Inside(EntityCategory::Per) => 2,
            Tag::Begin(EntityCategory::Org) => 3,
            Tag::Inside(EntityCategory::Org) => 4,
            Tag::Begin(EntityCategory::Loc) => 5,
            Tag::Inside(EntityCategory::Loc) => 6,
            Tag::Begin(EntityCategory::Misc) => 7,
            Tag::Inside(EntityCategory::Misc) => 8,
        }
    }

    pub fn all() -> [Tag; 9] {
        [
            Tag::Outside,
            Tag::Begin(EntityCategory::Per),
            Tag::Inside(EntityCategory::Per),
            Tag::Begin(EntityCategory::Org),
            Tag::Inside(EntityCategory::Org),
            Tag::Begin(EntityCategory::Loc),
            Tag::Inside(EntityCategory::Loc),
            Tag::Begin(EntityCategory::Misc),
            Tag::Inside(EntityCategory::Misc),
        ]
    }

    pub fn category(&self) -> Option<EntityCategory> {
        match self {
            Tag::Begin(c) | Tag::Inside(c) => Some(*c),
            Tag::Outside => None,
        }
    }

    /// `I-X` só pode seguir `B-X` ou `I-X`.
    pub fn is_valid_transition(prev: &Tag, next: &Tag) -> bool {
        match next {
            Tag::Inside(cat) => match prev {
                Tag::Begin(prev_cat) | Tag::Inside(prev_cat) => prev_cat == cat,
                Tag::Outside => false,
            },
            _ => true,
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        if s == "O" {
            return Some(Tag::Outside);
        }
        let (prefix, name) = s.split_once('-')?;
        let cat = EntityCategory::from_name(name)?;
        match prefix {
            "B" => Some(Tag::Begin(cat)),
            "I" => Some(Tag::Inside(cat)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Token com a tag atribuída e de onde ela veio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggedToken {
    pub token: Token,
    pub tag: Tag,
    pub confidence: f64,
    /// `None` quando a tag veio do CRF; nome da regra caso contrário.
    pub rule: Option<String>,
}

/// Entidade em nível de token (antes da conversão para PII).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSpan {
    pub category: EntityCategory,
    pub start_token: usize,
    /// Último token, inclusivo.
    pub end_token: usize,
    pub start: usize,
    pub end: usize,
    /// Confiança nativa da regra (quando todos os tokens vieram de regras).
    pub rule_confidence: Option<f64>,
    pub rule: Option<String>,
}

/// Agrupa sequências `B-X I-X...` em spans.
///
/// Um `I-X` órfão (sem `B-X` antes) é ignorado, assim como um `I-Y` após `B-X`
/// encerra a entidade corrente.
pub fn tokens_to_spans(tagged: &[TaggedToken]) -> Vec<TokenSpan> {
    let mut spans = Vec::new();
    let mut i = 0;

    while i < tagged.len() {
        let Tag::Begin(cat) = tagged[i].tag else {
            i += 1;
            continue;
        };

        let mut end = i;
        while end + 1 < tagged.len() && tagged[end + 1].tag == Tag::Inside(cat) {
            end += 1;
        }

        let members = &tagged[i..=end];
        let from_rules = members.iter().all(|t| t.rule.is_some());
        let rule_confidence = from_rules.then(|| {
            members.iter().map(|t| t.confidence).sum::<f64>() / members.len() as f64
        });

        spans.push(TokenSpan {
            category: cat,
            start_token: tagged[i].token.index,
            end_token: tagged[end].token.index,
            start: tagged[i].token.start,
            end: tagged[end].token.end,
            rule_confidence,
            rule: if from_rules { tagged[i].rule.clone() } else { None },
        });

        i = end + 1;
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn tag_all(text: &str, tags: &[Tag], rule: Option<&str>) -> Vec<TaggedToken> {
        tokenize(text)
            .into_iter()
            .zip(tags.iter().cloned())
            .map(|(token, tag)| TaggedToken {
                token,
                tag,
                confidence: 0.9,
                rule: rule.map(str::to_string),
            })
            .collect()
    }

    #[test]
    fn test_tag_labels() {
        assert_eq!(Tag::Outside.label(), "O");
        assert_eq!(Tag::Begin(EntityCategory::Per).label(), "B-PER");
        assert_eq!(Tag::from_label("I-LOC"), Some(Tag::Inside(EntityCategory::Loc)));
        assert_eq!(Tag::from_label("X-LOC"), None);
    }

    #[test]
    fn test_valid_transitions() {
        assert!(Tag::is_valid_transition(
            &Tag::Begin(EntityCategory::Per),
            &Tag::Inside(EntityCategory::Per)
        ));
        assert!(!Tag::is_valid_transition(&Tag::Outside, &Tag::Inside(EntityCategory::Per)));
        assert!(!Tag::is_valid_transition(
            &Tag::Begin(EntityCategory::Org),
            &Tag::Inside(EntityCategory::Per)
        ));
    }

    #[test]
    fn test_all_tags_have_unique_indices() {
        let mut indices: Vec<usize> = Tag::all().iter().map(|t| t.index()).collect();
        indices.sort();
        indices.dedup();
        assert_eq!(indices.len(), Tag::COUNT);
    }

    #[test]
    fn test_tokens_to_spans_multiword() {
        let text = "Maria Clara Souza mora em Campinas";
        let tags = [
            Tag::Begin(EntityCategory::Per),
            Tag::Inside(EntityCategory::Per),
            Tag::Inside(EntityCategory::Per),
            Tag::Outside,
            Tag::Outside,
            Tag::Begin(EntityCategory::Loc),
        ];
        let spans = tokens_to_spans(&tag_all(text, &tags, None));
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].start..spans[0].end], "Maria Clara Souza");
        assert_eq!(spans[0].end_token, 2);
        assert_eq!(&text[spans[1].start..spans[1].end], "Campinas");
        assert!(spans[0].rule_confidence.is_none());
    }

    #[test]
    fn test_rule_spans_keep_confidence() {
        let text = "Banco Alfa";
        let tags = [Tag::Begin(EntityCategory::Org), Tag::Inside(EntityCategory::Org)];
        let spans = tokens_to_spans(&tag_all(text, &tags, Some("org_gazetteer")));
        assert_eq!(spans[0].rule_confidence, Some(0.9));
        assert_eq!(spans[0].rule.as_deref(), Some("org_gazetteer"));
    }

    #[test]
    fn test_orphan_inside_ignored() {
        let tags = [Tag::Inside(EntityCategory::Per), Tag::Outside];
        assert!(tokens_to_spans(&tag_all("Silva disse", &tags, None)).is_empty());
    }
}
