//! # Reescrita de texto
//!
//! Substituição de várias chaves num texto, da mais longa para a mais curta,
//! de modo que "Ana" nunca corrompa uma ocorrência de "Ana Silva". Usada nos
//! dois sentidos: anonimização (original → substituto) e reversão.
//!
//! O texto é mantido como uma lista de segmentos; o que já foi inserido por uma
//! chave anterior não é mais examinado pelas seguintes.
//!
//! Com [`MatchPolicy::Boundary`] uma ocorrência só vale se as bordas da chave
//! que são caracteres de palavra não estiverem coladas em outro caractere de
//! palavra ("Ana" não casa dentro de "Mariana").

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Ancorada em fronteira de palavra, com recuo para `Raw` se sobrar texto colado.
    Boundary,
    /// Substring simples.
    Raw,
}

impl MatchPolicy {
    pub fn from_preserve_structure(preserve: bool) -> Self {
        if preserve {
            Self::Boundary
        } else {
            Self::Raw
        }
    }
}

pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone)]
struct Segment {
    text: String,
    /// Rodada (índice da chave) que inseriu o segmento; `None` para texto original.
    round: Option<usize>,
}

/// Ocorrências (offsets em bytes) de `key` em `text`, sem sobreposição,
/// da esquerda para a direita.
pub fn find_occurrences(text: &str, key: &str, policy: MatchPolicy) -> Vec<usize> {
    find_in_context(text, key, policy, None, None)
}

fn find_in_context(
    text: &str,
    key: &str,
    policy: MatchPolicy,
    before: Option<char>,
    after: Option<char>,
) -> Vec<usize> {
    if key.is_empty() {
        return vec![];
    }
    let guard_start = key.chars().next().is_some_and(is_word_char);
    let guard_end = key.chars().next_back().is_some_and(is_word_char);

    let mut found = Vec::new();
    let mut from = 0;
    while let Some(pos) = text[from..].find(key) {
        let start = from + pos;
        let end = start + key.len();
        let ok = match policy {
            MatchPolicy::Raw => true,
            MatchPolicy::Boundary => {
                let prev = text[..start].chars().next_back().or(before);
                let next = text[end..].chars().next().or(after);
                !(guard_start && prev.is_some_and(is_word_char))
                    && !(guard_end && next.is_some_and(is_word_char))
            }
        };
        if ok {
            found.push(start);
            from = end;
        } else {
            // avança um caractere para não perder ocorrências sobrepostas
            let step = text[start..].chars().next().map_or(1, char::len_utf8);
            from = start + step;
        }
    }
    found
}

fn last_char(segments: &[Segment], idx: usize) -> Option<char> {
    segments[..idx]
        .iter()
        .rev()
        .find_map(|s| s.text.chars().next_back())
}

fn first_char(segments: &[Segment], idx: usize) -> Option<char> {
    segments[idx + 1..]
        .iter()
        .find_map(|s| s.text.chars().next())
}

fn apply_key(
    segments: &[Segment],
    round: usize,
    key: &str,
    replacement: &str,
    policy: MatchPolicy,
) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());
    for (idx, segment) in segments.iter().enumerate() {
        if segment.round.is_some() {
            out.push(segment.clone());
            continue;
        }
        let before = last_char(segments, idx);
        let after = first_char(segments, idx);
        let positions = find_in_context(&segment.text, key, policy, before, after);
        if positions.is_empty() {
            out.push(segment.clone());
            continue;
        }

        let mut cursor = 0;
        for start in positions {
            if start > cursor {
                out.push(Segment {
                    text: segment.text[cursor..start].to_string(),
                    round: None,
                });
            }
            out.push(Segment {
                text: replacement.to_string(),
                round: Some(round),
            });
            cursor = start + key.len();
        }
        if cursor < segment.text.len() {
            out.push(Segment {
                text: segment.text[cursor..].to_string(),
                round: None,
            });
        }
    }
    out
}

/// Algum segmento inserido nesta rodada está colado num caractere de palavra?
fn has_glued_insertion(segments: &[Segment], round: usize) -> bool {
    segments.iter().enumerate().any(|(idx, segment)| {
        segment.round == Some(round)
            && (last_char(segments, idx).is_some_and(is_word_char)
                || first_char(segments, idx).is_some_and(is_word_char))
    })
}

/// Aplica os pares `(chave, substituto)` da chave mais longa para a mais curta.
/// Chaves de mesmo comprimento mantêm a ordem recebida; chaves vazias são ignoradas.
pub fn rewrite(text: &str, pairs: &[(&str, &str)], policy: MatchPolicy) -> String {
    let mut ordered: Vec<&(&str, &str)> = pairs.iter().filter(|(key, _)| !key.is_empty()).collect();
    ordered.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));

    let mut segments = vec![Segment {
        text: text.to_string(),
        round: None,
    }];

    for (round, (key, replacement)) in ordered.into_iter().enumerate() {
        let mut next = apply_key(&segments, round, key, replacement, policy);
        if policy == MatchPolicy::Boundary && has_glued_insertion(&next, round) {
            warn!(
                key_len = key.len(),
                "substituição ancorada deixou texto colado; refazendo como substring simples"
            );
            next = apply_key(&segments, round, key, replacement, MatchPolicy::Raw);
        }
        segments = next;
    }

    segments.into_iter().map(|s| s.text).collect()
}
