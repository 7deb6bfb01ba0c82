//! # Tokenizador para Português Brasileiro
//!
//! Divide a página em palavras e pontuação preservando os offsets de byte,
//! para que as entidades reconhecidas apontem exatamente para o texto original.
//!
//! Abreviações de tratamento e de peças processuais ("Dr.", "Exmo.", "fls.")
//! mantêm o ponto, e números com separador ("1.234") ficam num só token.
//!
//! ```rust
//! use anon_core::tokenizer::tokenize;
//!
//! let tokens = tokenize("O Dr. Silva assinou.");
//! assert_eq!(tokens[1].text, "Dr.");
//! ```

use serde::{Deserialize, Serialize};

/// Um token com sua posição no texto original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub text: String,
    /// Byte inicial (inclusivo).
    pub start: usize,
    /// Byte final (exclusivo).
    pub end: usize,
    /// Posição do token na sequência.
    pub index: usize,
}

/// Abreviações comuns em peças jurídicas e tratamentos
const ABBREVIATIONS: &[&str] = &[
    "Dr", "Dra", "Sr", "Sra", "Srta", "Prof", "Profa", "Exmo", "Exma", "Ilmo", "Ilma",
    "Des", "Min", "Dep", "Sen", "Eng", "Adv", "Proc", "Av", "Rod", "Pça",
    "art", "arts", "inc", "fls", "fl", "nº", "pág", "pag", "cap", "tel", "etc", "vol",
];

pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = 0;
    let mut current_text = String::new();
    let chars: Vec<(usize, char)> = text.char_indices().collect();

    for (i, &(byte_pos, ch)) in chars.iter().enumerate() {
        if ch.is_alphanumeric() || (ch == '-' && !current_text.is_empty()) {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
        } else if ch == '.' && !current_text.is_empty() {
            let is_abbrev = ABBREVIATIONS.contains(&current_text.as_str());
            let current_is_num = current_text.chars().all(char::is_numeric);
            let next_is_num = chars
                .get(i + 1)
                .map(|(_, c)| c.is_numeric())
                .unwrap_or(false);

            if is_abbrev || (current_is_num && next_is_num) {
                current_text.push('.');
            } else {
                flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
                push_token(&mut tokens, ".".to_string(), byte_pos, byte_pos + 1);
            }
        } else if ch == '\'' || ch == '\u{2019}' {
            if current_text.is_empty() {
                current_start = byte_pos;
            }
            current_text.push(ch);
        } else if ch.is_whitespace() {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
        } else {
            flush_token(&mut tokens, &mut current_text, current_start, byte_pos);
            push_token(&mut tokens, ch.to_string(), byte_pos, byte_pos + ch.len_utf8());
        }
    }

    flush_token(&mut tokens, &mut current_text, current_start, text.len());

    for (i, token) in tokens.iter_mut().enumerate() {
        token.index = i;
    }
    tokens
}

/// Fecha o token acumulado (se houver)
fn flush_token(tokens: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        // Hífen final não pertence à palavra ("Silva-" em quebra de linha)
        let trimmed = text.trim_end_matches('-');
        let end = end - (text.len() - trimmed.len());
        tokens.push(Token {
            text: trimmed.to_string(),
            start,
            end,
            index: 0,
        });
        text.clear();
    }
}

fn push_token(tokens: &mut Vec<Token>, text: String, start: usize, end: usize) {
    tokens.push(Token {
        text,
        start,
        end,
        index: 0,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("Maria assinou em 2022.");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Maria", "assinou", "em", "2022", "."]);
    }

    #[test]
    fn test_offsets_match_source() {
        let text = "A ré, Conceição Araújo, compareceu.";
        for token in tokenize(text) {
            assert_eq!(&text[token.start..token.end], token.text);
        }
    }

    #[test]
    fn test_abbreviations_keep_dot() {
        let tokens = tokenize("O Exmo. Sr. Juiz e a Dra. Helena");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert!(texts.contains(&"Exmo."));
        assert!(texts.contains(&"Sr."));
        assert!(texts.contains(&"Dra."));
    }

    #[test]
    fn test_numbers_with_separator() {
        let tokens = tokenize("valor de 1.500 reais");
        assert_eq!(tokens[2].text, "1.500");
    }

    #[test]
    fn test_trailing_hyphen_dropped() {
        let text = "Silva- Pereira";
        let tokens = tokenize(text);
        assert_eq!(tokens[0].text, "Silva");
        assert_eq!(&text[tokens[0].start..tokens[0].end], "Silva");
    }

    #[test]
    fn test_indices_are_sequential() {
        let tokens = tokenize("Rua das Flores, 10");
        for (i, t) in tokens.iter().enumerate() {
            assert_eq!(t.index, i);
        }
    }
}
