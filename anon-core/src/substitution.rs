//! # Motor de Substituição
//!
//! Gera um substituto por texto distinto de PII (na ordem do [`EntityIndex`]) e
//! reescreve as páginas da chave mais longa para a mais curta.
//!
//! Dois modos:
//!
//! - **placeholder**: contadores por categoria, `[PERSON_1]`, `[TAX_ID_2]`...
//! - **valor fictício**: dados sintéticos marcados como fictícios
//!   (`[NOME_FICTICIO_Renata]`, `exemplo0042@anonimizado.invalid`) e, para
//!   identificadores estruturados, uma máscara com o mesmo layout do original
//!   (`123.456.789-09` → `XXX.XXX.XXX-XX`).
//!
//! Um candidato colide quando já foi emitido, é igual a algum original ou já
//! aparece no texto. Colisões geram nova tentativa, até `max_fake_retries`.

use std::collections::{HashMap, HashSet};

use fake::faker::address::raw::CityName;
use fake::faker::company::raw::CompanyName;
use fake::faker::name::raw::FirstName;
use fake::locales::PT_BR;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{StructuredStrategy, SubstitutionConfig, SubstitutionMode};
use crate::detector::EntityIndex;
use crate::error::{AnonError, AnonResult};
use crate::kind::PiiKind;
use crate::mapping::Mapping;
use crate::rewrite::{rewrite, MatchPolicy};

/// Fonte de dados sintéticos do modo de valor fictício.
pub trait FakeDataSource: Send {
    fn first_name(&mut self) -> String;
    fn company_name(&mut self) -> String;
    fn city_name(&mut self) -> String;
    /// Um dígito de 0 a 9.
    fn digit(&mut self) -> char;
    /// Número de 0 a 9999 para e-mails sintéticos.
    fn serial(&mut self) -> u32;
    /// Volta ao estado inicial (nova sessão).
    fn reset(&mut self) {}
}

/// Dados pt-BR do crate `fake` com RNG semeado: a mesma semente gera a mesma sequência.
pub struct FakerSource {
    seed: u64,
    rng: StdRng,
}

impl FakerSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FakeDataSource for FakerSource {
    fn first_name(&mut self) -> String {
        FirstName(PT_BR).fake_with_rng(&mut self.rng)
    }

    fn company_name(&mut self) -> String {
        CompanyName(PT_BR).fake_with_rng(&mut self.rng)
    }

    fn city_name(&mut self) -> String {
        CityName(PT_BR).fake_with_rng(&mut self.rng)
    }

    fn digit(&mut self) -> char {
        char::from(b'0' + self.rng.gen_range(0..10u8))
    }

    fn serial(&mut self) -> u32 {
        self.rng.gen_range(0..10_000)
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

/// Primeira palavra, só com caracteres alfanuméricos ("São Paulo" → "São").
fn tag_word(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.chars().filter(|c| c.is_alphanumeric()).collect::<String>())
        .find(|w| !w.is_empty())
        .unwrap_or_else(|| "X".to_string())
}

/// Letras usadas para numerar tentativas na máscara (sem `X`).
const MASK_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWYZ";

/// Troca cada dígito por letra, preservando a pontuação. Na tentativa 0 todas as
/// letras são `X`; nas seguintes, o número da tentativa fica nas últimas posições.
pub fn mask_layout(original: &str, attempt: usize) -> String {
    let mut code: Vec<u8> = Vec::new();
    let mut n = attempt;
    while n > 0 {
        code.push(MASK_ALPHABET[n % MASK_ALPHABET.len()]);
        n /= MASK_ALPHABET.len();
    }

    let digit_count = original.chars().filter(char::is_ascii_digit).count();
    let mut position = 0;
    original
        .chars()
        .map(|c| {
            if !c.is_ascii_digit() {
                return c;
            }
            // posição contada a partir do último dígito
            let from_right = digit_count - 1 - position;
            position += 1;
            code.get(from_right).map_or('X', |&b| char::from(b))
        })
        .collect()
}

pub struct SubstitutionEngine {
    config: SubstitutionConfig,
    counters: HashMap<PiiKind, usize>,
    source: Box<dyn FakeDataSource>,
}

impl SubstitutionEngine {
    pub fn new(config: &SubstitutionConfig) -> Self {
        Self::with_source(config, Box::new(FakerSource::seeded(config.seed)))
    }

    pub fn with_source(config: &SubstitutionConfig, source: Box<dyn FakeDataSource>) -> Self {
        Self {
            config: config.clone(),
            counters: HashMap::new(),
            source,
        }
    }

    /// Zera os contadores e a fonte de dados. Chamado no início de cada `substitute`.
    pub fn reset_session(&mut self) {
        self.counters.clear();
        self.source.reset();
    }

    /// Anonimiza as páginas. Entidades que não aparecem em nenhuma página não
    /// entram no mapeamento; texto já anonimizado volta inalterado.
    pub fn substitute<S: AsRef<str>>(
        &mut self,
        pages: &[S],
        entities: &EntityIndex,
    ) -> AnonResult<(Vec<String>, Mapping)> {
        self.reset_session();

        let pages: Vec<&str> = pages.iter().map(|p| p.as_ref()).collect();
        let originals: HashSet<&str> = entities.iter().map(|(text, _)| text).collect();
        let mut issued: HashSet<String> = HashSet::new();
        let mut mapping = Mapping::new();

        for (original, kind) in entities.iter() {
            if original.is_empty() || !pages.iter().any(|p| p.contains(original)) {
                continue;
            }
            let replacement = self.fresh_value(original, kind, &pages, &originals, &issued)?;
            debug!(kind = %kind, "substituto gerado");
            issued.insert(replacement.clone());
            mapping.insert(original, replacement);
        }

        let policy = MatchPolicy::from_preserve_structure(self.config.preserve_structure);
        let pairs: Vec<(&str, &str)> = mapping.iter().collect();
        let rewritten: Vec<String> = pages.iter().map(|p| rewrite(p, &pairs, policy)).collect();

        info!(
            entities = mapping.len(),
            pages = rewritten.len(),
            mode = ?self.config.mode,
            "sessão de anonimização concluída"
        );
        Ok((rewritten, mapping))
    }

    fn fresh_value(
        &mut self,
        original: &str,
        kind: PiiKind,
        pages: &[&str],
        originals: &HashSet<&str>,
        issued: &HashSet<String>,
    ) -> AnonResult<String> {
        let attempts = self.config.max_fake_retries;
        for attempt in 0..attempts {
            let candidate = self.candidate(original, kind, attempt);
            let collides = issued.contains(&candidate)
                || originals.contains(candidate.as_str())
                || pages.iter().any(|p| p.contains(candidate.as_str()));
            if !collides {
                return Ok(candidate);
            }
            debug!(kind = %kind, attempt, "substituto colidiu; nova tentativa");
        }
        Err(AnonError::FakeValuesExhausted { kind, attempts })
    }

    fn candidate(&mut self, original: &str, kind: PiiKind, attempt: usize) -> String {
        match self.config.mode {
            SubstitutionMode::Placeholder => {
                let counter = self.counters.entry(kind).or_insert(0);
                *counter += 1;
                self.config.placeholder(kind, *counter)
            }
            SubstitutionMode::FakeValue => self.fake_value(original, kind, attempt),
        }
    }

    fn fake_value(&mut self, original: &str, kind: PiiKind, attempt: usize) -> String {
        match kind {
            PiiKind::Person => format!("[NOME_FICTICIO_{}]", tag_word(&self.source.first_name())),
            PiiKind::Organization => {
                format!("[EMPRESA_FICTICIA_{}]", tag_word(&self.source.company_name()))
            }
            PiiKind::Location => format!("[LOCAL_FICTICIO_{}]", tag_word(&self.source.city_name())),
            PiiKind::Email => format!("exemplo{:04}@anonimizado.invalid", self.source.serial()),
            PiiKind::Misc if attempt == 0 => "[ANONYMIZED_DATA]".to_string(),
            PiiKind::Misc => format!("[ANONYMIZED_DATA_{}]", attempt + 1),
            _ => match self.config.structured {
                StructuredStrategy::Mask => mask_layout(original, attempt),
                StructuredStrategy::Fake => original
                    .chars()
                    .map(|c| if c.is_ascii_digit() { self.source.digit() } else { c })
                    .collect(),
            },
        }
    }
}
