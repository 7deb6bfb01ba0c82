//! # Modelo embutido
//!
//! Agrega os pesos do CRF, o motor de regras e os gazetteers usados pelo
//! reconhecedor. Os pesos foram calibrados à mão para a linguagem de peças
//! jurídicas: contexto de parte ("a testemunha X"), de endereço ("residente em
//! X") e vocabulário forense que aparece capitalizado sem ser nome próprio.
//!
//! Um modelo treinado externamente pode substituir o CRF via
//! [`NerModel::with_crf`]; regras e gazetteers continuam os mesmos.

use crate::corpus::extract_gazetteers_from_corpus;
use crate::crf::CrfModel;
use crate::features::Gazetteers;
use crate::rule_based::RuleEngine;
use crate::tagger::{EntityCategory, Tag};

pub struct NerModel {
    pub crf: CrfModel,
    pub rule_engine: RuleEngine,
    gazetteers: Gazetteers,
}

impl NerModel {
    /// Modelo padrão com pesos embutidos.
    pub fn build() -> Self {
        Self::with_crf(build_crf_model())
    }

    /// Usa os pesos informados com as regras e gazetteers embutidos.
    pub fn with_crf(crf: CrfModel) -> Self {
        let mut rule_engine = RuleEngine::new();
        let gazetteers = build_gazetteers(&mut rule_engine);
        Self {
            crf,
            rule_engine,
            gazetteers,
        }
    }

    pub fn gazetteers(&self) -> &Gazetteers {
        &self.gazetteers
    }
}

impl Default for NerModel {
    fn default() -> Self {
        Self::build()
    }
}

fn build_crf_model() -> CrfModel {
    let mut model = CrfModel::new();
    let b = Tag::Begin;
    let i = Tag::Inside;
    use EntityCategory::{Loc, Misc, Org, Per};

    // --- PESSOA ---
    model.set_emission("is_capitalized", &b(Per), 2.0);
    model.set_emission("is_capitalized", &i(Per), 1.5);
    model.set_emission("in_person_gazetteer", &b(Per), 4.0);
    model.set_emission("in_person_gazetteer", &i(Per), 4.0);
    model.set_emission("prev_is_party_cue", &b(Per), 2.5);
    model.set_emission("prev2_word=nome", &b(Per), 2.0);
    model.set_emission("prev_word=locador", &b(Per), 1.5);
    model.set_emission("prev_word=locatário", &b(Per), 1.5);
    model.set_emission("after_colon", &b(Per), 0.5);

    // Sobrenomes terminados em -es, -eira, -ini são frequentes
    model.set_emission("suffix2=es", &i(Per), 0.4);
    model.set_emission("suffix4=eira", &i(Per), 0.5);
    model.set_emission("suffix3=ini", &i(Per), 0.4);
    for prefix in ["ma", "jo", "an", "ca", "fe", "ro", "lu", "be", "ed", "ra"] {
        model.set_emission(&format!("prefix2={prefix}"), &b(Per), 0.3);
    }

    // --- ORGANIZAÇÃO ---
    model.set_emission("is_capitalized", &b(Org), 1.2);
    model.set_emission("is_capitalized", &i(Org), 1.2);
    model.set_emission("in_org_gazetteer", &b(Org), 4.5);
    model.set_emission("in_org_gazetteer", &i(Org), 4.0);
    model.set_emission("is_all_caps", &b(Org), 1.5);
    model.set_emission("prev_word=empresa", &b(Org), 1.5);
    model.set_emission("prev_word=requerida", &b(Org), 0.8);
    model.set_emission("prev_word=executada", &b(Org), 1.2);
    model.set_emission("next_word=ltda", &i(Org), 1.0);
    model.set_emission("next_word=s/a", &i(Org), 1.0);

    // --- LOCAL ---
    model.set_emission("is_capitalized", &b(Loc), 1.0);
    model.set_emission("is_capitalized", &i(Loc), 1.0);
    model.set_emission("in_location_gazetteer", &b(Loc), 4.5);
    model.set_emission("in_location_gazetteer", &i(Loc), 4.0);
    model.set_emission("prev_is_place_cue", &b(Loc), 2.0);
    model.set_emission("prev2_is_place_cue", &b(Loc), 1.5);
    model.set_emission("prev_word=em", &b(Loc), 0.8);
    model.set_emission("prev_word=para", &b(Loc), 0.5);
    model.set_emission("suffix4=ópolis", &b(Loc), 1.2);
    model.set_emission("suffix4=ília", &b(Loc), 1.0);

    // --- MISC ---
    model.set_emission("in_misc_gazetteer", &b(Misc), 4.0);
    model.set_emission("in_misc_gazetteer", &i(Misc), 3.5);
    model.set_emission("is_all_caps", &b(Misc), 0.8);

    // --- FORA ---
    model.set_emission("bias", &Tag::Outside, 1.0);
    model.set_emission("BOS", &Tag::Outside, 1.2);
    model.set_emission("is_lower_initial", &Tag::Outside, 3.5);
    model.set_emission("is_legal_term", &Tag::Outside, 4.0);
    model.set_emission("is_punctuation", &Tag::Outside, 6.0);
    model.set_emission("is_digit", &Tag::Outside, 3.0);
    model.set_emission("has_digit", &Tag::Outside, 2.0);
    model.set_emission("is_abbreviation", &Tag::Outside, 1.5);
    model.set_emission("is_short_lower", &Tag::Outside, 1.0);

    // --- TRANSIÇÕES ---
    let tags = Tag::all();
    for prev in &tags {
        for next in &tags {
            if !Tag::is_valid_transition(prev, next) {
                model.set_transition(prev, next, -8.0);
            }
        }
    }
    for cat in EntityCategory::ALL {
        model.set_transition(&b(cat), &i(cat), 3.0);
        model.set_transition(&i(cat), &i(cat), 2.5);
        model.set_transition(&b(cat), &Tag::Outside, 1.0);
        model.set_transition(&i(cat), &Tag::Outside, 1.0);
        model.set_transition(&Tag::Outside, &b(cat), 0.5);
    }
    model.set_transition(&Tag::Outside, &Tag::Outside, 1.5);

    model
}

const EXTRA_PERSONS: &[&str] = &[
    "Ana", "Maria", "José", "João", "Antônio", "Francisco", "Carlos", "Paulo", "Pedro", "Lucas",
    "Luiz", "Marcos", "Luís", "Gabriel", "Rafael", "Daniel", "Marcelo", "Bruno", "Eduardo",
    "Felipe", "Rodrigo", "Juliana", "Fernanda", "Patrícia", "Aline", "Camila", "Amanda",
    "Bruna", "Letícia", "Larissa", "Mariana", "Beatriz", "Helena", "Heloísa", "Otávio",
    "Rogério", "Fabrício", "Jaqueline", "Luana", "Silva", "Santos", "Oliveira", "Souza",
    "Rodrigues", "Ferreira", "Alves", "Pereira", "Lima", "Gomes", "Costa", "Ribeiro",
    "Martins", "Carvalho", "Almeida", "Lopes", "Soares", "Fernandes", "Vieira", "Barbosa",
    "Rocha", "Dias", "Nascimento", "Andrade", "Moreira", "Nunes", "Marques", "Machado",
    "Mendes", "Freitas", "Cardoso", "Ramos", "Gonçalves", "Santana", "Teixeira",
];

const EXTRA_LOCATIONS: &[&str] = &[
    "São Paulo", "Rio de Janeiro", "Belo Horizonte", "Brasília", "Salvador", "Fortaleza",
    "Curitiba", "Recife", "Porto Alegre", "Manaus", "Belém", "Goiânia", "Campinas",
    "Guarulhos", "São Luís", "Maceió", "Natal", "Teresina", "Florianópolis", "Vitória",
    "Cuiabá", "Campo Grande", "João Pessoa", "Aracaju", "Sorocaba", "Jundiaí",
    "Ribeirão Preto", "Santos", "Niterói", "Londrina", "Joinville", "Uberlândia",
    "Piracicaba", "Bauru",
];

const EXTRA_ORGS: &[&str] = &[
    "Banco do Brasil", "Caixa Econômica Federal", "Bradesco", "Itaú", "Santander",
    "Nubank", "Petrobras", "Correios", "INSS", "Receita Federal", "Detran",
];

fn build_gazetteers(rule_engine: &mut RuleEngine) -> Gazetteers {
    let corpus = extract_gazetteers_from_corpus();
    let mut gaz = Gazetteers::new();

    let persons = corpus
        .persons
        .iter()
        .map(String::as_str)
        .chain(EXTRA_PERSONS.iter().copied());
    for name in persons {
        for word in name.split_whitespace().filter(|w| w.chars().count() > 2) {
            gaz.persons.insert(word.to_lowercase());
        }
        rule_engine.add_person(name);
    }

    let locations = corpus
        .locations
        .iter()
        .map(String::as_str)
        .chain(EXTRA_LOCATIONS.iter().copied());
    for name in locations {
        for word in name.split_whitespace().filter(|w| w.chars().count() > 3) {
            gaz.locations.insert(word.to_lowercase());
        }
        rule_engine.add_location(name);
    }

    let orgs = corpus
        .organizations
        .iter()
        .map(String::as_str)
        .chain(EXTRA_ORGS.iter().copied());
    for name in orgs {
        for word in name.split_whitespace().filter(|w| w.chars().count() > 3) {
            gaz.organizations.insert(word.to_lowercase());
        }
        rule_engine.add_org(name);
    }

    for name in &corpus.misc {
        for word in name.split_whitespace().filter(|w| w.chars().count() > 3) {
            gaz.misc.insert(word.to_lowercase());
        }
        rule_engine.add_misc(name);
    }

    gaz
}
