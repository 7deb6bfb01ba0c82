//! # Corpus jurídico anotado (BIO)
//!
//! Pequeno conjunto de frases no estilo de petições, termos de audiência e
//! contratos, anotadas token a token. Serve para alimentar os gazetteers do
//! modelo embutido e como material de teste do reconhecedor.
//!
//! Todos os nomes, empresas e endereços são fictícios.

use std::collections::HashSet;

use crate::tagger::{EntityCategory, Tag};

/// Uma frase anotada no formato BIO.
pub struct AnnotatedSentence {
    pub text: &'static str,
    /// Tipo de peça de onde a frase foi tirada ("petição", "audiência", ...).
    pub domain: &'static str,
    /// Pares (palavra, tag BIO).
    pub annotations: &'static [(&'static str, &'static str)],
}

pub fn get_corpus() -> Vec<AnnotatedSentence> {
    vec![
        AnnotatedSentence {
            text: "A autora Mariana Fagundes Torres ajuizou ação contra a Construtora Horizonte Ltda.",
            domain: "petição",
            annotations: &[
                ("A", "O"), ("autora", "O"), ("Mariana", "B-PER"), ("Fagundes", "I-PER"),
                ("Torres", "I-PER"), ("ajuizou", "O"), ("ação", "O"), ("contra", "O"),
                ("a", "O"), ("Construtora", "B-ORG"), ("Horizonte", "I-ORG"), ("Ltda", "I-ORG"),
                (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "O réu Rogério Albuquerque Lins reside na Rua das Acácias, em Campinas.",
            domain: "petição",
            annotations: &[
                ("O", "O"), ("réu", "O"), ("Rogério", "B-PER"), ("Albuquerque", "I-PER"),
                ("Lins", "I-PER"), ("reside", "O"), ("na", "O"), ("Rua", "B-LOC"),
                ("das", "I-LOC"), ("Acácias", "I-LOC"), (",", "O"), ("em", "O"),
                ("Campinas", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "Compareceu a testemunha Heloísa Prado Cavalcanti, residente em Sorocaba.",
            domain: "audiência",
            annotations: &[
                ("Compareceu", "O"), ("a", "O"), ("testemunha", "O"), ("Heloísa", "B-PER"),
                ("Prado", "I-PER"), ("Cavalcanti", "I-PER"), (",", "O"), ("residente", "O"),
                ("em", "O"), ("Sorocaba", "B-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "O pagamento foi feito por transferência do Banco Meridiano para a conta do requerente.",
            domain: "petição",
            annotations: &[
                ("O", "O"), ("pagamento", "O"), ("foi", "O"), ("feito", "O"), ("por", "O"),
                ("transferência", "O"), ("do", "O"), ("Banco", "B-ORG"), ("Meridiano", "I-ORG"),
                ("para", "O"), ("a", "O"), ("conta", "O"), ("do", "O"), ("requerente", "O"),
                (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "A Dra. Beatriz Monteiro Sales representou a Transportadora Veloz Eireli na audiência.",
            domain: "audiência",
            annotations: &[
                ("A", "O"), ("Dra.", "O"), ("Beatriz", "B-PER"), ("Monteiro", "I-PER"),
                ("Sales", "I-PER"), ("representou", "O"), ("a", "O"),
                ("Transportadora", "B-ORG"), ("Veloz", "I-ORG"), ("Eireli", "I-ORG"),
                ("na", "O"), ("audiência", "O"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "O imóvel situado na Avenida Brigadeiro Faria Lima, em São Paulo, foi alugado por Otávio Rezende.",
            domain: "contrato",
            annotations: &[
                ("O", "O"), ("imóvel", "O"), ("situado", "O"), ("na", "O"),
                ("Avenida", "B-LOC"), ("Brigadeiro", "I-LOC"), ("Faria", "I-LOC"),
                ("Lima", "I-LOC"), (",", "O"), ("em", "O"), ("São", "B-LOC"), ("Paulo", "I-LOC"),
                (",", "O"), ("foi", "O"), ("alugado", "O"), ("por", "O"), ("Otávio", "B-PER"),
                ("Rezende", "I-PER"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "A vítima Jaqueline Moura da Silva foi atendida no Hospital Santa Clara de Ribeirão Preto.",
            domain: "boletim",
            annotations: &[
                ("A", "O"), ("vítima", "O"), ("Jaqueline", "B-PER"), ("Moura", "I-PER"),
                ("da", "I-PER"), ("Silva", "I-PER"), ("foi", "O"), ("atendida", "O"),
                ("no", "O"), ("Hospital", "B-ORG"), ("Santa", "I-ORG"), ("Clara", "I-ORG"),
                ("de", "O"), ("Ribeirão", "B-LOC"), ("Preto", "I-LOC"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "O contrato de locação foi firmado entre Eduardo Nogueira e a Imobiliária Porto Seguro.",
            domain: "contrato",
            annotations: &[
                ("O", "O"), ("contrato", "O"), ("de", "O"), ("locação", "O"), ("foi", "O"),
                ("firmado", "O"), ("entre", "O"), ("Eduardo", "B-PER"), ("Nogueira", "I-PER"),
                ("e", "O"), ("a", "O"), ("Imobiliária", "B-ORG"), ("Porto", "I-ORG"),
                ("Seguro", "I-ORG"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "O requerido Fabrício Teixeira Lopes mudou-se para Belo Horizonte após a citação.",
            domain: "petição",
            annotations: &[
                ("O", "O"), ("requerido", "O"), ("Fabrício", "B-PER"), ("Teixeira", "I-PER"),
                ("Lopes", "I-PER"), ("mudou-se", "O"), ("para", "O"), ("Belo", "B-LOC"),
                ("Horizonte", "I-LOC"), ("após", "O"), ("a", "O"), ("citação", "O"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "A Cooperativa Agrícola Vale Verde é credora do valor apontado na inicial.",
            domain: "execução",
            annotations: &[
                ("A", "O"), ("Cooperativa", "B-ORG"), ("Agrícola", "I-ORG"), ("Vale", "I-ORG"),
                ("Verde", "I-ORG"), ("é", "O"), ("credora", "O"), ("do", "O"), ("valor", "O"),
                ("apontado", "O"), ("na", "O"), ("inicial", "O"), (".", "O"),
            ],
        },
        AnnotatedSentence {
            text: "Conforme o Termo de Acordo Coletivo, a reclamante Luana Bezerra trabalhou em Jundiaí.",
            domain: "trabalhista",
            annotations: &[
                ("Conforme", "O"), ("o", "O"), ("Termo", "B-MISC"), ("de", "I-MISC"),
                ("Acordo", "I-MISC"), ("Coletivo", "I-MISC"), (",", "O"), ("a", "O"),
                ("reclamante", "O"), ("Luana", "B-PER"), ("Bezerra", "I-PER"),
                ("trabalhou", "O"), ("em", "O"), ("Jundiaí", "B-LOC"), (".", "O"),
            ],
        },
    ]
}

/// Entidades (em minúsculas) encontradas no corpus, por categoria.
#[derive(Debug, Default)]
pub struct CorpusEntities {
    pub persons: HashSet<String>,
    pub locations: HashSet<String>,
    pub organizations: HashSet<String>,
    pub misc: HashSet<String>,
}

impl CorpusEntities {
    fn insert(&mut self, category: Option<EntityCategory>, words: &[&str]) {
        let Some(category) = category else { return };
        if words.is_empty() {
            return;
        }
        let target = match category {
            EntityCategory::Per => &mut self.persons,
            EntityCategory::Loc => &mut self.locations,
            EntityCategory::Org => &mut self.organizations,
            EntityCategory::Misc => &mut self.misc,
        };
        target.insert(words.join(" ").to_lowercase());
    }
}

/// Reconstrói as entidades a partir das anotações BIO.
pub fn extract_gazetteers_from_corpus() -> CorpusEntities {
    let mut found = CorpusEntities::default();

    for sentence in get_corpus() {
        let mut current: Vec<&str> = Vec::new();
        let mut category = None;

        for &(word, label) in sentence.annotations {
            // rótulo desconhecido fecha a entidade aberta, como "O"
            match Tag::from_label(label) {
                Some(Tag::Begin(cat)) => {
                    found.insert(category, &current);
                    current = vec![word];
                    category = Some(cat);
                }
                Some(Tag::Inside(cat)) if category == Some(cat) && !current.is_empty() => {
                    current.push(word);
                }
                _ => {
                    found.insert(category, &current);
                    current.clear();
                    category = None;
                }
            }
        }
        found.insert(category, &current);
    }

    found
}

/// Textos de demonstração para a interface web: (título, texto).
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Petição inicial",
            "EXCELENTÍSSIMO SENHOR DOUTOR JUIZ DE DIREITO DA 2ª VARA CÍVEL DA COMARCA DE CAMPINAS. \
             A autora Mariana Fagundes Torres, CPF 123.456.789-09, residente na Rua das Acácias, 120, \
             CEP 13010-050, em Campinas, e-mail mariana.torres@exemplo.com.br, telefone (19) 99876-5432, \
             vem propor ação de cobrança contra a Construtora Horizonte Ltda, CNPJ 11.222.333/0001-81.",
        ),
        (
            "Termo de audiência",
            "Aberta a audiência, compareceu a testemunha Heloísa Prado Cavalcanti, RG 12.345.678-9, \
             residente em Sorocaba. Pela ré compareceu a Dra. Beatriz Monteiro Sales, que representa \
             a Transportadora Veloz Eireli. A testemunha declarou conhecer o réu Rogério Albuquerque Lins \
             desde 2015.",
        ),
        (
            "Contrato de locação",
            "LOCADOR: Eduardo Nogueira, CPF 529.982.247-25, telefone +55 11 98765-4321. \
             LOCATÁRIO: Otávio Rezende, e-mail otavio.rezende@exemplo.com. \
             Objeto: imóvel situado na Avenida Brigadeiro Faria Lima, 1500, São Paulo, CEP 01452-001, \
             intermediado pela Imobiliária Porto Seguro.",
        ),
        (
            "Boletim de ocorrência",
            "A vítima Jaqueline Moura da Silva, telefone (16) 3322-1100, foi atendida no Hospital \
             Santa Clara de Ribeirão Preto. O autor do fato, Fabrício Teixeira Lopes, evadiu-se para \
             Belo Horizonte. Contato da delegacia: plantao@exemplo.gov.br.",
        ),
    ]
}
