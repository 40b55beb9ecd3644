//! Analysis result types
//!
//! Wire keys are the camelCase Portuguese names the UI consumes. Every list
//! field deserializes leniently, so any JSON object yields a complete result.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::lenient;

/// Which side of the case a deponent speaks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Plaintiff or claimant
    Autor,
    /// Defendant
    Reu,
    /// Neutral witness or expert
    Testemunha,
    #[default]
    Unknown,
}

impl Side {
    fn from_label(label: &str) -> Self {
        match fold(label).as_str() {
            "autor" | "autora" | "reclamante" | "requerente" | "plaintiff" => Side::Autor,
            "reu" | "re" | "reclamada" | "reclamado" | "requerido" | "requerida" | "defendant" => {
                Side::Reu
            }
            "testemunha" | "informante" | "perito" | "witness" => Side::Testemunha,
            _ => Side::Unknown,
        }
    }
}

/// Severity tag used by contradictions and admissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Unknown,
    Leve,
    Moderada,
    Grave,
}

impl Severity {
    fn from_label(label: &str) -> Self {
        match fold(label).as_str() {
            "leve" | "baixa" | "low" | "minor" => Severity::Leve,
            "moderada" | "media" | "medium" | "moderate" => Severity::Moderada,
            "grave" | "alta" | "high" | "severe" | "critica" => Severity::Grave,
            _ => Severity::Unknown,
        }
    }
}

/// Whether a contradiction lies within one testimony or across testimonies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionKind {
    Interna,
    Externa,
    #[default]
    Unknown,
}

impl ContradictionKind {
    fn from_label(label: &str) -> Self {
        match fold(label).as_str() {
            "interna" | "internal" => ContradictionKind::Interna,
            "externa" | "external" => ContradictionKind::Externa,
            _ => ContradictionKind::Unknown,
        }
    }
}

/// Who benefits from an admission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionKind {
    /// Admission by the deponent's own party
    Parte,
    /// Admission favouring the opposing party
    ParteContraria,
    #[default]
    Unknown,
}

impl AdmissionKind {
    fn from_label(label: &str) -> Self {
        match fold(label).replace([' ', '-'], "_").as_str() {
            "parte" | "party" | "propria" | "parte_propria" => AdmissionKind::Parte,
            "parte_contraria" | "contraria" | "opposing_party" => AdmissionKind::ParteContraria,
            _ => AdmissionKind::Unknown,
        }
    }
}

macro_rules! lenient_label {
    ($($ty:ty),*) => {
        $(
            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    lenient::string(deserializer).map(|label| Self::from_label(&label))
                }
            }
        )*
    };
}

lenient_label!(Side, Severity, ContradictionKind, AdmissionKind);

/// Lowercase and strip the Portuguese diacritics models tend to vary on.
fn fold(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Participant heard in the hearing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deponent {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nome: String,
    /// Procedural qualification (party, witness, informant...)
    #[serde(default, deserialize_with = "lenient::string")]
    pub qualificacao: String,
    #[serde(default)]
    pub polo: Side,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One timestamped utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub texto: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Every statement made by one deponent, in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimony {
    #[serde(default, deserialize_with = "lenient::string")]
    pub depoente_id: String,
    #[serde(default, deserialize_with = "lenient::items")]
    pub declaracoes: Vec<Statement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Condensed narrative of one testimony
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    #[serde(default, deserialize_with = "lenient::string")]
    pub depoente_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub sintese: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Statement attributed to a deponent, used inside topic groupings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributedStatement {
    #[serde(default, deserialize_with = "lenient::string")]
    pub depoente_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub texto: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Statements from all deponents about one topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicGroup {
    #[serde(default, deserialize_with = "lenient::string")]
    pub tema: String,
    #[serde(default, deserialize_with = "lenient::items")]
    pub declaracoes: Vec<AttributedStatement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Excerpt of oral evidence backing a legal analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceExcerpt {
    #[serde(default, deserialize_with = "lenient::string")]
    pub depoente_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub trecho: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Legal analysis of one disputed topic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicAnalysis {
    #[serde(default, deserialize_with = "lenient::string")]
    pub tema: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub posicao_autor: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub posicao_reu: String,
    #[serde(default, deserialize_with = "lenient::items")]
    pub prova_oral: Vec<EvidenceExcerpt>,
    /// Probatory conclusion
    #[serde(default, deserialize_with = "lenient::string")]
    pub conclusao: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contradiction {
    #[serde(default)]
    pub tipo: ContradictionKind,
    /// Ids of the deponents involved
    #[serde(default, deserialize_with = "lenient::items")]
    pub depoentes: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub descricao: String,
    #[serde(default, deserialize_with = "lenient::items")]
    pub trechos: Vec<Value>,
    #[serde(default)]
    pub gravidade: Severity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Admission {
    #[serde(default, deserialize_with = "lenient::string")]
    pub depoente_id: String,
    #[serde(default)]
    pub tipo: AdmissionKind,
    #[serde(default, deserialize_with = "lenient::string")]
    pub descricao: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub trecho: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub timestamp: String,
    #[serde(default)]
    pub gravidade: Severity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Legitimate criteria a credibility assessment may rely on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredibilityCriteria {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub coerencia_interna: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub consistencia_externa: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub riqueza_detalhes: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub espontaneidade: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub compatibilidade_provas: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredibilityAssessment {
    #[serde(default, deserialize_with = "lenient::string")]
    pub depoente_id: String,
    /// Score on a 0-10 scale, if the model gave one
    #[serde(default, deserialize_with = "lenient::number")]
    pub pontuacao: Option<f64>,
    #[serde(default, deserialize_with = "criteria")]
    pub criterios: CredibilityCriteria,
    #[serde(default, deserialize_with = "lenient::string")]
    pub observacoes: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn criteria<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CredibilityCriteria, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Complete, schema-total result of one testimony analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Case metadata, kept exactly as the model produced it
    #[serde(default, deserialize_with = "lenient::object")]
    pub metadata: Map<String, Value>,
    #[serde(rename = "depoentes", default, deserialize_with = "lenient::items")]
    pub deponents: Vec<Deponent>,
    #[serde(rename = "depoimentos", default, deserialize_with = "lenient::items")]
    pub testimonies: Vec<Testimony>,
    #[serde(rename = "sinteses", default, deserialize_with = "lenient::items")]
    pub syntheses: Vec<Synthesis>,
    #[serde(rename = "temas", default, deserialize_with = "lenient::items")]
    pub topics: Vec<TopicGroup>,
    #[serde(rename = "analises", default, deserialize_with = "lenient::items")]
    pub analyses: Vec<TopicAnalysis>,
    #[serde(rename = "contradicoes", default, deserialize_with = "lenient::items")]
    pub contradictions: Vec<Contradiction>,
    #[serde(rename = "confissoes", default, deserialize_with = "lenient::items")]
    pub admissions: Vec<Admission>,
    #[serde(rename = "credibilidade", default, deserialize_with = "lenient::items")]
    pub credibility: Vec<CredibilityAssessment>,
}

impl AnalysisResult {
    /// Wire names of the list-valued fields, in schema order
    pub const LIST_FIELDS: [&'static str; 8] = [
        "depoentes",
        "depoimentos",
        "sinteses",
        "temas",
        "analises",
        "contradicoes",
        "confissoes",
        "credibilidade",
    ];

    /// Look up a deponent by id
    pub fn deponent(&self, id: &str) -> Option<&Deponent> {
        self.deponents.iter().find(|d| d.id == id)
    }

    /// Item count per list field, keyed by wire name
    pub fn statistics(&self) -> BTreeMap<&'static str, usize> {
        let counts = [
            self.deponents.len(),
            self.testimonies.len(),
            self.syntheses.len(),
            self.topics.len(),
            self.analyses.len(),
            self.contradictions.len(),
            self.admissions.len(),
            self.credibility.len(),
        ];
        Self::LIST_FIELDS.into_iter().zip(counts).collect()
    }

    /// Contradictions at or above the given severity
    pub fn contradictions_at_least(&self, severity: Severity) -> impl Iterator<Item = &Contradiction> {
        self.contradictions.iter().filter(move |c| c.gravidade >= severity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_object_is_total() {
        let result: AnalysisResult = serde_json::from_value(json!({})).unwrap();
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["metadata"], json!({}));
        for key in AnalysisResult::LIST_FIELDS {
            assert_eq!(value[key], json!([]), "{key} should serialize as []");
        }
    }

    #[test]
    fn test_labels_are_folded() {
        let contradiction: Contradiction = serde_json::from_value(json!({
            "tipo": "Externa",
            "gravidade": "MÉDIA",
            "depoentes": ["d1", "d2"]
        }))
        .unwrap();
        assert_eq!(contradiction.tipo, ContradictionKind::Externa);
        assert_eq!(contradiction.gravidade, Severity::Moderada);

        let admission: Admission = serde_json::from_value(json!({
            "tipo": "parte contrária",
            "gravidade": "alta"
        }))
        .unwrap();
        assert_eq!(admission.tipo, AdmissionKind::ParteContraria);
        assert_eq!(admission.gravidade, Severity::Grave);

        let deponent: Deponent = serde_json::from_value(json!({ "polo": "Réu" })).unwrap();
        assert_eq!(deponent.polo, Side::Reu);
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let deponent: Deponent = serde_json::from_value(json!({
            "id": "d1",
            "nome": "Maria",
            "idade": 41
        }))
        .unwrap();
        assert_eq!(deponent.extra.get("idade"), Some(&json!(41)));
        let back = serde_json::to_value(&deponent).unwrap();
        assert_eq!(back["idade"], json!(41));
    }

    #[test]
    fn test_credibility_criteria_tolerate_garbage() {
        let assessment: CredibilityAssessment = serde_json::from_value(json!({
            "depoenteId": 3,
            "pontuacao": "7",
            "criterios": "n/a"
        }))
        .unwrap();
        assert_eq!(assessment.depoente_id, "3");
        assert_eq!(assessment.pontuacao, Some(7.0));
        assert_eq!(assessment.criterios, CredibilityCriteria::default());
    }

    #[test]
    fn test_statistics_and_filters() {
        let result: AnalysisResult = serde_json::from_value(json!({
            "depoentes": [{ "id": "d1", "nome": "Ana" }],
            "contradicoes": [
                { "gravidade": "leve" },
                { "gravidade": "grave" }
            ]
        }))
        .unwrap();
        let stats = result.statistics();
        assert_eq!(stats["depoentes"], 1);
        assert_eq!(stats["contradicoes"], 2);
        assert_eq!(stats["credibilidade"], 0);
        assert_eq!(result.contradictions_at_least(Severity::Moderada).count(), 1);
        assert_eq!(result.deponent("d1").map(|d| d.nome.as_str()), Some("Ana"));
    }
}
