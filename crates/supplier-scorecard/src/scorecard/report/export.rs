use std::fmt;

use serde::{Deserialize, Serialize};

use super::views::{AdminPanel, EvaluationListing};
use crate::scorecard::store::WEIGHTED_SUFFIX;

/// Admin tables that can be downloaded as CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Evaluations,
    Ranking,
    Completeness,
    Incomplete,
    Suppliers,
    Types,
}

impl ReportKind {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::Evaluations,
            Self::Ranking,
            Self::Completeness,
            Self::Incomplete,
            Self::Suppliers,
            Self::Types,
        ]
    }

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Evaluations => "evaluations",
            Self::Ranking => "ranking",
            Self::Completeness => "completeness",
            Self::Incomplete => "incomplete",
            Self::Suppliers => "suppliers",
            Self::Types => "types",
        }
    }

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Evaluations => "todas_avaliacoes.csv",
            Self::Ranking => "top3_por_categoria.csv",
            Self::Completeness => "completude_por_avaliador.csv",
            Self::Incomplete => "avaliacoes_incompletas.csv",
            Self::Suppliers => "avaliacoes_por_fornecedor.csv",
            Self::Types => "avaliacoes_por_tipo.csv",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.slug() == wanted)
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A displayed table: header plus stringly rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// UTF-8, comma-separated, header row first.
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))
    }
}

/// Four decimals at most, trailing zeros dropped.
fn format_number(value: f64) -> String {
    let fixed = format!("{value:.4}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_default()
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl AdminPanel {
    pub fn table(&self, kind: ReportKind) -> ReportTable {
        match kind {
            ReportKind::Evaluations => evaluations_table(&self.overview.evaluations),
            ReportKind::Ranking => ReportTable {
                headers: headers(&[
                    "Categoria",
                    "Fornecedor",
                    "Comercial",
                    "Técnica",
                    "ESG",
                    "Nota Final",
                ]),
                rows: self
                    .ranking
                    .iter()
                    .flat_map(|ranking| ranking.suppliers.iter())
                    .map(|score| {
                        vec![
                            score.category.clone(),
                            score.supplier.clone(),
                            format_number(score.commercial),
                            format_number(score.technical),
                            format_number(score.esg),
                            format_number(score.final_score),
                        ]
                    })
                    .collect(),
            },
            ReportKind::Completeness => ReportTable {
                headers: headers(&["E-mail", "Categoria", "Tipo", "Completas", "Incompletas"]),
                rows: self
                    .completeness
                    .groups
                    .iter()
                    .map(|group| {
                        vec![
                            group.email.clone(),
                            group.category.clone(),
                            group.evaluation.label().to_string(),
                            group.complete.to_string(),
                            group.incomplete.to_string(),
                        ]
                    })
                    .collect(),
            },
            ReportKind::Incomplete => ReportTable {
                headers: headers(&[
                    "E-mail",
                    "Categoria",
                    "Fornecedor",
                    "Tipo",
                    "Respondidas",
                    "TotalPerguntas",
                ]),
                rows: self
                    .completeness
                    .incomplete
                    .iter()
                    .map(|entry| {
                        vec![
                            entry.email.clone(),
                            entry.category.clone(),
                            entry.supplier.clone(),
                            entry.evaluation.label().to_string(),
                            entry.answered.to_string(),
                            entry.total.to_string(),
                        ]
                    })
                    .collect(),
            },
            ReportKind::Suppliers => ReportTable {
                headers: headers(&["Fornecedor", "Qtd. Avaliações", "Média Ponderada"]),
                rows: self
                    .overview
                    .per_supplier
                    .iter()
                    .map(|activity| {
                        vec![
                            activity.supplier.clone(),
                            activity.evaluations.to_string(),
                            format_number(activity.mean_weighted_total),
                        ]
                    })
                    .collect(),
            },
            ReportKind::Types => ReportTable {
                headers: headers(&["Tipo", "Qtd. Avaliações"]),
                rows: self
                    .overview
                    .per_type
                    .iter()
                    .map(|count| vec![count.evaluation.label().to_string(), count.count.to_string()])
                    .collect(),
            },
        }
    }
}

fn evaluations_table(listings: &[EvaluationListing]) -> ReportTable {
    let mut questions: Vec<String> = Vec::new();
    for listing in listings {
        for score in &listing.scores {
            if !questions.contains(&score.question) {
                questions.push(score.question.clone());
            }
        }
    }

    let mut header = headers(&["Tipo", "Data", "Hora", "E-mail", "Categoria", "Fornecedor"]);
    header.extend(questions.iter().cloned());
    header.extend(
        questions
            .iter()
            .map(|question| format!("{question}{WEIGHTED_SUFFIX}")),
    );
    header.push("Total Ponderado".to_string());

    let rows = listings
        .iter()
        .map(|listing| {
            let lookup = |question: &String| {
                listing
                    .scores
                    .iter()
                    .find(|score| &score.question == question)
            };
            let mut row = vec![
                listing.evaluation.label().to_string(),
                listing.date.clone(),
                listing.time.clone(),
                listing.email.clone(),
                listing.category.clone(),
                listing.supplier.clone(),
            ];
            row.extend(
                questions
                    .iter()
                    .map(|question| format_optional(lookup(question).and_then(|score| score.raw))),
            );
            row.extend(questions.iter().map(|question| {
                format_optional(lookup(question).and_then(|score| score.weighted))
            }));
            row.push(format_number(listing.weighted_total));
            row
        })
        .collect();

    ReportTable {
        headers: header,
        rows,
    }
}
