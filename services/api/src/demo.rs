use crate::infra::{connect_gateway, demo_tables, parse_report_kind};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use supplier_scorecard::config::AppConfig;
use supplier_scorecard::error::AppError;
use supplier_scorecard::scorecard::{
    AdminPanel, EvaluationSubmission, EvaluationType, ReferenceSources, ReportKind,
    ScorecardError, ScorecardService, ScorecardSettings, TableGateway,
};

const DEMO_ADMIN_PASSWORD: &str = "demo";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Also print one report as CSV (evaluations, ranking, completeness, incomplete, suppliers, types)
    #[arg(long, value_parser = parse_report_kind)]
    pub(crate) export: Option<ReportKind>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Report to build (evaluations, ranking, completeness, incomplete, suppliers, types)
    #[arg(long, value_parser = parse_report_kind)]
    pub(crate) kind: ReportKind,
    /// Write the CSV to this path instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs { kind, output } = args;
    let config = AppConfig::load()?;
    let gateway = Arc::new(connect_gateway(&config).await?);
    let service = ScorecardService::new(gateway, config.scorecard_settings());

    let panel = tokio::task::spawn_blocking(move || service.operator_panel())
        .await
        .map_err(|err| ScorecardError::Worker(err.to_string()))??;
    let bytes = panel.table(kind).to_csv().map_err(ScorecardError::from)?;

    match output {
        Some(path) => {
            std::fs::write(&path, &bytes)?;
            println!("Wrote {} ({} bytes) to {}", kind.file_name(), bytes.len(), path.display());
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

fn demo_settings() -> ScorecardSettings {
    ScorecardSettings {
        sources: ReferenceSources {
            questions_document: "demo-questions".to_string(),
            questions_table: "Perguntas".to_string(),
            access_document: "demo-access".to_string(),
            access_table: "Acessos".to_string(),
            categories_table: "Categorias".to_string(),
        },
        responses_document: "demo-responses".to_string(),
        admin_password: Some(DEMO_ADMIN_PASSWORD.to_string()),
    }
}

struct DemoEvaluation {
    email: &'static str,
    evaluation: EvaluationType,
    category: &'static str,
    supplier: &'static str,
    scores: &'static [f64],
}

const DEMO_ROUND: &[DemoEvaluation] = &[
    DemoEvaluation {
        email: "compras@example.com",
        evaluation: EvaluationType::Commercial,
        category: "Embalagens",
        supplier: "Acme Embalagens",
        scores: &[3.0, 2.5, 2.75],
    },
    DemoEvaluation {
        email: "compras@example.com",
        evaluation: EvaluationType::Commercial,
        category: "Embalagens",
        supplier: "Boxco",
        scores: &[2.0, 2.25, 1.5],
    },
    DemoEvaluation {
        email: "compras@example.com",
        evaluation: EvaluationType::Commercial,
        category: "Logística",
        supplier: "Transvia",
        scores: &[2.5, 2.5, 3.0],
    },
    DemoEvaluation {
        email: "engenharia@example.com",
        evaluation: EvaluationType::Technical,
        category: "Embalagens",
        supplier: "Acme Embalagens",
        scores: &[2.75, 3.0, 2.0],
    },
    DemoEvaluation {
        email: "engenharia@example.com",
        evaluation: EvaluationType::Technical,
        category: "Embalagens",
        supplier: "Papelaria Sul",
        scores: &[2.0, 1.75],
    },
    DemoEvaluation {
        email: "sustentabilidade@example.com",
        evaluation: EvaluationType::Esg,
        category: "Embalagens",
        supplier: "Boxco",
        scores: &[3.0, 2.75, 2.5],
    },
    DemoEvaluation {
        email: "sustentabilidade@example.com",
        evaluation: EvaluationType::Esg,
        category: "Logística",
        supplier: "Rodonorte",
        scores: &[1.5, 2.0, 1.25],
    },
];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let settings = demo_settings();
    let tables = Arc::new(demo_tables(&settings));
    let service = ScorecardService::new(tables, settings);

    println!("Supplier scorecard demo");
    println!("Evaluation round");
    for step in DEMO_ROUND {
        match submit(&service, step) {
            Ok(message) => println!(
                "- [{}] {} | {} | {} -> {}",
                step.evaluation, step.email, step.category, step.supplier, message
            ),
            Err(err) => println!(
                "- [{}] {} | {} | {} rejected: {}",
                step.evaluation, step.email, step.category, step.supplier, err
            ),
        }
    }

    let admin = service.open_session()?.session_id;
    service.admin_login(admin, DEMO_ADMIN_PASSWORD)?;
    let panel = service.admin_panel(admin)?;
    render_panel(&panel);

    if let Some(kind) = args.export {
        let export = service.export(admin, kind)?;
        println!("\n{}", export.file_name);
        print!("{}", String::from_utf8_lossy(&export.bytes));
    }

    Ok(())
}

fn submit<G: TableGateway + 'static>(
    service: &ScorecardService<G>,
    step: &DemoEvaluation,
) -> Result<String, ScorecardError> {
    let id = service.open_session()?.session_id;
    service.login(id, step.email)?;
    let form = service.form(id, step.evaluation, step.category, step.supplier)?;
    let answers = form
        .questions
        .iter()
        .zip(step.scores)
        .map(|(question, score)| (question.text.clone(), *score))
        .collect();

    let receipt = service.submit(
        id,
        EvaluationSubmission {
            evaluation: step.evaluation,
            category: step.category.to_string(),
            supplier: step.supplier.to_string(),
            answers,
        },
    )?;
    service.logout(id)?;
    Ok(receipt.message.to_string())
}

fn render_panel(panel: &AdminPanel) {
    let overview = &panel.overview;
    println!(
        "\nAdmin overview: {} evaluations stored",
        overview.total_evaluations
    );
    for count in &overview.per_type {
        println!("  - {}: {}", count.evaluation, count.count);
    }

    println!("Top suppliers per category");
    for ranking in &panel.ranking {
        println!("  {}", ranking.category);
        for (position, score) in ranking.suppliers.iter().enumerate() {
            println!(
                "    {}. {} | comercial {:.2} | técnica {:.2} | esg {:.2} | final {:.2}",
                position + 1,
                score.supplier,
                score.commercial,
                score.technical,
                score.esg,
                score.final_score
            );
        }
    }

    println!("Completeness per evaluator");
    for group in &panel.completeness.groups {
        println!(
            "  - {} | {} | {}: {} complete / {} incomplete",
            group.email, group.category, group.evaluation, group.complete, group.incomplete
        );
    }
    for entry in &panel.completeness.incomplete {
        println!(
            "    ! {} left {} of {} questions open for {}",
            entry.email,
            entry.total - entry.answered,
            entry.total,
            entry.supplier
        );
    }
}
