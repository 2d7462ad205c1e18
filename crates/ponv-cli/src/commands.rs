//! Subcommand implementations.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use ponv_core::batch::{BatchDataset, BatchError, BatchEvaluator, ClassificationMetrics, NoModels};
use ponv_core::config::EngineConfig;
use ponv_core::db::{AssessmentLogSink, Database};
use ponv_core::export::{AssessmentReport, LogExporter};
use ponv_core::models::{AssessmentInput, ModelPrediction, NewLogEntry, PatientAssessment};
use ponv_core::pipeline::RiskAssessment;
use ponv_core::scoring::scorer_for;
use ponv_models::{generate as generate_cohort, TrainedModels};

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading assessment from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn open_log(config: &EngineConfig) -> Result<Database> {
    let path = &config.log_store.path;
    Database::open(path).with_context(|| format!("opening assessment log {}", path.display()))
}

fn train_models(config: &EngineConfig) -> Result<TrainedModels> {
    TrainedModels::train(&config.training).context("training reference classifiers")
}

pub fn score(
    config: &EngineConfig,
    input: &Path,
    log: bool,
    with_models: bool,
    json: bool,
) -> Result<()> {
    let raw = read_input(input)?;
    let form: AssessmentInput =
        serde_json::from_str(&raw).context("assessment is not valid form JSON")?;
    let assessment = PatientAssessment::try_from(form)?;

    let scorer = scorer_for(&config.scoring);
    let result = RiskAssessment::evaluate(&assessment, scorer.as_ref());

    let predictions: Vec<ModelPrediction> = if with_models {
        train_models(config)?.predict(&result.features)
    } else {
        Vec::new()
    };

    if log {
        let mut db = open_log(config)?;
        let entry = db.append(NewLogEntry::from_assessment(&result, predictions.clone()))?;
        eprintln!("Logged entry {} (#{})", entry.entry_id, entry.sequence);
    }

    if json {
        println!("{}", AssessmentReport::new(&result, predictions).to_json()?);
        return Ok(());
    }

    println!("Scoring variant: {}", result.variant);
    println!();
    for (label, points) in result.breakdown.labeled() {
        println!("  {:<36} {:>3}", label, points);
    }
    println!();
    println!("Hybrid score:  {}", result.hybrid_score);
    println!(
        "Risk category: {} (~{}%)",
        result.category, result.risk_percentage
    );
    for p in &predictions {
        println!("  {:<24} {:.3}", p.model, p.probability);
    }
    println!();
    println!("Recommendations:");
    for item in &result.recommendations {
        println!("  - {}", item);
    }
    Ok(())
}

fn print_metrics(name: &str, metrics: &ClassificationMetrics) {
    let cells: Vec<String> = metrics
        .rows()
        .iter()
        .map(|(metric, value)| format!("{}={}", metric, value))
        .collect();
    println!("  {:<24} {}", name, cells.join("  "));
}

pub fn evaluate(config: &EngineConfig, input: &Path, with_models: bool, json: bool) -> Result<()> {
    let dataset = match BatchDataset::from_path(input) {
        Ok(dataset) => dataset,
        Err(BatchError::SchemaMismatch {
            missing,
            suggestions,
        }) => {
            for (column, found) in &suggestions {
                eprintln!("  '{}' not found; did you mean '{}'?", column, found);
            }
            bail!("dataset is missing columns: {}", missing.join(", "));
        }
        Err(BatchError::InvalidRows(errors)) => {
            for error in &errors {
                eprintln!("  {}", error);
            }
            bail!("dataset rejected: {} invalid value(s)", errors.len());
        }
        Err(other) => return Err(other).with_context(|| format!("reading {}", input.display())),
    };

    let scorer = scorer_for(&config.scoring);
    let models = if with_models {
        Some(train_models(config)?)
    } else {
        None
    };
    let report = match &models {
        Some(models) => BatchEvaluator::new(scorer.as_ref(), models),
        None => BatchEvaluator::new(scorer.as_ref(), &NoModels),
    }
    .with_threshold(config.evaluation.decision_threshold)
    .evaluate(&dataset);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} rows, {} with PONV (variant {}, threshold {})",
        report.total_rows, report.positive_outcomes, report.scoring_variant, report.decision_threshold
    );
    print_metrics("hybrid_score", &report.hybrid);
    for m in &report.models {
        print_metrics(&m.model, &m.metrics);
    }
    Ok(())
}

pub fn generate(output: &Path, samples: usize, seed: u64) -> Result<()> {
    let data = generate_cohort(samples, seed);
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    data.write_csv(file)?;
    eprintln!(
        "Wrote {} rows ({} with PONV) to {}",
        data.len(),
        data.positives(),
        output.display()
    );
    Ok(())
}

pub fn list_logs(config: &EngineConfig) -> Result<()> {
    let db = open_log(config)?;
    let entries = db.list_log_entries()?;
    if entries.is_empty() {
        println!("No log entries.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "#{:<5} {}  {}  {:>4}  {:<15} {}",
            entry.sequence,
            entry.created_at,
            entry.record.scoring_variant,
            entry.record.hybrid_score,
            entry.record.risk_category.label(),
            entry.entry_id
        );
    }
    Ok(())
}

pub fn export_logs(config: &EngineConfig, csv: bool, output: Option<&Path>) -> Result<()> {
    let db = open_log(config)?;
    let export = LogExporter::new(&db).export_all()?;
    if !export.metadata.chain_intact {
        tracing::warn!("exporting a log whose hash chain does not verify");
    }
    let body = if csv {
        export.to_csv()?
    } else {
        export.to_json()?
    };

    match output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "Exported {} entries to {}",
                export.metadata.entry_count,
                path.display()
            );
        }
        None => io::stdout().write_all(body.as_bytes())?,
    }
    Ok(())
}

pub fn verify_logs(config: &EngineConfig) -> Result<()> {
    let db = open_log(config)?;
    let verification = db.verify_log_chain()?;
    match verification.first_broken {
        None => {
            println!(
                "Chain intact: {} entries, head {}",
                verification.entries_checked, verification.head_hash
            );
            Ok(())
        }
        Some(sequence) => bail!(
            "chain broken at entry #{} ({} entries checked)",
            sequence,
            verification.entries_checked
        ),
    }
}
