//! Boteval CLI
//!
//! Collects model responses and annotations for a fixed question set and
//! aggregates evaluation documents into a unified comparison table.

use anyhow::{Context, Result};
use boteval::{
    collate::collate,
    config::Config,
    export::{summary_csv, table_csv},
    model::{AnnotationSet, Submission},
    pipeline::{self, CompareOutcome},
    prep::questions_from_yaml,
    store::{BlobStore, FsStore, HubStore},
};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Boteval - evaluation collection and comparison
#[derive(Parser)]
#[command(name = "boteval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use a local directory as the blob store instead of the configured hub
    #[arg(long, global = true)]
    local: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate evaluation documents into a comparison table
    Compare {
        /// Only compare these documents (file stems); default is all
        #[arg(short, long)]
        select: Vec<String>,

        /// Question ids excluded from summary statistics (the table keeps
        /// every row)
        #[arg(short = 'x', long)]
        exclude: Vec<String>,

        /// Write the full comparison table as CSV
        #[arg(long)]
        table: Option<PathBuf>,

        /// Write the summary statistics as CSV
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Write the full report (table, summaries, matrices) as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the inferred schema of each evaluation document
    Schemas {
        /// Only inspect these documents (file stems); default is all
        #[arg(short, long)]
        select: Vec<String>,
    },

    /// Join annotations and responses onto the question list
    Collate {
        /// Output path for the collated JSON; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Upload a set of model responses as an immutable submission
    Submit {
        /// JSON file mapping question id to response text
        responses: PathBuf,

        /// Model that produced the responses
        #[arg(short, long)]
        model: String,

        /// Run identifier
        #[arg(short, long)]
        run_id: String,

        /// Operator name
        #[arg(long, default_value = "unknown")]
        operator: String,
    },

    /// Upload an annotation set
    Annotate {
        /// JSON file mapping question id to {benchmark, quality}
        annotations: PathBuf,

        /// Annotator name
        #[arg(short, long)]
        annotator: String,

        /// Topic the annotations cover
        #[arg(short, long, default_value = "")]
        topic: String,
    },

    /// List the canonical questions
    Questions {
        /// Only questions tagged with this topic
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Convert a YAML qa_pairs file into the canonical question list
    Convert {
        /// Input YAML file
        input: PathBuf,

        /// Output JSON path (defaults to the input stem + .json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Test store connectivity
    Check,
}

/// The store the CLI talks to: the configured hub, or a local directory.
enum AnyStore {
    Hub(HubStore),
    Fs(FsStore),
}

impl BlobStore for AnyStore {
    async fn get(&self, path: &str) -> boteval::Result<Vec<u8>> {
        match self {
            AnyStore::Hub(s) => s.get(path).await,
            AnyStore::Fs(s) => s.get(path).await,
        }
    }

    async fn put(&self, path: &str, bytes: &[u8]) -> boteval::Result<()> {
        match self {
            AnyStore::Hub(s) => s.put(path, bytes).await,
            AnyStore::Fs(s) => s.put(path, bytes).await,
        }
    }

    async fn list(&self, prefix: &str) -> boteval::Result<Vec<String>> {
        match self {
            AnyStore::Hub(s) => s.list(prefix).await,
            AnyStore::Fs(s) => s.list(prefix).await,
        }
    }
}

fn open_store(local: Option<PathBuf>, config: &Config) -> Result<AnyStore> {
    match local {
        Some(dir) => Ok(AnyStore::Fs(FsStore::new(dir))),
        None => {
            config.validate().context("Invalid configuration")?;
            Ok(AnyStore::Hub(HubStore::new(config.store.clone())))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Conversion is purely local; it needs no store or configuration.
    if let Commands::Convert { input, output } = &cli.command {
        return cmd_convert(input.clone(), output.clone());
    }

    let config = Config::load().context("Failed to load configuration")?;
    let store = open_store(cli.local, &config)?;

    match cli.command {
        Commands::Compare {
            select,
            exclude,
            table,
            summary,
            report,
        } => cmd_compare(store, &config, select, exclude, table, summary, report).await,
        Commands::Schemas { select } => cmd_schemas(store, &config, select).await,
        Commands::Collate { output } => cmd_collate(store, &config, output).await,
        Commands::Submit {
            responses,
            model,
            run_id,
            operator,
        } => cmd_submit(store, &config, responses, model, run_id, operator).await,
        Commands::Annotate {
            annotations,
            annotator,
            topic,
        } => cmd_annotate(store, &config, annotations, annotator, topic).await,
        Commands::Questions { topic } => cmd_questions(store, &config, topic).await,
        Commands::Convert { .. } => unreachable!(),
        Commands::Check => cmd_check(store).await,
    }
}

async fn cmd_compare(
    store: AnyStore,
    config: &Config,
    select: Vec<String>,
    exclude: Vec<String>,
    table_path: Option<PathBuf>,
    summary_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let selected = if select.is_empty() {
        None
    } else {
        Some(select.as_slice())
    };
    let excluded: BTreeSet<String> = exclude.into_iter().collect();

    println!("Loading evaluation documents from '{}'...", config.paths.compare_dir);

    let outcome = pipeline::compare(&store, &config.paths.compare_dir, selected, &excluded)
        .await
        .context("Comparison failed")?;

    let report = match outcome {
        CompareOutcome::EmptyDocumentSet => {
            println!("No evaluation documents selected; nothing to compare.");
            return Ok(());
        }
        CompareOutcome::NoCommonScoreTypes { schemas, warnings } => {
            println!("No score type is shared by every document; nothing to compare.");
            for (name, schema) in &schemas {
                let types: Vec<&str> = schema.score_types.iter().map(String::as_str).collect();
                println!("  {}: [{}]", name, types.join(", "));
            }
            print_warnings(&warnings);
            return Ok(());
        }
        CompareOutcome::Report(report) => report,
    };

    println!("\n========== Comparison Summary ==========");
    println!("Documents:   {}", report.table.documents.len());
    println!("Questions:   {}", report.table.row_count());
    println!("Score types: {}", report.common_score_types.join(", "));
    if !excluded.is_empty() {
        println!("Excluded {} questions from statistics", excluded.len());
    }
    println!("{}", "-".repeat(40));

    for row in &report.summary.rows {
        println!("{} (evaluator: {})", row.document, row.evaluator);
        for (score_type, stats) in report.summary.score_types.iter().zip(&row.stats) {
            match stats {
                Some(s) => println!(
                    "  {}: Q25: {:.2} | Median: {:.2} | Q75: {:.2} (n={})",
                    score_type, s.q25, s.median, s.q75, s.count
                ),
                None => println!("  {}: no data", score_type),
            }
        }
    }
    println!("{}", "=".repeat(40));

    print_warnings(&report.warnings);

    if let Some(path) = table_path {
        std::fs::write(&path, table_csv(&report.table))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Comparison table saved to {}", path.display());
    }

    if let Some(path) = summary_path {
        std::fs::write(&path, summary_csv(&report.summary))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Summary saved to {}", path.display());
    }

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&*report)?;
        std::fs::write(&path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Full report saved to {}", path.display());
    }

    Ok(())
}

async fn cmd_schemas(store: AnyStore, config: &Config, select: Vec<String>) -> Result<()> {
    let selected = if select.is_empty() {
        None
    } else {
        Some(select.as_slice())
    };

    let loaded = pipeline::load_evaluations(&store, &config.paths.compare_dir, selected)
        .await
        .context("Failed to load evaluation documents")?;

    if loaded.documents.is_empty() {
        println!("No evaluation documents found.");
        print_warnings(&loaded.warnings);
        return Ok(());
    }

    for (name, schema) in &loaded.schemas {
        println!("{}", name);
        println!("  score types:       {}", join_set(&schema.score_types));
        println!("  metadata fields:   {}", join_set(&schema.metadata_fields));
        println!("  evaluation fields: {}", join_set(&schema.evaluation_fields));
    }

    match boteval::schema::common_score_types(&loaded.schemas) {
        Ok(common) => println!("\nCommon score types: {}", join_set(&common)),
        Err(_) => println!("\nCommon score types: (none)"),
    }

    print_warnings(&loaded.warnings);
    Ok(())
}

async fn cmd_collate(store: AnyStore, config: &Config, output: Option<PathBuf>) -> Result<()> {
    let questions = pipeline::load_questions(&store, &config.paths.questions)
        .await
        .context("Failed to load questions")?;
    let annotations = pipeline::load_annotations(&store, &config.paths.annotate_dir)
        .await
        .context("Failed to load annotations")?;
    let submissions = pipeline::load_submissions(&store, &config.paths.gather_dir)
        .await
        .context("Failed to load submissions")?;

    println!(
        "Collating {} questions, {} annotation sets, {} submissions...",
        questions.len(),
        annotations.len(),
        submissions.len()
    );

    let collated = collate(&questions, &annotations, &submissions);
    let json = serde_json::to_string_pretty(&collated)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Collated data saved to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn cmd_submit(
    store: AnyStore,
    config: &Config,
    responses_path: PathBuf,
    model: String,
    run_id: String,
    operator: String,
) -> Result<()> {
    let content = std::fs::read_to_string(&responses_path)
        .with_context(|| format!("Failed to read {}", responses_path.display()))?;
    let responses = serde_json::from_str(&content).context("Responses must be a JSON object")?;

    let submission = Submission {
        timestamp: now_iso(),
        model_name: model,
        run_id,
        operator,
        responses,
    };

    let path = record_path(&config.paths.gather_dir, "submission", &submission.timestamp);
    store
        .put(&path, &serde_json::to_vec_pretty(&submission)?)
        .await
        .context("Upload failed")?;

    println!(
        "Submitted {} responses for {} as {}",
        submission.responses.len(),
        submission.model_name,
        path
    );
    Ok(())
}

async fn cmd_annotate(
    store: AnyStore,
    config: &Config,
    annotations_path: PathBuf,
    annotator: String,
    topic: String,
) -> Result<()> {
    let content = std::fs::read_to_string(&annotations_path)
        .with_context(|| format!("Failed to read {}", annotations_path.display()))?;
    let annotations = serde_json::from_str(&content).context("Annotations must be a JSON object")?;

    let set = AnnotationSet {
        annotator,
        timestamp: now_iso(),
        topic,
        annotations,
    };

    let path = record_path(&config.paths.annotate_dir, "annotation", &set.timestamp);
    store
        .put(&path, &serde_json::to_vec_pretty(&set)?)
        .await
        .context("Upload failed")?;

    println!(
        "Uploaded {} annotations from {} as {}",
        set.annotations.len(),
        set.annotator,
        path
    );
    Ok(())
}

async fn cmd_questions(store: AnyStore, config: &Config, topic: Option<String>) -> Result<()> {
    let questions = pipeline::load_questions(&store, &config.paths.questions)
        .await
        .context("Failed to load questions")?;

    let filtered: Vec<_> = match &topic {
        Some(t) => questions.iter().filter(|q| q.has_topic(t)).collect(),
        None => questions.iter().collect(),
    };

    if filtered.is_empty() {
        println!("No questions found.");
        return Ok(());
    }

    for q in &filtered {
        let topics = if q.topic.is_empty() {
            String::new()
        } else {
            format!(" [{}]", q.topic.join(", "))
        };
        println!("{}: {}{}", q.id, q.question, topics);
    }
    println!("\n{} questions", filtered.len());

    Ok(())
}

fn cmd_convert(input: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let yaml = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let questions = questions_from_yaml(&yaml).context("Failed to convert question YAML")?;

    let output = output.unwrap_or_else(|| input.with_extension("json"));
    std::fs::write(&output, serde_json::to_string_pretty(&questions)?)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Converted {} questions to {}",
        questions.len(),
        output.display()
    );
    Ok(())
}

async fn cmd_check(store: AnyStore) -> Result<()> {
    println!("Checking store connectivity...");

    match store.list("").await {
        Ok(paths) => println!("Store reachable, {} blobs visible.", paths.len()),
        Err(e) => println!("Store check failed: {}", e),
    }

    Ok(())
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("\nWarnings:");
    for warning in warnings {
        println!("  {}", warning);
    }
}

fn join_set(set: &std::collections::BTreeSet<String>) -> String {
    let items: Vec<&str> = set.iter().map(String::as_str).collect();
    items.join(", ")
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Path of a new immutable record blob: timestamped, uuid-suffixed, never
/// overwriting an earlier record.
fn record_path(dir: &str, kind: &str, timestamp: &str) -> String {
    let safe_timestamp = timestamp.replace(':', "-");
    format!("{}/{}-{}-{}.json", dir, kind, safe_timestamp, uuid::Uuid::new_v4())
}
