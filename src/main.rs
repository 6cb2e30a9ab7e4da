//! RAG Eval CLI
//!
//! Ingest documents, answer ground-truth questions with and without retrieval,
//! judge the answers and aggregate the verdicts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rag_eval::{
    baseline::{DocumentBaseline, ask_plain},
    chunker::ChunkConfig,
    config::Config,
    document::Document,
    embedder::Embedder,
    eval::{
        GroundTruthGenerator, JudgeVariant, LlmJudge, compare, evaluate_hit_rate, load_answers,
        load_ground_truth, load_human_labels, load_judged, right_chunks_wrong_answer, summarize,
    },
    eval::agreement::interpret_kappa,
    eval::dataset::take_items,
    ingest::{IngestOptions, Ingestor},
    inspect::{ChunkLengthStats, find_with_terms, is_running_text, point_texts},
    llm::LlmClient,
    persistence::{results_path_for_k, save_json},
    retrieve::RagPipeline,
    store::QdrantStore,
};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// RAG Eval - run and score Retrieval-Augmented Generation experiments
#[derive(Parser)]
#[command(name = "rag-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Variant {
    /// Correctness, hallucination and source drift
    Standard,
    /// Also judge whether the retrieved chunks held the answer
    WithChunks,
}

impl From<Variant> for JudgeVariant {
    fn from(v: Variant) -> Self {
        match v {
            Variant::Standard => JudgeVariant::Standard,
            Variant::WithChunks => JudgeVariant::WithChunks,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a PDF, or every PDF under a directory, into a collection
    Ingest {
        /// PDF file or directory
        path: PathBuf,

        /// Target collection (defaults to the configured one)
        #[arg(short, long)]
        collection: Option<String>,

        /// Drop and recreate the collection first
        #[arg(long)]
        recreate: bool,

        /// Maximum characters per chunk
        #[arg(long)]
        max_chars: Option<usize>,

        /// Characters repeated between consecutive chunks of a page
        #[arg(long, default_value_t = 0)]
        overlap: usize,

        /// Value of the `source` payload field (defaults to the file name)
        #[arg(long)]
        source: Option<String>,

        /// Mark documents as synthetic conflict documents, numbered 1..n
        #[arg(long)]
        conflict: bool,

        /// Extra payload entries as key=value (value parsed as JSON when possible)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,
    },

    /// Generate ground-truth questions from an ingested collection
    GroundTruth {
        /// Document name recorded as the source of every question
        #[arg(short, long)]
        document: String,

        /// Number of questions
        #[arg(short = 'n', long, default_value_t = 50)]
        count: usize,

        /// Collection to sample from
        #[arg(short, long)]
        collection: Option<String>,

        /// Output path
        #[arg(short, long, default_value = "data/ground_truth.json")]
        output: PathBuf,
    },

    /// Answer ground-truth questions with retrieval, one results file per k
    Answer {
        /// Ground-truth file
        #[arg(short, long, default_value = "data/ground_truth.json")]
        ground_truth: PathBuf,

        /// Retrieval depths (defaults to the configured list)
        #[arg(short, long)]
        k: Vec<usize>,

        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,

        /// Output directory
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,

        /// Results file prefix
        #[arg(long, default_value = "results")]
        prefix: String,

        /// Search with the question as-is
        #[arg(long)]
        no_rewrite: bool,

        /// Maximum questions to answer (for quick testing)
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Answer ground-truth questions from the whole document, without retrieval
    Baseline {
        /// Ground-truth file
        #[arg(short, long, default_value = "data/ground_truth.json")]
        ground_truth: PathBuf,

        /// Document placed in the prompt
        #[arg(short, long)]
        document: PathBuf,

        /// Output path
        #[arg(short, long, default_value = "data/baseline_no_rag.json")]
        output: PathBuf,

        /// Maximum questions to answer (for quick testing)
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Ask a single question
    Ask {
        /// The question
        question: String,

        /// Number of chunks to retrieve
        #[arg(short, long, default_value_t = 5)]
        k: usize,

        /// Ask the model directly, without retrieval
        #[arg(long)]
        no_rag: bool,

        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Judge RAG answers for correctness, hallucination and source drift
    Judge {
        /// Ground-truth file
        #[arg(short, long, default_value = "data/ground_truth.json")]
        ground_truth: PathBuf,

        /// Results file to judge
        #[arg(short, long)]
        results: PathBuf,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,

        /// Judge prompt
        #[arg(long, value_enum, default_value_t = Variant::Standard)]
        variant: Variant,

        /// Record failed judge calls instead of aborting
        #[arg(long)]
        keep_going: bool,
    },

    /// Judge baseline answers for correctness and hallucination
    JudgeBaseline {
        /// Ground-truth file
        #[arg(short, long, default_value = "data/ground_truth.json")]
        ground_truth: PathBuf,

        /// Baseline results file
        #[arg(short, long, default_value = "data/baseline_no_rag.json")]
        results: PathBuf,

        /// Output path
        #[arg(short, long, default_value = "data/judged_no_rag.json")]
        output: PathBuf,
    },

    /// Compute the retrieval hit rate of a results file
    HitRate {
        /// Ground-truth file
        #[arg(short, long, default_value = "data/ground_truth.json")]
        ground_truth: PathBuf,

        /// Results file
        #[arg(short, long)]
        results: PathBuf,

        /// Name of the ground-truth document as stored in chunk sources
        #[arg(long)]
        gt_document: String,

        /// Detailed report path
        #[arg(short, long)]
        output: PathBuf,

        /// Summary path (defaults to the report path with a `_summary` suffix)
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Print verdict percentages and combinations of a judged file
    Summarize {
        /// Judged file
        judged: PathBuf,
    },

    /// List answers judged wrong although the retrieved chunks were right
    Errors {
        /// Judged file (with-chunks variant)
        judged: PathBuf,

        /// Write the cases to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare human labels with judge verdicts
    Agreement {
        /// Human-label CSV (question id, label)
        #[arg(short, long)]
        labels: PathBuf,

        /// Judged file
        #[arg(short, long)]
        judged: PathBuf,

        /// Verdict field to compare
        #[arg(short, long, default_value = "correctness")]
        metric: String,
    },

    /// Answer, judge and summarize for every k in one go
    Pipeline {
        /// Ground-truth file
        #[arg(short, long, default_value = "data/ground_truth.json")]
        ground_truth: PathBuf,

        /// Retrieval depths (defaults to the configured list)
        #[arg(short, long)]
        k: Vec<usize>,

        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,

        /// Output directory
        #[arg(long, default_value = "data")]
        out_dir: PathBuf,

        /// Judge prompt
        #[arg(long, value_enum, default_value_t = Variant::Standard)]
        variant: Variant,

        /// Record failed judge calls instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Maximum questions to answer (for quick testing)
        #[arg(long)]
        max_items: Option<usize>,
    },

    /// Show chunk statistics of a collection
    Stats {
        /// Collection to inspect
        #[arg(short, long)]
        collection: Option<String>,

        /// Length under which a chunk counts as short
        #[arg(long, default_value_t = 100)]
        short: usize,
    },

    /// Print chunks that contain every given term
    Grep {
        /// Terms to look for (case-insensitive)
        #[arg(required = true)]
        terms: Vec<String>,

        /// Collection to search
        #[arg(short, long)]
        collection: Option<String>,

        /// Only show chunks that read as running text
        #[arg(long)]
        running_text: bool,
    },

    /// Test LLM, embedding and vector store connections
    Test,
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rag_eval={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Ingest {
            path,
            collection,
            recreate,
            max_chars,
            overlap,
            source,
            conflict,
            metadata,
        } => {
            cmd_ingest(
                path, collection, recreate, max_chars, overlap, source, conflict, metadata,
            )
            .await
        }
        Commands::GroundTruth {
            document,
            count,
            collection,
            output,
        } => cmd_ground_truth(document, count, collection, output).await,
        Commands::Answer {
            ground_truth,
            k,
            collection,
            out_dir,
            prefix,
            no_rewrite,
            max_items,
        } => {
            let config = load_config()?;
            let k_values = k_values_or_default(k, &config);
            cmd_answer(
                &config,
                &ground_truth,
                &k_values,
                collection,
                &out_dir,
                &prefix,
                no_rewrite,
                max_items,
            )
            .await
            .map(|_| ())
        }
        Commands::Baseline {
            ground_truth,
            document,
            output,
            max_items,
        } => cmd_baseline(ground_truth, document, output, max_items).await,
        Commands::Ask {
            question,
            k,
            no_rag,
            collection,
        } => cmd_ask(question, k, no_rag, collection).await,
        Commands::Judge {
            ground_truth,
            results,
            output,
            variant,
            keep_going,
        } => {
            let config = load_config()?;
            cmd_judge(&config, &ground_truth, &results, &output, variant.into(), keep_going).await
        }
        Commands::JudgeBaseline {
            ground_truth,
            results,
            output,
        } => cmd_judge_baseline(ground_truth, results, output).await,
        Commands::HitRate {
            ground_truth,
            results,
            gt_document,
            output,
            summary,
        } => cmd_hit_rate(ground_truth, results, gt_document, output, summary).await,
        Commands::Summarize { judged } => cmd_summarize(&judged),
        Commands::Errors { judged, output } => cmd_errors(judged, output),
        Commands::Agreement {
            labels,
            judged,
            metric,
        } => cmd_agreement(labels, judged, metric),
        Commands::Pipeline {
            ground_truth,
            k,
            collection,
            out_dir,
            variant,
            keep_going,
            max_items,
        } => {
            cmd_pipeline(
                ground_truth,
                k,
                collection,
                out_dir,
                variant.into(),
                keep_going,
                max_items,
            )
            .await
        }
        Commands::Stats { collection, short } => cmd_stats(collection, short).await,
        Commands::Grep {
            terms,
            collection,
            running_text,
        } => cmd_grep(terms, collection, running_text).await,
        Commands::Test => cmd_test().await,
    }
}

fn load_config() -> Result<Config> {
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn k_values_or_default(k: Vec<usize>, config: &Config) -> Vec<usize> {
    if k.is_empty() {
        config.eval.k_values.clone()
    } else {
        k
    }
}

fn parse_metadata(entries: &[String]) -> Result<Map<String, Value>> {
    let mut metadata = Map::new();
    for entry in entries {
        let (key, raw) = entry
            .split_once('=')
            .with_context(|| format!("Metadata entry '{}' is not KEY=VALUE", entry))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        metadata.insert(key.trim().to_string(), value);
    }
    Ok(metadata)
}

fn rag_pipeline(config: &Config, collection: Option<String>) -> RagPipeline {
    RagPipeline::new(
        LlmClient::new(config.llm.clone()),
        Embedder::new(config.embedding.clone()),
        QdrantStore::new(&config.qdrant),
        collection.unwrap_or_else(|| config.qdrant.collection.clone()),
        config.qdrant.vector_name.clone(),
    )
}

fn summary_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("hit_rate");
    output.with_file_name(format!("{}_summary.json", stem))
}

async fn cmd_ingest(
    path: PathBuf,
    collection: Option<String>,
    recreate: bool,
    max_chars: Option<usize>,
    overlap: usize,
    source: Option<String>,
    conflict: bool,
    metadata: Vec<String>,
) -> Result<()> {
    println!("Loading configuration...");
    let config = load_config()?;

    let mut options = IngestOptions::new(
        collection.unwrap_or_else(|| config.qdrant.collection.clone()),
        config.qdrant.vector_name.clone(),
    );
    options.chunk_config = ChunkConfig {
        max_chars: max_chars.unwrap_or(config.eval.chunk_max_chars),
        overlap,
    };
    options.recreate = recreate;
    options.source = source;
    options.conflict = conflict;
    options.metadata = parse_metadata(&metadata)?;

    println!("Ingesting: {}", path.display());
    println!("Collection: {}", options.collection);
    println!("Embedding model: {}", config.embedding.model);

    let start = Instant::now();
    let ingestor = Ingestor::new(
        Embedder::new(config.embedding.clone()),
        QdrantStore::new(&config.qdrant),
    );
    let report = ingestor
        .ingest_path(&path, &options)
        .await
        .context("Ingestion failed")?;

    println!("\nIngestion complete:");
    for doc in &report.documents {
        println!(
            "  {} ({} pages, {} chunks, source '{}')",
            doc.path.display(),
            doc.pages,
            doc.chunks,
            doc.source
        );
    }
    println!("  Collection created: {}", report.created_collection);
    println!("  Total chunks:       {}", report.total_chunks());
    println!("  Time:               {:.2?}", start.elapsed());

    Ok(())
}

async fn cmd_ground_truth(
    document: String,
    count: usize,
    collection: Option<String>,
    output: PathBuf,
) -> Result<()> {
    let config = load_config()?;
    let collection = collection.unwrap_or_else(|| config.qdrant.collection.clone());

    println!("Generating {} questions from '{}'...", count, collection);
    let generator = GroundTruthGenerator::new(
        LlmClient::new(config.judge_llm()),
        QdrantStore::new(&config.qdrant),
    );
    let items = generator
        .generate(&collection, &document, count)
        .await
        .context("Ground-truth generation failed")?;

    save_json(&items, &output).context("Failed to save ground truth")?;
    println!("Generated {} ground-truth questions saved to {}", items.len(), output.display());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_answer(
    config: &Config,
    ground_truth: &Path,
    k_values: &[usize],
    collection: Option<String>,
    out_dir: &Path,
    prefix: &str,
    no_rewrite: bool,
    max_items: Option<usize>,
) -> Result<Vec<(usize, PathBuf)>> {
    let items = load_ground_truth(ground_truth).context("Failed to load ground truth")?;
    let items = take_items(items, max_items);

    let mut pipeline = rag_pipeline(config, collection);
    if no_rewrite {
        pipeline = pipeline.without_rewrite();
    }

    println!("Answering {} questions for k = {:?}", items.len(), k_values);
    println!("Using model: {}", config.llm.model);

    let mut written = Vec::with_capacity(k_values.len());
    for &k in k_values {
        let start = Instant::now();
        let records = pipeline
            .answer_all(&items, k)
            .await
            .with_context(|| format!("Answering failed for k={}", k))?;

        let path = results_path_for_k(out_dir, prefix, k);
        save_json(&records, &path).context("Failed to save results")?;
        println!(
            "  k={:<3} {} answers -> {} ({:.2?})",
            k,
            records.len(),
            path.display(),
            start.elapsed()
        );
        written.push((k, path));
    }

    Ok(written)
}

async fn cmd_baseline(
    ground_truth: PathBuf,
    document: PathBuf,
    output: PathBuf,
    max_items: Option<usize>,
) -> Result<()> {
    let config = load_config()?;
    let items = take_items(
        load_ground_truth(&ground_truth).context("Failed to load ground truth")?,
        max_items,
    );
    let doc = Document::load(&document).context("Failed to load document")?;

    println!(
        "Answering {} questions from {} ({} pages, {} chars) without retrieval",
        items.len(),
        doc.name,
        doc.page_count(),
        doc.char_count()
    );

    let baseline = DocumentBaseline::new(LlmClient::new(config.llm), &doc);
    let records = baseline
        .answer_all(&items)
        .await
        .context("Baseline answering failed")?;

    save_json(&records, &output).context("Failed to save baseline results")?;
    println!("Saved {} baseline answers to {}", records.len(), output.display());

    Ok(())
}

async fn cmd_ask(
    question: String,
    k: usize,
    no_rag: bool,
    collection: Option<String>,
) -> Result<()> {
    let config = load_config()?;

    if no_rag {
        let answer = ask_plain(&LlmClient::new(config.llm), &question)
            .await
            .context("Question failed")?;
        println!("{}", answer);
        return Ok(());
    }

    let pipeline = rag_pipeline(&config, collection);
    let answer = pipeline.answer(&question, k).await.context("Question failed")?;

    println!("Search query: {}", answer.search_query);
    println!("{}", "─".repeat(60));
    println!("{}", answer.generated_answer);
    println!("{}", "─".repeat(60));
    println!("Retrieved chunks:");
    for (i, chunk) in answer.chunks.iter().enumerate() {
        println!(
            "{:>2}. [{} p.{}] {}",
            i + 1,
            chunk.source.as_deref().unwrap_or("unknown"),
            chunk.page.as_ref().map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
            chunk.preview()
        );
    }

    Ok(())
}

async fn cmd_judge(
    config: &Config,
    ground_truth: &Path,
    results: &Path,
    output: &Path,
    variant: JudgeVariant,
    keep_going: bool,
) -> Result<()> {
    let items = load_ground_truth(ground_truth).context("Failed to load ground truth")?;
    let records = load_answers(results).context("Failed to load results")?;

    let judge = LlmJudge::from_config(config.judge_llm()).with_variant(variant);
    println!("Judging {} with {}", results.display(), judge.model());

    let verdicts = judge
        .judge_rag_run(&items, &records, keep_going)
        .await
        .context("Judging failed")?;

    save_json(&verdicts, output).context("Failed to save judgments")?;
    println!("Saved {} judgments to {}", verdicts.len(), output.display());

    Ok(())
}

async fn cmd_judge_baseline(
    ground_truth: PathBuf,
    results: PathBuf,
    output: PathBuf,
) -> Result<()> {
    let config = load_config()?;
    let items = load_ground_truth(&ground_truth).context("Failed to load ground truth")?;
    let records = load_answers(&results).context("Failed to load baseline results")?;

    let judge = LlmJudge::from_config(config.judge_llm());
    println!("Judging baseline {} with {}", results.display(), judge.model());

    let report = judge
        .judge_no_rag_run(
            &items,
            &records,
            &ground_truth.display().to_string(),
            &results.display().to_string(),
        )
        .await;

    let failed = report.results.iter().filter(|r| r.error.is_some()).count();
    save_json(&report, &output).context("Failed to save judgments")?;
    println!(
        "Saved {} judgments ({} errors) to {}",
        report.results.len(),
        failed,
        output.display()
    );

    Ok(())
}

async fn cmd_hit_rate(
    ground_truth: PathBuf,
    results: PathBuf,
    gt_document: String,
    output: PathBuf,
    summary: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;
    let items = load_ground_truth(&ground_truth).context("Failed to load ground truth")?;
    let records = load_answers(&results).context("Failed to load results")?;

    let judge = LlmJudge::from_config(config.judge_llm());
    let report = evaluate_hit_rate(&judge, &items, &records, &gt_document, &results, &ground_truth)
        .await
        .context("Hit-rate evaluation failed")?;

    let summary_path = summary.unwrap_or_else(|| summary_path_for(&output));
    save_json(&report, &output).context("Failed to save hit-rate report")?;
    save_json(&report.summary(), &summary_path).context("Failed to save hit-rate summary")?;

    report.print_summary();
    println!("Report:  {}", output.display());
    println!("Summary: {}", summary_path.display());

    Ok(())
}

fn cmd_summarize(judged: &Path) -> Result<()> {
    let records = load_judged(judged).context("Failed to load judged file")?;
    println!("File: {}", judged.display());
    summarize(&records).print_summary();
    Ok(())
}

fn cmd_errors(judged: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let records = load_judged(&judged).context("Failed to load judged file")?;
    let cases = right_chunks_wrong_answer(&records);

    println!("Questions with correct chunks but a wrong answer: {}", cases.len());
    for case in &cases {
        match &case.justification {
            Some(reason) => println!("  {}: {}", case.question_id, reason),
            None => println!("  {}", case.question_id),
        }
    }

    if let Some(output) = output {
        save_json(&cases, &output).context("Failed to save cases")?;
        println!("Saved to {}", output.display());
    }

    Ok(())
}

fn cmd_agreement(labels: PathBuf, judged: PathBuf, metric: String) -> Result<()> {
    let human = load_human_labels(&labels).context("Failed to load human labels")?;
    let records = load_judged(&judged).context("Failed to load judged file")?;

    let report = compare(&human, &records, &metric);
    report.print_summary();
    if let Some(kappa) = report.kappa {
        println!("Interpretation: {}", interpret_kappa(kappa));
    }

    Ok(())
}

async fn cmd_pipeline(
    ground_truth: PathBuf,
    k: Vec<usize>,
    collection: Option<String>,
    out_dir: PathBuf,
    variant: JudgeVariant,
    keep_going: bool,
    max_items: Option<usize>,
) -> Result<()> {
    let config = load_config()?;
    let k_values = k_values_or_default(k, &config);
    let start = Instant::now();

    let results = cmd_answer(
        &config,
        &ground_truth,
        &k_values,
        collection,
        &out_dir,
        "results",
        false,
        max_items,
    )
    .await?;

    for (k, results_path) in results {
        let judged_path = results_path_for_k(&out_dir, "judged", k);
        cmd_judge(&config, &ground_truth, &results_path, &judged_path, variant, keep_going).await?;
        cmd_summarize(&judged_path)?;
    }

    println!("\nPipeline finished in {:.2?}", start.elapsed());
    Ok(())
}

async fn cmd_stats(collection: Option<String>, short: usize) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let collection = collection.unwrap_or_else(|| config.qdrant.collection.clone());
    let store = QdrantStore::new(&config.qdrant);

    let total = store.count(&collection).await.context("Failed to count points")?;
    let points = store.scroll_all(&collection, 256).await.context("Failed to scroll collection")?;
    let texts = point_texts(&points);

    println!("Collection: {}", collection);
    println!("Total chunks:      {}", total);
    match ChunkLengthStats::from_texts(texts.iter().copied(), short) {
        Some(stats) => stats.print_summary(),
        None => println!("No chunks with text."),
    }
    println!(
        "Running text:      {}",
        texts.iter().filter(|t| is_running_text(t)).count()
    );

    Ok(())
}

async fn cmd_grep(
    terms: Vec<String>,
    collection: Option<String>,
    running_text: bool,
) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let collection = collection.unwrap_or_else(|| config.qdrant.collection.clone());
    let store = QdrantStore::new(&config.qdrant);

    let points = store.scroll_all(&collection, 256).await.context("Failed to scroll collection")?;
    let hits: Vec<_> = find_with_terms(&points, &terms)
        .into_iter()
        .filter(|p| !running_text || is_running_text(p.text().unwrap_or_default()))
        .collect();

    for point in &hits {
        let page = point.page().map(|p| p.to_string()).unwrap_or_else(|| "?".to_string());
        let text: String = point.text().unwrap_or_default().chars().take(1200).collect();
        println!("page {}", page);
        println!("{}", text);
        println!("{}", "=".repeat(60));
    }
    println!("hits {}", hits.len());

    Ok(())
}

async fn cmd_test() -> Result<()> {
    println!("Testing connections...\n");

    let config = Config::load().context("Failed to load configuration")?;

    println!("Configuration:");
    println!("  API Base:        {}", config.llm.api_base);
    println!("  Model:           {}", config.llm.model);
    println!(
        "  API Key:         {}...",
        config.llm.api_key.chars().take(8).collect::<String>()
    );
    println!("  Embedding model: {}", config.embedding.model);
    println!("  Qdrant:          {}", config.qdrant.url);
    println!("  Collection:      {}", config.qdrant.collection);
    println!();

    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Ok(());
    }

    println!("Sending test request...");
    match LlmClient::new(config.llm.clone()).test_connection().await {
        Ok(()) => println!("LLM: connection successful!"),
        Err(e) => println!("LLM: connection failed: {}", e),
    }

    match Embedder::new(config.embedding.clone()).embed("connection test").await {
        Ok(vector) => println!("Embeddings: OK ({} dimensions)", vector.len()),
        Err(e) => println!("Embeddings: failed: {}", e),
    }

    let store = QdrantStore::new(&config.qdrant);
    match store.collection_exists(&config.qdrant.collection).await {
        Ok(true) => match store.count(&config.qdrant.collection).await {
            Ok(count) => println!(
                "Qdrant: collection '{}' has {} points",
                config.qdrant.collection, count
            ),
            Err(e) => println!("Qdrant: count failed: {}", e),
        },
        Ok(false) => println!(
            "Qdrant: reachable, collection '{}' does not exist",
            config.qdrant.collection
        ),
        Err(e) => println!("Qdrant: connection failed: {}", e),
    }

    Ok(())
}
