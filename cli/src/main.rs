//! docex CLI - confidence-scored PDF and DOCX extraction

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use peak_alloc::PeakAlloc;

use docex::batch::{collect_inputs, BatchRecord, JsonDirSink, RecordSink};
use docex::evaluate::{evaluate_dir, PASS_THRESHOLD};
use docex::{render, Docex, JsonFormat, OcrOptions};

#[global_allocator]
static PEAK_ALLOC: PeakAlloc = PeakAlloc;

#[derive(Parser)]
#[command(name = "docex")]
#[command(version)]
#[command(about = "Extract text and tables from PDF and DOCX with confidence scores", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Directory relative input paths are resolved against
    #[arg(long, global = true, env = "DOCEX_BASE_DIR", value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Rasterizer program used for OCR
    #[arg(long, global = true, env = "DOCEX_PDFTOPPM", default_value = "pdftoppm")]
    pdftoppm: PathBuf,

    /// OCR program
    #[arg(long, global = true, env = "DOCEX_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// OCR language (e.g. "eng", "eng+deu")
    #[arg(long, global = true, env = "DOCEX_OCR_LANG")]
    ocr_lang: Option<String>,

    /// Rasterization resolution for OCR
    #[arg(long, global = true, env = "DOCEX_OCR_DPI", default_value = "150")]
    dpi: u32,
}

impl GlobalArgs {
    fn docex(&self) -> Docex {
        let mut ocr = OcrOptions::new()
            .with_pdftoppm(&self.pdftoppm)
            .with_tesseract(&self.tesseract)
            .with_dpi(self.dpi);
        if let Some(lang) = &self.ocr_lang {
            ocr = ocr.with_language(lang);
        }

        let mut docex = Docex::new().with_ocr(ocr);
        if let Some(dir) = &self.base_dir {
            docex = docex.with_base_dir(dir);
        }
        docex
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one PDF or DOCX file to JSON
    Extract {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Extract every PDF and DOCX in a directory and its category folders
    Batch {
        /// Input directory
        #[arg(value_name = "INPUT_DIR")]
        input: PathBuf,

        /// Directory for the JSON records
        #[arg(short, long, value_name = "DIR", default_value = "output")]
        output: PathBuf,

        /// Worker threads
        #[arg(long, default_value = "4")]
        workers: usize,

        /// Per-file timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,
    },

    /// Score stored JSON records against ground-truth text files
    Evaluate {
        /// Directory of JSON records written by `batch`
        #[arg(value_name = "RECORDS_DIR")]
        records: PathBuf,

        /// Directory of `<document stem>.txt` ground-truth files
        #[arg(value_name = "GROUND_TRUTH_DIR")]
        ground_truth: PathBuf,

        /// Average accuracy needed to pass
        #[arg(long, default_value_t = PASS_THRESHOLD)]
        threshold: f64,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();
    docex::instrument::install_allocator(&PEAK_ALLOC);

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            input,
            output,
            compact,
        } => cmd_extract(&cli.global, &input, output.as_deref(), compact),
        Commands::Batch {
            input,
            output,
            workers,
            timeout,
        } => cmd_batch(&cli.global, &input, &output, workers, timeout),
        Commands::Evaluate {
            records,
            ground_truth,
            threshold,
        } => cmd_evaluate(&records, &ground_truth, threshold),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_extract(
    global: &GlobalArgs,
    input: &Path,
    output: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = global.docex().extract(input)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };
    let json = render::to_json(&outcome, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    if let Some(err) = outcome.error() {
        eprintln!("{} [{}] {}", "Failed".yellow().bold(), err.stage, err.message);
    }

    Ok(())
}

fn cmd_batch(
    global: &GlobalArgs,
    input: &Path,
    output: &Path,
    workers: usize,
    timeout: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let inputs = collect_inputs(input)?;
    log::debug!("found {} inputs under {}", inputs.len(), input.display());
    if inputs.is_empty() {
        println!("{} {}", "No PDF or DOCX files in".yellow(), input.display());
        return Ok(());
    }

    let runner = global
        .docex()
        .with_workers(workers)
        .with_timeout(Duration::from_secs(timeout))
        .batch_runner();

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut json_sink = JsonDirSink::new(output)?;
    let mut sink = |record: &BatchRecord| -> docex::Result<()> {
        json_sink.accept(record)?;
        if let Some(err) = record.outcome.error() {
            pb.println(format!(
                "{} {} [{}] {}",
                "✗".red(),
                record.file_name,
                err.stage,
                err.message
            ));
        }
        pb.set_message(record.file_name.clone());
        pb.inc(1);
        Ok(())
    };

    let report = runner.run(inputs, &mut sink)?;
    pb.finish_with_message("Done!");

    let summary = report.summary;
    println!("\n{}", "Summary".cyan().bold());
    println!("  {}: {}", "Files".bold(), summary.total);
    println!("  {}: {}", "Succeeded".bold(), summary.succeeded.to_string().green());
    println!("  {}: {}", "Failed".bold(), summary.failed.to_string().red());
    println!("  {}: {}", "Timed out".bold(), summary.timed_out);
    println!(
        "  {}: {:.1}s",
        "Elapsed".bold(),
        (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0
    );
    println!("  {}: {}", "Records".bold(), output.display());

    Ok(())
}

fn cmd_evaluate(
    records: &Path,
    ground_truth: &Path,
    threshold: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = evaluate_dir(records, ground_truth)?;

    for name in &report.missing {
        println!("{} {}", "No ground truth for".yellow(), name);
    }
    for score in &report.scores {
        println!("  {}: {:.2}%", score.file_name, score.accuracy * 100.0);
    }

    let average = match report.average() {
        Some(average) => average,
        None => return Err("No matching ground truth files found".into()),
    };

    println!("\n{}", "Accuracy".cyan().bold());
    println!("  {}: {}", "Files".bold(), report.scores.len());
    println!("  {}: {:.2}%", "Average".bold(), average * 100.0);
    println!("  {}: {:.2}%", "Threshold".bold(), threshold * 100.0);

    if report.passed(threshold) {
        println!("  {}", "PASS".green().bold());
        Ok(())
    } else {
        println!("  {}", "FAIL".red().bold());
        Err(format!(
            "average accuracy {:.2}% is below {:.2}%",
            average * 100.0,
            threshold * 100.0
        )
        .into())
    }
}

fn cmd_version() {
    println!("{} {}", "docex".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF and DOCX extraction with page-level OCR escalation");
    println!();
    println!("License: MIT");
}
