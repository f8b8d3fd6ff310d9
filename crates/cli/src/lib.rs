use annotmerge_core::{
    extract_document, import_records_file, import_xfdf_file, load_records, merge_files,
    open_document, with_document, MergeStats, Settings,
};
use annotmerge_model::AnnotationRecord;
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand};
use pdf_engine::{default_engine, PdfEngine};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "annotmerge", version)]
#[command(about = "Merge and import PDF annotations")]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Merge the annotations of several copies of a PDF into one file.
    Merge {
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
        /// The first input is the base document.
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,
        /// Print the merge statistics as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Import annotations from an XFDF file or a JSON record list (`.json`).
    Import {
        #[arg(value_name = "INPUT_PDF")]
        input: PathBuf,
        #[arg(value_name = "ANNOTATIONS")]
        annotations: PathBuf,
        #[arg(value_name = "OUTPUT_PDF")]
        output: PathBuf,
    },
    /// Print machine-readable PDF and annotation metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Include every extracted annotation record.
        #[arg(long)]
        annotations: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    annotation_count: usize,
    by_kind: BTreeMap<&'static str, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotations: Option<Vec<AnnotationRecord>>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.print()?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    init_logging(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Merge { output, inputs, json } => {
            run_merge(&output, &inputs, json, &load_settings(config)?)
        }
        Commands::Import { input, annotations, output } => {
            run_import(&input, &annotations, &output, &load_settings(config)?)
        }
        Commands::Info { file, annotations } => {
            run_info(&file, annotations, &load_settings(config)?)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_settings(config: Option<&Path>) -> Result<Settings> {
    Settings::resolve(config).context("failed to load settings")
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A subscriber may already be installed when `run` is called more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_merge(output: &Path, inputs: &[PathBuf], json: bool, settings: &Settings) -> Result<()> {
    let mut engine = default_engine();
    let stats = merge_files(&mut engine, output, inputs, settings).context("merge failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_summary(&stats, output);
    }

    Ok(())
}

fn print_summary(stats: &MergeStats, output: &Path) {
    println!("Files processed: {}", stats.files_processed);
    println!("Base annotations: {}", stats.base_count);
    println!("New annotations merged: {}", stats.merged);
    println!("Duplicates skipped: {}", stats.duplicate);
    if stats.failed > 0 {
        println!("Failed to copy: {}", stats.failed);
    }
    println!("Output: {}", output.display());
}

fn run_import(input: &Path, annotations: &Path, output: &Path, settings: &Settings) -> Result<()> {
    ensure_file_exists(input)?;
    ensure_file_exists(annotations)?;

    let mut engine = default_engine();
    let report = if is_json(annotations) {
        let records = load_records(annotations)?;
        import_records_file(&mut engine, input, &records, output, settings)
    } else {
        import_xfdf_file(&mut engine, input, annotations, output, settings)
    }
    .context("import failed")?;

    println!("Imported {} annotation(s) to {}", report.imported, output.display());
    Ok(())
}

fn run_info(file: &Path, include_annotations: bool, settings: &Settings) -> Result<()> {
    ensure_file_exists(file)?;

    let mut engine = default_engine();
    let handle =
        open_document(&mut engine, file, settings.repair_inputs).context("failed to open PDF")?;

    let (page_count, records) = with_document(&mut engine, handle, |engine, handle| {
        anyhow::Ok((engine.page_count(handle)?, extract_document(engine, handle)?))
    })?;

    let mut by_kind = BTreeMap::new();
    for record in &records {
        *by_kind.entry(record.kind().as_str()).or_insert(0) += 1;
    }

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count,
        annotation_count: records.len(),
        by_kind,
        annotations: include_annotations.then_some(records),
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}
