use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Args, Parser, Subcommand};
use keymark_core::{HighlightColor, HighlightConfig, HighlightRequest, Highlighter, KeywordSet};
use pdf_engine::{default_engine, OpenSource, PdfEngine};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "keymark")]
#[command(about = "Highlight summary keywords in PDF documents")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Highlight keywords in a PDF.
    Highlight {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[command(flatten)]
        keywords: KeywordSource,
        /// Highlight color (yellow, red, blue, green, pink, cyan, purple).
        #[arg(long)]
        color: Option<String>,
        /// Output path. Defaults to `<stem>-highlighted.pdf` next to the input.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the output as a base64 data URL instead of writing a file.
        #[arg(long, conflicts_with_all = ["output", "report"])]
        data_url: bool,
        /// Print a JSON report of what was highlighted.
        #[arg(long)]
        report: bool,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Print the keywords extracted from a summary as JSON.
    Keywords {
        #[command(flatten)]
        summary: SummarySource,
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
    },
    /// Print machine-readable page and annotation counts.
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct KeywordSource {
    /// Summary text to extract keywords from.
    #[arg(long)]
    summary: Option<String>,
    /// File containing the summary text.
    #[arg(long, value_name = "PATH")]
    summary_file: Option<PathBuf>,
    /// Keyword to highlight as given; repeatable.
    #[arg(long = "keyword", value_name = "KEYWORD")]
    keywords: Vec<String>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
struct SummarySource {
    #[arg(long)]
    summary: Option<String>,
    #[arg(long, value_name = "PATH")]
    summary_file: Option<PathBuf>,
}

impl SummarySource {
    fn read(&self) -> Result<String> {
        match (&self.summary, &self.summary_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => {
                fs::read_to_string(path)
                    .with_context(|| format!("failed to read summary from {}", path.display()))
            }
            (None, None) => Ok(String::new()),
        }
    }
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page: u32,
    width: f32,
    height: f32,
    annotations: usize,
    highlights: usize,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Highlight { file, keywords, color, output, data_url, report, config } => {
            let options = HighlightOptions { color, output, data_url, report, config };
            run_highlight(&file, keywords, options)
        }
        Commands::Keywords { summary, config } => run_keywords(&summary, config.as_deref()),
        Commands::Inspect { file } => run_inspect(&file),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

struct HighlightOptions {
    color: Option<String>,
    output: Option<PathBuf>,
    data_url: bool,
    report: bool,
    config: Option<PathBuf>,
}

fn run_highlight(file: &Path, source: KeywordSource, options: HighlightOptions) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut config = HighlightConfig::load(options.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(color) = &options.color {
        config.color = HighlightColor::resolve(color);
    }

    let keywords = if source.keywords.is_empty() {
        let summary_source =
            SummarySource { summary: source.summary, summary_file: source.summary_file };
        let summary = summary_source.read()?;
        config.extractor().extract(&summary)
    } else {
        normalize_keywords(&source.keywords)
    };

    if keywords.is_empty() {
        eprintln!("no keywords found in summary; nothing to highlight");
        return Ok(());
    }

    let document = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let outcome = Highlighter::new()
        .case_sensitive(config.case_sensitive)
        .run(HighlightRequest::new(document, keywords, config.color))
        .context("failed to highlight PDF")?;

    if options.data_url {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&outcome.document);
        println!("data:application/pdf;base64,{encoded}");
    } else {
        let output = options.output.unwrap_or_else(|| default_highlight_output(file));
        if let Some(parent) = output.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output, &outcome.document)
            .with_context(|| format!("failed to write PDF to {}", output.display()))?;

        if !options.report {
            println!("{}", output.display());
        }
    }

    if options.report {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    }

    Ok(())
}

fn run_keywords(summary: &SummarySource, config: Option<&Path>) -> Result<()> {
    let config = HighlightConfig::load(config).context("failed to load configuration")?;
    let keywords = config.extractor().extract(&summary.read()?);

    println!("{}", serde_json::to_string_pretty(&keywords)?);
    Ok(())
}

fn run_inspect(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let document = engine.open_scoped(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = document.page_count()?;
    let mut pages = Vec::with_capacity(page_count as usize);
    for page_index in 0..page_count {
        let size = document.page_size(page_index)?;
        let annotations = document.annotations(page_index)?;
        pages.push(PageOutput {
            page: page_index + 1,
            width: size.width_pt,
            height: size.height_pt,
            annotations: annotations.len(),
            highlights: annotations
                .iter()
                .filter(|annotation| annotation.kind.is_highlight())
                .count(),
        });
    }

    let json = serde_json::to_string_pretty(&InspectOutput { page_count, pages })?;
    println!("{json}");

    Ok(())
}

fn normalize_keywords(keywords: &[String]) -> KeywordSet {
    keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect()
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_highlight_output(file: &Path) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("document");

    file.with_file_name(format!("{stem}-highlighted.pdf"))
}
