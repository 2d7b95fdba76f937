//! CLI binary for pdf-dissect.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `DissectConfig` and prints a summary of the run.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf_dissect::stats::format_bytes;
use pdf_dissect::{
    dissect, inspect, DissectConfig, DissectOutput, DissectProgressCallback, PageSelection,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar that counts pages during extraction and
/// images during description.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
    describing: AtomicBool,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
            describing: AtomicBool::new(false),
        })
    }

    fn activate_bar(&self, total: u64, prefix: &'static str, unit: &str) {
        let style = ProgressStyle::with_template(&format!(
            "{{spinner:.cyan}} {{prefix:.bold}}  [{{bar:42.green/238}}] {{pos:>3}}/{{len}} {unit}  ⏱ {{elapsed_precise}}"
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix(prefix);
        self.bar.reset_eta();
    }
}

impl DissectProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.activate_bar(total_pages as u64, "Extracting", "pages");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_pages} pages…"))
        ));
    }

    fn on_page_extracted(&self, page_num: usize, total_pages: usize, image_count: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total_pages,
            dim(&format!("{image_count:>3} images")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            format!("{}…", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg)
        ));
    }

    fn on_image_described(&self, done: usize, total: usize) {
        if !self.describing.swap(true, Ordering::SeqCst) {
            self.activate_bar(total as u64, "Describing", "images");
        }
        self.bar.set_position(done as u64);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let issues = self.errors.load(Ordering::SeqCst);
        if issues == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} issues)",
                cyan("⚠"),
                bold(&success_count.to_string()),
                total_pages,
                red(&issues.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract everything into ./brochure_dissect/
  pdf-dissect brochure.pdf

  # Choose the output directory and treat images under 128×128 as small
  pdf-dissect report.pdf -o out/ --min-size 128

  # Only pages 3 to 15, no page screenshots
  pdf-dissect --pages 3-15 --no-screenshots thesis.pdf

  # Describe unique images with a vision model
  pdf-dissect --describe --provider openai --model gpt-4.1-mini deck.pdf

  # From a URL
  pdf-dissect https://arxiv.org/pdf/1706.03762 -o attention/

  # Inspect PDF metadata only
  pdf-dissect --inspect-only document.pdf

  # Machine-readable summary
  pdf-dissect --json document.pdf > run.json

OUTPUT:
  <out>/<name>_report.html   browsable report (open directly or serve the dir)
  <out>/<name>_data.json     full extraction dump
  <out>/<name>_pages.json    per-page data, loaded by the report in chunks
  <out>/images/              extracted images and page screenshots

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (for --describe)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Directory containing libpdfium
"#;

/// Extract text, images and screenshots from PDFs into a browsable report.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-dissect",
    version,
    about = "Extract text, images and screenshots from PDFs into a browsable report",
    long_about = "Extract page text, embedded images and page screenshots from a PDF (local file \
or URL), group duplicate and near-duplicate images, separate small UI images from regular ones, \
and write an HTML report with JSON sidecars. Optionally describe unique images with a vision LLM.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output directory. Default: `<name>_dissect` next to the current dir.
    #[arg(short, long, env = "PDF_DISSECT_OUTPUT")]
    output: Option<PathBuf>,

    /// Images with area below SIZE×SIZE pixels are reported as small.
    #[arg(long = "min-size", env = "PDF_DISSECT_MIN_SIZE", default_value_t = 256,
          value_parser = clap::value_parser!(u32).range(1..))]
    min_size: u32,

    /// Skip embedded images narrower or shorter than this many pixels.
    #[arg(long, env = "PDF_DISSECT_MIN_DIMENSION", default_value_t = 10)]
    min_dimension: u32,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF_DISSECT_PAGES", default_value = "all")]
    pages: String,

    /// Do not render page screenshots.
    #[arg(long, env = "PDF_DISSECT_NO_SCREENSHOTS")]
    no_screenshots: bool,

    /// Longest edge of page screenshots in pixels.
    #[arg(long, env = "PDF_DISSECT_SCREENSHOT_PIXELS", default_value_t = 1024)]
    screenshot_pixels: u32,

    /// Pages rendered inline in the report; the rest load on demand.
    #[arg(long, env = "PDF_DISSECT_PAGES_PER_CHUNK", default_value_t = 25)]
    pages_per_chunk: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_DISSECT_PASSWORD")]
    password: Option<String>,

    /// Describe unique regular images with a vision LLM.
    #[arg(long, env = "PDF_DISSECT_DESCRIBE")]
    describe: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Number of concurrent VLM API calls.
    #[arg(short, long, env = "PDF_DISSECT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Path to a text file containing a custom description prompt.
    #[arg(long, env = "PDF_DISSECT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Sampling temperature for descriptions.
    #[arg(long, env = "PDF_DISSECT_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Maximum output tokens per description.
    #[arg(long, env = "PDF_DISSECT_MAX_TOKENS", default_value_t = 512)]
    max_tokens: usize,

    /// Retries per image on LLM failure.
    #[arg(long, env = "PDF_DISSECT_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF_DISSECT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF_DISSECT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the run summary (stats, report paths, errors) as JSON.
    #[arg(long, env = "PDF_DISSECT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF_DISSECT_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF_DISSECT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF_DISSECT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = inspect(&cli.input).await.context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn DissectProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;
    let out_dir = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input));

    // ── Run ──────────────────────────────────────────────────────────────
    let output = dissect(&cli.input, &out_dir, &config)
        .await
        .context("Dissect failed")?;

    if cli.json {
        println!("{}", summary_json(&output).context("Failed to serialise summary")?);
    } else if !cli.quiet {
        print_summary(&output);
    }

    Ok(())
}

/// Map CLI args to `DissectConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DissectConfig> {
    let system_prompt = match cli.system_prompt {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        ),
        None => None,
    };

    let mut builder = DissectConfig::builder()
        .min_image_size(cli.min_size)
        .min_image_dimension(cli.min_dimension)
        .pages(parse_pages(&cli.pages)?)
        .screenshots(!cli.no_screenshots)
        .screenshot_max_pixels(cli.screenshot_pixels)
        .pages_per_chunk(cli.pages_per_chunk)
        .describe_images(cli.describe)
        .concurrency(cli.concurrency)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// `<stem>_dissect` in the current directory.
fn default_output_dir(input: &str) -> PathBuf {
    let last = input.trim_end_matches('/').rsplit('/').next().unwrap_or(input);
    let stem = last
        .strip_suffix(".pdf")
        .or_else(|| last.strip_suffix(".PDF"))
        .unwrap_or(last);
    let stem = if stem.is_empty() { "document" } else { stem };
    PathBuf::from(format!("{stem}_dissect"))
}

fn summary_json(output: &DissectOutput) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&serde_json::json!({
        "filename": output.document.filename,
        "report": output.report,
        "stats": output.stats,
        "errors": output.document.errors,
    }))
}

fn print_summary(output: &DissectOutput) {
    let s = &output.stats;
    let bytes: u64 = output
        .document
        .images
        .iter()
        .map(|i| i.size_bytes)
        .sum();
    eprintln!(
        "   {} images ({})  ·  {} unique  ·  {} duplicates  ·  {} small  ·  {} failed",
        bold(&s.total_images.to_string()),
        dim(&format_bytes(bytes)),
        s.unique_images,
        s.duplicate_images,
        s.small_images,
        s.failed_images,
    );
    if s.described_images > 0 {
        eprintln!("   {} images described", s.described_images);
    }
    eprintln!(
        "{}  {}ms  →  {}",
        if output.document.errors.is_empty() {
            green("✔")
        } else {
            cyan("⚠")
        },
        s.total_duration_ms,
        bold(&output.report.html.display().to_string()),
    );
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}
