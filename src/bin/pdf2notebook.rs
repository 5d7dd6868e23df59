//! CLI binary for pdf2notebook.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, shows progress and maps errors to exit codes.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2notebook::config::{validate_scale, DEFAULT_DRAWING_TOOL};
use pdf2notebook::{
    convert, ArchiveFormat, ConversionConfig, ConversionOutput, ConversionProgressCallback,
    NotebookError, PageFailurePolicy, PageFormat, ProgressCallback, SizeVerdict,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar over the split pages plus one log line
/// per failed page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(spinner_style);
        bar.set_prefix("Splitting");
        bar.set_message("Reading PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
    }

    fn on_page_start(&self, page_num: usize, _total_pages: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _page_bytes: u64) {
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(first_line)
        ));
    }

    fn on_archive_written(&self, _path: &Path, _bytes: u64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One PDF into a plain zip bundle named after the file
  pdf2notebook slides.pdf

  # Several PDFs into one .rmdoc with a custom name
  pdf2notebook -d -n "Week 3" -o week3.rmdoc intro.pdf exercises.pdf

  # Tar-packaged .rmn at a larger scale
  pdf2notebook -r -s 1.0 paper.pdf

  # Raster pages through pdfium instead of drawj2d
  pdf2notebook --raster -d scan.pdf

EXIT CODES:
  0  success
  1  usage error, invalid scale, or missing input file
  2  any other failure (rendering, archive, pdfium)

ENVIRONMENT VARIABLES:
  DRAWJ2D            Path to the drawj2d program
  PDFIUM_LIB_PATH    Path to the pdfium shared library
  RUST_LOG           Override the log filter
"#;

/// Build a multi-page notebook archive from one or more PDF files.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2notebook",
    version,
    about = "Build a multi-page notebook archive (.rmdoc / .rmn / .zip) from PDF files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file(s) to convert; pages keep this order.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Output archive path (default: <name>_<timestamp>.<ext>).
    #[arg(short, long, env = "PDF2NOTEBOOK_OUTPUT")]
    output: Option<PathBuf>,

    /// Display name shown on the device (default: first PDF's file name).
    #[arg(short, long, env = "PDF2NOTEBOOK_NAME")]
    name: Option<String>,

    /// Page scale factor (> 0).
    #[arg(short, long, env = "PDF2NOTEBOOK_SCALE", default_value_t = 0.75,
          value_parser = parse_scale, allow_negative_numbers = true)]
    scale: f32,

    /// Produce a tar-packaged .rmn archive.
    #[arg(short = 'r', long, conflicts_with = "rmdoc")]
    rmn: bool,

    /// Produce a zip-packaged .rmdoc archive.
    #[arg(short = 'd', long)]
    rmdoc: bool,

    /// Render pages to PNG with pdfium instead of drawj2d.
    #[arg(long, env = "PDF2NOTEBOOK_RASTER")]
    raster: bool,

    /// Do not generate page thumbnails.
    #[arg(long, env = "PDF2NOTEBOOK_NO_THUMBNAILS")]
    no_thumbnails: bool,

    /// Leave out pages that fail to render instead of aborting.
    #[arg(long, env = "PDF2NOTEBOOK_SKIP_FAILED_PAGES")]
    skip_failed_pages: bool,

    /// drawj2d program to run for each page.
    #[arg(long = "drawj2d", env = "DRAWJ2D", default_value = DEFAULT_DRAWING_TOOL)]
    drawing_tool: PathBuf,

    /// Per-page drawj2d timeout in seconds.
    #[arg(long, env = "PDF2NOTEBOOK_TOOL_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    tool_timeout: u64,

    /// Print the conversion result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDF2NOTEBOOK_NO_PROGRESS")]
    no_progress: bool,

    /// Produce more messages (DEBUG level).
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_scale(s: &str) -> std::result::Result<f32, String> {
    let scale: f32 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    validate_scale(scale).map_err(|e| e.to_string())
}

impl Cli {
    /// `-r` / `-d` win; otherwise the `-o` extension decides; plain zip last.
    fn archive_format(&self) -> ArchiveFormat {
        if self.rmn {
            ArchiveFormat::Rmn
        } else if self.rmdoc {
            ArchiveFormat::Rmdoc
        } else {
            self.output
                .as_deref()
                .and_then(ArchiveFormat::from_path)
                .unwrap_or_default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(1),
            };
        }
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // While the bar is visible only warnings and errors are logged;
    // the bar covers per-page progress.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.verbose;
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress = show_progress.then(CliProgressCallback::new);
    match run(&cli, progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", red("error:"), err);
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<NotebookError>())
                .map(NotebookError::exit_code)
                .unwrap_or(2);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<()> {
    let progress_cb = progress
        .clone()
        .map(|cb| cb as Arc<dyn ConversionProgressCallback>);
    let config = build_config(cli, progress_cb)?;

    let result = convert(cli.inputs.as_slice(), &config).await;
    if result.is_err() {
        // The error is printed by the caller; the spinner must not outlive it.
        if let Some(ref cb) = progress {
            cb.bar.finish_and_clear();
        }
    }
    let output = result.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }
    if !cli.quiet {
        print_summary(&output);
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .scale(cli.scale)
        .archive_format(cli.archive_format())
        .page_format(if cli.raster {
            PageFormat::Raster
        } else {
            PageFormat::Drawing
        })
        .thumbnails(!cli.no_thumbnails)
        .failure_policy(if cli.skip_failed_pages {
            PageFailurePolicy::Skip
        } else {
            PageFailurePolicy::Abort
        })
        .drawing_tool(cli.drawing_tool.clone())
        .tool_timeout_secs(cli.tool_timeout);

    if let Some(ref name) = cli.name {
        builder = builder.display_name(name.clone());
    }
    if let Some(ref path) = cli.output {
        builder = builder.output_path(path.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &ConversionOutput) {
    let stats = &output.stats;
    let mib = output.size.bytes as f64 / (1024.0 * 1024.0);
    eprintln!(
        "{}  {}/{} pages  {}ms  →  {}  {}",
        if stats.skipped_pages == 0 {
            green("✔")
        } else {
            yellow("⚠")
        },
        stats.rendered_pages,
        stats.total_pages,
        stats.total_duration_ms,
        bold(&output.archive_path.display().to_string()),
        dim(&format!("{mib:.2} MB")),
    );
    match output.size.verdict {
        SizeVerdict::Ok => {}
        SizeVerdict::Warn => eprintln!(
            "   {}",
            yellow("close to the 100 MB web-interface limit; transfer might fail")
        ),
        SizeVerdict::Error => eprintln!(
            "   {}",
            red("larger than the 100 MB web-interface limit; transfer will fail")
        ),
    }
}
