use chrono::Local;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use lossprobe::report::{self, ReportRow, Summary};
use lossprobe::{scan, AnalysisResult, Analyzer, Classification, ClassificationOutcome, Config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lossprobe")]
#[command(author, version, about = "Detect upscaled MP3s and lossless files made from lossy sources")]
struct Args {
    /// File or directory to analyze
    path: PathBuf,

    /// Only scan the top level of a directory
    #[arg(long)]
    no_recursive: bool,

    /// Extension to include (repeatable; default: mp3, flac, wav)
    #[arg(short, long = "format", value_name = "EXT")]
    formats: Vec<String>,

    /// Output report file (.csv, .json)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Directory for auto-generated reports
    #[arg(long, default_value = "lossprobe-reports")]
    report_dir: PathBuf,

    /// Don't auto-generate CSV report
    #[arg(long)]
    no_report: bool,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of parallel workers (default: number of CPUs)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Show every file with its feature values
    #[arg(short, long)]
    verbose: bool,

    /// Only show summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match args.config {
        Some(ref path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    if !args.formats.is_empty() {
        config.supported_formats = scan::normalize_formats(&args.formats);
    }

    // Set up thread pool
    if let Some(jobs) = args.jobs {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
            tracing::warn!(error = %e, "Could not size the worker pool");
        }
    }

    let files = match scan::collect_audio_files(&args.path, !args.no_recursive, &config.supported_formats) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if files.is_empty() {
        eprintln!("No audio files found (supported: {})", config.supported_formats.join(", "));
        std::process::exit(1);
    }

    if !args.quiet {
        eprintln!("\x1b[1mLossprobe - Upscale Detector\x1b[0m");
        eprintln!("{}", "─".repeat(70));
        eprintln!("Found {} audio file(s)\n", files.len());
    }

    // Set up progress bar
    let pb = if !args.quiet && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let analyzer = Analyzer::with_config(config);

    let evaluated = analyzer.evaluate_batch_with(&files, |result, _| {
        if let Some(ref pb) = pb {
            pb.inc(1);
            pb.set_message(result.file_name.clone());
        }
    });

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if !args.quiet {
        for (result, outcome) in &evaluated {
            if args.verbose || outcome.classification != Classification::Legitimate {
                print!("{}", render_result(result, outcome, args.verbose));
            }
        }
    }

    let rows: Vec<ReportRow> = evaluated
        .iter()
        .map(|(result, outcome)| ReportRow::new(result, outcome))
        .collect();
    let summary = Summary::from_rows(&rows);

    if !args.quiet {
        print_summary(&summary);
    }

    // Determine report paths
    let mut report_paths = Vec::new();
    if let Some(ref output) = args.output {
        report_paths.push(output.clone());
    } else if !args.no_report {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        report_paths.push(args.report_dir.join(format!("lossprobe_report_{}.csv", timestamp)));
    }
    if let Some(ref json) = args.json {
        report_paths.push(json.clone());
    }

    for path in &report_paths {
        if let Err(e) = report::generate(path, &rows) {
            eprintln!("Failed to write report {}: {}", path.display(), e);
            std::process::exit(1);
        }
        if !args.quiet {
            eprintln!("\x1b[32mReport saved: {}\x1b[0m", path.display());
        }
    }

    if !args.quiet {
        eprintln!("\n\x1b[90mAnalysis complete.\x1b[0m");
    }

    // Exit with appropriate code
    if summary.fake > 0 {
        std::process::exit(2);
    } else if summary.suspicious > 0 {
        std::process::exit(1);
    }
}

/// One console record: result line, reason, and feature lines when verbose
fn render_result(result: &AnalysisResult, outcome: &ClassificationOutcome, verbose: bool) -> String {
    let color = match outcome.classification {
        Classification::Legitimate => "\x1b[32m", // Green
        Classification::Suspicious => "\x1b[33m", // Yellow
        Classification::Fake => "\x1b[31m",       // Red
        Classification::Error => "\x1b[90m",      // Gray
    };
    let reset = "\x1b[0m";

    let bitrate = result
        .metadata
        .bitrate
        .map(|b| format!("{}kbps", b / 1000))
        .unwrap_or_else(|| "-".to_string());
    let cutoff = result
        .features
        .as_ref()
        .and_then(|f| f.cutoff_frequency)
        .map(|c| format!("{:.0}Hz", c))
        .unwrap_or_else(|| "-".to_string());

    let mut out = format!(
        "{}{:<13}{} {:<5} {:>8}  {:>8}  {}\n",
        color,
        format!("[{}]", outcome.classification),
        reset,
        result.metadata.format.trim_start_matches('.'),
        bitrate,
        cutoff,
        &result.file_name
    );
    out.push_str(&format!("    {}\n", outcome.reason));

    if verbose {
        if let Some(ref f) = result.features {
            out.push_str(&format!(
                "    Spectral: hf_energy={:.1}dB presence={:.1}% above_20k={} pass={}\n",
                f.high_freq_energy,
                f.spectral_presence,
                f.has_content_above_20k,
                f.cutoff_pass.map(|p| format!("{:?}", p).to_lowercase()).unwrap_or_else(|| "n/a".to_string())
            ));
            out.push_str(&format!(
                "    Dynamics: range={}\n",
                f.dynamic_range
                    .map(|d| format!("{:.1}dB", d))
                    .unwrap_or_else(|| "n/a".to_string())
            ));
        }
    }

    out
}

fn print_summary(summary: &Summary) {
    eprintln!("\n{}", "─".repeat(70));
    eprintln!("\x1b[1mSummary:\x1b[0m ({} files)", summary.total);
    eprintln!(
        "  \x1b[32m✓ Legitimate:\x1b[0m {:>5} ({:.1}%)",
        summary.legitimate,
        summary.percent(summary.legitimate)
    );
    eprintln!(
        "  \x1b[33m? Suspicious:\x1b[0m {:>5} ({:.1}%)",
        summary.suspicious,
        summary.percent(summary.suspicious)
    );
    eprintln!(
        "  \x1b[31m✗ Fake:\x1b[0m       {:>5} ({:.1}%)",
        summary.fake,
        summary.percent(summary.fake)
    );
    if summary.error > 0 {
        eprintln!("  \x1b[90mErrors:\x1b[0m       {:>5}", summary.error);
    }
    eprintln!();
}
