use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use clap::{ArgAction, Parser};
use console::style;
use globset::{Glob, GlobSet, GlobSetBuilder};
use kata_core::{
    Comparison, Config, DictionaryFile, Engine, HttpParaphraser, ScanOptions, ScanResult, Strategy,
};
use serde::Serialize;
use serde_yaml::Value as YamlValue;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

/// Kata CLI entry point.
#[derive(Debug, Parser)]
#[command(name = "kata", about = "Detect and redact disguised profanity in text.")]
struct Args {
    /// Path to config file (YAML). Defaults to kata.yml if present.
    #[arg(long, default_value = "kata.yml")]
    config: PathBuf,

    /// Term dictionary (YAML or JSON) with `terms` and optional `common_words`.
    #[arg(long, short = 'd', default_value = "kata-terms.yml")]
    dictionary: PathBuf,

    /// Ground-truth offensive words (comma-separated); enables metrics.
    #[arg(long, value_delimiter = ',', value_name = "WORD[,WORD]")]
    truth: Vec<String>,

    /// Run every matching strategy and compare them side by side.
    #[arg(long, action = ArgAction::SetTrue)]
    compare: bool,

    /// Emit JSON output for automation.
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// Exit non-zero when anything was detected.
    #[arg(long, action = ArgAction::SetTrue)]
    strict: bool,

    /// Only print the summary line.
    #[arg(long, action = ArgAction::SetTrue)]
    quiet: bool,

    /// Search the raw (case-folded) text instead of the normalized form.
    #[arg(long, action = ArgAction::SetTrue)]
    no_normalize: bool,

    /// Disable gap-tolerant matching.
    #[arg(long, action = ArgAction::SetTrue)]
    no_fuzzy: bool,

    /// Send redacted sentences to the paraphrase service.
    #[arg(long, action = ArgAction::SetTrue)]
    paraphrase: bool,

    /// Collapse repeated letters before matching (goooblok -> goblok).
    #[arg(long, action = ArgAction::SetTrue)]
    collapse_repeats: bool,

    /// Skip files matching these globs (comma-separated).
    #[arg(long, value_delimiter = ',', value_name = "GLOB[,GLOB]")]
    ignore: Vec<String>,

    /// Set config overrides (repeatable as key=value). Example: --set matching.min_fuzzy_len=5
    #[arg(long = "set", value_name = "KEY=VALUE", num_args = 0..)]
    sets: Vec<String>,

    /// Files or directories to scan. Reads stdin when none are given.
    #[arg(value_name = "PATH", num_args = 0..)]
    paths: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct FileResult {
    path: String,
    #[serde(flatten)]
    result: ScanResult,
}

#[derive(Debug, Serialize)]
struct FileComparison {
    path: String,
    #[serde(flatten)]
    comparison: Comparison,
}

#[derive(Debug, Serialize)]
struct OutputReport<T> {
    files: Vec<T>,
    total_matches: usize,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("KATA_LOG").unwrap_or_else(|_| EnvFilter::new("off"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let args = Args::parse();
    run_scan(args)
}

fn run_scan(args: Args) -> anyhow::Result<()> {
    let mut cfg = load_config(&args.config)?;
    apply_overrides(&mut cfg, &args.sets)?;
    let options = scan_options(&cfg, &args);

    let dictionary = DictionaryFile::new(&args.dictionary);
    let mut engine = Engine::new(cfg.clone(), dictionary.clone(), dictionary)
        .with_context(|| format!("Failed to load dictionary {}", args.dictionary.display()))?;
    if options.use_paraphrase {
        engine = engine.with_paraphraser(HttpParaphraser::new(&cfg.paraphrase)?);
    }

    let inputs = read_inputs(&args)?;
    let truth: Vec<String> = args
        .truth
        .iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect();

    let mut total_matches = 0usize;
    if args.compare {
        let mut files = Vec::new();
        for (path, text) in inputs {
            let comparison = engine.compare(&text, &truth, &options);
            total_matches += comparison
                .summary
                .get(&Strategy::Full)
                .map_or(0, |s| s.detected_count);
            if !args.quiet && !args.json {
                print_comparison(&path, &comparison);
            }
            files.push(FileComparison { path, comparison });
        }
        emit(&args, OutputReport { files, total_matches })?;
    } else {
        let mut files = Vec::new();
        for (path, text) in inputs {
            let result = engine.scan_with(&text, &truth, &options);
            total_matches += result.matches.len();
            if !args.quiet && !args.json {
                print_human_report(&path, &result);
            }
            files.push(FileResult { path, result });
        }
        emit(&args, OutputReport { files, total_matches })?;
    }

    if args.strict && total_matches > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn emit<T: Serialize>(args: &Args, report: OutputReport<T>) -> anyhow::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "\n{} inputs, {} matches",
            report.files.len(),
            report.total_matches
        );
    }
    Ok(())
}

fn scan_options(cfg: &Config, args: &Args) -> ScanOptions {
    let mut options = cfg.scan;
    if args.no_normalize {
        options.use_normalization = false;
    }
    if args.no_fuzzy {
        options.use_fuzzy_matching = false;
    }
    if args.paraphrase {
        options.use_paraphrase = true;
    }
    if args.collapse_repeats {
        options.collapse_repeats = true;
    }
    options
}

/// `(label, contents)` for every input, sorted by path; stdin when no paths were given.
fn read_inputs(args: &Args) -> anyhow::Result<Vec<(String, String)>> {
    if args.paths.is_empty() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(vec![("<stdin>".to_string(), text)]);
    }

    let ignore = build_ignore_set(&args.ignore)?;
    let mut files = collect_files(&args.paths, ignore.as_ref())?;
    files.sort();
    debug!(count = files.len(), "collected input files");

    files
        .into_iter()
        .map(|path| -> anyhow::Result<(String, String)> {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok((path.to_string_lossy().to_string(), text))
        })
        .collect()
}

fn build_ignore_set(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

fn collect_files(paths: &[PathBuf], ignore: Option<&GlobSet>) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut walker = WalkDir::new(path).into_iter();
            while let Some(entry_res) = walker.next() {
                let entry = entry_res?;
                let entry_path = entry.path();
                if let Some(set) = ignore {
                    if set.is_match(entry_path) {
                        if entry.file_type().is_dir() {
                            walker.skip_current_dir();
                        }
                        continue;
                    }
                }
                if entry.file_type().is_file() && is_supported(entry_path) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else if path.is_file() {
            if ignore.is_some_and(|set| set.is_match(path)) {
                continue;
            }
            files.push(path.clone());
        } else {
            return Err(anyhow!("No such file or directory: {}", path.display()));
        }
    }
    Ok(files)
}

// Explicit file arguments are scanned whatever their extension; directory walks
// only pick up text documents.
fn is_supported(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "txt" | "md" | "markdown" | "csv" | "log"
        ),
        None => false,
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let value: YamlValue = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse YAML {}", path.display()))?;
    serde_yaml::from_value(value)
        .with_context(|| format!("Invalid config structure in {}", path.display()))
}

fn apply_overrides(cfg: &mut Config, sets: &[String]) -> anyhow::Result<()> {
    for kv in sets {
        let Some((key, val)) = kv.split_once('=') else {
            return Err(anyhow!("Override `{kv}` is not KEY=VALUE"));
        };
        let (key, val) = (key.trim(), val.trim());
        match key {
            "matching.min_exact_len" => cfg.matching.min_exact_len = parse_value(key, val)?,
            "matching.min_fuzzy_len" => cfg.matching.min_fuzzy_len = parse_value(key, val)?,
            "matching.short_pattern_len" => {
                cfg.matching.short_pattern_len = parse_value(key, val)?
            }
            "paraphrase.endpoint" => cfg.paraphrase.endpoint = val.to_string(),
            "paraphrase.timeout_ms" => cfg.paraphrase.timeout_ms = parse_value(key, val)?,
            "paraphrase.max_sentence_chars" => {
                cfg.paraphrase.max_sentence_chars = parse_value(key, val)?
            }
            "scan.use_normalization" => cfg.scan.use_normalization = parse_flag(val),
            "scan.use_fuzzy_matching" => cfg.scan.use_fuzzy_matching = parse_flag(val),
            "scan.use_paraphrase" => cfg.scan.use_paraphrase = parse_flag(val),
            "scan.collapse_repeats" => cfg.scan.collapse_repeats = parse_flag(val),
            "common_words.fallback" => {
                cfg.common_words.fallback = val
                    .split(',')
                    .map(|w| w.trim().to_string())
                    .filter(|w| !w.is_empty())
                    .collect();
            }
            _ => return Err(anyhow!("Unknown config key `{key}`")),
        }
    }
    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, val: &str) -> anyhow::Result<T> {
    val.parse::<T>()
        .map_err(|_| anyhow!("Invalid value `{val}` for `{key}`"))
}

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn print_human_report(path: &str, result: &ScanResult) {
    println!(
        "{} ({} matches, {:.2} ms)",
        style(path).bold(),
        result.matches.len(),
        result.duration_ms
    );
    if result.matches.is_empty() {
        println!("  {}", style("clean").green());
    }
    for m in &result.matches {
        println!(
            "  [{}] {}..{} {} → {}",
            style(&m.pattern).yellow(),
            m.start,
            m.end,
            m.raw_word,
            style(&m.replacement).cyan()
        );
    }
    if !result.matches.is_empty() {
        println!("  output: {}", result.output.trim_end());
        if result.paraphrased {
            println!("  {}", style("paraphrased").dim());
        }
    }
    if let Some(metrics) = &result.metrics {
        println!(
            "  accuracy {:.2}%  precision {:.2}%  recall {:.2}%  f1 {:.2}%",
            metrics.accuracy, metrics.precision, metrics.recall, metrics.f1
        );
    }
}

fn print_comparison(path: &str, comparison: &Comparison) {
    println!("{}", style(path).bold());
    println!(
        "  {:<18} {:>8} {:>10} {:>9} {:>9} {:>9} {:>8}",
        "strategy", "detected", "ms", "precision", "recall", "f1", "vs full"
    );
    for (strategy, summary) in &comparison.summary {
        let rate = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        let versus = summary
            .relative_to_full
            .as_ref()
            .map_or_else(|| "-".to_string(), |o| format!("{:.2}%", o.match_percentage));
        println!(
            "  {:<18} {:>8} {:>10.2} {:>9} {:>9} {:>9} {:>8}",
            strategy.to_string(),
            summary.detected_count,
            summary.duration_ms,
            rate(summary.precision),
            rate(summary.recall),
            rate(summary.f1),
            versus
        );
        if let Some(overlap) = &summary.relative_to_full {
            if !overlap.missed_words.is_empty() {
                println!("      missed: {}", style(overlap.missed_words.join(", ")).red());
            }
            if !overlap.extra_words.is_empty() {
                println!("      extra: {}", style(overlap.extra_words.join(", ")).yellow());
            }
        }
    }
}
