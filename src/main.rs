//! Privacy Probe - Main Entry Point
//!
//! Replays a recorded probe run through the detection pipeline and prints
//! the resulting report. Handles CLI argument parsing, configuration loading
//! and output formatting.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use privacy_probe::{
    config::{parse_weight_overrides, CliArgs},
    detector::PrivacyDetector,
    engine::classify::{FEATURES_THRESHOLD, PRIVATE_THRESHOLD},
    probe::ObservationSet,
    report::Report,
    suggest::Impact,
    NAME, VERSION,
};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const MAGENTA: &str = "\x1b[35m";
}

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

/// Color for a status label, from most to least private.
fn status_color(normalized_score: u8, is_tor: bool) -> &'static str {
    if is_tor {
        colors::MAGENTA
    } else if normalized_score >= PRIVATE_THRESHOLD {
        colors::GREEN
    } else if normalized_score >= FEATURES_THRESHOLD {
        colors::YELLOW
    } else {
        colors::RED
    }
}

fn impact_color(impact: Impact) -> &'static str {
    match impact {
        Impact::High => colors::RED,
        Impact::Medium => colors::YELLOW,
        Impact::Low => colors::CYAN,
        Impact::Info => colors::GREEN,
    }
}

/// Print a report in human-readable form
fn print_report(report: &Report) {
    let tentative = if report.is_tentative() { " (tentative)" } else { "" };

    println!(
        "{bold}{color}{}{reset}{dim}{}{reset}",
        report.status_label,
        tentative,
        bold = colors::BOLD,
        color = status_color(report.normalized_score, report.is_tor),
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Score:{reset}        {}/100",
        report.normalized_score,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Confidence:{reset}   {}",
        report.confidence_tier,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Engine:{reset}       {}",
        report.engine_profile,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!(
        "  {dim}Run:{reset}          {}",
        report.run_id,
        dim = colors::DIM,
        reset = colors::RESET
    );
    println!();

    if !report.findings.is_empty() {
        println!("{bold}Findings:{reset}", bold = colors::BOLD, reset = colors::RESET);
        for finding in &report.findings {
            println!("  - {}", finding);
        }
        if report.hidden_findings > 0 {
            println!(
                "  {dim}+{} more{reset}",
                report.hidden_findings,
                dim = colors::DIM,
                reset = colors::RESET
            );
        }
        println!();
    }

    println!("{bold}Suggestions:{reset}", bold = colors::BOLD, reset = colors::RESET);
    for suggestion in &report.suggestions {
        println!(
            "  {color}[{}]{reset} {bold}{}{reset}",
            suggestion.impact,
            suggestion.action,
            color = impact_color(suggestion.impact),
            bold = colors::BOLD,
            reset = colors::RESET
        );
        println!("      {}", suggestion.description);
        println!(
            "      {dim}{}{reset}",
            suggestion.reason,
            dim = colors::DIM,
            reset = colors::RESET
        );
    }
    println!();
}

fn report_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}

fn emit(report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_report(report),
        OutputFormat::Json => println!("{}", report_json(report)?),
    }
    Ok(())
}

/// Build the CLI command parser
fn build_cli() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author("Privacy Probe Team")
        .about("Classifies a browser's private-mode and privacy posture from recorded probes")
        .long_about(
            "Privacy Probe replays a recorded probe run and reports:\n\
             - Whether the session looks like a private / incognito window\n\
             - A 0-100 score with a confidence tier\n\
             - Tor Browser detection\n\
             - Prioritized privacy suggestions",
        )
        .arg(
            Arg::new("observations")
                .short('o')
                .long("observations")
                .value_name("FILE")
                .help("Recorded observations to replay (JSON or TOML)")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to configuration file (TOML or JSON)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("MS")
                .help("Per-probe timeout in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("tor-timeout")
                .long("tor-timeout")
                .value_name("MS")
                .help("Tor exit-list timeout in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("findings")
                .long("findings")
                .value_name("COUNT")
                .help("Number of findings to show")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("weight")
                .long("weight")
                .value_name("PROBE=WEIGHT")
                .help("Override a probe weight (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("vpn")
                .long("vpn")
                .help("Print the report, then re-classify as if a VPN was detected")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only log errors (the report is still printed)")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose"),
        )
}

/// Parse CLI arguments into CliArgs struct
fn parse_cli_args(matches: &clap::ArgMatches) -> CliArgs {
    let mut args = CliArgs::default();

    args.config_file = matches.get_one::<PathBuf>("config").cloned();
    args.probe_timeout_ms = matches.get_one::<u64>("timeout").copied();
    args.tor_list_timeout_ms = matches.get_one::<u64>("tor-timeout").copied();
    args.findings_limit = matches.get_one::<usize>("findings").copied();

    if let Some(weights) = matches.get_many::<String>("weight") {
        for weight in weights {
            args.weight_overrides.extend(parse_weight_overrides(weight));
        }
    }

    args
}

fn parse_format(matches: &clap::ArgMatches) -> OutputFormat {
    match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => OutputFormat::Json,
        _ => OutputFormat::Text,
    }
}

/// Log level for the verbosity flags
fn log_level(verbosity: u8, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else {
        match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// Initialize the tracing/logging subsystem
fn init_tracing(verbosity: u8, quiet: bool) {
    let level = log_level(verbosity, quiet);

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // Logs go to stderr so JSON on stdout stays parseable.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let matches = build_cli().get_matches();

    // Get verbosity settings before loading config
    let verbosity = matches.get_count("verbose");
    let quiet = matches.get_flag("quiet");

    // Initialize logging
    init_tracing(verbosity, quiet);

    // Convert matches to CliArgs
    let cli_args = parse_cli_args(&matches);
    let format = parse_format(&matches);

    // Load configuration with full precedence chain
    let settings = cli_args
        .load_settings()
        .context("Failed to load configuration")?;

    let observations_path = matches
        .get_one::<PathBuf>("observations")
        .context("Missing --observations")?;
    let observations = ObservationSet::from_file(observations_path)
        .with_context(|| format!("Failed to load observations from {}", observations_path.display()))?;
    info!(
        "Loaded {} recorded probes from {}",
        observations.probes.len(),
        observations_path.display()
    );

    let detector = PrivacyDetector::new(settings, observations.to_registry());

    let report = detector
        .run(&observations.markers, &observations.signals)
        .await;
    emit(&report, format)?;

    if matches.get_flag("vpn") {
        let signals = observations.signals.clone().with_vpn(true);
        let report = detector.reclassify(&observations.markers, &signals).await;
        if format == OutputFormat::Text {
            println!(
                "{cyan}{bold}With VPN detected:{reset}",
                cyan = colors::CYAN,
                bold = colors::BOLD,
                reset = colors::RESET
            );
        }
        emit(&report, format)?;
    }

    Ok(())
}
