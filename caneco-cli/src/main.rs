//! Caneco CLI - convert AutoCAD component exports into Caneco BT XML.

use anyhow::{bail, Context};
use caneco::{
    CanecoCore, ConversionOutput, ConverterConfig, RunSummary, TemplateRegistry, ValidationReport,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use tracing::Level;

#[derive(Parser)]
#[command(name = "caneco")]
#[command(about = "AutoCAD component list to Caneco BT XML converter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a component export (.txt/.tsv or .json) into a Caneco BT document
    Convert {
        /// Path to the AutoCAD export
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output document (defaults to INPUT with an .xml extension)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,

        /// Converter configuration (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Summary format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,

        /// Check the written document against the template registry
        #[arg(long)]
        validate: bool,

        /// Exit with error code if any record could not be classified
        #[arg(long)]
        fail_on_unclassified: bool,

        /// Log classification decisions to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Check a document against a reference export or the template registry
    Validate {
        /// Document to check
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// Reference Caneco BT export to compare with
        #[arg(long, value_name = "FILE")]
        reference: Option<PathBuf>,

        /// Converter configuration (JSON)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Report format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List the component templates
    Templates {
        /// Show characteristic keys and defaults
        #[arg(short, long)]
        verbose: bool,

        /// Converter configuration (JSON), for an external registry
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts and CI
    Json,
}

fn main() {
    let cli = Cli::parse();

    let level = match &cli.command {
        Commands::Convert { verbose: true, .. } => Level::DEBUG,
        _ => Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Convert {
            input,
            output,
            config,
            format,
            validate,
            fail_on_unclassified,
            verbose: _,
        } => handle_convert(
            &input,
            output.as_deref(),
            config.as_deref(),
            format,
            validate,
            fail_on_unclassified,
        ),
        Commands::Validate {
            document,
            reference,
            config,
            format,
        } => handle_validate(&document, reference.as_deref(), config.as_deref(), format),
        Commands::Templates { verbose, config } => handle_templates(verbose, config.as_deref()),
    };

    process::exit(exit_code);
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ConverterConfig> {
    match path {
        Some(path) => ConverterConfig::load(path)
            .with_context(|| format!("cannot load config {}", path.display())),
        None => Ok(ConverterConfig::default()),
    }
}

fn report_error(e: anyhow::Error) -> i32 {
    eprintln!("Error: {:#}", e);
    1
}

fn default_output(input: &Path) -> anyhow::Result<PathBuf> {
    let output = input.with_extension("xml");
    if output == input {
        bail!("input is already an .xml file; pass --output");
    }
    Ok(output)
}

fn handle_convert(
    input: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    format: OutputFormat,
    validate: bool,
    fail_on_unclassified: bool,
) -> i32 {
    match run_convert(input, output, config, validate) {
        Ok((result, out_path, report)) => {
            match format {
                OutputFormat::Human => {
                    output_summary_human(&result.summary, &out_path);
                    if let Some(report) = &report {
                        output_report_human(report);
                    }
                }
                OutputFormat::Json => {
                    let value = serde_json::json!({
                        "input": input.display().to_string(),
                        "output": out_path.display().to_string(),
                        "summary": &result.summary,
                        "validation": &report,
                    });
                    print_json(&value);
                }
            }

            if report.as_ref().is_some_and(|r| !r.ok) {
                return 1;
            }
            if fail_on_unclassified && result.summary.has_unclassified() {
                return 1;
            }
            0
        }
        Err(e) => report_error(e),
    }
}

fn run_convert(
    input: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
    validate: bool,
) -> anyhow::Result<(ConversionOutput, PathBuf, Option<ValidationReport>)> {
    let config = load_config(config)?;
    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => default_output(input)?,
    };

    let result = CanecoCore::convert_file(input, &config)
        .with_context(|| format!("conversion of {} failed", input.display()))?;
    std::fs::write(&out_path, &result.document)
        .with_context(|| format!("cannot write {}", out_path.display()))?;

    let report = if validate {
        Some(CanecoCore::validate_document(&result.document, None, &config)?)
    } else {
        None
    };

    Ok((result, out_path, report))
}

fn handle_validate(
    document: &Path,
    reference: Option<&Path>,
    config: Option<&Path>,
    format: OutputFormat,
) -> i32 {
    let run = || -> anyhow::Result<ValidationReport> {
        let config = load_config(config)?;
        let xml = std::fs::read_to_string(document)
            .with_context(|| format!("cannot read {}", document.display()))?;
        let reference_xml = match reference {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
            ),
            None => None,
        };
        Ok(CanecoCore::validate_document(
            &xml,
            reference_xml.as_deref(),
            &config,
        )?)
    };

    match run() {
        Ok(report) => {
            match format {
                OutputFormat::Human => {
                    println!("\nDocument: {}", document.display());
                    println!("{}", "─".repeat(60));
                    output_report_human(&report);
                }
                OutputFormat::Json => print_json(&serde_json::json!(&report)),
            }
            if report.ok {
                0
            } else {
                1
            }
        }
        Err(e) => report_error(e),
    }
}

fn handle_templates(verbose: bool, config: Option<&Path>) -> i32 {
    let registry = match load_config(config).and_then(|c| {
        CanecoCore::load_registry(&c).context("cannot load template registry")
    }) {
        Ok(registry) => registry,
        Err(e) => return report_error(e),
    };
    output_templates(&registry, verbose);
    0
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn output_summary_human(summary: &RunSummary, out_path: &Path) {
    println!("\nOutput: {}", out_path.display());
    println!("{}", "─".repeat(60));
    println!("  Records:      {}", summary.total);
    println!("  Converted:    {}", summary.converted);
    println!("  Unclassified: {}", summary.unclassified.len());

    if !summary.per_kind.is_empty() {
        println!("\n  By kind:");
        for (kind, count) in &summary.per_kind {
            println!("    {:<12} {}", kind, count);
        }
    }
    if summary.has_unclassified() {
        println!("\n  Unclassified records:");
        for id in &summary.unclassified {
            println!("    - {}", id);
        }
    }
}

fn output_report_human(report: &ValidationReport) {
    if report.ok {
        println!("\n  Compatible: no mismatches");
        return;
    }
    println!("\n  MISMATCHES ({}):", report.mismatches.len());
    for m in &report.mismatches {
        println!("    - {}", m.location);
        println!("      expected: {}", m.expected);
        println!("      actual:   {}", m.actual);
    }
}

fn output_templates(registry: &TemplateRegistry, verbose: bool) {
    println!("Available component templates:\n");
    for template in registry.templates() {
        let flag = if template.differential { " (differential)" } else { "" };
        println!("  {}", template.name);
        println!(
            "    {}{} - seed {}/{}",
            template.kind, flag, template.seed.group_id, template.seed.item_id
        );
        if verbose {
            for c in &template.characteristics {
                println!("      {:<12} {:?}", c.id, c.value);
            }
        }
        println!();
    }
}
