//! FitsGuard CLI - FITS header and table schema validation from the command line.

use clap::{Parser, Subcommand, ValueEnum};
use fitsguard::{
    Finding, Header, HeaderSchema, Mode, TableHdu, TableSchema, ValidationError,
};
use std::fs;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fitsguard")]
#[command(about = "FITS header and binary table schema validation tool", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a file against a schema
    Check {
        /// Path to the data file: a table HDU object or a header card list,
        /// in JSON
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Path to the schema file. A JSON object is a table schema, a JSON
        /// array is a header schema
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// How to treat failed checks
        #[arg(short, long, value_enum, default_value = "collect")]
        mode: CliMode,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Load a schema file and report what it declares
    Schema {
        /// Path to the schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    /// Stop at the first hard failure
    FailFast,
    /// Emit failures as log events and continue
    Log,
    /// Gather all findings and report them at the end
    Collect,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::FailFast => Mode::FailFast,
            CliMode::Log => Mode::Log,
            CliMode::Collect => Mode::Collect,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for CI/CD
    Json,
}

/// One of the two schema flavors a schema file can hold.
enum Schema {
    Table(TableSchema),
    Header(HeaderSchema),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Check {
            file,
            schema,
            mode,
            format,
        } => handle_check(&file, &schema, mode.into(), format),
        Commands::Schema { schema } => handle_schema(&schema),
    };

    process::exit(exit_code);
}

fn load_schema(path: &PathBuf) -> Result<Schema, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("{} is not valid JSON: {e}", path.display()))?;
    if value.is_array() {
        let schema: HeaderSchema = serde_json::from_value(value)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        Ok(Schema::Header(schema))
    } else {
        let schema: TableSchema = serde_json::from_value(value)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        Ok(Schema::Table(schema))
    }
}

fn handle_check(file: &PathBuf, schema: &PathBuf, mode: Mode, format: OutputFormat) -> i32 {
    let schema = match load_schema(schema) {
        Ok(schema) => schema,
        Err(e) => {
            eprintln!("Error: {e}");
            return 2;
        }
    };

    let text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: cannot read {}: {e}", file.display());
            return 2;
        }
    };

    let outcome: Result<Vec<Finding>, ValidationError> = match &schema {
        Schema::Table(table) => match serde_json::from_str::<TableHdu>(&text) {
            Ok(hdu) => table.validate_hdu(&hdu, mode),
            Err(e) => {
                eprintln!("Error: {} is not a table HDU: {e}", file.display());
                return 2;
            }
        },
        Schema::Header(header) => match serde_json::from_str::<Header>(&text) {
            Ok(cards) => header.validate(&cards, mode),
            Err(e) => {
                eprintln!("Error: {} is not a header card list: {e}", file.display());
                return 2;
            }
        },
    };

    match outcome {
        Ok(findings) => {
            let hard = findings.iter().filter(|f| f.is_hard()).count();
            output_findings(file, &findings, &format);
            if hard > 0 {
                1
            } else {
                0
            }
        }
        Err(e) => {
            match format {
                OutputFormat::Human => println!("FAILED: {e}"),
                OutputFormat::Json => {
                    let output = serde_json::json!({
                        "file": file.display().to_string(),
                        "passed": false,
                        "error": { "kind": e.kind, "message": e.message },
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap());
                }
            }
            1
        }
    }
}

fn output_findings(file: &PathBuf, findings: &[Finding], format: &OutputFormat) {
    match format {
        OutputFormat::Human => {
            println!("File: {}", file.display());
            if findings.is_empty() {
                println!("  No problems found");
                return;
            }
            for finding in findings {
                let tag = if finding.is_hard() { "error" } else { "note" };
                println!("  [{tag}] {finding}");
            }
            let hard = findings.iter().filter(|f| f.is_hard()).count();
            println!(
                "\n  Summary: {} error(s), {} advisory note(s)",
                hard,
                findings.len() - hard
            );
        }
        OutputFormat::Json => {
            let hard = findings.iter().filter(|f| f.is_hard()).count();
            let output = serde_json::json!({
                "file": file.display().to_string(),
                "passed": hard == 0,
                "findings": findings,
            });
            println!("{}", serde_json::to_string_pretty(&output).unwrap());
        }
    }
}

fn handle_schema(path: &PathBuf) -> i32 {
    match load_schema(path) {
        Ok(Schema::Table(schema)) => {
            println!("Table schema: {}", path.display());
            println!("\n  Header cards:");
            for card in schema.header().iter() {
                let req = if card.required() { "required" } else { "optional" };
                println!("    {:<8} {}", card.keyword(), req);
            }
            println!("\n  Columns:");
            for column in schema.columns() {
                let unit = column
                    .unit()
                    .map(|u| format!(" [{u}]"))
                    .unwrap_or_default();
                let req = if column.required() { "required" } else { "optional" };
                println!(
                    "    {:<16} {} (TFORM {}){unit} {req}",
                    column.name(),
                    column.dtype(),
                    column.tform()
                );
            }
            0
        }
        Ok(Schema::Header(schema)) => {
            println!("Header schema: {}", path.display());
            for card in schema.iter() {
                let req = if card.required() { "required" } else { "optional" };
                println!("  {:<8} {}", card.keyword(), req);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {e}");
            2
        }
    }
}
