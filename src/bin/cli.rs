use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use serde_json::json;

use queryxml::metadata::StaticMetadata;
use queryxml::transpile::{
    transpile_query_xml_to_sql, transpile_sql_to_query_xml, validate_query_xml, Diagnostic,
};

const HISTORY_FILE: &str = ".qxl_history";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "qxl - transpile between SQL and query-XML documents"
)]
struct Cli {
    /// Entity metadata for '*' expansion, e.g. --entity account=id,name,revenue
    #[arg(long = "entity", value_name = "NAME=ATTR,ATTR,...")]
    entities: Vec<String>,

    /// Attribute names treated as virtual (result-only) columns
    #[arg(long = "virtual", value_name = "ATTR")]
    virtual_columns: Vec<String>,

    /// Emit machine-readable JSON instead of plain text
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transpile a SQL statement to a query-XML document
    ToXml {
        /// SQL statement
        sql: String,
    },

    /// Transpile a query-XML document to SQL
    ToSql {
        /// Document file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Validate a query-XML document structurally
    Validate {
        /// Document file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Start an interactive shell
    Shell,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let lookup = build_metadata(&cli)?;

    match &cli.command {
        Commands::ToXml { sql } => match transpile_sql_to_query_xml(sql, &lookup) {
            Ok(xml) => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&json!({ "xml": xml }))?);
                } else {
                    print!("{}", xml);
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(diagnostics) => {
                report_diagnostics(&diagnostics, cli.json)?;
                Ok(ExitCode::FAILURE)
            }
        },

        Commands::ToSql { file } => {
            let xml = read_input(file.as_deref())?;
            match transpile_query_xml_to_sql(&xml, &lookup) {
                Ok(output) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&output)?);
                    } else {
                        println!("{}", output.sql);
                        for warning in &output.warnings {
                            eprintln!("warning: {}", warning);
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(diagnostics) => {
                    report_diagnostics(&diagnostics, cli.json)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Validate { file } => {
            let xml = read_input(file.as_deref())?;
            let diagnostics = validate_query_xml(&xml);
            if diagnostics.is_empty() {
                if cli.json {
                    println!("[]");
                } else {
                    println!("ok");
                }
                Ok(ExitCode::SUCCESS)
            } else {
                report_diagnostics(&diagnostics, cli.json)?;
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Shell => {
            run_shell(&lookup, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Build the static metadata lookup from --entity and --virtual flags
fn build_metadata(cli: &Cli) -> Result<StaticMetadata> {
    let mut lookup = StaticMetadata::new();

    for spec in &cli.entities {
        let (name, attributes) = spec
            .split_once('=')
            .with_context(|| format!("--entity '{}' must look like name=attr,attr", spec))?;
        lookup = lookup.with_entity(
            name,
            attributes.split(',').map(str::trim).filter(|a| !a.is_empty()),
        );
    }
    for column in &cli.virtual_columns {
        lookup = lookup.with_virtual(column.clone());
    }

    Ok(lookup)
}

fn read_input(file: Option<&std::path::Path>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("reading stdin")?;
            Ok(buffer)
        }
    }
}

fn report_diagnostics(diagnostics: &[Diagnostic], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(diagnostics)?);
    } else {
        for diagnostic in diagnostics {
            match (diagnostic.line, diagnostic.column) {
                (Some(line), Some(column)) => eprintln!(
                    "{}: {} (line {}, column {})",
                    diagnostic.code, diagnostic.message, line, column
                ),
                _ => eprintln!("{}: {}", diagnostic.code, diagnostic.message),
            }
        }
    }
    Ok(())
}

fn run_shell(lookup: &StaticMetadata, json: bool) -> Result<()> {
    println!("qxl shell. SQL transpiles to query-XML; input starting with '<' transpiles back. Type 'help' or 'exit'.");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    let _ = rl.load_history(HISTORY_FILE);

    loop {
        let readline = rl.readline("qxl> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(&line);

                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match line.to_lowercase().as_str() {
                    "exit" | "quit" => break,
                    "help" => {
                        print_help();
                        continue;
                    }
                    _ => {}
                }

                if line.starts_with('<') {
                    match transpile_query_xml_to_sql(line, lookup) {
                        Ok(output) => {
                            println!("{}", output.sql);
                            for warning in &output.warnings {
                                println!("warning: {}", warning);
                            }
                            for hint in &output.result_hints {
                                println!("hint: virtual column '{}'", hint);
                            }
                        }
                        Err(diagnostics) => report_diagnostics(&diagnostics, json)?,
                    }
                } else {
                    match transpile_sql_to_query_xml(line, lookup) {
                        Ok(xml) => print!("{}", xml),
                        Err(diagnostics) => report_diagnostics(&diagnostics, json)?,
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    if let Err(err) = rl.save_history(HISTORY_FILE) {
        eprintln!("Error saving history: {}", err);
    }

    Ok(())
}

fn print_help() {
    println!("Enter a SQL SELECT statement to see its query-XML document.");
    println!("Paste a query-XML document (starting with '<') to see its SQL.");
    println!("Commands: help, exit");
}
