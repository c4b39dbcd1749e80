//! Pipeline Builder CLI: validate saved use cases and import payloads.
//!
//! ```text
//! pb-cli validate <document.json> [--catalog <catalog.json>] [--no-layout] [--json]
//! pb-cli import <payload.json> [--catalog <catalog.json>] [--json]
//! ```
//!
//! A path of `-` reads from stdin. Exit code 0 when valid, 1 when invalid,
//! 2 on usage or I/O errors.

use pb_core::{Catalog, Document, DocumentValidator, ValidateOptions, validate_import};
use std::io::Read;
use std::process::ExitCode;

const USAGE: &str = "usage:
  pb-cli validate <document.json> [--catalog <catalog.json>] [--no-layout] [--json]
  pb-cli import <payload.json> [--catalog <catalog.json>] [--json]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Validate,
    Import,
}

#[derive(Debug)]
struct Args {
    mode: Mode,
    input: String,
    catalog: Option<String>,
    validate_layout: bool,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mode = match args.first().map(String::as_str) {
        Some("validate") => Mode::Validate,
        Some("import") => Mode::Import,
        Some(other) => return Err(format!("unknown command '{other}'")),
        None => return Err("missing command".to_string()),
    };

    let mut input = None;
    let mut catalog = None;
    let mut validate_layout = true;
    let mut json = false;
    let mut rest = args[1..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--catalog" => {
                let path = rest.next().ok_or("--catalog needs a path")?;
                catalog = Some(path.clone());
            }
            "--no-layout" if mode == Mode::Validate => validate_layout = false,
            "--json" => json = true,
            flag if flag.starts_with("--") => return Err(format!("unknown flag '{flag}'")),
            path if input.is_none() => input = Some(path.to_string()),
            extra => return Err(format!("unexpected argument '{extra}'")),
        }
    }

    Ok(Args {
        mode,
        input: input.ok_or("missing input path")?,
        catalog,
        validate_layout,
        json,
    })
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        return Ok(text);
    }
    std::fs::read_to_string(path).map_err(|e| format!("cannot read {path}: {e}"))
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

/// Returns whether the input was valid.
fn run(args: &Args) -> Result<bool, String> {
    let catalog = args
        .catalog
        .as_deref()
        .map(|path| Catalog::from_json(&read_input(path)?))
        .transpose()?;
    if let Some(catalog) = &catalog {
        log::info!("catalog loaded: {} components", catalog.component_count());
    }
    let text = read_input(&args.input)?;

    match args.mode {
        Mode::Validate => {
            let doc = Document::from_json(&text)?;
            let mut validator = DocumentValidator::new().with_options(ValidateOptions {
                validate_layout: args.validate_layout,
            });
            if let Some(catalog) = &catalog {
                validator = validator.with_catalog(catalog);
            }
            let report = validator.validate(&doc);

            if args.json {
                print_json(&report)?;
            } else {
                println!("{}", report.summary());
                for issue in &report.errors {
                    println!("error: [{}] {}", issue.rule, issue.message);
                }
                for issue in &report.warnings {
                    println!("warning: [{}] {}", issue.rule, issue.message);
                }
            }
            Ok(report.valid)
        }
        Mode::Import => {
            let payload: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| format!("invalid JSON: {e}"))?;
            let report = validate_import(&payload, catalog.as_ref());

            if args.json {
                print_json(&report)?;
            } else {
                println!("{}", report.summary());
                for line in &report.errors {
                    println!("error: {line}");
                }
                for line in &report.warnings {
                    println!("warning: {line}");
                }
            }
            Ok(report.valid)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("pb-cli: {e}");
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };
    log::debug!("{args:?}");

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("pb-cli: {e}");
            ExitCode::from(2)
        }
    }
}
