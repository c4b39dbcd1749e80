//! Validation of bulk import payloads.
//!
//! An import file bundles several use-case documents plus optional proposals
//! for new catalog blocks. Each document is validated on its own; findings
//! are flattened into one line per document so the import dialog can list
//! them.

use crate::catalog::Catalog;
use crate::model::Document;
use crate::validate::{DocumentValidator, Issue, ValidationReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `exportType` of a use-case bundle.
pub const EXPORT_TYPE_USECASES: &str = "usecases";

/// Outcome of validating an import payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// `true` iff `errors` is empty.
    pub valid: bool,
    /// One line per failing use case or malformed `newBlocks` entry.
    pub errors: Vec<String>,
    /// Payload-level warnings, then one line per use case with warnings.
    pub warnings: Vec<String>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        match (self.errors.len(), self.warnings.len()) {
            (0, 0) => "Valide".to_string(),
            (0, w) => format!("Valide mit {w} Warnungen"),
            (e, _) => format!("{e} Fehler gefunden"),
        }
    }

    fn finish(mut self) -> Self {
        self.valid = self.errors.is_empty();
        self
    }
}

fn is_truthy_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn join_messages(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate an import payload (`exportType`, `useCases`, `newBlocks`).
///
/// A missing `useCases` list is fatal and stops further checks; everything
/// else is collected.
pub fn validate_import(data: &Value, catalog: Option<&Catalog>) -> ImportReport {
    let mut report = ImportReport::default();

    if data.is_null() {
        report.errors.push("Daten sind leer".to_string());
        return report.finish();
    }

    match data.get("exportType") {
        Some(Value::String(t)) if t == EXPORT_TYPE_USECASES => {}
        Some(Value::String(t)) => report
            .warnings
            .push(format!("Unerwarteter exportType: {t}")),
        Some(other) => report
            .warnings
            .push(format!("Unerwarteter exportType: {other}")),
        None => report
            .warnings
            .push("Unerwarteter exportType: undefined".to_string()),
    }

    let Some(use_cases) = data.get("useCases").and_then(Value::as_array) else {
        report
            .errors
            .push("useCases Array fehlt oder ist ungueltig".to_string());
        return report.finish();
    };

    if use_cases.is_empty() {
        report
            .warnings
            .push("Keine Use Cases in der Datei".to_string());
    }

    let mut validator = DocumentValidator::new();
    if let Some(catalog) = catalog {
        validator = validator.with_catalog(catalog);
    }

    for (i, entry) in use_cases.iter().enumerate() {
        let result = if entry.is_null() {
            ValidationReport::missing_document()
        } else {
            match Document::deserialize(entry) {
                Ok(doc) => validator.validate(&doc),
                Err(e) => ValidationReport::critical(format!(
                    "Use Case konnte nicht gelesen werden: {e}"
                )),
            }
        };

        let name = is_truthy_str(entry.get("name")).unwrap_or("Unbenannt");
        let label = format!("Use Case {} \"{name}\"", i + 1);

        if !result.valid {
            report
                .errors
                .push(format!("{label}: {}", join_messages(&result.errors)));
        }
        if result.warning_count() > 0 {
            report
                .warnings
                .push(format!("{label}: {}", join_messages(&result.warnings)));
        }
    }

    if let Some(blocks) = data.get("newBlocks").and_then(Value::as_array) {
        for (i, block) in blocks.iter().enumerate() {
            let name = is_truthy_str(block.get("name"));
            if name.is_none() {
                report.errors.push(format!("newBlocks[{i}]: Name fehlt"));
            }
            let has_category = block
                .get("category")
                .is_some_and(|c| !c.is_null() && c.as_str() != Some(""));
            if !has_category {
                report.warnings.push(format!(
                    "newBlocks[{i}] \"{}\": Kategorie fehlt",
                    name.unwrap_or("Unbenannt")
                ));
            }
        }
    }

    let report = report.finish();
    log::debug!(
        "import payload: {} use cases, {} errors, {} warnings",
        use_cases.len(),
        report.errors.len(),
        report.warnings.len()
    );
    report
}
