//! Validation for pipeline documents.
//!
//! Reports structural problems (missing fields, duplicate IDs, dangling
//! connections) and semantic ones (block names unknown to the catalog)
//! without modifying the document. Every pass runs independently and adds
//! to the same report, so one broken element never hides findings elsewhere.
//!
//! Messages use the builder's UI language.

use crate::catalog::Catalog;
use crate::fuzzy::{MAX_SUGGESTION_DISTANCE, MAX_SUGGESTIONS, find_similar_names};
use crate::model::{Anchor, Document, Element, ElementKind, Endpoint};
use serde::Serialize;
use serde_json::Value;
use smallvec::{SmallVec, smallvec};
use std::collections::HashSet;

/// Approximate on-canvas footprint of a block, used by the overlap check.
pub const BLOCK_FOOTPRINT: (f64, f64) = (160.0, 120.0);

// ─── Report types ────────────────────────────────────────────────────────

/// What part of the document an issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// The document itself is absent or unreadable.
    Critical,
    /// Document metadata.
    Field,
    /// The element list as a whole.
    Elements,
    /// One element's structure (id, type, position, size, block reference).
    Element,
    /// Placement: overlaps, negative coordinates, blocks outside containers.
    Layout,
    /// One connection's endpoints or anchors.
    Connection,
    /// A block name checked against the component catalog.
    BlockName,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Which part of the document the issue is about.
    pub kind: IssueKind,
    /// Short rule identifier (e.g. "duplicate-element-id", "orphan-block").
    pub rule: &'static str,
    /// Position in `Document::elements` of the offending element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<usize>,
    /// Position in `Document::connections` of the offending connection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<usize>,
    /// JSON name of the metadata field (e.g. "phaseId").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    /// The block name as written in the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_name: Option<String>,
    /// Human-readable description shown to the user.
    pub message: String,
    /// Closest catalog names, best first. Empty when none are close.
    #[serde(skip_serializing_if = "SmallVec::is_empty")]
    pub suggestions: SmallVec<[String; MAX_SUGGESTIONS]>,
}

impl Issue {
    fn new(kind: IssueKind, rule: &'static str, message: String) -> Self {
        Self {
            kind,
            rule,
            element: None,
            connection: None,
            field: None,
            block_name: None,
            message,
            suggestions: SmallVec::new(),
        }
    }

    fn field(field: &'static str, rule: &'static str, message: &str) -> Self {
        Self {
            field: Some(field),
            ..Self::new(IssueKind::Field, rule, message.to_string())
        }
    }

    fn element(index: usize, rule: &'static str, message: String) -> Self {
        Self {
            element: Some(index),
            ..Self::new(IssueKind::Element, rule, message)
        }
    }

    fn connection(index: usize, rule: &'static str, message: String) -> Self {
        Self {
            connection: Some(index),
            ..Self::new(IssueKind::Connection, rule, message)
        }
    }

    fn layout(index: usize, rule: &'static str, message: String) -> Self {
        Self {
            element: Some(index),
            ..Self::new(IssueKind::Layout, rule, message)
        }
    }
}

/// Outcome of validating one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// `true` iff there are no errors. Warnings never affect validity.
    pub valid: bool,
    /// Findings that make the document invalid, in pass order.
    pub errors: Vec<Issue>,
    /// Advisory findings, in pass order.
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    /// Report for an absent document. No passes run.
    pub fn missing_document() -> Self {
        Self::critical("Use Case ist leer oder undefined".to_string())
    }

    /// Report carrying a single critical error.
    pub fn critical(message: String) -> Self {
        Self {
            valid: false,
            errors: vec![Issue::new(IssueKind::Critical, "critical", message)],
            warnings: Vec::new(),
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Count-based summary, e.g. "2 Fehler, 3 Warnungen".
    pub fn summary(&self) -> String {
        if self.errors.is_empty() && self.warnings.is_empty() {
            return "Use Case ist valide".to_string();
        }
        let mut parts = Vec::new();
        if !self.errors.is_empty() {
            parts.push(format!("{} Fehler", self.errors.len()));
        }
        if !self.warnings.is_empty() {
            parts.push(format!("{} Warnungen", self.warnings.len()));
        }
        parts.join(", ")
    }

    /// Issues produced by a given rule, errors first.
    pub fn by_rule<'r>(&'r self, rule: &'r str) -> impl Iterator<Item = &'r Issue> + 'r {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .filter(move |i| i.rule == rule)
    }

    fn error(&mut self, issue: Issue) {
        self.errors.push(issue);
    }

    fn warn(&mut self, issue: Issue) {
        self.warnings.push(issue);
    }
}

// ─── Validator ───────────────────────────────────────────────────────────

/// Options for [`DocumentValidator`].
#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    /// Run the overlap and negative-position checks. Default: **true**.
    pub validate_layout: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            validate_layout: true,
        }
    }
}

/// Validates documents, optionally against a component catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentValidator<'a> {
    catalog: Option<&'a Catalog>,
    options: ValidateOptions,
}

impl<'a> DocumentValidator<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also check block names against `catalog`.
    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_options(mut self, options: ValidateOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every pass over `doc` and collect the findings.
    #[must_use]
    pub fn validate(&self, doc: &Document) -> ValidationReport {
        let mut report = ValidationReport::default();

        check_fields(doc, &mut report);
        check_elements(doc, &mut report);
        check_containment(doc, &mut report);
        check_connections(doc, &mut report);
        if let Some(catalog) = self.catalog {
            check_block_names(doc, catalog, &mut report);
        }
        if self.options.validate_layout {
            check_layout(doc, &mut report);
        }

        report.valid = report.errors.is_empty();
        log::debug!(
            "validated {:?}: {} errors, {} warnings",
            doc.name.as_deref().unwrap_or(""),
            report.error_count(),
            report.warning_count()
        );
        report
    }
}

// ─── Passes ──────────────────────────────────────────────────────────────

fn is_blank(s: Option<&str>) -> bool {
    s.is_none_or(|s| s.trim().is_empty())
}

/// Name is required; the other metadata is advisory.
fn check_fields(doc: &Document, report: &mut ValidationReport) {
    if is_blank(doc.name.as_deref()) {
        report.error(Issue::field(
            "name",
            "missing-name",
            "Use Case Name ist erforderlich",
        ));
    }
    if is_blank(doc.phase_id.as_deref()) {
        report.warn(Issue::field(
            "phaseId",
            "missing-phase",
            "Keine Phase zugewiesen",
        ));
    }
    if is_blank(doc.description.as_deref()) {
        report.warn(Issue::field(
            "description",
            "missing-description",
            "Beschreibung fehlt",
        ));
    }
    if is_blank(doc.business_value.as_deref()) {
        report.warn(Issue::field(
            "businessValue",
            "missing-business-value",
            "Business Value nicht definiert",
        ));
    }
    if is_blank(doc.owner.as_deref()) {
        report.warn(Issue::field(
            "owner",
            "missing-owner",
            "Kein Owner zugewiesen",
        ));
    }
}

fn check_elements(doc: &Document, report: &mut ValidationReport) {
    if doc.elements.is_empty() {
        report.warn(Issue::new(
            IssueKind::Elements,
            "no-elements",
            "Keine Elemente vorhanden".to_string(),
        ));
        return;
    }

    let mut seen = HashSet::new();
    for (i, el) in doc.elements.iter().enumerate() {
        if let Some(id) = el.id
            && !seen.insert(id)
        {
            report.error(Issue::element(
                i,
                "duplicate-element-id",
                format!("Doppelte Element-ID: {id}"),
            ));
        }

        if is_blank(el.type_tag()) {
            report.error(Issue::element(
                i,
                "missing-type",
                format!("Element {i} hat keinen Typ"),
            ));
        }

        if el.position().is_none() {
            report.error(Issue::element(
                i,
                "missing-position",
                format!("Element {i} hat keine Position (x/y)"),
            ));
        }

        match &el.kind {
            ElementKind::Container {
                name,
                width,
                height,
            } => {
                if is_blank(name.as_deref()) {
                    report.warn(Issue::element(
                        i,
                        "unnamed-container",
                        format!("Container {i} hat keinen Namen"),
                    ));
                }
                let positive = |v: &Option<f64>| v.is_some_and(|v| v > 0.0);
                if !positive(width) || !positive(height) {
                    report.error(Issue::element(
                        i,
                        "missing-size",
                        format!("Container {i} hat keine Groesse (width/height)"),
                    ));
                }
            }
            ElementKind::Block {
                block_name,
                block_id,
                ..
            } => {
                if is_blank(block_name.as_deref()) && is_blank(block_id.as_deref()) {
                    report.error(Issue::element(
                        i,
                        "missing-block-ref",
                        format!("Block {i} hat keinen blockName oder blockId"),
                    ));
                }
            }
        }
    }
}

/// Inclusive rectangle test against a container's bounds.
fn contains(container: &Element, px: f64, py: f64) -> bool {
    let Some((cx, cy)) = container.position() else {
        return false;
    };
    let (w, h) = match container.size() {
        Some((w, h)) => (w.unwrap_or(0.0), h.unwrap_or(0.0)),
        None => return false,
    };
    px >= cx && px <= cx + w && py >= cy && py <= cy + h
}

/// Blocks placed outside every container. Only meaningful once the
/// document has containers at all.
fn check_containment(doc: &Document, report: &mut ValidationReport) {
    let containers: Vec<&Element> = doc.elements.iter().filter(|e| e.is_container()).collect();
    if containers.is_empty() {
        return;
    }

    for (i, el) in doc.elements.iter().enumerate() {
        if el.is_container() {
            continue;
        }
        // Unpositioned blocks already carry a missing-position error.
        let Some((x, y)) = el.position() else {
            continue;
        };
        if !containers.iter().any(|c| contains(c, x, y)) {
            let label = el.block_name().map_or_else(|| i.to_string(), str::to_string);
            let mut issue = Issue::layout(
                i,
                "orphan-block",
                format!("Block \"{label}\" liegt ausserhalb aller Container"),
            );
            issue.block_name = el.block_name().map(str::to_string);
            report.warn(issue);
        }
    }
}

fn endpoint_label(ep: &Endpoint) -> String {
    match ep {
        Endpoint::Index(i) => i.to_string(),
        Endpoint::Element(id) => id.to_string(),
    }
}

fn check_endpoint(
    doc: &Document,
    index: usize,
    ep: Option<&Endpoint>,
    side: &str,
    report: &mut ValidationReport,
) -> Option<usize> {
    let Some(ep) = ep else {
        report.error(Issue::connection(
            index,
            "missing-endpoint",
            format!("Connection {index} hat keinen {side}Index/{side}"),
        ));
        return None;
    };

    let resolved = doc.resolve_endpoint(ep);
    if resolved.is_none() {
        let message = match ep {
            Endpoint::Index(n) => format!(
                "Connection {index}: {side}Index {n} ist ungueltig (max: {})",
                doc.elements.len() as i64 - 1
            ),
            Endpoint::Element(id) => {
                format!("Connection {index}: {side} verweist auf unbekanntes Element {id}")
            }
        };
        report.error(Issue::connection(index, "dangling-endpoint", message));
    }
    resolved
}

/// Anchor text to check: the typed value, or a non-string value kept raw.
/// Falsy raw values (`false`, `0`, `""`) count as unset.
fn anchor_text(typed: Option<&str>, raw: Option<&Value>) -> Option<String> {
    if let Some(a) = typed {
        return Some(a.to_string());
    }
    match raw? {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn check_anchor(index: usize, anchor: Option<String>, side: &str, report: &mut ValidationReport) {
    if let Some(a) = anchor.filter(|a| !a.is_empty())
        && Anchor::parse(&a).is_none()
    {
        report.warn(Issue::connection(
            index,
            "invalid-anchor",
            format!("Connection {index}: Ungueltiger {side}Anchor \"{a}\""),
        ));
    }
}

fn check_connections(doc: &Document, report: &mut ValidationReport) {
    let mut seen_ids = HashSet::new();

    for (i, conn) in doc.connections.iter().enumerate() {
        if let Some(id) = conn.id
            && !seen_ids.insert(id)
        {
            report.error(Issue::connection(
                i,
                "duplicate-connection-id",
                format!("Doppelte Connection-ID: {id}"),
            ));
        }

        let from = check_endpoint(doc, i, conn.from.as_ref(), "from", report);
        let to = check_endpoint(doc, i, conn.to.as_ref(), "to", report);

        let self_loop = match (conn.from, conn.to) {
            (Some(a), Some(b)) => a == b || (from.is_some() && from == to),
            _ => false,
        };
        if self_loop {
            report.error(Issue::connection(
                i,
                "self-loop",
                format!("Connection {i}: Element kann nicht mit sich selbst verbunden sein"),
            ));
        }

        let from_anchor = anchor_text(conn.from_anchor.as_deref(), conn.extra.get("fromAnchor"));
        let to_anchor = anchor_text(conn.to_anchor.as_deref(), conn.extra.get("toAnchor"));
        check_anchor(i, from_anchor, "from", report);
        check_anchor(i, to_anchor, "to", report);
    }

    // Direction-sensitive: A→B and B→A are distinct pairs.
    let mut pairs = HashSet::new();
    for (i, conn) in doc.connections.iter().enumerate() {
        let (Some(from), Some(to)) = (conn.from, conn.to) else {
            continue;
        };
        let normalize = |ep: Endpoint| {
            doc.resolve_endpoint(&ep)
                .map_or(ep, |idx| Endpoint::Index(idx as i64))
        };
        let (from, to) = (normalize(from), normalize(to));
        if !pairs.insert((from, to)) {
            report.warn(Issue::connection(
                i,
                "duplicate-connection",
                format!(
                    "Doppelte Verbindung zwischen Element {} und {}",
                    endpoint_label(&from),
                    endpoint_label(&to)
                ),
            ));
        }
    }
}

/// Resolve each block name against the catalog: exact, then
/// case-insensitive, then nearest names by edit distance.
fn check_block_names(doc: &Document, catalog: &Catalog, report: &mut ValidationReport) {
    let valid = catalog.valid_block_names();
    let valid_lower: Vec<String> = valid.iter().map(|n| n.to_lowercase()).collect();

    for (i, el) in doc.elements.iter().enumerate() {
        if el.is_container() {
            continue;
        }
        let Some(name) = el.block_name().filter(|n| !n.is_empty()) else {
            continue;
        };
        if valid.contains(&name) {
            continue;
        }

        let mut issue = Issue {
            element: Some(i),
            block_name: Some(name.to_string()),
            ..Issue::new(IssueKind::BlockName, "unknown-block", String::new())
        };

        let lower = name.to_lowercase();
        if let Some(pos) = valid_lower.iter().position(|n| *n == lower) {
            let canonical = valid[pos];
            issue.rule = "block-name-case";
            issue.message =
                format!("Block \"{name}\" - Schreibweise korrigieren zu \"{canonical}\"");
            issue.suggestions = smallvec![canonical.to_string()];
            report.warn(issue);
            continue;
        }

        let similar = find_similar_names(name, &valid, MAX_SUGGESTION_DISTANCE);
        issue.message = if similar.is_empty() {
            format!("Block \"{name}\" existiert nicht in der Komponenten-Bibliothek")
        } else {
            format!(
                "Block \"{name}\" existiert nicht in der Bibliothek. Meinten Sie: {}?",
                similar.join(", ")
            )
        };
        issue.suggestions = similar;
        report.error(issue);
    }
}

fn footprints_overlap(a: (f64, f64), b: (f64, f64)) -> bool {
    let (w, h) = BLOCK_FOOTPRINT;
    !(a.0 + w < b.0 || b.0 + w < a.0 || a.1 + h < b.1 || b.1 + h < a.1)
}

fn check_layout(doc: &Document, report: &mut ValidationReport) {
    let blocks: Vec<(usize, &Element, (f64, f64))> = doc
        .elements
        .iter()
        .enumerate()
        .filter(|(_, e)| !e.is_container())
        .filter_map(|(i, e)| e.position().map(|p| (i, e, p)))
        .collect();

    let label = |i: usize, e: &Element| e.block_name().map_or_else(|| i.to_string(), str::to_string);

    for (n, &(i, a, pa)) in blocks.iter().enumerate() {
        for &(j, b, pb) in &blocks[n + 1..] {
            if footprints_overlap(pa, pb) {
                report.warn(Issue::layout(
                    i,
                    "block-overlap",
                    format!(
                        "Bloecke \"{}\" und \"{}\" ueberlappen sich",
                        label(i, a),
                        label(j, b)
                    ),
                ));
            }
        }
    }

    for (i, el) in doc.elements.iter().enumerate() {
        let negative = el.x.is_some_and(|x| x < 0.0) || el.y.is_some_and(|y| y < 0.0);
        if negative {
            let name = el.display_name().map_or_else(|| i.to_string(), str::to_string);
            report.warn(Issue::layout(
                i,
                "negative-position",
                format!("Element \"{name}\" hat negative Position"),
            ));
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Connection;
    use pretty_assertions::assert_eq;

    fn complete_doc() -> Document {
        Document {
            description: Some("Telemetry to lakehouse".into()),
            owner: Some("Data Team".into()),
            phase_id: Some("phase-1".into()),
            business_value: Some("Faster diagnostics".into()),
            ..Document::new("Fleet Telemetry")
        }
    }

    fn block(id: &str, name: &str, x: f64, y: f64) -> Element {
        Element::block(id, name, x, y).unwrap()
    }

    #[test]
    fn empty_document_with_name_is_valid() {
        let report = DocumentValidator::new().validate(&Document::new("Empty"));
        assert!(report.valid);
        assert!(report.by_rule("no-elements").count() == 1);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn missing_name_is_error_blank_metadata_is_warning() {
        let doc = Document {
            name: Some("   ".into()),
            ..Default::default()
        };
        let report = DocumentValidator::new().validate(&doc);
        assert!(!report.valid);
        assert_eq!(report.errors[0].rule, "missing-name");
        let fields: Vec<_> = report
            .warnings
            .iter()
            .filter_map(|w| w.field)
            .collect();
        assert_eq!(fields, vec!["phaseId", "description", "businessValue", "owner"]);
    }

    #[test]
    fn summary_counts() {
        let clean = DocumentValidator::new().validate(&{
            let mut d = complete_doc();
            d.elements.push(block("b1", "IoT Hub", 10.0, 10.0));
            d
        });
        assert_eq!(clean.summary(), "Use Case ist valide");

        let report = DocumentValidator::new().validate(&Document::default());
        assert_eq!(report.summary(), "1 Fehler, 5 Warnungen");
    }

    #[test]
    fn non_string_anchor_warns_falsy_anchor_does_not() {
        let doc = Document::from_json(
            r#"{"name": "x", "elements": [
                {"id": "a", "type": "block", "blockName": "IoT Hub", "x": 0, "y": 0},
                {"id": "b", "type": "block", "blockName": "Kafka Streaming", "x": 300, "y": 0}
            ], "connections": [
                {"id": "k1", "fromIndex": 0, "toIndex": 1, "fromAnchor": 3, "toAnchor": false},
                {"id": "k2", "fromIndex": 1, "toIndex": 0, "fromAnchor": "", "toAnchor": 0}
            ]}"#,
        )
        .unwrap();
        let report = DocumentValidator::new().validate(&doc);

        let anchors: Vec<_> = report
            .by_rule("invalid-anchor")
            .map(|w| (w.connection, w.message.as_str()))
            .collect();
        assert_eq!(
            anchors,
            vec![(Some(0), "Connection 0: Ungueltiger fromAnchor \"3\"")]
        );
    }

    #[test]
    fn non_numeric_coordinate_is_missing_position() {
        let doc = Document::from_json(
            r#"{"name": "x", "elements": [
                {"id": "a", "type": "block", "blockName": "IoT Hub", "x": "10", "y": 0}
            ]}"#,
        )
        .unwrap();
        let report = DocumentValidator::new().validate(&doc);
        let rules: Vec<_> = report.errors.iter().map(|e| (e.rule, e.element)).collect();
        assert_eq!(rules, vec![("missing-position", Some(0))]);
    }

    #[test]
    fn element_structural_checks() {
        let doc = Document::from_json(
            r#"{"name": "x", "elements": [
                {"id": "a", "type": "block", "blockName": "IoT Hub", "x": 0, "y": 0},
                {"id": "a", "type": "block", "blockId": "kafka", "x": 500, "y": 0},
                {"id": "c", "type": "container", "x": 0},
                {"id": "d", "x": 900, "y": 900}
            ]}"#,
        )
        .unwrap();
        let report = DocumentValidator::new().validate(&doc);

        let rules: Vec<_> = report.errors.iter().map(|e| (e.rule, e.element)).collect();
        assert_eq!(
            rules,
            vec![
                ("duplicate-element-id", Some(1)),
                ("missing-position", Some(2)),
                ("missing-size", Some(2)),
                ("missing-type", Some(3)),
                ("missing-block-ref", Some(3)),
            ]
        );
        assert_eq!(report.by_rule("unnamed-container").count(), 1);
    }

    #[test]
    fn orphan_block_outside_all_containers() {
        let mut doc = complete_doc();
        doc.elements = vec![
            Element::container("z1", "Ingest", 0.0, 0.0, 300.0, 300.0).unwrap(),
            Element::container("z2", "Platform", 400.0, 0.0, 300.0, 300.0).unwrap(),
            block("b1", "IoT Hub", 1000.0, 1000.0),
        ];
        let report = DocumentValidator::new().validate(&doc);
        assert!(report.valid);
        let orphans: Vec<_> = report.by_rule("orphan-block").collect();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].element, Some(2));
        assert_eq!(orphans[0].block_name.as_deref(), Some("IoT Hub"));
    }

    #[test]
    fn container_edge_counts_as_inside() {
        let mut doc = complete_doc();
        doc.elements = vec![
            Element::container("z1", "Ingest", 0.0, 0.0, 300.0, 300.0).unwrap(),
            block("b1", "IoT Hub", 300.0, 300.0),
        ];
        let report = DocumentValidator::new().validate(&doc);
        assert_eq!(report.by_rule("orphan-block").count(), 0);
    }

    #[test]
    fn no_containers_no_orphans() {
        let mut doc = complete_doc();
        doc.elements = vec![block("b1", "IoT Hub", 5000.0, 5000.0)];
        let report = DocumentValidator::new().validate(&doc);
        assert_eq!(report.by_rule("orphan-block").count(), 0);
    }

    #[test]
    fn connection_one_past_end_is_single_error() {
        let mut doc = complete_doc();
        doc.elements = vec![
            block("a", "IoT Hub", 0.0, 0.0),
            block("b", "Kafka Streaming", 400.0, 0.0),
        ];
        doc.connections = vec![Connection::between("k1", 0, 2)];
        let report = DocumentValidator::new().validate(&doc);

        assert!(!report.valid);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].rule, "dangling-endpoint");
        assert_eq!(report.errors[0].connection, Some(0));
        assert_eq!(
            report.errors[0].message,
            "Connection 0: toIndex 2 ist ungueltig (max: 1)"
        );
    }

    #[test]
    fn connection_checks() {
        let doc = Document::from_json(
            r#"{"name": "x",
                "elements": [
                    {"id": "a", "type": "block", "blockName": "IoT Hub", "x": 0, "y": 0},
                    {"id": "b", "type": "block", "blockName": "IoT Hub", "x": 400, "y": 0}
                ],
                "connections": [
                    {"id": "k1", "fromIndex": 0, "toIndex": 1, "fromAnchor": "right", "toAnchor": "middle"},
                    {"id": "k1", "fromIndex": 0, "toIndex": 1},
                    {"id": "k3", "from": "b", "to": "a"},
                    {"id": "k4", "fromIndex": 1, "to": "b"},
                    {"id": "k5", "toIndex": -1},
                    {"id": "k6", "from": "ghost", "to": "a"}
                ]}"#,
        )
        .unwrap();
        let report = DocumentValidator::new().validate(&doc);

        let errors: Vec<_> = report
            .errors
            .iter()
            .map(|e| (e.rule, e.connection))
            .collect();
        assert_eq!(
            errors,
            vec![
                ("duplicate-connection-id", Some(1)),
                ("self-loop", Some(3)),
                ("missing-endpoint", Some(4)),
                ("dangling-endpoint", Some(4)),
                ("dangling-endpoint", Some(5)),
            ]
        );

        assert_eq!(report.by_rule("invalid-anchor").count(), 1);
        // k2 repeats k1; k3 is the reverse pair and is not flagged.
        let dups: Vec<_> = report.by_rule("duplicate-connection").collect();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].connection, Some(1));
    }

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "vehicleSystems": {"components": [
                    {"name": "Battery Management System", "shortName": "BMS"},
                    {"name": "Central Gateway"}
                ]},
                "dataIngestion": {"components": [
                    {"name": "Kafka Streaming", "shortName": "Kafka"},
                    {"name": "IoT Hub"}
                ]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn misspelled_block_gets_suggestions() {
        let catalog = catalog();
        let mut doc = complete_doc();
        doc.elements = vec![block("b1", "Battery managment System", 0.0, 0.0)];
        let report = DocumentValidator::new().with_catalog(&catalog).validate(&doc);

        assert!(!report.valid);
        let issue = &report.errors[0];
        assert_eq!(issue.kind, IssueKind::BlockName);
        assert_eq!(issue.suggestions[0], "Battery Management System");
        assert!(crate::fuzzy::levenshtein("Battery managment System", &issue.suggestions[0]) <= 5);
    }

    #[test]
    fn case_mismatch_is_warning_with_canonical_name() {
        let catalog = catalog();
        let mut doc = complete_doc();
        doc.elements = vec![
            block("b1", "kafka streaming", 0.0, 0.0),
            block("b2", "bms", 400.0, 0.0),
        ];
        let report = DocumentValidator::new().with_catalog(&catalog).validate(&doc);

        assert!(report.valid);
        let fixes: Vec<_> = report
            .by_rule("block-name-case")
            .map(|i| i.suggestions[0].as_str())
            .collect();
        assert_eq!(fixes, vec!["Kafka Streaming", "BMS"]);
    }

    #[test]
    fn unknown_block_without_near_miss() {
        let catalog = catalog();
        let mut doc = complete_doc();
        doc.elements = vec![block("b1", "Quantum Flux Capacitor", 0.0, 0.0)];
        let report = DocumentValidator::new().with_catalog(&catalog).validate(&doc);

        assert_eq!(report.error_count(), 1);
        assert!(report.errors[0].suggestions.is_empty());
        assert_eq!(
            report.errors[0].message,
            "Block \"Quantum Flux Capacitor\" existiert nicht in der Komponenten-Bibliothek"
        );
    }

    #[test]
    fn identical_positions_overlap_once() {
        let mut doc = complete_doc();
        doc.elements = vec![
            block("a", "IoT Hub", 100.0, 100.0),
            block("b", "IoT Hub", 100.0, 100.0),
        ];
        let report = DocumentValidator::new().validate(&doc);
        assert_eq!(report.by_rule("block-overlap").count(), 1);
    }

    #[test]
    fn layout_checks_can_be_disabled() {
        let mut doc = complete_doc();
        doc.elements = vec![
            block("a", "IoT Hub", -10.0, 0.0),
            block("b", "IoT Hub", -10.0, 0.0),
        ];
        let on = DocumentValidator::new().validate(&doc);
        assert_eq!(on.by_rule("block-overlap").count(), 1);
        assert_eq!(on.by_rule("negative-position").count(), 2);

        let off = DocumentValidator::new()
            .with_options(ValidateOptions {
                validate_layout: false,
            })
            .validate(&doc);
        assert_eq!(off.warning_count(), 0);
    }

    #[test]
    fn distant_blocks_do_not_overlap() {
        assert!(!footprints_overlap((0.0, 0.0), (161.0, 0.0)));
        assert!(footprints_overlap((0.0, 0.0), (160.0, 120.0)));
    }

    #[test]
    fn missing_document_report() {
        let report = ValidationReport::missing_document();
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, IssueKind::Critical);
    }
}
