//! Document model for pipeline diagrams.
//!
//! A document holds an ordered list of elements (containers and blocks) and
//! an ordered list of directed connections between them. Connections address
//! their endpoints either positionally (`fromIndex`/`toIndex`) or by element
//! ID, so element order is significant and is preserved exactly.
//!
//! The wire format is the camelCase JSON the builder persists and exports.
//! Elements go through an intermediate raw record so that the container/block
//! discriminant becomes an explicit Rust enum while unknown fields survive a
//! load/save round trip. A known field holding a value of the wrong type
//! (`"x": "10"`, `"fromAnchor": 3`) never fails the decode: the typed field
//! reads as absent and the raw value is kept in `extra` under its own key, so
//! the validator can report it and saving writes it back unchanged.

use crate::id::{ConnectionId, ElementId};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

/// JSON `type` tag that selects the container variant.
pub const CONTAINER_TYPE: &str = "container";

/// JSON `type` tag written for blocks created through [`Element::block`].
pub const BLOCK_TYPE: &str = "block";

// ─── Document ────────────────────────────────────────────────────────────

/// The diagram being edited: metadata, elements, and connections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub owner: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub phase_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    pub business_value: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub elements: Vec<Element>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub connections: Vec<Connection>,
    /// Fields this crate does not interpret (`id`, timestamps, requirements, …).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Decode a document from its JSON representation.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("invalid document: {e}"))
    }

    /// Encode the document as compact JSON.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string(self).map_err(|e| format!("failed to encode document: {e}"))
    }

    /// Position of the first element with the given ID.
    pub fn element_index(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == Some(id))
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == Some(id))
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|e| e.id == Some(id))
    }

    /// Position of the first connection with the given ID.
    pub fn connection_index(&self, id: ConnectionId) -> Option<usize> {
        self.connections.iter().position(|c| c.id == Some(id))
    }

    /// Resolve an endpoint to an element position, if it refers to one.
    pub fn resolve_endpoint(&self, endpoint: &Endpoint) -> Option<usize> {
        match *endpoint {
            Endpoint::Index(i) => usize::try_from(i)
                .ok()
                .filter(|&i| i < self.elements.len()),
            Endpoint::Element(id) => self.element_index(id),
        }
    }
}

// ─── Elements ────────────────────────────────────────────────────────────

/// A node placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawElement", into = "RawElement")]
pub struct Element {
    pub id: Option<ElementId>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub kind: ElementKind,
    /// Presentation fields not interpreted here (color, icon, notes, …).
    pub extra: Map<String, Value>,
}

/// Variant-specific element fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Grouping region. Blocks inside its rectangle belong to it.
    Container {
        name: Option<String>,
        width: Option<f64>,
        height: Option<f64>,
    },
    /// Instance of a catalog component. `type_name` keeps the raw `type`
    /// tag; `None` means the element had no type at all.
    Block {
        type_name: Option<String>,
        block_name: Option<String>,
        block_id: Option<String>,
    },
}

impl Element {
    /// Create a container. Width and height must be positive.
    pub fn container(
        id: &str,
        name: &str,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<Self, String> {
        if !(width > 0.0 && height > 0.0) {
            return Err(format!(
                "container `{id}` needs a positive size, got {width}x{height}"
            ));
        }
        Ok(Self {
            id: Some(ElementId::intern(id)),
            x: Some(x),
            y: Some(y),
            kind: ElementKind::Container {
                name: Some(name.to_string()),
                width: Some(width),
                height: Some(height),
            },
            extra: Map::new(),
        })
    }

    /// Create a block referring to a catalog component by name.
    pub fn block(id: &str, block_name: &str, x: f64, y: f64) -> Result<Self, String> {
        if block_name.trim().is_empty() {
            return Err(format!("block `{id}` needs a block name"));
        }
        Ok(Self {
            id: Some(ElementId::intern(id)),
            x: Some(x),
            y: Some(y),
            kind: ElementKind::Block {
                type_name: Some(BLOCK_TYPE.to_string()),
                block_name: Some(block_name.to_string()),
                block_id: None,
            },
            extra: Map::new(),
        })
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, ElementKind::Container { .. })
    }

    /// The raw `type` tag, `None` when the element has no type.
    pub fn type_tag(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Container { .. } => Some(CONTAINER_TYPE),
            ElementKind::Block { type_name, .. } => type_name.as_deref(),
        }
    }

    pub fn block_name(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Block { block_name, .. } => block_name.as_deref(),
            ElementKind::Container { .. } => None,
        }
    }

    /// Label used in messages and command descriptions.
    pub fn display_name(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Container { name, .. } => name.as_deref(),
            ElementKind::Block { block_name, .. } => block_name
                .as_deref()
                .or_else(|| self.extra.get("name").and_then(Value::as_str)),
        }
    }

    /// Both coordinates, when the element has a position.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }

    /// Container size as stored, `None` for blocks.
    pub fn size(&self) -> Option<(Option<f64>, Option<f64>)> {
        match self.kind {
            ElementKind::Container { width, height, .. } => Some((width, height)),
            ElementKind::Block { .. } => None,
        }
    }

    /// Read a property by its JSON key. Missing values read as `null`.
    pub fn property(&self, key: &str) -> Value {
        match (key, &self.kind) {
            ("id", _) => self
                .id
                .map_or(Value::Null, |id| Value::String(id.as_str().to_string())),
            ("type", _) => self
                .type_tag()
                .map_or(Value::Null, |t| Value::String(t.to_string())),
            ("x", _) => number_value(self.x),
            ("y", _) => number_value(self.y),
            ("name", ElementKind::Container { name, .. }) => string_value(name),
            ("width", ElementKind::Container { width, .. }) => number_value(*width),
            ("height", ElementKind::Container { height, .. }) => number_value(*height),
            ("blockName", ElementKind::Block { block_name, .. }) => string_value(block_name),
            ("blockId", ElementKind::Block { block_id, .. }) => string_value(block_id),
            _ => self.extra.get(key).cloned().unwrap_or(Value::Null),
        }
    }

    /// Write a property by its JSON key. `null` clears it.
    ///
    /// Typed keys are checked against the element variant; `id` and `type`
    /// are structural and cannot be changed here.
    pub fn set_property(&mut self, key: &str, value: Value) -> Result<(), String> {
        if matches!(key, "id" | "type") {
            return Err(format!("property `{key}` cannot be updated"));
        }
        match (key, &mut self.kind) {
            ("x", _) => self.x = expect_number(key, &value)?,
            ("y", _) => self.y = expect_number(key, &value)?,
            ("name", ElementKind::Container { name, .. }) => *name = expect_string(key, value)?,
            ("width", ElementKind::Container { width, .. }) => {
                *width = expect_number(key, &value)?;
            }
            ("height", ElementKind::Container { height, .. }) => {
                *height = expect_number(key, &value)?;
            }
            ("blockName", ElementKind::Block { block_name, .. }) => {
                *block_name = expect_string(key, value)?;
            }
            ("blockId", ElementKind::Block { block_id, .. }) => {
                *block_id = expect_string(key, value)?;
            }
            _ => {
                if value.is_null() {
                    self.extra.remove(key);
                } else {
                    self.extra.insert(key.to_string(), value);
                }
            }
        }
        Ok(())
    }
}

fn number_value(v: Option<f64>) -> Value {
    v.and_then(Number::from_f64).map_or(Value::Null, Value::Number)
}

fn string_value(v: &Option<String>) -> Value {
    v.as_ref().map_or(Value::Null, |s| Value::String(s.clone()))
}

fn expect_number(key: &str, value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        other => Err(format!("property `{key}` expects a number, got {other}")),
    }
}

fn expect_string(key: &str, value: Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(format!("property `{key}` expects a string, got {other}")),
    }
}

/// Flat wire form of an element.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ElementId>,
    #[serde(
        rename = "type",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_string"
    )]
    type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_id: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawElement> for Element {
    fn from(raw: RawElement) -> Self {
        let RawElement {
            id,
            type_name,
            x,
            y,
            name,
            width,
            height,
            block_name,
            block_id,
            mut extra,
        } = raw;

        let x = number_or_stash("x", x, &mut extra);
        let y = number_or_stash("y", y, &mut extra);

        // Fields that belong to the other variant are kept verbatim.
        let kind = if type_name.as_deref() == Some(CONTAINER_TYPE) {
            stash(&mut extra, "blockName", block_name);
            stash(&mut extra, "blockId", block_id);
            ElementKind::Container {
                name: text_or_stash("name", name, &mut extra),
                width: number_or_stash("width", width, &mut extra),
                height: number_or_stash("height", height, &mut extra),
            }
        } else {
            stash(&mut extra, "name", name);
            stash(&mut extra, "width", width);
            stash(&mut extra, "height", height);
            ElementKind::Block {
                type_name,
                block_name: text_or_stash("blockName", block_name, &mut extra),
                block_id: text_or_stash("blockId", block_id, &mut extra),
            }
        };

        Element {
            id,
            x,
            y,
            kind,
            extra,
        }
    }
}

impl From<Element> for RawElement {
    fn from(el: Element) -> Self {
        let mut raw = RawElement {
            id: el.id,
            x: number_field(el.x),
            y: number_field(el.y),
            extra: el.extra,
            ..Default::default()
        };
        match el.kind {
            ElementKind::Container {
                name,
                width,
                height,
            } => {
                raw.type_name = Some(CONTAINER_TYPE.to_string());
                raw.name = name.map(Value::String);
                raw.width = number_field(width);
                raw.height = number_field(height);
            }
            ElementKind::Block {
                type_name,
                block_name,
                block_id,
            } => {
                raw.type_name = type_name;
                raw.block_name = block_name.map(Value::String);
                raw.block_id = block_id.map(Value::String);
            }
        }
        // A typed value replaces any raw one kept from decoding.
        for (key, set) in [
            ("x", raw.x.is_some()),
            ("y", raw.y.is_some()),
            ("name", raw.name.is_some()),
            ("width", raw.width.is_some()),
            ("height", raw.height.is_some()),
            ("blockName", raw.block_name.is_some()),
            ("blockId", raw.block_id.is_some()),
        ] {
            if set {
                raw.extra.remove(key);
            }
        }
        raw
    }
}

// ─── Connections ─────────────────────────────────────────────────────────

/// One end of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Position in `Document::elements`. May be out of range in bad input.
    Index(i64),
    /// Stable element reference.
    Element(ElementId),
}

impl Endpoint {
    /// Whether this endpoint points at the element stored at `index` with `id`.
    pub fn touches(&self, index: usize, id: Option<ElementId>) -> bool {
        match *self {
            Endpoint::Index(i) => i == index as i64,
            Endpoint::Element(e) => Some(e) == id,
        }
    }
}

/// Attachment side of a connection end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
}

impl Anchor {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "top" => Some(Anchor::Top),
            "bottom" => Some(Anchor::Bottom),
            "left" => Some(Anchor::Left),
            "right" => Some(Anchor::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Anchor::Top => "top",
            Anchor::Bottom => "bottom",
            Anchor::Left => "left",
            Anchor::Right => "right",
        }
    }
}

/// A directed edge between two elements.
///
/// Anchors are kept as raw strings: documents with unknown anchor names
/// still load, and the validator reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConnection", into = "RawConnection")]
pub struct Connection {
    pub id: Option<ConnectionId>,
    pub from: Option<Endpoint>,
    pub to: Option<Endpoint>,
    pub from_anchor: Option<String>,
    pub to_anchor: Option<String>,
    pub extra: Map<String, Value>,
}

impl Connection {
    /// Index-addressed connection between two element positions.
    pub fn between(id: &str, from: usize, to: usize) -> Self {
        Self {
            id: Some(ConnectionId::intern(id)),
            from: Some(Endpoint::Index(from as i64)),
            to: Some(Endpoint::Index(to as i64)),
            from_anchor: None,
            to_anchor: None,
            extra: Map::new(),
        }
    }

    /// ID-addressed connection between two elements.
    pub fn linking(id: &str, from: ElementId, to: ElementId) -> Self {
        Self {
            from: Some(Endpoint::Element(from)),
            to: Some(Endpoint::Element(to)),
            ..Self::between(id, 0, 0)
        }
    }

    pub fn with_anchors(mut self, from: Anchor, to: Anchor) -> Self {
        self.from_anchor = Some(from.as_str().to_string());
        self.to_anchor = Some(to.as_str().to_string());
        self
    }

    /// Whether either end points at the element stored at `index` with `id`.
    pub fn touches(&self, index: usize, id: Option<ElementId>) -> bool {
        [self.from, self.to]
            .iter()
            .flatten()
            .any(|ep| ep.touches(index, id))
    }

    /// Apply `f` to every positional endpoint.
    pub fn map_indices(&mut self, f: impl Fn(i64) -> i64) {
        for ep in [&mut self.from, &mut self.to].into_iter().flatten() {
            if let Endpoint::Index(i) = ep {
                *i = f(*i);
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConnection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_index: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_index: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_anchor: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_anchor: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn endpoint_from_value(v: &Value) -> Option<Endpoint> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Endpoint::Index),
        Value::String(s) => Some(Endpoint::Element(ElementId::intern(s))),
        _ => None,
    }
}

/// `fromIndex` wins over the legacy `from`; a shadowed legacy value is kept.
fn pick_endpoint(
    index: Option<Value>,
    legacy: Option<Value>,
    keys: (&str, &str),
    extra: &mut Map<String, Value>,
) -> Option<Endpoint> {
    let (index_key, legacy_key) = keys;
    let picked = index.as_ref().and_then(endpoint_from_value);
    if picked.is_none() {
        stash(extra, index_key, index.filter(|v| !v.is_null()));
    }
    match picked {
        Some(ep) => {
            stash(extra, legacy_key, legacy);
            Some(ep)
        }
        None => {
            let ep = legacy.as_ref().and_then(endpoint_from_value);
            if ep.is_none() {
                stash(extra, legacy_key, legacy.filter(|v| !v.is_null()));
            }
            ep
        }
    }
}

impl From<RawConnection> for Connection {
    fn from(raw: RawConnection) -> Self {
        let mut extra = raw.extra;
        let from = pick_endpoint(raw.from_index, raw.from, ("fromIndex", "from"), &mut extra);
        let to = pick_endpoint(raw.to_index, raw.to, ("toIndex", "to"), &mut extra);
        Connection {
            id: raw.id,
            from,
            to,
            from_anchor: string_or_stash("fromAnchor", raw.from_anchor, &mut extra),
            to_anchor: string_or_stash("toAnchor", raw.to_anchor, &mut extra),
            extra,
        }
    }
}

impl From<Connection> for RawConnection {
    fn from(conn: Connection) -> Self {
        let mut raw = RawConnection {
            id: conn.id,
            from_anchor: conn.from_anchor.map(Value::String),
            to_anchor: conn.to_anchor.map(Value::String),
            extra: conn.extra,
            ..Default::default()
        };
        match conn.from {
            Some(Endpoint::Index(i)) => raw.from_index = Some(Value::from(i)),
            Some(Endpoint::Element(id)) => raw.from = Some(Value::from(id.as_str())),
            None => {}
        }
        match conn.to {
            Some(Endpoint::Index(i)) => raw.to_index = Some(Value::from(i)),
            Some(Endpoint::Element(id)) => raw.to = Some(Value::from(id.as_str())),
            None => {}
        }
        for (key, set) in [
            ("fromIndex", raw.from_index.is_some()),
            ("toIndex", raw.to_index.is_some()),
            ("fromAnchor", raw.from_anchor.is_some()),
            ("toAnchor", raw.to_anchor.is_some()),
        ] {
            if set {
                raw.extra.remove(key);
            }
        }
        raw
    }
}

// ─── Lenient field decoding ──────────────────────────────────────────────

fn stash(extra: &mut Map<String, Value>, key: &str, v: Option<Value>) {
    if let Some(v) = v {
        extra.insert(key.to_string(), v);
    }
}

fn number_field(v: Option<f64>) -> Option<Value> {
    v.and_then(Number::from_f64).map(Value::Number)
}

/// Numbers decode; `null` is absent; anything else is kept raw in `extra`.
fn number_or_stash(key: &str, v: Option<Value>, extra: &mut Map<String, Value>) -> Option<f64> {
    match v {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => {
            extra.insert(key.to_string(), other);
            None
        }
    }
}

/// Strings decode; `null` is absent; anything else is kept raw in `extra`.
fn string_or_stash(
    key: &str,
    v: Option<Value>,
    extra: &mut Map<String, Value>,
) -> Option<String> {
    match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            extra.insert(key.to_string(), other);
            None
        }
    }
}

/// Like [`value_to_string`], but arrays and objects are kept raw in `extra`.
fn text_or_stash(key: &str, v: Option<Value>, extra: &mut Map<String, Value>) -> Option<String> {
    match v {
        Some(v @ (Value::Array(_) | Value::Object(_))) => {
            extra.insert(key.to_string(), v);
            None
        }
        v => v.and_then(value_to_string),
    }
}

fn value_to_string(v: Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Accept strings, numbers, and booleans as text; anything else is absent.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(value_to_string))
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn container_and_block_discriminant() {
        let doc = Document::from_json(
            r#"{
                "name": "Fleet",
                "elements": [
                    {"id": "c1", "type": "container", "name": "Ingest", "x": 0, "y": 0, "width": 400, "height": 300},
                    {"id": "b1", "type": "block", "blockName": "Kafka Streaming", "x": 20, "y": 40},
                    {"id": "b2", "blockId": "kafka", "x": 20, "y": 40}
                ]
            }"#,
        )
        .unwrap();

        assert!(doc.elements[0].is_container());
        assert_eq!(doc.elements[0].size(), Some((Some(400.0), Some(300.0))));
        assert_eq!(doc.elements[1].block_name(), Some("Kafka Streaming"));
        assert_eq!(doc.elements[1].type_tag(), Some("block"));
        assert_eq!(doc.elements[2].type_tag(), None);
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let text = r##"{"name":"UC","elements":[{"id":"b1","type":"block","blockName":"IoT Hub","x":1.5,"y":2,"color":"#fff","name":"Hub"}],"connections":[],"createdAt":"2024-05-01"}"##;
        let doc = Document::from_json(text).unwrap();
        assert_eq!(doc.extra.get("createdAt"), Some(&Value::from("2024-05-01")));
        assert_eq!(doc.elements[0].display_name(), Some("IoT Hub"));

        let again = Document::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn wrongly_typed_fields_load_and_roundtrip() {
        let text = r#"{"name":"UC","elements":[
            {"id":"z","type":"container","name":"Z","x":"10","y":0,"width":"300","height":200},
            {"id":"b","type":"block","blockName":{"de":"Kafka"},"x":5,"y":5}
        ],"connections":[
            {"id":"k","fromIndex":0,"toIndex":true,"fromAnchor":3,"toAnchor":"left"}
        ]}"#;
        let doc = Document::from_json(text).unwrap();

        let zone = &doc.elements[0];
        assert_eq!(zone.position(), None);
        assert_eq!(zone.size(), Some((None, Some(200.0))));
        assert_eq!(zone.extra.get("x"), Some(&Value::from("10")));
        assert_eq!(zone.extra.get("width"), Some(&Value::from("300")));
        assert_eq!(doc.elements[1].block_name(), None);

        let conn = &doc.connections[0];
        assert_eq!(conn.to, None);
        assert_eq!(conn.from_anchor, None);
        assert_eq!(conn.extra.get("fromAnchor"), Some(&Value::from(3)));
        assert_eq!(conn.to_anchor.as_deref(), Some("left"));

        let saved: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(saved["elements"][0]["x"], Value::from("10"));
        assert_eq!(saved["elements"][0]["width"], Value::from("300"));
        assert_eq!(saved["elements"][1]["blockName"]["de"], Value::from("Kafka"));
        assert_eq!(saved["connections"][0]["toIndex"], Value::from(true));
        assert_eq!(saved["connections"][0]["fromAnchor"], Value::from(3));
        assert_eq!(Document::from_json(&doc.to_json().unwrap()).unwrap(), doc);
    }

    #[test]
    fn typed_value_replaces_kept_raw_value() {
        let mut doc =
            Document::from_json(r#"{"elements":[{"id":"b","type":"block","blockName":"IoT Hub","x":"10","y":0}]}"#)
                .unwrap();
        doc.elements[0].x = Some(40.0);

        let saved: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(saved["elements"][0]["x"], Value::from(40.0));
    }

    #[test]
    fn legacy_from_to_aliases() {
        let doc = Document::from_json(
            r#"{"connections": [
                {"id": "k1", "from": 0, "to": 1},
                {"id": "k2", "fromIndex": 2, "from": 9, "toIndex": 3},
                {"id": "k3", "from": "b1", "to": "b2", "fromAnchor": "right"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(doc.connections[0].from, Some(Endpoint::Index(0)));
        assert_eq!(doc.connections[1].from, Some(Endpoint::Index(2)));
        assert_eq!(doc.connections[1].extra.get("from"), Some(&Value::from(9)));
        assert_eq!(
            doc.connections[2].to,
            Some(Endpoint::Element(ElementId::intern("b2")))
        );
        assert_eq!(doc.connections[2].from_anchor.as_deref(), Some("right"));
    }

    #[test]
    fn null_lists_read_as_empty() {
        let doc = Document::from_json(r#"{"name": "x", "elements": null}"#).unwrap();
        assert!(doc.elements.is_empty());
        assert!(doc.connections.is_empty());
    }

    #[test]
    fn container_constructor_rejects_empty_size() {
        assert!(Element::container("c", "Zone", 0.0, 0.0, 0.0, 10.0).is_err());
        assert!(Element::block("b", "  ", 0.0, 0.0).is_err());
    }

    #[test]
    fn property_access_is_variant_aware() {
        let mut block = Element::block("b1", "IoT Hub", 10.0, 20.0).unwrap();
        assert_eq!(block.property("x"), Value::from(10.0));
        assert_eq!(block.property("width"), Value::Null);

        // `name` on a block is a free-form field.
        block.set_property("name", Value::from("Hub")).unwrap();
        assert_eq!(block.extra.get("name"), Some(&Value::from("Hub")));
        block.set_property("name", Value::Null).unwrap();
        assert!(block.extra.is_empty());

        assert!(block.set_property("x", Value::from("left")).is_err());
        assert!(block.set_property("type", Value::from("container")).is_err());

        let mut zone = Element::container("c1", "Zone", 0.0, 0.0, 100.0, 80.0).unwrap();
        zone.set_property("width", Value::from(250)).unwrap();
        assert_eq!(zone.size(), Some((Some(250.0), Some(80.0))));
    }

    #[test]
    fn resolve_endpoint_bounds() {
        let mut doc = Document::new("d");
        doc.elements
            .push(Element::block("a", "IoT Hub", 0.0, 0.0).unwrap());
        assert_eq!(doc.resolve_endpoint(&Endpoint::Index(0)), Some(0));
        assert_eq!(doc.resolve_endpoint(&Endpoint::Index(1)), None);
        assert_eq!(doc.resolve_endpoint(&Endpoint::Index(-1)), None);
        assert_eq!(
            doc.resolve_endpoint(&Endpoint::Element(ElementId::intern("a"))),
            Some(0)
        );
    }
}
