//! Reversible document edits.
//!
//! Every mutation is wrapped in a `Command` that captures, at construction,
//! whatever pre-image it needs to invert itself. Undo is then a pure function
//! of the captured state and never re-derives "what it was before" from a
//! document that later edits may have changed.
//!
//! Commands never own the document. It is passed in on every apply/revert.

use pb_core::model::ElementKind;
use pb_core::{Connection, ConnectionId, Document, Element, ElementId};
use serde_json::Value;
use std::time::SystemTime;

/// Closed interface over the command kinds.
pub trait Reversible {
    /// Forward effect.
    fn apply(&self, doc: &mut Document);
    /// Inverse effect. Only valid on the state `apply` produced.
    fn revert(&self, doc: &mut Document);
    /// Human-readable label for menus and notifications.
    fn describe(&self) -> &str;
}

/// The mutation a command performs, with its captured pre-image.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    AddElement {
        element: Box<Element>,
    },
    /// Removes the element and every connection touching it.
    RemoveElement {
        element: Box<Element>,
        /// Position the element occupied.
        index: usize,
        /// Removed connections with their original positions, ascending.
        connections: Vec<(usize, Connection)>,
    },
    MoveElement {
        id: ElementId,
        from: (Option<f64>, Option<f64>),
        to: (f64, f64),
    },
    ResizeElement {
        id: ElementId,
        from: (Option<f64>, Option<f64>),
        to: (f64, f64),
    },
    AddConnection {
        connection: Box<Connection>,
    },
    RemoveConnection {
        connection: Box<Connection>,
        index: usize,
    },
    UpdateProperty {
        id: ElementId,
        key: String,
        old: Value,
        new: Value,
    },
    /// Sub-commands applied in order and reverted in reverse order.
    Batch(Vec<Command>),
}

/// A reversible edit plus its label and creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub edit: Edit,
    pub description: String,
    pub created_at: SystemTime,
}

fn element_label(el: &Element) -> String {
    format!(
        "{}: {}",
        el.type_tag().unwrap_or("element"),
        el.display_name().unwrap_or("Element")
    )
}

fn unknown_element(id: ElementId) -> String {
    format!("no element with id `{id}`")
}

impl Command {
    fn new(edit: Edit, description: String) -> Self {
        Self {
            edit,
            description,
            created_at: SystemTime::now(),
        }
    }

    /// Append a copy of `element`. The element needs an ID so undo can find it.
    pub fn add_element(element: Element) -> Result<Self, String> {
        if element.id.is_none() {
            return Err("cannot add an element without an id".to_string());
        }
        let description = format!("Add {}", element_label(&element));
        Ok(Self::new(
            Edit::AddElement {
                element: Box::new(element),
            },
            description,
        ))
    }

    /// Remove an element, cascading to the connections that touch it.
    pub fn remove_element(doc: &Document, id: ElementId) -> Result<Self, String> {
        let index = doc.element_index(id).ok_or_else(|| unknown_element(id))?;
        let element = doc.elements[index].clone();
        let connections: Vec<(usize, Connection)> = doc
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.touches(index, Some(id)))
            .map(|(i, c)| (i, c.clone()))
            .collect();

        let description = format!("Remove {}", element_label(&element));
        Ok(Self::new(
            Edit::RemoveElement {
                element: Box::new(element),
                index,
                connections,
            },
            description,
        ))
    }

    /// Move an element, capturing its current position.
    pub fn move_element(doc: &Document, id: ElementId, to: (f64, f64)) -> Result<Self, String> {
        let el = doc.element(id).ok_or_else(|| unknown_element(id))?;
        Ok(Self::new(
            Edit::MoveElement {
                id,
                from: (el.x, el.y),
                to,
            },
            "Move element".to_string(),
        ))
    }

    /// Move recorded after a drag that already moved the element live.
    pub fn moved(id: ElementId, from: (f64, f64), to: (f64, f64)) -> Self {
        Self::new(
            Edit::MoveElement {
                id,
                from: (Some(from.0), Some(from.1)),
                to,
            },
            "Move element".to_string(),
        )
    }

    /// Resize a container, capturing its current size.
    pub fn resize_element(
        doc: &Document,
        id: ElementId,
        to: (f64, f64),
    ) -> Result<Self, String> {
        let el = doc.element(id).ok_or_else(|| unknown_element(id))?;
        let Some(from) = el.size() else {
            return Err(format!("element `{id}` is not a container"));
        };
        if !(to.0 > 0.0 && to.1 > 0.0) {
            return Err(format!("invalid size {}x{} for `{id}`", to.0, to.1));
        }
        Ok(Self::new(
            Edit::ResizeElement { id, from, to },
            "Resize element".to_string(),
        ))
    }

    /// Resize recorded after a drag handle already resized the container live.
    pub fn resized(id: ElementId, from: (f64, f64), to: (f64, f64)) -> Self {
        Self::new(
            Edit::ResizeElement {
                id,
                from: (Some(from.0), Some(from.1)),
                to,
            },
            "Resize element".to_string(),
        )
    }

    /// Append a copy of `connection`. The connection needs an ID.
    pub fn add_connection(connection: Connection) -> Result<Self, String> {
        if connection.id.is_none() {
            return Err("cannot add a connection without an id".to_string());
        }
        Ok(Self::new(
            Edit::AddConnection {
                connection: Box::new(connection),
            },
            "Add connection".to_string(),
        ))
    }

    pub fn remove_connection(doc: &Document, id: ConnectionId) -> Result<Self, String> {
        let index = doc
            .connection_index(id)
            .ok_or_else(|| format!("no connection with id `{id}`"))?;
        Ok(Self::new(
            Edit::RemoveConnection {
                connection: Box::new(doc.connections[index].clone()),
                index,
            },
            "Remove connection".to_string(),
        ))
    }

    /// Set one element property, capturing the current value.
    ///
    /// The new value is checked against the element up front, so applying
    /// the command later cannot fail.
    pub fn update_property(
        doc: &Document,
        id: ElementId,
        key: &str,
        new: Value,
    ) -> Result<Self, String> {
        let el = doc.element(id).ok_or_else(|| unknown_element(id))?;
        el.clone().set_property(key, new.clone())?;
        Ok(Self::new(
            Edit::UpdateProperty {
                id,
                key: key.to_string(),
                old: el.property(key),
                new,
            },
            format!("Update {key}"),
        ))
    }

    /// Group commands into one undo step.
    ///
    /// Each sub-command must have been built against the state left by the
    /// ones before it. `CommandHistory::begin_batch` does this automatically.
    pub fn batch(commands: Vec<Command>, description: Option<&str>) -> Self {
        let description = description.map_or_else(
            || format!("Batch: {} actions", commands.len()),
            str::to_string,
        );
        Self::new(Edit::Batch(commands), description)
    }
}

fn set_size(doc: &mut Document, id: ElementId, size: (Option<f64>, Option<f64>)) {
    if let Some(el) = doc.element_mut(id)
        && let ElementKind::Container { width, height, .. } = &mut el.kind
    {
        *width = size.0;
        *height = size.1;
    }
}

fn set_property(doc: &mut Document, id: ElementId, key: &str, value: &Value) {
    if let Some(el) = doc.element_mut(id)
        && let Err(e) = el.set_property(key, value.clone())
    {
        log::warn!("update of `{key}` on `{id}` skipped: {e}");
    }
}

impl Reversible for Command {
    fn apply(&self, doc: &mut Document) {
        match &self.edit {
            Edit::AddElement { element } => doc.elements.push((**element).clone()),
            Edit::RemoveElement {
                element,
                index,
                connections,
            } => {
                for (i, _) in connections.iter().rev() {
                    if *i < doc.connections.len() {
                        doc.connections.remove(*i);
                    }
                }
                if *index < doc.elements.len() && doc.elements[*index].id == element.id {
                    doc.elements.remove(*index);
                }
                // Keep positional endpoints pointing at the same elements.
                let removed = *index as i64;
                for conn in &mut doc.connections {
                    conn.map_indices(|i| if i > removed { i - 1 } else { i });
                }
            }
            Edit::MoveElement { id, to, .. } => {
                if let Some(el) = doc.element_mut(*id) {
                    el.x = Some(to.0);
                    el.y = Some(to.1);
                }
            }
            Edit::ResizeElement { id, to, .. } => {
                set_size(doc, *id, (Some(to.0), Some(to.1)));
            }
            Edit::AddConnection { connection } => doc.connections.push((**connection).clone()),
            Edit::RemoveConnection { connection, index } => {
                let pos = if doc.connections.get(*index).map(|c| c.id) == Some(connection.id) {
                    Some(*index)
                } else {
                    connection.id.and_then(|id| doc.connection_index(id))
                };
                if let Some(pos) = pos {
                    doc.connections.remove(pos);
                }
            }
            Edit::UpdateProperty { id, key, new, .. } => set_property(doc, *id, key, new),
            Edit::Batch(commands) => {
                for cmd in commands {
                    cmd.apply(doc);
                }
            }
        }
    }

    fn revert(&self, doc: &mut Document) {
        match &self.edit {
            Edit::AddElement { element } => {
                if let Some(pos) = doc.elements.iter().rposition(|e| e.id == element.id) {
                    doc.elements.remove(pos);
                }
            }
            Edit::RemoveElement {
                element,
                index,
                connections,
            } => {
                let removed = *index as i64;
                for conn in &mut doc.connections {
                    conn.map_indices(|i| if i >= removed { i + 1 } else { i });
                }
                let at = (*index).min(doc.elements.len());
                doc.elements.insert(at, (**element).clone());
                for (i, conn) in connections {
                    let at = (*i).min(doc.connections.len());
                    doc.connections.insert(at, conn.clone());
                }
            }
            Edit::MoveElement { id, from, .. } => {
                if let Some(el) = doc.element_mut(*id) {
                    el.x = from.0;
                    el.y = from.1;
                }
            }
            Edit::ResizeElement { id, from, .. } => set_size(doc, *id, *from),
            Edit::AddConnection { connection } => {
                if let Some(pos) = doc.connections.iter().rposition(|c| c.id == connection.id) {
                    doc.connections.remove(pos);
                }
            }
            Edit::RemoveConnection { connection, index } => {
                let at = (*index).min(doc.connections.len());
                doc.connections.insert(at, (**connection).clone());
            }
            Edit::UpdateProperty { id, key, old, .. } => set_property(doc, *id, key, old),
            Edit::Batch(commands) => {
                for cmd in commands.iter().rev() {
                    cmd.revert(doc);
                }
            }
        }
    }

    fn describe(&self) -> &str {
        &self.description
    }
}
