//! Bounded undo/redo history with change listeners and debounced saving.
//!
//! `execute` applies a command and records it; `undo`/`redo` move commands
//! between the two stacks. Any new command clears the redo stack. The undo
//! stack is capped at `max_history`; the oldest entry is evicted first.
//!
//! Gestures that issue many small commands (dragging, multi-select delete)
//! wrap them in `begin_batch`/`end_batch` so they undo as one step.

use crate::commands::{Command, Reversible};
use crate::persist::{DebouncedSave, StateStore};
use pb_core::Document;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

/// Default key the document snapshot is saved under.
pub const DEFAULT_STORAGE_KEY: &str = "audi_dataplatform_builder";

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    /// Undo entries kept before the oldest is evicted.
    pub max_history: usize,
    /// Quiet period before a snapshot is written.
    pub save_delay: Duration,
    /// Key the serialized document is saved under.
    pub storage_key: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            save_delay: Duration::from_millis(500),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

/// What happened to the command passed to a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryAction {
    Execute,
    Undo,
    Redo,
}

impl HistoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

/// Handle returned by [`CommandHistory::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Snapshot of the stack sizes, for toolbar state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryInfo {
    /// Commands available to undo.
    pub history_len: usize,
    /// Commands available to redo.
    pub future_len: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

type Listener = Box<dyn FnMut(HistoryAction, &Command)>;

pub struct CommandHistory {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    config: HistoryConfig,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Commands applied live since the outermost `begin_batch`.
    batch: Vec<Command>,
    batch_description: Option<String>,
    saver: Option<DebouncedSave>,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl CommandHistory {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::with_capacity(config.max_history),
            redo_stack: Vec::new(),
            config,
            listeners: Vec::new(),
            next_listener: 0,
            batch_depth: 0,
            batch: Vec::new(),
            batch_description: None,
            saver: None,
        }
    }

    /// Save a snapshot to `store` after every operation, debounced by
    /// `save_delay`. Must be called inside a tokio runtime.
    pub fn with_persistence(mut self, store: Arc<dyn StateStore>) -> Result<Self, String> {
        self.saver = Some(DebouncedSave::new(
            store,
            self.config.storage_key.clone(),
            self.config.save_delay,
        )?);
        Ok(self)
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Apply `command` to `doc` and record it for undo.
    pub fn execute(&mut self, doc: &mut Document, command: Command) {
        command.apply(doc);
        if self.batch_depth > 0 {
            // Applied live; recorded as part of the batch at end_batch().
            self.batch.push(command);
            return;
        }
        log::debug!("execute: {}", command.describe());
        self.record(doc, command);
    }

    /// Start a batch group. Commands executed until the matching
    /// `end_batch()` are applied live but undo as one step.
    pub fn begin_batch(&mut self, description: &str) {
        if self.batch_depth == 0 {
            self.batch.clear();
            self.batch_description = Some(description.to_string());
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes, the collected
    /// commands are recorded as a single `Batch` command.
    pub fn end_batch(&mut self, doc: &Document) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return;
        }
        let description = self.batch_description.take();
        let commands = std::mem::take(&mut self.batch);
        if commands.is_empty() {
            return;
        }
        let command = Command::batch(commands, description.as_deref());
        log::debug!("execute: {}", command.describe());
        self.record(doc, command);
    }

    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    fn record(&mut self, doc: &Document, command: Command) {
        // Notify before the cap can evict it.
        notify(&mut self.listeners, HistoryAction::Execute, &command);
        self.undo_stack.push(command);
        while self.undo_stack.len() > self.config.max_history {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        self.schedule_save(doc);
    }

    /// Revert the most recent command. Returns `false` if there is none.
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        if self.batch_depth > 0 {
            log::warn!("undo ignored while a batch is open");
            return false;
        }
        let Some(cmd) = self.undo_stack.pop() else {
            log::info!("nothing to undo");
            return false;
        };
        log::debug!("undo: {}", cmd.describe());
        cmd.revert(doc);
        self.redo_stack.push(cmd);
        if let Some(cmd) = self.redo_stack.last() {
            notify(&mut self.listeners, HistoryAction::Undo, cmd);
        }
        self.schedule_save(doc);
        true
    }

    /// Re-apply the most recently undone command. Returns `false` if there is none.
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        if self.batch_depth > 0 {
            log::warn!("redo ignored while a batch is open");
            return false;
        }
        let Some(cmd) = self.redo_stack.pop() else {
            log::info!("nothing to redo");
            return false;
        };
        log::debug!("redo: {}", cmd.describe());
        cmd.apply(doc);
        self.undo_stack.push(cmd);
        if let Some(cmd) = self.undo_stack.last() {
            notify(&mut self.listeners, HistoryAction::Redo, cmd);
        }
        self.schedule_save(doc);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop both stacks. The document is left as is.
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("history cleared");
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(Reversible::describe)
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(Reversible::describe)
    }

    pub fn history_info(&self) -> HistoryInfo {
        HistoryInfo {
            history_len: self.undo_stack.len(),
            future_len: self.redo_stack.len(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Register a callback run after every execute, undo, and redo.
    pub fn add_listener(
        &mut self,
        listener: impl FnMut(HistoryAction, &Command) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Unregister a callback. Returns `false` if it was already gone.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(l, _)| *l != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn schedule_save(&mut self, doc: &Document) {
        let Some(saver) = self.saver.as_mut() else {
            return;
        };
        match doc.to_json() {
            Ok(json) => saver.schedule(json),
            Err(e) => log::error!("snapshot for `{}` skipped: {e}", saver.key()),
        }
    }
}

impl std::fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHistory")
            .field("info", &self.history_info())
            .field("listeners", &self.listeners.len())
            .field("batch_depth", &self.batch_depth)
            .field("saver", &self.saver)
            .finish()
    }
}

/// Run every listener; a panicking listener is logged and skipped.
fn notify(listeners: &mut [(ListenerId, Listener)], action: HistoryAction, cmd: &Command) {
    for (id, listener) in listeners.iter_mut() {
        let outcome = catch_unwind(AssertUnwindSafe(|| listener(action, cmd)));
        if outcome.is_err() {
            log::error!(
                "history listener {} panicked on {} of `{}`",
                id.0,
                action.as_str(),
                cmd.describe()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pb_core::{Element, ElementId};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn doc() -> Document {
        let mut doc = Document::new("History");
        doc.elements
            .push(Element::block("b", "IoT Hub", 0.0, 0.0).unwrap());
        doc
    }

    fn step(doc: &Document, x: f64) -> Command {
        Command::move_element(doc, ElementId::intern("b"), (x, 0.0)).unwrap()
    }

    fn x_of(doc: &Document) -> f64 {
        doc.element(ElementId::intern("b")).unwrap().x.unwrap()
    }

    #[test]
    fn undo_redo_cycle() {
        let mut doc = doc();
        let mut history = CommandHistory::default();

        let cmd = step(&doc, 10.0);
        history.execute(&mut doc, cmd);
        assert_eq!(history.undo_description(), Some("Move element"));
        assert!(history.undo(&mut doc));
        assert_eq!(x_of(&doc), 0.0);
        assert_eq!(history.redo_description(), Some("Move element"));
        assert!(history.redo(&mut doc));
        assert_eq!(x_of(&doc), 10.0);
    }

    #[test]
    fn empty_stacks_report_false() {
        let mut doc = doc();
        let mut history = CommandHistory::default();
        assert!(!history.undo(&mut doc));
        assert!(!history.redo(&mut doc));
        assert_eq!(doc, self::doc());
    }

    #[test]
    fn max_history_trims_oldest() {
        let mut doc = doc();
        let mut history = CommandHistory::new(HistoryConfig {
            max_history: 3,
            ..HistoryConfig::default()
        });
        for x in 1..=5 {
            let cmd = step(&doc, f64::from(x));
            history.execute(&mut doc, cmd);
        }
        assert_eq!(history.history_info().history_len, 3);
        while history.undo(&mut doc) {}
        // Moves to 1 and 2 were evicted and stay applied.
        assert_eq!(x_of(&doc), 2.0);
    }

    #[test]
    fn zero_capacity_still_notifies() {
        let mut doc = doc();
        let mut history = CommandHistory::new(HistoryConfig {
            max_history: 0,
            ..HistoryConfig::default()
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        history.add_listener(move |action, _| sink.borrow_mut().push(action));

        let cmd = step(&doc, 4.0);
        history.execute(&mut doc, cmd);

        assert_eq!(*seen.borrow(), vec![HistoryAction::Execute]);
        assert!(!history.can_undo());
        assert_eq!(x_of(&doc), 4.0);
    }

    #[test]
    fn nested_batch_records_once() {
        let mut doc = doc();
        let mut history = CommandHistory::default();

        history.begin_batch("Drag");
        for x in [5.0, 10.0] {
            let cmd = step(&doc, x);
            history.execute(&mut doc, cmd);
        }
        history.begin_batch("inner");
        let cmd = step(&doc, 15.0);
        history.execute(&mut doc, cmd);
        history.end_batch(&doc);
        assert!(history.in_batch());
        assert!(!history.can_undo());
        history.end_batch(&doc);

        assert_eq!(history.history_info().history_len, 1);
        assert_eq!(history.undo_description(), Some("Drag"));
        assert!(history.undo(&mut doc));
        assert_eq!(x_of(&doc), 0.0);
    }

    #[test]
    fn empty_batch_records_nothing() {
        let doc = doc();
        let mut history = CommandHistory::default();
        history.begin_batch("noop");
        history.end_batch(&doc);
        history.end_batch(&doc);
        assert!(!history.can_undo());
    }

    #[test]
    fn clear_history_keeps_document() {
        let mut doc = doc();
        let mut history = CommandHistory::default();
        let cmd = step(&doc, 7.0);
        history.execute(&mut doc, cmd);
        history.undo(&mut doc);
        let cmd = step(&doc, 9.0);
        history.execute(&mut doc, cmd);

        history.clear_history();
        assert_eq!(
            history.history_info(),
            HistoryInfo {
                history_len: 0,
                future_len: 0,
                can_undo: false,
                can_redo: false,
            }
        );
        assert_eq!(x_of(&doc), 9.0);
        assert_eq!(history.undo_description(), None);
    }

    #[test]
    fn listeners_see_each_action() {
        let mut doc = doc();
        let mut history = CommandHistory::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = history.add_listener(move |action, cmd| {
            sink.borrow_mut()
                .push(format!("{}:{}", action.as_str(), cmd.describe()));
        });

        let cmd = step(&doc, 3.0);
        history.execute(&mut doc, cmd);
        history.undo(&mut doc);
        history.redo(&mut doc);
        assert!(history.remove_listener(id));
        assert!(!history.remove_listener(id));
        history.undo(&mut doc);

        assert_eq!(
            *seen.borrow(),
            vec!["execute:Move element", "undo:Move element", "redo:Move element"]
        );
    }
}
