use std::collections::BTreeMap;

use lx_core::{ExecutionLogEntry, SourceReference, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Scope,
    LastNode,
}

/// Per-invocation log tree. The active list is addressed by an index path
/// from the root entries; saved paths restore the parent on close.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    entries: Vec<ExecutionLogEntry>,
    scope: Vec<usize>,
    saved: Vec<(ScopeKind, Vec<usize>)>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&mut self) -> &mut Vec<ExecutionLogEntry> {
        let Self { entries, scope, .. } = self;
        let mut list = entries;
        // Paths only ever point at entries that were pushed before.
        for &index in scope.iter() {
            list = &mut list[index].entries;
        }
        list
    }

    /// Appends an entry to the active list; `variables` are already owned
    /// copies, so later writes to live values never reach the log.
    pub fn log(
        &mut self,
        message: impl Into<String>,
        reference: Option<SourceReference>,
        variables: BTreeMap<String, Value>,
    ) {
        self.current()
            .push(ExecutionLogEntry::new(message, reference).with_read_variables(variables));
    }

    /// Note on the most recent entry, e.g. the row a table lookup matched.
    pub fn log_child(&mut self, message: impl Into<String>, reference: Option<SourceReference>) {
        let entry = ExecutionLogEntry::new(message, reference);
        let inside_last_node = matches!(self.saved.last(), Some((ScopeKind::LastNode, _)));
        let list = self.current();
        if !inside_last_node {
            if let Some(last) = list.last_mut() {
                last.entries.push(entry);
                return;
            }
        }
        list.push(entry);
    }

    /// Records the values a statement wrote on its log entry.
    pub fn add_write_variables(&mut self, variables: BTreeMap<String, Value>) {
        if let Some(last) = self.current().last_mut() {
            last.write_variables.extend(variables);
        }
    }

    pub fn open_scope(&mut self, message: impl Into<String>, reference: Option<SourceReference>) {
        self.log(message, reference, BTreeMap::new());
        self.enter(ScopeKind::Scope);
    }

    pub fn close_scope(&mut self) {
        self.leave();
    }

    pub fn use_last_node_as_scope(&mut self) {
        self.enter(ScopeKind::LastNode);
    }

    pub fn revert_to_parent_scope(&mut self) {
        self.leave();
    }

    fn enter(&mut self, kind: ScopeKind) {
        let last = self.current().len().checked_sub(1);
        self.saved.push((kind, self.scope.clone()));
        if let Some(last) = last {
            self.scope.push(last);
        }
    }

    fn leave(&mut self) {
        if let Some((_, scope)) = self.saved.pop() {
            self.scope = scope;
        }
    }

    /// Runs `body` inside a new scope, closing it on every exit path.
    pub fn in_scope<T>(
        &mut self,
        message: impl Into<String>,
        reference: Option<SourceReference>,
        body: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.open_scope(message, reference);
        let result = body(self);
        self.close_scope();
        result
    }

    /// Runs `body` with the last logged entry as the active scope.
    pub fn in_last_node<T>(&mut self, body: impl FnOnce(&mut Self) -> T) -> T {
        self.use_last_node_as_scope();
        let result = body(self);
        self.revert_to_parent_scope();
        result
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn entries(&self) -> &[ExecutionLogEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ExecutionLogEntry> {
        self.entries
    }
}
