//! # Query filters, call options, and edges.
//!
//! Builder-style equivalents of the registry's variadic options: an
//! [`ItemFilter`] narrows `list`/`get`/`watch` by kind, name, and action;
//! [`RegisterOptions`] attaches an edge on register and controls cascade /
//! fail-fast behavior on deregister.

use std::collections::HashMap;

use crate::registry::item::{ItemKind, RegistryItem};
use crate::registry::watch::RegistryEvent;

/// Edge label from a root node to the servers and services it owns.
pub const EDGE_NODE: &str = "Node";

/// Edge label from a parent process's root to a forked child's root.
pub const EDGE_FORK: &str = "Fork";

/// Kind of change a watch event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Matches every action (filter use only).
    Any,
    /// An item appeared.
    Create,
    /// An item changed.
    Update,
    /// An item was removed.
    Delete,
}

/// A labeled, directed edge between two items.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Source item id.
    pub from: String,
    /// Target item id.
    pub to: String,
    /// Edge label, e.g. [`EDGE_NODE`] or [`EDGE_FORK`].
    pub label: String,
    /// Arbitrary edge metadata.
    pub metadata: HashMap<String, String>,
}

/// Filter for `list`, `get`, and `watch`.
///
/// Kinds and actions are ORed within their axis; an empty axis matches
/// everything.
#[derive(Clone, Debug, Default)]
pub struct ItemFilter {
    kinds: Vec<ItemKind>,
    name: Option<String>,
    actions: Vec<ActionKind>,
}

impl ItemFilter {
    /// Creates an empty filter (matches every item and action).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item kind to match (ORed with previously added kinds).
    pub fn kind(mut self, kind: ItemKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Restricts to items with the given name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an action kind to match (watch only).
    pub fn action(mut self, action: ActionKind) -> Self {
        self.actions.push(action);
        self
    }

    /// True when the item passes the kind and name axes.
    pub fn matches_item(&self, item: &dyn RegistryItem) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&item.kind()) {
            return false;
        }
        match &self.name {
            Some(n) => item.name() == n,
            None => true,
        }
    }

    /// True when the action passes the action axis.
    pub fn matches_action(&self, action: ActionKind) -> bool {
        self.actions.is_empty()
            || self.actions.contains(&ActionKind::Any)
            || self.actions.contains(&action)
    }

    /// True when a watch event passes the whole filter.
    pub fn matches_event(&self, event: &RegistryEvent) -> bool {
        self.matches_action(event.action) && self.matches_item(event.item.as_ref())
    }
}

/// Edge recorded alongside a `register` call.
#[derive(Clone, Debug)]
pub(crate) struct EdgeTo {
    pub(crate) other: String,
    pub(crate) label: String,
    pub(crate) metadata: HashMap<String, String>,
}

/// Options for `register` and `deregister`.
#[derive(Clone, Debug, Default)]
pub struct RegisterOptions {
    pub(crate) edge_to: Option<EdgeTo>,
    pub(crate) deregister_full: bool,
    pub(crate) fail_fast: bool,
}

impl RegisterOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// On register, also record an edge `other --label--> item`.
    pub fn with_edge_to(
        mut self,
        other: impl Into<String>,
        label: impl Into<String>,
        metadata: HashMap<String, String>,
    ) -> Self {
        self.edge_to = Some(EdgeTo {
            other: other.into(),
            label: label.into(),
            metadata,
        });
        self
    }

    /// On deregister, cascade removal through the item's outgoing edges.
    pub fn with_deregister_full(mut self) -> Self {
        self.deregister_full = true;
        self
    }

    /// Fail on the first backend error instead of proceeding best-effort.
    pub fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }
}
