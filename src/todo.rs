//! Todo items and the list rules behind the todo table.
//!
//! Every item lives in the owner's database next to other document types, so
//! it carries the `@datatype` discriminator that the views and the query
//! index key on.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Value of `@datatype` for todo documents.
pub const TODO_DATATYPE: &str = "TodoItem";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid priority {0}, expected 0, 1 or 2")]
pub struct InvalidPriority(pub u8);

/// Priority stored as `0`, `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    /// Priority after one tap on the item: Low -> Medium -> High -> Low.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Medium => Self::High,
            Self::Low => Self::Medium,
        }
    }

    /// Priority for a scope label of the filter control.
    ///
    /// New items take the priority of the selected scope, so "All" and any
    /// unknown label map to `Low`.
    #[must_use]
    pub fn from_scope(label: &str) -> Self {
        match label {
            "Medium" => Self::Medium,
            "High" => Self::High,
            _ => Self::Low,
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Low),
            1 => Ok(Self::Medium),
            2 => Ok(Self::High),
            other => Err(InvalidPriority(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(rename = "@datatype", default = "default_datatype")]
    pub datatype: String,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
}

fn default_datatype() -> String {
    TODO_DATATYPE.to_string()
}

impl TodoItem {
    #[must_use]
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: None,
            rev: None,
            datatype: default_datatype(),
            name: name.into(),
            priority,
        }
    }

    /// Advance the priority one step and return the new value.
    pub fn cycle_priority(&mut self) -> Priority {
        self.priority = self.priority.next();
        self.priority
    }
}

/// Filter selected in the list header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    #[default]
    All,
    Only(Priority),
}

impl Scope {
    /// Only "Medium" and "High" narrow the list; everything else shows all items.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match Priority::from_scope(label) {
            Priority::Low => Self::All,
            priority => Self::Only(priority),
        }
    }

    #[must_use]
    pub fn matches(self, item: &TodoItem) -> bool {
        match self {
            Self::All => true,
            Self::Only(priority) => item.priority == priority,
        }
    }
}

/// Items visible under `scope`, sorted by name ignoring case.
#[must_use]
pub fn visible_items(items: &[TodoItem], scope: Scope) -> Vec<TodoItem> {
    let mut visible: Vec<TodoItem> = items
        .iter()
        .filter(|item| scope.matches(item))
        .cloned()
        .collect();
    visible.sort_by(|a, b| compare_names(&a.name, &b.name));
    visible
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
