//! In-memory keyed document table with a mutation feed.

use crate::errors::ErrorKind;
use crate::store::attribute::{AttributeMap, AttributeValue};
use crate::store::stream::{ChangeFeed, ChangeRecord, StreamEventKind};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// An update expression of the form `set name = :value, ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpression {
    /// The expression text.
    pub expression: String,
    /// Bound values, keyed by `:placeholder`.
    pub expression_values: AttributeMap,
}

impl UpdateExpression {
    /// Parses the expression into `(attribute, placeholder)` assignments.
    fn assignments(&self) -> Result<Vec<(String, String)>, ErrorKind> {
        let body = self
            .expression
            .trim()
            .strip_prefix("set ")
            .or_else(|| self.expression.trim().strip_prefix("SET "))
            .ok_or_else(|| {
                ErrorKind::validation(format!(
                    "unsupported update expression: '{}'",
                    self.expression
                ))
            })?;

        body.split(',')
            .map(|clause| {
                let (name, placeholder) = clause.split_once('=').ok_or_else(|| {
                    ErrorKind::validation(format!("malformed assignment: '{clause}'"))
                })?;
                let name = name.trim();
                let placeholder = placeholder.trim();
                if name.is_empty() || !placeholder.starts_with(':') {
                    return Err(ErrorKind::validation(format!(
                        "malformed assignment: '{clause}'"
                    )));
                }
                Ok((name.to_string(), placeholder.to_string()))
            })
            .collect()
    }
}

/// A keyed document table.
///
/// Rows are attribute maps keyed by their `id`. Conflicting writes to the
/// same key are serialized by the per-key map entry; the change feed
/// preserves per-key mutation order because records are emitted while the
/// entry is still held.
#[derive(Debug)]
pub struct DocumentTable {
    name: String,
    rows: DashMap<String, AttributeMap>,
    feed: ChangeFeed,
}

impl DocumentTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: DashMap::new(),
            feed: ChangeFeed::default(),
        }
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes a row, overwriting any existing row with the same key.
    ///
    /// Emits an `INSERT` record for a fresh key, `MODIFY` for an overwrite.
    pub fn put_item(&self, key: impl Into<String>, attributes: AttributeMap) -> AttributeMap {
        let key = key.into();
        let entry = self.rows.entry(key.clone());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let old = occupied.get().clone();
                *occupied.get_mut() = attributes.clone();
                self.feed.emit(
                    StreamEventKind::Modify,
                    key,
                    Some(attributes.clone()),
                    Some(old),
                );
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(attributes.clone());
                self.feed
                    .emit(StreamEventKind::Insert, key, Some(attributes.clone()), None);
            }
        }
        attributes
    }

    /// Applies an update expression to an existing row.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::NotFound` if the key does not exist and
    /// `ErrorKind::Validation` if the expression or its bound values are
    /// malformed. The row is untouched on error.
    pub fn update_item(
        &self,
        key: &str,
        update: &UpdateExpression,
    ) -> Result<AttributeMap, ErrorKind> {
        let assignments = update.assignments()?;

        let mut entry = self
            .rows
            .get_mut(key)
            .ok_or_else(|| ErrorKind::not_found(format!("no row with key '{key}'")))?;

        // Resolve every placeholder before mutating anything.
        let mut resolved: Vec<(String, AttributeValue)> = Vec::with_capacity(assignments.len());
        for (name, placeholder) in assignments {
            let value = update.expression_values.get(&placeholder).ok_or_else(|| {
                ErrorKind::validation(format!("unbound placeholder '{placeholder}'"))
            })?;
            resolved.push((name, value.clone()));
        }

        let old = entry.clone();
        for (name, value) in resolved {
            entry.insert(name, value);
        }
        let updated = entry.clone();
        self.feed.emit(
            StreamEventKind::Modify,
            key,
            Some(updated.clone()),
            Some(old),
        );
        Ok(updated)
    }

    /// Deletes a row, returning its last contents.
    ///
    /// Emits a `REMOVE` record when the row existed.
    pub fn delete_item(&self, key: &str) -> Option<AttributeMap> {
        let (key, old) = self.rows.remove(key)?;
        self.feed
            .emit(StreamEventKind::Remove, key, None, Some(old.clone()));
        Some(old)
    }

    /// Returns a snapshot of every row.
    #[must_use]
    pub fn scan(&self) -> Vec<AttributeMap> {
        self.rows.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Subscribes to the mutation feed at its latest position.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeRecord> {
        self.feed.subscribe()
    }
}
