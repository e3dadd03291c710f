//! Column selection and its size limits.

use serde::{Deserialize, Serialize};

use reportflow_core::ValueObject;

use crate::error::ExportError;

/// Per-field cap on attribute, warehouse and channel identifiers.
pub const DEFAULT_COLUMN_LIMIT: usize = 100;

/// Columns requested for an export.
///
/// `fields` is an ordered list of plain field names with no size limit. The
/// three identifier lists are each capped independently and are stored exactly
/// as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub warehouses: Vec<String>,
    #[serde(default)]
    pub channels: Vec<String>,
}

impl ValueObject for ColumnSelection {}

impl ColumnSelection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_attributes<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_warehouses<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.warehouses = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_channels<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Size-limited fields, in the order they are checked.
    fn limited(&self) -> [(&'static str, &[String]); 3] {
        [
            ("attributes", &self.attributes),
            ("warehouses", &self.warehouses),
            ("channels", &self.channels),
        ]
    }
}

/// Enforces the per-field size limits of a [`ColumnSelection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSelectionValidator {
    limit: usize,
}

impl Default for ColumnSelectionValidator {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMN_LIMIT)
    }
}

impl ColumnSelectionValidator {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Reports the first field over the limit (attributes, then warehouses,
    /// then channels).
    pub fn validate(&self, columns: &ColumnSelection) -> Result<(), ExportError> {
        match columns
            .limited()
            .into_iter()
            .find(|(_, ids)| ids.len() > self.limit)
        {
            Some((field, _)) => Err(ExportError::limit_exceeded(field, self.limit)),
            None => Ok(()),
        }
    }
}
