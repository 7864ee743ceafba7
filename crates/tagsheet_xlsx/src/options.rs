//! Dropdown option sets rendered as list data validations.

use std::collections::BTreeMap;

use rust_xlsxwriter::DataValidation;

use crate::spec::Result;

/// Column letter -> permissible values.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecOptionSet {
    dict_options: BTreeMap<String, Vec<String>>,
}

impl SpecOptionSet {
    /// Empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the values for one column, replacing any previous values.
    pub fn add_options<I, S>(mut self, col: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dict_options
            .insert(col.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Union `other` into `self`; `other` wins on shared columns.
    pub fn merge(&mut self, other: SpecOptionSet) -> &mut Self {
        self.dict_options.extend(other.dict_options);
        self
    }

    /// Values for a column.
    pub fn get(&self, col: &str) -> Option<&[String]> {
        self.dict_options.get(col).map(Vec::as_slice)
    }

    /// `(column, values)` pairs in column-letter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.dict_options
            .iter()
            .map(|(col, values)| (col.as_str(), values.as_slice()))
    }

    /// Number of columns carrying options.
    pub fn len(&self) -> usize {
        self.dict_options.len()
    }

    /// Whether no column carries options.
    pub fn is_empty(&self) -> bool {
        self.dict_options.is_empty()
    }
}

/// Build a dropdown list validation for `values`.
pub fn derive_list_validation(values: &[String]) -> Result<DataValidation> {
    let l_values: Vec<&str> = values.iter().map(String::as_str).collect();
    Ok(DataValidation::new().allow_list_strings(&l_values)?)
}
