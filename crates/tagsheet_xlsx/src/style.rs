//! Style tag parsing and the named preset registry.

use std::collections::BTreeMap;

use log::trace;

use crate::conf::{CHR_STYLE_TAG_SEP, derive_default_style_presets};
use crate::spec::{Result, SpecCellFormat, SpecStyleDescriptor, TagsheetError};

/// Registry of named cell formats that style tags may reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecStylePresets {
    dict_presets: BTreeMap<String, SpecCellFormat>,
}

impl Default for SpecStylePresets {
    fn default() -> Self {
        Self {
            dict_presets: derive_default_style_presets(),
        }
    }
}

impl SpecStylePresets {
    /// Registry holding only the built-in presets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a preset.
    pub fn register(&mut self, name: &str, fmt: SpecCellFormat) -> Result<&mut Self> {
        let c_name = name.trim();
        if c_name.is_empty() || c_name.contains(CHR_STYLE_TAG_SEP) {
            return Err(TagsheetError::invalid_argument(format!(
                "invalid style preset name: {name:?}"
            )));
        }
        self.dict_presets.insert(c_name.to_string(), fmt);
        Ok(self)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.dict_presets.contains_key(name)
    }

    /// Look up a preset by name.
    pub fn get(&self, name: &str) -> Option<&SpecCellFormat> {
        self.dict_presets.get(name)
    }

    /// Registered preset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.dict_presets.keys().map(String::as_str)
    }

    /// Overlay the named presets left to right onto an empty format.
    pub fn resolve<S: AsRef<str>>(&self, style_names: &[S]) -> Result<SpecCellFormat> {
        style_names
            .iter()
            .try_fold(SpecCellFormat::default(), |fmt_acc, name| {
                let name = name.as_ref();
                self.get(name)
                    .map(|fmt| fmt_acc.merge(fmt))
                    .ok_or_else(|| TagsheetError::UnknownStyle(name.to_string()))
            })
    }
}

/// Parse a style tag (`red-text-locked`, `locked, number-format-text`).
///
/// The returned descriptor has a default range; callers anchor it.
pub fn parse_style_tag(tag: &str, presets: &SpecStylePresets) -> Result<SpecStyleDescriptor> {
    let mut l_style_names = Vec::new();
    for c_part in tag.split(CHR_STYLE_TAG_SEP) {
        let c_name = c_part.trim();
        if c_name.is_empty() {
            return Err(TagsheetError::invalid_argument(format!(
                "empty style name in tag {tag:?}"
            )));
        }
        if !presets.contains(c_name) {
            return Err(TagsheetError::UnknownStyle(c_name.to_string()));
        }
        l_style_names.push(c_name.to_string());
    }
    trace!("parsed style tag {tag:?} into {l_style_names:?}");

    Ok(SpecStyleDescriptor {
        style_names: l_style_names,
        ..Default::default()
    })
}
