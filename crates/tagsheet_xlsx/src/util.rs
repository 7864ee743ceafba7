//! Stateless helper utilities used by the sheet builder and workbook writer.

use std::sync::LazyLock;

use regex::Regex;

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::{Result, SpecStyleDescriptor, TagsheetError};

////////////////////////////////////////////////////////////////////////////////
// #region Addressing

/// Convert a 1-based column index to column letters (`1 -> A`, `27 -> AA`).
///
/// Bijective base-26: there is no zero digit, so `Z` is followed by `AA`.
pub fn column_letter(n_idx_col: u32) -> Result<String> {
    if n_idx_col == 0 {
        return Err(TagsheetError::addressing(
            "column index must be >= 1, got 0",
        ));
    }

    let mut l_chars = Vec::new();
    let mut n_rem = n_idx_col;
    while n_rem > 0 {
        let n_digit = (n_rem - 1) % 26;
        l_chars.push(char::from(b'A' + n_digit as u8));
        n_rem = (n_rem - 1) / 26;
    }

    Ok(l_chars.iter().rev().collect())
}

/// Convert column letters back to a 1-based column index.
pub fn column_letter_to_index(col: &str) -> Result<u32> {
    if col.is_empty() {
        return Err(TagsheetError::addressing("empty column reference"));
    }

    let mut n_idx: u32 = 0;
    for chr in col.chars() {
        if !chr.is_ascii_uppercase() {
            return Err(TagsheetError::addressing(format!(
                "invalid column reference: {col:?}"
            )));
        }
        let n_digit = u32::from(chr as u8 - b'A' + 1);
        n_idx = n_idx
            .checked_mul(26)
            .and_then(|val| val.checked_add(n_digit))
            .ok_or_else(|| {
                TagsheetError::addressing(format!("column reference overflow: {col:?}"))
            })?;
    }

    Ok(n_idx)
}

/// Format the fixed-column (`A`) address of a 1-based row.
pub fn row_address(n_row: u32) -> Result<String> {
    if n_row == 0 {
        return Err(TagsheetError::addressing("row index must be >= 1, got 0"));
    }
    Ok(format!("A{n_row}"))
}

static RE_COLUMN_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+$").expect("constant column pattern"));

/// Whether `name` is a bare column reference (uppercase letters only).
pub fn is_column_reference(name: &str) -> bool {
    RE_COLUMN_REFERENCE.is_match(name)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNames

/// Validate a sheet name against Excel naming rules.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(TagsheetError::invalid_argument(
            "need a sheet name at least",
        ));
    }
    if name.chars().count() > N_LEN_EXCEL_SHEET_NAME_MAX {
        return Err(TagsheetError::invalid_argument(format!(
            "sheet name {name:?} exceeds {N_LEN_EXCEL_SHEET_NAME_MAX} characters"
        )));
    }
    if let Some(c_illegal) = TUP_EXCEL_ILLEGAL.iter().find(|c| name.contains(**c)) {
        return Err(TagsheetError::invalid_argument(format!(
            "sheet name {name:?} contains illegal character {c_illegal:?}"
        )));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(TagsheetError::invalid_argument(format!(
            "sheet name {name:?} cannot start or end with an apostrophe"
        )));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleMerge

/// Collapse runs of horizontally adjacent descriptors with identical styles.
///
/// Input is an ordered list of per-column descriptors. A descriptor is folded
/// into its predecessor when both share style names and rows and it starts on
/// the column right after the predecessor's end column.
pub fn merge_adjacent_style_descriptors(
    descriptors: Vec<SpecStyleDescriptor>,
) -> Result<Vec<SpecStyleDescriptor>> {
    let mut l_merged: Vec<SpecStyleDescriptor> = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        if let Some(last) = l_merged.last_mut()
            && last.style_names == descriptor.style_names
            && last.cell.start_cell.row == descriptor.cell.start_cell.row
            && last.cell.end_cell.row == descriptor.cell.end_cell.row
            && column_letter_to_index(&last.cell.end_cell.col)? + 1
                == column_letter_to_index(&descriptor.cell.start_cell.col)?
        {
            last.cell.end_cell.col = descriptor.cell.end_cell.col;
            continue;
        }
        l_merged.push(descriptor);
    }

    Ok(l_merged)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Width

/// Estimate displayed width units for a string; non-ASCII counts wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
