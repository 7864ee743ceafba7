//! Sheet model builder: turns tagged records into header, notice, rows and
//! style regions, and tracks the per-sheet write cursor.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use log::{debug, warn};

use crate::conf::{N_NCOLS_EXCEL_MAX, N_ROW_HEADER, N_ROW_NOTICE, STYLE_NAME_HIGHLIGHT};
use crate::options::SpecOptionSet;
use crate::record::{EnumRegionTag, parse_region_tag};
use crate::spec::{
    EnumCellValue, EnumSheetRegion, EnumSourceValue, Result, SpecCellRange, SpecRecord,
    SpecStyleDescriptor, TagsheetError,
};
use crate::style::{SpecStylePresets, parse_style_tag};
use crate::util::{
    column_letter, column_letter_to_index, is_column_reference, merge_adjacent_style_descriptors,
    row_address,
};
use crate::writer::XlsxWorkbook;

/// In-memory layout and data of one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetModel {
    name: String,
    notice: Option<String>,
    header: Vec<String>,
    // Header indices kept in `header`/`rows` but not rendered.
    set_omit_cols: BTreeSet<usize>,
    rows: Vec<Vec<EnumCellValue>>,
    option_set: Option<SpecOptionSet>,
    dict_style_ref: BTreeMap<EnumSheetRegion, Vec<SpecStyleDescriptor>>,
    // Last written 1-based row; 0 before anything is written.
    write_row: u32,
}

impl SheetModel {
    /// Build a model using the built-in style presets.
    ///
    /// `source` may be `None` for an empty, named sheet.
    pub fn new(
        sheet_name: &str,
        source: Option<EnumSourceValue>,
        omit_col_names: &[&str],
        red_col_names: &[&str],
    ) -> Result<Self> {
        Self::with_presets(
            sheet_name,
            source,
            omit_col_names,
            red_col_names,
            &SpecStylePresets::default(),
        )
    }

    /// Build a model validating style tags against `presets`.
    pub fn with_presets(
        sheet_name: &str,
        source: Option<EnumSourceValue>,
        omit_col_names: &[&str],
        red_col_names: &[&str],
        presets: &SpecStylePresets,
    ) -> Result<Self> {
        if sheet_name.is_empty() {
            return Err(TagsheetError::invalid_argument("sheet cannot be empty"));
        }

        let mut sheet = Self {
            name: sheet_name.to_string(),
            notice: None,
            header: Vec::new(),
            set_omit_cols: BTreeSet::new(),
            rows: Vec::new(),
            option_set: None,
            dict_style_ref: BTreeMap::new(),
            write_row: 0,
        };
        if let Some(source) = source {
            sheet.init_sheet_data(source, omit_col_names, red_col_names, presets)?;
        }

        debug!(
            "built sheet model {:?}: {} header columns ({} omitted), {} rows",
            sheet.name,
            sheet.header.len(),
            sheet.set_omit_cols.len(),
            sheet.rows.len()
        );
        Ok(sheet)
    }

    /// Wrap this model alone in a new workbook bound to `path_file_out`.
    pub fn to_workbook(self, path_file_out: impl Into<PathBuf>) -> Result<XlsxWorkbook> {
        let mut workbook = XlsxWorkbook::new(path_file_out);
        workbook.add_sheets([self])?;
        Ok(workbook)
    }

    fn init_sheet_data(
        &mut self,
        source: EnumSourceValue,
        omit_col_names: &[&str],
        red_col_names: &[&str],
        presets: &SpecStylePresets,
    ) -> Result<()> {
        match source {
            EnumSourceValue::Record(record) => {
                self.set_header_by_record(&record, omit_col_names, red_col_names, presets)
            }
            EnumSourceValue::List(l_items) => {
                if l_items.is_empty() {
                    warn!("sheet {:?}: empty record list, no layout derived", self.name);
                }
                for (n_idx, item) in l_items.into_iter().enumerate() {
                    let record = match item {
                        EnumSourceValue::Record(record) => record,
                        other => {
                            return Err(TagsheetError::invalid_argument(format!(
                                "list element {n_idx} is a {}, expected a record",
                                other.kind()
                            )));
                        }
                    };
                    if n_idx == 0 {
                        self.set_header_by_record(
                            &record,
                            omit_col_names,
                            red_col_names,
                            presets,
                        )?;
                    }
                    let l_row = self.derive_row_data(&record, n_idx)?;
                    self.rows.push(l_row);
                }
                Ok(())
            }
            EnumSourceValue::Scalar(_) => Err(TagsheetError::invalid_argument(
                "generate function supports records or lists of records only, got a scalar",
            )),
        }
    }

    fn set_header_by_record(
        &mut self,
        record: &SpecRecord,
        omit_col_names: &[&str],
        red_col_names: &[&str],
        presets: &SpecStylePresets,
    ) -> Result<()> {
        let set_omit_names: BTreeSet<&str> = omit_col_names.iter().copied().collect();
        let set_red_names: BTreeSet<&str> = red_col_names.iter().copied().collect();
        let mut l_header_styles = Vec::new();
        let mut if_notice_seen = false;

        for field in &record.fields {
            let Some(c_tag) = field.tag.as_deref() else {
                continue;
            };
            let Some(region_tag) = parse_region_tag(c_tag)? else {
                continue;
            };
            let c_style = field.style.as_deref().filter(|s| !s.trim().is_empty());

            match region_tag {
                EnumRegionTag::Notice => {
                    if if_notice_seen {
                        return Err(TagsheetError::invalid_argument(format!(
                            "field {:?}: a record may carry only one notice field",
                            field.name
                        )));
                    }
                    if_notice_seen = true;

                    // Blank notice leaves A1 empty.
                    let c_notice = field.value.to_text();
                    if c_notice.is_empty() {
                        continue;
                    }
                    self.notice = Some(c_notice);

                    if let Some(c_style) = c_style {
                        let descriptor = parse_style_tag(c_style, presets)?
                            .anchored(SpecCellRange::single("A", N_ROW_NOTICE));
                        self.dict_style_ref
                            .insert(EnumSheetRegion::Notice, vec![descriptor]);
                    }
                }
                EnumRegionTag::Header(c_title) => {
                    self.header.push(c_title.clone());
                    if set_omit_names.contains(c_title.as_str()) {
                        self.set_omit_cols.insert(self.header.len() - 1);
                        continue;
                    }

                    let c_style = if set_red_names.contains(c_title.as_str()) {
                        Some(STYLE_NAME_HIGHLIGHT)
                    } else {
                        c_style
                    };
                    let Some(c_style) = c_style else {
                        continue;
                    };

                    let c_col = column_letter(cast_col_idx(
                        self.header.len() - self.set_omit_cols.len(),
                    )?)?;
                    l_header_styles.push(
                        parse_style_tag(c_style, presets)?
                            .anchored(SpecCellRange::single(c_col, N_ROW_HEADER)),
                    );
                }
            }
        }

        if !l_header_styles.is_empty() {
            self.dict_style_ref.insert(
                EnumSheetRegion::Header,
                merge_adjacent_style_descriptors(l_header_styles)?,
            );
        }
        Ok(())
    }

    fn derive_row_data(&self, record: &SpecRecord, n_idx: usize) -> Result<Vec<EnumCellValue>> {
        let mut l_titles = Vec::with_capacity(self.header.len());
        let mut l_row = Vec::with_capacity(self.header.len());

        for field in &record.fields {
            let Some(c_tag) = field.tag.as_deref() else {
                continue;
            };
            if let Some(EnumRegionTag::Header(c_title)) = parse_region_tag(c_tag)? {
                l_titles.push(c_title);
                l_row.push(field.value.clone());
            }
        }

        if l_titles != self.header {
            return Err(TagsheetError::invalid_argument(format!(
                "list element {n_idx} has header fields {l_titles:?}, expected {:?}",
                self.header
            )));
        }
        Ok(l_row)
    }

    /// Attach dropdown values to a column given by header title or letters.
    pub fn set_options<I, S>(&mut self, head_or_col_name: &str, options: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let c_col = self.find_header_column_name(head_or_col_name)?;
        let option_set_new = SpecOptionSet::new().add_options(c_col, options);
        if option_set_new.iter().any(|(_, values)| values.is_empty()) {
            return Err(TagsheetError::invalid_argument(format!(
                "no options given for {head_or_col_name:?}"
            )));
        }

        match &mut self.option_set {
            Some(option_set) => {
                option_set.merge(option_set_new);
            }
            None => self.option_set = Some(option_set_new),
        }
        Ok(self)
    }

    /// Resolve a header title or bare column reference to rendered column letters.
    fn find_header_column_name(&self, head_or_col_name: &str) -> Result<String> {
        if let Some(n_idx) = self.header.iter().position(|h| h == head_or_col_name) {
            if self.set_omit_cols.contains(&n_idx) {
                return Err(TagsheetError::invalid_argument(format!(
                    "header {head_or_col_name:?} is omitted and has no rendered column"
                )));
            }
            let n_omitted_before = self.set_omit_cols.range(..n_idx).count();
            return column_letter(cast_col_idx(n_idx + 1 - n_omitted_before)?);
        }

        if !is_column_reference(head_or_col_name) {
            return Err(TagsheetError::invalid_argument(format!(
                "{head_or_col_name:?} is neither a header title nor an A-Z column name"
            )));
        }
        let n_col = column_letter_to_index(head_or_col_name)?;
        if n_col as usize > N_NCOLS_EXCEL_MAX {
            return Err(TagsheetError::addressing(format!(
                "column {head_or_col_name} exceeds the Excel column limit"
            )));
        }
        if n_col as usize > self.visible_columns().len() {
            warn!(
                "sheet {:?}: option column {head_or_col_name} lies beyond the header",
                self.name
            );
        }
        Ok(head_or_col_name.to_string())
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region WriteCursor

    /// Advance the cursor by `n_rows` and return the new row address.
    pub fn next_write_row(&mut self, n_rows: u32) -> Result<String> {
        self.write_row = self.write_row.checked_add(n_rows).ok_or_else(|| {
            TagsheetError::addressing(format!("write cursor overflow on sheet {:?}", self.name))
        })?;
        row_address(self.write_row)
    }

    /// Current row address without advancing. Fails before the first advance.
    pub fn get_write_row(&self) -> Result<String> {
        row_address(self.write_row)
    }

    /// Move the cursor back to the first row.
    pub fn reset_write_row(&mut self) -> String {
        self.write_row = 1;
        format!("A{}", self.write_row)
    }

    /// Current 1-based cursor row (0 before the first advance).
    pub fn write_row(&self) -> u32 {
        self.write_row
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////

    /// Sheet name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Notice banner text.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// All header titles, omitted ones included.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Header indices excluded from rendering.
    pub fn omitted_columns(&self) -> &BTreeSet<usize> {
        &self.set_omit_cols
    }

    /// Header indices that are rendered, in order.
    pub fn visible_columns(&self) -> Vec<usize> {
        (0..self.header.len())
            .filter(|n_idx| !self.set_omit_cols.contains(n_idx))
            .collect()
    }

    /// Row data parallel to `header`.
    pub fn rows(&self) -> &[Vec<EnumCellValue>] {
        &self.rows
    }

    /// Style descriptors of one region.
    pub fn style_region(&self, region: EnumSheetRegion) -> &[SpecStyleDescriptor] {
        self.dict_style_ref
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All style regions.
    pub fn style_regions(&self) -> &BTreeMap<EnumSheetRegion, Vec<SpecStyleDescriptor>> {
        &self.dict_style_ref
    }

    /// Dropdown options, if any column has them.
    pub fn option_set(&self) -> Option<&SpecOptionSet> {
        self.option_set.as_ref()
    }
}

fn cast_col_idx(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| TagsheetError::addressing(format!("column index overflow: {value}")))
}
