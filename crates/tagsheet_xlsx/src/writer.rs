//! Workbook assembler that renders sheet models through `rust_xlsxwriter`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use log::{debug, trace};
use rust_xlsxwriter::{ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::conf::{
    N_LEN_EXCEL_CELL_TEXT_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_ROW_DATA_FIRST,
    N_YEAR_EXCEL_MAX, N_YEAR_EXCEL_MIN, STYLE_NAME_TEXT,
};
use crate::options::derive_list_validation;
use crate::sheet::SheetModel;
use crate::spec::{
    EnumCellValue, EnumSheetRegion, EnumWorkbookState, Result, SpecAutofitHeaderPolicy,
    SpecCellFormat, SpecWorkbookOptions, TagsheetError,
};
use crate::style::SpecStylePresets;
use crate::util::{column_letter_to_index, estimate_unicode_string_width, validate_sheet_name};

/// Formats resolved for one sheet before the worksheet is touched.
struct SpecSheetFormatPlan {
    fmt_col_text: Format,
    fmt_col_date: Format,
    fmt_row_header: Format,
    fmt_notice: Format,
    l_fmt_header_by_col: Vec<Format>,
}

/// Stateful workbook: owns the sheet models and the buffered library workbook.
pub struct XlsxWorkbook {
    path_file_out: PathBuf,
    workbook: Workbook,
    presets: SpecStylePresets,
    options: SpecWorkbookOptions,
    l_sheets: Vec<SheetModel>,
    set_sheet_names_existing: BTreeSet<String>,
    state: EnumWorkbookState,
}

impl XlsxWorkbook {
    /// Create an empty workbook bound to `path_file_out` with default presets/options.
    ///
    /// Nothing touches the filesystem until [`Self::save`] is called.
    pub fn new(path_file_out: impl Into<PathBuf>) -> Self {
        Self::with_options(
            path_file_out,
            SpecStylePresets::default(),
            SpecWorkbookOptions::default(),
        )
    }

    /// Create an empty workbook with custom presets and options.
    pub fn with_options(
        path_file_out: impl Into<PathBuf>,
        presets: SpecStylePresets,
        options: SpecWorkbookOptions,
    ) -> Self {
        Self {
            path_file_out: path_file_out.into(),
            workbook: Workbook::new(),
            presets,
            options,
            l_sheets: Vec::new(),
            set_sheet_names_existing: BTreeSet::new(),
            state: EnumWorkbookState::Empty,
        }
    }

    /// Output file path.
    pub fn file_out(&self) -> &Path {
        &self.path_file_out
    }

    /// Lifecycle state.
    pub fn state(&self) -> EnumWorkbookState {
        self.state
    }

    /// Sheet models added so far, in workbook order.
    pub fn sheets(&self) -> &[SheetModel] {
        &self.l_sheets
    }

    /// Render sheets into the workbook. Chainable.
    ///
    /// All sheets are validated before any of them is written, cell values
    /// included, so a rejected batch leaves the workbook as it was. If a
    /// library write still fails, the workbook is marked failed and refuses
    /// to save.
    pub fn add_sheets<I>(&mut self, sheets: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = SheetModel>,
    {
        self.ensure_writable("add sheets to")?;
        validate_workbook_options(&self.options)?;

        let l_sheets: Vec<SheetModel> = sheets.into_iter().collect();
        let mut l_plans = Vec::with_capacity(l_sheets.len());
        let mut set_names_new = BTreeSet::new();
        for sheet in &l_sheets {
            validate_sheet_name(sheet.name())?;
            let c_key = sheet.name().to_lowercase();
            if self.set_sheet_names_existing.contains(&c_key) || !set_names_new.insert(c_key) {
                return Err(TagsheetError::invalid_argument(format!(
                    "duplicate sheet name: {:?}",
                    sheet.name()
                )));
            }
            validate_sheet_option_columns(sheet)?;
            validate_sheet_cells(sheet, self.options.if_write_rows)?;
            l_plans.push(self.plan_sheet_formats(sheet)?);
        }

        for (mut sheet, plan) in l_sheets.into_iter().zip(l_plans) {
            if let Err(err) = self.write_sheet(&mut sheet, &plan) {
                self.state = EnumWorkbookState::Failed;
                return Err(err);
            }
            self.set_sheet_names_existing
                .insert(sheet.name().to_lowercase());
            self.l_sheets.push(sheet);
            self.state = EnumWorkbookState::Accumulating;
        }

        Ok(self)
    }

    /// Persist the workbook to [`Self::file_out`]. Valid once.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_writable("save")?;
        self.workbook.save(&self.path_file_out)?;
        self.state = EnumWorkbookState::Saved;
        debug!(
            "saved workbook with {} sheets to {}",
            self.l_sheets.len(),
            self.path_file_out.display()
        );
        Ok(())
    }

    /// Persist the workbook to an in-memory XLSX buffer. Valid once.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>> {
        self.ensure_writable("save")?;
        let v_buf = self.workbook.save_to_buffer()?;
        self.state = EnumWorkbookState::Saved;
        debug!(
            "saved workbook with {} sheets to buffer ({} bytes)",
            self.l_sheets.len(),
            v_buf.len()
        );
        Ok(v_buf)
    }

    fn ensure_writable(&self, c_action: &str) -> Result<()> {
        match self.state {
            EnumWorkbookState::Saved => Err(TagsheetError::InvalidState(format!(
                "cannot {c_action} a workbook already saved to {}",
                self.path_file_out.display()
            ))),
            EnumWorkbookState::Failed => Err(TagsheetError::InvalidState(format!(
                "cannot {c_action} a workbook after a sheet failed to write"
            ))),
            EnumWorkbookState::Empty | EnumWorkbookState::Accumulating => Ok(()),
        }
    }

    fn plan_sheet_formats(&self, sheet: &SheetModel) -> Result<SpecSheetFormatPlan> {
        let fmt_text = self.presets.resolve(&[STYLE_NAME_TEXT])?.with_(SpecCellFormat {
            locked: Some(false),
            ..Default::default()
        });
        let fmt_date = fmt_text.with_(SpecCellFormat {
            num_format: Some(self.options.date_num_format.clone()),
            ..Default::default()
        });
        let fmt_header_base = self
            .presets
            .resolve(&[EnumSheetRegion::Header.default_style_name()])?;

        let l_notice = sheet.style_region(EnumSheetRegion::Notice);
        let fmt_notice = if l_notice.is_empty() {
            self.presets
                .resolve(&[EnumSheetRegion::Notice.default_style_name()])?
        } else {
            l_notice
                .iter()
                .try_fold(SpecCellFormat::default(), |fmt_acc, descriptor| {
                    let fmt_descriptor = self.presets.resolve(&descriptor.style_names)?;
                    Ok::<_, TagsheetError>(fmt_acc.merge(&fmt_descriptor))
                })?
        };

        let n_cols_visible = sheet.visible_columns().len();
        let mut l_fmt_header_by_col = vec![fmt_header_base.clone(); n_cols_visible];
        for descriptor in sheet.style_region(EnumSheetRegion::Header) {
            let fmt_descriptor =
                fmt_header_base.merge(&self.presets.resolve(&descriptor.style_names)?);
            let n_col_start = column_letter_to_index(&descriptor.cell.start_cell.col)? as usize;
            let n_col_end = column_letter_to_index(&descriptor.cell.end_cell.col)? as usize;
            trace!(
                "sheet {:?}: header style {:?} on {}..{}",
                sheet.name(),
                descriptor.style_names,
                descriptor.cell.start_cell,
                descriptor.cell.end_cell
            );
            for fmt_col in l_fmt_header_by_col
                .iter_mut()
                .take(n_col_end)
                .skip(n_col_start.saturating_sub(1))
            {
                *fmt_col = fmt_descriptor.clone();
            }
        }

        Ok(SpecSheetFormatPlan {
            fmt_col_text: derive_rust_xlsx_format(&fmt_text),
            fmt_col_date: derive_rust_xlsx_format(&fmt_date),
            fmt_row_header: derive_rust_xlsx_format(&fmt_header_base),
            fmt_notice: derive_rust_xlsx_format(&fmt_notice),
            l_fmt_header_by_col: l_fmt_header_by_col
                .iter()
                .map(derive_rust_xlsx_format)
                .collect(),
        })
    }

    fn write_sheet(&mut self, sheet: &mut SheetModel, plan: &SpecSheetFormatPlan) -> Result<()> {
        let l_cols_visible = sheet.visible_columns();
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(sheet.name())?;

        // Data columns default to text so numeric-looking input is not coerced.
        for n_idx_col in 0..l_cols_visible.len() {
            worksheet.set_column_format(cast_col_num(n_idx_col)?, &plan.fmt_col_text)?;
        }

        // Row 1 is reserved for the notice whether or not one is present.
        sheet.reset_write_row();
        if let Some(c_notice) = sheet.notice() {
            let n_row = cast_row_num(sheet.write_row())?;
            worksheet.write_string_with_format(n_row, 0, c_notice, &plan.fmt_notice)?;
        }

        sheet.next_write_row(1)?;
        if !l_cols_visible.is_empty() {
            let n_row = cast_row_num(sheet.write_row())?;
            worksheet.set_row_format(n_row, &plan.fmt_row_header)?;
            for (n_idx_col, n_idx_header) in l_cols_visible.iter().enumerate() {
                worksheet.write_string_with_format(
                    n_row,
                    cast_col_num(n_idx_col)?,
                    &sheet.header()[*n_idx_header],
                    &plan.l_fmt_header_by_col[n_idx_col],
                )?;
            }
            apply_header_autofit(
                worksheet,
                sheet,
                &l_cols_visible,
                &self.options.policy_autofit,
            )?;
        }

        if self.options.if_write_rows && !sheet.rows().is_empty() {
            let n_row_first = sheet.write_row() + 1;
            for (n_idx_row, row) in sheet.rows().iter().enumerate() {
                let n_row = cast_row_num(n_row_first + n_idx_row as u32)?;
                for (n_idx_col, n_idx_header) in l_cols_visible.iter().enumerate() {
                    write_cell_with_format(
                        worksheet,
                        n_row,
                        cast_col_num(n_idx_col)?,
                        &row[*n_idx_header],
                        plan,
                    )?;
                }
            }
            sheet.next_write_row(sheet.rows().len() as u32)?;
        }

        if let Some(option_set) = sheet.option_set() {
            for (c_col, l_values) in option_set.iter() {
                let n_col = cast_col_num(column_letter_to_index(c_col)? as usize - 1)?;
                let validation = derive_list_validation(l_values)?;
                worksheet.add_data_validation(
                    cast_row_num(N_ROW_DATA_FIRST)?,
                    n_col,
                    cast_row_num(self.options.n_rows_validation_max)?,
                    n_col,
                    &validation,
                )?;
            }
        }

        if self.options.if_protect_sheets {
            match &self.options.protect_password {
                Some(c_password) => {
                    worksheet.protect_with_password(c_password);
                }
                None => {
                    worksheet.protect();
                }
            }
        }

        debug!(
            "wrote sheet {:?}: notice={} columns={} rows={} cursor={}",
            sheet.name(),
            sheet.notice().is_some(),
            l_cols_visible.len(),
            sheet.rows().len(),
            sheet.write_row()
        );
        Ok(())
    }
}

fn validate_workbook_options(options: &SpecWorkbookOptions) -> Result<()> {
    let policy_autofit = &options.policy_autofit;
    if policy_autofit.width_cell_min == 0 {
        return Err(TagsheetError::invalid_argument(
            "policy_autofit.width_cell_min must be >= 1.",
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(TagsheetError::invalid_argument(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.",
        ));
    }
    let n_rows_validation_max = options.n_rows_validation_max as usize;
    if n_rows_validation_max < N_ROW_DATA_FIRST as usize || n_rows_validation_max > N_NROWS_EXCEL_MAX
    {
        return Err(TagsheetError::invalid_argument(format!(
            "n_rows_validation_max must be within {N_ROW_DATA_FIRST}..={N_NROWS_EXCEL_MAX}."
        )));
    }
    Ok(())
}

fn validate_sheet_option_columns(sheet: &SheetModel) -> Result<()> {
    let Some(option_set) = sheet.option_set() else {
        return Ok(());
    };
    for (c_col, l_values) in option_set.iter() {
        let n_col = column_letter_to_index(c_col)? as usize;
        if n_col > N_NCOLS_EXCEL_MAX {
            return Err(TagsheetError::addressing(format!(
                "option column {c_col} exceeds the Excel column limit"
            )));
        }
        derive_list_validation(l_values)?;
    }
    Ok(())
}

fn validate_sheet_cells(sheet: &SheetModel, if_write_rows: bool) -> Result<()> {
    let l_cols_visible = sheet.visible_columns();
    if l_cols_visible.len() > N_NCOLS_EXCEL_MAX {
        return Err(TagsheetError::addressing(format!(
            "sheet {:?}: {} columns exceed the Excel column limit",
            sheet.name(),
            l_cols_visible.len()
        )));
    }

    if let Some(c_notice) = sheet.notice() {
        validate_cell_text(sheet, "notice", c_notice)?;
    }
    for n_idx_header in &l_cols_visible {
        validate_cell_text(sheet, "header", &sheet.header()[*n_idx_header])?;
    }

    if !if_write_rows {
        return Ok(());
    }
    let n_rows_data_max = N_NROWS_EXCEL_MAX - (N_ROW_DATA_FIRST as usize - 1);
    if sheet.rows().len() > n_rows_data_max {
        return Err(TagsheetError::addressing(format!(
            "sheet {:?}: {} rows exceed the {n_rows_data_max} data rows available",
            sheet.name(),
            sheet.rows().len()
        )));
    }
    for (n_idx_row, row) in sheet.rows().iter().enumerate() {
        for n_idx_header in &l_cols_visible {
            let c_title = &sheet.header()[*n_idx_header];
            match &row[*n_idx_header] {
                EnumCellValue::String(val) => {
                    validate_cell_text(sheet, c_title, val)?;
                }
                EnumCellValue::Number(val) if !val.is_finite() => {
                    return Err(TagsheetError::invalid_argument(format!(
                        "sheet {:?}: row {n_idx_row} column {c_title:?} holds {val}, \
                         which Excel cannot store",
                        sheet.name()
                    )));
                }
                EnumCellValue::Date(val)
                    if !(N_YEAR_EXCEL_MIN..=N_YEAR_EXCEL_MAX).contains(&val.year()) =>
                {
                    return Err(TagsheetError::invalid_argument(format!(
                        "sheet {:?}: row {n_idx_row} column {c_title:?} date {val} is outside \
                         {N_YEAR_EXCEL_MIN}..={N_YEAR_EXCEL_MAX}",
                        sheet.name()
                    )));
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn validate_cell_text(sheet: &SheetModel, c_where: &str, c_text: &str) -> Result<()> {
    let n_len = c_text.chars().count();
    if n_len > N_LEN_EXCEL_CELL_TEXT_MAX {
        return Err(TagsheetError::invalid_argument(format!(
            "sheet {:?}: {c_where} text of {n_len} chars exceeds {N_LEN_EXCEL_CELL_TEXT_MAX}",
            sheet.name()
        )));
    }
    Ok(())
}

fn apply_header_autofit(
    worksheet: &mut Worksheet,
    sheet: &SheetModel,
    l_cols_visible: &[usize],
    policy_autofit: &SpecAutofitHeaderPolicy,
) -> Result<()> {
    if !policy_autofit.if_enabled {
        return Ok(());
    }

    let n_min = usize::max(1, policy_autofit.width_cell_min);
    let n_max = usize::min(255, usize::max(n_min, policy_autofit.width_cell_max));
    for (n_idx_col, n_idx_header) in l_cols_visible.iter().enumerate() {
        let n_width_recorded = estimate_unicode_string_width(&sheet.header()[*n_idx_header]);
        let n_width_final = usize::min(
            n_max,
            usize::max(n_min, n_width_recorded + policy_autofit.width_cell_padding),
        );
        worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
    }
    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    n_row: u32,
    n_col: u16,
    value: &EnumCellValue,
    plan: &SpecSheetFormatPlan,
) -> Result<()> {
    match value {
        // Blank cells inherit the column's text format.
        EnumCellValue::None => {}
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, &plan.fmt_col_text)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, &plan.fmt_col_text)?;
        }
        EnumCellValue::Boolean(val) => {
            worksheet.write_boolean_with_format(n_row, n_col, *val, &plan.fmt_col_text)?;
        }
        EnumCellValue::Date(val) => {
            let datetime = derive_excel_date(val.year(), val.month(), val.day())?;
            worksheet.write_datetime_with_format(n_row, n_col, &datetime, &plan.fmt_col_date)?;
        }
    }
    Ok(())
}

fn derive_excel_date(n_year: i32, n_month: u32, n_day: u32) -> Result<ExcelDateTime> {
    let n_year = u16::try_from(n_year).map_err(|_| {
        TagsheetError::invalid_argument(format!("year {n_year} cannot be written to Excel"))
    })?;
    // chrono guarantees month 1..=12 and day 1..=31.
    Ok(ExcelDateTime::from_ymd(n_year, n_month as u8, n_day as u8)?)
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if spec.italic.unwrap_or(false) {
        format = format.set_italic();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    match spec.locked {
        Some(true) => format.set_locked(),
        Some(false) => format.set_unlocked(),
        None => format,
    }
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

/// 1-based sheet row -> 0-based library row.
fn cast_row_num(n_row: u32) -> Result<u32> {
    match n_row.checked_sub(1) {
        Some(n_row0) if (n_row0 as usize) < N_NROWS_EXCEL_MAX => Ok(n_row0),
        _ => Err(TagsheetError::addressing(format!(
            "row {n_row} outside 1..={N_NROWS_EXCEL_MAX}"
        ))),
    }
}

fn cast_col_num(value: usize) -> Result<u16> {
    if value >= N_NCOLS_EXCEL_MAX {
        return Err(TagsheetError::addressing(format!(
            "column index overflow: {value}"
        )));
    }
    u16::try_from(value)
        .map_err(|_| TagsheetError::addressing(format!("column index overflow: {value}")))
}
