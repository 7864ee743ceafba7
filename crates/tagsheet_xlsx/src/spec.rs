//! Shared sheet models, options and the crate error type.

use std::fmt;

use chrono::NaiveDate;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

use crate::conf::{N_NROWS_EXCEL_MAX, STYLE_NAME_LOCKED, STYLE_NAME_NOTICE};

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification resolved from named style presets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Italic style.
    pub italic: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,

    /// Cell protection state; only enforced on protected worksheets.
    pub locked: Option<bool>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            italic: other.italic.or(self.italic),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
            locked: other.locked.or(self.locked),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellValues

/// Closed set of values a record field can carry into a sheet row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EnumCellValue {
    /// Missing/blank value.
    #[default]
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
    /// Boolean value.
    Boolean(bool),
    /// Calendar date.
    Date(NaiveDate),
}

impl EnumCellValue {
    /// Render the value as plain text (used for notice banners).
    pub fn to_text(&self) -> String {
        match self {
            EnumCellValue::None => String::new(),
            EnumCellValue::String(s) => s.clone(),
            EnumCellValue::Number(n) => n.to_string(),
            EnumCellValue::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            EnumCellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        EnumCellValue::String(value)
    }
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        EnumCellValue::String(value.to_string())
    }
}

impl From<&String> for EnumCellValue {
    fn from(value: &String) -> Self {
        EnumCellValue::String(value.clone())
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        EnumCellValue::Boolean(value)
    }
}

impl From<NaiveDate> for EnumCellValue {
    fn from(value: NaiveDate) -> Self {
        EnumCellValue::Date(value)
    }
}

macro_rules! impl_cell_value_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EnumCellValue {
                fn from(value: $ty) -> Self {
                    EnumCellValue::Number(value as f64)
                }
            }
        )*
    };
}

impl_cell_value_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl<T> From<Option<T>> for EnumCellValue
where
    T: Into<EnumCellValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(EnumCellValue::None, Into::into)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordSchema

/// Logical layout region of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumSheetRegion {
    /// Single banner cell at A1.
    Notice,
    /// Column-title row.
    Header,
}

impl EnumSheetRegion {
    /// Region key used in style maps and tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            EnumSheetRegion::Notice => "notice",
            EnumSheetRegion::Header => "header",
        }
    }

    /// Preset applied to the region when no descriptor targets it.
    pub fn default_style_name(&self) -> &'static str {
        match self {
            EnumSheetRegion::Notice => STYLE_NAME_NOTICE,
            EnumSheetRegion::Header => STYLE_NAME_LOCKED,
        }
    }
}

impl fmt::Display for EnumSheetRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One field of a record: identifier, raw tags and the value it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecRecordField {
    /// Field identifier (informational, used in error text).
    pub name: String,
    /// Region tag, e.g. `notice` or `header|Name`. `None` means untagged.
    pub tag: Option<String>,
    /// Style tag, e.g. `header-default` or `locked,number-format-text`.
    pub style: Option<String>,
    /// Field value.
    pub value: EnumCellValue,
}

impl SpecRecordField {
    /// Create a tagged field.
    pub fn new(
        name: impl Into<String>,
        tag: impl Into<String>,
        value: impl Into<EnumCellValue>,
    ) -> Self {
        Self {
            name: name.into(),
            tag: Some(tag.into()),
            style: None,
            value: value.into(),
        }
    }

    /// Create a field without a region tag. It never reaches the sheet.
    pub fn untagged(name: impl Into<String>, value: impl Into<EnumCellValue>) -> Self {
        Self {
            name: name.into(),
            tag: None,
            style: None,
            value: value.into(),
        }
    }

    /// Attach a style tag.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }
}

/// Ordered field list describing one record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRecord {
    /// Fields in declaration order.
    pub fields: Vec<SpecRecordField>,
}

impl SpecRecord {
    /// Create a record from its fields.
    pub fn new(fields: Vec<SpecRecordField>) -> Self {
        Self { fields }
    }
}

/// Shape-checked input to the sheet model builder.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumSourceValue {
    /// A single record: layout only, no rows.
    Record(SpecRecord),
    /// A list of records: layout from the first element, one row per element.
    List(Vec<EnumSourceValue>),
    /// A bare value. Always rejected by the builder.
    Scalar(EnumCellValue),
}

impl EnumSourceValue {
    /// Short shape name for error text.
    pub fn kind(&self) -> &'static str {
        match self {
            EnumSourceValue::Record(_) => "record",
            EnumSourceValue::List(_) => "list",
            EnumSourceValue::Scalar(_) => "scalar",
        }
    }
}

impl From<SpecRecord> for EnumSourceValue {
    fn from(value: SpecRecord) -> Self {
        EnumSourceValue::Record(value)
    }
}

impl From<Vec<SpecRecord>> for EnumSourceValue {
    fn from(value: Vec<SpecRecord>) -> Self {
        EnumSourceValue::List(value.into_iter().map(EnumSourceValue::Record).collect())
    }
}

impl From<EnumCellValue> for EnumSourceValue {
    fn from(value: EnumCellValue) -> Self {
        EnumSourceValue::Scalar(value)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StyleDescriptors

/// Single cell coordinate in column-letter notation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellAddress {
    /// Column letters (`A`, `B`, ..., `AA`).
    pub col: String,
    /// 1-based row number; 0 means "not anchored yet".
    pub row: u32,
}

impl SpecCellAddress {
    /// Create an address.
    pub fn new(col: impl Into<String>, row: u32) -> Self {
        Self {
            col: col.into(),
            row,
        }
    }
}

impl fmt::Display for SpecCellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

/// Inclusive rectangular range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellRange {
    /// Top-left cell.
    pub start_cell: SpecCellAddress,
    /// Bottom-right cell.
    pub end_cell: SpecCellAddress,
}

impl SpecCellRange {
    /// Range covering exactly one cell.
    pub fn single(col: impl Into<String>, row: u32) -> Self {
        let cell = SpecCellAddress::new(col, row);
        Self {
            start_cell: cell.clone(),
            end_cell: cell,
        }
    }
}

/// Named style options bound to a cell range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecStyleDescriptor {
    /// Preset names, applied left to right.
    pub style_names: Vec<String>,
    /// Target range. Default until the builder anchors it.
    pub cell: SpecCellRange,
}

impl SpecStyleDescriptor {
    /// Bind the descriptor to a range.
    pub fn anchored(mut self, cell: SpecCellRange) -> Self {
        self.cell = cell;
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Header-based column width inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitHeaderPolicy {
    /// Enable width inference from header titles.
    pub if_enabled: bool,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitHeaderPolicy {
    fn default() -> Self {
        Self {
            if_enabled: true,
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Workbook-wide options controlling assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorkbookOptions {
    /// Protect every emitted worksheet so locked cells become read-only.
    pub if_protect_sheets: bool,
    /// Optional protection password.
    pub protect_password: Option<String>,
    /// Number format used for date cells.
    pub date_num_format: String,
    /// Write model rows below the header row.
    pub if_write_rows: bool,
    /// Column width inference policy.
    pub policy_autofit: SpecAutofitHeaderPolicy,
    /// Last 1-based row covered by dropdown validations.
    pub n_rows_validation_max: u32,
}

impl Default for SpecWorkbookOptions {
    fn default() -> Self {
        Self {
            if_protect_sheets: false,
            protect_password: None,
            date_num_format: "yyyy-mm-dd".to_string(),
            if_write_rows: true,
            policy_autofit: SpecAutofitHeaderPolicy::default(),
            n_rows_validation_max: N_NROWS_EXCEL_MAX as u32,
        }
    }
}

/// Workbook lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumWorkbookState {
    /// No sheet added yet.
    #[default]
    Empty,
    /// At least one sheet added; not saved.
    Accumulating,
    /// Saved; no further mutation allowed.
    Saved,
    /// A sheet failed mid-write; the buffered workbook must not be persisted.
    Failed,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result alias using [`TagsheetError`].
pub type Result<T> = std::result::Result<T, TagsheetError>;

/// Errors raised while building sheet models or assembling workbooks.
#[derive(Debug, Error)]
pub enum TagsheetError {
    /// Bad caller input: sheet name, source shape, option column.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Style tag references a preset that is not registered.
    #[error("Unknown style: {0:?}")]
    UnknownStyle(String),

    /// Non-positive or out-of-range row/column reference.
    #[error("Invalid address: {0}")]
    Addressing(String),

    /// Workbook lifecycle misuse.
    #[error("Invalid workbook state: {0}")]
    InvalidState(String),

    /// Failure reported by `rust_xlsxwriter`.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
}

impl TagsheetError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        TagsheetError::InvalidArgument(msg.into())
    }

    pub(crate) fn addressing(msg: impl Into<String>) -> Self {
        TagsheetError::Addressing(msg.into())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
