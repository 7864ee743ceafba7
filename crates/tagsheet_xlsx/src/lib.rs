//! `tagsheet_xlsx` v1:
//! Tag-driven XLSX sheet builder.
//!
//! Records describe themselves as tagged fields; the tags place each field in
//! a sheet region (notice banner or header column) and attach named styles.
//!
//! Architecture:
//! - `conf`    : constants and default presets
//! - `spec`    : specs/models/options/errors
//! - `util`    : pure addressing and merge helpers
//! - `style`   : style tag parsing and preset registry
//! - `record`  : region tags, `SheetRecord` and `sheet_record!`
//! - `options` : dropdown option sets
//! - `sheet`   : sheet model construction
//! - `writer`  : workbook assembly and persistence
pub mod conf;
pub mod options;
pub mod record;
pub mod sheet;
pub mod spec;
pub mod style;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, N_ROW_DATA_FIRST,
    N_ROW_HEADER, N_ROW_NOTICE, TUP_EXCEL_ILLEGAL,
};
pub use options::SpecOptionSet;
pub use record::{EnumRegionTag, SheetRecord, parse_region_tag};
pub use sheet::SheetModel;
pub use spec::{
    EnumCellValue, EnumSheetRegion, EnumSourceValue, EnumWorkbookState, Result,
    SpecAutofitHeaderPolicy, SpecCellAddress, SpecCellFormat, SpecCellRange, SpecRecord,
    SpecRecordField, SpecStyleDescriptor, SpecWorkbookOptions, TagsheetError,
};
pub use style::{SpecStylePresets, parse_style_tag};
pub use util::{
    column_letter, column_letter_to_index, is_column_reference, merge_adjacent_style_descriptors,
    row_address, validate_sheet_name,
};
pub use writer::XlsxWorkbook;
