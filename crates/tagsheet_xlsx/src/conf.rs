//! Excel limits, sheet layout constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::SpecCellFormat;

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Excel cell text maximum length in characters.
pub const N_LEN_EXCEL_CELL_TEXT_MAX: usize = 32_767;
/// Earliest year an Excel date cell can hold.
pub const N_YEAR_EXCEL_MIN: i32 = 1900;
/// Latest year an Excel date cell can hold.
pub const N_YEAR_EXCEL_MAX: i32 = 9999;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// 1-based row holding the notice banner.
pub const N_ROW_NOTICE: u32 = 1;
/// 1-based row holding column titles.
pub const N_ROW_HEADER: u32 = 2;
/// First 1-based row holding record data.
pub const N_ROW_DATA_FIRST: u32 = 3;

/// Separator between region and title in a region tag (`header|Name`).
pub const CHR_REGION_TAG_SEP: char = '|';
/// Separator between preset names in a style tag (`locked,header-default`).
pub const CHR_STYLE_TAG_SEP: char = ',';

/// Locked cell, no visual change.
pub const STYLE_NAME_LOCKED: &str = "locked";
/// Red, bold, locked banner text.
pub const STYLE_NAME_NOTICE: &str = "red-text-locked";
/// Text (`@`) number format.
pub const STYLE_NAME_TEXT: &str = "number-format-text";
/// Bold, centered, bordered, filled column title.
pub const STYLE_NAME_HEADER: &str = "header-default";
/// Header preset forced onto highlighted columns.
pub const STYLE_NAME_HIGHLIGHT: &str = "default-header-red";

/// Build the named style presets every registry starts with.
pub fn derive_default_style_presets() -> BTreeMap<String, SpecCellFormat> {
    let cfg_locked_fmt_spec = SpecCellFormat {
        locked: Some(true),
        ..Default::default()
    };
    let cfg_header_fmt_spec = cfg_locked_fmt_spec.with_(SpecCellFormat {
        font_size: Some(11),
        bold: Some(true),
        align: Some("center".to_string()),
        valign: Some("vcenter".to_string()),
        border: Some(1),
        bg_color: Some("#D9D9D9".to_string()),
        ..Default::default()
    });

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert(STYLE_NAME_LOCKED.to_string(), cfg_locked_fmt_spec.clone());
    dict_fmt.insert(
        STYLE_NAME_NOTICE.to_string(),
        cfg_locked_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            font_color: Some("#FF0000".to_string()),
            ..Default::default()
        }),
    );
    dict_fmt.insert(
        STYLE_NAME_TEXT.to_string(),
        SpecCellFormat {
            num_format: Some("@".to_string()),
            ..Default::default()
        },
    );
    dict_fmt.insert(STYLE_NAME_HEADER.to_string(), cfg_header_fmt_spec.clone());
    dict_fmt.insert(
        STYLE_NAME_HIGHLIGHT.to_string(),
        cfg_header_fmt_spec.with_(SpecCellFormat {
            font_color: Some("#FF0000".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}
