use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{Data, Reader, Xlsx, open_workbook};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use regex::Regex;
use tagsheet_xlsx::{
    EnumCellValue, EnumSourceValue, EnumWorkbookState, SheetModel, SpecRecord, SpecRecordField,
    SpecStylePresets, SpecWorkbookOptions, TagsheetError, XlsxWorkbook, sheet_record,
};
use tempfile::TempDir;
use zip::ZipArchive;

#[derive(Clone)]
struct Person {
    name: String,
    age: u32,
    note: Option<String>,
}

sheet_record!(Person {
    name => "header|Name", style = "header-default";
    age => "header|Age";
    note => "header|Note";
});

fn people() -> Vec<Person> {
    vec![
        Person {
            name: "A".to_string(),
            age: 1,
            note: None,
        },
        Person {
            name: "B".to_string(),
            age: 2,
            note: Some("second".to_string()),
        },
    ]
}

fn read_cell(path: &Path, sheet: &str, row: u32, col: u32) -> Option<Data> {
    let mut workbook: Xlsx<_> = open_workbook(path).expect("open xlsx");
    let range = workbook.worksheet_range(sheet).expect("sheet range");
    range.get_value((row, col)).cloned()
}

fn read_sheet_names(path: &Path) -> Vec<String> {
    let workbook: Xlsx<_> = open_workbook(path).expect("open xlsx");
    workbook.sheet_names()
}

fn read_zip_part(v_buf: &[u8], c_part: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(v_buf)).expect("open zip");
    let mut c_xml = String::new();
    archive
        .by_name(c_part)
        .expect("part present")
        .read_to_string(&mut c_xml)
        .expect("read part");
    c_xml
}

/// `<xf>` entries of `<cellXfs>`, indexed by cell style id.
fn read_cell_xfs(c_styles: &str) -> Vec<String> {
    let (_, c_tail) = c_styles.split_once("<cellXfs").expect("cellXfs");
    let (c_body, _) = c_tail.split_once("</cellXfs>").expect("cellXfs end");
    c_body.split("<xf ").skip(1).map(str::to_string).collect()
}

fn read_fonts(c_styles: &str) -> Vec<String> {
    let (_, c_tail) = c_styles.split_once("<fonts").expect("fonts");
    let (c_body, _) = c_tail.split_once("</fonts>").expect("fonts end");
    Regex::new(r"<font[ >]")
        .unwrap()
        .split(c_body)
        .skip(1)
        .map(str::to_string)
        .collect()
}

fn read_attr_index(c_xml: &str, c_pattern: &str) -> usize {
    Regex::new(c_pattern)
        .unwrap()
        .captures(c_xml)
        .unwrap_or_else(|| panic!("no match for {c_pattern}"))[1]
        .parse()
        .expect("index")
}

#[test]
fn test_people_sheet_end_to_end() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("people.xlsx");

    let sheet = SheetModel::new(
        "People",
        Some(EnumSourceValue::from_records(&people())),
        &[],
        &[],
    )
    .expect("build sheet");
    let mut workbook = sheet.to_workbook(&path_out).expect("assemble");
    assert_eq!(workbook.file_out(), path_out.as_path());
    workbook.save().expect("save");

    assert_eq!(workbook.state(), EnumWorkbookState::Saved);
    assert_eq!(read_sheet_names(&path_out), vec!["People".to_string()]);

    // Row 1 is reserved for the notice and stays empty here.
    assert_eq!(read_cell(&path_out, "People", 0, 0), None);
    assert_eq!(read_cell(&path_out, "People", 2, 2), Some(Data::Empty));
    assert_eq!(
        read_cell(&path_out, "People", 1, 0),
        Some(Data::String("Name".to_string()))
    );
    assert_eq!(
        read_cell(&path_out, "People", 1, 1),
        Some(Data::String("Age".to_string()))
    );
    assert_eq!(
        read_cell(&path_out, "People", 1, 2),
        Some(Data::String("Note".to_string()))
    );
    assert_eq!(
        read_cell(&path_out, "People", 2, 0),
        Some(Data::String("A".to_string()))
    );
    assert_eq!(
        read_cell(&path_out, "People", 2, 1),
        Some(Data::Float(1.0))
    );
    assert_eq!(
        read_cell(&path_out, "People", 3, 0),
        Some(Data::String("B".to_string()))
    );
    assert_eq!(
        read_cell(&path_out, "People", 3, 1),
        Some(Data::Float(2.0))
    );
    assert_eq!(
        read_cell(&path_out, "People", 3, 2),
        Some(Data::String("second".to_string()))
    );
}

#[test]
fn test_notice_lands_in_a1() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("notice.xlsx");

    let record = SpecRecord::new(vec![
        SpecRecordField::new("notice", "notice", "Please fill in every column")
            .with_style("red-text-locked"),
        SpecRecordField::new("name", "header|Name", ""),
    ]);
    let sheet = SheetModel::new("Template", Some(record.into()), &[], &[]).expect("build");
    assert_eq!(sheet.notice(), Some("Please fill in every column"));

    let mut workbook = sheet.to_workbook(&path_out).expect("assemble");
    workbook.save().expect("save");

    assert_eq!(
        read_cell(&path_out, "Template", 0, 0),
        Some(Data::String("Please fill in every column".to_string()))
    );
    assert_eq!(
        read_cell(&path_out, "Template", 1, 0),
        Some(Data::String("Name".to_string()))
    );
}

#[test]
fn test_omitted_column_is_not_rendered() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("omit.xlsx");

    let sheet = SheetModel::new(
        "People",
        Some(EnumSourceValue::from_records(&people())),
        &["Age"],
        &[],
    )
    .expect("build");
    assert_eq!(sheet.header(), ["Name", "Age", "Note"]);
    assert_eq!(sheet.visible_columns(), vec![0, 2]);

    let mut workbook = sheet.to_workbook(&path_out).expect("assemble");
    workbook.save().expect("save");

    assert_eq!(
        read_cell(&path_out, "People", 1, 1),
        Some(Data::String("Note".to_string()))
    );
    assert_eq!(read_cell(&path_out, "People", 1, 2), None);
    assert_eq!(
        read_cell(&path_out, "People", 3, 1),
        Some(Data::String("second".to_string()))
    );
}

#[test]
fn test_dropdown_sheet_saves() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("dropdown.xlsx");

    let record = SpecRecord::new(vec![
        SpecRecordField::new("name", "header|Name", ""),
        SpecRecordField::new("status", "header|Status", ""),
    ]);
    let mut sheet = SheetModel::new("Intake", Some(record.into()), &[], &[]).expect("build");
    sheet
        .set_options("Status", ["open", "closed"])
        .expect("options by title")
        .set_options("D", ["x"])
        .expect("options by column");

    let option_set = sheet.option_set().expect("options present");
    assert_eq!(
        option_set.get("B").expect("B"),
        ["open".to_string(), "closed".to_string()]
    );
    assert_eq!(option_set.get("D").expect("D"), ["x".to_string()]);

    let mut workbook = sheet.to_workbook(&path_out).expect("assemble");
    workbook.save().expect("save");
    assert!(path_out.exists());
}

#[test]
fn test_saved_parts_carry_formats_and_validations() {
    let record = SpecRecord::new(vec![
        SpecRecordField::new("tip", "notice", "Fill all fields").with_style("red-text-locked"),
        SpecRecordField::new("name", "header|Name", "").with_style("header-default"),
        SpecRecordField::new("status", "header|Status", ""),
    ]);
    let mut sheet = SheetModel::new("Intake", Some(record.into()), &[], &[]).expect("build");
    sheet
        .set_options("Status", ["open", "closed"])
        .expect("options by title")
        .set_options("D", ["x"])
        .expect("options by column");
    let options = SpecWorkbookOptions {
        if_protect_sheets: true,
        ..Default::default()
    };
    let mut workbook =
        XlsxWorkbook::with_options("unused.xlsx", SpecStylePresets::default(), options);
    workbook.add_sheets([sheet]).expect("add");
    let v_buf = workbook.save_to_buffer().expect("buffer");

    let c_sheet = read_zip_part(&v_buf, "xl/worksheets/sheet1.xml");
    let c_styles = read_zip_part(&v_buf, "xl/styles.xml");
    let l_xfs = read_cell_xfs(&c_styles);
    let l_fonts = read_fonts(&c_styles);

    // Dropdowns cover the first data row through the last Excel row.
    assert!(c_sheet.contains(r#"type="list""#));
    assert!(c_sheet.contains(r#"sqref="B3:B1048576""#));
    assert!(c_sheet.contains(r#"sqref="D3:D1048576""#));
    assert!(c_sheet.contains("open,closed"));
    assert!(c_sheet.contains("<sheetProtection"));

    // Data columns are unlocked text.
    let l_col_styles: Vec<usize> = Regex::new(r#"<col [^>]*style="(\d+)""#)
        .unwrap()
        .captures_iter(&c_sheet)
        .map(|caps| caps[1].parse().expect("index"))
        .collect();
    assert!(!l_col_styles.is_empty());
    for n_xf in l_col_styles {
        assert!(l_xfs[n_xf].contains(r#"numFmtId="49""#), "{}", l_xfs[n_xf]);
        assert!(l_xfs[n_xf].contains(r#"locked="0""#), "{}", l_xfs[n_xf]);
    }

    // Header cells stay locked; the styled title is bold.
    for c_cell in ["A2", "B2"] {
        let n_xf = read_attr_index(&c_sheet, &format!(r#"<c r="{c_cell}" s="(\d+)""#));
        assert!(!l_xfs[n_xf].contains(r#"locked="0""#), "{}", l_xfs[n_xf]);
    }
    let n_xf_name = read_attr_index(&c_sheet, r#"<c r="A2" s="(\d+)""#);
    let n_font_name = read_attr_index(&l_xfs[n_xf_name], r#"fontId="(\d+)""#);
    assert!(l_fonts[n_font_name].contains("<b/>"));

    // Notice at A1 is red, bold and locked.
    let n_xf_notice = read_attr_index(&c_sheet, r#"<c r="A1" s="(\d+)""#);
    assert!(!l_xfs[n_xf_notice].contains(r#"locked="0""#));
    let n_font_notice = read_attr_index(&l_xfs[n_xf_notice], r#"fontId="(\d+)""#);
    assert!(l_fonts[n_font_notice].contains("<b/>"));
    assert!(l_fonts[n_font_notice].contains(r#"rgb="FFFF0000""#));
}

#[test]
fn test_rejected_batch_keeps_earlier_sheets_saveable() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("partial.xlsx");

    let record_bad = SpecRecord::new(vec![SpecRecordField::new(
        "day",
        "header|Day",
        NaiveDate::from_ymd_opt(1500, 1, 1).expect("date"),
    )]);
    let sheet_bad = SheetModel::new(
        "Dates",
        Some(EnumSourceValue::from(vec![record_bad])),
        &[],
        &[],
    )
    .expect("build dates");
    let sheet_people = SheetModel::new(
        "People",
        Some(EnumSourceValue::from_records(&people())),
        &[],
        &[],
    )
    .expect("build people");

    let mut workbook = XlsxWorkbook::new(&path_out);
    workbook.add_sheets([sheet_people]).expect("add people");
    assert!(matches!(
        workbook.add_sheets([sheet_bad]),
        Err(TagsheetError::InvalidArgument(_))
    ));
    assert_eq!(workbook.state(), EnumWorkbookState::Accumulating);

    workbook.save().expect("save");
    assert_eq!(read_sheet_names(&path_out), vec!["People".to_string()]);
}

#[test]
fn test_multiple_sheets_and_mixed_values() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("multi.xlsx");

    let record_flags = SpecRecord::new(vec![
        SpecRecordField::new("flag", "header|Flag", true),
        SpecRecordField::new(
            "day",
            "header|Day",
            NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"),
        ),
        SpecRecordField::new("blank", "header|Blank", EnumCellValue::None),
    ]);
    let sheet_flags = SheetModel::new(
        "Flags",
        Some(EnumSourceValue::from(vec![record_flags])),
        &[],
        &[],
    )
    .expect("build flags");
    let sheet_people = SheetModel::new(
        "People",
        Some(EnumSourceValue::from_records(&people())),
        &[],
        &["Age"],
    )
    .expect("build people");

    let mut workbook = XlsxWorkbook::new(&path_out);
    workbook
        .add_sheets([sheet_people])
        .expect("add people")
        .add_sheets([sheet_flags])
        .expect("add flags");
    workbook.save().expect("save");

    assert_eq!(
        read_sheet_names(&path_out),
        vec!["People".to_string(), "Flags".to_string()]
    );
    assert_eq!(
        read_cell(&path_out, "Flags", 2, 0),
        Some(Data::Bool(true))
    );
    assert!(read_cell(&path_out, "Flags", 2, 1).is_some());
    assert_eq!(read_cell(&path_out, "Flags", 2, 2), Some(Data::Empty));
}

#[test]
fn test_save_twice_is_invalid_state() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("twice.xlsx");

    let sheet = SheetModel::new(
        "People",
        Some(EnumSourceValue::from_records(&people())),
        &[],
        &[],
    )
    .expect("build");
    let mut workbook = sheet.to_workbook(&path_out).expect("assemble");
    workbook.save().expect("first save");

    assert!(matches!(workbook.save(), Err(TagsheetError::InvalidState(_))));
}

#[test]
fn test_duplicate_names_fail_before_any_write() {
    let dir_tmp = TempDir::new().expect("tempdir");
    let path_out = dir_tmp.path().join("dup.xlsx");

    let sheet_a = SheetModel::new("Data", None, &[], &[]).expect("build a");
    let sheet_b = SheetModel::new("DATA", None, &[], &[]).expect("build b");

    let mut workbook = XlsxWorkbook::new(&path_out);
    let err = workbook
        .add_sheets([sheet_a, sheet_b])
        .err()
        .expect("duplicate must fail");

    assert!(matches!(err, TagsheetError::InvalidArgument(_)));
    assert!(workbook.sheets().is_empty());
    assert_eq!(workbook.state(), EnumWorkbookState::Empty);
    assert!(!path_out.exists());
}

#[test]
fn test_save_to_buffer_round_trip() {
    let sheet = SheetModel::new(
        "People",
        Some(EnumSourceValue::from_records(&people())),
        &[],
        &[],
    )
    .expect("build");
    let options = SpecWorkbookOptions {
        if_protect_sheets: true,
        protect_password: Some("secret".to_string()),
        ..Default::default()
    };
    let mut workbook =
        XlsxWorkbook::with_options("unused.xlsx", SpecStylePresets::default(), options);
    workbook.add_sheets([sheet]).expect("add");

    let v_buf = workbook.save_to_buffer().expect("buffer");
    let mut reader = Xlsx::new(Cursor::new(v_buf)).expect("read buffer");
    let range = reader.worksheet_range("People").expect("range");

    assert_eq!(
        range.get_value((1, 0)),
        Some(&Data::String("Name".to_string()))
    );
    assert_eq!(range.get_value((3, 1)), Some(&Data::Float(2.0)));
    assert!(!Path::new("unused.xlsx").exists());
}

#[test]
fn test_empty_list_source_yields_empty_sheet() {
    let sheet = SheetModel::new("Empty", Some(EnumSourceValue::List(vec![])), &[], &[])
        .expect("build");

    assert!(sheet.header().is_empty());
    assert!(sheet.rows().is_empty());

    let mut workbook = XlsxWorkbook::new("unused.xlsx");
    workbook.add_sheets([sheet]).expect("add");
    assert!(!workbook.save_to_buffer().expect("buffer").is_empty());
}
