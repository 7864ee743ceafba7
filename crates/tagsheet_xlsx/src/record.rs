//! Declarative record schema: region tags, the `SheetRecord` trait and the
//! `sheet_record!` macro that implements it for plain structs.

use crate::conf::CHR_REGION_TAG_SEP;
use crate::spec::{EnumSheetRegion, EnumSourceValue, Result, SpecRecord, TagsheetError};

/// Recognized region tag of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumRegionTag {
    /// `notice`: field value becomes the A1 banner.
    Notice,
    /// `header|<title>`: field becomes a column titled `<title>`.
    Header(String),
}

impl EnumRegionTag {
    /// Region this tag points at.
    pub fn region(&self) -> EnumSheetRegion {
        match self {
            EnumRegionTag::Notice => EnumSheetRegion::Notice,
            EnumRegionTag::Header(_) => EnumSheetRegion::Header,
        }
    }
}

/// Parse a raw region tag.
///
/// Returns `Ok(None)` for tags naming no known region; such fields are
/// ignored. A `header` tag without a title is an error.
pub fn parse_region_tag(tag: &str) -> Result<Option<EnumRegionTag>> {
    let (c_part, c_title) = match tag.split_once(CHR_REGION_TAG_SEP) {
        Some((c_part, c_title)) => (c_part.trim(), Some(c_title)),
        None => (tag.trim(), None),
    };

    match c_part {
        "notice" => Ok(Some(EnumRegionTag::Notice)),
        "header" => match c_title {
            Some(c_title) if !c_title.trim().is_empty() => {
                Ok(Some(EnumRegionTag::Header(c_title.to_string())))
            }
            _ => Err(TagsheetError::invalid_argument(format!(
                "header tag {tag:?} needs a title (header|<title>)"
            ))),
        },
        _ => Ok(None),
    }
}

/// Types that can describe themselves as a tagged record.
pub trait SheetRecord {
    /// Field list with tags and current values.
    fn to_record(&self) -> SpecRecord;
}

impl SheetRecord for SpecRecord {
    fn to_record(&self) -> SpecRecord {
        self.clone()
    }
}

impl EnumSourceValue {
    /// Layout-only source from one record.
    pub fn from_record<T: SheetRecord + ?Sized>(record: &T) -> Self {
        EnumSourceValue::Record(record.to_record())
    }

    /// Layout-and-rows source from a homogeneous record list.
    pub fn from_records<T: SheetRecord>(records: &[T]) -> Self {
        EnumSourceValue::List(
            records
                .iter()
                .map(|record| EnumSourceValue::Record(record.to_record()))
                .collect(),
        )
    }
}

/// Implement [`SheetRecord`] for a struct by listing its tagged fields.
///
/// Fields left out of the list are untagged and never reach the sheet.
///
/// ```
/// use tagsheet_xlsx::sheet_record;
///
/// #[derive(Clone)]
/// struct Person {
///     name: String,
///     age: u32,
///     internal_id: u64,
/// }
///
/// sheet_record!(Person {
///     name => "header|Name", style = "header-default";
///     age => "header|Age";
/// });
/// ```
#[macro_export]
macro_rules! sheet_record {
    ($ty:ty { $( $field:ident => $tag:literal $(, style = $style:literal)? );* $(;)? }) => {
        impl $crate::record::SheetRecord for $ty {
            fn to_record(&self) -> $crate::spec::SpecRecord {
                $crate::spec::SpecRecord::new(vec![
                    $(
                        $crate::spec::SpecRecordField::new(
                            stringify!($field),
                            $tag,
                            $crate::spec::EnumCellValue::from(
                                ::std::clone::Clone::clone(&self.$field),
                            ),
                        )
                        $(.with_style($style))?
                    ),*
                ])
            }
        }
    };
}
