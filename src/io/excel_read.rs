use std::collections::HashMap;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, ToolError};
use crate::model::{BookRecord, Identifier};

/// Header row written into a freshly created input workbook.
pub const INPUT_HEADERS: [&str; 3] = ["ISBN13", "시트", "메모 (선택)"];

const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const MAX_SHEET_NAME_CHARS: usize = 31;

/// Reads the book list from the first sheet of the workbook at `path`.
///
/// Rows start at the second row; column A holds the identifier, B the
/// target sheet and C an optional memo. Rows without an identifier are
/// skipped. Sheet names differing only in letter case are rejected. A
/// missing workbook is replaced by an empty template.
pub fn read_book_list(path: &Path) -> Result<Vec<BookRecord>> {
    if !path.exists() {
        write_template(path)?;
        return Err(ToolError::InputTemplateCreated(path.to_path_buf()));
    }

    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ToolError::InvalidWorkbook("input workbook has no sheets".into()))?
        .map_err(ToolError::from)?;

    let mut records = Vec::new();
    let mut sheet_names: HashMap<String, String> = HashMap::new();
    let (Some((start_row, _)), Some((end_row, _))) = (range.start(), range.end()) else {
        info!(path = %path.display(), "book list is empty");
        return Ok(records);
    };

    for row in start_row.max(1)..=end_row {
        let row_number = row as usize + 1;
        let cell = |col: u32| cell_to_string(range.get_value((row, col)));
        let identifier = cell(0);
        if identifier.is_empty() {
            continue;
        }

        let sheet_name = cell(1);
        if sheet_name.is_empty() {
            return Err(ToolError::MissingSheetName {
                row: row_number,
                identifier,
            });
        }
        if !is_valid_sheet_name(&sheet_name) {
            return Err(ToolError::InvalidSheetName {
                row: row_number,
                name: sheet_name,
            });
        }
        let existing = sheet_names
            .entry(sheet_name.to_lowercase())
            .or_insert_with(|| sheet_name.clone());
        if *existing != sheet_name {
            return Err(ToolError::DuplicateSheetName {
                row: row_number,
                name: sheet_name,
                existing: existing.clone(),
            });
        }

        let memo = cell(2);
        let parsed = parse_identifier(&identifier).map_err(|reason| ToolError::InvalidIdentifier {
            row: row_number,
            value: identifier.clone(),
            reason,
        })?;
        debug!(row = row_number, identifier = ?parsed, sheet = %sheet_name, "read book row");

        let display_order = records.len();
        records.push(BookRecord::new(parsed, sheet_name, memo, display_order));
    }

    info!(records = records.len(), path = %path.display(), "read book list");
    Ok(records)
}

/// Interprets an identifier cell: a catalog URL carrying an `ItemId`
/// (or `itemId`) query parameter, or a bare ISBN-13.
pub fn parse_identifier(value: &str) -> std::result::Result<Identifier, String> {
    let value = value.trim();
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Ok(Identifier::Isbn13(value.to_string()));
    }

    let url = Url::parse(value).map_err(|error| error.to_string())?;
    let item_id = url
        .query_pairs()
        .find(|(key, _)| key == "ItemId" || key == "itemId")
        .map(|(_, item_id)| item_id.into_owned())
        .ok_or_else(|| String::from("URL has no ItemId parameter"))?;

    item_id
        .trim()
        .parse::<u64>()
        .map(Identifier::ItemId)
        .map_err(|_| format!("ItemId '{item_id}' is not an integer"))
}

fn is_valid_sheet_name(name: &str) -> bool {
    name.chars().count() <= MAX_SHEET_NAME_CHARS
        && !name.contains(INVALID_SHEET_CHARS)
        && !name.starts_with('\'')
        && !name.ends_with('\'')
}

fn write_template(path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();
    for (col_idx, header) in INPUT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, *header, &bold)?;
    }
    workbook.save(path)?;
    Ok(())
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.trim().to_string(),
        Some(DataType::Float(value)) if value.fract() == 0.0 => format!("{value:.0}"),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    }
}
