//! Turns enriched records into a sheet-by-sheet layout: cell values and
//! styles, column widths, row heights, highlight rules and cover sizes.
//!
//! Nothing here touches the filesystem; [`crate::io::excel_write`] renders
//! the result.

pub mod metrics;

use crate::catalog::item_page_url;
use crate::config::LibraryTarget;
use crate::model::BookRecord;

use metrics::{GlyphMetrics, col_to_px, line_count, row_to_px, text_height};

/// Font size used for every cell.
pub const DEFAULT_FONT_SIZE: f64 = 11.0;
/// Widest a text column may get, in character units.
pub const MAX_COLUMN_WIDTH: f64 = 60.0;
/// Width of the cover column, in character units.
pub const COVER_COLUMN_WIDTH: f64 = 16.0;
/// Height a row needs to show a cover, in points.
pub const COVER_ROW_HEIGHT: f64 = 112.0;
/// Label of the ownership hyperlink; rows showing it are highlighted.
pub const HOLDING_LINK_LABEL: &str = "link";
/// Publications this many years older than the current year are not old yet.
pub const OLD_BOOK_AGE: i32 = 4;

const STAR_COUNT: usize = 5;

/// How a cell is formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellStyle {
    Header,
    Center,
    Left,
    Price,
    Number,
}

/// Value written into one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Link { url: String, text: String },
}

/// One formatted cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
}

impl Cell {
    fn new(value: CellValue, style: CellStyle) -> Self {
        Self { value, style }
    }

    /// Text as it appears once the cell format is applied.
    pub fn display_text(&self) -> String {
        match (&self.value, self.style) {
            (CellValue::Empty, _) => String::new(),
            (CellValue::Text(text) | CellValue::Link { text, .. }, _) => text.clone(),
            (CellValue::Number(value), CellStyle::Price) => format!("{}원", group_thousands(*value as i64)),
            (CellValue::Number(value), _) => group_thousands(*value as i64),
        }
    }
}

/// The fixed output columns, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Cover,
    Title,
    Author,
    Publisher,
    Isbn13,
    Price,
    PublishDate,
    Description,
    Rating,
    SalesIndex,
    Category,
    Ownership,
    Memo,
}

impl Column {
    pub const ALL: [Column; 13] = [
        Column::Cover,
        Column::Title,
        Column::Author,
        Column::Publisher,
        Column::Isbn13,
        Column::Price,
        Column::PublishDate,
        Column::Description,
        Column::Rating,
        Column::SalesIndex,
        Column::Category,
        Column::Ownership,
        Column::Memo,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Cover => "",
            Column::Title => "도서",
            Column::Author => "저자",
            Column::Publisher => "출판사",
            Column::Isbn13 => "ISBN13",
            Column::Price => "정가",
            Column::PublishDate => "출판일",
            Column::Description => "설명",
            Column::Rating => "평점",
            Column::SalesIndex => "판매지수",
            Column::Category => "카테고리",
            Column::Ownership => "교내 도서관 소장",
            Column::Memo => "메모",
        }
    }

    fn style(self) -> CellStyle {
        match self {
            Column::Price => CellStyle::Price,
            Column::SalesIndex => CellStyle::Number,
            Column::Description | Column::Category | Column::Memo => CellStyle::Left,
            _ => CellStyle::Center,
        }
    }

    /// Zero-based column index.
    pub fn index(self) -> u16 {
        Column::ALL
            .iter()
            .position(|column| *column == self)
            .unwrap_or_default() as u16
    }

    /// Spreadsheet column letter.
    pub fn letter(self) -> char {
        (b'A' + self.index() as u8) as char
    }

    fn cell(self, record: &BookRecord, library: &LibraryTarget) -> Cell {
        let text = |value: &str| CellValue::Text(value.to_string());
        let value = match self {
            Column::Cover => CellValue::Empty,
            Column::Title => match record.item_id {
                Some(item_id) if !record.title.is_empty() => CellValue::Link {
                    url: item_page_url(item_id),
                    text: record.title.clone(),
                },
                _ => text(&record.title),
            },
            Column::Author => text(&record.author),
            Column::Publisher => text(&record.publisher),
            Column::Isbn13 => text(record.isbn13().unwrap_or_default()),
            Column::Price => CellValue::Number(record.standard_price as f64),
            Column::PublishDate => text(&record.publish_date),
            Column::Description => text(&record.description),
            Column::Rating => CellValue::Text(format_rating(record.rating_score, record.rating_count)),
            Column::SalesIndex => CellValue::Number(record.sales_index as f64),
            Column::Category => text(&record.category),
            Column::Ownership => match record.ownership.reference_keys() {
                Some((book_key, species_key)) => CellValue::Link {
                    url: library.holding_url(book_key, species_key),
                    text: HOLDING_LINK_LABEL.to_string(),
                },
                None => text(record.ownership.marker()),
            },
            Column::Memo => text(&record.memo),
        };
        Cell::new(value, self.style())
    }
}

/// Which conditional fill a rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// The school library holds the book and it can be linked to.
    Owned,
    /// The book was published more than [`OLD_BOOK_AGE`] years ago.
    OldBook,
}

/// A conditional formatting rule covering every data row of a sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRule {
    pub highlight: Highlight,
    /// Formula relative to the first data row.
    pub formula: String,
}

/// One data row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout<'a> {
    pub record: &'a BookRecord,
    pub cells: Vec<Cell>,
    pub height: f64,
    /// Pixel size the cover is resized to.
    pub cover_size: (u32, u32),
}

/// One output sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout<'a> {
    pub name: String,
    pub column_widths: Vec<f64>,
    pub header_height: f64,
    pub rows: Vec<RowLayout<'a>>,
    pub rules: Vec<HighlightRule>,
}

/// Settings that shape the layout.
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    pub font_size: f64,
    pub metrics: GlyphMetrics,
    pub current_year: i32,
    pub library: LibraryTarget,
}

impl LayoutOptions {
    pub fn new(library: LibraryTarget, current_year: i32) -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            metrics: GlyphMetrics::default(),
            current_year,
            library,
        }
    }
}

/// Groups records into sheets in first-seen order, rows ordered by display
/// order, and computes every size the writer needs.
pub fn build_layout<'a>(records: &'a [BookRecord], options: &LayoutOptions) -> Vec<SheetLayout<'a>> {
    let mut sheet_names: Vec<&str> = Vec::new();
    for record in records {
        if !sheet_names.contains(&record.sheet_name()) {
            sheet_names.push(record.sheet_name());
        }
    }

    sheet_names
        .into_iter()
        .map(|name| {
            let mut group: Vec<&BookRecord> =
                records.iter().filter(|record| record.sheet_name() == name).collect();
            group.sort_by_key(|record| record.display_order());
            build_sheet(name, &group, options)
        })
        .collect()
}

fn build_sheet<'a>(name: &str, records: &[&'a BookRecord], options: &LayoutOptions) -> SheetLayout<'a> {
    let grid: Vec<Vec<Cell>> = records
        .iter()
        .map(|record| {
            Column::ALL
                .iter()
                .map(|column| column.cell(record, &options.library))
                .collect()
        })
        .collect();

    let column_widths: Vec<f64> = Column::ALL
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            if *column == Column::Cover {
                return COVER_COLUMN_WIDTH;
            }
            let header = options.metrics.char_units(column.header());
            grid.iter()
                .map(|cells| options.metrics.char_units(&cells[idx].display_text()))
                .fold(header, f64::max)
                .min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let cover_width_px = col_to_px(column_widths[Column::Cover.index() as usize]);
    let header_height = text_height(1, options.font_size);

    let rows = records
        .iter()
        .copied()
        .zip(grid)
        .map(|(record, cells)| {
            let height = Column::ALL
                .iter()
                .zip(&cells)
                .map(|(column, cell)| match column {
                    Column::Cover => COVER_ROW_HEIGHT,
                    _ => text_height(line_count(&cell.display_text()), options.font_size),
                })
                .fold(header_height, f64::max);

            RowLayout {
                record,
                cells,
                height,
                cover_size: (cover_width_px, row_to_px(height)),
            }
        })
        .collect();

    SheetLayout {
        name: name.to_string(),
        column_widths,
        header_height,
        rows,
        rules: highlight_rules(options.current_year),
    }
}

/// Conditional formatting formulas, relative to the first data row.
pub fn highlight_rules(current_year: i32) -> Vec<HighlightRule> {
    let ownership = Column::Ownership.letter();
    let published = Column::PublishDate.letter();
    vec![
        HighlightRule {
            highlight: Highlight::Owned,
            formula: format!("=${ownership}2=\"{HOLDING_LINK_LABEL}\""),
        },
        HighlightRule {
            highlight: Highlight::OldBook,
            formula: format!(
                "=IFERROR(VALUE(LEFT(${published}2,4))<{},FALSE)",
                current_year - OLD_BOOK_AGE
            ),
        },
    ]
}

/// `"{score} {filled}{empty} ({count})"` with one star per two points.
pub fn format_rating(score: f64, count: u64) -> String {
    let filled = ((score / 2.0).round_ties_even().max(0.0) as usize).min(STAR_COUNT);
    format!(
        "{score:.1} {}{} ({count})",
        "★".repeat(filled),
        "☆".repeat(STAR_COUNT - filled)
    )
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}
