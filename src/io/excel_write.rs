use std::path::Path;

use rust_xlsxwriter::{
    Color, ConditionalFormatFormula, Format, FormatAlign, FormatUnderline, Image, ObjectMovement, Url,
    Workbook, Worksheet,
};
use tracing::{debug, warn};

use crate::error::Result;
use crate::io::cover::fit_cover;
use crate::layout::{Cell, CellStyle, CellValue, Column, Highlight, SheetLayout};

const HEADER_FILL: &str = "#D3D3D3";
const OWNED_FILL: &str = "#C6EFCE";
const OLD_BOOK_FILL: &str = "#FCE4D6";
const PRICE_FORMAT: &str = "#,##0\"원\"";
const NUMBER_FORMAT: &str = "#,##0";

struct CellFormats {
    header: Format,
    center: Format,
    left: Format,
    price: Format,
    number: Format,
    owned: Format,
    old_book: Format,
}

impl CellFormats {
    fn new(font_size: f64) -> Self {
        let base = Format::new()
            .set_font_size(font_size)
            .set_text_wrap()
            .set_align(FormatAlign::VerticalCenter);
        let center = base.clone().set_align(FormatAlign::Center);

        Self {
            header: center.clone().set_bold().set_background_color(HEADER_FILL),
            left: base.set_align(FormatAlign::Left),
            price: center.clone().set_num_format(PRICE_FORMAT),
            number: center.clone().set_num_format(NUMBER_FORMAT),
            center,
            owned: Format::new().set_background_color(OWNED_FILL),
            old_book: Format::new().set_background_color(OLD_BOOK_FILL),
        }
    }

    fn for_style(&self, style: CellStyle) -> &Format {
        match style {
            CellStyle::Header => &self.header,
            CellStyle::Center => &self.center,
            CellStyle::Left => &self.left,
            CellStyle::Price => &self.price,
            CellStyle::Number => &self.number,
        }
    }

    fn for_highlight(&self, highlight: Highlight) -> &Format {
        match highlight {
            Highlight::Owned => &self.owned,
            Highlight::OldBook => &self.old_book,
        }
    }
}

/// Writes the laid-out sheets to an `.xlsx` file at `path`.
pub fn write_workbook(path: &Path, sheets: &[SheetLayout<'_>], font_size: f64) -> Result<()> {
    let formats = CellFormats::new(font_size);
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet, &formats)?;
        debug!(sheet = %sheet.name, rows = sheet.rows.len(), "sheet written");
    }

    workbook.save(path)?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &SheetLayout<'_>, formats: &CellFormats) -> Result<()> {
    for (column, width) in Column::ALL.iter().zip(&sheet.column_widths) {
        worksheet.set_column_width(column.index(), *width)?;
        worksheet.write_string_with_format(0, column.index(), column.header(), &formats.header)?;
    }
    worksheet.set_row_height(0, sheet.header_height)?;

    let cover_col = Column::Cover.index();
    for (offset, row) in sheet.rows.iter().enumerate() {
        let row_idx = (offset + 1) as u32;
        worksheet.set_row_height(row_idx, row.height)?;

        for (column, cell) in Column::ALL.iter().zip(&row.cells) {
            write_cell(worksheet, row_idx, column.index(), cell, formats)?;
        }

        if let Some(cover) = row.record.cover.as_deref() {
            match fit_cover(cover, row.cover_size) {
                Ok(png) => {
                    let image = Image::new_from_buffer(&png)?
                        .set_object_movement(ObjectMovement::MoveAndSizeWithCells);
                    worksheet.insert_image(row_idx, cover_col, &image)?;
                }
                Err(error) => {
                    warn!(book = %row.record.label(), %error, "cover could not be decoded, skipping");
                }
            }
        }
    }

    if !sheet.rows.is_empty() {
        let last_row = sheet.rows.len() as u32;
        let last_col = (Column::ALL.len() - 1) as u16;
        for rule in &sheet.rules {
            let conditional = ConditionalFormatFormula::new()
                .set_rule(rule.formula.as_str())
                .set_format(formats.for_highlight(rule.highlight));
            worksheet.add_conditional_format(1, 0, last_row, last_col, &conditional)?;
        }
    }

    Ok(())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell, formats: &CellFormats) -> Result<()> {
    let format = formats.for_style(cell.style);
    match &cell.value {
        CellValue::Empty => {}
        CellValue::Text(text) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        CellValue::Number(value) => {
            worksheet.write_number_with_format(row, col, *value, format)?;
        }
        CellValue::Link { url, text } => {
            let link_format = format
                .clone()
                .set_font_color(Color::Blue)
                .set_underline(FormatUnderline::Single);
            worksheet.write_url_with_format(row, col, Url::new(url).set_text(text), &link_format)?;
        }
    }
    Ok(())
}
