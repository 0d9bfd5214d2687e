//! The `products.xlsx` workbook: one worksheet per populated sheet view.

use pharmacrawl_core::Record;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use crate::sheet::Sheet;
use crate::store::COLUMNS;

/// Column widths in character units, in `COLUMNS` order.
const WIDTHS: [f64; 7] = [15.0, 50.0, 15.0, 10.0, 40.0, 10.0, 20.0];

/// Renders `records` as an xlsx workbook.
///
/// "All Products" is always present; the filtered views get a worksheet
/// only when they have rows.
pub(crate) fn render(records: &[Record]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for sheet in Sheet::ALL {
        let rows: Vec<&Record> = records.iter().filter(|r| sheet.includes(r)).collect();
        if rows.is_empty() && sheet != Sheet::All {
            continue;
        }
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.title())?;
        write_sheet(worksheet, &header, &rows)?;
    }

    workbook.save_to_buffer()
}

fn write_sheet(worksheet: &mut Worksheet, header: &Format, rows: &[&Record]) -> Result<(), XlsxError> {
    for (col, (name, width)) in (0u16..).zip(COLUMNS.iter().zip(WIDTHS)) {
        worksheet.write_string_with_format(0, col, *name, header)?;
        worksheet.set_column_width(col, width)?;
    }

    for (row, record) in (1u32..).zip(rows) {
        let cells = [
            record.product_code.as_str(),
            record.title.as_str(),
            record.price.as_str(),
            record.price_old.as_str(),
            record.category.as_str(),
            record.page_number.as_str(),
            record.source.as_str(),
        ];
        for (col, value) in (0u16..).zip(cells) {
            worksheet.write_string(row, col, value)?;
        }
    }
    Ok(())
}
