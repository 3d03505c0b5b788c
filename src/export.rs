#![cfg(feature = "web")]

use rust_xlsxwriter::{Format, Workbook, Worksheet};

use crate::error::{DashboardError, Result};
use crate::table::Table;

/// Content type of the bytes returned by [`to_xlsx`].
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Copy of `table` without the columns named in `hidden`.
///
/// # Examples
/// ```
/// use inequality_dashboard::export::without_columns;
/// use inequality_dashboard::table::Table;
///
/// let mut t = Table::new(&["Name", "Password"]);
/// t.push_record(&[("Name", "a"), ("Password", "x")]);
/// let shown = without_columns(&t, &["password"]);
/// assert_eq!(shown.header, vec!["Name"]);
/// assert_eq!(shown.rows[0], vec!["a"]);
/// ```
pub fn without_columns(table: &Table, hidden: &[&str]) -> Table {
    let keep: Vec<usize> = table
        .header
        .iter()
        .enumerate()
        .filter(|(_, h)| !hidden.iter().any(|x| h.trim().eq_ignore_ascii_case(x)))
        .map(|(i, _)| i)
        .collect();
    Table {
        header: keep.iter().map(|&i| table.header[i].clone()).collect(),
        rows: table
            .rows
            .iter()
            .map(|r| keep.iter().map(|&i| r.get(i).cloned().unwrap_or_default()).collect())
            .collect(),
    }
}

/// Writes a table as a single-sheet workbook, header row in bold. Cells that
/// parse as numbers are written as numbers.
pub fn to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name).map_err(xlsx_error)?;
    let bold = Format::new().set_bold();

    for (c, title) in table.header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, column_index(c)?, title.as_str(), &bold)
            .map_err(xlsx_error)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let xr = u32::try_from(r + 1)
            .map_err(|_| DashboardError::Workbook("Too many rows for a worksheet.".to_string()))?;
        for (c, value) in row.iter().enumerate() {
            let xc = column_index(c)?;
            let written = match value.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => worksheet.write_number(xr, xc, n),
                _ => worksheet.write_string(xr, xc, value.as_str()),
            };
            written.map_err(xlsx_error)?;
        }
    }

    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_error)
}

fn column_index(c: usize) -> Result<u16> {
    u16::try_from(c)
        .map_err(|_| DashboardError::Workbook("Too many columns for a worksheet.".to_string()))
}

fn xlsx_error(e: rust_xlsxwriter::XlsxError) -> DashboardError {
    DashboardError::Workbook(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_index_does_not_wrap() {
        assert_eq!(column_index(3).unwrap(), 3);
        assert!(matches!(column_index(70_000), Err(DashboardError::Workbook(_))));
    }

    #[test]
    fn too_wide_table_is_an_error() {
        let names: Vec<String> = (0..70_000).map(|i| format!("c{}", i)).collect();
        let table = Table {
            header: names,
            rows: Vec::new(),
        };
        assert!(matches!(to_xlsx(&table, "wide"), Err(DashboardError::Workbook(_))));
    }
}
