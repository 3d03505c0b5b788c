//! Uploaded datasets and the canned summary the chatbot is grounded on.

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use crate::error::{DashboardError, Result};
use crate::table::Table;

/// Rows shown above the chat as a preview.
pub const PREVIEW_ROWS: usize = 5;

const RANKED_COUNTRIES: usize = 5;

/// A dataset uploaded on the chatbot page, with its summary computed once.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub file_name: String,
    pub table: Table,
    pub summary: String,
}

impl Dataset {
    /// Parses an uploaded CSV or spreadsheet file.
    pub fn from_upload(file_name: &str, bytes: &[u8]) -> Result<Self> {
        let lower = file_name.to_lowercase();
        let table = if lower.ends_with(".csv") {
            Table::parse(bytes)?
        } else if [".xlsx", ".xlsm", ".xls", ".ods"]
            .iter()
            .any(|ext| lower.ends_with(ext))
        {
            read_workbook(bytes)?
        } else {
            return Err(DashboardError::Validation(
                "Please upload a CSV or Excel file.".to_string(),
            ));
        };
        let summary = generate_dashboard_summary(&table);
        Ok(Dataset {
            file_name: file_name.to_string(),
            table,
            summary,
        })
    }

    /// First [`PREVIEW_ROWS`] rows.
    pub fn preview(&self) -> Table {
        Table {
            header: self.table.header.clone(),
            rows: self.table.rows.iter().take(PREVIEW_ROWS).cloned().collect(),
        }
    }
}

/// First worksheet, first row as header.
fn read_workbook(bytes: &[u8]) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DashboardError::NotFound("The workbook has no sheets.".to_string()))??;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let header = rows.next().unwrap_or_default();
    Ok(Table {
        header,
        rows: rows.collect(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_number(*f),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Whole numbers print without a fractional part, others in shortest form.
fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A mean always keeps one decimal place when it is whole (`20.0`).
fn format_mean(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

fn numbers(table: &Table, col: usize) -> impl Iterator<Item = f64> + '_ {
    table
        .rows
        .iter()
        .filter_map(move |row| row.get(col))
        .filter_map(|v| v.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

fn non_empty<'a>(table: &'a Table, col: usize) -> impl Iterator<Item = &'a str> + 'a {
    table
        .rows
        .iter()
        .filter_map(move |row| row.get(col))
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn year_range(table: &Table, col: usize) -> String {
    let years: Vec<f64> = numbers(table, col).collect();
    if !years.is_empty() {
        let min = years.iter().copied().fold(f64::INFINITY, f64::min);
        let max = years.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        return format!("{} - {}", format_number(min), format_number(max));
    }
    // Non-numeric years compare as text.
    let labels: BTreeSet<&str> = non_empty(table, col).collect();
    match (labels.first(), labels.last()) {
        (Some(min), Some(max)) => format!("{} - {}", min, max),
        _ => "nan - nan".to_string(),
    }
}

/// Mean gini per country, in country name order. Countries without a single
/// numeric gini value are left out.
fn country_means(table: &Table, country_col: usize, gini_col: usize) -> Vec<(String, f64)> {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for row in &table.rows {
        let country = row.get(country_col).map(|c| c.trim()).unwrap_or("");
        if country.is_empty() {
            continue;
        }
        let entry = groups.entry(country).or_insert((0.0, 0));
        if let Some(g) = row
            .get(gini_col)
            .and_then(|g| g.trim().parse::<f64>().ok())
            .filter(|g| !g.is_nan())
        {
            entry.0 += g;
            entry.1 += 1;
        }
    }
    groups
        .into_iter()
        .filter(|(_, (_, n))| *n > 0)
        .map(|(c, (sum, n))| (c.to_string(), sum / n as f64))
        .collect()
}

/// Top `RANKED_COUNTRIES` by mean. The sort is stable, so ties keep name order.
fn ranked(means: &[(String, f64)], descending: bool) -> Vec<&str> {
    let mut sorted: Vec<&(String, f64)> = means.iter().collect();
    sorted.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if descending { ord.reverse() } else { ord }
    });
    sorted
        .into_iter()
        .take(RANKED_COUNTRIES)
        .map(|(c, _)| c.as_str())
        .collect()
}

/// Fixed-format summary of a `country`/`year`/`gini` table. Lines whose
/// column is missing are left out; the country rankings also need the
/// `country` column.
pub fn generate_dashboard_summary(table: &Table) -> String {
    let mut parts = Vec::new();
    let country_col = table.column("country");

    if let Some(col) = country_col {
        let countries: BTreeSet<&str> = non_empty(table, col).collect();
        parts.push(format!("- Number of countries: {}", countries.len()));
    }

    if let Some(col) = table.column("year") {
        parts.push(format!("- Year range: {}", year_range(table, col)));
    }

    if let Some(col) = table.column("gini") {
        let values: Vec<f64> = numbers(table, col).collect();
        let mean = if values.is_empty() {
            f64::NAN
        } else {
            round2(values.iter().sum::<f64>() / values.len() as f64)
        };
        parts.push(format!("- Average Gini index: {}", format_mean(mean)));

        if let Some(country_col) = country_col {
            let means = country_means(table, country_col, col);
            parts.push(format!(
                "- Top 5 countries by inequality: {}",
                ranked(&means, true).join(", ")
            ));
            parts.push(format!(
                "- Lowest inequality countries: {}",
                ranked(&means, false).join(", ")
            ));
        }
    }

    format!("Dashboard Insights:\n{}", parts.join("\n"))
}
