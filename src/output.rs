use crate::error::ReportResult;
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &str, rows: &[T]) -> ReportResult<()> {
    ensure_parent(path)?;
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    log::info!("wrote {} rows to {}", rows.len(), path);
    Ok(())
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> ReportResult<()> {
    ensure_parent(path)?;
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    log::info!("wrote {}", path);
    Ok(())
}

fn ensure_parent(path: &str) -> ReportResult<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Render up to `max_rows` rows as a markdown table.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    match render_table(rows, max_rows) {
        Some(table_str) => {
            println!("{}", table_str);
            if rows.len() > max_rows {
                println!("... {} more rows", rows.len() - max_rows);
            }
            println!();
        }
        None => println!("(no rows)\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricRow;

    #[test]
    fn render_table_limits_rows_and_handles_empty() {
        let rows: Vec<MetricRow> = (0..4)
            .map(|i| MetricRow {
                metric: format!("m{i}"),
                value: i.to_string(),
            })
            .collect();
        let table = render_table(&rows, 2).unwrap();
        assert!(table.contains("| Metric"));
        assert!(table.contains("m1"));
        assert!(!table.contains("m2"));
        assert!(render_table::<MetricRow>(&[], 5).is_none());
    }
}
