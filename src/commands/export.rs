use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{ExportFormat, ExportSettings, QueryResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Explicit format first, then the file extension, then the configured default
pub fn resolve_format(path: &Path, format: Option<ExportFormat>, settings: &ExportSettings) -> ExportFormat {
    format
        .or_else(|| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .and_then(ExportFormat::from_extension)
        })
        .unwrap_or(settings.default_format)
}

/// Write a result set to `path`. Returns the number of rows written.
pub fn export_result(
    result: &QueryResult,
    path: &Path,
    format: Option<ExportFormat>,
    settings: &ExportSettings,
) -> Result<usize> {
    if !result.success {
        return Err(Error::NothingToExport("the query failed"));
    }
    if result.columns.is_empty() {
        return Err(Error::NothingToExport("the statement returned no result set"));
    }

    if result.has_more {
        log::warn!(
            "Exporting {} of {} row(s); the rest were dropped by the row limit",
            result.rows.len(),
            result.total_rows
        );
    }

    let format = resolve_format(path, format, settings);
    match format {
        ExportFormat::Csv => export_csv(result, path, settings)?,
        ExportFormat::Xlsx => export_xlsx(result, path, settings)?,
    }

    log::info!(
        "Exported {} row(s) as {} to {}",
        result.rows.len(),
        format.extension(),
        path.display()
    );
    Ok(result.rows.len())
}

fn csv_cell(value: &Value, null_as_empty: bool) -> String {
    match value {
        Value::Null if null_as_empty => String::new(),
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn export_csv(result: &QueryResult, path: &Path, settings: &ExportSettings) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    if settings.csv_bom {
        file.write_all(UTF8_BOM)?;
    }

    let mut writer = csv::Writer::from_writer(file);

    if settings.include_headers {
        writer.write_record(result.columns.iter().map(|col| col.name.as_str()))?;
    }

    for row in &result.rows {
        writer.write_record(row.iter().map(|value| csv_cell(value, settings.null_as_empty)))?;
    }

    writer.flush()?;
    Ok(())
}

fn export_xlsx(result: &QueryResult, path: &Path, settings: &ExportSettings) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Results")?;

    let mut row_index: u32 = 0;
    if settings.include_headers {
        for (col, column) in result.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, &column.name, &header_format)?;
        }
        row_index = 1;
    }

    for row in &result.rows {
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            match value {
                Value::Null if settings.null_as_empty => {}
                Value::Null => {
                    worksheet.write_string(row_index, col, "NULL")?;
                }
                Value::Bool(b) => {
                    worksheet.write_boolean(row_index, col, *b)?;
                }
                Value::Number(n) => match n.as_f64() {
                    Some(f) => {
                        worksheet.write_number(row_index, col, f)?;
                    }
                    None => {
                        worksheet.write_string(row_index, col, n.to_string())?;
                    }
                },
                Value::String(s) => {
                    worksheet.write_string(row_index, col, s)?;
                }
                other => {
                    worksheet.write_string(row_index, col, other.to_string())?;
                }
            }
        }
        row_index += 1;
    }

    workbook.save(path)?;
    Ok(())
}
