//! 表格数据读取
//!
//! 支持 csv / tsv（csv crate）和 xlsx / xlsm / xls / ods（calamine，只读第一个工作表）。
//! 第一行为表头。

use calamine::{open_workbook_auto, Data, DataType, Reader};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, DataSourceError};
use crate::models::row::{CellValue, DataRow, DataTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Delimited(u8),
    Spreadsheet,
}

fn detect_format(path: &Path) -> AppResult<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Ok(SourceFormat::Delimited(b',')),
        Some("tsv") => Ok(SourceFormat::Delimited(b'\t')),
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => Ok(SourceFormat::Spreadsheet),
        _ => Err(DataSourceError::UnsupportedFormat {
            path: path.display().to_string(),
        }
        .into()),
    }
}

/// 加载整张表
///
/// # 参数
/// - `path`: 数据文件路径，按扩展名选择解析方式
///
/// # 返回
/// 按文件顺序排列的数据行；全空行已去掉
pub async fn load_table(path: &Path) -> AppResult<DataTable> {
    let path_buf: PathBuf = path.to_path_buf();
    let table = tokio::task::spawn_blocking(move || load_table_blocking(&path_buf))
        .await
        .map_err(|e| AppError::data_parse_failed(path.display().to_string(), e))??;

    info!(
        "✓ 已读取数据文件 {}: {} 列, {} 行",
        path.display(),
        table.columns.len(),
        table.len()
    );
    Ok(table)
}

/// 只读取列名（供配置映射时使用）
pub async fn read_columns(path: &Path) -> AppResult<Vec<String>> {
    Ok(load_table(path).await?.columns)
}

/// [`load_table`] 的同步版本
pub fn load_table_blocking(path: &Path) -> AppResult<DataTable> {
    let (header, records) = match detect_format(path)? {
        SourceFormat::Delimited(delimiter) => read_delimited(path, delimiter)?,
        SourceFormat::Spreadsheet => read_spreadsheet(path)?,
    };

    if header.is_empty() {
        return Err(DataSourceError::MissingHeader {
            path: path.display().to_string(),
        }
        .into());
    }

    let columns = normalize_header(header);
    debug!("列名: {:?}", columns);
    let index: HashMap<String, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.clone(), i))
        .collect();
    let shared_columns: Arc<[String]> = columns.clone().into();
    let shared_index = Arc::new(index);

    let rows = records
        .into_iter()
        .filter(|values| values.iter().any(|v| !v.is_empty()))
        .map(|values| DataRow::new(shared_columns.clone(), shared_index.clone(), values))
        .collect();

    Ok(DataTable { columns, rows })
}

fn read_delimited(path: &Path, delimiter: u8) -> AppResult<(Vec<String>, Vec<Vec<CellValue>>)> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| AppError::data_read_failed(display.clone(), e))?;

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::data_parse_failed(display.clone(), e))?
        .iter()
        .map(str::to_string)
        .collect();

    // 字段少于表头时补空；多出的字段只有全为空才允许，否则数据会被截掉
    let records = reader
        .records()
        .map(|result| {
            let record = result.map_err(|e| AppError::data_parse_failed(display.clone(), e))?;
            if record.iter().skip(header.len()).any(|v| !v.is_empty()) {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(AppError::data_parse_failed(
                    display.clone(),
                    format!("第 {} 行有 {} 个字段，表头只有 {} 列", line, record.len(), header.len()),
                ));
            }
            Ok(record.iter().take(header.len()).map(text_cell).collect())
        })
        .collect::<AppResult<Vec<Vec<CellValue>>>>()?;

    Ok((header, records))
}

fn read_spreadsheet(path: &Path) -> AppResult<(Vec<String>, Vec<Vec<CellValue>>)> {
    let display = path.display().to_string();
    let mut workbook =
        open_workbook_auto(path).map_err(|e| AppError::data_parse_failed(display.clone(), e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::data_parse_failed(display.clone(), "工作簿中没有工作表"))?
        .map_err(|e| AppError::data_parse_failed(display.clone(), e))?;

    let mut rows = range.rows();
    let header = match rows.next() {
        Some(cells) => cells.iter().map(|c| spreadsheet_cell(c).to_string()).collect(),
        None => Vec::new(),
    };
    let records = rows
        .map(|cells| cells.iter().map(spreadsheet_cell).collect())
        .collect();

    Ok((header, records))
}

fn text_cell(raw: &str) -> CellValue {
    if raw.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(raw.to_string())
    }
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => text_cell(s),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => CellValue::DateTime(dt),
            None => CellValue::Text(cell.to_string()),
        },
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        other => text_cell(&other.to_string()),
    }
}

/// 表头规整：去掉 BOM，空列名记为 `Unnamed: <序号>`，重复列名追加 `.1`、`.2`
fn normalize_header(header: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim_start_matches('\u{feff}').trim().to_string();
            let name = if name.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{}.{}", name, count)
            };
            *count += 1;
            unique
        })
        .collect()
}
