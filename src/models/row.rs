//! 数据行

use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 单元格的值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 写入图层 / 文件名时使用的文本，空单元格返回 None
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Int(i) => write!(f, "{}", i),
            // 表格里的整数通常以浮点存储，42.0 输出为 42
            CellValue::Float(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{}", *v as i64),
            CellValue::Float(v) => write!(f, "{}", v),
            CellValue::Bool(true) => write!(f, "TRUE"),
            CellValue::Bool(false) => write!(f, "FALSE"),
            CellValue::DateTime(dt) if dt.num_seconds_from_midnight() == 0 => {
                write!(f, "{}", dt.format("%Y-%m-%d"))
            }
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// 一行数据（列名 → 值），列顺序与表头一致
#[derive(Debug, Clone)]
pub struct DataRow {
    columns: Arc<[String]>,
    values: Vec<CellValue>,
    index: Arc<HashMap<String, usize>>,
}

impl DataRow {
    pub(crate) fn new(
        columns: Arc<[String]>,
        index: Arc<HashMap<String, usize>>,
        mut values: Vec<CellValue>,
    ) -> Self {
        values.resize(columns.len(), CellValue::Empty);
        Self {
            columns,
            values,
            index,
        }
    }

    /// 从 (列名, 文本) 对构造，便于测试和小规模调用
    pub fn from_pairs<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        let (columns, values): (Vec<String>, Vec<CellValue>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), CellValue::Text(v.into())))
            .unzip();
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self::new(columns.into(), Arc::new(index), values)
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.index.get(column).and_then(|&i| self.values.get(i))
    }

    /// 取单元格文本；列不存在或为空时返回 None
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|v| !v.is_empty())
            .and_then(CellValue::as_text)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// 加载后的整张表
#[derive(Debug, Clone)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl DataTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}
