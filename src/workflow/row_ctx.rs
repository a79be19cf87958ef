//! 行处理上下文
//!
//! 封装"我正在处理第几行"这一信息

use std::fmt::Display;

/// 行处理上下文
#[derive(Debug, Clone, Copy)]
pub struct RowCtx {
    /// 行号（从1开始，不含表头）
    pub row_index: usize,
    /// 总行数（仅用于日志显示）
    pub total_rows: usize,
}

impl RowCtx {
    pub fn new(row_index: usize, total_rows: usize) -> Self {
        Self {
            row_index,
            total_rows,
        }
    }
}

impl Display for RowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[行 {}/{}]", self.row_index, self.total_rows)
    }
}
