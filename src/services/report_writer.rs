//! 报告写入服务 - 业务能力层
//!
//! 只负责把降级 / 失败的行追加到运行日志文件，不关心流程

use anyhow::Result;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::workflow::{RowResult, RowStatus};

/// 报告写入服务
pub struct ReportWriter {
    report_file_path: String,
}

impl ReportWriter {
    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            report_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.report_file_path
    }

    /// 追加一行的处理结果；完全成功的行不写入
    ///
    /// # 参数
    /// - `result`: 单行处理结果
    pub fn write(&self, result: &RowResult) -> Result<()> {
        let status = result.status();
        if status == RowStatus::Succeeded {
            return Ok(());
        }

        debug!(
            "写入报告: 行 {} | 状态 {:?} | 问题数 {}",
            result.row_index,
            status,
            result.issues().len()
        );

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_file_path)?;

        let line = format!(
            "行 {} | {} | 文件名: {} | {}\n",
            result.row_index,
            status,
            result.filename.as_deref().unwrap_or("-"),
            result.issues().join("; ")
        );
        file.write_all(line.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_problem_rows_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        let writer = ReportWriter::with_path(path.to_string_lossy());

        let mut ok = RowResult::new(1);
        ok.filename = Some("42".to_string());
        ok.exports.push(crate::workflow::ExportOutcome {
            path: "42.psd".into(),
            format: crate::host::ExportFormat::LayeredSource,
            error: None,
        });
        writer.write(&ok).unwrap();
        assert!(!path.exists());

        writer.write(&RowResult::failed(2, "宿主拒绝打开")).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("行 2 | 失败"));
        assert!(content.contains("宿主拒绝打开"));
    }
}
