//! 单行处理结果

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::host::ExportFormat;

/// 已写入的映射
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedMapping {
    pub layer: String,
    pub column: String,
    pub value: String,
}

/// 映射被跳过的原因
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    /// 列不存在或单元格为空
    MissingValue,
    LayerNotFound,
    NotTextCapable { kind: String },
    SetTextFailed { error: String },
    /// 无法获取图层树
    TreeUnavailable { error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingValue => write!(f, "数据缺失"),
            SkipReason::LayerNotFound => write!(f, "未找到图层"),
            SkipReason::NotTextCapable { kind } => write!(f, "不是文本图层 ({})", kind),
            SkipReason::SetTextFailed { error } => write!(f, "写入失败: {}", error),
            SkipReason::TreeUnavailable { error } => write!(f, "无法读取图层树: {}", error),
        }
    }
}

/// 被跳过的映射
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedMapping {
    pub layer: String,
    pub column: String,
    pub reason: SkipReason,
}

/// 单个导出产物的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub error: Option<String>,
}

impl ExportOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// 行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// 全部映射写入、全部产物导出
    Succeeded,
    /// 有产出，但存在跳过的映射或失败的导出
    Degraded,
    /// 没有任何产出
    Failed,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Succeeded => write!(f, "成功"),
            RowStatus::Degraded => write!(f, "降级"),
            RowStatus::Failed => write!(f, "失败"),
        }
    }
}

/// 单行处理结果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowResult {
    pub row_index: usize,
    pub filename: Option<String>,
    pub applied: Vec<AppliedMapping>,
    pub skipped: Vec<SkippedMapping>,
    pub exports: Vec<ExportOutcome>,
    pub close_error: Option<String>,
    /// 整行失败的原因
    pub failure: Option<String>,
}

impl RowResult {
    pub fn new(row_index: usize) -> Self {
        Self {
            row_index,
            ..Default::default()
        }
    }

    pub fn failed(row_index: usize, reason: impl ToString) -> Self {
        Self {
            row_index,
            failure: Some(reason.to_string()),
            ..Default::default()
        }
    }

    pub fn status(&self) -> RowStatus {
        let exported = self.exports.iter().filter(|e| e.succeeded()).count();
        if self.failure.is_some() || exported == 0 {
            RowStatus::Failed
        } else if !self.skipped.is_empty() || exported < self.exports.len() || self.close_error.is_some() {
            RowStatus::Degraded
        } else {
            RowStatus::Succeeded
        }
    }

    /// 所有问题的可读描述
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if let Some(failure) = &self.failure {
            issues.push(failure.clone());
        }
        for skip in &self.skipped {
            issues.push(format!("图层 '{}' ← 列 '{}': {}", skip.layer, skip.column, skip.reason));
        }
        for export in self.exports.iter().filter(|e| !e.succeeded()) {
            issues.push(format!(
                "导出 {} 失败: {}",
                export.path.display(),
                export.error.as_deref().unwrap_or_default()
            ));
        }
        if let Some(close_error) = &self.close_error {
            issues.push(format!("关闭文档失败: {}", close_error));
        }
        if issues.is_empty() && self.exports.is_empty() {
            issues.push("没有导出任何文件".to_string());
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(path: &str, error: Option<&str>) -> ExportOutcome {
        ExportOutcome {
            path: path.into(),
            format: ExportFormat::LayeredSource,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn status_follows_outputs() {
        let mut result = RowResult::new(1);
        assert_eq!(result.status(), RowStatus::Failed);

        result.exports.push(export("a.psd", None));
        result.exports.push(export("jpg/a.jpg", None));
        assert_eq!(result.status(), RowStatus::Succeeded);

        result.close_error = Some("timeout".to_string());
        assert_eq!(result.status(), RowStatus::Degraded);
    }

    #[test]
    fn partial_export_is_degraded() {
        let mut result = RowResult::new(2);
        result.exports.push(export("a.psd", Some("disk full")));
        result.exports.push(export("jpg/a.jpg", None));
        assert_eq!(result.status(), RowStatus::Degraded);
        assert_eq!(result.issues().len(), 1);

        result.exports[1].error = Some("disk full".to_string());
        assert_eq!(result.status(), RowStatus::Failed);
    }

    #[test]
    fn skipped_mapping_is_degraded() {
        let mut result = RowResult::new(3);
        result.exports.push(export("a.psd", None));
        result.skipped.push(SkippedMapping {
            layer: "Name".to_string(),
            column: "customer_name".to_string(),
            reason: SkipReason::LayerNotFound,
        });
        assert_eq!(result.status(), RowStatus::Degraded);
        assert!(result.issues()[0].contains("未找到图层"));
    }
}
