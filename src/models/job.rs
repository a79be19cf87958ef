//! 批处理任务
//!
//! 前端（命令行 + TOML 任务文件）一次性构造的输入，批处理开始后不再变化

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::JobError;

/// 一条图层映射：图层名 → 列名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerMapping {
    pub layer: String,
    pub column: String,
}

/// 图层到列的映射，保持声明顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LayerMapping>", into = "Vec<LayerMapping>")]
pub struct ColumnMapping {
    entries: Vec<LayerMapping>,
}

impl ColumnMapping {
    /// 构造映射；忽略首尾空白，拒绝空名称和重复图层
    pub fn new<L, C>(pairs: impl IntoIterator<Item = (L, C)>) -> Result<Self, JobError>
    where
        L: Into<String>,
        C: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        for (layer, column) in pairs {
            let layer = layer.into().trim().to_string();
            let column = column.into().trim().to_string();
            if layer.is_empty() {
                return Err(JobError::EmptyField {
                    field: "mapping.layer".to_string(),
                });
            }
            if column.is_empty() {
                return Err(JobError::EmptyField {
                    field: format!("mapping.column ({})", layer),
                });
            }
            if !seen.insert(layer.clone()) {
                return Err(JobError::DuplicateLayer { layer });
            }
            entries.push(LayerMapping { layer, column });
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayerMapping> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<LayerMapping>> for ColumnMapping {
    type Error = JobError;

    fn try_from(entries: Vec<LayerMapping>) -> Result<Self, Self::Error> {
        ColumnMapping::new(entries.into_iter().map(|m| (m.layer, m.column)))
    }
}

impl From<ColumnMapping> for Vec<LayerMapping> {
    fn from(mapping: ColumnMapping) -> Self {
        mapping.entries
    }
}

/// 参与生成文件名的列，顺序即文件名中的顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilenameFields(Vec<String>);

impl FilenameFields {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Result<Self, JobError> {
        let fields: Vec<String> = fields.into_iter().map(|f| f.into().trim().to_string()).collect();
        if fields.iter().any(String::is_empty) {
            return Err(JobError::EmptyField {
                field: "filename_fields".to_string(),
            });
        }
        Ok(Self(fields))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 一次批处理的全部输入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchJob {
    /// 模板文档路径
    pub template: PathBuf,
    /// 数据文件路径（csv / tsv / xlsx / xls / ods）
    pub data_source: PathBuf,
    /// 输出目录
    pub output_dir: PathBuf,
    pub filename_fields: FilenameFields,
    pub mapping: ColumnMapping,
}

impl BatchJob {
    /// 开始批处理前检查所有输入均非空
    pub fn validate(&self) -> Result<(), JobError> {
        let empty = |field: &str| JobError::EmptyField {
            field: field.to_string(),
        };
        if self.template.as_os_str().is_empty() {
            return Err(empty("template"));
        }
        if self.data_source.as_os_str().is_empty() {
            return Err(empty("data_source"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(empty("output_dir"));
        }
        if self.mapping.is_empty() {
            return Err(empty("mapping"));
        }
        if self.filename_fields.is_empty() {
            return Err(empty("filename_fields"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_keeps_order_and_trims() {
        let mapping = ColumnMapping::new([(" Name ", "customer_name"), ("Title", " title ")]).unwrap();
        let layers: Vec<_> = mapping.iter().map(|m| m.layer.as_str()).collect();
        assert_eq!(layers, ["Name", "Title"]);
        assert_eq!(mapping.iter().nth(1).unwrap().column, "title");
    }

    #[test]
    fn duplicate_layer_is_rejected() {
        let err = ColumnMapping::new([("Name", "a"), ("Name", "b")]).unwrap_err();
        assert!(matches!(err, JobError::DuplicateLayer { layer } if layer == "Name"));
    }

    #[test]
    fn empty_column_is_rejected() {
        assert!(ColumnMapping::new([("Name", "  ")]).is_err());
        assert!(FilenameFields::new(["id", ""]).is_err());
    }

    #[test]
    fn job_without_filename_fields_is_invalid() {
        let job = BatchJob {
            template: "t.psd".into(),
            data_source: "rows.csv".into(),
            output_dir: "out".into(),
            filename_fields: FilenameFields::default(),
            mapping: ColumnMapping::new([("Name", "name")]).unwrap(),
        };
        assert!(matches!(
            job.validate(),
            Err(JobError::EmptyField { field }) if field == "filename_fields"
        ));
    }
}
