//! 行处理流程 - 流程层
//!
//! 核心职责：定义"一行数据"的完整处理流程
//!
//! 流程顺序：
//! 1. 打开一份全新的模板文档
//! 2. 逐条映射：查找图层 → 写入文本（失败只跳过该条）
//! 3. 生成文件名
//! 4. 导出图层化源文件 → 导出压缩位图（各自失败互不影响）
//! 5. 无论前面结果如何，关闭文档并丢弃修改

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::error::{AppResult, LayerError};
use crate::host::{DocumentHandle, DocumentHost, ExportFormat};
use crate::models::{BatchJob, ColumnMapping, DataRow, FilenameFields, LayerNode};
use crate::services::export_service::{self, RASTER_SUBDIR};
use crate::services::{derive_filename, layer_resolver};
use crate::utils::logging::truncate_text;
use crate::workflow::row_ctx::RowCtx;
use crate::workflow::row_result::{AppliedMapping, ExportOutcome, RowResult, SkipReason, SkippedMapping};

/// 行处理流程
///
/// - 编排单行的打开 / 替换 / 导出 / 关闭
/// - 不持有宿主连接，由调用方传入
/// - 批处理期间所有输入保持不变
pub struct RowFlow {
    template: PathBuf,
    mapping: ColumnMapping,
    filename_fields: FilenameFields,
    output_dir: PathBuf,
}

impl RowFlow {
    pub fn new(
        template: impl Into<PathBuf>,
        mapping: ColumnMapping,
        filename_fields: FilenameFields,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            template: template.into(),
            mapping,
            filename_fields,
            output_dir: output_dir.into(),
        }
    }

    pub fn from_job(job: &BatchJob) -> Self {
        Self::new(
            job.template.clone(),
            job.mapping.clone(),
            job.filename_fields.clone(),
            job.output_dir.clone(),
        )
    }

    /// 处理一行
    ///
    /// 只有打开文档失败会返回 `Err`；其余问题都记录在 [`RowResult`] 中
    pub async fn run<H: DocumentHost>(&self, host: &H, row: &DataRow, ctx: &RowCtx) -> AppResult<RowResult> {
        // 每行重新打开模板，不复用上一行的文档
        let doc = host.open(&self.template).await.map_err(|e| {
            error!("{} 打开模板失败: {}", ctx, e);
            e
        })?;
        info!("{} 已打开 {}", ctx, doc);

        let mut result = RowResult::new(ctx.row_index);
        self.fill_and_export(host, &doc, row, ctx, &mut result).await;

        // 关闭时总是丢弃修改，模板保持原样
        if let Err(e) = host.close(doc, true).await {
            warn!("{} ⚠️ 关闭文档失败: {}", ctx, e);
            result.close_error = Some(e.to_string());
        }

        Ok(result)
    }

    async fn fill_and_export<H: DocumentHost>(
        &self,
        host: &H,
        doc: &DocumentHandle,
        row: &DataRow,
        ctx: &RowCtx,
        result: &mut RowResult,
    ) {
        self.apply_mapping(host, doc, row, ctx, result).await;

        let filename = match derive_filename(row, &self.filename_fields) {
            Ok(filename) => filename,
            Err(e) => {
                error!("{} ❌ 无法生成文件名: {}", ctx, e);
                result.failure = Some(e.to_string());
                return;
            }
        };
        info!("{} 文件名: {}", ctx, filename);
        result.filename = Some(filename.clone());

        let layered_path = self
            .output_dir
            .join(format!("{}.{}", filename, ExportFormat::LayeredSource.extension()));
        result
            .exports
            .push(export_one(host, doc, layered_path, ExportFormat::LayeredSource).await);

        let raster = ExportFormat::raster();
        let raster_dir = self.output_dir.join(RASTER_SUBDIR);
        let raster_path = raster_dir.join(format!("{}.{}", filename, raster.extension()));
        let outcome = match export_service::ensure_dir(&raster_dir).await {
            Ok(()) => export_one(host, doc, raster_path, raster).await,
            Err(e) => {
                error!("{} {}", ctx, e);
                ExportOutcome {
                    path: raster_path,
                    format: raster,
                    error: Some(e.to_string()),
                }
            }
        };
        result.exports.push(outcome);
    }

    /// 逐条写入映射，单条失败只跳过该条
    async fn apply_mapping<H: DocumentHost>(
        &self,
        host: &H,
        doc: &DocumentHandle,
        row: &DataRow,
        ctx: &RowCtx,
        result: &mut RowResult,
    ) {
        // 每次打开只取一次图层树快照
        let layers: Vec<LayerNode> = match host.layer_tree(doc).await {
            Ok(layers) => layers,
            Err(e) => {
                error!("{} 无法读取图层树: {}", ctx, e);
                for m in self.mapping.iter() {
                    result.skipped.push(SkippedMapping {
                        layer: m.layer.clone(),
                        column: m.column.clone(),
                        reason: SkipReason::TreeUnavailable { error: e.to_string() },
                    });
                }
                return;
            }
        };

        for m in self.mapping.iter() {
            let skip = |reason: SkipReason| SkippedMapping {
                layer: m.layer.clone(),
                column: m.column.clone(),
                reason,
            };

            let layer = match layer_resolver::find_text_layer(&layers, &m.layer) {
                Ok(layer) => layer,
                Err(LayerError::NotFound { .. }) => {
                    warn!("{} ⚠️ 文档中没有图层 '{}'，跳过", ctx, m.layer);
                    result.skipped.push(skip(SkipReason::LayerNotFound));
                    continue;
                }
                Err(LayerError::NotTextCapable { kind, .. }) => {
                    warn!("{} ⚠️ 图层 '{}' 不是文本图层 ({})，跳过", ctx, m.layer, kind);
                    result.skipped.push(skip(SkipReason::NotTextCapable { kind }));
                    continue;
                }
            };

            let Some(value) = row.text(&m.column) else {
                warn!("{} ⚠️ 列 '{}' 没有值，图层 '{}' 保持不变", ctx, m.column, m.layer);
                result.skipped.push(skip(SkipReason::MissingValue));
                continue;
            };

            match host.set_text(doc, layer.id, &value).await {
                Ok(()) => {
                    info!("{} ✓ {} ← {}", ctx, m.layer, truncate_text(&value, 40));
                    result.applied.push(AppliedMapping {
                        layer: m.layer.clone(),
                        column: m.column.clone(),
                        value,
                    });
                }
                Err(e) => {
                    error!("{} 写入图层 '{}' 失败 (值 '{}'): {}", ctx, m.layer, truncate_text(&value, 40), e);
                    result.skipped.push(skip(SkipReason::SetTextFailed { error: e.to_string() }));
                }
            }
        }
    }
}

async fn export_one<H: DocumentHost>(
    host: &H,
    doc: &DocumentHandle,
    path: PathBuf,
    format: ExportFormat,
) -> ExportOutcome {
    let error = export_service::export(host, doc, &path, format)
        .await
        .err()
        .map(|e| e.to_string());
    ExportOutcome { path, format, error }
}
