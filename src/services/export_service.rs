//! 导出服务 - 业务能力层
//!
//! 只负责"把文档另存为某种格式"，失败以 [`ExportError`] 返回，是否继续由流程层决定

use std::path::Path;
use tracing::{error, info};

use crate::error::ExportError;
use crate::host::{DocumentHandle, DocumentHost, ExportFormat};

/// 位图输出子目录
pub const RASTER_SUBDIR: &str = "jpg";

/// 确保目录存在
pub async fn ensure_dir(path: &Path) -> Result<(), ExportError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| ExportError::DirectoryFailed {
            path: path.display().to_string(),
            source,
        })
}

/// 另存为指定格式
///
/// # 参数
/// - `doc`: 已打开的文档
/// - `path`: 完整输出路径（含扩展名）
/// - `format`: 导出格式
///
/// # 返回
/// 失败时返回带路径和格式的 [`ExportError`]
pub async fn export<H: DocumentHost>(
    host: &H,
    doc: &DocumentHandle,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ExportError> {
    match host.save_as(doc, path, format).await {
        Ok(()) => {
            info!("✓ 已保存 {}: {}", format, path.display());
            Ok(())
        }
        Err(source) => {
            error!("保存 {} 失败: {}", format, source);
            Err(ExportError::SaveFailed {
                path: path.display().to_string(),
                format: format.to_string(),
                source,
            })
        }
    }
}
