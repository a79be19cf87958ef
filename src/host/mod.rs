//! 宿主程序边界
//!
//! 文档编辑宿主是外部协作方，这里只定义一个窄接口 [`DocumentHost`]：
//!
//! - [`ScriptingHost`] 通过脚本桥页面（CDP）驱动真实宿主
//! - [`MemoryHost`] 在进程内模拟宿主，供测试和往返校验使用
//!
//! 每个调用都可能独立失败，失败一律以 [`HostError`](crate::error::HostError) 返回，
//! 是否继续由调用方决定。

pub mod connection;
pub mod memory;
pub mod scripting;

pub use connection::connect_or_launch;
pub use memory::{HostEvent, MemoryHost};
pub use scripting::ScriptingHost;

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::HostResult;
use crate::models::{LayerId, LayerNode};

/// 图层化源文件的扩展名
pub const LAYERED_EXTENSION: &str = "psd";
/// 压缩位图的扩展名
pub const RASTER_EXTENSION: &str = "jpg";
/// 宿主 JPEG 质量刻度 0–12 的最大值
pub const MAX_RASTER_QUALITY: u8 = 12;

/// 已打开文档的句柄
///
/// 不可复制；关闭时按值消耗，保证同一文档不会被跨行复用
#[derive(Debug, PartialEq, Eq)]
pub struct DocumentHandle {
    pub id: u64,
    pub path: PathBuf,
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "文档#{} ({})", self.id, self.path.display())
    }
}

/// 导出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "format")]
pub enum ExportFormat {
    /// 保留图层的源格式
    LayeredSource,
    /// 压缩位图
    CompressedRaster { quality: u8 },
}

impl ExportFormat {
    /// 最高质量的压缩位图
    pub fn raster() -> Self {
        ExportFormat::CompressedRaster {
            quality: MAX_RASTER_QUALITY,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::LayeredSource => LAYERED_EXTENSION,
            ExportFormat::CompressedRaster { .. } => RASTER_EXTENSION,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::LayeredSource => write!(f, "{}", LAYERED_EXTENSION.to_uppercase()),
            ExportFormat::CompressedRaster { quality } => {
                write!(f, "{} (质量 {})", RASTER_EXTENSION.to_uppercase(), quality)
            }
        }
    }
}

/// 文档宿主能力
///
/// 只在单线程顺序场景下使用，因此不要求 `Send`
#[allow(async_fn_in_trait)]
pub trait DocumentHost {
    /// 关闭所有交互式对话框，返回宿主版本
    async fn configure_noninteractive(&self) -> HostResult<String>;

    /// 打开文档，每次调用都返回一个独立的新句柄
    async fn open(&self, path: &Path) -> HostResult<DocumentHandle>;

    /// 获取文档图层树的完整快照
    async fn layer_tree(&self, doc: &DocumentHandle) -> HostResult<Vec<LayerNode>>;

    /// 设置文本图层内容
    async fn set_text(&self, doc: &DocumentHandle, layer: LayerId, text: &str) -> HostResult<()>;

    /// 另存为（以副本方式保存，文档本身仍指向模板）
    async fn save_as(&self, doc: &DocumentHandle, path: &Path, format: ExportFormat) -> HostResult<()>;

    /// 关闭文档
    async fn close(&self, doc: DocumentHandle, discard_changes: bool) -> HostResult<()>;
}
