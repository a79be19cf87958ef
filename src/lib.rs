//! # Layer Batch
//!
//! 按表格数据批量填充分层文档模板，并导出图层化源文件和压缩位图
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `host/` - 宿主边界，`DocumentHost` 是唯一的宿主接口
//! - `ScriptingHost` - 通过脚本桥页面驱动真实宿主
//! - `MemoryHost` - 进程内模拟宿主
//! - `infrastructure/` - `JsExecutor`，唯一的 page owner
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文档
//! - `layer_resolver` - 在图层树快照上按名称查找图层
//! - `naming` - 由行数据生成输出文件名
//! - `export_service` - 创建输出目录、按格式导出
//! - `ReportWriter` - 把有问题的行写入报告文件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一行数据"的完整处理流程
//! - `RowCtx` - 上下文封装（行号 + 总行数）
//! - `RowFlow` - 流程编排（open → set text → export → close）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 整批处理器，管理宿主会话和统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod host;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use host::{connect_or_launch, DocumentHandle, DocumentHost, ExportFormat, MemoryHost, ScriptingHost};
pub use infrastructure::JsExecutor;
pub use models::{BatchJob, DataRow, DataTable, LayerNode};
pub use orchestrator::{BatchProcessor, BatchReport};
pub use workflow::{RowCtx, RowFlow, RowResult, RowStatus};
