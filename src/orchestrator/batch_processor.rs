//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个批处理的入口，负责逐行调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **输入校验**：批处理开始前检查任务输入
//! 2. **数据加载**：一次性读取全部数据行，读取失败立即中止
//! 3. **宿主会话**：整批只建立一次宿主连接，每行只重新打开文档
//! 4. **顺序处理**：按数据源顺序逐行处理，宿主会话不能并发使用
//! 5. **错误隔离**：某一行出错只记录该行，后续行继续
//! 6. **全局统计**：汇总成功 / 降级 / 失败

use serde::Serialize;
use tracing::{error, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::host::{connect_or_launch, DocumentHost};
use crate::models::{load_table, BatchJob, DataTable};
use crate::services::export_service;
use crate::services::ReportWriter;
use crate::utils::logging;
use crate::workflow::{RowCtx, RowFlow, RowResult, RowStatus};

/// 整批处理结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub degraded: usize,
    pub failed: usize,
    pub rows: Vec<RowResult>,
}

impl BatchReport {
    pub fn from_rows(rows: Vec<RowResult>) -> Self {
        let mut report = BatchReport {
            total: rows.len(),
            ..Default::default()
        };
        for row in &rows {
            match row.status() {
                RowStatus::Succeeded => report.succeeded += 1,
                RowStatus::Degraded => report.degraded += 1,
                RowStatus::Failed => report.failed += 1,
            }
        }
        report.rows = rows;
        report
    }

    /// 是否所有行都完全成功
    pub fn is_clean(&self) -> bool {
        self.succeeded == self.total
    }
}

/// 完整批处理：校验 → 读数据 → 连接宿主 → 逐行处理
///
/// 先读数据再连接宿主，数据源有问题时不必启动宿主
///
/// # 参数
/// - `config`: 宿主连接和日志设置
/// - `job`: 本次批处理的全部输入
///
/// # 返回
/// 整批结果；只有任务校验、数据读取、宿主连接失败时返回 `Err`
pub async fn run(config: &Config, job: &BatchJob) -> AppResult<BatchReport> {
    logging::log_startup(job);
    let Some(table) = load_rows(job).await? else {
        return Ok(BatchReport::default());
    };

    let host = connect_or_launch(config).await?;
    BatchProcessor::new(config, host).process_table(job, &table).await
}

/// 校验任务并读取数据；没有数据行时返回 `None`
async fn load_rows(job: &BatchJob) -> AppResult<Option<DataTable>> {
    job.validate()?;
    let table = load_table(&job.data_source).await?;
    if table.is_empty() {
        warn!("⚠️ 数据文件中没有数据行，程序结束");
        return Ok(None);
    }
    Ok(Some(table))
}

/// 批量处理器
pub struct BatchProcessor<H: DocumentHost> {
    host: H,
    report_writer: ReportWriter,
}

impl<H: DocumentHost> BatchProcessor<H> {
    /// 使用已建立的宿主会话创建
    pub fn new(config: &Config, host: H) -> Self {
        Self {
            host,
            report_writer: ReportWriter::with_path(&config.output_log_file),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// 读取数据并处理整批
    pub async fn run(&self, job: &BatchJob) -> AppResult<BatchReport> {
        match load_rows(job).await? {
            Some(table) => self.process_table(job, &table).await,
            None => Ok(BatchReport::default()),
        }
    }

    /// 处理已加载的数据
    pub async fn process_table(&self, job: &BatchJob, table: &DataTable) -> AppResult<BatchReport> {
        logging::log_rows_loaded(table.len(), &table.columns);
        preflight(job, table);

        if let Err(e) = export_service::ensure_dir(&job.output_dir).await {
            warn!("⚠️ {}", e);
        }

        let flow = RowFlow::from_job(job);
        let total = table.len();
        let mut rows = Vec::with_capacity(total);

        for (index, row) in table.rows.iter().enumerate() {
            let ctx = RowCtx::new(index + 1, total);
            logging::log_row_start(&ctx);

            let result = match flow.run(&self.host, row, &ctx).await {
                Ok(result) => result,
                Err(e) => {
                    error!("{} ❌ 处理过程中发生错误: {}", ctx, e);
                    RowResult::failed(ctx.row_index, e)
                }
            };

            logging::log_row_complete(&ctx, &result);
            if let Err(e) = self.report_writer.write(&result) {
                warn!("{} 写入报告失败: {}", ctx, e);
            }
            rows.push(result);
        }

        let report = BatchReport::from_rows(rows);
        logging::print_final_report(&report, self.report_writer.path());
        Ok(report)
    }
}

/// 检查映射和文件名引用的列是否都在表头里；缺失只警告
fn preflight(job: &BatchJob, table: &DataTable) {
    for m in job.mapping.iter() {
        if !table.has_column(&m.column) {
            warn!("⚠️ 映射 '{}' 引用的列 '{}' 不在数据文件中", m.layer, m.column);
        }
    }
    for field in job.filename_fields.iter() {
        if !table.has_column(field) {
            warn!("⚠️ 文件名字段 '{}' 不在数据文件中，所有行都将无法导出", field);
        }
    }
    if !job.template.exists() {
        warn!("⚠️ 本机找不到模板 {}，将直接交给宿主打开", job.template.display());
    }
}
