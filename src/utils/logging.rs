/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use anyhow::Result;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::BatchJob;
use crate::orchestrator::BatchReport;
use crate::workflow::{RowCtx, RowResult};

/// 初始化 tracing 输出
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // 重复初始化（例如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量生成日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录批处理启动信息
pub fn log_startup(job: &BatchJob) {
    info!("{}", "=".repeat(60));
    info!("🚀 批量生成启动");
    info!("📄 模板: {}", job.template.display());
    info!("📊 数据: {}", job.data_source.display());
    info!("📁 输出: {}", job.output_dir.display());
    info!("🔗 映射: {} 条", job.mapping.len());
    info!("{}", "=".repeat(60));
}

/// 记录数据加载信息
pub fn log_rows_loaded(total: usize, columns: &[String]) {
    info!("✓ 找到 {} 行待处理数据", total);
    info!("📋 列: {}", columns.join(", "));
    info!("💡 逐行处理，每行重新打开模板\n");
}

/// 记录行开始信息
pub fn log_row_start(ctx: &RowCtx) {
    info!("\n{} {}", ctx, "─".repeat(30));
}

/// 记录行完成信息
pub fn log_row_complete(ctx: &RowCtx, result: &RowResult) {
    info!(
        "{} {} (写入 {}, 跳过 {}, 导出 {}/{})",
        ctx,
        result.status(),
        result.applied.len(),
        result.skipped.len(),
        result.exports.iter().filter(|e| e.succeeded()).count(),
        result.exports.len()
    );
}

/// 打印最终统计信息
pub fn print_final_report(report: &BatchReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.succeeded, report.total);
    info!("⚠️ 降级: {}", report.degraded);
    info!("❌ 失败: {}", report.failed);
    for row in report.rows.iter().filter(|r| r.status() != crate::workflow::RowStatus::Succeeded) {
        info!("  行 {} [{}]: {}", row.row_index, row.status(), row.issues().join("; "));
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
