use crate::error::JobError;
use crate::models::job::BatchJob;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载批处理任务
///
/// 任务文件中的相对路径按任务文件所在目录解析
///
/// # 参数
/// - `job_file_path`: 任务文件路径
///
/// # 返回
/// 已校验的批处理任务
pub async fn load_job(job_file_path: &Path) -> Result<BatchJob> {
    let content = fs::read_to_string(job_file_path)
        .await
        .with_context(|| format!("无法读取任务文件: {}", job_file_path.display()))?;

    let mut job = parse_job(&content, job_file_path)?;

    if let Some(base) = job_file_path.parent() {
        job.template = resolve(base, &job.template);
        job.data_source = resolve(base, &job.data_source);
        job.output_dir = resolve(base, &job.output_dir);
    }

    job.validate()?;
    Ok(job)
}

fn parse_job(content: &str, job_file_path: &Path) -> Result<BatchJob, JobError> {
    toml::from_str(content).map_err(|source| JobError::ParseFailed {
        path: job_file_path.display().to_string(),
        source,
    })
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
