use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use layer_batch::config::Config;
use layer_batch::host::{connect_or_launch, DocumentHost};
use layer_batch::models::{load_job, read_columns};
use layer_batch::orchestrator;
use layer_batch::services::layer_resolver;
use layer_batch::utils::logging;

/// 按表格数据批量生成分层文档
#[derive(Debug, Parser)]
#[command(name = "layer-batch", version, about)]
struct Cli {
    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 执行一个批处理任务
    Run {
        /// 任务描述文件（TOML）
        job: PathBuf,
        /// 把整批结果写成 JSON
        #[arg(long, value_name = "PATH")]
        report_json: Option<PathBuf>,
    },
    /// 列出数据文件的列名
    Columns {
        data_source: PathBuf,
    },
    /// 打印模板的图层树
    Layers {
        template: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env()?;

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    match cli.command {
        Command::Run { job, report_json } => run(&config, &job, report_json).await,
        Command::Columns { data_source } => {
            for (i, column) in read_columns(&data_source).await?.iter().enumerate() {
                println!("{:>3}  {}", i + 1, column);
            }
            Ok(())
        }
        Command::Layers { template } => print_layers(&config, &template).await,
    }
}

async fn run(config: &Config, job_path: &Path, report_json: Option<PathBuf>) -> Result<()> {
    logging::init_log_file(&config.output_log_file)?;

    let job = load_job(job_path).await?;
    let report = orchestrator::run(config, &job).await?;

    if let Some(path) = report_json {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("无法写入报告: {}", path.display()))?;
    }

    if report.failed > 0 {
        anyhow::bail!("{} 行处理失败", report.failed);
    }
    Ok(())
}

async fn print_layers(config: &Config, template: &Path) -> Result<()> {
    let host = connect_or_launch(config).await?;
    let doc = host.open(template).await?;

    let tree = host.layer_tree(&doc).await;
    // 只读查看，关闭时丢弃
    host.close(doc, true).await?;

    let layers = tree?;
    layer_resolver::walk(&layers, |node, depth| {
        match &node.error {
            Some(reason) => println!("{}{} [错误: {}]", "  ".repeat(depth), node.display_name(), reason),
            None => println!("{}{} [{}] {}", "  ".repeat(depth), node.display_name(), node.kind, node.id),
        }
        true
    });
    Ok(())
}
