use layer_batch::config::Config;
use layer_batch::error::AppError;
use layer_batch::host::{connect_or_launch, DocumentHost, HostEvent, MemoryHost};
use layer_batch::models::{load_job, BatchJob, ColumnMapping, FilenameFields, LayerNode};
use layer_batch::orchestrator::{self, BatchProcessor};
use layer_batch::services::layer_resolver;
use layer_batch::utils::logging;
use layer_batch::workflow::{RowStatus, SkipReason};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn template_layers() -> Vec<LayerNode> {
    vec![
        LayerNode::group(
            1,
            "Header",
            vec![LayerNode::text(2, "Name", "Customer"), LayerNode::text(3, "City", "City")],
        ),
        LayerNode::other(4, "Logo", "pixel"),
    ]
}

struct Fixture {
    dir: TempDir,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("创建临时目录失败");
        let config = Config {
            output_log_file: dir.path().join("output.txt").display().to_string(),
            ..Config::default()
        };
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn write_csv(&self, content: &str) -> PathBuf {
        let path = self.path("rows.csv");
        std::fs::write(&path, content).expect("写入 CSV 失败");
        path
    }

    fn host(&self) -> MemoryHost {
        MemoryHost::new().with_template(self.path("template.psd"), template_layers())
    }

    fn job(&self, data_source: PathBuf, mapping: &[(&str, &str)], fields: &[&str]) -> BatchJob {
        BatchJob {
            template: self.path("template.psd"),
            data_source,
            output_dir: self.path("out"),
            filename_fields: FilenameFields::new(fields.iter().copied()).unwrap(),
            mapping: ColumnMapping::new(mapping.iter().copied()).unwrap(),
        }
    }
}

async fn reopen_text(host: &MemoryHost, path: &Path, layer: &str) -> Option<String> {
    let doc = host.open(path).await.expect("重新打开导出文件失败");
    let tree = host.layer_tree(&doc).await.unwrap();
    host.close(doc, true).await.unwrap();
    layer_resolver::find(&tree, layer).and_then(|n| n.text.clone())
}

#[tokio::test]
async fn test_single_row_produces_both_artifacts() {
    let fx = Fixture::new();
    let csv = fx.write_csv("customer_name,order_id\nAcme,42\n");
    let job = fx.job(csv, &[("Name", "customer_name")], &["order_id"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());

    let report = processor.run(&job).await.unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.succeeded, 1);
    assert!(report.is_clean());

    let layered = fx.path("out").join("42.psd");
    let raster = fx.path("out").join("jpg").join("42.jpg");
    assert!(layered.exists());
    assert!(raster.exists());

    let host = processor.host();
    assert_eq!(reopen_text(host, &layered, "Name").await.as_deref(), Some("Acme"));

    // Logo 不在映射中，保持原样
    let doc = host.open(&layered).await.unwrap();
    let tree = host.layer_tree(&doc).await.unwrap();
    host.close(doc, true).await.unwrap();
    assert_eq!(layer_resolver::find(&tree, "Logo"), Some(&LayerNode::other(4, "Logo", "pixel")));

    let raster_content = std::fs::read_to_string(raster).unwrap();
    assert!(raster_content.starts_with("quality=12"));
    assert!(raster_content.contains("Name: Acme"));
}

#[tokio::test]
async fn test_missing_layer_does_not_abort_row_or_batch() {
    let fx = Fixture::new();
    let csv = fx.write_csv("customer_name,city,order_id\nAcme,Lyon,1\nGlobex,Oslo,2\n");
    let job = fx.job(
        csv,
        &[("Subtitle", "customer_name"), ("Name", "customer_name"), ("City", "city")],
        &["order_id"],
    );
    let processor = BatchProcessor::new(&fx.config, fx.host());

    let report = processor.run(&job).await.unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.degraded, 2);
    for row in &report.rows {
        assert_eq!(row.applied.len(), 2);
        assert_eq!(row.skipped.len(), 1);
        assert_eq!(row.skipped[0].reason, SkipReason::LayerNotFound);
    }

    let host = processor.host();
    let second = fx.path("out").join("2.psd");
    assert_eq!(reopen_text(host, &second, "City").await.as_deref(), Some("Oslo"));

    // 报告文件记录降级行
    let log = std::fs::read_to_string(&fx.config.output_log_file).unwrap();
    assert!(log.contains("Subtitle"));
}

#[tokio::test]
async fn test_one_malformed_row_among_many() {
    let fx = Fixture::new();
    let csv = fx.write_csv("customer_name,order_id\nAcme,1\nInitech,\nGlobex,3\nUmbrella,4\n");
    let job = fx.job(csv, &[("Name", "customer_name")], &["order_id"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());

    let report = processor.run(&job).await.unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.rows[1].status(), RowStatus::Failed);
    assert_eq!(report.rows[1].row_index, 2);
    assert!(fx.path("out").join("4.psd").exists());
}

#[tokio::test]
async fn test_empty_mapped_cell_degrades_only_that_row() {
    let fx = Fixture::new();
    let csv = fx.write_csv("customer_name,order_id\nAcme,1\n,2\nGlobex,3\n");
    let job = fx.job(csv, &[("Name", "customer_name")], &["order_id"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());

    let report = processor.run(&job).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.degraded, 1);
    assert_eq!(report.failed, 0);

    let row = &report.rows[1];
    assert_eq!(row.status(), RowStatus::Degraded);
    assert_eq!(row.skipped.len(), 1);
    assert_eq!(row.skipped[0].reason, SkipReason::MissingValue);

    // 空值不写入，图层保留模板内容
    let host = processor.host();
    let layered = fx.path("out").join("2.psd");
    assert_eq!(reopen_text(host, &layered, "Name").await.as_deref(), Some("Customer"));
}

#[tokio::test]
async fn test_filename_fields_follow_configured_order() {
    let fx = Fixture::new();
    let csv = fx.write_csv("a,b\nX,Y\n");

    let forward = fx.job(csv.clone(), &[("Name", "a")], &["a", "b"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());
    processor.run(&forward).await.unwrap();
    assert!(fx.path("out").join("X_Y.psd").exists());

    let reversed = fx.job(csv, &[("Name", "a")], &["b", "a"]);
    processor.run(&reversed).await.unwrap();
    assert!(fx.path("out").join("Y_X.psd").exists());
    assert!(fx.path("out").join("jpg").join("Y_X.jpg").exists());
}

#[tokio::test]
async fn test_template_stays_pristine() {
    let fx = Fixture::new();
    let csv = fx.write_csv("customer_name,order_id\nAcme,1\nGlobex,2\n");
    let job = fx.job(csv, &[("Name", "customer_name")], &["order_id"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());

    processor.run(&job).await.unwrap();

    let host = processor.host();
    assert_eq!(host.open_documents(), 0);
    assert_eq!(host.template(&fx.path("template.psd")), Some(template_layers()));

    // 每行各自打开一次、关闭一次且丢弃修改
    let events = host.events();
    let opened = events.iter().filter(|e| matches!(e, HostEvent::Opened { .. })).count();
    let closed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            HostEvent::Closed { discard_changes, .. } => Some(*discard_changes),
            _ => None,
        })
        .collect();
    assert_eq!(opened, 2);
    assert_eq!(closed, vec![true, true]);
}

#[tokio::test]
async fn test_unreadable_data_source_is_fatal() {
    let fx = Fixture::new();
    let job = fx.job(fx.path("missing.csv"), &[("Name", "customer_name")], &["order_id"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());

    let err = processor.run(&job).await.unwrap_err();

    assert!(matches!(err, AppError::DataSource(_)));
    assert!(err.is_fatal());
    assert!(processor.host().events().is_empty());
}

#[tokio::test]
async fn test_empty_data_source_yields_empty_report() {
    let fx = Fixture::new();
    let csv = fx.write_csv("customer_name,order_id\n");
    let job = fx.job(csv, &[("Name", "customer_name")], &["order_id"]);
    let processor = BatchProcessor::new(&fx.config, fx.host());

    let report = processor.run(&job).await.unwrap();

    assert_eq!(report.total, 0);
    assert!(processor.host().events().is_empty());
}

#[tokio::test]
async fn test_job_file_drives_batch() {
    let fx = Fixture::new();
    fx.write_csv("customer_name,order_id\nAcme,42\n");
    let job_path = fx.path("job.toml");
    std::fs::write(
        &job_path,
        r#"
template = "template.psd"
data_source = "rows.csv"
output_dir = "out"
filename_fields = ["order_id"]

[[mapping]]
layer = "Name"
column = "customer_name"
"#,
    )
    .unwrap();

    let job = load_job(&job_path).await.unwrap();
    assert_eq!(job.template, fx.path("template.psd"));

    let processor = BatchProcessor::new(&fx.config, fx.host());
    let report = processor.run(&job).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert!(fx.path("out").join("42.psd").exists());
}

#[tokio::test]
async fn test_run_stops_before_connecting_when_data_is_unusable() {
    let fx = Fixture::new();

    // 数据源读不了：直接报错，不会去连接宿主
    let missing = fx.job(fx.path("missing.csv"), &[("Name", "customer_name")], &["order_id"]);
    let err = orchestrator::run(&fx.config, &missing).await.unwrap_err();
    assert!(matches!(err, AppError::DataSource(_)));

    // 只有表头：空报告
    let csv = fx.write_csv("customer_name,order_id\n");
    let empty = fx.job(csv, &[("Name", "customer_name")], &["order_id"]);
    let report = orchestrator::run(&fx.config, &empty).await.unwrap();
    assert_eq!(report.total, 0);
}

#[tokio::test]
#[ignore] // 需要运行中的宿主和脚本桥页面：cargo test -- --ignored
async fn test_live_host_layer_tree() {
    logging::init(true);

    let config = Config::from_env().expect("环境变量配置错误");
    let template = std::env::var("LIVE_TEMPLATE").expect("请设置 LIVE_TEMPLATE");

    let host = connect_or_launch(&config).await.expect("连接宿主失败");
    let doc = host.open(Path::new(&template)).await.expect("打开模板失败");
    let tree = host.layer_tree(&doc).await.expect("读取图层树失败");
    host.close(doc, true).await.expect("关闭文档失败");

    assert!(!tree.is_empty());
}
