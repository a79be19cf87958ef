use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{HostError, HostResult};
use crate::host::{DocumentHost, ScriptingHost};
use crate::infrastructure::JsExecutor;

/// 连接到运行中的宿主，失败时启动新实例并重试，最后切换到非交互模式
pub async fn connect_or_launch(config: &Config) -> HostResult<ScriptingHost> {
    let endpoint = config.host_endpoint();

    let host = match attach(&endpoint, &config.bridge_page_title).await {
        Ok(host) => {
            info!("✓ 已连接到运行中的宿主: {}", endpoint);
            host
        }
        Err(e) => {
            warn!("⚠️ 未能连接到运行中的宿主: {}", e);
            let Some(executable) = config.host_executable.as_deref() else {
                return Err(HostError::connection(
                    &endpoint,
                    format!("{}（未配置 HOST_EXECUTABLE，无法启动新实例）", e),
                ));
            };
            launch(executable, &endpoint)?;
            wait_for_bridge(config, &endpoint).await?
        }
    };

    let version = host
        .configure_noninteractive()
        .await
        .map_err(|e| HostError::connection(&endpoint, format!("无法切换到非交互模式: {}", e)))?;
    info!("✓ 宿主已就绪 (版本 {}), 对话框已关闭", version);

    Ok(host)
}

/// 连接脚本桥并找到标题匹配的页面
async fn attach(endpoint: &str, bridge_title: &str) -> HostResult<ScriptingHost> {
    info!("正在连接到宿主脚本桥: {}", endpoint);

    let (browser, mut handler) = Browser::connect(endpoint).await.map_err(|e| {
        error!("连接脚本桥失败: {}", e);
        HostError::connection(endpoint, e)
    })?;
    debug!("脚本桥连接成功");

    // 在后台处理 CDP 事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待页面状态同步
    sleep(Duration::from_millis(300)).await;

    let page = find_bridge_page(&browser, bridge_title)
        .await
        .map_err(|reason| HostError::connection(endpoint, reason))?;

    let executor = JsExecutor::new(page);
    if !executor.bridge_available().await? {
        return Err(HostError::connection(
            endpoint,
            format!("页面 '{}' 没有暴露 evalScript", bridge_title),
        ));
    }

    Ok(ScriptingHost::new(browser, executor))
}

async fn find_bridge_page(browser: &Browser, bridge_title: &str) -> Result<Page, String> {
    let pages = browser
        .pages()
        .await
        .map_err(|e| format!("无法列出页面: {}", e))?;
    debug!("获取到 {} 个页面", pages.len());

    for p in pages.iter() {
        if let Ok(Some(title)) = p.get_title().await {
            debug!("检查页面标题: {}", title);
            if title.contains(bridge_title) {
                info!("✓ 找到脚本桥页面: {}", title);
                return Ok(p.clone());
            }
        }
    }

    Err(format!("没有标题包含 '{}' 的脚本桥页面", bridge_title))
}

fn launch(executable: &str, endpoint: &str) -> HostResult<()> {
    info!("🚀 启动宿主: {}", executable);
    tokio::process::Command::new(executable)
        .kill_on_drop(false)
        .spawn()
        .map(|_| ())
        .map_err(|e| {
            error!("启动宿主失败: {}", e);
            HostError::connection(endpoint, format!("无法启动 {}: {}", executable, e))
        })
}

async fn wait_for_bridge(config: &Config, endpoint: &str) -> HostResult<ScriptingHost> {
    let interval = Duration::from_millis(config.launch_retry_interval_ms);
    let mut last_error = None;

    for attempt in 1..=config.launch_retries.max(1) {
        sleep(interval).await;
        match attach(endpoint, &config.bridge_page_title).await {
            Ok(host) => {
                info!("✓ 宿主已启动并连接 (第 {} 次尝试)", attempt);
                return Ok(host);
            }
            Err(e) => {
                debug!("第 {}/{} 次连接失败: {}", attempt, config.launch_retries, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| HostError::connection(endpoint, "宿主启动后未能连接")))
}
