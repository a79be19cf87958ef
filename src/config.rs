use std::str::FromStr;

use crate::error::ConfigError;

/// 程序配置
///
/// 只包含与宿主连接、日志相关的设置；每次批处理的输入见 [`crate::models::BatchJob`]
#[derive(Clone, Debug)]
pub struct Config {
    /// 宿主脚本桥的调试端口
    pub host_debug_port: u16,
    /// 脚本桥页面标题（用于在多个页面中定位）
    pub bridge_page_title: String,
    /// 宿主可执行文件路径，未设置时只尝试连接已运行的实例
    pub host_executable: Option<String>,
    /// 启动宿主后重试连接的次数
    pub launch_retries: u32,
    /// 每次重试之间的等待时间（毫秒）
    pub launch_retry_interval_ms: u64,
    /// 运行日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host_debug_port: 8088,
            bridge_page_title: "Layer Batch Bridge".to_string(),
            host_executable: None,
            launch_retries: 30,
            launch_retry_interval_ms: 2000,
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        Ok(Self {
            host_debug_port: parse_env("HOST_DEBUG_PORT", "u16")?.unwrap_or(default.host_debug_port),
            bridge_page_title: std::env::var("BRIDGE_PAGE_TITLE").unwrap_or(default.bridge_page_title),
            host_executable: std::env::var("HOST_EXECUTABLE").ok().filter(|v| !v.trim().is_empty()),
            launch_retries: parse_env("LAUNCH_RETRIES", "u32")?.unwrap_or(default.launch_retries),
            launch_retry_interval_ms: parse_env("LAUNCH_RETRY_INTERVAL_MS", "u64")?.unwrap_or(default.launch_retry_interval_ms),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            verbose_logging: parse_env("VERBOSE_LOGGING", "bool")?.unwrap_or(default.verbose_logging),
        })
    }

    /// 脚本桥的 HTTP 调试地址
    pub fn host_endpoint(&self) -> String {
        format!("http://localhost:{}", self.host_debug_port)
    }
}

fn parse_env<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
