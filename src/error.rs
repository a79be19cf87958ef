use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 数据源相关错误（致命，整批中止）
    #[error("数据源错误: {0}")]
    DataSource(#[from] DataSourceError),
    /// 宿主程序相关错误
    #[error("宿主错误: {0}")]
    Host(#[from] HostError),
    /// 图层相关错误（单条映射级别，可恢复）
    #[error("图层错误: {0}")]
    Layer(#[from] LayerError),
    /// 导出错误（单个产物级别，可恢复）
    #[error("导出错误: {0}")]
    Export(#[from] ExportError),
    /// 任务文件错误
    #[error("任务错误: {0}")]
    Job(#[from] JobError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 行级错误
    #[error("行错误: {0}")]
    Row(#[from] RowError),
}

impl AppError {
    /// 是否会中止整个批次
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::DataSource(_)
                | AppError::Host(HostError::Connection { .. })
                | AppError::Job(_)
                | AppError::Config(_)
        )
    }
}

/// 数据源错误
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// 读取文件失败
    #[error("读取数据文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 解析失败
    #[error("解析数据文件失败 ({path}): {reason}")]
    ParseFailed { path: String, reason: String },
    /// 不支持的文件类型
    #[error("不支持的数据文件类型: {path}")]
    UnsupportedFormat { path: String },
    /// 缺少表头
    #[error("数据文件没有表头: {path}")]
    MissingHeader { path: String },
}

/// 宿主程序错误
#[derive(Debug, Error)]
pub enum HostError {
    /// 无法连接或启动宿主（致命）
    #[error("无法连接到宿主程序 ({endpoint}): {reason}")]
    Connection { endpoint: String, reason: String },
    /// 打开 / 关闭 / 修改文档失败
    #[error("宿主 IO 失败 ({operation}): {reason}")]
    Io { operation: String, reason: String },
    /// 宿主脚本执行失败或返回格式错误
    #[error("宿主脚本失败 ({operation}): {reason}")]
    Script { operation: String, reason: String },
}

impl HostError {
    pub fn io(operation: impl Into<String>, reason: impl ToString) -> Self {
        HostError::Io {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn script(operation: impl Into<String>, reason: impl ToString) -> Self {
        HostError::Script {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    pub fn connection(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        HostError::Connection {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

/// 图层错误
#[derive(Debug, Error)]
pub enum LayerError {
    /// 图层不存在
    #[error("未找到图层: {name}")]
    NotFound { name: String },
    /// 图层不是文本图层
    #[error("图层 '{name}' 不是文本图层 (类型: {kind})")]
    NotTextCapable { name: String, kind: String },
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 创建输出目录失败
    #[error("创建输出目录失败 ({path}): {source}")]
    DirectoryFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 保存失败
    #[error("保存 {format} 失败 ({path}): {source}")]
    SaveFailed {
        path: String,
        format: String,
        #[source]
        source: HostError,
    },
}

/// 行级错误（整行无法产出文件）
#[derive(Debug, Error)]
pub enum RowError {
    /// 文件名字段缺失或为空
    #[error("文件名字段 '{field}' 缺失或为空")]
    FilenameFieldMissing { field: String },
}

/// 任务文件错误
#[derive(Debug, Error)]
pub enum JobError {
    /// 必填项为空
    #[error("任务字段不能为空: {field}")]
    EmptyField { field: String },
    /// 图层映射重复
    #[error("图层 '{layer}' 被映射了多次")]
    DuplicateLayer { layer: String },
    /// TOML 解析失败
    #[error("任务文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

impl From<chromiumoxide::error::CdpError> for HostError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        HostError::script("cdp", err)
    }
}

impl From<serde_json::Error> for HostError {
    fn from(err: serde_json::Error) -> Self {
        HostError::script("decode", err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建数据文件读取错误
    pub fn data_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::DataSource(DataSourceError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建数据文件解析错误
    pub fn data_parse_failed(path: impl Into<String>, reason: impl ToString) -> Self {
        AppError::DataSource(DataSourceError::ParseFailed {
            path: path.into(),
            reason: reason.to_string(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 宿主调用结果类型
pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_source_and_connection_errors_are_fatal() {
        let fatal: AppError = HostError::connection("http://localhost:8088", "refused").into();
        assert!(fatal.is_fatal());

        let io: AppError = HostError::io("open", "bad path").into();
        assert!(!io.is_fatal());

        let layer: AppError = LayerError::NotFound {
            name: "Name".to_string(),
        }
        .into();
        assert!(!layer.is_fatal());

        let data = AppError::data_parse_failed("rows.csv", "bad quote");
        assert!(data.is_fatal());
    }
}
