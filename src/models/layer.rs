//! 图层树快照
//!
//! 每次打开文档后从宿主取一次完整快照，之后的查找都在快照上进行，不再逐个节点访问宿主

use serde::{Deserialize, Serialize};
use std::fmt;

/// 宿主分配的图层 ID（在同一文档内唯一）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 图层类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "name")]
pub enum LayerKind {
    /// 文本图层，可替换内容
    Text,
    /// 图层组
    Group,
    /// 其他类型（像素、形状、智能对象……），保留宿主给出的类型名
    Other(String),
}

impl LayerKind {
    pub fn is_text(&self) -> bool {
        matches!(self, LayerKind::Text)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Text => write!(f, "text"),
            LayerKind::Group => write!(f, "group"),
            LayerKind::Other(name) => write!(f, "{}", name),
        }
    }
}

/// 图层节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerNode {
    pub id: LayerId,
    /// 读取失败时为 None
    #[serde(default)]
    pub name: Option<String>,
    pub kind: LayerKind,
    /// 文本图层的当前内容
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayerNode>,
    /// 宿主读取该节点时的错误信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LayerNode {
    pub fn text(id: u64, name: &str, contents: &str) -> Self {
        Self {
            id: LayerId(id),
            name: Some(name.to_string()),
            kind: LayerKind::Text,
            text: Some(contents.to_string()),
            children: Vec::new(),
            error: None,
        }
    }

    pub fn group(id: u64, name: &str, children: Vec<LayerNode>) -> Self {
        Self {
            id: LayerId(id),
            name: Some(name.to_string()),
            kind: LayerKind::Group,
            text: None,
            children,
            error: None,
        }
    }

    pub fn other(id: u64, name: &str, kind: &str) -> Self {
        Self {
            id: LayerId(id),
            name: Some(name.to_string()),
            kind: LayerKind::Other(kind.to_string()),
            text: None,
            children: Vec::new(),
            error: None,
        }
    }

    /// 用于日志显示的名称
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<无法读取>")
    }
}
