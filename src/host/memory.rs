//! 进程内宿主
//!
//! 不依赖真实宿主的 [`DocumentHost`] 实现：
//! - 模板以图层树的形式注册，每次 open 得到一份独立副本
//! - 图层化导出写成 JSON 图层树，可以再次 open，用于往返校验
//! - 位图导出写成纯文本，列出可见的文本内容
//! - 支持注入失败，用于验证错误隔离

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{HostError, HostResult};
use crate::host::{DocumentHandle, DocumentHost, ExportFormat};
use crate::models::{LayerId, LayerKind, LayerNode};

/// 宿主上发生过的操作，按时间顺序记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Configured,
    Opened { doc: u64, path: PathBuf },
    TextSet { doc: u64, layer: LayerId, text: String },
    Saved { doc: u64, path: PathBuf, format: ExportFormat },
    Closed { doc: u64, discard_changes: bool },
}

#[derive(Default)]
struct MemoryState {
    templates: HashMap<PathBuf, Vec<LayerNode>>,
    documents: HashMap<u64, Vec<LayerNode>>,
    next_doc_id: u64,
    events: Vec<HostEvent>,
    fail_open: HashSet<PathBuf>,
    fail_layer_tree: bool,
    fail_set_text: HashSet<String>,
    fail_save: HashSet<&'static str>,
    fail_close: bool,
}

/// 进程内宿主
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<MemoryState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个模板
    pub fn with_template(self, path: impl Into<PathBuf>, layers: Vec<LayerNode>) -> Self {
        self.lock().templates.insert(path.into(), layers);
        self
    }

    /// 打开该路径时失败
    pub fn fail_open(self, path: impl Into<PathBuf>) -> Self {
        self.lock().fail_open.insert(path.into());
        self
    }

    /// 读取图层树时失败
    pub fn fail_layer_tree(self) -> Self {
        self.lock().fail_layer_tree = true;
        self
    }

    /// 修改该名称的图层时失败
    pub fn fail_set_text(self, layer_name: &str) -> Self {
        self.lock().fail_set_text.insert(layer_name.to_string());
        self
    }

    /// 以该格式保存时失败
    pub fn fail_save(self, format: ExportFormat) -> Self {
        self.lock().fail_save.insert(format.extension());
        self
    }

    /// 关闭文档时失败
    pub fn fail_close(self) -> Self {
        self.lock().fail_close = true;
        self
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.lock().events.clone()
    }

    /// 仍未关闭的文档数量
    pub fn open_documents(&self) -> usize {
        self.lock().documents.len()
    }

    /// 已注册模板的当前图层树
    pub fn template(&self, path: &Path) -> Option<Vec<LayerNode>> {
        self.lock().templates.get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // 测试中某个断言 panic 后锁会中毒，数据本身仍可用
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn find_mut(layers: &mut [LayerNode], id: LayerId) -> Option<&mut LayerNode> {
    for layer in layers.iter_mut() {
        if layer.id == id {
            return Some(layer);
        }
        if let Some(found) = find_mut(&mut layer.children, id) {
            return Some(found);
        }
    }
    None
}

fn collect_text(layers: &[LayerNode], out: &mut Vec<String>) {
    for layer in layers {
        if let Some(text) = &layer.text {
            out.push(format!("{}: {}", layer.display_name(), text));
        }
        collect_text(&layer.children, out);
    }
}

fn document<'a>(state: &'a mut MemoryState, doc: &DocumentHandle) -> HostResult<&'a mut Vec<LayerNode>> {
    state
        .documents
        .get_mut(&doc.id)
        .ok_or_else(|| HostError::io("document", format!("{} 未打开", doc)))
}

impl DocumentHost for MemoryHost {
    async fn configure_noninteractive(&self) -> HostResult<String> {
        self.lock().events.push(HostEvent::Configured);
        Ok("memory".to_string())
    }

    async fn open(&self, path: &Path) -> HostResult<DocumentHandle> {
        let mut state = self.lock();
        if state.fail_open.contains(path) {
            return Err(HostError::io("open", format!("宿主拒绝打开 {}", path.display())));
        }

        let layers = match state.templates.get(path) {
            Some(layers) => layers.clone(),
            None => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| HostError::io("open", format!("{}: {}", path.display(), e)))?;
                serde_json::from_str(&content)
                    .map_err(|e| HostError::io("open", format!("{} 不是图层文件: {}", path.display(), e)))?
            }
        };

        state.next_doc_id += 1;
        let id = state.next_doc_id;
        state.documents.insert(id, layers);
        state.events.push(HostEvent::Opened {
            doc: id,
            path: path.to_path_buf(),
        });
        Ok(DocumentHandle {
            id,
            path: path.to_path_buf(),
        })
    }

    async fn layer_tree(&self, doc: &DocumentHandle) -> HostResult<Vec<LayerNode>> {
        let mut state = self.lock();
        if state.fail_layer_tree {
            return Err(HostError::io("layer_tree", format!("{} 的图层无法枚举", doc)));
        }
        let layers = document(&mut state, doc)?.clone();
        Ok(layers)
    }

    async fn set_text(&self, doc: &DocumentHandle, layer: LayerId, text: &str) -> HostResult<()> {
        let mut state = self.lock();
        let fail_names = state.fail_set_text.clone();
        let layers = document(&mut state, doc)?;
        let node = find_mut(layers, layer)
            .ok_or_else(|| HostError::io("set_text", format!("图层 {} 不存在", layer)))?;

        if node.name.as_ref().is_some_and(|n| fail_names.contains(n)) {
            return Err(HostError::io("set_text", format!("图层 {} 被锁定", node.display_name())));
        }
        if node.kind != LayerKind::Text {
            return Err(HostError::io("set_text", format!("图层 {} 不是文本图层", node.display_name())));
        }
        node.text = Some(text.to_string());

        state.events.push(HostEvent::TextSet {
            doc: doc.id,
            layer,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn save_as(&self, doc: &DocumentHandle, path: &Path, format: ExportFormat) -> HostResult<()> {
        let mut state = self.lock();
        if state.fail_save.contains(format.extension()) {
            return Err(HostError::io("save_as", format!("磁盘已满: {}", path.display())));
        }
        let layers = document(&mut state, doc)?.clone();

        let content = match format {
            ExportFormat::LayeredSource => serde_json::to_string_pretty(&layers)
                .map_err(|e| HostError::io("save_as", e))?,
            ExportFormat::CompressedRaster { quality } => {
                let mut lines = vec![format!("quality={}", quality)];
                collect_text(&layers, &mut lines);
                lines.join("\n")
            }
        };
        std::fs::write(path, content)
            .map_err(|e| HostError::io("save_as", format!("{}: {}", path.display(), e)))?;

        state.events.push(HostEvent::Saved {
            doc: doc.id,
            path: path.to_path_buf(),
            format,
        });
        Ok(())
    }

    async fn close(&self, doc: DocumentHandle, discard_changes: bool) -> HostResult<()> {
        let mut state = self.lock();
        let layers = state
            .documents
            .remove(&doc.id)
            .ok_or_else(|| HostError::io("close", format!("{} 未打开", doc)))?;

        if !discard_changes {
            if let Some(template) = state.templates.get_mut(&doc.path) {
                *template = layers;
            }
        }
        state.events.push(HostEvent::Closed {
            doc: doc.id,
            discard_changes,
        });

        if state.fail_close {
            return Err(HostError::io("close", format!("关闭 {} 时宿主无响应", doc)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Vec<LayerNode> {
        vec![
            LayerNode::text(1, "Name", "placeholder"),
            LayerNode::other(2, "Logo", "normal"),
        ]
    }

    #[test]
    fn each_open_is_an_independent_copy() {
        tokio_test::block_on(async {
            let host = MemoryHost::new().with_template("t.psd", template());
            let first = host.open(Path::new("t.psd")).await.unwrap();
            host.set_text(&first, LayerId(1), "Acme").await.unwrap();

            let second = host.open(Path::new("t.psd")).await.unwrap();
            assert_ne!(first.id, second.id);
            let tree = host.layer_tree(&second).await.unwrap();
            assert_eq!(tree[0].text.as_deref(), Some("placeholder"));

            host.close(first, true).await.unwrap();
            host.close(second, true).await.unwrap();
            assert_eq!(host.open_documents(), 0);
            assert_eq!(
                host.template(Path::new("t.psd")).unwrap()[0].text.as_deref(),
                Some("placeholder")
            );
        });
    }

    #[test]
    fn set_text_rejects_non_text_layers() {
        tokio_test::block_on(async {
            let host = MemoryHost::new().with_template("t.psd", template());
            let doc = host.open(Path::new("t.psd")).await.unwrap();
            let err = host.set_text(&doc, LayerId(2), "x").await.unwrap_err();
            assert!(matches!(err, HostError::Io { .. }));
            host.close(doc, true).await.unwrap();
        });
    }

    #[test]
    fn unknown_path_fails_to_open() {
        tokio_test::block_on(async {
            let host = MemoryHost::new();
            let err = host.open(Path::new("/nonexistent/t.psd")).await.unwrap_err();
            assert!(matches!(err, HostError::Io { ref operation, .. } if operation == "open"));
        });
    }
}
