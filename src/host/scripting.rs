//! 脚本桥宿主
//!
//! 宿主的扩展面板是一个内嵌浏览器页面，通过 CDP 暴露调试端口。
//! 面板里的 `__adobe_cep__.evalScript` 可以把一段宿主脚本（ExtendScript）交给宿主执行，
//! 这里的每个操作都拼出一段宿主脚本，经 [`JsExecutor`] 送进面板执行。
//!
//! 宿主脚本统一返回 JSON 信封：`{"ok":true,"value":...}` 或 `{"ok":false,"error":"..."}`。
//! 宿主脚本引擎没有内置 JSON，序列化由下面的 `PRELUDE` 手工完成。

use chromiumoxide::Browser;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

use crate::error::{HostError, HostResult};
use crate::host::{DocumentHandle, DocumentHost, ExportFormat};
use crate::infrastructure::js_executor::{js_string, JsExecutor};
use crate::models::{LayerId, LayerNode};

/// 宿主脚本公共函数
const PRELUDE: &str = r#"
var __bad = 0;
function __q(s) {
    s = String(s);
    var out = '"';
    for (var i = 0; i < s.length; i++) {
        var c = s.charAt(i), code = s.charCodeAt(i);
        if (c == '"' || c == '\\') { out += '\\' + c; }
        else if (code < 32 || code == 0x2028 || code == 0x2029) { out += '\\u' + ('0000' + code.toString(16)).slice(-4); }
        else { out += c; }
    }
    return out + '"';
}
function __ok(v) { return '{"ok":true,"value":' + v + '}'; }
function __err(e) { return '{"ok":false,"error":' + __q(e && e.message ? e.message : e) + '}'; }
function __doc(id) {
    for (var i = 0; i < app.documents.length; i++) {
        if (app.documents[i].id == id) { return app.documents[i]; }
    }
    throw new Error('document ' + id + ' is not open');
}
function __layer(layers, id) {
    for (var i = 0; i < layers.length; i++) {
        var l = layers[i];
        if (l.id == id) { return l; }
        if (l.typename == 'LayerSet') {
            var found = __layer(l.layers, id);
            if (found) { return found; }
        }
    }
    return null;
}
function __kind(l) {
    if (l.typename == 'LayerSet') { return '{"type":"group"}'; }
    if (l.kind == LayerKind.TEXT) { return '{"type":"text"}'; }
    return '{"type":"other","name":' + __q(String(l.kind).replace('LayerKind.', '').toLowerCase()) + '}';
}
function __tree(layers) {
    var parts = [];
    for (var i = 0; i < layers.length; i++) { parts.push(__node(layers[i])); }
    return '[' + parts.join(',') + ']';
}
function __node(l) {
    var id = null, name = null, kind = null;
    try {
        id = l.id;
        name = l.name;
        kind = __kind(l);
        var extra = '';
        if (kind == '{"type":"text"}') {
            try { extra += ',"text":' + __q(l.textItem.contents); }
            catch (te) { extra += ',"error":' + __q(te && te.message ? te.message : te); }
        }
        if (l.typename == 'LayerSet') { extra += ',"children":' + __tree(l.layers); }
        return '{"id":' + id + ',"name":' + __q(name) + ',"kind":' + kind + extra + '}';
    } catch (e) {
        if (id === null) { __bad += 1; id = 1000000000000 + __bad; }
        return '{"id":' + id + ',"name":' + (name === null ? 'null' : __q(name))
            + ',"kind":' + (kind === null ? '{"type":"other","name":"unknown"}' : kind)
            + ',"error":' + __q(e && e.message ? e.message : e) + '}';
    }
}
"#;

/// 宿主脚本返回的信封
#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    value: JsonValue,
    #[serde(default)]
    error: Option<String>,
}

fn js_path(path: &Path) -> String {
    js_string(&path.to_string_lossy())
}

/// 包装成一段完整的宿主脚本：最后一个表达式的值就是返回给面板的字符串
fn host_script(body: &str) -> String {
    format!(
        "{}\n(function () {{ try {{ {} }} catch (e) {{ return __err(e); }} }})();",
        PRELUDE, body
    )
}

fn open_script(path: &Path) -> String {
    host_script(&format!(
        "var f = new File({}); if (!f.exists) {{ throw new Error('file not found: ' + f.fsName); }} var d = app.open(f); return __ok(d.id);",
        js_path(path)
    ))
}

fn layer_tree_script(doc_id: u64) -> String {
    host_script(&format!(
        "var d = __doc({}); app.activeDocument = d; return __ok(__tree(d.layers));",
        doc_id
    ))
}

fn set_text_script(doc_id: u64, layer: LayerId, text: &str) -> String {
    host_script(&format!(
        "var d = __doc({}); app.activeDocument = d; var l = __layer(d.layers, {}); \
         if (!l) {{ throw new Error('layer {} not found'); }} \
         if (l.typename == 'LayerSet' || l.kind != LayerKind.TEXT) {{ throw new Error('layer ' + l.name + ' is not a text layer'); }} \
         l.textItem.contents = {}; return __ok('null');",
        doc_id,
        layer.0,
        layer.0,
        js_string(text)
    ))
}

fn save_as_script(doc_id: u64, path: &Path, format: ExportFormat) -> String {
    let options = match format {
        ExportFormat::LayeredSource => {
            "var o = new PhotoshopSaveOptions(); o.layers = true; o.embedColorProfile = true;".to_string()
        }
        ExportFormat::CompressedRaster { quality } => format!(
            "var o = new JPEGSaveOptions(); o.quality = {}; o.embedColorProfile = true; \
             o.formatOptions = FormatOptions.STANDARDBASELINE; o.matte = MatteType.NONE;",
            quality
        ),
    };
    host_script(&format!(
        "var d = __doc({}); app.activeDocument = d; {} d.saveAs(new File({}), o, true, Extension.LOWERCASE); return __ok('null');",
        doc_id,
        options,
        js_path(path)
    ))
}

fn close_script(doc_id: u64, discard_changes: bool) -> String {
    let mode = if discard_changes {
        "SaveOptions.DONOTSAVECHANGES"
    } else {
        "SaveOptions.SAVECHANGES"
    };
    host_script(&format!("var d = __doc({}); d.close({}); return __ok('null');", doc_id, mode))
}

fn configure_script() -> String {
    host_script("app.displayDialogs = DialogModes.NO; return __ok(__q(app.version));")
}

/// 通过脚本桥驱动的真实宿主
pub struct ScriptingHost {
    _browser: Browser,
    executor: JsExecutor,
}

impl ScriptingHost {
    pub(crate) fn new(browser: Browser, executor: JsExecutor) -> Self {
        Self {
            _browser: browser,
            executor,
        }
    }

    /// 执行宿主脚本并解包信封
    async fn call(&self, operation: &str, script: String) -> HostResult<JsonValue> {
        debug!("宿主调用: {}", operation);
        let raw = self.executor.eval_host_script(&script).await.map_err(|e| match e {
            HostError::Script { reason, .. } => HostError::script(operation, reason),
            other => other,
        })?;
        decode_envelope(operation, &raw)
    }
}

fn decode_envelope(operation: &str, text: &str) -> HostResult<JsonValue> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| HostError::script(operation, format!("无法解析宿主返回 '{}': {}", text, e)))?;
    if envelope.ok {
        Ok(envelope.value)
    } else {
        Err(HostError::io(
            operation,
            envelope.error.unwrap_or_else(|| "未知错误".to_string()),
        ))
    }
}

impl DocumentHost for ScriptingHost {
    async fn configure_noninteractive(&self) -> HostResult<String> {
        let value = self.call("configure", configure_script()).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn open(&self, path: &Path) -> HostResult<DocumentHandle> {
        let value = self.call("open", open_script(path)).await?;
        let id = value
            .as_u64()
            .ok_or_else(|| HostError::script("open", format!("文档 ID 无效: {}", value)))?;
        Ok(DocumentHandle {
            id,
            path: path.to_path_buf(),
        })
    }

    async fn layer_tree(&self, doc: &DocumentHandle) -> HostResult<Vec<LayerNode>> {
        let value = self.call("layer_tree", layer_tree_script(doc.id)).await?;
        serde_json::from_value(value).map_err(|e| HostError::script("layer_tree", e))
    }

    async fn set_text(&self, doc: &DocumentHandle, layer: LayerId, text: &str) -> HostResult<()> {
        self.call("set_text", set_text_script(doc.id, layer, text)).await?;
        Ok(())
    }

    async fn save_as(&self, doc: &DocumentHandle, path: &Path, format: ExportFormat) -> HostResult<()> {
        self.call("save_as", save_as_script(doc.id, path, format)).await?;
        Ok(())
    }

    async fn close(&self, doc: DocumentHandle, discard_changes: bool) -> HostResult<()> {
        self.call("close", close_script(doc.id, discard_changes)).await?;
        Ok(())
    }
}
