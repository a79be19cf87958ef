//! JS 执行器 - 基础设施层
//!
//! 持有唯一的脚本桥 page 资源，只暴露"执行 JS"和"转交宿主脚本"两种能力

use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{HostError, HostResult};

/// 面板里判断脚本桥是否可用的表达式
const BRIDGE_PROBE: &str =
    "(() => !!window.__adobe_cep__ && typeof window.__adobe_cep__.evalScript === 'function')()";

/// JS 执行器
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() 能力
/// - 把宿主脚本原样交给 evalScript，返回宿主给出的字符串
/// - 不认识文档 / 图层
pub struct JsExecutor {
    page: Page,
}

impl JsExecutor {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> HostResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> HostResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 页面是否暴露了 evalScript
    pub async fn bridge_available(&self) -> HostResult<bool> {
        self.eval_as(BRIDGE_PROBE).await
    }

    /// 把一段宿主脚本交给宿主执行，返回其结果字符串
    pub async fn eval_host_script(&self, script: &str) -> HostResult<String> {
        let value = self.eval(bridge_call(script)).await?;
        match value {
            JsonValue::String(s) => Ok(s),
            other => Err(HostError::script("evalScript", format!("脚本桥返回了非字符串结果: {}", other))),
        }
    }
}

/// 把 Rust 字符串编码成脚本字面量
///
/// 同时适用于面板 JS 和宿主脚本；U+2028 / U+2029 在旧脚本引擎里不能直接出现在字面量中
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// 面板端的 JS：把宿主脚本交给 evalScript，并把回调结果作为 Promise 返回
fn bridge_call(script: &str) -> String {
    format!(
        r#"
        (() => new Promise((resolve) => {{
            const bridge = window.__adobe_cep__;
            if (!bridge || typeof bridge.evalScript !== 'function') {{
                resolve(JSON.stringify({{ ok: false, error: 'script bridge is not available in this page' }}));
                return;
            }}
            bridge.evalScript({}, (result) => resolve(result));
        }}))()
        "#,
        js_string(script)
    )
}
