//! 图层查找服务 - 业务能力层
//!
//! 在图层树快照上做深度优先（先序）查找，返回第一个名称完全相同的图层。
//! 组内的子图层先于下一个兄弟图层被访问。

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::error::LayerError;
use crate::models::{LayerId, LayerNode};

/// 先序遍历图层树，回调参数为 (节点, 深度)
///
/// 读取出错的节点仍会被访问，但不会进入其子节点；重复出现的图层 ID 会被跳过
pub fn walk<'a>(roots: &'a [LayerNode], mut visit: impl FnMut(&'a LayerNode, usize) -> bool) {
    let mut visited: HashSet<LayerId> = HashSet::new();
    let mut stack: Vec<(&LayerNode, usize)> = roots.iter().rev().map(|n| (n, 0)).collect();

    while let Some((node, depth)) = stack.pop() {
        if !visited.insert(node.id) {
            warn!("⚠️ 图层 {} ({}) 重复出现，跳过", node.id, node.display_name());
            continue;
        }

        if !visit(node, depth) {
            return;
        }

        if let Some(reason) = &node.error {
            warn!("⚠️ 读取图层 '{}' 失败: {}", node.display_name(), reason);
            continue;
        }

        stack.extend(node.children.iter().rev().map(|child| (child, depth + 1)));
    }
}

/// 按名称查找图层，返回深度优先顺序中的第一个匹配
///
/// # 参数
/// - `roots`: 图层树快照的顶层
/// - `name`: 完整图层名，区分大小写
///
/// # 返回
/// 第一个同名图层；没有则为 None
pub fn find<'a>(roots: &'a [LayerNode], name: &str) -> Option<&'a LayerNode> {
    let mut found = None;
    walk(roots, |node, _| {
        debug!("检查图层: {}", node.display_name());
        if node.name.as_deref() == Some(name) {
            found = Some(node);
            return false;
        }
        true
    });
    found
}

/// 查找可写入文本的图层
pub fn find_text_layer<'a>(roots: &'a [LayerNode], name: &str) -> Result<&'a LayerNode, LayerError> {
    let node = find(roots, name).ok_or_else(|| LayerError::NotFound {
        name: name.to_string(),
    })?;
    if !node.kind.is_text() {
        return Err(LayerError::NotTextCapable {
            name: name.to_string(),
            kind: node.kind.to_string(),
        });
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<LayerNode> {
        vec![
            LayerNode::group(
                1,
                "Header",
                vec![
                    LayerNode::group(2, "Inner", vec![LayerNode::text(3, "Title", "deep")]),
                    LayerNode::text(4, "Title", "shallow-in-group"),
                ],
            ),
            LayerNode::text(5, "Title", "top-level"),
            LayerNode::other(6, "Logo", "smartobject"),
        ]
    }

    #[test]
    fn first_match_is_depth_first() {
        let roots = tree();
        let found = find(&roots, "Title").unwrap();
        assert_eq!(found.id, LayerId(3));
        assert_eq!(found.text.as_deref(), Some("deep"));
    }

    #[test]
    fn groups_can_match_by_name() {
        assert_eq!(find(&tree(), "Inner").unwrap().id, LayerId(2));
    }

    #[test]
    fn missing_name_is_none() {
        assert!(find(&tree(), "title").is_none());
        assert!(find(&[], "Title").is_none());
    }

    #[test]
    fn unreadable_node_is_skipped_but_siblings_are_searched() {
        let mut broken = LayerNode::group(1, "Broken", vec![LayerNode::text(2, "Name", "hidden")]);
        broken.error = Some("General error".to_string());
        let mut nameless = LayerNode::text(3, "", "x");
        nameless.name = None;
        nameless.error = Some("cannot read name".to_string());

        let roots = vec![broken, nameless, LayerNode::text(4, "Name", "visible")];
        assert_eq!(find(&roots, "Name").unwrap().id, LayerId(4));
        // 出错节点本身的名称仍可匹配
        assert_eq!(find(&roots, "Broken").unwrap().id, LayerId(1));
    }

    #[test]
    fn repeated_ids_are_not_revisited() {
        let shared = LayerNode::text(2, "Other", "a");
        let roots = vec![
            LayerNode::group(1, "A", vec![shared.clone()]),
            LayerNode::group(3, "B", vec![shared, LayerNode::text(4, "Target", "b")]),
        ];
        let mut seen = Vec::new();
        walk(&roots, |node, depth| {
            seen.push((node.id.0, depth));
            true
        });
        assert_eq!(seen, [(1, 0), (2, 1), (3, 0), (4, 1)]);
    }

    #[test]
    fn text_layer_lookup_reports_kind() {
        let roots = tree();
        assert!(find_text_layer(&roots, "Title").is_ok());
        let err = find_text_layer(&roots, "Logo").unwrap_err();
        assert!(matches!(err, LayerError::NotTextCapable { ref kind, .. } if kind == "smartobject"));
        assert!(matches!(
            find_text_layer(&roots, "Missing"),
            Err(LayerError::NotFound { .. })
        ));
    }

    #[test]
    fn deep_nesting_does_not_recurse() {
        let mut node = LayerNode::text(0, "Leaf", "bottom");
        for id in 1..1000 {
            node = LayerNode::group(id, "Level", vec![node]);
        }
        let roots = vec![node];
        assert_eq!(find(&roots, "Leaf").unwrap().id, LayerId(0));
    }
}
