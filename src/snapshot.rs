//! 原始内容快照
//!
//! 在翻译会话开始时记录每个非空白文本节点的原文，`stop()` 时据此
//! 恢复。快照是插入型的：重复捕获不会覆盖已有条目，避免把已译
//! 文本当成原文记下来。恢复同时负责清理渲染痕迹——加载指示器、
//! 对照包装（换回记录原文的纯文本节点）与父元素上的已译标记。
//! 恢复是幂等的，单个节点的写回失败不会中断整体恢复。

use std::collections::HashMap;

use markup5ever_rcdom::Handle;

use crate::dom::{self, NodeId};
use crate::render::{self, ATTR_ORIGINAL, ATTR_TRANSLATED, COMPARE_TAG};

struct SnapshotEntry {
    node: Handle,
    text: String,
}

/// 恢复过程统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// 成功写回原文的节点数
    pub restored: usize,
    /// 因脱离文档而跳过的节点数
    pub skipped_detached: usize,
    /// 展开的对照包装数
    pub wrappers_unwrapped: usize,
    /// 移除的加载指示器数
    pub indicators_removed: usize,
    /// 清除的已译标记数
    pub markers_cleared: usize,
}

/// 页面原文快照
#[derive(Default)]
pub struct PageSnapshot {
    entries: HashMap<NodeId, SnapshotEntry>,
    captured: bool,
}

impl PageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 捕获整棵子树的原文
    ///
    /// 每个会话只生效一次；在恢复之前重复调用不会覆盖已有条目。
    pub fn capture(&mut self, root: &Handle) {
        if self.captured {
            tracing::debug!("快照已存在，跳过重复捕获");
            return;
        }
        self.captured = true;

        for node in dom::collect_text_nodes(root) {
            self.record(&node);
        }
        tracing::debug!("快照捕获完成: {} 个文本节点", self.entries.len());
    }

    /// 记录单个文本节点的当前内容（插入型，已有条目保持不变）
    ///
    /// 调度器在翻译捕获之后才出现的节点前调用它，保证"引擎改过的
    /// 节点必有快照条目"这一不变量。
    pub fn record(&mut self, node: &Handle) {
        let Some(text) = dom::text_content(node) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }
        self.entries
            .entry(NodeId::of(node))
            .or_insert_with(|| SnapshotEntry {
                node: node.clone(),
                text,
            });
    }

    /// 查询节点的记录原文
    pub fn original_of(&self, node: &Handle) -> Option<&str> {
        self.entries
            .get(&NodeId::of(node))
            .map(|entry| entry.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 恢复原始内容并移除全部渲染痕迹
    pub fn restore(&self, root: &Handle) -> RestoreReport {
        let mut report = RestoreReport::default();

        // 1. 遗留的加载指示器
        report.indicators_removed = render::sweep_loading_indicators(root);

        // 2. 对照包装换回纯文本节点，文本取包装上记录的原文
        for wrapper in dom::collect_elements(root, COMPARE_TAG) {
            let original = dom::get_node_attr(&wrapper, ATTR_ORIGINAL).unwrap_or_default();
            match dom::parent_of(&wrapper) {
                Some(parent) => {
                    let text_node = dom::create_text(&original);
                    if dom::replace_child(&parent, &wrapper, &text_node) {
                        report.wrappers_unwrapped += 1;
                    }
                }
                None => {
                    tracing::debug!("对照包装无父元素，跳过展开");
                }
            }
        }

        // 3. 写回原文；脱离文档的节点逐个跳过
        for entry in self.entries.values() {
            if dom::is_attached(&entry.node, root) {
                dom::set_text(&entry.node, &entry.text);
                report.restored += 1;
            } else {
                report.skipped_detached += 1;
            }
        }

        // 4. 清除观察性已译标记
        for element in dom::collect_elements_with_attr(root, ATTR_TRANSLATED) {
            dom::set_node_attr(&element, ATTR_TRANSLATED, None);
            report.markers_cleared += 1;
        }

        tracing::debug!(
            "恢复完成: {} 写回, {} 脱离, {} 包装展开, {} 指示器",
            report.restored,
            report.skipped_detached,
            report.wrappers_unwrapped,
            report.indicators_removed
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{collect_text_nodes, html_to_dom};
    use crate::render::{RenderMode, Renderer};
    use crate::translate::Translation;

    #[test]
    fn test_capture_is_insert_only() {
        let dom = html_to_dom("<html><body><p>Hello</p></body></html>").unwrap();
        let node = collect_text_nodes(&dom.document).remove(0);

        let mut snapshot = PageSnapshot::new();
        snapshot.capture(&dom.document);
        assert_eq!(snapshot.original_of(&node), Some("Hello"));

        // 已译后的重复捕获不得覆盖原文
        dom::set_text(&node, "Bonjour");
        snapshot.capture(&dom.document);
        snapshot.record(&node);
        assert_eq!(snapshot.original_of(&node), Some("Hello"));
    }

    #[test]
    fn test_restore_is_idempotent() {
        let dom = html_to_dom("<html><body><p>Hello</p><p>World</p></body></html>").unwrap();
        let mut snapshot = PageSnapshot::new();
        snapshot.capture(&dom.document);

        for node in collect_text_nodes(&dom.document) {
            dom::set_text(&node, "翻译");
        }

        let first = snapshot.restore(&dom.document);
        assert_eq!(first.restored, 2);
        let html_after_first = dom::serialize_dom(&dom.document).unwrap();

        let second = snapshot.restore(&dom.document);
        assert_eq!(second.restored, 2);
        assert_eq!(second.wrappers_unwrapped, 0);
        let html_after_second = dom::serialize_dom(&dom.document).unwrap();

        assert_eq!(html_after_first, html_after_second);
        assert!(html_after_first.contains("Hello"));
        assert!(html_after_first.contains("World"));
    }

    #[test]
    fn test_restore_unwraps_compare_wrappers() {
        let dom = html_to_dom("<html><body><p>Hello world</p></body></html>").unwrap();
        let node = collect_text_nodes(&dom.document).remove(0);

        let mut snapshot = PageSnapshot::new();
        snapshot.capture(&dom.document);

        let renderer = Renderer::new(RenderMode::Compare);
        renderer.apply(
            &node,
            &Translation::fresh("Hello world", "Bonjour le monde".to_string(), "deeplx"),
        );

        let report = snapshot.restore(&dom.document);
        assert_eq!(report.wrappers_unwrapped, 1);
        // 被包装换下的原文本节点已脱离，计入 skipped
        assert_eq!(report.skipped_detached, 1);

        let html = dom::serialize_dom(&dom.document).unwrap();
        assert!(html.contains("Hello world"));
        assert!(!html.contains("Bonjour"));
        assert!(!html.contains("glossia-compare"));
    }

    #[test]
    fn test_restore_tolerates_detached_nodes() {
        let dom = html_to_dom("<html><body><p>Hello</p><p>World</p></body></html>").unwrap();
        let mut snapshot = PageSnapshot::new();
        snapshot.capture(&dom.document);

        let nodes = collect_text_nodes(&dom.document);
        let parent = dom::parent_of(&nodes[0]).unwrap();
        dom::remove_child(&parent, &nodes[0]);
        dom::set_text(&nodes[1], "翻译");

        let report = snapshot.restore(&dom.document);
        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped_detached, 1);

        let html = dom::serialize_dom(&dom.document).unwrap();
        assert!(html.contains("World"));
    }

    #[test]
    fn test_restore_clears_translated_markers() {
        let dom = html_to_dom("<html><body><p>Hello</p></body></html>").unwrap();
        let node = collect_text_nodes(&dom.document).remove(0);
        let mut snapshot = PageSnapshot::new();
        snapshot.capture(&dom.document);

        let renderer = Renderer::new(RenderMode::Replace);
        renderer.apply(
            &node,
            &Translation::fresh("Hello", "Bonjour".to_string(), "deeplx"),
        );

        let report = snapshot.restore(&dom.document);
        assert_eq!(report.markers_cleared, 1);
        assert_eq!(dom::text_content(&node).unwrap(), "Hello");
        let parent = dom::parent_of(&node).unwrap();
        assert!(dom::get_node_attr(&parent, ATTR_TRANSLATED).is_none());
    }
}
