//! 内容分类器
//!
//! 决定单个文本节点是否参与翻译。拒绝规则分三层：祖先上下文
//! （不可见、输入控件、代码容器）、文本自身的代码特征
//! （见 [`patterns`]），以及渲染模式相关的会话守卫（替换模式的
//! 已译集合、对照模式的包装去重）。
//!
//! 设计取向：宁可漏译（false negative）也不误译代码、数字或用户
//! 正在编辑的内容。

pub mod patterns;

use std::collections::HashSet;

use markup5ever_rcdom::Handle;

use crate::dom::{self, NodeId};
use crate::render::{self, RenderMode, ATTR_ORIGINAL, COMPARE_TAG};

/// 分类上下文：渲染模式与会话级已译集合
pub struct ClassifyContext<'a> {
    pub mode: RenderMode,
    pub translated: &'a HashSet<NodeId>,
}

impl<'a> ClassifyContext<'a> {
    pub fn new(mode: RenderMode, translated: &'a HashSet<NodeId>) -> Self {
        Self { mode, translated }
    }
}

/// 内容分类器
#[derive(Default)]
pub struct ContentClassifier;

impl ContentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 判断文本节点是否可翻译
    pub fn is_eligible(&self, node: &Handle, ctx: &ClassifyContext<'_>) -> bool {
        let Some(raw) = dom::text_content(node) else {
            return false;
        };
        let text = raw.trim();
        if text.is_empty() {
            return false;
        }

        if let Some(reason) = self.ancestry_rejection(node) {
            tracing::trace!("跳过节点（祖先: {}）: {:?}", reason, text);
            return false;
        }

        if let Some(reason) = patterns::code_reason(text) {
            tracing::trace!("跳过节点（文本: {}）: {:?}", reason, text);
            return false;
        }

        match ctx.mode {
            // 替换模式：本会话内同一节点只消费一次
            RenderMode::Replace => {
                if ctx.translated.contains(&NodeId::of(node)) {
                    return false;
                }
            }
            // 对照模式：不重复包装
            RenderMode::Compare => {
                if self.inside_compare_wrapper(node) || self.duplicates_sibling_wrapper(node, text) {
                    return false;
                }
            }
        }

        true
    }

    /// 沿祖先链检查上下文拒绝条件，命中时返回原因
    fn ancestry_rejection(&self, node: &Handle) -> Option<&'static str> {
        let mut saw_monospace = false;
        let mut saw_code_container = false;

        for ancestor in dom::ancestors_of(node) {
            let Some(tag) = dom::node_name(&ancestor) else {
                continue;
            };
            let tag = tag.to_lowercase();

            if patterns::SKIP_ELEMENTS.contains(&tag.as_str()) {
                return Some("skip-element");
            }

            // 不可见：hidden 属性或内联样式隐藏
            if dom::get_node_attr(&ancestor, "hidden").is_some() {
                return Some("invisible");
            }
            if let Some(style) = dom::get_node_attr(&ancestor, "style") {
                if patterns::style_hides_element(&style) {
                    return Some("invisible");
                }
                if patterns::style_declares_monospace(&style) {
                    saw_monospace = true;
                }
            }

            // 输入控件上下文
            if patterns::INPUT_TAGS.contains(&tag.as_str()) {
                return Some("input-control");
            }
            if let Some(editable) = dom::get_node_attr(&ancestor, "contenteditable") {
                if !editable.eq_ignore_ascii_case("false") {
                    return Some("contenteditable");
                }
            }
            let class = dom::get_node_attr(&ancestor, "class")
                .unwrap_or_default()
                .to_lowercase();
            if class.contains("input") {
                return Some("input-class");
            }

            // 代码上下文
            if patterns::CODE_CONTAINER_TAGS.contains(&tag.as_str()) {
                return Some("code-container");
            }
            if patterns::CODE_CLASS_HINTS.iter().any(|hint| class.contains(hint)) {
                saw_code_container = true;
            }
            if patterns::CODE_DATA_ATTRS
                .iter()
                .any(|attr| dom::get_node_attr(&ancestor, attr).is_some())
            {
                return Some("code-data-attr");
            }
            if dom::get_node_attr(&ancestor, "role").as_deref() == Some("gridcell") {
                return Some("code-grid-cell");
            }
        }

        // 高亮容器类名命中即拒绝；等宽字体只在命中容器时作为佐证
        if saw_code_container {
            if saw_monospace {
                return Some("monospace-in-code");
            }
            return Some("code-class");
        }

        None
    }

    /// 节点是否已在对照包装内部
    fn inside_compare_wrapper(&self, node: &Handle) -> bool {
        render::within_marker(node)
    }

    /// 兄弟节点中是否已有记录相同原文的对照包装
    fn duplicates_sibling_wrapper(&self, node: &Handle, text: &str) -> bool {
        let Some(parent) = dom::parent_of(node) else {
            return false;
        };
        dom::children_snapshot(&parent).iter().any(|sibling| {
            dom::node_name(sibling) == Some(COMPARE_TAG)
                && dom::get_node_attr(sibling, ATTR_ORIGINAL).as_deref() == Some(text)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{collect_text_nodes, html_to_dom};
    use markup5ever_rcdom::RcDom;

    fn eligible_texts(html: &str, mode: RenderMode) -> Vec<String> {
        let dom = html_to_dom(html).unwrap();
        collect(&dom, mode)
    }

    fn collect(dom: &RcDom, mode: RenderMode) -> Vec<String> {
        let classifier = ContentClassifier::new();
        let translated = HashSet::new();
        let ctx = ClassifyContext::new(mode, &translated);
        collect_text_nodes(&dom.document)
            .iter()
            .filter(|n| classifier.is_eligible(n, &ctx))
            .map(|n| crate::dom::text_content(n).unwrap().trim().to_string())
            .collect()
    }

    #[test]
    fn test_plain_prose_is_eligible() {
        let texts = eligible_texts(
            "<html><body><p>Hello world</p><p>Another paragraph here</p></body></html>",
            RenderMode::Replace,
        );
        assert_eq!(texts, vec!["Hello world", "Another paragraph here"]);
    }

    #[test]
    fn test_code_contexts_rejected() {
        let texts = eligible_texts(
            r#"<html><body>
                <p>Readable text</p>
                <pre>let x = compute();</pre>
                <code>inline code</code>
                <div class="highlight"><span>keyword soup</span></div>
                <div data-line-number="3">numbered line</div>
                <table><tbody><tr><td role="gridcell">cell text</td></tr></tbody></table>
            </body></html>"#,
            RenderMode::Replace,
        );
        assert_eq!(texts, vec!["Readable text"]);
    }

    #[test]
    fn test_invisible_and_input_contexts_rejected() {
        let texts = eligible_texts(
            r#"<html><body>
                <p>Visible text</p>
                <div style="display:none"><p>Hidden text</p></div>
                <div style="visibility: hidden"><p>Also hidden</p></div>
                <div hidden><p>Attribute hidden</p></div>
                <div contenteditable="true"><p>Editing here</p></div>
                <div class="search-input-wrapper"><span>Query text</span></div>
                <select><option>Choice one</option></select>
            </body></html>"#,
            RenderMode::Replace,
        );
        assert_eq!(texts, vec!["Visible text"]);
    }

    #[test]
    fn test_numeric_text_rejected_everywhere() {
        let texts = eligible_texts(
            r#"<html><body>
                <h1>42.5%</h1>
                <p><b>3.14e10</b></p>
                <span>1,000</span>
                <p>A real sentence</p>
            </body></html>"#,
            RenderMode::Replace,
        );
        assert_eq!(texts, vec!["A real sentence"]);
    }

    #[test]
    fn test_replace_mode_respects_translated_set() {
        let dom = html_to_dom("<html><body><p>Hello world</p></body></html>").unwrap();
        let node = collect_text_nodes(&dom.document).remove(0);
        let classifier = ContentClassifier::new();

        let mut translated = HashSet::new();
        {
            let ctx = ClassifyContext::new(RenderMode::Replace, &translated);
            assert!(classifier.is_eligible(&node, &ctx));
        }

        translated.insert(NodeId::of(&node));
        let ctx = ClassifyContext::new(RenderMode::Replace, &translated);
        assert!(!classifier.is_eligible(&node, &ctx));
    }

    #[test]
    fn test_compare_mode_skips_wrapped_and_sibling_duplicates() {
        let dom = html_to_dom("<html><body><p>Hello world</p></body></html>").unwrap();
        let node = collect_text_nodes(&dom.document).remove(0);

        let renderer = crate::render::Renderer::new(RenderMode::Compare);
        let result = crate::translate::Translation::fresh(
            "Hello world",
            "Bonjour le monde".to_string(),
            "deeplx",
        );
        renderer.apply(&node, &result);

        // 包装内部的原文/译文文本节点都不再可翻译
        assert!(collect(&dom, RenderMode::Compare).is_empty());

        // 外部写入一个与包装原文相同的兄弟文本节点，同样被去重
        let wrapper = crate::dom::collect_elements(&dom.document, COMPARE_TAG).remove(0);
        let parent = crate::dom::parent_of(&wrapper).unwrap();
        crate::dom::append_child(&parent, &crate::dom::create_text("Hello world"));
        assert!(collect(&dom, RenderMode::Compare).is_empty());

        // 不同文本的兄弟节点仍然可翻译
        crate::dom::append_child(&parent, &crate::dom::create_text("Fresh sibling text"));
        assert_eq!(collect(&dom, RenderMode::Compare), vec!["Fresh sibling text"]);
    }
}
