//! 渲染策略
//!
//! 把翻译结果落到 DOM 上的两种互斥方式：
//!
//! - **替换**：直接覆写文本节点内容，并在父元素上打观察性标记；
//! - **对照**：用 `<glossia-compare>` 包装元素替换文本节点，内部
//!   两行分别是弱化显示的原文和继承样式的译文。
//!
//! 两种策略的撤销都只依赖快照与标记元素本身，渲染层不保存状态
//! （对照序号仅用于诊断）。加载指示器也由本模块管理。

use std::cell::Cell;

use markup5ever_rcdom::Handle;

use crate::dom;
use crate::translate::Translation;

/// 加载指示器元素标签
pub const LOADING_TAG: &str = "glossia-loading";
/// 对照包装元素标签
pub const COMPARE_TAG: &str = "glossia-compare";
/// 对照包装上记录原文的属性
pub const ATTR_ORIGINAL: &str = "data-glossia-original";
/// 对照包装的会话内递增序号（仅诊断用）
pub const ATTR_COMPARE_ID: &str = "data-glossia-id";
/// 替换模式在父元素上打的观察性标记
pub const ATTR_TRANSLATED: &str = "data-glossia-translated";

/// 渲染模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// 原地覆写文本
    Replace,
    /// 原文译文双行对照
    Compare,
}

impl std::str::FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "replace" => Ok(RenderMode::Replace),
            "compare" => Ok(RenderMode::Compare),
            other => Err(format!("未知渲染模式: {}", other)),
        }
    }
}

/// 单次渲染的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// 已应用到 DOM
    Applied,
    /// 译文为空或失败，原文保持不动
    SkippedEmpty,
    /// 节点已脱离文档
    SkippedDetached,
}

/// 渲染器
pub struct Renderer {
    mode: RenderMode,
    compare_seq: Cell<u64>,
}

impl Renderer {
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            compare_seq: Cell::new(0),
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// 把翻译结果应用到文本节点
    pub fn apply(&self, node: &Handle, result: &Translation) -> RenderOutcome {
        if !result.is_renderable() {
            return RenderOutcome::SkippedEmpty;
        }

        match self.mode {
            RenderMode::Replace => self.apply_replace(node, result),
            RenderMode::Compare => self.apply_compare(node, result),
        }
    }

    fn apply_replace(&self, node: &Handle, result: &Translation) -> RenderOutcome {
        let Some(parent) = dom::parent_of(node) else {
            return RenderOutcome::SkippedDetached;
        };

        dom::set_text(node, &result.translated_text);
        dom::set_node_attr(&parent, ATTR_TRANSLATED, Some("1".to_string()));
        RenderOutcome::Applied
    }

    fn apply_compare(&self, node: &Handle, result: &Translation) -> RenderOutcome {
        let Some(parent) = dom::parent_of(node) else {
            return RenderOutcome::SkippedDetached;
        };

        let id = self.compare_seq.get() + 1;
        self.compare_seq.set(id);

        let wrapper = dom::create_element(
            COMPARE_TAG,
            &[
                (ATTR_ORIGINAL, result.original_text.as_str()),
                (ATTR_COMPARE_ID, id.to_string().as_str()),
            ],
        );
        let original_line = dom::create_element(
            "span",
            &[
                ("class", "glossia-original"),
                ("style", "display:block;opacity:0.55"),
            ],
        );
        dom::append_child(&original_line, &dom::create_text(&result.original_text));

        // 译文行不设颜色，继承原有文字样式
        let translated_line = dom::create_element(
            "span",
            &[("class", "glossia-translation"), ("style", "display:block")],
        );
        dom::append_child(&translated_line, &dom::create_text(&result.translated_text));

        dom::append_child(&wrapper, &original_line);
        dom::append_child(&wrapper, &translated_line);

        if dom::replace_child(&parent, node, &wrapper) {
            RenderOutcome::Applied
        } else {
            RenderOutcome::SkippedDetached
        }
    }
}

/// 在文本节点前插入加载指示器；已有指示器或节点无父时跳过
pub fn insert_loading_indicator(node: &Handle) -> bool {
    let Some(parent) = dom::parent_of(node) else {
        tracing::debug!("节点无父元素，跳过加载指示器");
        return false;
    };

    if preceding_indicator(&parent, node).is_some() {
        return false;
    }

    let indicator = dom::create_element(LOADING_TAG, &[("style", "opacity:0.4")]);
    dom::insert_before(&parent, node, &indicator)
}

/// 移除文本节点前的加载指示器
pub fn remove_loading_indicator(node: &Handle) {
    if let Some(parent) = dom::parent_of(node) {
        if let Some(indicator) = preceding_indicator(&parent, node) {
            dom::remove_child(&parent, &indicator);
        }
    }
}

fn preceding_indicator(parent: &Handle, node: &Handle) -> Option<Handle> {
    let children = dom::children_snapshot(parent);
    let pos = children
        .iter()
        .position(|c| std::rc::Rc::ptr_eq(c, node))?;
    let previous = children.get(pos.checked_sub(1)?)?;
    (dom::node_name(previous) == Some(LOADING_TAG)).then(|| previous.clone())
}

/// 清理整棵子树中遗留的加载指示器，返回移除数量
pub fn sweep_loading_indicators(root: &Handle) -> usize {
    let mut removed = 0;
    for indicator in dom::collect_elements(root, LOADING_TAG) {
        if let Some(parent) = dom::parent_of(&indicator) {
            if dom::remove_child(&parent, &indicator) {
                removed += 1;
            }
        }
    }
    removed
}

/// 节点自身是否为引擎的标记元素
pub fn is_marker_element(node: &Handle) -> bool {
    matches!(dom::node_name(node), Some(LOADING_TAG) | Some(COMPARE_TAG))
}

/// 节点自身或任一祖先是否为引擎的标记元素
///
/// 变更观察流用它过滤引擎自身的写入，观察本身不中断。
pub fn within_marker(node: &Handle) -> bool {
    if is_marker_element(node) {
        return true;
    }
    dom::ancestors_of(node)
        .iter()
        .any(is_marker_element)
}
