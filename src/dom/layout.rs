//! 视口几何抽象
//!
//! 引擎本身不做排版，节点的可见性判断通过 [`Viewport`] 特征委托给
//! 宿主环境。[`FlowLayout`] 是内置的行流式实现：按文档顺序给每个
//! 文本节点分配一行，配合滚动偏移即可在测试和 CLI 中模拟视口。

use std::cell::Cell;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use super::{collect_text_nodes, NodeId};

/// 视口坐标系下的节点矩形
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl Rect {
    /// 矩形与高度为 `viewport_height` 的视口是否有重叠
    pub fn overlaps_viewport(&self, viewport_height: f64) -> bool {
        self.bottom > 0.0 && self.top < viewport_height
    }
}

/// 节点几何信息提供方
pub trait Viewport {
    /// 节点相对视口的包围矩形；节点不在文档中时返回 None
    fn node_rect(&self, document: &Handle, node: &Handle) -> Option<Rect>;

    /// 视口高度
    fn viewport_height(&self) -> f64;
}

/// 行流式布局
///
/// 文档顺序中的第 n 个文本节点占据第 n 行。滚动偏移用 `Cell` 保存，
/// 宿主持有同一个 `Rc` 即可在会话运行期间更新滚动位置。
pub struct FlowLayout {
    line_height: f64,
    height: f64,
    scroll_y: Cell<f64>,
}

impl FlowLayout {
    pub fn new(height: f64, line_height: f64) -> Rc<Self> {
        Rc::new(Self {
            line_height,
            height,
            scroll_y: Cell::new(0.0),
        })
    }

    /// 无限高视口：整个文档都视为可见（CLI 整页翻译使用）
    pub fn unbounded() -> Rc<Self> {
        Rc::new(Self {
            line_height: 16.0,
            height: f64::INFINITY,
            scroll_y: Cell::new(0.0),
        })
    }

    pub fn scroll_to(&self, y: f64) {
        self.scroll_y.set(y);
    }

    pub fn scroll_by(&self, delta: f64) {
        self.scroll_y.set(self.scroll_y.get() + delta);
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y.get()
    }
}

impl Viewport for FlowLayout {
    fn node_rect(&self, document: &Handle, node: &Handle) -> Option<Rect> {
        let id = NodeId::of(node);
        let index = collect_text_nodes(document)
            .iter()
            .position(|n| NodeId::of(n) == id)?;

        let top = index as f64 * self.line_height - self.scroll_y.get();
        Some(Rect {
            top,
            bottom: top + self.line_height,
            left: 0.0,
            right: f64::INFINITY,
        })
    }

    fn viewport_height(&self) -> f64 {
        self.height
    }
}
