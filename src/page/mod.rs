//! 页面抽象与会话状态
//!
//! [`Page`] 把文档树、视口几何与站点域名捆绑为引擎的工作对象。
//! 全局可变单例（"页面是否已翻译"）按显式会话对象重构：
//! [`TranslationStatus`] 是调用方可克隆持有的只读观察句柄，
//! [`StopToken`] 是协作式取消标志，二者都默认未激活。

pub mod session;

use std::cell::Cell;
use std::rc::Rc;

use markup5ever_rcdom::{Handle, RcDom};
use url::Url;

use crate::dom;
use crate::dom::layout::Viewport;
use crate::error::Result;

/// 引擎操作的页面
pub struct Page {
    dom: RcDom,
    viewport: Rc<dyn Viewport>,
    domain: String,
}

impl Page {
    pub fn new(dom: RcDom, viewport: Rc<dyn Viewport>, url: Option<&str>) -> Self {
        let domain = url
            .and_then(|raw| Url::parse(raw).ok())
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();

        Self { dom, viewport, domain }
    }

    /// 从 HTML 文本构建页面
    pub fn from_html(html: &str, viewport: Rc<dyn Viewport>, url: Option<&str>) -> Result<Self> {
        Ok(Self::new(dom::html_to_dom(html)?, viewport, url))
    }

    pub fn document(&self) -> &Handle {
        &self.dom.document
    }

    pub fn viewport(&self) -> &Rc<dyn Viewport> {
        &self.viewport
    }

    /// 词典覆盖使用的站点域名；无 URL 时为空串
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// 序列化当前文档
    pub fn to_html(&self) -> Result<String> {
        dom::serialize_dom(&self.dom.document)
    }
}

/// 页面翻译状态观察句柄
///
/// 克隆共享同一份状态；在任何翻译发生之前查询返回未翻译。
#[derive(Debug, Clone, Default)]
pub struct TranslationStatus(Rc<Cell<bool>>);

impl TranslationStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_translated(&self) -> bool {
        self.0.get()
    }

    pub(crate) fn set(&self, translated: bool) {
        self.0.set(translated);
    }
}

/// 协作式停止标志
///
/// `stop()` 置位后，调度器在每个扫描步骤开头和每个批次之前检查它；
/// 已在途的后端结果会被丢弃，不再开始新的批次。
#[derive(Debug, Clone, Default)]
pub struct StopToken(Rc<Cell<bool>>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }
}
