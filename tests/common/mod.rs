//! 集成测试公共工具
//!
//! 提供脚本化的测试后端与页面/会话搭建助手。

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;

use glossia::dom;
use glossia::dom::layout::{FlowLayout, Viewport};
use glossia::translate::{
    BackendError, CacheConfig, DictionaryStore, EngineRegistry, ServiceConfig, TranslateBackend,
    TranslationCache, TranslationService,
};
use glossia::{Page, PageTranslator};

/// 脚本化测试后端
///
/// 译文规则：词表精确命中优先，否则回落到 `prefix + 原文`。
/// 可切换失败状态并统计调用次数。
pub struct StubBackend {
    id: String,
    prefix: String,
    lexicon: RefCell<HashMap<String, String>>,
    failing: Cell<bool>,
    supports_batch: bool,
    pub calls: Cell<usize>,
    pub batch_calls: Cell<usize>,
}

impl StubBackend {
    fn make(id: &str, prefix: &str, supports_batch: bool) -> Rc<Self> {
        Rc::new(Self {
            id: id.to_string(),
            prefix: prefix.to_string(),
            lexicon: RefCell::new(HashMap::new()),
            failing: Cell::new(false),
            supports_batch,
            calls: Cell::new(0),
            batch_calls: Cell::new(0),
        })
    }

    pub fn new(id: &str, prefix: &str) -> Rc<Self> {
        Self::make(id, prefix, false)
    }

    pub fn with_batch(id: &str, prefix: &str) -> Rc<Self> {
        Self::make(id, prefix, true)
    }

    pub fn learn(&self, original: &str, translation: &str) {
        self.lexicon
            .borrow_mut()
            .insert(original.to_string(), translation.to_string());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn total_calls(&self) -> usize {
        self.calls.get() + self.batch_calls.get()
    }

    fn answer(&self, text: &str) -> String {
        self.lexicon
            .borrow()
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("{}{}", self.prefix, text))
    }
}

#[async_trait(?Send)]
impl TranslateBackend for StubBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_batch(&self) -> bool {
        self.supports_batch
    }

    async fn translate(&self, text: &str, _from: &str, _to: &str) -> Result<String, BackendError> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.get() {
            return Err(BackendError::Unavailable("stub offline".to_string()));
        }
        Ok(self.answer(text))
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        _from: &str,
        _to: &str,
    ) -> Result<Vec<String>, BackendError> {
        self.batch_calls.set(self.batch_calls.get() + 1);
        if self.failing.get() {
            return Err(BackendError::Unavailable("stub offline".to_string()));
        }
        Ok(texts.iter().map(|t| self.answer(t)).collect())
    }
}

/// 由一组后端搭建编排服务
pub fn service_with_backends(backends: Vec<Rc<dyn TranslateBackend>>) -> TranslationService {
    service_with(backends, DictionaryStore::new())
}

pub fn service_with(
    backends: Vec<Rc<dyn TranslateBackend>>,
    dictionary: DictionaryStore,
) -> TranslationService {
    let mut registry = EngineRegistry::new();
    for backend in backends {
        registry.register(backend);
    }
    TranslationService::new(
        registry,
        TranslationCache::new(CacheConfig::default()),
        dictionary,
        ServiceConfig::default(),
    )
}

pub fn translator_with_backends(backends: Vec<Rc<dyn TranslateBackend>>) -> PageTranslator {
    PageTranslator::with_service(service_with_backends(backends), 20)
}

/// 无限高视口页面
pub fn unbounded_page(html: &str) -> Page {
    Page::from_html(html, FlowLayout::unbounded(), Some("https://example.com/"))
        .expect("test html should parse")
}

/// 指定视口几何的页面，返回布局句柄以便测试中滚动
pub fn scrolling_page(html: &str, height: f64, line_height: f64) -> (Page, Rc<FlowLayout>) {
    let layout = FlowLayout::new(height, line_height);
    let viewport: Rc<dyn Viewport> = layout.clone();
    let page = Page::from_html(html, viewport, Some("https://example.com/"))
        .expect("test html should parse");
    (page, layout)
}

/// 文档中全部非空白文本，按文档顺序
pub fn visible_texts(document: &dom::Handle) -> Vec<String> {
    dom::collect_text_nodes(document)
        .iter()
        .filter_map(dom::text_content)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
