//! 视口调度会话
//!
//! 状态机：`Idle → Scanning → Dispatching → Idle（循环）→ Stopped`。
//!
//! 会话由 `start_page_translation` 创建：先捕获快照，再做首次扫描。
//! 之后宿主把滚动/缩放/DOM 变更事件喂给 [`PageSession::handle_event`]，
//! 每次事件对新进入视口且尚未翻译的节点重复"分类 → 视口相交 →
//! 批量解析 → 渲染"的流程，直到 [`PageSession::stop`]。
//!
//! 引擎自身写入触发的变更事件以标记元素过滤谓词剔除（观察不中断），
//! 避免自激励的重扫循环。

use std::collections::HashSet;
use std::rc::Rc;

use markup5ever_rcdom::Handle;

use crate::classify::{ClassifyContext, ContentClassifier};
use crate::dom::{self, NodeId};
use crate::page::{Page, StopToken, TranslationStatus};
use crate::render::{self, RenderMode, RenderOutcome, Renderer};
use crate::snapshot::{PageSnapshot, RestoreReport};
use crate::translate::{TranslationRequest, TranslationService};

/// 会话选项
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub target_lang: String,
    pub source_lang: String,
    pub mode: RenderMode,
    pub engine: String,
    pub use_cache: bool,
}

impl SessionOptions {
    pub fn new(
        target_lang: impl Into<String>,
        mode: RenderMode,
        engine: impl Into<String>,
    ) -> Self {
        Self {
            target_lang: target_lang.into(),
            source_lang: "auto".to_string(),
            mode,
            engine: engine.into(),
            use_cache: true,
        }
    }

    pub fn with_source(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// 宿主递送给会话的页面事件
#[derive(Clone)]
pub enum PageEvent {
    /// 视口滚动
    Scroll,
    /// 视口尺寸变化
    Resize,
    /// DOM 子树变更，`target` 为变更节点
    Mutation { target: Handle },
}

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scanning,
    Dispatching,
    Stopped,
}

/// 会话统计信息
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    pub scans: u64,
    pub batches_dispatched: u64,
    pub nodes_translated: u64,
    pub nodes_skipped_detached: u64,
    pub indicator_failures: u64,
    pub events_filtered: u64,
}

/// 页面翻译会话
pub struct PageSession {
    page: Page,
    service: Rc<TranslationService>,
    options: SessionOptions,
    classifier: ContentClassifier,
    renderer: Renderer,
    snapshot: PageSnapshot,
    /// 替换模式的"每节点只消费一次"守卫。本会话内只增不减：
    /// 键是 8 字节节点标识，规模受快照（恢复正确性必需）支配，
    /// 淘汰反而会破坏只译一次的不变量。
    translated: HashSet<NodeId>,
    status: TranslationStatus,
    stop_token: StopToken,
    state: SchedulerState,
    batch_size: usize,
    stats: SessionStats,
}

impl PageSession {
    pub(crate) fn new(
        page: Page,
        service: Rc<TranslationService>,
        options: SessionOptions,
        batch_size: usize,
    ) -> Self {
        let renderer = Renderer::new(options.mode);
        Self {
            page,
            service,
            options,
            classifier: ContentClassifier::new(),
            renderer,
            snapshot: PageSnapshot::new(),
            translated: HashSet::new(),
            status: TranslationStatus::new(),
            stop_token: StopToken::new(),
            state: SchedulerState::Idle,
            batch_size: batch_size.max(1),
            stats: SessionStats::default(),
        }
    }

    /// 启动：捕获快照、置位状态、执行首次扫描
    pub(crate) async fn begin(&mut self) {
        self.snapshot.capture(self.page.document());
        self.status.set(true);
        tracing::info!(
            target_lang = %self.options.target_lang,
            engine = %self.options.engine,
            mode = ?self.options.mode,
            "页面翻译会话启动"
        );
        self.rescan().await;
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// 可克隆的状态观察句柄
    pub fn status(&self) -> TranslationStatus {
        self.status.clone()
    }

    /// 可克隆的停止标志（允许在扫描在途时请求停止）
    pub fn stop_token(&self) -> StopToken {
        self.stop_token.clone()
    }

    pub fn is_translated(&self) -> bool {
        self.status.is_translated()
    }

    /// 处理页面事件，必要时触发重扫
    pub async fn handle_event(&mut self, event: PageEvent) {
        if self.state == SchedulerState::Stopped || self.stop_token.is_stopped() {
            return;
        }

        if let PageEvent::Mutation { target } = &event {
            // 过滤引擎自身的标记写入，打破"自己的写触发自己的重扫"环
            if render::within_marker(target) {
                self.stats.events_filtered += 1;
                tracing::trace!("忽略标记元素上的变更事件");
                return;
            }
        }

        self.rescan().await;
    }

    /// 重新扫描：分类 → 视口相交 → 批量派发
    ///
    /// 扫描在途时不重入；停止标志在每个步骤开头检查。
    pub async fn rescan(&mut self) {
        match self.state {
            SchedulerState::Stopped => return,
            SchedulerState::Scanning | SchedulerState::Dispatching => {
                tracing::trace!("扫描在途，忽略重入");
                return;
            }
            SchedulerState::Idle => {}
        }
        if self.stop_token.is_stopped() {
            return;
        }

        self.state = SchedulerState::Scanning;
        self.stats.scans += 1;

        let visible = self.collect_visible_nodes();
        tracing::debug!("扫描完成: {} 个可见待译节点", visible.len());

        if visible.is_empty() {
            self.state = SchedulerState::Idle;
            return;
        }

        self.state = SchedulerState::Dispatching;
        self.dispatch(visible).await;

        if self.state != SchedulerState::Stopped {
            self.state = SchedulerState::Idle;
        }
    }

    /// 全文档分类后与视口相交
    fn collect_visible_nodes(&self) -> Vec<Handle> {
        let ctx = ClassifyContext::new(self.options.mode, &self.translated);
        let document = self.page.document();
        let viewport = self.page.viewport();
        let height = viewport.viewport_height();

        dom::collect_text_nodes(document)
            .into_iter()
            .filter(|node| self.classifier.is_eligible(node, &ctx))
            .filter(|node| {
                viewport
                    .node_rect(document, node)
                    .map(|rect| rect.overlaps_viewport(height))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// 按固定大小批次顺序派发
    async fn dispatch(&mut self, nodes: Vec<Handle>) {
        for chunk in nodes.chunks(self.batch_size) {
            // 停止后放弃尚未开始的批次
            if self.stop_token.is_stopped() {
                tracing::debug!("检测到停止标志，放弃剩余批次");
                break;
            }

            self.dispatch_batch(chunk).await;
            self.stats.batches_dispatched += 1;
        }
    }

    async fn dispatch_batch(&mut self, chunk: &[Handle]) {
        // 插入加载指示器；失败非致命
        for node in chunk {
            if !render::insert_loading_indicator(node) {
                self.stats.indicator_failures += 1;
            }
        }

        let texts: Vec<String> = chunk
            .iter()
            .map(|node| {
                dom::text_content(node)
                    .map(|t| t.trim().to_string())
                    .unwrap_or_default()
            })
            .collect();

        let request = TranslationRequest {
            text: String::new(),
            source_lang: self.options.source_lang.clone(),
            target_lang: self.options.target_lang.clone(),
            engine: self.options.engine.clone(),
            use_cache: self.options.use_cache,
        };
        let results = self
            .service
            .resolve_batch(&texts, &request, self.page.domain())
            .await;

        let discard = self.stop_token.is_stopped();
        let document = self.page.document().clone();

        // 按原始顺序逐节点收尾
        for (node, result) in chunk.iter().zip(results.iter()) {
            render::remove_loading_indicator(node);

            if discard {
                continue;
            }

            // 派发与应用之间父节点可能已被移除
            if !dom::is_attached(node, &document) {
                self.stats.nodes_skipped_detached += 1;
                tracing::trace!("节点已脱离文档，跳过渲染");
                continue;
            }

            // 引擎改写过的节点必须有快照条目（捕获之后出现的节点在此补录）
            self.snapshot.record(node);

            match self.renderer.apply(node, result) {
                RenderOutcome::Applied => {
                    self.stats.nodes_translated += 1;
                    if self.options.mode == RenderMode::Replace {
                        self.translated.insert(NodeId::of(node));
                    }
                }
                RenderOutcome::SkippedEmpty => {
                    // 原文保留，不标记已译，后续重扫可重试
                }
                RenderOutcome::SkippedDetached => {
                    self.stats.nodes_skipped_detached += 1;
                }
            }
        }
    }

    /// 停止会话：清理痕迹、恢复原文、复位状态
    ///
    /// 未翻译状态下调用是空操作，返回 `None`。
    pub fn stop(&mut self) -> Option<RestoreReport> {
        if self.state == SchedulerState::Stopped || !self.status.is_translated() {
            return None;
        }

        self.stop_token.stop();
        self.state = SchedulerState::Stopped;

        let report = self.snapshot.restore(self.page.document());
        self.translated.clear();
        self.status.set(false);

        tracing::info!(
            restored = report.restored,
            wrappers = report.wrappers_unwrapped,
            "页面翻译会话停止，原文已恢复"
        );
        Some(report)
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        // 会话被丢弃时状态句柄不应继续报告"已翻译"
        if self.state != SchedulerState::Stopped {
            self.status.set(false);
        }
    }
}
