//! 核心入口
//!
//! [`PageTranslator`] 聚合后端注册表、缓存与词典，构成命令面：
//! 启动页面翻译会话、停止会话（经由会话对象）、查询翻译状态
//! （经由状态句柄）。配置在构造时读取一次，会话运行期间不再变化。

use std::rc::Rc;

use crate::config::GlossiaConfig;
use crate::error::Result;
use crate::page::session::{PageSession, SessionOptions};
use crate::page::Page;
use crate::translate::{
    DictionaryStore, EngineRegistry, HttpBackend, ServiceConfig, TranslationCache,
    TranslationService,
};

/// 页面翻译器
pub struct PageTranslator {
    service: Rc<TranslationService>,
    batch_size: usize,
    default_engine: String,
}

impl PageTranslator {
    /// 按配置构建：每个配置端点对应一个 HTTP 后端，顺序即回退优先级
    pub fn new(config: &GlossiaConfig) -> Result<Self> {
        let mut registry = EngineRegistry::new();
        for endpoint in &config.engines {
            registry.register(Rc::new(HttpBackend::from_endpoint(endpoint)?));
        }

        let service = TranslationService::new(
            registry,
            TranslationCache::new(config.cache_config()),
            DictionaryStore::from_map(config.dictionary.clone()),
            ServiceConfig {
                cache_enabled: config.cache.enabled,
                request_timeout: config.request_timeout(),
            },
        );

        Ok(Self {
            service: Rc::new(service),
            batch_size: config.scheduler.batch_nodes,
            default_engine: config.default_engine().to_string(),
        })
    }

    /// 使用自定义编排服务构建（测试或宿主注入后端时使用）
    pub fn with_service(service: TranslationService, batch_size: usize) -> Self {
        let default_engine = service
            .registry()
            .ids()
            .first()
            .map(|id| id.to_string())
            .unwrap_or_default();
        Self {
            service: Rc::new(service),
            batch_size,
            default_engine,
        }
    }

    pub fn service(&self) -> &Rc<TranslationService> {
        &self.service
    }

    pub fn default_engine(&self) -> &str {
        &self.default_engine
    }

    /// 启动页面翻译会话
    ///
    /// 返回拥有全部会话状态的 [`PageSession`]；对同一页面重复启动
    /// 属未定义行为，由调用方守卫。
    pub async fn start_page_translation(
        &self,
        page: Page,
        options: SessionOptions,
    ) -> PageSession {
        let mut session = PageSession::new(page, self.service.clone(), options, self.batch_size);
        session.begin().await;
        session
    }
}
