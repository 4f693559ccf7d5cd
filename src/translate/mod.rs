//! 翻译子系统
//!
//! 包含后端抽象、HTTP 参考后端、结果缓存、词典覆盖与编排服务。
//! 解析顺序：词典 → 缓存 → 请求的后端 → 回退链 → 合成失败结果。

pub mod backend;
pub mod cache;
pub mod dictionary;
pub mod http;
pub mod service;

pub use backend::{BackendError, EngineRegistry, TranslateBackend};
pub use cache::{CacheConfig, CacheKey, TranslationCache};
pub use dictionary::{DictionaryEntry, DictionaryStore};
pub use http::HttpBackend;
pub use service::{ServiceConfig, TranslationService};

/// 词典覆盖命中时使用的合成引擎标识
pub const ENGINE_CUSTOM: &str = "custom";
/// 所有后端都失败时使用的合成引擎标识
pub const ENGINE_FAILED: &str = "failed";
/// 所有后端都失败时返回的内联错误文本
pub const FAILURE_TEXT: &str = "[translation failed]";

/// 翻译请求
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// 待翻译文本
    pub text: String,
    /// 源语言，"auto" 表示自动检测
    pub source_lang: String,
    /// 目标语言
    pub target_lang: String,
    /// 请求的后端标识
    pub engine: String,
    /// 本次请求是否允许读写缓存（与全局开关取与）
    pub use_cache: bool,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>, engine: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: "auto".to_string(),
            target_lang: target_lang.into(),
            engine: engine.into(),
            use_cache: true,
        }
    }

    pub fn with_source(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }
}

/// 翻译结果
///
/// `engine` 记录实际给出译文的后端，经过回退链后可能不同于请求的
/// 后端；全部失败时为 [`ENGINE_FAILED`]，词典命中时为 [`ENGINE_CUSTOM`]。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub original_text: String,
    pub translated_text: String,
    pub engine: String,
    pub cached: bool,
}

impl Translation {
    /// 后端新鲜返回的结果
    pub fn fresh(original: &str, translated: String, engine: &str) -> Self {
        Self {
            original_text: original.to_string(),
            translated_text: translated,
            engine: engine.to_string(),
            cached: false,
        }
    }

    /// 缓存命中
    pub fn hit(original: &str, translated: String, engine: &str) -> Self {
        Self {
            original_text: original.to_string(),
            translated_text: translated,
            engine: engine.to_string(),
            cached: true,
        }
    }

    /// 词典覆盖命中
    pub fn custom(original: &str, translated: String) -> Self {
        Self {
            original_text: original.to_string(),
            translated_text: translated,
            engine: ENGINE_CUSTOM.to_string(),
            cached: false,
        }
    }

    /// 所有后端都失败时的合成结果；渲染层据此保留原文
    pub fn failed(original: &str) -> Self {
        Self {
            original_text: original.to_string(),
            translated_text: FAILURE_TEXT.to_string(),
            engine: ENGINE_FAILED.to_string(),
            cached: false,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.engine == ENGINE_FAILED
    }

    /// 结果是否可落到 DOM 上（非失败且译文去空白后非空）
    pub fn is_renderable(&self) -> bool {
        !self.is_failure() && !self.translated_text.trim().is_empty()
    }
}
