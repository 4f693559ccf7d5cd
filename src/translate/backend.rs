//! 翻译后端抽象
//!
//! 每个后端实现 [`TranslateBackend`]：单条翻译必选，批量翻译可选
//! （缺省实现退化为顺序单条调用）。注册表按固定优先级排序，
//! 编排服务据此执行回退。

use std::rc::Rc;

use async_trait::async_trait;
use thiserror::Error;

/// 后端调用错误
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("请求失败: {0}")]
    Http(String),

    #[error("后端返回错误状态: {0}")]
    Status(u16),

    #[error("响应格式不正确: {0}")]
    Malformed(String),

    #[error("后端不可用: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        BackendError::Http(error.to_string())
    }
}

/// 翻译后端接口
///
/// 引擎内部不跨线程共享后端（文档句柄本身 `!Send`），因此
/// futures 不要求 `Send`。
#[async_trait(?Send)]
pub trait TranslateBackend {
    /// 后端标识，同时也是缓存键的一部分
    fn id(&self) -> &str;

    /// 是否支持真正的批量调用
    fn supports_batch(&self) -> bool {
        false
    }

    /// 翻译单条文本
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, BackendError>;

    /// 批量翻译，输出顺序与输入一一对应
    async fn translate_batch(
        &self,
        texts: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<String>, BackendError> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.translate(text, from, to).await?);
        }
        Ok(results)
    }
}

/// 后端注册表
///
/// 注册顺序即回退优先级。
#[derive(Default)]
pub struct EngineRegistry {
    backends: Vec<Rc<dyn TranslateBackend>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, backend: Rc<dyn TranslateBackend>) {
        if self.get(backend.id()).is_some() {
            tracing::warn!("重复注册后端 {}，忽略", backend.id());
            return;
        }
        self.backends.push(backend);
    }

    pub fn get(&self, id: &str) -> Option<Rc<dyn TranslateBackend>> {
        self.backends.iter().find(|b| b.id() == id).cloned()
    }

    /// 按优先级返回回退候选（跳过已尝试过的后端）
    pub fn fallback_candidates(&self, skip_id: &str) -> Vec<Rc<dyn TranslateBackend>> {
        self.backends
            .iter()
            .filter(|b| b.id() != skip_id)
            .cloned()
            .collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend {
        id: String,
    }

    #[async_trait(?Send)]
    impl TranslateBackend for EchoBackend {
        fn id(&self) -> &str {
            &self.id
        }

        async fn translate(&self, text: &str, _from: &str, to: &str) -> Result<String, BackendError> {
            Ok(format!("{}:{}", to, text))
        }
    }

    fn registry() -> EngineRegistry {
        let mut registry = EngineRegistry::new();
        registry.register(Rc::new(EchoBackend { id: "a".into() }));
        registry.register(Rc::new(EchoBackend { id: "b".into() }));
        registry.register(Rc::new(EchoBackend { id: "c".into() }));
        registry
    }

    #[test]
    fn test_registry_lookup_and_order() {
        let registry = registry();
        assert_eq!(registry.ids(), vec!["a", "b", "c"]);
        assert!(registry.get("b").is_some());
        assert!(registry.get("missing").is_none());

        let fallbacks: Vec<String> = registry
            .fallback_candidates("b")
            .iter()
            .map(|b| b.id().to_string())
            .collect();
        assert_eq!(fallbacks, vec!["a", "c"]);
    }

    #[test]
    fn test_duplicate_registration_ignored() {
        let mut registry = registry();
        registry.register(Rc::new(EchoBackend { id: "a".into() }));
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_default_batch_is_sequential_and_ordered() {
        let backend = EchoBackend { id: "a".into() };
        let texts = vec!["one".to_string(), "two".to_string()];
        let results = backend.translate_batch(&texts, "auto", "fr").await.unwrap();
        assert_eq!(results, vec!["fr:one".to_string(), "fr:two".to_string()]);
    }
}
