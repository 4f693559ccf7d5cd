//! 翻译编排服务
//!
//! 把一条（或一批）文本解析为译文。解析顺序固定，首个命中即返回：
//!
//! 1. 站点词典覆盖（合成引擎 `custom`）
//! 2. 缓存（全局开关与请求开关同时允许时）
//! 3. 请求的后端，带超时
//! 4. 回退链：按注册优先级尝试其余后端；成功结果写入缓存时仍以
//!    **最初请求的后端**为键，使后续同样的请求直接命中缓存
//! 5. 全部失败时返回合成失败结果，不向调度器抛错
//!
//! 批量解析先按词典/缓存命中分流，只有未命中的文本才发起真正的
//! 后端调用；输出顺序与输入严格一致。

use std::time::Duration;

use tokio::time::timeout;

use super::backend::{EngineRegistry, TranslateBackend};
use super::cache::{CacheKey, TranslationCache};
use super::dictionary::DictionaryStore;
use super::{Translation, TranslationRequest};

/// 编排服务配置
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// 缓存全局开关（与请求级开关取与）
    pub cache_enabled: bool,
    /// 单次后端调用超时
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            request_timeout: Duration::from_secs(
                crate::config::constants::REQUEST_TIMEOUT_SECS,
            ),
        }
    }
}

/// 翻译编排服务
pub struct TranslationService {
    registry: EngineRegistry,
    cache: TranslationCache,
    dictionary: DictionaryStore,
    config: ServiceConfig,
}

impl TranslationService {
    pub fn new(
        registry: EngineRegistry,
        cache: TranslationCache,
        dictionary: DictionaryStore,
        config: ServiceConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            dictionary,
            config,
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn dictionary(&self) -> &DictionaryStore {
        &self.dictionary
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    fn cache_allowed(&self, request_flag: bool) -> bool {
        self.config.cache_enabled && self.cache.enabled() && request_flag
    }

    /// 解析单条文本
    ///
    /// 永不失败：所有后端都不可用时返回合成失败结果。
    pub async fn resolve(&self, request: &TranslationRequest, domain: &str) -> Translation {
        let text = request.text.trim();
        if text.is_empty() {
            return Translation::fresh(&request.text, String::new(), &request.engine);
        }

        // 1. 词典覆盖
        if let Some(entry) = self.dictionary.lookup(domain, text) {
            tracing::debug!("词典命中: {} ({})", text, domain);
            return Translation::custom(text, entry.translation.clone());
        }

        // 2. 缓存
        let key = CacheKey::new(
            &request.engine,
            &request.source_lang,
            &request.target_lang,
            text,
        );
        if self.cache_allowed(request.use_cache) {
            if let Some(translated) = self.cache.get(&key) {
                return Translation::hit(text, translated, &request.engine);
            }
        }

        // 3-5. 后端与回退链
        self.resolve_via_backends(request, text, &key).await
    }

    /// 解析一批文本，输出顺序与输入一致
    pub async fn resolve_batch(
        &self,
        texts: &[String],
        request: &TranslationRequest,
        domain: &str,
    ) -> Vec<Translation> {
        let mut slots: Vec<Option<Translation>> = vec![None; texts.len()];
        let mut misses: Vec<(usize, String)> = Vec::new();

        // 分流：词典命中、缓存命中、未命中
        for (i, raw) in texts.iter().enumerate() {
            let text = raw.trim();
            if text.is_empty() {
                slots[i] = Some(Translation::fresh(raw, String::new(), &request.engine));
                continue;
            }

            if let Some(entry) = self.dictionary.lookup(domain, text) {
                slots[i] = Some(Translation::custom(text, entry.translation.clone()));
                continue;
            }

            if self.cache_allowed(request.use_cache) {
                let key = CacheKey::new(
                    &request.engine,
                    &request.source_lang,
                    &request.target_lang,
                    text,
                );
                if let Some(translated) = self.cache.get(&key) {
                    slots[i] = Some(Translation::hit(text, translated, &request.engine));
                    continue;
                }
            }

            misses.push((i, text.to_string()));
        }

        if !misses.is_empty() {
            tracing::debug!(
                "批量解析: {} 条输入，{} 条需要后端调用",
                texts.len(),
                misses.len()
            );
            self.resolve_misses(&mut slots, misses, request).await;
        }

        slots
            .into_iter()
            .map(|slot| slot.expect("every batch slot must be filled"))
            .collect()
    }

    /// 解析批量未命中的部分：支持批量的后端走单次批量调用，
    /// 否则逐条走完整回退链
    async fn resolve_misses(
        &self,
        slots: &mut [Option<Translation>],
        misses: Vec<(usize, String)>,
        request: &TranslationRequest,
    ) {
        let primary = self.registry.get(&request.engine);
        let batch_capable = primary.as_ref().map(|b| b.supports_batch()).unwrap_or(false);

        if batch_capable {
            let backend = primary.as_ref().unwrap();
            let miss_texts: Vec<String> = misses.iter().map(|(_, t)| t.clone()).collect();
            let outcome = timeout(
                self.config.request_timeout,
                backend.translate_batch(&miss_texts, &request.source_lang, &request.target_lang),
            )
            .await;

            match outcome {
                Ok(Ok(translated)) if translated.len() == miss_texts.len() => {
                    for ((index, text), translation) in misses.into_iter().zip(translated) {
                        // 批量结果逐条写回缓存；空译文视为该条未译出，留待重扫
                        if !translation.trim().is_empty() && self.cache_allowed(request.use_cache) {
                            let key = CacheKey::new(
                                &request.engine,
                                &request.source_lang,
                                &request.target_lang,
                                &text,
                            );
                            self.cache.insert(key, translation.clone());
                        }
                        slots[index] = Some(Translation::fresh(&text, translation, &request.engine));
                    }
                    return;
                }
                Ok(Ok(translated)) => {
                    tracing::warn!(
                        "批量后端 {} 返回数量不符: 期望 {}，得到 {}，回退到逐条解析",
                        request.engine,
                        miss_texts.len(),
                        translated.len()
                    );
                }
                Ok(Err(e)) => {
                    tracing::warn!("批量后端 {} 调用失败，回退到逐条解析: {}", request.engine, e);
                }
                Err(_) => {
                    tracing::warn!("批量后端 {} 调用超时，回退到逐条解析", request.engine);
                }
            }
        }

        // 逐条解析（含回退链）
        for (index, text) in misses {
            if slots[index].is_some() {
                continue;
            }
            let key = CacheKey::new(
                &request.engine,
                &request.source_lang,
                &request.target_lang,
                &text,
            );
            slots[index] = Some(self.resolve_via_backends(request, &text, &key).await);
        }
    }

    /// 步骤 3-5：请求的后端 → 回退链 → 合成失败
    async fn resolve_via_backends(
        &self,
        request: &TranslationRequest,
        text: &str,
        key: &CacheKey,
    ) -> Translation {
        if let Some(primary) = self.registry.get(&request.engine) {
            match self.call_backend(primary.as_ref(), text, request).await {
                Ok(translated) => {
                    if self.cache_allowed(request.use_cache) {
                        self.cache.insert(key.clone(), translated.clone());
                    }
                    return Translation::fresh(text, translated, &request.engine);
                }
                Err(message) => {
                    tracing::warn!("后端 {} 失败，进入回退链: {}", request.engine, message);
                }
            }
        } else {
            tracing::warn!("未注册的后端 {}，直接进入回退链", request.engine);
        }

        for fallback in self.registry.fallback_candidates(&request.engine) {
            match self.call_backend(fallback.as_ref(), text, request).await {
                Ok(translated) => {
                    // 以最初请求的后端为键写缓存，确保重复请求命中
                    if self.cache_allowed(request.use_cache) {
                        self.cache.insert(key.clone(), translated.clone());
                    }
                    tracing::debug!(
                        "回退成功: {} 代替 {} 给出译文",
                        fallback.id(),
                        request.engine
                    );
                    return Translation::fresh(text, translated, fallback.id());
                }
                Err(message) => {
                    tracing::warn!("回退后端 {} 失败: {}", fallback.id(), message);
                }
            }
        }

        tracing::error!("所有后端均失败: {:?}", self.registry.ids());
        Translation::failed(text)
    }

    async fn call_backend(
        &self,
        backend: &dyn TranslateBackend,
        text: &str,
        request: &TranslationRequest,
    ) -> Result<String, String> {
        match timeout(
            self.config.request_timeout,
            backend.translate(text, &request.source_lang, &request.target_lang),
        )
        .await
        {
            Ok(Ok(translated)) if !translated.trim().is_empty() => Ok(translated),
            Ok(Ok(_)) => Err("后端返回空译文".to_string()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "超时（{}s）",
                self.config.request_timeout.as_secs()
            )),
        }
    }
}
