//! 翻译结果缓存
//!
//! 以 `(引擎, 源语言, 目标语言, 原文)` 为键的有界缓存。超出上限时
//! 按最近访问时间排序，从最久未访问的条目开始裁剪到低水位。

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub engine: String,
    pub source_lang: String,
    pub target_lang: String,
    pub text: String,
}

impl CacheKey {
    pub fn new(
        engine: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            text: text.into(),
        }
    }
}

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub translated_text: String,
    pub created_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
}

impl CacheEntry {
    fn new(translated_text: String) -> Self {
        let now = Instant::now();
        Self {
            translated_text,
            created_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    fn access(&mut self) {
        self.access_count += 1;
        self.last_accessed = Instant::now();
    }

    fn is_expired(&self, max_age: Option<Duration>) -> bool {
        match max_age {
            Some(ttl) => self.created_at.elapsed() > ttl,
            None => false,
        }
    }
}

/// 缓存配置
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    /// 超限裁剪后的目标条目数
    pub trim_to: usize,
    pub max_age: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: crate::config::constants::CACHE_MAX_ENTRIES,
            trim_to: crate::config::constants::CACHE_TRIM_TO,
            max_age: None,
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_requests as f64
        }
    }
}

/// 翻译缓存
pub struct TranslationCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    config: CacheConfig,
    stats: RwLock<CacheStats>,
}

impl TranslationCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// 查询缓存并更新访问统计
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let mut stats = self.stats.write().unwrap();
        stats.total_requests += 1;

        let mut entries = self.entries.write().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            if entry.is_expired(self.config.max_age) {
                entries.remove(key);
            } else {
                entry.access();
                stats.hits += 1;
                return Some(entry.translated_text.clone());
            }
        }

        stats.misses += 1;
        None
    }

    /// 写入缓存；超出上限时裁剪到低水位
    pub fn insert(&self, key: CacheKey, translated_text: String) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key, CacheEntry::new(translated_text));

        if entries.len() > self.config.max_entries {
            let evicted = Self::evict_to_watermark(&mut entries, self.config.trim_to);
            let mut stats = self.stats.write().unwrap();
            stats.evictions += evicted;
            tracing::debug!("缓存超限，裁剪 {} 条最久未访问条目", evicted);
        }
    }

    /// 按最近访问时间从旧到新裁剪，直到条目数不超过 `trim_to`
    fn evict_to_watermark(entries: &mut HashMap<CacheKey, CacheEntry>, trim_to: usize) -> u64 {
        if entries.len() <= trim_to {
            return 0;
        }

        let mut by_recency: Vec<(CacheKey, Instant)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_accessed))
            .collect();
        by_recency.sort_by_key(|(_, last_accessed)| *last_accessed);

        let excess = entries.len() - trim_to;
        for (key, _) in by_recency.into_iter().take(excess) {
            entries.remove(&key);
        }
        excess as u64
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().unwrap().clone()
    }

    /// 查看条目元数据（测试与诊断用）
    pub fn peek(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().unwrap().get(key).cloned()
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
