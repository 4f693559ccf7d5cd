//! 按域名组织的词典覆盖
//!
//! 站点词典条目在解析顺序中优先级最高：命中的条目直接给出译文，
//! 不经过缓存与后端。引擎侧只读；条目来自配置文件或宿主注入。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

/// 词典条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DictionaryEntry {
    pub original: String,
    pub translation: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl DictionaryEntry {
    pub fn new(original: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translation: translation.into(),
            enabled: true,
        }
    }
}

/// 词典存储
#[derive(Debug, Default)]
pub struct DictionaryStore {
    domains: HashMap<String, Vec<DictionaryEntry>>,
}

impl DictionaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置中的域名映射构建
    pub fn from_map(domains: HashMap<String, Vec<DictionaryEntry>>) -> Self {
        Self { domains }
    }

    pub fn insert(&mut self, domain: impl Into<String>, entry: DictionaryEntry) {
        self.domains.entry(domain.into()).or_default().push(entry);
    }

    /// 指定域名下的全部条目（含停用条目）
    pub fn entries_for_domain(&self, domain: &str) -> &[DictionaryEntry] {
        self.domains.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 查找启用状态的精确匹配条目
    pub fn lookup(&self, domain: &str, text: &str) -> Option<&DictionaryEntry> {
        self.entries_for_domain(domain)
            .iter()
            .find(|entry| entry.enabled && entry.original == text)
    }

    pub fn is_empty(&self) -> bool {
        self.domains.values().all(Vec::is_empty)
    }
}
