//! 引擎配置管理
//!
//! 提供简化的配置管理，支持配置文件和默认值。配置在会话创建时
//! 读取一次，会话运行期间不会重新加载。

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::translate::cache::CacheConfig;
use crate::translate::dictionary::DictionaryEntry;

/// 配置常量
pub mod constants {
    /// 每个调度批次包含的文本节点数
    pub const BATCH_NODES: usize = 20;
    /// 单次后端调用的超时时间（秒）
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    // 缓存设置
    pub const CACHE_MAX_ENTRIES: usize = 10_000;
    pub const CACHE_TRIM_TO: usize = 8_000;

    // 默认后端设置
    pub const DEFAULT_ENGINE_ID: &str = "deeplx";
    pub const DEFAULT_API_URL: &str = "http://localhost:1188/translate";
    pub const DEFAULT_TARGET_LANG: &str = "zh";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &["glossia.toml", ".glossia.toml", "config/glossia.toml"];
}

/// 引擎总配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlossiaConfig {
    /// 缓存设置
    pub cache: CacheSection,
    /// 调度器设置
    pub scheduler: SchedulerSection,
    /// 后端端点列表，顺序即回退优先级
    pub engines: Vec<EngineEndpoint>,
    /// 按域名组织的词典覆盖条目
    pub dictionary: HashMap<String, Vec<DictionaryEntry>>,
}

/// 缓存配置节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    pub max_entries: usize,
    /// 超出上限后裁剪到的水位
    pub trim_to: usize,
    /// 条目最大存活时间（秒），None 表示不过期
    pub max_age_secs: Option<u64>,
}

/// 调度器配置节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub batch_nodes: usize,
    pub request_timeout_secs: u64,
}

/// 翻译后端端点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEndpoint {
    pub id: String,
    pub api_url: String,
    #[serde(default)]
    pub supports_batch: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: constants::CACHE_MAX_ENTRIES,
            trim_to: constants::CACHE_TRIM_TO,
            max_age_secs: None,
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            batch_nodes: constants::BATCH_NODES,
            request_timeout_secs: constants::REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for GlossiaConfig {
    fn default() -> Self {
        Self {
            cache: CacheSection::default(),
            scheduler: SchedulerSection::default(),
            engines: vec![EngineEndpoint {
                id: constants::DEFAULT_ENGINE_ID.to_string(),
                api_url: constants::DEFAULT_API_URL.to_string(),
                supports_batch: true,
            }],
            dictionary: HashMap::new(),
        }
    }
}

impl GlossiaConfig {
    /// 从指定文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: GlossiaConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// 按搜索路径发现配置文件，找不到时使用默认配置
    pub fn discover() -> Self {
        for path in constants::CONFIG_PATHS {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        tracing::info!("已加载配置文件: {}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("配置文件 {} 加载失败，忽略: {}", path, e);
                    }
                }
            }
        }
        Self::default()
    }

    /// 单次后端调用的超时时间
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scheduler.request_timeout_secs)
    }

    /// 转换为缓存配置
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            enabled: self.cache.enabled,
            max_entries: self.cache.max_entries,
            trim_to: self.cache.trim_to.min(self.cache.max_entries),
            max_age: self.cache.max_age_secs.map(Duration::from_secs),
        }
    }

    /// 默认后端标识（列表首项）
    pub fn default_engine(&self) -> &str {
        self.engines
            .first()
            .map(|e| e.id.as_str())
            .unwrap_or(constants::DEFAULT_ENGINE_ID)
    }
}
