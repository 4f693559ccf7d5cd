//! 统一错误处理
//!
//! 翻译引擎的结构化错误类型。引擎内部遵循"降级而非崩溃"原则：
//! 调度器和渲染层的局部失败（节点脱离、指示器插入失败等）不会以
//! 错误形式向上传播，这里的类型只服务于配置加载、文档解析和后端调用。

use thiserror::Error;

/// 翻译引擎错误类型
#[derive(Error, Debug)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 文档解析错误
    #[error("文档解析错误: {0}")]
    Parse(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 后端调用错误
    #[error("后端 {engine} 调用失败: {message}")]
    Backend { engine: String, message: String },

    /// 超时错误
    #[error("操作超时: {0}")]
    Timeout(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl TranslationError {
    /// 判断错误是否可通过回退链恢复
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TranslationError::Network(_)
                | TranslationError::Backend { .. }
                | TranslationError::Timeout(_)
        )
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::Config(format!("TOML解析错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::Parse(format!("JSON解析错误: {}", error))
    }
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, TranslationError>;
