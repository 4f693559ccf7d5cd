//! HTTP 翻译后端
//!
//! DeepLX 风格的参考实现：`POST { text, source_lang, target_lang }`，
//! 响应从 `data`/`text`/`result` 字段取译文。批量调用使用索引标记
//! （`[n] 文本`）合并为单次请求，返回后按索引重建顺序，缺失的索引
//! 以空串占位。

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use super::backend::{BackendError, TranslateBackend};
use crate::config::EngineEndpoint;
use crate::error::TranslationError;

/// 基于 HTTP API 的翻译后端
pub struct HttpBackend {
    id: String,
    api_url: String,
    supports_batch: bool,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        id: impl Into<String>,
        api_url: impl Into<String>,
        supports_batch: bool,
    ) -> crate::error::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TranslationError::Network(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            id: id.into(),
            api_url: api_url.into(),
            supports_batch,
            client,
        })
    }

    pub fn from_endpoint(endpoint: &EngineEndpoint) -> crate::error::Result<Self> {
        Self::new(&endpoint.id, &endpoint.api_url, endpoint.supports_batch)
    }

    async fn request(&self, text: &str, from: &str, to: &str) -> Result<String, BackendError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(&json!({
                "text": text,
                "source_lang": from,
                "target_lang": to,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(extract_translation_field(&body))
    }
}

/// 从响应体提取译文字段；非 JSON 响应按原文返回
fn extract_translation_field(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("data")
            .or_else(|| value.get("text"))
            .or_else(|| value.get("result"))
            .and_then(|v| v.as_str())
            .unwrap_or(body)
            .to_string(),
        Err(_) => body.to_string(),
    }
}

/// 为批量文本添加索引标记
fn add_index_markers(texts: &[String]) -> String {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("[{}] {}", i, text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn index_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[(\d+)\]\s*(.*)$").unwrap())
}

/// 解析带索引标记的批量响应，按原始顺序重建；缺失索引以空串占位
fn parse_indexed_response(response: &str, expected_count: usize) -> Vec<String> {
    let mut results = vec![String::new(); expected_count];
    let mut missing = expected_count;

    for line in response.lines() {
        if let Some(captures) = index_regex().captures(line.trim()) {
            let index: usize = match captures[1].parse() {
                Ok(i) => i,
                Err(_) => continue,
            };
            if index < expected_count && results[index].is_empty() {
                let translated = captures[2].trim();
                if !translated.is_empty() {
                    results[index] = translated.to_string();
                    missing -= 1;
                }
            }
        }
    }

    if missing > 0 {
        tracing::warn!("批量响应缺失 {} 条译文，以空串占位", missing);
    }

    results
}

#[async_trait(?Send)]
impl TranslateBackend for HttpBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn supports_batch(&self) -> bool {
        self.supports_batch
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, BackendError> {
        let translated = self.request(text, from, to).await?;
        if translated.trim().is_empty() {
            return Err(BackendError::Malformed("后端返回空译文".to_string()));
        }
        Ok(translated)
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        from: &str,
        to: &str,
    ) -> Result<Vec<String>, BackendError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let indexed = add_index_markers(texts);
        let response = self.request(&indexed, from, to).await?;
        Ok(parse_indexed_response(&response, texts.len()))
    }
}
