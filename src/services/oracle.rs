//! 推理服务客户端 - 业务能力层
//!
//! `Oracle` 是构造期注入的能力接口：求解器只依赖"给提示词、拿候选回复"
//! 这一件事，具体实现可以是 Gemini，也可以是测试桩。
//!
//! ## 技术栈
//! - `reqwest` 直连 Gemini `generateContent` REST 端点
//! - 低采样温度 + 有界输出长度，偏向一致性而不是创造性

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnswerError, AnswerResult, UpstreamKind};

/// 推理能力接口
///
/// 实现方保证：成功时返回零或多个候选回复文本
#[async_trait]
pub trait Oracle: Send + Sync {
    /// 发送提示词，返回候选回复列表
    async fn complete(&self, prompt: &str) -> AnswerResult<Vec<String>>;
}

// ========== Gemini 请求/响应结构 ==========

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// 上游错误响应体：`{"error": {"code": 403, "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Gemini 客户端
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

/// 采样温度：接近确定性
const TEMPERATURE: f64 = 0.2;
/// 输出 token 上限：只需要一行选项文本
const MAX_OUTPUT_TOKENS: u32 = 100;

impl GeminiClient {
    /// 创建客户端
    ///
    /// API Key 为空是构造期配置错误，不会等到运行时才暴露
    pub fn new(
        api_key: impl Into<String>,
        api_base_url: impl Into<String>,
        model_name: impl Into<String>,
    ) -> AnswerResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AnswerError::Configuration(
                "缺少 Gemini API Key，请设置 GEMINI_API_KEY".to_string(),
            ));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            api_base_url: api_base_url.into(),
            model_name: model_name.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base_url, self.model_name, self.api_key
        )
    }
}

#[async_trait]
impl Oracle for GeminiClient {
    async fn complete(&self, prompt: &str) -> AnswerResult<Vec<String>> {
        debug!("调用 Gemini API，模型: {}", self.model_name);

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // 优先使用响应体里的结构化错误码分类
            let body = response.text().await.unwrap_or_default();
            let err = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(parsed) => {
                    warn!(
                        "Gemini API 返回错误: code={}, message={}",
                        parsed.error.code, parsed.error.message
                    );
                    AnswerError::from_upstream_code(parsed.error.code, parsed.error.message)
                }
                Err(_) => AnswerError::from_upstream_code(
                    status.as_u16(),
                    format!("HTTP {}", status),
                ),
            };
            return Err(err);
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| AnswerError::Upstream {
            kind: UpstreamKind::Other,
            message: format!("响应解析失败: {}", e),
        })?;

        let candidates: Vec<String> = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content.parts.into_iter().next().map(|p| p.text))
            .collect();

        debug!("Gemini 返回 {} 个候选", candidates.len());
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_is_configuration_error() {
        let result = GeminiClient::new("  ", "https://example.com/v1beta", "gemini-2.0-flash");
        assert!(matches!(result, Err(AnswerError::Configuration(_))));
    }

    #[test]
    fn test_endpoint_embeds_model_and_key() {
        let client =
            GeminiClient::new("test-key", "https://example.com/v1beta", "gemini-2.0-flash").unwrap();
        let endpoint = client.endpoint();
        assert!(endpoint.contains("/models/gemini-2.0-flash:generateContent"));
        assert!(endpoint.ends_with("key=test-key"));
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error": {"code": 403, "message": "quota exceeded"}}"#;
        let parsed: ErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.code, 403);
        assert_eq!(parsed.error.message, "quota exceeded");
    }

    #[test]
    fn test_candidate_response_parsing() {
        let body = r#"{"candidates": [{"content": {"parts": [{"text": "Paris"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.candidates[0].content.parts[0].text, "Paris");
    }
}
