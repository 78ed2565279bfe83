//! 错误类型定义
//!
//! 核心错误分类（对应通知渠道上报的消息）：
//! - `Configuration`: 缺少 API Key 等致命配置问题，循环不会启动
//! - `RateLimit`: 本地限流，在发起网络请求之前就失败
//! - `Upstream`: 网络 / API 失败，按 认证额度 / 限流 / 其他 细分

use std::fmt;
use thiserror::Error;

/// 上游错误细分类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// 认证失败或额度耗尽（HTTP/错误码 403）
    Auth,
    /// 上游限流（HTTP/错误码 429）
    Throttled,
    /// 其他错误（网络异常、解析失败、空响应等）
    Other,
}

impl fmt::Display for UpstreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamKind::Auth => write!(f, "认证/额度"),
            UpstreamKind::Throttled => write!(f, "限流"),
            UpstreamKind::Other => write!(f, "通用"),
        }
    }
}

/// 答题核心错误
#[derive(Debug, Error)]
pub enum AnswerError {
    /// 配置错误（缺少 API Key、依赖不可用）
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 本地限流，尚未发起网络请求
    #[error("已达到请求频率限制: {0}")]
    RateLimit(String),

    /// 上游推理服务错误
    #[error("AI 服务错误 ({kind}): {message}")]
    Upstream { kind: UpstreamKind, message: String },
}

impl AnswerError {
    /// 根据上游返回的数字错误码分类
    ///
    /// 403 → 认证/额度，429 → 限流，其余归为通用错误
    pub fn from_upstream_code(code: u16, message: impl Into<String>) -> Self {
        let kind = match code {
            403 => UpstreamKind::Auth,
            429 => UpstreamKind::Throttled,
            _ => UpstreamKind::Other,
        };
        let message = match kind {
            UpstreamKind::Auth => "API key 无效或额度已用尽".to_string(),
            _ => message.into(),
        };
        AnswerError::Upstream { kind, message }
    }

    /// 包装传输层错误（连接失败、超时等）
    pub fn transport(source: impl fmt::Display) -> Self {
        AnswerError::Upstream {
            kind: UpstreamKind::Other,
            message: format!("连接错误或服务不可用: {}", source),
        }
    }
}

impl From<reqwest::Error> for AnswerError {
    fn from(err: reqwest::Error) -> Self {
        AnswerError::transport(err)
    }
}

/// 核心结果类型
pub type AnswerResult<T> = Result<T, AnswerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_code() {
        let err = AnswerError::from_upstream_code(403, "forbidden");
        match err {
            AnswerError::Upstream { kind, message } => {
                assert_eq!(kind, UpstreamKind::Auth);
                assert!(message.contains("API key"));
            }
            _ => panic!("应当分类为上游错误"),
        }
    }

    #[test]
    fn test_classify_throttled_code() {
        let err = AnswerError::from_upstream_code(429, "too many requests");
        assert!(matches!(
            err,
            AnswerError::Upstream { kind: UpstreamKind::Throttled, .. }
        ));
    }

    #[test]
    fn test_classify_generic_code() {
        let err = AnswerError::from_upstream_code(500, "internal");
        assert!(matches!(
            err,
            AnswerError::Upstream { kind: UpstreamKind::Other, .. }
        ));
    }
}
