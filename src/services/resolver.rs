//! 答案求解服务 - 业务能力层
//!
//! 给定 (题干, 选项列表)，产出被判定为正确的那个选项文本。
//! 顺序：限流准入 → 构造确定性提示词 → 远程推理 → 归约为选项成员。
//! 返回值保证是 `options` 中的一员，绝不返回自由文本。

use tracing::{debug, info};

use crate::error::{AnswerError, AnswerResult, UpstreamKind};
use crate::services::matcher::match_option;
use crate::services::oracle::Oracle;
use crate::services::rate_limiter::RateLimiter;

/// 答案求解器
///
/// 职责：
/// - 只处理单个题目
/// - 不出现 Vec<Question>，不关心流程顺序
/// - 限流拒绝发生在任何网络请求之前
pub struct AnswerResolver<O: Oracle> {
    oracle: O,
    rate_limiter: RateLimiter,
}

impl<O: Oracle> AnswerResolver<O> {
    pub fn new(oracle: O, rate_limiter: RateLimiter) -> Self {
        Self {
            oracle,
            rate_limiter,
        }
    }

    /// 求解一道题
    ///
    /// # 参数
    /// - `question`: 题干文本
    /// - `options`: 非空的选项列表（保持 DOM 顺序）
    ///
    /// # 返回
    /// 返回 `options` 中被判定正确的那个元素
    pub async fn resolve(&self, question: &str, options: &[String]) -> AnswerResult<String> {
        if options.is_empty() {
            return Err(AnswerError::Configuration(
                "选项列表为空，无法求解".to_string(),
            ));
        }

        // 1. 限流准入：拒绝时不发起任何网络请求
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.rate_limiter.admit(now_ms)?;

        // 2. 确定性提示词
        let prompt = build_prompt(question, options);
        debug!("提示词长度: {} 字符", prompt.len());

        // 3. 远程推理
        let candidates = self.oracle.complete(&prompt).await?;

        // 4. 空候选按上游错误处理
        let reply = candidates.into_iter().next().ok_or(AnswerError::Upstream {
            kind: UpstreamKind::Other,
            message: "AI 服务没有返回任何候选回复".to_string(),
        })?;

        debug!("模型回复: {}", reply.trim());

        // 5. 归约为选项成员
        let picked = match_option(&reply, options);
        info!("✓ 匹配到选项: {}", picked);
        Ok(picked)
    }
}

/// 构造提示词：枚举选项（1 起始编号），要求模型只回复选项原文
fn build_prompt(question: &str, options: &[String]) -> String {
    let numbered: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, opt)| format!("{}. {}", i + 1, opt))
        .collect();

    format!(
        "You are an expert at answering multiple choice questions.\n\
         Please analyze this question and tell me which of the options is correct.\n\
         \n\
         Question: {}\n\
         \n\
         Options:\n\
         {}\n\
         \n\
         Please respond with ONLY the exact text of the correct option, no explanations or additional text.",
        question,
        numbered.join("\n")
    )
}
