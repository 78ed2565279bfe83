//! 业务能力层
//!
//! 描述"我能做什么"，只处理单个题目，不关心流程顺序

pub mod form_surface;
pub mod harvester;
pub mod matcher;
pub mod notifier;
pub mod oracle;
pub mod rate_limiter;
pub mod resolver;

pub use form_surface::{ClickOutcome, DomSurface, FormSurface};
pub use notifier::{LogNotifier, NotificationSink};
pub use oracle::{GeminiClient, Oracle};
pub use rate_limiter::RateLimiter;
pub use resolver::AnswerResolver;
