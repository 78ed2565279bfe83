//! # MCQ Auto Answer
//!
//! 自动作答在线表单单选题的 Rust 应用程序：连接已打开的浏览器页面，
//! 采集可见题目，交给远程推理服务判断，再把答案点回页面。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个题目
//! - `harvester` - 容器归一化能力（选择器回退、指纹）
//! - `AnswerResolver` - 限流 + 推理 + 选项归约能力
//! - `FormSurface` - 采集 / 点击 / 突变观察能力
//! - `NotificationSink` - 向外壳上报状态与错误
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义答题处理循环的完整流程
//! - `AnswerRunner` - 状态机编排（采集 → 求解 → 点击 → 上报）
//!
//! ### ④ 编排层（Orchestration）
//! - `app` - 组装组件，管理浏览器连接、停用信号和清理任务
//!
//! ## 模块结构

pub mod app;
pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod services;
pub mod state;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use browser::connect_to_form_page;
pub use config::Config;
pub use error::{AnswerError, AnswerResult, UpstreamKind};
pub use infrastructure::JsExecutor;
pub use models::{HarvestReport, HarvestedQuestion, RawContainer};
pub use services::{
    AnswerResolver, ClickOutcome, DomSurface, FormSurface, GeminiClient, LogNotifier,
    NotificationSink, Oracle, RateLimiter,
};
pub use state::{PersistedState, StateStore};
pub use workflow::{AnswerRunner, RunState};
