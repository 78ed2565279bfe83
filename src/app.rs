//! 应用编排层
//!
//! 组装各层组件并管理进程级资源：浏览器连接、停用信号（Ctrl-C）、
//! 状态文件的定时清理任务。

use anyhow::{Context, Result};
use chromiumoxide::Browser;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::JsExecutor;
use crate::logger;
use crate::services::{AnswerResolver, DomSurface, GeminiClient, LogNotifier, RateLimiter};
use crate::state::StateStore;
use crate::workflow::{AnswerRunner, RunState};

/// 状态文件定时清理间隔
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// 应用主结构
pub struct App {
    config: Config,
    // 连接句柄必须活到循环结束，提前 drop 会断开 CDP 会话
    _browser: Browser,
    runner: AnswerRunner<DomSurface, GeminiClient, LogNotifier>,
    disable_tx: watch::Sender<bool>,
}

impl App {
    /// 初始化应用
    ///
    /// 配置缺陷（缺 API Key）在这里就失败，循环不会启动
    pub async fn initialize(config: Config) -> Result<Self> {
        logger::init_log_file(&config.output_log_file)?;
        logger::log_startup(config.browser_debug_port, &config.gemini_model_name);

        let store = StateStore::new(&config.state_file);

        // 推理能力是构造期注入的依赖，缺失是配置错误
        let oracle = GeminiClient::new(
            config.gemini_api_key.as_str(),
            config.gemini_api_base_url.as_str(),
            config.gemini_model_name.as_str(),
        )
        .context("初始化推理服务失败")?;

        let (browser, page) = browser::connect_to_form_page(
            config.browser_debug_port,
            &config.target_url_pattern,
        )
        .await?;

        let surface = DomSurface::new(JsExecutor::new(page));
        let resolver = AnswerResolver::new(
            oracle,
            RateLimiter::new(
                store.clone(),
                config.rate_limit_per_minute,
                config.rate_limit_per_hour,
            ),
        );
        let notifier = LogNotifier::new(store.clone());

        let (disable_tx, disable_rx) = watch::channel(false);
        let runner = AnswerRunner::new(
            surface,
            resolver,
            notifier,
            disable_rx,
            Duration::from_millis(config.scan_backoff_ms),
            Arc::new(AtomicBool::new(false)),
        )?;

        store.set_enabled(true)?;

        Ok(Self {
            config,
            _browser: browser,
            runner,
            disable_tx,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(mut self) -> Result<()> {
        if !self.config.enabled {
            warn!("⚠️ 自动答题未启用 (AUTO_ANSWER_ENABLED=false)，程序结束");
            return Ok(());
        }

        if self.config.verbose_logging {
            info!(
                "📋 配置: 状态文件={}, 退避={}ms, 限流={}/分 {}/时",
                self.config.state_file,
                self.config.scan_backoff_ms,
                self.config.rate_limit_per_minute,
                self.config.rate_limit_per_hour
            );
        }

        // Ctrl-C → 停用信号（外部控制通道）
        let disable_tx = self.disable_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("收到中断信号，准备停用...");
                let _ = disable_tx.send(true);
            }
        });

        // 定时清理过期的限流记录（外壳的周期性缓存清理）
        let prune_store = StateStore::new(&self.config.state_file);
        let prune_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                let now_ms = chrono::Utc::now().timestamp_millis();
                if let Err(e) = prune_store.prune(now_ms) {
                    warn!("⚠️ 状态清理失败: {}", e);
                }
            }
        });

        let outcome = self.runner.run().await;
        prune_task.abort();

        match outcome {
            RunState::Completed => info!("✅ 本卷全部作答完成"),
            RunState::Disabled => info!("🛑 已按停用指令退出"),
            RunState::Failed => warn!("❌ 处理循环因错误终止"),
            other => warn!("处理循环以意外状态退出: {:?}", other),
        }

        logger::print_final_stats(
            self.runner.answered(),
            self.runner.skipped(),
            self.runner.total_seen(),
            &self.config.output_log_file,
        );

        Ok(())
    }
}
