//! 答题处理循环 - 流程层
//!
//! 核心职责：反复采集 → 过滤已处理 → 逐题求解 → 点击作答，
//! 并向外壳上报进度和错误。
//!
//! 状态机：`Idle → Initializing → Scanning ↔ Answering → Completed|Disabled|Failed`
//!
//! 并发模型：严格单任务顺序执行，任何时刻最多一个推理请求在途——
//! 这既是配额要求，也是正确性要求（每次点击都会改变 DOM）。
//! 停用信号在每道题的安全点检查，进行中的题目不会被腰斩。

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{AnswerError, AnswerResult};
use crate::logger::truncate_text;
use crate::services::harvester::extract_all;
use crate::services::{AnswerResolver, ClickOutcome, FormSurface, NotificationSink, Oracle};

/// 处理循环状态
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Initializing,
    Scanning,
    Answering,
    Completed,
    Disabled,
    Failed,
}

/// 采集标记轮询间隔
const MUTATION_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// 答题处理循环
///
/// 职责：
/// - 持有本会话的 ProcessedSet（只增不减，作用域为一次页面加载）
/// - 编排采集 / 求解 / 点击的顺序
/// - 不直接碰 DOM，也不直接发网络请求
pub struct AnswerRunner<S, O, N>
where
    S: FormSurface,
    O: Oracle,
    N: NotificationSink,
{
    surface: S,
    resolver: AnswerResolver<O>,
    notifier: N,
    disable_rx: watch::Receiver<bool>,
    backoff: Duration,
    state: RunState,
    /// 本会话已处理的题目指纹；同一指纹至多派发一次求解
    processed: HashSet<String>,
    /// 已发现的题目总数（只增不减）
    total_seen: usize,
    answered: usize,
    skipped: usize,
    /// 防止重复实例化的显式运行标记
    active: Arc<AtomicBool>,
}

impl<S, O, N> AnswerRunner<S, O, N>
where
    S: FormSurface,
    O: Oracle,
    N: NotificationSink,
{
    /// 创建处理循环
    ///
    /// 同一个 `active` 标记上已有运行中的实例时返回配置错误，
    /// 取代以前用模块级全局变量做的"已在运行"判断
    pub fn new(
        surface: S,
        resolver: AnswerResolver<O>,
        notifier: N,
        disable_rx: watch::Receiver<bool>,
        backoff: Duration,
        active: Arc<AtomicBool>,
    ) -> AnswerResult<Self> {
        if active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(AnswerError::Configuration(
                "处理循环已在运行，拒绝重复启动".to_string(),
            ));
        }

        Ok(Self {
            surface,
            resolver,
            notifier,
            disable_rx,
            backoff,
            state: RunState::Idle,
            processed: HashSet::new(),
            total_seen: 0,
            answered: 0,
            skipped: 0,
            active,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn answered(&self) -> usize {
        self.answered
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn total_seen(&self) -> usize {
        self.total_seen
    }

    /// 运行处理循环直到终态
    ///
    /// 返回本次运行的最终结果（`Completed` / `Disabled` / `Failed`）
    pub async fn run(&mut self) -> RunState {
        self.state = RunState::Initializing;
        info!("🔄 处理循环初始化...");

        // 启动前就收到停用信号：直接进入终态，不算错误
        if self.disable_requested() {
            self.disable().await;
            return RunState::Disabled;
        }

        if let Err(e) = self.surface.install_observer().await {
            self.notifier.error(&format!("无法安装页面观察器: {}", e));
            self.state = RunState::Failed;
            self.active.store(false, Ordering::SeqCst);
            return RunState::Failed;
        }

        loop {
            if self.disable_requested() {
                self.disable().await;
                return RunState::Disabled;
            }

            self.state = RunState::Scanning;
            let made_progress = match self.scan_pass().await {
                Ok(progress) => progress,
                Err(outcome) => return outcome,
            };

            // 完成判定：已作答数追上已发现总数
            if self.total_seen > 0 && self.answered >= self.total_seen {
                self.state = RunState::Completed;
                self.notifier
                    .status_update("所有题目已作答完成！", true);
                self.disable().await;
                return RunState::Completed;
            }

            // 本轮没有新进展：退避等待，由突变标记或超时触发下一轮
            if !made_progress {
                debug!("本轮无新题目，退避 {:?} 后重扫", self.backoff);
            }
            if self.wait_for_rearm().await {
                self.disable().await;
                return RunState::Disabled;
            }
        }
    }

    /// 一轮扫描：采集全部可见容器并逐题处理
    ///
    /// 返回本轮是否有新进展；致命错误时完成收尾并返回终态
    async fn scan_pass(&mut self) -> Result<bool, RunState> {
        let report = match self.surface.harvest().await {
            Ok(report) => report,
            Err(e) => {
                self.notifier.error(&format!("页面采集失败: {}", e));
                self.state = RunState::Failed;
                let _ = self.surface.detach_observer().await;
                self.active.store(false, Ordering::SeqCst);
                return Err(RunState::Failed);
            }
        };

        let questions = extract_all(&report);

        // 总数只增不减，增长时上报一次进度
        if questions.len() > self.total_seen {
            self.total_seen = questions.len();
            self.notifier.status_update(
                &format!("检测到 {} 道题目，正在分析...", self.total_seen),
                false,
            );
        }

        let mut made_progress = false;

        for question in questions {
            if self.processed.contains(&question.fingerprint) {
                continue;
            }

            // 页面上已有作答的题目：记入 ProcessedSet，绝不进求解
            if question.answered {
                debug!("题目已作答，跳过: {}", truncate_text(&question.question, 40));
                self.processed.insert(question.fingerprint);
                self.answered += 1;
                made_progress = true;
                continue;
            }

            self.state = RunState::Answering;
            info!("📝 处理题目: {}", truncate_text(&question.question, 60));

            // 同一指纹至多派发一次，在求解之前登记
            self.processed.insert(question.fingerprint.clone());

            let picked = match self
                .resolver
                .resolve(&question.question, &question.options)
                .await
            {
                Ok(picked) => picked,
                Err(e) => {
                    // 不重试：反复失败多半是系统性问题（坏 Key、没额度），
                    // 重试只会雪上加霜
                    self.notifier.error(&e.to_string());
                    self.state = RunState::Failed;
                    let _ = self.surface.detach_observer().await;
                    self.active.store(false, Ordering::SeqCst);
                    return Err(RunState::Failed);
                }
            };

            match self
                .surface
                .select_option(&report.selector, question.container_index, &picked)
                .await
            {
                Ok(ClickOutcome::Clicked) => {
                    self.answered += 1;
                    made_progress = true;
                    self.notifier.status_update(
                        &format!("已作答 {}/{}", self.answered, self.total_seen),
                        false,
                    );
                }
                Ok(ClickOutcome::NoMatch) => {
                    // 点击目标缺失是独立的结果，不能当成功处理
                    warn!(
                        "⚠️ 未在容器中找到匹配选项: {}",
                        truncate_text(&picked, 40)
                    );
                    self.skipped += 1;
                }
                Ok(ClickOutcome::ContainerGone) => {
                    warn!("⚠️ 容器已不在页面上，跳过");
                    self.skipped += 1;
                }
                Err(e) => {
                    warn!("⚠️ 点击执行失败: {}", e);
                    self.skipped += 1;
                }
            }

            // 安全点：当前题目收尾后响应停用信号
            if self.disable_requested() {
                self.disable().await;
                return Err(RunState::Disabled);
            }

            self.state = RunState::Scanning;
        }

        Ok(made_progress)
    }

    /// 退避等待下一轮扫描
    ///
    /// 突变标记或退避超时先到者触发重扫；返回是否收到停用信号
    async fn wait_for_rearm(&mut self) -> bool {
        let deadline = Instant::now() + self.backoff;
        loop {
            if self.disable_requested() {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            tokio::select! {
                changed = self.disable_rx.changed() => {
                    if changed.is_err() {
                        // 控制端已消失：不会再有停用信号，退化为纯轮询
                        sleep(remaining.min(MUTATION_POLL_INTERVAL)).await;
                    } else if self.disable_requested() {
                        return true;
                    }
                }
                _ = sleep(remaining.min(MUTATION_POLL_INTERVAL)) => {}
            }

            // 页面内的防抖观察器置位了标记：提前重扫
            if self.surface.take_mutation_flag().await.unwrap_or(false) {
                debug!("检测到 DOM 变化，提前重扫");
                return false;
            }
        }
    }

    fn disable_requested(&self) -> bool {
        *self.disable_rx.borrow()
    }

    /// 停用处理循环
    ///
    /// 幂等：重复调用是无操作，不产生重复通知。
    /// 拆除观察器、释放运行标记，实例进入终态。
    pub async fn disable(&mut self) {
        if self.state == RunState::Disabled {
            return;
        }
        self.state = RunState::Disabled;
        let _ = self.surface.detach_observer().await;
        self.active.store(false, Ordering::SeqCst);
        self.notifier.status_update("自动答题已停止", false);
        info!("🛑 处理循环已停用");
    }
}
