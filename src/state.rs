//! 持久化状态存储
//!
//! 对应扩展外壳的键值存储（`chrome.storage.local` 的 Rust 版）：
//! 限流窗口跨页面会话存活，所以配额是按"安装实例"而不是按"单个页面"计算的。
//! 每次读取都会按墙上时钟重新裁剪窗口，文件本身是唯一可信来源，
//! 内存中不保留计数副本（读取-合并-写回，而不是盲目覆盖）。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 一分钟窗口（毫秒）
pub const MINUTE_WINDOW_MS: i64 = 60_000;
/// 一小时窗口（毫秒）
pub const HOUR_WINDOW_MS: i64 = 3_600_000;

/// 持久化状态
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// 自动答题是否启用
    #[serde(default)]
    pub enabled: bool,
    /// API Key（由外壳配置写入，核心只读取）
    #[serde(default)]
    pub api_key: Option<String>,
    /// 最近一分钟内的请求时间戳（epoch 毫秒，升序）
    #[serde(default)]
    pub request_history: Vec<i64>,
    /// 当前小时窗口内的请求计数
    #[serde(default)]
    pub hourly_count: u32,
    /// 当前小时窗口的起始时间戳（epoch 毫秒）
    #[serde(default)]
    pub hourly_window_start: i64,
    /// 最近一次上报的错误（供外壳重新展示）
    #[serde(default)]
    pub last_error: Option<String>,
}

impl PersistedState {
    /// 按墙上时钟裁剪限流窗口
    ///
    /// 丢弃超过一分钟的时间戳；小时窗口过期则整体重置
    pub fn prune(&mut self, now_ms: i64) {
        self.request_history.retain(|&ts| now_ms - ts < MINUTE_WINDOW_MS);
        if now_ms - self.hourly_window_start >= HOUR_WINDOW_MS {
            self.hourly_window_start = now_ms;
            self.hourly_count = 0;
        }
    }

    /// 合并另一份状态（用于并发实例的读取-合并语义）
    ///
    /// 请求历史取并集，小时计数取同窗口下的较大值
    pub fn merge(&mut self, other: &PersistedState) {
        for &ts in &other.request_history {
            if !self.request_history.contains(&ts) {
                self.request_history.push(ts);
            }
        }
        self.request_history.sort_unstable();

        if other.hourly_window_start > self.hourly_window_start {
            self.hourly_window_start = other.hourly_window_start;
            self.hourly_count = other.hourly_count;
        } else if other.hourly_window_start == self.hourly_window_start {
            self.hourly_count = self.hourly_count.max(other.hourly_count);
        }
    }
}

/// 状态文件存取器
///
/// 职责：
/// - 读取 / 写回 JSON 状态文件
/// - 文件缺失或损坏时回退到默认状态
/// - 不认识限流策略，只管存取
#[derive(Clone, Debug)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取状态，文件不存在或损坏时返回默认值
    pub fn load(&self) -> PersistedState {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!("⚠️ 状态文件损坏，使用默认状态: {}", e);
                    PersistedState::default()
                }
            },
            Err(_) => {
                debug!("状态文件不存在: {}", self.path.display());
                PersistedState::default()
            }
        }
    }

    /// 写回状态
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)
            .with_context(|| format!("无法写入状态文件: {}", self.path.display()))?;
        Ok(())
    }

    /// 裁剪过期的限流记录并写回（定时清理任务调用）
    pub fn prune(&self, now_ms: i64) -> Result<()> {
        let mut state = self.load();
        let before = state.request_history.len();
        state.prune(now_ms);
        if state.request_history.len() != before {
            debug!(
                "🗑️ 清理过期请求记录: {} -> {}",
                before,
                state.request_history.len()
            );
        }
        self.save(&state)
    }

    /// 记录最近一次错误（供外壳重新展示）
    pub fn record_error(&self, message: &str) -> Result<()> {
        let mut state = self.load();
        state.last_error = Some(message.to_string());
        state.enabled = false;
        self.save(&state)
    }

    /// 更新启用标志
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self.load();
        state.enabled = enabled;
        if enabled {
            state.last_error = None;
        }
        self.save(&state)
    }
}
