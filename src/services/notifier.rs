//! 通知渠道 - 业务能力层
//!
//! 核心 → 外壳的单向事件通道。核心只负责分类好的消息文本，
//! 所有呈现（弹窗、状态栏）都是外壳的事；这里的默认实现落到日志，
//! 并把最近错误写进状态文件供外壳重新展示。

use tracing::{error, info};

use crate::state::StateStore;

/// 通知接收端
pub trait NotificationSink: Send + Sync {
    /// 状态更新；`completed` 为 true 表示整卷完成（一次性事件）
    fn status_update(&self, message: &str, completed: bool);

    /// 错误上报（已分类的人类可读消息）
    fn error(&self, message: &str);
}

/// 基于日志 + 状态文件的默认通知实现
pub struct LogNotifier {
    store: StateStore,
}

impl LogNotifier {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

impl NotificationSink for LogNotifier {
    fn status_update(&self, message: &str, completed: bool) {
        if completed {
            info!("🎉 {}", message);
            // 整卷完成后关闭启用标志，重启进程不会重答已完成的表单
            if let Err(e) = self.store.set_enabled(false) {
                error!("完成状态写回失败: {}", e);
            }
        } else {
            info!("📢 {}", message);
        }
    }

    fn error(&self, message: &str) {
        error!("❌ {}", message);
        // 外壳约定：最近一次错误持久化，控制面重新打开时可以再展示
        if let Err(e) = self.store.record_error(message) {
            error!("错误状态写回失败: {}", e);
        }
    }
}
