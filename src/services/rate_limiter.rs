//! 限流服务 - 业务能力层
//!
//! 滑动一分钟窗口 + 按墙上时钟重置的小时计数器。
//! 窗口数据保存在状态文件里，跨进程实例存活：
//! 每次准入检查都重新读取文件、按当前时刻裁剪、再写回，
//! 不信任任何内存里的计数（并发实例只通过文件对话）。

use crate::error::{AnswerError, AnswerResult};
use crate::state::{PersistedState, StateStore, MINUTE_WINDOW_MS};
use tracing::debug;

/// 限流器
///
/// 职责：
/// - 在每次网络调用之前做准入检查
/// - 维护持久化的请求窗口
/// - 不认识题目，也不发网络请求
pub struct RateLimiter {
    store: StateStore,
    per_minute: usize,
    per_hour: usize,
}

impl RateLimiter {
    pub fn new(store: StateStore, per_minute: usize, per_hour: usize) -> Self {
        Self {
            store,
            per_minute,
            per_hour,
        }
    }

    /// 准入检查并记录一次请求
    ///
    /// 通过则把当前时刻写入窗口并持久化；
    /// 拒绝时返回 `RateLimit`，此时没有任何网络请求发生，
    /// 被拒绝的调用不占用配额。
    pub fn admit(&self, now_ms: i64) -> AnswerResult<()> {
        let mut state = self.store.load();
        state.prune(now_ms);

        if state.request_history.len() >= self.per_minute {
            let message = self.minute_message(&state, now_ms);
            self.save_best_effort(&state);
            return Err(AnswerError::RateLimit(message));
        }

        if state.hourly_count as usize >= self.per_hour {
            self.save_best_effort(&state);
            return Err(AnswerError::RateLimit(format!(
                "本小时配额已用完 ({}/{} 次)",
                state.hourly_count, self.per_hour
            )));
        }

        state.request_history.push(now_ms);
        if state.hourly_window_start == 0 {
            state.hourly_window_start = now_ms;
        }
        state.hourly_count += 1;

        debug!(
            "限流准入通过: 分钟窗口 {}/{}, 小时 {}/{}",
            state.request_history.len(),
            self.per_minute,
            state.hourly_count,
            self.per_hour
        );

        self.save_best_effort(&state);
        Ok(())
    }

    /// 分钟级拒绝消息：附带剩余等待时间
    fn minute_message(&self, state: &PersistedState, now_ms: i64) -> String {
        let wait_ms = state
            .request_history
            .first()
            .map(|&oldest| (oldest + MINUTE_WINDOW_MS - now_ms).max(0))
            .unwrap_or(0);
        format!(
            "每分钟最多 {} 次请求，请等待约 {} 秒",
            self.per_minute,
            (wait_ms + 999) / 1000
        )
    }

    /// 状态写回失败不影响准入结果，只记日志
    fn save_best_effort(&self, state: &PersistedState) {
        if let Err(e) = self.store.save(state) {
            tracing::warn!("⚠️ 限流状态写回失败: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_limiter(name: &str, per_minute: usize, per_hour: usize) -> RateLimiter {
        let path = std::env::temp_dir().join(format!(
            "mcq_limiter_{}_{}.json",
            name,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        RateLimiter::new(StateStore::new(path), per_minute, per_hour)
    }

    #[test]
    fn test_minute_cap_rejects_excess_call() {
        let limiter = temp_limiter("minute_cap", 3, 100);
        let base = 1_000_000;

        // 窗口内第 N 次之前全部通过
        for i in 0..3 {
            limiter.admit(base + i * 1000).expect("容量内应当通过");
        }
        // 同一窗口内第 N+1 次被拒绝，且不发任何网络请求
        let err = limiter.admit(base + 10_000).unwrap_err();
        assert!(matches!(err, AnswerError::RateLimit(_)));
    }

    #[test]
    fn test_minute_window_slides() {
        let limiter = temp_limiter("window_slides", 2, 100);
        let base = 1_000_000;
        limiter.admit(base).unwrap();
        limiter.admit(base + 1000).unwrap();
        assert!(limiter.admit(base + 2000).is_err());

        // 一分钟后最早的记录滑出窗口，重新放行
        limiter.admit(base + MINUTE_WINDOW_MS + 500).expect("窗口滑动后应当通过");
    }

    #[test]
    fn test_hour_cap_rejects() {
        let limiter = temp_limiter("hour_cap", 100, 2);
        let base = 1_000_000;
        limiter.admit(base).unwrap();
        // 分散在不同的分钟窗口里，只触发小时上限
        limiter.admit(base + 2 * MINUTE_WINDOW_MS).unwrap();
        let err = limiter.admit(base + 4 * MINUTE_WINDOW_MS).unwrap_err();
        match err {
            AnswerError::RateLimit(msg) => assert!(msg.contains("小时")),
            _ => panic!("应当是限流错误"),
        }
    }

    #[test]
    fn test_hour_window_resets_by_wall_clock() {
        let limiter = temp_limiter("hour_reset", 100, 1);
        let base = 1_000_000;
        limiter.admit(base).unwrap();
        assert!(limiter.admit(base + 2 * MINUTE_WINDOW_MS).is_err());

        // 一小时后计数器按墙上时钟重置
        limiter
            .admit(base + crate::state::HOUR_WINDOW_MS + 1000)
            .expect("小时窗口重置后应当通过");
    }

    #[test]
    fn test_quota_survives_new_instance() {
        // 新实例读取同一状态文件：配额按安装实例计，不按循环实例计
        let path = std::env::temp_dir().join(format!("mcq_limiter_shared_{}.json", std::process::id()));
        let _ = fs::remove_file(&path);
        let base = 1_000_000;

        let first = RateLimiter::new(StateStore::new(path.clone()), 2, 100);
        first.admit(base).unwrap();
        first.admit(base + 100).unwrap();

        let second = RateLimiter::new(StateStore::new(path.clone()), 2, 100);
        assert!(second.admit(base + 200).is_err());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_rejection_does_not_consume_quota() {
        let limiter = temp_limiter("no_consume", 1, 100);
        let base = 1_000_000;
        limiter.admit(base).unwrap();
        assert!(limiter.admit(base + 100).is_err());
        assert!(limiter.admit(base + 200).is_err());

        // 窗口滑动后仍只有一条记录，被拒绝的调用没有占用配额
        limiter.admit(base + MINUTE_WINDOW_MS + 200).expect("应当恢复");
    }
}
