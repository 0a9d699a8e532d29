//! 扫描任务防重入

use std::sync::atomic::{AtomicBool, Ordering};

/// 扫描结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanReport {
    /// 上一轮仍在执行，本轮跳过
    Skipped,
    /// 扫描完成，`notified` 为成功发出的通知数
    Completed { notified: usize },
}

/// 非阻塞的防重入标记，每个扫描器实例独占一个
#[derive(Debug, Default)]
pub struct ScanGuard {
    running: AtomicBool,
}

impl ScanGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试进入；已有执行中的扫描时返回 None
    pub fn try_acquire(&self) -> Option<ScanGuardToken<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanGuardToken { guard: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// 持有期间扫描视为执行中，释放时自动复位
#[derive(Debug)]
pub struct ScanGuardToken<'a> {
    guard: &'a ScanGuard,
}

impl Drop for ScanGuardToken<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_rejected_until_release() {
        let guard = ScanGuard::new();
        let token = guard.try_acquire();
        assert!(token.is_some());
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(token);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_guards_are_independent() {
        let alert = ScanGuard::new();
        let sleep = ScanGuard::new();
        let _alert_token = alert.try_acquire().unwrap();
        assert!(sleep.try_acquire().is_some());
    }
}
