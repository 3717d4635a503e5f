//! 运行期间共享的计数器和取消标志

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// 已翻译单元计数
///
/// 测试模式下带有上限：每翻译一个单元前先 [`try_reserve`](Self::try_reserve) 占一个名额，
/// 翻译失败再 [`release`](Self::release) 归还，所以成功翻译的总数永远不会超过上限。
#[derive(Debug, Default)]
pub struct RunCounters {
    limit: Option<usize>,
    translated: Mutex<usize>,
}

impl RunCounters {
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            limit,
            translated: Mutex::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// 占用一个名额，额度用尽时返回 `false`
    pub fn try_reserve(&self) -> bool {
        let mut translated = self.translated.lock().unwrap_or_else(|e| e.into_inner());
        if self.limit.is_some_and(|limit| *translated >= limit) {
            return false;
        }
        *translated += 1;
        true
    }

    /// 归还一个名额
    pub fn release(&self) {
        let mut translated = self.translated.lock().unwrap_or_else(|e| e.into_inner());
        *translated = translated.saturating_sub(1);
    }

    pub fn translated(&self) -> usize {
        *self.translated.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.translated() >= limit)
    }
}

/// 协作式取消标志
///
/// 不加锁，任何线程都可以设置；各处在多个检查点反复读取，最终都会停下来。
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_limit_is_never_exceeded() {
        let counters = RunCounters::new(Some(2));
        assert!(counters.try_reserve());
        assert!(counters.try_reserve());
        assert!(!counters.try_reserve());
        assert!(counters.is_exhausted());

        counters.release();
        assert_eq!(counters.translated(), 1);
        assert!(counters.try_reserve());
        assert_eq!(counters.translated(), 2);
    }

    #[test]
    fn test_unlimited_counts_everything() {
        let counters = RunCounters::unlimited();
        for _ in 0..100 {
            assert!(counters.try_reserve());
        }
        assert_eq!(counters.translated(), 100);
        assert!(!counters.is_exhausted());
    }

    #[test]
    fn test_concurrent_reservations_respect_limit() {
        let counters = Arc::new(RunCounters::new(Some(50)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counters = Arc::clone(&counters);
                thread::spawn(move || (0..20).filter(|_| counters.try_reserve()).count())
            })
            .collect();

        let granted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(granted, 50);
        assert_eq!(counters.translated(), 50);
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());

        thread::spawn(move || flag.cancel()).join().unwrap();
        assert!(observer.is_cancelled());
    }
}
