//! 跨线程停止信号
//!
//! 循环只在节拍边界检查信号，日志中永远只有完整的节拍。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 停止信号（可克隆，所有克隆共享同一标志）
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// 是否已请求停止
    pub fn is_stop_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let signal = StopSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_stop_requested());

        std::thread::spawn(move || handle.request_stop()).join().unwrap();
        assert!(signal.is_stop_requested());
    }
}
