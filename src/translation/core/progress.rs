//! 进度事件
//!
//! 调度器通过有界通道把 `(百分比, 消息)` 发给前端。通道满时发送方等待，
//! 进度不会丢失，前端必须持续接收。

use tokio::sync::mpsc;

use crate::translation::config::constants;

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 0.0 - 100.0
    pub percent: f32,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(percent: f32, message: impl Into<String>) -> Self {
        Self {
            percent: percent.clamp(0.0, 100.0),
            message: message.into(),
        }
    }
}

pub type ProgressSender = mpsc::Sender<ProgressEvent>;
pub type ProgressReceiver = mpsc::Receiver<ProgressEvent>;

/// 创建默认容量的进度通道
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(constants::DEFAULT_PROGRESS_CAPACITY)
}

/// 完成比例换算成百分比
pub fn percent_of(completed: usize, total: usize) -> f32 {
    if total == 0 {
        return 100.0;
    }
    completed as f32 / total as f32 * 100.0
}
