//! 翻译运行的核心调度
//!
//! - `counters` - 测试模式的单元计数和取消标志
//! - `progress` - 进度事件与通道
//! - `orchestrator` - 按后端并发策略调度文档任务，并按完成顺序写出结果

pub mod counters;
pub mod orchestrator;
pub mod progress;

pub use counters::{CancellationFlag, RunCounters};
pub use orchestrator::{
    DocumentJob, DocumentOutput, DocumentReport, Orchestrator, RunStatus, RunSummary,
};
pub use progress::{progress_channel, ProgressEvent, ProgressReceiver, ProgressSender};
