//! 事件追踪记录（用于离线分析）
//!
//! 设计目标：
//! - **结构化**：每个被派发的事件记录为一条 JSON，而不是解析文本日志
//! - **轻量**：只依赖内核的事件处理监听器，不侵入主循环

mod types;

pub use types::{TraceLogger, TraceRecord, attach};
