//! 跨线程控制句柄
//!
//! 仿真本身是单线程的；唯一需要跨线程协作的是暂停/恢复。暂停时驱动线程
//! 阻塞在条件变量上，直到其他线程调用 `resume()`（或 `abort()`）。

use super::time::SimTime;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// 其他线程或监听器发起、等待主循环在 tick 边界接收的暂停请求
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PauseRequest {
    /// 在接收时的当前时钟暂停
    Now,
    At(SimTime),
}

#[derive(Debug, Default)]
struct ControlFlags {
    pause_request: Option<PauseRequest>,
    paused: bool,
    paused_at: Option<SimTime>,
    abort: bool,
    terminate: bool,
}

#[derive(Debug, Default)]
struct ControlShared {
    flags: Mutex<ControlFlags>,
    cv: Condvar,
}

/// 可克隆、可跨线程传递的控制句柄
#[derive(Debug, Clone, Default)]
pub struct SimulationControl {
    shared: Arc<ControlShared>,
}

impl SimulationControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn flags(&self) -> MutexGuard<'_, ControlFlags> {
        self.shared
            .flags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 恢复已暂停的仿真；未暂停时返回 false
    pub fn resume(&self) -> bool {
        let mut flags = self.flags();
        if !flags.paused {
            return false;
        }
        flags.paused = false;
        flags.paused_at = None;
        self.shared.cv.notify_all();
        debug!("resume requested");
        true
    }

    /// 请求在主循环下一个 tick 边界暂停
    pub fn pause(&self) {
        self.flags().pause_request = Some(PauseRequest::Now);
    }

    /// 请求在指定仿真时间暂停。
    ///
    /// 请求在下一个 tick 边界才被接收；届时若已早于时钟则被忽略。
    pub fn pause_at(&self, at: SimTime) -> bool {
        if !at.is_valid() {
            return false;
        }
        self.flags().pause_request = Some(PauseRequest::At(at));
        true
    }

    /// 取出尚未接收的暂停请求（仅由仿真线程调用）
    pub(crate) fn take_pause_request(&self) -> Option<PauseRequest> {
        self.flags().pause_request.take()
    }

    /// 请求立即中止：跳过结束通知，也会唤醒暂停中的循环
    pub fn abort(&self) {
        let mut flags = self.flags();
        flags.abort = true;
        self.shared.cv.notify_all();
    }

    /// 请求在下一个 tick 边界停止
    pub fn terminate(&self) {
        self.flags().terminate = true;
    }

    pub fn is_paused(&self) -> bool {
        self.flags().paused
    }

    /// 当前暂停所处的仿真时间
    pub fn paused_at(&self) -> Option<SimTime> {
        self.flags().paused_at
    }

    pub fn is_abort_requested(&self) -> bool {
        self.flags().abort
    }

    pub fn is_terminate_requested(&self) -> bool {
        self.flags().terminate
    }

    /// 阻塞直到仿真进入暂停，返回暂停时的仿真时间。
    /// 若仿真在此期间被中止则返回 None。
    pub fn wait_until_paused(&self) -> Option<SimTime> {
        let guard = self.flags();
        let flags = self
            .shared
            .cv
            .wait_while(guard, |f| !f.paused && !f.abort)
            .unwrap_or_else(PoisonError::into_inner);
        if flags.paused { flags.paused_at } else { None }
    }

    /// 进入暂停（仅由仿真线程调用）
    pub(crate) fn enter_pause(&self, at: SimTime) {
        let mut flags = self.flags();
        flags.paused = true;
        flags.paused_at = Some(at);
        self.shared.cv.notify_all();
    }

    /// 阻塞仿真线程直到恢复或中止
    pub(crate) fn block_while_paused(&self) {
        let guard = self.flags();
        let mut flags = self
            .shared
            .cv
            .wait_while(guard, |f| f.paused && !f.abort)
            .unwrap_or_else(PoisonError::into_inner);
        flags.paused = false;
        flags.paused_at = None;
    }
}
