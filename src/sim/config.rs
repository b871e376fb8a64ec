//! 内核配置

use super::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 没有协作者注册调度间隔时使用的最小时间步长
pub const DEFAULT_MIN_TIME_BETWEEN_EVENTS: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// 无事件时向终止时间推进时钟的兜底步长（秒）
    pub min_time_between_events: f64,
    /// 若设置，仿真开始时等价于调用 `terminate_at`
    pub termination_time: Option<f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            min_time_between_events: DEFAULT_MIN_TIME_BETWEEN_EVENTS,
            termination_time: None,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.min_time_between_events.is_finite() && self.min_time_between_events > 0.0) {
            return Err(SimError::Config(format!(
                "min_time_between_events must be positive, got {}",
                self.min_time_between_events
            )));
        }
        if let Some(t) = self.termination_time {
            if !(t.is_finite() && t > 0.0) {
                return Err(SimError::Config(format!(
                    "termination_time must be positive, got {t}"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(raw: &str) -> SimResult<Self> {
        let cfg: SimConfig = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
