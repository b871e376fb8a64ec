//! 内核错误类型

use super::entity::EntityId;
use super::time::SimTime;
use thiserror::Error;

/// 内核错误。
///
/// 除 `Entity`/`Config`/`Json`/`Io` 外均为不变量被破坏（协作者的编程错误），
/// 出现后 `start()` 立即返回该错误并停止仿真。
#[derive(Debug, Error)]
pub enum SimError {
    #[error("event #{serial} at {time} is before the current clock {clock}")]
    EventInPast {
        serial: u64,
        time: SimTime,
        clock: SimTime,
    },

    #[error("HOLD_DONE event #{serial} has no source entity")]
    HoldWithoutSource { serial: u64 },

    #[error("SEND event #{serial} has no destination entity")]
    SendWithoutDestination { serial: u64 },

    #[error("CREATE event #{serial} has no entity to start")]
    CreateWithoutEntity { serial: u64 },

    #[error("event #{serial} has NULL type")]
    NullEvent { serial: u64 },

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("invalid delay {0}: must be finite and non-negative")]
    InvalidDelay(f64),

    #[error("simulation has already been started; use resume() to continue a paused run")]
    AlreadyStarted,

    #[error("entity {entity} failed: {message}")]
    Entity { entity: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// 协作者在 `process_event` 中报告失败的便捷构造
    pub fn entity(entity: impl Into<String>, message: impl Into<String>) -> Self {
        SimError::Entity {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
