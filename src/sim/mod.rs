//! 仿真内核模块
//!
//! 此模块包含离散事件仿真内核：仿真时间、事件、未来/延迟队列、实体运行时、
//! 谓词等待、暂停/恢复/终止控制以及驱动一切的主循环。

// 子模块声明
mod config;
mod context;
mod control;
mod deferred_queue;
mod entity;
mod error;
mod event;
mod future_queue;
mod listeners;
mod predicate;
mod simulation;
mod tag;
mod time;

// 重新导出公共接口
pub use config::{DEFAULT_MIN_TIME_BETWEEN_EVENTS, SimConfig};
pub use context::SimContext;
pub use control::SimulationControl;
#[cfg(test)]
pub(crate) use control::PauseRequest;
pub use deferred_queue::DeferredQueue;
pub use entity::{EntityId, EntityState, SimEntity};
pub use error::{SimError, SimResult};
pub use event::{EventKind, Payload, SimEvent};
pub use future_queue::FutureQueue;
pub use listeners::ListenerId;
pub use predicate::Predicate;
pub use simulation::{Simulation, StopReason};
pub use tag::Tag;
pub use time::SimTime;
