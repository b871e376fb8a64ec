//! 仿真实体
//!
//! 定义实体标识、状态机以及所有协作者都要实现的能力接口。

use super::context::SimContext;
use super::error::SimResult;
use super::event::SimEvent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 实体标识符（注册顺序下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 实体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Runnable,
    Waiting,
    Holding,
    Finished,
}

/// 实体接口：内核只依赖这三个生命周期钩子。
///
/// 所有钩子都由内核在仿真线程上同步调用，`ctx` 提供当前实体视角下的内核操作。
pub trait SimEntity {
    /// 仿真开始（或动态加入后被 CREATE 事件启动）时调用一次
    fn start_entity(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }

    /// 处理一个投递给本实体的事件
    fn process_event(&mut self, ev: SimEvent, ctx: &mut SimContext<'_>) -> SimResult<()>;

    /// 仿真结束时调用一次
    fn shutdown_entity(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }
}

/// 注册表中的一个实体槽位
pub(crate) struct EntitySlot {
    pub(crate) name: String,
    pub(crate) state: EntityState,
    pub(crate) started: bool,
    /// 实体 WAITING 时匹配到的事件，下次 run 时优先消费
    pub(crate) buffer: Option<SimEvent>,
    /// 钩子执行期间被取出，执行完放回
    pub(crate) body: Option<Box<dyn SimEntity>>,
}

impl EntitySlot {
    pub(crate) fn new(name: String, body: Box<dyn SimEntity>) -> Self {
        Self {
            name,
            state: EntityState::Runnable,
            started: false,
            buffer: None,
            body: Some(body),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state != EntityState::Finished
    }
}

impl fmt::Debug for EntitySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySlot")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("started", &self.started)
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}
