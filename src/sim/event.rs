//! 仿真事件
//!
//! 事件记录一次被调度的动作：触发时间、源/目的实体、标签、负载和插入序号。

use super::entity::EntityId;
use super::tag::Tag;
use super::time::SimTime;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 普通消息投递
    Send,
    /// 实体 hold 结束，源实体恢复 RUNNABLE
    HoldDone,
    /// 运行中动态加入的实体需要启动
    Create,
    /// 非法事件；到达派发器即为致命错误
    Null,
}

/// 不透明负载。内核只负责搬运，不解释内容。
#[derive(Clone, Default)]
pub struct Payload(Option<Rc<dyn Any>>);

impl Payload {
    pub fn none() -> Self {
        Payload(None)
    }

    pub fn new<T: Any>(value: T) -> Self {
        Payload(Some(Rc::new(value)))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn get<T: Any>(&self) -> Option<&T> {
        self.0.as_deref().and_then(|v| v.downcast_ref::<T>())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "Payload(..)"),
            None => write!(f, "Payload(none)"),
        }
    }
}

/// 一个仿真事件。
///
/// `serial` 在进入未来队列时分配，严格递增，仅用于同一时间下的稳定排序。
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub kind: EventKind,
    pub time: SimTime,
    pub src: Option<EntityId>,
    pub dst: Option<EntityId>,
    pub tag: Tag,
    pub data: Payload,
    pub serial: u64,
}

impl SimEvent {
    /// 创建一个尚未入队的事件（serial 由队列分配）
    pub fn new(
        kind: EventKind,
        time: SimTime,
        src: Option<EntityId>,
        dst: Option<EntityId>,
        tag: Tag,
        data: Payload,
    ) -> Self {
        Self {
            kind,
            time,
            src,
            dst,
            tag,
            data,
            serial: 0,
        }
    }

    /// 读取负载并向下转型
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.get::<T>()
    }

    pub fn is_tag(&self, tag: Tag) -> bool {
        self.tag == tag
    }
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}#{}@{} tag={} {:?}->{:?}",
            self.kind, self.serial, self.time, self.tag, self.src, self.dst
        )
    }
}
