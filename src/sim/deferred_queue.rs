//! 延迟事件队列
//!
//! 已投递但目的实体尚未消费的事件，按到达顺序保存。

use super::entity::EntityId;
use super::event::SimEvent;
use super::predicate::Predicate;
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct DeferredQueue {
    events: VecDeque<SimEvent>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, ev: SimEvent) {
        self.events.push_back(ev);
    }

    fn position(&self, dst: EntityId, pred: &Predicate) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.dst == Some(dst) && pred.matches(e))
    }

    /// 取出发给 `dst` 且满足谓词的第一个事件
    pub fn select(&mut self, dst: EntityId, pred: &Predicate) -> Option<SimEvent> {
        let pos = self.position(dst, pred)?;
        self.events.remove(pos)
    }

    /// 查看（不取出）发给 `dst` 且满足谓词的第一个事件
    pub fn find_first(&self, dst: EntityId, pred: &Predicate) -> Option<&SimEvent> {
        self.position(dst, pred).and_then(|pos| self.events.get(pos))
    }

    /// 统计发给 `dst` 且满足谓词的事件数
    pub fn count(&self, dst: EntityId, pred: &Predicate) -> usize {
        self.events
            .iter()
            .filter(|e| e.dst == Some(dst) && pred.matches(e))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
