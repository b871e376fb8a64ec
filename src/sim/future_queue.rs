//! 未来事件队列
//!
//! 尚未到期的事件，按 `(time, 层级, 序号)` 升序。优先事件（负标签，或通过
//! `add_event_first` 插入）只在同一时间点内排到普通事件之前，且后插入者在前；
//! 它们从不越过更早时间的事件，时钟因此保持单调。

use super::event::SimEvent;
use super::time::SimTime;
use std::collections::BTreeMap;

/// 同一时间点内的层级：优先层排在普通层之前
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    First,
    Normal,
}

/// 排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct EventKey {
    at: SimTime,
    tier: Tier,
    /// 普通层为 serial；优先层为 `u64::MAX - serial`，后插入者在前
    rank: u64,
}

impl EventKey {
    fn new(ev: &SimEvent, tier: Tier) -> Self {
        let rank = match tier {
            Tier::First => u64::MAX - ev.serial,
            Tier::Normal => ev.serial,
        };
        Self {
            at: ev.time,
            tier,
            rank,
        }
    }

    /// 某个时间点上最小的键
    fn start_of(at: SimTime) -> Self {
        Self {
            at,
            tier: Tier::First,
            rank: 0,
        }
    }
}

/// 未来事件队列
#[derive(Debug, Default)]
pub struct FutureQueue {
    events: BTreeMap<EventKey, SimEvent>,
    next_serial: u64,
}

impl FutureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, mut ev: SimEvent, tier: Tier) {
        ev.serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        self.events.insert(EventKey::new(&ev, tier), ev);
    }

    /// 插入事件；优先标签的事件排到同一时间点的最前面
    pub fn add_event(&mut self, ev: SimEvent) {
        let tier = if ev.tag.is_priority() {
            Tier::First
        } else {
            Tier::Normal
        };
        self.insert(ev, tier);
    }

    /// 强制插到同一时间点的所有事件之前
    pub fn add_event_first(&mut self, ev: SimEvent) {
        self.insert(ev, Tier::First);
    }

    /// 队首事件
    pub fn first(&self) -> Option<&SimEvent> {
        self.events.values().next()
    }

    /// 弹出队首事件
    pub fn pop_first(&mut self) -> Option<SimEvent> {
        self.events.pop_first().map(|(_, ev)| ev)
    }

    /// 取出（按队列顺序）第一个时间恰好等于 `at` 的事件
    pub fn remove_first_at(&mut self, at: SimTime) -> Option<SimEvent> {
        let key = *self
            .events
            .range(EventKey::start_of(at)..)
            .next()
            .map(|(k, _)| k)
            .filter(|k| k.at == at)?;
        self.events.remove(&key)
    }

    /// 按 serial 删除指定事件
    pub fn remove(&mut self, ev: &SimEvent) -> bool {
        self.remove_first_match(|e| e.serial == ev.serial).is_some()
    }

    /// 删除第一个满足条件的事件
    pub fn remove_first_match(&mut self, mut pred: impl FnMut(&SimEvent) -> bool) -> Option<SimEvent> {
        let key = self
            .events
            .iter()
            .find(|(_, e)| pred(e))
            .map(|(k, _)| *k)?;
        self.events.remove(&key)
    }

    /// 删除所有满足条件的事件，返回被删除的事件（按队列顺序）
    pub fn remove_if(&mut self, mut pred: impl FnMut(&SimEvent) -> bool) -> Vec<SimEvent> {
        let keys: Vec<EventKey> = self
            .events
            .iter()
            .filter(|(_, e)| pred(e))
            .map(|(k, _)| *k)
            .collect();
        keys.iter()
            .filter_map(|key| self.events.remove(key))
            .collect()
    }

    /// 丢弃所有晚于 `at` 的事件，返回丢弃数量
    pub fn discard_after(&mut self, at: SimTime) -> usize {
        self.remove_if(|e| e.time > at).len()
    }

    /// 按队列顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.values()
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
