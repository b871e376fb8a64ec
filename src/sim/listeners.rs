//! 监听器
//!
//! 时钟推进、仿真开始、暂停以及每个事件处理完成时的回调。

use super::event::SimEvent;
use super::time::SimTime;

/// 订阅句柄，用于取消订阅
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

type TimeListener = Box<dyn FnMut(SimTime)>;
type EventListener = Box<dyn FnMut(&SimEvent)>;

#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    clock_tick: Vec<(ListenerId, TimeListener)>,
    start: Vec<(ListenerId, TimeListener)>,
    pause: Vec<(ListenerId, TimeListener)>,
    event: Vec<(ListenerId, EventListener)>,
}

impl Listeners {
    fn mint(&mut self) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn add_clock_tick(&mut self, f: TimeListener) -> ListenerId {
        let id = self.mint();
        self.clock_tick.push((id, f));
        id
    }

    pub(crate) fn add_start(&mut self, f: TimeListener) -> ListenerId {
        let id = self.mint();
        self.start.push((id, f));
        id
    }

    pub(crate) fn add_pause(&mut self, f: TimeListener) -> ListenerId {
        let id = self.mint();
        self.pause.push((id, f));
        id
    }

    pub(crate) fn add_event(&mut self, f: EventListener) -> ListenerId {
        let id = self.mint();
        self.event.push((id, f));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.len();
        self.clock_tick.retain(|(l, _)| *l != id);
        self.start.retain(|(l, _)| *l != id);
        self.pause.retain(|(l, _)| *l != id);
        self.event.retain(|(l, _)| *l != id);
        self.len() != before
    }

    fn len(&self) -> usize {
        self.clock_tick.len() + self.start.len() + self.pause.len() + self.event.len()
    }

    pub(crate) fn has_event_listeners(&self) -> bool {
        !self.event.is_empty()
    }

    pub(crate) fn notify_clock_tick(&mut self, t: SimTime) {
        for (_, f) in &mut self.clock_tick {
            f(t);
        }
    }

    pub(crate) fn notify_start(&mut self, t: SimTime) {
        for (_, f) in &mut self.start {
            f(t);
        }
    }

    pub(crate) fn notify_pause(&mut self, t: SimTime) {
        for (_, f) in &mut self.pause {
            f(t);
        }
    }

    pub(crate) fn notify_event(&mut self, ev: &SimEvent) {
        for (_, f) in &mut self.event {
            f(ev);
        }
    }
}

/// 最近两个不同时钟值的环形缓冲。
///
/// 时钟真正前进时返回较旧的那个值：此时该时刻的所有事件都已处理完。
#[derive(Debug, Default)]
pub(crate) struct ClockTicks {
    slots: [Option<SimTime>; 2],
}

impl ClockTicks {
    pub(crate) fn record(&mut self, now: SimTime) -> Option<SimTime> {
        if self.slots[1] == Some(now) {
            return None;
        }
        self.slots[0] = self.slots[1];
        self.slots[1] = Some(now);
        self.slots[0]
    }
}
