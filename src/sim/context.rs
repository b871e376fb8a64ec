//! 实体上下文
//!
//! 内核调用实体钩子时注入的句柄：以调用者身份访问时钟、发送/调度事件、
//! 等待与挑选事件、注册新实体以及控制仿真。

use super::entity::{EntityId, EntityState, SimEntity};
use super::error::SimResult;
use super::event::{Payload, SimEvent};
use super::predicate::Predicate;
use super::simulation::Simulation;
use super::tag::Tag;
use super::time::SimTime;
use std::any::Any;

pub struct SimContext<'a> {
    pub(crate) sim: &'a mut Simulation,
    me: EntityId,
}

impl<'a> SimContext<'a> {
    pub(crate) fn new(sim: &'a mut Simulation, me: EntityId) -> Self {
        Self { sim, me }
    }

    /// 当前实体的 id
    pub fn id(&self) -> EntityId {
        self.me
    }

    pub fn name(&self) -> &str {
        self.sim.entity_name(self.me).unwrap_or_default()
    }

    pub fn state(&self) -> EntityState {
        self.sim
            .entity_state(self.me)
            .unwrap_or(EntityState::Finished)
    }

    pub fn clock(&self) -> SimTime {
        self.sim.clock()
    }

    /// 只读访问内核（查询实体名、队列长度等）
    pub fn simulation(&self) -> &Simulation {
        self.sim
    }

    // ── 发送 ─────────────────────────────────────────────

    pub fn send(&mut self, dst: EntityId, delay: f64, tag: Tag, data: Payload) -> SimResult<()> {
        self.sim.send(Some(self.me), dst, delay, tag, data)
    }

    pub fn send_now(&mut self, dst: EntityId, tag: Tag, data: Payload) -> SimResult<()> {
        self.sim.send_now(Some(self.me), dst, tag, data)
    }

    pub fn send_first(&mut self, dst: EntityId, delay: f64, tag: Tag, data: Payload) -> SimResult<()> {
        self.sim.send_first(Some(self.me), dst, delay, tag, data)
    }

    /// 以自己为源、无负载地发送
    pub fn schedule(&mut self, dst: EntityId, delay: f64, tag: Tag) -> SimResult<()> {
        self.send(dst, delay, tag, Payload::none())
    }

    pub fn schedule_data<T: Any>(&mut self, dst: EntityId, delay: f64, tag: Tag, data: T) -> SimResult<()> {
        self.send(dst, delay, tag, Payload::new(data))
    }

    pub fn schedule_now(&mut self, dst: EntityId, tag: Tag) -> SimResult<()> {
        self.send_now(dst, tag, Payload::none())
    }

    /// 给自己发事件
    pub fn schedule_self(&mut self, delay: f64, tag: Tag) -> SimResult<()> {
        self.send(self.me, delay, tag, Payload::none())
    }

    // ── 状态切换 ─────────────────────────────────────────

    /// 挂起 `delay` 后恢复 RUNNABLE
    pub fn hold(&mut self, delay: f64) -> SimResult<()> {
        self.sim.hold(self.me, delay)
    }

    /// 等待满足谓词的事件
    pub fn wait(&mut self, pred: Predicate) -> SimResult<()> {
        self.sim.wait(self.me, pred)
    }

    // ── 延迟队列 ─────────────────────────────────────────

    pub fn select(&mut self, pred: &Predicate) -> Option<SimEvent> {
        self.sim.select(self.me, pred)
    }

    pub fn find_first_deferred(&self, pred: &Predicate) -> Option<&SimEvent> {
        self.sim.find_first_deferred(self.me, pred)
    }

    pub fn waiting(&self, pred: &Predicate) -> usize {
        self.sim.waiting(self.me, pred)
    }

    // ── 撤回 ─────────────────────────────────────────────

    pub fn cancel(&mut self, pred: &Predicate) -> Option<SimEvent> {
        self.sim.cancel(self.me, pred)
    }

    pub fn cancel_all(&mut self, pred: &Predicate) -> usize {
        self.sim.cancel_all(self.me, pred)
    }

    // ── 注册与配置 ───────────────────────────────────────

    /// 运行中注册新实体：立即分配 id，在当前时间通过 CREATE 事件启动
    pub fn add_entity<E: SimEntity + 'static>(&mut self, name: impl Into<String>, entity: E) -> EntityId {
        self.sim.add_entity(name, entity)
    }

    pub fn register_scheduling_interval(&mut self, interval: f64) -> bool {
        self.sim.register_scheduling_interval(interval)
    }

    pub fn min_time_between_events(&self) -> f64 {
        self.sim.min_time_between_events()
    }

    // ── 控制 ─────────────────────────────────────────────

    pub fn pause(&mut self) -> bool {
        self.sim.pause()
    }

    pub fn pause_at(&mut self, at: SimTime) -> bool {
        self.sim.pause_at(at)
    }

    pub fn terminate(&mut self) {
        self.sim.terminate();
    }

    pub fn terminate_at(&mut self, at: SimTime) -> bool {
        self.sim.terminate_at(at)
    }

    pub fn abort(&mut self) {
        self.sim.abort();
    }
}
