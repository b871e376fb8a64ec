//! 仿真内核
//!
//! 持有仿真时钟、未来/延迟队列、实体注册表与主循环。
//!
//! 一个 tick：
//! 1. 依注册顺序运行所有 RUNNABLE 实体（按下标遍历，允许中途追加实体）；
//! 2. 取未来队列中最早的事件，时钟前进到该时间，并处理所有同一时间的事件；
//! 3. 没有可处理事件但设置了终止时间时，按最小调度步长合成推进时钟。

use super::config::SimConfig;
use super::context::SimContext;
use super::control::{PauseRequest, SimulationControl};
use super::deferred_queue::DeferredQueue;
use super::entity::{EntityId, EntitySlot, EntityState, SimEntity};
use super::error::{SimError, SimResult};
use super::event::{EventKind, Payload, SimEvent};
use super::future_queue::FutureQueue;
use super::listeners::{ClockTicks, ListenerId, Listeners};
use super::predicate::Predicate;
use super::tag::Tag;
use super::time::SimTime;
use std::collections::HashMap;
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running,
    Stopped,
}

/// 主循环结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 未来队列为空且没有待达的终止时间
    Natural,
    /// 调用了 `terminate()`
    Terminated,
    /// 时钟到达 `terminate_at` 指定的时间
    TerminatedAt,
    /// 调用了 `abort()`，跳过结束通知
    Aborted,
}

/// 离散事件仿真内核（一次性使用）
pub struct Simulation {
    config: SimConfig,
    clock: SimTime,
    phase: Phase,
    pub(crate) future: FutureQueue,
    deferred: DeferredQueue,
    pub(crate) entities: Vec<EntitySlot>,
    wait_predicates: HashMap<EntityId, Predicate>,
    listeners: Listeners,
    ticks: ClockTicks,
    control: SimulationControl,
    pause_at: Option<SimTime>,
    terminate_at: Option<SimTime>,
    min_scheduling_interval: Option<f64>,
    events_processed: u64,
    stop_reason: Option<StopReason>,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            clock: SimTime::ZERO,
            phase: Phase::NotStarted,
            future: FutureQueue::new(),
            deferred: DeferredQueue::new(),
            entities: Vec::new(),
            wait_predicates: HashMap::new(),
            listeners: Listeners::default(),
            ticks: ClockTicks::default(),
            control: SimulationControl::new(),
            pause_at: None,
            terminate_at: None,
            min_scheduling_interval: None,
            events_processed: 0,
            stop_reason: None,
        }
    }

    // ── 查询 ─────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// 当前仿真时间
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// 获取跨线程控制句柄（用于在其他线程 resume/abort）
    pub fn control(&self) -> SimulationControl {
        self.control.clone()
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.control.is_paused()
    }

    pub fn is_aborted(&self) -> bool {
        self.stop_reason == Some(StopReason::Aborted)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(
            self.stop_reason,
            Some(StopReason::Terminated | StopReason::TerminatedAt)
        )
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// 已派发的事件数
    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    pub fn num_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn entity_name(&self, id: EntityId) -> Option<&str> {
        self.entities.get(id.0).map(|s| s.name.as_str())
    }

    pub fn entity_state(&self, id: EntityId) -> Option<EntityState> {
        self.entities.get(id.0).map(|s| s.state)
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn min_time_between_events(&self) -> f64 {
        self.config.min_time_between_events
    }

    /// 协作者（如数据中心）登记自己的周期调度间隔；非正数或非有限值被忽略
    pub fn register_scheduling_interval(&mut self, interval: f64) -> bool {
        if !(interval.is_finite() && interval > 0.0) {
            return false;
        }
        self.min_scheduling_interval = Some(match self.min_scheduling_interval {
            Some(cur) => cur.min(interval),
            None => interval,
        });
        true
    }

    /// 无事件时合成推进时钟所用的步长
    pub fn min_scheduling_step(&self) -> f64 {
        self.min_scheduling_interval
            .unwrap_or(self.config.min_time_between_events)
    }

    // ── 实体注册 ─────────────────────────────────────────

    /// 注册实体并立即分配 id。
    ///
    /// 仿真运行中注册的实体不会被同步启动，而是在当前时间放入一个 CREATE 事件。
    pub fn add_entity<E: SimEntity + 'static>(&mut self, name: impl Into<String>, entity: E) -> EntityId {
        self.add_boxed_entity(name.into(), Box::new(entity))
    }

    pub fn add_boxed_entity(&mut self, name: String, entity: Box<dyn SimEntity>) -> EntityId {
        let id = EntityId(self.entities.len());
        debug!(entity = %name, id = %id, running = self.is_running(), "注册实体");
        self.entities.push(EntitySlot::new(name, entity));
        if self.phase == Phase::Running {
            self.future.add_event(SimEvent::new(
                EventKind::Create,
                self.clock,
                None,
                Some(id),
                Tag::NONE,
                Payload::none(),
            ));
        }
        id
    }

    fn check_entity(&self, id: EntityId) -> SimResult<()> {
        if id.0 < self.entities.len() {
            Ok(())
        } else {
            Err(SimError::UnknownEntity(id))
        }
    }

    fn check_delay(delay: f64) -> SimResult<()> {
        if delay.is_finite() && delay >= 0.0 {
            Ok(())
        } else {
            Err(SimError::InvalidDelay(delay))
        }
    }

    fn slot_mut(&mut self, id: EntityId) -> SimResult<&mut EntitySlot> {
        self.entities
            .get_mut(id.0)
            .ok_or(SimError::UnknownEntity(id))
    }

    // ── 事件调度 ─────────────────────────────────────────

    fn make_send(
        &self,
        src: Option<EntityId>,
        dst: EntityId,
        delay: f64,
        tag: Tag,
        data: Payload,
    ) -> SimResult<SimEvent> {
        Self::check_delay(delay)?;
        self.check_entity(dst)?;
        if let Some(src) = src {
            self.check_entity(src)?;
        }
        Ok(SimEvent::new(
            EventKind::Send,
            self.clock.plus(delay),
            src,
            Some(dst),
            tag,
            data,
        ))
    }

    /// 在 `clock + delay` 向 `dst` 发送事件
    pub fn send(
        &mut self,
        src: Option<EntityId>,
        dst: EntityId,
        delay: f64,
        tag: Tag,
        data: Payload,
    ) -> SimResult<()> {
        let ev = self.make_send(src, dst, delay, tag, data)?;
        trace!(at = %ev.time, tag = %tag, ?src, dst = %dst, "调度 SEND 事件");
        self.future.add_event(ev);
        Ok(())
    }

    /// 以零延迟发送
    pub fn send_now(&mut self, src: Option<EntityId>, dst: EntityId, tag: Tag, data: Payload) -> SimResult<()> {
        self.send(src, dst, 0.0, tag, data)
    }

    /// 发送优先事件：在到期时间点上排在所有普通事件之前
    pub fn send_first(
        &mut self,
        src: Option<EntityId>,
        dst: EntityId,
        delay: f64,
        tag: Tag,
        data: Payload,
    ) -> SimResult<()> {
        let ev = self.make_send(src, dst, delay, tag, data)?;
        trace!(at = %ev.time, tag = %tag, ?src, dst = %dst, "调度优先 SEND 事件");
        self.future.add_event_first(ev);
        Ok(())
    }

    /// 挂起 `src` 一段时间：调度发给自己的 HOLD_DONE，并进入 HOLDING
    pub fn hold(&mut self, src: EntityId, delay: f64) -> SimResult<()> {
        Self::check_delay(delay)?;
        self.check_entity(src)?;
        let ev = SimEvent::new(
            EventKind::HoldDone,
            self.clock.plus(delay),
            Some(src),
            Some(src),
            Tag::NONE,
            Payload::none(),
        );
        self.future.add_event(ev);
        self.slot_mut(src)?.state = EntityState::Holding;
        Ok(())
    }

    /// 让 `src` 等待满足谓词的事件。
    ///
    /// 若延迟队列中已有匹配事件，直接放入缓冲区并保持 RUNNABLE。
    pub fn wait(&mut self, src: EntityId, pred: Predicate) -> SimResult<()> {
        self.check_entity(src)?;
        if self.entities[src.0].buffer.is_none() {
            if let Some(ev) = self.deferred.select(src, &pred) {
                let slot = &mut self.entities[src.0];
                slot.buffer = Some(ev);
                slot.state = EntityState::Runnable;
                self.wait_predicates.remove(&src);
                return Ok(());
            }
        }
        self.entities[src.0].state = EntityState::Waiting;
        if pred.is_any() {
            self.wait_predicates.remove(&src);
        } else {
            self.wait_predicates.insert(src, pred);
        }
        Ok(())
    }

    /// 取出延迟队列中发给 `dst` 且匹配的第一个事件
    pub fn select(&mut self, dst: EntityId, pred: &Predicate) -> Option<SimEvent> {
        self.deferred.select(dst, pred)
    }

    /// 查看（不取出）延迟队列中发给 `dst` 且匹配的第一个事件
    pub fn find_first_deferred(&self, dst: EntityId, pred: &Predicate) -> Option<&SimEvent> {
        self.deferred.find_first(dst, pred)
    }

    /// 延迟队列中发给 `dst` 且匹配的事件数
    pub fn waiting(&self, dst: EntityId, pred: &Predicate) -> usize {
        self.deferred.count(dst, pred)
    }

    /// 撤回 `src` 发出的、尚未处理的第一个匹配事件
    pub fn cancel(&mut self, src: EntityId, pred: &Predicate) -> Option<SimEvent> {
        self.future
            .remove_first_match(|e| e.src == Some(src) && pred.matches(e))
    }

    /// 撤回 `src` 发出的所有匹配事件，返回撤回数量
    pub fn cancel_all(&mut self, src: EntityId, pred: &Predicate) -> usize {
        self.future
            .remove_if(|e| e.src == Some(src) && pred.matches(e))
            .len()
    }

    // ── 监听器 ───────────────────────────────────────────

    /// 时钟真正前进时通知（参数为刚刚处理完的时间点）
    pub fn on_clock_tick(&mut self, f: impl FnMut(SimTime) + 'static) -> ListenerId {
        self.listeners.add_clock_tick(Box::new(f))
    }

    pub fn on_simulation_start(&mut self, f: impl FnMut(SimTime) + 'static) -> ListenerId {
        self.listeners.add_start(Box::new(f))
    }

    pub fn on_simulation_pause(&mut self, f: impl FnMut(SimTime) + 'static) -> ListenerId {
        self.listeners.add_pause(Box::new(f))
    }

    pub fn on_event_processed(&mut self, f: impl FnMut(&SimEvent) + 'static) -> ListenerId {
        self.listeners.add_event(Box::new(f))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ── 暂停 / 终止 ──────────────────────────────────────

    /// 在当前时间暂停
    pub fn pause(&mut self) -> bool {
        self.pause_at(self.clock)
    }

    /// 在指定仿真时间暂停；早于当前时钟时返回 false
    pub fn pause_at(&mut self, at: SimTime) -> bool {
        if !at.is_valid() || at < self.clock {
            return false;
        }
        debug!(pause_at = %at, "请求暂停");
        self.pause_at = Some(at);
        true
    }

    pub fn resume(&self) -> bool {
        self.control.resume()
    }

    /// 在下一个 tick 边界停止
    pub fn terminate(&self) {
        self.control.terminate();
    }

    /// 运行到指定时间后停止，时钟恰好停在 `at`；不晚于当前时钟时返回 false
    pub fn terminate_at(&mut self, at: SimTime) -> bool {
        if !at.is_valid() || at <= self.clock {
            return false;
        }
        debug!(terminate_at = %at, "请求定时终止");
        self.terminate_at = Some(at);
        true
    }

    /// 立即中止，跳过结束通知
    pub fn abort(&self) {
        self.control.abort();
    }

    // ── 主循环 ───────────────────────────────────────────

    /// 运行仿真直到结束，返回最终时钟。仿真只能启动一次。
    pub fn start(&mut self) -> SimResult<SimTime> {
        if self.phase != Phase::NotStarted {
            return Err(SimError::AlreadyStarted);
        }
        self.config.validate()?;
        self.phase = Phase::Running;
        if let Some(t) = self.config.termination_time {
            self.terminate_at(SimTime(t));
        }
        info!(entities = self.entities.len(), "▶️  开始运行仿真");

        match self.run() {
            Ok(reason) => {
                self.phase = Phase::Stopped;
                info!(
                    final_clock = %self.clock,
                    events = self.events_processed,
                    reason = ?reason,
                    "✅ 仿真结束"
                );
                Ok(self.clock)
            }
            Err(e) => {
                self.phase = Phase::Stopped;
                error!(clock = %self.clock, error = %e, "仿真因错误终止");
                Err(e)
            }
        }
    }

    fn run(&mut self) -> SimResult<StopReason> {
        self.ticks.record(self.clock);
        self.start_registered_entities()?;
        self.listeners.notify_start(self.clock);

        let reason = self.run_loop()?;
        self.stop_reason = Some(reason);
        if reason != StopReason::Aborted {
            self.finish(reason)?;
        }
        self.shutdown_entities()?;
        Ok(reason)
    }

    fn run_loop(&mut self) -> SimResult<StopReason> {
        loop {
            if self.control.is_abort_requested() {
                return Ok(StopReason::Aborted);
            }
            self.run_runnable_entities()?;
            if let Some(reason) = self.check_stop() {
                return Ok(reason);
            }
            self.apply_pause_request();
            if self.pause_due() {
                self.do_pause();
                if self.control.is_abort_requested() {
                    return Ok(StopReason::Aborted);
                }
            }
            if !self.process_next_batch(self.terminate_at)? && !self.advance_towards_deadline() {
                return Ok(StopReason::Natural);
            }
        }
    }

    fn check_stop(&self) -> Option<StopReason> {
        if self.control.is_abort_requested() {
            return Some(StopReason::Aborted);
        }
        if self.control.is_terminate_requested() {
            info!(clock = %self.clock, "收到终止请求");
            return Some(StopReason::Terminated);
        }
        match self.terminate_at {
            Some(t) if self.clock >= t => {
                info!(clock = %self.clock, "到达终止时间");
                Some(StopReason::TerminatedAt)
            }
            _ => None,
        }
    }

    fn start_registered_entities(&mut self) -> SimResult<()> {
        // 启动钩子里新注册的实体走 CREATE 事件
        let n = self.entities.len();
        for i in 0..n {
            self.start_entity(EntityId(i))?;
        }
        Ok(())
    }

    fn start_entity(&mut self, id: EntityId) -> SimResult<()> {
        self.check_entity(id)?;
        if self.entities[id.0].started {
            return Ok(());
        }
        debug!(entity = %self.entities[id.0].name, id = %id, "启动实体");
        let result = self.call_entity(id, |body, ctx| body.start_entity(ctx));
        self.entities[id.0].started = true;
        result
    }

    /// 取出实体本体，在其上下文中调用钩子，再放回
    fn call_entity(
        &mut self,
        id: EntityId,
        f: impl FnOnce(&mut dyn SimEntity, &mut SimContext<'_>) -> SimResult<()>,
    ) -> SimResult<()> {
        let Some(mut body) = self.entities[id.0].body.take() else {
            return Ok(());
        };
        let result = {
            let mut ctx = SimContext::new(self, id);
            f(body.as_mut(), &mut ctx)
        };
        self.entities[id.0].body = Some(body);
        result
    }

    fn next_event_for(&mut self, id: EntityId) -> Option<SimEvent> {
        match self.entities[id.0].buffer.take() {
            Some(ev) => Some(ev),
            None => self.deferred.select(id, &Predicate::Any),
        }
    }

    /// 实体的 run：先消费缓冲事件，再从延迟队列拉取，直到不再 RUNNABLE 或没有事件
    fn run_entity(&mut self, id: EntityId) -> SimResult<()> {
        self.call_entity(id, |body, ctx| {
            while let Some(ev) = ctx.sim.next_event_for(id) {
                trace!(entity = %id, event = %ev, "实体处理事件");
                body.process_event(ev, ctx)?;
                if ctx.sim.entities[id.0].state != EntityState::Runnable {
                    break;
                }
            }
            Ok(())
        })
    }

    fn run_runnable_entities(&mut self) -> SimResult<()> {
        // 按下标遍历：运行过程中可能追加新实体
        let mut i = 0;
        while i < self.entities.len() {
            let slot = &self.entities[i];
            if slot.started && slot.state == EntityState::Runnable {
                self.run_entity(EntityId(i))?;
            }
            i += 1;
        }
        Ok(())
    }

    fn set_clock(&mut self, t: SimTime) {
        self.clock = t;
        if let Some(done) = self.ticks.record(t) {
            self.listeners.notify_clock_tick(done);
        }
    }

    /// 处理下一批同一时间的事件；不晚于 `limit` 的事件才会被处理。
    /// 每派发一个事件后重新扫描，批处理期间新产生的同时刻事件也并入本批。
    fn process_next_batch(&mut self, limit: Option<SimTime>) -> SimResult<bool> {
        let Some(at) = self.future.first().map(|e| e.time) else {
            return Ok(false);
        };
        if limit.is_some_and(|t| at > t) {
            return Ok(false);
        }
        let Some(first) = self.future.pop_first() else {
            return Ok(false);
        };
        let mut batch = 1usize;
        self.process_event(first)?;
        while let Some(ev) = self.future.remove_first_at(at) {
            batch += 1;
            self.process_event(ev)?;
        }
        debug!(at = %at, batch, remaining = self.future.len(), "处理同一时刻的事件批");
        Ok(true)
    }

    #[tracing::instrument(level = "trace", skip(self, ev), fields(serial = ev.serial, kind = ?ev.kind, at = %ev.time))]
    fn process_event(&mut self, ev: SimEvent) -> SimResult<()> {
        if ev.time < self.clock {
            return Err(SimError::EventInPast {
                serial: ev.serial,
                time: ev.time,
                clock: self.clock,
            });
        }
        self.set_clock(ev.time);
        self.events_processed += 1;
        let processed = self.listeners.has_event_listeners().then(|| ev.clone());

        match ev.kind {
            EventKind::Null => return Err(SimError::NullEvent { serial: ev.serial }),
            EventKind::Create => {
                let id = ev
                    .dst
                    .ok_or(SimError::CreateWithoutEntity { serial: ev.serial })?;
                self.start_entity(id)?;
            }
            EventKind::HoldDone => {
                let src = ev
                    .src
                    .ok_or(SimError::HoldWithoutSource { serial: ev.serial })?;
                self.slot_mut(src)?.state = EntityState::Runnable;
            }
            EventKind::Send => self.dispatch_send(ev)?,
        }

        if let Some(ev) = processed {
            self.listeners.notify_event(&ev);
        }
        Ok(())
    }

    fn dispatch_send(&mut self, ev: SimEvent) -> SimResult<()> {
        let dst = ev
            .dst
            .ok_or(SimError::SendWithoutDestination { serial: ev.serial })?;
        self.check_entity(dst)?;
        if self.entities[dst.0].state == EntityState::Waiting {
            let matched = match self.wait_predicates.get(&dst) {
                None => true,
                Some(pred) => ev.tag == Tag::WAIT_ANY || pred.matches(&ev),
            };
            if matched {
                trace!(dst = %dst, tag = %ev.tag, "唤醒等待中的实体");
                self.wait_predicates.remove(&dst);
                let slot = &mut self.entities[dst.0];
                slot.buffer = Some(ev);
                slot.state = EntityState::Runnable;
                return Ok(());
            }
        }
        self.deferred.add_event(ev);
        Ok(())
    }

    /// 没有可处理事件但终止时间未到：按最小调度步长推进时钟，不越过终止/暂停时间
    fn advance_towards_deadline(&mut self) -> bool {
        let Some(deadline) = self.terminate_at else {
            return false;
        };
        if self.clock >= deadline {
            return false;
        }
        let mut next = self.clock.plus(self.min_scheduling_step()).min(deadline);
        if let Some(p) = self.pause_at {
            if p > self.clock {
                next = next.min(p);
            }
        }
        trace!(from = %self.clock, to = %next, "合成推进时钟");
        self.set_clock(next);
        true
    }

    /// 在 tick 边界接收控制句柄转来的暂停请求
    fn apply_pause_request(&mut self) {
        let Some(req) = self.control.take_pause_request() else {
            return;
        };
        let at = match req {
            PauseRequest::Now => self.clock,
            PauseRequest::At(t) => t,
        };
        if !self.pause_at(at) {
            warn!(requested = %at, clock = %self.clock, "忽略早于当前时钟的暂停请求");
        }
    }

    fn pause_due(&self) -> bool {
        let Some(at) = self.pause_at else {
            return false;
        };
        match self.future.first() {
            Some(ev) => at <= ev.time,
            None => self.clock >= at,
        }
    }

    fn do_pause(&mut self) {
        let Some(at) = self.pause_at.take() else {
            return;
        };
        if at > self.clock {
            self.set_clock(at);
        }
        info!(clock = %self.clock, "⏸️  仿真暂停");
        self.control.enter_pause(self.clock);
        self.listeners.notify_pause(self.clock);
        self.control.block_while_paused();
        info!(clock = %self.clock, "▶️  仿真恢复");
    }

    /// 正常/终止结束：广播 END_OF_SIMULATION，处理由此产生的最后一波事件，
    /// 再让每个存活实体运行一次。
    ///
    /// 结束前仍在队列里、晚于当前时钟的事件被丢弃。定时终止时最后一波事件
    /// 也不能越过终止时间；其余情况下一直处理到未来队列为空。
    fn finish(&mut self, reason: StopReason) -> SimResult<()> {
        let horizon = self.clock;
        let dropped = self.future.discard_after(horizon);
        if dropped > 0 {
            debug!(dropped, horizon = %horizon, "丢弃结束时间之后的事件");
        }

        info!(clock = %self.clock, "📣 广播 END_OF_SIMULATION");
        for i in 0..self.entities.len() {
            if self.entities[i].is_alive() {
                self.future.add_event(SimEvent::new(
                    EventKind::Send,
                    self.clock,
                    None,
                    Some(EntityId(i)),
                    Tag::END_OF_SIMULATION,
                    Payload::none(),
                ));
            }
        }

        let limit = (reason == StopReason::TerminatedAt).then_some(horizon);
        while self.process_next_batch(limit)? {
            self.run_runnable_entities()?;
        }
        if limit.is_some() {
            let dropped = self.future.discard_after(horizon);
            if dropped > 0 {
                debug!(dropped, "丢弃越过终止时间的结束事件");
            }
        }

        let mut i = 0;
        while i < self.entities.len() {
            if self.entities[i].is_alive() {
                self.run_entity(EntityId(i))?;
            }
            i += 1;
        }
        Ok(())
    }

    fn shutdown_entities(&mut self) -> SimResult<()> {
        let mut i = 0;
        while i < self.entities.len() {
            if self.entities[i].is_alive() {
                self.entities[i].state = EntityState::Finished;
                self.wait_predicates.remove(&EntityId(i));
                debug!(entity = %self.entities[i].name, "关闭实体");
                self.call_entity(EntityId(i), |body, ctx| body.shutdown_entity(ctx))?;
            }
            i += 1;
        }
        Ok(())
    }
}
