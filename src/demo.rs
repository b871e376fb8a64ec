//! 演示和示例代码
//!
//! 一个最小的云场景：`Broker` 把 cloudlet 提交给 `Datacenter`，数据中心按调度间隔
//! 周期性更新处理进度，完成后把结果返回给 broker。

use crate::sim::{
    EntityId, Predicate, SimConfig, SimContext, SimEntity, SimError, SimEvent, SimResult,
    Simulation, Tag,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

pub const CLOUDLET_RETURN: Tag = Tag(20);
pub const CLOUDLET_SUBMIT: Tag = Tag(21);
pub const DATACENTER_UPDATE: Tag = Tag(41);

/// 浮点完成时间比较的容差
const FINISH_EPSILON: f64 = 1e-9;

/// 一个待执行的任务（长度单位：MI）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudletSpec {
    pub id: u64,
    pub length: f64,
    #[serde(default)]
    pub submit_delay: f64,
}

/// cloudlet 的完成结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudletResult {
    pub id: u64,
    pub submitted: f64,
    pub finish: f64,
}

/// 演示场景配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// 数据中心处理能力（MIPS）
    #[serde(default = "default_mips")]
    pub mips: f64,
    /// 数据中心周期更新间隔（秒）
    #[serde(default = "default_scheduling_interval")]
    pub scheduling_interval: f64,
    #[serde(default)]
    pub cloudlets: Vec<CloudletSpec>,
    #[serde(default)]
    pub sim: SimConfig,
}

fn default_mips() -> f64 {
    1000.0
}

fn default_scheduling_interval() -> f64 {
    1.0
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            mips: default_mips(),
            scheduling_interval: default_scheduling_interval(),
            cloudlets: vec![
                CloudletSpec { id: 0, length: 10_000.0, submit_delay: 0.0 },
                CloudletSpec { id: 1, length: 5_000.0, submit_delay: 2.0 },
                CloudletSpec { id: 2, length: 2_000.0, submit_delay: 4.0 },
            ],
            sim: SimConfig::default(),
        }
    }
}

impl ScenarioSpec {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.mips.is_finite() && self.mips > 0.0) {
            return Err(SimError::Config(format!("mips must be positive, got {}", self.mips)));
        }
        if !(self.scheduling_interval.is_finite() && self.scheduling_interval > 0.0) {
            return Err(SimError::Config(format!(
                "scheduling_interval must be positive, got {}",
                self.scheduling_interval
            )));
        }
        for c in &self.cloudlets {
            if !(c.length.is_finite() && c.length > 0.0) {
                return Err(SimError::Config(format!(
                    "cloudlet {} length must be positive, got {}",
                    c.id, c.length
                )));
            }
            if !(c.submit_delay.is_finite() && c.submit_delay >= 0.0) {
                return Err(SimError::Config(format!(
                    "cloudlet {} submit_delay must be non-negative, got {}",
                    c.id, c.submit_delay
                )));
            }
        }
        self.sim.validate()
    }

    pub fn from_json_str(raw: &str) -> SimResult<Self> {
        let spec: ScenarioSpec = serde_json::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug)]
struct RunningCloudlet {
    spec: CloudletSpec,
    owner: EntityId,
    submitted: f64,
    finish_at: f64,
}

/// 数据中心：执行 cloudlet，按调度间隔周期更新
#[derive(Debug)]
pub struct Datacenter {
    mips: f64,
    scheduling_interval: f64,
    running: Vec<RunningCloudlet>,
    update_pending: bool,
}

impl Datacenter {
    pub fn new(mips: f64, scheduling_interval: f64) -> Self {
        Self {
            mips,
            scheduling_interval,
            running: Vec::new(),
            update_pending: false,
        }
    }

    fn schedule_update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        if self.update_pending {
            return Ok(());
        }
        let now = ctx.clock().secs();
        let Some(earliest) = self.running.iter().map(|r| r.finish_at).reduce(f64::min) else {
            return Ok(());
        };
        let delay = (earliest - now).max(0.0).min(self.scheduling_interval);
        self.update_pending = true;
        ctx.schedule_self(delay, DATACENTER_UPDATE)
    }

    fn on_submit(&mut self, ev: &SimEvent, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let spec = ev
            .data::<CloudletSpec>()
            .cloned()
            .ok_or_else(|| SimError::entity(ctx.name(), "CLOUDLET_SUBMIT without cloudlet payload"))?;
        let owner = ev
            .src
            .ok_or_else(|| SimError::entity(ctx.name(), "CLOUDLET_SUBMIT without sender"))?;
        let now = ctx.clock().secs();
        let finish_at = now + spec.length / self.mips;
        debug!(cloudlet = spec.id, finish_at, "🖥️  接收 cloudlet");
        self.running.push(RunningCloudlet {
            spec,
            owner,
            submitted: now,
            finish_at,
        });
        self.schedule_update(ctx)
    }

    fn on_update(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.update_pending = false;
        let now = ctx.clock().secs();
        let (done, pending): (Vec<_>, Vec<_>) = self
            .running
            .drain(..)
            .partition(|r| r.finish_at <= now + FINISH_EPSILON);
        self.running = pending;
        for r in done {
            info!(cloudlet = r.spec.id, finish = now, "✅ cloudlet 完成");
            let result = CloudletResult {
                id: r.spec.id,
                submitted: r.submitted,
                finish: now,
            };
            ctx.schedule_data(r.owner, 0.0, CLOUDLET_RETURN, result)?;
        }
        self.schedule_update(ctx)
    }
}

impl SimEntity for Datacenter {
    fn start_entity(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        ctx.register_scheduling_interval(self.scheduling_interval);
        Ok(())
    }

    fn process_event(&mut self, ev: SimEvent, ctx: &mut SimContext<'_>) -> SimResult<()> {
        match ev.tag {
            CLOUDLET_SUBMIT => self.on_submit(&ev, ctx),
            DATACENTER_UPDATE => self.on_update(ctx),
            Tag::END_OF_SIMULATION => {
                debug!(unfinished = self.running.len(), "数据中心收到结束通知");
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// broker 观察到的结果
#[derive(Debug, Default)]
pub struct BrokerReport {
    pub finished: Vec<CloudletResult>,
    pub end_notified: bool,
    pub shutdown_at: Option<f64>,
}

/// Broker：提交 cloudlet 并等待结果
#[derive(Debug)]
pub struct Broker {
    datacenter: EntityId,
    cloudlets: Vec<CloudletSpec>,
    outstanding: usize,
    report: Rc<RefCell<BrokerReport>>,
}

impl Broker {
    pub fn new(datacenter: EntityId, cloudlets: Vec<CloudletSpec>, report: Rc<RefCell<BrokerReport>>) -> Self {
        Self {
            datacenter,
            cloudlets,
            outstanding: 0,
            report,
        }
    }
}

impl SimEntity for Broker {
    fn start_entity(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        for c in &self.cloudlets {
            ctx.schedule_data(self.datacenter, c.submit_delay, CLOUDLET_SUBMIT, c.clone())?;
        }
        self.outstanding = self.cloudlets.len();
        if self.outstanding > 0 {
            ctx.wait(Predicate::Tag(CLOUDLET_RETURN))?;
        }
        Ok(())
    }

    fn process_event(&mut self, ev: SimEvent, ctx: &mut SimContext<'_>) -> SimResult<()> {
        match ev.tag {
            CLOUDLET_RETURN => {
                if let Some(result) = ev.data::<CloudletResult>() {
                    self.report.borrow_mut().finished.push(result.clone());
                }
                self.outstanding = self.outstanding.saturating_sub(1);
                if self.outstanding > 0 {
                    ctx.wait(Predicate::Tag(CLOUDLET_RETURN))?;
                }
            }
            Tag::END_OF_SIMULATION => self.report.borrow_mut().end_notified = true,
            _ => {}
        }
        Ok(())
    }

    fn shutdown_entity(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.report.borrow_mut().shutdown_at = Some(ctx.clock().secs());
        Ok(())
    }
}

/// 按场景构建实体：先数据中心，后 broker
pub fn build_scenario(sim: &mut Simulation, spec: &ScenarioSpec) -> Rc<RefCell<BrokerReport>> {
    let report = Rc::new(RefCell::new(BrokerReport::default()));
    let dc = sim.add_entity("datacenter0", Datacenter::new(spec.mips, spec.scheduling_interval));
    sim.add_entity("broker0", Broker::new(dc, spec.cloudlets.clone(), Rc::clone(&report)));
    report
}
