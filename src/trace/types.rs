use crate::sim::{EventKind, ListenerId, SimEvent, Simulation};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// 一条被派发事件的记录（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// 派发时的仿真时间（秒）
    pub time: f64,
    pub serial: u64,
    pub kind: EventKind,
    pub tag: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst: Option<usize>,
    /// 源实体名（如有）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_name: Option<String>,
}

impl TraceRecord {
    pub fn from_event(ev: &SimEvent) -> Self {
        Self {
            time: ev.time.secs(),
            serial: ev.serial,
            kind: ev.kind,
            tag: ev.tag.0,
            src: ev.src.map(|id| id.0),
            dst: ev.dst.map(|id| id.0),
            src_name: None,
            dst_name: None,
        }
    }
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct TraceLogger {
    pub records: Vec<TraceRecord>,
}

impl TraceLogger {
    pub fn push(&mut self, rec: TraceRecord) {
        self.records.push(rec);
    }

    /// 用注册表里的实体名补全记录
    pub fn resolve_names(&mut self, sim: &Simulation) {
        let lookup = |id: Option<usize>| {
            id.and_then(|i| sim.entity_name(crate::sim::EntityId(i)))
                .map(str::to_string)
        };
        for rec in &mut self.records {
            rec.src_name = lookup(rec.src);
            rec.dst_name = lookup(rec.dst);
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.records)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json_pretty().map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}

/// 把一个共享的收集器挂到仿真的事件处理监听器上
pub fn attach(sim: &mut Simulation, logger: Rc<RefCell<TraceLogger>>) -> ListenerId {
    sim.on_event_processed(move |ev| {
        logger.borrow_mut().push(TraceRecord::from_event(ev));
    })
}
