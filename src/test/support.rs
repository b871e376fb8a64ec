use crate::sim::{SimContext, SimEntity, SimEvent, SimResult};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// (实体名, 处理时的时钟, 标签)
pub(super) type Log = Rc<RefCell<Vec<(String, f64, i32)>>>;

type StartFn = Box<dyn FnMut(&mut SimContext<'_>) -> SimResult<()>>;
type EventFn = Box<dyn FnMut(&SimEvent, &mut SimContext<'_>) -> SimResult<()>>;

pub(super) fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// 某个实体按顺序收到的标签
pub(super) fn tags_of(log: &Log, name: &str) -> Vec<i32> {
    log.borrow()
        .iter()
        .filter(|(n, _, _)| n == name)
        .map(|(_, _, tag)| *tag)
        .collect()
}

/// 记录每个收到的事件，行为由闭包给出
pub(super) struct Scripted {
    log: Log,
    on_start: StartFn,
    on_event: EventFn,
    shutdowns: Rc<Cell<u32>>,
}

impl Scripted {
    pub(super) fn new(log: &Log) -> Self {
        Self {
            log: Rc::clone(log),
            on_start: Box::new(|_| Ok(())),
            on_event: Box::new(|_, _| Ok(())),
            shutdowns: Rc::new(Cell::new(0)),
        }
    }

    pub(super) fn on_start(mut self, f: impl FnMut(&mut SimContext<'_>) -> SimResult<()> + 'static) -> Self {
        self.on_start = Box::new(f);
        self
    }

    pub(super) fn on_event(
        mut self,
        f: impl FnMut(&SimEvent, &mut SimContext<'_>) -> SimResult<()> + 'static,
    ) -> Self {
        self.on_event = Box::new(f);
        self
    }

    pub(super) fn shutdowns(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.shutdowns)
    }
}

impl SimEntity for Scripted {
    fn start_entity(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        (self.on_start)(ctx)
    }

    fn process_event(&mut self, ev: SimEvent, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.log
            .borrow_mut()
            .push((ctx.name().to_string(), ctx.clock().secs(), ev.tag.0));
        (self.on_event)(&ev, ctx)
    }

    fn shutdown_entity(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.shutdowns.set(self.shutdowns.get() + 1);
        Ok(())
    }
}
