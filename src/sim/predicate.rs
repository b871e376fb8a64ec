//! 事件谓词
//!
//! 用于选择性等待（wait）与从延迟队列中挑选（select）事件。

use super::entity::EntityId;
use super::event::SimEvent;
use super::tag::Tag;
use std::fmt;
use std::rc::Rc;

/// 对事件的布尔测试
#[derive(Clone)]
pub enum Predicate {
    /// 匹配任意事件
    Any,
    /// 不匹配任何事件
    None,
    /// 标签等于给定值
    Tag(Tag),
    /// 标签属于给定集合
    Tags(Vec<Tag>),
    /// 标签不等于给定值
    NotTag(Tag),
    /// 来自指定实体
    From(EntityId),
    /// 不来自指定实体
    NotFrom(EntityId),
    /// 自定义测试
    Custom(Rc<dyn Fn(&SimEvent) -> bool>),
}

impl Predicate {
    pub fn custom(f: impl Fn(&SimEvent) -> bool + 'static) -> Self {
        Predicate::Custom(Rc::new(f))
    }

    pub fn matches(&self, ev: &SimEvent) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::None => false,
            Predicate::Tag(tag) => ev.tag == *tag,
            Predicate::Tags(tags) => tags.contains(&ev.tag),
            Predicate::NotTag(tag) => ev.tag != *tag,
            Predicate::From(src) => ev.src == Some(*src),
            Predicate::NotFrom(src) => ev.src != Some(*src),
            Predicate::Custom(f) => f(ev),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Predicate::Any)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Any => write!(f, "Any"),
            Predicate::None => write!(f, "None"),
            Predicate::Tag(t) => write!(f, "Tag({t})"),
            Predicate::Tags(ts) => write!(f, "Tags({ts:?})"),
            Predicate::NotTag(t) => write!(f, "NotTag({t})"),
            Predicate::From(id) => write!(f, "From({id})"),
            Predicate::NotFrom(id) => write!(f, "NotFrom({id})"),
            Predicate::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}
