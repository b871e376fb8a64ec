//! 事件标签
//!
//! 标签是区分事件语义的整数。负数标签（`END_OF_SIMULATION` 除外）为优先事件。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 事件标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(pub i32);

impl Tag {
    /// 无语义标签（内核的 CREATE / HOLD_DONE 事件使用）
    pub const NONE: Tag = Tag(0);
    /// 仿真结束通知，由内核在正常结束时广播给所有存活实体
    pub const END_OF_SIMULATION: Tag = Tag(-1);
    /// 内部派发标签：投递给 WAITING 实体时总是匹配其谓词
    pub const WAIT_ANY: Tag = Tag(9999);

    /// 优先事件会插到未来队列最前面
    pub fn is_priority(self) -> bool {
        self.0 < 0 && self != Tag::END_OF_SIMULATION
    }
}

impl From<i32> for Tag {
    fn from(v: i32) -> Self {
        Tag(v)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Tag::NONE => write!(f, "NONE"),
            Tag::END_OF_SIMULATION => write!(f, "END_OF_SIMULATION"),
            Tag::WAIT_ANY => write!(f, "WAIT_ANY"),
            Tag(v) => write!(f, "{v}"),
        }
    }
}
