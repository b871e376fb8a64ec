mod control;
mod future_queue;
mod predicate;
mod support;
