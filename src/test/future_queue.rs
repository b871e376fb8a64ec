use crate::sim::{EntityId, EventKind, FutureQueue, Payload, SimEvent, SimTime, Tag};

fn ev(t: f64, tag: i32) -> SimEvent {
    SimEvent::new(
        EventKind::Send,
        SimTime(t),
        Some(EntityId(0)),
        Some(EntityId(1)),
        Tag(tag),
        Payload::none(),
    )
}

fn tags(q: &FutureQueue) -> Vec<i32> {
    q.iter().map(|e| e.tag.0).collect()
}

#[test]
fn orders_by_time_then_insertion_serial() {
    let mut q = FutureQueue::new();
    q.add_event(ev(10.0, 1));
    q.add_event(ev(5.0, 2));
    q.add_event(ev(10.0, 3));

    assert_eq!(tags(&q), vec![2, 1, 3]);
    let serials: Vec<u64> = q.iter().map(|e| e.serial).collect();
    assert_eq!(serials, vec![1, 0, 2]);
}

#[test]
fn priority_tag_jumps_ahead_within_its_time() {
    let mut q = FutureQueue::new();
    q.add_event(ev(1.0, 1));
    q.add_event(ev(1.0, 2));
    q.add_event(ev(2.0, 3));
    q.add_event(ev(1.0, -4));

    assert_eq!(q.first().map(|e| e.tag.0), Some(-4));
    q.add_event(ev(1.0, -5));
    assert_eq!(tags(&q), vec![-5, -4, 1, 2, 3]);
}

#[test]
fn later_priority_event_never_passes_earlier_events() {
    let mut q = FutureQueue::new();
    q.add_event(ev(1.0, 1));
    q.add_event(ev(5.0, -2));
    q.add_event_first(ev(3.0, 3));
    q.add_event(ev(5.0, 4));

    assert_eq!(tags(&q), vec![1, 3, -2, 4]);
}

#[test]
fn end_of_simulation_tag_is_not_prioritized() {
    let mut q = FutureQueue::new();
    q.add_event(ev(1.0, 1));
    q.add_event(ev(2.0, Tag::END_OF_SIMULATION.0));
    assert_eq!(tags(&q), vec![1, -1]);
}

#[test]
fn add_event_first_goes_to_front() {
    let mut q = FutureQueue::new();
    q.add_event(ev(0.0, 1));
    q.add_event_first(ev(0.0, 2));
    assert_eq!(q.pop_first().map(|e| e.tag.0), Some(2));
    assert_eq!(q.pop_first().map(|e| e.tag.0), Some(1));
    assert!(q.pop_first().is_none());
    assert!(q.is_empty());
}

#[test]
fn remove_first_at_only_takes_exact_time() {
    let mut q = FutureQueue::new();
    q.add_event(ev(1.0, 1));
    q.add_event(ev(2.0, 2));
    q.add_event(ev(2.0, 3));

    assert!(q.remove_first_at(SimTime(1.5)).is_none());
    assert_eq!(q.remove_first_at(SimTime(2.0)).map(|e| e.tag.0), Some(2));
    assert_eq!(q.remove_first_at(SimTime(2.0)).map(|e| e.tag.0), Some(3));
    assert!(q.remove_first_at(SimTime(2.0)).is_none());
    assert_eq!(q.len(), 1);
}

#[test]
fn remove_if_and_remove_by_serial() {
    let mut q = FutureQueue::new();
    q.add_event(ev(1.0, 1));
    q.add_event(ev(2.0, 2));
    q.add_event(ev(3.0, -3));
    q.add_event(ev(4.0, 2));

    let removed = q.remove_if(|e| e.tag == Tag(2));
    assert_eq!(removed.len(), 2);
    assert_eq!(tags(&q), vec![1, -3]);

    let last = q.iter().last().cloned().expect("last");
    assert!(q.remove(&last));
    assert!(!q.remove(&last));
    assert_eq!(tags(&q), vec![1]);
}

#[test]
fn discard_after_drops_later_events() {
    let mut q = FutureQueue::new();
    q.add_event(ev(1.0, 1));
    q.add_event(ev(5.0, 2));
    q.add_event(ev(9.0, 3));
    assert_eq!(q.discard_after(SimTime(5.0)), 1);
    assert_eq!(tags(&q), vec![1, 2]);
}
