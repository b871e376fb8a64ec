use crate::sim::{EntityId, EventKind, Payload, Predicate, SimEvent, SimTime, Tag};

fn ev(src: usize, tag: i32) -> SimEvent {
    SimEvent::new(
        EventKind::Send,
        SimTime(0.0),
        Some(EntityId(src)),
        Some(EntityId(0)),
        Tag(tag),
        Payload::new(tag * 10),
    )
}

#[test]
fn builtin_predicates_match_as_named() {
    let e = ev(2, 7);
    assert!(Predicate::Any.matches(&e));
    assert!(!Predicate::None.matches(&e));
    assert!(Predicate::Tag(Tag(7)).matches(&e));
    assert!(!Predicate::Tag(Tag(8)).matches(&e));
    assert!(Predicate::Tags(vec![Tag(1), Tag(7)]).matches(&e));
    assert!(Predicate::NotTag(Tag(8)).matches(&e));
    assert!(Predicate::From(EntityId(2)).matches(&e));
    assert!(!Predicate::NotFrom(EntityId(2)).matches(&e));
    assert!(Predicate::Any.is_any());
    assert!(!Predicate::Tag(Tag(7)).is_any());
}

#[test]
fn custom_predicate_can_inspect_payload() {
    let p = Predicate::custom(|e| e.data::<i32>().is_some_and(|v| *v > 50));
    assert!(p.matches(&ev(0, 7)));
    assert!(!p.matches(&ev(0, 3)));
    assert_eq!(format!("{p:?}"), "Custom(..)");
}
