use crate::sim::{PauseRequest, SimTime, SimulationControl};
use std::thread;

#[test]
fn resume_without_pause_is_rejected() {
    let ctl = SimulationControl::new();
    assert!(!ctl.is_paused());
    assert!(!ctl.resume());
    assert_eq!(ctl.paused_at(), None);
}

#[test]
fn wait_until_paused_sees_pause_from_simulation_thread() {
    let ctl = SimulationControl::new();
    let sim_side = ctl.clone();
    let runner = thread::spawn(move || {
        sim_side.enter_pause(SimTime(7.5));
        sim_side.block_while_paused();
        sim_side.is_paused()
    });

    assert_eq!(ctl.wait_until_paused(), Some(SimTime(7.5)));
    assert_eq!(ctl.paused_at(), Some(SimTime(7.5)));
    assert!(ctl.resume());

    let still_paused = runner.join().expect("runner thread");
    assert!(!still_paused);
}

#[test]
fn abort_releases_waiters() {
    let ctl = SimulationControl::new();
    let waiter = {
        let ctl = ctl.clone();
        thread::spawn(move || ctl.wait_until_paused())
    };
    ctl.abort();
    assert_eq!(waiter.join().expect("waiter thread"), None);
    assert!(ctl.is_abort_requested());
    assert!(!ctl.is_terminate_requested());
    ctl.terminate();
    assert!(ctl.is_terminate_requested());
}

#[test]
fn pause_requests_are_taken_once_and_validated() {
    let ctl = SimulationControl::new();
    assert!(ctl.take_pause_request().is_none());
    assert!(!ctl.pause_at(SimTime(f64::NAN)));
    assert!(ctl.take_pause_request().is_none());

    assert!(ctl.pause_at(SimTime(4.0)));
    let remote = ctl.clone();
    thread::spawn(move || remote.pause())
        .join()
        .expect("remote thread");

    assert_eq!(ctl.take_pause_request(), Some(PauseRequest::Now));
    assert!(ctl.take_pause_request().is_none());
    assert!(!ctl.is_paused());
}
