use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_utils::sync::WaitGroup;
use tabledb::{AdmissionController, SessionState, TableError};

fn counting_controller(max: usize, grace: Duration) -> (AdmissionController, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&fired);
    let controller = AdmissionController::new(max, grace, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .unwrap();
    (controller, fired)
}

#[test]
fn zero_capacity_is_rejected() {
    assert!(matches!(
        AdmissionController::new(0, Duration::from_secs(1), || {}),
        Err(TableError::Config(_))
    ));
}

#[test]
fn admits_up_to_capacity() {
    let (controller, _) = counting_controller(2, Duration::from_secs(60));
    assert_eq!(controller.state(), SessionState::Idle);

    assert_eq!(controller.try_admit().unwrap(), 1);
    assert_eq!(controller.try_admit().unwrap(), 2);
    assert!(matches!(
        controller.try_admit(),
        Err(TableError::CapacityExceeded { max: 2 })
    ));
    assert_eq!(controller.active(), 2);
    assert_eq!(controller.state(), SessionState::Active);

    assert!(controller.release());
    assert_eq!(controller.try_admit().unwrap(), 2);
}

#[test]
fn release_without_session() {
    let (controller, fired) = counting_controller(1, Duration::from_millis(10));
    assert!(!controller.release());
    assert_eq!(controller.active(), 0);
    assert_eq!(controller.state(), SessionState::Idle);

    thread::sleep(Duration::from_millis(100));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn idle_timer_fires_once() {
    let (controller, fired) = counting_controller(3, Duration::from_millis(50));
    controller.try_admit().unwrap();
    controller.try_admit().unwrap();

    assert!(controller.release());
    assert_eq!(controller.state(), SessionState::Active);
    assert!(controller.release());
    assert_eq!(controller.state(), SessionState::ClosingSoon);

    thread::sleep(Duration::from_millis(500));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn admission_cancels_idle_timer() {
    let (controller, fired) = counting_controller(1, Duration::from_millis(200));
    controller.try_admit().unwrap();
    controller.release();
    assert_eq!(controller.state(), SessionState::ClosingSoon);

    thread::sleep(Duration::from_millis(50));
    controller.try_admit().unwrap();
    assert_eq!(controller.state(), SessionState::Active);

    thread::sleep(Duration::from_millis(500));
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    // a later idle period arms a fresh timer
    controller.release();
    thread::sleep(Duration::from_millis(600));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

// never admits more than max sessions, whatever the interleaving
#[test]
fn concurrent_admission_respects_capacity() {
    let (controller, _) = counting_controller(4, Duration::from_secs(60));
    let admitted = Arc::new(AtomicUsize::new(0));
    let wg = WaitGroup::new();

    for _ in 0..16 {
        let controller = controller.clone();
        let admitted = Arc::clone(&admitted);
        let wg = wg.clone();
        thread::spawn(move || {
            if controller.try_admit().is_ok() {
                admitted.fetch_add(1, Ordering::SeqCst);
            }
            drop(wg);
        });
    }
    wg.wait();

    assert_eq!(admitted.load(Ordering::SeqCst), 4);
    assert_eq!(controller.active(), 4);
}
