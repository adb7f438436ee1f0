//! Session admission and idle shutdown.
//!
//! The [`AdmissionController`] counts active sessions against a configured maximum. Once the
//! last session is released it arms a one-shot timer, and if no session is admitted before the
//! grace period runs out the injected shutdown callback is invoked.
//!
//! ```text
//!            try_admit               release (count > 1)
//!   Idle ---------------> Active <-------------------+
//!    ^                    |   ^                       |
//!    | timer fires        |   | try_admit (cancels    |
//!    |                    |   |  the timer)           |
//!    |   release (count 1)v   |                       |
//!    +--------------- ClosingSoon                     |
//! ```
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TableError};

/// callback invoked once the server has been idle for the whole grace period
pub type ShutdownCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// The observable state of an [`AdmissionController`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// no active session and no shutdown timer armed
    Idle,
    /// at least one session is active
    Active,
    /// no active session, the shutdown timer is armed
    ClosingSoon,
}

/// Gates how many sessions may be active at once and shuts the server down after it has been
/// idle for a grace period.
///
/// Cloning an `AdmissionController` is cheap, clones share the same counter and timer.
#[derive(Clone)]
pub struct AdmissionController {
    shared: Arc<Shared>,
}

struct Shared {
    max: usize,
    grace: Duration,
    on_idle: ShutdownCallback,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    active: usize,
    // dropping the sender cancels the armed timer
    timer: Option<Sender<()>>,
    // bumped every time a timer is armed, a firing timer must still be the current one
    timer_gen: u64,
}

impl AdmissionController {
    /// creates a controller admitting at most `max` concurrent sessions, which calls `on_idle`
    /// once no session has been active for `grace`
    ///
    /// # Errors
    /// returns [`TableError::Config`] if `max` is 0
    pub fn new<F>(max: usize, grace: Duration, on_idle: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        if max == 0 {
            return Err(TableError::Config(
                "the maximum number of sessions must be at least 1".to_string(),
            ));
        }
        Ok(AdmissionController {
            shared: Arc::new(Shared {
                max,
                grace,
                on_idle: Arc::new(on_idle),
                inner: Mutex::new(Inner::default()),
            }),
        })
    }

    /// admits a new session
    ///
    /// # Errors
    /// returns [`TableError::CapacityExceeded`] if the maximum number of sessions are already
    /// active. The controller state is left untouched in that case.
    pub fn try_admit(&self) -> Result<usize> {
        let mut inner = self.shared.inner.lock();
        if inner.active >= self.shared.max {
            debug!(active = inner.active, "admission refused");
            return Err(TableError::CapacityExceeded {
                max: self.shared.max,
            });
        }

        inner.active += 1;
        if inner.timer.take().is_some() {
            info!("idle shutdown cancelled");
        }
        debug!(active = inner.active, "session admitted");
        Ok(inner.active)
    }

    /// ends a session. Returns false if there was no active session to end.
    ///
    /// Releasing the last active session arms the idle shutdown timer.
    pub fn release(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.active == 0 {
            warn!("release requested without an active session");
            return false;
        }

        inner.active -= 1;
        debug!(active = inner.active, "session released");
        if inner.active == 0 {
            self.arm_timer(&mut inner);
        }
        true
    }

    /// number of active sessions
    pub fn active(&self) -> usize {
        self.shared.inner.lock().active
    }

    /// configured maximum number of concurrent sessions
    pub fn max(&self) -> usize {
        self.shared.max
    }

    /// how long the controller waits without sessions before shutting down
    pub fn grace_period(&self) -> Duration {
        self.shared.grace
    }

    /// the current state of the controller
    pub fn state(&self) -> SessionState {
        let inner = self.shared.inner.lock();
        match (inner.active, inner.timer.is_some()) {
            (0, false) => SessionState::Idle,
            (0, true) => SessionState::ClosingSoon,
            _ => SessionState::Active,
        }
    }

    fn arm_timer(&self, inner: &mut Inner) {
        let (tx, rx) = channel::bounded::<()>(1);
        inner.timer_gen += 1;
        inner.timer = Some(tx);

        let gen = inner.timer_gen;
        let grace = self.shared.grace;
        let shared = Arc::clone(&self.shared);
        info!("no active sessions, shutting down in {:?}", grace);

        let spawned = thread::Builder::new()
            .name("idle-shutdown".into())
            .spawn(move || match rx.recv_timeout(grace) {
                Err(RecvTimeoutError::Timeout) => shared.fire(gen),
                _ => debug!(gen, "idle timer cancelled"),
            });
        if let Err(e) = spawned {
            error!("could not start the idle shutdown timer: {}", e);
            inner.timer = None;
        }
    }
}

impl Shared {
    fn fire(&self, gen: u64) {
        {
            let mut inner = self.inner.lock();
            if inner.active != 0 || inner.timer_gen != gen || inner.timer.is_none() {
                debug!(gen, "stale idle timer ignored");
                return;
            }
            inner.timer = None;
        }
        info!("server idle for {:?}, shutting down", self.grace);
        (self.on_idle)();
    }
}

impl fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionController")
            .field("max", &self.shared.max)
            .field("grace", &self.shared.grace)
            .field("active", &self.active())
            .finish()
    }
}
