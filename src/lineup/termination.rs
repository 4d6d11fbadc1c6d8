use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Deadline, external cancel flag and check budget, consulted by the search at every
/// seed and node
#[derive(Debug, Clone, Default)]
pub struct Termination {
    deadline: Option<Instant>,
    cancel: Option<Arc<AtomicBool>>,
    checks: Option<(u64, Arc<AtomicU64>)>,
}

impl Termination {
    /// Never terminates early
    pub fn none() -> Self {
        Self::default()
    }

    /// Terminates once `limit` has elapsed from now
    pub fn after(limit: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + limit),
            ..Self::default()
        }
    }

    /// Zero means no time limit
    pub fn millis(ms: u64) -> Self {
        if ms == 0 {
            Self::none()
        } else {
            Self::after(Duration::from_millis(ms))
        }
    }

    /// Also terminate when `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Also terminate once `limit` checks have passed; zero means no limit
    pub fn with_check_limit(mut self, limit: u64) -> Self {
        self.checks = (limit > 0).then(|| (limit, Arc::new(AtomicU64::new(0))));
        self
    }

    pub fn is_terminated(&self) -> bool {
        if let Some((limit, count)) = &self.checks {
            if count.fetch_add(1, Ordering::Relaxed) >= *limit {
                return true;
            }
        }
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}
