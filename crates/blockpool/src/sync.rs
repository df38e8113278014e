//! Critical-section policy selected at pool construction time.
//!
//! Both concurrency configurations run the same code path: shared state is
//! guarded by a [`Section`], and the section itself is either a real lock
//! or a free-running no-op chosen when the pool is built.

/// A short critical section guarding one shared structure.
///
/// `Spin` backs the per-cache and per-page sections: the guarded regions
/// are a handful of pointer operations, so busy-waiting beats parking.
/// `Blocking` backs the coordinator's allocate/rotation span, which may
/// construct a whole page and is not as tightly bounded. `None` removes
/// synchronization for single-owner pools.
#[derive(Debug)]
pub(crate) enum Section {
    Spin(spin::Mutex<()>),
    Blocking(parking_lot::Mutex<()>),
    None,
}

impl Section {
    /// Busy-wait section, or a no-op when `thread_safe` is off.
    pub(crate) fn spin(thread_safe: bool) -> Self {
        if thread_safe {
            Self::Spin(spin::Mutex::new(()))
        } else {
            Self::None
        }
    }

    /// Blocking section, or a no-op when `thread_safe` is off.
    pub(crate) fn blocking(thread_safe: bool) -> Self {
        if thread_safe {
            Self::Blocking(parking_lot::Mutex::new(()))
        } else {
            Self::None
        }
    }

    /// Runs `f` inside the critical section.
    #[inline]
    pub(crate) fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        match self {
            Self::Spin(lock) => {
                let _guard = lock.lock();
                f()
            }
            Self::Blocking(lock) => {
                let _guard = lock.lock();
                f()
            }
            Self::None => f(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_runs_the_closure() {
        assert_eq!(Section::spin(true).with(|| 1), 1);
        assert_eq!(Section::spin(false).with(|| 2), 2);
        assert_eq!(Section::blocking(true).with(|| 3), 3);
        assert_eq!(Section::blocking(false).with(|| 4), 4);
    }

    #[test]
    fn selection_follows_thread_safety() {
        assert!(matches!(Section::spin(true), Section::Spin(_)));
        assert!(matches!(Section::spin(false), Section::None));
        assert!(matches!(Section::blocking(true), Section::Blocking(_)));
        assert!(matches!(Section::blocking(false), Section::None));
    }
}
