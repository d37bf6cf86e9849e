use std::ops::{Deref, DerefMut};

use crate::shared::frame::Frame;

/// Supplies frames one request at a time.
///
/// `read_frame` returning `None` is a per-tick hiccup that callers retry;
/// a source that can never produce frames again reports
/// `is_available() == false`.
pub trait FrameSource: Send {
    fn read_frame(&mut self) -> Option<Frame>;

    fn is_available(&self) -> bool;

    /// Releases the underlying device or file. Safe to call more than once.
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Option<Frame> {
        (**self).read_frame()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Scoped ownership of a [`FrameSource`] that releases it on drop,
/// including early returns and unwinding.
pub struct SourceGuard<S: FrameSource> {
    source: S,
}

impl<S: FrameSource> SourceGuard<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: FrameSource> Deref for SourceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.source
    }
}

impl<S: FrameSource> DerefMut for SourceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<S: FrameSource> Drop for SourceGuard<S> {
    fn drop(&mut self) {
        self.source.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingSource {
        fn read_frame(&mut self) -> Option<Frame> {
            Some(Frame::new(vec![0; 3], 1, 1, 3, 0))
        }

        fn is_available(&self) -> bool {
            true
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let releases = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = SourceGuard::new(CountingSource {
                releases: releases.clone(),
            });
            assert!(guard.read_frame().is_some());
            assert_eq!(releases.load(Ordering::SeqCst), 0);
        }
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_on_early_return() {
        fn fails_midway(releases: Arc<AtomicUsize>) -> Result<(), String> {
            let _guard = SourceGuard::new(CountingSource { releases });
            Err("stopped".into())
        }

        let releases = Arc::new(AtomicUsize::new(0));
        assert!(fails_midway(releases.clone()).is_err());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_releases_boxed_source() {
        let releases = Arc::new(AtomicUsize::new(0));
        let boxed: Box<dyn FrameSource> = Box::new(CountingSource {
            releases: releases.clone(),
        });
        drop(SourceGuard::new(boxed));
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }
}
