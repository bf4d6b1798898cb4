//! Progress reporting for long batch operators.
//!
//! # Example
//!
//! ```
//! use polyedit::prelude::*;
//! use polyedit::algo::{merge_vertices_with_progress, Progress};
//!
//! let mut mesh: EditableMesh = polyedit::primitives::uv_sphere(1.0, 16, 8).unwrap();
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! merge_vertices_with_progress(&mut mesh, 1e-3, &progress).unwrap();
//! ```

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives:
/// - `current`: Current step (0-based)
/// - `total`: Total number of steps
/// - `message`: Description of the current operation
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        (self.callback)(current, total, message);
    }

    /// Create a no-op progress reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_progress_forwards_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        progress.report(0, 2, "start");
        progress.report(2, 2, "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // The no-op reporter accepts anything
        Progress::none().report(5, 1, "ignored");
    }
}
