//! Progress-callback trait for split and per-fragment render events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works. The library never draws anything itself;
//! the `splitrender` binary forwards these events to a terminal progress bar.
//!
//! # Example
//!
//! ```rust
//! use splitrender::{PipelineProgressCallback, PipelineConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: Arc<AtomicUsize>,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_fragment_complete(&self, name: &str, position: usize, total: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{name} done ({position}/{total})");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     rendered: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it splits and renders.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `position` arguments are 1-based positions in the
/// sorted fragment list, `total` is the number of fragments found.
pub trait PipelineProgressCallback: Send + Sync {
    /// The split phase was skipped because fragments already exist.
    fn on_split_skipped(&self, existing_fragments: usize) {
        let _ = existing_fragments;
    }

    /// The split phase wrote `fragments` new fragment files.
    fn on_split_complete(&self, fragments: usize) {
        let _ = fragments;
    }

    /// Called once before the first fragment is considered for rendering.
    fn on_render_start(&self, total: usize) {
        let _ = total;
    }

    /// The fragment is already recorded in the manifest; no render happens.
    fn on_fragment_skipped(&self, name: &str, position: usize, total: usize) {
        let _ = (name, position, total);
    }

    /// Called just before the renderer is launched for a fragment.
    fn on_fragment_start(&self, name: &str, position: usize, total: usize) {
        let _ = (name, position, total);
    }

    /// The renderer finished successfully and the pair was recorded.
    fn on_fragment_complete(&self, name: &str, position: usize, total: usize) {
        let _ = (name, position, total);
    }

    /// The renderer ran but did not succeed.
    fn on_fragment_error(&self, name: &str, position: usize, total: usize, error: &str) {
        let _ = (name, position, total, error);
    }

    /// Called once after every fragment has been considered.
    fn on_render_complete(&self, total: usize, rendered: usize, failed: usize) {
        let _ = (total, rendered, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        skips: AtomicUsize,
        errors: AtomicUsize,
        rendered_total: AtomicUsize,
    }

    impl PipelineProgressCallback for TrackingCallback {
        fn on_fragment_start(&self, _name: &str, _position: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fragment_complete(&self, _name: &str, _position: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fragment_skipped(&self, _name: &str, _position: usize, _total: usize) {
            self.skips.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fragment_error(&self, _name: &str, _position: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_render_complete(&self, _total: usize, rendered: usize, _failed: usize) {
            self.rendered_total.store(rendered, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_split_skipped(3);
        cb.on_split_complete(3);
        cb.on_render_start(3);
        cb.on_fragment_start("000000001", 1, 3);
        cb.on_fragment_complete("000000001", 1, 3);
        cb.on_fragment_skipped("000000002", 2, 3);
        cb.on_fragment_error("000000003", 3, 3, "exit 1");
        cb.on_render_complete(3, 1, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_fragment_start("000000001", 1, 3);
        tracker.on_fragment_complete("000000001", 1, 3);
        tracker.on_fragment_skipped("000000002", 2, 3);
        tracker.on_fragment_start("000000003", 3, 3);
        tracker.on_fragment_error("000000003", 3, 3, "timed out");
        tracker.on_render_complete(3, 1, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skips.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.rendered_total.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_render_start(10);
        cb.on_fragment_complete("000000001", 1, 10);
    }
}
