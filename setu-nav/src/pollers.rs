//! Sensor pollers
//!
//! A poller owns one sample source and a fixed-period thread. Each tick it
//! reads a sample, loads the current [`PollingMode`] and hands the sample
//! to the detector registered for that mode. Starting in a mode with no
//! registered detector is an error rather than a silent no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chakra_io::SampleSource;
use parking_lot::Mutex;

use crate::detectors::Detector;
use crate::error::{NavError, Result};

/// What a poller's samples are currently used for
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollingMode {
    /// Samples are read and discarded
    Idle = 0,
    /// Color sensor watching for grid lines during a sweep
    LineCrossing = 1,
    /// Ultrasonic sensor watching for wall edges during a sweep
    EdgeDetection = 2,
}

impl PollingMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PollingMode::LineCrossing,
            2 => PollingMode::EdgeDetection,
            _ => PollingMode::Idle,
        }
    }
}

struct PollerShared {
    name: &'static str,
    period: Duration,
    mode: AtomicU8,
    running: AtomicBool,
    source: Mutex<Box<dyn SampleSource>>,
    routes: Mutex<HashMap<PollingMode, Box<dyn Detector>>>,
}

/// Fixed-period sampler with a mode → detector dispatch table
pub struct Poller {
    shared: Arc<PollerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Poller {
    pub fn new(name: &'static str, source: Box<dyn SampleSource>, period: Duration) -> Self {
        Self {
            shared: Arc::new(PollerShared {
                name,
                period,
                mode: AtomicU8::new(PollingMode::Idle as u8),
                running: AtomicBool::new(false),
                source: Mutex::new(source),
                routes: Mutex::new(HashMap::new()),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Route samples to `detector` while in `mode`, replacing any previous route
    pub fn register(&self, mode: PollingMode, detector: Box<dyn Detector>) {
        tracing::debug!(
            "{} poller: {:?} -> {} detector",
            self.shared.name,
            mode,
            detector.name()
        );
        self.shared.routes.lock().insert(mode, detector);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_route(self, mode: PollingMode, detector: Box<dyn Detector>) -> Self {
        self.register(mode, detector);
        self
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn mode(&self) -> PollingMode {
        PollingMode::from_u8(self.shared.mode.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start sampling in `mode`
    ///
    /// If the thread is already running only the mode changes. The routed
    /// detector is reset whenever it becomes active.
    pub fn start(&self, mode: PollingMode) -> Result<()> {
        if mode != PollingMode::Idle {
            let mut routes = self.shared.routes.lock();
            let detector = routes.get_mut(&mode).ok_or(NavError::UnroutedMode {
                poller: self.shared.name,
                mode,
            })?;
            if !self.is_running() || self.mode() != mode {
                detector.reset();
            }
        }
        self.shared.mode.store(mode as u8, Ordering::Release);

        if self.is_running() {
            return Ok(());
        }

        // A previous thread has already seen the cleared flag; let it finish
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                tracing::error!("{} poller thread panicked", self.shared.name);
            }
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("{}-poller", self.shared.name))
            .spawn(move || poll_loop(shared));

        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                tracing::info!("{} poller started in {:?} mode", self.shared.name, mode);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Ask the thread to exit after its current tick
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            self.shared
                .mode
                .store(PollingMode::Idle as u8, Ordering::Release);
            tracing::info!("{} poller stopped", self.shared.name);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

fn poll_loop(shared: Arc<PollerShared>) {
    let mut failures: u32 = 0;
    while shared.running.load(Ordering::Acquire) {
        let started = Instant::now();

        let sample = shared.source.lock().fetch_sample();
        match sample {
            Ok(sample) => {
                failures = 0;
                let mode = PollingMode::from_u8(shared.mode.load(Ordering::Acquire));
                if let Some(detector) = shared.routes.lock().get_mut(&mode) {
                    detector.process(sample, started);
                }
            }
            Err(e) => {
                failures += 1;
                if failures == 1 || failures % 100 == 0 {
                    tracing::warn!("{} poller: sample failed ({}x): {}", shared.name, failures, e);
                }
            }
        }

        if let Some(remaining) = shared.period.checked_sub(started.elapsed()) {
            thread::sleep(remaining);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Constant(f32);

    impl SampleSource for Constant {
        fn fetch_sample(&mut self) -> chakra_io::Result<f32> {
            Ok(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct Counting {
        samples: Arc<AtomicUsize>,
        resets: Arc<AtomicUsize>,
    }

    impl Detector for Counting {
        fn process(&mut self, _sample: f32, _at: Instant) {
            self.samples.fetch_add(1, Ordering::SeqCst);
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn poller() -> Poller {
        Poller::new("test", Box::new(Constant(1.0)), Duration::from_millis(1))
    }

    #[test]
    fn test_unrouted_mode_is_rejected() {
        let poller = poller();
        let err = poller.start(PollingMode::LineCrossing).unwrap_err();
        assert!(matches!(
            err,
            NavError::UnroutedMode {
                mode: PollingMode::LineCrossing,
                ..
            }
        ));
        assert!(!poller.is_running());
    }

    #[test]
    fn test_routes_samples_by_mode() {
        let line = Counting::default();
        let edge = Counting::default();
        let poller = poller()
            .with_route(PollingMode::LineCrossing, Box::new(line.clone()))
            .with_route(PollingMode::EdgeDetection, Box::new(edge.clone()));

        poller.start(PollingMode::LineCrossing).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(line.samples.load(Ordering::SeqCst) > 0);
        assert_eq!(edge.samples.load(Ordering::SeqCst), 0);

        // Switching mode keeps the same thread and moves the stream
        poller.start(PollingMode::EdgeDetection).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(edge.samples.load(Ordering::SeqCst) > 0);
        assert_eq!(edge.resets.load(Ordering::SeqCst), 1);

        poller.stop();
        assert_eq!(poller.mode(), PollingMode::Idle);
    }

    #[test]
    fn test_start_is_idempotent() {
        let line = Counting::default();
        let poller = poller().with_route(PollingMode::LineCrossing, Box::new(line.clone()));
        poller.start(PollingMode::LineCrossing).unwrap();
        poller.start(PollingMode::LineCrossing).unwrap();
        assert_eq!(line.resets.load(Ordering::SeqCst), 1);
        assert!(poller.is_running());
        poller.stop();
        poller.stop();
        assert!(!poller.is_running());
    }

    #[test]
    fn test_stop_halts_sampling_and_restart_resets() {
        let line = Counting::default();
        let poller = poller().with_route(PollingMode::LineCrossing, Box::new(line.clone()));
        poller.start(PollingMode::LineCrossing).unwrap();
        thread::sleep(Duration::from_millis(20));
        poller.stop();
        thread::sleep(Duration::from_millis(20));

        let frozen = line.samples.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(line.samples.load(Ordering::SeqCst), frozen);

        poller.start(PollingMode::LineCrossing).unwrap();
        assert_eq!(line.resets.load(Ordering::SeqCst), 2);
        poller.stop();
    }
}
