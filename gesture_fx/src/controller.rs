//! Effect controller. Owns the single active effect.
//!
//! ```text
//!            start(L)                 start(L2 ≠ L)
//!   Idle ──────────────▶ Running(L) ───────────────▶ Running(L2)
//!    ▲  ◀──────────────    │   ▲                        (stop L, then start L2)
//!    │       stop()        └───┘ start(L): no-op
//!    └── stop(): no-op
//! ```
//!
//! Ramped effects run on a background thread that writes one CC value per
//! interval. The thread only holds weak handles to its [`CancelToken`] and
//! to the [`MidiSink`]; whatever makes it exit, a drop guard writes the
//! terminal value exactly once before it ends.
//!
//! `stop()` cancels, then waits a bounded time for the thread to report that
//! its reset is done. If it doesn't, the thread is abandoned and the reset is
//! written from the caller instead (the thread may still write its own later,
//! which repeats the same value).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use hand_gesture::GestureLabel;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::cancel::CancelToken;
use crate::catalog::{EffectBehavior, EffectCatalog, EffectDescriptor, EffectId, Ramp};
use crate::error::TransportError;
use crate::sink::{ControlChange, MidiSink};

pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(100);

// ════════════════════════════════════════════════════════════════════════════
// StartOutcome
// ════════════════════════════════════════════════════════════════════════════

/// What [`EffectController::start`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// A ramp thread was spawned; the ramp is still in progress on return.
    Started,
    /// The gesture's effect is already running.
    AlreadyRunning,
    /// Discrete effect: `value` was written and nothing is left running.
    Written { value: u8 },
    /// The gesture has no effect; anything running was stopped.
    NoEffect,
}

// ════════════════════════════════════════════════════════════════════════════
// ActiveEffect
// ════════════════════════════════════════════════════════════════════════════

struct ActiveEffect {
    label:      GestureLabel,
    descriptor: EffectDescriptor,
    reset:      ControlChange,
    cancel:     Arc<CancelToken>,
    /// Signalled by the ramp thread once its reset has been written.
    done:       Receiver<()>,
    handle:     JoinHandle<()>,
}

#[derive(Debug, Default)]
struct RampCounters {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl RampCounters {
    fn enter(&self) {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// EffectController
// ════════════════════════════════════════════════════════════════════════════

pub struct EffectController {
    catalog:      EffectCatalog,
    sink:         Arc<dyn MidiSink>,
    stop_timeout: Duration,
    /// Held for the whole of `start`/`stop` so transitions never interleave.
    transition:   Mutex<()>,
    active:       Mutex<Option<ActiveEffect>>,
    counters:     Arc<RampCounters>,
}

impl EffectController {
    pub fn new(catalog: EffectCatalog, sink: Arc<dyn MidiSink>) -> Self {
        EffectController {
            catalog,
            sink,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            transition:   Mutex::new(()),
            active:       Mutex::new(None),
            counters:     Arc::new(RampCounters::default()),
        }
    }

    /// How long `stop()` waits for the ramp thread before abandoning it.
    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &EffectCatalog {
        &self.catalog
    }

    /// Label of the running effect, if any.
    pub fn current(&self) -> Option<GestureLabel> {
        self.active.lock().as_ref().map(|a| a.label)
    }

    pub fn is_idle(&self) -> bool {
        self.active.lock().is_none()
    }

    /// Ramp threads that have not yet finished their reset.
    pub fn live_ramps(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Most ramp threads ever alive at once.
    pub fn peak_live_ramps(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    // ── transitions ───────────────────────────────────────────────────────

    /// Switch to the effect for `label`.
    ///
    /// A no-op when that effect is already running. Otherwise any running
    /// effect is stopped (and reset) first. Ramped effects return as soon as
    /// the thread is spawned; discrete effects write inline, and a failed
    /// write is returned to the caller.
    pub fn start(&self, label: GestureLabel) -> Result<StartOutcome, TransportError> {
        let _transition = self.transition.lock();

        if self.current() == Some(label) {
            trace!(gesture = %label, "effect already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        self.stop_running();

        let Some(descriptor) = self.catalog.lookup(label) else {
            debug!(gesture = %label, "no effect for gesture");
            return Ok(StartOutcome::NoEffect);
        };

        match descriptor.behavior {
            EffectBehavior::Discrete { value } => {
                self.sink.send(ControlChange::new(descriptor.channel, descriptor.controller, value))?;
                info!(gesture = %label, effect = %descriptor.effect, value, "effect set");
                Ok(StartOutcome::Written { value })
            }
            EffectBehavior::Ramp(ramp) => {
                let active = self.spawn_ramp(label, descriptor, ramp);
                *self.active.lock() = Some(active);
                info!(gesture = %label, effect = %descriptor.effect, cc = descriptor.controller, "effect started");
                Ok(StartOutcome::Started)
            }
        }
    }

    /// Stop the running effect and reset its controller. No-op when idle.
    pub fn stop(&self) {
        let _transition = self.transition.lock();
        self.stop_running();
    }

    /// Final stop before the process exits.
    pub fn shutdown(&self) {
        self.stop();
        debug!("effect controller shut down");
    }

    fn spawn_ramp(&self, label: GestureLabel, descriptor: EffectDescriptor, ramp: Ramp) -> ActiveEffect {
        let cancel = Arc::new(CancelToken::new());
        let (done_tx, done_rx) = mpsc::channel();
        let reset = ControlChange::new(descriptor.channel, descriptor.controller, ramp.terminal);

        self.counters.enter();
        let guard = ResetGuard {
            sink:     Arc::downgrade(&self.sink),
            reset,
            effect:   descriptor.effect,
            counters: Arc::clone(&self.counters),
            done:     done_tx,
        };
        let task = RampTask {
            effect:     descriptor.effect,
            channel:    descriptor.channel,
            controller: descriptor.controller,
            ramp,
            cancel:     Arc::downgrade(&cancel),
            sink:       Arc::downgrade(&self.sink),
        };

        let handle = thread::spawn(move || task.run(guard));

        ActiveEffect { label, descriptor, reset, cancel, done: done_rx, handle }
    }

    /// Caller must hold `transition`.
    fn stop_running(&self) {
        let active = self.active.lock().take();
        let Some(active) = active else { return };

        let effect = active.descriptor.effect;
        active.cancel.cancel();

        match active.done.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if active.handle.join().is_err() {
                    warn!(%effect, "ramp thread panicked");
                }
                info!(gesture = %active.label, %effect, "effect stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    %effect,
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "ramp thread did not exit in time, abandoning it"
                );
                if let Err(e) = self.sink.send(active.reset) {
                    warn!(%effect, error = %e, "safety-net reset failed");
                }
                // Dropping the handle detaches the thread.
            }
        }
    }
}

impl Drop for EffectController {
    fn drop(&mut self) {
        self.stop_running();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Ramp thread
// ════════════════════════════════════════════════════════════════════════════

struct RampTask {
    effect:     EffectId,
    channel:    u8,
    controller: u8,
    ramp:       Ramp,
    cancel:     Weak<CancelToken>,
    sink:       Weak<dyn MidiSink>,
}

impl RampTask {
    fn run(self, _reset: ResetGuard) {
        let mut failing = false;

        for value in self.ramp.values() {
            // A dropped token means the controller gave up on us.
            let Some(cancel) = self.cancel.upgrade() else { break };
            if cancel.is_cancelled() {
                break;
            }
            let Some(sink) = self.sink.upgrade() else { break };

            match sink.send(ControlChange::new(self.channel, self.controller, value)) {
                Ok(()) => {
                    if failing {
                        info!(effect = %self.effect, "MIDI output recovered");
                        failing = false;
                    }
                    trace!(effect = %self.effect, value, "ramp step");
                }
                Err(e) if failing => {
                    debug!(effect = %self.effect, value, error = %e, "ramp write failed");
                }
                Err(e) => {
                    warn!(effect = %self.effect, value, error = %e, "ramp write failed, continuing");
                    failing = true;
                }
            }
            drop(sink);

            if cancel.wait_timeout(self.ramp.interval) {
                break;
            }
        }
    }
}

/// Writes the terminal value when the ramp thread ends, however it ends,
/// then tells the controller it is done.
struct ResetGuard {
    sink:     Weak<dyn MidiSink>,
    reset:    ControlChange,
    effect:   EffectId,
    counters: Arc<RampCounters>,
    done:     Sender<()>,
}

impl Drop for ResetGuard {
    fn drop(&mut self) {
        if let Some(sink) = self.sink.upgrade() {
            match sink.send(self.reset) {
                Ok(()) => debug!(effect = %self.effect, value = self.reset.value, "effect reset"),
                Err(e) => warn!(effect = %self.effect, error = %e, "effect reset failed"),
            }
        }
        self.counters.leave();
        let _ = self.done.send(());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Preset;
    use crate::sink::RecordingSink;
    use std::time::Instant;

    const VOLUME: u8 = 7;
    const REVERB: u8 = 91;

    fn fast_catalog(interval_ms: u64) -> EffectCatalog {
        EffectCatalog::new(Preset::Effects).ramp(Ramp {
            interval: Duration::from_millis(interval_ms),
            ..Ramp::default()
        })
    }

    fn controller(interval_ms: u64) -> (EffectController, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::new());
        let ctl = EffectController::new(fast_catalog(interval_ms), sink.clone());
        (ctl, sink)
    }

    fn wait_until(timeout: Duration, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() { return true; }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    #[test]
    fn stop_when_idle_sends_nothing() {
        let (ctl, sink) = controller(10);
        ctl.stop();
        ctl.stop();
        assert!(sink.is_empty());
        assert!(ctl.is_idle());
    }

    #[test]
    fn full_ramp_steps_by_five_then_resets() {
        let (ctl, sink) = controller(1);
        assert_eq!(ctl.start(GestureLabel::Point), Ok(StartOutcome::Started));
        assert!(wait_until(Duration::from_secs(5), || ctl.live_ramps() == 0));

        let values = sink.values_for(VOLUME);
        let mut expected: Vec<u8> = (0..26).map(|i| 1 + 5 * i).collect();
        expected.push(0);
        assert_eq!(values, expected);

        // Finished on its own; still counts as the running gesture.
        assert_eq!(ctl.current(), Some(GestureLabel::Point));
        ctl.stop();
        assert_eq!(sink.values_for(VOLUME).len(), expected.len(), "no second reset");
    }

    #[test]
    fn ramp_steps_are_spaced_by_interval() {
        let (ctl, sink) = controller(15);
        ctl.start(GestureLabel::Point).unwrap();
        thread::sleep(Duration::from_millis(70));
        ctl.stop();

        let sent: Vec<_> = sink.sent().into_iter().filter(|s| s.cc.value != 0).collect();
        assert!(sent.len() >= 2);
        for pair in sent.windows(2) {
            assert!(pair[1].at - pair[0].at >= Duration::from_millis(14));
        }
    }

    #[test]
    fn stop_mid_ramp_resets_exactly_once() {
        let (ctl, sink) = controller(10);
        ctl.start(GestureLabel::Point).unwrap();
        thread::sleep(Duration::from_millis(35));
        ctl.stop();

        let values = sink.values_for(VOLUME);
        let (last, ramp) = values.split_last().unwrap();
        assert_eq!(*last, 0);
        assert!(!ramp.is_empty());
        assert!(ramp.windows(2).all(|w| w[1] == w[0] + 5));
        assert_eq!(values.iter().filter(|v| **v == 0).count(), 1);
        assert!(ctl.is_idle());
        assert_eq!(ctl.live_ramps(), 0);
    }

    #[test]
    fn same_gesture_twice_is_debounced() {
        let (ctl, sink) = controller(10);
        assert_eq!(ctl.start(GestureLabel::Point), Ok(StartOutcome::Started));
        assert_eq!(ctl.start(GestureLabel::Point), Ok(StartOutcome::AlreadyRunning));
        thread::sleep(Duration::from_millis(25));
        ctl.stop();

        assert_eq!(ctl.peak_live_ramps(), 1);
        let values = sink.values_for(VOLUME);
        assert_eq!(values[0], 1);
        assert_eq!(values.iter().filter(|v| **v == 0).count(), 1);
    }

    #[test]
    fn switching_resets_old_effect_before_new_one_writes() {
        let (ctl, sink) = controller(5);
        ctl.start(GestureLabel::OpenPalm).unwrap();
        thread::sleep(Duration::from_millis(20));
        ctl.start(GestureLabel::Point).unwrap();
        thread::sleep(Duration::from_millis(20));
        ctl.stop();

        let msgs = sink.messages();
        let reverb_reset = msgs.iter()
            .position(|m| m.controller == REVERB && m.value == 0)
            .expect("reverb reset");
        let first_volume = msgs.iter()
            .position(|m| m.controller == VOLUME)
            .expect("volume write");
        assert!(reverb_reset < first_volume);
        assert!(msgs[reverb_reset + 1..].iter().all(|m| m.controller != REVERB));
        assert_eq!(ctl.peak_live_ramps(), 1);
    }

    #[test]
    fn gesture_without_effect_stops_running_one() {
        let (ctl, sink) = controller(10);
        ctl.start(GestureLabel::Point).unwrap();
        thread::sleep(Duration::from_millis(15));
        assert_eq!(ctl.start(GestureLabel::Fist), Ok(StartOutcome::NoEffect));

        assert!(ctl.is_idle());
        assert_eq!(ctl.live_ramps(), 0);
        assert_eq!(sink.values_for(VOLUME).last(), Some(&0));
    }

    #[test]
    fn discrete_effect_writes_inline_and_stays_idle() {
        let sink = Arc::new(RecordingSink::new());
        let ctl = EffectController::new(EffectCatalog::new(Preset::PitchShift), sink.clone());

        assert_eq!(ctl.start(GestureLabel::MajorFifth), Ok(StartOutcome::Written { value: 100 }));
        assert!(ctl.is_idle());
        assert_eq!(ctl.peak_live_ramps(), 0);
        assert_eq!(sink.messages(), vec![ControlChange::new(1, 20, 100)]);

        ctl.stop();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn discrete_write_failure_is_reported() {
        let sink = Arc::new(RecordingSink::new());
        let ctl = EffectController::new(EffectCatalog::new(Preset::PitchShift), sink.clone());
        sink.fail_next(1);
        assert!(ctl.start(GestureLabel::Octave).is_err());
        assert_eq!(ctl.start(GestureLabel::Octave), Ok(StartOutcome::Written { value: 127 }));
    }

    #[test]
    fn transport_errors_do_not_abort_ramp() {
        let (ctl, sink) = controller(1);
        sink.fail_next(3);
        ctl.start(GestureLabel::Point).unwrap();
        assert!(wait_until(Duration::from_secs(5), || ctl.live_ramps() == 0));

        let values = sink.values_for(VOLUME);
        assert_eq!(values.first(), Some(&16));
        assert_eq!(values.last(), Some(&0));
        assert_eq!(values[values.len() - 2], 126);
    }

    #[test]
    fn stuck_ramp_is_abandoned_with_safety_net_reset() {
        let sink = Arc::new(RecordingSink::new());
        sink.set_latency(Duration::from_millis(80));
        let ctl = EffectController::new(fast_catalog(1), sink.clone())
            .stop_timeout(Duration::from_millis(10));

        ctl.start(GestureLabel::Point).unwrap();
        thread::sleep(Duration::from_millis(5));
        ctl.stop();
        assert!(ctl.is_idle());

        assert!(wait_until(Duration::from_secs(5), || ctl.live_ramps() == 0));
        let values = sink.values_for(VOLUME);
        assert_eq!(values.last(), Some(&0));
        assert_eq!(values.iter().filter(|v| **v == 0).count(), 2);
    }

    #[test]
    fn rapid_oscillation_never_overlaps_ramps() {
        let (ctl, sink) = controller(1);
        for i in 0..200 {
            let label = if i % 2 == 0 { GestureLabel::Point } else { GestureLabel::OpenPalm };
            ctl.start(label).unwrap();
            assert!(ctl.live_ramps() <= 1);
        }
        ctl.stop();

        assert_eq!(ctl.peak_live_ramps(), 1);
        assert_eq!(ctl.live_ramps(), 0);
        assert_eq!(sink.values_for(VOLUME).last(), Some(&0));
        assert_eq!(sink.values_for(REVERB).last(), Some(&0));
    }

    #[test]
    fn dropping_controller_resets_running_effect() {
        let (ctl, sink) = controller(10);
        ctl.start(GestureLabel::Peace).unwrap();
        thread::sleep(Duration::from_millis(15));
        drop(ctl);
        assert_eq!(sink.values_for(94).last(), Some(&0));
    }
}
