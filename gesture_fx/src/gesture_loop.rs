//! The recognition loop: frames in, controller transitions out.
//!
//! `GestureLoop` classifies the first hand of each frame, debounces the
//! label, and drives the [`EffectController`]. Frames with no hand are
//! skipped, so a gesture briefly lost by the tracker keeps its effect.

use std::sync::mpsc::Receiver;

use hand_gesture::{GestureClassifier, GestureLabel};
use tracing::{debug, info, trace, warn};

use crate::controller::EffectController;
use crate::debounce::{Action, Debouncer, UnknownPolicy};
use crate::source::{LandmarkFrame, SourceEvent};

pub struct GestureLoop<'a> {
    classifier: GestureClassifier,
    debouncer:  Debouncer,
    controller: &'a EffectController,
    frames:     u64,
}

impl<'a> GestureLoop<'a> {
    pub fn new(
        classifier: GestureClassifier,
        policy:     UnknownPolicy,
        controller: &'a EffectController,
    ) -> Self {
        GestureLoop {
            classifier,
            debouncer: Debouncer::new(policy),
            controller,
            frames: 0,
        }
    }

    /// Last label that reached the controller.
    pub fn current_label(&self) -> Option<GestureLabel> {
        self.debouncer.previous()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Handle one frame. Returns the label of the classified hand, or `None`
    /// when the frame had no hand.
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Option<GestureLabel> {
        self.frames += 1;

        let Some(hand) = frame.hands.first() else {
            trace!(frame = self.frames, "no hand");
            return None;
        };
        if frame.hands.len() > 1 {
            trace!(frame = self.frames, hands = frame.hands.len(), "extra hands ignored");
        }

        let fingers = self.classifier.finger_states(hand);
        let label   = self.classifier.classify(fingers);
        trace!(frame = self.frames, %fingers, gesture = %label, "classified");

        match self.debouncer.observe(label) {
            Some(Action::Start(l)) => {
                debug!(gesture = %l, %fingers, "gesture changed");
                if let Err(e) = self.controller.start(l) {
                    warn!(gesture = %l, error = %e, "effect write failed, will retry");
                    self.debouncer.forget();
                }
            }
            Some(Action::Stop) => {
                debug!("gesture lost");
                self.controller.stop();
            }
            None => {}
        }
        Some(label)
    }

    /// Consume events until the source quits or disconnects, then shut the
    /// controller down so every controller value is reset.
    pub fn run(&mut self, rx: Receiver<SourceEvent>) {
        for event in rx {
            match event {
                SourceEvent::Frame(frame) => { self.process_frame(&frame); }
                SourceEvent::Quit => {
                    info!("quit requested");
                    break;
                }
            }
        }
        self.controller.shutdown();
        info!(frames = self.frames, "gesture loop finished");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
