//! MIDI Control Change output.
//!
//! Everything downstream of the controller talks to a [`MidiSink`]. The
//! real backend is [`MidirSink`]; [`NullSink`], [`LogSink`] and
//! [`RecordingSink`] stand in when there is no port, for `--dry-run`, and
//! in tests.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{GestureFxError, TransportError};

const CLIENT_NAME: &str = "gesture_fx";

// ════════════════════════════════════════════════════════════════════════════
// ControlChange
// ════════════════════════════════════════════════════════════════════════════

/// A MIDI Control Change. Fields are clamped into range on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlChange {
    /// 0–15
    pub channel:    u8,
    /// 0–127
    pub controller: u8,
    /// 0–127
    pub value:      u8,
}

impl ControlChange {
    pub fn new(channel: u8, controller: u8, value: u8) -> Self {
        ControlChange {
            channel:    channel.min(15),
            controller: controller.min(127),
            value:      value.min(127),
        }
    }

    /// Wire bytes: `[0xB0 | channel, controller, value]`.
    pub fn bytes(&self) -> [u8; 3] {
        [0xB0 | (self.channel & 0x0F), self.controller & 0x7F, self.value & 0x7F]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiSink
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver Control Change messages. Shared between the
/// caller's thread and the ramp thread, so sends take `&self`.
pub trait MidiSink: Send + Sync {
    fn send(&self, cc: ControlChange) -> Result<(), TransportError>;
}

// ── midir backend ─────────────────────────────────────────────────────────

pub struct MidirSink {
    conn:      Mutex<MidiOutputConnection>,
    port_name: String,
}

impl MidirSink {
    /// Open an output port.
    ///
    /// With `port_hint` the first port whose name contains it
    /// (case-insensitive) is used, otherwise the first port. When nothing
    /// matches a virtual port called `virtual_name` is created instead.
    pub fn open(port_hint: Option<&str>, virtual_name: &str) -> Result<Self, GestureFxError> {
        let midi_out = MidiOutput::new(CLIENT_NAME)
            .map_err(|e| GestureFxError::MidiInit(e.to_string()))?;

        let ports = midi_out.ports();
        let hint  = port_hint.map(str::to_lowercase);
        let chosen = ports.iter().find(|p| match &hint {
            Some(h) => midi_out
                .port_name(p)
                .map(|n| n.to_lowercase().contains(h.as_str()))
                .unwrap_or(false),
            None => true,
        });

        let Some(port) = chosen else {
            if let Some(h) = port_hint {
                warn!(hint = h, "no MIDI output port matches");
            }
            return Self::open_virtual(midi_out, virtual_name);
        };

        let name = midi_out.port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());
        info!(port = %name, "opening MIDI output port");

        let conn = midi_out
            .connect(port, "gesture-fx-out")
            .map_err(|e| GestureFxError::MidiConnect(e.to_string()))?;
        Ok(MidirSink { conn: Mutex::new(conn), port_name: name })
    }

    #[cfg(unix)]
    fn open_virtual(midi_out: MidiOutput, name: &str) -> Result<Self, GestureFxError> {
        use midir::os::unix::VirtualOutput;

        info!(port = name, "creating virtual MIDI output port");
        let conn = midi_out
            .create_virtual(name)
            .map_err(|e| GestureFxError::MidiConnect(e.to_string()))?;
        Ok(MidirSink { conn: Mutex::new(conn), port_name: name.to_string() })
    }

    #[cfg(not(unix))]
    fn open_virtual(_midi_out: MidiOutput, name: &str) -> Result<Self, GestureFxError> {
        Err(GestureFxError::MidiConnect(format!(
            "no MIDI output ports, and virtual port {name:?} is not supported on this platform"
        )))
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiSink for MidirSink {
    fn send(&self, cc: ControlChange) -> Result<(), TransportError> {
        self.conn.lock()
            .send(&cc.bytes())
            .map_err(|e| TransportError::Send(e.to_string()))?;
        debug!(channel = cc.channel, cc = cc.controller, value = cc.value, "sent MIDI");
        Ok(())
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

pub struct NullSink;

impl MidiSink for NullSink {
    fn send(&self, _cc: ControlChange) -> Result<(), TransportError> { Ok(()) }
}

// ── log backend (dry run) ─────────────────────────────────────────────────

pub struct LogSink;

impl MidiSink for LogSink {
    fn send(&self, cc: ControlChange) -> Result<(), TransportError> {
        info!(channel = cc.channel, cc = cc.controller, value = cc.value, "MIDI (dry run)");
        Ok(())
    }
}

// ── recording backend ─────────────────────────────────────────────────────

/// One message captured by [`RecordingSink`].
#[derive(Clone, Copy, Debug)]
pub struct Sent {
    pub cc: ControlChange,
    pub at: Instant,
}

#[derive(Default)]
struct RecorderState {
    sent:       Vec<Sent>,
    fail_next:  usize,
}

/// Keeps every message it is given, in order. Can simulate a slow device
/// (`latency`) or a flaky one (`fail_next`); failed sends are not recorded.
#[derive(Default)]
pub struct RecordingSink {
    state:   Mutex<RecorderState>,
    latency: Mutex<Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        RecordingSink::default()
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Make the next `n` sends fail.
    pub fn fail_next(&self, n: usize) {
        self.state.lock().fail_next = n;
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().sent.clone()
    }

    pub fn messages(&self) -> Vec<ControlChange> {
        self.state.lock().sent.iter().map(|s| s.cc).collect()
    }

    /// Values sent to one controller number, in order.
    pub fn values_for(&self, controller: u8) -> Vec<u8> {
        self.state.lock().sent.iter()
            .filter(|s| s.cc.controller == controller)
            .map(|s| s.cc.value)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MidiSink for RecordingSink {
    fn send(&self, cc: ControlChange) -> Result<(), TransportError> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            thread::sleep(latency);
        }
        let mut state = self.state.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(TransportError::Send("simulated failure".to_string()));
        }
        state.sent.push(Sent { cc, at: Instant::now() });
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output / list_ports
// ════════════════════════════════════════════════════════════════════════════

/// Open a [`MidirSink`], falling back to [`NullSink`] with a warning if no
/// port can be opened.
pub fn open_midi_output(port_hint: Option<&str>, virtual_name: &str) -> Arc<dyn MidiSink> {
    match MidirSink::open(port_hint, virtual_name) {
        Ok(sink) => {
            info!(port = sink.port_name(), "MIDI output ready");
            Arc::new(sink)
        }
        Err(e) => {
            warn!(error = %e, "MIDI output unavailable, using null output");
            Arc::new(NullSink)
        }
    }
}

/// Names of all MIDI output ports currently visible.
pub fn list_ports() -> Result<Vec<String>, GestureFxError> {
    let midi_out = MidiOutput::new(CLIENT_NAME)
        .map_err(|e| GestureFxError::MidiInit(e.to_string()))?;
    Ok(midi_out.ports().iter().enumerate()
        .map(|(i, p)| midi_out.port_name(p).unwrap_or_else(|_| format!("Unknown port {}", i)))
        .collect())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
