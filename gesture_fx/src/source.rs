//! Landmark sources.
//!
//! The public interface is [`SourceEvent`] delivered over a `mpsc` channel.
//! Consumers don't need to know whether frames came from a hand tracker, a
//! script, or lines typed on stdin.

use std::io::{self, BufRead, BufReader, Stdin};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use hand_gesture::{FingerState, GestureLabel, GestureTable, HandLandmarks};
use tracing::{debug, warn};

// ════════════════════════════════════════════════════════════════════════════
// LandmarkFrame / SourceEvent
// ════════════════════════════════════════════════════════════════════════════

/// Every hand detected in one processed video frame (possibly none).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkFrame {
    pub hands: Vec<HandLandmarks>,
}

impl LandmarkFrame {
    pub fn empty() -> Self {
        LandmarkFrame::default()
    }

    pub fn single(hand: HandLandmarks) -> Self {
        LandmarkFrame { hands: vec![hand] }
    }

    /// One synthetic hand showing `state`.
    pub fn with_fingers(state: FingerState) -> Self {
        LandmarkFrame::single(HandLandmarks::synthesize(state))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    Frame(LandmarkFrame),
    /// The user asked to quit.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver landmark frames over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource: replay a fixed list of frames
// ════════════════════════════════════════════════════════════════════════════

pub struct ScriptedSource {
    frames:       Vec<LandmarkFrame>,
    frame_period: Duration,
}

impl ScriptedSource {
    pub fn new(frames: Vec<LandmarkFrame>, frame_period: Duration) -> Self {
        ScriptedSource { frames, frame_period }
    }

    /// Hold each finger pattern for `repeat` consecutive frames.
    pub fn from_patterns(patterns: &[FingerState], repeat: usize, frame_period: Duration) -> Self {
        let frames = patterns.iter()
            .flat_map(|p| std::iter::repeat(LandmarkFrame::with_fingers(*p)).take(repeat))
            .collect();
        ScriptedSource::new(frames, frame_period)
    }
}

impl LandmarkSource for ScriptedSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        for frame in self.frames {
            if tx.send(SourceEvent::Frame(frame)).is_err() { return; }
            thread::sleep(self.frame_period);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LineSource: typed gestures, for running without a camera
// ════════════════════════════════════════════════════════════════════════════

/// Reads one gesture per line and emits a synthetic hand for it.
///
/// Accepted lines: a finger pattern (`01000`), a gesture name from the
/// active table (`point`, `open palm`), `none` or an empty line for a frame
/// with no hand, and `q`/`quit`.
pub struct LineSource<R> {
    reader: R,
    table:  GestureTable,
}

impl<R: BufRead + Send + 'static> LineSource<R> {
    pub fn new(reader: R, table: GestureTable) -> Self {
        LineSource { reader, table }
    }
}

impl LineSource<BufReader<Stdin>> {
    pub fn stdin(table: GestureTable) -> Self {
        LineSource::new(BufReader::new(io::stdin()), table)
    }
}

/// Translate one input line. `None` means the line was not understood.
pub fn parse_line(line: &str, table: GestureTable) -> Option<SourceEvent> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "q" | "quit" | "exit" => return Some(SourceEvent::Quit),
        "" | "none" | "-"     => return Some(SourceEvent::Frame(LandmarkFrame::empty())),
        _ => {}
    }
    if let Some(state) = FingerState::parse(line) {
        return Some(SourceEvent::Frame(LandmarkFrame::with_fingers(state)));
    }
    let label = GestureLabel::from_name(line)?;
    let state = table.pattern_for(label)?;
    Some(SourceEvent::Frame(LandmarkFrame::with_fingers(state)))
}

impl<R: BufRead + Send + 'static> LandmarkSource for LineSource<R> {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        let table = self.table;
        for line in self.reader.lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    warn!(error = %e, "failed to read gesture input");
                    return;
                }
            };
            let Some(event) = parse_line(&line, table) else {
                warn!(input = %line.trim(), "unrecognized gesture input");
                continue;
            };
            debug!(input = %line.trim(), "gesture input");
            let quit = event == SourceEvent::Quit;
            if tx.send(event).is_err() || quit { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_gesture::GestureClassifier;
    use std::io::Cursor;

    fn label_of(event: &SourceEvent, table: GestureTable) -> Option<GestureLabel> {
        match event {
            SourceEvent::Frame(f) => f.hands.first()
                .map(|h| GestureClassifier::new(table).classify_hand(h)),
            SourceEvent::Quit => None,
        }
    }

    #[test]
    fn parse_line_accepts_patterns_and_names() {
        let t = GestureTable::Effects;
        assert_eq!(label_of(&parse_line("01000", t).unwrap(), t), Some(GestureLabel::Point));
        assert_eq!(label_of(&parse_line("open palm", t).unwrap(), t), Some(GestureLabel::OpenPalm));
        assert_eq!(parse_line("none", t), Some(SourceEvent::Frame(LandmarkFrame::empty())));
        assert_eq!(parse_line(" Q ", t), Some(SourceEvent::Quit));
        assert_eq!(parse_line("wave", t), None);
        // Name exists but isn't in this table.
        assert_eq!(parse_line("octave", t), None);
    }

    #[test]
    fn line_source_stops_at_quit() {
        let input = Cursor::new("point\nbogus\nfist\nquit\npeace\n");
        let rx = spawn_landmark_source(LineSource::new(input, GestureTable::Effects));
        let events: Vec<SourceEvent> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(label_of(&events[0], GestureTable::Effects), Some(GestureLabel::Point));
        assert_eq!(label_of(&events[1], GestureTable::Effects), Some(GestureLabel::Fist));
        assert_eq!(events[2], SourceEvent::Quit);
    }

    #[test]
    fn scripted_source_repeats_frames() {
        let src = ScriptedSource::from_patterns(
            &[FingerState::CLOSED, FingerState::EXTENDED],
            3,
            Duration::from_millis(1),
        );
        let rx = spawn_landmark_source(src);
        let events: Vec<SourceEvent> = rx.iter().collect();
        assert_eq!(events.len(), 6);
        assert_eq!(label_of(&events[2], GestureTable::Effects), Some(GestureLabel::Fist));
        assert_eq!(label_of(&events[3], GestureTable::Effects), Some(GestureLabel::OpenPalm));
    }
}
