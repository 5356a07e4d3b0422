use std::fs;
use std::path::Path;
use std::time::Duration;

use hand_gesture::{GestureClassifier, ThumbRule, DEFAULT_THRESHOLD};
use serde::{Deserialize, Serialize};

use crate::catalog::{
    EffectCatalog, Preset, Ramp, DEFAULT_CHANNEL, DEFAULT_RAMP_INTERVAL, DEFAULT_RAMP_STEP,
};
use crate::controller::DEFAULT_STOP_TIMEOUT;
use crate::debounce::UnknownPolicy;
use crate::error::{GestureFxError, Result};

/// Configuration for the full application. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub preset:           Preset,
    pub unknown_policy:   UnknownPolicy,
    pub thumb_rule:       ThumbRule,
    /// Margin a fingertip must clear its knuckle by, in frame units.
    pub finger_threshold: f32,
    /// MIDI channel 0–15.
    pub channel:          u8,
    pub ramp_step:        u8,
    pub ramp_interval_ms: u64,
    pub stop_timeout_ms:  u64,

    /// Passed through to the hand detector; not interpreted here.
    pub min_detection_confidence: f32,
    pub min_tracking_confidence:  f32,

    /// Substring of the output port name to prefer.
    pub midi_port:         Option<String>,
    pub virtual_port_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            preset:           Preset::default(),
            unknown_policy:   UnknownPolicy::default(),
            thumb_rule:       ThumbRule::default(),
            finger_threshold: DEFAULT_THRESHOLD,
            channel:          DEFAULT_CHANNEL,
            ramp_step:        DEFAULT_RAMP_STEP,
            ramp_interval_ms: DEFAULT_RAMP_INTERVAL.as_millis() as u64,
            stop_timeout_ms:  DEFAULT_STOP_TIMEOUT.as_millis() as u64,
            min_detection_confidence: 0.7,
            min_tracking_confidence:  0.7,
            midi_port:         None,
            virtual_port_name: "Virtual MIDI".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| GestureFxError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: AppConfig = serde_json::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.channel > 15 {
            return Err(GestureFxError::invalid(format!("channel {} is not in 0–15", self.channel)));
        }
        if self.ramp_step == 0 {
            return Err(GestureFxError::invalid("ramp_step must be at least 1"));
        }
        if self.ramp_interval_ms == 0 {
            return Err(GestureFxError::invalid("ramp_interval_ms must be at least 1"));
        }
        if self.stop_timeout_ms == 0 {
            return Err(GestureFxError::invalid("stop_timeout_ms must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.finger_threshold) {
            return Err(GestureFxError::invalid(format!(
                "finger_threshold {} is not in [0, 1]", self.finger_threshold
            )));
        }
        for (name, v) in [
            ("min_detection_confidence", self.min_detection_confidence),
            ("min_tracking_confidence",  self.min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(GestureFxError::invalid(format!("{} {} is not in [0, 1]", name, v)));
            }
        }
        Ok(())
    }

    pub fn ramp_interval(&self) -> Duration {
        Duration::from_millis(self.ramp_interval_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn classifier(&self) -> GestureClassifier {
        GestureClassifier::new(self.preset.table())
            .thumb_rule(self.thumb_rule)
            .threshold(self.finger_threshold)
    }

    pub fn catalog(&self) -> EffectCatalog {
        EffectCatalog::new(self.preset)
            .channel(self.channel)
            .ramp(Ramp {
                step:     self.ramp_step,
                interval: self.ramp_interval(),
                ..Ramp::default()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::EffectController;
    use crate::sink::RecordingSink;
    use hand_gesture::GestureLabel;
    use std::sync::Arc;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.channel, 1);
        assert_eq!(cfg.ramp_step, 5);
        assert_eq!(cfg.ramp_interval(), Duration::from_millis(100));
        assert_eq!(cfg.stop_timeout(), Duration::from_millis(100));
        assert_eq!(cfg.finger_threshold, 0.02);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = AppConfig::from_json(
            r#"{ "preset": "pitch_shift", "unknown_policy": "hold", "thumb_rule": "wrist_distance" }"#,
        ).unwrap();
        assert_eq!(cfg.preset, Preset::PitchShift);
        assert_eq!(cfg.unknown_policy, UnknownPolicy::Hold);
        assert_eq!(cfg.thumb_rule, ThumbRule::WristDistance);
        assert_eq!(cfg.ramp_step, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            AppConfig::from_json(r#"{ "channel": 16 }"#),
            Err(GestureFxError::InvalidConfig(_))
        ));
        assert!(AppConfig::from_json(r#"{ "ramp_step": 0 }"#).is_err());
        assert!(matches!(
            AppConfig::from_json(r#"{ "stop_timeout_ms": 0 }"#),
            Err(GestureFxError::InvalidConfig(_))
        ));
        assert!(AppConfig::from_json(r#"{ "min_tracking_confidence": 1.5 }"#).is_err());
        assert!(matches!(
            AppConfig::from_json(r#"{ "chorus": true }"#),
            Err(GestureFxError::ConfigParse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = AppConfig::load(Path::new("/nonexistent/gesture_fx.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gesture_fx.json"));
    }

    #[test]
    fn catalog_uses_configured_ramp() {
        let cfg = AppConfig { ramp_step: 20, channel: 3, ..AppConfig::default() };
        let d = cfg.catalog().lookup(GestureLabel::Point).unwrap();
        assert_eq!(d.channel, 3);
        let values: Vec<u8> = d.ramp().unwrap().values().collect();
        assert_eq!(values, vec![1, 21, 41, 61, 81, 101, 121, 126]);
    }

    #[test]
    fn configured_controller_keeps_one_ramp_on_slow_output() {
        let cfg = AppConfig::from_json(r#"{ "ramp_interval_ms": 1 }"#).unwrap();
        let sink = Arc::new(RecordingSink::new());
        sink.set_latency(Duration::from_millis(2));
        let ctl = EffectController::new(cfg.catalog(), sink.clone())
            .stop_timeout(cfg.stop_timeout());

        for i in 0..50 {
            let label = if i % 2 == 0 { GestureLabel::Point } else { GestureLabel::OpenPalm };
            ctl.start(label).unwrap();
        }
        ctl.stop();

        assert_eq!(ctl.peak_live_ramps(), 1);
        assert_eq!(ctl.live_ramps(), 0);
        assert_eq!(sink.values_for(7).last(), Some(&0));
        assert_eq!(sink.values_for(91).last(), Some(&0));
    }
}
