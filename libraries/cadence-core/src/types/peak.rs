/// Peak (segment preview) window configuration
use serde::{Deserialize, Serialize};

/// Preview window configuration
///
/// A preview plays `duration` seconds from a song's `peakStartTime`, then
/// `after` more seconds of trailing audio. `lay_out` is the lookahead used to
/// signal an approaching boundary before it is crossed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PeakConfig {
    /// Length of the preview window in seconds
    pub duration: f64,

    /// Trailing audio after the window in seconds
    pub after: f64,

    /// Boundary lookahead in seconds
    #[serde(alias = "layout")]
    pub lay_out: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            duration: 30.0,
            after: 5.0,
            lay_out: 2.0,
        }
    }
}

impl PeakConfig {
    /// End of the preview window for a given start time
    ///
    /// `peak_start + duration + after`, uncapped.
    pub fn end_time(&self, peak_start: f64) -> f64 {
        peak_start + self.duration + self.after
    }

    /// Merge a partial update into this configuration
    ///
    /// Keys absent from the patch are preserved.
    pub fn merge(&mut self, patch: &PeakConfigPatch) {
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(after) = patch.after {
            self.after = after;
        }
        if let Some(lay_out) = patch.lay_out {
            self.lay_out = lay_out;
        }
    }
}

/// Partial `PeakConfig` update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakConfigPatch {
    /// Replaces `PeakConfig::duration` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// Replaces `PeakConfig::after` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<f64>,

    /// Replaces `PeakConfig::lay_out` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lay_out: Option<f64>,
}

impl From<PeakConfig> for PeakConfigPatch {
    fn from(config: PeakConfig) -> Self {
        Self {
            duration: Some(config.duration),
            after: Some(config.after),
            lay_out: Some(config.lay_out),
        }
    }
}

/// Argument of `changePeak`: both halves optional
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakUpdate {
    /// Replaces the session's peak start when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_start_time: Option<f64>,

    /// Deep-merged into the session's config when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_config: Option<PeakConfigPatch>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_time_adds_duration_and_after() {
        let config = PeakConfig {
            duration: 20.0,
            after: 5.0,
            lay_out: 2.0,
        };
        assert_eq!(config.end_time(10.0), 35.0);
    }

    #[test]
    fn merge_preserves_missing_keys() {
        let mut config = PeakConfig::default();
        config.merge(&PeakConfigPatch {
            lay_out: Some(4.0),
            ..PeakConfigPatch::default()
        });

        assert_eq!(config.lay_out, 4.0);
        assert_eq!(config.duration, PeakConfig::default().duration);
        assert_eq!(config.after, PeakConfig::default().after);
    }

    #[test]
    fn peak_config_uses_camel_case_keys() {
        let json = serde_json::to_value(PeakConfig::default()).unwrap();
        assert!(json.get("layOut").is_some());

        let update: PeakUpdate =
            serde_json::from_str(r#"{ "peakStartTime": 12.0, "peakConfig": { "after": 1.0 } }"#)
                .unwrap();
        assert_eq!(update.peak_start_time, Some(12.0));
        assert_eq!(update.peak_config.unwrap().after, Some(1.0));
        assert_eq!(update.peak_config.unwrap().duration, None);
    }

    #[test]
    fn lowercased_key_is_accepted() {
        let config: PeakConfig = serde_json::from_str(r#"{ "layout": 4.0 }"#).unwrap();
        assert_eq!(config.lay_out, 4.0);
        assert_eq!(config.duration, 30.0);
    }
}
