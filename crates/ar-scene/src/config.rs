//! Session configuration.

use ar_scene_core::{DetectionMode, MatrixCodeType};
use serde::{Deserialize, Serialize};

/// Build-time configuration for an AR session.
///
/// All fields have usable defaults; `ArConfig::default()` gives a session
/// that template-matches color patterns at full video resolution.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArConfig {
    /// Capture width the host should request from its video pipeline. The
    /// session itself only reads the intrinsic size of the frames it gets.
    pub width: Option<u32>,
    /// Capture height hint, same caveat as `width`.
    pub height: Option<u32>,
    /// Cap on the longest edge of the tracker's processing buffer. Unset
    /// means the tracker processes frames at full video resolution.
    pub max_video_size: Option<u32>,
    /// Matching strategy applied to every frame.
    pub detection_mode: DetectionMode,
    /// Barcode bit layout. Only consulted when `detection_mode` decodes
    /// matrix codes; unset keeps the tracker's default layout.
    pub matrix_code_type: Option<MatrixCodeType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_template_matches_in_color() {
        let config = ArConfig::default();
        assert_eq!(config.detection_mode, DetectionMode::ColorTemplate);
        assert_eq!(config.matrix_code_type, None);
        assert_eq!(config.max_video_size, None);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: ArConfig =
            serde_json::from_str(r#"{"max_video_size": 640, "detection_mode": "matrix_code"}"#)
                .unwrap();
        assert_eq!(config.max_video_size, Some(640));
        assert_eq!(config.detection_mode, DetectionMode::MatrixCode);
        assert_eq!(config.width, None);
        assert_eq!(config.matrix_code_type, None);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = ArConfig {
            width: Some(1280),
            height: Some(720),
            max_video_size: Some(640),
            detection_mode: DetectionMode::MonoTemplateAndMatrix,
            matrix_code_type: Some(MatrixCodeType::Matrix4x4Bch13_9_3),
        };
        let text = serde_json::to_string(&config).unwrap();
        let back: ArConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
