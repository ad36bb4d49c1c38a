//! Detection strategy selection.

use serde::{Deserialize, Serialize};

/// Matching strategy the tracker runs on every frame.
///
/// Template modes match trained pattern images, matrix modes decode 2D
/// barcodes, and the combined modes run both in a single pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Template matching against color pattern images.
    #[default]
    ColorTemplate,
    /// Template matching against grayscale pattern images.
    MonoTemplate,
    /// Matrix (barcode) decoding only.
    MatrixCode,
    /// Color template matching plus matrix decoding.
    ColorTemplateAndMatrix,
    /// Grayscale template matching plus matrix decoding.
    MonoTemplateAndMatrix,
}

impl DetectionMode {
    /// Whether this mode matches trained pattern templates.
    pub fn uses_templates(self) -> bool {
        !matches!(self, DetectionMode::MatrixCode)
    }

    /// Whether this mode decodes matrix barcodes.
    pub fn uses_matrix_codes(self) -> bool {
        !matches!(self, DetectionMode::ColorTemplate | DetectionMode::MonoTemplate)
    }
}

/// Bit layout of matrix (barcode) markers.
///
/// Only meaningful when the detection mode decodes matrix codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatrixCodeType {
    /// 3x3 payload, no error checking.
    #[default]
    Matrix3x3,
    /// 3x3 payload with Hamming(6,3) parity.
    Matrix3x3Hamming63,
    /// 3x3 payload with 6.5-bit parity.
    Matrix3x3Parity65,
    /// 4x4 payload, no error checking.
    Matrix4x4,
    /// 4x4 payload with BCH(13,9,3) coding.
    Matrix4x4Bch13_9_3,
    /// 4x4 payload with BCH(13,5,5) coding.
    Matrix4x4Bch13_5_5,
}

impl MatrixCodeType {
    /// Number of usable id bits for this layout.
    pub fn id_bits(self) -> u32 {
        match self {
            MatrixCodeType::Matrix3x3 => 9,
            MatrixCodeType::Matrix3x3Hamming63 => 3,
            MatrixCodeType::Matrix3x3Parity65 => 6,
            MatrixCodeType::Matrix4x4 => 16,
            MatrixCodeType::Matrix4x4Bch13_9_3 => 9,
            MatrixCodeType::Matrix4x4Bch13_5_5 => 5,
        }
    }

    /// Largest barcode id this layout can encode.
    pub fn max_id(self) -> u32 {
        (1u32 << self.id_bits()) - 1
    }
}
