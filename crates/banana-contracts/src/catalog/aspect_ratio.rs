use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output shapes a user can ask for.
///
/// `Wide` and `Mobile` are not accepted by the image service as-is and are
/// mapped to a supported ratio before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "2:1")]
    Wide,
    #[serde(rename = "9:20")]
    Mobile,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Wide,
        AspectRatio::Mobile,
    ];

    /// Ratios offered in pickers, in display order.
    pub const PICKER: [AspectRatio; 4] = [
        AspectRatio::Square,
        AspectRatio::Landscape,
        AspectRatio::Portrait,
        AspectRatio::Mobile,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Wide => "2:1",
            AspectRatio::Mobile => "9:20",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Square => "ריבוע (1:1)",
            AspectRatio::Landscape => "לרוחב (16:9)",
            AspectRatio::Portrait => "לאורך (9:16)",
            AspectRatio::Wide => "רחב (2:1)",
            AspectRatio::Mobile => "נייד מלא (9:20)",
        }
    }

    pub fn dims(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1, 1),
            AspectRatio::Landscape => (16, 9),
            AspectRatio::Portrait => (9, 16),
            AspectRatio::Wide => (2, 1),
            AspectRatio::Mobile => (9, 20),
        }
    }

    pub fn value(self) -> f64 {
        let (width, height) = self.dims();
        width as f64 / height as f64
    }

    pub fn is_natively_supported(self) -> bool {
        matches!(
            self,
            AspectRatio::Square | AspectRatio::Landscape | AspectRatio::Portrait
        )
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['x', '/'], ":");
        let parsed = match normalized.as_str() {
            "square" => Some(AspectRatio::Square),
            "landscape" => Some(AspectRatio::Landscape),
            "portrait" => Some(AspectRatio::Portrait),
            "wide" => Some(AspectRatio::Wide),
            "mobile" | "tall" => Some(AspectRatio::Mobile),
            value => AspectRatio::ALL
                .into_iter()
                .find(|ratio| ratio.as_str() == value),
        };
        parsed.ok_or_else(|| {
            format!(
                "Unsupported aspect ratio '{}'; expected one of {}.",
                raw.trim(),
                AspectRatio::ALL
                    .iter()
                    .map(|ratio| ratio.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }
}
