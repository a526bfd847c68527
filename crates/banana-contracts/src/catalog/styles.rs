use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const NO_STYLE_ID: &str = "none";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleOption {
    pub id: String,
    pub label: String,
    pub prompt_modifier: String,
}

impl StyleOption {
    pub fn none() -> Self {
        Self {
            id: NO_STYLE_ID.to_string(),
            label: "ללא סגנון".to_string(),
            prompt_modifier: String::new(),
        }
    }

    /// The "no style" option contributes nothing to a composed prompt.
    pub fn is_none(&self) -> bool {
        self.id == NO_STYLE_ID
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSelection {
    pub style: StyleOption,
    pub requested: Option<String>,
    pub fallback_reason: Option<String>,
}

/// Ordered, read-only catalog of prompt styles.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    styles: IndexMap<String, StyleOption>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StyleCatalog {
    pub fn new(styles: Option<IndexMap<String, StyleOption>>) -> Self {
        Self {
            styles: styles
                .filter(|styles| !styles.is_empty())
                .unwrap_or_else(default_styles),
        }
    }

    pub fn get(&self, id: &str) -> Option<&StyleOption> {
        self.styles.get(id)
    }

    pub fn list(&self) -> impl Iterator<Item = &StyleOption> {
        self.styles.values()
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }

    pub fn default_style(&self) -> StyleOption {
        self.get(NO_STYLE_ID)
            .or_else(|| self.styles.values().next())
            .cloned()
            .unwrap_or_else(StyleOption::none)
    }

    pub fn select(&self, requested: Option<&str>) -> StyleSelection {
        let Some(requested_id) = requested.map(str::trim).filter(|value| !value.is_empty()) else {
            return StyleSelection {
                style: self.default_style(),
                requested: None,
                fallback_reason: None,
            };
        };
        let normalized = requested_id.to_ascii_lowercase();
        if let Some(style) = self.get(&normalized) {
            return StyleSelection {
                style: style.clone(),
                requested: Some(requested_id.to_string()),
                fallback_reason: None,
            };
        }
        StyleSelection {
            style: self.default_style(),
            requested: Some(requested_id.to_string()),
            fallback_reason: Some(format!(
                "Unknown style '{requested_id}'; using '{}'.",
                self.default_style().id
            )),
        }
    }
}

fn default_styles() -> IndexMap<String, StyleOption> {
    let mut map = IndexMap::new();

    let mut insert = |id: &str, label: &str, prompt_modifier: &str| {
        map.insert(
            id.to_string(),
            StyleOption {
                id: id.to_string(),
                label: label.to_string(),
                prompt_modifier: prompt_modifier.to_string(),
            },
        );
    };

    insert(NO_STYLE_ID, "ללא סגנון", "");
    insert(
        "disney",
        "דיסני",
        "Disney animation style, classic disney, 2d animation, magical, hand drawn effect, expressive characters, vibrant colors",
    );
    insert(
        "pixar",
        "פיקסאר",
        "Pixar style, 3d render, cgsociety, cute, volumetric lighting, highly detailed, expressive, cinematic",
    );
    insert(
        "ukiyo-e",
        "אוקיו-אה",
        "Ukiyo-e style, japanese woodblock print, hokusai style, flat colors, outlines, traditional japanese art",
    );
    insert(
        "suibokuga",
        "סויבוקוגה",
        "Suibokuga style, japanese ink wash painting, sumi-e, brush strokes, minimalistic, monochromatic, zen aesthetic",
    );
    insert(
        "cyberpunk",
        "סייברפאנק",
        "cyberpunk aesthetic, neon lights, high tech low life, futuristic, detailed, 8k, unreal engine 5 render",
    );
    insert(
        "studio-ghibli",
        "אנימה (ג'יבלי)",
        "Studio Ghibli style, anime, hayao miyazaki, hand drawn, vibrant colors, lush background, detailed",
    );
    insert(
        "photorealistic",
        "פוטו-ריאליסטי",
        "photorealistic, 8k, highly detailed, cinematic lighting, shot on 35mm, depth of field",
    );
    insert(
        "oil-painting",
        "ציור שמן",
        "oil painting, textured brushstrokes, classical art style, masterpiece, intricate details",
    );
    insert(
        "fantasy",
        "פנטזיה אפלה",
        "dark fantasy, rpg style, digital art, greg rutkowski, dramatic lighting, intricate, detailed",
    );
    insert(
        "synthwave",
        "סינת'ווייב",
        "synthwave, retrowave, 80s aesthetic, purple and pink grid, sunset, digital art",
    );

    map
}
