mod error;
mod gemini;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use banana_contracts::catalog::{AspectRatio, StyleOption};
use serde::{Deserialize, Serialize};

use crate::attachment::{data_url, Attachment};
use crate::config::{MobileRatioPolicy, StudioConfig};

pub use error::GenerationError;
pub use gemini::GeminiService;

pub const ARCHITECT_SYSTEM_INSTRUCTION: &str = "\
You are a master Prompt Architect who speaks Hebrew. Your goal is to take user ideas and convert them into highly detailed, professional-grade image generation prompts in HEBREW.
1. Analyze the user's request, selected style, and aspect ratio.
2. Enrich the description with lighting, texture, camera angles, and artistic references suitable for the chosen style.
3. The final output PROMPT must be in HEBREW.
4. Ensure the Hebrew description is vivid, artistic, and detailed.
5. If an image is provided, analyze it and describe it in Hebrew to recreate a similar style.
";

/// Ratios the image service accepts, with their width/height value.
const SERVICE_RATIOS: [(&str, f64); 5] = [
    ("1:1", 1.0),
    ("3:4", 3.0 / 4.0),
    ("4:3", 4.0 / 3.0),
    ("9:16", 9.0 / 16.0),
    ("16:9", 16.0 / 9.0),
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "inline_data", skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub model: String,
    pub system_instruction: Option<String>,
    pub parts: Vec<ContentPart>,
    /// Only set for image requests; always a value the service accepts.
    pub aspect_ratio: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

impl ContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    /// First part, across all candidates, carrying non-empty inline data.
    pub fn first_inline_data(&self) -> Option<&InlineData> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.trim().is_empty())
    }
}

pub trait GenerationService: Send + Sync {
    fn name(&self) -> &str;
    fn generate_content(&self, request: &ContentRequest)
        -> Result<ContentResponse, GenerationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl GeneratedImage {
    pub fn to_data_url(&self) -> String {
        data_url(&self.mime_type, &self.bytes)
    }

    pub fn extension(&self) -> &'static str {
        let lowered = self.mime_type.to_ascii_lowercase();
        if lowered.contains("jpeg") || lowered.contains("jpg") {
            return "jpg";
        }
        if lowered.contains("webp") {
            return "webp";
        }
        "png"
    }
}

/// Turns local requests into service calls and normalizes the results.
///
/// No caching, deduplication or retries: every call is one dispatch.
pub struct GenerationClient {
    service: Box<dyn GenerationService>,
    text_model: String,
    image_model: String,
    mobile_ratio_policy: MobileRatioPolicy,
}

impl GenerationClient {
    pub fn new<S: GenerationService + 'static>(service: S, config: &StudioConfig) -> Self {
        Self {
            service: Box::new(service),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            mobile_ratio_policy: config.mobile_ratio_policy,
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(GeminiService::new(config), config)
    }

    pub fn refine_conversation(
        &self,
        prompt_text: &str,
        style: &StyleOption,
        aspect_ratio: AspectRatio,
        image: Option<&Attachment>,
    ) -> Result<String, GenerationError> {
        let composite = compose_refinement_prompt(prompt_text, style, aspect_ratio, image.is_some());
        let mut parts = Vec::new();
        if let Some(image) = image {
            parts.push(image.to_content_part());
        }
        parts.push(ContentPart::text(composite));

        let request = ContentRequest {
            model: self.text_model.clone(),
            system_instruction: Some(ARCHITECT_SYSTEM_INSTRUCTION.to_string()),
            parts,
            aspect_ratio: None,
        };
        tracing::info!(
            service = self.service.name(),
            model = %request.model,
            style = %style.id,
            %aspect_ratio,
            with_image = image.is_some(),
            "dispatching prompt refinement"
        );
        let response = self.service.generate_content(&request)?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GenerationError::NoContent("text"));
        }
        Ok(text)
    }

    pub fn generate_image(
        &self,
        prompt_text: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<GeneratedImage, GenerationError> {
        let target_ratio = map_aspect_ratio(aspect_ratio, self.mobile_ratio_policy)?;
        let request = ContentRequest {
            model: self.image_model.clone(),
            system_instruction: None,
            parts: vec![ContentPart::text(prompt_text)],
            aspect_ratio: Some(target_ratio.to_string()),
        };
        tracing::info!(
            service = self.service.name(),
            model = %request.model,
            requested = %aspect_ratio,
            dispatched = target_ratio,
            "dispatching image generation"
        );
        let response = self.service.generate_content(&request)?;
        let inline = response
            .first_inline_data()
            .ok_or(GenerationError::NoContent("image data"))?;
        let bytes = BASE64
            .decode(inline.data.trim().as_bytes())
            .map_err(|err| GenerationError::MalformedResponse(format!("image base64: {err}")))?;
        let mime_type = if inline.mime_type.trim().is_empty() {
            "image/png".to_string()
        } else {
            inline.mime_type.clone()
        };
        Ok(GeneratedImage { bytes, mime_type })
    }
}

/// User text plus style, target ratio and an attached-image note, in the
/// layout the prompt architect instruction expects.
pub fn compose_refinement_prompt(
    prompt_text: &str,
    style: &StyleOption,
    aspect_ratio: AspectRatio,
    has_image: bool,
) -> String {
    let mut composite = prompt_text.to_string();
    if !style.is_none() {
        composite.push_str(&format!(
            "\n\nTarget Style: {} ({})",
            style.label, style.prompt_modifier
        ));
    }
    composite.push_str(&format!("\nTarget Aspect Ratio: {aspect_ratio}"));
    if has_image {
        composite.push_str("\n(An image is attached for visual reference/analysis)");
    }
    composite
}

/// Maps a requested ratio to the value dispatched to the image service.
///
/// Native ratios pass through. Others snap to the nearest accepted ratio,
/// unless the policy rejects the mobile ratio outright.
pub fn map_aspect_ratio(
    ratio: AspectRatio,
    policy: MobileRatioPolicy,
) -> Result<&'static str, GenerationError> {
    if ratio == AspectRatio::Mobile && policy == MobileRatioPolicy::Reject {
        return Err(GenerationError::UnsupportedAspectRatio(ratio));
    }
    if ratio.is_natively_supported() {
        return Ok(ratio.as_str());
    }
    let target = ratio.value();
    let mut best_key = "1:1";
    let mut best_delta = f64::MAX;
    for (key, value) in SERVICE_RATIOS {
        let delta = (value - target).abs();
        if delta < best_delta {
            best_key = key;
            best_delta = delta;
        }
    }
    Ok(best_key)
}


#[cfg(test)]
mod tests {
    use banana_contracts::catalog::{AspectRatio, StyleCatalog, StyleOption};
    use serde_json::json;

    use super::testing::ScriptedService;
    use super::{
        compose_refinement_prompt, map_aspect_ratio, ContentResponse, GenerationClient,
        GenerationError, ARCHITECT_SYSTEM_INSTRUCTION,
    };
    use crate::attachment::Attachment;
    use crate::config::{MobileRatioPolicy, StudioConfig};

    fn client_with(service: &ScriptedService, policy: MobileRatioPolicy) -> GenerationClient {
        let config = StudioConfig {
            mobile_ratio_policy: policy,
            ..StudioConfig::default()
        };
        GenerationClient::new(service.clone(), &config)
    }

    #[test]
    fn aspect_ratio_mapping_matches_service_contract() -> anyhow::Result<()> {
        let policy = MobileRatioPolicy::MapToPortrait;
        assert_eq!(map_aspect_ratio(AspectRatio::Square, policy)?, "1:1");
        assert_eq!(map_aspect_ratio(AspectRatio::Landscape, policy)?, "16:9");
        assert_eq!(map_aspect_ratio(AspectRatio::Portrait, policy)?, "9:16");
        assert_eq!(map_aspect_ratio(AspectRatio::Mobile, policy)?, "9:16");
        assert_eq!(map_aspect_ratio(AspectRatio::Wide, policy)?, "16:9");
        Ok(())
    }

    #[test]
    fn reject_policy_refuses_mobile_before_dispatch() {
        let service = ScriptedService::new();
        let client = client_with(&service, MobileRatioPolicy::Reject);
        let result = client.generate_image("tall tower", AspectRatio::Mobile);
        assert_eq!(
            result.err(),
            Some(GenerationError::UnsupportedAspectRatio(AspectRatio::Mobile))
        );
        assert!(service.requests().is_empty());
    }

    #[test]
    fn dispatched_ratio_is_mapped_value() -> anyhow::Result<()> {
        let service = ScriptedService::new();
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        for ratio in [
            AspectRatio::Square,
            AspectRatio::Landscape,
            AspectRatio::Portrait,
            AspectRatio::Mobile,
        ] {
            service.push_image("image/png", b"png");
            client.generate_image("wallpaper", ratio)?;
        }
        let dispatched = service
            .requests()
            .into_iter()
            .map(|request| request.aspect_ratio.unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(dispatched, vec!["1:1", "16:9", "9:16", "9:16"]);
        Ok(())
    }

    #[test]
    fn composite_prompt_includes_style_ratio_and_image_note() {
        let catalog = StyleCatalog::default();
        let pixar = catalog.get("pixar").cloned().unwrap_or_else(StyleOption::none);
        let composite = compose_refinement_prompt("a fox", &pixar, AspectRatio::Landscape, true);
        assert_eq!(
            composite,
            format!(
                "a fox\n\nTarget Style: {} ({})\nTarget Aspect Ratio: 16:9\n(An image is attached for visual reference/analysis)",
                pixar.label, pixar.prompt_modifier
            )
        );

        let plain =
            compose_refinement_prompt("a fox", &StyleOption::none(), AspectRatio::Square, false);
        assert_eq!(plain, "a fox\nTarget Aspect Ratio: 1:1");
    }

    #[test]
    fn refine_sends_image_first_with_system_instruction() -> anyhow::Result<()> {
        let service = ScriptedService::new();
        service.push_text("פרומפט מפורט");
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        let attachment = Attachment::new("ref.png", "image/png", b"img".to_vec());

        let text = client.refine_conversation(
            "חתול",
            &StyleOption::none(),
            AspectRatio::Portrait,
            Some(&attachment),
        )?;
        assert_eq!(text, "פרומפט מפורט");

        let requests = service.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(
            request.system_instruction.as_deref(),
            Some(ARCHITECT_SYSTEM_INSTRUCTION)
        );
        assert!(request.aspect_ratio.is_none());
        assert_eq!(request.parts.len(), 2);
        assert!(request.parts[0].inline_data.is_some());
        assert!(request.parts[1]
            .text
            .as_deref()
            .unwrap_or_default()
            .ends_with("(An image is attached for visual reference/analysis)"));
        Ok(())
    }

    #[test]
    fn empty_text_response_is_no_content() {
        let service = ScriptedService::new();
        service.push(Ok(ContentResponse::default()));
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        let result =
            client.refine_conversation("x", &StyleOption::none(), AspectRatio::Square, None);
        assert_eq!(result.err(), Some(GenerationError::NoContent("text")));
    }

    #[test]
    fn image_result_bytes_equal_inline_part_data() -> anyhow::Result<()> {
        let service = ScriptedService::new();
        service.push_image("image/jpeg", b"\xff\xd8jpeg-bytes");
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        let image = client.generate_image("dunes", AspectRatio::Portrait)?;
        assert_eq!(image.bytes, b"\xff\xd8jpeg-bytes".to_vec());
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.extension(), "jpg");
        assert!(image.to_data_url().starts_with("data:image/jpeg;base64,"));
        Ok(())
    }

    #[test]
    fn image_response_without_inline_data_fails() {
        let service = ScriptedService::new();
        service.push_text("I can only describe it");
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        let result = client.generate_image("dunes", AspectRatio::Square);
        assert_eq!(result.err(), Some(GenerationError::NoContent("image data")));
    }

    #[test]
    fn undecodable_image_data_is_malformed() {
        let service = ScriptedService::new();
        let response: ContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [
                {"inline_data": {"mime_type": "image/png", "data": "***"}}
            ]}}]
        }))
        .unwrap_or_default();
        service.push(Ok(response));
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        let result = client.generate_image("dunes", AspectRatio::Square);
        assert!(matches!(result, Err(GenerationError::MalformedResponse(_))));
    }

    #[test]
    fn inline_data_search_skips_empty_parts_and_candidates() {
        let response: ContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": ""}}]}},
                {},
                {"content": {"parts": [{"inlineData": {"mimeType": "image/webp", "data": "AAAA"}}]}}
            ]
        }))
        .unwrap_or_default();
        let inline = response.first_inline_data().cloned().unwrap_or_default();
        assert_eq!(inline.mime_type, "image/webp");
        assert_eq!(response.text(), "");
    }

    #[test]
    fn service_errors_pass_through() {
        let service = ScriptedService::new();
        service.push(Err(GenerationError::Service {
            status: 429,
            body: "quota".to_string(),
        }));
        let client = client_with(&service, MobileRatioPolicy::MapToPortrait);
        let result =
            client.refine_conversation("x", &StyleOption::none(), AspectRatio::Square, None);
        assert_eq!(result.err().map(|err| err.kind()), Some("service"));
    }
}
