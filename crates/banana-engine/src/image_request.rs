use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use banana_contracts::catalog::AspectRatio;
use banana_contracts::history::{truncate_chars, HistoryEntry, HistoryStore, SourceFlow};
use banana_contracts::locale::IMAGE_FAILURE_MESSAGE;

use crate::generation::{GeneratedImage, GenerationClient, GenerationError};
use crate::SubmitRejected;

const TITLE_MAX_CHARS: usize = 50;
const EXPORT_PREFIX: &str = "nano-banana";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    Idle,
    Generating,
}

#[derive(Debug)]
pub struct PendingImage {
    prompt: String,
    aspect_ratio: AspectRatio,
}

impl PendingImage {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn dispatch(&self, client: &GenerationClient) -> Result<GeneratedImage, GenerationError> {
        client.generate_image(&self.prompt, self.aspect_ratio)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Generated,
    Failed(GenerationError),
}

/// Wallpaper generation: prompt, ratio, and a single result or error slot.
#[derive(Debug)]
pub struct ImageRequestController {
    prompt: String,
    aspect_ratio: AspectRatio,
    state: ImageState,
    result: Option<GeneratedImage>,
    error: Option<String>,
}

impl Default for ImageRequestController {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            aspect_ratio: AspectRatio::Portrait,
            state: ImageState::Idle,
            result: None,
            error: None,
        }
    }
}

impl ImageRequestController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn select_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
    }

    pub fn state(&self) -> ImageState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != ImageState::Idle
    }

    pub fn result(&self) -> Option<&GeneratedImage> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn begin_generation(&mut self) -> Result<PendingImage, SubmitRejected> {
        if self.is_busy() {
            return Err(SubmitRejected::Busy);
        }
        if self.prompt.trim().is_empty() {
            return Err(SubmitRejected::Empty);
        }
        self.state = ImageState::Generating;
        self.result = None;
        self.error = None;
        Ok(PendingImage {
            prompt: self.prompt.clone(),
            aspect_ratio: self.aspect_ratio,
        })
    }

    pub fn complete(
        &mut self,
        pending: PendingImage,
        result: Result<GeneratedImage, GenerationError>,
        history: &mut HistoryStore,
    ) -> ImageOutcome {
        self.state = ImageState::Idle;
        match result {
            Ok(image) => {
                let title = format!("{}...", truncate_chars(&pending.prompt, TITLE_MAX_CHARS));
                let entry = HistoryEntry::new(title, image.to_data_url(), SourceFlow::ImageRequest);
                if let Err(err) = history.append(entry) {
                    let message = format!("{err:#}");
                    tracing::warn!(error = %message, "history write failed; entry kept in memory");
                }
                tracing::info!(
                    bytes = image.bytes.len(),
                    mime_type = %image.mime_type,
                    "image generation completed"
                );
                self.result = Some(image);
                ImageOutcome::Generated
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "image generation failed");
                self.error = Some(IMAGE_FAILURE_MESSAGE.to_string());
                ImageOutcome::Failed(err)
            }
        }
    }

    pub fn submit(
        &mut self,
        client: &GenerationClient,
        history: &mut HistoryStore,
    ) -> Result<ImageOutcome, SubmitRejected> {
        let pending = self.begin_generation()?;
        let result = pending.dispatch(client);
        Ok(self.complete(pending, result, history))
    }

    /// Saves the current result as `nano-banana-<unix millis>.<ext>` in `dir`.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        let Some(image) = self.result.as_ref() else {
            bail!("no generated image to export");
        };
        fs::create_dir_all(dir).with_context(|| format!("failed creating {}", dir.display()))?;
        let stamp = chrono::Utc::now().timestamp_millis();
        let path = dir.join(format!("{EXPORT_PREFIX}-{stamp}.{}", image.extension()));
        fs::write(&path, &image.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), "image exported");
        Ok(path)
    }
}
