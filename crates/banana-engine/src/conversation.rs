use banana_contracts::catalog::{AspectRatio, StyleCatalog, StyleOption, StyleSelection};
use banana_contracts::chat::{Role, Transcript};
use banana_contracts::history::{truncate_chars, HistoryEntry, HistoryStore, SourceFlow};
use banana_contracts::locale::{
    CONVERSATION_FAILURE_MESSAGE, IMAGE_ANALYSIS_TITLE, SURPRISE_PROMPTS,
};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::attachment::Attachment;
use crate::generation::{GenerationClient, GenerationError};
use crate::SubmitRejected;

const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingResponse,
}

/// Everything one submission bound at the moment it was accepted.
///
/// Only `begin_submission` creates one, and `complete` consumes it.
#[derive(Debug)]
pub struct PendingRefinement {
    prompt_text: String,
    style: StyleOption,
    aspect_ratio: AspectRatio,
    attachment: Option<Attachment>,
}

impl PendingRefinement {
    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn style(&self) -> &StyleOption {
        &self.style
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Runs the refinement call for this submission.
    pub fn dispatch(&self, client: &GenerationClient) -> Result<String, GenerationError> {
        client.refine_conversation(
            &self.prompt_text,
            &self.style,
            self.aspect_ratio,
            self.attachment.as_ref(),
        )
    }

    fn history_title(&self) -> String {
        let trimmed = self.prompt_text.trim();
        if trimmed.is_empty() {
            return IMAGE_ANALYSIS_TITLE.to_string();
        }
        truncate_chars(trimmed, TITLE_MAX_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationOutcome {
    Replied(String),
    Failed(GenerationError),
}

/// Prompt-refinement chat: transcript, input state and the request
/// lifecycle. At most one request is in flight; submissions made while one
/// is pending are rejected.
#[derive(Debug)]
pub struct ConversationController {
    styles: StyleCatalog,
    transcript: Transcript,
    input: String,
    style: StyleOption,
    aspect_ratio: AspectRatio,
    attachment: Option<Attachment>,
    state: ConversationState,
}

impl Default for ConversationController {
    fn default() -> Self {
        Self::new(StyleCatalog::default())
    }
}

impl ConversationController {
    pub fn new(styles: StyleCatalog) -> Self {
        let style = styles.default_style();
        Self {
            styles,
            transcript: Transcript::with_welcome(),
            input: String::new(),
            style,
            aspect_ratio: AspectRatio::Landscape,
            attachment: None,
            state: ConversationState::Idle,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != ConversationState::Idle
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn style(&self) -> &StyleOption {
        &self.style
    }

    pub fn styles(&self) -> &StyleCatalog {
        &self.styles
    }

    pub fn select_style(&mut self, id: &str) -> StyleSelection {
        let selection = self.styles.select(Some(id));
        self.style = selection.style.clone();
        selection
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn select_aspect_ratio(&mut self, ratio: AspectRatio) {
        self.aspect_ratio = ratio;
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn attach(&mut self, attachment: Attachment) {
        self.attachment = Some(attachment);
    }

    pub fn clear_attachment(&mut self) {
        self.attachment = None;
    }

    /// Replaces the input with a random idea from the surprise list.
    pub fn surprise_me<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &str {
        if let Some(idea) = SURPRISE_PROMPTS.choose(rng) {
            self.input = (*idea).to_string();
        }
        &self.input
    }

    pub fn last_assistant_text(&self) -> Option<&str> {
        self.transcript
            .last_by_role(Role::Assistant)
            .map(|message| message.text.as_str())
    }

    pub fn begin_submission(&mut self) -> Result<PendingRefinement, SubmitRejected> {
        if self.is_busy() {
            return Err(SubmitRejected::Busy);
        }
        if self.input.trim().is_empty() && self.attachment.is_none() {
            return Err(SubmitRejected::Empty);
        }

        let prompt_text = std::mem::take(&mut self.input);
        let image = self.attachment.as_ref().map(Attachment::to_data_url);
        self.transcript.push(Role::User, prompt_text.clone(), image);
        self.state = ConversationState::AwaitingResponse;

        Ok(PendingRefinement {
            prompt_text,
            style: self.style.clone(),
            aspect_ratio: self.aspect_ratio,
            attachment: self.attachment.clone(),
        })
    }

    pub fn complete(
        &mut self,
        pending: PendingRefinement,
        result: Result<String, GenerationError>,
        history: &mut HistoryStore,
    ) -> ConversationOutcome {
        self.state = ConversationState::Idle;
        match result {
            Ok(text) => {
                self.transcript.push(Role::Assistant, text.clone(), None);
                let entry =
                    HistoryEntry::new(pending.history_title(), text.clone(), SourceFlow::Conversation);
                if let Err(err) = history.append(entry) {
                    let message = format!("{err:#}");
                    tracing::warn!(error = %message, "history write failed; entry kept in memory");
                }
                self.attachment = None;
                tracing::info!(chars = text.chars().count(), "prompt refinement completed");
                ConversationOutcome::Replied(text)
            }
            Err(err) => {
                tracing::warn!(kind = err.kind(), error = %err, "prompt refinement failed");
                self.transcript
                    .push(Role::Assistant, CONVERSATION_FAILURE_MESSAGE, None);
                ConversationOutcome::Failed(err)
            }
        }
    }

    /// Accept, dispatch and complete in one call.
    pub fn submit(
        &mut self,
        client: &GenerationClient,
        history: &mut HistoryStore,
    ) -> Result<ConversationOutcome, SubmitRejected> {
        let pending = self.begin_submission()?;
        let result = pending.dispatch(client);
        Ok(self.complete(pending, result, history))
    }
}
