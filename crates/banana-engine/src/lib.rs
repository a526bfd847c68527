pub mod attachment;
pub mod config;
pub mod conversation;
pub mod generation;
pub mod image_request;
pub mod shell;
pub mod studio;

pub use config::StudioConfig;
pub use conversation::{ConversationController, ConversationOutcome};
pub use generation::{GenerationClient, GenerationError};
pub use image_request::{ImageOutcome, ImageRequestController};
pub use shell::{Shell, View};
pub use studio::Studio;

/// Why a controller refused to start a request. Nothing is dispatched and
/// no state changes when this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("nothing to submit")]
    Empty,
    #[error("a request is already in flight")]
    Busy,
}
