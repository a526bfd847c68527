use std::path::PathBuf;

use anyhow::Result;
use banana_contracts::catalog::StyleCatalog;
use banana_contracts::history::{FileSnapshotStorage, HistoryStore};

use crate::config::StudioConfig;
use crate::conversation::{ConversationController, ConversationOutcome};
use crate::generation::GenerationClient;
use crate::image_request::{ImageOutcome, ImageRequestController};
use crate::shell::{Shell, View};
use crate::SubmitRejected;

/// The whole application state, built once at startup and passed by
/// reference from there on.
pub struct Studio {
    config: StudioConfig,
    client: GenerationClient,
    history: HistoryStore,
    shell: Shell,
    conversation: ConversationController,
    image: ImageRequestController,
}

impl Studio {
    /// Gemini-backed client plus the history file named in `config`.
    pub fn open(config: StudioConfig) -> Self {
        let client = GenerationClient::from_config(&config);
        let history = HistoryStore::load(FileSnapshotStorage::new(config.history_path.clone()));
        tracing::debug!(
            history = %config.history_path.display(),
            entries = history.len(),
            "studio opened"
        );
        Self::with_parts(config, client, history)
    }

    pub fn with_parts(config: StudioConfig, client: GenerationClient, history: HistoryStore) -> Self {
        Self {
            config,
            client,
            history,
            shell: Shell::new(),
            conversation: ConversationController::new(StyleCatalog::default()),
            image: ImageRequestController::new(),
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut Shell {
        &mut self.shell
    }

    pub fn conversation(&self) -> &ConversationController {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut ConversationController {
        &mut self.conversation
    }

    pub fn image(&self) -> &ImageRequestController {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ImageRequestController {
        &mut self.image
    }

    /// A rejected submission leaves the active view alone.
    pub fn submit_conversation(&mut self) -> Result<ConversationOutcome, SubmitRejected> {
        let pending = self.conversation.begin_submission()?;
        self.shell.switch_to(View::Architect);
        let result = pending.dispatch(&self.client);
        Ok(self.conversation.complete(pending, result, &mut self.history))
    }

    pub fn generate_image(&mut self) -> Result<ImageOutcome, SubmitRejected> {
        let pending = self.image.begin_generation()?;
        self.shell.switch_to(View::Wallpaper);
        let result = pending.dispatch(&self.client);
        Ok(self.image.complete(pending, result, &mut self.history))
    }

    /// Writes the last generated image into the configured export directory.
    pub fn export_image(&self) -> Result<PathBuf> {
        self.image.export(&self.config.export_dir)
    }

    pub fn clear_history(&mut self) -> Result<()> {
        self.history.clear()
    }

    /// Switches to the flow an entry came from. Returns `None` for an
    /// unknown id.
    pub fn select_history_entry(&mut self, id: &str) -> Option<View> {
        let entry = self.history.get(id)?;
        Some(self.shell.select_history_entry(entry))
    }
}

#[cfg(test)]
mod tests {
    use banana_contracts::catalog::AspectRatio;
    use banana_contracts::history::{HistoryStore, MemorySnapshotStorage, SourceFlow};

    use super::Studio;
    use crate::config::StudioConfig;
    use crate::conversation::ConversationOutcome;
    use crate::generation::testing::ScriptedService;
    use crate::generation::GenerationClient;
    use crate::image_request::ImageOutcome;
    use crate::shell::View;
    use crate::SubmitRejected;

    fn studio(service: &ScriptedService, storage: &MemorySnapshotStorage) -> Studio {
        let config = StudioConfig::default();
        let client = GenerationClient::new(service.clone(), &config);
        let history = HistoryStore::load(storage.clone());
        Studio::with_parts(config, client, history)
    }

    #[test]
    fn both_flows_share_one_history() -> anyhow::Result<()> {
        let service = ScriptedService::new();
        let storage = MemorySnapshotStorage::new();
        let mut studio = studio(&service, &storage);

        service.push_text("refined prompt");
        studio.conversation_mut().set_input("a quiet harbor");
        let outcome = studio.submit_conversation()?;
        assert_eq!(
            outcome,
            ConversationOutcome::Replied("refined prompt".to_string())
        );

        service.push_image("image/png", b"png-bytes");
        studio.image_mut().set_prompt("a quiet harbor at night");
        studio.image_mut().select_aspect_ratio(AspectRatio::Mobile);
        assert_eq!(studio.generate_image()?, ImageOutcome::Generated);
        assert_eq!(studio.shell().active_view(), View::Wallpaper);

        let flows = studio
            .history()
            .entries()
            .iter()
            .map(|entry| entry.source_flow)
            .collect::<Vec<_>>();
        assert_eq!(flows, vec![SourceFlow::ImageRequest, SourceFlow::Conversation]);

        let reloaded = HistoryStore::load(storage.clone());
        assert_eq!(reloaded.entries(), studio.history().entries());
        Ok(())
    }

    #[test]
    fn rejected_submissions_keep_active_view() {
        let service = ScriptedService::new();
        let storage = MemorySnapshotStorage::new();
        let mut studio = studio(&service, &storage);
        assert_eq!(studio.shell().active_view(), View::Architect);

        studio.image_mut().set_prompt("   ");
        assert_eq!(studio.generate_image().err(), Some(SubmitRejected::Empty));
        assert_eq!(studio.shell().active_view(), View::Architect);

        studio.shell_mut().switch_to(View::Wallpaper);
        studio.conversation_mut().set_input("");
        assert_eq!(
            studio.submit_conversation().err(),
            Some(SubmitRejected::Empty)
        );
        assert_eq!(studio.shell().active_view(), View::Wallpaper);
        assert!(service.requests().is_empty());
    }

    #[test]
    fn selecting_history_entry_switches_view() -> anyhow::Result<()> {
        let service = ScriptedService::new();
        let storage = MemorySnapshotStorage::new();
        let mut studio = studio(&service, &storage);
        service.push_text("refined");
        studio.conversation_mut().set_input("idea");
        studio.submit_conversation()?;

        studio.shell_mut().switch_to(View::Wallpaper);
        studio.shell_mut().toggle_history();
        let id = studio.history().entries()[0].id.clone();
        assert_eq!(studio.select_history_entry(&id), Some(View::Architect));
        assert!(!studio.shell().history_open());
        assert_eq!(studio.select_history_entry("missing"), None);
        Ok(())
    }

    #[test]
    fn clear_history_empties_memory_and_storage() -> anyhow::Result<()> {
        let service = ScriptedService::new();
        let storage = MemorySnapshotStorage::new();
        let mut studio = studio(&service, &storage);
        service.push_text("refined");
        studio.conversation_mut().set_input("idea");
        studio.submit_conversation()?;
        assert_eq!(studio.history().len(), 1);

        studio.clear_history()?;
        assert!(studio.history().is_empty());
        assert!(HistoryStore::load(storage.clone()).is_empty());
        Ok(())
    }

    #[test]
    fn export_uses_configured_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let service = ScriptedService::new();
        let config = StudioConfig {
            export_dir: temp.path().to_path_buf(),
            ..StudioConfig::default()
        };
        let client = GenerationClient::new(service.clone(), &config);
        let mut studio = Studio::with_parts(
            config,
            client,
            HistoryStore::load(MemorySnapshotStorage::new()),
        );
        assert!(studio.export_image().is_err());

        service.push_image("image/png", b"png");
        studio.image_mut().set_prompt("dunes");
        studio.generate_image()?;
        let path = studio.export_image()?;
        assert_eq!(path.parent(), Some(temp.path()));
        Ok(())
    }
}
