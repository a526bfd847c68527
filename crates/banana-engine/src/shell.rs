use banana_contracts::history::{HistoryEntry, SourceFlow};
use banana_contracts::locale::{ARCHITECT_VIEW_TITLE, WALLPAPER_VIEW_TITLE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Architect,
    Wallpaper,
}

impl View {
    pub fn title(self) -> &'static str {
        match self {
            Self::Architect => ARCHITECT_VIEW_TITLE,
            Self::Wallpaper => WALLPAPER_VIEW_TITLE,
        }
    }
}

impl From<SourceFlow> for View {
    fn from(flow: SourceFlow) -> Self {
        match flow {
            SourceFlow::Conversation => Self::Architect,
            SourceFlow::ImageRequest => Self::Wallpaper,
        }
    }
}

/// Which flow is on screen and whether the history panel is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shell {
    active_view: View,
    history_open: bool,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_view(&self) -> View {
        self.active_view
    }

    pub fn history_open(&self) -> bool {
        self.history_open
    }

    pub fn switch_to(&mut self, view: View) {
        self.active_view = view;
    }

    pub fn toggle_history(&mut self) -> bool {
        self.history_open = !self.history_open;
        self.history_open
    }

    pub fn close_history(&mut self) {
        self.history_open = false;
    }

    /// Opens the flow an entry came from and closes the panel. Controller
    /// state is left untouched.
    pub fn select_history_entry(&mut self, entry: &HistoryEntry) -> View {
        self.active_view = View::from(entry.source_flow);
        self.history_open = false;
        self.active_view
    }
}
