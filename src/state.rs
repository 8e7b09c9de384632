//! the analyzer's whole ui state as a value, with pure transitions.
//!
//! widgets never decide anything themselves: they read `trigger_enabled`,
//! `loading`, `trigger_label` and `display` from here and forward user input
//! back through `edit_input` / `select_language` / `begin_request`.

use bevy::prelude::Resource;

use crate::prompt::{LANGUAGES, build_prompt};
use crate::render::{IncrementalRenderer, MarkupFormat};

pub const IDLE_LABEL: &str = "Analyze Code";
pub const BUSY_LABEL: &str = "Analyzing...";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    Requesting,
}

/// one analysis, as handed to the streaming client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// generation counter; messages for any other id are stale.
    pub id: u64,
    pub language: String,
    pub prompt: String,
}

#[derive(Resource, Clone, Debug)]
pub struct AnalyzerState {
    input: String,
    language: String,
    phase: Phase,
    renderer: IncrementalRenderer,
    display: String,
    generation: u64,
}

impl Default for AnalyzerState {
    fn default() -> Self {
        Self::new(MarkupFormat::default())
    }
}

impl AnalyzerState {
    pub fn new(format: MarkupFormat) -> Self {
        Self {
            input: String::new(),
            language: LANGUAGES[0].to_string(),
            phase: Phase::Idle,
            renderer: IncrementalRenderer::new(format),
            display: String::new(),
            generation: 0,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// current contents of the display region.
    pub fn display(&self) -> &str {
        &self.display
    }

    /// raw markdown accumulated for the current (or last) request.
    pub fn response(&self) -> &str {
        self.renderer.buffer()
    }

    pub fn renders(&self) -> usize {
        self.renderer.renders()
    }

    pub fn format(&self) -> MarkupFormat {
        self.renderer.format()
    }

    /// id of the request in flight, if any.
    pub fn active_request(&self) -> Option<u64> {
        (self.phase == Phase::Requesting).then_some(self.generation)
    }

    pub fn loading(&self) -> bool {
        self.phase == Phase::Requesting
    }

    pub fn trigger_enabled(&self) -> bool {
        self.phase == Phase::Idle && !self.input.trim().is_empty()
    }

    pub fn trigger_label(&self) -> &'static str {
        match self.phase {
            Phase::Idle => IDLE_LABEL,
            Phase::Requesting => BUSY_LABEL,
        }
    }

    /// the input keeps tracking keystrokes even mid-request; only the
    /// trigger is locked.
    pub fn edit_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn select_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    /// Idle -> Requesting. clears the display and builds the prompt from the
    /// current input and language. `None` (and no change) when the trigger
    /// is disabled.
    pub fn begin_request(&mut self) -> Option<AnalysisRequest> {
        if !self.trigger_enabled() {
            return None;
        }
        self.phase = Phase::Requesting;
        self.generation += 1;
        self.renderer.reset();
        self.display.clear();
        Some(AnalysisRequest {
            id: self.generation,
            language: self.language.clone(),
            prompt: build_prompt(&self.input, &self.language),
        })
    }

    /// appends a fragment and re-renders; false if `id` isn't the request in flight.
    pub fn apply_fragment(&mut self, id: u64, fragment: &str) -> bool {
        if self.active_request() != Some(id) {
            return false;
        }
        self.display = self.renderer.push(fragment).to_string();
        true
    }

    /// Requesting -> Idle after the stream ended normally.
    pub fn complete(&mut self, id: u64) -> bool {
        if self.active_request() != Some(id) {
            return false;
        }
        self.phase = Phase::Idle;
        true
    }

    /// Requesting -> Idle with the fixed error message replacing whatever
    /// had rendered so far.
    pub fn fail(&mut self, id: u64) -> bool {
        if self.active_request() != Some(id) {
            return false;
        }
        self.display = self.renderer.format().error_markup();
        self.phase = Phase::Idle;
        true
    }
}
