//! Where the pipeline sends answer text and progress messages

use std::sync::Mutex;

/// Receiver for user-visible output. Calls are fire-and-forget.
pub trait OutputSink: Send + Sync {
    /// Append a fragment of Markdown to the answer
    fn markdown(&self, fragment: &str);

    /// Report what the pipeline is doing
    fn progress(&self, message: &str);
}

/// Collects everything it receives
#[derive(Debug, Default)]
pub struct BufferSink {
    fragments: Mutex<Vec<String>>,
    progress: Mutex<Vec<String>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every Markdown fragment, concatenated
    pub fn text(&self) -> String {
        self.fragments().concat()
    }

    pub fn fragments(&self) -> Vec<String> {
        self.fragments
            .lock()
            .map(|f| f.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn progress_messages(&self) -> Vec<String> {
        self.progress
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl OutputSink for BufferSink {
    fn markdown(&self, fragment: &str) {
        let mut fragments = self.fragments.lock().unwrap_or_else(|p| p.into_inner());
        fragments.push(fragment.to_string());
    }

    fn progress(&self, message: &str) {
        let mut progress = self.progress.lock().unwrap_or_else(|p| p.into_inner());
        progress.push(message.to_string());
    }
}
