use crate::error::GliderError;
use crate::selection::types::CapturedSelection;
use arboard::Clipboard;
use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Text access to the system clipboard.
pub trait ClipboardAccess: Send {
    /// Current text content, `None` when the clipboard holds no text.
    fn get_text(&mut self) -> anyhow::Result<Option<String>>;
    fn set_text(&mut self, text: &str) -> anyhow::Result<()>;
    fn clear(&mut self) -> anyhow::Result<()>;
}

/// Makes the foreground application copy its selection to the clipboard.
pub trait CopyTrigger {
    fn send_copy(&self) -> anyhow::Result<()>;
}

/// System clipboard through `arboard`. A fresh handle is opened per call so
/// the clipboard is never held open between gestures.
#[derive(Debug, Default)]
pub struct ArboardClipboard;

impl ClipboardAccess for ArboardClipboard {
    fn get_text(&mut self) -> anyhow::Result<Option<String>> {
        let mut cb = Clipboard::new().map_err(|e| GliderError::Clipboard(e.to_string()))?;
        match cb.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(GliderError::Clipboard(e.to_string()).into()),
        }
    }

    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        let mut cb = Clipboard::new().map_err(|e| GliderError::Clipboard(e.to_string()))?;
        cb.set_text(text.to_string())
            .map_err(|e| GliderError::Clipboard(e.to_string()))?;
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        let mut cb = Clipboard::new().map_err(|e| GliderError::Clipboard(e.to_string()))?;
        cb.clear().map_err(|e| GliderError::Clipboard(e.to_string()))?;
        Ok(())
    }
}

// The clipboard is one shared resource: interleaved save/copy/restore
// sequences would restore each other's captures.
static EXTRACTION_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn extraction_lock() -> MutexGuard<'static, ()> {
    match EXTRACTION_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Reads the current selection of the foreground application by borrowing
/// the clipboard: save, copy, read, restore.
pub struct SelectionExtractor {
    clipboard: Box<dyn ClipboardAccess>,
    copy_settle: Duration,
    retry_delay: Duration,
}

impl SelectionExtractor {
    pub fn new(
        clipboard: Box<dyn ClipboardAccess>,
        copy_settle: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            clipboard,
            copy_settle,
            retry_delay,
        }
    }

    /// One round-trip. Returns the newly copied text, or an empty string when
    /// the clipboard did not change. The previous content is restored before
    /// returning, whether or not the copy step succeeded.
    pub fn extract<T: CopyTrigger + ?Sized>(&mut self, trigger: &T) -> anyhow::Result<String> {
        let _guard = extraction_lock();
        let previous = self.clipboard.get_text()?;
        self.round_trip(trigger, previous.as_deref())
    }

    /// [`extract`](Self::extract) with a single delayed retry. A second
    /// failure gives up with an empty selection. The retry restores the content
    /// saved by the first attempt, so a failed restore is repaired rather than
    /// mistaken for the user's clipboard.
    pub fn extract_with_retry<T>(&mut self, trigger: &T) -> CapturedSelection
    where
        T: CopyTrigger + ?Sized,
    {
        let _guard = extraction_lock();

        let previous = match self.clipboard.get_text() {
            Ok(previous) => previous,
            Err(err) => {
                tracing::debug!(?err, "clipboard read failed, retrying once");
                std::thread::sleep(self.retry_delay);
                match self.clipboard.get_text() {
                    Ok(previous) => previous,
                    Err(err) => {
                        tracing::warn!(?err, "clipboard unreadable, dropping gesture");
                        return CapturedSelection::default();
                    }
                }
            }
        };

        match self.round_trip(trigger, previous.as_deref()) {
            Ok(text) => CapturedSelection::new(text),
            Err(err) => {
                tracing::debug!(?err, "selection extraction failed, retrying once");
                std::thread::sleep(self.retry_delay);
                match self.round_trip(trigger, previous.as_deref()) {
                    Ok(text) => CapturedSelection::new(text),
                    Err(err) => {
                        tracing::warn!(?err, "selection extraction failed twice, dropping gesture");
                        if let Err(err) = self.restore(previous.as_deref()) {
                            tracing::error!(?err, "failed to restore clipboard content");
                        }
                        CapturedSelection::default()
                    }
                }
            }
        }
    }

    fn round_trip<T: CopyTrigger + ?Sized>(
        &mut self,
        trigger: &T,
        previous: Option<&str>,
    ) -> anyhow::Result<String> {
        let captured = self.copy_and_read(trigger);
        let restored = self.restore(previous);

        let candidate = captured?;
        restored?;

        if candidate == previous.map(str::trim).unwrap_or_default() {
            return Ok(String::new());
        }
        Ok(candidate)
    }

    fn copy_and_read<T: CopyTrigger + ?Sized>(&mut self, trigger: &T) -> anyhow::Result<String> {
        trigger.send_copy()?;
        if !self.copy_settle.is_zero() {
            std::thread::sleep(self.copy_settle);
        }
        Ok(self
            .clipboard
            .get_text()?
            .map(|text| text.trim().to_string())
            .unwrap_or_default())
    }

    fn restore(&mut self, previous: Option<&str>) -> anyhow::Result<()> {
        match previous {
            Some(text) => self.clipboard.set_text(text),
            None => self.clipboard.clear(),
        }
    }
}

/// In-memory clipboard. Clones share state, so a test can hand one clone to
/// the extractor and script the foreign application's copy through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    state: Arc<Mutex<MemoryClipboardState>>,
}

#[derive(Debug, Default)]
struct MemoryClipboardState {
    text: Option<String>,
    writes: Vec<Option<String>>,
    failing_reads: usize,
    failing_writes: usize,
}

impl MemoryClipboard {
    pub fn with_text(text: impl Into<String>) -> Self {
        let clipboard = Self::default();
        if let Ok(mut state) = clipboard.state.lock() {
            state.text = Some(text.into());
        }
        clipboard
    }

    pub fn text(&self) -> Option<String> {
        self.state.lock().ok().and_then(|state| state.text.clone())
    }

    /// Writes performed through [`ClipboardAccess`], `None` for clears.
    pub fn writes(&self) -> Vec<Option<String>> {
        self.state
            .lock()
            .map(|state| state.writes.clone())
            .unwrap_or_default()
    }

    /// Replace the content directly, the way another application would.
    pub fn put(&self, text: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.text = Some(text.into());
        }
    }

    pub fn fail_next_reads(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_reads = count;
        }
    }

    pub fn fail_next_writes(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_writes = count;
        }
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, MemoryClipboardState>> {
        self.state
            .lock()
            .map_err(|_| GliderError::Clipboard("memory clipboard poisoned".into()).into())
    }
}

impl ClipboardAccess for MemoryClipboard {
    fn get_text(&mut self) -> anyhow::Result<Option<String>> {
        let mut state = self.lock()?;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(GliderError::Clipboard("read refused".into()).into());
        }
        Ok(state.text.clone())
    }

    fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(GliderError::Clipboard("write refused".into()).into());
        }
        state.text = Some(text.to_string());
        state.writes.push(Some(text.to_string()));
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        let mut state = self.lock()?;
        state.text = None;
        state.writes.push(None);
        Ok(())
    }
}
