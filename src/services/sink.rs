use std::io;
use std::sync::{Arc, Mutex, PoisonError};

/// Writable destination for preview image bytes
///
/// The controller resets the sink when a preview starts and writes the
/// complete image only after the scan succeeds.
pub trait PreviewSink: Send + Sync {
    fn reset(&self);

    fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

/// In-memory sink, cheap to clone and share with the controller
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PreviewSink for MemorySink {
    fn reset(&self) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(bytes);
        Ok(())
    }
}
