/// Clipboard sink

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardEntry {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

pub trait Clipboard: Send + Sync {
    fn copy(&self, bytes: &[u8], mime_type: &str) -> Result<()>;
}

/// In-process clipboard remembering the last copy
pub struct MemoryClipboard {
    last: std::sync::Mutex<Option<ClipboardEntry>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        MemoryClipboard {
            last: std::sync::Mutex::new(None),
        }
    }

    /// Most recent copy. A poisoned lock is a `ClipboardError`, not an empty clipboard.
    pub fn last(&self) -> Result<Option<ClipboardEntry>> {
        let g = self
            .last
            .lock()
            .map_err(|e| Error::ClipboardError(e.to_string()))?;
        Ok(g.clone())
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for MemoryClipboard {
    fn copy(&self, bytes: &[u8], mime_type: &str) -> Result<()> {
        let mut g = self
            .last
            .lock()
            .map_err(|e| Error::ClipboardError(e.to_string()))?;
        *g = Some(ClipboardEntry {
            bytes: bytes.to_vec(),
            mime_type: mime_type.to_string(),
        });
        Ok(())
    }
}

/// Clipboard for hosts without one; every copy fails
pub struct NoopClipboard;

impl Clipboard for NoopClipboard {
    fn copy(&self, _bytes: &[u8], _mime_type: &str) -> Result<()> {
        Err(Error::ClipboardError("clipboard not available".to_string()))
    }
}
