/// Print sink: raw image plus the source text as caption

use crate::rendering::Bitmap;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PrintJob {
    pub bitmap: Bitmap,
    pub caption: String,
}

pub trait Printer: Send + Sync {
    fn print(&self, job: &PrintJob) -> Result<()>;
}

/// Records jobs instead of printing them
pub struct MemoryPrinter {
    jobs: std::sync::Mutex<Vec<PrintJob>>,
}

impl MemoryPrinter {
    pub fn new() -> Self {
        MemoryPrinter {
            jobs: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Result<Vec<PrintJob>> {
        let g = self
            .jobs
            .lock()
            .map_err(|e| Error::PlatformError(e.to_string()))?;
        Ok(g.clone())
    }
}

impl Default for MemoryPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer for MemoryPrinter {
    fn print(&self, job: &PrintJob) -> Result<()> {
        self.jobs
            .lock()
            .map_err(|e| Error::PlatformError(e.to_string()))?
            .push(job.clone());
        Ok(())
    }
}
