//! Export sinks: download, clipboard and print
//!
//! The host platform owns the real integrations; this module defines the
//! traits a front-end implements plus in-process implementations used by the
//! CLI and in tests. Sink failures never affect session state.

pub mod clipboard;
pub mod download;
pub mod print;

pub use clipboard::{Clipboard, ClipboardEntry, MemoryClipboard, NoopClipboard};
pub use download::{DirectoryDownloader, Downloader};
pub use print::{MemoryPrinter, PrintJob, Printer};

use std::path::PathBuf;

use log::warn;

use crate::session::Session;
use crate::{ImageFormat, Result, SymbolSource};

/// The three post-generation actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Download,
    Copy,
    Print,
}

/// What an action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivered {
    Saved(PathBuf),
    Copied { mime_type: &'static str },
    Printed,
}

/// A bundle of sinks a front-end provides
pub trait Platform: Send + Sync {
    fn downloader(&self) -> &dyn Downloader;
    fn clipboard(&self) -> &dyn Clipboard;
    fn printer(&self) -> &dyn Printer;
}

/// Downloads go to a directory; clipboard and printer stay in memory
pub struct LocalPlatform {
    downloader: DirectoryDownloader,
    clipboard: MemoryClipboard,
    printer: MemoryPrinter,
}

impl LocalPlatform {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        LocalPlatform {
            downloader: DirectoryDownloader::new(download_dir),
            clipboard: MemoryClipboard::new(),
            printer: MemoryPrinter::new(),
        }
    }

    pub fn memory_clipboard(&self) -> &MemoryClipboard {
        &self.clipboard
    }

    pub fn memory_printer(&self) -> &MemoryPrinter {
        &self.printer
    }
}

impl Platform for LocalPlatform {
    fn downloader(&self) -> &dyn Downloader {
        &self.downloader
    }

    fn clipboard(&self) -> &dyn Clipboard {
        &self.clipboard
    }

    fn printer(&self) -> &dyn Printer {
        &self.printer
    }
}

/// Run `action` against the session's current symbol.
///
/// Downloads use the session's format. Clipboard copies are always PNG, the
/// image type clipboards accept most widely.
pub fn perform<S: SymbolSource>(
    platform: &dyn Platform,
    session: &Session<S>,
    action: Action,
) -> Result<Delivered> {
    let res = match action {
        Action::Download => {
            let artifact = session.export_current(None)?;
            platform.downloader().save(&artifact).map(Delivered::Saved)
        }
        Action::Copy => {
            let artifact = session.export_current(Some(ImageFormat::Png))?;
            platform
                .clipboard()
                .copy(&artifact.bytes, artifact.mime_type)
                .map(|_| Delivered::Copied {
                    mime_type: artifact.mime_type,
                })
        }
        Action::Print => {
            let job = session.print_job()?;
            platform.printer().print(&job).map(|_| Delivered::Printed)
        }
    };
    if let Err(ref e) = res {
        warn!("{:?} failed: {}", action, e);
    }
    res
}
