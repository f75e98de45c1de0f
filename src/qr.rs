//! Symbol source backed by the `qrcode` crate.
//!
//! The crate owns the whole QR algorithm (mode selection, Reed–Solomon,
//! masking); this adapter only maps levels in and module colors out.

use crate::{Error, ErrorCorrectionLevel, Result, SymbolGrid, SymbolSource};
use log::debug;
use qrcode::{Color as ModuleColor, EcLevel, QrCode};

impl From<ErrorCorrectionLevel> for EcLevel {
    fn from(level: ErrorCorrectionLevel) -> Self {
        match level {
            ErrorCorrectionLevel::L => EcLevel::L,
            ErrorCorrectionLevel::M => EcLevel::M,
            ErrorCorrectionLevel::Q => EcLevel::Q,
            ErrorCorrectionLevel::H => EcLevel::H,
        }
    }
}

/// Default [`SymbolSource`] producing standard QR symbols without a quiet zone
#[derive(Debug, Clone, Default)]
pub struct QrCodeSource;

impl QrCodeSource {
    pub fn new() -> Self {
        QrCodeSource
    }
}

impl SymbolSource for QrCodeSource {
    fn encode(&self, text: &str, level: ErrorCorrectionLevel) -> Result<SymbolGrid> {
        let code = QrCode::with_error_correction_level(text.as_bytes(), EcLevel::from(level))
            .map_err(|e| Error::EncodingError(format!("{} (level {})", e, level)))?;

        let width = code.width();
        let modules = code
            .to_colors()
            .into_iter()
            .map(|c| c == ModuleColor::Dark)
            .collect();
        debug!("encoded {} bytes at level {} into {}x{} modules", text.len(), level, width, width);

        SymbolGrid::new(width, modules)
    }
}
