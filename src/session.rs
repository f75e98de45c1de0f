//! Session state: the "current" QR code and the ticket discipline that keeps
//! late results from overwriting newer ones.
//!
//! A session is either empty or holds exactly one [`Current`] tuple. Every
//! mutation is stamped with a [`Ticket`] issued when the request starts. A
//! generate replaces the whole tuple, while a reconfigure or regenerate only
//! changes part of it and is applied on top of whatever the session holds
//! when it runs. So a request goes stale only when a later generate, or a
//! later request of the same [`RequestKind`], has been issued.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::export::{self, ExportArtifact};
use crate::platform::PrintJob;
use crate::rendering::{raster::rasterize, Bitmap};
use crate::{
    Error, ErrorCorrectionLevel, ImageFormat, RasterConfig, Result, SymbolGrid, SymbolSource,
    MAX_SOURCE_CHARS,
};

/// Which part of the current tuple a request rewrites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Text, level, config and format together
    Generate,
    /// Raster config (size and colors)
    Config,
    /// Export format only
    Format,
    /// Error-correction level of the existing text
    Level,
}

impl RequestKind {
    const COUNT: usize = 4;

    fn slot(self) -> usize {
        self as usize
    }
}

/// Identifies one mutation request; later requests get larger sequence numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    seq: u64,
    kind: RequestKind,
}

impl Ticket {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

#[derive(Debug, Default)]
struct Counters {
    seq: AtomicU64,
    latest: [AtomicU64; RequestKind::COUNT],
}

/// Shared ticket counter. Clones hand out tickets from the same sequence.
#[derive(Debug, Clone, Default)]
pub struct Tickets(Arc<Counters>);

impl Tickets {
    pub fn issue(&self, kind: RequestKind) -> Ticket {
        let seq = self.0.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.latest[kind.slot()].fetch_max(seq, Ordering::SeqCst);
        Ticket { seq, kind }
    }

    /// Whether no later generate and no later request of the same kind has
    /// been issued since `ticket`
    pub fn is_current(&self, ticket: Ticket) -> bool {
        let newer = |kind: RequestKind| self.0.latest[kind.slot()].load(Ordering::SeqCst) > ticket.seq;
        !newer(RequestKind::Generate) && !newer(ticket.kind)
    }
}

/// The symbol a session currently shows
#[derive(Debug, Clone, PartialEq)]
pub struct Current {
    pub source_text: String,
    pub level: ErrorCorrectionLevel,
    pub grid: SymbolGrid,
    pub config: RasterConfig,
    pub format: ImageFormat,
    pub bitmap: Bitmap,
}

/// A change applied to an existing symbol without re-encoding its text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Config(RasterConfig),
    Format(ImageFormat),
}

impl Adjustment {
    pub fn kind(&self) -> RequestKind {
        match self {
            Adjustment::Config(_) => RequestKind::Config,
            Adjustment::Format(_) => RequestKind::Format,
        }
    }
}

/// What happened to a mutation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The session now holds this request's result
    Applied,
    /// A later request rewriting the same fields was issued; the result was dropped
    Superseded,
    /// Nothing to adjust yet (session is empty)
    Ignored,
}

#[derive(Debug)]
enum State {
    Empty,
    Ready(Current),
}

/// Holds the most recent QR code so it can be exported repeatedly
pub struct Session<S: SymbolSource> {
    source: S,
    state: State,
    tickets: Tickets,
}

/// Reject source text that is blank or longer than [`MAX_SOURCE_CHARS`]
pub fn validate_source_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("text is empty".into()));
    }
    let chars = text.chars().count();
    if chars > MAX_SOURCE_CHARS {
        return Err(Error::InvalidInput(format!(
            "text is {} characters long; the limit is {}",
            chars, MAX_SOURCE_CHARS
        )));
    }
    Ok(())
}

impl<S: SymbolSource> Session<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: State::Empty,
            tickets: Tickets::default(),
        }
    }

    /// Ticket counter shared with front-ends that issue tickets themselves
    pub fn tickets(&self) -> Tickets {
        self.tickets.clone()
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    pub fn current(&self) -> Option<&Current> {
        match &self.state {
            State::Ready(current) => Some(current),
            State::Empty => None,
        }
    }

    /// Encode and rasterize `source_text`, replacing the current symbol.
    ///
    /// Invalid input and encoding failures leave the session untouched.
    pub fn generate(
        &mut self,
        source_text: &str,
        level: ErrorCorrectionLevel,
        config: RasterConfig,
        format: ImageFormat,
    ) -> Result<Outcome> {
        validate_source_text(source_text)?;
        let ticket = self.tickets.issue(RequestKind::Generate);
        self.generate_as(ticket, source_text, level, config, format)
    }

    /// Re-rasterize the current grid with a new config, or switch its format.
    /// A no-op on an empty session.
    pub fn reconfigure(&mut self, adjustment: Adjustment) -> Result<Outcome> {
        if !self.is_ready() {
            return Ok(Outcome::Ignored);
        }
        let ticket = self.tickets.issue(adjustment.kind());
        self.reconfigure_as(ticket, adjustment)
    }

    /// Re-encode the current text at another error-correction level.
    /// A no-op on an empty session.
    pub fn regenerate(&mut self, level: ErrorCorrectionLevel) -> Result<Outcome> {
        if !self.is_ready() {
            return Ok(Outcome::Ignored);
        }
        let ticket = self.tickets.issue(RequestKind::Level);
        self.regenerate_as(ticket, level)
    }

    pub(crate) fn generate_as(
        &mut self,
        ticket: Ticket,
        source_text: &str,
        level: ErrorCorrectionLevel,
        config: RasterConfig,
        format: ImageFormat,
    ) -> Result<Outcome> {
        validate_source_text(source_text)?;
        if !self.tickets.is_current(ticket) {
            debug!("skipping superseded generate {:?}", ticket);
            return Ok(Outcome::Superseded);
        }
        let grid = self.source.encode(source_text, level)?;
        let bitmap = rasterize(&grid, &config)?;
        let next = Current {
            source_text: source_text.to_string(),
            level,
            grid,
            config,
            format,
            bitmap,
        };
        Ok(self.commit(ticket, next))
    }

    pub(crate) fn reconfigure_as(&mut self, ticket: Ticket, adjustment: Adjustment) -> Result<Outcome> {
        let Some(current) = self.current() else {
            return Ok(Outcome::Ignored);
        };
        if !self.tickets.is_current(ticket) {
            debug!("skipping superseded reconfigure {:?}", ticket);
            return Ok(Outcome::Superseded);
        }
        let next = match adjustment {
            Adjustment::Config(config) => Current {
                bitmap: rasterize(&current.grid, &config)?,
                config,
                ..current.clone()
            },
            Adjustment::Format(format) => Current {
                format,
                ..current.clone()
            },
        };
        Ok(self.commit(ticket, next))
    }

    pub(crate) fn regenerate_as(&mut self, ticket: Ticket, level: ErrorCorrectionLevel) -> Result<Outcome> {
        let Some(current) = self.current() else {
            return Ok(Outcome::Ignored);
        };
        if !self.tickets.is_current(ticket) {
            debug!("skipping superseded regenerate {:?}", ticket);
            return Ok(Outcome::Superseded);
        }
        let grid = self.source.encode(&current.source_text, level)?;
        let bitmap = rasterize(&grid, &current.config)?;
        let next = Current {
            level,
            grid,
            bitmap,
            ..current.clone()
        };
        Ok(self.commit(ticket, next))
    }

    /// Install `next` if `ticket` is still current; otherwise drop it
    pub fn commit(&mut self, ticket: Ticket, next: Current) -> Outcome {
        if !self.tickets.is_current(ticket) {
            debug!("discarding stale result for {:?}", ticket);
            return Outcome::Superseded;
        }
        info!(
            "session now holds {}x{} modules at level {} ({}x{}px, {})",
            next.grid.module_count(),
            next.grid.module_count(),
            next.level,
            next.bitmap.width,
            next.bitmap.height,
            next.format
        );
        self.state = State::Ready(next);
        Outcome::Applied
    }

    /// Encode the current bitmap; `None` uses the session's format
    pub fn export_current(&self, format: Option<ImageFormat>) -> Result<ExportArtifact> {
        let current = self.current().ok_or(Error::NoActiveSymbol)?;
        let format = format.unwrap_or(current.format);
        export::export(&current.bitmap, format, &current.source_text)
    }

    /// Raw image plus caption for a print sink
    pub fn print_job(&self) -> Result<PrintJob> {
        let current = self.current().ok_or(Error::NoActiveSymbol)?;
        Ok(PrintJob {
            bitmap: current.bitmap.clone(),
            caption: current.source_text.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FnSource;

    type Source = FnSource<fn(&str, ErrorCorrectionLevel) -> Result<SymbolGrid>>;

    /// Grid size grows with the level so regenerations are observable
    fn fixture_encode(text: &str, level: ErrorCorrectionLevel) -> Result<SymbolGrid> {
        if text.contains("too long") {
            return Err(Error::EncodingError("data too long".into()));
        }
        let n = match level {
            ErrorCorrectionLevel::L => 5,
            ErrorCorrectionLevel::M => 7,
            ErrorCorrectionLevel::Q => 9,
            ErrorCorrectionLevel::H => 11,
        };
        let modules = (0..n * n).map(|i| i % 3 == 0).collect();
        SymbolGrid::new(n, modules)
    }

    fn session() -> Session<Source> {
        Session::new(FnSource(fixture_encode as fn(&str, ErrorCorrectionLevel) -> Result<SymbolGrid>))
    }

    fn ready() -> Session<Source> {
        let mut s = session();
        s.generate("hello", ErrorCorrectionLevel::M, RasterConfig::with_size(70), ImageFormat::Png)
            .unwrap();
        s
    }

    #[test]
    fn generate_transitions_to_ready() {
        let mut s = session();
        assert!(!s.is_ready());
        let outcome = s
            .generate("hello", ErrorCorrectionLevel::M, RasterConfig::with_size(70), ImageFormat::Png)
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let cur = s.current().unwrap();
        assert_eq!(cur.source_text, "hello");
        assert_eq!(cur.grid.module_count(), 7);
        assert_eq!(cur.bitmap.width, 70);
    }

    #[test]
    fn invalid_input_does_not_touch_session() {
        let mut s = ready();
        let before = s.current().unwrap().clone();

        for bad in ["".to_string(), "   ".to_string(), "x".repeat(MAX_SOURCE_CHARS + 1)] {
            let err = s
                .generate(&bad, ErrorCorrectionLevel::M, RasterConfig::default(), ImageFormat::Png)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
        assert_eq!(s.current().unwrap(), &before);
    }

    #[test]
    fn max_length_text_is_accepted() {
        assert!(validate_source_text(&"é".repeat(MAX_SOURCE_CHARS)).is_ok());
    }

    #[test]
    fn encoding_errors_propagate_without_mutation() {
        let mut s = ready();
        let err = s
            .generate("way too long", ErrorCorrectionLevel::H, RasterConfig::default(), ImageFormat::Png)
            .unwrap_err();
        assert!(matches!(err, Error::EncodingError(_)));
        assert_eq!(s.current().unwrap().source_text, "hello");
    }

    #[test]
    fn reconfigure_rerasterizes_existing_grid() {
        let mut s = ready();
        let grid = s.current().unwrap().grid.clone();
        let outcome = s.reconfigure(Adjustment::Config(RasterConfig::with_size(140))).unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let cur = s.current().unwrap();
        assert_eq!(cur.grid, grid);
        assert_eq!(cur.bitmap.width, 140);
        assert_eq!(cur.bitmap.cell_size(), 20);
    }

    #[test]
    fn reconfigure_format_keeps_bitmap() {
        let mut s = ready();
        let bitmap = s.current().unwrap().bitmap.clone();
        s.reconfigure(Adjustment::Format(ImageFormat::Svg)).unwrap();
        let cur = s.current().unwrap();
        assert_eq!(cur.format, ImageFormat::Svg);
        assert_eq!(cur.bitmap, bitmap);
        let art = s.export_current(None).unwrap();
        assert_eq!(art.mime_type, "image/svg+xml");
        assert_eq!(art.suggested_filename, "hello.svg");
    }

    #[test]
    fn reconfigure_and_regenerate_on_empty_are_noops() {
        let mut s = session();
        assert_eq!(
            s.reconfigure(Adjustment::Format(ImageFormat::Jpeg)).unwrap(),
            Outcome::Ignored
        );
        assert_eq!(s.regenerate(ErrorCorrectionLevel::H).unwrap(), Outcome::Ignored);
        assert!(!s.is_ready());
    }

    #[test]
    fn regenerate_reencodes_current_text() {
        let mut s = ready();
        s.regenerate(ErrorCorrectionLevel::H).unwrap();
        let cur = s.current().unwrap();
        assert_eq!(cur.level, ErrorCorrectionLevel::H);
        assert_eq!(cur.grid.module_count(), 11);
        assert_eq!(cur.source_text, "hello");
    }

    #[test]
    fn export_from_empty_fails() {
        let s = session();
        assert!(matches!(s.export_current(None), Err(Error::NoActiveSymbol)));
        assert!(matches!(s.print_job(), Err(Error::NoActiveSymbol)));
    }

    #[test]
    fn export_override_format() {
        let s = ready();
        let art = s.export_current(Some(ImageFormat::Jpeg)).unwrap();
        assert_eq!(art.mime_type, "image/jpeg");
        assert_eq!(art.suggested_filename, "hello.jpeg");
        // session format is unchanged
        assert_eq!(s.current().unwrap().format, ImageFormat::Png);
    }

    #[test]
    fn stale_commit_is_discarded() {
        let mut s = ready();
        let tickets = s.tickets();
        let first = tickets.issue(RequestKind::Config);
        let second = tickets.issue(RequestKind::Config);

        let base = s.current().unwrap().clone();
        let a = Current {
            config: RasterConfig::with_size(35),
            bitmap: rasterize(&base.grid, &RasterConfig::with_size(35)).unwrap(),
            ..base.clone()
        };
        let b = Current {
            config: RasterConfig::with_size(210),
            bitmap: rasterize(&base.grid, &RasterConfig::with_size(210)).unwrap(),
            ..base
        };

        // the newer result arrives first, the older one late
        assert_eq!(s.commit(second, b), Outcome::Applied);
        assert_eq!(s.commit(first, a), Outcome::Superseded);
        assert_eq!(s.current().unwrap().bitmap.width, 210);
    }

    #[test]
    fn superseded_request_is_skipped_before_work() {
        let mut s = ready();
        let tickets = s.tickets();
        let a = tickets.issue(RequestKind::Config);
        let b = tickets.issue(RequestKind::Config);
        assert_eq!(
            s.reconfigure_as(a, Adjustment::Config(RasterConfig::with_size(35))).unwrap(),
            Outcome::Superseded
        );
        assert_eq!(
            s.reconfigure_as(b, Adjustment::Config(RasterConfig::with_size(210))).unwrap(),
            Outcome::Applied
        );
        let art = s.export_current(Some(ImageFormat::Png)).unwrap();
        let decoder = png::Decoder::new(&art.bytes[..]);
        let reader = decoder.read_info().unwrap();
        assert_eq!(reader.info().width, 210);
    }

    #[test]
    fn noop_on_empty_leaves_pending_generate_current() {
        let mut s = session();
        let tickets = s.tickets();
        let pending = tickets.issue(RequestKind::Generate);
        assert_eq!(
            s.reconfigure(Adjustment::Config(RasterConfig::with_size(35))).unwrap(),
            Outcome::Ignored
        );
        assert_eq!(s.regenerate(ErrorCorrectionLevel::H).unwrap(), Outcome::Ignored);
        assert!(tickets.is_current(pending));
    }

    #[test]
    fn adjustments_do_not_supersede_an_earlier_generate() {
        let mut s = ready();
        let tickets = s.tickets();
        let generate = tickets.issue(RequestKind::Generate);
        let resize = tickets.issue(RequestKind::Config);
        let relevel = tickets.issue(RequestKind::Level);
        assert!(tickets.is_current(generate));

        assert_eq!(
            s.generate_as(generate, "newer", ErrorCorrectionLevel::L, RasterConfig::with_size(50), ImageFormat::Png)
                .unwrap(),
            Outcome::Applied
        );
        assert_eq!(
            s.reconfigure_as(resize, Adjustment::Config(RasterConfig::with_size(100))).unwrap(),
            Outcome::Applied
        );
        assert_eq!(s.regenerate_as(relevel, ErrorCorrectionLevel::Q).unwrap(), Outcome::Applied);

        let cur = s.current().unwrap();
        assert_eq!(cur.source_text, "newer");
        assert_eq!(cur.level, ErrorCorrectionLevel::Q);
        assert_eq!(cur.config.target_size_px, 100);
        // 9 modules at level Q, 100 / 9 = 11px cells
        assert_eq!(cur.bitmap.width, 99);
    }

    #[test]
    fn later_generate_supersedes_pending_adjustments() {
        let mut s = ready();
        let tickets = s.tickets();
        let resize = tickets.issue(RequestKind::Config);
        let format = tickets.issue(RequestKind::Format);
        let generate = tickets.issue(RequestKind::Generate);
        assert!(!tickets.is_current(resize));
        assert!(!tickets.is_current(format));

        assert_eq!(
            s.reconfigure_as(resize, Adjustment::Config(RasterConfig::with_size(140))).unwrap(),
            Outcome::Superseded
        );
        assert_eq!(
            s.reconfigure_as(format, Adjustment::Format(ImageFormat::Svg)).unwrap(),
            Outcome::Superseded
        );
        assert_eq!(
            s.generate_as(generate, "replacement", ErrorCorrectionLevel::M, RasterConfig::with_size(70), ImageFormat::Jpeg)
                .unwrap(),
            Outcome::Applied
        );
        let cur = s.current().unwrap();
        assert_eq!(cur.format, ImageFormat::Jpeg);
        assert_eq!(cur.bitmap.width, 70);
    }

    #[test]
    fn different_adjustments_do_not_supersede_each_other() {
        let tickets = Tickets::default();
        let resize = tickets.issue(RequestKind::Config);
        let format = tickets.issue(RequestKind::Format);
        let relevel = tickets.issue(RequestKind::Level);
        assert!(tickets.is_current(resize));
        assert!(tickets.is_current(format));
        assert!(tickets.is_current(relevel));

        let resize_again = tickets.issue(RequestKind::Config);
        assert!(!tickets.is_current(resize));
        assert!(tickets.is_current(resize_again));
        assert!(tickets.is_current(format));
    }

    #[test]
    fn print_job_carries_caption() {
        let s = ready();
        let job = s.print_job().unwrap();
        assert_eq!(job.caption, "hello");
        assert_eq!(job.bitmap.width, 70);
    }
}
