use std::future::Future;
use std::sync::mpsc::{self, Sender};
use std::thread;

use log::debug;
use tokio::sync::oneshot;

use crate::platform::PrintJob;
use crate::session::{self, Adjustment, Current, Outcome, RequestKind, Session, Ticket, Tickets};
use crate::{
    Error, ErrorCorrectionLevel, ExportArtifact, ImageFormat, RasterConfig, Result, SymbolSource,
};

enum Command {
    Generate {
        ticket: Ticket,
        text: String,
        level: ErrorCorrectionLevel,
        config: RasterConfig,
        format: ImageFormat,
        resp: oneshot::Sender<Result<Outcome>>,
    },
    Reconfigure(Ticket, Adjustment, oneshot::Sender<Result<Outcome>>),
    Regenerate(Ticket, ErrorCorrectionLevel, oneshot::Sender<Result<Outcome>>),
    Export(Option<ImageFormat>, oneshot::Sender<Result<ExportArtifact>>),
    PrintJob(oneshot::Sender<Result<PrintJob>>),
    Current(oneshot::Sender<Option<Current>>),
    Close(oneshot::Sender<()>),
}

/// An async-friendly session backed by a dedicated worker thread.
///
/// The worker owns the [`Session`] and its symbol source and runs commands in
/// arrival order. Each mutating call takes its ticket as soon as it is made,
/// before the returned future is awaited. A request still queued when a later
/// generate, or a later request of the same kind, is issued resolves to
/// [`Outcome::Superseded`]. Reconfigures and regenerates queued behind a
/// generate are applied to that generate's result.
#[derive(Clone)]
pub struct Studio {
    cmd_tx: Sender<Command>,
    tickets: Tickets,
}

async fn recv<T>(rx: oneshot::Receiver<T>, what: &str) -> Result<T> {
    rx.await
        .map_err(|e| Error::Other(format!("{} canceled: {}", what, e)))
}

impl Studio {
    /// Spawn the worker thread that owns a fresh session over `source`.
    pub fn new<S: SymbolSource + 'static>(source: S) -> Self {
        let session = Session::new(source);
        let tickets = session.tickets();
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

        thread::spawn(move || {
            let mut session = session;

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Generate {
                        ticket,
                        text,
                        level,
                        config,
                        format,
                        resp,
                    } => {
                        let res = session.generate_as(ticket, &text, level, config, format);
                        let _ = resp.send(res);
                    }
                    Command::Reconfigure(ticket, adjustment, resp) => {
                        let res = session.reconfigure_as(ticket, adjustment);
                        let _ = resp.send(res);
                    }
                    Command::Regenerate(ticket, level, resp) => {
                        let res = session.regenerate_as(ticket, level);
                        let _ = resp.send(res);
                    }
                    Command::Export(format, resp) => {
                        let _ = resp.send(session.export_current(format));
                    }
                    Command::PrintJob(resp) => {
                        let _ = resp.send(session.print_job());
                    }
                    Command::Current(resp) => {
                        let _ = resp.send(session.current().cloned());
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
            debug!("studio worker exiting");
        });

        Self { cmd_tx, tickets }
    }

    fn send(&self, cmd: Command) {
        // a dead worker drops the reply sender, which surfaces as "canceled"
        let _ = self.cmd_tx.send(cmd);
    }

    /// Encode and rasterize `text`. Invalid input fails immediately without
    /// superseding requests already in flight.
    pub fn generate(
        &self,
        text: &str,
        level: ErrorCorrectionLevel,
        config: RasterConfig,
        format: ImageFormat,
    ) -> impl Future<Output = Result<Outcome>> {
        let (tx, rx) = oneshot::channel();
        match session::validate_source_text(text) {
            Ok(()) => self.send(Command::Generate {
                ticket: self.tickets.issue(RequestKind::Generate),
                text: text.to_string(),
                level,
                config,
                format,
                resp: tx,
            }),
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
        async move { recv(rx, "Generate").await? }
    }

    /// Re-rasterize (or re-format) the current symbol
    pub fn reconfigure(&self, adjustment: Adjustment) -> impl Future<Output = Result<Outcome>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Reconfigure(self.tickets.issue(adjustment.kind()), adjustment, tx));
        async move { recv(rx, "Reconfigure").await? }
    }

    /// Re-encode the current text at another error-correction level
    pub fn regenerate(&self, level: ErrorCorrectionLevel) -> impl Future<Output = Result<Outcome>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Regenerate(self.tickets.issue(RequestKind::Level), level, tx));
        async move { recv(rx, "Regenerate").await? }
    }

    /// Export whatever the session holds once all earlier commands have run
    pub async fn export(&self, format: Option<ImageFormat>) -> Result<ExportArtifact> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Export(format, tx));
        recv(rx, "Export").await?
    }

    pub async fn print_job(&self) -> Result<PrintJob> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::PrintJob(tx));
        recv(rx, "PrintJob").await?
    }

    /// Snapshot of the current symbol, if any
    pub async fn current(&self) -> Result<Option<Current>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Current(tx));
        recv(rx, "Current").await
    }

    /// Stop the worker. Other clones of this handle stop working too.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close(tx));
        recv(rx, "Close").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FnSource, SymbolGrid};

    fn studio() -> Studio {
        Studio::new(FnSource(|text: &str, _: ErrorCorrectionLevel| {
            let n = 5 + text.len() % 3;
            SymbolGrid::new(n, vec![true; n * n])
        }))
    }

    #[tokio::test]
    async fn generate_then_export() {
        let s = studio();
        let outcome = s
            .generate("hi", ErrorCorrectionLevel::M, RasterConfig::with_size(50), ImageFormat::Png)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Applied);
        let art = s.export(None).await.unwrap();
        assert_eq!(art.suggested_filename, "hi.png");
        s.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_input_fails_fast() {
        let s = studio();
        let err = s
            .generate("  ", ErrorCorrectionLevel::M, RasterConfig::default(), ImageFormat::Png)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(s.current().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn last_issued_reconfigure_wins() {
        let s = studio();
        s.generate("hello", ErrorCorrectionLevel::M, RasterConfig::with_size(70), ImageFormat::Png)
            .await
            .unwrap();

        let a = s.reconfigure(Adjustment::Config(RasterConfig::with_size(140)));
        let b = s.reconfigure(Adjustment::Config(RasterConfig::with_size(210)));
        let (ra, rb) = tokio::join!(a, b);
        assert_eq!(ra.unwrap(), Outcome::Superseded);
        assert_eq!(rb.unwrap(), Outcome::Applied);

        let cur = s.current().await.unwrap().unwrap();
        assert_eq!(cur.config.target_size_px, 210);
        assert_eq!(cur.bitmap.width, 210);
    }

    #[tokio::test]
    async fn resize_queued_behind_first_generate_applies_to_it() {
        let s = studio();
        let first = s.generate("hello", ErrorCorrectionLevel::M, RasterConfig::with_size(70), ImageFormat::Png);
        let resize = s.reconfigure(Adjustment::Config(RasterConfig::with_size(120)));
        let (g, r) = tokio::join!(first, resize);
        assert_eq!(g.unwrap(), Outcome::Applied);
        assert_eq!(r.unwrap(), Outcome::Applied);

        let cur = s.current().await.unwrap().unwrap();
        assert_eq!(cur.source_text, "hello");
        assert_eq!(cur.config.target_size_px, 120);
    }

    #[tokio::test]
    async fn closed_studio_reports_cancellation() {
        let s = studio();
        let other = s.clone();
        s.close().await.unwrap();
        let err = other.export(None).await.unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }
}
