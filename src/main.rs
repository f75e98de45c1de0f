use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;

use qrcanvas::platform::{perform, Action, Delivered, LocalPlatform};
use qrcanvas::{
    classify, derive_filename, Color, ErrorCorrectionLevel, ImageFormat, Session, Settings,
};

/// qrcanvas: turn text into QR code images
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a QR code image and save it
    Generate {
        /// Text, URL, mailto: or tel: content to encode
        text: String,

        /// JSON settings file; flags below override it
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Requested image size in pixels (200, 300, 400 and 500 are the presets)
        #[clap(short, long)]
        size: Option<u32>,

        /// Error-correction level: L, M, Q or H
        #[clap(short, long)]
        level: Option<ErrorCorrectionLevel>,

        /// Output format: png, jpeg or svg
        #[clap(short, long)]
        format: Option<ImageFormat>,

        /// Foreground color as #rrggbb
        #[clap(long)]
        fg: Option<Color>,

        /// Background color as #rrggbb
        #[clap(long)]
        bg: Option<Color>,

        /// Directory to save into
        #[clap(short, long, default_value = ".")]
        out: PathBuf,

        /// Print a data: URL instead of writing a file
        #[clap(long)]
        data_url: bool,
    },

    /// Print what kind of content the text looks like
    Classify { text: String },

    /// Print the filename an export of this text would get
    Filename {
        text: String,

        #[clap(short, long, default_value = "png")]
        format: ImageFormat,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            text,
            config,
            size,
            level,
            format,
            fg,
            bg,
            out,
            data_url,
        } => {
            let mut settings = match config {
                Some(path) => Settings::from_json_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => Settings::default(),
            };
            if let Some(size) = size {
                settings.size = size;
            }
            if let Some(level) = level {
                settings.level = level;
            }
            if let Some(format) = format {
                settings.format = format;
            }
            if let Some(fg) = fg {
                settings.foreground = fg;
            }
            if let Some(bg) = bg {
                settings.background = bg;
            }
            settings.validate()?;
            info!("generating {} content with {:?}", classify(&text), settings);

            let mut session = Session::new(qrcanvas::new_symbol_source());
            session.generate(&text, settings.level, settings.raster_config(), settings.format)?;

            if data_url {
                println!("{}", session.export_current(None)?.to_data_url());
                return Ok(());
            }

            let platform = LocalPlatform::new(out);
            match perform(&platform, &session, Action::Download)? {
                Delivered::Saved(path) => println!("{}", path.display()),
                other => bail!("unexpected delivery: {:?}", other),
            }
        }
        Command::Classify { text } => println!("{}", classify(&text)),
        Command::Filename { text, format } => println!("{}", derive_filename(&text, format)),
    }

    Ok(())
}
