use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{error, info, warn};
use simplelog::{Config, WriteLogger};

use folio::archive::{ArchiveEntryStream, ZipArchiveSource, entry_path_for_request};
use folio::panic_handler;
use folio::settings::{self, FitMode, Settings};

#[derive(Parser)]
#[command(name = "folio", version)]
#[command(about = "Render document pages, list outlines and stream archive entries")]
struct Cli {
    /// Read settings from this file instead of the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document title and page count
    Info {
        file: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },

    /// Print the navigation outline
    Toc {
        file: PathBuf,
        #[arg(long)]
        password: Option<String>,
    },

    /// Render one page to a PNG file
    Render(RenderArgs),

    /// Stream an archive entry to stdout
    Cat {
        archive: PathBuf,
        /// Request path, percent-encoded as a content consumer would issue it
        request: String,
        /// Package directory the request is relative to
        #[arg(long, default_value = "")]
        root: String,
        /// Stop after this many bytes
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Args)]
struct RenderArgs {
    file: PathBuf,
    /// 1-based page number, clamped into the document
    #[arg(short, long, default_value_t = 1)]
    page: i64,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long, value_enum)]
    fit: Option<FitArg>,
    /// View rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    rotate: Option<i32>,
    #[arg(long)]
    password: Option<String>,
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum FitArg {
    Contain,
    Cover,
}

impl From<FitArg> for FitMode {
    fn from(fit: FitArg) -> Self {
        match fit {
            FitArg::Contain => FitMode::Contain,
            FitArg::Cover => FitMode::Cover,
        }
    }
}

fn main() -> Result<()> {
    panic_handler::initialize_panic_handler();

    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => settings::load_or_create(path),
        None => {
            settings::load_settings();
            settings::get_settings()
        }
    };
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }

    init_logging(&settings)?;
    info!("Starting folio {}", env!("CARGO_PKG_VERSION"));

    let result = run(cli.command, settings);
    if let Err(e) = &result {
        error!("Command failed: {e:#}");
    }
    result
}

fn init_logging(settings: &Settings) -> Result<()> {
    let log_path = settings.log_file_path();
    if let Some(parent) = log_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory {parent:?}"))?;
        }
    }

    WriteLogger::init(
        settings.log_level_filter(),
        Config::default(),
        File::create(&log_path).with_context(|| format!("Failed to create log file {log_path:?}"))?,
    )?;
    Ok(())
}

fn run(command: Commands, settings: Settings) -> Result<()> {
    match command {
        Commands::Cat {
            archive,
            request,
            root,
            limit,
        } => cat_entry(&archive, &root, &request, limit),
        #[cfg(feature = "pdf")]
        Commands::Info { file, password } => pdf::info(&file, password.as_deref(), &settings),
        #[cfg(feature = "pdf")]
        Commands::Toc { file, password } => pdf::toc(&file, password.as_deref(), &settings),
        #[cfg(feature = "pdf")]
        Commands::Render(args) => pdf::render(args, settings),
        #[cfg(not(feature = "pdf"))]
        Commands::Info { .. } | Commands::Toc { .. } | Commands::Render(_) => {
            let _ = settings;
            anyhow::bail!("folio was built without the `pdf` feature")
        }
    }
}

fn cat_entry(archive: &Path, root: &str, request: &str, limit: Option<u64>) -> Result<()> {
    let source = ZipArchiveSource::open(archive)
        .with_context(|| format!("Failed to open archive {archive:?}"))?;
    let entry_path = entry_path_for_request(root, request)?;
    let mut stream = ArchiveEntryStream::open(Arc::new(source), entry_path)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut buf = [0u8; 16 * 1024];
    let mut written = 0u64;

    loop {
        let want = match limit {
            Some(limit) => (limit.saturating_sub(written)).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        if want == 0 {
            stream.abort();
            break;
        }

        let n = stream.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        if let Err(e) = out.write_all(&buf[..n]) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                warn!("Consumer closed the pipe after {written} bytes");
                stream.abort();
                break;
            }
            return Err(e.into());
        }
        written += n as u64;
    }

    out.flush()?;
    info!(
        "Wrote {written} bytes of {} from {:?}",
        stream.entry_path(),
        stream.archive().path()
    );
    Ok(())
}

#[cfg(feature = "pdf")]
mod pdf {
    use std::path::Path;

    use anyhow::{Context, Result};
    use log::info;

    use folio::document::{DocumentSession, MupdfBackend, MupdfDocument, OpenOptions};
    use folio::settings::Settings;

    use super::RenderArgs;

    const TITLE_COLUMN: usize = 60;

    pub fn info(file: &Path, password: Option<&str>, settings: &Settings) -> Result<()> {
        let mut session = open(file, password, settings.open_options(1))?;
        println!("Title: {}", session.title()?);
        println!("Pages: {}", session.page_count()?);
        session.close();
        Ok(())
    }

    pub fn toc(file: &Path, password: Option<&str>, settings: &Settings) -> Result<()> {
        let mut session = open(file, password, settings.open_options(1))?;
        let tree = session.navigation_tree()?;
        // Row 0 is the synthetic root
        for row in tree.rows().into_iter().skip(1) {
            let title = format!("{:indent$}{}", "", row.title, indent = (row.depth - 1) * 2);
            println!("{title:<width$} {:>5}", row.page_label, width = TITLE_COLUMN);
        }
        session.close();
        Ok(())
    }

    pub fn render(args: RenderArgs, mut settings: Settings) -> Result<()> {
        if let Some(width) = args.width {
            settings.viewport_width = width;
        }
        if let Some(height) = args.height {
            settings.viewport_height = height;
        }
        if let Some(fit) = args.fit {
            settings.fit = fit.into();
        }
        if let Some(rotate) = args.rotate {
            settings.rotation = rotate;
        }

        let output = &args.output;
        let mut session = open(
            &args.file,
            args.password.as_deref(),
            settings.open_options(args.page),
        )?;
        let page = session.current_page()?;
        let buffer = session.render_page(page, settings.viewport(), settings.fit_policy())?;
        let (width, height) = (buffer.width(), buffer.height());
        let image = buffer.to_rgba_image()?;
        image
            .save(output)
            .with_context(|| format!("Failed to write {output:?}"))?;

        info!("Saved page {page} to {output:?}");
        println!(
            "Page {page}: {width}x{height} at zoom {:.3} -> {}",
            session.zoom()?,
            output.display()
        );
        session.close();
        Ok(())
    }

    fn open(
        file: &Path,
        password: Option<&str>,
        options: OpenOptions,
    ) -> Result<DocumentSession<MupdfDocument>> {
        DocumentSession::open(&MupdfBackend, file, password, options)
            .with_context(|| format!("Failed to open {file:?}"))
    }
}
