mod app;
mod msg;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, mpsc};
use std::thread;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing_subscriber::EnvFilter;

use custom_formatters::formatter::{Extension, LanguageRegistry, Registrar};
use custom_formatters::host::{LogChannel, OutputChannel, TerminalNotifier};
use custom_formatters::model::config::SettingsStore;
use custom_formatters::model::document::{Document, FormattingOptions};
use custom_formatters::model::language::language_for_path;
use custom_formatters::model::platform::Platform;
use custom_formatters::model::workspace::Workspace;

use app::App;
use msg::Msg;

const CHANNEL_NAME: &str = "Josephus' Custom Formatters";

#[derive(Debug, Parser)]
#[command(name = "custom-formatters", version, about)]
struct Cli {
    /// Settings file holding the `josephusCustomFormatters` table
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Format one file and print the result (or write it back with --write)
    Format(FormatArgs),
    /// Format files named on stdin, reloading formatters when settings change
    Serve(RequestArgs),
}

#[derive(Debug, Args)]
struct FormatArgs {
    file: PathBuf,

    /// Language identifier; guessed from the file extension when omitted
    #[arg(long)]
    language: Option<String>,

    /// Write the formatted text back to the file instead of stdout
    #[arg(long)]
    write: bool,

    #[command(flatten)]
    request: RequestArgs,
}

#[derive(Debug, Args)]
struct RequestArgs {
    #[arg(long, default_value_t = 4)]
    tab_size: u32,

    /// Indent with tabs (`${insertSpaces}` becomes `false`)
    #[arg(long)]
    use_tabs: bool,

    /// Workspace folder; repeat for multi-root. Defaults to the current directory.
    #[arg(long = "workspace")]
    workspaces: Vec<PathBuf>,
}

impl RequestArgs {
    fn options(&self) -> FormattingOptions {
        FormattingOptions {
            tab_size: self.tab_size,
            insert_spaces: !self.use_tabs,
        }
    }

    fn workspace(&self) -> Result<Workspace> {
        let folders = if self.workspaces.is_empty() {
            vec![std::env::current_dir()?]
        } else {
            self.workspaces
                .iter()
                .map(std::path::absolute)
                .collect::<io::Result<Vec<_>>>()?
        };
        Ok(Workspace::new(folders))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging to file (stdout carries formatted text)
    let log_dir = directories::ProjectDirs::from("", "", "custom-formatters")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("custom-formatters"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "custom-formatters.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("custom_formatters=info")),
        )
        .init();

    tracing::info!("custom-formatters starting");

    let settings_path = match cli.settings {
        Some(path) => std::path::absolute(path)?,
        None => SettingsStore::default_path()
            .ok_or_else(|| anyhow!("cannot determine settings directory; pass --settings"))?,
    };

    match cli.command {
        Command::Format(args) => run_format(args, settings_path),
        Command::Serve(args) => run_serve(args, settings_path).map(|()| ExitCode::SUCCESS),
    }
}

fn activate(settings_path: PathBuf, channel: Arc<LogChannel>) -> (LanguageRegistry, Extension) {
    let registrar = Registrar::new(Platform::current(), channel, Arc::new(TerminalNotifier));
    let mut registry = LanguageRegistry::new();
    let extension = Extension::activate(SettingsStore::new(settings_path), registrar, &mut registry);
    (registry, extension)
}

fn run_format(args: FormatArgs, settings_path: PathBuf) -> Result<ExitCode> {
    let channel = Arc::new(LogChannel::new(CHANNEL_NAME));
    let (mut registry, extension) = activate(settings_path, channel.clone());

    let path = std::path::absolute(&args.file)?;
    let language = args
        .language
        .clone()
        .unwrap_or_else(|| language_for_path(&path).to_string());
    let mut document = Document::from_file(path.clone(), language)
        .with_context(|| format!("cannot read {}", path.display()))?;

    let Some(provider) = registry.provider_for(&document.language_id) else {
        extension.deactivate(&mut registry);
        eprintln!(
            "no custom formatter registered for language `{}`",
            document.language_id
        );
        return Ok(ExitCode::FAILURE);
    };

    let workspace = args.request.workspace()?;
    let result = provider
        .provide_edits(&document, args.request.options(), &workspace)
        .wait();
    extension.deactivate(&mut registry);

    let edits = match result {
        Ok(edits) => edits,
        Err(err) => {
            tracing::error!("format failed: {err}");
            channel.show();
            return Ok(ExitCode::FAILURE);
        }
    };

    document.apply_edits(&edits);
    if args.write {
        if !edits.is_empty() {
            document.save()?;
        }
    } else {
        let mut stdout = io::stdout().lock();
        for chunk in document.rope.chunks() {
            stdout.write_all(chunk.as_bytes())?;
        }
        stdout.flush()?;
    }

    Ok(ExitCode::SUCCESS)
}

fn run_serve(args: RequestArgs, settings_path: PathBuf) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Msg>();
    let channel = Arc::new(LogChannel::new(CHANNEL_NAME));
    let (registry, extension) = activate(settings_path.clone(), channel);
    let mut app = App::new(
        registry,
        extension,
        args.workspace()?,
        args.options(),
        tx.clone(),
    );

    // Input thread: one file path per line
    let tx_input = tx.clone();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx_input.send(Msg::FormatFile(PathBuf::from(line))).is_err() {
                return;
            }
        }
        let _ = tx_input.send(Msg::InputClosed);
    });

    spawn_settings_watcher(settings_path, tx.clone());

    // ── Main event loop ──
    loop {
        // Batch-drain all pending messages
        let first = rx.recv()?;
        app.update(first)?;

        while let Ok(msg) = rx.try_recv() {
            app.update(msg)?;
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    Ok(())
}

/// Watch the settings file's directory; editors often replace the file
/// instead of writing it in place.
fn spawn_settings_watcher(settings_path: PathBuf, tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let Some(dir) = settings_path.parent().map(Path::to_path_buf) else {
            tracing::warn!("settings path has no parent: {}", settings_path.display());
            return;
        };

        let tx_watch = tx.clone();
        let watched = settings_path.clone();
        let mut watcher: RecommendedWatcher =
            match notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|path| path == &watched)
                    {
                        let _ = tx_watch.send(Msg::SettingsChanged);
                    }
                }
                Err(err) => {
                    tracing::warn!("settings watcher error: {err}");
                }
            }) {
                Ok(w) => w,
                Err(err) => {
                    tracing::warn!("failed to initialize settings watcher: {err}");
                    return;
                }
            };

        if let Err(err) = watcher.watch(&dir, RecursiveMode::NonRecursive) {
            tracing::warn!("failed to watch settings directory {}: {err}", dir.display());
            return;
        }

        loop {
            thread::park();
        }
    });
}
