//! wemd - Main Entry Point
//!
//! Command line front end: render markdown to themed HTML, copy export HTML
//! to the clipboard, maintain footnotes and re-render on change.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use wemd::config::{self, Settings};
use wemd::error::{Error, Result};
use wemd::export::clipboard::OWNS_CLIPBOARD;
use wemd::export::{generate_html_document, ClipboardWriter};
use wemd::markdown::{insert_footnote, next_footnote_number, sync_footnotes};
use wemd::theme::ThemeRegistry;
use wemd::watch::{Debouncer, FileWatcher, WatchEvent};
use wemd::{MarkdownParser, RenderMode, SourceDocument, ThemeApplicator};

#[derive(Parser)]
#[command(name = "wemd")]
#[command(version, about = "Markdown to WeChat-ready HTML", long_about = None)]
#[command(after_help = "EXAMPLES:
    wemd render post.md                    Preview HTML on stdout
    wemd render post.md --export -o out.html
    wemd copy post.md --theme academic-paper
    wemd sync-footnotes post.md --write")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Theme selection shared by rendering commands.
#[derive(clap::Args, Debug, Clone)]
struct ThemeArgs {
    /// Theme id (see `wemd themes`)
    #[arg(long)]
    theme: Option<String>,

    /// Stylesheet file used instead of a registered theme
    #[arg(long, value_name = "CSS", conflicts_with = "theme")]
    theme_css: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Render markdown to HTML
    Render {
        /// Markdown file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        theme: ThemeArgs,

        /// Inline the theme and apply export rewrites
        #[arg(long)]
        export: bool,

        /// Wrap the result in a complete HTML page
        #[arg(long)]
        standalone: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Render in export mode and copy to the clipboard
    Copy {
        /// Markdown file, or `-` for stdin
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        theme: ThemeArgs,
    },

    /// Drop orphaned footnote references and unused definitions
    SyncFootnotes {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Rewrite the file in place instead of printing
        #[arg(long)]
        write: bool,
    },

    /// Footnote helpers
    Footnote {
        #[command(subcommand)]
        action: FootnoteAction,
    },

    /// List available themes
    Themes,

    /// Re-render whenever the input or stylesheet changes
    Watch {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[command(flatten)]
        theme: ThemeArgs,

        /// Inline the theme and apply export rewrites
        #[arg(long)]
        export: bool,

        /// Output file
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Show or initialise the configuration
    Config {
        /// Print the config file path only
        #[arg(long)]
        path: bool,

        /// Write the current (or default) settings to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum FootnoteAction {
    /// Print the next free footnote number
    Next {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Insert a reference after a byte range and append its definition
    Insert {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Byte offset where the selection starts
        #[arg(long)]
        start: usize,

        /// Byte offset where the selection ends (defaults to start)
        #[arg(long)]
        end: Option<usize>,

        /// Rewrite the file in place instead of printing
        #[arg(long)]
        write: bool,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ─────────────────────────────────────────────────────────────────────────────

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|source| Error::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn emit(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            write_output(path, content)?;
            info!("Wrote {}", path.display());
            Ok(())
        }
        None => {
            println!("{content}");
            Ok(())
        }
    }
}

/// Settings plus the theme registry they point at.
struct Session {
    settings: Settings,
    registry: ThemeRegistry,
}

impl Session {
    fn load() -> Self {
        let settings = config::load_config();
        let mut registry = ThemeRegistry::new();
        match config::themes_dir(&settings) {
            Ok(dir) => {
                if let Err(e) = registry.load_dir(&dir) {
                    warn!("Failed to load custom themes: {}", e);
                }
            }
            Err(e) => debug!("No theme directory: {}", e),
        }
        if let Err(e) = registry.set_current(&settings.default_theme) {
            warn!("Configured theme unavailable, using default: {}", e);
        }
        Self { settings, registry }
    }

    fn parser(&self) -> MarkdownParser {
        MarkdownParser::new(self.settings.markdown.clone())
    }

    fn applicator(&self) -> ThemeApplicator {
        ThemeApplicator::new(self.settings.export.clone())
    }

    fn theme_css(&self, args: &ThemeArgs) -> Result<String> {
        if let Some(path) = &args.theme_css {
            return read_input(path);
        }
        let id = args
            .theme
            .as_deref()
            .unwrap_or_else(|| self.registry.current_id());
        Ok(self.registry.css(id)?.to_string())
    }

    fn render(&self, markdown: String, args: &ThemeArgs, mode: RenderMode) -> Result<(String, String)> {
        let theme_css = self.theme_css(args)?;
        let mut doc = SourceDocument::new(markdown, theme_css);
        doc.sync_footnotes();
        let output = doc.render_with(&self.parser(), &self.applicator(), mode)?;
        Ok((output.html, doc.theme_css))
    }
}

fn mode_for(export: bool) -> RenderMode {
    if export {
        RenderMode::Export
    } else {
        RenderMode::Preview
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Render {
            input,
            theme,
            export,
            standalone,
            output,
        } => {
            let session = Session::load();
            let mode = mode_for(export);
            let (html, css) = session.render(read_input(&input)?, &theme, mode)?;
            let html = if standalone {
                let title = input.file_stem().and_then(|s| s.to_str());
                let themed = wemd::ThemedOutput { html, mode };
                generate_html_document(&themed, title, Some(&css))
            } else {
                html
            };
            emit(output.as_deref(), &html)
        }

        Command::Copy { input, theme } => {
            let session = Session::load();
            let markdown = read_input(&input)?;
            let css = session.theme_css(&theme)?;
            let mut doc = SourceDocument::new(markdown, css);
            doc.sync_footnotes();
            let output = doc.render_with(&session.parser(), &session.applicator(), RenderMode::Export)?;
            let payload = output.clipboard_payload(&doc);

            let mut writer = ClipboardWriter::new(session.settings.clipboard_policy);
            let outcome = writer.write(&payload.html, &payload.plain_text)?;
            println!(
                "Copied to clipboard (primary: {}, secondary: {})",
                if outcome.primary { "ok" } else { "failed" },
                if outcome.secondary { "ok" } else { "skipped or failed" }
            );
            if OWNS_CLIPBOARD {
                println!("Serving clipboard until another copy replaces it");
            }
            writer.hold(&payload.html, &payload.plain_text)?;
            Ok(())
        }

        Command::SyncFootnotes { input, write } => {
            let markdown = read_input(&input)?;
            let synced = sync_footnotes(&markdown);
            if write {
                if synced.changed {
                    write_output(&input, &synced.text)?;
                    info!("Footnotes synchronized in {}", input.display());
                } else {
                    info!("Footnotes already consistent");
                }
                Ok(())
            } else {
                print!("{}", synced.text);
                Ok(())
            }
        }

        Command::Footnote { action } => match action {
            FootnoteAction::Next { input } => {
                println!("{}", next_footnote_number(&read_input(&input)?));
                Ok(())
            }
            FootnoteAction::Insert {
                input,
                start,
                end,
                write,
            } => {
                let markdown = read_input(&input)?;
                let end = end.unwrap_or(start).max(start);
                let inserted = insert_footnote(&markdown, start..end);
                info!(
                    "Inserted footnote [^{}]; definition at bytes {}..{}",
                    inserted.number, inserted.definition.start, inserted.definition.end
                );
                if write {
                    write_output(&input, &inserted.text)
                } else {
                    print!("{}", inserted.text);
                    Ok(())
                }
            }
        },

        Command::Themes => {
            let session = Session::load();
            for theme in session.registry.themes() {
                let marker = if theme.id == session.registry.current_id() {
                    "*"
                } else {
                    " "
                };
                let origin = if theme.builtin { "built-in" } else { "custom" };
                println!("{} {:<20} {} ({})", marker, theme.id, theme.name, origin);
            }
            Ok(())
        }

        Command::Watch {
            input,
            theme,
            export,
            output,
        } => watch(&input, &theme, mode_for(export), &output),

        Command::Config { path, init } => {
            let config_path = config::get_config_file_path()?;
            if path {
                println!("{}", config_path.display());
                return Ok(());
            }
            let settings = config::load_config();
            if init {
                config::save_config(&settings)?;
                println!("Wrote {}", config_path.display());
            } else {
                let json = serde_json::to_string_pretty(&settings)?;
                println!("{json}");
            }
            Ok(())
        }
    }
}

fn watch(input: &Path, theme: &ThemeArgs, mode: RenderMode, output: &Path) -> Result<()> {
    let session = Session::load();

    let render_once = || -> Result<()> {
        let markdown = read_input(input)?;
        let synced = sync_footnotes(&markdown);
        if synced.changed {
            // Rewrites the watched file; the follow-up event renders unchanged text
            write_output(input, &synced.text)?;
            info!("Footnotes synchronized in {}", input.display());
        }
        let (html, _) = session.render(synced.text, theme, mode)?;
        write_output(output, &html)?;
        info!("Rendered {} -> {}", input.display(), output.display());
        Ok(())
    };
    render_once()?;

    let mut files = vec![input.to_path_buf()];
    if let Some(css) = &theme.theme_css {
        files.push(css.clone());
    }
    let watcher = FileWatcher::new(&files)?;
    let mut debouncer = Debouncer::new(Duration::from_millis(session.settings.debounce_ms));
    info!("Watching {} (Ctrl-C to stop)", input.display());

    loop {
        for event in watcher.poll_events() {
            match event {
                WatchEvent::Changed(path) => {
                    debug!("Change detected: {}", path.display());
                    debouncer.schedule(Instant::now());
                }
                WatchEvent::Error(e) => warn!("Watcher error: {}", e),
            }
        }

        if debouncer.poll(Instant::now()) {
            if let Err(e) = render_once() {
                warn!("Render failed: {}", e);
            }
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
