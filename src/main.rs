mod mcp;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use eoka_scan::{DomSnapshot, LaunchOptions, Overlay, ScanReport, Session};

#[derive(Parser)]
#[command(name = "eoka-scan")]
#[command(about = "Find the interactive elements of a page, with stable locators")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Open a URL in a browser and scan it
    Scan {
        /// Page to scan
        url: String,

        /// Draw numbered boxes over each element
        #[arg(long)]
        highlight: bool,

        /// Save a PNG screenshot after scanning
        #[arg(long, value_name = "PATH")]
        screenshot: Option<PathBuf>,

        /// Save the captured page snapshot (for `eoka-scan file`)
        #[arg(long, value_name = "PATH")]
        save_snapshot: Option<PathBuf>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Scan a previously captured snapshot file, no browser needed
    File {
        /// Snapshot JSON written by `scan --save-snapshot`
        path: PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Run the MCP server on stdio
    Serve {
        #[command(flatten)]
        browser: BrowserArgs,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// Print the compact element list instead of JSON
    #[arg(long)]
    list: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct BrowserArgs {
    /// Run the browser headless
    #[arg(long)]
    headless: bool,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,
}

impl BrowserArgs {
    fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            viewport_width: self.width,
            viewport_height: self.height,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    // stdout carries reports and the MCP transport; logs go to stderr
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    match cli.command {
        Command::Scan {
            url,
            highlight,
            screenshot,
            save_snapshot,
            output,
            browser,
        } => {
            let mut session = Session::launch_with_options(browser.launch_options()).await?;
            let result = scan_url(&mut session, &url, highlight, screenshot, save_snapshot).await;
            session.close().await?;
            emit(&result?, &output)?;
        }
        Command::File { path, output } => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let doc = DomSnapshot::from_json(&json)?;
            let report = eoka_scan::scan(&doc, &doc, false, &mut Overlay::new())?;
            emit(&report, &output)?;
        }
        Command::Serve { browser } => {
            mcp::run_server(browser.launch_options()).await?;
        }
    }

    Ok(())
}

async fn scan_url(
    session: &mut Session,
    url: &str,
    highlight: bool,
    screenshot: Option<PathBuf>,
    save_snapshot: Option<PathBuf>,
) -> anyhow::Result<ScanReport> {
    session.goto(url).await?;

    if let Some(path) = save_snapshot {
        let doc = eoka_scan::capture::capture(session.page()).await?;
        std::fs::write(&path, doc.to_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Snapshot saved to {}", path.display());
    }

    let report = session.scan(highlight).await?.clone();
    info!("Found {} interactive elements", report.len());

    if let Some(path) = screenshot {
        let png = session.screenshot().await?;
        std::fs::write(&path, png).with_context(|| format!("writing {}", path.display()))?;
        info!("Screenshot saved to {}", path.display());
    }

    Ok(report)
}

fn emit(report: &ScanReport, output: &OutputArgs) -> anyhow::Result<()> {
    let text = if output.list {
        report.element_list()
    } else {
        serde_json::to_string_pretty(report)? + "\n"
    };
    match output.out {
        Some(ref path) => {
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?
        }
        None => print!("{}", text),
    }
    Ok(())
}
