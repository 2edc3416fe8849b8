use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use pdfrender::server::{self, ServerConfig};
use pdfrender::{Margin, RenderConfig, RenderRequest};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    browser: BrowserArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BrowserArgs {
    /// Chrome/Chromium executable to launch
    #[arg(long, env = "PDFRENDER_CHROME_PATH", global = true)]
    chrome_path: Option<PathBuf>,

    /// Run the browser without its sandbox
    #[arg(long, env = "PDFRENDER_NO_SANDBOX", global = true)]
    no_sandbox: bool,

    /// Add the flags suited to memory-constrained serverless runtimes
    #[arg(long, env = "PDFRENDER_SERVERLESS", global = true)]
    serverless: bool,

    /// Extra browser flag (repeatable)
    #[arg(long = "chrome-arg", value_name = "FLAG", allow_hyphen_values = true, global = true)]
    chrome_args: Vec<String>,

    /// Timeout for each browser operation in milliseconds
    #[arg(long, env = "PDFRENDER_TIMEOUT_MS", default_value_t = 30000, global = true)]
    timeout_ms: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP render service
    Serve {
        /// Address to listen on
        #[arg(long, env = "PDFRENDER_BIND", default_value = "0.0.0.0:3000")]
        bind: SocketAddr,

        /// Largest accepted request body in bytes
        #[arg(long, env = "PDFRENDER_MAX_BODY_BYTES", default_value_t = 10 * 1024 * 1024)]
        max_body_bytes: usize,

        /// Upper bound for a whole render in milliseconds
        #[arg(long, env = "PDFRENDER_REQUEST_TIMEOUT_MS", default_value_t = 60000)]
        request_timeout_ms: u64,
    },
    /// Render one HTML file to a PDF file
    Render {
        /// HTML input file
        input: PathBuf,
        /// PDF output file
        output: PathBuf,
        /// Margin in CSS pixels (bottom margin is always zero)
        #[arg(long, default_value_t = 0.0)]
        margin: f64,
    },
}

impl BrowserArgs {
    fn into_config(self) -> RenderConfig {
        let sandbox = !self.no_sandbox;
        let mut config = if self.serverless {
            RenderConfig::serverless(sandbox)
        } else {
            RenderConfig::default()
        };
        config.chrome_path = self.chrome_path;
        config.sandbox = sandbox;
        config.timeout_ms = self.timeout_ms;
        config.extra_args.extend(self.chrome_args);
        config
    }
}

fn init_logger(verbose: bool) {
    let default_filter = if verbose { "pdfrender=debug,info" } else { "pdfrender=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = cli.browser.into_config();
    let automation = Arc::new(pdfrender::new_automation(config)?);

    match cli.command {
        Command::Serve {
            bind,
            max_body_bytes,
            request_timeout_ms,
        } => {
            let server_config = ServerConfig {
                bind,
                max_body_bytes,
                request_timeout_ms,
            };
            log::info!("Starting pdfrender {}", server::PDFRENDER_VERSION);
            let listener = tokio::net::TcpListener::bind(server_config.bind)
                .await
                .with_context(|| format!("Failed to bind to socket address {}", server_config.bind))?;
            server::serve(listener, automation, &server_config, server::shutdown_signal())
                .await
                .context("Server error")?;
        }
        Command::Render { input, output, margin } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let request = RenderRequest::new(content, Margin::from_px(margin)?);
            let pdf = tokio::task::spawn_blocking(move || {
                pdfrender::render::render_document(automation.as_ref(), &request)
            })
            .await??;
            std::fs::write(&output, &pdf).with_context(|| format!("Failed to write {}", output.display()))?;
            log::info!("Wrote {} ({} bytes)", output.display(), pdf.len());
        }
    }

    Ok(())
}
