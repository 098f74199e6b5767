use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use resume_surface::config::SurfaceSettings;
use resume_surface::document::template::{TemplateSpec, load_template};
use resume_surface::gateway::{Delivery, MessageGateway, Surface, resume_data_message};
use resume_surface::profile::normalize;
use resume_surface::viewer::run_viewer;

const LOG_FILE_PREFIX: &str = "resume_surface.log";

#[derive(Debug, Parser)]
#[command(name = "resume_surface", about = "Live resume surface driven by host messages")]
struct Cli {
    /// Template YAML; overrides RESUME_TEMPLATE.
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the canonical profile for a raw payload.
    Normalize {
        #[arg(long)]
        payload: PathBuf,
    },
    /// Render a payload headlessly and print the resulting tree.
    Render {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long, value_enum, default_value_t = RenderFormat::Outline)]
        format: RenderFormat,
    },
    /// Open the native viewer.
    View {
        #[arg(long)]
        payload: Option<PathBuf>,
        /// Address for the HTTP host bridge; overrides RESUME_BRIDGE_BIND.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RenderFormat {
    Outline,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = SurfaceSettings::from_env().context("failed to load configuration")?;
    let _log_guard = init_tracing(&settings)?;

    if let Some(template) = cli.template {
        settings.template_path = Some(template);
    }
    let template = resolve_template(&settings)?;

    match cli.command {
        Commands::Normalize { payload } => {
            let profile = normalize(&read_payload(&payload)?);
            println!(
                "{}",
                serde_json::to_string_pretty(&profile)
                    .context("failed to serialize canonical profile")?
            );
        }
        Commands::Render { payload, format } => {
            let surface = render_headless(&settings, &template, read_payload(&payload)?)?;
            match format {
                RenderFormat::Outline => print!("{}", surface.tree().outline()),
                RenderFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&surface.tree().snapshot())
                        .context("failed to serialize tree snapshot")?
                ),
            }
        }
        Commands::View { payload, bind } => {
            if let Some(bind) = bind {
                settings.bridge_bind = Some(bind);
            }
            let initial = payload.as_deref().map(read_payload).transpose()?;
            run_viewer(&settings, template, initial)?;
        }
    }

    Ok(())
}

fn render_headless(
    settings: &SurfaceSettings,
    template: &TemplateSpec,
    payload: Value,
) -> Result<Surface> {
    let (host, mut gateway) = MessageGateway::install();
    let mut surface = Surface::new(template, settings.rebind_delay);

    let now = Instant::now();
    host.post(resume_data_message(payload));
    gateway.drain(&mut surface, now);
    ensure!(
        surface.deliveries() == 1,
        "payload was not accepted by the surface"
    );
    surface.tick(now + settings.rebind_delay);
    Ok(surface)
}

fn resolve_template(settings: &SurfaceSettings) -> Result<TemplateSpec> {
    match &settings.template_path {
        Some(path) => load_template(path),
        None => Ok(TemplateSpec::default()),
    }
}

fn read_payload(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read payload file `{}`", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("payload file `{}` is not valid JSON", path.display()))
}

fn init_tracing(settings: &SurfaceSettings) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,resume_surface=debug"));
    let console = fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let (file, guard) = match &settings.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory `{}`", dir.display()))?;
            let file_filter = EnvFilter::try_new(&settings.file_log_filter).with_context(|| {
                format!("invalid RESUME_FILE_LOG filter `{}`", settings.file_log_filter)
            })?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;
    Ok(guard)
}
