use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lesson_player::{
    adapters::simulated::SimulatedPlatform,
    config::Config,
    models::{MediaReference, PlayerSettings},
    player::{OpenRequest, PlayerController},
    services::{InMemoryServices, JsonFileSettingsStore, ServiceSet, SettingsStore},
    sources::SourceResolver,
};

const TIME_UPDATE_STEP_SECS: f64 = 0.25;

#[derive(Parser)]
#[command(name = "lesson-player")]
#[command(version)]
#[command(about = "Lesson video playback controller")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a media reference and print the resolution as JSON
    Resolve {
        reference: String,
    },
    /// Play a lesson against a simulated media element
    Simulate {
        #[arg(long)]
        lesson: String,
        #[arg(long)]
        student: String,
        #[arg(long)]
        reference: String,
        /// Media duration in seconds
        #[arg(long, default_value_t = 600.0)]
        duration: f64,
        /// Seconds of playback to simulate
        #[arg(long, default_value_t = 30.0)]
        watch: f64,
        /// Seek here before watching
        #[arg(long)]
        seek: Option<f64>,
        /// Player settings JSON file
        #[arg(long)]
        settings: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("lesson_player={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Resolve { reference } => {
            let resolved = SourceResolver::resolve(&reference);
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Command::Simulate {
            lesson,
            student,
            reference,
            duration,
            watch,
            seek,
            settings,
        } => {
            info!("Starting lesson player v{}", env!("CARGO_PKG_VERSION"));
            let config = Config::load(&cli.config)?;

            let settings = match settings {
                Some(path) => JsonFileSettingsStore::new(path).load().await?,
                None => PlayerSettings::default(),
            };

            let memory = InMemoryServices::new();
            let services = if config.services.progress_url.is_some()
                || config.services.activity_url.is_some()
                || config.services.bookmark_url.is_some()
            {
                ServiceSet::from_config(&config.services)?
            } else {
                memory.service_set()
            };

            let mut platform = SimulatedPlatform::new(duration);
            let request = OpenRequest {
                student_id: student,
                lesson_id: lesson.clone(),
                reference: MediaReference::new(reference),
                settings,
            };
            let mut controller =
                PlayerController::open(request, &mut platform, services, &config).await?;
            controller.settle().await;

            if let Some(target) = seek {
                controller.seek(target)?;
                controller.settle().await;
            }
            controller.play()?;
            controller.settle().await;

            let watched = platform
                .watch_lesson(&mut controller, watch.max(0.0), TIME_UPDATE_STEP_SECS)
                .await;

            controller.pause()?;
            controller.settle().await;
            let state = controller.state().clone();
            controller.shutdown().await;

            let summary = json!({
                "source": controller.source(),
                "watchedSeconds": watched,
                "state": state,
                "activity": memory.activity.events().await,
                "checkpoints": memory.progress.writes().await,
                "savedPosition": memory.progress.position(&lesson).await,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
