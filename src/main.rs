use anyhow::Result;
use parkgate::camera::HttpCamera;
use parkgate::config::Config;
use parkgate::dispatcher::Dispatcher;
use parkgate::link::open_link;
use parkgate::recognizer::{CommandEngine, PlateRecognizer};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;
    config.validate()?;

    parkgate::logging::init_logging(&config.logging)?;
    info!("Parkgate {} starting up", env!("APP_VERSION"));

    // The loop must not start without a working recognizer
    let engine = CommandEngine::connect(&config.recognizer).await?;
    info!("Recognizer '{}' initialized", engine.program());
    let recognizer = PlateRecognizer::new(Box::new(engine));

    let camera = HttpCamera::new(&config.camera)?;
    info!("Capturing frames from {}", camera.url());

    let link = open_link(&config.link).await?;

    let mut dispatcher = Dispatcher::new(&config, link, Box::new(camera), recognizer)?;
    dispatcher.start().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for interrupt signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match dispatcher.run_until(shutdown).await {
        Ok(()) => {
            info!("Parking system stopped");
            Ok(())
        }
        Err(e) => {
            error!("Control loop failed with error: {}", e);
            Err(anyhow::anyhow!("Control loop error: {}", e))
        }
    }
}
