use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use piaware_epaper::app::{Daemon, RefreshPolicy};
use piaware_epaper::config::Settings;
use piaware_epaper::display::{Panel, SimulatedPanel};
use piaware_epaper::events::{action_channel, ActionSender};
use piaware_epaper::notify::AlertNotifier;
use piaware_epaper::source::PiAwareSource;
use piaware_epaper::ui::{export, RenderConfig};

#[derive(Parser, Debug)]
#[command(name = "piaware-epaper")]
#[command(about = "PiAware receiver status on a Waveshare e-paper display")]
struct Args {
    /// TOML file with refresh, panel, layout, button and watchlist settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Poll and draw a single frame, then exit
    #[arg(long)]
    once: bool,

    /// Use an in-memory panel and no GPIO buttons
    #[arg(long)]
    simulate: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("invalid configuration")?;

    init_tracing(&settings);
    let _sentry = init_sentry(&settings);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args, settings))
}

fn init_tracing(settings: &Settings) {
    // RUST_LOG wins over LOGLEVEL when both are set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(feature = "sentry")]
fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn()?;
    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));
    tracing::info!("Sentry error reporting enabled");
    Some(guard)
}

#[cfg(not(feature = "sentry"))]
fn init_sentry(settings: &Settings) -> Option<()> {
    if settings.sentry_dsn.is_some() {
        tracing::warn!("SENTRY_DSN is set but this build has no Sentry support");
    }
    None
}

async fn run(args: Args, settings: Settings) -> Result<()> {
    let render = RenderConfig::from_settings(&settings).map_err(anyhow::Error::msg)?;
    let source = PiAwareSource::from_settings(&settings)?;
    let notifier = AlertNotifier::from_settings(&settings)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    watch_signals(shutdown_tx)?;

    let (actions_tx, actions_rx) = action_channel();
    let panel: Box<dyn Panel> = if args.simulate {
        tracing::info!("Using the simulated panel");
        Box::new(SimulatedPanel::new(settings.panel.width, settings.panel.height))
    } else {
        hardware_panel(&settings)?
    };
    if args.simulate || !settings.buttons.enabled || settings.buttons.bindings.is_empty() {
        tracing::debug!("Buttons disabled");
    } else {
        start_buttons(&settings, actions_tx)?;
    }

    let debug_image = if export::running_in_container() {
        tracing::debug!("Running in a container, not writing the debug image");
        None
    } else {
        settings.debug_image.clone()
    };

    let mut daemon = Daemon::new(Box::new(source), panel, actions_rx, shutdown_rx)
        .with_notifier(notifier)
        .with_render_config(render)
        .with_refresh_policy(RefreshPolicy::new(settings.full_refresh_every))
        .with_interval(settings.refresh_interval())
        .with_startup_attempts(settings.startup_attempts)
        .with_debug_image(debug_image)
        .once(args.once);

    daemon
        .run()
        .await
        .context("the display could not be initialised")
}

/// SIGINT, SIGTERM and SIGQUIT request a clean shutdown. SIGHUP is ignored.
fn watch_signals(shutdown: watch::Sender<bool>) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
                _ = quit.recv() => "SIGQUIT",
                _ = hangup.recv() => {
                    tracing::info!("Ignoring SIGHUP");
                    continue;
                }
            };
            tracing::info!("Received {}, shutting down", name);
            shutdown.send_replace(true);
        }
    });
    Ok(())
}

#[cfg(feature = "hardware")]
fn hardware_panel(settings: &Settings) -> Result<Box<dyn Panel>> {
    use piaware_epaper::display::WaveshareSpiPanel;

    Ok(Box::new(WaveshareSpiPanel::new(settings.panel.clone())))
}

#[cfg(not(feature = "hardware"))]
fn hardware_panel(_settings: &Settings) -> Result<Box<dyn Panel>> {
    anyhow::bail!("built without the `hardware` feature, run with --simulate")
}

#[cfg(feature = "hardware")]
fn start_buttons(settings: &Settings, sender: ActionSender) -> Result<()> {
    use piaware_epaper::events::gpio::open_buttons;

    let watcher = open_buttons(&settings.panel.gpio_chip, &settings.buttons, sender)?;
    tracing::info!(buttons = watcher.len(), "Watching buttons");
    watcher.spawn()?;
    Ok(())
}

#[cfg(not(feature = "hardware"))]
fn start_buttons(_settings: &Settings, _sender: ActionSender) -> Result<()> {
    tracing::warn!("Built without the `hardware` feature, buttons are unavailable");
    Ok(())
}
