//! nimbus binary
//!
//! `nimbus watch` (default) runs the state loop and reads commands from
//! stdin. `nimbus notify` runs the background notifier.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use nimbus::commands::{parse_input, Input, HELP};
use nimbus::config::{notify_period, Args, Command, Config};
use nimbus::view::{location_lines, summary_line};
use nimbus::{
    EffectHandler, Notifier, SqliteLocationStore, StdoutSink, TomlSettingsStore, WeatherApiClient,
};
use nimbus_core::{
    Action, ActionLoggerMiddleware, EffectRuntime, FixedCoordinates, Services, Store, UiState,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let config = Config::load(&args)?;
    match args.command.unwrap_or(Command::Watch) {
        Command::Watch => watch(config).await,
        Command::Notify { once, minutes } => notify(config, once, minutes).await,
    }
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "nimbus=debug,nimbus_core=debug"
    } else {
        "nimbus=info,nimbus_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

fn services(config: &Config) -> Result<(Services, bool)> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("Failed to create {}", config.data_dir.display()))?;

    let weather = WeatherApiClient::new(&config.base_url, config.api_key.clone())
        .context("Failed to build weather client")?;
    let locations = SqliteLocationStore::open(config.locations_db())
        .context("Failed to open location database")?;
    let settings =
        TomlSettingsStore::load(config.settings_file()).context("Failed to load settings")?;
    let coordinates = match config.coordinate {
        Some(c) => FixedCoordinates::at(c.lat, c.lon),
        None => FixedCoordinates::unavailable(),
    };

    let services = Services {
        weather: Arc::new(weather),
        locations: Arc::new(locations),
        settings: Arc::new(settings),
        coordinates: Arc::new(coordinates),
    };
    Ok((services, config.coordinate.is_some()))
}

async fn watch(config: Config) -> Result<()> {
    let (services, permission) = services(&config)?;

    let middleware = ActionLoggerMiddleware::new(config.log.clone()).active(config.debug);
    let store = Store::with_middleware(UiState::new().with_permission(permission), middleware);
    let mut runtime = EffectRuntime::from_store(store);
    runtime
        .follow_stores(services.locations.as_ref(), services.settings.as_ref())
        .start_refresh();

    let cancel = runtime.cancel_token();
    let snapshots = runtime.subscribe();
    tokio::spawn(read_commands(runtime.action_tx(), snapshots.clone()));
    tokio::spawn(print_summaries(snapshots, cancel.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let handler = EffectHandler::new(services);
    println!("{HELP}");
    runtime
        .run(
            |action| matches!(action, Action::Quit),
            |effect, ctx| handler.handle(effect, ctx),
        )
        .await;
    handler.close().await;
    Ok(())
}

async fn read_commands(tx: mpsc::UnboundedSender<Action>, snapshots: watch::Receiver<Arc<UiState>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stdin");
                break;
            }
        };

        let action = match parse_input(&line) {
            Ok(None) => continue,
            Ok(Some(Input::Dispatch(action))) => action,
            Ok(Some(Input::List)) => {
                let rows = location_lines(&snapshots.borrow());
                for row in rows {
                    println!("{row}");
                }
                Action::LocationListShown
            }
            Ok(Some(Input::Help)) => {
                println!("{HELP}");
                continue;
            }
            Ok(Some(Input::Quit)) => break,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };
        if tx.send(action).is_err() {
            return;
        }
    }
    let _ = tx.send(Action::Quit);
}

/// Print a summary whenever what it shows changes, ignoring the countdown
async fn print_summaries(mut snapshots: watch::Receiver<Arc<UiState>>, cancel: CancellationToken) {
    let mut last = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = snapshots.borrow_and_update().clone();
                let key = (
                    state.active_weather.clone(),
                    state.selected_location,
                    state.gps_enabled,
                    state.degree_unit,
                    state.wind_unit,
                );
                if last.as_ref() != Some(&key) {
                    println!("{}", summary_line(&state));
                    last = Some(key);
                }
            }
        }
    }
}

async fn notify(config: Config, once: bool, minutes: Option<u64>) -> Result<()> {
    let (services, _) = services(&config)?;
    let period = minutes.map(notify_period).unwrap_or(config.notify_period);
    let notifier = Notifier::new(services.settings, services.weather, Arc::new(StdoutSink))
        .with_period(period);

    if once {
        notifier.notify_once().await;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.cancel();
        }
    });
    notifier.run(cancel).await;
    Ok(())
}
