//! nasemu - run the pan-xunlei-com NAS client inside an emulated DSM environment
//!
//! The binary loads configuration, provisions the fake DSM filesystem and
//! namespaces through the ops crate, then supervises the vendor client next
//! to a small dashboard that bridges its web UI.

mod cgi;
mod cli;
mod dashboard;
mod error;
mod events;
mod launch;
mod logging;

use crate::cli::Cli;
use crate::error::CliError;
use crate::events::EventHandler;
use crate::launch::VendorLauncher;
use clap::Parser;
use nasemu_config::Config;
use nasemu_events::EventReceiver;
use nasemu_install::Acquirer;
use nasemu_ops::{provision_plan, Executor};
use std::process;
use std::sync::Arc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

// Namespaces are unshared from this thread, so the runtime must not start
// worker threads before provisioning gets that far.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;

    init_tracing(json_mode, cli.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting nasemu v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: defaults, file, environment, flags
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.merge_env()?;
    cli.apply_to(&mut config);
    config.normalize()?;
    debug!(?config, "Effective configuration");

    let cancel = CancellationToken::new();
    watch_signals(cancel.clone());

    let (event_sender, event_receiver) = nasemu_events::channel();

    let launcher = VendorLauncher::from_config(&config)?.with_events(event_sender.clone());
    let acquirer =
        Acquirer::new(config.package.layout.clone()).with_events(event_sender.clone());

    let executor = Executor::builder()
        .with_acquirer(Arc::new(acquirer))
        .with_launcher(Arc::new(launcher))
        .with_event_sender(event_sender)
        .with_cancel_token(cancel.clone())
        .build()?;

    let plan = provision_plan(&config);
    debug!("Provisioning plan:\n{plan}");

    let mut event_handler = EventHandler::new(cli.json);
    execute_with_events(&executor, &plan, event_receiver, &mut event_handler).await?;

    // Held open until SIGINT or SIGTERM
    cancel.cancelled().await;
    info!("app exited");
    Ok(())
}

/// Run the pipeline while rendering its events
async fn execute_with_events(
    executor: &Executor,
    plan: &nasemu_ops::Pipeline,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<(), CliError> {
    let mut run_future = Box::pin(executor.execute(plan));

    loop {
        select! {
            result = &mut run_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result.map_err(CliError::from);
            }

            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for the run to finish */ }
                }
            }
        }
    }
}

/// Cancel `token` on SIGINT or SIGTERM
fn watch_signals(token: CancellationToken) {
    tokio::spawn(async move {
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(error = %e, "Failed to listen for SIGINT");
                    return;
                }
                info!("Received SIGINT, shutting down");
            }
            () = terminate => info!("Received SIGTERM, shutting down"),
        }
        token.cancel();
    });
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(debug_enabled)
            .init();
    }
}
