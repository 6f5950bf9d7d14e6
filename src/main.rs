use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use tokio::sync::broadcast;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};

use mid360_emu::replay::ReplaySource;
use mid360_emu::server::CommandServer;
use mid360_emu::state::SharedDeviceState;
use mid360_emu::streamer::PointCloudStreamer;
use mid360_emu::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    log::info!("mid360-emu {}", mid360_emu::VERSION);

    let config = args.device_config();
    let source = ReplaySource::open(&args.replay_file)
        .into_diagnostic()
        .wrap_err_with(|| format!("Cannot open replay file {}", args.replay_file.display()))?;

    let state = SharedDeviceState::new(&config);
    let (update_tx, update_rx) = broadcast::channel(16);

    let server = CommandServer::new(config.clone(), state.clone(), update_tx);
    let streamer = PointCloudStreamer::new(config, state, source, update_rx);

    Toplevel::new(move |s| async move {
        s.start(SubsystemBuilder::new("command-server", move |s| {
            server.run(s)
        }));
        s.start(SubsystemBuilder::new("point-streamer", move |s| {
            streamer.run(s)
        }));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_secs(2))
    .await
    .map_err(Into::into)
}
