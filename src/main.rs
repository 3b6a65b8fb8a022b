#[macro_use]
extern crate tracing;

use std::path::PathBuf;

use structopt::StructOpt;
use tokio::runtime::Builder;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use gamelights::{
    cli,
    dispatcher::{DispatchSettings, Dispatcher},
    generator::{ColorGenerator, GeneratorMode},
    grabber,
    models::Config,
    transport::Transport,
};

#[derive(Debug, StructOpt)]
#[structopt(about = "Mirror the game state on network LED controllers")]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    /// Path to the TOML configuration file
    #[structopt(short, long = "config")]
    config_path: Option<PathBuf>,
    /// Comma or space separated list of UDP peers
    #[structopt(short, long = "udp-ips")]
    udp_ips: Option<String>,
    /// Hostname of the MQTT broker
    #[structopt(short, long = "mqtt-hostname")]
    mqtt_hostname: Option<String>,
    /// Also log every color sent, at info level even without -v
    #[structopt(long)]
    stdout: bool,
    /// Send every color, even if it did not change
    #[structopt(long)]
    no_suppress: bool,
    /// Dim the output luminance
    #[structopt(long)]
    dimmed: bool,
    /// Send the mean screen color instead of running the game state machine
    #[structopt(long)]
    average: bool,
    #[structopt(long)]
    dump_config: bool,
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    // Load configuration
    let mut config = if let Some(config_path) = opts.config_path.as_deref() {
        Config::load_file(config_path).await?
    } else {
        Config::default()
    };

    if let Some(udp_ips) = opts.udp_ips.as_deref() {
        config.output.udp_peers = cli::split_peers(udp_ips);
    }
    if opts.mqtt_hostname.is_some() {
        config.output.mqtt_hostname = opts.mqtt_hostname.clone();
    }
    config.output.stdout |= opts.stdout;
    config.dispatch.suppress_unchanged &= !opts.no_suppress;
    config.generator.dimmed |= opts.dimmed;
    if opts.average {
        config.generator.mode = GeneratorMode::Average;
    }

    // Dump configuration if this was asked
    if opts.dump_config {
        print!("{}", config.to_string()?);
        return Ok(());
    }

    if cli::discover_if_empty(&mut config.output).await? == Some(0) {
        error!("no gamelights controllers found");
        std::process::exit(1);
    }

    let transport = Transport::from_config(&config.output, config.dispatch.send_timeout()).await?;
    let generator = ColorGenerator::new(config.generator_settings()?)?;
    let grabber = grabber::from_config(&config.capture)?;

    let mut dispatcher = Dispatcher::new(
        grabber,
        generator,
        transport,
        (config.capture.primary, config.capture.secondary),
        DispatchSettings {
            tick_rate: config.dispatch.tick_rate,
            suppress_unchanged: config.dispatch.suppress_unchanged,
            capture_timeout: config.capture.timeout(),
        },
    )?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();

        async move {
            if let Err(error) = signal::ctrl_c().await {
                error!(error = %error, "cannot listen for ctrl-c");
            } else {
                info!("got SIGINT, terminating");
            }

            cancel.cancel();
        }
    });

    let result = dispatcher.run(cancel).await;
    dispatcher.into_transport().close().await;

    let stats = result?;
    info!(ticks = stats.ticks, sent = stats.sent, "exiting");

    Ok(())
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    cli::install_tracing(opts.verbose)?;

    // Create tokio runtime
    let thd_count = match num_cpus::get() {
        1 => 2,
        other => other.min(4),
    };

    let rt = Builder::new_multi_thread()
        .worker_threads(thd_count)
        .enable_all()
        .build()?;
    rt.block_on(run(opts))
}
