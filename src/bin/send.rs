//! `gamelights-send` sends a single color to the LED controllers.
//!
//! If neither UDP peers nor an MQTT broker are given, controllers are discovered on the
//! local network first.

#[macro_use]
extern crate tracing;

use std::time::Duration;

use structopt::StructOpt;

use gamelights::{cli, color, methods, models, transport::Transport};

#[derive(Debug, StructOpt)]
#[structopt(about = "Send some colors")]
struct Opts {
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u32,
    /// The hex color to send
    color: String,
    /// The MQTT server hostname
    #[structopt(short, long = "mqtt-hostname")]
    mqtt_hostname: Option<String>,
    /// The list of UDP IPs to send to
    #[structopt(short, long = "udp-ips")]
    udp_ips: Option<String>,
    /// How long to wait for controllers to answer discovery, in milliseconds
    #[structopt(long, default_value = "2000")]
    discovery_timeout: u64,
}

async fn run(opts: Opts) -> color_eyre::eyre::Result<()> {
    let color = color::parse_hex(&opts.color)?;

    let mut output = models::Output {
        udp_peers: opts
            .udp_ips
            .as_deref()
            .map(cli::split_peers)
            .unwrap_or_default(),
        mqtt_hostname: opts.mqtt_hostname.clone(),
        discovery_timeout_ms: opts.discovery_timeout,
        ..Default::default()
    };

    if cli::discover_if_empty(&mut output).await? == Some(0) {
        error!("no gamelights controllers found");
        std::process::exit(1);
    }

    let mut transport = Transport::from_config(&output, Duration::from_secs(1)).await?;
    let report = transport.send(color).await;
    info!(
        delivered = report.delivered,
        failed = report.failed,
        payload = %methods::format_payload(color),
        "sent"
    );

    transport.close().await;

    Ok(())
}

#[paw::main]
fn main(opts: Opts) -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    cli::install_tracing(opts.verbose)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(opts))
}
