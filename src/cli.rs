//! Helpers shared by the command line tools

use regex::Regex;

use crate::{
    discovery::{Discovery, DiscoveryError},
    models,
};

lazy_static::lazy_static! {
    static ref PEER_SEPARATOR: Regex = Regex::new("[, ]+").unwrap();
}

/// Split a list of peers separated by commas and/or spaces
pub fn split_peers(list: &str) -> Vec<String> {
    PEER_SEPARATOR
        .split(list.trim())
        .filter(|peer| !peer.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Run discovery if neither UDP peers nor an MQTT broker are configured
///
/// The stdout sink alone is a valid output, so discovery is skipped when it is enabled.
///
/// Returns the number of discovered controllers, or `None` if discovery was not needed.
pub async fn discover_if_empty(output: &mut models::Output) -> Result<Option<usize>, DiscoveryError> {
    if !output.is_empty() || output.stdout {
        return Ok(None);
    }

    info!("discovering gamelights controllers...");
    let found = Discovery::new(output.discovery_timeout()).discover().await?;

    info!(
        count = found.len(),
        controllers = %found.iter().map(|ip| ip.to_string()).collect::<Vec<_>>().join(", "),
        "discovered controllers"
    );

    output.udp_peers = found.iter().map(|ip| ip.to_string()).collect();
    Ok(Some(found.len()))
}

/// Filter used when `GAMELIGHTS_LOG` is not set
///
/// The stdout sink always logs at info level, so enabling it is enough to see colors.
fn default_filter(verbose: u32) -> tracing_subscriber::EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::EnvFilter::new(format!(
        "gamelights={level},gamelightsd={level},gamelights_send={level},gamelights::methods::stdout={sink}",
        level = level,
        sink = if verbose == 0 { "info" } else { level },
    ))
}

/// Install the tracing subscriber
///
/// The `GAMELIGHTS_LOG` environment variable takes precedence over the verbosity level.
pub fn install_tracing(verbose: u32) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let fmt_layer = fmt::layer();

    let filter_layer =
        EnvFilter::try_from_env("GAMELIGHTS_LOG").unwrap_or_else(|_| default_filter(verbose));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()
}
