use std::process::exit;
use std::time::Duration;

use battery_bridge::VERSION;
use battery_bridge::cli::{Args, Command, Format};
use battery_bridge::clients::upower::test_client::TestService;
use battery_bridge::clients::upower::{BatteryState, Connector, UPowerConnector};
use battery_bridge::codec::{MethodCall, MethodResponse};
use battery_bridge::config::Config;
use battery_bridge::error::ExitCode;
use battery_bridge::host::Host;
use battery_bridge::logging;
use battery_bridge::plugin::{BatteryPlugin, GET_BATTERY_LEVEL};
use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use serde_json::Value;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let guard = logging::install_tracing(args.debug)?;

    info!("battery-bridge version {}", VERSION);

    let config = Config::load();

    let status = if args.simulate {
        info!("Using simulated power service");

        let service = TestService::new(100.0, BatteryState::FullyCharged);
        let _animation = service.animate(Duration::from_millis(200));

        run(&args, &config, service.connector()).await?
    } else {
        let connector = UPowerConnector::new(&config.service, &config.device_path);
        run(&args, &config, connector).await?
    };

    // flush the log file before exiting
    drop(guard);

    if let Some(code) = status {
        exit(code as i32);
    }

    Ok(())
}

/// Runs the selected command.
/// Returns the code to exit with on failure.
async fn run<C: Connector>(
    args: &Args,
    config: &Config,
    connector: C,
) -> Result<Option<ExitCode>> {
    let mut plugin = BatteryPlugin::new(connector);
    let format = args.format.unwrap_or_default();

    match args.command.unwrap_or(Command::Serve) {
        Command::Level => {
            let response = plugin
                .handle_method_call(&MethodCall::new(GET_BATTERY_LEVEL))
                .await;

            print_response(&response, format)?;

            if response.is_error() {
                return Ok(Some(ExitCode::ServiceError));
            }
        }
        Command::Watch => {
            let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

            if let Err(err) = plugin.listen(tx).await {
                let response = MethodResponse::from(err);
                print_response(&response, format)?;
                return Ok(Some(ExitCode::ServiceError));
            }

            let (stop_tx, mut stop_rx) = mpsc::unbounded_channel();
            ctrlc::set_handler(move || {
                // the receiver only goes away once we are already stopping
                let _ = stop_tx.send(());
            })
            .wrap_err("Error setting Ctrl-C handler")?;

            loop {
                tokio::select! {
                    Some(event) = rx.recv() => print_event(&event, format)?,
                    _ = stop_rx.recv() => break,
                }
            }

            info!("Shutting down");
            plugin.dispose();
        }
        Command::Serve => {
            let host = Host::new(plugin, config);

            if let Err(err) = host
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
                .await
                .wrap_err("Host transport failed")
            {
                error!("{err:?}");
                return Ok(Some(ExitCode::HostError));
            }
        }
    }

    Ok(None)
}

fn print_response(response: &MethodResponse, format: Format) -> Result<()> {
    match format {
        Format::Plain => match response {
            MethodResponse::Success { result } => println!("{result}"),
            MethodResponse::Error { code, message, .. } => {
                eprintln!("error\n{code}: {}", message.as_deref().unwrap_or_default());
            }
            MethodResponse::NotImplemented => eprintln!("not implemented"),
        },
        Format::Json => println!("{}", serde_json::to_string(response)?),
    }

    Ok(())
}

fn print_event(event: &Value, format: Format) -> Result<()> {
    match (format, event) {
        (Format::Plain, Value::String(status)) => println!("{status}"),
        _ => println!("{}", serde_json::to_string(event)?),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level_args() -> Args {
        Args::parse_from(["battery-bridge", "level"])
    }

    #[tokio::test]
    async fn level_success_exits_cleanly() {
        let service = TestService::new(64.0, BatteryState::Charging);

        let status = run(&level_args(), &Config::default(), service.connector()).await;
        assert_eq!(status.ok(), Some(None));
    }

    #[tokio::test]
    async fn level_failure_returns_exit_code() {
        let service = TestService::new(64.0, BatteryState::Charging);
        service.fail_with("org.freedesktop.DBus.Error.ServiceUnknown");

        let status = run(&level_args(), &Config::default(), service.connector()).await;
        assert_eq!(status.ok(), Some(Some(ExitCode::ServiceError)));
    }
}
