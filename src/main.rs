// CLI entry point for the session relay.
//
// Starts a standalone relay server that game clients connect to. The relay
// assigns identities and routes frames; it never interprets game state.
//
// Usage:
//   relay [OPTIONS]
//     --addr <HOST:PORT>   Listen address (default: 127.0.0.1:12345)
//     --config <FILE>      Load a TOML configuration file
//     --log-level <LEVEL>  Log level filter (default: info)

use session_relay::config::RelayConfig;
use session_relay::service::server::start_server;
use session_relay::utils::logging;

#[tokio::main]
async fn main() {
    let config = parse_args();

    logging::init(&config.logging);

    if let Err(e) = config.validate_strict() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    if let Err(e) = start_server(&config).await {
        eprintln!("Relay server failed: {e}");
        std::process::exit(1);
    }
}

/// Parse command-line arguments into a `RelayConfig`. Uses simple
/// `std::env::args()` matching.
fn parse_args() -> RelayConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config: Option<RelayConfig> = None;
    let mut addr: Option<String> = None;
    let mut log_level: Option<String> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let path = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    std::process::exit(1);
                });
                config = Some(RelayConfig::from_file(&path).unwrap_or_else(|e| {
                    eprintln!("{e}");
                    std::process::exit(1);
                }));
            }
            "--addr" => {
                i += 1;
                addr = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--addr requires a host:port value");
                    std::process::exit(1);
                }));
            }
            "--log-level" => {
                i += 1;
                log_level = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--log-level requires a value");
                    std::process::exit(1);
                }));
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    // Flags override the file; the environment fills the gaps when no file
    // was given.
    let mut config = match config {
        Some(config) => config,
        None => RelayConfig::from_env().unwrap_or_default(),
    };
    if let Some(addr) = addr {
        config.server.address = addr;
    }
    if let Some(level) = log_level {
        config.logging.level = level;
    }

    config
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --addr <HOST:PORT>   Listen address (default: 127.0.0.1:12345)");
    println!("  --config <FILE>      Load a TOML configuration file");
    println!("  --log-level <LEVEL>  Log level filter (default: info)");
    println!("  --help, -h           Show this help");
}
