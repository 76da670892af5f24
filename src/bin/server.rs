use anyhow::Context;
use sqlair::server::{Server, ServerConfig};
use std::env;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!(
        "Usage: sqlair-server [--config <file>] [--host <addr>] [--port <port>] \
         [--max-connections <n>] [--root <dir>] [--read-timeout <secs>]"
    );
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();

    // A config file provides the base; flags override it
    let mut config = match flag_value(&args, &["--config", "-c"]) {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path))?,
        None => ServerConfig::new(),
    };

    let mut i = 0;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config" | "-c", Some(_)) => {}
            ("--host", Some(host)) => config = config.host(host.as_str()),
            ("--port" | "-p", Some(port)) => {
                config = config.port(port.parse().context("invalid --port")?);
            }
            ("--max-connections" | "-m", Some(max)) => {
                config = config.max_connections(max.parse().context("invalid --max-connections")?);
            }
            ("--root", Some(root)) => config = config.document_root(root.as_str()),
            ("--read-timeout", Some(secs)) => {
                config = config.read_timeout_secs(secs.parse().context("invalid --read-timeout")?);
            }
            ("--help" | "-h", _) => {
                print_usage();
                return Ok(());
            }
            (flag, _) => {
                print_usage();
                anyhow::bail!("unexpected argument '{}'", flag);
            }
        }
        i += 2;
    }

    let server = Server::new(config.clone());
    server
        .start()
        .with_context(|| format!("serving on {}", config.bind_address()))?;
    Ok(())
}

fn flag_value<'a>(args: &'a [String], names: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
