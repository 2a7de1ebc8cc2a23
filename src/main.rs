use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use leshan_rest::config::Config;
use leshan_rest::topology::{CachedSource, TopologySource, XmlModelSource};
use leshan_rest::{Client, Query, Server};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Read and write LWM2M resources on a Leshan server by name
#[derive(Parser, Debug)]
#[command(name = "leshan-rest", version, about, long_about = None)]
struct Args {
    /// Leshan server URL, e.g. http://localhost:8080
    #[arg(short, long)]
    server: Option<String>,

    /// Request timeout in seconds
    #[arg(short, long)]
    timeout: Option<f64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Remember --server in the config file
    #[arg(long, requires = "server")]
    save_server: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

/// How to obtain the client's topology
#[derive(ClapArgs, Debug)]
struct TopologyArgs {
    /// Folder of XML object definitions (skips server discovery)
    #[arg(long)]
    models: Option<PathBuf>,

    /// Rediscover even if a cached topology exists
    #[arg(long)]
    refresh: bool,

    /// Topology cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

/// Resource selection shared by every verb
#[derive(ClapArgs, Debug)]
struct Target {
    /// Registered client endpoint name
    endpoint: String,
    /// Resource name (case-insensitive)
    resource: String,
    /// Object name, or an instance id
    object: Option<String>,
    /// Instance id
    instance: Option<String>,
    #[command(flatten)]
    topology: TopologyArgs,
}

impl Target {
    fn query(&self) -> Query {
        Query {
            resource: self.resource.clone(),
            object: self.object.clone(),
            instance: self.instance.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered client endpoints
    Clients,
    /// Print the discovered topology of a client as JSON
    Topology {
        endpoint: String,
        #[command(flatten)]
        topology: TopologyArgs,
    },
    /// Read a resource value
    Read(Target),
    /// Write a value (JSON, or plain text) to a resource
    Write {
        value: String,
        #[command(flatten)]
        target: Target,
    },
    /// Observe a resource
    Observe(Target),
    /// Discover a resource's attributes
    Discover(Target),
    /// Execute a resource
    Execute(Target),
    /// Delete a resource
    Delete(Target),
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("leshan-rest started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("leshan-rest").join("leshan-rest.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".leshan-rest").join("leshan-rest.log");
    }
    PathBuf::from("leshan-rest.log")
}

/// Values given on the command line are JSON when they parse, text otherwise
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Build the topology source: model folder or server discovery, always cached
fn topology_source(
    config: &Config,
    server: &Server,
    args: &TopologyArgs,
    timeout: Duration,
) -> Box<dyn TopologySource> {
    let cache_dir = config.effective_cache_dir(args.cache_dir.as_deref());
    match config.effective_models_dir(args.models.as_deref()) {
        Some(models) => Box::new(CachedSource::new(XmlModelSource::new(models), cache_dir)),
        None => Box::new(CachedSource::new(server.api_source(timeout), cache_dir)),
    }
}

async fn connect(
    config: &Config,
    server: &Server,
    endpoint: &str,
    args: &TopologyArgs,
    timeout: Duration,
) -> Result<Client> {
    let source = topology_source(config, server, args, timeout);
    server
        .connect(endpoint, &*source, args.refresh)
        .await
        .with_context(|| format!("Failed to load topology for client '{}'", endpoint))
}

async fn run(args: Args, mut config: Config) -> Result<()> {
    let server_url = config
        .effective_server(args.server.as_deref())
        .context("No Leshan server configured. Use --server or set server_url in the config file")?;
    let timeout = config.effective_timeout(args.timeout);
    let server = Server::new(&server_url)?;

    if args.save_server {
        let path = Config::config_path().context("No config directory available")?;
        config
            .set_server(server.url(), &path)
            .with_context(|| format!("Failed to save config to {:?}", path))?;
        tracing::info!("Saved server {} to {:?}", server.url(), path);
    }

    tracing::info!("Using server: {}, timeout: {:?}", server.url(), timeout);

    match args.command {
        Command::Clients => {
            for endpoint in server.clients(timeout).await? {
                println!("{}", endpoint);
            }
        }
        Command::Topology { endpoint, topology } => {
            let client = connect(&config, &server, &endpoint, &topology, timeout).await?;
            println!("{}", client.topology().to_pretty_json());
        }
        Command::Read(target) => {
            let client = connect(&config, &server, &target.endpoint, &target.topology, timeout).await?;
            let value = client.read(target.query(), timeout).await?;
            println!("{}", value);
        }
        Command::Write { value, target } => {
            let client = connect(&config, &server, &target.endpoint, &target.topology, timeout).await?;
            client.write(target.query(), parse_value(&value), timeout).await?;
        }
        Command::Observe(target) => {
            let client = connect(&config, &server, &target.endpoint, &target.topology, timeout).await?;
            client.observe(target.query(), timeout).await?;
        }
        Command::Discover(target) => {
            let client = connect(&config, &server, &target.endpoint, &target.topology, timeout).await?;
            client.discover(target.query(), timeout).await?;
        }
        Command::Execute(target) => {
            let client = connect(&config, &server, &target.endpoint, &target.topology, timeout).await?;
            client.execute(target.query(), timeout).await?;
        }
        Command::Delete(target) => {
            let client = connect(&config, &server, &target.endpoint, &target.topology, timeout).await?;
            client.delete(target.query(), timeout).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let config = Config::load();
    run(args, config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_prefers_json() {
        assert_eq!(parse_value("21.5"), serde_json::json!(21.5));
        assert_eq!(parse_value("true"), serde_json::json!(true));
        assert_eq!(parse_value("hello world"), serde_json::json!("hello world"));
    }

    #[test]
    fn test_positional_object_and_instance() {
        let args = Args::parse_from(["leshan-rest", "read", "sensor-1", "Value", "Temp", "0"]);
        let Command::Read(target) = args.command else {
            panic!("expected read");
        };
        assert_eq!(target.query(), Query::new("Value").object("Temp").instance(0));
    }

    #[test]
    fn test_save_server_requires_server() {
        let args = Args::parse_from([
            "leshan-rest",
            "--server",
            "http://localhost:8080",
            "--save-server",
            "clients",
        ]);
        assert!(args.save_server);
        assert!(Args::try_parse_from(["leshan-rest", "--save-server", "clients"]).is_err());
    }

    #[test]
    fn test_write_takes_value_first() {
        let args = Args::parse_from(["leshan-rest", "write", "42", "sensor-1", "Value", "--refresh"]);
        let Command::Write { value, target } = args.command else {
            panic!("expected write");
        };
        assert_eq!(value, "42");
        assert_eq!(target.endpoint, "sensor-1");
        assert!(target.topology.refresh);
    }
}
