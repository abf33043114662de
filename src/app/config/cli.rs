use super::{DEFAULT_COLLECTOR_BASE, Options, Route};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Routing token appended to the collector base URL
    #[arg(env = "RASK_ROUTE_ADDRESS")]
    pub address: String,

    /// Adapter option as KEY=VALUE, e.g. `-o http.buffer.capacity=500` (repeatable)
    #[arg(short = 'o', long = "option", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Collector base URL
    #[arg(long, env = "RASK_COLLECTOR_BASE", default_value = DEFAULT_COLLECTOR_BASE)]
    pub collector_base: String,

    /// Number of inbound records that may queue ahead of the batch buffer
    #[arg(long, env = "RASK_INGEST_QUEUE", default_value = "10000")]
    pub ingest_queue: usize,
}

impl Cli {
    pub fn route(&self) -> Route {
        Route {
            address: self.address.clone(),
            options: self.options.iter().cloned().collect::<Options>(),
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
