use clap::Parser;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "In-memory key-value store over HTTP", long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<String>,

    /// Port to listen on, overrides the PORT environment variable
    #[arg(long)]
    pub port: Option<u16>,

    /// Log level, overrides the configuration file
    #[arg(long)]
    pub log_level: Option<String>,
}
