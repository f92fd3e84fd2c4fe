use clap::Parser;
use clap::builder::FalseyValueParser;

use crate::config::Overrides;

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Interactive end-to-end test runner for the media library API - per-client credentials, signed transformation URLs, and one suite at a time."
)]
pub struct HarnessArgs {
    /// Path to config file (TOML/JSON). Defaults to ./media-e2e.toml or
    /// ./media-e2e.json if present.
    #[arg(long)]
    pub config: Option<String>,

    /// Base URL of the API under test (overrides the config file)
    #[arg(long, short, env = "BASE")]
    pub base: Option<String>,

    /// Default client token and URL-signing secret (overrides the config file)
    #[arg(long, short, env = "KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Preview every request before it is sent and log at debug level
    /// (unless overridden by MEDIA_E2E_LOG/RUST_LOG). Empty, 0, n, no, f,
    /// false, and off disable it; any other value enables it.
    #[arg(
        long,
        short = 'v',
        env = "VERBOSE",
        value_parser = FalseyValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub verbose: bool,

    /// Print plain text without ANSI colors
    #[arg(long = "no-color")]
    pub no_color: bool,
}

impl HarnessArgs {
    /// Values that take precedence over the config file.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base: self.base.clone(),
            key: self.key.clone(),
            verbose: self.verbose,
        }
    }
}
