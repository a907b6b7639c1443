//! CLI surface: config file path plus the handful of bind/runtime overrides
//! spec.md §6 lists, matching `gproxy-core::bootstrap::CliArgs`'s
//! CLI>ENV precedence (minus the DB/admin-key tiers, which this gateway
//! doesn't have).

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "routecodexd", version, about = "Multi-protocol LLM request gateway")]
pub struct CliArgs {
    /// Path to the TOML document describing routes and provider profiles.
    #[arg(long, env = "ROUTECODEX_CONFIG", default_value = "routecodex.toml")]
    pub config: String,

    /// Bind host.
    #[arg(long, env = "ROUTECODEX_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Bind port.
    #[arg(long, env = "ROUTECODEX_PORT", default_value_t = 8080)]
    pub port: u16,
}
