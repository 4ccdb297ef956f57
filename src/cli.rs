use clap::{Arg, ArgAction, Command};

pub fn build_cli() -> Command {
    Command::new("github-explorer-mcp")
        .about("Read-only GitHub exploration tools over MCP (stdio JSON-RPC)")
        .disable_version_flag(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Log filter (e.g., info, debug, github_explorer_mcp=trace); overrides RUST_LOG"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
}

/// Logs go to stderr; stdout carries protocol frames only.
pub fn init_logging(level: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filters) = level {
        builder.parse_filters(filters);
    }
    builder.target(env_logger::Target::Stderr);
    // A second init (e.g. from tests) is harmless.
    let _ = builder.try_init();
}
