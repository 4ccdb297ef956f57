use github_explorer_mcp::{cli, config::Config, server};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let matches = cli::build_cli().get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();

    cli::init_logging(log_level.as_deref());

    if matches.get_flag("version") {
        println!("github-explorer-mcp {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::from_env()?;
    if cfg.token.is_none() {
        log::warn!("No GITHUB_TOKEN set; using unauthenticated requests (low rate limit)");
    }
    log::info!("GitHub API base: {}", cfg.api_url);
    server::run_stdio_server(cfg).await
}
