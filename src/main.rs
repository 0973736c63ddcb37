use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

mod apply;
mod cli;
mod config;
mod errors;
mod generate;
mod log;
mod preview;
mod prompt;
mod provider;
mod repair;
mod server;
mod store;
mod wire;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    log::init_tracing(args.debug);

    let cfg = config::Config::load(&args)?;
    let prov = provider::make_provider(&cfg)?;
    info!(
        provider = prov.name(),
        model = prov.model(),
        environment = ?cfg.environment,
        "starting sitegen"
    );

    let artifacts = cfg.save_responses.then(|| PathBuf::from(&cfg.artifacts_dir));
    let state = server::AppState {
        store: Arc::new(store::SiteStore::new()),
        generator: Arc::new(generate::Generator::new(prov, artifacts)),
        applicator: Arc::new(apply::RegexApplicator),
        production: cfg.is_production(),
    };

    server::serve(&cfg.bind_addr(), state, Duration::from_secs(cfg.request_timeout_secs)).await
}
