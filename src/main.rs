use anyhow::Context;
use pathguard::{config::Config, guard::{PathGuard, TrustedRoot}, logging, server};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = PathBuf::from("pathguard.toml");
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = PathBuf::from(&args[i]);
            }
            _ => {}
        }
        i += 1;
    }

    let cfg = Config::load(&config_path).context("loading config")?;
    cfg.validate().context("validating config")?;
    logging::init(cfg.logging.format);

    let root = TrustedRoot::create(&cfg.root.root_dir).context("preparing root")?;
    let guard = PathGuard::new(root).with_max_input_len(cfg.limits.max_input_len);

    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    info!(addr = %addr, root = %guard.root().as_path().display(), "pathguard ready");

    server::serve(cfg, guard).await
}
