use anyhow::Context;
use feq::domain::config::{ApiConfig, LoggingConfig};
use feq::kernel::config::load_config;
use feq_logger::Logger;
use feq_server::Server;

fn init_logger(cfg: &LoggingConfig) -> anyhow::Result<Logger> {
    let builder = Logger::builder()
        .service(env!("CARGO_PKG_NAME"))
        .level_name(&cfg.level)
        .directives(cfg.filter.clone().unwrap_or_default())
        .console(cfg.console);

    let logger = match &cfg.directory {
        Some(directory) => builder.directory(directory).json(cfg.json).init(),
        None => builder.init(),
    };
    logger.context("Critical: Logger could not be installed")
}

#[feq_runtime::main(server)]
async fn main() -> anyhow::Result<()> {
    let cfg: ApiConfig =
        load_config(None::<&str>).context("Critical: Configuration is malformed")?;
    let _log = init_logger(&cfg.logging)?;

    Server::builder().config(cfg).build()?.run().await
}
