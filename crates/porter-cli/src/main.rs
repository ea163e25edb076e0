//! `porter` binary

use porter_cli::{command, exit, exit_code, parse, render_failure, render_outcome, CliCommand, LogFormat};
use porter_core::{MigrationEngine, RepositoryRegistry};
use std::path::Path;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool, format: LogFormat) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("logging already initialized: {e}");
    }
}

fn code(value: i32) -> ExitCode {
    ExitCode::from(u8::try_from(value).unwrap_or(1))
}

async fn load_registry(path: &Path) -> Result<RepositoryRegistry, i32> {
    RepositoryRegistry::load(path).await.map_err(|e| {
        eprintln!("error: {e}");
        exit_code(&e)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = match command().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { code(exit::USAGE) } else { code(exit::SUCCESS) };
        }
    };
    let cli = match parse(&matches) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {e:#}");
            return code(exit::USAGE);
        }
    };
    init_logging(cli.verbose(), cli.log_format());

    match cli {
        CliCommand::Repositories { config } => {
            let registry = match load_registry(&config).await {
                Ok(registry) => registry,
                Err(status) => return code(status),
            };
            for id in registry.ids() {
                if let Ok(repo) = registry.get(id) {
                    println!("{id}\t{}\t{}", repo.domain, repo.path.display());
                }
            }
            code(exit::SUCCESS)
        }
        CliCommand::Migrate { request, config, .. } => {
            let registry = match load_registry(&config).await {
                Ok(registry) => registry,
                Err(status) => return code(status),
            };
            let engine = MigrationEngine::load(registry).await;

            let cancel = engine.cancel_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping at the next checkpoint");
                    cancel.cancel();
                }
            });

            info!(config = %config.display(), "configuration loaded");
            match engine.run(request).await {
                Ok(outcome) => {
                    print!("{}", render_outcome(&outcome));
                    code(exit::SUCCESS)
                }
                Err(failure) => {
                    eprint!("{}", render_failure(&failure));
                    code(exit_code(&failure.error))
                }
            }
        }
    }
}
