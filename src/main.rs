mod cli;
mod config;
mod logging;

use cli::Args;
use owo_colors::OwoColorize;
use sbom_enricher::adapters::outbound::codecs::JsonSbomCodec;
use sbom_enricher::adapters::outbound::console::StderrProgressReporter;
use sbom_enricher::adapters::outbound::filesystem::{
    FileSystemReader, FileSystemWriter, StdoutPresenter,
};
use sbom_enricher::application::dto::{EnrichRequest, EnrichResponse};
use sbom_enricher::application::factories::SourceFactory;
use sbom_enricher::application::use_cases::EnrichSbomUseCase;
use sbom_enricher::ports::outbound::{OutputPresenter, SbomInput};
use sbom_enricher::shared::error::ExitCode;
use sbom_enricher::shared::security::validate_output_path;
use sbom_enricher::shared::Result;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn main() {
    process::exit(run().as_i32());
}

fn run() -> ExitCode {
    let args = match Args::try_parse_args() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version go to stdout and are not failures
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::InvalidArguments
            } else {
                ExitCode::Success
            };
        }
    };

    logging::init_logging(args.log_level, args.log_format);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            report_error(&anyhow::Error::new(e).context("Failed to start async runtime"));
            return ExitCode::ApplicationError;
        }
    };

    match runtime.block_on(enrich(args)) {
        Ok(code) => code,
        Err(e) => {
            report_error(&e);
            ExitCode::ApplicationError
        }
    }
}

async fn enrich(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => config::load_config_from_path(Path::new(path))?,
        None => match config::discover_config(Path::new("."))? {
            Some(config) => {
                eprintln!("📋 Auto-discovered config file: {}", config::CONFIG_FILENAME);
                config
            }
            None => config::ConfigFile::default(),
        },
    };

    let mut settings = config.source_settings(std::env::var(config::SNYK_ORG_ENV).ok());
    if let Some(concurrency) = args.concurrency {
        config::validate_concurrency(concurrency)?;
        settings.concurrency = concurrency;
    }

    // Fail before any network work when the output cannot be written
    if let Some(output) = &args.output {
        validate_output_path(Path::new(output))?;
    }

    let cancel = create_shutdown_token(args.deadline_secs.map(Duration::from_secs));

    let sources = args.unique_sources();
    let stages = SourceFactory::new(settings, cancel.clone()).create_stages(&sources)?;
    info!(sources = ?sources, "starting enrichment");

    let use_case = EnrichSbomUseCase::new(
        FileSystemReader::new(),
        JsonSbomCodec::new(),
        StderrProgressReporter::new(),
        stages,
    );

    let request = EnrichRequest::new(SbomInput::from_arg(&args.input));
    let response = use_case.execute(request, &cancel).await?;

    let presenter: Box<dyn OutputPresenter> = match &args.output {
        Some(output) => Box::new(FileSystemWriter::new(PathBuf::from(output))),
        None => Box::new(StdoutPresenter::new()),
    };
    presenter.present(&response.content)?;

    print_summary(&response);

    Ok(if response.cancelled {
        ExitCode::Cancelled
    } else {
        ExitCode::Success
    })
}

/// Create a `CancellationToken` that fires on SIGINT, SIGTERM or once the
/// optional deadline passes.
fn create_shutdown_token(deadline: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let deadline_elapsed = async {
            match deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = shutdown_signal() => warn!("shutdown signal received, finishing with partial results"),
            () = deadline_elapsed => warn!("deadline reached, finishing with partial results"),
        }
        token_clone.cancel();
    });

    token
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn print_summary(response: &EnrichResponse) {
    for report in &response.reports {
        let line = report.summary();
        if report.cancelled || !report.failures.is_empty() {
            eprintln!("{}", line.yellow());
        } else {
            eprintln!("{}", line.green());
        }
    }

    if response.cancelled {
        eprintln!(
            "{}",
            "⚠️  Run cancelled: the document was written with the enrichment gathered so far"
                .yellow()
        );
    }
}

fn report_error(e: &anyhow::Error) {
    eprintln!("\n{}\n", "❌ An error occurred:".red());
    eprintln!("{}", e);

    // Display error chain
    for cause in e.chain().skip(1) {
        eprintln!("\nCaused by: {}", cause);
    }

    eprintln!();
}
