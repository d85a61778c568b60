// crates/cli/src/main.rs
mod args;
mod output;
mod progress;
mod workflow;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ssa_report_core::config::{ENV_API_HOST, ENV_API_TOKEN};
use ssa_report_core::{ApiConfig, DatasetSelection, FailureReporter, ReportRequest, TracingReporter};
use ssa_report_observability::SentryReporter;

use crate::args::{Cli, Command};
use crate::output::{describe_error, upload_summary_text, warnings_text};
use crate::workflow::{exclude, ReportClient, ReportResult, RunOptions};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Install the rustls crypto provider before any TLS connections.
    // reqwest and sentry pull in different providers; rustls 0.23 refuses to
    // pick one on its own.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    if let Err(e) = ssa_report_observability::init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    // --api-host / --api-token win over the environment (clap already
    // folded the env vars into them).
    let config = ApiConfig::from_lookup(|key| {
        let flag = match key {
            ENV_API_HOST => cli.api_host.clone(),
            ENV_API_TOKEN => cli.api_token.clone(),
            _ => None,
        };
        flag.or_else(|| std::env::var(key).ok())
    })?;

    let _sentry = ssa_report_observability::init_sentry(&config);
    let reporter: Arc<dyn FailureReporter> = if config.sentry_dsn.is_some() {
        Arc::new(SentryReporter::new())
    } else {
        Arc::new(TracingReporter)
    };

    let command_name = command_name(&cli.command);
    let contact_email = config.contact_email.clone();
    let client = ReportClient::new(config, reporter);

    match execute(&client, cli.command).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            let display = describe_error(&err, contact_email.as_deref());
            if display.capture {
                ssa_report_observability::capture_error(command_name, &format!("{err:#}"));
            }
            tracing::debug!(error = ?err, "Command failed");
            eprintln!("{}", display.text);
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn execute(client: &ReportClient, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Upload { file, name } => {
            let summary = client.upload(&file, name).await?;
            print!("{}", upload_summary_text(&summary));
        }
        Command::Report {
            uuid,
            datasets,
            exclude: excluded,
            field,
            name,
            output,
        } => {
            let mut selection = DatasetSelection::from_ids(datasets);
            exclude(&mut selection, &excluded)?;
            let request = ReportRequest::new(uuid, selection)?
                .with_field(field)
                .with_name(name.clone());
            let report = client.report(request).await?;
            save(client, &report, name.as_deref(), output.as_deref()).await?;
        }
        Command::Summary { unit, id, output } => {
            let report = client.summary(unit, &id).await?;
            save(client, &report, None, output.as_deref()).await?;
        }
        Command::Run {
            file,
            field,
            datasets,
            exclude,
            name,
            output,
        } => {
            let (path, warnings) = client
                .run(RunOptions {
                    file,
                    field,
                    datasets,
                    exclude,
                    name,
                    output,
                })
                .await?;
            print_warnings(&warnings);
            println!("Saved {}", path.display());
        }
        Command::Download {
            result,
            name,
            output,
        } => {
            let path = client
                .download(&result, name.as_deref(), output.as_deref())
                .await?;
            println!("Saved {}", path.display());
        }
    }
    Ok(())
}

async fn save(
    client: &ReportClient,
    report: &ReportResult,
    name: Option<&str>,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    print_warnings(&report.warnings);
    let path = client.download(&report.result, name, output).await?;
    println!("Saved {}", path.display());
    Ok(())
}

fn print_warnings(warnings: &[String]) {
    if let Some(text) = warnings_text(warnings) {
        eprint!("{text}");
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Upload { .. } => "upload",
        Command::Report { .. } => "report",
        Command::Summary { .. } => "summary",
        Command::Run { .. } => "run",
        Command::Download { .. } => "download",
    }
}
