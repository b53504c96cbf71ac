use anyhow::{Context, Result};
use sitestack::app::{self, AppConfig};
use sitestack::aws::{AwsCli, AwsCliConfig};
use sitestack::cli::commands::{InvalidateCommand, SynthCommand, ValidateCommand};
use sitestack::cli::output::*;
use sitestack::cli::{Cli, Command};
use sitestack::trigger::InvalidationTrigger;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Synth(cmd) => synth(cmd, &cli).await?,
        Command::Validate(cmd) => validate(cmd)?,
        Command::Invalidate(cmd) => invalidate(cmd, &cli).await,
    }

    Ok(())
}

fn aws_cli(cli: &Cli, region: Option<String>) -> AwsCli {
    AwsCli::new(
        AwsCliConfig::new()
            .with_profile(cli.profile.clone())
            .with_region(region),
    )
}

async fn synth(cmd: &SynthCommand, cli: &Cli) -> Result<()> {
    let mut config = AppConfig::from_file(&cmd.file)
        .with_context(|| format!("Failed to load {}", cmd.file))?;

    println!(
        "{} Loaded {} ({})",
        INFO,
        style(&config.namespace).bold(),
        style(&config.stage).cyan()
    );

    let resolver = aws_cli(cli, Some(config.environment.region.clone()));
    app::resolve_hosted_zone(&mut config, &resolver).await?;

    let synthesis = app::synthesize(&config).context("Synthesis failed")?;
    let written = synthesis
        .assembly
        .write_to(&cmd.output)
        .with_context(|| format!("Failed to write assembly to {}", cmd.output))?;

    println!("{} Stacks:", ROCKET);
    for stack in synthesis.assembly.stacks() {
        println!("{}", format_stack(stack));
    }

    if let Some(distribution) = &synthesis.distribution {
        println!(
            "{} Distribution exported as {}",
            INFO,
            style(&distribution.distribution_id_export).dim()
        );
    }

    if !synthesis.stages.is_empty() {
        println!("{} Pipeline: {}", INFO, format_stages(&synthesis.stages));
        if let Some(strategy) = synthesis.invalidation {
            println!("  Invalidation: {}", style(strategy).cyan());
        }
    }

    if cmd.json {
        let manifest = serde_json::to_string_pretty(&synthesis.assembly.manifest())?;
        println!("\n{}", manifest);
    }

    println!(
        "\n{} Wrote {} files to {}",
        CHECK,
        style(written.len()).cyan(),
        style(&cmd.output).bold()
    );

    Ok(())
}

fn validate(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating configuration...", INFO);

    match AppConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Configuration is valid!", CHECK);
            println!("  Namespace: {}", style(&config.namespace).bold());
            println!("  Stage: {}", style(&config.stage).cyan());
            if let Some(website) = &config.website {
                println!("  Website: {}", style(website.domain_name()).cyan());
            }
            if let Some(pipeline) = &config.pipeline {
                println!(
                    "  Pipeline: {}/{}@{}",
                    pipeline.source.owner, pipeline.source.repo, pipeline.source.branch
                );
            }

            if cmd.json {
                let summary = serde_json::json!({
                    "namespace": config.namespace,
                    "stage": config.stage,
                    "environment": config.environment,
                    "website": config.website.as_ref().map(|w| w.domain_name()),
                    "pipeline": config.pipeline.as_ref().map(|p| {
                        format!("{}/{}", p.source.owner, p.source.repo)
                    }),
                });
                println!("\n{}", serde_json::to_string_pretty(&summary)?);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

/// Never fails; a stale cache is not worth a non-zero exit
async fn invalidate(cmd: &InvalidateCommand, cli: &Cli) {
    let client = aws_cli(cli, None);
    let trigger = match &cmd.distribution_id {
        Some(id) => InvalidationTrigger::new(client, Some(id.clone())),
        None => InvalidationTrigger::from_env(client),
    };

    let outcome = match &cmd.job_id {
        Some(job_id) => trigger.run_for_job(job_id).await,
        None => trigger.run().await,
    };

    println!("{}", format_outcome(&outcome));
}
