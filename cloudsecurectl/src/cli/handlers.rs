//! Command execution handlers
//!
//! Handlers return the rendered output instead of printing it, so nothing
//! reaches stdout unless the whole command succeeded.

use anyhow::{Context, Result};
use cloudsecure_core::api::{ImportOutcome, ImportStatus, IpListRecord, ServiceRecord};
use cloudsecure_core::credentials::resolve_with_file;
use cloudsecure_core::{
    default_config_path, exitcode, CloudSecureError, ConfigFile, ConfigurationError,
    CredentialOverrides, OutputFormat, OutputSpec,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::client::SessionClient;
use crate::config::CliConfig;
use crate::format::{format, format_success, format_titled, to_values};
use crate::gateways::resources::parse_clouds;
use crate::gateways::{
    load_entries, ApplicationGateway, IpListGateway, Listing, OnboardingGateway, ResourceGateway,
    ResourceQuery, ServiceGateway,
};

use super::commands::*;

/// Run a parsed command line and return what should be printed.
pub async fn run(cli: Cli) -> Result<String> {
    if let Commands::Completion { shell } = cli.command {
        return generate_completion(shell);
    }

    let config_file = if cli.no_config {
        None
    } else {
        ConfigFile::discover(cli.config.as_deref())?
    };
    let config = build_config(&cli, config_file.as_ref())?;
    debug!(?config, "resolved CLI configuration");

    let spec = config.output_spec();
    let connect = || -> Result<SessionClient> {
        let overrides = CredentialOverrides::from(&cli.credentials);
        let bundle = resolve_with_file(&overrides, config_file.as_ref(), |name| {
            std::env::var(name).ok()
        })?;
        debug!(?bundle, "resolved credentials");
        Ok(SessionClient::from_config(bundle, &config)?)
    };

    match cli.command {
        Commands::Completion { shell } => generate_completion(shell),
        Commands::Config { command } => {
            handle_config(command, &config, cli.config.as_deref(), cli.no_config)
        }
        Commands::Check => handle_check(&connect()?).await,
        Commands::Iplists { command } => handle_iplists(&connect()?, command, &spec).await,
        Commands::Applications { command } => {
            handle_applications(&connect()?, command, &spec).await
        }
        Commands::Resources { command } => handle_resources(&connect()?, command, &spec).await,
        Commands::Services { command } => handle_services(&connect()?, command, &spec).await,
        Commands::Onboarding { command } => {
            handle_onboarding(&connect()?, command, &spec).await
        }
    }
}

/// Defaults, then the config file, then command-line flags
pub fn build_config(cli: &Cli, config_file: Option<&ConfigFile>) -> Result<CliConfig> {
    let mut builder = CliConfig::builder().with_verbose(cli.verbose);
    if let Some(format) = cli.output {
        builder = builder.with_output_format(format.into());
    }
    if cli.pretty {
        builder = builder.with_pretty(true);
    }
    // a bad flag value is a usage error, not a configuration error
    let usage = |e: ConfigurationError| CloudSecureError::invalid_parameter(e.to_string());
    if let Some(timeout) = cli.timeout {
        builder = builder.with_timeout(timeout).map_err(usage)?;
    }
    if let Some(retries) = cli.max_retries {
        builder = builder.with_max_retries(retries).map_err(usage)?;
    }
    if let Some(url) = &cli.token_url {
        builder = builder.with_token_url(url.as_str()).map_err(usage)?;
    }

    Ok(builder.with_config_file(config_file)?.build()?)
}

/// Exit code for an error returned by [`run`]
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<CloudSecureError>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<ConfigurationError>().is_some() {
            return exitcode::CONFIG;
        }
    }
    exitcode::FAILURE
}

fn render<T: Serialize>(listing: &Listing<T>, spec: &OutputSpec) -> Result<String> {
    let records = to_values(&listing.records)?;
    format_titled(&records, spec, listing.label.as_deref())
}

fn render_outcomes(outcomes: &[ImportOutcome], spec: &OutputSpec) -> Result<String> {
    let table = format(&to_values(outcomes)?, spec)?;
    if spec.format != OutputFormat::Table {
        return Ok(table);
    }

    let created = outcomes
        .iter()
        .filter(|o| o.status == ImportStatus::Created)
        .count();
    let summary = format_success(&format!("Created {} of {} entries", created, outcomes.len()));
    Ok(if table.is_empty() {
        summary
    } else {
        format!("{}\n{}", table, summary)
    })
}

/// Handle check command
pub async fn handle_check(session: &SessionClient) -> Result<String> {
    session
        .check()
        .await
        .context("connection check failed")?;
    Ok(format_success(&format!(
        "Connection to {} successful",
        session.bundle().api_url()
    )))
}

/// Handle IP list commands
pub async fn handle_iplists(
    session: &SessionClient,
    command: IpListCommands,
    spec: &OutputSpec,
) -> Result<String> {
    let gateway = IpListGateway::new(session);
    match command {
        IpListCommands::List => render(&gateway.list().await?, spec),
        IpListCommands::Import { input_file } => {
            let entries: Vec<IpListRecord> = load_entries(&input_file)?;
            let outcomes = gateway.import(entries).await?;
            render_outcomes(&outcomes, spec)
        }
    }
}

/// Handle application commands
pub async fn handle_applications(
    session: &SessionClient,
    command: ApplicationCommands,
    spec: &OutputSpec,
) -> Result<String> {
    match command {
        ApplicationCommands::List => render(&ApplicationGateway::new(session).list().await?, spec),
    }
}

/// Handle resource commands
pub async fn handle_resources(
    session: &SessionClient,
    command: ResourceCommands,
    spec: &OutputSpec,
) -> Result<String> {
    let gateway = ResourceGateway::new(session);
    match command {
        ResourceCommands::List {
            limit,
            clouds,
            object_types,
            account_ids,
        } => {
            let query = ResourceQuery::parse(
                limit,
                clouds.as_deref(),
                object_types.as_deref(),
                account_ids.as_deref(),
            )?;
            render(&gateway.list(&query).await?, spec)
        }
        ResourceCommands::Objecttypes { clouds } => {
            let clouds = parse_clouds(clouds.as_deref())?;
            render(&gateway.object_types(&clouds).await?, spec)
        }
    }
}

/// Handle service commands
pub async fn handle_services(
    session: &SessionClient,
    command: ServiceCommands,
    spec: &OutputSpec,
) -> Result<String> {
    let gateway = ServiceGateway::new(session);
    match command {
        ServiceCommands::List => render(&gateway.list().await?, spec),
        ServiceCommands::Import { input_file } => {
            let entries: Vec<ServiceRecord> = load_entries(&input_file)?;
            let outcomes = gateway.import(entries).await?;
            render_outcomes(&outcomes, spec)
        }
    }
}

/// Handle onboarding commands
pub async fn handle_onboarding(
    session: &SessionClient,
    command: OnboardingCommands,
    spec: &OutputSpec,
) -> Result<String> {
    let gateway = OnboardingGateway::new(session);
    let (result, message) = match command {
        OnboardingCommands::AzureOnboardStorageAccount {
            subscription_id,
            storage_account,
        } => {
            let result = gateway
                .azure_storage_account(&subscription_id, &storage_account)
                .await?;
            let message = format!(
                "Onboarded storage account {} on subscription {}",
                storage_account.trim(),
                subscription_id.trim()
            );
            (result, message)
        }
        OnboardingCommands::AwsOnboardS3Bucket { account_id, arns } => {
            let result = gateway.aws_s3_bucket(&account_id, &arns).await?;
            let message = format!(
                "Onboarded {} S3 bucket(s) on account {}",
                result.destinations.len(),
                account_id.trim()
            );
            (result, message)
        }
    };

    match spec.format {
        OutputFormat::Table => Ok(format_success(&message)),
        _ => format(&to_values(&[result])?, spec),
    }
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    config: &CliConfig,
    explicit_path: Option<&std::path::Path>,
    no_config: bool,
) -> Result<String> {
    match command {
        ConfigCommands::Show => {
            let config_file = if no_config {
                None
            } else {
                explicit_path
                    .map(std::path::Path::to_path_buf)
                    .or_else(|| default_config_path().filter(|p| p.exists()))
            };

            let spec = config.output_spec();
            if spec.format == OutputFormat::Json {
                let mut value = serde_json::to_value(config)?;
                value["config_file"] = json!(config_file);
                return Ok(if spec.pretty {
                    serde_json::to_string_pretty(&value)?
                } else {
                    serde_json::to_string(&value)?
                });
            }

            let setting = |name: &str, value: String| json!({"setting": name, "value": value});
            let rows = vec![
                setting(
                    "config_file",
                    config_file
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none)".to_string()),
                ),
                setting(
                    "auth",
                    config
                        .token_url
                        .clone()
                        .map(|url| format!("token exchange ({})", url))
                        .unwrap_or_else(|| "basic".to_string()),
                ),
                setting("api_version", config.api_version.clone()),
                setting("timeout", format!("{}s", config.timeout)),
                setting("max_retries", config.max_retries.to_string()),
                setting("retry_delay", format!("{}ms", config.retry_delay_ms)),
                setting("output", format!("{:?}", config.output_format).to_lowercase()),
                setting("pretty", config.pretty.to_string()),
                setting("verbose", config.verbose.to_string()),
            ];
            format_titled(&rows, &spec, Some("CLI Configuration"))
        }
    }
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) -> Result<String> {
    use clap::CommandFactory;
    use clap_complete::generate;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    let mut buffer = Vec::new();
    generate(shell, &mut cmd, bin_name, &mut buffer);
    String::from_utf8(buffer).context("completion script is not valid UTF-8")
}
