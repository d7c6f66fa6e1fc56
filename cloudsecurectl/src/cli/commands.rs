//! CLI command and subcommand definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const EXIT_CODES: &str = "\
Exit codes:
  0   success
  1   API, transport or unexpected failure
  64  invalid command-line usage or parameter
  77  credentials rejected by the API
  78  missing credentials or invalid configuration";

/// Illumio CloudSecure CLI
#[derive(Parser, Debug)]
#[command(name = "cloudsecurectl")]
#[command(version, about = "Illumio CloudSecure CLI", long_about = None)]
#[command(after_help = EXIT_CODES)]
pub struct Cli {
    /// Enable verbose logging to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Config file path (default: ~/.config/cloudsecure/cli.toml)
    #[arg(long, global = true, conflicts_with = "no_config")]
    pub config: Option<PathBuf>,

    /// Don't load config file
    #[arg(long, global = true)]
    pub no_config: bool,

    #[command(flatten)]
    pub credentials: CredentialArgs,

    /// Output format (overrides config file)
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Request timeout in seconds (overrides config file)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Retries for throttled, failed or timed out requests (overrides config file)
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Token exchange endpoint; Basic authentication when unset
    #[arg(long, global = true)]
    pub token_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Credentials given on the command line; they win over the config file and
/// the `IllumioCS_*` environment variables.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialArgs {
    /// Illumio service account key ID
    #[arg(long = "service_account_key", global = true, alias = "service-account-key")]
    pub service_account_key: Option<String>,

    /// Illumio API URL, e.g. cloud.illum.io
    #[arg(long = "api_url", global = true, alias = "api-url")]
    pub api_url: Option<String>,

    /// Tenant ID
    #[arg(long = "tenant_id", global = true, alias = "tenant-id")]
    pub tenant_id: Option<String>,

    /// Service account token
    #[arg(
        long = "service_account_token",
        global = true,
        alias = "service-account-token"
    )]
    pub service_account_token: Option<String>,
}

impl From<&CredentialArgs> for cloudsecure_core::CredentialOverrides {
    fn from(args: &CredentialArgs) -> Self {
        Self {
            service_account_key: args.service_account_key.clone(),
            api_url: args.api_url.clone(),
            tenant_id: args.tenant_id.clone(),
            service_account_token: args.service_account_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty table output
    Table,
    /// JSON output
    Json,
    /// CSV output
    Csv,
}

impl From<OutputFormat> for cloudsecure_core::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => cloudsecure_core::OutputFormat::Table,
            OutputFormat::Json => cloudsecure_core::OutputFormat::Json,
            OutputFormat::Csv => cloudsecure_core::OutputFormat::Csv,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the connection and credentials
    Check,

    /// IP list operations
    Iplists {
        #[command(subcommand)]
        command: IpListCommands,
    },

    /// Application operations
    Applications {
        #[command(subcommand)]
        command: ApplicationCommands,
    },

    /// Cloud inventory resource operations
    Resources {
        #[command(subcommand)]
        command: ResourceCommands,
    },

    /// Service operations
    Services {
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// Cloud account onboarding operations
    Onboarding {
        #[command(subcommand)]
        command: OnboardingCommands,
    },

    /// Show CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum IpListCommands {
    /// List IP lists of the active policy
    List,

    /// Create draft IP lists from a JSON file, skipping existing names
    Import {
        /// JSON file holding a list of IP lists
        #[arg(long = "input-file")]
        input_file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ApplicationCommands {
    /// List applications
    List,
}

#[derive(Subcommand, Debug)]
pub enum ResourceCommands {
    /// List resources
    List {
        /// Maximum number of resources to fetch
        #[arg(long, default_value_t = 50, allow_negative_numbers = true)]
        limit: i64,

        /// Comma-separated clouds (default: aws)
        #[arg(long)]
        clouds: Option<String>,

        /// Comma-separated object types, e.g. AWS::EC2::Instance
        #[arg(long = "object_types", alias = "object-types")]
        object_types: Option<String>,

        /// Comma-separated account IDs
        #[arg(long = "account_ids", alias = "account-ids")]
        account_ids: Option<String>,
    },

    /// List resource object types
    Objecttypes {
        /// Comma-separated clouds (default: aws)
        #[arg(long)]
        clouds: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServiceCommands {
    /// List services of the draft policy
    List,

    /// Create draft services from a JSON file, skipping existing names
    Import {
        /// JSON file holding a list of services
        #[arg(long = "input-file")]
        input_file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum OnboardingCommands {
    /// Register an Azure storage account for flow logs
    AzureOnboardStorageAccount {
        /// Azure subscription ID
        #[arg(long = "subscription_id", alias = "subscription-id")]
        subscription_id: String,

        /// Storage account name
        #[arg(long = "storage_account", alias = "storage-account")]
        storage_account: String,
    },

    /// Register S3 buckets for flow logs
    AwsOnboardS3Bucket {
        /// AWS account ID
        #[arg(long = "account-id")]
        account_id: String,

        /// Comma-separated S3 bucket ARNs
        #[arg(long)]
        arns: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
}
