//! Kubernetes Resource Monitor CLI
//!
//! Samples pod usage, records it, recommends scaling and keeps autoscaler
//! objects in line with the recommendations.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{autoscale, email, history, monitor, settings};
use config::Paths;
use monitor_lib::config::{
    ConfigDocument, EmailConfig, EmailPort, PolicyDocument, ScalingStrategy, SettingsDocument,
    DEFAULT_NAMESPACE,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Kubernetes Resource Monitor CLI
#[derive(Parser)]
#[command(name = "k8s-monitor")]
#[command(author, version, about = "Kubernetes Resource Monitor: usage history, scaling recommendations and alerts", long_about = None)]
pub struct Cli {
    /// Settings directory (defaults to ~/.config/k8s-monitor)
    #[arg(long, env = "K8S_MONITOR_CONFIG_DIR")]
    pub settings_dir: Option<PathBuf>,

    /// Usage store file (defaults to the settings directory)
    #[arg(long, env = "K8S_MONITOR_STORE")]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sample pod usage and show it with recorded history and recommendations
    Monitor {
        /// Namespace to monitor (overrides namespaces.json)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Use the built-in mock pod data instead of a cluster
        #[arg(long)]
        use_mock: bool,
    },

    /// Recommend scaling and create or update HorizontalPodAutoscalers
    AutoScale {
        /// Namespace to scale (overrides namespaces.json)
        #[arg(long, short)]
        namespace: Option<String>,

        /// Use the built-in mock pod data instead of a cluster
        #[arg(long)]
        use_mock: bool,

        /// Compute recommendations without touching autoscaler objects
        #[arg(long)]
        dry_run: bool,
    },

    /// Show recorded usage history for a pod
    History {
        /// Pod namespace
        #[arg(long, short, default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        /// Pod name
        #[arg(long)]
        pod_name: String,

        /// How far back to look, in minutes
        #[arg(long, default_value_t = 60)]
        duration: u64,
    },

    /// Show the effective settings
    ShowConfig,

    /// Set notification channels and alert thresholds (config.json)
    SetConfig(ConfigArgs),

    /// View config.json as stored
    ViewConfig,

    /// Delete config.json so defaults apply
    ResetConfig,

    /// Set the auto-scaling policy (autoscaling_policy.json)
    SetAutoscalingPolicy(PolicyArgs),

    /// View autoscaling_policy.json as stored
    ViewAutoscalingPolicy,

    /// Delete autoscaling_policy.json so defaults apply
    ResetAutoscalingPolicy,

    /// Set the namespaces evaluated when --namespace is not given
    SetNamespaces {
        /// Namespaces to monitor
        #[arg(long, required = true, num_args = 1..)]
        namespaces: Vec<String>,
    },

    /// View namespaces.json as stored
    ViewNamespaces,

    /// Delete namespaces.json so only "default" is monitored
    ResetNamespaces,

    /// Send one email alert independently of monitoring
    EmailAlert(EmailArgs),
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Slack-compatible webhook URL for chat alerts
    #[arg(long)]
    slack_webhook_url: Option<String>,

    /// SMTP host for email alerts
    #[arg(long)]
    email_host: Option<String>,

    /// SMTP port for email alerts
    #[arg(long)]
    email_port: Option<u16>,

    /// Sender address for email alerts
    #[arg(long)]
    sender_email: Option<String>,

    /// SMTP password of the sender
    #[arg(long)]
    sender_password: Option<String>,

    /// Recipient address for email alerts
    #[arg(long)]
    recipient_email: Option<String>,

    /// CPU alert threshold
    #[arg(long)]
    alert_cpu_threshold: Option<f64>,

    /// Memory alert threshold in Mi
    #[arg(long)]
    alert_memory_threshold: Option<f64>,
}

impl From<ConfigArgs> for ConfigDocument {
    fn from(args: ConfigArgs) -> Self {
        Self {
            slack_webhook_url: args.slack_webhook_url,
            email_host: args.email_host,
            email_port: args.email_port.map(EmailPort::Number),
            sender_email: args.sender_email,
            sender_password: args.sender_password,
            recipient_email: args.recipient_email,
            alert_cpu_threshold: args.alert_cpu_threshold,
            alert_memory_threshold: args.alert_memory_threshold,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StrategyArg {
    Static,
    Dynamic,
}

impl From<StrategyArg> for ScalingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Static => ScalingStrategy::Static,
            StrategyArg::Dynamic => ScalingStrategy::Dynamic,
        }
    }
}

#[derive(Args)]
pub struct PolicyArgs {
    /// CPU usage threshold for scaling
    #[arg(long)]
    cpu_threshold: Option<f64>,

    /// Memory usage threshold for scaling
    #[arg(long)]
    memory_threshold: Option<f64>,

    /// Maximum replicas added or removed per recommendation
    #[arg(long)]
    max_replicas_change: Option<u32>,

    /// Scaling strategy
    #[arg(long, value_enum)]
    scaling_strategy: Option<StrategyArg>,
}

impl From<PolicyArgs> for PolicyDocument {
    fn from(args: PolicyArgs) -> Self {
        Self {
            cpu_threshold: args.cpu_threshold,
            memory_threshold: args.memory_threshold,
            max_replicas_change: args.max_replicas_change,
            scaling_strategy: args.scaling_strategy.map(ScalingStrategy::from),
        }
    }
}

#[derive(Args)]
pub struct EmailArgs {
    /// SMTP host
    #[arg(long)]
    email_host: String,

    /// SMTP port
    #[arg(long)]
    email_port: u16,

    /// Sender address
    #[arg(long)]
    sender_email: String,

    /// SMTP password of the sender
    #[arg(long)]
    sender_password: String,

    /// Recipient address
    #[arg(long)]
    recipient_email: String,

    /// Subject line
    #[arg(long)]
    subject: String,

    /// Message body
    #[arg(long)]
    message: String,
}

impl EmailArgs {
    fn email_config(&self) -> EmailConfig {
        EmailConfig {
            host: self.email_host.clone(),
            port: self.email_port,
            sender: self.sender_email.clone(),
            password: Some(self.sender_password.clone()),
            recipient: self.recipient_email.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let paths = Paths::resolve(cli.settings_dir, cli.store);
    debug!(
        settings_dir = %paths.settings_dir.display(),
        store = %paths.store_path.display(),
        "Resolved paths"
    );

    match cli.command {
        Commands::Monitor {
            namespace,
            use_mock,
        } => {
            monitor::run(&paths, namespace, use_mock, cli.format).await?;
        }
        Commands::AutoScale {
            namespace,
            use_mock,
            dry_run,
        } => {
            autoscale::run(&paths, namespace, use_mock, dry_run, cli.format).await?;
        }
        Commands::History {
            namespace,
            pod_name,
            duration,
        } => {
            history::run(&paths, &namespace, &pod_name, duration, cli.format)?;
        }
        Commands::ShowConfig => settings::show(&paths)?,
        Commands::SetConfig(args) => settings::set_config(&paths, args.into())?,
        Commands::ViewConfig => settings::view(&paths, SettingsDocument::Config, cli.format)?,
        Commands::ResetConfig => settings::reset(&paths, SettingsDocument::Config)?,
        Commands::SetAutoscalingPolicy(args) => settings::set_policy(&paths, args.into())?,
        Commands::ViewAutoscalingPolicy => {
            settings::view(&paths, SettingsDocument::Policy, cli.format)?
        }
        Commands::ResetAutoscalingPolicy => settings::reset(&paths, SettingsDocument::Policy)?,
        Commands::SetNamespaces { namespaces } => settings::set_namespaces(&paths, namespaces)?,
        Commands::ViewNamespaces => {
            settings::view(&paths, SettingsDocument::Namespaces, cli.format)?
        }
        Commands::ResetNamespaces => settings::reset(&paths, SettingsDocument::Namespaces)?,
        Commands::EmailAlert(args) => {
            email::run(args.email_config(), &args.subject, &args.message).await?
        }
    }

    Ok(())
}
