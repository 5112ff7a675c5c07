//! stackgraph - resource-and-trust graph builder
//!
//! Assembles the items backend from configuration and prints its template,
//! outputs, route table, or an access explanation for one of its roles.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use stackgraph_observability::{LogFormat, LogSettings};
use stackgraph_stack::{Backend, BackendConfig, SynthesisContext};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "stackgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./stackgraph.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the deployment template
    Synth {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// List the operator outputs
    Outputs,

    /// List the HTTP routes
    Routes,

    /// Explain whether a role may perform an action on a resource
    Explain {
        /// Logical id of the role
        #[arg(long)]
        role: String,

        /// Action, e.g. dynamodb:GetItem
        #[arg(long)]
        action: String,

        /// `*`, a literal ARN, `ref:<LogicalId>` or `arn:<LogicalId>`
        #[arg(long, default_value = "*")]
        resource: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    stackgraph_observability::init(&LogSettings {
        level: cli.log_level.clone(),
        format: if cli.json_logs { LogFormat::Json } else { LogFormat::Compact },
    });

    let config = BackendConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let backend = Backend::assemble(&config).context("assembling backend")?;

    match cli.command {
        Commands::Synth { out, compact } => {
            let template = backend
                .synthesize(&SynthesisContext::new())
                .context("synthesizing template")?;
            let rendered = if compact {
                serde_json::to_string(&template)?
            } else {
                template.to_string_pretty()?
            };
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered + "\n")
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), "template written");
                }
                None => println!("{rendered}"),
            }
        }
        Commands::Outputs => print!("{}", commands::render_outputs(&backend)),
        Commands::Routes => print!("{}", commands::render_routes(&backend)),
        Commands::Explain {
            role,
            action,
            resource,
        } => {
            let explanation = commands::explain(&backend, &role, &action, &resource)?;
            println!("{}", serde_json::to_string_pretty(&explanation)?);
        }
    }
    Ok(())
}
