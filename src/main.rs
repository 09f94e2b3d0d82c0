use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

use sim_pilot::driver::{self, ios::IdbBackend};
use sim_pilot::orchestrator::InstructionPipeline;
use sim_pilot::parser::CommandRegistry;
use sim_pilot::server::StdioServer;
use sim_pilot::shell;
use sim_pilot::utils::config::Config;

#[derive(Parser)]
#[command(name = "sim-pilot")]
#[command(version = "0.1.0")]
#[command(about = "Drive iOS simulators with natural-language instructions", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/sim-pilot/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one instruction and print the result as JSON
    Exec {
        /// Instruction text, e.g. "tap at 100 200"
        #[arg(required = true, trailing_var_arg = true)]
        instruction: Vec<String>,

        /// Simulator UDID to act on
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Interactive instruction prompt
    Shell {
        /// Simulator UDID to start with
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Serve JSON-lines requests on stdin/stdout
    Serve,

    /// List supported commands
    Commands,

    /// Suggest instructions for partial input
    Suggest {
        #[arg(trailing_var_arg = true)]
        partial: Vec<String>,
    },

    /// List available simulators
    Devices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Exec {
            instruction,
            session,
        } => {
            let pipeline = build_pipeline(&config)?;
            if session.is_some() {
                pipeline.orchestrator().set_active_session_id(session);
            }

            let result = pipeline.process(&instruction.join(" ")).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.success {
                std::process::exit(1);
            }
        }

        Commands::Shell { session } => {
            let pipeline = build_pipeline(&config)?;
            if session.is_some() {
                pipeline.orchestrator().set_active_session_id(session);
            }
            shell::run_shell(&pipeline).await?;
        }

        Commands::Serve => {
            let pipeline = build_pipeline(&config)?;
            StdioServer::new(&pipeline).run().await?;
        }

        Commands::Commands => {
            let registry = CommandRegistry::default();
            for group in registry.groups() {
                println!("{}", group.name.bold());
                for definition in &group.definitions {
                    println!("  {}", definition.name.cyan());
                    println!("      {}", definition.description);
                    if !definition.required_params.is_empty() {
                        println!(
                            "      required: {}",
                            definition.required_params.join(", ").yellow()
                        );
                    }
                    if let Some(example) = definition.examples.first() {
                        println!("      e.g. {}", example.dimmed());
                    }
                }
            }
        }

        Commands::Suggest { partial } => {
            let registry = CommandRegistry::default();
            for suggestion in registry.suggest(&partial.join(" ")) {
                println!("{}", suggestion);
            }
        }

        Commands::Devices => {
            let backend = IdbBackend::from_config(&config)?;
            driver::list_devices(&backend).await?;
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> anyhow::Result<InstructionPipeline> {
    let backend = IdbBackend::from_config(config)?;
    Ok(InstructionPipeline::new(Arc::new(backend), config.clone()))
}
