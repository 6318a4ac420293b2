use anyhow::{Context, Result};
use bth_tools::{
    logging, Config, ConfigError, ContractArtifact, DeployError, DeploymentPlan,
    HttpTransport,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bth")]
#[command(about = "BTH contract deployment tools")]
struct Cli {
    /// Configuration file (defaults to ./bth.toml when present)
    #[arg(short, long, global = true, env = "BTH_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the BTH contract
    Deploy {
        /// Network to deploy to (defaults to the configured default network)
        #[arg(short, long)]
        network: Option<String>,
        /// Compiled contract artifact (JSON with a `bytecode` field)
        #[arg(short, long, default_value = "build/contracts/BTH.json")]
        artifact: PathBuf,
        /// Validate and print the transaction without contacting the node
        #[arg(long)]
        dry_run: bool,
    },
    /// Check configuration
    Config {
        /// Validate the deployment parameters as well
        #[arg(short, long)]
        validate: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List configured networks
    Networks,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Err(err) = logging::init(cli.debug || config.debug) {
        eprintln!("warning: logging disabled: {}", err);
    }

    match cli.command {
        Commands::Deploy {
            network,
            artifact,
            dry_run,
        } => deploy(&config, network, artifact, dry_run).await,
        Commands::Config { validate, json } => {
            if validate {
                config.deployment.validate()?;
                println!("Configuration is valid");
            }
            if json {
                println!("{}", config.to_json()?);
            } else {
                config.print_summary();
            }
            Ok(())
        }
        Commands::Networks => {
            for profile in config.registry.profiles() {
                let marker = if profile.name == config.network { "*" } else { " " };
                println!(
                    "{} {:<16} {:<28} network_id={}",
                    marker,
                    profile.name,
                    profile.rpc_url(),
                    profile.network_id
                );
            }
            Ok(())
        }
    }
}

async fn deploy(
    config: &Config,
    network: Option<String>,
    artifact: PathBuf,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        let plan = DeploymentPlan::from_config(config, network.as_deref())?;
        let data = plan.transaction_data(&ContractArtifact::load(&artifact)?);
        let (profile, params) = (plan.network, &plan.params);
        println!("Network:        {} ({})", profile.name, profile.rpc_url());
        println!(
            "Foundation:     {} of {} signatures",
            params.required_signatures(),
            params.foundation_members().len()
        );
        for member in params.foundation_members() {
            println!("                {}", member);
        }
        println!("Genesis:        {}", params.genesis_height());
        println!(
            "Halving:        every {} blocks, at most {} times",
            params.subsidy_halving_interval(),
            params.max_halvings()
        );
        println!("Wallet:         {}", params.foundation_wallet());
        println!("Data:           {}", data);
        println!("Dry run: nothing was sent");
        return Ok(());
    }

    let rpc_timeout = config.rpc_timeout();
    let receipt = bth_tools::deploy::run(config, network.as_deref(), &artifact, |profile| {
        println!("Deploying contract to {} network", profile.name);
        HttpTransport::new(profile.rpc_url(), rpc_timeout)
    })
    .await?;

    println!("  Contract:         {}", receipt.contract_name);
    println!("  Address:          {}", receipt.contract_address);
    println!("  Transaction:      {}", receipt.transaction_hash);
    if let Some(block) = receipt.block_number {
        println!("  Block:            {}", block);
    }
    if let Some(gas_used) = receipt.gas_used {
        println!("  Gas Used:         {}", gas_used);
    }
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<DeployError>() {
        return err.exit_code();
    }
    match err.downcast_ref::<ConfigError>() {
        Some(config_err) => match config_err {
            ConfigError::UnknownNetwork(_) => 2,
            _ => 3,
        },
        None => 1,
    }
}
