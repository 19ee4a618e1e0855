use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use coinwatch::core::RowFields;
use coinwatch::core::log::init_logging;
use std::time::Duration;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Manually entered portfolio values
#[derive(Args, Debug, Default)]
struct RowArgs {
    #[arg(long)]
    buy_price: Option<f64>,
    #[arg(long)]
    amount: Option<f64>,
    /// Total funds raised by the project
    #[arg(long)]
    found_raises: Option<f64>,
    /// Investor share, as a fraction (0.25) or a percentage (25)
    #[arg(long)]
    investor_percentage: Option<f64>,
    #[arg(long)]
    financing_valuation: Option<f64>,
    /// Used when the price cannot be derived from the raise
    #[arg(long)]
    financing_based_price: Option<f64>,
    #[arg(long)]
    annualized_income: Option<f64>,
    #[arg(long)]
    income_valuation: Option<f64>,
    #[arg(long)]
    income_based_price: Option<f64>,
    #[arg(long, default_value = "")]
    tokenomics: String,
    #[arg(long, default_value = "")]
    vesting: String,
    /// Exchanges listing the coin
    #[arg(long, default_value = "")]
    cexs: String,
    #[arg(long, default_value = "")]
    tags: String,
}

impl From<RowArgs> for RowFields {
    fn from(args: RowArgs) -> RowFields {
        RowFields {
            buy_price: args.buy_price,
            amount: args.amount,
            found_raises: args.found_raises,
            investor_percentage: args.investor_percentage,
            financing_valuation: args.financing_valuation,
            financing_based_price: args.financing_based_price,
            annualized_income: args.annualized_income,
            income_valuation: args.income_valuation,
            income_based_price: args.income_based_price,
            tokenomics: args.tokenomics,
            vesting: args.vesting,
            cexs: args.cexs,
            tags: args.tags,
        }
    }
}

impl From<Commands> for coinwatch::AppCommand {
    fn from(cmd: Commands) -> coinwatch::AppCommand {
        match cmd {
            Commands::Init => coinwatch::AppCommand::Init,
            Commands::List => coinwatch::AppCommand::List,
            Commands::Add { coin, fields } => coinwatch::AppCommand::Add {
                coin,
                fields: fields.into(),
            },
            Commands::Edit { id, coin, fields } => coinwatch::AppCommand::Edit {
                id,
                coin,
                fields: fields.into(),
            },
            Commands::Remove { id } => coinwatch::AppCommand::Remove { id },
            Commands::Resolve { text } => coinwatch::AppCommand::Resolve { text },
            Commands::Summary { json } => coinwatch::AppCommand::Summary { json },
            Commands::Prices { json } => coinwatch::AppCommand::Prices { json },
            Commands::Watch {
                interval,
                iterations,
            } => coinwatch::AppCommand::Watch {
                interval: Duration::from_secs(interval),
                iterations,
            },
            Commands::Popular => coinwatch::AppCommand::Popular,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Seed an empty portfolio with a few well-known coins
    Init,
    /// List tracked coins and their manual fields
    List,
    /// Track a coin by id, name or symbol, or update the row tracking it
    Add {
        coin: String,
        #[command(flatten)]
        fields: RowArgs,
    },
    /// Replace the coin and fields of an existing row
    Edit {
        id: u64,
        coin: String,
        #[command(flatten)]
        fields: RowArgs,
    },
    /// Stop tracking a row
    Remove { id: u64 },
    /// Show which coin id free text resolves to
    Resolve { text: String },
    /// Display market data merged with portfolio fields
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Display profit per holding
    Prices {
        #[arg(long)]
        json: bool,
    },
    /// Keep refreshing the market overview
    Watch {
        /// Seconds between renders
        #[arg(long, default_value_t = 30)]
        interval: u64,
        /// Stop after this many renders
        #[arg(long)]
        iterations: Option<u64>,
    },
    /// Print commonly used coin ids
    Popular,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => coinwatch::cli::setup::setup(),
        Some(cmd) => coinwatch::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
