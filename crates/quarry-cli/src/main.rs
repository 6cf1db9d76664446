use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{CompileArgs, InferArgs, ServeArgs, TablesArgs};

#[derive(Parser, Debug)]
#[command(name = "quarry", version, about = "Read-only MySQL gateway for AI agents")]
struct Cli {
    /// Configuration file. Defaults apply when it does not exist.
    #[arg(short, long, global = true, env = "QUARRY_CONFIG", default_value = "quarry.yaml")]
    config: PathBuf,

    /// Log output format. Logs always go to stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server.
    Serve(ServeArgs),

    /// Print the visible databases.
    Databases,

    /// Print the tables of a database.
    Tables(TablesArgs),

    /// Infer the database a project uses and print the result as JSON.
    Infer(InferArgs),

    /// Validate and compile a select_rows request without executing it.
    Compile(CompileArgs),
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quarry=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let config = commands::load_config(&cli.config)?;

    match cli.cmd {
        Command::Serve(args) => commands::serve::execute(config, args).await,
        Command::Databases => commands::catalog::databases(config).await,
        Command::Tables(args) => commands::catalog::tables(config, args).await,
        Command::Infer(args) => commands::infer::execute(config, args).await,
        Command::Compile(args) => commands::compile::execute(config, args).await,
    }
}
