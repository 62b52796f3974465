//! anvil - platform command-line tool.
//!
//! This binary owns process concerns: argument parsing, logging setup,
//! and the single place where errors become exit codes. Everything
//! authentication-shaped lives in the `anvil-auth` crate.

mod commands;

use anvil_auth::AuthError;
use clap::{Parser, Subcommand};
use commands::auth::{self, AuthCommands};

/// Exit code for "not authenticated", distinguishable from generic
/// failures so scripts can detect the unauthenticated state.
const EXIT_NOT_AUTHENTICATED: i32 = 100;

const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "anvil")]
#[command(author, version, about = "anvil platform CLI", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authentication (login/logout)
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Log in with your anvil credentials
    Login {
        /// Log in for enterprise users under single sign-on
        #[arg(long)]
        sso: bool,
    },
    /// Clear your local anvil credentials
    Logout,
    /// Display your anvil login
    Whoami,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Auth { command } => auth::handle_auth(command).await,
        // Top-level aliases for the common flows.
        Commands::Login { sso } => auth::handle_auth(AuthCommands::Login { sso }).await,
        Commands::Logout => auth::handle_auth(AuthCommands::Logout).await,
        Commands::Whoami => auth::handle_auth(AuthCommands::Whoami).await,
    };

    if let Err(err) = result {
        report_and_exit(err);
    }
}

/// The single top-level handler that decides process termination.
fn report_and_exit(err: AuthError) -> ! {
    let code = exit_code_for(&err);
    if code == EXIT_NOT_AUTHENTICATED {
        // Scripts match on this exact stdout line.
        println!("not logged in");
    } else {
        eprintln!("{err}");
    }
    std::process::exit(code);
}

fn exit_code_for(err: &AuthError) -> i32 {
    match err {
        AuthError::NotLoggedIn => EXIT_NOT_AUTHENTICATED,
        _ => EXIT_FAILURE,
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "anvil=debug,anvil_auth=debug"
    } else {
        "anvil=warn,anvil_auth=warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    // Interactive tool: keep stdout for command output, log to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
