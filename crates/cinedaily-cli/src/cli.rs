//! Command-line surface of the Cinedaily client.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use cinedaily_client::ClientConfig;
use cinedaily_client::config::{DEFAULT_DEBOUNCE, DEFAULT_TIMEOUT, DEV_API_ORIGIN, parse_url};
use cinedaily_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::{Instrument, debug, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, classify_client_error};
use crate::commands::movies::{handle_daily, handle_movie};
use crate::commands::search::handle_search;
use crate::commands::session::{handle_login_url, handle_logout_url, handle_whoami};
use crate::commands::watchlist::{
    handle_watchlist_list, handle_watchlist_status, handle_watchlist_toggle,
};

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = init_telemetry(&cli) {
        eprintln!("warning: {err:#}");
    }

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let span = info_span!("command", command = command_name, trace_id = %trace_id);

    let result = execute(cli, &trace_id).instrument(span).await;

    match result {
        Ok(()) => {
            debug!(command = command_name, "command completed");
            0
        }
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            warn!(command = command_name, exit_code, error = %message, "command failed");
            eprintln!("error: {message}");
            exit_code
        }
    }
}

async fn execute(cli: Cli, trace_id: &str) -> CliResult<()> {
    let ctx = AppContext::new(client_config(&cli)?, trace_id)?;
    let result = dispatch(cli.command, cli.output, &ctx).await;
    ctx.finish().await;
    result
}

async fn dispatch(command: Command, format: OutputFormat, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Whoami => handle_whoami(ctx, format).await,
        Command::LoginUrl => handle_login_url(ctx, format),
        Command::LogoutUrl => handle_logout_url(ctx, format),
        Command::Daily => handle_daily(ctx, format).await,
        Command::Search(args) => handle_search(ctx, args, format).await,
        Command::Movie(args) => handle_movie(ctx, args, format).await,
        Command::Watchlist(watchlist) => match watchlist {
            WatchlistCommand::List => handle_watchlist_list(ctx, format).await,
            WatchlistCommand::Status(args) => handle_watchlist_status(ctx, args, format).await,
            WatchlistCommand::Toggle(args) => handle_watchlist_toggle(ctx, args, format).await,
        },
    }
}

fn init_telemetry(cli: &Cli) -> anyhow::Result<()> {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    init_logging(&config)
}

fn client_config(cli: &Cli) -> CliResult<ClientConfig> {
    if cli.timeout == 0 {
        return Err(CliError::validation("--timeout must be at least 1 second"));
    }
    let config = ClientConfig::new(&cli.api_url)
        .map_err(|err| classify_client_error(&err))?
        .with_timeout(Duration::from_secs(cli.timeout))
        .with_debounce(Duration::from_millis(cli.debounce_ms))
        .with_session_cookie(cli.session_cookie.clone());
    Ok(config)
}

#[derive(Parser)]
#[command(name = "cinedaily", about = "Browse the daily movie selection and manage your watchlist")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "CINEDAILY_API_URL",
        value_parser = parse_api_url,
        default_value = DEV_API_ORIGIN
    )]
    api_url: Url,
    #[arg(
        long,
        global = true,
        env = "CINEDAILY_SESSION_COOKIE",
        hide_env_values = true,
        help = "Backend session cookie as NAME=value"
    )]
    session_cookie: Option<String>,
    #[arg(
        long,
        global = true,
        env = "CINEDAILY_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT.as_secs()
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(long, global = true, env = "CINEDAILY_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(long, global = true, env = "CINEDAILY_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
    #[arg(
        long,
        global = true,
        default_value_t = debounce_default_ms(),
        help = "Quiet period before interactive search input is sent"
    )]
    debounce_ms: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Show who the backend session belongs to.
    Whoami,
    /// Print the URL that starts the GitHub login.
    LoginUrl,
    /// Clear the local session and print the logout URL.
    LogoutUrl,
    /// List today's movie selection.
    Daily,
    /// Search the catalog.
    Search(SearchArgs),
    /// Show one movie.
    Movie(MovieArgs),
    /// Manage the signed-in user's watchlist.
    #[command(subcommand)]
    Watchlist(WatchlistCommand),
}

#[derive(Subcommand)]
pub(crate) enum WatchlistCommand {
    /// List every movie in the watchlist.
    List,
    /// Show whether a movie is in the watchlist.
    Status(WatchlistSlugArgs),
    /// Add or remove a movie depending on its current membership.
    Toggle(WatchlistSlugArgs),
}

#[derive(Args, Default)]
pub(crate) struct SearchArgs {
    #[arg(help = "Lowercase letters only (a-z)")]
    pub(crate) query: Option<String>,
    #[arg(
        long,
        conflicts_with = "query",
        help = "Read search box text from stdin, one line per keystroke"
    )]
    pub(crate) interactive: bool,
}

#[derive(Args)]
pub(crate) struct MovieArgs {
    pub(crate) slug: String,
}

#[derive(Args)]
pub(crate) struct WatchlistSlugArgs {
    pub(crate) slug: String,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Whoami => "whoami",
        Command::LoginUrl => "login_url",
        Command::LogoutUrl => "logout_url",
        Command::Daily => "daily",
        Command::Search(_) => "search",
        Command::Movie(_) => "movie",
        Command::Watchlist(WatchlistCommand::List) => "watchlist_list",
        Command::Watchlist(WatchlistCommand::Status(_)) => "watchlist_status",
        Command::Watchlist(WatchlistCommand::Toggle(_)) => "watchlist_toggle",
    }
}

fn parse_api_url(input: &str) -> Result<Url, String> {
    parse_url(input).map_err(|err| err.describe())
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}

fn debounce_default_ms() -> u64 {
    u64::try_from(DEFAULT_DEBOUNCE.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cinedaily").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn defaults_target_dev_api() {
        let cli = parse(&["daily"]);
        assert_eq!(cli.api_url.as_str(), "http://localhost:8080/");
        assert_eq!(cli.timeout, 10);
        assert_eq!(cli.debounce_ms, 700);
        assert_eq!(cli.output, OutputFormat::Table);
        assert!(cli.session_cookie.is_none());
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = parse(&[
            "watchlist",
            "toggle",
            "heat",
            "--output",
            "json",
            "--session-cookie",
            "JSESSIONID=abc",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.session_cookie.as_deref(), Some("JSESSIONID=abc"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
        assert_eq!(command_label(&cli.command), "watchlist_toggle");
    }

    #[test]
    fn dev_frontend_url_is_rewritten_to_dev_api() {
        let cli = parse(&["--api-url", "http://localhost:5173", "daily"]);
        let config = client_config(&cli).expect("config");
        assert_eq!(config.api_origin.as_str(), "http://localhost:8080/");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cli = parse(&["--timeout", "0", "daily"]);
        let err = client_config(&cli).expect_err("validation error");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn interactive_conflicts_with_query() {
        let result = Cli::try_parse_from(["cinedaily", "search", "pete", "--interactive"]);
        assert!(result.is_err());
    }

    #[test]
    fn command_label_matches_variants() {
        assert_eq!(command_label(&Command::Whoami), "whoami");
        assert_eq!(command_label(&Command::LoginUrl), "login_url");
        assert_eq!(
            command_label(&Command::Search(SearchArgs::default())),
            "search"
        );
        assert_eq!(
            command_label(&Command::Watchlist(WatchlistCommand::List)),
            "watchlist_list"
        );
    }
}
