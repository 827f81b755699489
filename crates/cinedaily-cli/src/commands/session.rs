use tracing::info;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult, classify_client_error};
use crate::output::{render_session, render_url};

pub(crate) async fn handle_whoami(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let session = ctx.resolve_session().await;
    render_session(&session, format)
}

pub(crate) fn handle_login_url(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let url = ctx
        .config
        .login_url()
        .map_err(|err| classify_client_error(&err))?;
    render_url("login", &url, format)
}

pub(crate) fn handle_logout_url(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let url = ctx
        .session
        .logout(&ctx.config)
        .map_err(|err| classify_client_error(&err))?;
    info!("local session cleared; open the logout URL to end the backend session");
    render_url("logout", &url, format)
}
