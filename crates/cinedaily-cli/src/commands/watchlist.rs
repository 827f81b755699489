use std::sync::Arc;

use anyhow::anyhow;
use cinedaily_client::watchlist::FAILED_MESSAGE;
use cinedaily_client::{
    HttpBackend, Identity, LoadState, ToggleOutcome, ToggleRejection, WatchlistToggle,
    load_watchlist,
};

use crate::cli::{OutputFormat, WatchlistSlugArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_membership, render_movie_list, render_toggle};

pub(crate) async fn handle_watchlist_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let user = ctx.require_user().await?;
    match load_watchlist(ctx.backend.as_ref(), &user).await {
        LoadState::Ready(movies) => render_movie_list(&movies, format),
        LoadState::Failed(message) => Err(CliError::failure(anyhow!(message))),
        LoadState::Loading => Err(CliError::failure(anyhow!("watchlist still loading"))),
    }
}

pub(crate) async fn handle_watchlist_status(
    ctx: &AppContext,
    args: WatchlistSlugArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let user = ctx.require_user().await?;
    let toggle = toggle_for(ctx, user, &args.slug)?;
    let membership = toggle.fetch_status().await;
    render_membership(toggle.slug(), membership, format)
}

pub(crate) async fn handle_watchlist_toggle(
    ctx: &AppContext,
    args: WatchlistSlugArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let user = ctx.require_user().await?;
    let toggle = toggle_for(ctx, user, &args.slug)?;
    toggle.fetch_status().await;

    match toggle.toggle().await {
        ToggleOutcome::Added | ToggleOutcome::Removed => {
            let entry = toggle.snapshot();
            let message = entry.message.unwrap_or_default();
            render_toggle(toggle.slug(), entry.membership, &message, format)
        }
        ToggleOutcome::Failed => Err(CliError::failure(anyhow!(FAILED_MESSAGE))),
        ToggleOutcome::Ignored(reason) => Err(CliError::failure(anyhow!(
            "watchlist toggle skipped: {}",
            rejection_label(reason)
        ))),
    }
}

fn toggle_for(
    ctx: &AppContext,
    user: Identity,
    slug: &str,
) -> CliResult<WatchlistToggle<HttpBackend>> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(CliError::validation("slug must not be empty"));
    }
    Ok(WatchlistToggle::new(
        Arc::clone(&ctx.backend),
        Some(user),
        slug,
    ))
}

const fn rejection_label(reason: ToggleRejection) -> &'static str {
    match reason {
        ToggleRejection::NoUser => "no signed-in user",
        ToggleRejection::StatusUnknown => "membership unknown",
        ToggleRejection::InFlight => "another update is in flight",
    }
}
