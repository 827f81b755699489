use std::sync::Arc;

use anyhow::anyhow;
use cinedaily_client::{LoadState, WatchlistToggle, load_daily, load_movie};
use tracing::debug;

use crate::cli::{MovieArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_movie_detail, render_movie_list};

pub(crate) async fn handle_daily(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    match load_daily(ctx.backend.as_ref()).await {
        LoadState::Ready(movies) => render_movie_list(&movies, format),
        LoadState::Failed(message) => Err(CliError::failure(anyhow!(message))),
        LoadState::Loading => Err(CliError::failure(anyhow!("daily selection still loading"))),
    }
}

pub(crate) async fn handle_movie(
    ctx: &AppContext,
    args: MovieArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let slug = args.slug.trim();
    if slug.is_empty() {
        return Err(CliError::validation("slug must not be empty"));
    }

    let movie = match load_movie(ctx.backend.as_ref(), slug).await {
        LoadState::Ready(movie) => movie,
        LoadState::Failed(message) => return Err(CliError::failure(anyhow!(message))),
        LoadState::Loading => return Err(CliError::failure(anyhow!("movie still loading"))),
    };

    let membership = match ctx.resolve_session().await.identity() {
        Some(identity) => {
            let toggle =
                WatchlistToggle::new(Arc::clone(&ctx.backend), Some(identity.clone()), slug);
            Some(toggle.fetch_status().await)
        }
        None => {
            debug!(slug, "anonymous session; watchlist status omitted");
            None
        }
    };

    render_movie_detail(&movie, membership, format)
}
