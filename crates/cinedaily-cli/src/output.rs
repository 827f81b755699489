//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use cinedaily_api_models::Movie;
use cinedaily_client::{Membership, SearchState, Session};
use serde::Serialize;
use serde_json::{Map, Value, json};
use url::Url;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const TITLE_WIDTH: usize = 40;

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_movie_list(movies: &[Movie], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(movies)?,
        OutputFormat::Table => {
            if movies.is_empty() {
                println!("no movies");
                return Ok(());
            }
            println!("{:<32} {:<6} TITLE", "SLUG", "YEAR");
            for movie in movies {
                println!("{}", format_movie_row(movie));
            }
        }
    }
    Ok(())
}

pub(crate) fn render_movie_detail(
    movie: &Movie,
    membership: Option<Membership>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "movie": movie,
            "watchlist": membership.map(membership_label),
        }))?,
        OutputFormat::Table => {
            println!("title: {}", movie.title);
            println!("slug: {}", movie.slug);
            if !movie.year.is_empty() {
                println!("year: {}", movie.year);
            }
            if !movie.director.is_empty() {
                println!("director: {}", movie.director);
            }
            if !movie.stars.is_empty() {
                println!("stars: {}", movie.stars);
            }
            if !movie.poster_url.is_empty() {
                println!("poster: {}", movie.poster_url);
            }
            if let Some(membership) = membership {
                println!("watchlist: {}", membership_label(membership));
            }
            if !movie.overview.is_empty() {
                println!();
                println!("{}", movie.overview);
            }
        }
    }
    Ok(())
}

pub(crate) fn render_session(session: &Session, format: OutputFormat) -> CliResult<()> {
    let identity = session.identity().map(ToString::to_string);
    match format {
        OutputFormat::Json => print_json(&json!({
            "authenticated": session.is_authenticated(),
            "identity": identity,
        }))?,
        OutputFormat::Table => println!("{}", identity.as_deref().unwrap_or("anonymous")),
    }
    Ok(())
}

pub(crate) fn render_url(label: &str, url: &Url, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let mut body = Map::new();
            body.insert(label.to_string(), Value::String(url.to_string()));
            print_json(&body)?;
        }
        OutputFormat::Table => println!("{url}"),
    }
    Ok(())
}

pub(crate) fn render_membership(
    slug: &str,
    membership: Membership,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "slug": slug,
            "inWatchlist": membership == Membership::Member,
        }))?,
        OutputFormat::Table => println!("{slug}: {}", membership_label(membership)),
    }
    Ok(())
}

pub(crate) fn render_toggle(
    slug: &str,
    membership: Membership,
    message: &str,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "slug": slug,
            "inWatchlist": membership == Membership::Member,
            "message": message,
        }))?,
        OutputFormat::Table => println!("{message}"),
    }
    Ok(())
}

pub(crate) fn render_search_state(state: &SearchState, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "query": state.query,
            "results": state.results,
            "error": state.last_error,
        }))?,
        OutputFormat::Table => {
            println!("query: {}", state.query);
            if let Some(error) = &state.last_error {
                println!("{error}");
            } else {
                render_movie_list(&state.results, format)?;
            }
        }
    }
    Ok(())
}

pub(crate) const fn membership_label(membership: Membership) -> &'static str {
    match membership {
        Membership::Member => "in watchlist",
        Membership::NonMember => "not in watchlist",
        Membership::Unknown => "unknown",
    }
}

pub(crate) fn format_movie_row(movie: &Movie) -> String {
    format!(
        "{:<32} {:<6} {}",
        movie.slug,
        movie.year,
        truncate(&movie.title, TITLE_WIDTH)
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut shortened: String = text.chars().take(width.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}
