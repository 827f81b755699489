use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cinedaily_client::search::INVALID_QUERY_MESSAGE;
use cinedaily_client::{DebouncedSearch, QueryChange, SearchMachine, SearchState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::cli::{OutputFormat, SearchArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_movie_list, render_search_state};

/// Margin added after the final keystroke so the trailing debounce fires
/// before the session ends.
const DRAIN_MARGIN: Duration = Duration::from_millis(50);

pub(crate) async fn handle_search(
    ctx: &AppContext,
    args: SearchArgs,
    format: OutputFormat,
) -> CliResult<()> {
    if args.interactive {
        let stdin = BufReader::new(tokio::io::stdin());
        return run_interactive(ctx, stdin, format).await;
    }

    let query = args
        .query
        .ok_or_else(|| CliError::validation("a query is required unless --interactive is set"))?;
    search_once(ctx, &query, format).await
}

async fn search_once(ctx: &AppContext, query: &str, format: OutputFormat) -> CliResult<()> {
    let mut machine = SearchMachine::new();
    let change = machine.set_query(query);
    if let Some(message) = &machine.state().validation_error {
        return Err(CliError::validation(message.clone()));
    }
    let QueryChange::Schedule(term) = change else {
        return render_movie_list(&[], format);
    };

    let state = machine.execute(ctx.backend.as_ref(), term).await;
    if let Some(message) = &state.last_error {
        return Err(CliError::failure(anyhow!(message.clone())));
    }
    render_movie_list(&state.results, format)
}

/// Feed each input line through the debounced search as the current text of
/// the search box, printing a snapshot whenever a response lands.
async fn run_interactive<R>(ctx: &AppContext, reader: R, format: OutputFormat) -> CliResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let search = DebouncedSearch::spawn(Arc::clone(&ctx.backend), ctx.config.debounce);
    let mut updates = search.subscribe();
    let mut lines = reader.lines();
    let mut printed = SearchState::default();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|err| CliError::failure(anyhow!("failed to read input: {err}")))?;
                let Some(text) = line else { break };
                match search.set_query(&text) {
                    QueryChange::Rejected => eprintln!("{INVALID_QUERY_MESSAGE}"),
                    QueryChange::Clear if !text.is_empty() => eprintln!("{INVALID_QUERY_MESSAGE}"),
                    QueryChange::Schedule(_) | QueryChange::Clear => {}
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_if_settled(&state, &mut printed, format)?;
            }
        }
    }

    tokio::time::sleep(ctx.config.debounce + DRAIN_MARGIN).await;
    let state = updates
        .wait_for(|state| !state.loading)
        .await
        .map_err(|_| CliError::failure(anyhow!("search worker stopped")))?
        .clone();
    print_if_settled(&state, &mut printed, format)
}

fn print_if_settled(
    state: &SearchState,
    printed: &mut SearchState,
    format: OutputFormat,
) -> CliResult<()> {
    let unchanged = state.query == printed.query
        && state.results == printed.results
        && state.last_error == printed.last_error;
    if state.loading || unchanged {
        return Ok(());
    }
    debug!(query = %state.query, results = state.results.len(), "search settled");
    render_search_state(state, format)?;
    state.clone_into(printed);
    Ok(())
}
