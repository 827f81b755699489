//! Validated, debounced catalog search.
//!
//! # Design
//! - [`SearchMachine`] is plain state: input validation, result application
//!   and the generation counter that discards superseded responses.
//! - [`DebouncedSearch`] wraps a machine with a worker task that owns the
//!   single trailing-edge debounce timer.
//! - Requests that were already sent are never aborted. Their responses are
//!   dropped on arrival if a newer request has been issued since.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use cinedaily_api_models::Movie;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::backend::MovieBackend;
use crate::error::ClientResult;

/// Validation message for input outside `a`-`z`.
pub const INVALID_QUERY_MESSAGE: &str = "Only lowercase letters (a-z) are allowed.";
/// Message shown when the backend search fails for any reason.
pub const SEARCH_FAILED_MESSAGE: &str = "Error fetching movies. Please try again.";

/// Whether `raw` only contains lowercase ASCII letters (the empty string included).
#[must_use]
pub fn is_valid_query(raw: &str) -> bool {
    raw.chars().all(|ch| ch.is_ascii_lowercase())
}

/// Non-empty search term made of lowercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Validate `raw` as a search term.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        (!raw.is_empty() && is_valid_query(raw)).then(|| Self(raw.to_string()))
    }

    /// Borrow the term.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Observable search state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Last accepted query text.
    pub query: String,
    /// Validation message for the last rejected input.
    pub validation_error: Option<String>,
    /// Results of the newest completed request.
    pub results: Vec<Movie>,
    /// Message for the newest failed request.
    pub last_error: Option<String>,
    /// A request for the newest term is outstanding.
    pub loading: bool,
}

/// Effect of feeding raw input into [`SearchMachine::set_query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryChange {
    /// Accepted non-empty input; a request should follow after the debounce.
    Schedule(SearchTerm),
    /// Nothing to search for; results were cleared and any pending request
    /// should be cancelled.
    Clear,
    /// Input rejected; query and pending work are untouched.
    Rejected,
}

/// Handle for one issued request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    generation: u64,
    term: SearchTerm,
}

impl SearchTicket {
    /// Term the request was issued for.
    #[must_use]
    pub const fn term(&self) -> &SearchTerm {
        &self.term
    }
}

/// Search state machine without any timing concerns.
#[derive(Debug, Default)]
pub struct SearchMachine {
    state: SearchState,
    generation: u64,
    // Bumped whenever accepted input schedules or clears a search.
    revision: u64,
}

impl SearchMachine {
    /// Empty machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SearchState {
        &self.state
    }

    /// Apply a new input value.
    ///
    /// Input containing anything but `a`-`z` is rejected with
    /// [`INVALID_QUERY_MESSAGE`] and the stored query is kept. Whitespace-only
    /// input is rejected the same way and additionally clears results, since
    /// there is nothing to search for.
    pub fn set_query(&mut self, raw: &str) -> QueryChange {
        if !is_valid_query(raw) {
            self.state.validation_error = Some(INVALID_QUERY_MESSAGE.to_string());
            if raw.trim().is_empty() {
                self.revision += 1;
                self.clear_results();
                return QueryChange::Clear;
            }
            return QueryChange::Rejected;
        }

        raw.clone_into(&mut self.state.query);
        self.state.validation_error = None;
        self.revision += 1;
        SearchTerm::parse(raw).map_or_else(
            || {
                self.clear_results();
                QueryChange::Clear
            },
            QueryChange::Schedule,
        )
    }

    /// Record that a request for `term` is being sent.
    pub fn issue(&mut self, term: SearchTerm) -> SearchTicket {
        self.generation += 1;
        self.state.loading = true;
        SearchTicket {
            generation: self.generation,
            term,
        }
    }

    /// Issue the request a debounce timer scheduled at `revision`, unless the
    /// input has been replaced or cleared since.
    pub(crate) fn issue_scheduled(
        &mut self,
        term: SearchTerm,
        revision: u64,
    ) -> Option<SearchTicket> {
        (revision == self.revision).then(|| self.issue(term))
    }

    pub(crate) const fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a response. Returns `false` when the response was superseded by a
    /// newer request (or a clear) and therefore ignored.
    pub fn complete(&mut self, ticket: &SearchTicket, result: ClientResult<Vec<Movie>>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        self.state.loading = false;
        match result {
            Ok(movies) => {
                self.state.results = movies;
                self.state.last_error = None;
            }
            Err(err) => {
                warn!(term = ticket.term.as_str(), error = %err.describe(), "search failed");
                self.state.results.clear();
                self.state.last_error = Some(SEARCH_FAILED_MESSAGE.to_string());
            }
        }
        true
    }

    /// Issue one request for `term` and apply its response.
    pub async fn execute<B>(&mut self, backend: &B, term: SearchTerm) -> &SearchState
    where
        B: MovieBackend + ?Sized,
    {
        let ticket = self.issue(term);
        let result = backend.search_movies(ticket.term()).await;
        self.complete(&ticket, result);
        &self.state
    }

    fn clear_results(&mut self) {
        // Anything still in flight belongs to older input.
        self.generation += 1;
        self.state.loading = false;
        self.state.results.clear();
        self.state.last_error = None;
    }
}

#[derive(Debug)]
enum DebounceCommand {
    Schedule {
        term: SearchTerm,
        revision: u64,
        deadline: Instant,
    },
    Cancel,
}

struct SharedSearch {
    machine: Mutex<SearchMachine>,
    updates: watch::Sender<SearchState>,
}

impl SharedSearch {
    fn apply<R>(&self, change: impl FnOnce(&mut SearchMachine) -> R) -> R {
        let mut machine = self.machine.lock().unwrap_or_else(PoisonError::into_inner);
        let outcome = change(&mut machine);
        self.updates.send_replace(machine.state().clone());
        outcome
    }
}

/// Search box driver: validates keystrokes synchronously and turns accepted
/// input into at most one request per quiet period.
pub struct DebouncedSearch {
    shared: Arc<SharedSearch>,
    commands: mpsc::UnboundedSender<DebounceCommand>,
    delay: Duration,
    worker: JoinHandle<()>,
}

impl DebouncedSearch {
    /// Start the debounce worker on the current Tokio runtime.
    #[must_use]
    pub fn spawn<B>(backend: Arc<B>, delay: Duration) -> Self
    where
        B: MovieBackend + ?Sized + 'static,
    {
        let (updates, _) = watch::channel(SearchState::default());
        let shared = Arc::new(SharedSearch {
            machine: Mutex::new(SearchMachine::new()),
            updates,
        });
        let (commands, receiver) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_debounce(Arc::clone(&shared), backend, receiver));
        Self {
            shared,
            commands,
            delay,
            worker,
        }
    }

    /// Feed the current text of the search box.
    pub fn set_query(&self, raw: &str) -> QueryChange {
        let (change, revision) = self.shared.apply(|machine| {
            let change = machine.set_query(raw);
            (change, machine.revision())
        });
        let command = match &change {
            QueryChange::Schedule(term) => DebounceCommand::Schedule {
                term: term.clone(),
                revision,
                deadline: Instant::now() + self.delay,
            },
            QueryChange::Clear => DebounceCommand::Cancel,
            QueryChange::Rejected => return change,
        };
        if self.commands.send(command).is_err() {
            warn!("search worker stopped; input ignored");
        }
        change
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> SearchState {
        self.shared.updates.borrow().clone()
    }

    /// Receiver notified after every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.updates.subscribe()
    }
}

impl Drop for DebouncedSearch {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_debounce<B>(
    shared: Arc<SharedSearch>,
    backend: Arc<B>,
    mut commands: mpsc::UnboundedReceiver<DebounceCommand>,
) where
    B: MovieBackend + ?Sized + 'static,
{
    let mut pending: Option<(SearchTerm, u64, Instant)> = None;
    loop {
        let deadline = pending.as_ref().map(|(_, _, deadline)| *deadline);
        tokio::select! {
            command = commands.recv() => match command {
                Some(DebounceCommand::Schedule { term, revision, deadline }) => {
                    pending = Some((term, revision, deadline));
                }
                Some(DebounceCommand::Cancel) => pending = None,
                None => break,
            },
            () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some((term, revision, _)) = pending.take() {
                    match shared.apply(|machine| machine.issue_scheduled(term, revision)) {
                        Some(ticket) => {
                            debug!(term = ticket.term().as_str(), "issuing search");
                            spawn_search(Arc::clone(&shared), Arc::clone(&backend), ticket);
                        }
                        None => debug!("input changed before the timer fired; search skipped"),
                    }
                }
            }
        }
    }
}

fn spawn_search<B>(shared: Arc<SharedSearch>, backend: Arc<B>, ticket: SearchTicket)
where
    B: MovieBackend + ?Sized + 'static,
{
    tokio::spawn(async move {
        let result = backend.search_movies(ticket.term()).await;
        if !shared.apply(|machine| machine.complete(&ticket, result)) {
            debug!(term = ticket.term().as_str(), "discarding superseded search response");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::test_support::{StubBackend, movie};

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn search_term_requires_lowercase_letters() {
        assert!(SearchTerm::parse("pete").is_some());
        assert!(SearchTerm::parse("").is_none());
        assert!(SearchTerm::parse("Pete").is_none());
        assert!(SearchTerm::parse("pe te").is_none());
        assert!(SearchTerm::parse("pété").is_none());
    }

    #[test]
    fn rejected_input_keeps_query() {
        let mut machine = SearchMachine::new();
        assert!(matches!(machine.set_query("pet"), QueryChange::Schedule(_)));

        for raw in ["Pete", "pet3", "pet!", "über", "pet e"] {
            assert_eq!(machine.set_query(raw), QueryChange::Rejected);
            assert_eq!(machine.state().query, "pet");
            assert_eq!(
                machine.state().validation_error.as_deref(),
                Some(INVALID_QUERY_MESSAGE)
            );
        }

        assert!(matches!(machine.set_query("pete"), QueryChange::Schedule(_)));
        assert!(machine.state().validation_error.is_none());
    }

    #[test]
    fn empty_and_blank_input_clear_results() {
        let mut machine = SearchMachine::new();
        let ticket = machine.issue(SearchTerm::parse("pete").expect("term"));
        assert!(machine.complete(&ticket, Ok(vec![movie("pete")])));
        assert_eq!(machine.state().results.len(), 1);

        assert_eq!(machine.set_query(""), QueryChange::Clear);
        assert!(machine.state().results.is_empty());

        let ticket = machine.issue(SearchTerm::parse("pete").expect("term"));
        machine.complete(&ticket, Ok(vec![movie("pete")]));
        assert_eq!(machine.set_query("   "), QueryChange::Clear);
        assert!(machine.state().results.is_empty());
        assert!(machine.state().validation_error.is_some());
    }

    #[test]
    fn superseded_response_is_discarded() {
        let mut machine = SearchMachine::new();
        let older = machine.issue(SearchTerm::parse("pet").expect("term"));
        let newer = machine.issue(SearchTerm::parse("pete").expect("term"));

        assert!(machine.complete(&newer, Ok(vec![movie("pete")])));
        assert!(!machine.complete(&older, Ok(vec![movie("pet")])));
        assert_eq!(machine.state().results[0].slug, "pete");
        assert!(!machine.state().loading);
    }

    #[test]
    fn clear_discards_in_flight_response() {
        let mut machine = SearchMachine::new();
        let ticket = machine.issue(SearchTerm::parse("pete").expect("term"));
        machine.set_query("");
        assert!(!machine.complete(&ticket, Ok(vec![movie("pete")])));
        assert!(machine.state().results.is_empty());
    }

    #[test]
    fn timer_for_cleared_input_issues_nothing() {
        let mut machine = SearchMachine::new();
        let QueryChange::Schedule(term) = machine.set_query("pete") else {
            panic!("pete schedules a search");
        };
        let scheduled_at = machine.revision();

        assert_eq!(machine.set_query(""), QueryChange::Clear);
        assert!(machine.issue_scheduled(term.clone(), scheduled_at).is_none());
        assert!(!machine.state().loading);
        assert!(machine.state().query.is_empty());

        assert!(matches!(machine.set_query("pete"), QueryChange::Schedule(_)));
        let rescheduled_at = machine.revision();
        assert_eq!(machine.set_query("   "), QueryChange::Clear);
        assert!(machine.issue_scheduled(term, rescheduled_at).is_none());
        assert!(!machine.state().loading);
    }

    #[test]
    fn rejected_input_keeps_scheduled_search() {
        let mut machine = SearchMachine::new();
        let QueryChange::Schedule(term) = machine.set_query("pet") else {
            panic!("pet schedules a search");
        };
        let scheduled_at = machine.revision();

        assert_eq!(machine.set_query("Pete"), QueryChange::Rejected);
        let ticket = machine
            .issue_scheduled(term, scheduled_at)
            .expect("rejected input leaves the timer valid");
        assert_eq!(ticket.term().as_str(), "pet");
        assert!(machine.state().loading);
    }

    #[test]
    fn failure_clears_results_with_generic_message() {
        let mut machine = SearchMachine::new();
        let first = machine.issue(SearchTerm::parse("pete").expect("term"));
        machine.complete(&first, Ok(vec![movie("pete")]));

        let second = machine.issue(SearchTerm::parse("peter").expect("term"));
        let failure = ClientError::Status {
            operation: "search_movies",
            status: 429,
            detail: None,
        };
        assert!(machine.complete(&second, Err(failure)));
        assert!(machine.state().results.is_empty());
        assert_eq!(
            machine.state().last_error.as_deref(),
            Some(SEARCH_FAILED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn execute_runs_single_request() {
        let backend = StubBackend::default().with_search("pete", vec![movie("pete")]);
        let mut machine = SearchMachine::new();
        let state = machine
            .execute(&backend, SearchTerm::parse("pete").expect("term"))
            .await;
        assert_eq!(state.results.len(), 1);
        assert_eq!(backend.searches(), vec!["pete".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_within_window_issue_one_request() {
        let backend = Arc::new(StubBackend::default().with_search("pete", vec![movie("pete")]));
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));

        for text in ["p", "pe", "pet", "pete"] {
            search.set_query(text);
            tokio::time::sleep(ms(100)).await;
        }
        tokio::time::sleep(ms(1_000)).await;

        assert_eq!(backend.searches(), vec!["pete".to_string()]);
        assert_eq!(search.state().results[0].slug, "pete");
    }

    #[tokio::test(start_paused = true)]
    async fn pet_then_pete_within_window_only_searches_pete() {
        let backend = Arc::new(StubBackend::default());
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));

        search.set_query("pet");
        tokio::time::sleep(ms(300)).await;
        search.set_query("pete");
        tokio::time::sleep(ms(699)).await;
        assert!(backend.searches().is_empty());

        tokio::time::sleep(ms(300)).await;
        assert_eq!(backend.searches(), vec!["pete".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_longer_than_window_issues_each_query() {
        let backend = Arc::new(StubBackend::default());
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));

        search.set_query("pet");
        tokio::time::sleep(ms(800)).await;
        search.set_query("pete");
        tokio::time::sleep(ms(800)).await;

        assert_eq!(
            backend.searches(),
            vec!["pet".to_string(), "pete".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_cancels_pending_timer() {
        let backend = Arc::new(StubBackend::default());
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));

        search.set_query("pete");
        tokio::time::sleep(ms(200)).await;
        assert_eq!(search.set_query(""), QueryChange::Clear);
        tokio::time::sleep(ms(1_000)).await;

        assert!(backend.searches().is_empty());
        assert!(search.state().results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_keystroke_does_not_reschedule() {
        let backend = Arc::new(StubBackend::default());
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));

        search.set_query("pete");
        tokio::time::sleep(ms(500)).await;
        assert_eq!(search.set_query("peteR"), QueryChange::Rejected);
        tokio::time::sleep(ms(250)).await;

        assert_eq!(backend.searches(), vec!["pete".to_string()]);
        let state = search.state();
        assert_eq!(state.query, "pete");
        assert_eq!(state.validation_error.as_deref(), Some(INVALID_QUERY_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_response_does_not_overwrite_newer_results() {
        let backend = Arc::new(
            StubBackend::default()
                .with_search("pet", vec![movie("pet-sematary")])
                .with_search("pete", vec![movie("pete")])
                .with_search_delay("pet", ms(2_000)),
        );
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));

        search.set_query("pet");
        tokio::time::sleep(ms(800)).await;
        search.set_query("pete");
        tokio::time::sleep(ms(800)).await;
        assert_eq!(search.state().results[0].slug, "pete");

        tokio::time::sleep(ms(2_000)).await;
        assert_eq!(
            backend.searches(),
            vec!["pet".to_string(), "pete".to_string()]
        );
        let state = search.state();
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].slug, "pete");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_surfaces_message() {
        let backend = Arc::new(StubBackend::default().failing_search());
        let search = DebouncedSearch::spawn(Arc::clone(&backend), ms(700));
        let mut updates = search.subscribe();

        search.set_query("pete");
        let state = updates
            .wait_for(|state| state.last_error.is_some())
            .await
            .expect("search worker alive")
            .clone();
        assert!(state.results.is_empty());
        assert_eq!(state.last_error.as_deref(), Some(SEARCH_FAILED_MESSAGE));
    }
}
