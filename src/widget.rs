//! Models of the two browser widgets shipped with every site, plus the
//! scripts themselves.
//!
//! Both widgets run on the browser's single-threaded event loop, so the
//! models here are plain state machines driven by events. They own no timers
//! or network handles: [`SearchWidget`] returns an [`Effect`] telling the
//! caller what to schedule, fetch or render.

use crate::search::{render_results, search, SearchEntry, MIN_QUERY_LENGTH};

/// The delay between the last keystroke and running the query.
pub const DEBOUNCE_MS: u64 = 120;

/// The search widget script, written to `static/js/search.js`.
pub const SEARCH_SCRIPT: &str = include_str!("../assets/search.js");

/// The cookie banner script, written to `static/js/cookie-consent.js`.
pub const CONSENT_SCRIPT: &str = include_str!("../assets/cookie-consent.js");

/// Where the scripts are written, relative to the output static directory.
pub const SEARCH_SCRIPT_PATH: &str = "js/search.js";
pub const CONSENT_SCRIPT_PATH: &str = "js/cookie-consent.js";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    /// No query, no results shown.
    Idle,

    /// A keystroke arrived and the debounce timer is pending.
    Debouncing,

    /// The index is being fetched. Only happens for the first query.
    Searching,

    /// Results for the latest query are displayed.
    Rendered,

    /// The index could not be loaded. The widget ignores all further input.
    Inert,
}

/// Identifies a scheduled debounce timer. Only the most recently scheduled
/// timer is live; older ones are ignored when they fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerId(u64);

/// What the caller must do after feeding an event to [`SearchWidget`].
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Nothing to do.
    Nothing,

    /// Schedule a timer that calls [`SearchWidget::on_timer`] after
    /// `delay_ms`. Any earlier timer may be left to fire; it is stale.
    Schedule { timer: TimerId, delay_ms: u64 },

    /// Fetch the index and report back through
    /// [`SearchWidget::on_index_loaded`].
    Fetch,

    /// Empty the results container.
    Clear,

    /// Replace the results container's contents with this HTML.
    Render(String),
}

/// The search index as seen by the widget: fetched at most once per page
/// load and cached for its lifetime.
#[derive(Clone, Debug, PartialEq)]
enum IndexCache {
    Unloaded,
    Loading,
    Ready(Vec<SearchEntry>),
    Failed,
}

/// The search widget state machine.
pub struct SearchWidget {
    state: SearchState,
    index: IndexCache,

    /// Bumped on every keystroke; a timer is live iff it carries this value.
    generation: u64,

    /// The latest input.
    query: String,
}

impl Default for SearchWidget {
    fn default() -> Self {
        SearchWidget {
            state: SearchState::Idle,
            index: IndexCache::Unloaded,
            generation: 0,
            query: String::new(),
        }
    }
}

impl SearchWidget {
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Handles an input event. Supersedes any pending timer.
    pub fn on_input(&mut self, query: &str) -> Effect {
        if self.state == SearchState::Inert {
            return Effect::Nothing;
        }
        self.generation += 1;
        self.query = query.to_owned();
        if self.state != SearchState::Searching {
            self.state = SearchState::Debouncing;
        }
        Effect::Schedule {
            timer: TimerId(self.generation),
            delay_ms: DEBOUNCE_MS,
        }
    }

    /// Handles a debounce timer firing.
    pub fn on_timer(&mut self, timer: TimerId) -> Effect {
        if self.state == SearchState::Inert || timer != TimerId(self.generation) {
            return Effect::Nothing;
        }

        if self.query.trim().chars().count() < MIN_QUERY_LENGTH {
            if self.state != SearchState::Searching {
                self.state = SearchState::Idle;
            }
            return Effect::Clear;
        }

        match self.index {
            IndexCache::Ready(ref entries) => {
                let html = render_results(&search(entries, &self.query));
                self.state = SearchState::Rendered;
                Effect::Render(html)
            }
            IndexCache::Unloaded => {
                self.index = IndexCache::Loading;
                self.state = SearchState::Searching;
                Effect::Fetch
            }
            // The fetch in flight will render the latest query.
            IndexCache::Loading => {
                self.state = SearchState::Searching;
                Effect::Nothing
            }
            IndexCache::Failed => Effect::Nothing,
        }
    }

    /// Handles the completion of the index fetch. Failures (network errors,
    /// non-OK responses, malformed JSON) make the widget inert for the rest
    /// of the page load; nothing is shown and nothing is retried.
    pub fn on_index_loaded<E>(&mut self, result: Result<Vec<SearchEntry>, E>) -> Effect {
        match result {
            Err(_) => {
                self.index = IndexCache::Failed;
                self.state = SearchState::Inert;
                Effect::Nothing
            }
            Ok(entries) => {
                self.index = IndexCache::Ready(entries);
                if self.state != SearchState::Searching {
                    return Effect::Nothing;
                }
                // Input may have changed while the fetch was in flight.
                match self.query.trim().chars().count() < MIN_QUERY_LENGTH {
                    true => {
                        self.state = SearchState::Idle;
                        Effect::Clear
                    }
                    false => {
                        self.state = SearchState::Debouncing;
                        self.on_timer(TimerId(self.generation))
                    }
                }
            }
        }
    }
}

/// Persists the visitor's cookie consent, e.g. in `localStorage`.
pub trait ConsentStore {
    fn acknowledged(&self) -> bool;
    fn acknowledge(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsentState {
    /// The banner is shown.
    Unacknowledged,

    /// The banner is hidden for good.
    Acknowledged,
}

/// The cookie consent banner. There is no way back from
/// [`ConsentState::Acknowledged`].
pub struct ConsentBanner<S> {
    store: S,
}

impl<S: ConsentStore> ConsentBanner<S> {
    pub fn new(store: S) -> Self {
        ConsentBanner { store }
    }

    pub fn state(&self) -> ConsentState {
        match self.store.acknowledged() {
            true => ConsentState::Acknowledged,
            false => ConsentState::Unacknowledged,
        }
    }

    pub fn banner_visible(&self) -> bool {
        self.state() == ConsentState::Unacknowledged
    }

    /// Handles a click on the accept button.
    pub fn accept(&mut self) {
        if !self.store.acknowledged() {
            self.store.acknowledge();
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn index() -> Vec<SearchEntry> {
        vec![SearchEntry {
            title: "1976 Bicentennial Quarter Value".to_owned(),
            description: "<b>drummer boy</b>".to_owned(),
            tags: "quarters,1976".to_owned(),
            url: "/1976-bicentennial-quarter-value/".to_owned(),
        }]
    }

    fn scheduled(effect: Effect) -> TimerId {
        match effect {
            Effect::Schedule { timer, delay_ms } => {
                assert_eq!(DEBOUNCE_MS, delay_ms);
                timer
            }
            other => panic!("expected a timer, got {:?}", other),
        }
    }

    #[test]
    fn test_first_query_fetches_then_renders() {
        let mut widget = SearchWidget::default();
        assert_eq!(SearchState::Idle, widget.state());

        let timer = scheduled(widget.on_input("quarter"));
        assert_eq!(SearchState::Debouncing, widget.state());
        assert_eq!(Effect::Fetch, widget.on_timer(timer));
        assert_eq!(SearchState::Searching, widget.state());

        match widget.on_index_loaded::<()>(Ok(index())) {
            Effect::Render(html) => {
                assert!(html.contains("/1976-bicentennial-quarter-value/"));
                assert!(html.contains("&lt;b&gt;drummer boy&lt;/b&gt;"));
            }
            other => panic!("expected results, got {:?}", other),
        }
        assert_eq!(SearchState::Rendered, widget.state());

        // The index is cached: later queries don't fetch again.
        let timer = scheduled(widget.on_input("1976"));
        assert!(matches!(widget.on_timer(timer), Effect::Render(_)));
    }

    #[test]
    fn test_new_input_supersedes_pending_timer() {
        let mut widget = SearchWidget::default();
        widget.on_index_loaded::<()>(Ok(index()));

        let stale = scheduled(widget.on_input("qu"));
        let live = scheduled(widget.on_input("xyz"));
        assert_eq!(Effect::Nothing, widget.on_timer(stale));
        assert_eq!(Effect::Render(String::new()), widget.on_timer(live));
    }

    #[test]
    fn test_short_query_returns_to_idle() {
        let mut widget = SearchWidget::default();
        widget.on_index_loaded::<()>(Ok(index()));

        let timer = scheduled(widget.on_input("quarter"));
        assert!(matches!(widget.on_timer(timer), Effect::Render(_)));

        let timer = scheduled(widget.on_input("q"));
        assert_eq!(Effect::Clear, widget.on_timer(timer));
        assert_eq!(SearchState::Idle, widget.state());
    }

    #[test]
    fn test_fetch_failure_makes_widget_inert() {
        let mut widget = SearchWidget::default();
        let timer = scheduled(widget.on_input("quarter"));
        assert_eq!(Effect::Fetch, widget.on_timer(timer));
        assert_eq!(Effect::Nothing, widget.on_index_loaded(Err("404 Not Found")));
        assert_eq!(SearchState::Inert, widget.state());

        assert_eq!(Effect::Nothing, widget.on_input("quarter"));
        assert_eq!(Effect::Nothing, widget.on_timer(timer));
    }

    #[test]
    fn test_query_typed_during_fetch_is_rendered() {
        let mut widget = SearchWidget::default();
        let timer = scheduled(widget.on_input("xyz"));
        assert_eq!(Effect::Fetch, widget.on_timer(timer));

        let timer = scheduled(widget.on_input("1976"));
        assert_eq!(Effect::Nothing, widget.on_timer(timer));

        match widget.on_index_loaded::<()>(Ok(index())) {
            Effect::Render(html) => assert!(html.contains("1976 Bicentennial")),
            other => panic!("expected results, got {:?}", other),
        }
    }

    #[derive(Default)]
    struct MemoryStore(bool);

    impl ConsentStore for &mut MemoryStore {
        fn acknowledged(&self) -> bool {
            self.0
        }
        fn acknowledge(&mut self) {
            self.0 = true;
        }
    }

    #[test]
    fn test_script_counts_query_characters() {
        assert!(SEARCH_SCRIPT.contains(&format!("var MIN_QUERY_LENGTH = {};", MIN_QUERY_LENGTH)));
        assert!(SEARCH_SCRIPT.contains("Array.from(query).length < MIN_QUERY_LENGTH"));
        assert!(SEARCH_SCRIPT.contains("Array.from(latest).length < MIN_QUERY_LENGTH"));
        assert!(!SEARCH_SCRIPT.contains("query.length <"));
    }

    #[test]
    fn test_consent_is_persisted() {
        let mut store = MemoryStore::default();
        {
            let mut banner = ConsentBanner::new(&mut store);
            assert!(banner.banner_visible());
            banner.accept();
            assert_eq!(ConsentState::Acknowledged, banner.state());
        }
        // A later page load sees the persisted flag.
        let banner = ConsentBanner::new(&mut store);
        assert!(!banner.banner_visible());
    }
}
