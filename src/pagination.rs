//! Incremental list loading over an opaque "next page" cursor.
//!
//! A listing starts from a first-page path, and every response may carry a
//! cursor for the following page. The cursor is handed back to the source
//! verbatim; callers never build or parse it. Items only ever get appended, in
//! arrival order.
//!
//! Each fetch is tagged with the generation it was issued for. `load_first`
//! and `close` start a new generation, so a response that arrives after a
//! refetch or after teardown is dropped instead of being merged into newer state.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppResult;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_url: Option<String>,
    pub message: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_url: Option<&str>) -> Self {
        Self { items, next_page_url: next_page_url.map(str::to_string), message: None }
    }
}

#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// First page of a listing, addressed by its endpoint path.
    async fn fetch_first(&self, path: &str) -> AppResult<Page<T>>;
    /// Follow a cursor exactly as the previous page returned it.
    async fn fetch_page(&self, cursor: &str) -> AppResult<Page<T>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Appended { added: usize },
    /// A load for this listing is already in flight.
    Busy,
    /// No cursor; the listing is complete.
    Exhausted,
    /// The listing was refetched or closed while this load was in flight.
    Stale,
}

struct CursorState<T> {
    items: Vec<T>,
    next: Option<String>,
    generation: u64,
    busy: bool,
    closed: bool,
}

pub struct Paginator<T> {
    state: Mutex<CursorState<T>>,
}

// Clears the busy flag when the load ends, including when its future is dropped.
struct BusyRelease<'a, T> {
    state: &'a Mutex<CursorState<T>>,
    generation: u64,
}

impl<T> Drop for BusyRelease<'_, T> {
    fn drop(&mut self) {
        let mut st = self.state.lock();
        if st.generation == self.generation {
            st.busy = false;
        }
    }
}

fn normalize_cursor(next: Option<String>) -> Option<String> {
    next.filter(|c| !c.trim().is_empty())
}

impl<T: Send> Default for Paginator<T> {
    fn default() -> Self { Self::new() }
}

impl<T: Send> Paginator<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CursorState { items: Vec::new(), next: None, generation: 0, busy: false, closed: false }),
        }
    }

    /// Fetch the first page and replace whatever was loaded before.
    /// Returns the server's `message`, if any. On failure the previous items stay.
    pub async fn load_first(&self, source: &dyn PageSource<T>, path: &str) -> AppResult<Option<String>> {
        let generation = {
            let mut st = self.state.lock();
            st.generation += 1;
            st.busy = true;
            st.closed = false;
            st.generation
        };
        let release = BusyRelease { state: &self.state, generation };
        let page = source.fetch_first(path).await?;
        let applied = {
            let mut st = self.state.lock();
            if st.closed || st.generation != generation {
                false
            } else {
                st.items = page.items;
                st.next = normalize_cursor(page.next_page_url);
                debug!(target: "pagination", path, loaded = st.items.len(), more = st.next.is_some(), "first page");
                true
            }
        };
        drop(release);
        if !applied {
            debug!(target: "pagination", path, "discarding first page for a superseded listing");
        }
        Ok(page.message)
    }

    /// Follow the stored cursor and append the next page.
    /// Failures leave items and cursor exactly as they were.
    pub async fn load_more(&self, source: &dyn PageSource<T>) -> AppResult<LoadOutcome> {
        let (cursor, generation) = {
            let mut st = self.state.lock();
            if st.closed {
                return Ok(LoadOutcome::Stale);
            }
            if st.busy {
                debug!(target: "pagination", "load already in flight; ignoring");
                return Ok(LoadOutcome::Busy);
            }
            let Some(cursor) = st.next.clone() else { return Ok(LoadOutcome::Exhausted) };
            st.busy = true;
            (cursor, st.generation)
        };
        let release = BusyRelease { state: &self.state, generation };
        let page = source.fetch_page(&cursor).await?;
        let outcome = {
            let mut st = self.state.lock();
            if st.closed || st.generation != generation || st.next.as_deref() != Some(cursor.as_str()) {
                debug!(target: "pagination", cursor = %cursor, "discarding stale page");
                LoadOutcome::Stale
            } else {
                let added = page.items.len();
                st.items.extend(page.items);
                st.next = normalize_cursor(page.next_page_url);
                debug!(target: "pagination", cursor = %cursor, added, more = st.next.is_some(), "appended page");
                LoadOutcome::Appended { added }
            }
        };
        drop(release);
        Ok(outcome)
    }

    /// Whether a "load more" affordance should exist at all.
    pub fn has_more(&self) -> bool {
        let st = self.state.lock();
        !st.closed && st.next.is_some()
    }

    pub fn next_cursor(&self) -> Option<String> { self.state.lock().next.clone() }

    pub fn is_busy(&self) -> bool { self.state.lock().busy }

    pub fn len(&self) -> usize { self.state.lock().items.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        let st = self.state.lock();
        f(&st.items)
    }

    /// Edit loaded items in place, e.g. after the server confirmed a status change.
    /// Returns how many items matched.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, mut f: impl FnMut(&mut T)) -> usize {
        let mut st = self.state.lock();
        let mut n = 0;
        for item in st.items.iter_mut().filter(|i| pred(i)) {
            f(item);
            n += 1;
        }
        n
    }

    /// Teardown: in-flight results will be ignored from now on.
    pub fn close(&self) {
        let mut st = self.state.lock();
        st.closed = true;
        st.generation += 1;
        st.busy = false;
    }

    pub fn is_closed(&self) -> bool { self.state.lock().closed }
}

impl<T: Clone + Send> Paginator<T> {
    pub fn items(&self) -> Vec<T> { self.state.lock().items.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    struct MapSource {
        first: Page<String>,
        pages: HashMap<String, Page<String>>,
        failing: Mutex<bool>,
    }

    impl MapSource {
        fn two_pages() -> Self {
            let mut pages = HashMap::new();
            pages.insert("/p2".to_string(), Page::new(vec!["C".to_string()], None));
            Self {
                first: Page::new(vec!["A".to_string(), "B".to_string()], Some("/p2")),
                pages,
                failing: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl PageSource<String> for MapSource {
        async fn fetch_first(&self, _path: &str) -> AppResult<Page<String>> { Ok(self.first.clone()) }

        async fn fetch_page(&self, cursor: &str) -> AppResult<Page<String>> {
            if *self.failing.lock() {
                return Err(AppError::from_status(500, Some("Error load more".into())));
            }
            self.pages.get(cursor).cloned().ok_or_else(|| AppError::from_status(404, None))
        }
    }

    // Holds every fetch until a permit is released.
    struct GatedSource {
        gate: Semaphore,
        inner: MapSource,
    }

    #[async_trait]
    impl PageSource<String> for GatedSource {
        async fn fetch_first(&self, path: &str) -> AppResult<Page<String>> { self.inner.fetch_first(path).await }

        async fn fetch_page(&self, cursor: &str) -> AppResult<Page<String>> {
            let permit = self.gate.acquire().await.expect("gate open");
            permit.forget();
            self.inner.fetch_page(cursor).await
        }
    }

    async fn wait_busy(p: &Paginator<String>) {
        while !p.is_busy() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn pages_concatenate_in_order_and_cursor_runs_out() {
        let src = MapSource::two_pages();
        let p: Paginator<String> = Paginator::new();
        p.load_first(&src, "/orders").await.unwrap();
        assert_eq!(p.items(), vec!["A", "B"]);
        assert!(p.has_more());

        assert_eq!(p.load_more(&src).await.unwrap(), LoadOutcome::Appended { added: 1 });
        assert_eq!(p.items(), vec!["A", "B", "C"]);
        assert!(!p.has_more());
        assert_eq!(p.load_more(&src).await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(p.len(), 3);
    }

    #[tokio::test]
    async fn empty_cursor_means_no_more_pages() {
        let mut src = MapSource::two_pages();
        src.first.next_page_url = Some(String::new());
        let p: Paginator<String> = Paginator::new();
        p.load_first(&src, "/orders").await.unwrap();
        assert!(!p.has_more());
        assert_eq!(p.next_cursor(), None);
    }

    #[tokio::test]
    async fn failed_page_leaves_state_untouched_and_can_retry() {
        let src = MapSource::two_pages();
        let p: Paginator<String> = Paginator::new();
        p.load_first(&src, "/orders").await.unwrap();
        *src.failing.lock() = true;

        let err = p.load_more(&src).await.unwrap_err();
        assert_eq!(err.server_message(), Some("Error load more"));
        assert_eq!(p.items(), vec!["A", "B"]);
        assert_eq!(p.next_cursor().as_deref(), Some("/p2"));
        assert!(!p.is_busy());

        *src.failing.lock() = false;
        assert_eq!(p.load_more(&src).await.unwrap(), LoadOutcome::Appended { added: 1 });
    }

    #[tokio::test]
    async fn second_load_while_pending_is_a_no_op() {
        let src = Arc::new(GatedSource { gate: Semaphore::new(0), inner: MapSource::two_pages() });
        let p: Arc<Paginator<String>> = Arc::new(Paginator::new());
        p.load_first(&*src, "/orders").await.unwrap();

        let first = {
            let (p, src) = (p.clone(), src.clone());
            tokio::spawn(async move { p.load_more(&*src).await })
        };
        wait_busy(&p).await;
        assert_eq!(p.load_more(&*src).await.unwrap(), LoadOutcome::Busy);

        src.gate.add_permits(1);
        assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Appended { added: 1 });
        assert_eq!(p.items(), vec!["A", "B", "C"]);
        assert!(!p.is_busy());
    }

    #[tokio::test]
    async fn response_for_refetched_listing_is_discarded() {
        let src = Arc::new(GatedSource { gate: Semaphore::new(0), inner: MapSource::two_pages() });
        let p: Arc<Paginator<String>> = Arc::new(Paginator::new());
        p.load_first(&*src, "/orders").await.unwrap();

        let pending = {
            let (p, src) = (p.clone(), src.clone());
            tokio::spawn(async move { p.load_more(&*src).await })
        };
        wait_busy(&p).await;

        let fresh = MapSource {
            first: Page::new(vec!["X".to_string()], None),
            pages: HashMap::new(),
            failing: Mutex::new(false),
        };
        p.load_first(&fresh, "/orders").await.unwrap();

        src.gate.add_permits(1);
        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Stale);
        assert_eq!(p.items(), vec!["X"]);
        assert!(!p.has_more());
    }

    #[tokio::test]
    async fn closed_listing_ignores_in_flight_results() {
        let src = Arc::new(GatedSource { gate: Semaphore::new(0), inner: MapSource::two_pages() });
        let p: Arc<Paginator<String>> = Arc::new(Paginator::new());
        p.load_first(&*src, "/orders").await.unwrap();

        let pending = {
            let (p, src) = (p.clone(), src.clone());
            tokio::spawn(async move { p.load_more(&*src).await })
        };
        wait_busy(&p).await;
        p.close();
        src.gate.add_permits(1);

        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Stale);
        assert_eq!(p.items(), vec!["A", "B"]);
        assert!(!p.has_more());
        assert_eq!(p.load_more(&*src).await.unwrap(), LoadOutcome::Stale);
    }

    #[tokio::test]
    async fn dropped_load_releases_busy_flag() {
        let src = GatedSource { gate: Semaphore::new(0), inner: MapSource::two_pages() };
        let p: Paginator<String> = Paginator::new();
        p.load_first(&src, "/orders").await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(20), p.load_more(&src)).await;
        assert!(timed_out.is_err());
        assert!(!p.is_busy());
        assert_eq!(p.items(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn update_where_edits_matching_items() {
        let src = MapSource::two_pages();
        let p: Paginator<String> = Paginator::new();
        p.load_first(&src, "/orders").await.unwrap();
        let n = p.update_where(|s| s == "B", |s| s.push('!'));
        assert_eq!(n, 1);
        assert_eq!(p.items(), vec!["A", "B!"]);
    }
}
