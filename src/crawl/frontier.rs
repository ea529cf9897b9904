// src/crawl/frontier.rs
// =============================================================================
// The frontier is the only shared mutable state of a crawl.
//
// It holds:
// - queue: URLs waiting to be fetched (FIFO, so the crawl is roughly BFS)
// - seen: the canonical key of every URL ever queued; checked when queueing,
//   not when fetching, so two workers can never fetch the same page. The
//   queue keeps the URL as discovered, which is what gets requested.
// - pages: the recorded results
// - in_flight: how many URLs have been handed out but not completed
//
// Everything sits behind one tokio Mutex. try_enqueue, record_page and the
// termination check all happen under that lock, which keeps "at most once
// fetched" and "never more than `limit` pages" exact with many workers.
//
// Workers that find the queue empty while siblings are still busy wait on a
// Notify instead of exiting: a sibling may still discover new links.
// =============================================================================

use super::scope::canonical_key;
use super::{Page, PageMap};
use std::collections::{HashSet, VecDeque};
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use url::Url;

/// Where the crawl is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// URLs are queued or being fetched.
    Running,
    /// Queue is empty; waiting for in-flight fetches that may add more.
    Draining,
    /// The page limit was hit. Nothing new is handed out or recorded.
    LimitReached,
    /// Queue empty and no worker busy.
    Done,
    /// Stopped from outside.
    Cancelled,
}

impl Phase {
    /// No more URLs will be handed out in this phase.
    pub fn is_closed(self) -> bool {
        matches!(self, Phase::LimitReached | Phase::Done | Phase::Cancelled)
    }
}

/// Result of trying to record a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Added,
    Duplicate,
    /// The ceiling was already reached; the page was discarded.
    OverLimit,
}

#[derive(Debug)]
struct State {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
    pages: PageMap,
    in_flight: usize,
    phase: Phase,
}

impl State {
    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            debug!("Crawl phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

#[derive(Debug)]
pub struct Frontier {
    state: Mutex<State>,
    changed: Notify,
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                seen: HashSet::new(),
                pages: PageMap::default(),
                in_flight: 0,
                phase: Phase::Running,
            }),
            changed: Notify::new(),
        }
    }

    /// Queues `url` if no URL with the same canonical key has been seen.
    ///
    /// Returns true only for the call that actually added it. Once the crawl
    /// is closed (limit, done, cancelled) nothing is accepted.
    pub async fn try_enqueue(&self, url: Url) -> bool {
        let mut state = self.state.lock().await;
        if state.phase.is_closed() {
            return false;
        }
        if !state.seen.insert(canonical_key(&url)) {
            return false;
        }

        state.queue.push_back(url);
        state.set_phase(Phase::Running);
        drop(state);

        self.changed.notify_waiters();
        true
    }

    /// Hands out the next URL, waiting while the queue is empty but other
    /// workers are still fetching.
    ///
    /// Returns None once the crawl is over. Every Some(url) must be paired
    /// with a later call to `complete()`.
    pub async fn dequeue(&self) -> Option<Url> {
        loop {
            // Register interest before looking at the state, so a
            // notify_waiters() between the check and the await isn't lost.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.phase.is_closed() {
                    return None;
                }

                if let Some(url) = state.queue.pop_front() {
                    state.in_flight += 1;
                    return Some(url);
                }

                if state.in_flight == 0 {
                    state.set_phase(Phase::Done);
                    drop(state);
                    self.changed.notify_waiters();
                    return None;
                }

                state.set_phase(Phase::Draining);
            }

            notified.await;
        }
    }

    /// Marks one dequeued URL as fully processed (links already queued).
    pub async fn complete(&self) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 && state.queue.is_empty() && !state.phase.is_closed() {
            state.set_phase(Phase::Done);
        }
        drop(state);

        self.changed.notify_waiters();
    }

    /// Records a page, respecting an optional hard ceiling on page count.
    ///
    /// The size check and the insert happen under the same lock. Recording
    /// the page that hits the ceiling moves the crawl to LimitReached.
    pub async fn record_page(&self, page: Page, limit: Option<usize>) -> Recorded {
        let mut state = self.state.lock().await;

        if limit.is_some_and(|max| state.pages.len() >= max) {
            return Recorded::OverLimit;
        }
        if state.phase == Phase::Cancelled {
            return Recorded::OverLimit;
        }
        if !state.pages.insert(page) {
            return Recorded::Duplicate;
        }

        if limit.is_some_and(|max| state.pages.len() >= max) {
            state.set_phase(Phase::LimitReached);
            drop(state);
            self.changed.notify_waiters();
        }

        Recorded::Added
    }

    /// Number of recorded pages.
    pub async fn size(&self) -> usize {
        self.state.lock().await.pages.len()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.phase
    }

    /// Stops handing out URLs. Pages already recorded are kept.
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        if state.phase != Phase::Done {
            state.set_phase(Phase::Cancelled);
        }
        drop(state);

        self.changed.notify_waiters();
    }

    /// Takes the recorded pages out, leaving the frontier empty.
    pub async fn take_pages(&self) -> PageMap {
        std::mem::take(&mut self.state.lock().await.pages)
    }
}
