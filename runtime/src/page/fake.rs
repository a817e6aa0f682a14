//! Scripted in-memory tab for tests.
//!
//! Holds a list of documents; a successful click on the next-page control
//! moves to the following document and, like a real navigation, wipes the
//! injected page runtime.

use crate::page::{ChannelError, ClickOutcome, InstallOutcome, LivePage, PageLocation};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Starting `scrollHeight` of every fake document.
pub const BASE_HEIGHT: u64 = 1000;

#[derive(Debug, Clone)]
struct FakeDoc {
    url: String,
    title: String,
    html: String,
}

/// Call counters, for assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub install_calls: usize,
    pub installs: usize,
    pub probes: usize,
    pub html_reads: usize,
    pub scrolls: usize,
    pub clicks: usize,
}

struct FakeState {
    docs: Vec<FakeDoc>,
    current: usize,
    ready_state: String,
    runtime_installed: bool,
    /// Runtime calls that fail as stale before any succeeds.
    stale_calls: usize,
    /// Install attempts that throw.
    failing_installs: usize,
    /// `document_html` calls that throw a script error.
    failing_reads: usize,
    height: u64,
    growth: VecDeque<u64>,
    growth_delay: Duration,
    pending_growth: Option<u64>,
    counters: Counters,
}

pub struct FakePage {
    state: Mutex<FakeState>,
}

impl FakePage {
    /// Pages `(url, html)` visited in order by clicking "next".
    pub fn with_pages(pages: &[(&str, &str)]) -> Self {
        let docs = pages
            .iter()
            .enumerate()
            .map(|(i, (url, html))| FakeDoc {
                url: url.to_string(),
                title: format!("Page {}", i + 1),
                html: html.to_string(),
            })
            .collect();
        Self {
            state: Mutex::new(FakeState {
                docs,
                current: 0,
                ready_state: "complete".to_string(),
                runtime_installed: false,
                stale_calls: 0,
                failing_installs: 0,
                failing_reads: 0,
                height: BASE_HEIGHT,
                growth: VecDeque::new(),
                growth_delay: Duration::ZERO,
                pending_growth: None,
                counters: Counters::default(),
            }),
        }
    }

    pub fn single(html: &str) -> Self {
        Self::with_pages(&[("https://shop.test/list", html)])
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Put the runtime in place without counting an install.
    pub fn install_now(&self) {
        self.lock().runtime_installed = true;
    }

    /// Drop the runtime, as a back/forward cache restore would.
    pub fn evict(&self) {
        self.lock().runtime_installed = false;
    }

    pub fn fail_stale(&self, calls: usize) {
        self.lock().stale_calls = calls;
    }

    pub fn fail_installs(&self, calls: usize) {
        self.lock().failing_installs = calls;
    }

    pub fn fail_reads(&self, calls: usize) {
        self.lock().failing_reads = calls;
    }

    pub fn set_ready_state(&self, ready_state: &str) {
        self.lock().ready_state = ready_state.to_string();
    }

    pub fn set_url(&self, url: &str) {
        let mut state = self.lock();
        let current = state.current;
        state.docs[current].url = url.to_string();
    }

    /// Heights the document grows to after successive scrolls.
    pub fn script_growth(&self, heights: &[u64], delay: Duration) {
        let mut state = self.lock();
        state.growth = heights.iter().copied().collect();
        state.growth_delay = delay;
    }

    pub fn counters(&self) -> Counters {
        self.lock().counters
    }

    pub fn current_page(&self) -> usize {
        self.lock().current
    }

    /// Shared gate for calls that need the page runtime.
    fn runtime_call(state: &mut FakeState) -> Result<(), ChannelError> {
        if state.stale_calls > 0 {
            state.stale_calls -= 1;
            return Err(ChannelError::ReceiverGone);
        }
        if !state.runtime_installed {
            return Err(ChannelError::ReceiverGone);
        }
        Ok(())
    }
}

#[async_trait]
impl LivePage for FakePage {
    async fn location(&self) -> Result<PageLocation, ChannelError> {
        let state = self.lock();
        let doc = &state.docs[state.current];
        Ok(PageLocation {
            url: doc.url.clone(),
            title: doc.title.clone(),
            ready_state: state.ready_state.clone(),
        })
    }

    async fn install_runtime(&self) -> Result<InstallOutcome, ChannelError> {
        let mut state = self.lock();
        state.counters.install_calls += 1;
        if state.failing_installs > 0 {
            state.failing_installs -= 1;
            return Err(ChannelError::Script("Cannot access contents of the page".into()));
        }
        if state.runtime_installed {
            return Ok(InstallOutcome::AlreadyPresent);
        }
        state.runtime_installed = true;
        state.counters.installs += 1;
        Ok(InstallOutcome::Installed)
    }

    async fn runtime_ready(&self) -> Result<(), ChannelError> {
        let mut state = self.lock();
        state.counters.probes += 1;
        Self::runtime_call(&mut state)
    }

    async fn document_html(&self) -> Result<String, ChannelError> {
        let mut state = self.lock();
        Self::runtime_call(&mut state)?;
        state.counters.html_reads += 1;
        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return Err(ChannelError::Script("SecurityError: access denied".into()));
        }
        Ok(state.docs[state.current].html.clone())
    }

    async fn scroll_height(&self) -> Result<u64, ChannelError> {
        let mut state = self.lock();
        Self::runtime_call(&mut state)?;
        Ok(state.height)
    }

    async fn scroll_to_bottom(&self) -> Result<(), ChannelError> {
        let mut state = self.lock();
        Self::runtime_call(&mut state)?;
        state.counters.scrolls += 1;
        state.pending_growth = state.growth.pop_front();
        Ok(())
    }

    async fn wait_for_growth(
        &self,
        baseline: u64,
        idle: Duration,
    ) -> Result<Option<u64>, ChannelError> {
        let (pending, delay) = {
            let mut state = self.lock();
            Self::runtime_call(&mut state)?;
            (state.pending_growth.take(), state.growth_delay)
        };

        match pending {
            Some(height) if height > baseline && delay < idle => {
                tokio::time::sleep(delay).await;
                self.lock().height = height;
                Ok(Some(height))
            }
            _ => {
                tokio::time::sleep(idle).await;
                Ok(None)
            }
        }
    }

    async fn click_next(&self, selector: &str) -> Result<ClickOutcome, ChannelError> {
        let mut state = self.lock();
        Self::runtime_call(&mut state)?;
        let selector = Selector::parse(selector)
            .map_err(|e| ChannelError::Script(format!("invalid selector: {e:?}")))?;

        let outcome = {
            let doc = Html::parse_document(&state.docs[state.current].html);
            match doc.select(&selector).next() {
                None => ClickOutcome::NotFound,
                Some(el) if el.value().attr("hidden").is_some() => ClickOutcome::NotVisible,
                Some(_) => ClickOutcome::Clicked,
            }
        };

        if outcome == ClickOutcome::Clicked {
            state.counters.clicks += 1;
            if state.current + 1 < state.docs.len() {
                state.current += 1;
                state.height = BASE_HEIGHT;
                state.runtime_installed = false;
            }
        }
        Ok(outcome)
    }
}
