//! Infinite-scroll driver.
//!
//! Scrolls to the bottom, then waits up to the idle timeout for the document
//! to grow. Growth resets the idle wait and triggers another scroll, up to
//! the scroll budget. A wait that elapses without growth ends the run.

use crate::page::{ChannelError, LivePage};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollState {
    Scrolling,
    IdleWait,
    Done,
}

/// What a finished scroll run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollReport {
    pub scrolls: u32,
    pub final_height: u64,
    /// True when the run stopped because the scroll budget ran out.
    pub budget_exhausted: bool,
}

/// Drive the page until its height settles or `max_scrolls` is spent.
pub async fn run_infinite_scroll<P: LivePage + ?Sized>(
    page: &P,
    max_scrolls: u32,
    idle: Duration,
) -> Result<ScrollReport, ChannelError> {
    let mut height = page.scroll_height().await?;
    let mut scrolls = 0;
    let mut budget_exhausted = false;
    let mut state = ScrollState::Scrolling;

    while state != ScrollState::Done {
        state = match state {
            ScrollState::Scrolling if scrolls >= max_scrolls => {
                budget_exhausted = true;
                ScrollState::Done
            }
            ScrollState::Scrolling => {
                page.scroll_to_bottom().await?;
                scrolls += 1;
                ScrollState::IdleWait
            }
            ScrollState::IdleWait => match page.wait_for_growth(height, idle).await? {
                Some(grown) => {
                    debug!(from = height, to = grown, scrolls, "document grew");
                    height = grown;
                    ScrollState::Scrolling
                }
                None => ScrollState::Done,
            },
            ScrollState::Done => ScrollState::Done,
        };
    }

    debug!(scrolls, height, budget_exhausted, "scroll run done");
    Ok(ScrollReport {
        scrolls,
        final_height: height,
        budget_exhausted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::fake::FakePage;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_stable_height_stops_after_idle() {
        let page = FakePage::single("<html><body><p>static</p></body></html>");
        page.install_now();

        let started = Instant::now();
        let report = run_infinite_scroll(&page, 10, Duration::from_millis(1000))
            .await
            .unwrap();

        assert_eq!(report.scrolls, 1);
        assert!(!report.budget_exhausted);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1100));
        assert_eq!(page.counters().scrolls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_growth_keeps_scrolling() {
        let page = FakePage::single("<html><body></body></html>");
        page.install_now();
        page.script_growth(&[1500, 2200], Duration::from_millis(200));

        let report = run_infinite_scroll(&page, 10, Duration::from_millis(1000))
            .await
            .unwrap();

        assert_eq!(report.scrolls, 3);
        assert_eq!(report.final_height, 2200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scroll_budget_bounds_run() {
        let page = FakePage::single("<html><body></body></html>");
        page.install_now();
        page.script_growth(&[1100, 1200, 1300, 1400], Duration::from_millis(100));

        let report = run_infinite_scroll(&page, 2, Duration::from_millis(1000))
            .await
            .unwrap();

        assert_eq!(report.scrolls, 2);
        assert!(report.budget_exhausted);
        assert_eq!(report.final_height, 1200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_channel_surfaces() {
        let page = FakePage::single("<html><body></body></html>");
        let err = run_infinite_scroll(&page, 3, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.is_stale());
    }
}
