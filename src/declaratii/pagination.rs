//! Pagination over the results table.
//!
//! Each advance locates the paginator's "next" control, activates it, lets
//! the new render settle, and re-extracts. A missing or disabled control is
//! the normal end of the result set; an advance that extracts zero rows also
//! ends the loop so a misbehaving paginator cannot spin forever.

use std::future::Future;
use std::time::Duration;

use chromiumoxide::Page;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::ScraperError;

use super::extract;
use super::types::ResultRow;

/// Post-advance settle window, randomized to look less mechanical.
const ADVANCE_SETTLE_SECS: (f64, f64) = (3.0, 5.0);

const NEXT_CONTROL_PROBE: &str = r#"
(() => {
    const btn = document.querySelector('button.mat-mdc-paginator-navigation-next');
    if (!btn) return 'none';
    if (btn.disabled || btn.classList.contains('mat-mdc-button-disabled')) return 'disabled';
    return 'enabled';
})()
"#;

const NEXT_CONTROL_CLICK: &str = r#"
(() => {
    const btn = document.querySelector('button.mat-mdc-paginator-navigation-next');
    if (!btn) return false;
    btn.click();
    return true;
})()
"#;

/// Observed state of the "next page" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextControl {
    /// No paginator rendered: first page is also the last.
    Absent,
    Disabled,
    Enabled,
}

/// One pagination step over abstract page operations. Returns the next
/// page's rows, or `None` when the result set is exhausted.
pub async fn advance_with<P, PFut, A, AFut, E, EFut>(
    probe: P,
    activate: A,
    extract: E,
) -> Result<Option<Vec<ResultRow>>, ScraperError>
where
    P: FnOnce() -> PFut,
    PFut: Future<Output = Result<NextControl, ScraperError>>,
    A: FnOnce() -> AFut,
    AFut: Future<Output = Result<(), ScraperError>>,
    E: FnOnce() -> EFut,
    EFut: Future<Output = Result<Vec<ResultRow>, ScraperError>>,
{
    match probe().await? {
        NextControl::Absent => {
            debug!("no paginator on page, treating as last page");
            Ok(None)
        }
        NextControl::Disabled => {
            debug!("next-page control disabled, last page reached");
            Ok(None)
        }
        NextControl::Enabled => {
            activate().await?;
            let rows = extract().await?;
            if rows.is_empty() {
                // A page that renders nothing terminates the loop instead of
                // looping on a control that never disables.
                info!("advanced to an empty page, stopping pagination");
                Ok(None)
            } else {
                Ok(Some(rows))
            }
        }
    }
}

/// Pagination bound to a live page.
pub struct Paginator {
    table_wait: Duration,
}

impl Paginator {
    pub fn new(table_wait: Duration) -> Self {
        Self { table_wait }
    }

    /// Advance to the next results page, if any.
    pub async fn advance(&self, page: &Page) -> Result<Option<Vec<ResultRow>>, ScraperError> {
        advance_with(
            || probe_next_control(page),
            || activate_next(page),
            || extract::extract_current_page(page, self.table_wait),
        )
        .await
    }
}

async fn probe_next_control(page: &Page) -> Result<NextControl, ScraperError> {
    let state = page
        .evaluate(NEXT_CONTROL_PROBE)
        .await
        .map_err(|e| ScraperError::JavaScript(e.to_string()))?
        .into_value::<String>()
        .unwrap_or_else(|_| "none".to_string());

    Ok(match state.as_str() {
        "enabled" => NextControl::Enabled,
        "disabled" => NextControl::Disabled,
        _ => NextControl::Absent,
    })
}

async fn activate_next(page: &Page) -> Result<(), ScraperError> {
    let clicked = page
        .evaluate(NEXT_CONTROL_CLICK)
        .await
        .map_err(|e| ScraperError::JavaScript(e.to_string()))?
        .into_value::<bool>()
        .unwrap_or(false);

    if !clicked {
        return Err(ScraperError::ElementNotFound(
            "next-page control vanished before click".into(),
        ));
    }

    let settle = {
        let mut rng = rand::thread_rng();
        rng.gen_range(ADVANCE_SETTLE_SECS.0..=ADVANCE_SETTLE_SECS.1)
    };
    debug!("settling {:.1}s after page advance", settle);
    sleep(Duration::from_secs_f64(settle)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows(count: usize) -> Vec<ResultRow> {
        (0..count)
            .map(|i| ResultRow {
                subject_name: format!("Nume {}", i),
                institution: "Primaria".into(),
                position: "Consilier".into(),
                city: "Cluj-Napoca".into(),
                county: "Cluj".into(),
                declaration_date: "01.02.2023".into(),
                declaration_type: "Avere".into(),
                has_download: false,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_absent_control_means_single_page() {
        let advanced = advance_with(
            || async { Ok(NextControl::Absent) },
            || async { panic!("must not activate") },
            || async { panic!("must not extract") },
        )
        .await
        .unwrap();
        assert!(advanced.is_none());
    }

    #[tokio::test]
    async fn test_disabled_control_ends_the_loop() {
        let advanced = advance_with(
            || async { Ok(NextControl::Disabled) },
            || async { panic!("must not activate") },
            || async { panic!("must not extract") },
        )
        .await
        .unwrap();
        assert!(advanced.is_none());
    }

    #[tokio::test]
    async fn test_enabled_control_yields_next_page() {
        let advanced = advance_with(
            || async { Ok(NextControl::Enabled) },
            || async { Ok(()) },
            || async { Ok(sample_rows(2)) },
        )
        .await
        .unwrap();
        assert_eq!(advanced.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_extraction_forces_termination() {
        let advanced = advance_with(
            || async { Ok(NextControl::Enabled) },
            || async { Ok(()) },
            || async { Ok(Vec::new()) },
        )
        .await
        .unwrap();
        assert!(advanced.is_none());
    }

    #[tokio::test]
    async fn test_finite_page_sequence_terminates() {
        // Three pages: two live advances, then a disabled control.
        let script = [
            (NextControl::Enabled, sample_rows(3)),
            (NextControl::Enabled, sample_rows(1)),
            (NextControl::Disabled, Vec::new()),
        ];

        let mut transitions = 0;
        let mut pages_seen = 1;
        for (state, rows) in script {
            transitions += 1;
            let advanced = advance_with(
                || async move { Ok(state) },
                || async { Ok(()) },
                || {
                    let rows = rows.clone();
                    async move { Ok(rows) }
                },
            )
            .await
            .unwrap();

            match advanced {
                Some(rows) => {
                    pages_seen += 1;
                    assert!(!rows.is_empty());
                }
                None => break,
            }
        }

        assert_eq!(pages_seen, 3);
        assert!(transitions <= 3);
    }
}
