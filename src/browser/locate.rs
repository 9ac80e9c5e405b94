//! Element location with an ordered fallback chain of selector candidates.
//!
//! The portal's markup differs across renders, so every lookup runs against
//! a list of candidates tried in order. Each candidate gets its own full
//! wait window; the first present element wins.

use std::future::Future;
use std::time::{Duration, Instant};

use chromiumoxide::element::Element;
use chromiumoxide::Page;
use tokio::time::sleep;
use tracing::debug;

use crate::error::ScraperError;

const LOCATE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Marker attribute used to hand a text-matched node back through a CSS query.
const MATCH_ATTR: &str = "data-locator-match";

/// One way of naming a UI target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Element id attribute.
    Id(String),
    /// CSS selector.
    Css(String),
    /// A `button` whose text content contains the given fragment.
    ButtonText(String),
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Self::Id(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::Css(value.into())
    }

    pub fn button_text(value: impl Into<String>) -> Self {
        Self::ButtonText(value.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::Css(sel) => write!(f, "css={}", sel),
            Locator::ButtonText(text) => write!(f, "button-text={}", text),
        }
    }
}

/// Try `candidates` in order, polling `lookup` until one yields a value or
/// its wait window closes. Windows are independent: a slow first candidate
/// does not eat into the budget of the next one.
pub async fn locate_with<T, F, Fut>(
    candidates: &[Locator],
    wait: Duration,
    mut lookup: F,
) -> Result<T, ScraperError>
where
    F: FnMut(Locator) -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for candidate in candidates {
        let start = Instant::now();
        loop {
            if let Some(found) = lookup(candidate.clone()).await {
                debug!("located element via {}", candidate);
                return Ok(found);
            }
            if start.elapsed() >= wait {
                debug!("candidate {} absent after {:?}", candidate, wait);
                break;
            }
            sleep(LOCATE_POLL_INTERVAL).await;
        }
    }

    let tried = candidates
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(ScraperError::ElementNotFound(tried))
}

/// Resolve the first present element on `page` matching any candidate.
pub async fn locate(
    page: &Page,
    candidates: &[Locator],
    wait: Duration,
) -> Result<Element, ScraperError> {
    locate_with(candidates, wait, |candidate| async move {
        lookup_once(page, &candidate).await
    })
    .await
}

/// Single non-waiting lookup attempt. Zero matches is a normal miss; the
/// CDP error for an absent node is swallowed here and retried by the caller.
async fn lookup_once(page: &Page, candidate: &Locator) -> Option<Element> {
    match candidate {
        Locator::Id(id) => page.find_element(format!("[id='{}']", id)).await.ok(),
        Locator::Css(sel) => page.find_element(sel.as_str()).await.ok(),
        Locator::ButtonText(text) => {
            // No text predicate in CSS: tag the first matching button from
            // inside the page, then fetch it back through the marker.
            let needle = serde_json::to_string(text).ok()?;
            let script = format!(
                r#"
                (() => {{
                    document.querySelectorAll('[{attr}]').forEach(el => el.removeAttribute('{attr}'));
                    const buttons = document.querySelectorAll('button');
                    for (const btn of buttons) {{
                        if (btn.textContent.includes({needle})) {{
                            btn.setAttribute('{attr}', '');
                            return true;
                        }}
                    }}
                    return false;
                }})()
                "#,
                attr = MATCH_ATTR,
                needle = needle,
            );

            let marked = page
                .evaluate(script.as_str())
                .await
                .ok()?
                .into_value::<bool>()
                .unwrap_or(false);
            if !marked {
                return None;
            }
            page.find_element(format!("[{}]", MATCH_ATTR)).await.ok()
        }
    }
}
