//! Fallback chain executor.
//!
//! Each adapter's read/search path is a linear chain of named backends,
//! primary first. The executor makes the "try A, fall through to B" control
//! flow explicit and typed instead of scattering broad error swallowing
//! through every adapter:
//!
//! - a step errors, or its output trips the unusable heuristic → next step;
//! - exactly one successful step's result is returned, with the winning
//!   backend recorded in `extra["backend"]`;
//! - a read chain that exhausts every step synthesizes a degraded envelope —
//!   reads never propagate an error past the last fallback;
//! - a search chain may legitimately return an empty list (zero matches is
//!   not a failure); only all-steps-failed becomes `Error::Unavailable`.
//!
//! Steps run strictly in declared order; futures are lazy, so a losing
//! chain never starts the steps after its winner.

use futures_util::future::BoxFuture;
use reachpipe_core::{Error, ReadResult, Result, SearchResult, WARNING_MARKER};

/// Output below this (trimmed chars) is assumed to be an error page or a
/// login wall rather than content.
const MIN_USABLE_CHARS: usize = 50;

const LOGIN_WALL_MARKERS: &[&str] = &[
    "sign in to continue",
    "log in to continue",
    "please log in",
    "login to view",
    "登录后查看",
    "请先登录",
];

pub struct ReadStep<'a> {
    pub backend: &'static str,
    pub run: BoxFuture<'a, Result<ReadResult>>,
}

impl<'a> ReadStep<'a> {
    pub fn new(backend: &'static str, run: BoxFuture<'a, Result<ReadResult>>) -> Self {
        Self { backend, run }
    }
}

pub struct SearchStep<'a> {
    pub backend: &'static str,
    pub run: BoxFuture<'a, Result<Vec<SearchResult>>>,
}

impl<'a> SearchStep<'a> {
    pub fn new(backend: &'static str, run: BoxFuture<'a, Result<Vec<SearchResult>>>) -> Self {
        Self { backend, run }
    }
}

/// Why a step's output was rejected even though it did not error.
pub fn unusable_reason(content: &str) -> Option<&'static str> {
    let trimmed = content.trim();
    if trimmed.chars().count() < MIN_USABLE_CHARS {
        return Some("output too short");
    }
    let lower = trimmed.to_lowercase();
    if LOGIN_WALL_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some("login wall");
    }
    None
}

pub async fn run_read_chain(
    platform: &str,
    url: &str,
    steps: Vec<ReadStep<'_>>,
    exhausted_hint: &str,
) -> ReadResult {
    let mut attempts: Vec<String> = Vec::new();
    for step in steps {
        match step.run.await {
            Ok(result) => {
                if result.is_degraded() {
                    // A backend that only produced an explanation still wins if
                    // it is the last resort; otherwise keep falling through,
                    // carrying its first explanation line into the summary.
                    let why = result
                        .content
                        .trim_start_matches(WARNING_MARKER)
                        .trim()
                        .lines()
                        .next()
                        .unwrap_or("degraded result")
                        .to_string();
                    attempts.push(format!("{}: {why}", step.backend));
                    tracing::debug!(platform, backend = step.backend, "read degraded");
                    continue;
                }
                if let Some(reason) = unusable_reason(&result.content) {
                    attempts.push(format!("{}: {reason}", step.backend));
                    tracing::debug!(platform, backend = step.backend, reason, "read unusable");
                    continue;
                }
                return result.with_extra("backend", serde_json::json!(step.backend));
            }
            Err(e) => {
                attempts.push(format!("{}: {e}", step.backend));
                tracing::debug!(platform, backend = step.backend, error = %e, "read step failed");
            }
        }
    }

    let mut explanation = format!("could not read {url}\n");
    for a in &attempts {
        explanation.push_str(&format!("  - {a}\n"));
    }
    if !exhausted_hint.is_empty() {
        explanation.push('\n');
        explanation.push_str(exhausted_hint);
    }
    ReadResult::degraded(platform, url, platform, explanation.trim_end())
}

pub async fn run_search_chain(
    platform: &str,
    steps: Vec<SearchStep<'_>>,
) -> Result<Vec<SearchResult>> {
    let mut attempts: Vec<String> = Vec::new();
    for step in steps {
        match step.run.await {
            Ok(hits) => {
                // A backend answering "zero matches" is a valid terminal
                // outcome; hits without a resolvable URL are dropped.
                let hits: Vec<SearchResult> =
                    hits.into_iter().filter(|h| !h.url.trim().is_empty()).collect();
                return Ok(hits);
            }
            Err(e) => {
                attempts.push(format!("{}: {e}", step.backend));
                tracing::debug!(platform, backend = step.backend, error = %e, "search step failed");
            }
        }
    }
    Err(Error::Unavailable(format!(
        "{platform} search: every backend failed ({})",
        attempts.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_read(content: &str) -> Result<ReadResult> {
        Ok(ReadResult::new("test", "https://example.com", "T", content))
    }

    const LONG_BODY: &str =
        "A perfectly reasonable article body with more than enough characters to count as content.";

    #[tokio::test]
    async fn failing_primary_falls_through_to_terminal() {
        let steps = vec![
            ReadStep::new("primary", Box::pin(async {
                Err(Error::Fetch("boom".to_string()))
            })),
            ReadStep::new("terminal", Box::pin(async { ok_read(LONG_BODY) })),
        ];
        let r = run_read_chain("test", "https://example.com", steps, "").await;
        assert!(!r.is_degraded());
        assert_eq!(r.content, LONG_BODY);
        assert_eq!(
            r.extra.as_ref().unwrap().get("backend").unwrap(),
            "terminal"
        );
    }

    #[tokio::test]
    async fn first_success_wins_and_later_steps_never_run() {
        use std::sync::atomic::{AtomicBool, Ordering};
        static RAN: AtomicBool = AtomicBool::new(false);
        let steps = vec![
            ReadStep::new("primary", Box::pin(async { ok_read(LONG_BODY) })),
            ReadStep::new("secondary", Box::pin(async {
                RAN.store(true, Ordering::SeqCst);
                ok_read(LONG_BODY)
            })),
        ];
        let r = run_read_chain("test", "https://example.com", steps, "").await;
        assert_eq!(r.extra.as_ref().unwrap().get("backend").unwrap(), "primary");
        assert!(!RAN.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unusable_output_advances_the_chain() {
        let steps = vec![
            ReadStep::new("short", Box::pin(async { ok_read("tiny") })),
            ReadStep::new("walled", Box::pin(async {
                ok_read("Please log in to continue viewing this page which is otherwise empty.")
            })),
            ReadStep::new("good", Box::pin(async { ok_read(LONG_BODY) })),
        ];
        let r = run_read_chain("test", "https://example.com", steps, "").await;
        assert_eq!(r.extra.as_ref().unwrap().get("backend").unwrap(), "good");
    }

    #[tokio::test]
    async fn exhausted_read_chain_degrades_instead_of_erroring() {
        let steps = vec![
            ReadStep::new("a", Box::pin(async { Err(Error::Fetch("x".to_string())) })),
            ReadStep::new("b", Box::pin(async { Err(Error::Tool("y".to_string())) })),
        ];
        let r = run_read_chain("test", "https://example.com", steps, "Install the CLI.").await;
        assert!(r.content.starts_with(WARNING_MARKER));
        assert!(r.content.contains("a: fetch failed: x"));
        assert!(r.content.contains("Install the CLI."));
        assert_eq!(r.platform, "test");
    }

    #[tokio::test]
    async fn degraded_step_explanations_survive_into_the_terminal_envelope() {
        let steps = vec![
            ReadStep::new("mcp", Box::pin(async {
                Ok(ReadResult::degraded(
                    "test",
                    "https://example.com",
                    "T",
                    "needs mcporter + some-mcp server\n  1. npm install -g mcporter",
                ))
            })),
            ReadStep::new("jina", Box::pin(async {
                Err(Error::Fetch("connect refused".to_string()))
            })),
        ];
        let r = run_read_chain("test", "https://example.com", steps, "").await;
        assert!(r.is_degraded());
        assert!(
            r.content.contains("mcp: needs mcporter + some-mcp server"),
            "content: {}",
            r.content
        );
        assert!(r.content.contains("jina: fetch failed: connect refused"));
    }

    #[tokio::test]
    async fn search_chain_empty_list_is_terminal_not_failure() {
        let steps = vec![
            SearchStep::new("primary", Box::pin(async { Ok(Vec::new()) })),
            SearchStep::new("never", Box::pin(async {
                panic!("must not run after a terminal empty result")
            })),
        ];
        let hits = run_search_chain("test", steps).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_chain_drops_empty_url_hits() {
        let steps = vec![SearchStep::new("primary", Box::pin(async {
            Ok(vec![
                SearchResult::new("keep", "https://example.com/a"),
                SearchResult::new("drop", ""),
            ])
        }))];
        let hits = run_search_chain("test", steps).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "keep");
    }

    #[tokio::test]
    async fn search_chain_all_failures_is_unavailable() {
        let steps = vec![
            SearchStep::new("a", Box::pin(async { Err(Error::Tool("gone".to_string())) })),
            SearchStep::new("b", Box::pin(async { Err(Error::Search("down".to_string())) })),
        ];
        let err = run_search_chain("test", steps).await.unwrap_err();
        assert!(matches!(err, Error::Unavailable(_)));
    }
}
