//! Ordered retry-with-fallback driver
//!
//! A chain is a list of named attempts evaluated in order until one
//! succeeds. Attempts are lazy: an attempt's future is only built when the
//! driver reaches it, so skipped steps cost nothing. The provider router,
//! the embedding generator and the retrieval fallback chain all run on
//! this one primitive.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::time::Instant;

/// Why an attempt did not produce a value
#[derive(Debug, Clone)]
pub enum AttemptError<E> {
    /// Not tried at all (cooldown, rate limit, missing input)
    Skipped(String),
    /// Tried and failed
    Failed(E),
}

type AttemptFn<'a, T, E> = Box<dyn FnOnce() -> BoxFuture<'a, Result<T, AttemptError<E>>> + Send + 'a>;

/// A single named step in a chain
pub struct Attempt<'a, T, E> {
    name: String,
    run: AttemptFn<'a, T, E>,
}

impl<'a, T, E> Attempt<'a, T, E> {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, AttemptError<E>>> + Send + 'a,
    {
        Self {
            name: name.into(),
            run: Box::new(move || Box::pin(f())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Winning attempt
#[derive(Debug)]
pub struct Success<T, E> {
    pub name: String,
    pub value: T,
    /// Failures seen before the winner, in order
    pub failures: Vec<(String, E)>,
    pub skipped: Vec<String>,
}

/// Outcome of a chain where nothing succeeded
#[derive(Debug)]
pub struct Exhausted<E> {
    pub failures: Vec<(String, E)>,
    pub skipped: Vec<String>,
}

impl<E> Exhausted<E> {
    /// Number of attempts that actually ran
    pub fn attempts(&self) -> usize {
        self.failures.len()
    }
}

impl<E> Default for Exhausted<E> {
    fn default() -> Self {
        Self {
            failures: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Run attempts in order, returning the first success
pub async fn first_success<'a, T, E>(
    chain: &str,
    attempts: Vec<Attempt<'a, T, E>>,
) -> Result<Success<T, E>, Exhausted<E>>
where
    E: fmt::Display,
{
    let mut report = Exhausted::default();

    for attempt in attempts {
        let Attempt { name, run } = attempt;
        let started = Instant::now();

        match run().await {
            Ok(value) => {
                if !report.failures.is_empty() {
                    tracing::info!(
                        chain,
                        step = %name,
                        failed_before = report.failures.len(),
                        "Fallback succeeded"
                    );
                }
                return Ok(Success {
                    name,
                    value,
                    failures: report.failures,
                    skipped: report.skipped,
                });
            }
            Err(AttemptError::Skipped(reason)) => {
                tracing::debug!(chain, step = %name, %reason, "Skipped");
                report.skipped.push(name);
            }
            Err(AttemptError::Failed(error)) => {
                tracing::warn!(
                    chain,
                    step = %name,
                    latency_ms = started.elapsed().as_millis() as u64,
                    %error,
                    "Attempt failed, trying next"
                );
                report.failures.push((name, error));
            }
        }
    }

    Err(report)
}
