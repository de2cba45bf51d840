//! `backstop simulate` – run calls against a scripted backend through breaker + retry.

use anyhow::Result;
use backstop_core::config::BackstopConfig;
use backstop_core::retry::{ai_retry_condition, default_retry_condition, RequestError};
use backstop_core::{run_with_retry, BreakerSnapshot, CircuitBreaker, RetryPolicy};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::cli::PolicyKind;

#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub fail: u32,
    pub calls: u32,
    pub policy: PolicyKind,
    pub error_status: u16,
    pub threshold: Option<u32>,
    pub cooldown_ms: Option<u64>,
    pub base_delay_ms: Option<u64>,
}

/// Backend that fails its first `fail` invocations with `status`, then answers.
struct ScriptedBackend {
    remaining_failures: AtomicU32,
    status: u16,
    invocations: AtomicU32,
}

impl ScriptedBackend {
    fn new(fail: u32, status: u16) -> Self {
        Self {
            remaining_failures: AtomicU32::new(fail),
            status,
            invocations: AtomicU32::new(0),
        }
    }

    async fn call(&self) -> Result<&'static str, RequestError> {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            tracing::debug!(invocation = n, status = self.status, "scripted failure");
            Err(RequestError::status(self.status, format!("scripted failure #{n}")))
        } else {
            Ok("ok")
        }
    }
}

pub(crate) struct SimulationReport {
    pub outcomes: Vec<Result<&'static str, RequestError>>,
    pub invocations: u32,
    pub breaker: BreakerSnapshot,
}

pub(crate) fn build_policy(cfg: &BackstopConfig, args: &SimulateArgs) -> RetryPolicy<RequestError> {
    let policy = match args.policy {
        PolicyKind::Standard => {
            RetryPolicy::from_config(&cfg.retry, default_retry_condition::<RequestError>)
        }
        PolicyKind::Ai => RetryPolicy::from_config(&cfg.ai_retry, ai_retry_condition::<RequestError>),
    };
    match args.base_delay_ms {
        Some(ms) => policy.with_base_delay(Duration::from_millis(ms)),
        None => policy,
    }
}

pub(crate) fn build_breaker(cfg: &BackstopConfig, args: &SimulateArgs) -> CircuitBreaker {
    let mut breaker_cfg = cfg.breaker.clone();
    if let Some(threshold) = args.threshold {
        breaker_cfg.threshold = threshold;
    }
    if let Some(ms) = args.cooldown_ms {
        breaker_cfg.cooldown_ms = ms;
    }
    CircuitBreaker::from_config("simulated-backend", &breaker_cfg)
}

pub(crate) async fn simulate(cfg: &BackstopConfig, args: &SimulateArgs) -> SimulationReport {
    let backend = ScriptedBackend::new(args.fail, args.error_status);
    let breaker = build_breaker(cfg, args);
    let policy = build_policy(cfg, args).with_observer(
        |attempt: u32, err: &RequestError, delay: Duration| {
            println!(
                "  attempt {} failed ({}), retrying in {} ms",
                attempt,
                err,
                delay.as_millis()
            );
        },
    );

    let mut outcomes = Vec::new();
    for call in 1..=args.calls {
        println!("call {call}:");
        let outcome = run_with_retry(&policy, || breaker.execute(|| backend.call())).await;
        match &outcome {
            Ok(body) => println!("  succeeded: {body}"),
            Err(err) => println!("  failed: {err}"),
        }
        outcomes.push(outcome);
    }

    SimulationReport {
        outcomes,
        invocations: backend.invocations.load(Ordering::SeqCst),
        breaker: breaker.snapshot(),
    }
}

pub async fn run_simulate(cfg: &BackstopConfig, args: &SimulateArgs) -> Result<()> {
    let report = simulate(cfg, args).await;
    let failed = report.outcomes.iter().filter(|o| o.is_err()).count();
    println!(
        "{} call(s), {} failed, {} backend invocation(s)",
        report.outcomes.len(),
        failed,
        report.invocations
    );
    println!("{}", serde_json::to_string_pretty(&report.breaker)?);
    Ok(())
}
