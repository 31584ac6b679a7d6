//! Readiness polling — decide when the dependency set is usable.

use std::time::Duration;

use crate::compose::ComposeBackend;
use crate::context::DeploymentContext;
use crate::output::{OutputContext, progress};
use crate::status;

/// Maximum poll attempts before giving up (60 × 5 s ≈ 5 minutes).
pub const MAX_ATTEMPTS: u32 = 60;

/// Fixed delay between poll attempts.
pub const POLL_DELAY: Duration = Duration::from_secs(5);

/// Poll loop bounds. Tests shrink these to run fast.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: POLL_DELAY,
        }
    }
}

/// Outcome of a readiness wait. A timeout is advisory — the caller proceeds
/// anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready { attempts: u32 },
    TimedOut,
}

/// Poll the structured status listing until every dependency is running and
/// healthy, or the attempt budget is exhausted.
///
/// A failed or non-zero status query is reported as a warning and counts
/// as "not ready this round"; the loop never aborts on a query error.
pub async fn wait_ready(
    compose: &impl ComposeBackend,
    ctx: &DeploymentContext,
    settings: &PollSettings,
    out: &OutputContext,
) -> Readiness {
    let pb = out
        .show_progress()
        .then(|| progress::spinner("waiting for dependencies..."));
    let mut last_waiting = String::new();

    for attempt in 1..=settings.max_attempts {
        // Query failures are tolerated: logged, counted as no data this
        // round, and polling continues.
        let statuses = match compose.ps_structured().await {
            Ok(output) if output.status.success() => {
                status::parse_statuses(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                out.warn(&format!(
                    "status query exited with {}; retrying.",
                    output.status
                ));
                Vec::new()
            }
            Err(e) => {
                out.warn(&format!("status query failed: {e:#}; retrying."));
                Vec::new()
            }
        };

        if status::all_ready(&statuses, &ctx.dependencies, &ctx.name_prefix) {
            if let Some(pb) = &pb {
                progress::finish_ok(pb, "dependencies ready.");
            } else {
                out.success("dependencies ready.");
            }
            return Readiness::Ready { attempts: attempt };
        }

        let waiting = ctx
            .dependencies
            .iter()
            .filter(|dep| !status::service_ready(&statuses, dep.as_str(), &ctx.name_prefix))
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");

        if let Some(pb) = &pb {
            pb.set_message(format!(
                "waiting for {waiting} ({attempt}/{max})",
                max = settings.max_attempts
            ));
        } else if waiting != last_waiting {
            out.info(&format!("waiting for {waiting}"));
            last_waiting = waiting;
        }

        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.delay).await;
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }
    Readiness::TimedOut
}
