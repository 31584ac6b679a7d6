//! Structured status records from `docker compose ps --format json`.

use serde::Deserialize;

/// One snapshot of one service, parsed from a single JSON line.
///
/// Produced fresh on every poll; never mutated, only replaced.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceStatus {
    /// Container name, e.g. `ragflow-mysql`.
    #[serde(rename = "Name")]
    pub name: String,
    /// Run state, e.g. `running` or `exited`.
    #[serde(rename = "State", default)]
    pub state: String,
    /// Health indicator. Absent or empty when the service defines no
    /// healthcheck; otherwise `healthy`, `unhealthy`, or `starting`.
    #[serde(rename = "Health", default)]
    pub health: Option<String>,
}

impl ServiceStatus {
    /// The service name with the compose project prefix stripped.
    #[must_use]
    pub fn service_name<'a>(&'a self, prefix: &str) -> &'a str {
        self.name.strip_prefix(prefix).unwrap_or(&self.name)
    }

    /// A service is ready iff it is running and its health is absent, empty,
    /// or `healthy`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == "running"
            && matches!(self.health.as_deref(), None | Some("") | Some("healthy"))
    }
}

/// Parse line-delimited JSON status output.
///
/// Each line is one independent record; a line that fails to parse is
/// skipped, never fatal.
#[must_use]
pub fn parse_statuses(raw: &str) -> Vec<ServiceStatus> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Overall readiness: every expected dependency must appear in `statuses`
/// (after prefix stripping) and every record matching it must be ready.
/// A service absent from the listing is conservatively not ready, and so
/// is one with a stale duplicate record (e.g. an exited container
/// alongside the running one).
#[must_use]
pub fn all_ready(statuses: &[ServiceStatus], dependencies: &[String], prefix: &str) -> bool {
    dependencies
        .iter()
        .all(|dep| service_ready(statuses, dep, prefix))
}

/// Readiness of a single expected service: at least one record matches its
/// name and every matching record is ready.
#[must_use]
pub fn service_ready(statuses: &[ServiceStatus], dep: &str, prefix: &str) -> bool {
    let mut matches = statuses
        .iter()
        .filter(|s| s.service_name(prefix) == dep)
        .peekable();
    matches.peek().is_some() && matches.all(ServiceStatus::is_ready)
}
