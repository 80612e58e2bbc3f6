use reqwest::Client;
use tracing::{debug, info, warn};

use crate::{model::MirrorHost, model::Outcome, settings::DOMAINS};

/// Picks the first mirror that answers a HEAD probe.
///
/// Any HTTP status counts as reachable; only transport errors disqualify a
/// candidate. When every probe fails the first candidate is returned as
/// `Degraded`, and later requests against it fail at their point of use.
pub async fn select_active_mirror(
    client: &Client,
    candidates: &[MirrorHost],
) -> Outcome<MirrorHost> {
    for candidate in candidates {
        match client.head(candidate.as_str()).send().await {
            Ok(response) => {
                info!(mirror = %candidate, status = %response.status(), "mirror selected");
                return Outcome::Genuine(candidate.clone());
            }
            Err(e) => debug!(mirror = %candidate, error = %e, "mirror probe failed"),
        }
    }

    let fallback = candidates
        .first()
        .cloned()
        .unwrap_or_else(|| MirrorHost::new(format!("https://{}", DOMAINS[0])));
    warn!(mirror = %fallback, "no mirror reachable, defaulting to first candidate");
    Outcome::Degraded(fallback)
}
