use std::collections::HashMap;

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::model::{DeliveryServer, LanguageType, Preference, ServerSlot};

lazy_static! {
    static ref SERVER_SELECTOR: Selector = Selector::parse("span.server[data-lid]").unwrap();
}

const TOP_QUALITY: u32 = 720;
const QUALITY_STEP: u32 = 100;

/// Reads delivery servers out of the server-list fragment.
///
/// The language type comes from the parent group's `data-id`.
pub fn extract_delivery_servers(html: &str) -> Vec<DeliveryServer> {
    let document = Html::parse_fragment(html);
    let mut positions: HashMap<LanguageType, u32> = HashMap::new();

    document
        .select(&SERVER_SELECTOR)
        .filter_map(|element| {
            let server_id = element.value().attr("data-lid")?.trim().to_string();
            if server_id.is_empty() {
                return None;
            }

            let display_name = element.text().collect::<String>().trim().to_string();
            let language_type = element
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|parent| parent.value().attr("data-id"))
                .map(LanguageType::from_label)
                .unwrap_or(LanguageType::Unknown);

            let position = positions.entry(language_type).or_insert(0);
            *position += 1;
            let slot_index = numeric_suffix(&display_name).unwrap_or(*position);

            Some(DeliveryServer {
                server_id,
                display_name,
                language_type,
                slot_index,
                quality: 0,
            })
        })
        .collect()
}

fn numeric_suffix(name: &str) -> Option<u32> {
    let digits: String = name
        .trim()
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

/// Narrows servers by language type, then by slot.
///
/// A pass that would remove every server is skipped, so the output is never
/// empty for non-empty input. Input order is preserved.
pub fn filter_servers(servers: Vec<DeliveryServer>, pref: &Preference) -> Vec<DeliveryServer> {
    let by_language = narrow(servers, |server| {
        pref.language_type.matches(server.language_type)
    });

    match pref.server_slot {
        ServerSlot::Auto => by_language,
        ServerSlot::Index(n) => {
            let label = n.to_string();
            narrow(by_language, |server| {
                server.display_name.to_lowercase().contains(&label)
            })
        }
    }
}

fn narrow<F>(servers: Vec<DeliveryServer>, keep: F) -> Vec<DeliveryServer>
where
    F: Fn(&DeliveryServer) -> bool,
{
    let kept: Vec<DeliveryServer> = servers.iter().filter(|s| keep(s)).cloned().collect();
    if kept.is_empty() {
        debug!(candidates = servers.len(), "preference matched nothing, keeping all");
        servers
    } else {
        kept
    }
}

/// Assigns descending qualities in preference order.
pub fn rank_servers(servers: Vec<DeliveryServer>) -> Vec<DeliveryServer> {
    servers
        .into_iter()
        .enumerate()
        .map(|(i, server)| server.with_quality(quality_at(i)))
        .collect()
}

fn quality_at(position: usize) -> u32 {
    let step = QUALITY_STEP.saturating_mul(u32::try_from(position).unwrap_or(u32::MAX));
    TOP_QUALITY.saturating_sub(step)
}
