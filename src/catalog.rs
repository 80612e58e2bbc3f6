use std::fmt::Write;

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::model::{AnimeCard, AnimeDetails, AnimeEpisode, ExternalLink};

lazy_static! {
    static ref CARD_SELECTOR: Selector = Selector::parse("div.aitem-wrapper div.aitem").unwrap();
    static ref CARD_TITLE_SELECTOR: Selector = Selector::parse("a.title").unwrap();
    static ref CARD_POSTER_SELECTOR: Selector = Selector::parse("a.poster").unwrap();
    static ref CARD_IMAGE_SELECTOR: Selector = Selector::parse("a.poster img").unwrap();
    static ref SUB_SELECTOR: Selector = Selector::parse("div.info span.sub").unwrap();
    static ref DUB_SELECTOR: Selector = Selector::parse("div.info span.dub").unwrap();
    static ref POSTER_SELECTOR: Selector = Selector::parse(".poster img").unwrap();
    static ref ANIME_ID_SELECTOR: Selector = Selector::parse("div[data-id]").unwrap();
    static ref MAIN_ENTITY_SELECTOR: Selector = Selector::parse("div#main-entity").unwrap();
    static ref DETAIL_SELECTOR: Selector = Selector::parse("div.detail").unwrap();
    static ref SYNOPSIS_SELECTOR: Selector = Selector::parse(".desc").unwrap();
    static ref TITLE_SELECTOR: Selector = Selector::parse("h1.title").unwrap();
    static ref ALT_TITLE_SELECTOR: Selector = Selector::parse(".al-title").unwrap();
    static ref RATING_SELECTOR: Selector = Selector::parse(".rating").unwrap();
    static ref INFO_ITEM_SELECTOR: Selector = Selector::parse("div.item").unwrap();
    static ref INFO_NAME_SELECTOR: Selector = Selector::parse("div.name").unwrap();
    static ref INFO_VALUE_SELECTOR: Selector = Selector::parse("div.value").unwrap();
    static ref LINK_SELECTOR: Selector = Selector::parse("a").unwrap();
    static ref EPISODE_SELECTOR: Selector = Selector::parse("div.eplist a").unwrap();
    static ref SPAN_SELECTOR: Selector = Selector::parse("span").unwrap();
    static ref RELATED_SELECTOR: Selector = Selector::parse("div.aitem-col a.aitem").unwrap();
    static ref RELATED_TITLE_SELECTOR: Selector = Selector::parse("div.title").unwrap();
}

/// Metadata rows rendered into the description, in display order.
const DESCRIPTION_FIELDS: [(&str, &str); 9] = [
    ("Country:", "Country"),
    ("Premiered:", "Premiered"),
    ("Date aired:", "Date aired"),
    ("Broadcast:", "Broadcast"),
    ("Duration:", "Duration"),
    ("Studios:", "Studios"),
    ("Producers:", "Producers"),
    ("Genres:", "Genres"),
    ("Status:", "Status"),
];
const LINKS_LABEL: &str = "Links:";

fn first_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
}

fn first_count(element: &ElementRef, selector: &Selector) -> Option<u32> {
    first_text(element, selector).and_then(|t| t.parse::<u32>().ok())
}

/// Anime cards from a listing page (search, trending, updates...).
pub fn extract_anime_cards(html: &str, limit: Option<usize>) -> Vec<AnimeCard> {
    let document = Html::parse_document(html);

    document
        .select(&CARD_SELECTOR)
        .filter_map(|element| {
            let title = first_text(&element, &CARD_TITLE_SELECTOR)?;
            let id = element
                .select(&CARD_POSTER_SELECTOR)
                .next()
                .and_then(|e| e.value().attr("href"))?
                .to_string();
            let image = element
                .select(&CARD_IMAGE_SELECTOR)
                .next()
                .and_then(|e| e.value().attr("data-src").or_else(|| e.value().attr("src")))
                .unwrap_or_default()
                .to_string();

            Some(AnimeCard {
                id,
                title,
                image,
                crop_cover: false,
                subs: first_count(&element, &SUB_SELECTOR),
                dubs: first_count(&element, &DUB_SELECTOR),
            })
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Details page of one anime; `id` is the page path it was loaded from.
pub fn extract_anime_details(html: &str, id: &str) -> AnimeDetails {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let image = root
        .select(&POSTER_SELECTOR)
        .next()
        .and_then(|e| e.value().attr("src"))
        .unwrap_or_default()
        .to_string();
    let anime_id = root
        .select(&ANIME_ID_SELECTOR)
        .next()
        .and_then(|e| e.value().attr("data-id"))
        .unwrap_or_default()
        .to_string();

    let mut details = AnimeDetails {
        id: id.to_string(),
        anime_id,
        image,
        ..AnimeDetails::default()
    };

    if let Some(main) = root.select(&MAIN_ENTITY_SELECTOR).next() {
        details.subs = first_count(&main, &SUB_SELECTOR).unwrap_or(0);
        details.dubs = first_count(&main, &DUB_SELECTOR).unwrap_or(0);
        details.synopsis = first_text(&main, &SYNOPSIS_SELECTOR).unwrap_or_default();
        details.title = first_text(&main, &TITLE_SELECTOR).unwrap_or_default();
        details.alt_title = first_text(&main, &ALT_TITLE_SELECTOR).unwrap_or_default();
        details.rating = first_text(&main, &RATING_SELECTOR).unwrap_or_default();

        if let Some(detail) = main.select(&DETAIL_SELECTOR).next() {
            for item in detail.select(&INFO_ITEM_SELECTOR) {
                let label = first_text(&item, &INFO_NAME_SELECTOR).unwrap_or_default();
                let Some(value_div) = item.select(&INFO_VALUE_SELECTOR).next() else {
                    continue;
                };
                let links: Vec<ElementRef> = value_div.select(&LINK_SELECTOR).collect();

                if label == LINKS_LABEL {
                    details.links.extend(links.iter().map(|a| ExternalLink {
                        title: a.text().collect::<String>().trim().to_string(),
                        url: a.value().attr("href").unwrap_or_default().to_string(),
                    }));
                    continue;
                }

                let value = if links.is_empty() {
                    value_div.text().collect::<String>().trim().to_string()
                } else {
                    links
                        .iter()
                        .map(|a| a.text().collect::<String>().trim().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                if !label.is_empty() && !value.is_empty() {
                    details.metadata.push((label, value));
                }
            }
        }
    }

    details.total_episodes = details.subs.max(details.dubs);
    details.description = build_description(&details);
    details
}

/// Human-readable markdown summary shown on the details screen.
pub fn build_description(details: &AnimeDetails) -> String {
    let mut out = String::from("**Episodes Available:**\n");
    if details.subs > 0 {
        let _ = writeln!(out, "  • Subtitled: {} episodes", details.subs);
    }
    if details.dubs > 0 {
        let _ = writeln!(out, "  • Dubbed: {} episodes", details.dubs);
    }
    out.push('\n');

    if !details.synopsis.is_empty() {
        let _ = write!(out, "**Synopsis:**\n{}\n\n", details.synopsis);
    }

    for (label, title) in DESCRIPTION_FIELDS {
        if let Some(value) = details.meta(label) {
            let _ = writeln!(out, "**{}:** {}", title, value);
        }
    }
    if !details.rating.is_empty() {
        let _ = writeln!(out, "**Rating:** {}", details.rating);
    }
    if let Some(score) = details.meta("MAL Score:") {
        let _ = writeln!(out, "**MAL:** {}", score);
    }
    if !details.alt_title.is_empty() {
        let _ = writeln!(out, "**Alternative Title:** {}", details.alt_title);
    }

    if !details.links.is_empty() {
        out.push_str("\n**Links:**\n");
        let links: Vec<String> = details
            .links
            .iter()
            .map(|l| format!("  [{}]({})", l.title, l.url))
            .collect();
        out.push_str(&links.join("\n"));
    }

    if !details.image.is_empty() {
        let _ = write!(out, "\n\n![Cover]({})", details.image);
    }

    out
}

/// Episodes from the episode-list fragment, in the order the site lists them.
pub fn extract_episodes(html: &str) -> Vec<AnimeEpisode> {
    let document = Html::parse_fragment(html);

    document
        .select(&EPISODE_SELECTOR)
        .filter_map(|element| {
            let token = element.value().attr("token")?.trim().to_string();
            if token.is_empty() {
                return None;
            }
            let episode_no = element.value().attr("num").unwrap_or_default().to_string();

            let title = first_text(&element, &SPAN_SELECTOR)
                .or_else(|| {
                    element
                        .value()
                        .attr("title")
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                })
                .unwrap_or_else(|| format!("Episode {}", episode_no));

            let langs = match element
                .value()
                .attr("langs")
                .and_then(|l| l.trim().parse::<u32>().ok())
            {
                Some(1) => "Sub",
                Some(3) => "Dub & Sub",
                _ => "",
            }
            .to_string();

            Some(AnimeEpisode {
                token,
                episode_no,
                title,
                langs,
            })
        })
        .collect()
}

/// Related anime tiles on a details page, at most ten.
pub fn extract_related(html: &str) -> Vec<AnimeCard> {
    let document = Html::parse_document(html);

    document
        .select(&RELATED_SELECTOR)
        .filter_map(|link| {
            let title = first_text(&link, &RELATED_TITLE_SELECTOR)?;
            let id = link.value().attr("href").filter(|h| !h.is_empty())?.to_string();
            let image = link
                .value()
                .attr("style")
                .map(poster_from_style)
                .unwrap_or_default();

            Some(AnimeCard {
                id,
                title,
                image,
                crop_cover: false,
                subs: None,
                dubs: None,
            })
        })
        .take(10)
        .collect()
}

fn poster_from_style(style: &str) -> String {
    for (open, close) in [("url('", "')"), ("url(\"", "\")"), ("url(", ")")] {
        if let Some(start) = style.find(open) {
            let rest = &style[start + open.len()..];
            return rest.find(close).map(|end| &rest[..end]).unwrap_or(rest).to_string();
        }
    }
    String::new()
}
