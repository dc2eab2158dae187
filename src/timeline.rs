//! Timeline view over extracted dates.
//!
//! Expands each scanned chunk's `dates` list into one event per date and
//! sorts calendar-aware: the sort key is a best-effort parse of the date
//! string over a handful of common formats, with the original string
//! retained verbatim. Unparsable dates sort after parsable ones, ordered
//! lexically among themselves.

use anyhow::Result;
use chrono::NaiveDate;

use crate::models::TimelineEvent;
use crate::store::MemoryStore;

/// Excerpt length for the event description.
const EXCERPT_CHARS: usize = 100;

/// Formats tried when parsing an extracted date string, most common
/// first. The extraction prompt asks for YYYY-MM-DD but models fall
/// back to source text.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];

pub async fn build_timeline(store: &dyn MemoryStore, scan_limit: usize) -> Result<Vec<TimelineEvent>> {
    let points = store.scan(scan_limit).await?;

    let mut events = Vec::new();
    for point in &points {
        for date in &point.payload.dates {
            events.push(TimelineEvent {
                date: date.clone(),
                event: excerpt(&point.payload.text),
                source: point.payload.filename.clone(),
                chunk_id: point.id.clone(),
            });
        }
    }

    events.sort_by(|a, b| sort_key(&a.date).cmp(&sort_key(&b.date)));
    Ok(events)
}

/// Best-effort parse for sorting. `None` (unparsable) is pushed to the
/// end by the key's `Option` ordering trick below.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

fn sort_key(raw: &str) -> (u8, Option<NaiveDate>, String) {
    match parse_date(raw) {
        Some(date) => (0, Some(date), raw.to_string()),
        None => (1, None, raw.to_string()),
    }
}

fn excerpt(text: &str) -> String {
    if text.chars().count() <= EXCERPT_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChunkPayload, IndexedPoint};
    use crate::store::memory::InMemoryStore;
    use chrono::Utc;

    fn indexed(id: &str, text: &str, dates: Vec<&str>) -> IndexedPoint {
        IndexedPoint {
            id: id.to_string(),
            vector: vec![1.0],
            payload: ChunkPayload {
                text: text.to_string(),
                filename: "contract.pdf".to_string(),
                page_number: 1,
                created_at: Utc::now(),
                dates: dates.into_iter().map(String::from).collect(),
                entities: Vec::new(),
            },
        }
    }

    #[test]
    fn parses_common_formats() {
        assert_eq!(
            parse_date("2024-01-15"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("01/15/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(
            parse_date("January 15, 2024"),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(parse_date("the closing date"), None);
    }

    #[tokio::test]
    async fn events_sorted_calendar_aware_with_unparsable_last() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                // Lexical order would put "2024-1-5" before "2024-01-15";
                // calendar order must not. chrono accepts unpadded
                // components, so it still parses.
                indexed("a", "clause one", vec!["2024-1-5"]),
                indexed("b", "clause two", vec!["2024-01-15"]),
                indexed("c", "clause three", vec!["2023-12-31"]),
                indexed("d", "clause four", vec!["the closing date"]),
            ])
            .await
            .unwrap();

        let events = build_timeline(&store, 100).await.unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].date, "2023-12-31");
        assert_eq!(events[1].date, "2024-1-5");
        assert_eq!(events[2].date, "2024-01-15");
        // No format matches, so it sorts last with the string kept.
        assert_eq!(events[3].date, "the closing date");
    }

    #[tokio::test]
    async fn one_event_per_date_per_chunk() {
        let store = InMemoryStore::new();
        store
            .upsert(&[indexed(
                "a",
                "executed on two dates",
                vec!["2024-01-15", "2024-02-01"],
            )])
            .await
            .unwrap();

        let events = build_timeline(&store, 100).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.chunk_id == "a"));
        assert!(events.iter().all(|e| e.source == "contract.pdf"));
    }

    #[tokio::test]
    async fn chunks_without_dates_produce_no_events() {
        let store = InMemoryStore::new();
        store.upsert(&[indexed("a", "no dates here", vec![])]).await.unwrap();
        assert!(build_timeline(&store, 100).await.unwrap().is_empty());
    }

    #[test]
    fn long_text_is_excerpted() {
        let text = "x".repeat(300);
        let e = excerpt(&text);
        assert_eq!(e.chars().count(), 103);
        assert!(e.ends_with("..."));
        assert_eq!(excerpt("short"), "short");
    }
}
