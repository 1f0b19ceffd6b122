//! Mirror service: dedup, per-cycle budget, formatting and posting
//!
//! One instance owns the seen-set and the destination for the process
//! lifetime. The daemon feeds it timeline snapshots; everything else
//! (formatting, enrichment, threading) happens here.

pub mod formatter;
pub mod thread;

use reqwest::Client;
use tracing::{info, warn};

use crate::error::Result;
use crate::platforms::Destination;
use crate::richtext::unit_len;
use crate::types::{SeenSet, SourceItem, ThreadReceipt};

/// Outcome counters for one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Items not seen before this cycle.
    pub new_items: usize,
    /// New items actually mirrored.
    pub posted: usize,
    /// New items dropped by the budget ceiling (still marked seen).
    pub skipped: usize,
    /// Destination records created, thread replies included.
    pub posts_created: usize,
    /// Budget units consumed by this cycle's new items.
    pub units: u32,
}

pub struct MirrorService<D: Destination> {
    destination: D,
    http: Client,
    seen: SeenSet,
    max_units_per_cycle: u32,
}

impl<D: Destination> MirrorService<D> {
    pub fn new(destination: D, http: Client, max_units_per_cycle: u32) -> Self {
        Self {
            destination,
            http,
            seen: SeenSet::new(),
            max_units_per_cycle,
        }
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub fn seen_len(&self) -> usize {
        self.seen.len()
    }

    /// Baseline load: mark every current item as seen without posting, so
    /// a restart does not replay the whole visible timeline.
    pub fn seed(&mut self, items: &[SourceItem]) -> usize {
        let mut added = 0;
        for item in items {
            if self.seen.insert(item.formatted_text()) {
                added += 1;
            }
        }
        info!(baseline = added, "seeded seen-set from current timeline");
        added
    }

    /// Process one timeline snapshot.
    ///
    /// New items are marked seen before posting; an item skipped by the
    /// budget ceiling, or lost to an error mid-cycle, is never retried.
    /// The first error abandons the remainder of the cycle.
    pub async fn run_cycle(&mut self, items: &[SourceItem]) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for item in items {
            let text = item.formatted_text();
            if self.seen.contains(&text) {
                continue;
            }

            self.seen.insert(text.clone());
            report.new_items += 1;
            report.units += item_cost(&text);

            if report.units <= self.max_units_per_cycle {
                let receipt = self.mirror_item(item, &text).await?;
                report.posted += 1;
                report.posts_created += receipt.posts_created();
            } else {
                report.skipped += 1;
                warn!(
                    units = report.units,
                    ceiling = self.max_units_per_cycle,
                    text_units = unit_len(&text),
                    "cycle budget exceeded; item marked seen and skipped"
                );
            }
        }

        Ok(report)
    }

    async fn mirror_item(&self, item: &SourceItem, text: &str) -> Result<ThreadReceipt> {
        let (draft, overage) =
            formatter::build_post(&self.destination, &self.http, text, item.media_url.as_deref())
                .await?;
        let receipt = thread::post_thread(&self.destination, draft, overage).await?;
        info!(
            root = %receipt.root.uri,
            posts = receipt.posts_created(),
            "mirrored item"
        );
        Ok(receipt)
    }
}

/// Budget cost of one item: one unit plus a size penalty per 300 units of
/// formatted text.
fn item_cost(text: &str) -> u32 {
    1 + (unit_len(text) as f64 / 300.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::mock::MockDestination;
    use crate::types::SubItem;

    fn item(author: &str, text: &str) -> SourceItem {
        SourceItem {
            text: text.to_string(),
            author: author.to_string(),
            media_url: None,
            repost: None,
            quote: None,
        }
    }

    fn service(max_units: u32) -> MirrorService<MockDestination> {
        MirrorService::new(MockDestination::logged_in("mock"), Client::new(), max_units)
    }

    #[test]
    fn test_item_cost() {
        assert_eq!(item_cost("short"), 1);
        assert_eq!(item_cost(&"x".repeat(200)), 2); // round(200/300) = 1
        assert_eq!(item_cost(&"x".repeat(600)), 3);
    }

    #[tokio::test]
    async fn test_cycle_posts_new_items() {
        let mut service = service(30);
        let items = vec![item("alice", "first"), item("bob", "second")];

        let report = service.run_cycle(&items).await.unwrap();
        assert_eq!(report.new_items, 2);
        assert_eq!(report.posted, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.posts_created, 2);

        let drafts = service.destination().posted_drafts();
        assert_eq!(drafts[0].text, "@alice tweeted\nfirst");
        assert_eq!(drafts[1].text, "@bob tweeted\nsecond");
    }

    #[tokio::test]
    async fn test_unchanged_timeline_is_idempotent() {
        let mut service = service(30);
        let items = vec![item("alice", "only once")];

        let first = service.run_cycle(&items).await.unwrap();
        assert_eq!(first.posted, 1);

        let second = service.run_cycle(&items).await.unwrap();
        assert_eq!(second, CycleReport::default());
        assert_eq!(service.destination().posted_drafts().len(), 1);
    }

    #[tokio::test]
    async fn test_seed_suppresses_posting() {
        let mut service = service(30);
        let items = vec![item("alice", "pre-existing"), item("bob", "also old")];

        assert_eq!(service.seed(&items), 2);
        assert_eq!(service.seen_len(), 2);

        let report = service.run_cycle(&items).await.unwrap();
        assert_eq!(report.new_items, 0);
        assert!(service.destination().posted_drafts().is_empty());
    }

    #[tokio::test]
    async fn test_budget_ceiling_skips_but_marks_seen() {
        let mut service = service(2);
        let items = vec![
            item("a", "one"),
            item("b", "two"),
            item("c", "three"),
        ];

        let report = service.run_cycle(&items).await.unwrap();
        assert_eq!(report.new_items, 3);
        assert_eq!(report.posted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(service.destination().posted_drafts().len(), 2);

        // The skipped item is seen: it never comes back.
        let retry = service.run_cycle(&items).await.unwrap();
        assert_eq!(retry, CycleReport::default());
        assert_eq!(service.destination().posted_drafts().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_resets_between_cycles() {
        let mut service = service(1);

        let first = service.run_cycle(&[item("a", "cycle one")]).await.unwrap();
        assert_eq!(first.posted, 1);

        // A fresh cycle starts from zero units, so this posts too.
        let second = service.run_cycle(&[item("b", "cycle two")]).await.unwrap();
        assert_eq!(second.posted, 1);
    }

    #[tokio::test]
    async fn test_long_item_threads() {
        let mut service = service(30);
        let long = "these words repeat to force a thread split ".repeat(16); // ~690 units
        let items = vec![item("alice", long.trim_end())];

        let report = service.run_cycle(&items).await.unwrap();
        assert_eq!(report.posted, 1);
        assert!(report.posts_created >= 3);

        let drafts = service.destination().posted_drafts();
        assert_eq!(drafts.len(), report.posts_created);
        assert!(drafts[0].reply.is_none());
        assert!(drafts[1..].iter().all(|d| d.reply.is_some()));
    }

    #[tokio::test]
    async fn test_repost_not_duplicated_across_cycles() {
        let mut service = service(30);
        let repost = SourceItem {
            text: "RT @orig: words".to_string(),
            author: "mirrored".to_string(),
            media_url: None,
            repost: Some(SubItem {
                text: "words in full".to_string(),
                author: "orig".to_string(),
            }),
            quote: None,
        };

        let first = service.run_cycle(std::slice::from_ref(&repost)).await.unwrap();
        assert_eq!(first.posted, 1);

        let drafts = service.destination().posted_drafts();
        assert!(drafts[0].text.starts_with(crate::types::REPOST_GLYPH));
        assert!(drafts[0].text.contains("@orig words in full"));

        // Same item visible again next cycle: nothing happens.
        let second = service.run_cycle(std::slice::from_ref(&repost)).await.unwrap();
        assert_eq!(second.posted, 0);
        assert_eq!(service.destination().posted_drafts().len(), 1);
    }

    #[tokio::test]
    async fn test_posting_error_abandons_cycle_but_item_stays_seen() {
        let mut service = MirrorService::new(
            MockDestination::failing_posts("mock", "pds down"),
            Client::new(),
            30,
        );
        let items = vec![item("alice", "doomed")];

        assert!(service.run_cycle(&items).await.is_err());
        assert_eq!(service.seen_len(), 1);

        // The item was consumed by the failed cycle and is not retried.
        let retry = service.run_cycle(&items).await.unwrap();
        assert_eq!(retry, CycleReport::default());
    }
}
