mod common;

use std::fs;

use archiver_core::{HistoryMarker, SyncMode};
use archiver_engine::{
    ArchiveLog, HistoryStore, JsonHistoryStore, SyncError, TextArchiveLog, WriteOutcome,
};
use common::{accounts, article, articles, FakeFetcher, Harness};
use pretty_assertions::assert_eq;

fn logged_links(h: &Harness) -> Vec<String> {
    let text = fs::read_to_string(h.log_path()).unwrap_or_default();
    text.lines()
        .filter_map(|line| line.strip_prefix("link: "))
        .map(str::to_string)
        .collect()
}

fn block_count(h: &Harness) -> usize {
    let text = fs::read_to_string(h.log_path()).unwrap_or_default();
    text.lines().filter(|line| line.starts_with("account: ")).count()
}

#[tokio::test]
async fn archive_first_run_pages_until_short_page() {
    let h = Harness::new();
    h.listing.set("f1", articles("a", 12));
    let accounts = accounts(&[("f1", "Acct")]);

    let report = h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();

    assert_eq!(
        h.listing.requests(),
        vec![
            ("f1".to_string(), 0, 1),
            ("f1".to_string(), 0, 10),
            ("f1".to_string(), 10, 10)
        ]
    );
    let account = &report.accounts[0];
    assert!(!account.skipped);
    assert_eq!(account.logged, 12);
    assert_eq!(account.saved(), 12);
    assert_eq!(account.stats.pages_fetched, 2);
    assert_eq!(logged_links(&h).len(), 12);
    assert_eq!(block_count(&h), 1);
    assert_eq!(fs::read_dir(h.articles_dir().join("Acct")).unwrap().count(), 12);
    // Archive mode never touches the history store.
    assert!(!h.history_path().exists());
}

#[tokio::test]
async fn archive_rerun_without_news_skips_after_probe() {
    let h = Harness::new();
    h.listing.set("f1", articles("a", 3));
    let accounts = accounts(&[("f1", "Acct")]);
    h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();
    h.listing.clear_requests();
    let fetched_before = h.fetcher.requests().len();

    let report = h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();

    assert!(report.accounts[0].skipped);
    assert_eq!(h.listing.requests(), vec![("f1".to_string(), 0, 1)]);
    assert_eq!(h.fetcher.requests().len(), fetched_before);
    assert_eq!(block_count(&h), 1);
}

#[tokio::test]
async fn archive_picks_up_only_new_articles() {
    let h = Harness::new();
    h.listing.set("f1", articles("a", 5));
    let accounts = accounts(&[("f1", "Acct")]);
    h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();

    h.listing.publish(
        "f1",
        vec![article("New 1", "https://mp/s/n1"), article("New 0", "https://mp/s/n0")],
    );
    h.listing.clear_requests();
    let report = h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();

    assert_eq!(report.accounts[0].logged, 2);
    assert!(report.accounts[0].stats.boundary_reached);
    assert_eq!(
        h.listing.requests(),
        vec![("f1".to_string(), 0, 1), ("f1".to_string(), 0, 10)]
    );
    let links = logged_links(&h);
    assert_eq!(links.len(), 7);
    assert_eq!(&links[5..], ["https://mp/s/n1", "https://mp/s/n0"]);

    let markers = TextArchiveLog::new(h.log_path()).load_first_markers().unwrap();
    assert_eq!(markers.get("Acct").map(String::as_str), Some("https://mp/s/n1"));
}

#[tokio::test]
async fn links_are_never_logged_twice_across_runs() {
    let h = Harness::new();
    h.listing.set("f1", articles("a", 4));
    let accounts = accounts(&[("f1", "Acct")]);
    h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();

    // A new post plus a re-surfaced old one above it: the marker no longer
    // leads the listing, so the old link must be filtered by the captured set.
    h.listing.publish(
        "f1",
        vec![article("a2", "https://mp/s/a2"), article("fresh", "https://mp/s/fresh")],
    );
    h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();
    h.controller(SyncMode::Update).run_cycle(&accounts).await.unwrap();

    let links = logged_links(&h);
    let mut unique = links.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(links.len(), unique.len(), "duplicate links in log: {links:?}");
    assert_eq!(links.len(), 5);
}

#[tokio::test]
async fn temporary_links_are_neither_logged_nor_fetched() {
    let h = Harness::new();
    h.listing.set(
        "f1",
        vec![
            article("Temp", "https://mp/s?__biz=x&tempkey=abc"),
            article("Real", "https://mp/s/real"),
        ],
    );
    let report = h
        .controller(SyncMode::Archive)
        .run_cycle(&accounts(&[("f1", "Acct")]))
        .await
        .unwrap();

    assert_eq!(report.accounts[0].stats.skipped_invalid, 1);
    assert_eq!(logged_links(&h), ["https://mp/s/real"]);
    assert_eq!(h.fetcher.requests(), ["https://mp/s/real"]);
}

#[tokio::test]
async fn update_mode_stops_at_history_title() {
    let h = Harness::new();
    h.listing.set(
        "f1",
        vec![
            article("A", "https://mp/s/A"),
            article("B", "https://mp/s/B"),
            article("C", "https://mp/s/C"),
        ],
    );
    JsonHistoryStore::open(h.history_path())
        .unwrap()
        .put(
            "f1",
            HistoryMarker {
                last_article_title: Some("B".to_string()),
                last_article_url: Some("https://mp/s/B".to_string()),
            },
        )
        .unwrap();

    let report = h
        .controller(SyncMode::Update)
        .run_cycle(&accounts(&[("f1", "Acct")]))
        .await
        .unwrap();

    assert_eq!(logged_links(&h), ["https://mp/s/A"]);
    assert_eq!(
        report.accounts[0].history,
        Some(HistoryMarker {
            last_article_title: Some("A".to_string()),
            last_article_url: Some("https://mp/s/A".to_string()),
        })
    );
    let stored = JsonHistoryStore::open(h.history_path()).unwrap().get("f1").unwrap();
    assert_eq!(stored.last_article_title.as_deref(), Some("A"));
    assert_eq!(h.listing.requests(), vec![("f1".to_string(), 0, 10)]);
}

#[tokio::test]
async fn update_mode_without_news_changes_nothing() {
    let h = Harness::new();
    h.listing.set("f1", articles("a", 3));
    let accounts = accounts(&[("f1", "Acct")]);
    h.controller(SyncMode::Update).run_cycle(&accounts).await.unwrap();
    let history_before = fs::read_to_string(h.history_path()).unwrap();
    let log_before = fs::read_to_string(h.log_path()).unwrap();

    let report = h.controller(SyncMode::Update).run_cycle(&accounts).await.unwrap();

    assert_eq!(report.accounts[0].logged, 0);
    assert_eq!(report.accounts[0].history, None);
    assert_eq!(fs::read_to_string(h.history_path()).unwrap(), history_before);
    assert_eq!(fs::read_to_string(h.log_path()).unwrap(), log_before);
}

#[tokio::test]
async fn update_mode_moves_history_over_already_captured_articles() {
    let h = Harness::new();
    h.listing.set("f1", articles("a", 3));
    let accounts = accounts(&[("f1", "Acct")]);
    h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();
    let fetched_before = h.fetcher.requests().len();

    let report = h.controller(SyncMode::Update).run_cycle(&accounts).await.unwrap();

    assert_eq!(report.accounts[0].logged, 0);
    assert_eq!(report.accounts[0].stats.skipped_known, 3);
    assert_eq!(block_count(&h), 1);
    assert_eq!(h.fetcher.requests().len(), fetched_before);
    let stored = JsonHistoryStore::open(h.history_path()).unwrap().get("f1").unwrap();
    assert_eq!(stored.last_article_title.as_deref(), Some("a0"));
}

#[tokio::test]
async fn document_failures_do_not_stop_the_pass() {
    let mut h = Harness::new();
    h.fetcher = std::sync::Arc::new(
        FakeFetcher::default()
            .with_page("https://mp/s/ok1", common::ARTICLE_PAGE)
            .with_page("https://mp/s/ok2", common::ARTICLE_PAGE),
    );
    h.listing.set(
        "f1",
        vec![
            article("ok1", "https://mp/s/ok1"),
            article("broken", "https://mp/s/broken"),
            article("ok2", "https://mp/s/ok2"),
        ],
    );

    let report = h
        .controller(SyncMode::Archive)
        .run_cycle(&accounts(&[("f1", "Acct")]))
        .await
        .unwrap();

    let account = &report.accounts[0];
    assert_eq!(account.logged, 3);
    assert_eq!(account.saved(), 2);
    assert_eq!(account.failed(), 1);
    assert!(account.documents[1].outcome.is_err());
    assert!(matches!(account.documents[2].outcome, Ok(WriteOutcome::Saved { .. })));
    assert_eq!(report.failed(), 1);
}

#[tokio::test]
async fn accounts_run_in_configured_order() {
    let h = Harness::new();
    h.listing.set("f2", articles("b", 1));
    h.listing.set("f1", articles("a", 1));
    let report = h
        .controller(SyncMode::Archive)
        .run_cycle(&accounts(&[("f2", "Second"), ("f1", "First"), ("f3", "Empty")]))
        .await
        .unwrap();

    let order: Vec<_> = report.accounts.iter().map(|a| a.display_name.as_str()).collect();
    assert_eq!(order, ["Second", "First", "Empty"]);
    assert_eq!(report.accounts[2].logged, 0);
    assert_eq!(block_count(&h), 2);
    assert_eq!(report.logged(), 2);
}

#[tokio::test]
async fn unreadable_archive_log_fails_the_cycle() {
    let h = Harness::new();
    fs::create_dir_all(h.log_path()).unwrap();
    h.listing.set("f1", articles("a", 1));

    let err = h
        .controller(SyncMode::Archive)
        .run_cycle(&accounts(&[("f1", "Acct")]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Store(_)));
    assert!(h.listing.requests().is_empty());
}

#[tokio::test]
async fn unnamed_accounts_never_borrow_each_others_marker() {
    let h = Harness::new();
    h.listing.set("u1", articles("a", 3));
    h.listing.set("u2", articles("b", 3));
    let accounts = accounts(&[("u1", ""), ("u2", "")]);
    h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();
    assert_eq!(block_count(&h), 2);

    // u2 publishes; u1's block is the latest one under the shared empty name.
    h.listing.publish("u2", vec![article("b-new", "https://mp/s/b-new")]);
    h.listing.clear_requests();
    let report = h.controller(SyncMode::Archive).run_cycle(&accounts).await.unwrap();

    assert!(report.accounts.iter().all(|account| !account.skipped));
    assert!(h.listing.requests().contains(&("u1".to_string(), 0, 10)));
    assert_eq!(report.accounts[0].logged, 0);
    assert_eq!(report.accounts[1].logged, 1);
    assert_eq!(logged_links(&h).len(), 7);
}
