use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use archiver_core::SyncMode;
use archiver_engine::{
    CycleReport, DocumentWriter, FetchSettings, JsonHistoryStore, MpListingClient, ReqwestFetcher,
    Session, SyncController, SyncSettings, TextArchiveLog, WriteOutcome, WriterSettings,
};
use archiver_logging::{engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::config::Config;

const ARTICLE_FETCH_PAUSE: Duration = Duration::from_secs(1);

/// Wire the production listing client, stores and writer for `mode`.
pub fn build_controller(config: &Config, mode: SyncMode) -> anyhow::Result<SyncController> {
    let session = Session::new(config.token.clone(), config.cookie.clone());
    let fetch_settings = FetchSettings::default();

    let listing = MpListingClient::new(&config.listing_endpoint, session.clone(), &fetch_settings)
        .context("building listing client")?;
    let fetcher =
        ReqwestFetcher::new(fetch_settings, &session).context("building article fetcher")?;
    let history = JsonHistoryStore::open(&config.history_file)
        .with_context(|| format!("opening history {}", config.history_file.display()))?;

    let writer = DocumentWriter::new(
        Arc::new(fetcher),
        WriterSettings {
            base_dir: config.output_dir.clone(),
            min_bytes: config.min_file_size_bytes(),
            fetch_pause: ARTICLE_FETCH_PAUSE,
        },
    );

    Ok(SyncController::new(
        Arc::new(listing),
        Arc::new(TextArchiveLog::new(&config.archive_log)),
        Arc::new(history),
        writer,
        SyncSettings {
            mode,
            ..SyncSettings::default()
        },
    ))
}

/// How the interrupt watcher ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// A second interrupt arrived while the current cycle was still running.
    Forced,
    /// Signals can no longer be received; only the first one, if any, took effect.
    Unavailable,
}

/// Cancel `cancel` on the first interrupt and return `Forced` on the second.
pub async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationToken) -> Interrupt
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(err) = next_interrupt().await {
        engine_warn!("Cannot listen for interrupts: {}", err);
        return Interrupt::Unavailable;
    }
    engine_info!("Interrupt received, finishing the current cycle (interrupt again to abort)");
    cancel.cancel();

    match next_interrupt().await {
        Ok(()) => {
            engine_warn!("Second interrupt, aborting the running cycle");
            Interrupt::Forced
        }
        Err(err) => {
            engine_warn!("Cannot listen for interrupts: {}", err);
            Interrupt::Unavailable
        }
    }
}

pub fn log_report(report: &CycleReport) {
    for account in &report.accounts {
        if account.skipped {
            engine_info!("[{}] unchanged", account.display_name);
            continue;
        }
        let discarded = account
            .documents
            .iter()
            .filter(|doc| matches!(doc.outcome, Ok(WriteOutcome::Discarded { .. })))
            .count();
        engine_info!(
            "[{}] pages={} new={} saved={} discarded={} failed={} invalid={} known={}",
            account.display_name,
            account.stats.pages_fetched,
            account.logged,
            account.saved(),
            discarded,
            account.failed(),
            account.stats.skipped_invalid,
            account.stats.skipped_known
        );
        for doc in &account.documents {
            if let Err(err) = &doc.outcome {
                engine_warn!("[{}] {} ({}): {}", account.display_name, doc.title, doc.link, err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn listing_body(server: &str) -> String {
        let info = json!({
            "sent_info": {"time": 0},
            "appmsg_info": [
                {"title": "Hello", "content_url": format!("{server}/s/hello"), "digest": "greeting"},
                {"title": "Expired", "content_url": format!("{server}/s/old?tempkey=x")}
            ]
        });
        let page = json!({"total_count": 2, "publish_list": [{"publish_info": info.to_string()}]});
        json!({"base_resp": {"ret": 0}, "publish_page": page.to_string()}).to_string()
    }

    #[tokio::test]
    async fn first_interrupt_cancels_second_forces_exit() {
        let cancel = CancellationToken::new();
        let seen = std::cell::Cell::new(0);
        let outcome = watch_interrupts(
            || {
                seen.set(seen.get() + 1);
                async { Ok(()) }
            },
            cancel.clone(),
        )
        .await;
        assert_eq!(outcome, Interrupt::Forced);
        assert_eq!(seen.get(), 2);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn missing_signal_support_leaves_token_alone() {
        let cancel = CancellationToken::new();
        let outcome = watch_interrupts(
            || async { Err(io::Error::new(io::ErrorKind::Unsupported, "no signals")) },
            cancel.clone(),
        )
        .await;
        assert_eq!(outcome, Interrupt::Unavailable);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn one_archive_cycle_end_to_end() {
        archiver_logging::initialize_for_tests();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cgi-bin/appmsgpublish"))
            .and(query_param("fakeid", "MzA1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(&server.uri())))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/s/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"<html><body><div id="js_content"><p>Hi there</p></div></body></html>"#,
                "text/html; charset=utf-8",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.json");
        let config_json = json!({
            "token": "t",
            "cookie": "c=1",
            "min_file_size_kb": 0,
            "accounts": [{"fakeid": "MzA1", "name": "Acct"}],
            "output_dir": dir.path().join("articles"),
            "archive_log": dir.path().join("archive_log.txt"),
            "history_file": dir.path().join("history.json"),
            "listing_endpoint": format!("{}/cgi-bin/appmsgpublish", server.uri()),
        });
        std::fs::write(&config_path, config_json.to_string()).unwrap();
        let config = Config::load(&config_path).unwrap();

        let controller = build_controller(&config, SyncMode::Archive).unwrap();
        let report = controller.run_cycle(&config.accounts).await.unwrap();
        log_report(&report);

        assert_eq!(report.logged(), 1);
        assert_eq!(report.saved(), 1);
        let doc = std::fs::read_to_string(
            dir.path().join("articles").join("Acct").join("Unknown_Hello.md"),
        )
        .unwrap();
        assert!(doc.starts_with("# Hello\n\n**Date:** Unknown\n"));
        assert!(doc.ends_with("**Summary:** greeting\n\nHi there"));
        let log = std::fs::read_to_string(dir.path().join("archive_log.txt")).unwrap();
        assert!(log.contains("first title: Hello\n"));
        assert!(!log.contains("tempkey"));
    }
}
