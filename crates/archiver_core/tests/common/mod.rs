#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Once;

use archiver_core::{update, Article, Effect, Msg, PassState};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(archiver_logging::initialize_for_tests);
}

pub fn article(title: &str, link: &str) -> Article {
    Article {
        title: title.to_string(),
        link: Some(link.to_string()),
        publish_time: 1_700_000_000,
        digest: String::new(),
        author: String::new(),
    }
}

pub fn link(n: usize) -> String {
    format!("https://mp.example/s/{n}")
}

/// `count` articles named `prefix0..`, links numbered from `first`.
pub fn page(prefix: &str, first: usize, count: usize) -> Vec<Article> {
    (first..first + count)
        .map(|n| article(&format!("{prefix}{n}"), &link(n)))
        .collect()
}

pub fn captured(links: &[&str]) -> HashSet<String> {
    links.iter().map(|l| l.to_string()).collect()
}

/// Outcome of driving a pass against a scripted listing.
pub struct Driven {
    pub state: PassState,
    pub effects: Vec<Effect>,
    pub requests: Vec<(u32, u32)>,
}

impl Driven {
    pub fn flush(&self) -> Option<&Effect> {
        self.effects
            .iter()
            .find(|e| matches!(e, Effect::Flush { .. }))
    }

    pub fn flushed_titles(&self) -> Vec<String> {
        match self.flush() {
            Some(Effect::Flush { articles, .. }) => {
                articles.iter().map(|a| a.title.clone()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Drives a pass to completion. `listing` holds every article of the account
/// newest first; page requests are served from it by offset.
pub fn drive(state: PassState, listing: &[Article], captured: &HashSet<String>) -> Driven {
    let mut state = state;
    let mut all_effects = Vec::new();
    let mut requests = Vec::new();
    let mut queue = vec![Msg::Begin];

    while let Some(msg) = queue.pop() {
        let (next, effects) = update(state, msg, captured);
        state = next;
        for effect in effects {
            match &effect {
                Effect::FetchProbe { count } => {
                    requests.push((0, *count));
                    queue.push(Msg::ProbeLoaded(serve(listing, 0, *count)));
                }
                Effect::FetchPage { begin, count } => {
                    requests.push((*begin, *count));
                    queue.push(Msg::PageLoaded(serve(listing, *begin, *count)));
                }
                _ => {}
            }
            all_effects.push(effect);
        }
        assert!(requests.len() < 1_000, "runaway paging");
    }

    Driven {
        state,
        effects: all_effects,
        requests,
    }
}

fn serve(listing: &[Article], begin: u32, count: u32) -> Vec<Article> {
    listing
        .iter()
        .skip(begin as usize)
        .take(count as usize)
        .cloned()
        .collect()
}
