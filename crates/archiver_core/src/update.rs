use std::collections::HashSet;

use crate::{is_valid, Article, Effect, Msg, PassState, Phase, StopBoundary, SyncMode, PROBE_SIZE};

/// Pure update function: applies a listing result to the pass and returns the
/// next effects to run.
///
/// `captured` is the set of links already recorded in the archive log. Messages
/// that do not fit the current phase are ignored.
pub fn update(
    mut state: PassState,
    msg: Msg,
    captured: &HashSet<String>,
) -> (PassState, Vec<Effect>) {
    let effects = match (state.phase(), msg) {
        (Phase::Idle, Msg::Begin) => match state.mode() {
            SyncMode::Archive => {
                state.set_phase(Phase::Probing);
                vec![Effect::FetchProbe { count: PROBE_SIZE }]
            }
            SyncMode::Update => {
                state.set_phase(Phase::Paging);
                vec![fetch_next(&state)]
            }
        },
        (Phase::Probing, Msg::ProbeLoaded(probe)) => {
            // An empty probe is not proof of "unchanged": page anyway.
            let unchanged = matches!(state.boundary(), StopBoundary::Link(_))
                && probe.first().is_some_and(|newest| state.hits_boundary(newest));
            if unchanged {
                state.set_phase(Phase::Skipped);
                vec![Effect::SkipAccount]
            } else {
                state.set_phase(Phase::Paging);
                vec![fetch_next(&state)]
            }
        }
        (Phase::Paging, Msg::PageLoaded(page)) => on_page(&mut state, page, captured),
        _ => Vec::new(),
    };

    (state, effects)
}

fn on_page(state: &mut PassState, page: Vec<Article>, captured: &HashSet<String>) -> Vec<Effect> {
    state.stats_mut().pages_fetched += 1;
    let full_page = page.len() as u64 >= u64::from(state.page_size());

    for article in page {
        // Boundary check runs before validity: an expired article can still be
        // the recorded boundary.
        if state.hits_boundary(&article) {
            state.stats_mut().boundary_reached = true;
            return finish(state);
        }
        if !is_valid(&article) {
            state.stats_mut().skipped_invalid += 1;
            continue;
        }
        let known = article.link().is_some_and(|link| captured.contains(link));
        match state.mode() {
            SyncMode::Archive => {
                if known {
                    state.stats_mut().skipped_known += 1;
                    continue;
                }
                state.note_candidate(&article);
            }
            SyncMode::Update => {
                // Known links still move the history boundary forward.
                state.note_candidate(&article);
                if known {
                    state.stats_mut().skipped_known += 1;
                    continue;
                }
            }
        }
        if !state.accept(article) {
            state.stats_mut().skipped_known += 1;
        }
    }

    if !full_page {
        return finish(state);
    }
    state.advance_page();
    vec![Effect::Pause, fetch_next(state)]
}

fn fetch_next(state: &PassState) -> Effect {
    Effect::FetchPage {
        begin: state.next_begin(),
        count: state.page_size(),
    }
}

fn finish(state: &mut PassState) -> Vec<Effect> {
    state.set_phase(Phase::Finished);
    let (articles, history) = state.take_flush();
    if articles.is_empty() && history.is_none() {
        vec![Effect::NothingNew]
    } else {
        vec![Effect::Flush { articles, history }]
    }
}
