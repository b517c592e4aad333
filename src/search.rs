use chrono::Utc;
use spin_sdk::http::{Request, Response};

use crate::auth::authenticate;
use crate::config::{SEARCH_DISTANCE, SEARCH_THRESHOLD};
use crate::core::db::all_users;
use crate::core::errors::ApiResult;
use crate::core::helpers::ok_data;
use crate::core::store::DocumentStore;
use crate::models::models::User;
use crate::models::views::{Populator, UserCard};

/// Approximate substring match of `query` inside `text`, case-insensitive.
///
/// The score is `edits / query_len + match_start / SEARCH_DISTANCE`: `0.0` is an
/// exact match at the start of the text. Returns `None` when the best
/// alignment scores above [`SEARCH_THRESHOLD`].
pub fn match_score(query: &str, text: &str) -> Option<f64> {
    let pattern: Vec<char> = query.trim().to_lowercase().chars().collect();
    let text: Vec<char> = text.to_lowercase().chars().collect();
    if pattern.is_empty() {
        return None;
    }
    let m = pattern.len();

    // Column-wise edit distance where the match may start anywhere in `text`.
    // Each cell carries the text offset its alignment started at.
    let mut prev: Vec<(usize, usize)> = (0..=m).map(|i| (i, 0)).collect();
    let mut best = prev[m];
    for (j, tc) in text.iter().enumerate() {
        let mut current = vec![(0, j + 1); m + 1];
        for i in 1..=m {
            let substitute = (prev[i - 1].0 + usize::from(pattern[i - 1] != *tc), prev[i - 1].1);
            let skip_text = (prev[i].0 + 1, prev[i].1);
            let skip_pattern = (current[i - 1].0 + 1, current[i - 1].1);
            current[i] = [substitute, skip_text, skip_pattern]
                .into_iter()
                .min_by_key(|(cost, _)| *cost)
                .unwrap_or(substitute);
        }
        if current[m].0 < best.0 || (current[m].0 == best.0 && current[m].1 < best.1) {
            best = current[m];
        }
        prev = current;
    }

    let (edits, start) = best;
    let score = edits as f64 / m as f64 + start as f64 / SEARCH_DISTANCE;
    (score <= SEARCH_THRESHOLD).then_some(score)
}

/// Users whose name matches `query`, best match first, never including the
/// requester.
pub fn rank_users<'u>(users: &'u [User], query: &str, requester_id: &str) -> Vec<&'u User> {
    let mut scored: Vec<(f64, &User)> = users
        .iter()
        .filter(|u| u.id != requester_id)
        .filter_map(|u| match_score(query, &u.name).map(|score| (score, u)))
        .collect();
    scored.sort_by(|a, b| a.0.total_cmp(&b.0));
    scored.into_iter().map(|(_, u)| u).collect()
}

pub fn search_users(store: &dyn DocumentStore, requester_id: &str, query: &str) -> anyhow::Result<Vec<UserCard>> {
    let users = all_users(store)?;
    let populator = Populator::new(store, Utc::now());
    rank_users(&users, query, requester_id)
        .into_iter()
        .map(|user| populator.card(user))
        .collect()
}

pub fn handle_search(store: &dyn DocumentStore, req: Request, query: &str) -> ApiResult<Response> {
    let user_id = authenticate(store, &req)?;
    let results = search_users(store, &user_id, query)?;
    tracing::debug!(query = %query, hits = results.len(), "user search");
    ok_data(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::core::test_support::seed_user;

    #[test]
    fn test_exact_prefix_scores_zero() {
        assert_eq!(match_score("ali", "alice"), Some(0.0));
        assert_eq!(match_score("ALI", "Alice"), Some(0.0));
    }

    #[test]
    fn test_later_and_fuzzier_matches_score_worse() {
        let prefix = match_score("ali", "alice").unwrap();
        let inner = match_score("ali", "malik").unwrap();
        let typo = match_score("alx", "alice").unwrap();
        assert!(prefix < inner);
        assert!(inner < typo);
        assert!((typo - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_names_do_not_match() {
        assert_eq!(match_score("alice", "bob"), None);
        assert_eq!(match_score("", "bob"), None);
        assert_eq!(match_score("   ", "bob"), None);
    }

    #[test]
    fn test_rank_excludes_requester_and_orders_by_score() {
        let store = MemoryStore::new();
        let me = seed_user(&store, "alina", false);
        seed_user(&store, "bob", false);
        seed_user(&store, "malin", false);
        seed_user(&store, "alin", false);

        let cards = search_users(&store, &me.id, "alin").unwrap();
        let names: Vec<_> = cards.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alin", "malin"]);
    }
}
