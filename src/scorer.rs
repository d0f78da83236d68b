use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;

use crate::domain::LocalKey;
use crate::record::{MatchResult, MatchType};

static NOTE_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_]+)\s*=\s*(-?\d+)\s*$").expect("note entry pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchScore {
    pub query: String,
    pub candidate: LocalKey,
    pub confidence: Option<i32>,
    pub match_type: MatchType,
    pub name: Option<i32>,
    pub authorship: Option<i32>,
    pub classification: Option<i32>,
    pub rank: Option<i32>,
    pub accepted: Option<i32>,
    pub single_match: Option<i32>,
    pub total: Option<i32>,
}

impl MatchScore {
    pub fn has_sub_scores(&self) -> bool {
        [
            self.name,
            self.authorship,
            self.classification,
            self.rank,
            self.accepted,
            self.single_match,
            self.total,
        ]
        .iter()
        .any(Option::is_some)
    }
}

pub fn score(query: &str, candidate: LocalKey, raw: &MatchResult) -> MatchScore {
    let mut score = MatchScore {
        query: query.to_string(),
        candidate,
        confidence: raw.confidence,
        match_type: raw.match_type,
        ..Default::default()
    };
    let Some(note) = raw.note.as_deref() else {
        return score;
    };
    let body = match note.split_once(':') {
        Some((prefix, rest)) if !prefix.contains('=') => rest,
        _ => note,
    };
    for entry in body.split(';') {
        let Some(captures) = NOTE_ENTRY.captures(entry) else {
            continue;
        };
        let Ok(value) = captures[2].parse::<i32>() else {
            continue;
        };
        let slot = match captures[1].to_ascii_lowercase().as_str() {
            "name" => &mut score.name,
            "authorship" => &mut score.authorship,
            "classification" => &mut score.classification,
            "rank" => &mut score.rank,
            "status" | "accepted" => &mut score.accepted,
            "singlematch" | "single_match" => &mut score.single_match,
            "score" | "total" => &mut score.total,
            _ => continue,
        };
        *slot = Some(value);
    }
    score
}

#[derive(Default)]
struct ScoreMaps {
    by_query: HashMap<String, HashMap<LocalKey, Arc<MatchScore>>>,
    by_candidate: HashMap<LocalKey, HashMap<String, Arc<MatchScore>>>,
}

#[derive(Default)]
pub struct ScoreIndex {
    maps: Mutex<ScoreMaps>,
}

impl ScoreIndex {
    pub fn record(&self, score: MatchScore) -> Arc<MatchScore> {
        let score = Arc::new(score);
        let mut maps = self.maps.lock();
        maps.by_query
            .entry(score.query.clone())
            .or_default()
            .insert(score.candidate, Arc::clone(&score));
        maps.by_candidate
            .entry(score.candidate)
            .or_default()
            .insert(score.query.clone(), Arc::clone(&score));
        score
    }

    pub fn score(&self, query: &str, candidate: LocalKey, raw: &MatchResult) -> Arc<MatchScore> {
        self.record(score(query, candidate, raw))
    }

    pub fn get(&self, query: &str, candidate: LocalKey) -> Option<Arc<MatchScore>> {
        self.maps
            .lock()
            .by_query
            .get(query)
            .and_then(|scores| scores.get(&candidate))
            .cloned()
    }

    pub fn for_query(&self, query: &str) -> Vec<Arc<MatchScore>> {
        let maps = self.maps.lock();
        let mut scores: Vec<_> = maps
            .by_query
            .get(query)
            .map(|scores| scores.values().cloned().collect())
            .unwrap_or_default();
        scores.sort_by(|a, b| b.confidence.cmp(&a.confidence).then(a.candidate.cmp(&b.candidate)));
        scores
    }

    pub fn for_candidate(&self, candidate: LocalKey) -> Vec<Arc<MatchScore>> {
        let maps = self.maps.lock();
        let mut scores: Vec<_> = maps
            .by_candidate
            .get(&candidate)
            .map(|scores| scores.values().cloned().collect())
            .unwrap_or_default();
        scores.sort_by(|a, b| a.query.cmp(&b.query));
        scores
    }

    pub fn len(&self) -> usize {
        self.maps.lock().by_query.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut maps = self.maps.lock();
        for scores in maps.by_query.values_mut() {
            scores.clear();
        }
        for scores in maps.by_candidate.values_mut() {
            scores.clear();
        }
        maps.by_query.clear();
        maps.by_candidate.clear();
    }
}
