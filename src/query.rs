use std::collections::HashSet;

use crate::error::TaxaError;
use crate::record::{ParsedNameRecord, SearchResultRecord};
use crate::resolver::Resolver;
use crate::source::{DataSource, SearchFilters};

const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("da", "dan"),
    ("de", "deu"),
    ("en", "eng"),
    ("es", "spa"),
    ("fi", "fin"),
    ("fr", "fra"),
    ("it", "ita"),
    ("ja", "jpn"),
    ("nl", "nld"),
    ("no", "nor"),
    ("pl", "pol"),
    ("pt", "por"),
    ("ru", "rus"),
    ("sv", "swe"),
    ("zh", "zho"),
];

pub fn split_literals(query: &str, delimiter: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let pieces: Vec<&str> = if delimiter.is_empty() {
        vec![query]
    } else {
        query.split(delimiter).collect()
    };
    pieces
        .into_iter()
        .map(|piece| piece.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|literal| !literal.is_empty())
        .filter(|literal| seen.insert(literal.clone()))
        .collect()
}

fn language_matches(locale: Option<&str>, language: Option<&str>) -> bool {
    let Some(locale) = locale
        .map(|locale| locale.trim().to_ascii_lowercase())
        .filter(|locale| !locale.is_empty() && locale != "root")
    else {
        return true;
    };
    let Some(language) = language.map(|language| language.trim().to_ascii_lowercase()) else {
        return false;
    };
    let primary = locale
        .split(['-', '_'])
        .next()
        .unwrap_or(locale.as_str())
        .to_string();
    let expanded = LANGUAGE_CODES
        .iter()
        .find(|(short, _)| *short == primary)
        .map(|(_, long)| *long);
    language == primary || expanded.is_some_and(|long| language == long)
}

fn needs_fallback(parsed: &[ParsedNameRecord]) -> bool {
    match parsed {
        [] => true,
        [only] => only.canonical().is_none(),
        _ => false,
    }
}

fn vernacular_hit(hit: &SearchResultRecord, lowered: &str, locale: Option<&str>) -> bool {
    hit.vernacular_names.iter().any(|name| {
        name.vernacular_name.to_lowercase().contains(lowered)
            && language_matches(locale, name.language.as_deref())
    })
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|known| known == name) {
        names.push(name.to_string());
    }
}

impl<S: DataSource> Resolver<S> {
    pub fn canonical_names(&self, literal: &str) -> Result<Vec<String>, TaxaError> {
        let parsed =
            self.remote_list(&format!("parse {literal}"), |source| source.parse_name(literal))?;
        let mut names = Vec::new();
        if !needs_fallback(&parsed) {
            for canonical in parsed.iter().filter_map(ParsedNameRecord::canonical) {
                push_unique(&mut names, canonical);
            }
            return Ok(names);
        }

        let lowered = literal.to_lowercase();
        let hits = self.remote_list(&format!("search {lowered}"), |source| {
            source.full_text_search(&lowered, &SearchFilters::default())
        })?;
        let locale = self.settings().locale.as_deref();
        let mut candidates = Vec::new();
        for hit in hits.iter().filter(|hit| vernacular_hit(hit, &lowered, locale)) {
            if let Some(canonical) = hit
                .usage
                .canonical_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
            {
                push_unique(&mut candidates, canonical);
            }
        }
        tracing::debug!(literal, candidates = candidates.len(), "falling back to vernacular search");

        for candidate in candidates {
            let reparsed = self.remote_list(&format!("parse {candidate}"), |source| {
                source.parse_name(&candidate)
            })?;
            let mut any = false;
            for canonical in reparsed.iter().filter_map(ParsedNameRecord::canonical) {
                push_unique(&mut names, canonical);
                any = true;
            }
            if !any {
                push_unique(&mut names, &candidate);
            }
        }
        Ok(names)
    }
}
