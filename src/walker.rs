use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::annotation::{self, Endpoint, LinkType};
use crate::domain::{LocalKey, MatchingMode};
use crate::error::TaxaError;
use crate::node::NameUsageNode;
use crate::query::split_literals;
use crate::rank::Rank;
use crate::resolver::Resolver;
use crate::source::{AncestorOrder, DataSource, FuzzyMatchRequest, SearchFilters};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub rank: Option<Rank>,
    pub include_synonyms: bool,
    pub include_basionyms: bool,
    pub strict: bool,
    pub verbose: bool,
    pub classification: Option<String>,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    pub ancestors: Vec<Arc<NameUsageNode>>,
    pub descendants: Vec<Arc<NameUsageNode>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpansionStage {
    Seed,
    Basionyms,
    Synonyms,
    Vernaculars,
    Done,
}

#[derive(Default)]
struct UsageSet {
    keys: HashSet<LocalKey>,
    nodes: Vec<Arc<NameUsageNode>>,
}

impl UsageSet {
    fn push(&mut self, node: &Arc<NameUsageNode>) {
        if self.keys.insert(node.key()) {
            self.nodes.push(Arc::clone(node));
        }
    }

    fn into_vec(self) -> Vec<Arc<NameUsageNode>> {
        self.nodes
    }
}

fn passes(node: &NameUsageNode, rank: Option<Rank>) -> bool {
    match (rank, node.rank()) {
        (None, _) | (_, None) | (_, Some(Rank::Unranked)) => true,
        (Some(wanted), Some(actual)) => wanted == actual,
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|haystack| haystack.to_lowercase().contains(needle))
}

impl<S: DataSource> Resolver<S> {
    pub fn name_usages(
        &self,
        query: &str,
        mode: MatchingMode,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        match mode {
            MatchingMode::Exact => self.exact_name_usages(query, options),
            MatchingMode::Fuzzy => self.fuzzy_name_usages(query, options),
            MatchingMode::FullText => self.full_text_name_usages(query, options),
            MatchingMode::Suggest => self.suggested_name_usages(query, options),
            MatchingMode::Contains => self.contains_name_usages(query, options),
        }
    }

    pub fn exact_name_usages(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let mut queue: VecDeque<String> =
            split_literals(query, &self.settings().delimiter).into();
        let mut knowns: HashSet<String> = HashSet::new();
        let mut expanded: HashSet<LocalKey> = HashSet::new();
        let mut usages = UsageSet::default();

        while let Some(literal) = queue.pop_front() {
            for name in self.canonical_names(&literal)? {
                if !knowns.insert(name.clone()) {
                    continue;
                }
                let records = self.remote_list(&format!("usages named {name}"), |source| {
                    source.list_by_canonical_name(&name, options.rank)
                })?;
                let mut discovered = Vec::new();
                for record in records {
                    let node = self.resolve_record(record)?;
                    if expanded.insert(node.key()) {
                        self.expand_node(&node, options, &mut discovered, &mut usages)?;
                    }
                }
                for literal in discovered {
                    if !knowns.contains(&literal) && !queue.contains(&literal) {
                        tracing::debug!(literal = %literal, "queueing discovered literal");
                        queue.push_back(literal);
                    }
                }
            }
        }
        Ok(usages.into_vec())
    }

    pub fn fuzzy_name_usages(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let mut usages = UsageSet::default();
        let mut expanded = HashSet::new();
        for literal in split_literals(query, &self.settings().delimiter) {
            let request = FuzzyMatchRequest {
                name: &literal,
                rank: options.rank,
                classification: options.classification.as_deref(),
                strict: options.strict,
                verbose: options.verbose,
            };
            let Some(result) =
                self.remote(&format!("match {literal}"), |source| source.match_fuzzy(&request))?
            else {
                continue;
            };
            for candidate in result.candidates() {
                let Some(key) = candidate.usage_key else {
                    continue;
                };
                let Some(node) = self.resolve_key(key)? else {
                    continue;
                };
                self.cache().scores().score(&literal, key, candidate);
                if expanded.insert(key) {
                    self.expand_node(&node, options, &mut Vec::new(), &mut usages)?;
                }
            }
        }
        Ok(usages.into_vec())
    }

    pub fn full_text_name_usages(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        self.search_name_usages(query, options, |_, _| true)
    }

    pub fn contains_name_usages(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        self.search_name_usages(query, options, |literal, hit| {
            let needle = literal.to_lowercase();
            contains_ignore_case(hit.usage.canonical_name.as_deref(), &needle)
                || contains_ignore_case(hit.usage.scientific_name.as_deref(), &needle)
        })
    }

    pub fn suggested_name_usages(
        &self,
        query: &str,
        options: &QueryOptions,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let mut usages = UsageSet::default();
        let mut expanded = HashSet::new();
        for literal in split_literals(query, &self.settings().delimiter) {
            let hits = self.remote_list(&format!("suggest {literal}"), |source| {
                source.suggest(&literal, options.rank)
            })?;
            for hit in hits {
                let node = self.resolve_suggest_result(hit);
                if expanded.insert(node.key()) {
                    self.expand_node(&node, options, &mut Vec::new(), &mut usages)?;
                }
            }
        }
        Ok(usages.into_vec())
    }

    fn search_name_usages<F>(
        &self,
        query: &str,
        options: &QueryOptions,
        keep: F,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError>
    where
        F: Fn(&str, &crate::record::SearchResultRecord) -> bool,
    {
        let mut filters = options.filters.clone();
        if filters.rank.is_none() {
            filters.rank = options.rank;
        }
        let mut usages = UsageSet::default();
        let mut expanded = HashSet::new();
        for literal in split_literals(query, &self.settings().delimiter) {
            let hits = self.remote_list(&format!("search {literal}"), |source| {
                source.full_text_search(&literal, &filters)
            })?;
            for hit in hits.into_iter().filter(|hit| keep(&literal, hit)) {
                let node = self.resolve_search_result(hit)?;
                if expanded.insert(node.key()) {
                    self.expand_node(&node, options, &mut Vec::new(), &mut usages)?;
                }
            }
        }
        Ok(usages.into_vec())
    }

    fn expand_node(
        &self,
        node: &Arc<NameUsageNode>,
        options: &QueryOptions,
        discovered: &mut Vec<String>,
        usages: &mut UsageSet,
    ) -> Result<(), TaxaError> {
        let mut stage = ExpansionStage::Seed;
        loop {
            stage = match stage {
                ExpansionStage::Seed => {
                    if passes(node, options.rank) {
                        usages.push(node);
                    }
                    ExpansionStage::Basionyms
                }
                ExpansionStage::Basionyms => {
                    if options.include_basionyms {
                        self.expand_basionyms(node, options, discovered, usages)?;
                    }
                    ExpansionStage::Synonyms
                }
                ExpansionStage::Synonyms => {
                    if options.include_synonyms {
                        self.expand_synonyms(node, options, discovered, usages)?;
                    }
                    ExpansionStage::Vernaculars
                }
                ExpansionStage::Vernaculars => {
                    self.ensure_vernaculars(node)?;
                    ExpansionStage::Done
                }
                ExpansionStage::Done => return Ok(()),
            };
        }
    }

    fn expand_basionyms(
        &self,
        node: &Arc<NameUsageNode>,
        options: &QueryOptions,
        discovered: &mut Vec<String>,
        usages: &mut UsageSet,
    ) -> Result<(), TaxaError> {
        let key = node.key();
        let records =
            self.remote_list(&format!("combinations {key}"), |source| source.list_combinations(key))?;
        let mut combinations = Vec::new();
        for record in records.into_iter().filter(|record| record.key != key) {
            let combination = self.resolve_record(record)?;
            if passes(&combination, options.rank) {
                usages.push(&combination);
            }
            if let Some(literal) = combination.literal() {
                discovered.push(literal);
            }
            combinations.push(Endpoint::from(combination));
        }
        if !combinations.is_empty() {
            annotation::link(
                LinkType::Basionym,
                vec![Endpoint::from(Arc::clone(node))],
                combinations,
            );
        }
        Ok(())
    }

    fn expand_synonyms(
        &self,
        node: &Arc<NameUsageNode>,
        options: &QueryOptions,
        discovered: &mut Vec<String>,
        usages: &mut UsageSet,
    ) -> Result<(), TaxaError> {
        let accepted = if node.is_synonym() {
            match self.accepted(node)? {
                Some(accepted) => {
                    if passes(&accepted, options.rank) {
                        usages.push(&accepted);
                    }
                    if let Some(literal) = accepted.literal() {
                        discovered.push(literal);
                    }
                    accepted
                }
                None => return Ok(()),
            }
        } else {
            Arc::clone(node)
        };

        let key = accepted.key();
        let records =
            self.remote_list(&format!("synonyms {key}"), |source| source.list_synonyms(key))?;
        let mut synonyms = Vec::new();
        for record in records.into_iter().filter(|record| record.key != key) {
            let synonym = self.resolve_record(record)?;
            if synonym.is_synonym() {
                synonym.set_senior(&accepted);
            }
            if passes(&synonym, options.rank) {
                usages.push(&synonym);
            }
            if let Some(literal) = synonym.literal() {
                discovered.push(literal);
            }
            synonyms.push(Endpoint::from(synonym));
        }
        if !synonyms.is_empty() {
            annotation::link(LinkType::Synonym, vec![Endpoint::from(accepted)], synonyms);
        }
        Ok(())
    }

    pub fn get_higher(
        &self,
        node: &Arc<NameUsageNode>,
        rank_stop: Option<Rank>,
        height: i32,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let limit = usize::try_from(height).ok();
        if limit == Some(0) {
            return Ok(Vec::new());
        }
        if let Some(chain) = cached_ancestors(node, rank_stop, limit) {
            self.note_cache_hit(node.key());
            return Ok(chain);
        }

        let key = node.key();
        let Some(mut records) =
            self.remote(&format!("parents {key}"), |source| source.list_parents(key))?
        else {
            return Ok(Vec::new());
        };
        if self.source().ancestor_order() == AncestorOrder::RootFirst {
            records.reverse();
        }

        let registry = self.registry();
        let mut ancestors: Vec<Arc<NameUsageNode>> = Vec::new();
        let mut child = Arc::clone(node);
        let mut complete = true;
        for record in records.into_iter().filter(|record| record.key != key) {
            if limit.is_some_and(|limit| ancestors.len() >= limit) {
                complete = false;
                break;
            }
            let rank = record
                .rank
                .as_deref()
                .map(|marker| Rank::from_marker(registry, marker));
            if let (Some(stop), Some(rank)) = (rank_stop, rank)
                && rank.is_higher_than(stop)
            {
                complete = false;
                break;
            }
            let ancestor = self.resolve_record(record)?;
            child.set_higher(&ancestor);
            ancestors.push(Arc::clone(&ancestor));
            child = ancestor;
        }
        if complete {
            node.mark_ancestors_complete();
            for ancestor in &ancestors {
                ancestor.mark_ancestors_complete();
            }
        }
        Ok(ancestors)
    }

    pub fn get_lower(
        &self,
        node: &Arc<NameUsageNode>,
        depth: i32,
    ) -> Result<Vec<Arc<NameUsageNode>>, TaxaError> {
        let mut descendants = Vec::new();
        let mut visited = HashSet::from([node.key()]);
        let mut queue = VecDeque::from([(Arc::clone(node), 0i32)]);
        while let Some((parent, level)) = queue.pop_front() {
            let Some(children) = self.children(&parent)? else {
                continue;
            };
            for child in children {
                if !visited.insert(child.key()) {
                    continue;
                }
                descendants.push(Arc::clone(&child));
                if depth < 0 || level < depth {
                    queue.push_back((child, level + 1));
                }
            }
        }
        Ok(descendants)
    }

    pub fn expand(
        &self,
        node: &Arc<NameUsageNode>,
        rank_stop: Option<Rank>,
        height: i32,
        depth: i32,
    ) -> Result<Hierarchy, TaxaError> {
        Ok(Hierarchy {
            ancestors: self.get_higher(node, rank_stop, height)?,
            descendants: self.get_lower(node, depth)?,
        })
    }

    /// `None` when the fetch failed and was tolerated; `lower` stays unresolved.
    fn children(
        &self,
        parent: &Arc<NameUsageNode>,
    ) -> Result<Option<Vec<Arc<NameUsageNode>>>, TaxaError> {
        if let Some(lower) = parent.lower() {
            self.note_cache_hit(parent.key());
            return Ok(Some(lower));
        }
        let key = parent.key();
        let Some(records) =
            self.remote(&format!("children {key}"), |source| source.list_children(key))?
        else {
            return Ok(None);
        };
        let mut children: Vec<Arc<NameUsageNode>> = Vec::with_capacity(records.len());
        for record in records.into_iter().filter(|record| record.key != key) {
            let child = self.resolve_record(record)?;
            if children.iter().any(|known| Arc::ptr_eq(known, &child)) {
                continue;
            }
            child.set_higher_if_unset(parent);
            children.push(child);
        }
        parent.set_lower(children.clone());
        Ok(Some(children))
    }
}

fn cached_ancestors(
    node: &Arc<NameUsageNode>,
    rank_stop: Option<Rank>,
    limit: Option<usize>,
) -> Option<Vec<Arc<NameUsageNode>>> {
    let mut chain = Vec::new();
    let mut current = Arc::clone(node);
    loop {
        if limit.is_some_and(|limit| chain.len() >= limit) {
            return Some(chain);
        }
        match current.higher() {
            Some(parent) => {
                if let (Some(stop), Some(rank)) = (rank_stop, parent.rank())
                    && rank.is_higher_than(stop)
                {
                    return Some(chain);
                }
                chain.push(Arc::clone(&parent));
                current = parent;
            }
            None if current.ancestors_complete() => return Some(chain),
            None => return None,
        }
    }
}
