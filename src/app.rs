use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::CacheSizes;
use crate::domain::MatchingMode;
use crate::error::TaxaError;
use crate::node::NameUsageNode;
use crate::rank::Rank;
use crate::resolver::{Resolver, ResolverStats};
use crate::scorer::MatchScore;
use crate::source::DataSource;
use crate::walker::QueryOptions;

#[derive(Debug, Clone, Serialize)]
pub struct UsageView {
    pub key: i64,
    pub persistent_id: String,
    pub name: Option<String>,
    pub rank: Option<String>,
    pub authority: Option<String>,
    pub status: Option<String>,
    pub dataset: Option<String>,
    pub parent_key: Option<i64>,
    pub accepted_key: Option<i64>,
    pub basionym_key: Option<i64>,
    pub num_descendants: Option<u32>,
    pub vernacular_names: Vec<VernacularView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<MatchScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VernacularView {
    pub name: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageResult {
    pub resolved_at: String,
    pub usages: Vec<UsageView>,
    pub stats: ResolverStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub resolved_at: String,
    pub query: String,
    pub mode: String,
    pub usages: Vec<UsageView>,
    pub stats: ResolverStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyResult {
    pub resolved_at: String,
    pub usage: UsageView,
    pub ancestors: Vec<UsageView>,
    pub descendants: Vec<UsageView>,
    pub stats: ResolverStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: bool,
    pub dropped: CacheSizes,
}

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub mode: Option<MatchingMode>,
    pub query: QueryOptions,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<S: DataSource> {
    resolver: Resolver<S>,
}

impl<S: DataSource> App<S> {
    pub fn new(resolver: Resolver<S>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Resolver<S> {
        &self.resolver
    }

    pub fn usage(&self, keys: &[String], sink: &dyn ProgressSink) -> Result<UsageResult, TaxaError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; resolving {} key argument(s)", keys.len()),
            elapsed: None,
        });
        let start = Instant::now();
        let mut nodes: Vec<Arc<NameUsageNode>> = Vec::new();
        for argument in keys {
            for node in self.resolver.resolve_keys(argument)? {
                if !nodes.iter().any(|known| Arc::ptr_eq(known, &node)) {
                    nodes.push(node);
                }
            }
        }
        if nodes.is_empty() {
            return Err(TaxaError::NotFound(keys.join(", ")));
        }
        sink.event(ProgressEvent {
            message: format!("phase=Done; resolved {} usage(s)", nodes.len()),
            elapsed: Some(start.elapsed()),
        });

        Ok(UsageResult {
            resolved_at: timestamp(),
            usages: nodes.iter().map(|node| self.view(node, None)).collect(),
            stats: self.resolver.stats(),
        })
    }

    pub fn search(
        &self,
        query: &str,
        options: &SearchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SearchResult, TaxaError> {
        let mode = options.mode.unwrap_or(MatchingMode::Exact);
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; mode={mode} query={query}"),
            elapsed: None,
        });
        let start = Instant::now();
        let nodes = self.resolver.name_usages(query, mode, &options.query)?;
        sink.event(ProgressEvent {
            message: format!("phase=Done; matched {} usage(s)", nodes.len()),
            elapsed: Some(start.elapsed()),
        });

        let usages = nodes
            .iter()
            .map(|node| {
                let score = (mode == MatchingMode::Fuzzy)
                    .then(|| best_score(&self.resolver, node))
                    .flatten();
                self.view(node, score)
            })
            .collect();
        Ok(SearchResult {
            resolved_at: timestamp(),
            query: query.to_string(),
            mode: mode.to_string(),
            usages,
            stats: self.resolver.stats(),
        })
    }

    pub fn higher(
        &self,
        key: &str,
        rank_stop: Option<Rank>,
        height: i32,
        sink: &dyn ProgressSink,
    ) -> Result<HierarchyResult, TaxaError> {
        let node = self.resolve_one(key, sink)?;
        sink.event(ProgressEvent {
            message: format!("phase=Walk; ancestors of {} height={height}", node.key()),
            elapsed: None,
        });
        let start = Instant::now();
        let ancestors = self.resolver.get_higher(&node, rank_stop, height)?;
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} ancestor(s)", ancestors.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(self.hierarchy(&node, &ancestors, &[]))
    }

    pub fn lower(
        &self,
        key: &str,
        depth: i32,
        sink: &dyn ProgressSink,
    ) -> Result<HierarchyResult, TaxaError> {
        let node = self.resolve_one(key, sink)?;
        sink.event(ProgressEvent {
            message: format!("phase=Walk; descendants of {} depth={depth}", node.key()),
            elapsed: None,
        });
        let start = Instant::now();
        let descendants = self.resolver.get_lower(&node, depth)?;
        sink.event(ProgressEvent {
            message: format!("phase=Done; {} descendant(s)", descendants.len()),
            elapsed: Some(start.elapsed()),
        });
        Ok(self.hierarchy(&node, &[], &descendants))
    }

    pub fn clear(&self, sink: &dyn ProgressSink) -> ClearResult {
        let dropped = self.resolver.cache().sizes();
        self.resolver.clear();
        sink.event(ProgressEvent {
            message: format!("phase=Done; dropped {} cached usage(s)", dropped.nodes),
            elapsed: None,
        });
        ClearResult {
            cleared: true,
            dropped,
        }
    }

    fn resolve_one(
        &self,
        key: &str,
        sink: &dyn ProgressSink,
    ) -> Result<Arc<NameUsageNode>, TaxaError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; resolving {key}"),
            elapsed: None,
        });
        self.resolver
            .resolve_keys(key)?
            .into_iter()
            .next()
            .ok_or_else(|| TaxaError::NotFound(key.to_string()))
    }

    fn hierarchy(
        &self,
        node: &Arc<NameUsageNode>,
        ancestors: &[Arc<NameUsageNode>],
        descendants: &[Arc<NameUsageNode>],
    ) -> HierarchyResult {
        HierarchyResult {
            resolved_at: timestamp(),
            usage: self.view(node, None),
            ancestors: ancestors.iter().map(|node| self.view(node, None)).collect(),
            descendants: descendants
                .iter()
                .map(|node| self.view(node, None))
                .collect(),
            stats: self.resolver.stats(),
        }
    }

    fn view(&self, node: &Arc<NameUsageNode>, score: Option<MatchScore>) -> UsageView {
        UsageView {
            key: node.key().value(),
            persistent_id: node.persistent_id().to_string(),
            name: node.literal(),
            rank: node.rank().map(|rank| rank.to_string()),
            authority: node.authority(),
            status: node.status().map(|status| status.to_string()),
            dataset: node.dataset().and_then(|dataset| dataset.title.clone()),
            parent_key: node.parent_key().map(|key| key.value()),
            accepted_key: node.accepted_key().map(|key| key.value()),
            basionym_key: node.basionym_key().map(|key| key.value()),
            num_descendants: node.num_descendants(),
            vernacular_names: self
                .resolver
                .vernaculars(node)
                .iter()
                .map(|name| VernacularView {
                    name: name.name().to_string(),
                    language: name.language().map(str::to_string),
                })
                .collect(),
            score,
        }
    }
}

fn best_score<S: DataSource>(resolver: &Resolver<S>, node: &NameUsageNode) -> Option<MatchScore> {
    resolver
        .cache()
        .scores()
        .for_candidate(node.key())
        .into_iter()
        .max_by_key(|score| score.confidence)
        .map(|score| (*score).clone())
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
