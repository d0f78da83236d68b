use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::node::{NameUsageNode, VernacularName};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Synonym,
    Basionym,
    Vernacular,
}

impl LinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkType::Synonym => "synonym",
            LinkType::Basionym => "basionym",
            LinkType::Vernacular => "vernacular",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Endpoint {
    Usage(Arc<NameUsageNode>),
    Vernacular(Arc<VernacularName>),
}

impl Endpoint {
    pub fn as_usage(&self) -> Option<&Arc<NameUsageNode>> {
        match self {
            Endpoint::Usage(node) => Some(node),
            Endpoint::Vernacular(_) => None,
        }
    }

    pub fn as_vernacular(&self) -> Option<&Arc<VernacularName>> {
        match self {
            Endpoint::Usage(_) => None,
            Endpoint::Vernacular(name) => Some(name),
        }
    }

    fn attach(&self, annotation: &Arc<Annotation>) {
        match self {
            Endpoint::Usage(node) => node.add_annotation(Arc::clone(annotation)),
            Endpoint::Vernacular(name) => name.add_annotation(Arc::clone(annotation)),
        }
    }
}

impl From<Arc<NameUsageNode>> for Endpoint {
    fn from(node: Arc<NameUsageNode>) -> Self {
        Endpoint::Usage(node)
    }
}

impl From<Arc<VernacularName>> for Endpoint {
    fn from(name: Arc<VernacularName>) -> Self {
        Endpoint::Vernacular(name)
    }
}

#[derive(Debug)]
pub struct Annotation {
    link_type: LinkType,
    annotators: Vec<Endpoint>,
    annotatants: Vec<Endpoint>,
}

impl Annotation {
    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn annotators(&self) -> &[Endpoint] {
        &self.annotators
    }

    pub fn annotatants(&self) -> &[Endpoint] {
        &self.annotatants
    }

    pub fn counterparts(&self, node: &Arc<NameUsageNode>) -> Vec<Endpoint> {
        let is_node = |endpoint: &Endpoint| {
            endpoint
                .as_usage()
                .is_some_and(|usage| Arc::ptr_eq(usage, node))
        };
        if self.annotators.iter().any(is_node) {
            self.annotatants.clone()
        } else if self.annotatants.iter().any(is_node) {
            self.annotators.clone()
        } else {
            Vec::new()
        }
    }
}

pub fn link(
    link_type: LinkType,
    annotators: Vec<Endpoint>,
    annotatants: Vec<Endpoint>,
) -> Arc<Annotation> {
    let annotation = Arc::new(Annotation {
        link_type,
        annotators,
        annotatants,
    });
    for endpoint in annotation
        .annotators
        .iter()
        .chain(annotation.annotatants.iter())
    {
        endpoint.attach(&annotation);
    }
    tracing::trace!(
        link_type = %link_type,
        annotators = annotation.annotators.len(),
        annotatants = annotation.annotatants.len(),
        "linked annotation"
    );
    annotation
}
