//! Site graph built from page outlinks

use crate::state::{Page, PageId};
use serde::Serialize;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub url: String,
    /// None for link targets that were never fetched
    pub page: Option<PageId>,
    pub status: Option<String>,
}

impl GraphNode {
    pub fn is_fetched(&self) -> bool {
        self.page.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

/// Nodes are fetched pages plus linked-but-unfetched targets; edges are outlinks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl SiteGraph {
    /// Builds the graph; nodes and edges are sorted by URL
    pub fn build<P: Borrow<Page>>(pages: &[P]) -> Self {
        let mut nodes: BTreeMap<String, GraphNode> = BTreeMap::new();
        let mut edges = BTreeSet::new();

        for page in pages.iter().map(Borrow::borrow) {
            nodes.insert(
                page.url.clone(),
                GraphNode {
                    url: page.url.clone(),
                    page: Some(page.id),
                    status: Some(page.status.to_string()),
                },
            );
        }

        for page in pages.iter().map(Borrow::borrow) {
            let targets = page.content.outlinks.iter().chain(page.redirect_target.iter());
            for target in targets {
                nodes.entry(target.clone()).or_insert_with(|| GraphNode {
                    url: target.clone(),
                    page: None,
                    status: None,
                });
                edges.insert(GraphEdge {
                    source: page.url.clone(),
                    target: target.clone(),
                });
            }
        }

        Self {
            nodes: nodes.into_values().collect(),
            edges: edges.into_iter().collect(),
        }
    }

    pub fn unfetched(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| !n.is_fetched())
    }
}
