//! Public entry points: one-shot route finding over caller-supplied tables
//! and overlay snapshots.
//!
//! Each call is self-contained: it builds its own graph from the input
//! tables, searches, evaluates, and returns. Nothing is cached across
//! calls and no input is ever mutated, so callers may invoke the engine
//! from many threads at once.

use hashbrown::HashSet;
use log::info;
use rayon::prelude::*;

use crate::NodeId;
use crate::error::Error;
use crate::eval::{Route, RouteSet, evaluate_route};
use crate::health::assign_modes;
use crate::model::criteria::Criteria;
use crate::model::mode::TravelMode;
use crate::model::network::{NetworkData, RouteGraph};
use crate::model::overlay::OverlaySnapshot;
use crate::pollution::{ExposureField, ExposureMethod};
use crate::routing::k_shortest_paths;

/// Parameters of one route-finding call.
#[derive(Debug, Clone)]
pub struct RouteQuery {
    pub start: NodeId,
    pub end: NodeId,
    pub mode: TravelMode,
    pub criteria: Criteria,
    /// Requested alternative-route count, ≥ 1.
    pub k: usize,
    /// Minimum edge-set difference required of alternatives, in [0, 1].
    pub min_difference: f64,
    pub exposure_method: ExposureMethod,
    /// Restricts the graph to these node ids (e.g. nodes inside the active
    /// scenario bounds). `None` admits every node in the table.
    pub valid_nodes: Option<HashSet<NodeId>>,
}

impl RouteQuery {
    pub fn new(start: NodeId, end: NodeId, mode: TravelMode, criteria: Criteria) -> Self {
        Self {
            start,
            end,
            mode,
            criteria,
            k: 1,
            min_difference: 0.3,
            exposure_method: ExposureMethod::default(),
            valid_nodes: None,
        }
    }

    pub fn with_alternatives(mut self, k: usize, min_difference: f64) -> Self {
        self.k = k;
        self.min_difference = min_difference;
        self
    }

    /// Reject malformed queries before any graph work begins.
    fn validate(&self, net: &NetworkData) -> Result<(), Error> {
        if self.k == 0 {
            return Err(Error::InvalidQuery("k must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.min_difference) {
            return Err(Error::InvalidQuery(format!(
                "min_difference must lie in [0, 1], got {}",
                self.min_difference
            )));
        }
        for id in [self.start, self.end] {
            let in_table = net.nodes.iter().any(|node| node.id == id);
            let in_bounds = self
                .valid_nodes
                .as_ref()
                .is_none_or(|valid| valid.contains(&id));
            if !in_table || !in_bounds {
                return Err(Error::NodeNotFound(id));
            }
        }
        Ok(())
    }
}

/// Find the single best route, or `None` when start and end are not
/// connected in the mode-filtered, overlay-adjusted graph.
pub fn find_route(
    net: &NetworkData,
    overlays: &OverlaySnapshot,
    query: &RouteQuery,
) -> Result<Option<Route>, Error> {
    let mut single = query.clone();
    single.k = 1;
    let set = find_routes(net, overlays, &single)?;
    Ok(set.routes.into_iter().next())
}

/// Find up to `query.k` ranked routes. An empty [`RouteSet`] means no
/// route exists — an expected network condition, not an error.
pub fn find_routes(
    net: &NetworkData,
    overlays: &OverlaySnapshot,
    query: &RouteQuery,
) -> Result<RouteSet, Error> {
    query.validate(net)?;

    let exposure = ExposureField::new(&overlays.readings);
    let graph = RouteGraph::build(
        net,
        query.mode,
        &overlays.impacts,
        &exposure,
        query.exposure_method,
        query.valid_nodes.as_ref(),
    );

    let start = graph
        .index_of(query.start)
        .ok_or(Error::NodeNotFound(query.start))?;
    let end = graph
        .index_of(query.end)
        .ok_or(Error::NodeNotFound(query.end))?;

    let weights = query.criteria.weights();
    let paths = k_shortest_paths(&graph, &weights, start, end, query.k, query.min_difference);
    info!(
        "{} -> {}: {} of {} requested routes found under {}",
        query.start,
        query.end,
        paths.len(),
        query.k,
        query.criteria
    );
    if paths.is_empty() {
        return Ok(RouteSet::empty());
    }

    let mut routes: Vec<Route> = paths
        .par_iter()
        .map(|(path, _)| evaluate_route(&graph, query.criteria, path))
        .collect();
    routes.sort_by(|a, b| {
        a.total_cost
            .total_cmp(&b.total_cost)
            .then_with(|| a.path.cmp(&b.path))
    });

    // The healthiest criterion keeps only the selected route and attaches
    // its per-group mode plan.
    if query.criteria == Criteria::Healthiest {
        routes.truncate(1);
        let route = &mut routes[0];
        route.mode_plan = Some(assign_modes(&route.segments));
    }

    Ok(RouteSet {
        routes,
        best: Some(0),
    })
}
