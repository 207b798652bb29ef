//! Shortest-path and k-shortest-path search over a [`RouteGraph`].
//!
//! [`RouteGraph`]: crate::model::RouteGraph

mod astar;
mod state;
mod yen;

pub(crate) use yen::k_shortest_paths;
