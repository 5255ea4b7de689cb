//! Terminal choropleth of contest results with vote flows between countries.
//!
//! Rows and votes are loaded once ([`data`]), the world map is cut down to
//! the contest region ([`curate`]) and projected ([`projection`]). The
//! [`controller`] owns the view state and drives the choropleth and flow
//! renderers through a retained [`scene`].

pub mod aggregate;
pub mod args;
pub mod choropleth;
pub mod config;
pub mod controller;
pub mod curate;
pub mod data;
pub mod error;
pub mod flow;
pub mod map_draw;
pub mod projection;
pub mod scene;
pub mod state;
pub mod ui;
