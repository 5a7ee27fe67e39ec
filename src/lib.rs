//! Explorable call-relationship diagrams: a flat list of functions and the
//! calls between them becomes a collapsible forest, laid out as a tree and
//! shown through a pannable, zoomable viewport.

pub mod callgraph;
pub mod command;
pub mod config;
pub mod layout;
pub mod source;
pub mod util;
pub mod viewport;
