//! Terminal atlas of biblical-era territories, routes and sites.
//!
//! The library half holds the overlay catalog, the visibility resolver and
//! the view controller; the terminal surface, input handling and drawing
//! live beside them so the binary stays a thin event loop.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod disclaimer;
pub mod geo;
pub mod map;
pub mod overlay;
pub mod resolve;
pub mod ui;
pub mod view;
