//! TRPG Engine — configuration-driven dice, character generation and
//! sanity mechanics for tabletop role-playing bots.
//!
//! A host hands over a schema and a configuration tree once; every
//! component then resolves its parameters and text templates from that
//! tree through dotted keys, degrading to built-in defaults whenever a key
//! is missing.

pub mod core;
pub mod schema;
