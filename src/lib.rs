//! Picaro - campaign-state engine
//!
//! Characters take turns performing actions; actions become encounters and
//! effects; effects are rewritten and extended by rule variants and resolve
//! as auditable chains; seasons move through play, season end and the rumor
//! phase.

pub mod character;
pub mod core;
pub mod effect;
pub mod encounter;
pub mod entity;
pub mod game;
pub mod influence;
pub mod project;
pub mod season;
