//! Heroic Dice — spend bonus dice on an evaluated roll.
//!
//! Takes an already-rolled dice formula, a pool of heroic dice and a
//! keep-rule, decides where each heroic die does the most good, rerolls
//! any die pushed to its maximum face, and totals the result.

pub mod core;
pub mod schema;
