//! A SAT-backed agent for a two-phase stealth grid mission.
//!
//! Phase 1 explores an unknown grid, proving single steps safe or unsafe
//! with a propositional knowledge base. Phase 2 plans over the resolved
//! map with STRIPS-style actions and A* routes.

pub mod actions;
pub mod astar;
pub mod backend;
pub mod belief;
pub mod compose;
pub mod config;
pub mod encoding;
pub mod error;
pub mod explore;
pub mod grid;
pub mod io;
pub mod knowledge;
pub mod mission;
pub mod oracle;
pub mod planner;
pub mod referee;
pub mod sim;
pub mod solver;
pub mod types;
