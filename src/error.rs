//! Error types for the agent.
//!
//! Each subsystem has its own error enum; [`AgentError`] wraps them for the
//! mission driver and the binary. Outcomes the reasoning engine treats as
//! normal (indeterminate safety, no-op actions) are plain values, not errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::grid::Cell;

/// Top-level error type for a mission run.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    Dimacs(#[from] DimacsError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Explore(#[from] ExploreError),

    #[error(transparent)]
    Mission(#[from] MissionError),
}

// ---------------------------------------------------------------------------
// DIMACS text
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DimacsError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("missing `p cnf` problem line")]
    MissingHeader,

    #[error("problem line announces {expected} clauses, found {actual}")]
    ClauseCount { expected: usize, actual: usize },

    #[error("literal {lit} is out of range for {var_count} variables")]
    LiteralRange { lit: i32, var_count: usize },

    #[error("solver output has no status line")]
    MissingStatus,

    #[error("unrecognized solver status `{0}`")]
    UnknownStatus(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// SAT backends
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("failed to launch solver `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("solver `{command}` produced non-UTF-8 output")]
    Encoding { command: String },

    #[error("malformed solver output")]
    Malformed(#[from] DimacsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Simulated worlds
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("line {line}: expected {expected} cells, found {actual}")]
    Ragged {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("world has no `start` line")]
    MissingStart,

    #[error("world has no rows")]
    Empty,

    #[error("start cell {0} is outside the grid or not empty")]
    BadStart(Cell),

    #[error("world must hold exactly one `{token}`, found {found}")]
    Uniqueness { token: &'static str, found: usize },

    #[error("failed to read world {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Phase 1
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("exploration stopped after {steps} steps with {unresolved} cells unresolved")]
    StepLimit { steps: usize, unresolved: usize },

    #[error("no legal step from {position}")]
    Boxed { position: Cell },
}

// ---------------------------------------------------------------------------
// Phase 2
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MissionError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: Cell, to: Cell },

    #[error("route jumps from {from} to {to}")]
    Disjoint { from: Cell, to: Cell },

    #[error("no ambush cell reachable around the threat at {threat}")]
    NoAmbush { threat: Cell },

    #[error("round {round} changed nothing")]
    Stalled { round: usize },

    #[error("mission not finished after {rounds} rounds")]
    RoundLimit { rounds: usize },
}
