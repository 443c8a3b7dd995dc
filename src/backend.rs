//! Pluggable satisfiability backends.
//!
//! The reasoning engine only needs `solve(problem) -> Solution`; whether
//! that runs in-process or shells out is a configuration choice.

use std::{io::Write, process::Command};

use crate::{
    config::{BackendKind, SolverConfig},
    error::SolverError,
    io::{read_solution, write_problem},
    solver::Solver,
    types::{Problem, Solution},
};

pub trait SatBackend {
    fn solve(&mut self, problem: &Problem) -> Result<Solution, SolverError>;
}

/// Runs the bundled CDCL solver.
#[derive(Clone, Copy, Debug, Default)]
pub struct InProcess;

impl SatBackend for InProcess {
    fn solve(&mut self, problem: &Problem) -> Result<Solution, SolverError> {
        Ok(Solver::new(problem.clone()).solve())
    }
}

/// Runs `command <file.cnf>` and parses its standard output.
#[derive(Clone, Debug)]
pub struct External {
    command: String,
}

impl External {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl SatBackend for External {
    fn solve(&mut self, problem: &Problem) -> Result<Solution, SolverError> {
        let mut file = tempfile::Builder::new()
            .prefix("hitman-sat-")
            .suffix(".cnf")
            .tempfile()?;
        write_problem(&mut file, problem)?;
        file.flush()?;

        // Solvers conventionally exit with 10/20 for SAT/UNSAT, so the
        // status code carries no error information.
        let output = Command::new(&self.command)
            .arg(file.path())
            .output()
            .map_err(|source| SolverError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let stdout = String::from_utf8(output.stdout).map_err(|_| SolverError::Encoding {
            command: self.command.clone(),
        })?;
        tracing::trace!(command = %self.command, status = ?output.status, "solver finished");

        Ok(read_solution(&stdout)?)
    }
}

impl<B: SatBackend + ?Sized> SatBackend for Box<B> {
    fn solve(&mut self, problem: &Problem) -> Result<Solution, SolverError> {
        (**self).solve(problem)
    }
}

/// Builds the backend selected in the configuration.
pub fn from_config(config: &SolverConfig) -> Box<dyn SatBackend> {
    match config.backend {
        BackendKind::InProcess => Box::new(InProcess),
        BackendKind::External => Box::new(External::new(config.command.clone())),
    }
}
