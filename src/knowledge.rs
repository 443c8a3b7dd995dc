//! The clause store the phase-1 reasoning runs on, and the sensor-fusion
//! rules that feed it.

use std::{
    collections::HashSet,
    fmt::Write as _,
    ops::Deref,
};

use crate::{
    encoding::{exactly_n, Encoder},
    grid::{Category, Cell},
    types::{Clause, Lit, Problem},
};

/// Noise readings at or above this count carry no constraint.
pub const NOISE_SATURATION: u32 = 2;

/// Radius of the hearing window (a 5x5 square around the agent).
pub const HEARING_RADIUS: i32 = 2;

/// Monotonically growing set of clauses over the encoder's variables.
///
/// Permanent clauses go through [`KnowledgeBase::assert_clause`]. Transient
/// clauses only exist inside a [`Probe`], which removes them when dropped.
#[derive(Debug)]
pub struct KnowledgeBase {
    var_count: usize,
    clauses: Vec<Clause>,
    index: HashSet<Clause>,
}

impl KnowledgeBase {
    pub fn new(var_count: usize) -> Self {
        Self {
            var_count,
            clauses: vec![],
            index: HashSet::new(),
        }
    }

    pub fn var_count(&self) -> usize {
        self.var_count
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Adds a clause permanently. Returns false if it was already known.
    pub fn assert_clause(&mut self, mut clause: Clause) -> bool {
        clause.sort_unstable();
        clause.dedup();
        debug_assert!(clause
            .iter()
            .all(|lit| (1..=self.var_count).contains(&(lit.unsigned_abs() as usize))));

        if self.index.contains(&clause) {
            return false;
        }
        self.index.insert(clause.clone());
        self.clauses.push(clause);
        true
    }

    /// Adds every clause permanently; returns how many were new.
    pub fn assert_all(&mut self, clauses: impl IntoIterator<Item = Clause>) -> usize {
        clauses
            .into_iter()
            .map(|clause| self.assert_clause(clause) as usize)
            .sum()
    }

    /// Snapshot of the current content as a solver problem.
    pub fn problem(&self) -> Problem {
        Problem {
            var_count: self.var_count,
            clauses: self.clauses.clone(),
        }
    }

    /// The current content in DIMACS CNF.
    pub fn to_dimacs(&self) -> String {
        let mut out = format!("p cnf {} {}\n", self.var_count, self.clauses.len());
        for clause in &self.clauses {
            for lit in clause {
                let _ = write!(out, "{lit} ");
            }
            out.push_str("0\n");
        }
        out
    }

    /// Temporarily extends the base with `transient` clauses. The clauses
    /// are removed when the returned guard goes out of scope, whatever path
    /// the caller leaves by.
    pub fn probe(&mut self, transient: Vec<Clause>) -> Probe<'_> {
        let mark = self.clauses.len();
        self.clauses.extend(transient);
        Probe { kb: self, mark }
    }
}

/// A knowledge base with transient clauses attached, see
/// [`KnowledgeBase::probe`].
pub struct Probe<'a> {
    kb: &'a mut KnowledgeBase,
    mark: usize,
}

impl Deref for Probe<'_> {
    type Target = KnowledgeBase;

    fn deref(&self) -> &KnowledgeBase {
        self.kb
    }
}

impl Drop for Probe<'_> {
    fn drop(&mut self) {
        self.kb.clauses.truncate(self.mark);
    }
}

// ---------------------------------------------------------------------------
// Sensor fusion
// ---------------------------------------------------------------------------

/// Rules that hold from the start of phase 1: one category per cell, one
/// suit, one weapon and one target on the grid, and an empty start cell.
pub fn initial_rules(enc: &Encoder, start: Cell) -> Vec<Clause> {
    let mut clauses = vec![vec![enc.lit(start, Category::Empty)]];
    for cell in enc.dims().cells() {
        clauses.extend(exactly_n(1, &enc.cell_vars(cell)));
    }
    for unique in [Category::Suit, Category::Weapon, Category::Target] {
        clauses.extend(exactly_n(1, &enc.category_vars(unique)));
    }
    clauses
}

/// Guard and civilian variables of the hearing window around `position`.
pub fn hearing_window(enc: &Encoder, position: Cell) -> Vec<Lit> {
    let dims = enc.dims();
    let mut vars = vec![];
    for dx in -HEARING_RADIUS..=HEARING_RADIUS {
        for dy in -HEARING_RADIUS..=HEARING_RADIUS {
            let cell = position.offset(dx, dy);
            if (dx, dy) == (0, 0) || !dims.contains(cell) {
                continue;
            }
            vars.extend(Category::PEOPLE.iter().map(|&c| enc.lit(cell, c)));
        }
    }
    vars
}

/// Constraint from hearing `heard` people around `position`; empty when the
/// reading is saturated.
pub fn noise_rules(enc: &Encoder, position: Cell, heard: u32) -> Vec<Clause> {
    if heard >= NOISE_SATURATION {
        tracing::debug!(%position, heard, "noise reading saturated, no constraint");
        return vec![];
    }
    exactly_n(heard as usize, &hearing_window(enc, position))
}

/// One unit clause per directly observed cell.
pub fn vision_rules(enc: &Encoder, vision: &[(Cell, Category)]) -> Vec<Clause> {
    vision
        .iter()
        .map(|&(cell, category)| vec![enc.lit(cell, category)])
        .collect()
}
