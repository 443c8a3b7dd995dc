//! In-process CDCL solver.
//!
//! Two-watched-literal propagation, first-UIP conflict analysis with basic
//! clause minimization, activity-based branching and Luby restarts.

mod assignment;
mod branching;
mod map;
mod restart;

use crate::types::{to_var, Clause, Lit, Problem, Solution};

use self::{
    assignment::{Assignment, Reason},
    branching::Chooser,
    map::LitMap,
    restart::Restarts,
};

pub struct Solver {
    clauses: Vec<Clause>,
    trivially_unsat: bool,

    assignment: Assignment,

    watched: LitMap<Vec<usize>>,
    prop_head: usize,

    chooser: Chooser,
    restarts: Restarts,
}

impl Solver {
    pub fn new(problem: Problem) -> Self {
        let Problem { var_count, clauses } = problem;

        let mut solver = Solver {
            clauses: Vec::with_capacity(clauses.len()),
            trivially_unsat: false,
            assignment: Assignment::new(var_count),
            watched: LitMap::<Vec<usize>>::new(var_count),
            prop_head: 0,
            chooser: Chooser::new(var_count),
            restarts: Restarts::new(16),
        };

        for mut clause in clauses {
            clause.sort();
            clause.dedup();
            if clause.is_empty() {
                solver.trivially_unsat = true;
                continue;
            }
            // x or -x: satisfied by every assignment
            if has_complement(&clause) {
                continue;
            }
            solver.add(clause);
        }

        solver
    }

    fn add(&mut self, clause: Clause) -> usize {
        let i = self.clauses.len();
        if let [lit0, lit1, ..] = clause[..] {
            self.watched[lit0].push(i);
            self.watched[lit1].push(i);
        }
        self.clauses.push(clause);
        i
    }

    fn propagate(&mut self) -> Option<usize> {
        while let Some(&lit) = self.assignment.trail().get(self.prop_head) {
            let lit = -lit;

            let mut i = 0;
            'clause: while i < self.watched[lit].len() {
                let c = self.watched[lit][i];
                let clause = &mut self.clauses[c];

                // Uses "implicit" watches, i.e., the two watched literals
                // are always stored at index 0 and 1. (Borrowed from minisat.)

                if clause[1] != lit {
                    clause.swap(0, 1);
                }
                debug_assert_eq!(clause[1], lit);

                for j in 0..clause.len() {
                    match self.assignment.eval(clause[j]) {
                        Some(true) => {
                            i += 1;
                            continue 'clause;
                        }
                        None if j != 0 => {
                            clause.swap(1, j);
                            debug_assert_ne!(clause[0], clause[1]);

                            self.watched[lit].swap_remove(i);
                            debug_assert!(!self.watched[clause[1]].contains(&c));
                            self.watched[clause[1]].push(c);

                            continue 'clause;
                        }
                        _ => (),
                    }
                }

                if self.assignment.eval(clause[0]).is_none() {
                    // unit clause
                    let unit_lit = clause[0];
                    self.assignment
                        .set(unit_lit, Reason::Propagation { i_clause: c });
                } else {
                    // conflict
                    return Some(c);
                }

                i += 1;
            }

            self.prop_head += 1;
        }

        None
    }

    // based on minisat's basic clause minimization
    fn simplify(&self, learnt: &mut Clause) {
        let mut i = 1;
        while i < learnt.len() {
            if let Some(Reason::Propagation { i_clause }) = self.assignment.reason(learnt[i]) {
                let remove = self.clauses[i_clause].iter().all(|&lit| {
                    learnt.contains(&lit)
                        || learnt.contains(&-lit)
                        || self.assignment.level(lit) == Some(0)
                });
                if remove {
                    learnt.swap_remove(i);
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Derives the first-UIP clause for a conflict above level 0.
    /// Returns the learnt clause (asserting literal first) and the level to
    /// backtrack to.
    fn analyze(&mut self, i_conflict: usize) -> (Clause, usize) {
        let mut learnt = self.clauses[i_conflict].clone();
        let last_level = self.assignment.last_level();
        debug_assert!(last_level > 0);

        let mut i_trail = self.assignment.trail().len();
        let i_assert = loop {
            for &lit in &learnt {
                self.chooser.touch(to_var(lit));
            }

            let mut at_last = learnt
                .iter()
                .enumerate()
                .filter(|(_, &lit)| self.assignment.level(lit) == Some(last_level));
            let first = at_last.next().map(|(i, _)| i);
            let second = at_last.next();
            match (first, second) {
                (Some(i), None) => break i,
                (Some(_), Some(_)) => (),
                (None, _) => unreachable!("conflict clause has no literal at the last level"),
            }

            i_trail -= 1;
            let on_lit = self.assignment.trail()[i_trail];

            let i_reason = match self.assignment.reason(on_lit) {
                Some(Reason::Propagation { i_clause }) => i_clause,
                // the decision literal is the last one on its level, so
                // resolution stops before reaching it
                _ => continue,
            };
            let reason = &self.clauses[i_reason];
            debug_assert!(reason.contains(&on_lit));

            let len_before = learnt.len();
            learnt.retain(|&lit| lit != -on_lit);
            if learnt.len() != len_before {
                // learnt contained -on_lit, finish the resolution
                learnt.extend(reason.iter().filter(|&&lit| lit != on_lit));
                // need to dedup to correctly determine #lits at a given level
                learnt.sort();
                learnt.dedup();
            }
        };

        learnt.swap(0, i_assert);

        self.simplify(&mut learnt);

        let backtrack_level = if learnt.len() == 1 {
            // unit learnt clauses are asserted at level 0
            1
        } else {
            let mut i_max = 1;
            for i in 2..learnt.len() {
                if self.assignment.level(learnt[i]) > self.assignment.level(learnt[i_max]) {
                    i_max = i;
                }
            }
            learnt.swap(1, i_max);

            self.assignment.level(learnt[1]).unwrap_or(0) + 1
        };

        self.chooser.rescale();

        (learnt, backtrack_level)
    }

    fn backtrack(&mut self, level: usize) {
        self.assignment.backtrack(level);
        self.prop_head = std::cmp::min(self.prop_head, self.assignment.trail().len());
    }

    pub fn solve(&mut self) -> Solution {
        if self.trivially_unsat {
            return Solution::Unsat;
        }

        for i in 0..self.clauses.len() {
            if let [lit] = self.clauses[i][..] {
                match self.assignment.eval(lit) {
                    None => self
                        .assignment
                        .set(lit, Reason::Propagation { i_clause: i }),
                    Some(false) => return Solution::Unsat,
                    Some(true) => (),
                }
            }
        }

        if self.propagate().is_some() {
            return Solution::Unsat;
        }

        while let Some(var) = self.chooser.choose(&self.assignment) {
            self.assignment.decide(var);

            while let Some(i_conflict) = self.propagate() {
                if self.assignment.last_level() == 0 {
                    return Solution::Unsat;
                }
                self.restarts.on_conflict();

                let (learnt, level) = self.analyze(i_conflict);

                self.backtrack(level);

                let lit_assert = learnt[0];
                let i_clause = self.add(learnt);
                self.assignment
                    .set(lit_assert, Reason::Propagation { i_clause });
            }

            if self.restarts.due() && self.assignment.last_level() >= 1 {
                self.backtrack(1);
            }
        }

        let mut model: Vec<Lit> = self.assignment.trail().to_vec();
        model.sort_by_key(|lit| lit.unsigned_abs());
        Solution::Sat { model }
    }
}

fn has_complement(clause: &[Lit]) -> bool {
    clause.iter().any(|&lit| lit > 0 && clause.binary_search(&-lit).is_ok())
}

pub fn verify(problem: &Problem, sat: bool, solution: &Solution) -> bool {
    match solution {
        Solution::Sat { model } => {
            if sat {
                let mut sorted = model.to_vec();
                sorted.sort();
                problem
                    .clauses
                    .iter()
                    .all(|clause| clause.iter().any(|lit| sorted.binary_search(lit).is_ok()))
            } else {
                false
            }
        }
        Solution::Unsat => !sat,
        Solution::Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::types::{Clause, Problem, Solution};

    use super::{verify, Solver};

    fn check(clauses: Vec<Clause>, sat: bool) {
        let problem = Problem {
            var_count: clauses.iter().flatten().map(|l| l.unsigned_abs()).max().unwrap() as usize,
            clauses,
        };

        let solution = Solver::new(problem.clone()).solve();
        assert!(verify(&problem, sat, &solution));
    }

    #[test]
    /// Formulas from the lecture.
    fn basic_sat() {
        let clauses = vec![vec![1, 2], vec![-1, 2], vec![-1, -2, 3], vec![-1, -2, -3]];
        check(clauses, true);

        let clauses = vec![
            vec![-1, -2, 3],
            vec![2, -1, 3],
            vec![1, -2, 3],
            vec![-3, 4, 5],
            vec![-3, 4, -5],
            vec![-3, -4, 5],
            vec![-3, -4, -5],
        ];
        check(clauses, true);
    }

    #[test]
    fn basic_unsat() {
        let clauses = vec![
            vec![1, 2],
            vec![-2, 3],
            vec![-2, -3],
            vec![-1, -2, -4],
            vec![-1, 2, -4],
            vec![-1, 2, 4],
        ];

        check(clauses, false);
    }

    #[test]
    /// Formulas with non-trivial propagation before the first decision.
    fn kickstart() {
        let clauses = vec![vec![1], vec![-1, 2], vec![-1, -2]];
        check(clauses, false);
    }

    #[test]
    fn pigeonhole_three_into_two() {
        // p(i, h) = pigeon i sits in hole h
        let p = |i: i32, h: i32| 2 * i + h + 1;
        let mut clauses = vec![];
        for i in 0..3 {
            clauses.push(vec![p(i, 0), p(i, 1)]);
        }
        for h in 0..2 {
            for i in 0..3 {
                for j in (i + 1)..3 {
                    clauses.push(vec![-p(i, h), -p(j, h)]);
                }
            }
        }
        check(clauses, false);
    }

    #[test]
    fn empty_clause_and_tautology() {
        let problem = Problem {
            var_count: 2,
            clauses: vec![vec![1, -1], vec![]],
        };
        assert_eq!(Solver::new(problem).solve(), Solution::Unsat);

        let problem = Problem {
            var_count: 2,
            clauses: vec![vec![2, -2, 1]],
        };
        let solution = Solver::new(problem.clone()).solve();
        assert!(verify(&problem, true, &solution));
    }

    #[test]
    fn model_covers_every_variable() {
        let problem = Problem {
            var_count: 5,
            clauses: vec![vec![2, 3]],
        };
        match Solver::new(problem).solve() {
            Solution::Sat { model } => {
                let vars: Vec<u32> = model.iter().map(|l| l.unsigned_abs()).collect();
                assert_eq!(vars, vec![1, 2, 3, 4, 5]);
            }
            other => panic!("expected a model, got {other:?}"),
        }
    }
}
