//! Proves single steps safe or unsafe with transient SAT probes.

use crate::{
    backend::SatBackend,
    encoding::Encoder,
    grid::{Category, Cell, GridMap, Orientation},
    knowledge::{KnowledgeBase, Probe},
    types::{Clause, Lit, Solution},
};

use Category::{GuardE, GuardN, GuardS, GuardW};

/// How far the agent sees, used to score the vision gained by a step.
pub const VISION_RANGE: i32 = 3;

/// Guards that would see the destination of a step, as offsets from the
/// destination. Indexed by step direction in `Orientation::ALL` order: two
/// cells ahead with a guard facing back, then two cells on each side with a
/// guard facing the destination.
#[rustfmt::skip]
const HOSTILE: [[(i32, i32, Category); 6]; 4] = [
    // N
    [(0, 1, GuardS), (0, 2, GuardS),
     (1, 0, GuardW), (2, 0, GuardW), (-1, 0, GuardE), (-2, 0, GuardE)],
    // E
    [(1, 0, GuardW), (2, 0, GuardW),
     (0, 1, GuardS), (0, 2, GuardS), (0, -1, GuardN), (0, -2, GuardN)],
    // S
    [(0, -1, GuardN), (0, -2, GuardN),
     (1, 0, GuardW), (2, 0, GuardW), (-1, 0, GuardE), (-2, 0, GuardE)],
    // W
    [(-1, 0, GuardE), (-2, 0, GuardE),
     (0, 1, GuardS), (0, 2, GuardS), (0, -1, GuardN), (0, -2, GuardN)],
];

/// Why a step was rejected without asking the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Wall or guard already known on the destination.
    StaticBlock,
    OffGrid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Assessment {
    pub direction: Orientation,
    pub proven_safe: bool,
    pub proven_unsafe: bool,
    pub rejection: Option<Rejection>,
    /// Unresolved cells visible from the destination.
    pub vision_potential: usize,
}

impl Assessment {
    fn rejected(direction: Orientation, rejection: Rejection) -> Self {
        Self {
            direction,
            proven_safe: false,
            proven_unsafe: false,
            rejection: Some(rejection),
            vision_potential: 0,
        }
    }

    /// 0 for a legal step, 1 for a static block, 2 for off-grid.
    pub fn reject_code(&self) -> u8 {
        match self.rejection {
            None => 0,
            Some(Rejection::StaticBlock) => 1,
            Some(Rejection::OffGrid) => 2,
        }
    }

    pub fn is_legal(&self) -> bool {
        self.rejection.is_none()
    }
}

/// Unresolved cells along the four viewing cones from `cell`, each cone
/// cut at the first known blocking cell.
pub fn vision_potential(map: &GridMap, cell: Cell) -> usize {
    let dims = map.dims();
    let mut count = 0;
    for facing in Orientation::ALL {
        for seen in dims.ray(cell, facing, VISION_RANGE) {
            match map.get(seen) {
                None => count += 1,
                Some(category) if category.blocks_vision() => break,
                Some(_) => (),
            }
        }
    }
    count
}

pub struct SafetyOracle<'a> {
    backend: &'a mut dyn SatBackend,
}

impl<'a> SafetyOracle<'a> {
    pub fn new(backend: &'a mut dyn SatBackend) -> Self {
        Self { backend }
    }

    /// Whether the probed clause set is proven unsatisfiable. Solver
    /// failures count as "not proven".
    fn refutes(&mut self, probe: &Probe<'_>) -> bool {
        match self.backend.solve(&probe.problem()) {
            Ok(Solution::Unsat) => true,
            Ok(Solution::Sat { .. }) => false,
            Ok(Solution::Unknown) => {
                tracing::warn!(clauses = probe.len(), "solver gave up, treating as indeterminate");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "solver failed, treating as indeterminate");
                false
            }
        }
    }

    /// Assesses stepping from `from` in `direction`.
    pub fn assess(
        &mut self,
        kb: &mut KnowledgeBase,
        enc: &Encoder,
        map: &GridMap,
        from: Cell,
        direction: Orientation,
    ) -> Assessment {
        let dest = from.step(direction, 1);
        let dims = map.dims();
        if !dims.contains(dest) {
            return Assessment::rejected(direction, Rejection::OffGrid);
        }
        if map.get(dest).is_some_and(Category::blocks_movement) {
            return Assessment::rejected(direction, Rejection::StaticBlock);
        }

        let vision_potential = vision_potential(map, dest);
        let hostile: Vec<Lit> = HOSTILE[direction.index()]
            .iter()
            .map(|&(dx, dy, guard)| (dest.offset(dx, dy), guard))
            .filter(|&(cell, _)| dims.contains(cell))
            .map(|(cell, guard)| enc.lit(cell, guard))
            .collect();

        let mut assessment = Assessment {
            direction,
            proven_safe: false,
            proven_unsafe: false,
            rejection: None,
            vision_potential,
        };

        if hostile.is_empty() {
            // nobody could stand where they would see the destination
            assessment.proven_safe = true;
            return assessment;
        }

        {
            let probe = kb.probe(vec![hostile.clone()]);
            assessment.proven_safe = self.refutes(&probe);
        }
        if !assessment.proven_safe {
            let none_hostile: Vec<Clause> = hostile.iter().map(|&lit| vec![-lit]).collect();
            let probe = kb.probe(none_hostile);
            assessment.proven_unsafe = self.refutes(&probe);
        }

        tracing::debug!(
            %from,
            %direction,
            safe = assessment.proven_safe,
            unsafe_ = assessment.proven_unsafe,
            potential = vision_potential,
            "step assessed"
        );
        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::{vision_potential, Rejection, SafetyOracle, HOSTILE};
    use crate::{
        backend::{InProcess, SatBackend},
        encoding::Encoder,
        error::SolverError,
        grid::{Category, Cell, Dims, GridMap, Orientation},
        knowledge::{initial_rules, noise_rules, vision_rules, KnowledgeBase},
        types::{Problem, Solution},
    };

    struct Broken;

    impl SatBackend for Broken {
        fn solve(&mut self, _: &Problem) -> Result<Solution, SolverError> {
            Err(SolverError::Io(std::io::Error::other("pipe closed")))
        }
    }

    fn setup(dims: Dims, start: Cell) -> (Encoder, KnowledgeBase, GridMap) {
        let enc = Encoder::new(dims);
        let mut kb = KnowledgeBase::new(enc.var_count());
        kb.assert_all(initial_rules(&enc, start));
        let mut map = GridMap::unknown(dims);
        map.resolve(start, Category::Empty);
        (enc, kb, map)
    }

    #[test]
    fn hostile_guards_face_the_destination() {
        for direction in Orientation::ALL {
            for (dx, dy, guard) in HOSTILE[direction.index()] {
                let facing = guard.facing().unwrap();
                let guard_cell = Cell::new(dx, dy);
                let dist = dx.abs() + dy.abs();
                assert!(dist == 1 || dist == 2);
                assert_eq!(guard_cell.step(facing, dist), Cell::new(0, 0), "{direction}");
                // the agent's own cell is never a candidate
                assert_ne!(guard_cell, Cell::new(0, 0).step(direction.opposite(), 1));
            }
        }
    }

    #[test]
    fn silence_proves_first_step_safe() {
        let start = Cell::new(1, 0);
        let (enc, mut kb, map) = setup(Dims::new(3, 3), start);
        let noise = noise_rules(&enc, start, 0);
        for cell in Dims::new(3, 3).cells().filter(|&c| c != start) {
            for people in Category::PEOPLE {
                assert!(noise.contains(&vec![-enc.lit(cell, people)]));
            }
        }
        kb.assert_all(noise);

        let before = kb.to_dimacs();
        let mut backend = InProcess;
        let mut oracle = SafetyOracle::new(&mut backend);
        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::N);
        assert!(a.proven_safe);
        assert!(!a.proven_unsafe);
        assert_eq!(a.reject_code(), 0);
        assert_eq!(kb.to_dimacs(), before);
    }

    #[test]
    fn seen_guard_proves_step_unsafe() {
        let start = Cell::new(1, 0);
        let (enc, mut kb, mut map) = setup(Dims::new(3, 3), start);
        let seen = [
            (Cell::new(1, 1), Category::Empty),
            (Cell::new(1, 2), Category::GuardS),
        ];
        kb.assert_all(vision_rules(&enc, &seen));
        for (cell, category) in seen {
            map.resolve(cell, category);
        }

        let before = kb.to_dimacs();
        let mut backend = InProcess;
        let mut oracle = SafetyOracle::new(&mut backend);
        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::N);
        assert!(!a.proven_safe);
        assert!(a.proven_unsafe);
        assert_eq!(kb.to_dimacs(), before);
    }

    #[test]
    fn unknown_surroundings_are_indeterminate() {
        let start = Cell::new(0, 0);
        let (enc, mut kb, map) = setup(Dims::new(3, 3), start);
        let mut backend = InProcess;
        let mut oracle = SafetyOracle::new(&mut backend);
        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::E);
        assert!(!a.proven_safe && !a.proven_unsafe);
        assert!(a.is_legal());
    }

    #[test]
    fn static_rejections() {
        let start = Cell::new(0, 0);
        let (enc, mut kb, mut map) = setup(Dims::new(2, 2), start);
        map.resolve(Cell::new(1, 0), Category::Wall);
        let mut backend = Broken;
        let mut oracle = SafetyOracle::new(&mut backend);

        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::W);
        assert_eq!(a.rejection, Some(Rejection::OffGrid));
        assert_eq!(a.reject_code(), 2);
        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::E);
        assert_eq!(a.rejection, Some(Rejection::StaticBlock));
        assert_eq!(a.reject_code(), 1);
    }

    #[test]
    fn solver_failure_is_indeterminate_and_rolled_back() {
        let start = Cell::new(0, 0);
        let (enc, mut kb, map) = setup(Dims::new(3, 3), start);
        let before = kb.to_dimacs();
        let mut backend = Broken;
        let mut oracle = SafetyOracle::new(&mut backend);
        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::N);
        assert!(!a.proven_safe && !a.proven_unsafe);
        assert_eq!(kb.to_dimacs(), before);
    }

    #[test]
    fn corner_of_a_one_row_grid_needs_no_solver() {
        // in a 2x1 grid nobody can watch (1, 0) from the side or beyond
        let start = Cell::new(0, 0);
        let (enc, mut kb, map) = setup(Dims::new(2, 1), start);
        let mut backend = Broken;
        let mut oracle = SafetyOracle::new(&mut backend);
        let a = oracle.assess(&mut kb, &enc, &map, start, Orientation::E);
        assert!(a.proven_safe);
    }

    #[test]
    fn potential_stops_at_blockers() {
        let mut map = GridMap::unknown(Dims::new(5, 5));
        let center = Cell::new(2, 2);
        // 2 cells each way on a 5x5 grid
        assert_eq!(vision_potential(&map, center), 8);
        map.resolve(Cell::new(2, 3), Category::Wall);
        map.resolve(Cell::new(3, 2), Category::Empty);
        assert_eq!(vision_potential(&map, center), 5);
    }
}
