//! Phase 1: frontier exploration driven by the safety oracle.
//!
//! Every iteration runs the stages Scanning, Orienting, Deciding and
//! Moving, and moves the agent at most once.

use crate::{
    backend::SatBackend,
    config::ExploreConfig,
    encoding::Encoder,
    error::ExploreError,
    grid::{Category, Cell, GridMap, Orientation, Turn},
    knowledge::{initial_rules, noise_rules, vision_rules, KnowledgeBase},
    oracle::{vision_potential, Assessment, SafetyOracle, VISION_RANGE},
    referee::{Referee, Status},
};

/// Order in which directions are scanned and assessed.
const SCAN_ORDER: [Orientation; 4] = [
    Orientation::N,
    Orientation::S,
    Orientation::W,
    Orientation::E,
];

/// Exploration stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Fusing the readings of the current position.
    Scanning,
    /// Turning towards corridors that still hide unresolved cells.
    Orienting,
    /// Ranking the four steps.
    Deciding,
    Moving(Orientation),
    Complete,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Scanning => "Scanning",
            Stage::Orienting => "Orienting",
            Stage::Deciding => "Deciding",
            Stage::Moving(_) => "Moving",
            Stage::Complete => "Complete",
        }
    }
}

/// Outcome of phase 1.
#[derive(Clone, Debug)]
pub struct Exploration {
    pub map: GridMap,
    pub status: Status,
    /// Iterations of the exploration loop.
    pub steps: usize,
}

pub struct Explorer<'a, R: Referee + ?Sized> {
    referee: &'a mut R,
    oracle: SafetyOracle<'a>,
    enc: Encoder,
    kb: KnowledgeBase,
    map: GridMap,
    status: Status,
    came_from: Option<Orientation>,
    last_heard_at: Option<Cell>,
    steps: usize,
    max_steps: usize,
}

impl<'a, R: Referee + ?Sized> Explorer<'a, R> {
    /// `status` is the one returned by `start_phase1`.
    pub fn new(
        referee: &'a mut R,
        backend: &'a mut dyn SatBackend,
        status: Status,
        config: &ExploreConfig,
    ) -> Self {
        let enc = Encoder::new(status.dims());
        let mut kb = KnowledgeBase::new(enc.var_count());
        kb.assert_all(initial_rules(&enc, status.position));
        let mut map = GridMap::unknown(status.dims());
        map.resolve(status.position, Category::Empty);

        Self {
            referee,
            oracle: SafetyOracle::new(backend),
            enc,
            kb,
            map,
            status,
            came_from: None,
            last_heard_at: None,
            steps: 0,
            max_steps: config.max_steps,
        }
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    fn fuse_vision(&mut self) {
        let vision = std::mem::take(&mut self.status.vision);
        self.kb.assert_all(vision_rules(&self.enc, &vision));
        for &(cell, category) in &vision {
            if self.map.resolve(cell, category) {
                tracing::trace!(%cell, %category, "cell resolved");
            }
        }
        self.status.vision = vision;
    }

    fn fuse_noise(&mut self) {
        let position = self.status.position;
        if self.last_heard_at == Some(position) {
            return;
        }
        self.last_heard_at = Some(position);
        let added = self
            .kb
            .assert_all(noise_rules(&self.enc, position, self.status.hear));
        tracing::debug!(%position, heard = self.status.hear, added, "noise fused");
    }

    /// Whether the corridor ahead in `facing` still hides unresolved cells.
    fn corridor_open(&self, facing: Orientation) -> bool {
        for cell in self.map.dims().ray(self.status.position, facing, VISION_RANGE) {
            match self.map.get(cell) {
                None => return true,
                Some(category) if category.blocks_vision() => return false,
                Some(_) => (),
            }
        }
        false
    }

    /// Turns with the fewest rotations, fusing what each rotation reveals.
    fn turn_to(&mut self, facing: Orientation) {
        for turn in self.status.orientation.turns_to(facing) {
            self.status = match turn {
                Turn::Clockwise => self.referee.turn_clockwise(),
                Turn::AntiClockwise => self.referee.turn_anti_clockwise(),
            };
            self.fuse_vision();
        }
    }

    fn orient(&mut self) {
        for facing in SCAN_ORDER {
            if self.corridor_open(facing) {
                self.turn_to(facing);
            }
        }
    }

    /// Vision potential of the cell beyond the step in `direction`.
    fn lookahead(&self, direction: Orientation) -> usize {
        let beyond = self.status.position.step(direction, 2);
        match self.map.get(beyond) {
            _ if !self.map.dims().contains(beyond) => 0,
            Some(category) if category.blocks_movement() => 0,
            _ => vision_potential(&self.map, beyond),
        }
    }

    /// Manhattan distance from the step in `direction` to the nearest
    /// unresolved cell.
    fn frontier_distance(&self, direction: Orientation) -> u32 {
        let dest = self.status.position.step(direction, 1);
        self.map
            .dims()
            .cells()
            .filter(|&cell| self.map.is_unknown(cell))
            .map(|cell| cell.manhattan(dest))
            .min()
            .unwrap_or(0)
    }

    /// Legal steps from the current position, best first.
    fn rank(&mut self) -> Result<Vec<Assessment>, ExploreError> {
        let position = self.status.position;
        let mut candidates: Vec<Assessment> = vec![];
        for direction in SCAN_ORDER {
            let a = self
                .oracle
                .assess(&mut self.kb, &self.enc, &self.map, position, direction);
            if a.is_legal() {
                candidates.push(a);
            }
        }
        if candidates.is_empty() {
            return Err(ExploreError::Boxed { position });
        }

        if candidates.len() > 1 {
            if let Some(back) = self.came_from {
                candidates.retain(|a| a.direction != back);
            }
        }

        candidates.sort_by_key(|a| (a.proven_unsafe, std::cmp::Reverse(a.vision_potential)));

        if candidates.len() > 1 && candidates.iter().any(|a| !a.proven_unsafe) {
            candidates.retain(|a| !a.proven_unsafe);
        }

        // leading run sharing the best potential
        let top = candidates[0].vision_potential;
        let tied = candidates
            .iter()
            .take_while(|a| a.vision_potential == top && !a.proven_unsafe)
            .count();
        if tied > 1 {
            let best = (0..tied)
                .max_by_key(|&i| {
                    let direction = candidates[i].direction;
                    (
                        self.lookahead(direction),
                        std::cmp::Reverse(self.frontier_distance(direction)),
                        std::cmp::Reverse(i),
                    )
                })
                .unwrap_or(0);
            let winner = candidates.remove(best);
            candidates.insert(0, winner);
        }
        Ok(candidates)
    }

    fn decide(&mut self) -> Result<Orientation, ExploreError> {
        let position = self.status.position;
        let candidates = self.rank()?;
        let chosen = choose(&candidates).ok_or(ExploreError::Boxed { position })?;

        tracing::debug!(
            %position,
            direction = %chosen.direction,
            safe = chosen.proven_safe,
            potential = chosen.vision_potential,
            candidates = candidates.len(),
            "step chosen"
        );
        Ok(chosen.direction)
    }

    fn advance(&mut self, direction: Orientation) {
        self.turn_to(direction);
        let ahead = self.status.position.step(direction, 1);
        if self.map.get(ahead).is_some_and(Category::blocks_movement) {
            // facing the cell revealed an obstacle; decide again
            return;
        }
        let from = self.status.position;
        self.status = self.referee.move_forward();
        if self.status.position == from {
            tracing::warn!(%from, %direction, "move refused");
        } else {
            self.came_from = Some(direction.opposite());
        }
    }

    pub fn run(mut self) -> Result<Exploration, ExploreError> {
        let mut stage = Stage::Scanning;
        loop {
            stage = match stage {
                Stage::Scanning => {
                    if self.steps >= self.max_steps {
                        return Err(ExploreError::StepLimit {
                            steps: self.steps,
                            unresolved: self.map.unresolved(),
                        });
                    }
                    self.steps += 1;
                    self.fuse_vision();
                    self.fuse_noise();
                    if self.map.is_complete() {
                        Stage::Complete
                    } else {
                        Stage::Orienting
                    }
                }
                Stage::Orienting => {
                    self.orient();
                    if self.map.is_complete() {
                        Stage::Complete
                    } else {
                        Stage::Deciding
                    }
                }
                Stage::Deciding => Stage::Moving(self.decide()?),
                Stage::Moving(direction) => {
                    self.advance(direction);
                    Stage::Scanning
                }
                Stage::Complete => break,
            };
            tracing::trace!(stage = stage.name(), position = %self.status.position, "stage");
        }

        tracing::info!(
            steps = self.steps,
            clauses = self.kb.len(),
            penalties = self.status.penalties,
            "map complete"
        );
        Ok(Exploration {
            map: self.map,
            status: self.status,
            steps: self.steps,
        })
    }
}

/// Picks from ranked candidates: the first proven-safe step that reveals
/// more than one cell (or the only candidate), else the top-ranked one.
fn choose(candidates: &[Assessment]) -> Option<&Assessment> {
    let sole = candidates.len() == 1;
    candidates
        .iter()
        .find(|a| a.proven_safe && (a.vision_potential > 1 || sole))
        .or_else(|| candidates.first())
}

/// Runs phase 1 from the status returned by `start_phase1`.
pub fn explore<R: Referee + ?Sized>(
    referee: &mut R,
    backend: &mut dyn SatBackend,
    status: Status,
    config: &ExploreConfig,
) -> Result<Exploration, ExploreError> {
    Explorer::new(referee, backend, status, config).run()
}
