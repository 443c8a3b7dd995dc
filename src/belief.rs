//! Phase 2 belief state: the resolved map inverted into per-category cell
//! lists, plus the cells watched by guards and civilians.

use std::collections::BTreeMap;

use crate::{
    grid::{Category, Cell, Dims, GridMap, Orientation},
    referee::Status,
};

/// How far a guard sees along its facing.
pub const GUARD_REACH: i32 = 2;
/// How far a civilian sees along its facing.
pub const CIVIL_REACH: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeliefState {
    dims: Dims,
    by_category: [Vec<Cell>; Category::COUNT],
    agent: Cell,
    facing: Orientation,
    origin: Cell,
    guard_vision: Vec<Cell>,
    guard_or_civil_vision: Vec<Cell>,
    /// Threats whose gaze reaches the target, in map order.
    to_neutralize: Vec<Cell>,
    /// Cells each threat projects its gaze on.
    sight: BTreeMap<Cell, Vec<Cell>>,
}

/// Removes one occurrence of `cell`, keeping overlaps from other threats.
fn remove_one(cells: &mut Vec<Cell>, cell: Cell) {
    if let Some(i) = cells.iter().position(|&c| c == cell) {
        cells.remove(i);
    }
}

impl BeliefState {
    /// Builds the belief state from a resolved map and the status returned
    /// by `start_phase2`. The agent's cell becomes the origin.
    pub fn new(map: &GridMap, status: &Status) -> Self {
        if !map.is_complete() {
            tracing::warn!(unresolved = map.unresolved(), "belief built from an incomplete map");
        }
        let mut by_category: [Vec<Cell>; Category::COUNT] = std::array::from_fn(|_| vec![]);
        for (cell, category) in map.iter() {
            by_category[category.index()].push(cell);
        }

        let mut state = Self {
            dims: map.dims(),
            by_category,
            agent: status.position,
            facing: status.orientation,
            origin: status.position,
            guard_vision: vec![],
            guard_or_civil_vision: vec![],
            to_neutralize: vec![],
            sight: BTreeMap::new(),
        };

        let target = state.first(Category::Target);
        let people: Vec<(Cell, Category)> = map
            .iter()
            .filter(|&(_, category)| category.is_guard() || category.is_civil())
            .collect();
        for (cell, person) in people {
            let seen = state.project(cell, person);
            if person.is_guard() {
                state.guard_vision.extend(&seen);
            }
            state.guard_or_civil_vision.extend(&seen);
            if target.is_some_and(|t| seen.contains(&t)) {
                tracing::debug!(threat = %cell, %person, "threat watches the target");
                state.to_neutralize.push(cell);
            }
            state.sight.insert(cell, seen);
        }
        state
    }

    /// Cells a guard or civilian on `from` watches, halted by walls and
    /// civilians.
    fn project(&self, from: Cell, person: Category) -> Vec<Cell> {
        let Some(facing) = person.facing() else {
            return vec![];
        };
        let reach = if person.is_guard() { GUARD_REACH } else { CIVIL_REACH };
        self.dims
            .ray(from, facing, reach)
            .take_while(|&cell| !self.category_at(cell).is_some_and(Category::blocks_gaze))
            .collect()
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn agent(&self) -> Cell {
        self.agent
    }

    pub fn facing(&self) -> Orientation {
        self.facing
    }

    pub fn origin(&self) -> Cell {
        self.origin
    }

    pub fn cells(&self, category: Category) -> &[Cell] {
        &self.by_category[category.index()]
    }

    pub fn first(&self, category: Category) -> Option<Cell> {
        self.cells(category).first().copied()
    }

    pub fn category_at(&self, cell: Cell) -> Option<Category> {
        Category::ALL
            .into_iter()
            .find(|&category| self.cells(category).contains(&cell))
    }

    /// In the grid and free of walls and guards.
    pub fn is_passable(&self, cell: Cell) -> bool {
        self.dims.contains(cell) && !self.category_at(cell).is_some_and(Category::blocks_movement)
    }

    pub fn guard_vision(&self) -> &[Cell] {
        &self.guard_vision
    }

    pub fn guard_or_civil_vision(&self) -> &[Cell] {
        &self.guard_or_civil_vision
    }

    pub fn to_neutralize(&self) -> &[Cell] {
        &self.to_neutralize
    }

    pub fn in_guard_vision(&self, cell: Cell) -> bool {
        self.guard_vision.contains(&cell)
    }

    pub fn is_watched(&self, cell: Cell) -> bool {
        self.guard_or_civil_vision.contains(&cell)
    }

    /// The guard or civilian in front of the agent, if it is not facing
    /// the agent.
    pub fn unaware_ahead(&self) -> Option<Category> {
        let ahead = self.agent.step(self.facing, 1);
        self.category_at(ahead)
            .filter(|person| person.facing().is_some_and(|f| f != self.facing.opposite()))
    }

    /// Target eliminated and agent back on the origin.
    pub fn is_terminal(&self) -> bool {
        self.cells(Category::Target).is_empty() && self.agent == self.origin
    }

    pub(crate) fn set_agent(&mut self, cell: Cell) {
        self.agent = cell;
    }

    pub(crate) fn set_facing(&mut self, facing: Orientation) {
        self.facing = facing;
    }

    /// Moves `cell` from the `from` list to the `to` list.
    pub(crate) fn relocate(&mut self, cell: Cell, from: Category, to: Category) -> bool {
        let list = &mut self.by_category[from.index()];
        let Some(i) = list.iter().position(|&c| c == cell) else {
            return false;
        };
        list.remove(i);
        self.by_category[to.index()].push(cell);
        true
    }

    /// Adds `cell` to the `category` list without taking it off another.
    #[cfg(test)]
    pub(crate) fn place(&mut self, cell: Cell, category: Category) {
        self.by_category[category.index()].push(cell);
    }

    /// Clears the threat on `cell` along with the vision it projected.
    pub(crate) fn remove_threat(&mut self, cell: Cell) {
        let Some(person) = self.category_at(cell) else {
            return;
        };
        self.relocate(cell, person, Category::Empty);
        for seen in self.sight.remove(&cell).unwrap_or_default() {
            if person.is_guard() {
                remove_one(&mut self.guard_vision, seen);
            }
            remove_one(&mut self.guard_or_civil_vision, seen);
        }
        self.to_neutralize.retain(|&threat| threat != cell);
    }
}

#[cfg(test)]
mod tests {
    use super::BeliefState;
    use crate::{
        grid::{Category, Cell},
        referee::Referee,
        sim::{GridReferee, World},
    };

    fn belief(text: &str) -> BeliefState {
        let world = World::parse(text).unwrap();
        let mut referee = GridReferee::new(world.clone());
        let status = referee.start_phase2();
        BeliefState::new(&world.to_map(), &status)
    }

    #[test]
    fn inverts_the_map() {
        let state = belief("start 0 0 N\n. $ T\n. ! .\n");
        assert_eq!(state.cells(Category::Target), &[Cell::new(2, 1)]);
        assert_eq!(state.first(Category::Suit), Some(Cell::new(1, 1)));
        assert_eq!(state.cells(Category::Empty).len(), 3);
        assert_eq!(state.origin(), Cell::new(0, 0));
        assert_eq!(state.category_at(Cell::new(1, 0)), Some(Category::Weapon));
        assert!(state.to_neutralize().is_empty());
        assert!(!state.is_terminal());
    }

    #[test]
    fn guards_watch_two_cells_civilians_one() {
        let state = belief(
            "\
start 2 0 N
Gv  .  C<
.   .  .
.   T  .
$   !  .
",
        );
        assert_eq!(state.guard_vision(), &[Cell::new(0, 2), Cell::new(0, 1)]);
        assert!(state.is_watched(Cell::new(1, 3)));
        assert!(!state.in_guard_vision(Cell::new(1, 3)));
        assert_eq!(state.guard_or_civil_vision().len(), 3);
        assert!(state.to_neutralize().is_empty());
    }

    #[test]
    fn gaze_halts_at_walls_and_civilians() {
        let state = belief("start 0 1 N\nG> C^ T\n.  #  .\nGv $ !\n");
        // the civilian shields the target from the guard
        assert!(state.guard_vision().iter().all(|&c| c != Cell::new(2, 2)));
        assert!(state.to_neutralize().is_empty());
        // the guard on (0, 0) faces south, off the grid
        assert_eq!(state.category_at(Cell::new(0, 0)), Some(Category::GuardS));
    }

    #[test]
    fn threats_on_the_target_are_recorded() {
        let state = belief("start 0 0 N\n.  .  .\nG> .  T\n.  $  !\n");
        assert_eq!(state.to_neutralize(), &[Cell::new(0, 1)]);
        assert!(state.in_guard_vision(Cell::new(2, 1)));
    }

    #[test]
    fn removing_a_threat_clears_its_vision() {
        let mut state = belief("start 0 0 N\nG> .  T\n.  C^ .\n.  $  !\n");
        assert_eq!(state.to_neutralize(), &[Cell::new(0, 2)]);
        // the civilian and the guard both watch (1, 2)
        let overlap = Cell::new(1, 2);
        assert_eq!(state.guard_or_civil_vision().iter().filter(|&&c| c == overlap).count(), 2);

        state.remove_threat(Cell::new(0, 2));
        assert!(state.to_neutralize().is_empty());
        assert!(state.guard_vision().is_empty());
        assert_eq!(state.guard_or_civil_vision(), &[overlap]);
        assert_eq!(state.category_at(Cell::new(0, 2)), Some(Category::Empty));
    }
}
