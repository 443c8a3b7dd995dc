//! A* search over the 4-connected grid with unit step cost.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::{
    belief::BeliefState,
    grid::{Cell, Dims, Orientation},
};

/// A node in the open set.
#[derive(Clone, Copy, Debug)]
struct Node {
    cell: Cell,
    g_cost: u32,
    f_cost: u32, // g_cost + heuristic
    /// Insertion counter, earlier nodes win ties.
    seq: u64,
}

impl Eq for Node {}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest path from `start` to `goal`, both inclusive, stepping only on
/// cells for which `passable` holds. The start cell is never checked.
pub fn find_path(
    dims: Dims,
    start: Cell,
    goal: Cell,
    passable: impl Fn(Cell) -> bool,
) -> Option<Vec<Cell>> {
    if !dims.contains(start) || !dims.contains(goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }
    if !passable(goal) {
        tracing::trace!(%start, %goal, "goal blocked");
        return None;
    }

    let mut open = BinaryHeap::new();
    let mut closed: HashSet<Cell> = HashSet::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_score: HashMap<Cell, u32> = HashMap::new();
    let mut seq = 0;

    g_score.insert(start, 0);
    open.push(Node {
        cell: start,
        g_cost: 0,
        f_cost: start.manhattan(goal),
        seq,
    });

    while let Some(current) = open.pop() {
        if current.cell == goal {
            let mut path = vec![goal];
            let mut cell = goal;
            while let Some(&prev) = came_from.get(&cell) {
                path.push(prev);
                cell = prev;
            }
            path.reverse();
            tracing::trace!(
                %start,
                %goal,
                steps = path.len() - 1,
                expanded = closed.len(),
                "path found"
            );
            return Some(path);
        }
        if !closed.insert(current.cell) {
            continue;
        }

        for facing in Orientation::ALL {
            let next = current.cell.step(facing, 1);
            if !dims.contains(next) || closed.contains(&next) || !passable(next) {
                continue;
            }
            let tentative = current.g_cost + 1;
            if g_score.get(&next).is_some_and(|&g| g <= tentative) {
                continue;
            }
            g_score.insert(next, tentative);
            came_from.insert(next, current.cell);
            seq += 1;
            open.push(Node {
                cell: next,
                g_cost: tentative,
                f_cost: tentative + next.manhattan(goal),
                seq,
            });
        }
    }

    tracing::trace!(%start, %goal, expanded = closed.len(), "no path");
    None
}

/// A* over a belief state: walls and guards block, everything else is
/// walkable.
pub struct PathPlanner<'a> {
    state: &'a BeliefState,
}

impl<'a> PathPlanner<'a> {
    pub fn new(state: &'a BeliefState) -> Self {
        Self { state }
    }

    pub fn find_path(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        find_path(self.state.dims(), start, goal, |cell| self.state.is_passable(cell))
    }
}

#[cfg(test)]
mod tests {
    use super::{find_path, PathPlanner};
    use crate::{
        belief::BeliefState,
        grid::{Cell, Dims, GridMap},
        referee::Referee,
        sim::{GridReferee, World},
    };

    fn open_in(map: &GridMap) -> impl Fn(Cell) -> bool + '_ {
        move |cell| map.get(cell).is_some_and(|c| !c.blocks_movement())
    }

    fn is_walk(path: &[Cell]) -> bool {
        path.windows(2).all(|w| w[0].direction_to(w[1]).is_some())
    }

    #[test]
    fn straight_line() {
        let world = World::parse("start 0 0 N\n. . . . T\n. $ . . !\n").unwrap();
        let map = world.to_map();
        let path = find_path(map.dims(), Cell::new(0, 0), Cell::new(4, 0), open_in(&map)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&Cell::new(0, 0)));
        assert_eq!(path.last(), Some(&Cell::new(4, 0)));
        assert!(is_walk(&path));
    }

    #[test]
    fn detours_through_the_gap() {
        let world = World::parse(
            "\
start 0 0 N
.  .  .  .  T
.  .  .  .  .
#  #  #  #  .
.  .  .  .  .
.  !  .  $  .
",
        )
        .unwrap();
        let map = world.to_map();
        // 4 east to the gap, 4 north, 4 west back
        let path = find_path(map.dims(), Cell::new(0, 0), Cell::new(0, 4), open_in(&map)).unwrap();
        assert_eq!(path.len() - 1, 12);
        assert!(is_walk(&path));
        assert!(path.iter().all(|&c| c.y != 2 || c.x == 4));
    }

    #[test]
    fn full_wall_row_cuts_the_grid() {
        let world = World::parse(
            "\
start 0 0 N
.  .  .  .  T
.  .  .  .  .
#  #  #  #  #
.  .  .  .  .
.  !  .  $  .
",
        )
        .unwrap();
        let map = world.to_map();
        assert_eq!(find_path(map.dims(), Cell::new(0, 0), Cell::new(0, 4), open_in(&map)), None);
        assert_eq!(
            find_path(map.dims(), Cell::new(0, 0), Cell::new(0, 0), open_in(&map)),
            Some(vec![Cell::new(0, 0)])
        );
    }

    #[test]
    fn guards_block_civilians_do_not() {
        let world = World::parse("start 0 0 E\n$  G>  T\n.  C^  !\n").unwrap();
        let mut referee = GridReferee::new(world.clone());
        let status = referee.start_phase2();
        let state = BeliefState::new(&world.to_map(), &status);
        let planner = PathPlanner::new(&state);

        let path = planner.find_path(Cell::new(0, 0), Cell::new(2, 0)).unwrap();
        assert_eq!(path, vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(2, 0)]);
        assert_eq!(planner.find_path(Cell::new(0, 0), Cell::new(1, 1)), None);
        // a blocked start is fine
        assert!(planner.find_path(Cell::new(1, 1), Cell::new(2, 1)).is_some());
    }

    #[test]
    fn optimal_on_open_grids() {
        // with no obstacles the path is exactly the manhattan distance
        let dims = Dims::new(6, 4);
        for start in dims.cells() {
            for goal in dims.cells() {
                let path = find_path(dims, start, goal, |_| true).unwrap();
                assert_eq!(path.len() as u32 - 1, start.manhattan(goal));
            }
        }
    }
}
