//! Grid vocabulary shared by both phases: cells, facings, cell categories
//! and the per-orientation tables.

use std::fmt;

/// A grid coordinate. `x` grows eastward, `y` grows northward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// The cell `distance` steps away along `facing`.
    pub fn step(self, facing: Orientation, distance: i32) -> Self {
        let (dx, dy) = facing.delta();
        self.offset(dx * distance, dy * distance)
    }

    pub fn manhattan(self, other: Cell) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Direction of a single orthogonal step from `self` to `next`.
    pub fn direction_to(self, next: Cell) -> Option<Orientation> {
        Orientation::ALL
            .into_iter()
            .find(|&o| self.step(o, 1) == next)
    }
}

impl From<(i32, i32)> for Cell {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid bounds, fixed for the whole mission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
    pub width: usize,
    pub height: usize,
}

impl Dims {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x >= 0
            && cell.y >= 0
            && (cell.x as usize) < self.width
            && (cell.y as usize) < self.height
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.width as i32)
            .flat_map(move |x| (0..self.height as i32).map(move |y| Cell::new(x, y)))
    }

    /// In-bounds cells at distance `1..=len` from `from` along `facing`.
    pub fn ray(
        &self,
        from: Cell,
        facing: Orientation,
        len: i32,
    ) -> impl Iterator<Item = Cell> + '_ {
        (1..=len)
            .map(move |k| from.step(facing, k))
            .take_while(move |&cell| self.contains(cell))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    N,
    E,
    S,
    W,
}

impl Orientation {
    /// Clockwise order, also the index order of the per-orientation tables.
    pub const ALL: [Orientation; 4] = [
        Orientation::N,
        Orientation::E,
        Orientation::S,
        Orientation::W,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Orientation::N => (0, 1),
            Orientation::E => (1, 0),
            Orientation::S => (0, -1),
            Orientation::W => (-1, 0),
        }
    }

    pub fn clockwise(self) -> Self {
        Self::ALL[(self.index() + 1) % 4]
    }

    pub fn anticlockwise(self) -> Self {
        Self::ALL[(self.index() + 3) % 4]
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }

    /// Shortest turn sequence that makes an agent facing `self` face `to`.
    pub fn turns_to(self, to: Orientation) -> &'static [Turn] {
        ROTATIONS[self.index()][to.index()]
    }

    pub fn symbol(self) -> char {
        match self {
            Orientation::N => 'N',
            Orientation::E => 'E',
            Orientation::S => 'S',
            Orientation::W => 'W',
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    Clockwise,
    AntiClockwise,
}

use Turn::{AntiClockwise as Acw, Clockwise as Cw};

/// `ROTATIONS[from][to]`, both indexed in `Orientation::ALL` order.
#[rustfmt::skip]
const ROTATIONS: [[&[Turn]; 4]; 4] = [
    //  to N        to E        to S        to W
    [&[], &[Cw], &[Cw, Cw], &[Acw]],       // from N
    [&[Acw], &[], &[Cw], &[Acw, Acw]],     // from E
    [&[Cw, Cw], &[Acw], &[], &[Cw]],       // from S
    [&[Cw], &[Acw, Acw], &[Acw], &[]],     // from W
];

/// What a grid cell holds. The declaration order fixes the proposition
/// variable numbering, see [`crate::encoding::Encoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Empty,
    Wall,
    GuardN,
    GuardE,
    GuardS,
    GuardW,
    CivilN,
    CivilE,
    CivilS,
    CivilW,
    Target,
    Suit,
    Weapon,
}

impl Category {
    pub const COUNT: usize = 13;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Empty,
        Category::Wall,
        Category::GuardN,
        Category::GuardE,
        Category::GuardS,
        Category::GuardW,
        Category::CivilN,
        Category::CivilE,
        Category::CivilS,
        Category::CivilW,
        Category::Target,
        Category::Suit,
        Category::Weapon,
    ];

    /// Guards and civilians, the categories noise is counted over.
    pub const PEOPLE: [Category; 8] = [
        Category::GuardN,
        Category::GuardE,
        Category::GuardS,
        Category::GuardW,
        Category::CivilN,
        Category::CivilE,
        Category::CivilS,
        Category::CivilW,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn guard(facing: Orientation) -> Self {
        match facing {
            Orientation::N => Category::GuardN,
            Orientation::E => Category::GuardE,
            Orientation::S => Category::GuardS,
            Orientation::W => Category::GuardW,
        }
    }

    pub fn civil(facing: Orientation) -> Self {
        match facing {
            Orientation::N => Category::CivilN,
            Orientation::E => Category::CivilE,
            Orientation::S => Category::CivilS,
            Orientation::W => Category::CivilW,
        }
    }

    pub fn is_guard(self) -> bool {
        matches!(
            self,
            Category::GuardN | Category::GuardE | Category::GuardS | Category::GuardW
        )
    }

    pub fn is_civil(self) -> bool {
        matches!(
            self,
            Category::CivilN | Category::CivilE | Category::CivilS | Category::CivilW
        )
    }

    /// Facing of a guard or civilian.
    pub fn facing(self) -> Option<Orientation> {
        match self {
            Category::GuardN | Category::CivilN => Some(Orientation::N),
            Category::GuardE | Category::CivilE => Some(Orientation::E),
            Category::GuardS | Category::CivilS => Some(Orientation::S),
            Category::GuardW | Category::CivilW => Some(Orientation::W),
            _ => None,
        }
    }

    /// Walls and guards cannot be stepped on.
    pub fn blocks_movement(self) -> bool {
        self == Category::Wall || self.is_guard()
    }

    /// Cells the agent's line of sight stops at (the cell itself is seen).
    pub fn blocks_vision(self) -> bool {
        !matches!(self, Category::Empty | Category::Target)
    }

    /// Cells that cut a guard's or civilian's line of sight.
    pub fn blocks_gaze(self) -> bool {
        self == Category::Wall || self.is_civil()
    }

    /// Token used by world files, see [`crate::sim::World`].
    pub fn token(self) -> &'static str {
        match self {
            Category::Empty => ".",
            Category::Wall => "#",
            Category::GuardN => "G^",
            Category::GuardE => "G>",
            Category::GuardS => "Gv",
            Category::GuardW => "G<",
            Category::CivilN => "C^",
            Category::CivilE => "C>",
            Category::CivilS => "Cv",
            Category::CivilW => "C<",
            Category::Target => "T",
            Category::Suit => "$",
            Category::Weapon => "!",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.token() == token)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// The agent's picture of the grid: one category per cell once resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridMap {
    dims: Dims,
    cells: Vec<Option<Category>>,
}

impl GridMap {
    pub fn unknown(dims: Dims) -> Self {
        Self {
            dims,
            cells: vec![None; dims.len()],
        }
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    fn slot(&self, cell: Cell) -> usize {
        assert!(self.dims.contains(cell), "cell {cell} outside the grid");
        cell.x as usize * self.dims.height + cell.y as usize
    }

    /// `None` for unresolved cells and for cells outside the grid.
    pub fn get(&self, cell: Cell) -> Option<Category> {
        if self.dims.contains(cell) {
            self.cells[self.slot(cell)]
        } else {
            None
        }
    }

    pub fn is_unknown(&self, cell: Cell) -> bool {
        self.dims.contains(cell) && self.get(cell).is_none()
    }

    /// Resolves `cell` to `category`. Resolved cells never change; returns
    /// whether the cell was newly resolved.
    pub fn resolve(&mut self, cell: Cell, category: Category) -> bool {
        let slot = self.slot(cell);
        match self.cells[slot] {
            None => {
                self.cells[slot] = Some(category);
                true
            }
            Some(known) => {
                if known != category {
                    tracing::warn!(
                        %cell,
                        %known,
                        seen = %category,
                        "conflicting observation ignored"
                    );
                }
                false
            }
        }
    }

    pub fn unresolved(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Resolved cells in column-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Cell, Category)> + '_ {
        self.dims
            .cells()
            .filter_map(move |cell| self.get(cell).map(|category| (cell, category)))
    }
}

#[cfg(test)]
mod tests {
    use super::{Category, Cell, Dims, GridMap, Orientation, Turn};

    #[test]
    fn rotation_table_reaches_target() {
        for from in Orientation::ALL {
            for to in Orientation::ALL {
                let turns = from.turns_to(to);
                assert!(turns.len() <= 2);
                let end = turns.iter().fold(from, |facing, turn| match turn {
                    Turn::Clockwise => facing.clockwise(),
                    Turn::AntiClockwise => facing.anticlockwise(),
                });
                assert_eq!(end, to, "{from} -> {to}");
            }
        }
        assert_eq!(Orientation::N.turns_to(Orientation::W), &[Turn::AntiClockwise]);
    }

    #[test]
    fn steps_follow_compass() {
        let c = Cell::new(2, 2);
        assert_eq!(c.step(Orientation::N, 1), Cell::new(2, 3));
        assert_eq!(c.step(Orientation::E, 2), Cell::new(4, 2));
        assert_eq!(c.direction_to(Cell::new(2, 1)), Some(Orientation::S));
        assert_eq!(c.direction_to(Cell::new(3, 3)), None);
    }

    #[test]
    fn ray_stops_at_border() {
        let dims = Dims::new(4, 4);
        let cells: Vec<Cell> = dims.ray(Cell::new(1, 1), Orientation::W, 3).collect();
        assert_eq!(cells, vec![Cell::new(0, 1)]);
    }

    #[test]
    fn tokens_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::from_token(category.token()), Some(category));
        }
        assert_eq!(Category::from_token("?"), None);
    }

    #[test]
    fn map_resolves_once() {
        let mut map = GridMap::unknown(Dims::new(2, 2));
        assert_eq!(map.unresolved(), 4);
        assert!(map.resolve(Cell::new(1, 0), Category::Wall));
        assert!(!map.resolve(Cell::new(1, 0), Category::Empty));
        assert_eq!(map.get(Cell::new(1, 0)), Some(Category::Wall));
        assert_eq!(map.get(Cell::new(5, 0)), None);
        assert!(!map.is_unknown(Cell::new(5, 0)));
        assert_eq!(map.unresolved(), 3);
    }
}
