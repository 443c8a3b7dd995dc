//! A referee over a fully known world, for offline runs and tests.
//!
//! World files are whitespace-separated grids, northmost row first:
//!
//! ```text
//! ; comment
//! start 0 0 N
//! .  #  G<  T
//! .  .  .   $
//! .  !  C^  .
//! ```

use std::path::Path;

use crate::{
    error::WorldError,
    grid::{Category, Cell, Dims, GridMap, Orientation},
    referee::{PhaseOneReport, PhaseTwoReport, Primitive, Referee, Status},
};

pub const ACTION_COST: u32 = 1;
/// Charged per watching guard for every unsuited action in its sight.
pub const DETECTION_COST: u32 = 5;
pub const AGENT_SIGHT: i32 = 3;
pub const GUARD_SIGHT: i32 = 2;
pub const CIVIL_SIGHT: i32 = 1;
pub const HEARING_RADIUS: i32 = 2;
pub const HEARING_CAP: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    dims: Dims,
    /// Column-major, like [`GridMap`].
    cells: Vec<Category>,
    start: Cell,
    facing: Orientation,
}

fn syntax(line: usize, message: impl Into<String>) -> WorldError {
    WorldError::Syntax {
        line,
        message: message.into(),
    }
}

fn parse_start(line: usize, words: &[&str]) -> Result<(Cell, Orientation), WorldError> {
    let [x, y, facing] = words[..] else {
        return Err(syntax(line, "expected `start X Y F`"));
    };
    let coord = |word: &str| {
        word.parse::<i32>()
            .map_err(|e| syntax(line, format!("coordinate `{word}`: {e}")))
    };
    let facing = match facing {
        "N" => Orientation::N,
        "E" => Orientation::E,
        "S" => Orientation::S,
        "W" => Orientation::W,
        other => return Err(syntax(line, format!("unknown facing `{other}`"))),
    };
    Ok((Cell::new(coord(x)?, coord(y)?), facing))
}

impl World {
    pub fn parse(text: &str) -> Result<Self, WorldError> {
        let mut rows: Vec<Vec<Category>> = vec![];
        let mut start = None;

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.first() {
                None => continue,
                Some(word) if word.starts_with(';') => continue,
                Some(&"start") => {
                    start = Some(parse_start(line_no, &words[1..])?);
                    continue;
                }
                Some(_) => (),
            }

            let row = words
                .iter()
                .map(|&word| {
                    Category::from_token(word)
                        .ok_or_else(|| syntax(line_no, format!("unknown cell `{word}`")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(first) = rows.first() {
                if first.len() != row.len() {
                    return Err(WorldError::Ragged {
                        line: line_no,
                        expected: first.len(),
                        actual: row.len(),
                    });
                }
            }
            rows.push(row);
        }

        let Some(first) = rows.first() else {
            return Err(WorldError::Empty);
        };
        let (start, facing) = start.ok_or(WorldError::MissingStart)?;

        let dims = Dims::new(first.len(), rows.len());
        let mut cells = vec![Category::Empty; dims.len()];
        for (r, row) in rows.iter().enumerate() {
            let y = dims.height - 1 - r;
            for (x, &category) in row.iter().enumerate() {
                cells[x * dims.height + y] = category;
            }
        }

        let world = World {
            dims,
            cells,
            start,
            facing,
        };
        if world.get(start) != Some(Category::Empty) {
            return Err(WorldError::BadStart(start));
        }
        for unique in [Category::Target, Category::Suit, Category::Weapon] {
            let found = world.cells.iter().filter(|&&c| c == unique).count();
            if found != 1 {
                return Err(WorldError::Uniqueness {
                    token: unique.token(),
                    found,
                });
            }
        }
        Ok(world)
    }

    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let text = std::fs::read_to_string(path).map_err(|source| WorldError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn start(&self) -> Cell {
        self.start
    }

    pub fn facing(&self) -> Orientation {
        self.facing
    }

    pub fn get(&self, cell: Cell) -> Option<Category> {
        self.dims
            .contains(cell)
            .then(|| self.cells[cell.x as usize * self.dims.height + cell.y as usize])
    }

    fn set(&mut self, cell: Cell, category: Category) {
        let slot = cell.x as usize * self.dims.height + cell.y as usize;
        self.cells[slot] = category;
    }

    /// The world as a fully resolved map.
    pub fn to_map(&self) -> GridMap {
        let mut map = GridMap::unknown(self.dims);
        for cell in self.dims.cells() {
            if let Some(category) = self.get(cell) {
                map.resolve(cell, category);
            }
        }
        map
    }

    /// Whether the guard or civilian standing on `from` sees `cell`.
    fn sees(&self, from: Cell, cell: Cell) -> bool {
        let Some(person) = self.get(from) else {
            return false;
        };
        let Some(facing) = person.facing() else {
            return false;
        };
        let range = if person.is_guard() {
            GUARD_SIGHT
        } else {
            CIVIL_SIGHT
        };
        for seen in self.dims.ray(from, facing, range) {
            if self.get(seen).is_some_and(Category::blocks_gaze) {
                return false;
            }
            if seen == cell {
                return true;
            }
        }
        false
    }

    /// Guards whose sight covers `cell`.
    pub fn watching_guards(&self, cell: Cell) -> usize {
        self.dims
            .cells()
            .filter(|&g| self.get(g).is_some_and(Category::is_guard) && self.sees(g, cell))
            .count()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Exploring,
    Acting,
    Over,
}

/// Referee over a [`World`].
#[derive(Debug)]
pub struct GridReferee {
    initial: World,
    world: World,
    phase: Phase,
    position: Cell,
    orientation: Orientation,
    has_suit: bool,
    is_suit_on: bool,
    has_weapon: bool,
    penalties: u32,
    history: Vec<Primitive>,
}

impl GridReferee {
    pub fn new(world: World) -> Self {
        Self {
            position: world.start,
            orientation: world.facing,
            initial: world.clone(),
            world,
            phase: Phase::Idle,
            has_suit: false,
            is_suit_on: false,
            has_weapon: false,
            penalties: 0,
            history: vec![],
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    fn reset(&mut self, phase: Phase) {
        self.world = self.initial.clone();
        self.phase = phase;
        self.position = self.world.start;
        self.orientation = self.world.facing;
        self.has_suit = false;
        self.is_suit_on = false;
        self.has_weapon = false;
        self.penalties = 0;
        self.history.clear();
    }

    fn vision(&self) -> Vec<(Cell, Category)> {
        let mut seen = vec![];
        for cell in self.world.dims.ray(self.position, self.orientation, AGENT_SIGHT) {
            let Some(category) = self.world.get(cell) else {
                break;
            };
            seen.push((cell, category));
            if category.blocks_vision() {
                break;
            }
        }
        seen
    }

    fn hear(&self) -> u32 {
        let mut heard = 0;
        for dx in -HEARING_RADIUS..=HEARING_RADIUS {
            for dy in -HEARING_RADIUS..=HEARING_RADIUS {
                if (dx, dy) == (0, 0) {
                    continue;
                }
                let cell = self.position.offset(dx, dy);
                if self.world.get(cell).is_some_and(|c| c.is_guard() || c.is_civil()) {
                    heard += 1;
                }
            }
        }
        heard.min(HEARING_CAP)
    }

    fn status(&self) -> Status {
        Status {
            width: self.world.dims.width,
            height: self.world.dims.height,
            position: self.position,
            orientation: self.orientation,
            hear: self.hear(),
            vision: self.vision(),
            has_suit: self.has_suit,
            is_suit_on: self.is_suit_on,
            has_weapon: self.has_weapon,
            penalties: self.penalties,
        }
    }

    fn score(&self) -> i64 {
        -i64::from(self.penalties)
    }

    /// Applies `primitive` if its rules allow it.
    fn perform(&mut self, primitive: Primitive) -> bool {
        let here = self.world.get(self.position);
        let ahead = self.position.step(self.orientation, 1);
        match primitive {
            Primitive::Move => {
                let open = self
                    .world
                    .get(ahead)
                    .is_some_and(|c| !c.blocks_movement());
                if open {
                    self.position = ahead;
                }
                open
            }
            Primitive::TurnClockwise => {
                self.orientation = self.orientation.clockwise();
                true
            }
            Primitive::TurnAntiClockwise => {
                self.orientation = self.orientation.anticlockwise();
                true
            }
            Primitive::TakeSuit if here == Some(Category::Suit) && !self.has_suit => {
                self.world.set(self.position, Category::Empty);
                self.has_suit = true;
                true
            }
            Primitive::TakeWeapon if here == Some(Category::Weapon) && !self.has_weapon => {
                self.world.set(self.position, Category::Empty);
                self.has_weapon = true;
                true
            }
            Primitive::PutOnSuit if self.has_suit && !self.is_suit_on => {
                self.is_suit_on = true;
                true
            }
            Primitive::KillTarget if here == Some(Category::Target) && self.has_weapon => {
                self.world.set(self.position, Category::Empty);
                true
            }
            Primitive::NeutralizeGuard => self.neutralize(ahead, Category::is_guard),
            Primitive::NeutralizeCivil => self.neutralize(ahead, Category::is_civil),
            _ => false,
        }
    }

    fn neutralize(&mut self, cell: Cell, kind: fn(Category) -> bool) -> bool {
        match self.world.get(cell) {
            Some(person)
                if kind(person) && person.facing() != Some(self.orientation.opposite()) =>
            {
                self.world.set(cell, Category::Empty);
                true
            }
            _ => false,
        }
    }

    fn target_alive(&self) -> bool {
        self.world.cells.contains(&Category::Target)
    }
}

impl Referee for GridReferee {
    fn start_phase1(&mut self) -> Status {
        self.reset(Phase::Exploring);
        self.status()
    }

    fn submit_map(&mut self, map: &GridMap) -> bool {
        let correct = *map == self.initial.to_map();
        if !correct {
            tracing::warn!(unresolved = map.unresolved(), "submitted map does not match the world");
        }
        correct
    }

    fn end_phase1(&mut self) -> PhaseOneReport {
        self.phase = Phase::Over;
        PhaseOneReport {
            score: self.score(),
            history: self.history.clone(),
            map: self.initial.to_map(),
        }
    }

    fn start_phase2(&mut self) -> Status {
        self.reset(Phase::Acting);
        self.status()
    }

    fn end_phase2(&mut self) -> PhaseTwoReport {
        self.phase = Phase::Over;
        PhaseTwoReport {
            score: self.score(),
            history: self.history.clone(),
            goal_reached: !self.target_alive() && self.position == self.initial.start,
        }
    }

    fn act(&mut self, primitive: Primitive) -> Status {
        self.penalties += ACTION_COST;
        self.history.push(primitive);

        let allowed = match self.phase {
            Phase::Exploring => primitive.is_exploration(),
            Phase::Acting => true,
            Phase::Idle | Phase::Over => false,
        };
        if !(allowed && self.perform(primitive)) {
            tracing::debug!(
                %primitive,
                phase = ?self.phase,
                position = %self.position,
                "action refused"
            );
        }

        if !self.is_suit_on {
            self.penalties += DETECTION_COST * self.world.watching_guards(self.position) as u32;
        }
        self.status()
    }
}
