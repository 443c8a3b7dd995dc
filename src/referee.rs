//! The game referee as seen by the agent: it owns the true world, executes
//! primitive actions and reports a fresh [`Status`] after each of them.

use std::fmt;

use crate::grid::{Category, Cell, Dims, GridMap, Orientation};

/// Snapshot returned by every referee call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub width: usize,
    pub height: usize,
    pub position: Cell,
    pub orientation: Orientation,
    /// Guards and civilians heard around the agent.
    pub hear: u32,
    /// Cells in front of the agent, nearest first.
    pub vision: Vec<(Cell, Category)>,
    pub has_suit: bool,
    pub is_suit_on: bool,
    pub has_weapon: bool,
    pub penalties: u32,
}

impl Status {
    pub fn dims(&self) -> Dims {
        Dims::new(self.width, self.height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    Move,
    TurnClockwise,
    TurnAntiClockwise,
    TakeSuit,
    TakeWeapon,
    PutOnSuit,
    KillTarget,
    NeutralizeGuard,
    NeutralizeCivil,
}

impl Primitive {
    pub fn is_exploration(self) -> bool {
        matches!(
            self,
            Primitive::Move | Primitive::TurnClockwise | Primitive::TurnAntiClockwise
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Move => "move",
            Primitive::TurnClockwise => "turn_clockwise",
            Primitive::TurnAntiClockwise => "turn_anti_clockwise",
            Primitive::TakeSuit => "take_suit",
            Primitive::TakeWeapon => "take_weapon",
            Primitive::PutOnSuit => "put_on_suit",
            Primitive::KillTarget => "kill_target",
            Primitive::NeutralizeGuard => "neutralize_guard",
            Primitive::NeutralizeCivil => "neutralize_civil",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug)]
pub struct PhaseOneReport {
    pub score: i64,
    pub history: Vec<Primitive>,
    /// The true map, revealed once exploration is over.
    pub map: GridMap,
}

#[derive(Clone, Debug)]
pub struct PhaseTwoReport {
    pub score: i64,
    pub history: Vec<Primitive>,
    pub goal_reached: bool,
}

pub trait Referee {
    fn start_phase1(&mut self) -> Status;

    /// Hands in the explored map; returns whether it matches the world.
    fn submit_map(&mut self, map: &GridMap) -> bool;

    fn end_phase1(&mut self) -> PhaseOneReport;

    fn start_phase2(&mut self) -> Status;

    fn end_phase2(&mut self) -> PhaseTwoReport;

    /// Executes one primitive. Actions the referee refuses still cost a
    /// penalty and leave the rest of the status unchanged.
    fn act(&mut self, primitive: Primitive) -> Status;

    fn move_forward(&mut self) -> Status {
        self.act(Primitive::Move)
    }

    fn turn_clockwise(&mut self) -> Status {
        self.act(Primitive::TurnClockwise)
    }

    fn turn_anti_clockwise(&mut self) -> Status {
        self.act(Primitive::TurnAntiClockwise)
    }

    fn take_suit(&mut self) -> Status {
        self.act(Primitive::TakeSuit)
    }

    fn take_weapon(&mut self) -> Status {
        self.act(Primitive::TakeWeapon)
    }

    fn put_on_suit(&mut self) -> Status {
        self.act(Primitive::PutOnSuit)
    }

    fn kill_target(&mut self) -> Status {
        self.act(Primitive::KillTarget)
    }

    fn neutralize_guard(&mut self) -> Status {
        self.act(Primitive::NeutralizeGuard)
    }

    fn neutralize_civil(&mut self) -> Status {
        self.act(Primitive::NeutralizeCivil)
    }
}
