//! Turns cell routes into action plans.
//!
//! A route may carry a neutralization marker: a cell repeated three times
//! (guard) or twice (civilian), followed by the threat's own cell. The
//! marker compiles to a turn towards the threat, the neutralize action,
//! and a move onto the freed cell.

use crate::{
    actions::Action,
    belief::BeliefState,
    error::MissionError,
    grid::{Category, Cell, Orientation},
    referee::Status,
};

/// Item positions still worth visiting, and what the agent carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inventory {
    pub weapon: Option<Cell>,
    pub suit: Option<Cell>,
    pub target: Option<Cell>,
    pub has_weapon: bool,
    pub has_suit: bool,
    pub suit_on: bool,
}

impl Inventory {
    pub fn observe(state: &BeliefState, status: &Status) -> Self {
        Self {
            weapon: state.first(Category::Weapon),
            suit: state.first(Category::Suit),
            target: state.first(Category::Target),
            has_weapon: status.has_weapon,
            has_suit: status.has_suit,
            suit_on: status.is_suit_on,
        }
    }

    pub fn is_suited(&self) -> bool {
        self.has_suit || self.suit_on
    }
}

/// Compiles consecutive routes into one plan, carrying position, facing
/// and inventory from one route to the next.
pub struct PlanComposer<'a> {
    state: &'a BeliefState,
    inventory: Inventory,
    at: Cell,
    facing: Orientation,
    plan: Vec<Action>,
}

impl<'a> PlanComposer<'a> {
    pub fn new(state: &'a BeliefState, inventory: Inventory) -> Self {
        Self {
            state,
            inventory,
            at: state.agent(),
            facing: state.facing(),
            plan: vec![],
        }
    }

    /// Pickups, kill and suit-up available on `here`.
    fn collect(&mut self, here: Cell) {
        let inv = &mut self.inventory;
        if !inv.has_weapon && inv.weapon == Some(here) {
            self.plan.push(Action::TakeWeapon);
            inv.has_weapon = true;
            inv.weapon = None;
        }
        if !inv.is_suited() && inv.suit == Some(here) {
            self.plan.push(Action::TakeSuit);
            inv.has_suit = true;
            inv.suit = None;
        }
        if inv.has_weapon && inv.target == Some(here) {
            self.plan.push(Action::KillTarget);
            inv.target = None;
        }
        if inv.has_suit && !inv.suit_on && !self.state.is_watched(here) {
            self.plan.push(Action::PutOnSuit);
            inv.suit_on = true;
        }
    }

    /// Appends `route`, which must start where the previous one ended.
    pub fn push_route(&mut self, route: &[Cell]) -> Result<(), MissionError> {
        let Some(&first) = route.first() else {
            return Ok(());
        };
        if first != self.at {
            return Err(MissionError::Disjoint {
                from: self.at,
                to: first,
            });
        }
        self.collect(first);

        let mut i = 0;
        while i + 1 < route.len() {
            let here = route[i];
            let mut next_index = i + 1;
            while next_index < route.len() && route[next_index] == here {
                next_index += 1;
            }
            let Some(&next) = route.get(next_index) else {
                break;
            };
            let direction = here
                .direction_to(next)
                .ok_or(MissionError::Disjoint { from: here, to: next })?;

            if self.facing != direction {
                self.plan.push(Action::Turn(direction));
                self.facing = direction;
            }
            match next_index - i {
                1 => (),
                2 => self.plan.push(Action::NeutralizeCivil),
                _ => self.plan.push(Action::NeutralizeGuard),
            }
            self.plan.push(Action::Move(direction));
            self.at = next;
            self.collect(next);
            i = next_index;
        }
        Ok(())
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn into_plan(self) -> Vec<Action> {
        self.plan
    }
}
