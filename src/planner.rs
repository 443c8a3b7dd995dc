//! Mission planner: picks the cheapest order of stops, detours to an
//! ambush cell when the target is watched, and compiles the routes.

use std::collections::HashMap;

use crate::{
    actions::Action,
    astar::PathPlanner,
    belief::BeliefState,
    compose::{Inventory, PlanComposer},
    error::MissionError,
    grid::{Cell, Orientation},
    referee::Status,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stop {
    Weapon,
    Suit,
    Target,
    Exit,
}

/// Stop orders tried every round; stops that no longer apply are dropped.
const ORDERS: [&[Stop]; 3] = [
    &[Stop::Weapon, Stop::Target, Stop::Exit],
    &[Stop::Suit, Stop::Weapon, Stop::Target, Stop::Exit],
    &[Stop::Weapon, Stop::Suit, Stop::Target, Stop::Exit],
];

/// Sides of a threat tried as ambush cells, in order.
const AMBUSH_SIDES: [Orientation; 4] = [
    Orientation::E,
    Orientation::N,
    Orientation::W,
    Orientation::S,
];

/// One costed stop order.
#[derive(Clone, Debug)]
struct Candidate {
    stops: Vec<(Stop, Cell)>,
    routes: Vec<Vec<Cell>>,
    cost: u32,
}

pub struct MissionPlanner<'a> {
    state: &'a BeliefState,
    paths: PathPlanner<'a>,
    detection_cost: u32,
    /// Routes computed this round, by endpoints.
    memo: HashMap<(Cell, Cell), Option<Vec<Cell>>>,
}

impl<'a> MissionPlanner<'a> {
    pub fn new(state: &'a BeliefState, detection_cost: u32) -> Self {
        Self {
            state,
            paths: PathPlanner::new(state),
            detection_cost,
            memo: HashMap::new(),
        }
    }

    fn segment(&mut self, from: Cell, to: Cell) -> Option<Vec<Cell>> {
        if let Some(route) = self.memo.get(&(from, to)) {
            return route.clone();
        }
        let route = self.paths.find_path(from, to);
        self.memo.insert((from, to), route.clone());
        route
    }

    fn stop_cell(&self, stop: Stop, inventory: &Inventory) -> Option<Cell> {
        match stop {
            Stop::Weapon if !inventory.has_weapon => inventory.weapon,
            Stop::Suit if !inventory.is_suited() => inventory.suit,
            Stop::Target => inventory.target,
            Stop::Exit => Some(self.state.origin()),
            Stop::Weapon | Stop::Suit => None,
        }
    }

    /// Routes and cost of visiting `stops` in order from the agent's cell.
    fn cost(&mut self, stops: Vec<(Stop, Cell)>, suited: bool) -> Result<Candidate, MissionError> {
        let mut at = self.state.agent();
        let mut suited = suited;
        let mut cost = 0;
        let mut routes = Vec::with_capacity(stops.len());
        for &(stop, cell) in &stops {
            let route = self
                .segment(at, cell)
                .ok_or(MissionError::NoRoute { from: at, to: cell })?;
            cost += route.len() as u32 - 1;
            if !suited {
                let seen = route[1..]
                    .iter()
                    .filter(|&&c| self.state.in_guard_vision(c))
                    .count() as u32;
                cost += self.detection_cost * seen;
            }
            if stop == Stop::Suit {
                suited = true;
            }
            routes.push(route);
            at = cell;
        }
        Ok(Candidate { stops, routes, cost })
    }

    /// First free side of `threat` reachable from `from`, with the route.
    fn ambush(&mut self, from: Cell, threat: Cell) -> Result<(Cell, Vec<Cell>), MissionError> {
        let gaze = self
            .state
            .category_at(threat)
            .and_then(|person| person.facing())
            .map(|facing| threat.step(facing, 1));
        for side in AMBUSH_SIDES {
            let spot = threat.step(side, 1);
            if Some(spot) == gaze || !self.state.is_passable(spot) || self.state.is_watched(spot) {
                continue;
            }
            if let Some(route) = self.segment(from, spot) {
                return Ok((spot, route));
            }
        }
        Err(MissionError::NoAmbush { threat })
    }

    /// Replaces the route into the target with a detour that neutralizes
    /// `threat` from an ambush cell first.
    fn insert_detour(&mut self, best: &mut Candidate, threat: Cell) -> Result<(), MissionError> {
        let Some(k) = best.stops.iter().position(|&(stop, _)| stop == Stop::Target) else {
            return Ok(());
        };
        let target = best.stops[k].1;
        let from = best.routes[k][0];
        let Some(person) = self.state.category_at(threat) else {
            return Ok(());
        };

        let (spot, mut approach) = self.ambush(from, threat)?;
        let repeats = if person.is_guard() { 2 } else { 1 };
        for _ in 0..repeats {
            approach.push(spot);
        }
        approach.push(threat);
        let onward = self
            .segment(threat, target)
            .ok_or(MissionError::NoRoute { from: threat, to: target })?;

        tracing::info!(%threat, %person, ambush = %spot, "detour to neutralize");
        best.routes.splice(k..=k, [approach, onward]);
        Ok(())
    }

    /// Plans the rest of the mission from the current state.
    pub fn plan(&mut self, status: &Status) -> Result<Vec<Action>, MissionError> {
        let inventory = Inventory::observe(self.state, status);

        let mut orders: Vec<Vec<(Stop, Cell)>> = vec![];
        for order in ORDERS {
            let stops: Vec<(Stop, Cell)> = order
                .iter()
                .filter_map(|&stop| self.stop_cell(stop, &inventory).map(|cell| (stop, cell)))
                .collect();
            if !orders.contains(&stops) {
                orders.push(stops);
            }
        }

        let mut best: Option<Candidate> = None;
        let mut failure = None;
        for stops in orders {
            match self.cost(stops, inventory.is_suited()) {
                Ok(candidate) => {
                    tracing::debug!(stops = ?candidate.stops, cost = candidate.cost, "candidate");
                    let better = match &best {
                        Some(b) => candidate.cost < b.cost,
                        None => true,
                    };
                    if better {
                        best = Some(candidate);
                    }
                }
                Err(e) => {
                    tracing::debug!(error = %e, "candidate unreachable");
                    failure.get_or_insert(e);
                }
            }
        }
        let Some(mut best) = best else {
            return Err(failure.unwrap_or(MissionError::NoRoute {
                from: self.state.agent(),
                to: self.state.origin(),
            }));
        };

        if inventory.target.is_some() {
            if let Some(&threat) = self.state.to_neutralize().first() {
                self.insert_detour(&mut best, threat)?;
            }
        }

        tracing::info!(stops = ?best.stops, cost = best.cost, "route chosen");
        let mut composer = PlanComposer::new(self.state, inventory);
        for route in &best.routes {
            composer.push_route(route)?;
        }
        Ok(composer.into_plan())
    }
}
