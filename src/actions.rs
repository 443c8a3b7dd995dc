//! STRIPS-style actions over the belief state.
//!
//! An action whose precondition fails is a no-op: it returns its inputs
//! unchanged and never touches the referee.

use std::fmt;

use crate::{
    belief::BeliefState,
    grid::{Category, Orientation, Turn},
    referee::{Referee, Status},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Face the given orientation with the fewest rotations.
    Turn(Orientation),
    /// Step forward; the agent must already face the given orientation.
    Move(Orientation),
    TakeSuit,
    TakeWeapon,
    PutOnSuit,
    KillTarget,
    NeutralizeGuard,
    NeutralizeCivil,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Turn(facing) => write!(f, "turn_{facing}"),
            Action::Move(facing) => write!(f, "move_{facing}"),
            Action::TakeSuit => f.write_str("take_suit"),
            Action::TakeWeapon => f.write_str("take_weapon"),
            Action::PutOnSuit => f.write_str("put_on_suit"),
            Action::KillTarget => f.write_str("kill_target"),
            Action::NeutralizeGuard => f.write_str("neutralize_guard"),
            Action::NeutralizeCivil => f.write_str("neutralize_civil"),
        }
    }
}

impl Action {
    pub fn precondition(self, state: &BeliefState, status: &Status) -> bool {
        let here = state.agent();
        let on = |category: Category| state.cells(category).contains(&here);
        match self {
            Action::Turn(facing) => state.facing() != facing,
            Action::Move(facing) => {
                state.facing() == facing && state.is_passable(here.step(facing, 1))
            }
            Action::TakeSuit => on(Category::Suit) && !status.has_suit && !status.is_suit_on,
            Action::TakeWeapon => on(Category::Weapon) && !status.has_weapon,
            Action::PutOnSuit => status.has_suit && !status.is_suit_on,
            Action::KillTarget => on(Category::Target) && status.has_weapon,
            Action::NeutralizeGuard => state.unaware_ahead().is_some_and(Category::is_guard),
            Action::NeutralizeCivil => state.unaware_ahead().is_some_and(Category::is_civil),
        }
    }

    /// Applies the action, calling the matching referee primitives.
    pub fn apply<R: Referee + ?Sized>(
        self,
        state: &BeliefState,
        status: &Status,
        referee: &mut R,
    ) -> (BeliefState, Status) {
        if !self.precondition(state, status) {
            return (state.clone(), status.clone());
        }

        let mut next = state.clone();
        let here = state.agent();
        let latest = match self {
            Action::Turn(facing) => {
                let mut latest = status.clone();
                for turn in state.facing().turns_to(facing) {
                    latest = match turn {
                        Turn::Clockwise => referee.turn_clockwise(),
                        Turn::AntiClockwise => referee.turn_anti_clockwise(),
                    };
                }
                next.set_facing(facing);
                latest
            }
            Action::Move(facing) => {
                let latest = referee.move_forward();
                let dest = here.step(facing, 1);
                if latest.position != dest {
                    tracing::warn!(from = %here, to = %dest, "referee refused a planned move");
                }
                next.set_agent(latest.position);
                latest
            }
            Action::TakeSuit => {
                next.relocate(here, Category::Suit, Category::Empty);
                referee.take_suit()
            }
            Action::TakeWeapon => {
                next.relocate(here, Category::Weapon, Category::Empty);
                referee.take_weapon()
            }
            Action::PutOnSuit => referee.put_on_suit(),
            Action::KillTarget => {
                next.relocate(here, Category::Target, Category::Empty);
                referee.kill_target()
            }
            Action::NeutralizeGuard | Action::NeutralizeCivil => {
                next.remove_threat(here.step(state.facing(), 1));
                if self == Action::NeutralizeGuard {
                    referee.neutralize_guard()
                } else {
                    referee.neutralize_civil()
                }
            }
        };
        (next, latest)
    }
}

/// Runs `plan` left to right. Actions whose precondition fails are
/// skipped.
pub fn execute_plan<R: Referee + ?Sized>(
    plan: &[Action],
    state: BeliefState,
    status: Status,
    referee: &mut R,
) -> (BeliefState, Status) {
    let mut state = state;
    let mut status = status;
    for &action in plan {
        let (next, latest) = action.apply(&state, &status, referee);
        if next == state && latest == status {
            tracing::debug!(%action, agent = %state.agent(), "precondition failed, skipped");
        } else {
            tracing::trace!(
                %action,
                agent = %next.agent(),
                penalties = latest.penalties,
                "action done"
            );
        }
        state = next;
        status = latest;
    }
    (state, status)
}

#[cfg(test)]
mod tests {
    use super::{execute_plan, Action};
    use crate::{
        belief::BeliefState,
        grid::{Category, Cell, Orientation},
        referee::{Referee, Status},
        sim::{GridReferee, World},
    };

    fn setup(text: &str) -> (GridReferee, BeliefState, Status) {
        let world = World::parse(text).unwrap();
        let mut referee = GridReferee::new(world.clone());
        let status = referee.start_phase2();
        let state = BeliefState::new(&world.to_map(), &status);
        (referee, state, status)
    }

    #[test]
    fn names() {
        assert_eq!(Action::Turn(Orientation::N).to_string(), "turn_N");
        assert_eq!(Action::Move(Orientation::W).to_string(), "move_W");
        assert_eq!(Action::NeutralizeCivil.to_string(), "neutralize_civil");
    }

    #[test]
    fn failed_preconditions_are_no_ops() {
        let (mut referee, state, status) = setup("start 0 0 N\n# $\n. !\n. T\n");
        for action in [
            Action::Turn(Orientation::N),
            Action::Move(Orientation::E),
            Action::TakeWeapon,
            Action::TakeSuit,
            Action::PutOnSuit,
            Action::KillTarget,
            Action::NeutralizeGuard,
        ] {
            let (next, latest) = action.apply(&state, &status, &mut referee);
            assert_eq!(next, state, "{action}");
            assert_eq!(latest, status, "{action}");
        }
        // facing north into the row above is allowed
        let (next, _) = Action::Move(Orientation::N).apply(&state, &status, &mut referee);
        assert_eq!(next.agent(), Cell::new(0, 1));
    }

    #[test]
    fn turn_then_move_tracks_the_agent() {
        let (mut referee, state, status) = setup("start 0 0 N\n$ T\n. !\n");
        let (state, status) = execute_plan(
            &[Action::Turn(Orientation::E), Action::Move(Orientation::E), Action::TakeWeapon],
            state,
            status,
            &mut referee,
        );
        assert_eq!(state.facing(), Orientation::E);
        assert_eq!(state.agent(), Cell::new(1, 0));
        assert!(status.has_weapon);
        assert!(state.cells(Category::Weapon).is_empty());
        assert_eq!(status.penalties, 3);
    }

    #[test]
    fn neutralizing_a_guard_clears_its_gaze() {
        let (mut referee, state, status) = setup("start 0 0 E\nT  $  Gv\n.  !  .\n");
        // step under the guard, then face it from below
        let plan = [
            Action::Move(Orientation::E),
            Action::TakeWeapon,
            Action::Move(Orientation::E),
            Action::Turn(Orientation::N),
            Action::NeutralizeGuard,
        ];
        // the guard faces south: the agent below it is in its gaze and
        // faces it head on, so the neutralization is refused
        let (after, _) = execute_plan(&plan, state.clone(), status.clone(), &mut referee);
        assert_eq!(after.category_at(Cell::new(2, 1)), Some(Category::GuardS));

        let (mut referee, state, status) = setup("start 0 0 E\nT  $  G<\n.  !  .\n");
        let (after, _) = execute_plan(&plan, state, status, &mut referee);
        assert_eq!(after.category_at(Cell::new(2, 1)), Some(Category::Empty));
        assert!(after.guard_vision().is_empty());
        assert_eq!(referee.world().get(Cell::new(2, 1)), Some(Category::Empty));
    }
}
