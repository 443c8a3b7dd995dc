//! Drives a full mission: exploration, map hand-in, then planning rounds
//! until the target is eliminated and the agent is back home.

use crate::{
    actions::execute_plan,
    backend::SatBackend,
    belief::BeliefState,
    config::{Config, MissionConfig},
    error::{AgentError, MissionError},
    explore::explore,
    grid::GridMap,
    planner::MissionPlanner,
    referee::{PhaseOneReport, PhaseTwoReport, Referee, Status},
};

#[derive(Clone, Debug)]
pub struct MissionReport {
    pub explore_steps: usize,
    /// Whether the referee accepted the explored map.
    pub map_accepted: bool,
    pub phase1: PhaseOneReport,
    pub rounds: usize,
    pub phase2: PhaseTwoReport,
}

impl MissionReport {
    pub fn total_score(&self) -> i64 {
        self.phase1.score + self.phase2.score
    }
}

/// Phase 2 planning rounds over `map`. Returns the number of rounds run.
pub fn accomplish<R: Referee + ?Sized>(
    referee: &mut R,
    map: &GridMap,
    status: Status,
    config: &MissionConfig,
) -> Result<usize, MissionError> {
    let mut state = BeliefState::new(map, &status);
    let mut status = status;
    let mut rounds = 0;

    while !state.is_terminal() {
        if rounds >= config.max_rounds {
            return Err(MissionError::RoundLimit { rounds });
        }
        rounds += 1;

        let plan = MissionPlanner::new(&state, config.detection_cost).plan(&status)?;
        tracing::info!(round = rounds, actions = plan.len(), "executing plan");
        let (next, latest) = execute_plan(&plan, state.clone(), status.clone(), referee);
        if next == state && latest == status {
            tracing::warn!(round = rounds, agent = %state.agent(), "plan changed nothing");
            return Err(MissionError::Stalled { round: rounds });
        }
        state = next;
        status = latest;
    }
    Ok(rounds)
}

/// Runs both phases against `referee`.
pub fn run_mission<R: Referee + ?Sized>(
    referee: &mut R,
    backend: &mut dyn SatBackend,
    config: &Config,
) -> Result<MissionReport, AgentError> {
    let status = referee.start_phase1();
    tracing::info!(
        width = status.width,
        height = status.height,
        start = %status.position,
        facing = %status.orientation,
        "phase 1 started"
    );
    let exploration = explore(referee, backend, status, &config.explore)?;
    let map_accepted = referee.submit_map(&exploration.map);
    let phase1 = referee.end_phase1();
    tracing::info!(
        score = phase1.score,
        steps = exploration.steps,
        accepted = map_accepted,
        "phase 1 over"
    );

    let status = referee.start_phase2();
    let rounds = accomplish(referee, &phase1.map, status, &config.mission)?;
    let phase2 = referee.end_phase2();
    tracing::info!(
        score = phase2.score,
        rounds,
        goal = phase2.goal_reached,
        "phase 2 over"
    );

    Ok(MissionReport {
        explore_steps: exploration.steps,
        map_accepted,
        phase1,
        rounds,
        phase2,
    })
}
