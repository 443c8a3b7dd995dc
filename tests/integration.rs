use std::{fs, path::Path};

use hitman_sat::{
    backend::{InProcess, SatBackend},
    config::Config,
    io,
    mission::run_mission,
    referee::Referee,
    sim::{GridReferee, World},
    solver,
};

fn world(name: &str) -> World {
    World::load(Path::new(&format!("tests/data/worlds/{name}.txt"))).unwrap()
}

#[test]
fn missions_in_every_world() {
    for entry in fs::read_dir("tests/data/worlds").unwrap() {
        let path = entry.unwrap().path();
        let world = World::load(&path).unwrap();
        let mut referee = GridReferee::new(world);
        let mut backend = InProcess;

        let report = run_mission(&mut referee, &mut backend, &Config::default()).unwrap();
        assert!(report.map_accepted, "{}", path.display());
        assert!(report.phase2.goal_reached, "{}", path.display());
        assert_eq!(report.rounds, 1, "{}", path.display());
    }
}

#[test]
fn guarded_world_plan() {
    let mut referee = GridReferee::new(world("guarded"));
    let mut backend = InProcess;
    let report = run_mission(&mut referee, &mut backend, &Config::default()).unwrap();

    // straight for the weapon, then up the west column and back
    let history: Vec<&str> = report.phase2.history.iter().map(|p| p.name()).collect();
    assert_eq!(
        history,
        [
            "turn_clockwise",
            "move",
            "take_weapon",
            "turn_anti_clockwise",
            "turn_anti_clockwise",
            "move",
            "turn_clockwise",
            "move",
            "move",
            "kill_target",
            "turn_clockwise",
            "turn_clockwise",
            "move",
            "move",
        ]
    );
    assert_eq!(report.phase2.score, -14);
    // one unsuited step into the guard's sight while exploring
    assert!(report.phase1.score <= -5);
}

#[test]
fn phase_one_rejects_other_actions() {
    let mut referee = GridReferee::new(world("corridor"));
    let status = referee.start_phase1();
    let after = referee.take_weapon();
    assert_eq!(after.penalties, status.penalties + 1);
    assert!(!after.has_weapon);
}

#[test]
fn solves_cnf_files() {
    for (name, sat) in [("sat", true), ("unsat", false)] {
        let mut file = fs::File::open(format!("tests/data/cnf/{name}.cnf")).unwrap();
        let problem = io::read_problem(&mut file).unwrap();
        let solution = InProcess.solve(&problem).unwrap();
        assert!(solver::verify(&problem, sat, &solution), "{name}");

        let mut out = vec![];
        io::write_solution(&mut out, &solution).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(io::read_solution(&text).unwrap(), solution);
    }
}
