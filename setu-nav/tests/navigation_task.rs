mod common;

use std::thread;
use std::time::Duration;

use approx::assert_relative_eq;
use common::{fast_config, MotorCall, Rig, ScriptedSource};
use setu_nav::config::SetuConfig;
use setu_nav::{
    ControllerState, Coordinate, NavError, NavigationController, PathPlanner, PlannerConfig,
    Pose, RoutingError, Zone, ZoneMap,
};

fn c(x: f64, y: f64) -> Coordinate {
    Coordinate::new(x, y)
}

fn controller(config: &SetuConfig, rig: &Rig) -> NavigationController {
    let planner = PathPlanner::new(
        ZoneMap::new(&config.zones, config.board.tile),
        PlannerConfig {
            max_expansions: config.navigation.max_expansions,
            max_path_len: config.navigation.max_path_len,
        },
    );
    NavigationController::new(
        rig.navigation.clone(),
        rig.localisation.clone(),
        planner,
        config.navigation.clone(),
        config.board.team,
    )
}

fn quiet_rig(config: &SetuConfig) -> Rig {
    Rig::new(
        config,
        ScriptedSource::pulses(45.0, 8.0, 15, 3),
        ScriptedSource::flat(200.0),
    )
}

#[test]
fn test_requires_localisation() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(60.0, 60.0));

    assert!(matches!(
        controller.run_navigation_task(true),
        Err(NavError::NotLocalised)
    ));
}

#[test]
fn test_drives_expanded_legs_across_bridge() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));

    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(60.0, 210.0));
    assert_eq!(controller.map_point(&c(60.0, 210.0)), Zone::LandB);
    assert_eq!(controller.home_zone(), Zone::LandA);

    controller.run_navigation_task(true).unwrap();

    assert!(controller.waypoints().is_empty());
    assert_eq!(controller.state(), ControllerState::Ready);
    // (30,30) -> (105,30) -> (105,210) -> (60,210); the first point is where we stand
    assert_eq!(rig.right.non_blocking_rotations(), 3);
}

#[test]
fn test_routing_failure_is_reported() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));

    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(30.0, 120.0));

    match controller.run_navigation_task(true) {
        Err(NavError::Routing(RoutingError::WaypointUnreachable(p))) => {
            assert_eq!(p, c(30.0, 120.0))
        }
        other => panic!("expected a routing failure, got {:?}", other),
    }
    assert_eq!(rig.right.non_blocking_rotations(), 0);
}

#[test]
fn test_relocalises_after_distance() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));

    // Pile up more than four tiles of travel, then put the robot back
    let wheel = 180.0 * 130.0 / (std::f64::consts::PI * config.robot.wheel_radius);
    rig.odometer.integrate(wheel, wheel);
    rig.odometer.set_pose(Pose::new(30.0, 30.0, 0.0));
    rig.left.hold_moving(3);

    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(150.0, 60.0));
    controller.run_navigation_task(true).unwrap();

    // The line-square sweep spun once and reset the distance counter
    assert_eq!(rig.left.count(&MotorCall::Backward), 1);
    assert!(rig.odometer.distance_since_fix() < 1e-9);
    assert!(controller.waypoints().is_empty());
}

#[test]
fn test_waits_out_avoidance() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));
    rig.left.hold_moving(usize::MAX);

    let navigation = rig.navigation.clone();
    let odometer = rig.odometer.clone();
    let avoider = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        let heading = navigation.cancel_travel().unwrap();
        thread::sleep(Duration::from_millis(30));
        odometer.set_theta(heading + 180.0);
    });

    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(150.0, 30.0));
    controller.run_navigation_task(true).unwrap();
    avoider.join().unwrap();

    assert!(controller.waypoints().is_empty());
    assert_eq!(rig.navigation.take_interrupted_heading(), None);
}

#[test]
fn test_cancel_at_arrival_poll_keeps_goal() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));

    // The leg is cancelled just as the wheels are polled, and the avoider
    // has already turned the robot around
    let navigation = rig.navigation.clone();
    let odometer = rig.odometer.clone();
    rig.left.on_next_rest(move || {
        let heading = navigation.cancel_travel().unwrap();
        odometer.set_theta(heading + 180.0);
    });

    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(150.0, 30.0));
    controller.run_navigation_task(false).unwrap();

    // The goal was driven again after avoidance instead of counted as reached
    assert_eq!(rig.right.non_blocking_rotations(), 2);
    assert!(controller.waypoints().is_empty());
    assert_eq!(rig.navigation.take_interrupted_heading(), None);
}

#[test]
fn test_skips_relocalisation_on_river_intersection() {
    let config = fast_config();
    let rig = quiet_rig(&config);
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));

    let wheel = 180.0 * 130.0 / (std::f64::consts::PI * config.robot.wheel_radius);
    rig.odometer.integrate(wheel, wheel);
    // Nearest intersection (30,120) is in the river
    rig.odometer.set_pose(Pose::new(30.0, 118.0, 0.0));
    let travelled = rig.odometer.distance_since_fix();
    rig.left.hold_moving(3);

    let mut controller = controller(&config, &rig);
    assert_eq!(controller.closest_intersection(), c(30.0, 120.0));
    assert_eq!(controller.map_point(&c(30.0, 120.0)), Zone::River);
    controller.add_waypoint(c(30.0, 60.0));
    controller.run_navigation_task(false).unwrap();

    assert_eq!(rig.left.count(&MotorCall::Backward), 0);
    assert!(controller.waypoints().is_empty());
    assert_relative_eq!(rig.odometer.distance_since_fix(), travelled);
    assert!(travelled > 4.0 * config.board.tile);
}

#[test]
fn test_relocalisation_retries_missed_line() {
    let mut config = fast_config();
    config.localisation.event_timeout_ms = 150;
    config.localisation.max_attempts = 2;
    // Color sensor never sees a line
    let rig = Rig::new(&config, ScriptedSource::flat(45.0), ScriptedSource::flat(200.0));
    rig.localisation.assume_localised(Pose::new(30.0, 30.0, 0.0));

    let wheel = 180.0 * 130.0 / (std::f64::consts::PI * config.robot.wheel_radius);
    rig.odometer.integrate(wheel, wheel);
    rig.odometer.set_pose(Pose::new(30.0, 30.0, 0.0));
    rig.left.hold_moving(3);

    let mut controller = controller(&config, &rig);
    controller.add_waypoint(c(150.0, 60.0));
    match controller.run_navigation_task(false) {
        Err(NavError::MissedDetection { received, expected, .. }) => {
            assert_eq!((received, expected), (0, 4))
        }
        other => panic!("expected a missed detection, got {:?}", other),
    }
    // One spin per attempt
    assert_eq!(rig.left.count(&MotorCall::Backward), 2);
}
