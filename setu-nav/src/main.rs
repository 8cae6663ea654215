//! SetuNav - simulated mission runner
//!
//! Wires the navigation core to the ChakraIO mock robot, localises from the
//! configured starting corner, drives the mission waypoints and reports the
//! estimated pose against ground truth.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chakra_io::devices::mock::MockRobot;
use chakra_io::Motor;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use setu_nav::{
    Localisation, Navigation, NavigationController, Odometer, PathPlanner, PlannerConfig,
    Result, SetuConfig, ZoneMap,
};

/// Parse config path from command line arguments.
///
/// Supports:
/// - `setu-nav <path>` (positional)
/// - `setu-nav --config <path>` / `setu-nav -c <path>`
///
/// Falls back to `setu.toml` in the working directory when it exists.
fn parse_config_path() -> Option<PathBuf> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(PathBuf::from(&args[i + 1]));
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(PathBuf::from(&args[1]));
    }

    let local = Path::new("setu.toml");
    local.exists().then(|| local.to_path_buf())
}

fn main() -> Result<()> {
    let filter = match "setu_nav=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("SetuNav v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match parse_config_path() {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            SetuConfig::load(&path)?
        }
        None => {
            info!("Using default configuration");
            SetuConfig::default()
        }
    };

    // The simulated board is the configured board
    config.simulation.tile = config.board.tile;
    config.simulation.board_size = config.board.size;
    let tile = config.board.tile;

    let mut robot = MockRobot::new(config.simulation.clone());
    robot.start()?;

    let left: Arc<dyn Motor> = Arc::new(robot.left_motor());
    let right: Arc<dyn Motor> = Arc::new(robot.right_motor());

    let odometer = Arc::new(Odometer::new(
        Arc::clone(&left),
        Arc::clone(&right),
        config.robot.wheel_radius,
        config.robot.track,
        Duration::from_millis(config.odometer.period_ms),
    ));
    odometer.start()?;

    let navigation = Arc::new(Navigation::new(
        Arc::clone(&odometer),
        left,
        right,
        config.robot.clone(),
    ));
    let localisation = Arc::new(Localisation::from_sources(
        Arc::clone(&navigation),
        Box::new(robot.color_sensor()),
        Box::new(robot.ultrasonic_sensor()),
        &config,
    ));

    let outcome = run_mission(&config, tile, &navigation, &localisation);
    report(&odometer, &robot);

    if let Err(e) = navigation.stop() {
        warn!("Failed to stop wheels: {}", e);
    }
    odometer.stop();
    robot.shutdown();

    info!("SetuNav finished");
    outcome
}

fn run_mission(
    config: &SetuConfig,
    tile: f64,
    navigation: &Arc<Navigation>,
    localisation: &Arc<Localisation>,
) -> Result<()> {
    localisation.run_initial_localisation()?;

    let planner = PathPlanner::new(
        ZoneMap::new(&config.zones, tile),
        PlannerConfig {
            max_expansions: config.navigation.max_expansions,
            max_path_len: config.navigation.max_path_len,
        },
    );
    let mut controller = NavigationController::new(
        Arc::clone(navigation),
        Arc::clone(localisation),
        planner,
        config.navigation.clone(),
        config.board.team,
    );

    for waypoint in &config.mission.waypoints {
        let goal = waypoint.scaled(tile);
        info!("Waypoint {} is in {:?}", goal, controller.map_point(&goal));
        controller.add_waypoint(goal);
    }

    controller.run_navigation_task(config.mission.rectangular)
}

fn report(odometer: &Odometer, robot: &MockRobot) {
    let estimate = odometer.pose();
    let truth = robot.true_pose();
    info!(
        "Estimated ({:.1}, {:.1}, {:.1}°), true ({:.1}, {:.1}, {:.1}°)",
        estimate.x, estimate.y, estimate.theta, truth.x, truth.y, truth.theta_deg
    );
    info!(
        "Position error {:.2} cm",
        (estimate.x - truth.x).hypot(estimate.y - truth.y)
    );
}
