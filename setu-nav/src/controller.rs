//! Waypoint queue and travel loop
//!
//! The controller owns the mission's goal queue. It expands goals into
//! axis-aligned legs, drives them one at a time, relocalises on the nearest
//! intersection once enough distance has built up since the last fix, and
//! waits out obstacle avoidance before re-planning.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::{NavigationConfig, Team};
use crate::error::{NavError, Result};
use crate::geometry::Coordinate;
use crate::localisation::{Localisation, LocalisationState};
use crate::navigation::Navigation;
use crate::planning::{closest_intersection, PathPlanner, Zone};
use crate::utils::normalize_degrees;

/// Travel loop state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerState {
    /// No leg in flight
    Ready,
    /// Driving toward the head of the queue
    Navigating,
    /// A leg was cancelled at this heading; an avoider has the wheels
    Avoiding { interrupted: f64 },
}

pub struct NavigationController {
    navigation: Arc<Navigation>,
    localisation: Arc<Localisation>,
    planner: PathPlanner,
    config: NavigationConfig,
    team: Team,
    waypoints: VecDeque<Coordinate>,
    state: ControllerState,
}

impl NavigationController {
    pub fn new(
        navigation: Arc<Navigation>,
        localisation: Arc<Localisation>,
        planner: PathPlanner,
        config: NavigationConfig,
        team: Team,
    ) -> Self {
        Self {
            navigation,
            localisation,
            planner,
            config,
            team,
            waypoints: VecDeque::new(),
            state: ControllerState::Ready,
        }
    }

    pub fn localisation(&self) -> &Arc<Localisation> {
        &self.localisation
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Goals still to visit, head first
    pub fn waypoints(&self) -> &VecDeque<Coordinate> {
        &self.waypoints
    }

    /// Queue a goal in centimetres
    pub fn add_waypoint(&mut self, coordinate: Coordinate) {
        tracing::debug!("Waypoint {} queued", coordinate);
        self.waypoints.push_back(coordinate);
    }

    pub fn map_point(&self, coordinate: &Coordinate) -> Zone {
        self.planner.zones().map_point(coordinate)
    }

    /// Our team's land zone
    pub fn home_zone(&self) -> Zone {
        Zone::home(self.team)
    }

    /// Grid intersection nearest the current pose
    pub fn closest_intersection(&self) -> Coordinate {
        let pose = self.navigation.odometer().pose();
        closest_intersection(&pose.position(), self.planner.zones().tile())
    }

    /// Drive every queued goal
    ///
    /// With `rectangular` the queue is first expanded into axis-aligned legs
    /// and re-expanded after every relocalisation or avoidance. Returns once
    /// the queue is empty.
    pub fn run_navigation_task(&mut self, rectangular: bool) -> Result<()> {
        if self.localisation.state() != LocalisationState::FullyLocalised {
            return Err(NavError::NotLocalised);
        }
        if rectangular {
            self.replan()?;
        }

        let tile = self.planner.zones().tile();
        let relocalise_after = tile * self.config.relocalisation_tiles;
        let poll = Duration::from_millis(self.config.poll_interval_ms);
        let [resume_low, resume_high] = self.config.avoid_resume_window;

        self.state = ControllerState::Ready;
        tracing::info!("Navigation task started with {} points", self.waypoints.len());

        loop {
            if let Some(interrupted) = self.navigation.take_interrupted_heading() {
                tracing::info!("Leg interrupted at {:.1}°, avoiding", interrupted);
                self.state = ControllerState::Avoiding { interrupted };
            }

            match self.state {
                ControllerState::Ready => {
                    let Some(next) = self.waypoints.front().copied() else {
                        break;
                    };
                    tracing::info!("Travelling to {}", next);
                    self.navigation.travel_to(next.x, next.y, false)?;
                    self.state = ControllerState::Navigating;
                }
                ControllerState::Navigating => {
                    if !self.navigation.is_moving()? {
                        // A cancel can land between the check above and this poll
                        if let Some(interrupted) = self.navigation.take_interrupted_heading() {
                            tracing::info!("Leg interrupted at {:.1}°, avoiding", interrupted);
                            self.state = ControllerState::Avoiding { interrupted };
                            continue;
                        }
                        if let Some(reached) = self.waypoints.pop_front() {
                            tracing::debug!("Reached {}", reached);
                        }
                        self.state = ControllerState::Ready;
                        continue;
                    }
                    let travelled = self.navigation.odometer().distance_since_fix();
                    if travelled > relocalise_after {
                        self.relocalise(rectangular)?;
                    }
                }
                ControllerState::Avoiding { interrupted } => {
                    let turned =
                        normalize_degrees(self.navigation.odometer().theta() - interrupted);
                    if turned >= resume_low && turned <= resume_high {
                        tracing::info!("Avoidance done after turning {:.1}°, re-planning", turned);
                        if rectangular {
                            self.replan()?;
                        }
                        self.state = ControllerState::Ready;
                        continue;
                    }
                }
            }

            thread::sleep(poll);
        }

        tracing::info!("Navigation task complete");
        Ok(())
    }

    /// Fix the pose on the nearest intersection, if it is reachable
    fn relocalise(&mut self, rectangular: bool) -> Result<()> {
        let target = self.closest_intersection();
        if !self.planner.zones().is_passable(&target) {
            tracing::debug!("Skipping relocalisation at {}: not passable", target);
            return Ok(());
        }

        tracing::info!(
            "Relocalising at {} after {:.1} cm",
            target,
            self.navigation.odometer().distance_since_fix()
        );
        self.navigation.stop()?;
        self.navigation.travel_to(target.x, target.y, true)?;
        self.localisation.fix_position_with_retries()?;

        if rectangular {
            self.replan()?;
        }
        self.state = ControllerState::Ready;
        Ok(())
    }

    /// Re-expand the remaining goals from the current pose
    fn replan(&mut self) -> Result<()> {
        if self.waypoints.is_empty() {
            return Ok(());
        }

        let position = self.navigation.odometer().pose().position();
        let goals: Vec<Coordinate> = self.waypoints.iter().copied().collect();
        match self.planner.expand(&position, &goals) {
            Ok(path) => {
                tracing::debug!(
                    "Route from {}: {}",
                    position,
                    path.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" -> ")
                );
                self.waypoints = path.into();
                Ok(())
            }
            Err(e) => {
                tracing::error!("Routing failed from {}: {}", position, e);
                Err(e.into())
            }
        }
    }
}
