//! Static zone classification of board points

use crate::config::{Team, ZoneConfig};
use crate::geometry::{segment_contains, segments_intersect, Coordinate, Rect};

/// What lies under a board point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Green team's land
    LandA,
    /// Red team's land
    LandB,
    Bridge,
    /// Impassable
    River,
}

impl Zone {
    /// A leg may join two zones only if they match or one is the bridge
    pub fn compatible_with(self, other: Zone) -> bool {
        self == other || self == Zone::Bridge || other == Zone::Bridge
    }

    /// Land zone belonging to `team`
    pub fn home(team: Team) -> Zone {
        match team {
            Team::Green => Zone::LandA,
            Team::Red => Zone::LandB,
        }
    }
}

/// Zone rectangles and tower points scaled to centimetres
#[derive(Debug, Clone)]
pub struct ZoneMap {
    tile: f64,
    green: Rect,
    red: Rect,
    bridge_horizontal: Option<Rect>,
    bridge_vertical: Option<Rect>,
    green_tower: Coordinate,
    red_tower: Coordinate,
    zipline_blocks_legs: bool,
}

impl ZoneMap {
    /// Scale a tile-unit layout by `tile` cm
    pub fn new(config: &ZoneConfig, tile: f64) -> Self {
        Self {
            tile,
            green: config.green.scaled(tile),
            red: config.red.scaled(tile),
            bridge_horizontal: config.bridge_horizontal.map(|r| r.scaled(tile)),
            bridge_vertical: config.bridge_vertical.map(|r| r.scaled(tile)),
            green_tower: config.green_tower.scaled(tile),
            red_tower: config.red_tower.scaled(tile),
            zipline_blocks_legs: config.zipline_blocks_legs,
        }
    }

    pub fn tile(&self) -> f64 {
        self.tile
    }

    fn bridges(&self) -> impl Iterator<Item = &Rect> {
        self.bridge_horizontal.iter().chain(self.bridge_vertical.iter())
    }

    /// Classify a point; boundaries of land are river unless a bridge covers them
    pub fn map_point(&self, p: &Coordinate) -> Zone {
        self.map_point_with_margin(p, 0.0)
    }

    /// Classify against every rectangle shrunk by `margin` cm
    pub fn map_point_with_margin(&self, p: &Coordinate, margin: f64) -> Zone {
        let green = self.green.shrunk(margin);
        let red = self.red.shrunk(margin);

        if green.contains_strict(p) {
            return Zone::LandA;
        }
        if red.contains_strict(p) {
            return Zone::LandB;
        }

        let mut bridges = self.bridges().map(|b| b.shrunk(margin));
        if bridges.any(|b| b.contains_strict(p)) {
            return Zone::Bridge;
        }

        if green.on_boundary(p) || red.on_boundary(p) {
            let covered = self
                .bridges()
                .map(|b| b.shrunk(margin))
                .any(|b| b.contains_closed(p) && !b.is_corner(p));
            if covered {
                return Zone::Bridge;
            }
        }

        Zone::River
    }

    /// Point every river crossing passes through
    pub fn bridge_mid(&self) -> Coordinate {
        match (self.bridge_horizontal, self.bridge_vertical) {
            (Some(h), Some(v)) => Coordinate::new(v.center().x, h.center().y),
            (Some(b), None) | (None, Some(b)) => b.center(),
            (None, None) => self.green.center().midpoint(&self.red.center()),
        }
    }

    pub fn towers(&self) -> [Coordinate; 2] {
        [self.green_tower, self.red_tower]
    }

    /// Tower of the given team
    pub fn tower(&self, team: Team) -> Coordinate {
        match team {
            Team::Green => self.green_tower,
            Team::Red => self.red_tower,
        }
    }

    pub fn is_tower(&self, p: &Coordinate) -> bool {
        *p == self.green_tower || *p == self.red_tower
    }

    /// Somewhere the robot may stand
    pub fn is_passable(&self, p: &Coordinate) -> bool {
        !self.is_tower(p) && self.map_point(p) != Zone::River
    }

    /// No tower, zipline span or river on the straight leg `a`–`b`
    pub fn leg_clear(&self, a: &Coordinate, b: &Coordinate) -> bool {
        if self.towers().iter().any(|t| segment_contains(a, b, t)) {
            return false;
        }
        if self.zipline_blocks_legs
            && segments_intersect(a, b, &self.green_tower, &self.red_tower)
        {
            return false;
        }
        self.map_point(&a.midpoint(b)) != Zone::River
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: f64 = 30.0;

    fn c(x: f64, y: f64) -> Coordinate {
        Coordinate::new(x, y)
    }

    fn map() -> ZoneMap {
        ZoneMap::new(&ZoneConfig::default(), TILE)
    }

    #[test]
    fn test_land_and_river() {
        let zones = map();
        assert_eq!(zones.map_point(&c(30.0, 30.0)), Zone::LandA);
        assert_eq!(zones.map_point(&c(30.0, 180.0)), Zone::LandB);
        assert_eq!(zones.map_point(&c(30.0, 120.0)), Zone::River);
        // Land edge outside any bridge
        assert_eq!(zones.map_point(&c(30.0, 90.0)), Zone::River);
        assert_eq!(zones.map_point(&c(0.0, 30.0)), Zone::River);
    }

    #[test]
    fn test_bridge_rules() {
        let zones = map();
        // Default vertical bridge spans x 90..120, y 90..150
        assert_eq!(zones.map_point(&c(105.0, 120.0)), Zone::Bridge);
        // Bank crossing inside the bridge span
        assert_eq!(zones.map_point(&c(105.0, 90.0)), Zone::Bridge);
        // Bridge corner on the bank is not walkable
        assert_eq!(zones.map_point(&c(90.0, 90.0)), Zone::River);
        // Bridge side away from the bank
        assert_eq!(zones.map_point(&c(90.0, 120.0)), Zone::River);
    }

    #[test]
    fn test_map_point_is_pure() {
        let zones = map();
        for x in 0..=16 {
            for y in 0..=16 {
                let p = c(x as f64 * 15.0, y as f64 * 15.0);
                assert_eq!(zones.map_point(&p), zones.map_point(&p));
            }
        }
    }

    #[test]
    fn test_margin_shrinks_zones() {
        let zones = map();
        assert_eq!(zones.map_point(&c(5.0, 30.0)), Zone::LandA);
        assert_eq!(zones.map_point_with_margin(&c(5.0, 30.0), 10.0), Zone::River);
    }

    #[test]
    fn test_bridge_mid() {
        assert_eq!(map().bridge_mid(), c(105.0, 120.0));

        let config = ZoneConfig {
            bridge_horizontal: Some(Rect::new(c(2.0, 3.0), c(6.0, 4.0))),
            bridge_vertical: Some(Rect::new(c(5.0, 4.0), c(6.0, 5.0))),
            ..ZoneConfig::default()
        };
        let zones = ZoneMap::new(&config, TILE);
        assert_eq!(zones.bridge_mid(), c(165.0, 105.0));
    }

    #[test]
    fn test_leg_blocking() {
        let zones = map();
        // Green tower at (210, 30)
        assert!(!zones.leg_clear(&c(180.0, 30.0), &c(240.0, 30.0)));
        assert!(zones.leg_clear(&c(30.0, 30.0), &c(180.0, 30.0)));
        // Zipline runs x = 210 between the towers
        assert!(!zones.leg_clear(&c(180.0, 60.0), &c(225.0, 60.0)));
        // Midpoint in the river
        assert!(!zones.leg_clear(&c(30.0, 60.0), &c(30.0, 180.0)));
    }

    #[test]
    fn test_zone_compatibility() {
        assert!(Zone::LandA.compatible_with(Zone::Bridge));
        assert!(Zone::Bridge.compatible_with(Zone::LandB));
        assert!(!Zone::LandA.compatible_with(Zone::LandB));
        assert_eq!(Zone::home(Team::Red), Zone::LandB);
    }
}
