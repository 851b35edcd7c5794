//! Routing configuration
//!
//! Tunables for route search and capacity accounting, with presets for
//! common deployments. Everything here is plain data and deserializes with
//! missing fields filled from [`CgrConfig::default`].

use cgr_core::RegionNbr;
use serde::{Deserialize, Serialize};

/// Speed of light in miles per second
const LIGHT_MILES_PER_SEC: u64 = 186_282;

/// Speed of light in miles per hour, rounded down
const LIGHT_MPH: u64 = LIGHT_MILES_PER_SEC * 3600;

/// Contact graph routing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CgrConfig {
    /// Region whose contacts route search walks
    pub home_region: RegionNbr,
    /// Fastest relative node motion, used to pad one-way light time
    pub max_speed_mph: u64,
    /// Minimum relative gain in delivery confidence to justify another copy
    pub min_confidence_improvement: f32,
    /// Estimated primary block size in bytes
    pub nominal_primary_block_size: u64,
    /// Floor on per-bundle convergence layer overhead in bytes
    pub typical_stack_overhead: u64,
    /// Reserve part of the standard backlog for bulk traffic
    pub bandwidth_reserved: bool,
    /// Upper bound on alternate routes kept per destination
    pub max_selected_routes: usize,
}

impl Default for CgrConfig {
    fn default() -> Self {
        Self {
            home_region: RegionNbr::HOME,
            max_speed_mph: 450_000,
            min_confidence_improvement: 0.05,
            nominal_primary_block_size: 29,
            typical_stack_overhead: 36,
            bandwidth_reserved: false,
            max_selected_routes: 100,
        }
    }
}

impl CgrConfig {
    /// Config for interplanetary links
    ///
    /// Keeps more alternates, since each contact is scarce and long.
    pub fn deep_space() -> Self {
        Self {
            max_selected_routes: 250,
            ..Self::default()
        }
    }

    /// Config for low orbit and terrestrial links
    ///
    /// Relative motion is slow, so light-time padding is small.
    pub fn near_earth() -> Self {
        Self {
            max_speed_mph: 36_000,
            max_selected_routes: 50,
            ..Self::default()
        }
    }

    pub fn with_home_region(mut self, region: RegionNbr) -> Self {
        self.home_region = region;
        self
    }

    pub fn with_max_speed_mph(mut self, mph: u64) -> Self {
        self.max_speed_mph = mph;
        self
    }

    pub fn with_bandwidth_reserved(mut self, reserved: bool) -> Self {
        self.bandwidth_reserved = reserved;
        self
    }

    pub fn with_max_selected_routes(mut self, routes: usize) -> Self {
        self.max_selected_routes = routes;
        self
    }

    /// Extra seconds added to a one-way light time for node motion
    pub fn owlt_margin(&self, owlt: u32) -> i64 {
        let margin = (self.max_speed_mph / 3600).saturating_mul(u64::from(owlt)) / LIGHT_MILES_PER_SEC;
        i64::try_from(margin).unwrap_or(i64::MAX)
    }

    /// Validate the configuration
    ///
    /// Returns a list of warnings for potentially problematic settings.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.home_region == RegionNbr(0) {
            warnings.push(ConfigWarning::UnnumberedRegion);
        }

        if self.max_speed_mph >= LIGHT_MPH {
            warnings.push(ConfigWarning::SpeedExceedsLight);
        }

        if !(0.0..=1.0).contains(&self.min_confidence_improvement) {
            warnings.push(ConfigWarning::ConfidenceImprovementOutOfRange);
        }

        if self.typical_stack_overhead == 0 {
            warnings.push(ConfigWarning::ZeroStackOverhead);
        }

        if self.max_selected_routes == 0 {
            warnings.push(ConfigWarning::NoAlternateRoutes);
        }

        warnings
    }

    /// Check if the configuration is valid (no warnings)
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

/// Configuration warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Home region is zero
    UnnumberedRegion,
    /// Maximum speed is at or above light speed
    SpeedExceedsLight,
    /// Confidence improvement threshold outside [0, 1]
    ConfidenceImprovementOutOfRange,
    /// Stack overhead floor is zero
    ZeroStackOverhead,
    /// No route may ever be selected
    NoAlternateRoutes,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::UnnumberedRegion => write!(f, "home_region is 0"),
            ConfigWarning::SpeedExceedsLight => {
                write!(f, "max_speed_mph is at or above the speed of light")
            }
            ConfigWarning::ConfidenceImprovementOutOfRange => {
                write!(f, "min_confidence_improvement is outside [0, 1]")
            }
            ConfigWarning::ZeroStackOverhead => write!(f, "typical_stack_overhead is 0"),
            ConfigWarning::NoAlternateRoutes => write!(f, "max_selected_routes is 0"),
        }
    }
}
