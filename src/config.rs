//! Fracture configuration types
//!
//! Every configuration is a plain value passed into the engine. Nothing is
//! merged or patched on the way in: each operation calls `validate()` and
//! rejects the whole call when a field is out of range.

use glam::{IVec3, Quat, Vec2, Vec3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{FractureError, Result};

/// Perturbation applied to newly created cut surfaces
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseConfig {
    /// Maximum displacement along the cut normal, 0 disables noise
    pub amplitude: f32,
    /// Spatial frequency of the base octave
    pub frequency: f32,
    /// Number of fBm octaves
    pub octave_number: u32,
    /// Subdivision levels of the cut surface before displacement (at most 4 are used)
    pub surface_resolution: u32,
}

impl NoiseConfig {
    /// Subdivision levels actually applied
    pub const MAX_RESOLUTION: u32 = 4;

    /// Whether the noise displaces anything
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.amplitude > 0.0
    }

    /// Check field ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a negative or non-finite amplitude, a
    /// non-positive frequency, or zero octaves.
    pub fn validate(&self) -> Result<()> {
        if !self.amplitude.is_finite() || self.amplitude < 0.0 {
            return Err(FractureError::InvalidConfig(format!(
                "noise amplitude must be finite and >= 0 (got {})",
                self.amplitude
            )));
        }
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(FractureError::InvalidConfig(format!(
                "noise frequency must be positive (got {})",
                self.frequency
            )));
        }
        if self.octave_number == 0 {
            return Err(FractureError::InvalidConfig(
                "noise needs at least one octave".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            amplitude: 0.0,
            frequency: 1.0,
            octave_number: 1,
            surface_resolution: 1,
        }
    }
}

/// Grid slicing parameters
///
/// `slices` is the number of pieces along each axis: an axis with `n` pieces
/// is cut by `n - 1` evenly spaced planes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicingConfig {
    /// Pieces per axis, each at least 1
    pub slices: IVec3,
    /// Plane offset jitter as a fraction of the plane spacing, in `[0, 1]`
    pub offset_variations: f32,
    /// Plane tilt as a fraction of 45 degrees, in `[0, 1]`
    pub angle_variations: f32,
    /// Surface noise for every slicing plane
    pub noise: NoiseConfig,
}

impl SlicingConfig {
    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if self.slices.min_element() < 1 {
            return Err(FractureError::InvalidConfig(format!(
                "slice counts must be >= 1 on every axis (got {})",
                self.slices
            )));
        }
        check_fraction("offset_variations", self.offset_variations)?;
        check_fraction("angle_variations", self.angle_variations)?;
        self.noise.validate()
    }

    /// Number of cutting planes the grid produces
    pub fn plane_count(&self) -> usize {
        (self.slices - IVec3::ONE).max(IVec3::ZERO).to_array().iter().sum::<i32>() as usize
    }
}

impl Default for SlicingConfig {
    fn default() -> Self {
        Self {
            slices: IVec3::ONE,
            offset_variations: 0.0,
            angle_variations: 0.0,
            noise: NoiseConfig::default(),
        }
    }
}

fn check_fraction(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(FractureError::InvalidConfig(format!(
            "{} must be in [0, 1] (got {})",
            name, value
        )));
    }
    Ok(())
}

/// Builder for [`SlicingConfig`] with validation
///
/// # Example
///
/// ```rust
/// use rust_voronoi_fracture::*;
///
/// let config = SlicingConfigBuilder::new()
///     .slices(2, 2, 2)
///     .unwrap()
///     .offset_variations(0.1)
///     .unwrap()
///     .build()
///     .unwrap();
/// assert_eq!(config.plane_count(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SlicingConfigBuilder {
    config: SlicingConfig,
}

impl SlicingConfigBuilder {
    /// Start from the defaults (one piece per axis, no variation, no noise)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pieces per axis
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if any count is below 1.
    pub fn slices(mut self, x: i32, y: i32, z: i32) -> Result<Self> {
        if x < 1 || y < 1 || z < 1 {
            return Err(FractureError::InvalidConfig(format!(
                "slice counts must be >= 1 (got {}, {}, {})",
                x, y, z
            )));
        }
        self.config.slices = IVec3::new(x, y, z);
        Ok(self)
    }

    /// Set the offset jitter fraction
    pub fn offset_variations(mut self, fraction: f32) -> Result<Self> {
        check_fraction("offset_variations", fraction)?;
        self.config.offset_variations = fraction;
        Ok(self)
    }

    /// Set the tilt fraction
    pub fn angle_variations(mut self, fraction: f32) -> Result<Self> {
        check_fraction("angle_variations", fraction)?;
        self.config.angle_variations = fraction;
        Ok(self)
    }

    /// Set the surface noise
    pub fn noise(mut self, noise: NoiseConfig) -> Result<Self> {
        noise.validate()?;
        self.config.noise = noise;
        Ok(self)
    }

    /// Build the configuration
    pub fn build(self) -> Result<SlicingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Orientation and position
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform {
    /// Rotation applied to the pattern plane
    pub rotation: Quat,
    /// Translation of the pattern origin
    pub translation: Vec3,
}

impl RigidTransform {
    /// No rotation, no translation
    pub const IDENTITY: RigidTransform = RigidTransform {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    /// Check that every component is finite and the rotation can be normalized
    pub fn is_finite(&self) -> bool {
        self.rotation.is_finite() && self.translation.is_finite() && self.rotation.length_squared() > 1e-12
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Set of 2D loops projected onto a chunk by a cutout
///
/// Each loop must be a simple polygon; non-convex loops are split into convex
/// parts when cut. Loops may be given in either winding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CutoutSet {
    /// Closed polygons in pattern space (first point is not repeated)
    pub loops: Vec<Vec<Vec2>>,
}

impl CutoutSet {
    /// Create an empty pattern
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern from loops
    pub fn from_loops(loops: Vec<Vec<Vec2>>) -> Self {
        Self { loops }
    }

    /// Add one loop
    pub fn add_loop(&mut self, points: Vec<Vec2>) {
        self.loops.push(points);
    }

    /// Axis-aligned rectangle centered at `center`
    pub fn rectangle(center: Vec2, half_size: Vec2) -> Vec<Vec2> {
        vec![
            center + Vec2::new(-half_size.x, -half_size.y),
            center + Vec2::new(half_size.x, -half_size.y),
            center + Vec2::new(half_size.x, half_size.y),
            center + Vec2::new(-half_size.x, half_size.y),
        ]
    }

    /// Number of loops
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Check if there are no loops
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }
}

/// Twice the signed area of a 2D loop, positive for counter-clockwise
pub(crate) fn signed_area_2d(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n).map(|i| points[i].perp_dot(points[(i + 1) % n])).sum()
}

/// Check that all turns of a loop go the same way
pub(crate) fn is_convex_loop(points: &[Vec2]) -> bool {
    let n = points.len();
    let area = signed_area_2d(points);
    let scale = points.iter().fold(0.0f32, |acc, p| acc.max(p.abs().max_element())).max(1.0);
    let tolerance = 1e-6 * scale * scale;
    (0..n).all(|i| {
        let (a, b, c) = (points[i], points[(i + 1) % n], points[(i + 2) % n]);
        (b - a).perp_dot(c - b) * area.signum() >= -tolerance
    })
}

/// Check that no two non-adjacent edges of a loop touch
fn is_simple_loop(points: &[Vec2]) -> bool {
    let n = points.len();
    let orient = |a: Vec2, b: Vec2, c: Vec2| (b - a).perp_dot(c - a);
    let on_segment = |a: Vec2, b: Vec2, p: Vec2| p.cmpge(a.min(b)).all() && p.cmple(a.max(b)).all();
    let touches = |a: Vec2, b: Vec2, c: Vec2, d: Vec2| {
        let (d1, d2) = (orient(c, d, a), orient(c, d, b));
        let (d3, d4) = (orient(a, b, c), orient(a, b, d));
        if d1 * d2 < 0.0 && d3 * d4 < 0.0 {
            return true;
        }
        (d1 == 0.0 && on_segment(c, d, a))
            || (d2 == 0.0 && on_segment(c, d, b))
            || (d3 == 0.0 && on_segment(a, b, c))
            || (d4 == 0.0 && on_segment(a, b, d))
    };

    for i in 0..n {
        for j in i + 2..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a, b) = (points[i], points[(i + 1) % n]);
            let (c, d) = (points[j], points[(j + 1) % n]);
            if touches(a, b, c, d) {
                return false;
            }
        }
    }
    true
}

/// Result of a cutout configuration check
///
/// [`code`](CutoutDiagnostic::code) maps each case to the numeric diagnostic
/// reported by [`AuthoringSession::debug_check_cutout_config`](crate::AuthoringSession::debug_check_cutout_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoutDiagnostic {
    /// Configuration is usable
    Ok,
    /// No loops in the pattern
    EmptyPattern,
    /// A loop has fewer than three points, a non-finite point, no area, or
    /// crosses itself
    DegenerateLoop {
        /// Index of the loop
        loop_index: usize,
    },
    /// A loop turns both ways while the aperture is not zero
    NonConvexAperture {
        /// Index of the loop
        loop_index: usize,
    },
    /// Rotation or translation has NaN or infinite components
    NonFiniteTransform,
    /// Aperture outside `[0, 180)` degrees
    ApertureOutOfRange,
    /// Scale is zero on one axis or not finite
    InvalidScale,
    /// Embedded noise configuration failed validation
    InvalidNoise,
}

impl CutoutDiagnostic {
    /// Numeric diagnostic code, 0 when the configuration is usable
    pub fn code(&self) -> i32 {
        match self {
            CutoutDiagnostic::Ok => 0,
            CutoutDiagnostic::EmptyPattern => 1,
            CutoutDiagnostic::DegenerateLoop { .. } => 2,
            CutoutDiagnostic::NonConvexAperture { .. } => 3,
            CutoutDiagnostic::NonFiniteTransform => 4,
            CutoutDiagnostic::ApertureOutOfRange => 5,
            CutoutDiagnostic::InvalidScale => 6,
            CutoutDiagnostic::InvalidNoise => 7,
        }
    }

    /// Whether the configuration passed
    pub fn is_ok(&self) -> bool {
        matches!(self, CutoutDiagnostic::Ok)
    }
}

/// Cutout parameters
///
/// The pattern lies in the XY plane of `transform` and is extruded along the
/// transform's +Z axis. Pattern coordinates are multiplied by `scale`; a
/// negative scale fits the pattern to the chunk and centers it there.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CutoutConfig {
    /// Loops to cut out
    pub pattern: CutoutSet,
    /// Placement of the pattern plane
    pub transform: RigidTransform,
    /// Pattern scale per axis, negative for auto-fit
    pub scale: Vec2,
    /// Conic aperture in degrees, 0 for a straight prism; non-convex loops need 0
    pub aperture: f32,
    /// Treat the translation as an offset from the chunk center
    pub is_relative_transform: bool,
    /// Give noisy cut faces smooth shared normals
    pub use_smoothing: bool,
    /// Surface noise for the cut faces
    pub noise: NoiseConfig,
}

impl CutoutConfig {
    /// Create a configuration with default placement for a pattern
    pub fn with_pattern(pattern: CutoutSet) -> Self {
        Self {
            pattern,
            ..Self::default()
        }
    }

    /// Report the first problem found, or `Ok`
    pub fn diagnose(&self) -> CutoutDiagnostic {
        if self.pattern.is_empty() {
            return CutoutDiagnostic::EmptyPattern;
        }
        for (loop_index, points) in self.pattern.loops.iter().enumerate() {
            if points.len() < 3
                || points.iter().any(|p| !p.is_finite())
                || signed_area_2d(points).abs() <= f32::EPSILON
                || !is_simple_loop(points)
            {
                return CutoutDiagnostic::DegenerateLoop { loop_index };
            }
            if self.aperture != 0.0 && !is_convex_loop(points) {
                return CutoutDiagnostic::NonConvexAperture { loop_index };
            }
        }
        if !self.transform.is_finite() {
            return CutoutDiagnostic::NonFiniteTransform;
        }
        if !(0.0..180.0).contains(&self.aperture) {
            return CutoutDiagnostic::ApertureOutOfRange;
        }
        if !self.scale.is_finite() || self.scale.x == 0.0 || self.scale.y == 0.0 {
            return CutoutDiagnostic::InvalidScale;
        }
        if self.noise.validate().is_err() {
            return CutoutDiagnostic::InvalidNoise;
        }
        CutoutDiagnostic::Ok
    }

    /// Check the configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first failed check.
    pub fn validate(&self) -> Result<()> {
        match self.diagnose() {
            CutoutDiagnostic::Ok => Ok(()),
            CutoutDiagnostic::InvalidNoise => self.noise.validate(),
            other => Err(FractureError::InvalidConfig(format!(
                "cutout configuration rejected: {:?} (code {})",
                other,
                other.code()
            ))),
        }
    }
}

impl Default for CutoutConfig {
    fn default() -> Self {
        Self {
            pattern: CutoutSet::default(),
            transform: RigidTransform::IDENTITY,
            scale: Vec2::new(-1.0, -1.0),
            aperture: 0.0,
            is_relative_transform: true,
            use_smoothing: false,
            noise: NoiseConfig::default(),
        }
    }
}

/// One concentric zone of a blast pattern
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlastZone {
    /// Number of sites in the zone
    pub sites: u32,
    /// Outer radius of the zone
    pub radius: f32,
    /// Density falloff: 0 is uniform in volume, positive concentrates sites
    /// toward the blast point
    pub bias: f32,
}

/// Radial sub-pattern of a blast
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RadialPatternConfig {
    /// Outer ring radius
    pub radius: f32,
    /// Number of rings
    pub radial_steps: u32,
    /// Sites per ring
    pub angular_steps: u32,
    /// Angle added per ring, in radians
    pub angle_offset: f32,
    /// Distance the pattern is pushed along the blast normal
    pub normal_offset: f32,
    /// Jitter as a fraction of the local spacing, in `[0, 1]`
    pub variability: f32,
}

/// Damage pattern around an impact point
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlastConfig {
    /// Impact point
    pub point: Vec3,
    /// Impact surface normal
    pub normal: Vec3,
    /// Densest zone around the point
    pub inner: BlastZone,
    /// Shell between the inner radius and this zone's radius
    pub transition: BlastZone,
    /// Sites scattered through the rest of the mesh
    pub outer_sites: u32,
    /// Rings of sites in the impact plane
    pub radial: RadialPatternConfig,
}

impl BlastConfig {
    /// Check field ranges
    pub fn validate(&self) -> Result<()> {
        if !self.point.is_finite() {
            return Err(FractureError::InvalidConfig("blast point is not finite".to_string()));
        }
        if self.normal.try_normalize().is_none() {
            return Err(FractureError::InvalidConfig(format!(
                "blast normal must be non-zero (got {})",
                self.normal
            )));
        }
        for (name, zone) in [("inner", &self.inner), ("transition", &self.transition)] {
            if !zone.radius.is_finite() || zone.radius < 0.0 {
                return Err(FractureError::InvalidConfig(format!(
                    "{} radius must be >= 0 (got {})",
                    name, zone.radius
                )));
            }
            if !zone.bias.is_finite() || zone.bias <= -1.0 {
                return Err(FractureError::InvalidConfig(format!(
                    "{} bias must be > -1 (got {})",
                    name, zone.bias
                )));
            }
        }
        if self.transition.sites > 0 && self.transition.radius < self.inner.radius {
            return Err(FractureError::InvalidConfig(format!(
                "transition radius {} is smaller than inner radius {}",
                self.transition.radius, self.inner.radius
            )));
        }
        if !self.radial.radius.is_finite() || self.radial.radius < 0.0 {
            return Err(FractureError::InvalidConfig(format!(
                "radial radius must be >= 0 (got {})",
                self.radial.radius
            )));
        }
        check_fraction("radial variability", self.radial.variability)
    }
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            normal: Vec3::Y,
            inner: BlastZone::default(),
            transition: BlastZone::default(),
            outer_sites: 0,
            radial: RadialPatternConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_defaults() {
        let noise = NoiseConfig::default();
        assert_eq!(noise.amplitude, 0.0);
        assert_eq!(noise.frequency, 1.0);
        assert_eq!(noise.octave_number, 1);
        assert_eq!(noise.surface_resolution, 1);
        assert!(!noise.is_enabled());
        assert!(noise.validate().is_ok());
    }

    #[test]
    fn test_noise_rejects_bad_values() {
        let bad = NoiseConfig {
            frequency: 0.0,
            ..NoiseConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = NoiseConfig {
            amplitude: f32::NAN,
            ..NoiseConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_slicing_builder() {
        let config = SlicingConfigBuilder::new()
            .slices(2, 3, 1)
            .unwrap()
            .angle_variations(0.5)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.slices, IVec3::new(2, 3, 1));
        assert_eq!(config.plane_count(), 3);
    }

    #[test]
    fn test_slicing_rejects_zero_slices() {
        assert!(SlicingConfigBuilder::new().slices(0, 1, 1).is_err());
        let config = SlicingConfig {
            slices: IVec3::new(2, 0, 2),
            ..SlicingConfig::default()
        };
        assert!(matches!(config.validate(), Err(FractureError::InvalidConfig(_))));
    }

    #[test]
    fn test_slicing_rejects_variations_out_of_range() {
        assert!(SlicingConfigBuilder::new().offset_variations(1.5).is_err());
        assert!(SlicingConfigBuilder::new().angle_variations(-0.1).is_err());
    }

    #[test]
    fn test_cutout_defaults() {
        let config = CutoutConfig::default();
        assert_eq!(config.scale, Vec2::new(-1.0, -1.0));
        assert_eq!(config.aperture, 0.0);
        assert!(config.is_relative_transform);
        assert!(!config.use_smoothing);
        assert_eq!(config.diagnose(), CutoutDiagnostic::EmptyPattern);
    }

    #[test]
    fn test_cutout_diagnostics() {
        let square = CutoutSet::rectangle(Vec2::ZERO, Vec2::splat(0.25));
        let mut config = CutoutConfig::with_pattern(CutoutSet::from_loops(vec![square.clone()]));
        assert_eq!(config.diagnose().code(), 0);

        config.pattern.loops[0].truncate(2);
        assert_eq!(config.diagnose().code(), 2);

        let arrow = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.2, 0.2),
            Vec2::new(0.0, 1.0),
        ];
        config.pattern = CutoutSet::from_loops(vec![arrow]);
        assert!(config.diagnose().is_ok());
        config.aperture = 15.0;
        assert_eq!(config.diagnose(), CutoutDiagnostic::NonConvexAperture { loop_index: 0 });
        config.aperture = 0.0;

        let bowtie = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        config.pattern = CutoutSet::from_loops(vec![bowtie]);
        assert_eq!(config.diagnose(), CutoutDiagnostic::DegenerateLoop { loop_index: 0 });

        config.pattern = CutoutSet::from_loops(vec![square]);
        config.transform.translation = Vec3::new(f32::NAN, 0.0, 0.0);
        assert_eq!(config.diagnose().code(), 4);

        config.transform = RigidTransform::IDENTITY;
        config.transform.rotation = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert_eq!(config.diagnose(), CutoutDiagnostic::NonFiniteTransform);

        config.transform = RigidTransform::IDENTITY;
        config.aperture = 200.0;
        assert_eq!(config.diagnose().code(), 5);

        config.aperture = 10.0;
        config.scale = Vec2::new(0.0, 1.0);
        assert_eq!(config.diagnose().code(), 6);

        config.scale = Vec2::ONE;
        config.noise.octave_number = 0;
        assert_eq!(config.diagnose().code(), 7);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clockwise_loop_is_convex() {
        let mut square = CutoutSet::rectangle(Vec2::ZERO, Vec2::ONE);
        square.reverse();
        let config = CutoutConfig::with_pattern(CutoutSet::from_loops(vec![square]));
        assert!(config.diagnose().is_ok());
    }

    #[test]
    fn test_blast_validation() {
        let mut config = BlastConfig::default();
        assert!(config.validate().is_ok());
        config.normal = Vec3::ZERO;
        assert!(config.validate().is_err());
        config.normal = Vec3::Y;
        config.inner = BlastZone {
            sites: 4,
            radius: 2.0,
            bias: 0.0,
        };
        config.transition = BlastZone {
            sites: 4,
            radius: 1.0,
            bias: 0.0,
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serialization() {
        let config = SlicingConfigBuilder::new().slices(3, 1, 2).unwrap().build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let restored: SlicingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);

        let cutout = CutoutConfig::with_pattern(CutoutSet::from_loops(vec![CutoutSet::rectangle(
            Vec2::ZERO,
            Vec2::ONE,
        )]));
        let json = serde_json::to_string(&cutout).unwrap();
        let restored: CutoutConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cutout, restored);
    }
}
