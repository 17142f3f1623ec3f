//! Distribution library - parametric distributions for tolerance contributors
//!
//! Every distribution can be truncated to a window `[lower, upper]` (either
//! side optional). Truncated densities are renormalized by the probability
//! mass enclosed by the window, and construction fails when that mass is
//! negligible.
//!
//! Sampling always takes an explicit random source so that runs are
//! reproducible from a seed.

use rand::Rng;
use rand_distr::StandardNormal;
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{FRAC_2_PI, PI, SQRT_2};

use crate::core::error::DistributionError;

/// Default minimum mass a truncation window must enclose
pub const DEFAULT_TRUNCATION_EPSILON: f64 = 1e-9;

/// Default cap on rejection rounds for truncated skewed-normal sampling
pub const DEFAULT_MAX_REJECTION_ROUNDS: u32 = 100;

/// Half-width (in scale units) used when integrating skewed-normal densities
const INTEGRATION_SPAN: f64 = 12.0;

/// Simpson intervals for numerical integration
const INTEGRATION_STEPS: usize = 4000;

/// Upper bound on candidates drawn in one rejection round
const MAX_ROUND_CANDIDATES: usize = 1 << 22;

/// Standard normal density φ(z)
pub fn std_normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Standard normal CDF Φ(z)
pub fn std_normal_cdf(z: f64) -> f64 {
    if z == f64::INFINITY {
        return 1.0;
    }
    if z == f64::NEG_INFINITY {
        return 0.0;
    }
    0.5 * erfc(-z / SQRT_2)
}

/// Standard normal quantile Φ⁻¹(p)
pub fn std_normal_quantile(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// z·φ(z), taken as 0 at ±∞
fn z_pdf(z: f64) -> f64 {
    if z.is_infinite() {
        0.0
    } else {
        z * std_normal_pdf(z)
    }
}

/// Composite Simpson integration of `f` over `[a, b]`
fn simpson(f: impl Fn(f64) -> f64, a: f64, b: f64, steps: usize) -> f64 {
    if b <= a {
        return 0.0;
    }
    let n = if steps % 2 == 0 { steps } else { steps + 1 };
    let h = (b - a) / n as f64;
    let mut sum = f(a) + f(b);
    for i in 1..n {
        let x = a + h * i as f64;
        sum += if i % 2 == 1 { 4.0 * f(x) } else { 2.0 * f(x) };
    }
    sum * h / 3.0
}

fn check_finite(name: &'static str, value: f64) -> Result<(), DistributionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(DistributionError::NonFinite { name, value })
    }
}

fn check_scale(scale: f64) -> Result<(), DistributionError> {
    check_finite("scale", scale)?;
    if scale > 0.0 {
        Ok(())
    } else {
        Err(DistributionError::NonPositiveScale(scale))
    }
}

/// Optional truncation limits
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    /// No truncation
    pub fn none() -> Self {
        Self::default()
    }

    /// Truncate on both sides
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn lower(lower: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: None,
        }
    }

    pub fn upper(upper: f64) -> Self {
        Self {
            lower: None,
            upper: Some(upper),
        }
    }

    /// True when neither side is set
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// Raise the lower limit to at least `floor`
    pub fn with_lower_floor(self, floor: f64) -> Self {
        Self {
            lower: Some(self.lower.map_or(floor, |l| l.max(floor))),
            upper: self.upper,
        }
    }

    fn validate(&self) -> Result<(), DistributionError> {
        if let Some(l) = self.lower {
            check_finite("lower bound", l)?;
        }
        if let Some(u) = self.upper {
            check_finite("upper bound", u)?;
        }
        if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
            if lower >= upper {
                return Err(DistributionError::InvertedBounds { lower, upper });
            }
        }
        Ok(())
    }

    fn lo(&self) -> f64 {
        self.lower.unwrap_or(f64::NEG_INFINITY)
    }

    fn hi(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }
}

/// Limits applied when building truncated distributions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationPolicy {
    /// Windows enclosing less mass than this are rejected
    pub epsilon: f64,
    /// Maximum rejection rounds before sampling fails
    pub max_rejection_rounds: u32,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_TRUNCATION_EPSILON,
            max_rejection_rounds: DEFAULT_MAX_REJECTION_ROUNDS,
        }
    }
}

/// A validated truncation window and the mass it encloses
#[derive(Debug, Clone, Copy, PartialEq)]
struct Window {
    lower: f64,
    upper: f64,
    mass: f64,
}

impl Window {
    fn build(bounds: Bounds, mass: f64, policy: &TruncationPolicy) -> Result<Self, DistributionError> {
        if !(mass >= policy.epsilon) {
            return Err(DistributionError::NegligibleMass {
                lower: bounds.lo(),
                upper: bounds.hi(),
                mass,
                epsilon: policy.epsilon,
            });
        }
        Ok(Self {
            lower: bounds.lo(),
            upper: bounds.hi(),
            mass: mass.min(1.0),
        })
    }

    fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }
}

/// Normal (Gaussian) distribution, optionally truncated
#[derive(Debug, Clone, PartialEq)]
pub struct Normal {
    mean: f64,
    std: f64,
    window: Option<Window>,
}

impl Normal {
    pub fn new(mean: f64, std: f64) -> Result<Self, DistributionError> {
        check_finite("mean", mean)?;
        check_scale(std)?;
        Ok(Self {
            mean,
            std,
            window: None,
        })
    }

    /// Normal restricted to `bounds`, renormalized over the window
    pub fn truncated(
        mean: f64,
        std: f64,
        bounds: Bounds,
        policy: &TruncationPolicy,
    ) -> Result<Self, DistributionError> {
        let mut dist = Self::new(mean, std)?;
        bounds.validate()?;
        if bounds.is_unbounded() {
            return Ok(dist);
        }
        let (a, b) = dist.standardized(bounds.lo(), bounds.hi());
        dist.window = Some(Window::build(bounds, standard_mass(a, b), policy)?);
        Ok(dist)
    }

    /// Location parameter of the parent (untruncated) normal
    pub fn location(&self) -> f64 {
        self.mean
    }

    /// Scale parameter of the parent (untruncated) normal
    pub fn scale(&self) -> f64 {
        self.std
    }

    fn standardized(&self, lower: f64, upper: f64) -> (f64, f64) {
        ((lower - self.mean) / self.std, (upper - self.mean) / self.std)
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let z: f64 = rng.sample(StandardNormal);
        self.mean + self.std * z
    }

    fn draw_truncated<R: Rng>(&self, window: &Window, rng: &mut R) -> f64 {
        let (a, b) = self.standardized(window.lower, window.upper);
        // Invert in the lower tail for precision; mirror upper-tail windows
        let (a, b, sign) = if a > 0.0 { (-b, -a, -1.0) } else { (a, b, 1.0) };
        let lo = std_normal_cdf(a);
        let hi = std_normal_cdf(b);
        let u: f64 = rng.random();
        let p = (lo + u * (hi - lo)).clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
        let z = sign * std_normal_quantile(p);
        (self.mean + self.std * z).clamp(window.lower, window.upper)
    }

    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        match self.window {
            None => (0..n).map(|_| self.draw(rng)).collect(),
            Some(ref w) => (0..n).map(|_| self.draw_truncated(w, rng)).collect(),
        }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.std;
        match self.window {
            None => std_normal_pdf(z) / self.std,
            Some(ref w) if w.contains(x) => std_normal_pdf(z) / self.std / w.mass,
            Some(_) => 0.0,
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.std;
        match self.window {
            None => std_normal_cdf(z),
            Some(ref w) => {
                if x < w.lower {
                    0.0
                } else if x >= w.upper {
                    1.0
                } else {
                    let (a, _) = self.standardized(w.lower, w.upper);
                    (standard_mass(a, z) / w.mass).clamp(0.0, 1.0)
                }
            }
        }
    }

    pub fn mean(&self) -> f64 {
        match self.window {
            None => self.mean,
            Some(ref w) => {
                let (a, b) = self.standardized(w.lower, w.upper);
                self.mean + self.std * (std_normal_pdf(a) - std_normal_pdf(b)) / w.mass
            }
        }
    }

    pub fn std(&self) -> f64 {
        match self.window {
            None => self.std,
            Some(ref w) => {
                let (a, b) = self.standardized(w.lower, w.upper);
                let shift = (std_normal_pdf(a) - std_normal_pdf(b)) / w.mass;
                let var = 1.0 + (z_pdf(a) - z_pdf(b)) / w.mass - shift * shift;
                self.std * var.max(0.0).sqrt()
            }
        }
    }
}

/// Φ(b) − Φ(a), evaluated on the side of the distribution with better precision
fn standard_mass(a: f64, b: f64) -> f64 {
    if a > 0.0 {
        std_normal_cdf(-a) - std_normal_cdf(-b)
    } else {
        std_normal_cdf(b) - std_normal_cdf(a)
    }
}

/// Azzalini skewed normal distribution, optionally truncated
///
/// `shape` = 0 is the normal distribution; positive values skew right,
/// negative values skew left. `location` and `scale` are the parameters of
/// the unskewed normal.
#[derive(Debug, Clone, PartialEq)]
pub struct SkewedNormal {
    location: f64,
    scale: f64,
    shape: f64,
    window: Option<Window>,
    max_rejection_rounds: u32,
    /// Identical normal used when `shape` is zero
    unskewed: Option<Normal>,
}

impl SkewedNormal {
    pub fn new(location: f64, scale: f64, shape: f64) -> Result<Self, DistributionError> {
        Self::truncated(location, scale, shape, Bounds::none(), &TruncationPolicy::default())
    }

    pub fn truncated(
        location: f64,
        scale: f64,
        shape: f64,
        bounds: Bounds,
        policy: &TruncationPolicy,
    ) -> Result<Self, DistributionError> {
        check_finite("location", location)?;
        check_scale(scale)?;
        check_finite("shape", shape)?;
        bounds.validate()?;

        let mut dist = Self {
            location,
            scale,
            shape,
            window: None,
            max_rejection_rounds: policy.max_rejection_rounds,
            unskewed: None,
        };

        if shape == 0.0 {
            dist.unskewed = Some(Normal::truncated(location, scale, bounds, policy)?);
        }
        if !bounds.is_unbounded() {
            let (lo, hi) = dist.integration_range(bounds.lo(), bounds.hi());
            let mass = simpson(|x| dist.parent_pdf(x), lo, hi, INTEGRATION_STEPS);
            dist.window = Some(Window::build(bounds, mass, policy)?);
        }
        Ok(dist)
    }

    pub fn location(&self) -> f64 {
        self.location
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    fn delta(&self) -> f64 {
        self.shape / (1.0 + self.shape * self.shape).sqrt()
    }

    /// Clip `[lower, upper]` to the region where the density is not negligible
    fn integration_range(&self, lower: f64, upper: f64) -> (f64, f64) {
        let span = INTEGRATION_SPAN * self.scale;
        (
            lower.max(self.location - span),
            upper.min(self.location + span),
        )
    }

    fn parent_pdf(&self, x: f64) -> f64 {
        let z = (x - self.location) / self.scale;
        2.0 / self.scale * std_normal_pdf(z) * std_normal_cdf(self.shape * z)
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> f64 {
        let u0: f64 = rng.sample(StandardNormal);
        let v: f64 = rng.sample(StandardNormal);
        let delta = self.delta();
        let u1 = delta * u0 + (1.0 - delta * delta).sqrt() * v;
        let z = if u0 >= 0.0 { u1 } else { -u1 };
        self.location + self.scale * z
    }

    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>, DistributionError> {
        if let Some(ref normal) = self.unskewed {
            return Ok(normal.sample(n, rng));
        }
        let Some(window) = self.window else {
            return Ok((0..n).map(|_| self.draw(rng)).collect());
        };

        let mut accepted = Vec::with_capacity(n);
        let mut rounds = 0;
        while accepted.len() < n {
            if rounds >= self.max_rejection_rounds {
                tracing::warn!(
                    rounds,
                    accepted = accepted.len(),
                    requested = n,
                    mass = window.mass,
                    "truncated skewed-normal sampling hit the rejection limit"
                );
                return Err(DistributionError::RejectionLimit {
                    rounds,
                    accepted: accepted.len(),
                    requested: n,
                });
            }
            rounds += 1;

            let remaining = n - accepted.len();
            let candidates = ((remaining as f64 / window.mass) * 1.2).ceil() as usize + 32;
            for _ in 0..candidates.min(MAX_ROUND_CANDIDATES) {
                let x = self.draw(rng);
                if window.contains(x) {
                    accepted.push(x);
                    if accepted.len() == n {
                        break;
                    }
                }
            }
        }
        Ok(accepted)
    }

    pub fn pdf(&self, x: f64) -> f64 {
        match self.window {
            None => self.parent_pdf(x),
            Some(ref w) if w.contains(x) => self.parent_pdf(x) / w.mass,
            Some(_) => 0.0,
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        let (lower, mass) = match self.window {
            None => (f64::NEG_INFINITY, 1.0),
            Some(ref w) => {
                if x < w.lower {
                    return 0.0;
                }
                if x >= w.upper {
                    return 1.0;
                }
                (w.lower, w.mass)
            }
        };
        let (lo, hi) = self.integration_range(lower, x);
        (simpson(|t| self.parent_pdf(t), lo, hi, INTEGRATION_STEPS) / mass).clamp(0.0, 1.0)
    }

    pub fn mean(&self) -> f64 {
        match self.window {
            None => self.location + self.scale * self.delta() * FRAC_2_PI.sqrt(),
            Some(ref w) => self.truncated_moment(w, 1),
        }
    }

    pub fn std(&self) -> f64 {
        match self.window {
            None => {
                let d = self.delta();
                self.scale * (1.0 - FRAC_2_PI * d * d).sqrt()
            }
            Some(ref w) => {
                let m1 = self.truncated_moment(w, 1);
                let m2 = self.truncated_moment(w, 2);
                (m2 - m1 * m1).max(0.0).sqrt()
            }
        }
    }

    fn truncated_moment(&self, w: &Window, order: i32) -> f64 {
        let (lo, hi) = self.integration_range(w.lower, w.upper);
        simpson(|x| x.powi(order) * self.parent_pdf(x), lo, hi, INTEGRATION_STEPS) / w.mass
    }
}

/// Continuous uniform distribution on `[lower, upper]`
#[derive(Debug, Clone, PartialEq)]
pub struct Uniform {
    lower: f64,
    upper: f64,
    /// Sampling interval after truncation
    active: (f64, f64),
}

impl Uniform {
    pub fn new(lower: f64, upper: f64) -> Result<Self, DistributionError> {
        check_finite("lower", lower)?;
        check_finite("upper", upper)?;
        if lower >= upper {
            return Err(DistributionError::EmptyRange { lower, upper });
        }
        if !(upper - lower).is_finite() {
            return Err(DistributionError::RangeTooWide { lower, upper });
        }
        Ok(Self {
            lower,
            upper,
            active: (lower, upper),
        })
    }

    /// `nominal ± tolerance`
    pub fn centered(nominal: f64, tolerance: f64) -> Result<Self, DistributionError> {
        check_finite("nominal", nominal)?;
        check_finite("tolerance", tolerance)?;
        Self::new(nominal - tolerance.abs(), nominal + tolerance.abs())
    }

    /// Uniform restricted to the intersection with `bounds`
    pub fn truncated(
        lower: f64,
        upper: f64,
        bounds: Bounds,
        policy: &TruncationPolicy,
    ) -> Result<Self, DistributionError> {
        let mut dist = Self::new(lower, upper)?;
        bounds.validate()?;
        if bounds.is_unbounded() {
            return Ok(dist);
        }
        let lo = lower.max(bounds.lo());
        let hi = upper.min(bounds.hi());
        let mass = ((hi - lo) / (upper - lower)).max(0.0);
        if !(mass >= policy.epsilon) || lo >= hi {
            return Err(DistributionError::NegligibleMass {
                lower: bounds.lo(),
                upper: bounds.hi(),
                mass,
                epsilon: policy.epsilon,
            });
        }
        dist.active = (lo, hi);
        Ok(dist)
    }

    /// Declared lower edge (before truncation)
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Declared upper edge (before truncation)
    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        let (a, b) = self.active;
        (0..n).map(|_| rng.random_range(a..b)).collect()
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let (a, b) = self.active;
        if x >= a && x <= b {
            1.0 / (b - a)
        } else {
            0.0
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        let (a, b) = self.active;
        ((x - a) / (b - a)).clamp(0.0, 1.0)
    }

    pub fn mean(&self) -> f64 {
        (self.active.0 + self.active.1) / 2.0
    }

    pub fn std(&self) -> f64 {
        (self.active.1 - self.active.0) / 12f64.sqrt()
    }
}

/// Distribution of a single contributor
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    Normal(Normal),
    SkewedNormal(SkewedNormal),
    Uniform(Uniform),
}

impl Distribution {
    /// Short kind name
    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Normal(_) => "normal",
            Distribution::SkewedNormal(_) => "skew-normal",
            Distribution::Uniform(_) => "uniform",
        }
    }

    /// Draw exactly `n` values
    pub fn sample<R: Rng>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>, DistributionError> {
        match self {
            Distribution::Normal(d) => Ok(d.sample(n, rng)),
            Distribution::SkewedNormal(d) => d.sample(n, rng),
            Distribution::Uniform(d) => Ok(d.sample(n, rng)),
        }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        match self {
            Distribution::Normal(d) => d.pdf(x),
            Distribution::SkewedNormal(d) => d.pdf(x),
            Distribution::Uniform(d) => d.pdf(x),
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        match self {
            Distribution::Normal(d) => d.cdf(x),
            Distribution::SkewedNormal(d) => d.cdf(x),
            Distribution::Uniform(d) => d.cdf(x),
        }
    }

    pub fn mean(&self) -> f64 {
        match self {
            Distribution::Normal(d) => d.mean(),
            Distribution::SkewedNormal(d) => d.mean(),
            Distribution::Uniform(d) => d.mean(),
        }
    }

    pub fn std(&self) -> f64 {
        match self {
            Distribution::Normal(d) => d.std(),
            Distribution::SkewedNormal(d) => d.std(),
            Distribution::Uniform(d) => d.std(),
        }
    }

    /// Truncation bounds currently applied
    pub fn bounds(&self) -> Bounds {
        let window = match self {
            Distribution::Normal(d) => d.window,
            Distribution::SkewedNormal(d) => d.window,
            Distribution::Uniform(d) => {
                if d.active == (d.lower, d.upper) {
                    None
                } else {
                    return Bounds::new(d.active.0, d.active.1);
                }
            }
        };
        match window {
            None => Bounds::none(),
            Some(w) => Bounds {
                lower: w.lower.is_finite().then_some(w.lower),
                upper: w.upper.is_finite().then_some(w.upper),
            },
        }
    }

    pub fn is_truncated(&self) -> bool {
        !self.bounds().is_unbounded()
    }

    /// Absolute minimum and maximum a draw can take (None = unbounded)
    pub fn support(&self) -> (Option<f64>, Option<f64>) {
        match self {
            Distribution::Uniform(d) => (Some(d.active.0), Some(d.active.1)),
            _ => {
                let b = self.bounds();
                (b.lower, b.upper)
            }
        }
    }

    /// Rebuild with different truncation bounds
    pub fn with_bounds(&self, bounds: Bounds, policy: &TruncationPolicy) -> Result<Self, DistributionError> {
        Ok(match self {
            Distribution::Normal(d) => {
                Distribution::Normal(Normal::truncated(d.mean, d.std, bounds, policy)?)
            }
            Distribution::SkewedNormal(d) => Distribution::SkewedNormal(SkewedNormal::truncated(
                d.location, d.scale, d.shape, bounds, policy,
            )?),
            Distribution::Uniform(d) => {
                Distribution::Uniform(Uniform::truncated(d.lower, d.upper, bounds, policy)?)
            }
        })
    }
}

impl From<Normal> for Distribution {
    fn from(d: Normal) -> Self {
        Distribution::Normal(d)
    }
}

impl From<SkewedNormal> for Distribution {
    fn from(d: SkewedNormal) -> Self {
        Distribution::SkewedNormal(d)
    }
}

impl From<Uniform> for Distribution {
    fn from(d: Uniform) -> Self {
        Distribution::Uniform(d)
    }
}
