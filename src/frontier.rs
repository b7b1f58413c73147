//! Throughput/latency frontier reduction across neighbouring curves.
//!
//! Each curve holds one configuration's measurements ordered by concurrency.
//! Curves are compared only with their immediate neighbours in rank order:
//!
//! - against the **predecessor**, a point survives only if no predecessor
//!   point reaches a strictly higher throughput (latency is ignored);
//! - against the **successor**, points are scanned in order and the curve is
//!   cut at the first point the successor beats at comparable latency.
//!
//! The two passes are asymmetric: a larger configuration must
//! never be beaten by a smaller one, and a smaller configuration stays on the
//! frontier only until the next one overtakes it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative latency difference under which two points count as comparable.
pub const DEFAULT_LATENCY_TOLERANCE: f64 = 0.1;

/// A single (throughput, latency) measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Throughput, e.g. output tokens per second (higher is better)
    pub throughput: f64,
    /// Latency in milliseconds (lower is better)
    pub latency: f64,
}

impl Point {
    #[must_use]
    pub const fn new(throughput: f64, latency: f64) -> Self {
        Self {
            throughput,
            latency,
        }
    }

    const fn is_finite(&self) -> bool {
        self.throughput.is_finite() && self.latency.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((throughput, latency): (f64, f64)) -> Self {
        Self::new(throughput, latency)
    }
}

/// One configuration's points, ordered by ascending concurrency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    /// Display label
    pub label: String,
    /// Ordering key among sibling curves (e.g. output token budget)
    pub rank: i64,
    /// Points in concurrency order
    pub points: Vec<Point>,
}

impl Curve {
    #[must_use]
    pub fn new(label: impl Into<String>, rank: i64, points: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            rank,
            points,
        }
    }

    /// Build a curve from raw `(throughput, latency)` pairs
    #[must_use]
    pub fn from_pairs(label: impl Into<String>, rank: i64, pairs: &[(f64, f64)]) -> Self {
        Self::new(label, rank, pairs.iter().copied().map(Point::from).collect())
    }

    /// Whether latency never decreases along the curve.
    ///
    /// The successor comparison interpolates between consecutive points and
    /// assumes this holds; callers may use it to warn about noisy runs.
    #[must_use]
    pub fn is_latency_monotonic(&self) -> bool {
        self.points
            .windows(2)
            .all(|pair| pair[0].latency <= pair[1].latency)
    }
}

/// Why the successor comparison could not be evaluated for a curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonFault {
    /// The successor curve has no points
    EmptySuccessor { successor: String },
    /// A coordinate on either side is NaN or infinite
    NonFinitePoint { curve: String, index: usize },
}

impl fmt::Display for ComparisonFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySuccessor { successor } => {
                write!(f, "successor curve '{successor}' has no points")
            }
            Self::NonFinitePoint { curve, index } => {
                write!(f, "curve '{curve}' has a non-finite point at index {index}")
            }
        }
    }
}

/// Result of reducing one curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurveOutcome {
    /// Both applicable passes ran
    Reduced(Vec<Point>),
    /// The successor pass was skipped; `points` is the predecessor-pass result
    Degraded {
        points: Vec<Point>,
        fault: ComparisonFault,
    },
}

impl CurveOutcome {
    #[must_use]
    pub fn points(&self) -> &[Point] {
        match self {
            Self::Reduced(points) | Self::Degraded { points, .. } => points,
        }
    }

    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        match self {
            Self::Reduced(points) | Self::Degraded { points, .. } => points,
        }
    }

    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub const fn fault(&self) -> Option<&ComparisonFault> {
        match self {
            Self::Reduced(_) => None,
            Self::Degraded { fault, .. } => Some(fault),
        }
    }
}

/// A curve after reduction, label and rank preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedCurve {
    pub label: String,
    pub rank: i64,
    pub outcome: CurveOutcome,
}

/// Concatenated frontier of several curves under one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierCurve {
    pub label: String,
    pub points: Vec<Point>,
}

impl FrontierCurve {
    #[must_use]
    pub fn throughputs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.throughput).collect()
    }

    #[must_use]
    pub fn latencies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.latency).collect()
    }
}

/// Check whether two latencies are within `tolerance` of each other.
///
/// Two zeros are close; a zero and a non-zero never are.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    if a == 0.0 && b == 0.0 {
        return true;
    }
    if a == 0.0 || b == 0.0 {
        return false;
    }
    ((a - b) / a.abs().max(b.abs())).abs() <= tolerance
}

/// Reduces neighbouring curves to their visual frontier
#[derive(Debug, Clone, Copy)]
pub struct FrontierReducer {
    tolerance: f64,
}

impl Default for FrontierReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrontierReducer {
    /// Create a reducer with the default 10% latency tolerance
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tolerance: DEFAULT_LATENCY_TOLERANCE,
        }
    }

    #[must_use]
    pub const fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Reduce every curve against its neighbours.
    ///
    /// `curves` must already be sorted by rank. The output has one entry per
    /// input curve, in the same order.
    #[must_use]
    pub fn reduce(&self, curves: &[Curve]) -> Vec<ReducedCurve> {
        let count = curves.len();

        curves
            .iter()
            .enumerate()
            .map(|(i, curve)| {
                let mut keep = curve.points.clone();

                if i > 0 {
                    keep = Self::filter_by_predecessor(&keep, &curves[i - 1]);
                }

                let outcome = if i + 1 < count {
                    let successor = &curves[i + 1];
                    match self.cut_by_successor(curve, &keep, successor) {
                        Ok(points) => CurveOutcome::Reduced(points),
                        Err(fault) => {
                            tracing::warn!(
                                curve = %curve.label,
                                successor = %successor.label,
                                %fault,
                                "Successor comparison skipped"
                            );
                            CurveOutcome::Degraded {
                                points: keep,
                                fault,
                            }
                        }
                    }
                } else {
                    CurveOutcome::Reduced(keep)
                };

                tracing::debug!(
                    curve = %curve.label,
                    before = curve.points.len(),
                    after = outcome.points().len(),
                    "Reduced curve"
                );

                ReducedCurve {
                    label: curve.label.clone(),
                    rank: curve.rank,
                    outcome,
                }
            })
            .collect()
    }

    /// Sort curves by rank, reduce them and concatenate the survivors.
    ///
    /// Survivors keep their per-curve order; the combined list is not
    /// re-sorted.
    #[must_use]
    pub fn merge(&self, mut curves: Vec<Curve>, label: &str) -> FrontierCurve {
        curves.sort_by_key(|c| c.rank);

        let points = self
            .reduce(&curves)
            .into_iter()
            .flat_map(|reduced| reduced.outcome.into_points())
            .collect();

        FrontierCurve {
            label: label.to_string(),
            points,
        }
    }

    /// Whether `neighbour` beats `point` on this curve.
    ///
    /// `next` is the point that follows `point` on its own curve, if any.
    fn is_dominated(&self, point: &Point, next: Option<&Point>, neighbour: &Point) -> bool {
        if point.throughput >= neighbour.throughput {
            return false;
        }
        if is_close(point.latency, neighbour.latency, self.tolerance) {
            return true;
        }
        next.is_some_and(|next| {
            point.latency < neighbour.latency && neighbour.latency < next.latency
        })
    }

    fn filter_by_predecessor(points: &[Point], predecessor: &Curve) -> Vec<Point> {
        points
            .iter()
            .filter(|p| {
                !predecessor
                    .points
                    .iter()
                    .any(|q| q.throughput > p.throughput)
            })
            .copied()
            .collect()
    }

    fn cut_by_successor(
        &self,
        curve: &Curve,
        survivors: &[Point],
        successor: &Curve,
    ) -> Result<Vec<Point>, ComparisonFault> {
        if successor.points.is_empty() {
            return Err(ComparisonFault::EmptySuccessor {
                successor: successor.label.clone(),
            });
        }
        if let Some(index) = survivors.iter().position(|p| !p.is_finite()) {
            return Err(ComparisonFault::NonFinitePoint {
                curve: curve.label.clone(),
                index,
            });
        }
        if let Some(index) = successor.points.iter().position(|p| !p.is_finite()) {
            return Err(ComparisonFault::NonFinitePoint {
                curve: successor.label.clone(),
                index,
            });
        }

        let mut kept = Vec::with_capacity(survivors.len());
        for (idx, point) in survivors.iter().enumerate() {
            let next = survivors.get(idx + 1);
            if successor
                .points
                .iter()
                .any(|q| self.is_dominated(point, next, q))
            {
                break;
            }
            kept.push(*point);
        }
        Ok(kept)
    }
}
