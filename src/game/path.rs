use cgmath::{InnerSpace, Vector3};

/// Geometry a lane moves its notes along. Percentages are normalised arc
/// length: 0 is the first point, 1 the last.
pub trait MovementPath {
    fn length(&self) -> f32;
    fn point_count(&self) -> usize;
    /// Normalised distance of a landmark point, clamped to the last point.
    fn percentage_at_point(&self, index: usize) -> f32;
    fn location_at(&self, percentage: f32) -> Vector3<f32>;
}

#[derive(Clone, Debug)]
pub struct PolylinePath {
    points: Vec<Vector3<f32>>,
    // Arc length from the first point to each point.
    cumulative: Vec<f32>,
}

impl PolylinePath {
    pub fn new(points: Vec<Vector3<f32>>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += (*p - points[i - 1]).magnitude();
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    /// Evenly spaced points running from the origin along +Y.
    pub fn straight(length: f32, point_count: usize) -> Self {
        let count = point_count.max(2);
        let step = length / (count - 1) as f32;
        let points = (0..count)
            .map(|i| Vector3::new(0.0, step * i as f32, 0.0))
            .collect();
        Self::new(points)
    }
}

impl MovementPath for PolylinePath {
    fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn point_count(&self) -> usize {
        self.points.len()
    }

    fn percentage_at_point(&self, index: usize) -> f32 {
        let length = self.length();
        if length <= 0.0 || self.cumulative.is_empty() {
            return 0.0;
        }
        let index = index.min(self.cumulative.len() - 1);
        self.cumulative[index] / length
    }

    fn location_at(&self, percentage: f32) -> Vector3<f32> {
        let Some(&first) = self.points.first() else {
            return Vector3::new(0.0, 0.0, 0.0);
        };
        let target = percentage.clamp(0.0, 1.0) * self.length();
        for i in 1..self.points.len() {
            if self.cumulative[i] >= target {
                let span = self.cumulative[i] - self.cumulative[i - 1];
                if span <= 0.0 {
                    return self.points[i];
                }
                let t = (target - self.cumulative[i - 1]) / span;
                return self.points[i - 1] + (self.points[i] - self.points[i - 1]) * t;
            }
        }
        self.points.last().copied().unwrap_or(first)
    }
}
