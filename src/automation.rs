//! Automation lanes: a parameter kind with control points ordered by position.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomationPoint {
    pub beat: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutomationLane {
    kind: String,
    points: Vec<AutomationPoint>,
}

impl AutomationLane {
    pub fn new(kind: impl Into<String>) -> Self {
        AutomationLane {
            kind: kind.into(),
            points: Vec::new(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    /// Inserts a point keeping the lane ordered. A point at an existing
    /// position replaces it.
    pub fn insert(&mut self, beat: f64, value: f64) {
        let point = AutomationPoint { beat, value };
        match self
            .points
            .binary_search_by(|p| p.beat.total_cmp(&beat))
        {
            Ok(index) => self.points[index] = point,
            Err(index) => self.points.insert(index, point),
        }
    }

    /// Value at `beat`, linearly interpolated between neighbouring points and
    /// held flat before the first and after the last.
    pub fn value_at(&self, beat: f64) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if beat <= first.beat {
            return Some(first.value);
        }
        if beat >= last.beat {
            return Some(last.value);
        }

        let upper = self.points.partition_point(|p| p.beat <= beat);
        let (a, b) = (self.points[upper - 1], self.points[upper]);
        let t = (beat - a.beat) / (b.beat - a.beat);
        Some(a.value + (b.value - a.value) * t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_points_ordered() {
        let mut lane = AutomationLane::new("volume");
        lane.insert(2.0, 0.5);
        lane.insert(0.0, 1.0);
        lane.insert(1.0, 0.0);
        lane.insert(1.0, 0.25);

        let beats: Vec<f64> = lane.points().iter().map(|p| p.beat).collect();
        assert_eq!(beats, vec![0.0, 1.0, 2.0]);
        assert_eq!(lane.points()[1].value, 0.25);
        assert_eq!(lane.kind(), "volume");
    }

    #[test]
    fn test_value_at_interpolates() {
        let mut lane = AutomationLane::new("pan");
        assert_eq!(lane.value_at(1.0), None);

        lane.insert(1.0, -1.0);
        lane.insert(3.0, 1.0);
        assert_eq!(lane.value_at(0.0), Some(-1.0));
        assert_eq!(lane.value_at(2.0), Some(0.0));
        assert_eq!(lane.value_at(2.5), Some(0.5));
        assert_eq!(lane.value_at(3.0), Some(1.0));
        assert_eq!(lane.value_at(3.9), Some(1.0));
    }
}
