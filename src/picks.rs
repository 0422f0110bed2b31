use crate::enums::PickKind;
use crate::error::Result;
use crate::error::TomoError;
use crate::scaler::DisplayState;
use crate::scaler::Point;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickPhase {
    Idle,
    AwaitingCenter,
    AwaitingRadius,
    Ready,
}

/// Payloads handed back to the GUI shell after a pick is recorded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickEvent {
    Updated(PickKind, Point),
    Completed { center: Point, radius: Point },
}

/// Center/radius picking as a plain state machine owned by the GUI shell.
///
/// Points are stored in display coordinates; real coordinates are derived on
/// demand through a [`DisplayState`]. Export is only unlocked in
/// [`PickPhase::Ready`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PickState {
    armed: Option<PickKind>,
    center: Option<Point>,
    radius: Option<Point>,
}

impl PickState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next click record `kind`.
    pub fn arm(&mut self, kind: PickKind) {
        self.armed = Some(kind);
    }

    pub fn armed(&self) -> Option<PickKind> {
        self.armed
    }

    /// Record a click for whatever kind is armed; ignored when nothing is.
    /// The arming is consumed.
    pub fn click(&mut self, point: Point) -> Vec<PickEvent> {
        match self.armed.take() {
            Some(kind) => self.apply(kind, point),
            None => Vec::new(),
        }
    }

    /// Record `point` as `kind` directly.
    pub fn apply(&mut self, kind: PickKind, point: Point) -> Vec<PickEvent> {
        match kind {
            PickKind::Center => self.center = Some(point),
            PickKind::Radius => self.radius = Some(point),
        }
        let mut events = vec![PickEvent::Updated(kind, point)];
        if let (Some(center), Some(radius)) = (self.center, self.radius) {
            events.push(PickEvent::Completed { center, radius });
        }
        events
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self) -> PickPhase {
        match (self.center, self.radius, self.armed) {
            (Some(_), Some(_), _) => PickPhase::Ready,
            (_, _, Some(PickKind::Center)) => PickPhase::AwaitingCenter,
            (_, _, Some(PickKind::Radius)) => PickPhase::AwaitingRadius,
            (Some(_), None, None) => PickPhase::AwaitingRadius,
            (None, Some(_), None) => PickPhase::AwaitingCenter,
            (None, None, None) => PickPhase::Idle,
        }
    }

    pub fn picked_center(&self) -> bool {
        self.center.is_some()
    }

    pub fn picked_radius(&self) -> bool {
        self.radius.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == PickPhase::Ready
    }

    pub fn center(&self) -> Option<Point> {
        self.center
    }

    pub fn radius(&self) -> Option<Point> {
        self.radius
    }

    /// Both display points, or `PicksIncomplete`.
    pub fn picks(&self) -> Result<(Point, Point)> {
        match (self.center, self.radius) {
            (Some(center), Some(radius)) => Ok((center, radius)),
            _ => Err(TomoError::PicksIncomplete),
        }
    }

    /// Center and radius in array pixels.
    pub fn real_roi(&self, display: &DisplayState) -> Result<(Point, f32)> {
        let (center, radius) = self.picks()?;
        Ok((display.to_real(center), display.real_radius(center, radius)))
    }

    /// One-line status message for the shell.
    pub fn status(&self) -> String {
        match (self.armed, self.center, self.radius) {
            (Some(PickKind::Center), _, _) => "Pick approximate center".to_string(),
            (Some(PickKind::Radius), _, _) => "Pick approximate radius".to_string(),
            (None, Some(c), Some(r)) => format!(
                "Center: ({:.0}, {:.0}) | Radius: ({:.0}, {:.0})",
                c.x, c.y, r.x, r.y
            ),
            (None, Some(c), None) => format!("Center: ({:.0}, {:.0})", c.x, c.y),
            (None, None, Some(r)) => format!("Radius: ({:.0}, {:.0})", r.x, r.y),
            (None, None, None) => "Ready".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_blocks_export() {
        let picks = PickState::new();
        assert_eq!(picks.phase(), PickPhase::Idle);
        assert!(matches!(picks.picks(), Err(TomoError::PicksIncomplete)));
        assert_eq!(picks.status(), "Ready");
    }

    #[test]
    fn click_without_arming_is_ignored() {
        let mut picks = PickState::new();
        assert!(picks.click(Point::new(1.0, 1.0)).is_empty());
        assert_eq!(picks.phase(), PickPhase::Idle);
    }

    #[test]
    fn armed_clicks_walk_to_ready() {
        let mut picks = PickState::new();
        picks.arm(PickKind::Center);
        assert_eq!(picks.phase(), PickPhase::AwaitingCenter);
        let events = picks.click(Point::new(10.0, 20.0));
        assert_eq!(events, vec![PickEvent::Updated(PickKind::Center, Point::new(10.0, 20.0))]);
        assert_eq!(picks.armed(), None);
        assert_eq!(picks.phase(), PickPhase::AwaitingRadius);
        assert_eq!(picks.status(), "Center: (10, 20)");

        picks.arm(PickKind::Radius);
        let events = picks.click(Point::new(13.0, 24.0));
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            PickEvent::Completed {
                center: Point::new(10.0, 20.0),
                radius: Point::new(13.0, 24.0)
            }
        );
        assert!(picks.is_ready());
        assert_eq!(picks.status(), "Center: (10, 20) | Radius: (13, 24)");
    }

    #[test]
    fn radius_first_awaits_center() {
        let mut picks = PickState::new();
        picks.apply(PickKind::Radius, Point::new(5.0, 5.0));
        assert_eq!(picks.phase(), PickPhase::AwaitingCenter);
        assert!(picks.picked_radius() && !picks.picked_center());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut picks = PickState::new();
        picks.apply(PickKind::Center, Point::new(1.0, 1.0));
        picks.apply(PickKind::Radius, Point::new(2.0, 2.0));
        picks.reset();
        assert_eq!(picks.phase(), PickPhase::Idle);
        assert!(!picks.picked_center() && !picks.picked_radius());
    }

    #[test]
    fn real_roi_applies_scale() {
        let mut picks = PickState::new();
        picks.apply(PickKind::Center, Point::new(100.0, 50.0));
        picks.apply(PickKind::Radius, Point::new(103.0, 54.0));
        let display = DisplayState::fit(1024, 1024, 512, 512);
        let (center, radius) = picks.real_roi(&display).unwrap();
        assert_eq!(center, Point::new(200.0, 100.0));
        assert!((radius - 10.0).abs() < 1e-6);
    }
}
