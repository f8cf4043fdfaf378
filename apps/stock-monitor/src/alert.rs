/// Inline message shown after the operator dismisses the full-screen alert.
pub const REFILL_REMINDER: &str = "Low weight Alert: Please Refill!!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub is_low: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineAlert {
    Show(String),
    Hide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertDecision {
    pub percent_remaining: f64,
    pub inline: InlineAlert,
    /// Set only on the cycle that crosses into low stock.
    pub full_screen: Option<String>,
}

impl AlertDecision {
    pub fn is_low(&self) -> bool {
        matches!(self.inline, InlineAlert::Show(_))
    }
}

/// Edge-triggered low-stock policy. The inline warning follows the level on
/// every cycle; the full-screen alert fires once per NORMAL -> LOW crossing
/// and re-arms when stock climbs back to the threshold.
pub fn evaluate(
    state: &mut AlertState,
    latest_weight: f64,
    total_capacity: f64,
    threshold_percent: f64,
) -> AlertDecision {
    let percent_remaining = latest_weight / total_capacity * 100.0;

    if percent_remaining < threshold_percent {
        let full_screen = if state.is_low {
            None
        } else {
            state.is_low = true;
            Some(format!(
                "Only {percent_remaining:.1}% weight remaining! Refill soon."
            ))
        };
        return AlertDecision {
            percent_remaining,
            inline: InlineAlert::Show(format!("Warning: Only {percent_remaining:.1}% remaining!")),
            full_screen,
        };
    }

    state.is_low = false;
    AlertDecision {
        percent_remaining,
        inline: InlineAlert::Hide,
        full_screen: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPACITY: f64 = 500.0;
    const THRESHOLD: f64 = 20.0;

    fn weight_for_percent(percent: f64) -> f64 {
        percent / 100.0 * CAPACITY
    }

    #[test]
    fn full_alert_fires_once_per_low_crossing() {
        let mut state = AlertState::default();
        let decisions: Vec<AlertDecision> = [50.0, 15.0, 10.0, 25.0, 12.0]
            .iter()
            .map(|pct| evaluate(&mut state, weight_for_percent(*pct), CAPACITY, THRESHOLD))
            .collect();

        let fired: Vec<usize> = decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.full_screen.is_some())
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(fired, vec![1, 4]);

        let inline: Vec<bool> = decisions.iter().map(AlertDecision::is_low).collect();
        assert_eq!(inline, vec![false, true, true, false, true]);
        assert!(state.is_low);
    }

    #[test]
    fn threshold_is_exclusive_below() {
        let mut state = AlertState::default();
        let at = evaluate(&mut state, 100.0, CAPACITY, THRESHOLD);
        assert_eq!(at.inline, InlineAlert::Hide);
        assert!(!state.is_low);

        let below = evaluate(&mut state, 99.5, CAPACITY, THRESHOLD);
        assert!(below.is_low());
        assert_eq!(
            below.full_screen.as_deref(),
            Some("Only 19.9% weight remaining! Refill soon.")
        );
        assert_eq!(
            below.inline,
            InlineAlert::Show("Warning: Only 19.9% remaining!".to_string())
        );
    }

    #[test]
    fn staying_low_repeats_inline_only() {
        let mut state = AlertState { is_low: true };
        let decision = evaluate(&mut state, 20.0, CAPACITY, THRESHOLD);
        assert!(decision.is_low());
        assert!(decision.full_screen.is_none());
        assert!((decision.percent_remaining - 4.0).abs() < 1e-12);
    }
}
