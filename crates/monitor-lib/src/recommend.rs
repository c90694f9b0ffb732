//! Trend-based scaling recommendations
//!
//! Two signals feed a decision: the short "current" window averages gate
//! whether there is anything to evaluate, and the mean over the longer trend
//! history decides direction and magnitude against the policy thresholds.
//! Scale-up is checked first, so a pod over either threshold always scales up.

use crate::config::ScalingPolicy;
use crate::models::{HistoryPoint, ScalingDirection, ScalingRecommendation, UsageWindow};
use tracing::debug;

pub const REASON_INSUFFICIENT_DATA: &str = "insufficient data";
pub const REASON_IDLE: &str = "idle";
pub const REASON_TREND: &str = "usage trend";
pub const REASON_WITHIN_THRESHOLDS: &str = "within thresholds";

/// Replica delta per 10 points of distance from the CPU threshold
const POINTS_PER_REPLICA: f64 = 10.0;

/// Direction, magnitude and reason, before attaching pod identity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub direction: ScalingDirection,
    pub magnitude: u32,
    pub reason: &'static str,
}

impl Decision {
    fn none(reason: &'static str) -> Self {
        Self {
            direction: ScalingDirection::None,
            magnitude: 0,
            reason,
        }
    }
}

/// Mean CPU and memory across a history sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trend {
    pub cpu: f64,
    pub memory: f64,
}

impl Trend {
    /// Equal-weight mean; `None` for an empty history
    pub fn from_history(history: &[HistoryPoint]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }
        let n = history.len() as f64;
        let cpu = history.iter().map(|p| p.cpu as f64).sum::<f64>() / n;
        let memory = history.iter().map(|p| p.memory as f64).sum::<f64>() / n;
        Some(Self { cpu, memory })
    }
}

/// Decide a scaling action from the current window, the trend history and the policy
pub fn decide(current: UsageWindow, policy: &ScalingPolicy, history: &[HistoryPoint]) -> Decision {
    let (cpu, memory) = match (current.average_cpu, current.average_memory) {
        (Some(cpu), Some(memory)) => (cpu, memory),
        _ => return Decision::none(REASON_INSUFFICIENT_DATA),
    };

    if cpu == 0.0 && memory == 0.0 {
        return Decision::none(REASON_IDLE);
    }

    let Some(trend) = Trend::from_history(history) else {
        return Decision::none(REASON_INSUFFICIENT_DATA);
    };

    let max_change = i64::from(policy.max_replicas_change.max(1));

    if trend.cpu > policy.cpu_threshold || trend.memory > policy.memory_threshold {
        let steps = ((trend.cpu - policy.cpu_threshold) / POINTS_PER_REPLICA).trunc() as i64;
        return Decision {
            direction: ScalingDirection::Up,
            magnitude: steps.clamp(1, max_change) as u32,
            reason: REASON_TREND,
        };
    }

    if trend.cpu < policy.cpu_threshold && trend.memory < policy.memory_threshold {
        let steps = ((policy.cpu_threshold - trend.cpu) / POINTS_PER_REPLICA).trunc() as i64;
        return Decision {
            direction: ScalingDirection::Down,
            magnitude: steps.clamp(0, max_change) as u32,
            reason: REASON_TREND,
        };
    }

    Decision::none(REASON_WITHIN_THRESHOLDS)
}

/// Produces per-pod recommendations for a fixed policy
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    policy: ScalingPolicy,
}

impl RecommendationEngine {
    pub fn new(policy: ScalingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScalingPolicy {
        &self.policy
    }

    pub fn recommend(
        &self,
        pod_name: &str,
        namespace: &str,
        current: UsageWindow,
        history: &[HistoryPoint],
    ) -> ScalingRecommendation {
        let decision = decide(current, &self.policy, history);

        debug!(
            pod_name = %pod_name,
            namespace = %namespace,
            strategy = ?self.policy.strategy,
            samples = history.len(),
            direction = %decision.direction,
            magnitude = decision.magnitude,
            "Computed scaling decision"
        );

        ScalingRecommendation {
            pod_name: pod_name.to_string(),
            namespace: namespace.to_string(),
            direction: decision.direction,
            magnitude: decision.magnitude,
            reason: decision.reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalingStrategy;

    fn policy() -> ScalingPolicy {
        ScalingPolicy {
            cpu_threshold: 60.0,
            memory_threshold: 60.0,
            max_replicas_change: 5,
            strategy: ScalingStrategy::Static,
        }
    }

    fn window(cpu: f64, memory: f64) -> UsageWindow {
        UsageWindow {
            average_cpu: Some(cpu),
            average_memory: Some(memory),
        }
    }

    fn points(cpu: i64, memory: i64, n: usize) -> Vec<HistoryPoint> {
        vec![HistoryPoint { cpu, memory }; n]
    }

    #[test]
    fn test_scale_up_scenario() {
        let decision = decide(window(80.0, 50.0), &policy(), &points(80, 50, 3));
        assert_eq!(decision.direction, ScalingDirection::Up);
        assert_eq!(decision.magnitude, 2);
        assert_eq!(decision.reason, REASON_TREND);
    }

    #[test]
    fn test_scale_down_scenario() {
        let decision = decide(window(30.0, 20.0), &policy(), &points(30, 20, 1));
        assert_eq!(decision.direction, ScalingDirection::Down);
        assert_eq!(decision.magnitude, 3);
    }

    #[test]
    fn test_absent_current_is_insufficient_data() {
        let history = points(90, 90, 4);
        for current in [
            UsageWindow::default(),
            UsageWindow {
                average_cpu: Some(50.0),
                average_memory: None,
            },
            UsageWindow {
                average_cpu: None,
                average_memory: Some(50.0),
            },
        ] {
            let decision = decide(current, &policy(), &history);
            assert_eq!(decision.direction, ScalingDirection::None);
            assert_eq!(decision.reason, REASON_INSUFFICIENT_DATA);
        }
    }

    #[test]
    fn test_empty_history_never_panics() {
        for (cpu, memory) in [(1.0, 1.0), (99.0, 99.0), (60.0, 0.0)] {
            let decision = decide(window(cpu, memory), &policy(), &[]);
            assert_eq!(decision.direction, ScalingDirection::None);
            assert_eq!(decision.reason, REASON_INSUFFICIENT_DATA);
            assert_eq!(decision.magnitude, 0);
        }
    }

    #[test]
    fn test_idle_ignores_history() {
        for history in [points(95, 95, 5), points(0, 0, 1), vec![]] {
            let decision = decide(window(0.0, 0.0), &policy(), &history);
            assert_eq!(decision.direction, ScalingDirection::None);
            assert_eq!(decision.reason, REASON_IDLE);
        }
    }

    #[test]
    fn test_memory_over_threshold_scales_up_with_minimum_one() {
        // CPU trend well below threshold would suggest scaling down on its own
        let decision = decide(window(10.0, 90.0), &policy(), &points(10, 90, 2));
        assert_eq!(decision.direction, ScalingDirection::Up);
        assert_eq!(decision.magnitude, 1);
    }

    #[test]
    fn test_magnitude_capped_by_policy() {
        let decision = decide(window(500.0, 10.0), &policy(), &points(500, 10, 2));
        assert_eq!(decision.direction, ScalingDirection::Up);
        assert_eq!(decision.magnitude, 5);

        let mut tight = policy();
        tight.cpu_threshold = 200.0;
        tight.memory_threshold = 200.0;
        tight.max_replicas_change = 3;
        let decision = decide(window(1.0, 1.0), &tight, &points(1, 1, 2));
        assert_eq!(decision.direction, ScalingDirection::Down);
        assert_eq!(decision.magnitude, 3);
    }

    #[test]
    fn test_within_thresholds_when_equal() {
        // CPU exactly at threshold is neither above nor below
        let decision = decide(window(60.0, 10.0), &policy(), &points(60, 10, 3));
        assert_eq!(decision.direction, ScalingDirection::None);
        assert_eq!(decision.reason, REASON_WITHIN_THRESHOLDS);
    }

    #[test]
    fn test_down_magnitude_zero_near_threshold() {
        let decision = decide(window(55.0, 10.0), &policy(), &points(55, 10, 3));
        assert_eq!(decision.direction, ScalingDirection::Down);
        assert_eq!(decision.magnitude, 0);
    }

    #[test]
    fn test_trend_uses_full_history_equally() {
        let history = vec![
            HistoryPoint { cpu: 100, memory: 10 },
            HistoryPoint { cpu: 40, memory: 10 },
            HistoryPoint { cpu: 40, memory: 10 },
        ];
        let trend = Trend::from_history(&history).unwrap();
        assert_eq!(trend.cpu, 60.0);
        assert_eq!(trend.memory, 10.0);

        // The current window may disagree; only the trend decides direction
        let decision = decide(window(100.0, 10.0), &policy(), &history);
        assert_eq!(decision.direction, ScalingDirection::None);
    }

    #[test]
    fn test_monotonic_cpu_flips_none_to_up() {
        let mut previous = ScalingDirection::Down;
        for cpu in 55..=75 {
            let decision = decide(window(cpu as f64, 10.0), &policy(), &points(cpu, 10, 2));
            if cpu > 60 {
                assert_eq!(decision.direction, ScalingDirection::Up, "cpu={}", cpu);
            } else if cpu == 60 {
                assert_eq!(decision.direction, ScalingDirection::None);
            }
            if previous == ScalingDirection::Up {
                assert_eq!(decision.direction, ScalingDirection::Up);
            }
            previous = decision.direction;
        }
    }

    #[test]
    fn test_magnitude_always_within_bounds() {
        let policy = policy();
        for cpu in (0..=300).step_by(7) {
            for memory in (0..=150).step_by(11) {
                let decision = decide(
                    window(cpu as f64, memory as f64),
                    &policy,
                    &points(cpu, memory, 2),
                );
                assert!(decision.magnitude <= policy.max_replicas_change);
                match decision.direction {
                    ScalingDirection::Up => assert!(decision.magnitude >= 1),
                    ScalingDirection::None => assert_eq!(decision.magnitude, 0),
                    ScalingDirection::Down => {}
                }
            }
        }
    }

    #[test]
    fn test_strategy_does_not_change_outcome() {
        let mut dynamic = policy();
        dynamic.strategy = ScalingStrategy::Dynamic;
        let history = points(80, 50, 3);
        assert_eq!(
            decide(window(80.0, 50.0), &policy(), &history),
            decide(window(80.0, 50.0), &dynamic, &history)
        );
    }

    #[test]
    fn test_engine_attaches_identity() {
        let engine = RecommendationEngine::new(policy());
        let rec = engine.recommend("api", "prod", window(80.0, 50.0), &points(80, 50, 3));
        assert_eq!(rec.pod_name, "api");
        assert_eq!(rec.namespace, "prod");
        assert_eq!(rec.direction, ScalingDirection::Up);
        assert_eq!(rec.magnitude, 2);
        assert_eq!(rec.to_string(), "Scale Up by 2 replicas due to usage trend");
    }
}
