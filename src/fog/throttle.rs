use std::time::Duration;

/// 觀察者本 tick 的狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealerPhase {
    /// 沿用上一次的結果
    Idle,
    /// 需要重新評估
    Due,
}

/// 更新頻率節流
///
/// 第一次一定評估；之後距離上次評估的累積時間到達週期才再評估。
/// 靜態觀察者每個 tick 都檢查物件，但視野區域只在第一次與被強制時擷取。
#[derive(Debug, Clone, Default)]
pub struct Throttle {
    elapsed: Duration,
    evaluated: bool,
    forced: bool,
}

impl Throttle {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累積時間並回傳本 tick 的狀態
    pub fn advance(&mut self, dt: Duration, period: Duration, is_static: bool) -> RevealerPhase {
        self.elapsed = self.elapsed.saturating_add(dt);
        self.phase(period, is_static)
    }

    pub fn phase(&self, period: Duration, is_static: bool) -> RevealerPhase {
        if is_static || !self.evaluated || self.forced || self.elapsed >= period {
            RevealerPhase::Due
        } else {
            RevealerPhase::Idle
        }
    }

    /// 視野區域是否需要重新擷取
    pub fn needs_refresh(&self) -> bool {
        !self.evaluated || self.forced
    }

    pub fn mark_evaluated(&mut self) {
        self.elapsed = Duration::ZERO;
        self.evaluated = true;
        self.forced = false;
    }

    /// 下一個 tick 強制評估
    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn has_evaluated(&self) -> bool {
        self.evaluated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(1000);

    #[test]
    fn test_first_tick_is_due() {
        let mut throttle = Throttle::new();
        assert_eq!(throttle.advance(Duration::ZERO, PERIOD, false), RevealerPhase::Due);
        assert_eq!(throttle.advance(Duration::ZERO, PERIOD, true), RevealerPhase::Due);
    }

    #[test]
    fn test_period_gates_evaluation() {
        let mut throttle = Throttle::new();
        throttle.advance(Duration::ZERO, PERIOD, false);
        throttle.mark_evaluated();

        assert_eq!(throttle.advance(Duration::from_millis(500), PERIOD, false), RevealerPhase::Idle);
        assert_eq!(throttle.advance(Duration::from_millis(499), PERIOD, false), RevealerPhase::Idle);
        assert_eq!(throttle.advance(Duration::from_millis(1), PERIOD, false), RevealerPhase::Due);
        throttle.mark_evaluated();
        assert_eq!(throttle.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_zero_period_is_every_tick() {
        let mut throttle = Throttle::new();
        for _ in 0..5 {
            assert_eq!(throttle.advance(Duration::ZERO, Duration::ZERO, false), RevealerPhase::Due);
            throttle.mark_evaluated();
        }
    }

    #[test]
    fn test_static_checks_every_tick_but_refreshes_on_force() {
        let mut throttle = Throttle::new();
        assert!(throttle.needs_refresh());
        throttle.advance(Duration::ZERO, PERIOD, true);
        throttle.mark_evaluated();

        // 週期還沒到，靜態觀察者仍然每個 tick 檢查物件
        assert_eq!(throttle.advance(Duration::from_millis(10), PERIOD, true), RevealerPhase::Due);
        assert!(!throttle.needs_refresh());
        throttle.mark_evaluated();

        throttle.force();
        assert!(throttle.needs_refresh());
        assert_eq!(throttle.advance(Duration::ZERO, PERIOD, true), RevealerPhase::Due);
        throttle.mark_evaluated();
        assert!(!throttle.needs_refresh());
    }

    #[test]
    fn test_unevaluated_stays_due() {
        // 評估失敗時不呼叫 mark_evaluated，下一個 tick 仍然 Due
        let mut throttle = Throttle::new();
        throttle.advance(Duration::ZERO, PERIOD, false);
        throttle.mark_evaluated();
        throttle.force();
        assert_eq!(throttle.advance(Duration::from_millis(10), PERIOD, false), RevealerPhase::Due);
        assert_eq!(throttle.advance(Duration::from_millis(10), PERIOD, false), RevealerPhase::Due);
    }
}
