use crate::comp::revealer::RevealerId;

/// 某個觀察者對物件的感知
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    pub revealer: RevealerId,
    pub strength: f32,
}

/// 合併後的結論
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub visible: bool,
    pub strength: f32,
}

impl Verdict {
    pub const HIDDEN: Verdict = Verdict { visible: false, strength: 0.0 };
}

/// 多個觀察者結果的合併策略
///
/// 傳入的只有本 tick 看得見此物件的觀察者（可能為空）。
pub trait VisibilityAggregator: Send + Sync {
    fn aggregate(&self, perceptions: &[Perception]) -> Verdict;
}

/// 任一觀察者看見即可見，強度取最大值
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyRevealer;

impl VisibilityAggregator for AnyRevealer {
    fn aggregate(&self, perceptions: &[Perception]) -> Verdict {
        perceptions
            .iter()
            .map(|p| p.strength)
            .reduce(f32::max)
            .map_or(Verdict::HIDDEN, |strength| Verdict { visible: true, strength })
    }
}

/// 至少要有指定數量的觀察者同時看見
#[derive(Debug, Clone, Copy)]
pub struct Quorum {
    pub required: usize,
}

impl VisibilityAggregator for Quorum {
    fn aggregate(&self, perceptions: &[Perception]) -> Verdict {
        if perceptions.len() < self.required.max(1) {
            return Verdict::HIDDEN;
        }
        AnyRevealer.aggregate(perceptions)
    }
}
