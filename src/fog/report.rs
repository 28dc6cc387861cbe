use std::fmt;

/// 單一 tick 的統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub revealers_due: usize,
    pub revealers_skipped: usize,
    pub revealers_failed: usize,
    /// 觀察者 × 物件的判定次數
    pub evaluations: usize,
    pub range_rejections: usize,
    pub cone_rejections: usize,
    pub rays_cast: usize,
    pub occluded: usize,
    pub visibility_changes: usize,
    pub strength_changes: usize,
    pub added: usize,
    pub removed: usize,
    pub purged: usize,
    pub revealers_pruned: usize,
}

impl TickReport {
    /// 被距離或角度過濾掉的比例
    pub fn prefilter_ratio(&self) -> f32 {
        if self.evaluations == 0 {
            0.0
        } else {
            (self.range_rejections + self.cone_rejections) as f32 / self.evaluations as f32
        }
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {}: 觀察者 {} 評估/{} 略過/{} 失敗, 判定 {} (距離 {} 角度 {} 射線 {} 遮蔽 {}), 變更 {}+{}, 登錄 +{} -{} 清除 {}",
            self.tick,
            self.revealers_due,
            self.revealers_skipped,
            self.revealers_failed,
            self.evaluations,
            self.range_rejections,
            self.cone_rejections,
            self.rays_cast,
            self.occluded,
            self.visibility_changes,
            self.strength_changes,
            self.added,
            self.removed,
            self.purged,
        )
    }
}
