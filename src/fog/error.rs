use hashbrown::HashSet;
use log::{error, info};
use thiserror::Error;

use crate::comp::{HiddenHandle, RevealerId};

/// 觀察者姿態或設定無法建立視錐
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidRevealerState {
    #[error("朝向沒有水平分量，無法決定視錐方向")]
    ZeroForward,
    #[error("位置或朝向包含非有限數值")]
    NonFinitePose,
    #[error("視距必須為正數，目前為 {0}")]
    NonPositiveViewDistance(f32),
}

impl InvalidRevealerState {
    /// 錯誤種類，用來去除重複的日誌
    pub fn kind(&self) -> &'static str {
        match self {
            InvalidRevealerState::ZeroForward => "zero_forward",
            InvalidRevealerState::NonFinitePose => "non_finite_pose",
            InvalidRevealerState::NonPositiveViewDistance(_) => "non_positive_view_distance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FogError {
    #[error("觀察者狀態不合法: {0}")]
    InvalidRevealerState(#[from] InvalidRevealerState),
    #[error("{0} 已經註冊過")]
    DuplicateHandle(HiddenHandle),
    #[error("{0} 在註銷前就被銷毀")]
    DefunctEntry(HiddenHandle),
}

/// 同一個觀察者持續出錯時只記錄一次，恢復後才重新記錄
#[derive(Debug, Default)]
pub struct ErrorLatch {
    active: HashSet<(RevealerId, &'static str)>,
}

impl ErrorLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 回傳 true 代表這是新的一次錯誤
    pub fn trip(&mut self, revealer: RevealerId, state: &InvalidRevealerState) -> bool {
        let fresh = self.active.insert((revealer, state.kind()));
        if fresh {
            error!("{} 無法評估: {}", revealer, state);
        }
        fresh
    }

    /// 觀察者成功評估後解除鎖定
    pub fn clear(&mut self, revealer: RevealerId) -> bool {
        let before = self.active.len();
        self.active.retain(|(id, _)| *id != revealer);
        let recovered = self.active.len() != before;
        if recovered {
            info!("{} 已恢復正常評估", revealer);
        }
        recovered
    }

    pub fn forget(&mut self, revealer: RevealerId) {
        self.active.retain(|(id, _)| *id != revealer);
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }
}
