use serde::{Deserialize, Serialize};

use crate::comp::{HiddenHandle, RevealerId};

/// 迷霧系統對外廣播的事件
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum FogEvent {
    /// 可見狀態翻轉
    VisibilityChanged {
        handle: HiddenHandle,
        visible: bool,
        strength: f32,
    },
    /// 仍然可見，但感知強度變化超過門檻
    StrengthChanged {
        handle: HiddenHandle,
        strength: f32,
    },
    /// 物件未註銷就被銷毀，已從登錄表清除
    EntryPurged { handle: HiddenHandle },
    /// 觀察者的姿態來源已消失
    RevealerPruned { revealer: RevealerId },
}

impl FogEvent {
    pub fn handle(&self) -> Option<HiddenHandle> {
        match self {
            FogEvent::VisibilityChanged { handle, .. }
            | FogEvent::StrengthChanged { handle, .. }
            | FogEvent::EntryPurged { handle } => Some(*handle),
            FogEvent::RevealerPruned { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json() {
        let event = FogEvent::VisibilityChanged { handle: HiddenHandle(4), visible: true, strength: 0.5 };
        let text = serde_json::to_string(&event).unwrap();
        assert_eq!(text, r#"{"t":"visibility_changed","handle":4,"visible":true,"strength":0.5}"#);
        assert_eq!(event.handle(), Some(HiddenHandle(4)));
    }
}
