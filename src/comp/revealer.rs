use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use vek::Vec3;

/// 觀察者識別碼，由管理器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevealerId(pub u32);

impl fmt::Display for RevealerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "revealer#{}", self.0)
    }
}

/// 觀察者的姿態來源
///
/// 管理器每次評估時讀取位置與朝向；只有朝向的水平分量影響視錐。
pub trait RevealerBinding: Send + Sync {
    fn position(&self) -> Vec3<f32>;
    fn forward(&self) -> Vec3<f32>;
}

/// 可由外部移動的簡單觀察者（瞭望塔、攝影機、測試用）
#[derive(Debug)]
pub struct FixedRevealer {
    pose: RwLock<(Vec3<f32>, Vec3<f32>)>,
}

impl FixedRevealer {
    pub fn new(position: Vec3<f32>, forward: Vec3<f32>) -> Self {
        Self {
            pose: RwLock::new((position, forward)),
        }
    }

    pub fn move_to(&self, position: Vec3<f32>) {
        self.pose.write().0 = position;
    }

    pub fn face(&self, forward: Vec3<f32>) {
        self.pose.write().1 = forward;
    }
}

impl RevealerBinding for FixedRevealer {
    fn position(&self) -> Vec3<f32> {
        self.pose.read().0
    }

    fn forward(&self) -> Vec3<f32> {
        self.pose.read().1
    }
}
