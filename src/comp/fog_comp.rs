use specs::{Component, DenseVecStorage, VecStorage};
use vek::Vec3;

use crate::comp::profile::SharedProfile;

/// 世界座標
#[derive(Component, Debug, Clone, Copy, PartialEq)]
#[storage(VecStorage)]
pub struct Pos(pub Vec3<f32>);

/// 朝向，只使用水平分量
#[derive(Component, Debug, Clone, Copy, PartialEq)]
#[storage(VecStorage)]
pub struct Facing(pub Vec3<f32>);

/// 可揭露迷霧的實體；每份設定檔對應一個視錐
#[derive(Component, Debug, Clone)]
#[storage(DenseVecStorage)]
pub struct FogRevealer {
    pub profiles: Vec<SharedProfile>,
}

impl FogRevealer {
    pub fn new(profile: SharedProfile) -> Self {
        Self { profiles: vec![profile] }
    }

    pub fn with_profile(mut self, profile: SharedProfile) -> Self {
        self.profiles.push(profile);
        self
    }
}

/// 會被迷霧隱藏的實體，由系統回寫結果
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
#[storage(VecStorage)]
pub struct HiddenInFog {
    pub visible: bool,
    pub strength: f32,
}

/// 本 tick 經過的秒數
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);
