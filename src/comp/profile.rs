/// 觀察者設定檔
///
/// 一份設定檔描述一個視錐：視角、視距、更新週期、射線數與感知曲線。
/// 多個觀察者可以共用同一份 `SharedProfile`，修改後所有訂閱者都會收到通知。

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};

use crate::comp::distance_curve::DistanceScaleCurve;
use crate::comp::perception_curve::PerceptionCurve;
use crate::config::validation::{clamp_count, clamp_field, log_issues, Validate, ValidationIssue};

pub const MIN_FOV_DEGREES: f32 = 10.0;
pub const MAX_FOV_DEGREES: f32 = 360.0;
pub const MIN_VIEW_DISTANCE: f32 = 1.0;
pub const MIN_RAY_COUNT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealerProfile {
    /// 視角（度），夾在 [10, 360]
    fov_degrees: f32,
    /// 視距，至少 1
    view_distance: f32,
    /// 兩次評估間最少經過的秒數，0 表示每個 tick 都評估
    update_rate_period: f32,
    /// 邊界取樣的射線數量，至少 3
    ray_count: u32,
    /// 靜態觀察者的視野區域固定，只在設定或障礙物變動時重新擷取；
    /// 區域內的物件仍然每個 tick 檢查
    is_static: bool,
    perception_falloff: Option<PerceptionCurve>,
    /// 依觀察者到錨點的距離縮放視距
    view_distance_curve: Option<DistanceScaleCurve>,
    #[serde(skip)]
    revision: u64,
}

impl Default for RevealerProfile {
    fn default() -> Self {
        Self {
            fov_degrees: 90.0,
            view_distance: 10.0,
            update_rate_period: 0.1,
            ray_count: 50,
            is_static: false,
            perception_falloff: None,
            view_distance_curve: None,
            revision: 0,
        }
    }
}

impl RevealerProfile {
    pub fn new(fov_degrees: f32, view_distance: f32) -> Self {
        let mut profile = Self {
            fov_degrees,
            view_distance,
            ..Default::default()
        };
        profile.validate_and_log();
        profile
    }

    pub fn with_update_rate_period(mut self, seconds: f32) -> Self {
        self.update_rate_period = seconds;
        self.validate_and_log();
        self
    }

    pub fn with_ray_count(mut self, ray_count: u32) -> Self {
        self.ray_count = ray_count;
        self.validate_and_log();
        self
    }

    pub fn with_perception_falloff(mut self, curve: PerceptionCurve) -> Self {
        self.perception_falloff = Some(curve);
        self
    }

    pub fn with_view_distance_curve(mut self, curve: DistanceScaleCurve) -> Self {
        self.view_distance_curve = Some(curve);
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn view_distance(&self) -> f32 {
        self.view_distance
    }

    pub fn update_rate_period(&self) -> f32 {
        self.update_rate_period
    }

    pub fn update_period(&self) -> Duration {
        Duration::try_from_secs_f32(self.update_rate_period).unwrap_or(Duration::MAX)
    }

    pub fn ray_count(&self) -> u32 {
        self.ray_count
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_full_circle(&self) -> bool {
        self.fov_degrees >= MAX_FOV_DEGREES
    }

    pub fn perception_falloff(&self) -> Option<&PerceptionCurve> {
        self.perception_falloff.as_ref()
    }

    pub fn view_distance_curve(&self) -> Option<&DistanceScaleCurve> {
        self.view_distance_curve.as_ref()
    }

    /// 每次參數實際改變時遞增
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// 依正規化距離取得感知強度，沒有曲線時恆為 1
    pub fn perception_strength(&self, normalized_distance: f32) -> f32 {
        self.perception_falloff
            .as_ref()
            .map_or(1.0, |curve| curve.evaluate(normalized_distance))
    }

    pub fn set_fov_degrees(&mut self, fov_degrees: f32) -> bool {
        self.mutate(|p| p.fov_degrees = fov_degrees)
    }

    pub fn set_view_distance(&mut self, view_distance: f32) -> bool {
        self.mutate(|p| p.view_distance = view_distance)
    }

    pub fn set_update_rate_period(&mut self, seconds: f32) -> bool {
        self.mutate(|p| p.update_rate_period = seconds)
    }

    pub fn set_ray_count(&mut self, ray_count: u32) -> bool {
        self.mutate(|p| p.ray_count = ray_count)
    }

    pub fn set_static(&mut self, is_static: bool) -> bool {
        self.mutate(|p| p.is_static = is_static)
    }

    pub fn set_perception_falloff(&mut self, curve: Option<PerceptionCurve>) -> bool {
        self.mutate(|p| p.perception_falloff = curve)
    }

    pub fn set_view_distance_curve(&mut self, curve: Option<DistanceScaleCurve>) -> bool {
        self.mutate(|p| p.view_distance_curve = curve)
    }

    /// 套用執行期調整量，結果仍然在合法範圍內
    ///
    /// 版本號沿用原本的值，調整不算設定檔本身的變更。
    pub fn adjusted(&self, fov_delta: f32, distance_delta: f32) -> Self {
        let mut profile = self.clone();
        if fov_delta == 0.0 && distance_delta == 0.0 {
            return profile;
        }
        profile.fov_degrees += fov_delta;
        profile.view_distance += distance_delta;
        let issues = profile.validate();
        if !issues.is_empty() {
            debug!("觀察者調整量超出範圍，已夾住 {} 個欄位", issues.len());
        }
        profile
    }

    /// 依到錨點的距離縮放視距，沒有曲線時原樣回傳
    ///
    /// 縮放後的視距仍然至少是 `MIN_VIEW_DISTANCE`；版本號不變。
    pub fn scaled_by_anchor_distance(&self, anchor_distance: f32) -> Self {
        let mut profile = self.clone();
        let Some(curve) = self.view_distance_curve.as_ref() else {
            return profile;
        };
        let multiplier = curve.evaluate(anchor_distance);
        if multiplier == 1.0 {
            return profile;
        }
        profile.view_distance *= multiplier;
        let issues = profile.validate();
        if !issues.is_empty() {
            debug!("視距倍率 {:.2} 超出範圍，已夾住", multiplier);
        }
        profile
    }

    /// 除了版本號以外的參數是否相同
    pub fn same_parameters(&self, other: &Self) -> bool {
        self.fov_degrees == other.fov_degrees
            && self.view_distance == other.view_distance
            && self.update_rate_period == other.update_rate_period
            && self.ray_count == other.ray_count
            && self.is_static == other.is_static
            && self.perception_falloff == other.perception_falloff
            && self.view_distance_curve == other.view_distance_curve
    }

    fn mutate(&mut self, f: impl FnOnce(&mut Self)) -> bool {
        let before = self.clone();
        f(self);
        self.validate_and_log();
        let changed = !self.same_parameters(&before);
        if changed {
            self.revision = before.revision.wrapping_add(1);
        }
        changed
    }

    fn validate_and_log(&mut self) {
        let issues = self.validate();
        log_issues("觀察者設定檔", &issues);
    }
}

impl Validate for RevealerProfile {
    fn validate(&mut self) -> Vec<ValidationIssue> {
        [
            clamp_field("fov_degrees", &mut self.fov_degrees, MIN_FOV_DEGREES, MAX_FOV_DEGREES, 90.0),
            clamp_field("view_distance", &mut self.view_distance, MIN_VIEW_DISTANCE, f32::MAX, MIN_VIEW_DISTANCE),
            clamp_field("update_rate_period", &mut self.update_rate_period, 0.0, f32::MAX, 0.0),
            clamp_count("ray_count", &mut self.ray_count, MIN_RAY_COUNT),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// 設定檔變更通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileChanged {
    pub revision: u64,
}

/// 可共用的設定檔，修改時通知所有訂閱者
#[derive(Clone)]
pub struct SharedProfile {
    inner: Arc<RwLock<RevealerProfile>>,
    listeners: Arc<Mutex<Vec<Sender<ProfileChanged>>>>,
}

impl SharedProfile {
    pub fn new(mut profile: RevealerProfile) -> Self {
        let issues = profile.validate();
        log_issues("觀察者設定檔", &issues);
        Self {
            inner: Arc::new(RwLock::new(profile)),
            listeners: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, RevealerProfile> {
        self.inner.read()
    }

    pub fn snapshot(&self) -> RevealerProfile {
        self.inner.read().clone()
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// 修改設定檔；參數有實際變動才會遞增版本並通知
    pub fn edit<R>(&self, f: impl FnOnce(&mut RevealerProfile) -> R) -> R {
        let (result, changed) = {
            let mut guard = self.inner.write();
            let before = guard.clone();
            let result = f(&mut guard);
            let issues = guard.validate();
            log_issues("觀察者設定檔", &issues);
            if guard.same_parameters(&before) {
                guard.revision = before.revision;
                (result, None)
            } else {
                guard.revision = before.revision.wrapping_add(1);
                (result, Some(guard.revision))
            }
        };

        if let Some(revision) = changed {
            self.notify(ProfileChanged { revision });
        }
        result
    }

    pub fn subscribe(&self) -> Receiver<ProfileChanged> {
        let (tx, rx) = unbounded();
        self.listeners.lock().push(tx);
        rx
    }

    /// 兩個 handle 是否指向同一份設定檔
    pub fn same_as(&self, other: &SharedProfile) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn notify(&self, event: ProfileChanged) {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|tx| tx.send(event).is_ok());
        if listeners.len() != before {
            debug!("移除 {} 個已關閉的設定檔訂閱者", before - listeners.len());
        }
    }
}

impl From<RevealerProfile> for SharedProfile {
    fn from(profile: RevealerProfile) -> Self {
        Self::new(profile)
    }
}

impl fmt::Debug for SharedProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedProfile")
            .field("profile", &*self.inner.read())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}
