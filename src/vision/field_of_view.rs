/// 視錐取樣
///
/// 判定順序固定為：距離 → 水平角度 → 射線遮蔽。
/// 前兩項是便宜的過濾，只有通過的目標才需要投射射線。

use std::f32::consts::PI;

use vek::{Vec2, Vec3};

use crate::comp::profile::{RevealerProfile, MAX_FOV_DEGREES};
use crate::fog::error::{FogError, InvalidRevealerState};
use crate::vision::geometry_utils::GeometryUtils;
use crate::vision::obstacle::{LayerMask, Occluder, RayHit, ALL_LAYERS};

/// 命中距離比目標近超過此值才算被擋住
pub const OCCLUSION_TOLERANCE: f32 = 1e-4;

/// 單一目標的判定結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sighting {
    OutOfRange { normalized_distance: f32 },
    OutsideCone { normalized_distance: f32, off_axis_degrees: f32 },
    Occluded { normalized_distance: f32, hit: RayHit },
    Visible { normalized_distance: f32 },
}

impl Sighting {
    pub fn is_visible(&self) -> bool {
        matches!(self, Sighting::Visible { .. })
    }

    /// 目標距離 / 視距
    pub fn normalized_distance(&self) -> f32 {
        match *self {
            Sighting::OutOfRange { normalized_distance }
            | Sighting::OutsideCone { normalized_distance, .. }
            | Sighting::Occluded { normalized_distance, .. }
            | Sighting::Visible { normalized_distance } => normalized_distance,
        }
    }
}

fn is_finite(v: Vec3<f32>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}

/// 已驗證過的視錐
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCone {
    origin: Vec3<f32>,
    forward: Vec2<f32>,
    half_fov: f32,
    cos_half_fov: f32,
    full_circle: bool,
    view_distance: f32,
}

impl ViewCone {
    pub fn new(
        origin: Vec3<f32>,
        forward: Vec3<f32>,
        fov_degrees: f32,
        view_distance: f32,
    ) -> Result<Self, InvalidRevealerState> {
        if !is_finite(origin) || !is_finite(forward) {
            return Err(InvalidRevealerState::NonFinitePose);
        }
        if !(view_distance > 0.0) || !view_distance.is_finite() {
            return Err(InvalidRevealerState::NonPositiveViewDistance(view_distance));
        }
        let forward = GeometryUtils::horizontal_direction(forward).ok_or(InvalidRevealerState::ZeroForward)?;

        let fov = if fov_degrees.is_nan() { MAX_FOV_DEGREES } else { fov_degrees.clamp(0.0, MAX_FOV_DEGREES) };
        let half_fov = fov.to_radians() * 0.5;
        Ok(Self {
            origin,
            forward,
            half_fov,
            cos_half_fov: half_fov.cos(),
            full_circle: fov >= MAX_FOV_DEGREES,
            view_distance,
        })
    }

    pub fn from_profile(
        origin: Vec3<f32>,
        forward: Vec3<f32>,
        profile: &RevealerProfile,
    ) -> Result<Self, InvalidRevealerState> {
        Self::new(origin, forward, profile.fov_degrees(), profile.view_distance())
    }

    pub fn origin(&self) -> Vec3<f32> {
        self.origin
    }

    /// 水平單位朝向
    pub fn forward(&self) -> Vec2<f32> {
        self.forward
    }

    pub fn view_distance(&self) -> f32 {
        self.view_distance
    }

    pub fn fov_degrees(&self) -> f32 {
        (self.half_fov * 2.0).to_degrees()
    }

    pub fn is_full_circle(&self) -> bool {
        self.full_circle
    }

    /// 水平方向是否在視角內；回傳偏離中軸的角度（度）
    ///
    /// 正上方或正下方的目標沒有水平方向，視為在視角內。
    pub fn within_angle(&self, offset: Vec3<f32>) -> (bool, f32) {
        if self.full_circle {
            return (true, 0.0);
        }
        match GeometryUtils::horizontal_direction(offset) {
            None => (true, 0.0),
            Some(dir) => {
                let cos = dir.dot(self.forward).clamp(-1.0, 1.0);
                (cos >= self.cos_half_fov, cos.acos().to_degrees())
            }
        }
    }
}

/// 視錐取樣器，借用場景的遮蔽查詢
pub struct FieldOfViewSampler<'a, O: Occluder + ?Sized> {
    occluder: &'a O,
    layers: LayerMask,
}

impl<'a, O: Occluder + ?Sized> Clone for FieldOfViewSampler<'a, O> {
    fn clone(&self) -> Self {
        Self { occluder: self.occluder, layers: self.layers }
    }
}

impl<'a, O: Occluder + ?Sized> FieldOfViewSampler<'a, O> {
    pub fn new(occluder: &'a O) -> Self {
        Self { occluder, layers: ALL_LAYERS }
    }

    /// 只考慮指定圖層的障礙物
    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn layers(&self) -> LayerMask {
        self.layers
    }

    /// 判定單一目標
    pub fn evaluate(
        &self,
        origin: Vec3<f32>,
        forward: Vec3<f32>,
        profile: &RevealerProfile,
        target: Vec3<f32>,
    ) -> Result<Sighting, FogError> {
        let cone = ViewCone::from_profile(origin, forward, profile)?;
        Ok(self.evaluate_cone(&cone, target))
    }

    /// 以預先驗證過的視錐判定目標
    pub fn evaluate_cone(&self, cone: &ViewCone, target: Vec3<f32>) -> Sighting {
        let offset = target - cone.origin;
        let distance = offset.magnitude();
        if !distance.is_finite() {
            return Sighting::OutOfRange { normalized_distance: f32::INFINITY };
        }
        let normalized_distance = distance / cone.view_distance;

        if distance > cone.view_distance {
            return Sighting::OutOfRange { normalized_distance };
        }

        let (inside, off_axis_degrees) = cone.within_angle(offset);
        if !inside {
            return Sighting::OutsideCone { normalized_distance, off_axis_degrees };
        }

        if distance <= GeometryUtils::EPSILON {
            return Sighting::Visible { normalized_distance };
        }

        let direction = offset / distance;
        match self.occluder.raycast(cone.origin, direction, distance, self.layers) {
            Some(hit) if hit.distance < distance - OCCLUSION_TOLERANCE => {
                Sighting::Occluded { normalized_distance, hit }
            }
            _ => Sighting::Visible { normalized_distance },
        }
    }

    /// 沿視錐邊界取樣，供除錯繪製或網格生成使用
    pub fn sample_boundary(
        &self,
        origin: Vec3<f32>,
        forward: Vec3<f32>,
        profile: &RevealerProfile,
    ) -> Result<BoundarySamples<'a, O>, FogError> {
        let cone = ViewCone::from_profile(origin, forward, profile)?;
        Ok(BoundarySamples::new(
            self.occluder,
            self.layers,
            &cone,
            FanOffsets::Lazy { fov_degrees: profile.fov_degrees(), count: profile.ray_count() as usize },
        ))
    }

    /// 使用快取的射線扇形取樣
    pub fn sample_boundary_with<'f>(&self, cone: &ViewCone, fan: &'f RayFan) -> BoundarySamples<'f, O>
    where
        'a: 'f,
    {
        BoundarySamples::new(self.occluder, self.layers, cone, FanOffsets::Cached(&fan.offsets))
    }
}

/// 邊界上的一個取樣點
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundarySample {
    /// 水平單位方向
    pub direction: Vec3<f32>,
    /// 射線終點（命中點或視距邊緣）
    pub point: Vec3<f32>,
    pub distance: f32,
    pub blocked: bool,
}

/// 第 i 條射線相對朝向的偏航角
///
/// 未滿 360 度時包含兩側邊緣；360 度時均分一圈、不重複起點。
pub fn fan_offset_angle(fov_degrees: f32, count: usize, index: usize) -> f32 {
    if fov_degrees >= MAX_FOV_DEGREES {
        return -PI + index as f32 * (2.0 * PI / count.max(1) as f32);
    }
    if count <= 1 {
        return 0.0;
    }
    let fov = fov_degrees.to_radians();
    -fov * 0.5 + index as f32 * fov / (count - 1) as f32
}

/// 預先計算好的射線偏移（sin, cos），依設定檔版本快取
#[derive(Debug, Clone, PartialEq)]
pub struct RayFan {
    revision: u64,
    fov_degrees: f32,
    offsets: Vec<(f32, f32)>,
}

impl RayFan {
    pub fn build(fov_degrees: f32, ray_count: u32, revision: u64) -> Self {
        let count = ray_count as usize;
        let offsets = (0..count)
            .map(|i| fan_offset_angle(fov_degrees, count, i).sin_cos())
            .collect();
        Self { revision, fov_degrees, offsets }
    }

    pub fn for_profile(profile: &RevealerProfile) -> Self {
        Self::build(profile.fov_degrees(), profile.ray_count(), profile.revision())
    }

    /// 設定檔沒變就可以沿用
    pub fn is_current(&self, profile: &RevealerProfile) -> bool {
        self.revision == profile.revision()
            && self.fov_degrees == profile.fov_degrees()
            && self.offsets.len() == profile.ray_count() as usize
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
enum FanOffsets<'f> {
    Lazy { fov_degrees: f32, count: usize },
    Cached(&'f [(f32, f32)]),
}

impl FanOffsets<'_> {
    fn len(&self) -> usize {
        match self {
            FanOffsets::Lazy { count, .. } => *count,
            FanOffsets::Cached(offsets) => offsets.len(),
        }
    }

    fn get(&self, index: usize) -> (f32, f32) {
        match self {
            FanOffsets::Lazy { fov_degrees, count } => fan_offset_angle(*fov_degrees, *count, index).sin_cos(),
            FanOffsets::Cached(offsets) => offsets[index],
        }
    }
}

/// 邊界取樣的惰性迭代器，clone 即可重新走一次
pub struct BoundarySamples<'f, O: Occluder + ?Sized> {
    occluder: &'f O,
    layers: LayerMask,
    origin: Vec3<f32>,
    forward: Vec2<f32>,
    right: Vec2<f32>,
    view_distance: f32,
    offsets: FanOffsets<'f>,
    index: usize,
}

impl<'f, O: Occluder + ?Sized> Clone for BoundarySamples<'f, O> {
    fn clone(&self) -> Self {
        Self {
            occluder: self.occluder,
            layers: self.layers,
            origin: self.origin,
            forward: self.forward,
            right: self.right,
            view_distance: self.view_distance,
            offsets: self.offsets,
            index: self.index,
        }
    }
}

impl<'f, O: Occluder + ?Sized> BoundarySamples<'f, O> {
    fn new(occluder: &'f O, layers: LayerMask, cone: &ViewCone, offsets: FanOffsets<'f>) -> Self {
        Self {
            occluder,
            layers,
            origin: cone.origin,
            forward: cone.forward,
            right: GeometryUtils::right_of(cone.forward),
            view_distance: cone.view_distance,
            offsets,
            index: 0,
        }
    }

    /// 回到第一條射線
    pub fn restart(&mut self) {
        self.index = 0;
    }
}

impl<'f, O: Occluder + ?Sized> Iterator for BoundarySamples<'f, O> {
    type Item = BoundarySample;

    fn next(&mut self) -> Option<BoundarySample> {
        if self.index >= self.offsets.len() {
            return None;
        }
        let (sin, cos) = self.offsets.get(self.index);
        self.index += 1;

        let flat = self.forward * cos + self.right * sin;
        let direction = Vec3::new(flat.x, 0.0, flat.y);
        let hit = self.occluder.raycast(self.origin, direction, self.view_distance, self.layers);
        let distance = hit.map_or(self.view_distance, |h| h.distance);
        Some(BoundarySample {
            direction,
            point: self.origin + direction * distance,
            distance,
            blocked: hit.is_some(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.offsets.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'f, O: Occluder + ?Sized> ExactSizeIterator for BoundarySamples<'f, O> {}
