/// 遮蔽物
///
/// 障礙物以水平面上的輪廓加上垂直範圍描述；
/// 3D 射線先投影到 XZ 平面求輪廓區間，再與高度區間取交集。

use std::collections::BTreeMap;

use log::{debug, trace};
use vek::{Vec2, Vec3};

use crate::vision::geometry_utils::GeometryUtils;
use crate::vision::quadtree::{Bounds, QuadTree};

/// 圖層遮罩，對應場景中的碰撞層
pub type LayerMask = u32;

pub const ALL_LAYERS: LayerMask = u32::MAX;
pub const DEFAULT_LAYER: LayerMask = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(pub u32);

/// 障礙物輪廓（水平面）
#[derive(Debug, Clone, PartialEq)]
pub enum ObstacleType {
    /// 無厚度的牆面
    Wall { start: Vec2<f32>, end: Vec2<f32> },
    Circular { center: Vec2<f32>, radius: f32 },
    Rectangle { center: Vec2<f32>, half_extents: Vec2<f32>, rotation: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleInfo {
    pub obstacle_type: ObstacleType,
    /// 底部高度
    pub base: f32,
    /// 頂部高度
    pub top: f32,
    pub layer: LayerMask,
}

/// 射線命中結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Vec3<f32>,
    pub obstacle: Option<ObstacleId>,
}

impl ObstacleInfo {
    fn with_type(obstacle_type: ObstacleType) -> Self {
        Self {
            obstacle_type,
            base: f32::NEG_INFINITY,
            top: f32::INFINITY,
            layer: DEFAULT_LAYER,
        }
    }

    /// 牆面，輸入的 y 會被忽略
    pub fn wall(start: Vec3<f32>, end: Vec3<f32>) -> Self {
        Self::with_type(ObstacleType::Wall {
            start: GeometryUtils::horizontal(start),
            end: GeometryUtils::horizontal(end),
        })
    }

    pub fn circular(center: Vec3<f32>, radius: f32) -> Self {
        Self::with_type(ObstacleType::Circular {
            center: GeometryUtils::horizontal(center),
            radius: radius.abs(),
        })
    }

    /// rotation 為繞 y 軸的弧度
    pub fn rectangle(center: Vec3<f32>, half_extents: Vec2<f32>, rotation: f32) -> Self {
        Self::with_type(ObstacleType::Rectangle {
            center: GeometryUtils::horizontal(center),
            half_extents: half_extents.map(f32::abs),
            rotation,
        })
    }

    /// 設定垂直範圍
    pub fn with_vertical_span(mut self, base: f32, height: f32) -> Self {
        self.base = base;
        self.top = base + height.max(0.0);
        self
    }

    pub fn with_layer(mut self, layer: LayerMask) -> Self {
        self.layer = layer;
        self
    }

    pub fn footprint_bounds(&self) -> Bounds {
        match &self.obstacle_type {
            ObstacleType::Wall { start, end } => Bounds::from_points(*start, *end),
            ObstacleType::Circular { center, radius } => Bounds::around(*center, Vec2::broadcast(*radius)),
            ObstacleType::Rectangle { center, half_extents, .. } => {
                // 旋轉後的外接圓
                Bounds::around(*center, Vec2::broadcast(half_extents.magnitude()))
            }
        }
    }

    fn footprint_contains(&self, point: Vec2<f32>) -> bool {
        match &self.obstacle_type {
            ObstacleType::Wall { .. } => false,
            ObstacleType::Circular { center, radius } => GeometryUtils::point_in_circle(point, *center, *radius),
            ObstacleType::Rectangle { center, half_extents, rotation } => {
                GeometryUtils::point_in_rect(point, *center, *half_extents, *rotation)
            }
        }
    }

    fn footprint_interval(&self, origin: Vec2<f32>, direction: Vec2<f32>) -> Option<(f32, f32)> {
        if direction.magnitude_squared() < GeometryUtils::EPSILON * GeometryUtils::EPSILON {
            // 垂直射線：在輪廓內就整段重疊
            return self
                .footprint_contains(origin)
                .then_some((f32::NEG_INFINITY, f32::INFINITY));
        }
        match &self.obstacle_type {
            ObstacleType::Wall { start, end } => {
                GeometryUtils::ray_segment_intersection(origin, direction, *start, *end).map(|t| (t, t))
            }
            ObstacleType::Circular { center, radius } => {
                GeometryUtils::ray_circle_interval(origin, direction, *center, *radius)
            }
            ObstacleType::Rectangle { center, half_extents, rotation } => {
                GeometryUtils::ray_rect_interval(origin, direction, *center, *half_extents, *rotation)
            }
        }
    }

    fn vertical_interval(&self, origin_y: f32, direction_y: f32) -> Option<(f32, f32)> {
        if direction_y.abs() < GeometryUtils::EPSILON {
            return (origin_y >= self.base && origin_y <= self.top)
                .then_some((f32::NEG_INFINITY, f32::INFINITY));
        }
        let t1 = (self.base - origin_y) / direction_y;
        let t2 = (self.top - origin_y) / direction_y;
        Some((t1.min(t2), t1.max(t2)))
    }

    /// 射線進入障礙物的距離
    ///
    /// direction 必須是單位向量。起點已經在障礙物內時不算命中。
    pub fn ray_entry(&self, origin: Vec3<f32>, direction: Vec3<f32>) -> Option<f32> {
        let (f0, f1) = self.footprint_interval(
            GeometryUtils::horizontal(origin),
            GeometryUtils::horizontal(direction),
        )?;
        let (v0, v1) = self.vertical_interval(origin.y, direction.y)?;

        let enter = f0.max(v0);
        let exit = f1.min(v1);
        if enter > exit || exit < 0.0 || enter < 0.0 {
            return None;
        }
        Some(enter)
    }
}

/// 視線遮蔽查詢
pub trait Occluder {
    /// 沿 direction（單位向量）投射射線，回傳 max_distance 內最近的命中
    fn raycast(
        &self,
        origin: Vec3<f32>,
        direction: Vec3<f32>,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RayHit>;
}

/// 沒有任何遮蔽物的場景
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenField;

impl Occluder for OpenField {
    fn raycast(&self, _: Vec3<f32>, _: Vec3<f32>, _: f32, _: LayerMask) -> Option<RayHit> {
        None
    }
}

impl<O: Occluder + ?Sized> Occluder for Box<O> {
    fn raycast(&self, origin: Vec3<f32>, direction: Vec3<f32>, max_distance: f32, layers: LayerMask) -> Option<RayHit> {
        (**self).raycast(origin, direction, max_distance, layers)
    }
}

/// 障礙物集合，以四叉樹加速射線查詢
#[derive(Debug, Clone, Default)]
pub struct ObstacleMap {
    obstacles: BTreeMap<ObstacleId, ObstacleInfo>,
    quadtree: QuadTree,
    next_id: u32,
}

impl ObstacleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_obstacles<I: IntoIterator<Item = ObstacleInfo>>(obstacles: I) -> Self {
        let mut map = Self::new();
        for info in obstacles {
            map.obstacles.insert(ObstacleId(map.next_id), info);
            map.next_id += 1;
        }
        map.rebuild();
        map
    }

    pub fn insert(&mut self, info: ObstacleInfo) -> ObstacleId {
        let id = ObstacleId(self.next_id);
        self.next_id += 1;
        self.obstacles.insert(id, info);
        self.rebuild();
        id
    }

    pub fn remove(&mut self, id: ObstacleId) -> Option<ObstacleInfo> {
        let removed = self.obstacles.remove(&id);
        if removed.is_some() {
            self.rebuild();
        }
        removed
    }

    pub fn get(&self, id: ObstacleId) -> Option<&ObstacleInfo> {
        self.obstacles.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObstacleId, &ObstacleInfo)> {
        self.obstacles.iter().map(|(id, info)| (*id, info))
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.quadtree.count_nodes()
    }

    fn rebuild(&mut self) {
        let items = self
            .obstacles
            .iter()
            .map(|(id, info)| (*id, info.footprint_bounds()))
            .collect();
        self.quadtree.rebuild(items);
        debug!("障礙物索引重建: {} 個障礙物, {} 個節點", self.obstacles.len(), self.quadtree.count_nodes());
    }
}

impl Occluder for ObstacleMap {
    fn raycast(
        &self,
        origin: Vec3<f32>,
        direction: Vec3<f32>,
        max_distance: f32,
        layers: LayerMask,
    ) -> Option<RayHit> {
        let end = origin + direction * max_distance;
        let area = Bounds::from_points(GeometryUtils::horizontal(origin), GeometryUtils::horizontal(end));

        let mut nearest: Option<RayHit> = None;
        for id in self.quadtree.query(&area) {
            let Some(info) = self.obstacles.get(&id) else { continue };
            if info.layer & layers == 0 {
                continue;
            }
            let Some(distance) = info.ray_entry(origin, direction) else { continue };
            if distance > max_distance {
                continue;
            }
            if nearest.map_or(true, |hit| distance < hit.distance) {
                nearest = Some(RayHit {
                    distance,
                    point: origin + direction * distance,
                    obstacle: Some(id),
                });
            }
        }
        trace!("射線 {:?} -> {:?}: {:?}", origin, direction, nearest);
        nearest
    }
}
