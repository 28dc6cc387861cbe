use std::f32::consts::PI;

use vek::{Vec2, Vec3};

/// 水平面（XZ）幾何工具
///
/// 2D 向量的 x 對應世界 x，y 對應世界 z。
pub struct GeometryUtils;

impl GeometryUtils {
    pub const EPSILON: f32 = 1e-5;

    /// 投影到水平面
    pub fn horizontal(v: Vec3<f32>) -> Vec2<f32> {
        Vec2::new(v.x, v.z)
    }

    /// 水平方向的單位向量；幾乎垂直時回傳 None
    pub fn horizontal_direction(v: Vec3<f32>) -> Option<Vec2<f32>> {
        let flat = Self::horizontal(v);
        let len = flat.magnitude();
        if !len.is_finite() || len < Self::EPSILON {
            return None;
        }
        Some(flat / len)
    }

    /// 水平方向的右手向量，+Z 朝前時為 +X
    pub fn right_of(forward: Vec2<f32>) -> Vec2<f32> {
        Vec2::new(forward.y, -forward.x)
    }

    /// 偏航角（弧度），+Z 為 0，往 +X 為正
    pub fn yaw_of(direction: Vec2<f32>) -> f32 {
        direction.x.atan2(direction.y)
    }

    pub fn direction_from_yaw(yaw: f32) -> Vec3<f32> {
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    /// 兩個水平方向的夾角（弧度，0..=π）
    pub fn angle_between(a: Vec2<f32>, b: Vec2<f32>) -> f32 {
        let cross = a.x * b.y - a.y * b.x;
        let dot = a.dot(b);
        cross.abs().atan2(dot)
    }

    /// 計算角度差（考慮環形性質）
    pub fn angle_difference(angle1: f32, angle2: f32) -> f32 {
        let diff = Self::normalize_angle(angle2 - angle1);
        if diff > PI {
            diff - 2.0 * PI
        } else {
            diff
        }
    }

    /// 標準化角度到 [0, 2π) 範圍
    pub fn normalize_angle(angle: f32) -> f32 {
        let wrapped = angle.rem_euclid(2.0 * PI);
        if wrapped >= 2.0 * PI {
            0.0
        } else {
            wrapped
        }
    }

    pub fn rotate(v: Vec2<f32>, angle: f32) -> Vec2<f32> {
        let (sin, cos) = angle.sin_cos();
        Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
    }

    /// 射線與線段相交，回傳射線參數 t（以 direction 的長度為單位）
    pub fn ray_segment_intersection(
        origin: Vec2<f32>,
        direction: Vec2<f32>,
        start: Vec2<f32>,
        end: Vec2<f32>,
    ) -> Option<f32> {
        let edge = end - start;
        let cross = direction.x * edge.y - direction.y * edge.x;

        if cross.abs() < 1e-8 {
            return None; // 平行
        }

        let to_start = start - origin;
        let t = (to_start.x * edge.y - to_start.y * edge.x) / cross;
        let u = (to_start.x * direction.y - to_start.y * direction.x) / cross;

        if t >= 0.0 && (0.0..=1.0).contains(&u) {
            Some(t)
        } else {
            None
        }
    }

    /// 射線與圓的進出參數
    pub fn ray_circle_interval(
        origin: Vec2<f32>,
        direction: Vec2<f32>,
        center: Vec2<f32>,
        radius: f32,
    ) -> Option<(f32, f32)> {
        let a = direction.magnitude_squared();
        if a < Self::EPSILON * Self::EPSILON {
            return None;
        }
        let f = origin - center;
        let b = 2.0 * f.dot(direction);
        let c = f.magnitude_squared() - radius * radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        Some(((-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)))
    }

    /// 射線與旋轉矩形的進出參數（slab 法）
    pub fn ray_rect_interval(
        origin: Vec2<f32>,
        direction: Vec2<f32>,
        center: Vec2<f32>,
        half_extents: Vec2<f32>,
        rotation: f32,
    ) -> Option<(f32, f32)> {
        let local_origin = Self::rotate(origin - center, -rotation);
        let local_dir = Self::rotate(direction, -rotation);

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for (o, d, h) in [
            (local_origin.x, local_dir.x, half_extents.x),
            (local_origin.y, local_dir.y, half_extents.y),
        ] {
            if d.abs() < Self::EPSILON {
                if o.abs() > h {
                    return None;
                }
                continue;
            }
            let t1 = (-h - o) / d;
            let t2 = (h - o) / d;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
        }

        if t_min > t_max {
            None
        } else {
            Some((t_min, t_max))
        }
    }

    /// 檢查點是否在圓形內
    pub fn point_in_circle(point: Vec2<f32>, center: Vec2<f32>, radius: f32) -> bool {
        point.distance_squared(center) <= radius * radius
    }

    /// 檢查點是否在旋轉矩形內
    pub fn point_in_rect(point: Vec2<f32>, center: Vec2<f32>, half_extents: Vec2<f32>, rotation: f32) -> bool {
        let local = Self::rotate(point - center, -rotation);
        local.x.abs() <= half_extents.x && local.y.abs() <= half_extents.y
    }
}
