/// 感知衰減曲線
///
/// 把「目標距離 / 視野距離」映射到 [0, 1] 的感知強度。
/// 關鍵點依 t 排序，輸出值會沿著首尾方向強制單調。

use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveKey {
    pub t: f32,
    pub strength: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<[f32; 2]>", into = "Vec<[f32; 2]>")]
pub struct PerceptionCurve {
    keys: Vec<CurveKey>,
}

impl PerceptionCurve {
    /// 由 (t, strength) 關鍵點建立曲線，非法值會被修正
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut keys: Vec<CurveKey> = points
            .into_iter()
            .filter(|(t, s)| t.is_finite() && s.is_finite())
            .map(|(t, s)| CurveKey {
                t: t.clamp(0.0, 1.0),
                strength: s.clamp(0.0, 1.0),
            })
            .collect();

        if keys.is_empty() {
            return Self::constant(1.0);
        }

        keys.sort_by(|a, b| a.t.total_cmp(&b.t));
        // 相同 t 只保留最後一個
        keys.dedup_by(|later, earlier| {
            if later.t == earlier.t {
                earlier.strength = later.strength;
                true
            } else {
                false
            }
        });

        let mut corrected = 0;
        let first = keys[0].strength;
        let last = keys[keys.len() - 1].strength;
        let falling = last <= first;
        for i in 1..keys.len() {
            let prev = keys[i - 1].strength;
            let current = keys[i].strength;
            let fixed = if falling { current.min(prev) } else { current.max(prev) };
            if fixed != current {
                keys[i].strength = fixed;
                corrected += 1;
            }
        }
        if corrected > 0 {
            warn!("感知曲線不單調，已修正 {} 個關鍵點", corrected);
        }

        Self { keys }
    }

    /// 固定強度
    pub fn constant(strength: f32) -> Self {
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 1.0 };
        Self {
            keys: vec![CurveKey { t: 0.0, strength }],
        }
    }

    /// 從近處 1.0 線性衰減到邊緣 0.0
    pub fn linear_falloff() -> Self {
        Self::new([(0.0, 1.0), (1.0, 0.0)])
    }

    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// 取樣曲線，t 會先夾到 [0, 1]
    pub fn evaluate(&self, normalized_distance: f32) -> f32 {
        let t = if normalized_distance.is_nan() {
            1.0
        } else {
            normalized_distance.clamp(0.0, 1.0)
        };

        let idx = self.keys.partition_point(|k| k.t <= t);
        if idx == 0 {
            return self.keys[0].strength;
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].strength;
        }

        let a = self.keys[idx - 1];
        let b = self.keys[idx];
        let span = b.t - a.t;
        if span <= f32::EPSILON {
            return b.strength;
        }
        let ratio = (t - a.t) / span;
        (a.strength + (b.strength - a.strength) * ratio).clamp(0.0, 1.0)
    }

    pub fn is_monotonic(&self) -> bool {
        let rising = self.keys.windows(2).all(|w| w[1].strength >= w[0].strength);
        let falling = self.keys.windows(2).all(|w| w[1].strength <= w[0].strength);
        rising || falling
    }
}

impl Default for PerceptionCurve {
    fn default() -> Self {
        Self::linear_falloff()
    }
}

impl From<Vec<[f32; 2]>> for PerceptionCurve {
    fn from(points: Vec<[f32; 2]>) -> Self {
        Self::new(points.into_iter().map(|[t, s]| (t, s)))
    }
}

impl From<PerceptionCurve> for Vec<[f32; 2]> {
    fn from(curve: PerceptionCurve) -> Self {
        curve.keys.iter().map(|k| [k.t, k.strength]).collect()
    }
}
