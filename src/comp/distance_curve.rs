/// 視距倍率曲線
///
/// 把觀察者到錨點（例如跟隨的玩家）的距離映射成視距倍率。
/// 離錨點越遠，視野可以越小；不強制單調。

use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleKey {
    pub distance: f32,
    pub multiplier: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<[f32; 2]>", into = "Vec<[f32; 2]>")]
pub struct DistanceScaleCurve {
    keys: Vec<ScaleKey>,
}

impl DistanceScaleCurve {
    /// 由 (距離, 倍率) 關鍵點建立曲線，負值夾成 0，非有限值捨棄
    pub fn new<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        let mut dropped = 0;
        let mut keys: Vec<ScaleKey> = points
            .into_iter()
            .filter(|(d, m)| {
                let keep = d.is_finite() && m.is_finite();
                if !keep {
                    dropped += 1;
                }
                keep
            })
            .map(|(d, m)| ScaleKey {
                distance: d.max(0.0),
                multiplier: m.max(0.0),
            })
            .collect();
        if dropped > 0 {
            warn!("視距倍率曲線捨棄 {} 個非法關鍵點", dropped);
        }

        if keys.is_empty() {
            return Self::identity();
        }

        keys.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        keys.dedup_by(|later, earlier| {
            if later.distance == earlier.distance {
                earlier.multiplier = later.multiplier;
                true
            } else {
                false
            }
        });

        Self { keys }
    }

    /// 倍率恆為 1
    pub fn identity() -> Self {
        Self {
            keys: vec![ScaleKey {
                distance: 0.0,
                multiplier: 1.0,
            }],
        }
    }

    pub fn keys(&self) -> &[ScaleKey] {
        &self.keys
    }

    /// 取樣曲線，超出首尾關鍵點時沿用端點的倍率
    pub fn evaluate(&self, distance: f32) -> f32 {
        if distance.is_nan() {
            return self.keys[0].multiplier;
        }

        let idx = self.keys.partition_point(|k| k.distance <= distance);
        if idx == 0 {
            return self.keys[0].multiplier;
        }
        if idx >= self.keys.len() {
            return self.keys[self.keys.len() - 1].multiplier;
        }

        let a = self.keys[idx - 1];
        let b = self.keys[idx];
        let span = b.distance - a.distance;
        if span <= f32::EPSILON {
            return b.multiplier;
        }
        let ratio = (distance - a.distance) / span;
        a.multiplier + (b.multiplier - a.multiplier) * ratio
    }
}

impl Default for DistanceScaleCurve {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Vec<[f32; 2]>> for DistanceScaleCurve {
    fn from(points: Vec<[f32; 2]>) -> Self {
        Self::new(points.into_iter().map(|[d, m]| (d, m)))
    }
}

impl From<DistanceScaleCurve> for Vec<[f32; 2]> {
    fn from(curve: DistanceScaleCurve) -> Self {
        curve.keys.iter().map(|k| [k.distance, k.multiplier]).collect()
    }
}
