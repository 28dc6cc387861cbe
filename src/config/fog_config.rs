use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use vek::{Vec2, Vec3};

use crate::comp::profile::{RevealerProfile, SharedProfile};
use crate::config::validation::{clamp_field, log_issues, Validate, ValidationIssue};
use crate::vision::obstacle::{LayerMask, ObstacleInfo, ObstacleMap, ALL_LAYERS, DEFAULT_LAYER};

/// 管理器設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerSetting {
    /// 強度變化超過此值才通知
    pub strength_epsilon: f32,
    /// 參與遮蔽的障礙物圖層
    pub obstacle_layers: LayerMask,
    /// 註冊時先把物件設為不可見
    pub hide_on_register: bool,
}

impl Default for ManagerSetting {
    fn default() -> Self {
        Self {
            strength_epsilon: 0.01,
            obstacle_layers: ALL_LAYERS,
            hide_on_register: true,
        }
    }
}

impl Validate for ManagerSetting {
    fn validate(&mut self) -> Vec<ValidationIssue> {
        clamp_field("strength_epsilon", &mut self.strength_epsilon, 0.0, 1.0, 0.01)
            .into_iter()
            .collect()
    }
}

/// 障礙物輪廓設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeSetting {
    Wall { start: [f32; 2], end: [f32; 2] },
    Circular { center: [f32; 2], radius: f32 },
    Rectangle {
        center: [f32; 2],
        half_extents: [f32; 2],
        #[serde(default)]
        rotation_degrees: f32,
    },
}

/// 場景中的靜態障礙物，座標為水平面 [x, z]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSetting {
    pub shape: ShapeSetting,
    /// 底部高度，省略代表無限往下延伸
    #[serde(default)]
    pub base: Option<f32>,
    /// 高度，省略代表無限高
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default = "default_layer")]
    pub layer: LayerMask,
}

fn default_layer() -> LayerMask {
    DEFAULT_LAYER
}

impl ObstacleSetting {
    pub fn to_obstacle(&self) -> ObstacleInfo {
        let flat = |p: [f32; 2]| Vec3::new(p[0], 0.0, p[1]);
        let info = match &self.shape {
            ShapeSetting::Wall { start, end } => ObstacleInfo::wall(flat(*start), flat(*end)),
            ShapeSetting::Circular { center, radius } => ObstacleInfo::circular(flat(*center), *radius),
            ShapeSetting::Rectangle { center, half_extents, rotation_degrees } => ObstacleInfo::rectangle(
                flat(*center),
                Vec2::from(*half_extents),
                rotation_degrees.to_radians(),
            ),
        };

        let mut info = info.with_layer(self.layer);
        match (self.base, self.height) {
            (base, Some(height)) => info.with_vertical_span(base.unwrap_or(0.0), height),
            (Some(base), None) => {
                info.base = base;
                info
            }
            (None, None) => info,
        }
    }
}

impl Validate for ObstacleSetting {
    fn validate(&mut self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        match &mut self.shape {
            ShapeSetting::Wall { .. } => {}
            ShapeSetting::Circular { radius, .. } => {
                issues.extend(clamp_field("radius", radius, 0.0, f32::MAX, 0.0));
            }
            ShapeSetting::Rectangle { half_extents, .. } => {
                issues.extend(clamp_field("half_extents[0]", &mut half_extents[0], 0.0, f32::MAX, 0.0));
                issues.extend(clamp_field("half_extents[1]", &mut half_extents[1], 0.0, f32::MAX, 0.0));
            }
        }
        if let Some(height) = self.height.as_mut() {
            issues.extend(clamp_field("height", height, 0.0, f32::MAX, 0.0));
        }
        issues
    }
}

/// 迷霧系統設定檔
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogSetting {
    pub manager: ManagerSetting,
    pub revealers: BTreeMap<String, RevealerProfile>,
    pub obstacles: Vec<ObstacleSetting>,
}

impl FogSetting {
    /// 從文件載入配置，依副檔名選擇格式
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("無法讀取迷霧設定 {}", path.display()))?;

        let setting = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => return Err(anyhow::anyhow!("不支援的檔案格式: {}", path.display())),
        }
        .with_context(|| format!("解析迷霧設定失敗 {}", path.display()))?;

        info!(
            "載入迷霧設定 {}: {} 組觀察者設定, {} 個障礙物",
            path.display(),
            setting.revealers.len(),
            setting.obstacles.len()
        );
        Ok(setting)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let setting: Self = toml::from_str(content)?;
        Ok(setting.validated())
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        let setting: Self = serde_yaml::from_str(content)?;
        Ok(setting.validated())
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        let setting: Self = serde_json::from_str(content)?;
        Ok(setting.validated())
    }

    fn validated(mut self) -> Self {
        let issues = self.validate();
        log_issues("迷霧設定", &issues);
        self
    }

    /// 取得具名設定檔的共用版本
    pub fn profile(&self, name: &str) -> Option<SharedProfile> {
        self.revealers.get(name).cloned().map(SharedProfile::new)
    }

    pub fn build_obstacle_map(&self) -> ObstacleMap {
        ObstacleMap::from_obstacles(self.obstacles.iter().map(ObstacleSetting::to_obstacle))
    }
}

impl Validate for FogSetting {
    fn validate(&mut self) -> Vec<ValidationIssue> {
        let mut issues: Vec<ValidationIssue> = self
            .manager
            .validate()
            .into_iter()
            .map(|issue| issue.within("manager"))
            .collect();
        for (name, profile) in self.revealers.iter_mut() {
            let scope = format!("revealers.{}", name);
            issues.extend(profile.validate().into_iter().map(|issue| issue.within(&scope)));
        }
        for (i, obstacle) in self.obstacles.iter_mut().enumerate() {
            let scope = format!("obstacles[{}]", i);
            issues.extend(obstacle.validate().into_iter().map(|issue| issue.within(&scope)));
        }
        issues
    }
}
