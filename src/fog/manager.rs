/// 迷霧管理器
///
/// 每個 tick 的流程：
/// 1. 套用佇列中的註冊指令，移除姿態來源已消失的觀察者
/// 2. 擷取物件位置並清除已銷毀的物件
/// 3. 只評估到期的觀察者，更新各自的快取
/// 4. 合併所有觀察者的快取，狀態改變時才通知物件
/// 5. 再套用一次計算途中送來的指令
///
/// 節流中的觀察者沿用上一次的結果參與合併，物件不會因為輪到誰評估而閃爍。
/// 靜態觀察者固定視野區域與邊界，但每個 tick 都用該區域檢查物件。

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use hashbrown::HashMap;
use log::{debug, info, trace, warn};

use crate::comp::hidden::{FogRegistrar, HiddenHandle, RegistryCommand};
use crate::comp::profile::{ProfileChanged, RevealerProfile, SharedProfile};
use crate::comp::revealer::{RevealerBinding, RevealerId};
use crate::config::fog_config::ManagerSetting;
use crate::fog::aggregator::{AnyRevealer, Perception, VisibilityAggregator};
use crate::fog::error::{ErrorLatch, FogError};
use crate::fog::registry::{HiddenObjectRegistry, RegistryChange, RegistrySnapshot};
use crate::fog::report::TickReport;
use crate::fog::throttle::{RevealerPhase, Throttle};
use crate::msg::FogEvent;
use crate::vision::field_of_view::{BoundarySample, FieldOfViewSampler, RayFan, Sighting, ViewCone};
use crate::vision::obstacle::{LayerMask, ObstacleId, ObstacleInfo, ObstacleMap, Occluder};

/// 執行期對視角與視距的增減（例如技能或狀態效果）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RevealerAdjustment {
    pub fov_delta: f32,
    pub distance_delta: f32,
}

impl RevealerAdjustment {
    pub fn is_neutral(&self) -> bool {
        self.fov_delta == 0.0 && self.distance_delta == 0.0
    }
}

impl Add for RevealerAdjustment {
    type Output = RevealerAdjustment;

    fn add(self, rhs: RevealerAdjustment) -> RevealerAdjustment {
        RevealerAdjustment {
            fov_delta: self.fov_delta + rhs.fov_delta,
            distance_delta: self.distance_delta + rhs.distance_delta,
        }
    }
}

struct RevealerEntry {
    id: RevealerId,
    label: String,
    binding: Weak<dyn RevealerBinding>,
    profile: SharedProfile,
    changes: Receiver<ProfileChanged>,
    adjustment: RevealerAdjustment,
    /// 視距曲線以此位置為基準
    anchor: Option<Weak<dyn RevealerBinding>>,
    throttle: Throttle,
    /// 上次評估看見的物件與強度
    seen: HashMap<HiddenHandle, f32>,
    fan: Option<RayFan>,
    /// 靜態觀察者擷取的視野區域
    region: Option<ViewCone>,
    /// 靜態觀察者的邊界取樣
    boundary: Option<Vec<BoundarySample>>,
}

impl RevealerEntry {
    /// 先依錨點距離縮放視距，再加上執行期調整量
    fn effective_profile(&self) -> RevealerProfile {
        let mut profile = self.profile.snapshot();
        if let Some(distance) = self.anchor_distance() {
            profile = profile.scaled_by_anchor_distance(distance);
        }
        if self.adjustment.is_neutral() {
            profile
        } else {
            profile.adjusted(self.adjustment.fov_delta, self.adjustment.distance_delta)
        }
    }

    fn anchor_distance(&self) -> Option<f32> {
        let anchor = self.anchor.as_ref()?.upgrade()?;
        let binding = self.binding.upgrade()?;
        Some(binding.position().distance(anchor.position()))
    }

    fn force(&mut self) {
        self.throttle.force();
        self.region = None;
        self.boundary = None;
    }
}

pub struct FogOfWarManager<O: Occluder = ObstacleMap> {
    occluder: O,
    registry: HiddenObjectRegistry,
    revealers: BTreeMap<RevealerId, RevealerEntry>,
    next_revealer: u32,
    registrar: FogRegistrar,
    commands: Receiver<RegistryCommand>,
    aggregator: Box<dyn VisibilityAggregator>,
    subscribers: Vec<Sender<FogEvent>>,
    error_latch: ErrorLatch,
    setting: ManagerSetting,
    tick: u64,
    dirty: bool,
    last_report: TickReport,
}

impl Default for FogOfWarManager<ObstacleMap> {
    fn default() -> Self {
        Self::new(ObstacleMap::new())
    }
}

impl<O: Occluder> FogOfWarManager<O> {
    pub fn new(occluder: O) -> Self {
        Self::with_config(occluder, ManagerSetting::default())
    }

    pub fn with_config(occluder: O, setting: ManagerSetting) -> Self {
        let (registrar, commands) = FogRegistrar::channel();
        info!(
            "迷霧管理器初始化: 強度門檻 {}, 障礙物圖層 {:#x}",
            setting.strength_epsilon, setting.obstacle_layers
        );
        Self {
            occluder,
            registry: HiddenObjectRegistry::new(),
            revealers: BTreeMap::new(),
            next_revealer: 1,
            registrar,
            commands,
            aggregator: Box::new(AnyRevealer),
            subscribers: Vec::new(),
            error_latch: ErrorLatch::new(),
            setting,
            tick: 0,
            dirty: false,
            last_report: TickReport::default(),
        }
    }

    /// 給遊戲物件使用的註冊端
    pub fn registrar(&self) -> FogRegistrar {
        self.registrar.clone()
    }

    pub fn registry(&self) -> &HiddenObjectRegistry {
        &self.registry
    }

    pub fn setting(&self) -> &ManagerSetting {
        &self.setting
    }

    pub fn occluder(&self) -> &O {
        &self.occluder
    }

    /// 直接修改遮蔽物後所有觀察者都會在下個 tick 重新評估
    pub fn occluder_mut(&mut self) -> &mut O {
        self.force_all();
        &mut self.occluder
    }

    pub fn set_aggregator(&mut self, aggregator: Box<dyn VisibilityAggregator>) {
        self.aggregator = aggregator;
        self.dirty = true;
    }

    pub fn set_obstacle_layers(&mut self, layers: LayerMask) {
        if self.setting.obstacle_layers != layers {
            self.setting.obstacle_layers = layers;
            self.force_all();
        }
    }

    /// 訂閱可見性事件
    pub fn subscribe(&mut self) -> Receiver<FogEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    /// 物件最後一次被通知的可見狀態
    pub fn is_visible(&self, handle: HiddenHandle) -> Option<bool> {
        self.registry.get(handle).map(|entry| entry.is_visible())
    }

    pub fn strength(&self, handle: HiddenHandle) -> Option<f32> {
        self.registry.get(handle).map(|entry| entry.strength())
    }

    /// 新增觀察者；管理器不持有 binding 的所有權
    pub fn add_revealer<B: RevealerBinding + 'static>(
        &mut self,
        label: impl Into<String>,
        binding: &Arc<B>,
        profile: SharedProfile,
    ) -> RevealerId {
        let id = RevealerId(self.next_revealer);
        self.next_revealer += 1;

        let weak: Weak<B> = Arc::downgrade(binding);
        let binding: Weak<dyn RevealerBinding> = weak;
        let label = label.into();
        debug!("新增觀察者 {} ({}): {:?}", id, label, *profile.read());

        self.revealers.insert(
            id,
            RevealerEntry {
                id,
                label,
                binding,
                changes: profile.subscribe(),
                profile,
                adjustment: RevealerAdjustment::default(),
                anchor: None,
                throttle: Throttle::new(),
                seen: HashMap::new(),
                fan: None,
                region: None,
                boundary: None,
            },
        );
        id
    }

    pub fn remove_revealer(&mut self, id: RevealerId) -> bool {
        match self.revealers.remove(&id) {
            Some(entry) => {
                debug!("移除觀察者 {} ({})", id, entry.label);
                self.error_latch.forget(id);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    pub fn revealer_ids(&self) -> Vec<RevealerId> {
        self.revealers.keys().copied().collect()
    }

    pub fn revealer_count(&self) -> usize {
        self.revealers.len()
    }

    /// 觀察者在下一個 tick 若不再經過時間會處於的狀態
    pub fn revealer_phase(&self, id: RevealerId) -> Option<RevealerPhase> {
        let entry = self.revealers.get(&id)?;
        let profile = entry.profile.read();
        Some(entry.throttle.phase(profile.update_period(), profile.is_static()))
    }

    /// 套用調整量後實際使用的設定檔
    pub fn effective_profile(&self, id: RevealerId) -> Option<RevealerProfile> {
        self.revealers.get(&id).map(RevealerEntry::effective_profile)
    }

    /// 累加執行期調整量
    pub fn adjust_revealer(&mut self, id: RevealerId, adjustment: RevealerAdjustment) -> bool {
        let Some(entry) = self.revealers.get_mut(&id) else {
            return false;
        };
        entry.adjustment = entry.adjustment + adjustment;
        entry.force();
        debug!("{} 調整量 {:?}", id, entry.adjustment);
        true
    }

    pub fn reset_adjustment(&mut self, id: RevealerId) -> bool {
        let Some(entry) = self.revealers.get_mut(&id) else {
            return false;
        };
        if !entry.adjustment.is_neutral() {
            entry.adjustment = RevealerAdjustment::default();
            entry.force();
        }
        true
    }

    /// 設定視距曲線的錨點（例如羊群跟隨的玩家）；管理器不持有錨點的所有權
    pub fn set_revealer_anchor<A: RevealerBinding + 'static>(&mut self, id: RevealerId, anchor: &Arc<A>) -> bool {
        let Some(entry) = self.revealers.get_mut(&id) else {
            return false;
        };
        let weak: Weak<A> = Arc::downgrade(anchor);
        let anchor: Weak<dyn RevealerBinding> = weak;
        entry.anchor = Some(anchor);
        entry.force();
        debug!("{} 設定視距錨點", id);
        true
    }

    pub fn clear_revealer_anchor(&mut self, id: RevealerId) -> bool {
        let Some(entry) = self.revealers.get_mut(&id) else {
            return false;
        };
        if entry.anchor.take().is_some() {
            entry.force();
        }
        true
    }

    /// 所有觀察者下一個 tick 強制評估
    pub fn force_all(&mut self) {
        for entry in self.revealers.values_mut() {
            entry.force();
        }
    }

    /// 取樣視錐邊界
    ///
    /// 一般觀察者以目前的姿態取樣；靜態觀察者沿用擷取的區域，結果快取到下次被強制為止。
    pub fn revealer_boundary(&mut self, id: RevealerId) -> Option<Result<Vec<BoundarySample>, FogError>> {
        let entry = self.revealers.get_mut(&id)?;
        let profile = entry.effective_profile();
        let is_static = profile.is_static();
        let fan_current = entry.fan.as_ref().map_or(false, |fan| fan.is_current(&profile));
        if is_static && fan_current {
            if let Some(samples) = &entry.boundary {
                return Some(Ok(samples.clone()));
            }
        }

        let cone = match entry.region.filter(|_| is_static) {
            Some(cone) => cone,
            None => {
                let binding = entry.binding.upgrade()?;
                match ViewCone::from_profile(binding.position(), binding.forward(), &profile) {
                    Ok(cone) => cone,
                    Err(state) => return Some(Err(state.into())),
                }
            }
        };
        if !fan_current {
            trace!("{} 重建射線扇形 ({} 條)", id, profile.ray_count());
            entry.fan = Some(RayFan::for_profile(&profile));
        }
        let fan = entry.fan.as_ref()?;
        let sampler = FieldOfViewSampler::new(&self.occluder).with_layers(self.setting.obstacle_layers);
        let samples: Vec<BoundarySample> = sampler.sample_boundary_with(&cone, fan).collect();
        if is_static {
            entry.region = Some(cone);
            entry.boundary = Some(samples.clone());
        }
        Some(Ok(samples))
    }

    /// 推進一個 tick
    pub fn advance(&mut self, dt: Duration) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            ..Default::default()
        };

        self.apply_pending(&mut report);
        self.prune_revealers(&mut report);
        self.drain_profile_changes();

        let snapshot = self.registry.snapshot();
        report.purged = snapshot.purged.len();
        for handle in &snapshot.purged {
            self.emit(FogEvent::EntryPurged { handle: *handle });
        }

        self.evaluate_revealers(dt, &snapshot, &mut report);

        if self.dirty {
            self.aggregate(&snapshot, &mut report);
            self.dirty = false;
        }
        drop(snapshot);

        self.apply_pending(&mut report);

        if report.visibility_changes > 0 || report.purged > 0 || report.revealers_failed > 0 {
            debug!("{}", report);
        } else {
            trace!("{}", report);
        }
        self.last_report = report.clone();
        report
    }

    fn apply_pending(&mut self, report: &mut TickReport) {
        for command in self.commands.try_iter() {
            match self.registry.apply(command) {
                Ok(RegistryChange::Added(handle)) => {
                    report.added += 1;
                    self.dirty = true;
                    trace!("登錄 {}", handle);
                    if self.setting.hide_on_register {
                        if let Some(object) = self.registry.get(handle).and_then(|entry| entry.provider()) {
                            object.set_visible(false);
                        }
                    }
                }
                Ok(RegistryChange::Removed(handle)) => {
                    report.removed += 1;
                    for entry in self.revealers.values_mut() {
                        entry.seen.remove(&handle);
                    }
                    self.dirty = true;
                    trace!("註銷 {}", handle);
                }
                Ok(RegistryChange::Unchanged) => {}
                Err(FogError::DuplicateHandle(handle)) => {
                    debug!("{} 重複註冊，忽略", handle);
                }
                Err(err) => warn!("套用註冊指令失敗: {}", err),
            }
        }
    }

    fn prune_revealers(&mut self, report: &mut TickReport) {
        let dead: Vec<RevealerId> = self
            .revealers
            .values()
            .filter(|entry| entry.binding.strong_count() == 0)
            .map(|entry| entry.id)
            .collect();

        for id in dead {
            if let Some(entry) = self.revealers.remove(&id) {
                warn!("觀察者 {} ({}) 的姿態來源已消失，移除", id, entry.label);
                self.error_latch.forget(id);
                self.dirty = true;
                report.revealers_pruned += 1;
                self.emit(FogEvent::RevealerPruned { revealer: id });
            }
        }
    }

    fn drain_profile_changes(&mut self) {
        for entry in self.revealers.values_mut() {
            if let Some(change) = entry.changes.try_iter().last() {
                debug!("{} 設定檔更新到版本 {}", entry.id, change.revision);
                entry.force();
                entry.fan = None;
            }
        }
    }

    fn evaluate_revealers(&mut self, dt: Duration, snapshot: &RegistrySnapshot, report: &mut TickReport) {
        let sampler = FieldOfViewSampler::new(&self.occluder).with_layers(self.setting.obstacle_layers);

        for entry in self.revealers.values_mut() {
            let profile = entry.effective_profile();
            if entry.throttle.advance(dt, profile.update_period(), profile.is_static()) == RevealerPhase::Idle {
                report.revealers_skipped += 1;
                continue;
            }
            report.revealers_due += 1;

            let captured = if profile.is_static() && !entry.throttle.needs_refresh() {
                entry.region
            } else {
                None
            };
            let cone = match captured {
                Some(cone) => cone,
                None => {
                    let Some(binding) = entry.binding.upgrade() else {
                        continue;
                    };
                    match ViewCone::from_profile(binding.position(), binding.forward(), &profile) {
                        Ok(cone) => {
                            entry.region = profile.is_static().then_some(cone);
                            entry.boundary = None;
                            cone
                        }
                        Err(state) => {
                            // 失敗時不沿用舊結果，保持到期狀態下個 tick 重試
                            self.error_latch.trip(entry.id, &state);
                            entry.region = None;
                            if !entry.seen.is_empty() {
                                entry.seen.clear();
                                self.dirty = true;
                            }
                            report.revealers_failed += 1;
                            continue;
                        }
                    }
                }
            };
            self.error_latch.clear(entry.id);

            let mut seen = HashMap::with_capacity(entry.seen.len());
            for item in &snapshot.items {
                report.evaluations += 1;
                match sampler.evaluate_cone(&cone, item.position) {
                    Sighting::OutOfRange { .. } => report.range_rejections += 1,
                    Sighting::OutsideCone { .. } => report.cone_rejections += 1,
                    Sighting::Occluded { .. } => {
                        report.rays_cast += 1;
                        report.occluded += 1;
                    }
                    Sighting::Visible { normalized_distance } => {
                        report.rays_cast += 1;
                        seen.insert(item.handle, profile.perception_strength(normalized_distance));
                    }
                }
            }

            if seen != entry.seen {
                entry.seen = seen;
                self.dirty = true;
            }
            entry.throttle.mark_evaluated();
        }
    }

    fn aggregate(&mut self, snapshot: &RegistrySnapshot, report: &mut TickReport) {
        let mut events = Vec::new();
        let mut perceptions: Vec<Perception> = Vec::with_capacity(self.revealers.len());
        let epsilon = self.setting.strength_epsilon;

        for item in &snapshot.items {
            perceptions.clear();
            perceptions.extend(self.revealers.values().filter_map(|entry| {
                entry.seen.get(&item.handle).map(|strength| Perception {
                    revealer: entry.id,
                    strength: *strength,
                })
            }));
            let verdict = self.aggregator.aggregate(&perceptions);
            let strength = if verdict.visible { verdict.strength.clamp(0.0, 1.0) } else { 0.0 };

            let Some(hidden) = self.registry.get_mut(item.handle) else {
                continue;
            };

            if hidden.visible != verdict.visible {
                hidden.visible = verdict.visible;
                hidden.strength = strength;
                item.object.set_visible(verdict.visible);
                item.object.set_strength(strength);
                report.visibility_changes += 1;
                debug!("{} 可見 {} 強度 {:.2}", item.handle, verdict.visible, strength);
                events.push(FogEvent::VisibilityChanged {
                    handle: item.handle,
                    visible: verdict.visible,
                    strength,
                });
            } else if verdict.visible && (hidden.strength - strength).abs() > epsilon {
                hidden.strength = strength;
                item.object.set_strength(strength);
                report.strength_changes += 1;
                events.push(FogEvent::StrengthChanged {
                    handle: item.handle,
                    strength,
                });
            }
        }

        for event in events {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: FogEvent) {
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

impl FogOfWarManager<ObstacleMap> {
    /// 動態新增障礙物（例如可破壞的牆）
    pub fn add_obstacle(&mut self, info: ObstacleInfo) -> ObstacleId {
        let id = self.occluder.insert(info);
        self.force_all();
        id
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<ObstacleInfo> {
        let removed = self.occluder.remove(id);
        if removed.is_some() {
            self.force_all();
        }
        removed
    }
}

impl<O: Occluder> fmt::Debug for FogOfWarManager<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FogOfWarManager")
            .field("tick", &self.tick)
            .field("revealers", &self.revealers.len())
            .field("hidden", &self.registry.len())
            .field("subscribers", &self.subscribers.len())
            .field("setting", &self.setting)
            .finish()
    }
}
