/// 迷霧管理器綜合測試
///
/// 以實際的觀察者與隱藏物件跑完整的 tick 流程

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fogwar::*;
use parking_lot::Mutex;
use vek::Vec3;

struct Target {
    pos: Mutex<Vec3<f32>>,
    visible: Mutex<Option<bool>>,
    strength: Mutex<f32>,
    visibility_calls: AtomicUsize,
}

impl Target {
    fn at(x: f32, y: f32, z: f32) -> Arc<Self> {
        Arc::new(Self {
            pos: Mutex::new(Vec3::new(x, y, z)),
            visible: Mutex::new(None),
            strength: Mutex::new(0.0),
            visibility_calls: AtomicUsize::new(0),
        })
    }

    fn move_to(&self, x: f32, y: f32, z: f32) {
        *self.pos.lock() = Vec3::new(x, y, z);
    }

    fn visible(&self) -> Option<bool> {
        *self.visible.lock()
    }

    fn strength(&self) -> f32 {
        *self.strength.lock()
    }

    fn calls(&self) -> usize {
        self.visibility_calls.load(Ordering::SeqCst)
    }
}

impl HiddenObject for Target {
    fn position(&self) -> Vec3<f32> {
        *self.pos.lock()
    }

    fn set_visible(&self, visible: bool) {
        self.visibility_calls.fetch_add(1, Ordering::SeqCst);
        *self.visible.lock() = Some(visible);
    }

    fn set_strength(&self, strength: f32) {
        *self.strength.lock() = strength;
    }
}

fn watcher(x: f32, z: f32, facing: Vec3<f32>) -> Arc<FixedRevealer> {
    Arc::new(FixedRevealer::new(Vec3::new(x, 0.0, z), facing))
}

fn every_tick(fov: f32, distance: f32) -> SharedProfile {
    SharedProfile::new(RevealerProfile::new(fov, distance).with_update_rate_period(0.0))
}

fn register(manager: &FogOfWarManager, target: &Arc<Target>) -> FogMembership {
    let membership = manager.registrar().membership();
    membership.register_dynamically(target);
    membership
}

const NO_TIME: Duration = Duration::ZERO;

#[test]
fn test_reference_scene_through_manager() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    manager.add_revealer("eye", &eye, every_tick(90.0, 10.0));

    let ahead = Target::at(0.0, 0.0, 5.0);
    let far = Target::at(0.0, 0.0, 11.0);
    let side = Target::at(8.0, 0.0, 0.0);
    let _m = [register(&manager, &ahead), register(&manager, &far), register(&manager, &side)];

    let report = manager.advance(NO_TIME);
    assert_eq!(report.added, 3);
    assert_eq!(report.range_rejections, 1);
    assert_eq!(report.cone_rejections, 1);
    assert_eq!(report.rays_cast, 1);
    assert_eq!(ahead.visible(), Some(true));
    assert_eq!(far.visible(), Some(false));
    assert_eq!(side.visible(), Some(false));

    // 放一面牆擋在中間
    let events = manager.subscribe();
    let wall = manager.add_obstacle(ObstacleInfo::wall(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 0.0, 2.0)));
    let report = manager.advance(NO_TIME);
    assert_eq!(report.occluded, 1);
    assert_eq!(ahead.visible(), Some(false));
    let changes: Vec<_> = events.try_iter().collect();
    assert_eq!(changes.len(), 1);
    assert!(matches!(changes[0], FogEvent::VisibilityChanged { visible: false, .. }));

    manager.remove_obstacle(wall);
    manager.advance(NO_TIME);
    assert_eq!(ahead.visible(), Some(true));
}

#[test]
fn test_any_revealer_with_max_strength() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let curve = PerceptionCurve::linear_falloff();
    let south = watcher(0.0, 0.0, Vec3::unit_z());
    let north = watcher(0.0, 10.0, -Vec3::unit_z());
    let profile = || {
        SharedProfile::new(
            RevealerProfile::new(90.0, 10.0)
                .with_update_rate_period(0.0)
                .with_perception_falloff(curve.clone()),
        )
    };
    manager.add_revealer("south", &south, profile());
    manager.add_revealer("north", &north, profile());

    let near_south = Target::at(0.0, 0.0, 2.0);
    let near_north = Target::at(0.0, 0.0, 9.0);
    let behind_both = Target::at(0.0, 0.0, -3.0);
    let _m = [
        register(&manager, &near_south),
        register(&manager, &near_north),
        register(&manager, &behind_both),
    ];

    manager.advance(NO_TIME);
    assert_eq!(near_south.visible(), Some(true));
    assert!((near_south.strength() - 0.8).abs() < 1e-4);
    assert_eq!(near_north.visible(), Some(true));
    assert!((near_north.strength() - 0.9).abs() < 1e-4);
    assert_eq!(behind_both.visible(), Some(false));
}

#[test]
fn test_throttled_revealer_respects_period() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(RevealerProfile::new(90.0, 10.0).with_update_rate_period(1.0));
    let id = manager.add_revealer("slow", &eye, profile);

    let target = Target::at(0.0, 0.0, -5.0);
    let _m = register(&manager, &target);

    assert_eq!(manager.revealer_phase(id), Some(RevealerPhase::Due));
    let report = manager.advance(NO_TIME);
    assert_eq!(report.revealers_due, 1);
    assert_eq!(target.visible(), Some(false));

    target.move_to(0.0, 0.0, 5.0);
    let report = manager.advance(Duration::from_millis(500));
    assert_eq!(report.revealers_skipped, 1);
    assert_eq!(report.evaluations, 0);
    assert_eq!(target.visible(), Some(false));

    let report = manager.advance(Duration::from_millis(500));
    assert_eq!(report.revealers_due, 1);
    assert_eq!(target.visible(), Some(true));
}

#[test]
fn test_idle_revealer_keeps_its_verdict() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let fast_eye = watcher(0.0, 0.0, Vec3::unit_z());
    let slow_eye = watcher(0.0, 0.0, -Vec3::unit_z());
    manager.add_revealer("fast", &fast_eye, every_tick(90.0, 10.0));
    manager.add_revealer(
        "slow",
        &slow_eye,
        SharedProfile::new(RevealerProfile::new(90.0, 10.0).with_update_rate_period(10.0)),
    );

    let behind = Target::at(0.0, 0.0, -4.0);
    let _m = register(&manager, &behind);

    for _ in 0..20 {
        let report = manager.advance(Duration::from_millis(100));
        assert_eq!(report.visibility_changes, 0, "節流中的觀察者不應造成閃爍");
        assert_eq!(behind.visible(), Some(true));
    }
    // 註冊時隱藏一次，第一個 tick 顯示一次
    assert_eq!(behind.calls(), 2);
}

#[test]
fn test_hide_on_register_can_be_disabled() {
    let setting = ManagerSetting { hide_on_register: false, ..Default::default() };
    let mut manager = FogOfWarManager::with_config(ObstacleMap::new(), setting);
    let target = Target::at(100.0, 0.0, 100.0);
    let _m = register(&manager, &target);
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), None);
    assert_eq!(manager.is_visible(_m.handle()), Some(false));
}

#[test]
fn test_duplicate_registration_is_ignored() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let target = Target::at(0.0, 0.0, 1.0);
    let registrar = manager.registrar();
    let handle = registrar.allocate();
    registrar.register(handle, &target);
    registrar.register(handle, &target);

    let report = manager.advance(NO_TIME);
    assert_eq!(report.added, 1);
    assert_eq!(manager.registry().len(), 1);

    registrar.deregister(handle);
    registrar.deregister(handle);
    let report = manager.advance(NO_TIME);
    assert_eq!(report.removed, 1);
    assert!(manager.registry().is_empty());
}

#[test]
fn test_defunct_entry_is_purged() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    manager.add_revealer("eye", &eye, every_tick(360.0, 10.0));
    let events = manager.subscribe();

    let registrar = manager.registrar();
    let doomed = Target::at(0.0, 0.0, 3.0);
    let handle = registrar.allocate();
    registrar.register(handle, &doomed);
    manager.advance(NO_TIME);
    assert_eq!(manager.is_visible(handle), Some(true));

    // 沒有註銷就被銷毀
    drop(doomed);
    let report = manager.advance(NO_TIME);
    assert_eq!(report.purged, 1);
    assert!(!manager.registry().contains(handle));
    assert!(events.try_iter().any(|e| e == FogEvent::EntryPurged { handle }));

    // 晚到的註銷不會出錯
    registrar.deregister(handle);
    let report = manager.advance(NO_TIME);
    assert_eq!(report.removed, 0);
}

/// 在通知中註銷自己，指令會在本 tick 結束前套用
struct SelfRemoving {
    pos: Vec3<f32>,
    membership: Mutex<Option<FogMembership>>,
}

impl HiddenObject for SelfRemoving {
    fn position(&self) -> Vec3<f32> {
        self.pos
    }

    fn set_visible(&self, visible: bool) {
        if visible {
            if let Some(membership) = self.membership.lock().as_ref() {
                membership.deregister_dynamically();
            }
        }
    }
}

#[test]
fn test_deregistration_during_pass_is_deferred() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    manager.add_revealer("eye", &eye, every_tick(90.0, 10.0));

    let objects: Vec<Arc<SelfRemoving>> = (1..=3)
        .map(|i| Arc::new(SelfRemoving { pos: Vec3::new(0.0, 0.0, i as f32), membership: Mutex::new(None) }))
        .collect();
    for object in &objects {
        let membership = manager.registrar().membership();
        membership.register_dynamically(object);
        *object.membership.lock() = Some(membership);
    }

    let report = manager.advance(NO_TIME);
    assert_eq!(report.added, 3);
    assert_eq!(report.visibility_changes, 3);
    assert_eq!(report.removed, 3);
    assert!(manager.registry().is_empty());
}

#[test]
fn test_invalid_revealer_is_skipped_and_retried() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let broken = watcher(0.0, 0.0, Vec3::zero());
    let healthy = watcher(0.0, 0.0, Vec3::unit_z());
    let broken_id = manager.add_revealer("broken", &broken, every_tick(90.0, 10.0));
    manager.add_revealer("healthy", &healthy, every_tick(90.0, 10.0));

    let ahead = Target::at(0.0, 0.0, 5.0);
    let right = Target::at(5.0, 0.0, 0.0);
    let _m = [register(&manager, &ahead), register(&manager, &right)];

    let report = manager.advance(NO_TIME);
    assert_eq!(report.revealers_failed, 1);
    assert_eq!(ahead.visible(), Some(true));
    assert_eq!(right.visible(), Some(false));

    let report = manager.advance(NO_TIME);
    assert_eq!(report.revealers_failed, 1);
    assert_eq!(manager.revealer_phase(broken_id), Some(RevealerPhase::Due));

    broken.face(Vec3::unit_x());
    let report = manager.advance(NO_TIME);
    assert_eq!(report.revealers_failed, 0);
    assert_eq!(right.visible(), Some(true));
}

#[test]
fn test_dropped_binding_prunes_revealer() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let id = manager.add_revealer("eye", &eye, every_tick(90.0, 10.0));
    let target = Target::at(0.0, 0.0, 5.0);
    let _m = register(&manager, &target);
    let events = manager.subscribe();

    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(true));

    drop(eye);
    let report = manager.advance(NO_TIME);
    assert_eq!(report.revealers_pruned, 1);
    assert_eq!(manager.revealer_count(), 0);
    assert_eq!(target.visible(), Some(false));
    assert!(events.try_iter().any(|e| e == FogEvent::RevealerPruned { revealer: id }));
}

#[test]
fn test_static_revealer_tracks_objects_in_its_region() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let tower = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(RevealerProfile::new(360.0, 5.0).with_static(true));
    let id = manager.add_revealer("tower", &tower, profile.clone());

    let target = Target::at(0.0, 0.0, 8.0);
    let _m = register(&manager, &target);
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(false));

    // 走進塔的範圍
    target.move_to(0.0, 0.0, 4.0);
    assert_eq!(manager.revealer_phase(id), Some(RevealerPhase::Due));
    let report = manager.advance(Duration::from_millis(10));
    assert_eq!(report.revealers_due, 1);
    assert_eq!(target.visible(), Some(true));

    // 離開後不會一直保持可見
    target.move_to(0.0, 0.0, 500.0);
    manager.advance(Duration::from_millis(10));
    assert_eq!(target.visible(), Some(false));

    // 晚註冊的物件一樣會被看見
    let late = Target::at(2.0, 0.0, 0.0);
    let _late = register(&manager, &late);
    manager.advance(Duration::from_millis(10));
    assert_eq!(late.visible(), Some(true));

    target.move_to(0.0, 0.0, 5.5);
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(false));
    profile.edit(|p| p.set_view_distance(6.0));
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(true));
}

#[test]
fn test_static_region_is_captured_until_forced() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let tower = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(RevealerProfile::new(360.0, 5.0).with_ray_count(8).with_static(true));
    let id = manager.add_revealer("tower", &tower, profile);

    let target = Target::at(0.0, 0.0, 4.0);
    let _m = register(&manager, &target);
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(true));
    let boundary = manager.revealer_boundary(id).unwrap().unwrap();

    // 塔被搬走，區域與邊界仍停在原處
    tower.move_to(Vec3::new(100.0, 0.0, 0.0));
    manager.advance(Duration::from_millis(10));
    assert_eq!(target.visible(), Some(true));
    assert_eq!(manager.revealer_boundary(id).unwrap().unwrap(), boundary);

    manager.force_all();
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(false));
    let moved = manager.revealer_boundary(id).unwrap().unwrap();
    assert!((moved[0].point.x - boundary[0].point.x - 100.0).abs() < 1e-3);
}

#[test]
fn test_periodic_revealer_tracks_moving_and_late_objects() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(RevealerProfile::new(90.0, 10.0).with_update_rate_period(0.5));
    manager.add_revealer("eye", &eye, profile);

    let runner = Target::at(0.0, 0.0, 5.0);
    let _m = register(&manager, &runner);
    manager.advance(NO_TIME);
    assert_eq!(runner.visible(), Some(true));

    runner.move_to(0.0, 0.0, 50.0);
    let late = Target::at(0.0, 0.0, 3.0);
    let _late = register(&manager, &late);

    // 週期內沿用上次的結果
    manager.advance(Duration::from_millis(100));
    assert_eq!(runner.visible(), Some(true));
    assert_eq!(late.visible(), Some(false));

    let report = manager.advance(Duration::from_millis(400));
    assert_eq!(report.revealers_due, 1);
    assert_eq!(runner.visible(), Some(false));
    assert_eq!(late.visible(), Some(true));

    runner.move_to(0.0, 0.0, 6.0);
    manager.advance(Duration::from_millis(500));
    assert_eq!(runner.visible(), Some(true));
}

#[test]
fn test_reregistered_handle_starts_unseen() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(RevealerProfile::new(90.0, 10.0).with_update_rate_period(10.0));
    manager.add_revealer("eye", &eye, profile);

    let target = Target::at(0.0, 0.0, 5.0);
    let membership = register(&manager, &target);
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(true));

    membership.deregister_dynamically();
    let report = manager.advance(Duration::from_millis(10));
    assert_eq!(report.removed, 1);

    // 重新登錄時觀察者還在節流中，不能沿用註銷前的結果
    target.move_to(0.0, 0.0, 50.0);
    membership.register_dynamically(&target);
    let report = manager.advance(Duration::from_millis(10));
    assert_eq!(report.revealers_skipped, 1);
    assert_eq!(target.visible(), Some(false));
}

#[test]
fn test_view_distance_follows_anchor_curve() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let sheep = watcher(0.0, 0.0, Vec3::unit_z());
    let leader = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(
        RevealerProfile::new(360.0, 10.0)
            .with_update_rate_period(0.0)
            .with_view_distance_curve(DistanceScaleCurve::new([(0.0, 1.0), (20.0, 0.5), (40.0, 0.1)])),
    );
    let id = manager.add_revealer("sheep", &sheep, profile);
    assert!(manager.set_revealer_anchor(id, &leader));
    assert!(!manager.set_revealer_anchor(RevealerId(99), &leader));

    let stray = Target::at(0.0, 0.0, 8.0);
    let _m = register(&manager, &stray);
    manager.advance(NO_TIME);
    assert_eq!(stray.visible(), Some(true));

    // 羊離領頭越遠，視距越短
    sheep.move_to(Vec3::new(20.0, 0.0, 0.0));
    stray.move_to(20.0, 0.0, 8.0);
    let distance = manager.effective_profile(id).map(|p| p.view_distance());
    assert!((distance.unwrap() - 5.0).abs() < 1e-4);
    manager.advance(NO_TIME);
    assert_eq!(stray.visible(), Some(false));

    sheep.move_to(Vec3::new(40.0, 0.0, 0.0));
    let distance = manager.effective_profile(id).map(|p| p.view_distance());
    assert!((distance.unwrap() - 1.0).abs() < 1e-4);

    sheep.move_to(Vec3::zero());
    stray.move_to(0.0, 0.0, 8.0);
    manager.advance(NO_TIME);
    assert_eq!(stray.visible(), Some(true));

    // 錨點消失後使用原本的視距
    sheep.move_to(Vec3::new(40.0, 0.0, 0.0));
    drop(leader);
    assert_eq!(manager.effective_profile(id).map(|p| p.view_distance()), Some(10.0));
    assert!(manager.clear_revealer_anchor(id));
}

#[test]
fn test_shared_profile_edit_reaches_every_revealer() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let a = watcher(0.0, 0.0, Vec3::unit_z());
    let b = watcher(20.0, 0.0, Vec3::unit_z());
    let shared = SharedProfile::new(RevealerProfile::new(90.0, 3.0).with_update_rate_period(100.0));
    manager.add_revealer("a", &a, shared.clone());
    manager.add_revealer("b", &b, shared.clone());

    let near_a = Target::at(0.0, 0.0, 5.0);
    let near_b = Target::at(20.0, 0.0, 5.0);
    let _m = [register(&manager, &near_a), register(&manager, &near_b)];
    manager.advance(NO_TIME);
    assert_eq!(near_a.visible(), Some(false));
    assert_eq!(near_b.visible(), Some(false));

    shared.edit(|p| p.set_view_distance(6.0));
    let report = manager.advance(Duration::from_millis(10));
    assert_eq!(report.revealers_due, 2);
    assert_eq!(near_a.visible(), Some(true));
    assert_eq!(near_b.visible(), Some(true));
}

#[test]
fn test_runtime_adjustment() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let id = manager.add_revealer("eye", &eye, every_tick(60.0, 10.0));
    let diagonal = Target::at(4.0, 0.0, 4.0);
    let _m = register(&manager, &diagonal);

    manager.advance(NO_TIME);
    assert_eq!(diagonal.visible(), Some(false));

    assert!(manager.adjust_revealer(id, RevealerAdjustment { fov_delta: 40.0, distance_delta: 0.0 }));
    assert_eq!(manager.effective_profile(id).map(|p| p.fov_degrees()), Some(100.0));
    manager.advance(NO_TIME);
    assert_eq!(diagonal.visible(), Some(true));

    assert!(manager.reset_adjustment(id));
    manager.advance(NO_TIME);
    assert_eq!(diagonal.visible(), Some(false));
    assert!(!manager.adjust_revealer(RevealerId(999), RevealerAdjustment::default()));
}

#[test]
fn test_strength_change_notification() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(
        RevealerProfile::new(90.0, 10.0)
            .with_update_rate_period(0.0)
            .with_perception_falloff(PerceptionCurve::linear_falloff()),
    );
    manager.add_revealer("eye", &eye, profile);
    let target = Target::at(0.0, 0.0, 8.0);
    let m = register(&manager, &target);
    let events = manager.subscribe();

    manager.advance(NO_TIME);
    assert!((target.strength() - 0.2).abs() < 1e-4);

    // 變化小於門檻不通知
    target.move_to(0.0, 0.0, 7.95);
    let report = manager.advance(NO_TIME);
    assert_eq!(report.strength_changes, 0);

    target.move_to(0.0, 0.0, 3.0);
    let report = manager.advance(NO_TIME);
    assert_eq!(report.strength_changes, 1);
    assert!((target.strength() - 0.7).abs() < 1e-4);
    let last = events.try_iter().last();
    assert!(matches!(last, Some(FogEvent::StrengthChanged { handle, .. }) if handle == m.handle()));
}

#[test]
fn test_obstacle_layers_setting() {
    let mut map = ObstacleMap::new();
    map.insert(ObstacleInfo::wall(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 0.0, 2.0)).with_layer(0b10));
    let mut manager = FogOfWarManager::new(map);
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    manager.add_revealer("eye", &eye, every_tick(90.0, 10.0));
    let target = Target::at(0.0, 0.0, 5.0);
    let _m = register(&manager, &target);

    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(false));

    manager.set_obstacle_layers(0b01);
    manager.advance(NO_TIME);
    assert_eq!(target.visible(), Some(true));
}

#[test]
fn test_quorum_aggregator() {
    let mut manager: FogOfWarManager = FogOfWarManager::default();
    manager.set_aggregator(Box::new(Quorum { required: 2 }));
    let a = watcher(0.0, 0.0, Vec3::unit_z());
    let b = watcher(0.0, 10.0, -Vec3::unit_z());
    manager.add_revealer("a", &a, every_tick(360.0, 10.0));
    manager.add_revealer("b", &b, every_tick(90.0, 10.0));

    let both = Target::at(0.0, 0.0, 5.0);
    let only_a = Target::at(0.0, 0.0, -1.0);
    let _m = [register(&manager, &both), register(&manager, &only_a)];
    manager.advance(NO_TIME);
    assert_eq!(both.visible(), Some(true));
    assert_eq!(only_a.visible(), Some(false));
}

#[test]
fn test_revealer_boundary() {
    let mut manager = FogOfWarManager::new(ObstacleMap::from_obstacles([ObstacleInfo::wall(
        Vec3::new(-1.0, 0.0, 2.0),
        Vec3::new(1.0, 0.0, 2.0),
    )]));
    let eye = watcher(0.0, 0.0, Vec3::unit_z());
    let profile = SharedProfile::new(RevealerProfile::new(90.0, 10.0).with_ray_count(5));
    let id = manager.add_revealer("eye", &eye, profile.clone());

    let samples = manager.revealer_boundary(id).unwrap().unwrap();
    assert_eq!(samples.len(), 5);
    assert!(samples[2].blocked);

    profile.edit(|p| p.set_ray_count(9));
    let samples = manager.revealer_boundary(id).unwrap().unwrap();
    assert_eq!(samples.len(), 9);

    eye.face(Vec3::zero());
    assert!(matches!(
        manager.revealer_boundary(id),
        Some(Err(FogError::InvalidRevealerState(InvalidRevealerState::ZeroForward)))
    ));
    assert!(manager.revealer_boundary(RevealerId(42)).is_none());
}
