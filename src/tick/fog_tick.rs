/// 迷霧系統的 ECS 整合
///
/// 每個實體配一個代理物件，代理同時扮演隱藏物件與觀察者姿態來源。
/// 實體死亡或元件被移除時代理跟著釋放，成員資格在 drop 時自動註銷。
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashMap;
use log::{debug, trace};
use parking_lot::Mutex;
use specs::prelude::*;
use vek::Vec3;

use crate::comp::{
    Facing, FogMembership, FogRegistrar, FogRevealer, HiddenInFog, HiddenObject, Pos, RevealerBinding,
    RevealerId, SharedProfile, DeltaTime,
};
use crate::fog::{FogOfWarManager, TickReport};
use crate::vision::{ObstacleMap, Occluder};

/// 實體的位置與朝向
struct EntityProxy {
    pose: Mutex<(Vec3<f32>, Vec3<f32>)>,
    visible: AtomicBool,
    strength: Mutex<f32>,
}

impl EntityProxy {
    fn new(position: Vec3<f32>, forward: Vec3<f32>) -> Self {
        Self {
            pose: Mutex::new((position, forward)),
            visible: AtomicBool::new(false),
            strength: Mutex::new(0.0),
        }
    }

    fn update(&self, position: Vec3<f32>, forward: Vec3<f32>) {
        *self.pose.lock() = (position, forward);
    }

    fn visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    fn strength(&self) -> f32 {
        *self.strength.lock()
    }
}

impl HiddenObject for EntityProxy {
    fn position(&self) -> Vec3<f32> {
        self.pose.lock().0
    }

    fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    fn set_strength(&self, strength: f32) {
        *self.strength.lock() = strength;
    }
}

impl RevealerBinding for EntityProxy {
    fn position(&self) -> Vec3<f32> {
        self.pose.lock().0
    }

    fn forward(&self) -> Vec3<f32> {
        self.pose.lock().1
    }
}

struct HiddenLink {
    proxy: Arc<EntityProxy>,
    membership: FogMembership,
}

struct RevealerLink {
    proxy: Arc<EntityProxy>,
    ids: Vec<RevealerId>,
    profiles: Vec<SharedProfile>,
}

impl RevealerLink {
    fn matches(&self, profiles: &[SharedProfile]) -> bool {
        self.profiles.len() == profiles.len()
            && self.profiles.iter().zip(profiles).all(|(a, b)| a.same_as(b))
    }
}

/// 迷霧更新系統
pub struct FogOfWarSystem<O: Occluder = ObstacleMap> {
    manager: FogOfWarManager<O>,
    registrar: FogRegistrar,
    hidden: HashMap<Entity, HiddenLink>,
    revealers: HashMap<Entity, RevealerLink>,
}

impl<O: Occluder> FogOfWarSystem<O> {
    pub fn new(manager: FogOfWarManager<O>) -> Self {
        let registrar = manager.registrar();
        Self {
            manager,
            registrar,
            hidden: HashMap::new(),
            revealers: HashMap::new(),
        }
    }

    pub fn manager(&self) -> &FogOfWarManager<O> {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut FogOfWarManager<O> {
        &mut self.manager
    }

    /// 實體對應的觀察者
    pub fn revealer_ids(&self, entity: Entity) -> &[RevealerId] {
        self.revealers.get(&entity).map(|link| link.ids.as_slice()).unwrap_or(&[])
    }

    pub fn tracked_hidden(&self) -> usize {
        self.hidden.len()
    }

    fn sync_revealers(
        &mut self,
        entities: &Entities,
        positions: &ReadStorage<Pos>,
        facings: &ReadStorage<Facing>,
        revealers: &ReadStorage<FogRevealer>,
    ) {
        for (entity, pos, facing, revealer) in (&**entities, positions, facings, revealers).join() {
            match self.revealers.get(&entity) {
                Some(link) if link.matches(&revealer.profiles) => link.proxy.update(pos.0, facing.0),
                _ => {
                    if let Some(old) = self.revealers.remove(&entity) {
                        for id in old.ids {
                            self.manager.remove_revealer(id);
                        }
                    }
                    let proxy = Arc::new(EntityProxy::new(pos.0, facing.0));
                    let ids = revealer
                        .profiles
                        .iter()
                        .enumerate()
                        .map(|(i, profile)| {
                            self.manager
                                .add_revealer(format!("{:?}/{}", entity, i), &proxy, profile.clone())
                        })
                        .collect();
                    debug!("實體 {:?} 加入 {} 個視錐", entity, revealer.profiles.len());
                    self.revealers.insert(
                        entity,
                        RevealerLink {
                            proxy,
                            ids,
                            profiles: revealer.profiles.clone(),
                        },
                    );
                }
            }
        }

        let stale: Vec<Entity> = self
            .revealers
            .keys()
            .filter(|e| {
                !entities.is_alive(**e)
                    || revealers.get(**e).is_none()
                    || positions.get(**e).is_none()
                    || facings.get(**e).is_none()
            })
            .copied()
            .collect();
        for entity in stale {
            if let Some(link) = self.revealers.remove(&entity) {
                debug!("實體 {:?} 不再揭露迷霧", entity);
                for id in link.ids {
                    self.manager.remove_revealer(id);
                }
            }
        }
    }

    fn sync_hidden(
        &mut self,
        entities: &Entities,
        positions: &ReadStorage<Pos>,
        hidden: &WriteStorage<HiddenInFog>,
    ) {
        for (entity, pos, _) in (&**entities, positions, hidden).join() {
            if let Some(link) = self.hidden.get(&entity) {
                link.proxy.update(pos.0, Vec3::unit_z());
                continue;
            }
            let proxy = Arc::new(EntityProxy::new(pos.0, Vec3::unit_z()));
            let membership = self.registrar.membership();
            membership.register_dynamically(&proxy);
            trace!("實體 {:?} 登錄為 {}", entity, membership.handle());
            self.hidden.insert(entity, HiddenLink { proxy, membership });
        }

        self.hidden.retain(|entity, link| {
            let keep = entities.is_alive(*entity) && hidden.get(*entity).is_some() && positions.get(*entity).is_some();
            if !keep {
                trace!("實體 {:?} 註銷 {}", entity, link.membership.handle());
                link.membership.deregister_dynamically();
            }
            keep
        });
    }
}

impl<'a, O: Occluder + Send + Sync + 'static> System<'a> for FogOfWarSystem<O> {
    type SystemData = (
        Entities<'a>,
        Read<'a, DeltaTime>,
        ReadStorage<'a, Pos>,
        ReadStorage<'a, Facing>,
        ReadStorage<'a, FogRevealer>,
        WriteStorage<'a, HiddenInFog>,
    );

    fn run(&mut self, (entities, dt, positions, facings, revealers, mut hidden): Self::SystemData) {
        self.sync_revealers(&entities, &positions, &facings, &revealers);
        self.sync_hidden(&entities, &positions, &hidden);

        let seconds = if dt.0.is_finite() && dt.0 > 0.0 { dt.0 } else { 0.0 };
        let report: TickReport = self.manager.advance(Duration::from_secs_f32(seconds));

        for (entity, link) in self.hidden.iter() {
            if let Some(mut state) = hidden.get_mut(*entity) {
                state.visible = link.proxy.visible();
                state.strength = link.proxy.strength();
            }
        }
        trace!("迷霧系統 tick {}: {} 個隱藏實體", report.tick, self.hidden.len());
    }
}
