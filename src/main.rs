use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{debug, info, warn, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use specs::prelude::*;
use vek::Vec3;

use fogwar::{
    DeltaTime, Facing, FogEvent, FogOfWarManager, FogOfWarSystem, FogRevealer, FogSetting, HiddenInFog,
    PerceptionCurve, Pos, RevealerProfile, SharedProfile,
};

const TPS: u64 = 10;
const DEMO_TICKS: u64 = 120;
const MAX_DELTA_TIME: f32 = 1.0;

/// 固定 tick 速率的時鐘
struct Clock {
    target: Duration,
    last: Instant,
    dt: Duration,
}

impl Clock {
    fn new(target: Duration) -> Self {
        Self {
            target,
            last: Instant::now(),
            dt: target,
        }
    }

    fn dt(&self) -> Duration {
        self.dt
    }

    fn tick(&mut self) {
        let elapsed = self.last.elapsed();
        if elapsed < self.target {
            spin_sleep::sleep(self.target - elapsed);
        }
        let now = Instant::now();
        self.dt = now - self.last;
        self.last = now;
    }
}

fn init_logging() -> Result<()> {
    if log4rs::init_file("log4rs.yml", Default::default()).is_ok() {
        return Ok(());
    }
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S%.3f)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;
    Ok(())
}

fn profile_or(setting: &FogSetting, name: &str, fallback: RevealerProfile) -> SharedProfile {
    setting.profile(name).unwrap_or_else(|| {
        warn!("設定檔缺少 revealers.{}，使用預設值", name);
        SharedProfile::new(fallback)
    })
}

fn main() -> Result<()> {
    init_logging()?;

    let path = std::env::args().nth(1).unwrap_or_else(|| "fog.toml".to_string());
    let setting = FogSetting::load_from_file(&path).unwrap_or_else(|err| {
        warn!("{:#}，改用預設迷霧設定", err);
        FogSetting::default()
    });

    let cone = profile_or(
        &setting,
        "player_cone",
        RevealerProfile::new(90.0, 12.0).with_perception_falloff(PerceptionCurve::linear_falloff()),
    );
    let aura = profile_or(&setting, "player_aura", RevealerProfile::new(360.0, 3.0));
    let tower = profile_or(
        &setting,
        "watch_tower",
        RevealerProfile::new(360.0, 8.0).with_static(true),
    );

    let manager = FogOfWarManager::with_config(setting.build_obstacle_map(), setting.manager.clone());
    let mut system = FogOfWarSystem::new(manager);
    let events = system.manager_mut().subscribe();

    let mut world = World::new();
    world.register::<Pos>();
    world.register::<Facing>();
    world.register::<FogRevealer>();
    world.register::<HiddenInFog>();
    world.insert(DeltaTime(0.0));

    let player = world
        .create_entity()
        .with(Pos(Vec3::new(0.0, 1.0, -10.0)))
        .with(Facing(Vec3::unit_z()))
        .with(FogRevealer::new(cone.clone()).with_profile(aura))
        .build();
    world
        .create_entity()
        .with(Pos(Vec3::new(12.0, 4.0, 12.0)))
        .with(Facing(Vec3::unit_z()))
        .with(FogRevealer::new(tower))
        .build();

    let enemies: Vec<Entity> = (0..8)
        .map(|i| {
            let angle = i as f32 / 8.0 * TAU;
            world
                .create_entity()
                .with(Pos(Vec3::new(angle.sin() * 7.0, 0.0, angle.cos() * 7.0)))
                .with(HiddenInFog::default())
                .build()
        })
        .collect();

    let mut dispatcher = DispatcherBuilder::new().with(system, "fog_of_war", &[]).build();
    dispatcher.setup(&mut world);

    info!("迷霧示範開始: {} TPS, {} ticks, {} 個敵人", TPS, DEMO_TICKS, enemies.len());
    let mut clock = Clock::new(Duration::from_secs_f64(1.0 / TPS as f64));
    let mut elapsed = 0.0_f32;

    for tick in 0..DEMO_TICKS {
        let dt = clock.dt().as_secs_f32().min(MAX_DELTA_TIME);
        elapsed += dt;
        world.write_resource::<DeltaTime>().0 = dt;

        // 玩家繞場中心巡邏，面向前進方向
        {
            let angle = elapsed * 0.4;
            let mut positions = world.write_storage::<Pos>();
            let mut facings = world.write_storage::<Facing>();
            if let Some(mut pos) = positions.get_mut(player) {
                pos.0 = Vec3::new(angle.sin() * 10.0, 1.0, -angle.cos() * 10.0);
            }
            if let Some(mut facing) = facings.get_mut(player) {
                facing.0 = Vec3::new(angle.cos(), 0.0, angle.sin());
            }
        }

        if tick == DEMO_TICKS / 3 {
            if let Err(err) = world.delete_entity(enemies[0]) {
                warn!("刪除敵人失敗: {}", err);
            } else {
                info!("敵人 {:?} 被擊殺", enemies[0]);
            }
        }
        if tick == DEMO_TICKS / 2 {
            info!("玩家視角擴大到 120 度");
            cone.edit(|p| p.set_fov_degrees(120.0));
        }

        dispatcher.dispatch(&world);
        world.maintain();

        for event in events.try_iter() {
            match event {
                FogEvent::VisibilityChanged { handle, visible, strength } => {
                    info!("tick {}: {} {} (強度 {:.2})", tick, handle, if visible { "現形" } else { "隱沒" }, strength);
                }
                other => debug!("tick {}: {:?}", tick, other),
            }
        }

        clock.tick();
    }

    let hidden = world.read_storage::<HiddenInFog>();
    let visible = (&hidden).join().filter(|h| h.visible).count();
    info!("示範結束: {} 個敵人中 {} 個可見", (&hidden).join().count(), visible);
    Ok(())
}
