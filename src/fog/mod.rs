/// 迷霧核心：登錄表、節流、合併策略與管理器
pub mod error;
pub mod registry;
pub mod throttle;
pub mod aggregator;
pub mod report;
pub mod manager;

pub use self::{
    error::{ErrorLatch, FogError, InvalidRevealerState},
    registry::{HiddenEntry, HiddenObjectRegistry, RegistryChange},
    throttle::{RevealerPhase, Throttle},
    aggregator::{AnyRevealer, Perception, Quorum, VisibilityAggregator, Verdict},
    report::TickReport,
    manager::{FogOfWarManager, RevealerAdjustment},
};
