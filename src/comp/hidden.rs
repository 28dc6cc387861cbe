/// 隱藏物件的能力介面與註冊管道
///
/// 物件透過 `FogRegistrar` 把新增/移除指令送進管理器的佇列，
/// 管理器只在 tick 的安全點（計算前後）才套用，
/// 因此在計算途中註冊或註銷都不會打亂正在進行的遍歷。

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use vek::Vec3;

/// 隱藏物件的穩定識別碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HiddenHandle(pub u64);

impl fmt::Display for HiddenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hidden#{}", self.0)
    }
}

/// 可被迷霧隱藏的物件
///
/// 管理器只持有 `Weak` 參考，物件的生命週期完全由擁有者決定。
pub trait HiddenObject: Send + Sync {
    /// 物件目前的世界座標
    fn position(&self) -> Vec3<f32>;

    /// 可見狀態改變時呼叫
    fn set_visible(&self, visible: bool);

    /// 感知強度 [0, 1]，可見時才有意義
    fn set_strength(&self, _strength: f32) {}
}

/// 延遲套用的註冊指令
#[derive(Debug, Clone)]
pub enum RegistryCommand {
    Add {
        handle: HiddenHandle,
        provider: Weak<dyn HiddenObject>,
    },
    Remove(HiddenHandle),
}

impl RegistryCommand {
    pub fn handle(&self) -> HiddenHandle {
        match self {
            RegistryCommand::Add { handle, .. } => *handle,
            RegistryCommand::Remove(handle) => *handle,
        }
    }
}

/// 註冊端，可任意 clone 給遊戲物件使用
#[derive(Clone)]
pub struct FogRegistrar {
    commands: Sender<RegistryCommand>,
    next_handle: Arc<AtomicU64>,
}

impl FogRegistrar {
    /// 建立註冊端與管理器持有的接收端
    pub fn channel() -> (Self, Receiver<RegistryCommand>) {
        let (commands, receiver) = unbounded();
        let registrar = Self {
            commands,
            next_handle: Arc::new(AtomicU64::new(1)),
        };
        (registrar, receiver)
    }

    /// 配置新的 handle，單調遞增不重複
    pub fn allocate(&self) -> HiddenHandle {
        HiddenHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    pub fn register<T: HiddenObject + 'static>(&self, handle: HiddenHandle, object: &Arc<T>) {
        let weak: Weak<T> = Arc::downgrade(object);
        let provider: Weak<dyn HiddenObject> = weak;
        self.send(RegistryCommand::Add { handle, provider });
    }

    pub fn deregister(&self, handle: HiddenHandle) {
        self.send(RegistryCommand::Remove(handle));
    }

    /// 配置 handle 並包成會自動註銷的成員資格
    pub fn membership(&self) -> FogMembership {
        FogMembership {
            registrar: self.clone(),
            handle: self.allocate(),
            registered: AtomicBool::new(false),
        }
    }

    fn send(&self, command: RegistryCommand) {
        trace!("迷霧註冊指令: {:?}", command);
        if self.commands.send(command).is_err() {
            debug!("迷霧管理器已關閉，忽略註冊指令");
        }
    }
}

impl fmt::Debug for FogRegistrar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FogRegistrar")
            .field("next_handle", &self.next_handle.load(Ordering::Relaxed))
            .field("pending", &self.commands.len())
            .finish()
    }
}

/// 物件持有的註冊狀態
///
/// 重複註冊或重複註銷都是 no-op；drop 時若仍在註冊中會自動送出移除指令。
pub struct FogMembership {
    registrar: FogRegistrar,
    handle: HiddenHandle,
    registered: AtomicBool,
}

impl FogMembership {
    pub fn handle(&self) -> HiddenHandle {
        self.handle
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// 動態加入迷霧系統
    pub fn register_dynamically<T: HiddenObject + 'static>(&self, object: &Arc<T>) {
        if !self.registered.swap(true, Ordering::AcqRel) {
            self.registrar.register(self.handle, object);
        }
    }

    /// 動態退出迷霧系統
    pub fn deregister_dynamically(&self) {
        if self.registered.swap(false, Ordering::AcqRel) {
            self.registrar.deregister(self.handle);
        }
    }
}

impl Drop for FogMembership {
    fn drop(&mut self) {
        self.deregister_dynamically();
    }
}

impl fmt::Debug for FogMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FogMembership")
            .field("handle", &self.handle)
            .field("registered", &self.is_registered())
            .finish()
    }
}
