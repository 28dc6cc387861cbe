/// 隱藏物件登錄表
///
/// 只有管理器會修改登錄表，外部的新增/移除都先經過指令佇列。

use std::fmt;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use log::{debug, warn};
use vek::Vec3;

use crate::comp::hidden::{HiddenHandle, HiddenObject, RegistryCommand};
use crate::fog::error::FogError;

/// 登錄表中的一筆資料
#[derive(Clone)]
pub struct HiddenEntry {
    handle: HiddenHandle,
    provider: Weak<dyn HiddenObject>,
    pub(crate) visible: bool,
    pub(crate) strength: f32,
}

impl HiddenEntry {
    pub fn handle(&self) -> HiddenHandle {
        self.handle
    }

    /// 最後一次通知給物件的可見狀態
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn provider(&self) -> Option<Arc<dyn HiddenObject>> {
        self.provider.upgrade()
    }

    /// 物件已被銷毀但還沒註銷
    pub fn is_defunct(&self) -> bool {
        self.provider.strong_count() == 0
    }
}

impl fmt::Debug for HiddenEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HiddenEntry")
            .field("handle", &self.handle)
            .field("visible", &self.visible)
            .field("strength", &self.strength)
            .field("defunct", &self.is_defunct())
            .finish()
    }
}

/// 套用指令後的結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryChange {
    Added(HiddenHandle),
    Removed(HiddenHandle),
    Unchanged,
}

/// 本 tick 參與計算的物件
#[derive(Clone)]
pub struct SnapshotItem {
    pub handle: HiddenHandle,
    pub position: Vec3<f32>,
    pub object: Arc<dyn HiddenObject>,
}

/// 計算開始時擷取的快照；持有強參考直到本 tick 結束
#[derive(Default)]
pub struct RegistrySnapshot {
    pub items: Vec<SnapshotItem>,
    pub purged: Vec<HiddenHandle>,
}

#[derive(Debug, Default)]
pub struct HiddenObjectRegistry {
    entries: HashMap<HiddenHandle, HiddenEntry>,
}

impl HiddenObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增物件，重複的 handle 回傳錯誤且不改變內容
    pub fn add(&mut self, handle: HiddenHandle, provider: Weak<dyn HiddenObject>) -> Result<&HiddenEntry, FogError> {
        use hashbrown::hash_map::Entry;
        match self.entries.entry(handle) {
            Entry::Occupied(_) => Err(FogError::DuplicateHandle(handle)),
            Entry::Vacant(slot) => Ok(slot.insert(HiddenEntry {
                handle,
                provider,
                visible: false,
                strength: 0.0,
            })),
        }
    }

    /// 移除物件，不存在時是 no-op
    pub fn remove(&mut self, handle: HiddenHandle) -> Option<HiddenEntry> {
        self.entries.remove(&handle)
    }

    pub fn apply(&mut self, command: RegistryCommand) -> Result<RegistryChange, FogError> {
        match command {
            RegistryCommand::Add { handle, provider } => {
                self.add(handle, provider)?;
                Ok(RegistryChange::Added(handle))
            }
            RegistryCommand::Remove(handle) => Ok(match self.remove(handle) {
                Some(_) => RegistryChange::Removed(handle),
                None => RegistryChange::Unchanged,
            }),
        }
    }

    pub fn contains(&self, handle: HiddenHandle) -> bool {
        self.entries.contains_key(&handle)
    }

    pub fn get(&self, handle: HiddenHandle) -> Option<&HiddenEntry> {
        self.entries.get(&handle)
    }

    pub(crate) fn get_mut(&mut self, handle: HiddenHandle) -> Option<&mut HiddenEntry> {
        self.entries.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有登錄中的物件；迭代器可 clone 以重新遍歷
    pub fn entries(&self) -> impl Iterator<Item = &HiddenEntry> + Clone + '_ {
        self.entries.values()
    }

    /// 依 handle 排序的清單
    pub fn handles(&self) -> Vec<HiddenHandle> {
        let mut handles: Vec<_> = self.entries.keys().copied().collect();
        handles.sort_unstable();
        handles
    }

    /// 擷取本 tick 的位置並清除已銷毀的物件
    pub fn snapshot(&mut self) -> RegistrySnapshot {
        let mut snapshot = RegistrySnapshot {
            items: Vec::with_capacity(self.entries.len()),
            purged: Vec::new(),
        };

        for entry in self.entries.values() {
            match entry.provider.upgrade() {
                Some(object) => snapshot.items.push(SnapshotItem {
                    handle: entry.handle,
                    position: object.position(),
                    object,
                }),
                None => snapshot.purged.push(entry.handle),
            }
        }

        for handle in &snapshot.purged {
            self.entries.remove(handle);
            warn!("{}", FogError::DefunctEntry(*handle));
        }
        if !snapshot.purged.is_empty() {
            debug!("清除 {} 個已銷毀的隱藏物件，剩餘 {}", snapshot.purged.len(), self.entries.len());
        }

        snapshot.items.sort_unstable_by_key(|item| item.handle);
        snapshot.purged.sort_unstable();
        snapshot
    }
}
