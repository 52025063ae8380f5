//=====================================================
// File: require_lock.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Per-name mutual exclusion for concurrent requires
// Objective: Serialize requires of one name, detect same-thread reentry as a
//            circular require, and drop table entries once nobody needs them
//=====================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

//==================================================
// Section 1.0 - Reentrant lock
//==================================================

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
    next_ticket: u64,
    serving: u64,
}

/// Reentrant lock that knows its owning thread. The fair variant grants the
/// lock in arrival order.
#[derive(Debug)]
pub struct RequireLock {
    state: Mutex<LockState>,
    released: Condvar,
    fair: bool,
}

impl RequireLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
            fair: false,
        }
    }

    pub fn fair() -> Self {
        Self {
            fair: true,
            ..Self::new()
        }
    }

    pub fn is_fair(&self) -> bool {
        self.fair
    }

    /// Block until this thread owns the lock. Reentrant.
    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner == Some(me) {
            state.depth += 1;
            return;
        }
        if self.fair {
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            while state.owner.is_some() || state.serving != ticket {
                self.released.wait(&mut state);
            }
            state.serving += 1;
        } else {
            while state.owner.is_some() {
                self.released.wait(&mut state);
            }
        }
        state.owner = Some(me);
        state.depth = 1;
    }

    /// Release one level of ownership. Calls from a non-owner are ignored.
    pub fn unlock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            debug_assert!(false, "require lock released by a thread that does not hold it");
            return;
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            if self.fair {
                self.released.notify_all();
            } else {
                self.released.notify_one();
            }
        }
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }
}

impl Default for RequireLock {
    fn default() -> Self {
        Self::new()
    }
}

//==================================================
// Section 2.0 - Lock table
//==================================================

#[derive(Debug)]
struct Slot {
    lock: Arc<RequireLock>,
    // thread holding this name; distinct from the lock owner when the lock is global
    holder: Option<ThreadId>,
    // holder plus waiters; the slot goes away when this reaches zero
    users: usize,
}

/// Result of [`RequireLockTable::acquire`].
#[derive(Debug)]
pub enum LockOutcome<'a> {
    Acquired(RequireGuard<'a>),
    /// The calling thread is already inside a require of this name.
    AlreadyHeldByCaller,
}

/// Per-name require locks, created on first use and removed when the last
/// holder or waiter releases.
#[derive(Debug)]
pub struct RequireLockTable {
    slots: Mutex<HashMap<String, Slot>>,
    global: Option<Arc<RequireLock>>,
}

impl Default for RequireLockTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RequireLockTable {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            global: None,
        }
    }

    /// Every name shares one fair lock, so all requires are serialized.
    pub fn global() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            global: Some(Arc::new(RequireLock::fair())),
        }
    }

    pub fn is_global(&self) -> bool {
        self.global.is_some()
    }

    /// Take exclusivity for `name`, blocking while another thread holds it.
    /// The table guard is released before blocking.
    pub fn acquire(&self, name: &str) -> LockOutcome<'_> {
        let me = thread::current().id();
        let lock = {
            let mut slots = self.slots.lock();
            match slots.get_mut(name) {
                Some(slot) if slot.holder == Some(me) => return LockOutcome::AlreadyHeldByCaller,
                Some(slot) => {
                    slot.users += 1;
                    slot.lock.clone()
                }
                None => {
                    let lock = match &self.global {
                        Some(global) => global.clone(),
                        None => Arc::new(RequireLock::new()),
                    };
                    slots.insert(
                        name.to_string(),
                        Slot {
                            lock: lock.clone(),
                            holder: None,
                            users: 1,
                        },
                    );
                    lock
                }
            }
        };

        lock.lock();

        if let Some(slot) = self.slots.lock().get_mut(name) {
            slot.holder = Some(me);
        }
        LockOutcome::Acquired(RequireGuard {
            table: self,
            name: name.to_string(),
            lock,
        })
    }

    /// Unlock `name` and drop its slot if this was the last user. Only the
    /// slot owning `lock` is touched, so a fresh slot created for the same
    /// name in the meantime is left alone.
    fn release(&self, name: &str, lock: &Arc<RequireLock>) {
        {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots.get_mut(name) {
                if Arc::ptr_eq(&slot.lock, lock) {
                    slot.holder = None;
                    slot.users -= 1;
                    if slot.users == 0 {
                        slots.remove(name);
                    }
                }
            }
        }
        lock.unlock();
    }

    /// Whether the calling thread is inside a require of `name`.
    pub fn is_held_by_current_thread(&self, name: &str) -> bool {
        let me = thread::current().id();
        self.slots
            .lock()
            .get(name)
            .is_some_and(|slot| slot.holder == Some(me))
    }

    /// Live slots, held or waited on.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}

/// Exclusive hold on one name. Releases on drop, including during unwinding.
#[derive(Debug)]
pub struct RequireGuard<'a> {
    table: &'a RequireLockTable,
    name: String,
    lock: Arc<RequireLock>,
}

impl RequireGuard<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for RequireGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.name, &self.lock);
    }
}


//=====================================================
// End of file
//=====================================================
