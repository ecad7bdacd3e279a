use std::collections::HashMap;

/// One general-purpose register and its current binding.
#[derive(Debug, Clone)]
struct RegisterInfo {
    name: &'static str,
    content: Option<String>,
    last_use: u64,
    dirty: bool,
}

/// Fixed pool of the ten temporary registers $t0..$t9 and the eight saved
/// registers $s0..$s7, with LRU eviction and spill-to-stack bookkeeping.
/// Each register holds at most one content name: a variable, a temporary or
/// a `const_<literal>` pseudo-name. Every hit refreshes the LRU clock.
///
/// There is no lookahead and no register classes; registers held across
/// calls are not preserved. This is the documented baseline allocator.
pub struct RegisterAllocator {
    pool: Vec<RegisterInfo>,
    clock: u64,
    spill_base: i64,
    next_spill_slot: i64,
    spill_map: HashMap<String, i64>,
}

impl RegisterAllocator {
    const TEMP_REGISTERS: [&'static str; 10] =
        ["$t0", "$t1", "$t2", "$t3", "$t4", "$t5", "$t6", "$t7", "$t8", "$t9"];
    const SAVED_REGISTERS: [&'static str; 8] =
        ["$s0", "$s1", "$s2", "$s3", "$s4", "$s5", "$s6", "$s7"];

    pub fn new() -> Self {
        let pool = Self::TEMP_REGISTERS.iter()
            .chain(Self::SAVED_REGISTERS.iter())
            .map(|name| RegisterInfo {
                name,
                content: None,
                last_use: 0,
                dirty: false,
            })
            .collect();

        Self {
            pool,
            clock: 0,
            spill_base: 0,
            next_spill_slot: 0,
            spill_map: HashMap::new(),
        }
    }

    fn touch(clock: &mut u64, register: &mut RegisterInfo) {
        *clock += 1;
        register.last_use = *clock;
    }

    /// Return the register holding `name`, binding a free or LRU-evicted
    /// register when none does. A hit refreshes the clock tick.
    pub fn get_reg_for(&mut self, name: &str) -> &'static str {
        if let Some(index) = self.pool.iter().position(|r| r.content.as_deref() == Some(name)) {
            Self::touch(&mut self.clock, &mut self.pool[index]);
            return self.pool[index].name;
        }

        if let Some(index) = self.pool.iter().position(|r| r.content.is_none()) {
            self.pool[index].content = Some(String::from(name));
            self.pool[index].dirty = false;
            Self::touch(&mut self.clock, &mut self.pool[index]);
            return self.pool[index].name;
        }

        let victim = self.pool.iter()
            .enumerate()
            .min_by_key(|(_, r)| r.last_use)
            .map(|(index, _)| index)
            .unwrap();
        self.spill_index(victim);
        self.pool[victim].content = Some(String::from(name));
        self.pool[victim].dirty = false;
        Self::touch(&mut self.clock, &mut self.pool[victim]);
        self.pool[victim].name
    }

    /// Rebind `reg` to hold `name`, releasing any other register that
    /// currently holds it. Used after an instruction writes its result.
    pub fn bind(&mut self, reg: &str, name: &str) {
        for register in self.pool.iter_mut() {
            if register.name != reg && register.content.as_deref() == Some(name) {
                register.content = None;
                register.dirty = false;
            }
        }
        if let Some(register) = self.pool.iter_mut().find(|r| r.name == reg) {
            register.content = Some(String::from(name));
            Self::touch(&mut self.clock, register);
        }
    }

    /// Unbind a register. With `store` set the content is first given a
    /// spill slot so a later lookup can find it on the stack.
    pub fn free_reg(&mut self, reg: &str, store: bool) -> bool {
        let index = match self.pool.iter().position(|r| r.name == reg) {
            Some(index) => index,
            None => return false,
        };
        if store {
            if let Some(content) = self.pool[index].content.clone() {
                self.assign_spill_slot(&content);
            }
        }
        self.pool[index].content = None;
        self.pool[index].dirty = false;
        true
    }

    pub fn mark_dirty(&mut self, reg: &str) {
        if let Some(register) = self.pool.iter_mut().find(|r| r.name == reg) {
            register.dirty = true;
            Self::touch(&mut self.clock, register);
        }
    }

    /// Register currently holding `name`, if any. Does not touch the clock.
    pub fn find_by_content(&self, name: &str) -> Option<&'static str> {
        self.pool.iter()
            .find(|r| r.content.as_deref() == Some(name))
            .map(|r| r.name)
    }

    /// Spill the register's binding: the content gets a stack slot above
    /// the spill base (assigned once per name) and the register unbinds.
    pub fn spill(&mut self, reg: &str) {
        if let Some(index) = self.pool.iter().position(|r| r.name == reg) {
            self.spill_index(index);
        }
    }

    fn spill_index(&mut self, index: usize) {
        if let Some(content) = self.pool[index].content.clone() {
            self.assign_spill_slot(&content);
        }
        self.pool[index].content = None;
        self.pool[index].dirty = false;
    }

    fn assign_spill_slot(&mut self, name: &str) {
        if !self.spill_map.contains_key(name) {
            let offset = self.spill_base + self.next_spill_slot;
            self.next_spill_slot += 4;
            self.spill_map.insert(String::from(name), offset);
        }
    }

    pub fn has_spill(&self, name: &str) -> bool {
        self.spill_map.contains_key(name)
    }

    pub fn get_spill_offset(&self, name: &str) -> Option<i64> {
        self.spill_map.get(name).copied()
    }

    /// Spill slots are allocated upward from this base offset. The MIPS
    /// generator sets it to the frame size of the current function.
    pub fn set_spill_base(&mut self, base: i64) {
        self.spill_base = base;
    }
}
