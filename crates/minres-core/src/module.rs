//! Module slots of a machine and the productivity bonus they grant.

use crate::registry::{GameData, Module};

/// The module inventory of one machine. Holds whole modules, one per slot.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleSlots {
    machine: String,
    max_slots: u32,
    /// Empty accepts any module.
    allowed: Vec<String>,
    modules: Vec<Module>,
}

impl ModuleSlots {
    pub fn new(machine: &str, max_slots: u32, allowed: Vec<String>) -> Self {
        Self {
            machine: machine.to_string(),
            max_slots,
            allowed,
            modules: Vec::new(),
        }
    }

    pub fn max_slots(&self) -> u32 {
        self.max_slots
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn count(&self, module: &str) -> u32 {
        self.modules.iter().filter(|m| m.name == module).count() as u32
    }

    /// Sum of the productivity effects that apply to `recipe`. An empty
    /// recipe name counts every module.
    pub fn productivity_bonus(&self, recipe: &str) -> f64 {
        self.modules
            .iter()
            .filter(|m| recipe.is_empty() || m.applies_to(recipe))
            .map(Module::productivity_bonus)
            .sum()
    }

    /// Insert `amount` copies of a registered module.
    pub fn put(&mut self, data: &GameData, module: &str, amount: u32) -> Result<(), ModuleError> {
        self.check_allowed(module)?;
        let def = data.module(module).ok_or_else(|| ModuleError::UnknownModule {
            module: module.to_string(),
        })?;
        let wanted = (self.modules.len() as u32).saturating_add(amount);
        if wanted > self.max_slots {
            return Err(ModuleError::TooManyModules {
                machine: self.machine.clone(),
                max: self.max_slots,
                wanted,
            });
        }
        for _ in 0..amount {
            self.modules.push(def.clone());
        }
        Ok(())
    }

    /// Remove `amount` copies of a module. Fails without side effects.
    pub fn take(&mut self, module: &str, amount: u32) -> Result<(), ModuleError> {
        self.check_allowed(module)?;
        let held = self.count(module);
        if held < amount {
            return Err(ModuleError::NotEnoughModules {
                machine: self.machine.clone(),
                wanted: amount,
                held,
            });
        }
        let mut remaining = amount;
        self.modules.retain(|m| {
            if remaining > 0 && m.name == module {
                remaining -= 1;
                false
            } else {
                true
            }
        });
        Ok(())
    }

    /// Install a module directly, bypassing the data lookup.
    ///
    /// # Panics
    ///
    /// Panics if every slot is already occupied.
    pub fn install(&mut self, module: Module) {
        assert!(
            (self.modules.len() as u32) < self.max_slots,
            "machine '{}' has no free module slot",
            self.machine
        );
        self.modules.push(module);
    }

    /// Remove every module, returning name counts.
    pub fn drain(&mut self) -> Vec<(String, u32)> {
        let mut out: Vec<(String, u32)> = Vec::new();
        for m in self.modules.drain(..) {
            match out.iter_mut().find(|(name, _)| *name == m.name) {
                Some((_, n)) => *n += 1,
                None => out.push((m.name, 1)),
            }
        }
        out
    }

    fn check_allowed(&self, module: &str) -> Result<(), ModuleError> {
        if !self.allowed.is_empty() && !self.allowed.iter().any(|a| a == module) {
            return Err(ModuleError::ForbiddenModule {
                machine: self.machine.clone(),
                module: module.to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModuleError {
    #[error("machine '{machine}' has {max} module slots, {wanted} requested")]
    TooManyModules {
        machine: String,
        max: u32,
        wanted: u32,
    },
    #[error("tried to take {wanted} modules from '{machine}' which holds {held}")]
    NotEnoughModules {
        machine: String,
        wanted: u32,
        held: u32,
    },
    #[error("module '{module}' not allowed in machine '{machine}'")]
    ForbiddenModule { machine: String, module: String },
    #[error("unknown module '{module}'")]
    UnknownModule { module: String },
}
