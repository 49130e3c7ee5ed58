use serde::{Deserialize, Serialize};

use crate::damage::ArmorSplit;

/// HP and armor pools of one unit. Both are unsigned and only ever saturate at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub hp: u32,
    pub max_hp: u32,
    pub armor: u32,
    pub max_armor: u32,
    pub alive: bool,
}

impl Vitals {
    pub fn new(max_hp: u32, max_armor: u32) -> Self {
        Self { hp: max_hp, max_hp, armor: max_armor, max_armor, alive: max_hp > 0 }
    }

    /// Apply a resolved split. Returns true if the unit died this call.
    pub fn apply(&mut self, name: &str, split: &ArmorSplit, mut log: impl FnMut(String)) -> bool {
        if !self.alive {
            return false;
        }

        let (hp_before, armor_before) = (self.hp, self.armor);
        self.armor = self.armor.saturating_sub(split.armor_damage);
        self.hp = self.hp.saturating_sub(split.hp_damage);
        log(format!(
            "[DMG][{}] hp {} → {} (−{}), armor {} → {} (−{})",
            name, hp_before, self.hp, split.hp_damage, armor_before, self.armor, split.armor_damage
        ));

        if self.hp == 0 {
            self.alive = false;
            log(format!("[STATE][{}] destroyed", name));
            return true;
        }
        false
    }
}
