//! On-disk battle description: unit templates, rosters and enemy waves.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::{BattleSetup, Placement};
use crate::combat::targeting::TagHierarchy;
use crate::grid::{Grid, Layout, Position};
use crate::model::{ClassDamageMods, Environment, UnitTemplate};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scenario YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("placement refers to unknown unit id {0}")]
    UnknownUnit(u32),
}

fn default_layout() -> Layout {
    Layout::Equal5x3
}

fn rank_one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementSpec {
    /// Template id from [`Scenario::units`].
    pub unit: u32,
    #[serde(default = "rank_one")]
    pub rank: u32,
    pub col: u8,
    pub row: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default = "default_layout")]
    pub layout: Layout,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub tag_hierarchy: TagHierarchy,
    #[serde(default)]
    pub class_damage_mods: ClassDamageMods,
    pub units: Vec<UnitTemplate>,
    pub player: Vec<PlacementSpec>,
    pub waves: Vec<Vec<PlacementSpec>>,
    #[serde(default)]
    pub max_turns: Option<u32>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Resolve template ids into a setup the battle can be built from.
    pub fn to_setup(&self) -> Result<BattleSetup, ScenarioError> {
        let templates: BTreeMap<u32, Arc<UnitTemplate>> = self
            .units
            .iter()
            .map(|t| (t.id, Arc::new(t.clone())))
            .collect();
        let place = |specs: &[PlacementSpec]| -> Result<Vec<Placement>, ScenarioError> {
            specs
                .iter()
                .map(|s| {
                    let template =
                        templates.get(&s.unit).ok_or(ScenarioError::UnknownUnit(s.unit))?;
                    Ok(Placement {
                        template: Arc::clone(template),
                        rank: s.rank,
                        position: Position::new(s.col, s.row),
                    })
                })
                .collect()
        };

        Ok(BattleSetup {
            grid: Grid::new(self.layout),
            environment: self.environment.clone(),
            tags: self.tag_hierarchy.clone(),
            class_damage_mods: self.class_damage_mods.clone(),
            player: place(&self.player)?,
            waves: self.waves.iter().map(|w| place(w)).collect::<Result<_, _>>()?,
            max_turns: self.max_turns,
        })
    }
}
