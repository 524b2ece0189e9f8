use serde::{Deserialize, Serialize};

pub const QUANT_PLAN_TILES: u32 = 4;

/// What happens to a slug with no card behind it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlugResolution {
    #[default]
    Lenient,
    Strict,
}

/// Facilitator options. Each `*_choices` list is what the options screen
/// offers; the matching index picks the active value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    /// Minutes per round, `None` for unlimited.
    pub round_length_choices: Vec<Option<u32>>,
    pub round_length_index: usize,
    pub event_cards_choices: Vec<u32>,
    pub event_cards_index: usize,
    pub work_late_tile_choices: Vec<u32>,
    pub work_late_tile_index: usize,
    pub teams: u32,
    pub plan_tiles: u32,
    pub slug_resolution: SlugResolution,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_length_choices: vec![Some(15), Some(30), Some(60), Some(120), None],
            round_length_index: 1,
            event_cards_choices: vec![0, 1, 2, 3, 4, 5],
            event_cards_index: 0,
            work_late_tile_choices: vec![0, 1, 2, 3, 4],
            work_late_tile_index: 4,
            teams: 1,
            plan_tiles: QUANT_PLAN_TILES,
            slug_resolution: SlugResolution::Lenient,
        }
    }
}

impl GameConfig {
    pub fn round_length_minutes(&self) -> Option<u32> {
        self.round_length_choices
            .get(self.round_length_index)
            .copied()
            .flatten()
    }

    pub fn event_cards_per_round(&self) -> u32 {
        self.event_cards_choices
            .get(self.event_cards_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn work_late_tiles_per_team(&self) -> u32 {
        self.work_late_tile_choices
            .get(self.work_late_tile_index)
            .copied()
            .unwrap_or(0)
    }

    pub fn is_strict(&self) -> bool {
        self.slug_resolution == SlugResolution::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pick_expected_choices() {
        let config = GameConfig::default();
        assert_eq!(config.round_length_minutes(), Some(30));
        assert_eq!(config.event_cards_per_round(), 0);
        assert_eq!(config.work_late_tiles_per_team(), 4);
        assert_eq!(config.teams, 1);
        assert!(!config.is_strict());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{"teams": 3, "round_length_index": 4, "slug_resolution": "strict"}"#)
                .expect("config");
        assert_eq!(config.teams, 3);
        assert_eq!(config.round_length_minutes(), None);
        assert!(config.is_strict());
        assert_eq!(config.plan_tiles, QUANT_PLAN_TILES);
    }

    #[test]
    fn out_of_range_index_falls_back() {
        let config = GameConfig {
            event_cards_index: 40,
            ..GameConfig::default()
        };
        assert_eq!(config.event_cards_per_round(), 0);
    }
}
