//! RuleConfig - board size and movement/capture legality flags

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Immutable rule parameters, shared by reference once a game starts
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub size: u8,
    pub mandatory_capture: bool,
    /// Only captures with the longest available chain are legal
    pub max_capture_rule: bool,
    pub man_moves_forward_only: bool,
    pub man_captures_backward: bool,
    /// King moves any distance along an empty diagonal
    pub king_flying: bool,
    /// King captures at range (only with `king_flying`)
    pub king_capture_flying: bool,
    pub promote_immediate: bool,
    pub continue_capture_as_king_when_promoted: bool,
    /// Captured pieces stay on the board until the chain ends ("Turkish strike")
    pub remove_captured_at_end_of_chain: bool,
}

impl RuleConfig {
    /// Russian draughts on 8x8
    pub fn russian() -> Self {
        Self {
            size: 8,
            mandatory_capture: true,
            max_capture_rule: false,
            man_moves_forward_only: true,
            man_captures_backward: true,
            king_flying: true,
            king_capture_flying: true,
            promote_immediate: true,
            continue_capture_as_king_when_promoted: true,
            remove_captured_at_end_of_chain: false,
        }
    }

    pub fn with_size(mut self, size: u8) -> Self {
        self.size = size;
        self
    }

    pub fn with_mandatory_capture(mut self, on: bool) -> Self {
        self.mandatory_capture = on;
        self
    }

    pub fn with_max_capture_rule(mut self, on: bool) -> Self {
        self.max_capture_rule = on;
        self
    }

    pub fn with_man_moves_forward_only(mut self, on: bool) -> Self {
        self.man_moves_forward_only = on;
        self
    }

    pub fn with_man_captures_backward(mut self, on: bool) -> Self {
        self.man_captures_backward = on;
        self
    }

    pub fn with_king_flying(mut self, on: bool) -> Self {
        self.king_flying = on;
        self
    }

    pub fn with_king_capture_flying(mut self, on: bool) -> Self {
        self.king_capture_flying = on;
        self
    }

    pub fn with_promote_immediate(mut self, on: bool) -> Self {
        self.promote_immediate = on;
        self
    }

    pub fn with_continue_capture_as_king(mut self, on: bool) -> Self {
        self.continue_capture_as_king_when_promoted = on;
        self
    }

    pub fn with_remove_captured_at_end_of_chain(mut self, on: bool) -> Self {
        self.remove_captured_at_end_of_chain = on;
        self
    }

    /// Rows of men each side starts with
    pub fn home_rows(&self) -> u8 {
        self.size.saturating_sub(2) / 2
    }

    /// Kings capture across empty squares on both sides of the victim
    pub fn flying_king_capture(&self) -> bool {
        self.king_flying && self.king_capture_flying
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=16).contains(&self.size) || self.size % 2 != 0 {
            return Err(ConfigError::BadSize(self.size));
        }
        Ok(())
    }

    /// Load from JSON file; missing fields take Russian defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let rules: RuleConfig = serde_json::from_str(&content)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::russian()
    }
}
