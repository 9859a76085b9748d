mod actions;
pub mod plan;
pub mod store;

use std::fmt;

use axum::{routing::post, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{room_id}/tasks", post(actions::add_task))
        .route("/{room_id}/randomize", post(actions::randomize))
        .route("/{room_id}/tasks/{task_id}/assign", post(actions::assign))
        .route("/{room_id}/tasks/{task_id}/done", post(actions::set_done))
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Difficulty must be between 1 and 5.")]
pub struct DifficultyOutOfRange;

/// Chore difficulty, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Easy",
            2 => "Light",
            3 => "Medium",
            4 => "Hard",
            _ => "Brutal",
        }
    }

    pub fn all() -> impl Iterator<Item = Difficulty> {
        (1..=5).map(Difficulty)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(3)
    }
}

impl TryFrom<i64> for Difficulty {
    type Error = DifficultyOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Difficulty(value as u8))
        } else {
            Err(DifficultyOutOfRange)
        }
    }
}

impl From<Difficulty> for i64 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0.into()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
