use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStage {
    Preparing,
    Analyzing,
    Generating,
    Saving,
    Complete,
    Error,
}

impl GenerationStage {
    pub fn default_percent(self) -> u8 {
        match self {
            GenerationStage::Preparing => 10,
            GenerationStage::Analyzing => 30,
            GenerationStage::Generating => 50,
            GenerationStage::Saving => 90,
            GenerationStage::Complete => 100,
            GenerationStage::Error => 0,
        }
    }

    fn rank(self) -> u8 {
        match self {
            GenerationStage::Preparing => 0,
            GenerationStage::Analyzing => 1,
            GenerationStage::Generating => 2,
            GenerationStage::Saving => 3,
            GenerationStage::Complete | GenerationStage::Error => 4,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, GenerationStage::Complete | GenerationStage::Error)
    }
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GenerationStage::Preparing => "preparing",
            GenerationStage::Analyzing => "analyzing",
            GenerationStage::Generating => "generating",
            GenerationStage::Saving => "saving",
            GenerationStage::Complete => "complete",
            GenerationStage::Error => "error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageTransitionError {
    #[error("cannot move generation progress back from {from} to {to}")]
    Backward {
        from: GenerationStage,
        to: GenerationStage,
    },

    #[error("generation already finished in stage {0}; reset before reuse")]
    Finished(GenerationStage),
}

impl From<StageTransitionError> for AppError {
    fn from(err: StageTransitionError) -> Self {
        AppError::InternalError(err.to_string())
    }
}

/// Progress reporter for one generation run. Reports only; it never drives or
/// retries the underlying call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, SimpleObject)]
pub struct GenerationProgress {
    pub stage: GenerationStage,
    pub percent: i32,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

impl Default for GenerationProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationProgress {
    pub fn new() -> Self {
        Self {
            stage: GenerationStage::Preparing,
            percent: 0,
            message: "Waiting to start".to_string(),
            updated_at: Utc::now(),
        }
    }

    pub fn preparing(
        &mut self,
        percent: Option<u8>,
        message: &str,
    ) -> Result<(), StageTransitionError> {
        self.advance(GenerationStage::Preparing, percent, message)
    }

    pub fn analyzing(
        &mut self,
        percent: Option<u8>,
        message: &str,
    ) -> Result<(), StageTransitionError> {
        self.advance(GenerationStage::Analyzing, percent, message)
    }

    /// Can be called repeatedly with increasing percentages to report sub-progress.
    pub fn generating(
        &mut self,
        percent: Option<u8>,
        message: &str,
    ) -> Result<(), StageTransitionError> {
        self.advance(GenerationStage::Generating, percent, message)
    }

    pub fn saving(
        &mut self,
        percent: Option<u8>,
        message: &str,
    ) -> Result<(), StageTransitionError> {
        self.advance(GenerationStage::Saving, percent, message)
    }

    pub fn complete(&mut self, message: &str) -> Result<(), StageTransitionError> {
        self.advance(GenerationStage::Complete, None, message)
    }

    /// Moves to the error stage from anywhere except a completed run. Keeps the
    /// last percentage so the caller can show how far it got.
    pub fn fail(&mut self, message: &str) -> Result<(), StageTransitionError> {
        if self.stage == GenerationStage::Complete {
            return Err(StageTransitionError::Finished(self.stage));
        }
        self.stage = GenerationStage::Error;
        self.message = message.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn advance(
        &mut self,
        to: GenerationStage,
        percent: Option<u8>,
        message: &str,
    ) -> Result<(), StageTransitionError> {
        if self.stage.is_terminal() {
            return Err(StageTransitionError::Finished(self.stage));
        }
        if to.rank() < self.stage.rank() {
            return Err(StageTransitionError::Backward {
                from: self.stage,
                to,
            });
        }

        let percent = percent.unwrap_or_else(|| to.default_percent()).min(100);
        self.stage = to;
        self.percent = i32::from(percent);
        self.message = message.to_string();
        self.updated_at = Utc::now();
        Ok(())
    }
}
