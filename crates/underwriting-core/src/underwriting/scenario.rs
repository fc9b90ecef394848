use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assumptions::UnderwritingInput;
use super::model::{evaluate, UnderwritingResult};
use crate::error::UnderwritingError;
use crate::EngineResult;

/// A named set of assumptions and the result they produce, owned by a deal.
///
/// Scenarios are values: changing the assumptions yields a new scenario and
/// leaves the original untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderwritingScenario {
    pub deal_id: String,
    pub name: String,
    pub input: UnderwritingInput,
    pub result: UnderwritingResult,
    /// Warnings raised while computing `result`
    #[serde(default)]
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UnderwritingScenario {
    /// Underwrite `input` and bundle it under `deal_id`.
    pub fn create(
        deal_id: impl Into<String>,
        name: impl Into<String>,
        input: UnderwritingInput,
        at: DateTime<Utc>,
    ) -> EngineResult<Self> {
        let deal_id = deal_id.into();
        let name = name.into();
        if deal_id.trim().is_empty() {
            return Err(UnderwritingError::invalid("deal_id", "Deal id cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(UnderwritingError::invalid("name", "Scenario name cannot be empty"));
        }

        let mut warnings = Vec::new();
        let result = evaluate(&input, &mut warnings)?;
        tracing::debug!(%deal_id, scenario = %name, "scenario created");

        Ok(UnderwritingScenario {
            deal_id,
            name,
            input,
            result,
            warnings,
            created_at: at,
            updated_at: at,
        })
    }

    /// Recompute under new assumptions, keeping identity and creation time.
    pub fn with_assumptions(&self, input: UnderwritingInput, at: DateTime<Utc>) -> EngineResult<Self> {
        let mut warnings = Vec::new();
        let result = evaluate(&input, &mut warnings)?;
        Ok(UnderwritingScenario {
            deal_id: self.deal_id.clone(),
            name: self.name.clone(),
            input,
            result,
            warnings,
            created_at: self.created_at,
            updated_at: at.max(self.updated_at),
        })
    }

    /// Same assumptions under a different name, e.g. "Downside".
    pub fn renamed(&self, name: impl Into<String>, at: DateTime<Utc>) -> EngineResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(UnderwritingError::invalid("name", "Scenario name cannot be empty"));
        }
        Ok(UnderwritingScenario {
            name,
            updated_at: at.max(self.updated_at),
            ..self.clone()
        })
    }
}
