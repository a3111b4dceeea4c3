//! Model selection.
//!
//! Scores every catalog row against the prompt's requirements and picks
//! the best fit. Selection never fails the user-visible request: when no
//! candidate scores above zero, it falls back to the catalog's default
//! model with a warning.

use crate::analyze::{Analyzer, Requirements};
use compact_str::CompactString;
use ocore::{Capability, Catalog, Model};

/// Scores candidates and picks a model when the caller does not pin one.
#[derive(Clone)]
pub struct Selector<M> {
    catalog: Catalog,
    analyzer: Analyzer<M>,
}

impl<M: Model + Send + Sync> Selector<M> {
    /// Create a selector over the given catalog.
    pub fn new(catalog: Catalog, analyzer: Analyzer<M>) -> Self {
        Self { catalog, analyzer }
    }

    /// Select the best-fit model for a prompt.
    ///
    /// An analysis failure is logged and answered with the default
    /// model; it never surfaces to the caller.
    pub async fn select(
        &self,
        prompt: &str,
        has_images: bool,
        needs_functions: bool,
        budget_constraint: Option<f64>,
    ) -> CompactString {
        let mut requirements = match self
            .analyzer
            .analyze(prompt, has_images, needs_functions)
            .await
        {
            Ok(requirements) => requirements,
            Err(e) => {
                tracing::warn!(
                    "prompt analysis failed, falling back to '{}': {e}",
                    self.catalog.default_model()
                );
                return self.catalog.default_model().clone();
            }
        };
        requirements.budget_constraint = budget_constraint;
        self.pick(&requirements)
    }

    /// Pick the highest-scoring model for fixed requirements.
    ///
    /// Pure in its inputs: the same requirements and catalog always
    /// produce the same model. Catalog order breaks ties.
    pub fn pick(&self, requirements: &Requirements) -> CompactString {
        let mut best: Option<(f64, &Capability)> = None;

        for row in self.catalog.iter() {
            let (value, excluded) = score(requirements, row);
            if let Some(reason) = excluded {
                tracing::debug!("model {} excluded: {reason}", row.id);
                continue;
            }
            tracing::debug!("model {} scored {value:.2}", row.id);
            match &best {
                Some((top, _)) if value <= *top => {}
                _ => best = Some((value, row)),
            }
        }

        match best {
            Some((value, row)) if value > 0.0 => row.id.clone(),
            _ => {
                tracing::warn!(
                    "no candidate model scored above zero, falling back to '{}'",
                    self.catalog.default_model()
                );
                self.catalog.default_model().clone()
            }
        }
    }

    /// The catalog this selector scores against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// Score one capability row against the requirements.
///
/// Returns the score and, when the model is excluded outright, the
/// exclusion reason. Excluded models score exactly zero.
pub fn score(requirements: &Requirements, model: &Capability) -> (f64, Option<&'static str>) {
    if !requirements
        .required_capabilities
        .iter()
        .all(|capability| model.strengths.contains(capability))
    {
        return (0.0, Some("missing capability"));
    }

    let diff = (i16::from(requirements.expected_complexity) - i16::from(model.context_complexity))
        .unsigned_abs();
    let mut total = f64::from(5u32.saturating_sub(u32::from(diff))) * 2.0;

    if let Some(budget) = requirements.budget_constraint {
        let estimated = (requirements.estimated_input_tokens as f64 / 1000.0)
            * model.cost_per_1k_input
            + (requirements.estimated_output_tokens as f64 / 1000.0) * model.cost_per_1k_output;
        if estimated > budget {
            return (0.0, Some("over budget"));
        }
        total += (1.0 - estimated / budget) * 3.0;
    }

    total += model.reliability;
    total += f64::from(6u32.saturating_sub(u32::from(model.speed)));
    if requirements.has_images && model.multimodal {
        total += 5.0;
    }
    if requirements.needs_functions && model.supports_functions {
        total += 5.0;
    }

    (total, None)
}
