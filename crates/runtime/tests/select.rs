//! Tests for model selection and scoring.

use ocore::{Capability, Catalog};
use runtime::testing::ScriptedModel;
use runtime::{Analyzer, Requirements, Selector, score};

fn row(id: &str, strengths: &[&str]) -> Capability {
    Capability {
        id: id.into(),
        provider: "openai".into(),
        strengths: strengths.iter().map(|s| (*s).into()).collect(),
        context_complexity: 3,
        cost_per_1k_input: 0.001,
        cost_per_1k_output: 0.002,
        speed: 2,
        reliability: 0.95,
        multimodal: false,
        supports_functions: true,
    }
}

fn catalog() -> Catalog {
    let mut vision = row("vision-model", &["general", "vision"]);
    vision.multimodal = true;
    Catalog::new(
        vec![
            row("fallback-model", &["general"]),
            row("coder-model", &["general", "code"]),
            vision,
        ],
        "fallback-model",
    )
    .unwrap()
}

fn selector() -> Selector<ScriptedModel> {
    Selector::new(
        catalog(),
        Analyzer::new(ScriptedModel::new(), "analysis-model"),
    )
}

fn requirements() -> Requirements {
    Requirements {
        expected_complexity: 3,
        required_capabilities: Vec::new(),
        estimated_input_tokens: 1000,
        estimated_output_tokens: 500,
        needs_functions: false,
        has_images: false,
        budget_constraint: None,
    }
}

#[test]
fn selection_is_deterministic() {
    let selector = selector();
    let requirements = requirements();
    let first = selector.pick(&requirements);
    for _ in 0..10 {
        assert_eq!(selector.pick(&requirements), first);
    }
}

#[test]
fn ties_break_in_catalog_order() {
    // fallback-model and coder-model score identically for a prompt
    // with no capability requirements; the first row wins.
    let selector = selector();
    let mut requirements = requirements();
    requirements.has_images = false;
    assert_eq!(selector.pick(&requirements), "fallback-model");
}

#[test]
fn missing_capability_scores_zero() {
    let mut requirements = requirements();
    requirements.required_capabilities = vec!["code".into()];

    let (value, reason) = score(&requirements, &row("fallback-model", &["general"]));
    assert_eq!(value, 0.0);
    assert_eq!(reason, Some("missing capability"));
}

#[test]
fn missing_capability_is_never_selected() {
    let selector = selector();
    let mut requirements = requirements();
    requirements.required_capabilities = vec!["code".into()];
    assert_eq!(selector.pick(&requirements), "coder-model");
}

#[test]
fn over_budget_scores_zero() {
    let mut requirements = requirements();
    requirements.budget_constraint = Some(0.000001);

    let (value, reason) = score(&requirements, &row("any", &["general"]));
    assert_eq!(value, 0.0);
    assert_eq!(reason, Some("over budget"));
}

#[test]
fn all_over_budget_falls_back_to_default() {
    let selector = selector();
    let mut requirements = requirements();
    requirements.budget_constraint = Some(0.001 * 0.001);
    assert_eq!(selector.pick(&requirements), "fallback-model");
}

#[test]
fn budget_headroom_raises_the_score() {
    let mut tight = requirements();
    tight.budget_constraint = Some(0.01);
    let mut loose = requirements();
    loose.budget_constraint = Some(1.0);

    let model = row("m", &["general"]);
    let (tight_score, _) = score(&tight, &model);
    let (loose_score, _) = score(&loose, &model);
    assert!(loose_score > tight_score);
}

#[test]
fn image_prompts_prefer_multimodal_models() {
    let selector = selector();
    let mut requirements = requirements();
    requirements.has_images = true;
    assert_eq!(selector.pick(&requirements), "vision-model");
}

#[test]
fn function_support_bonus_applies() {
    let mut requirements = requirements();
    requirements.needs_functions = true;

    let with = row("with", &["general"]);
    let mut without = row("without", &["general"]);
    without.supports_functions = false;

    let (with_score, _) = score(&requirements, &with);
    let (without_score, _) = score(&requirements, &without);
    assert_eq!(with_score - without_score, 5.0);
}

#[test]
fn complexity_mismatch_lowers_fit() {
    let mut requirements = requirements();
    requirements.expected_complexity = 5;

    let mut close = row("close", &["general"]);
    close.context_complexity = 5;
    let mut far = row("far", &["general"]);
    far.context_complexity = 1;

    let (close_score, _) = score(&requirements, &close);
    let (far_score, _) = score(&requirements, &far);
    assert!(close_score > far_score);
}

#[tokio::test]
async fn analysis_failure_falls_back_to_default() {
    // The scripted model answers "ok", which is not valid JSON; the
    // selector logs the failure and answers with the default model.
    let selector = selector();
    let model = selector.select("write a poem", false, false, None).await;
    assert_eq!(model, "fallback-model");
}

#[tokio::test]
async fn valid_analysis_drives_selection() {
    let scripted = ScriptedModel::new();
    scripted.push_text(
        r#"{"expected_complexity": 3, "required_capabilities": ["code"],
            "estimated_input_tokens": 200, "estimated_output_tokens": 400}"#,
    );
    let selector = Selector::new(catalog(), Analyzer::new(scripted, "analysis-model"));

    let model = selector.select("write a parser", false, false, None).await;
    assert_eq!(model, "coder-model");
}
