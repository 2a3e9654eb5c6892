//! Batch-cooking step planners.
//!
//! # Responsibility
//! - Turn a set of recipes into an ordered list of cooking steps.
//! - Provide a deterministic planner and an LLM-backed one behind the same
//!   [`StepPlanner`] seam, plus a fallback combinator.
//!
//! # Invariants
//! - Planners never return an empty plan for a non-empty recipe list.
//! - Every planned step has a non-blank title and a positive duration.
//! - The LLM transport is abstracted by [`LlmClient`]; no network code
//!   lives here.

use crate::error::{AppError, AppResult};
use crate::model::recipe::{Recipe, RecipeId};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

static JSON_ARRAY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid json array regex"));

/// Parallel group shared by passive cooking steps.
pub const PASSIVE_GROUP: u32 = 1;
const DEFAULT_PREP_MINUTES: u32 = 10;
const PACKING_MINUTES: u32 = 15;

/// One step proposed by a planner, before it is attached to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub title: String,
    pub recipe_id: Option<RecipeId>,
    pub duration_minutes: u32,
    pub parallel_group: Option<u32>,
}

pub trait StepPlanner {
    /// Short identifier used in log events.
    fn name(&self) -> &'static str;
    fn plan(&self, recipes: &[Recipe]) -> AppResult<Vec<PlannedStep>>;
}

/// Deterministic planner: hands-on preparation per recipe in sequence,
/// passive cooking overlapping in one parallel group, then packing.
///
/// Recipes with the longest cooking time are handled first so the oven or
/// the pot starts as early as possible.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPlanner;

impl StepPlanner for SequentialPlanner {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn plan(&self, recipes: &[Recipe]) -> AppResult<Vec<PlannedStep>> {
        if recipes.is_empty() {
            return Err(AppError::AiService("no recipe to plan".to_string()));
        }
        let mut ordered: Vec<&Recipe> = recipes.iter().collect();
        ordered.sort_by(|a, b| {
            b.cook_minutes
                .cmp(&a.cook_minutes)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut steps = Vec::with_capacity(ordered.len() * 2 + 1);
        for recipe in ordered {
            let prep_minutes = if recipe.prep_minutes == 0 {
                DEFAULT_PREP_MINUTES
            } else {
                recipe.prep_minutes
            };
            steps.push(PlannedStep {
                title: format!("Préparer : {}", recipe.name),
                recipe_id: Some(recipe.id),
                duration_minutes: prep_minutes,
                parallel_group: None,
            });
            if recipe.cook_minutes > 0 {
                steps.push(PlannedStep {
                    title: format!("Cuisson : {}", recipe.name),
                    recipe_id: Some(recipe.id),
                    duration_minutes: recipe.cook_minutes,
                    parallel_group: Some(PASSIVE_GROUP),
                });
            }
        }
        steps.push(PlannedStep {
            title: "Portionner et ranger".to_string(),
            recipe_id: None,
            duration_minutes: PACKING_MINUTES,
            parallel_group: None,
        });
        Ok(steps)
    }
}

/// Failure reported by an [`LlmClient`] transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    RateLimited { retry_after_secs: u64 },
    Unavailable(String),
}

impl Display for LlmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited { retry_after_secs } => {
                write!(f, "rate limited, retry after {retry_after_secs}s")
            }
            Self::Unavailable(message) => write!(f, "llm unavailable: {message}"),
        }
    }
}

impl Error for LlmError {}

impl From<LlmError> for AppError {
    fn from(value: LlmError) -> Self {
        match value {
            LlmError::RateLimited { retry_after_secs } => Self::RateLimit { retry_after_secs },
            LlmError::Unavailable(message) => Self::AiService(message),
        }
    }
}

/// Text-completion transport used by [`LlmStepPlanner`].
pub trait LlmClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Deserialize)]
struct LlmStep {
    title: String,
    #[serde(default)]
    recipe: Option<String>,
    duration_minutes: u32,
    #[serde(default)]
    parallel_group: Option<u32>,
}

/// Planner delegating the optimization to a language model.
pub struct LlmStepPlanner<C: LlmClient> {
    client: C,
}

impl<C: LlmClient> LlmStepPlanner<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: LlmClient> StepPlanner for LlmStepPlanner<C> {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn plan(&self, recipes: &[Recipe]) -> AppResult<Vec<PlannedStep>> {
        if recipes.is_empty() {
            return Err(AppError::AiService("no recipe to plan".to_string()));
        }
        let answer = self.client.complete(&render_prompt(recipes))?;
        parse_plan(&answer, recipes)
    }
}

/// Prompt listing the recipes and the expected JSON answer shape.
pub fn render_prompt(recipes: &[Recipe]) -> String {
    let mut prompt = String::from(
        "Tu organises une session de batch cooking. Découpe les recettes suivantes en étapes \
         ordonnées et regroupe dans un même parallel_group les étapes qui peuvent se dérouler \
         en même temps (four, mijotage).\n\nRecettes :\n",
    );
    for recipe in recipes {
        prompt.push_str(&format!(
            "- {} ({} portions, préparation {} min, cuisson {} min)\n",
            recipe.name, recipe.servings, recipe.prep_minutes, recipe.cook_minutes
        ));
    }
    prompt.push_str(
        "\nRéponds uniquement par un tableau JSON d'objets \
         {\"title\": string, \"recipe\": string|null, \"duration_minutes\": entier > 0, \
         \"parallel_group\": entier|null}.",
    );
    prompt
}

/// Extracts and validates the JSON plan from a model answer.
///
/// Text around the array (markdown fences, commentary) is ignored. Recipe
/// names are matched case-insensitively; unknown names leave the step
/// unattached.
pub fn parse_plan(answer: &str, recipes: &[Recipe]) -> AppResult<Vec<PlannedStep>> {
    let json = JSON_ARRAY_RE
        .find(answer)
        .map(|found| found.as_str())
        .ok_or_else(|| AppError::AiService("answer contains no JSON array".to_string()))?;
    let raw: Vec<LlmStep> = serde_json::from_str(json)
        .map_err(|err| AppError::AiService(format!("malformed plan: {err}")))?;
    if raw.is_empty() {
        return Err(AppError::AiService("empty plan".to_string()));
    }

    raw.into_iter()
        .enumerate()
        .map(|(index, step)| {
            if step.title.trim().is_empty() || step.duration_minutes == 0 {
                return Err(AppError::AiService(format!(
                    "step {} has a blank title or a zero duration",
                    index + 1
                )));
            }
            let recipe_id = step.recipe.as_deref().and_then(|name| {
                let wanted = name.trim().to_lowercase();
                recipes
                    .iter()
                    .find(|recipe| recipe.name.trim().to_lowercase() == wanted)
                    .map(|recipe| recipe.id)
            });
            Ok(PlannedStep {
                title: step.title.trim().to_string(),
                recipe_id,
                duration_minutes: step.duration_minutes,
                parallel_group: step.parallel_group,
            })
        })
        .collect()
}

/// Tries `primary` and falls back to [`SequentialPlanner`] when it fails
/// with an AI service error.
pub struct FallbackPlanner<P: StepPlanner> {
    primary: P,
    fallback: SequentialPlanner,
}

impl<P: StepPlanner> FallbackPlanner<P> {
    pub fn new(primary: P) -> Self {
        Self {
            primary,
            fallback: SequentialPlanner,
        }
    }
}

impl<P: StepPlanner> StepPlanner for FallbackPlanner<P> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn plan(&self, recipes: &[Recipe]) -> AppResult<Vec<PlannedStep>> {
        match self.primary.plan(recipes) {
            Ok(steps) => Ok(steps),
            Err(AppError::AiService(_)) => {
                warn!(
                    "event=batch_plan module=planner status=fallback primary={} fallback={}",
                    self.primary.name(),
                    self.fallback.name()
                );
                self.fallback.plan(recipes)
            }
            Err(other) => Err(other),
        }
    }
}

/// Runs `planner` and logs the outcome.
pub(crate) fn run_planner(
    planner: &impl StepPlanner,
    recipes: &[Recipe],
) -> AppResult<Vec<PlannedStep>> {
    match planner.plan(recipes) {
        Ok(steps) => {
            info!(
                "event=batch_plan module=planner status=ok planner={} steps={}",
                planner.name(),
                steps.len()
            );
            Ok(steps)
        }
        Err(err) => {
            warn!(
                "event=batch_plan module=planner status=error planner={} error_code={}",
                planner.name(),
                err.code()
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CannedClient {
        answer: Result<String, LlmError>,
        calls: Cell<u32>,
    }

    impl CannedClient {
        fn new(answer: Result<&str, LlmError>) -> Self {
            Self {
                answer: answer.map(str::to_string),
                calls: Cell::new(0),
            }
        }
    }

    impl LlmClient for CannedClient {
        fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            assert!(prompt.contains("Recettes"));
            self.calls.set(self.calls.get() + 1);
            self.answer.clone()
        }
    }

    fn recipes() -> Vec<Recipe> {
        vec![
            Recipe::new("Soupe", 4).with_times(15, 30),
            Recipe::new("Lasagnes", 6).with_times(30, 45),
            Recipe::new("Salade", 2).with_times(0, 0),
        ]
    }

    #[test]
    fn sequential_plan_starts_with_longest_cooking() {
        let steps = SequentialPlanner.plan(&recipes()).unwrap();
        let titles: Vec<&str> = steps.iter().map(|step| step.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Préparer : Lasagnes",
                "Cuisson : Lasagnes",
                "Préparer : Soupe",
                "Cuisson : Soupe",
                "Préparer : Salade",
                "Portionner et ranger",
            ]
        );
        assert_eq!(steps[1].parallel_group, Some(PASSIVE_GROUP));
        assert_eq!(steps[4].duration_minutes, DEFAULT_PREP_MINUTES);
    }

    #[test]
    fn sequential_plan_rejects_empty_input() {
        assert!(SequentialPlanner.plan(&[]).is_err());
    }

    #[test]
    fn llm_answer_inside_fences_is_parsed() {
        let recipes = recipes();
        let answer = "Voici le plan :\n```json\n[\
            {\"title\": \"Enfourner les lasagnes\", \"recipe\": \"lasagnes\", \
             \"duration_minutes\": 45, \"parallel_group\": 1},\
            {\"title\": \"Laver la salade\", \"recipe\": null, \"duration_minutes\": 5}\
        ]\n```";
        let client = CannedClient::new(Ok(answer));
        let steps = LlmStepPlanner::new(client).plan(&recipes).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].recipe_id, Some(recipes[1].id));
        assert_eq!(steps[1].parallel_group, None);
    }

    #[test]
    fn malformed_answer_maps_to_ai_service_error() {
        let client = CannedClient::new(Ok("je ne sais pas"));
        let err = LlmStepPlanner::new(client).plan(&recipes()).unwrap_err();
        assert!(matches!(err, AppError::AiService(_)));

        let client = CannedClient::new(Ok("[{\"title\": \"x\", \"duration_minutes\": 0}]"));
        let err = LlmStepPlanner::new(client).plan(&recipes()).unwrap_err();
        assert!(matches!(err, AppError::AiService(_)));
    }

    #[test]
    fn rate_limit_is_not_swallowed_by_fallback() {
        let client = CannedClient::new(Err(LlmError::RateLimited {
            retry_after_secs: 30,
        }));
        let planner = FallbackPlanner::new(LlmStepPlanner::new(client));
        let err = planner.plan(&recipes()).unwrap_err();
        assert!(matches!(err, AppError::RateLimit { retry_after_secs: 30 }));
    }

    #[test]
    fn unavailable_llm_falls_back_to_sequential() {
        let client = CannedClient::new(Err(LlmError::Unavailable("timeout".into())));
        let planner = FallbackPlanner::new(LlmStepPlanner::new(client));
        let steps = planner.plan(&recipes()).unwrap();
        assert_eq!(steps, SequentialPlanner.plan(&recipes()).unwrap());
        assert_eq!(planner.primary.client.calls.get(), 1);
    }
}
