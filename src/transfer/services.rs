use std::collections::{HashMap, HashSet};

use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::dto::{
    ExportDocument, ExportedIngredient, ExportedLine, ExportedRecipe, ImportReport, FORMAT_VERSION,
};
use crate::{
    error::{AppError, AppResult},
    ingredients::model::{Category, Ingredient},
    recipes::model::{Recipe, RecipeLine},
    state::AppState,
};

pub async fn export(state: &AppState) -> AppResult<ExportDocument> {
    let catalog = state.store.list_ingredients().await?;
    let recipes = state.store.list_recipes().await?;

    let by_id: HashMap<Uuid, &Ingredient> = catalog.iter().map(|i| (i.id, i)).collect();
    let mut used = HashSet::new();

    let recipes: Vec<ExportedRecipe> = recipes
        .into_iter()
        .map(|recipe| {
            let ingredients = recipe
                .lines
                .into_iter()
                .map(|line| {
                    used.insert(line.ingredient_id);
                    let unit = by_id
                        .get(&line.ingredient_id)
                        .map(|i| i.unit.clone())
                        .unwrap_or_else(|| line.unit.clone());
                    ExportedLine {
                        name: line.ingredient_name,
                        unit,
                        category: line.category,
                        quantity: line.quantity,
                        line_unit: line.unit,
                    }
                })
                .collect();
            ExportedRecipe {
                name: recipe.name,
                description: recipe.description,
                prep_minutes: recipe.prep_minutes,
                servings: recipe.servings,
                ingredients,
            }
        })
        .collect();

    let ingredients = catalog
        .iter()
        .filter(|i| !used.contains(&i.id))
        .map(|i| ExportedIngredient {
            name: i.name.clone(),
            unit: i.unit.clone(),
            category: i.category,
        })
        .collect();

    info!(recipes = recipes.len(), "catalog exported");
    Ok(ExportDocument {
        version: FORMAT_VERSION,
        exported_at: Some(OffsetDateTime::now_utc()),
        recipes,
        ingredients,
    })
}

/// Ingredients resolved by exact name during one import.
struct NameResolver<'a> {
    state: &'a AppState,
    known: HashMap<String, Ingredient>,
    report: ImportReport,
}

impl<'a> NameResolver<'a> {
    fn new(state: &'a AppState) -> Self {
        Self {
            state,
            known: HashMap::new(),
            report: ImportReport::default(),
        }
    }

    /// Reuses the catalog entry named `name`, or creates one from the
    /// document's unit and category.
    async fn resolve(
        &mut self,
        name: &str,
        unit: &str,
        category: Category,
    ) -> AppResult<Ingredient> {
        let name = name.trim();
        if let Some(found) = self.known.get(name) {
            return Ok(found.clone());
        }
        let ingredient = match self.state.store.find_ingredient_by_name(name).await? {
            Some(existing) => {
                self.report.ingredients_reused += 1;
                existing
            }
            None => {
                let created = Ingredient::new(name.to_string(), unit.trim().to_string(), category);
                self.state.store.insert_ingredient(&created).await?;
                self.report.ingredients_created += 1;
                created
            }
        };
        self.known.insert(name.to_string(), ingredient.clone());
        Ok(ingredient)
    }
}

/// Restores a document. Ingredients are matched by exact name; recipes are
/// always created anew. The whole document is validated before any write.
pub async fn import(state: &AppState, doc: ExportDocument) -> AppResult<ImportReport> {
    if doc.version != FORMAT_VERSION {
        return Err(AppError::validation(format!(
            "version: unsupported document version {} (expected {FORMAT_VERSION})",
            doc.version
        )));
    }
    doc.validate()?;

    let mut resolver = NameResolver::new(state);
    let now = OffsetDateTime::now_utc();

    for entry in doc.recipes {
        let mut lines = Vec::with_capacity(entry.ingredients.len());
        for line in &entry.ingredients {
            let ingredient = resolver.resolve(&line.name, &line.unit, line.category).await?;
            let unit = line.line_unit.trim().to_string();
            lines.push(RecipeLine::new(&ingredient, line.quantity, unit));
        }
        let recipe = Recipe {
            id: Uuid::new_v4(),
            name: entry.name.trim().to_string(),
            description: entry.description.filter(|d| !d.trim().is_empty()),
            prep_minutes: entry.prep_minutes,
            servings: entry.servings,
            lines,
            created_at: now,
            updated_at: now,
        };
        state.store.insert_recipe(&recipe).await?;
        resolver.report.recipes_created += 1;
    }

    for spare in &doc.ingredients {
        resolver.resolve(&spare.name, &spare.unit, spare.category).await?;
    }

    let report = resolver.report;
    info!(
        recipes_created = report.recipes_created,
        ingredients_created = report.ingredients_created,
        ingredients_reused = report.ingredients_reused,
        "import finished"
    );
    Ok(report)
}
