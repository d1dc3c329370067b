use common::{ActorKey, EntityId, TenantId};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Recipe, RecipeCommand, RecipeIngredient, UnitOfMeasure};
use runtime::{ActorBehavior, CommandContext};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

fn ctx() -> CommandContext {
    CommandContext {
        key: ActorKey::new(TenantId::new(), Recipe::actor_type(), EntityId::new()),
        last_applied_event: None,
    }
}

fn ingredient(index: u32) -> RecipeIngredient {
    RecipeIngredient {
        ingredient_id: EntityId::new(),
        name: format!("ingredient-{index}"),
        quantity: dec!(0.125) + Decimal::from(index) / dec!(1000),
        unit: UnitOfMeasure::Kilogram,
        waste_percentage: dec!(7.5),
        unit_cost: dec!(3.20) + Decimal::from(index) / dec!(100),
    }
}

fn recipe_with_lines(lines: u32) -> (Recipe, CommandContext) {
    let ctx = ctx();
    let applied = Recipe::default()
        .handle(
            &ctx,
            RecipeCommand::Create {
                menu_item_id: Some(EntityId::new()),
                name: "bench".to_string(),
                portion_yield: 4,
                ingredients: (0..lines).map(ingredient).collect(),
            },
        )
        .unwrap();
    (applied.state, ctx)
}

fn bench_create_recipe(c: &mut Criterion) {
    c.bench_function("costing/create_30_lines", |b| {
        b.iter(|| recipe_with_lines(30));
    });
}

fn bench_calculate_cost(c: &mut Criterion) {
    let (recipe, ctx) = recipe_with_lines(30);

    c.bench_function("costing/calculate_cost_30_lines", |b| {
        b.iter(|| {
            recipe
                .handle(
                    &ctx,
                    RecipeCommand::CalculateCost {
                        menu_price: Some(dec!(14.50)),
                    },
                )
                .unwrap()
        });
    });
}

fn bench_recalculate_from_prices(c: &mut Criterion) {
    let (recipe, ctx) = recipe_with_lines(30);
    let prices: HashMap<EntityId, Decimal> = recipe
        .ingredients()
        .iter()
        .step_by(3)
        .map(|i| (i.ingredient_id, i.unit_cost + dec!(0.15)))
        .collect();

    c.bench_function("costing/recalculate_10_of_30_prices", |b| {
        b.iter(|| {
            recipe
                .handle(
                    &ctx,
                    RecipeCommand::RecalculateFromPrices {
                        prices: prices.clone(),
                        source_event: None,
                    },
                )
                .unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_create_recipe,
    bench_calculate_cost,
    bench_recalculate_from_prices
);
criterion_main!(benches);
