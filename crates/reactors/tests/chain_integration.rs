//! End-to-end chain test: order completion propagates through the fabric
//! to stock consumption, sales aggregation, spend/points/tier, alerting,
//! and webhook delivery, with no direct calls between actors.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{EntityId, TenantId};
use domain::{
    CustomerSpendProjection, LoyaltyCommand, Recipe, RecipeCommand, RecipeIngredient, RetryPolicy,
    Tier, UnitOfMeasure, WebhookCommand, WebhookEndpoint,
};
use entity_store::InMemoryEntityStore;
use fabric::events::{InventoryEvent, OrderEvent, OrderLine};
use fabric::{EventFabric, EventPayload, EventSource, StreamEvent};
use reactors::{
    AlertCenter, InventoryConsumption, PriceReaction, Reactor, ReactorHost, SalesAggregation,
    SpendChain, WebhookDispatcher, WebhookTransport,
};
use runtime::ActorRuntime;
use rust_decimal_macros::dec;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init()
        .ok();
}

async fn eventually<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for: {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

struct CountingTransport {
    delivered: Mutex<Vec<String>>,
}

impl CountingTransport {
    fn new() -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn delivered_types(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebhookTransport for CountingTransport {
    async fn deliver(&self, _url: &str, event: &StreamEvent) -> Result<u16, String> {
        self.delivered
            .lock()
            .unwrap()
            .push(event.event_type().to_string());
        Ok(200)
    }
}

#[tokio::test]
async fn order_completion_drives_the_full_chain() {
    init_tracing();

    let store = Arc::new(InMemoryEntityStore::new());
    let fabric = EventFabric::new();

    let loyalty: ActorRuntime<CustomerSpendProjection, _> =
        ActorRuntime::new(Arc::clone(&store), fabric.clone());
    let endpoints: ActorRuntime<WebhookEndpoint, _> =
        ActorRuntime::new(Arc::clone(&store), fabric.clone());

    let tenant = TenantId::new();
    let customer = EntityId::new();
    let pizza = EntityId::new();

    // Silver opens at 500 so this order crosses a tier boundary.
    loyalty
        .dispatch(
            tenant,
            customer,
            LoyaltyCommand::ConfigureTiers {
                tiers: vec![
                    Tier::new("Bronze", dec!(0), dec!(1.0)),
                    Tier::new("Silver", dec!(500), dec!(1.25)),
                ],
            },
        )
        .await
        .unwrap();

    // Webhook endpoint interested in the chain's terminal facts.
    let endpoint_id = EntityId::new();
    endpoints
        .dispatch(
            tenant,
            endpoint_id,
            WebhookCommand::Register {
                merchant_id: EntityId::new(),
                url: "https://partner.example/hooks".to_string(),
                enabled_events: vec!["LowStock".to_string(), "TierChanged".to_string()],
            },
        )
        .await
        .unwrap();

    let inventory = Arc::new(InventoryConsumption::new(fabric.clone()));
    inventory
        .set_stock(tenant, pizza, "Margherita", dec!(4), dec!(3))
        .await;

    let sales = Arc::new(SalesAggregation::new(fabric.clone()));
    let alerts = Arc::new(AlertCenter::new(fabric.clone()));
    let transport = Arc::new(CountingTransport::new());
    let dispatcher = Arc::new(WebhookDispatcher::with_policy(
        endpoints.clone(),
        Arc::clone(&transport) as Arc<dyn WebhookTransport>,
        RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            max_attempts: 3,
        },
    ));
    dispatcher.track_endpoint(tenant, endpoint_id).await;

    let mut host = ReactorHost::new(fabric.clone());
    host.spawn(Arc::clone(&inventory) as Arc<dyn Reactor>);
    host.spawn(Arc::clone(&sales) as Arc<dyn Reactor>);
    host.spawn(Arc::clone(&alerts) as Arc<dyn Reactor>);
    host.spawn(Arc::new(SpendChain::new(loyalty.clone())) as Arc<dyn Reactor>);
    host.spawn(Arc::clone(&dispatcher) as Arc<dyn Reactor>);
    // One task per (reactor, namespace) pair.
    assert_eq!(host.task_count(), 8);

    // The external ordering surface reports a completed order: two pizzas,
    // 600 net for a customer at YTD 0.
    let order_id = EntityId::new();
    fabric
        .publish(StreamEvent::new(
            tenant,
            EventSource::new("order", order_id),
            EventPayload::Order(OrderEvent::order_completed(
                order_id,
                Some(customer),
                dec!(620),
                dec!(600),
                dec!(20),
                2,
                vec![OrderLine {
                    menu_item_id: pizza,
                    name: "Margherita".to_string(),
                    quantity: dec!(2),
                }],
                Utc::now(),
            )),
        ))
        .await;

    // Stock consumed: 4 - 2 = 2, which crosses the threshold of 3.
    eventually("stock consumption", || {
        let inventory = Arc::clone(&inventory);
        async move {
            inventory
                .level(tenant, pizza)
                .await
                .is_some_and(|level| level.on_hand == dec!(2))
        }
    })
    .await;

    // Spend recorded at the pre-spend (Bronze) rate, then tier moved up.
    eventually("spend projection", || {
        let loyalty = loyalty.clone();
        async move {
            loyalty
                .snapshot(tenant, customer)
                .await
                .unwrap()
                .is_some_and(|(projection, _)| {
                    projection.available_points() == 600 && projection.current_tier() == "Silver"
                })
        }
    })
    .await;

    // Sales rolled into today's totals.
    eventually("sales aggregation", || {
        let sales = Arc::clone(&sales);
        async move {
            sales
                .daily(tenant, Utc::now().date_naive())
                .await
                .is_some_and(|day| day.orders == 1 && day.net_total == dec!(600))
        }
    })
    .await;

    // Low stock became an alert.
    eventually("low stock alert", || {
        let alerts = Arc::clone(&alerts);
        async move { !alerts.recent_alerts().await.is_empty() }
    })
    .await;

    // And the webhook endpoint saw both terminal facts.
    eventually("webhook delivery", || {
        let transport = Arc::clone(&transport);
        async move {
            let delivered = transport.delivered_types();
            delivered.contains(&"LowStock".to_string())
                && delivered.contains(&"TierChanged".to_string())
        }
    })
    .await;

    let (endpoint, _) = endpoints
        .snapshot(tenant, endpoint_id)
        .await
        .unwrap()
        .unwrap();
    assert!(endpoint.recent_deliveries().count() >= 2);

    host.shutdown();
}

#[tokio::test]
async fn ingredient_price_change_recosts_recipes_through_the_fabric() {
    init_tracing();

    let store = Arc::new(InMemoryEntityStore::new());
    let fabric = EventFabric::new();
    let recipes: ActorRuntime<Recipe, _> = ActorRuntime::new(Arc::clone(&store), fabric.clone());

    let reaction = Arc::new(PriceReaction::new(recipes.clone()));
    let mut host = ReactorHost::new(fabric.clone());
    host.spawn(Arc::clone(&reaction) as Arc<dyn Reactor>);

    let tenant = TenantId::new();
    let recipe_id = EntityId::new();
    let flour = EntityId::new();

    recipes
        .dispatch(
            tenant,
            recipe_id,
            RecipeCommand::Create {
                menu_item_id: None,
                name: "Focaccia".to_string(),
                portion_yield: 2,
                ingredients: vec![RecipeIngredient {
                    ingredient_id: flour,
                    name: "flour".to_string(),
                    quantity: dec!(1),
                    unit: UnitOfMeasure::Kilogram,
                    waste_percentage: dec!(0),
                    unit_cost: dec!(1.00),
                }],
            },
        )
        .await
        .unwrap();
    // 1.00 / 2 portions
    let (recipe, _) = recipes.snapshot(tenant, recipe_id).await.unwrap().unwrap();
    assert_eq!(recipe.current_cost_per_portion(), dec!(0.50));

    // The reaction indexes the recipe from its cost event before any price
    // change can be routed to it.
    eventually("ingredient index built", || {
        let reaction = Arc::clone(&reaction);
        async move { !reaction.recipes_for(tenant, flour).await.is_empty() }
    })
    .await;

    // Supplier reprices flour.
    fabric
        .publish(StreamEvent::new(
            tenant,
            EventSource::new("inventory", flour),
            EventPayload::Inventory(InventoryEvent::ingredient_price_changed(
                flour,
                "flour",
                dec!(1.00),
                dec!(3.00),
            )),
        ))
        .await;

    eventually("recipe recosted", || {
        let recipes = recipes.clone();
        async move {
            recipes
                .snapshot(tenant, recipe_id)
                .await
                .unwrap()
                .is_some_and(|(recipe, _)| recipe.current_cost_per_portion() == dec!(1.50))
        }
    })
    .await;

    host.shutdown();
}
