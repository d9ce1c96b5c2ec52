use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use bazaar_engine::{
    events::{EventHandlers, EventHooks},
    traits::FulfillmentDatabase,
    CatalogApi,
    InventoryApi,
    OrderFlowApi,
    ReconcilerApi,
    SqliteDatabase,
};
use log::info;

use crate::{
    auth::JwtValidator,
    config::ServerConfig,
    errors::ServerError,
    integrations::checkout::CheckoutApi,
    notifications::{notifications_ws, NotificationDispatcher},
    payment_routes::{CreateCheckoutRoute, PaymentWebhookRoute},
    routes::{
        health,
        ActiveProductsRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        CreateProductRoute,
        DeleteProductRoute,
        LowStockAlertRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        ProductByIdRoute,
        ReleaseStockRoute,
        ReserveStockRoute,
        StockSnapshotRoute,
        UpdateProductRoute,
        UpdateStockRoute,
    },
};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🗃️ Connected to {}", db.url());
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Builds the event hooks that forward engine events to the notification dispatcher. Each hook clones the
/// dispatcher handle and hands the event over; delivery itself is the dispatcher's problem.
fn notification_hooks(dispatcher: NotificationDispatcher) -> EventHooks {
    let mut hooks = EventHooks::default();
    let d = dispatcher.clone();
    hooks.on_order_created(move |ev| {
        let d = d.clone();
        Box::pin(async move { d.notify_order_created(&ev.order) }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let d = dispatcher.clone();
    hooks.on_order_paid(move |ev| {
        let d = d.clone();
        Box::pin(async move { d.notify_order_paid(&ev.order) }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let d = dispatcher.clone();
    hooks.on_order_cancelled(move |ev| {
        let d = d.clone();
        Box::pin(async move { d.notify_order_cancelled(&ev.order) }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let d = dispatcher.clone();
    hooks.on_payment_failed(move |ev| {
        let d = d.clone();
        Box::pin(async move { d.notify_payment_failed(&ev) }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let d = dispatcher;
    hooks.on_low_stock(move |ev| {
        let d = d.clone();
        Box::pin(async move { d.notify_low_stock(&ev) }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
) -> Result<actix_web::dev::Server, ServerError> {
    let dispatcher = NotificationDispatcher::new();
    dispatcher.spawn_liveness_sweep(SESSION_SWEEP_INTERVAL);
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, notification_hooks(dispatcher.clone()));
    let producers = handlers.producers();
    actix_web::rt::spawn(async move {
        handlers.start_handlers().await;
    });
    let checkout_api = CheckoutApi::new(config.provider_config.clone())?;
    info!("🚀️ Server instance created for {}:{}", config.host, config.port);

    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone())
            .with_low_stock_threshold(config.low_stock_threshold);
        let inventory_api = InventoryApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let reconciler_api =
            ReconcilerApi::new(db.clone(), OrderFlowApi::new(db.clone(), producers.clone()), producers.clone());
        let validator = JwtValidator::new(&config.auth);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bazaar::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(reconciler_api))
            .app_data(web::Data::new(validator))
            .app_data(web::Data::new(checkout_api.clone()))
            .app_data(web::Data::new(config.provider_config.clone()))
            .app_data(web::Data::new(dispatcher.clone()));
        // Routes that require an authenticated user
        let api_scope = web::scope("/api")
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(StockSnapshotRoute::<SqliteDatabase>::new())
            .service(UpdateStockRoute::<SqliteDatabase>::new())
            .service(ReserveStockRoute::<SqliteDatabase>::new())
            .service(ReleaseStockRoute::<SqliteDatabase>::new())
            .service(LowStockAlertRoute::<SqliteDatabase>::new())
            .service(ActiveProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(DeleteProductRoute::<SqliteDatabase>::new())
            .service(CreateCheckoutRoute::<SqliteDatabase>::new());
        // The webhook authenticates by signature, not by session
        let webhook_scope = web::scope("/payment").service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(api_scope)
            .service(webhook_scope)
            .route("/notifications/ws", web::get().to(notifications_ws))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
