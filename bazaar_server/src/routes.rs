//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database queries,
//! the ledger calls below) must therefore be awaited, never blocked on.

use actix_web::{get, web, HttpResponse, Responder};
use bazaar_engine::{
    db_types::{NewProduct, OrderId, ProductId, ProductUpdate, Role},
    traits::{CatalogManagement, InventoryLedger, OrderManagement},
    CatalogApi,
    InventoryApi,
    OrderFlowApi,
    DEFAULT_LOW_STOCK_THRESHOLD,
};
use log::*;

use crate::{
    auth::JwtClaims,
    data_objects::{
        CreateOrderRequest,
        JsonResponse,
        LowStockQuery,
        StockMovementRequest,
        StockSnapshotResponse,
        StockUpdateRequest,
    },
    errors::ServerError,
};

// Actix cannot register generic handlers directly, so each route gets a small HttpServiceFactory generated by the
// `route!` macro.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------

route!(create_order => Post "/orders" impl OrderManagement, InventoryLedger, CatalogManagement);
/// Route handler for order creation.
///
/// Any authenticated user can create an order for themselves. The whole request either succeeds — every line
/// reserved and the order persisted — or fails with no stock held at all.
pub async fn create_order<B>(
    claims: JwtClaims,
    body: web::Json<CreateOrderRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger + CatalogManagement,
{
    debug!("💻️ POST create_order for {}", claims.sub);
    let CreateOrderRequest { items } = body.into_inner();
    let order = api.create_order(&claims.sub, &items).await?;
    Ok(HttpResponse::Created().json(order))
}

route!(my_orders => Get "/orders" impl OrderManagement, InventoryLedger, CatalogManagement);
/// Authenticated users fetch their own orders here; admins see every order on the system.
pub async fn my_orders<B>(
    claims: JwtClaims,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger + CatalogManagement,
{
    debug!("💻️ GET my_orders for {}", claims.sub);
    let orders = api.orders(&claims.sub, claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement, InventoryLedger, CatalogManagement);
pub async fn order_by_id<B>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger + CatalogManagement,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = api.order(&order_id, &claims.sub, claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(cancel_order => Patch "/orders/{id}/cancel" impl OrderManagement, InventoryLedger, CatalogManagement);
/// Cancels a pending order, returning its reserved stock. Owners and admins only; terminal orders are refused.
pub async fn cancel_order<B>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger + CatalogManagement,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ PATCH cancel order {order_id} for {}", claims.sub);
    let order = api.cancel_order(&order_id, &claims.sub, claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------  Inventory  ----------------------------------------------------

route!(stock_snapshot => Get "/inventory/{product_id}" impl InventoryLedger where requires [Role::Admin]);
pub async fn stock_snapshot<A>(
    path: web::Path<String>,
    api: web::Data<InventoryApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: InventoryLedger,
{
    let product_id = ProductId::from(path.into_inner());
    debug!("💻️ GET stock snapshot for {product_id}");
    let record = api.snapshot(&product_id).await?;
    Ok(HttpResponse::Ok().json(StockSnapshotResponse::from(record)))
}

route!(update_stock => Post "/inventory/update" impl InventoryLedger where requires [Role::Admin]);
/// Direct stock correction (restock or shrinkage). Only `available` moves; reservations are untouched.
pub async fn update_stock<A>(
    body: web::Json<StockUpdateRequest>,
    api: web::Data<InventoryApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: InventoryLedger,
{
    let StockUpdateRequest { product_id, quantity, operation } = body.into_inner();
    debug!("💻️ POST stock update: {operation} {quantity} for {product_id}");
    let record = api.adjust(&product_id, quantity, operation).await?;
    Ok(HttpResponse::Ok().json(StockSnapshotResponse::from(record)))
}

route!(reserve_stock => Post "/inventory/reserve" impl InventoryLedger where requires [Role::Admin]);
/// Internal-facing: the order lifecycle reserves through the engine directly. This endpoint exists for manual
/// corrections and sibling services.
pub async fn reserve_stock<A>(
    body: web::Json<StockMovementRequest>,
    api: web::Data<InventoryApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: InventoryLedger,
{
    let StockMovementRequest { product_id, quantity } = body.into_inner();
    let record = api.reserve(&product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(StockSnapshotResponse::from(record)))
}

route!(release_stock => Post "/inventory/release" impl InventoryLedger where requires [Role::Admin]);
pub async fn release_stock<A>(
    body: web::Json<StockMovementRequest>,
    api: web::Data<InventoryApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: InventoryLedger,
{
    let StockMovementRequest { product_id, quantity } = body.into_inner();
    let record = api.release(&product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(StockSnapshotResponse::from(record)))
}

route!(low_stock_alert => Get "/inventory/low-stock/alert" impl InventoryLedger where requires [Role::Admin]);
pub async fn low_stock_alert<A>(
    query: web::Query<LowStockQuery>,
    api: web::Data<InventoryApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: InventoryLedger,
{
    let threshold = query.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    let records = api.low_stock(threshold).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "threshold": threshold,
        "count": records.len(),
        "products": records,
    })))
}

//----------------------------------------------   Catalog  ----------------------------------------------------

route!(active_products => Get "/products" impl CatalogManagement);
pub async fn active_products<A>(api: web::Data<CatalogApi<A>>) -> Result<HttpResponse, ServerError>
where A: CatalogManagement {
    let products = api.active_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{id}" impl CatalogManagement);
pub async fn product_by_id<A>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement,
{
    let product_id = ProductId::from(path.into_inner());
    let product = api
        .product(&product_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Product {product_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(product))
}

route!(create_product => Post "/products" impl CatalogManagement where requires [Role::Admin]);
pub async fn create_product<A>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement,
{
    let product = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Patch "/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn update_product<A>(
    path: web::Path<String>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement,
{
    let product_id = ProductId::from(path.into_inner());
    let product = api.update_product(&product_id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(delete_product => Delete "/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn delete_product<A>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError>
where
    A: CatalogManagement,
{
    let product_id = ProductId::from(path.into_inner());
    api.deactivate_product(&product_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product {product_id} deactivated"))))
}
