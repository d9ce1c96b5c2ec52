//! Real-time user notifications.
//!
//! The engine publishes lifecycle events through its hook framework; this module owns the last hop to connected
//! clients. A [`NotificationDispatcher`] keeps a registry of live WebSocket sessions keyed by user id: sessions are
//! added when a client connects (and authenticates), removed when the socket closes, and a periodic liveness sweep
//! drops any session whose channel has gone dead, so a missed disconnect can never leak registry entries.
//!
//! Dispatch is strictly fire-and-forget. Sends use `try_send` on a bounded channel: a slow or absent client loses
//! notifications, and nothing upstream ever blocks or fails because of delivery.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
        Mutex,
    },
    time::Duration,
};

use actix_web::{web, HttpRequest, HttpResponse};
use bazaar_engine::{
    db_types::{Order, OrderId},
    events::{LowStockEvent, PaymentFailedEvent},
};
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::auth::extract_claims;

const SESSION_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    OrderCreated,
    OrderPaid,
    PaymentFailed,
    OrderCancelled,
    LowStockAlert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

struct Session {
    id: u64,
    is_admin: bool,
    sender: mpsc::Sender<Notification>,
}

#[derive(Default)]
struct Registry {
    sessions: HashMap<String, Vec<Session>>,
}

impl Registry {
    fn prune(&mut self) -> usize {
        let before = self.sessions.values().map(Vec::len).sum::<usize>();
        self.sessions.retain(|_, sessions| {
            sessions.retain(|s| !s.sender.is_closed());
            !sessions.is_empty()
        });
        before - self.sessions.values().map(Vec::len).sum::<usize>()
    }
}

/// Concurrency-safe session registry plus the convenience senders for each notification kind.
#[derive(Clone)]
pub struct NotificationDispatcher {
    registry: Arc<Mutex<Registry>>,
    next_session_id: Arc<AtomicU64>,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self { registry: Arc::new(Mutex::new(Registry::default())), next_session_id: Arc::new(AtomicU64::new(1)) }
    }

    /// Registers a connected client and returns its session id together with the receiving end of its channel.
    pub fn register(&self, user_id: &str, is_admin: bool) -> (u64, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(SESSION_BUFFER);
        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.registry.lock().expect("notification registry poisoned");
        registry.sessions.entry(user_id.to_string()).or_default().push(Session { id, is_admin, sender });
        info!("📣️ User {user_id} connected (session {id})");
        (id, receiver)
    }

    /// Removes one session. Called on disconnect; the liveness sweep covers the cases where this never happens.
    pub fn deregister(&self, user_id: &str, session_id: u64) {
        let mut registry = self.registry.lock().expect("notification registry poisoned");
        if let Some(sessions) = registry.sessions.get_mut(user_id) {
            sessions.retain(|s| s.id != session_id);
            if sessions.is_empty() {
                registry.sessions.remove(user_id);
            }
        }
        info!("📣️ User {user_id} disconnected (session {session_id})");
    }

    pub fn connected_sessions(&self) -> usize {
        let registry = self.registry.lock().expect("notification registry poisoned");
        registry.sessions.values().map(Vec::len).sum()
    }

    /// Spawns the periodic sweep that drops sessions whose receiving task is gone.
    pub fn spawn_liveness_sweep(&self, every: Duration) {
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let dropped = registry.lock().expect("notification registry poisoned").prune();
                if dropped > 0 {
                    debug!("📣️ Liveness sweep dropped {dropped} dead sessions");
                }
            }
        });
    }

    pub fn notify_user(&self, user_id: &str, notification: Notification) {
        let registry = self.registry.lock().expect("notification registry poisoned");
        match registry.sessions.get(user_id) {
            Some(sessions) => {
                for session in sessions {
                    // Fire and forget: a full buffer means a client that is not keeping up, not our problem here
                    if let Err(e) = session.sender.try_send(notification.clone()) {
                        debug!("📣️ Could not deliver notification to {user_id} (session {}): {e}", session.id);
                    }
                }
            },
            None => {
                debug!("📣️ User {user_id} is not connected. Notification dropped");
            },
        }
    }

    pub fn notify_admins(&self, notification: Notification) {
        let registry = self.registry.lock().expect("notification registry poisoned");
        for session in registry.sessions.values().flatten().filter(|s| s.is_admin) {
            if let Err(e) = session.sender.try_send(notification.clone()) {
                debug!("📣️ Could not deliver admin notification (session {}): {e}", session.id);
            }
        }
    }

    pub fn notify_order_created(&self, order: &Order) {
        self.notify_user(&order.user_id, Notification {
            kind: NotificationType::OrderCreated,
            title: "✅ Order created".to_string(),
            message: format!("Your order {} for {} has been created", short_id(&order.id), order.total_price),
            data: serde_json::json!({ "order_id": order.id, "total_price": order.total_price }),
            timestamp: Utc::now(),
        });
    }

    pub fn notify_order_paid(&self, order: &Order) {
        self.notify_user(&order.user_id, Notification {
            kind: NotificationType::OrderPaid,
            title: "💳 Payment received".to_string(),
            message: format!("Your payment of {} has been accepted", order.total_price),
            data: serde_json::json!({ "order_id": order.id, "total_price": order.total_price }),
            timestamp: Utc::now(),
        });
    }

    pub fn notify_payment_failed(&self, event: &PaymentFailedEvent) {
        self.notify_user(&event.user_id, Notification {
            kind: NotificationType::PaymentFailed,
            title: "❌ Payment failed".to_string(),
            message: "Your payment was not accepted. Please try again.".to_string(),
            data: serde_json::json!({ "order_id": event.order_id }),
            timestamp: Utc::now(),
        });
    }

    pub fn notify_order_cancelled(&self, order: &Order) {
        self.notify_user(&order.user_id, Notification {
            kind: NotificationType::OrderCancelled,
            title: "🚫 Order cancelled".to_string(),
            message: format!("Your order {} has been cancelled", short_id(&order.id)),
            data: serde_json::json!({ "order_id": order.id }),
            timestamp: Utc::now(),
        });
    }

    pub fn notify_low_stock(&self, event: &LowStockEvent) {
        self.notify_admins(Notification {
            kind: NotificationType::LowStockAlert,
            title: "⚠️ Low stock".to_string(),
            message: format!(
                "Product {}: {} units remaining (threshold: {})",
                event.product_id, event.available, event.threshold
            ),
            data: serde_json::json!({
                "product_id": event.product_id,
                "available": event.available,
                "threshold": event.threshold,
            }),
            timestamp: Utc::now(),
        });
    }
}

fn short_id(id: &OrderId) -> String {
    id.as_str().chars().take(8).collect()
}

/// `GET /notifications/ws` — upgrades to a WebSocket and streams the caller's notifications until they hang up.
/// Browsers cannot set headers on upgrade requests, so the access token is also accepted as a `token` query
/// parameter.
pub async fn notifications_ws(
    req: HttpRequest,
    stream: web::Payload,
    dispatcher: web::Data<NotificationDispatcher>,
) -> Result<HttpResponse, actix_web::Error> {
    let claims = extract_claims(&req)?;
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;
    let (session_id, mut receiver) = dispatcher.register(&claims.sub, claims.is_admin());
    let dispatcher = dispatcher.into_inner();
    let user_id = claims.sub;

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                notification = receiver.recv() => match notification {
                    Some(notification) => {
                        let payload = match serde_json::to_string(&notification) {
                            Ok(p) => p,
                            Err(e) => {
                                warn!("📣️ Could not serialize notification: {e}");
                                continue;
                            },
                        };
                        if session.text(payload).await.is_err() {
                            break;
                        }
                    },
                    None => break,
                },
                message = msg_stream.recv() => match message {
                    Some(Ok(actix_ws::Message::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break;
                        }
                    },
                    Some(Ok(actix_ws::Message::Close(_))) | None => break,
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        debug!("📣️ WebSocket error for {user_id}: {e}");
                        break;
                    },
                },
            }
        }
        dispatcher.deregister(&user_id, session_id);
        let _ = session.close(None).await;
    });
    Ok(response)
}

#[cfg(test)]
mod test {
    use bazaar_common::Money;
    use bazaar_engine::db_types::ProductId;

    use super::*;

    fn order(user_id: &str) -> Order {
        use bazaar_engine::db_types::OrderStatusType;
        Order {
            id: "abcdef1234567890".to_string().into(),
            user_id: user_id.to_string(),
            status: OrderStatusType::Pending,
            total_price: Money::from(100_00),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            paid_at: None,
        }
    }

    #[tokio::test]
    async fn notifications_reach_the_right_user() {
        let dispatcher = NotificationDispatcher::new();
        let (_, mut alice_rx) = dispatcher.register("alice", false);
        let (_, mut bob_rx) = dispatcher.register("bob", false);

        dispatcher.notify_order_created(&order("alice"));
        let received = alice_rx.recv().await.unwrap();
        assert_eq!(received.kind, NotificationType::OrderCreated);
        assert!(received.message.contains("abcdef12"), "order ids are shortened for display");
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn admin_alerts_skip_regular_users() {
        let dispatcher = NotificationDispatcher::new();
        let (_, mut admin_rx) = dispatcher.register("root", true);
        let (_, mut user_rx) = dispatcher.register("alice", false);

        dispatcher.notify_low_stock(&LowStockEvent {
            product_id: ProductId::from("p1".to_string()),
            available: 2,
            threshold: 5,
        });
        assert_eq!(admin_rx.recv().await.unwrap().kind, NotificationType::LowStockAlert);
        assert!(user_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn deregistered_and_dead_sessions_disappear() {
        let dispatcher = NotificationDispatcher::new();
        let (id, rx) = dispatcher.register("alice", false);
        let (_, other_rx) = dispatcher.register("alice", false);
        assert_eq!(dispatcher.connected_sessions(), 2);

        dispatcher.deregister("alice", id);
        assert_eq!(dispatcher.connected_sessions(), 1);

        // A dropped receiver simulates a disconnect the server never saw; the sweep reaps it.
        drop(other_rx);
        let mut registry = dispatcher.registry.lock().unwrap();
        assert_eq!(registry.prune(), 1);
        drop(registry);
        assert_eq!(dispatcher.connected_sessions(), 0);
        drop(rx);
    }

    #[tokio::test]
    async fn slow_clients_never_block_dispatch() {
        let dispatcher = NotificationDispatcher::new();
        let (_, rx) = dispatcher.register("alice", false);
        // Fill the buffer well past capacity without anyone consuming; every call must return immediately.
        for _ in 0..(SESSION_BUFFER * 2) {
            dispatcher.notify_order_created(&order("alice"));
        }
        drop(rx);
    }
}
