use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;
use validator::Validate;

use crate::{
    models::{
        cart::Cart,
        order::{ContactDetails, OrderStatus},
    },
    services::cart_service::CartService,
};

const EMPTY_FIELD: &str = "—";

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Invalid bot endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Bot endpoint answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("Bot endpoint rejected the message: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Contact details are invalid: {0}")]
    InvalidContact(#[from] validator::ValidationErrors),

    #[error("Order delivery is not configured")]
    NotConfigured,

    #[error("Checkout is not idle (currently {0})")]
    NotIdle(OrderStatus),

    #[error("Order not sent: {0}")]
    NotSent(#[from] NotifierError),
}

/// Delivers a formatted order to the shop.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifierError>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: Url,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, chat_id: &str) -> Result<Self, NotifierError> {
        let endpoint = Url::parse(&format!(
            "{}/bot{}/sendMessage",
            api_base.trim_end_matches('/'),
            token
        ))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifierError> {
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifierError::UnexpectedStatus(status.as_u16()));
        }

        match response.json::<SendMessageResponse>().await {
            Ok(SendMessageResponse { ok: false, description }) => Err(NotifierError::Rejected(
                description.unwrap_or_else(|| "no description".to_string()),
            )),
            Ok(_) => Ok(()),
            Err(e) => {
                debug!("Unparsed bot response treated as delivered: {}", e);
                Ok(())
            }
        }
    }
}

/// Backslash-escape the characters legacy Telegram Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Human-readable order summary in Telegram Markdown. Customer and product
/// text is escaped.
pub fn format_order_message(cart: &Cart, contact: &ContactDetails) -> String {
    let handle = contact
        .display_handle()
        .map(|h| escape_markdown(&h))
        .unwrap_or_else(|| EMPTY_FIELD.to_string());
    let phone = contact
        .phone
        .as_deref()
        .map(escape_markdown)
        .unwrap_or_else(|| EMPTY_FIELD.to_string());

    let lines: Vec<String> = cart
        .items()
        .iter()
        .map(|item| {
            format!(
                "• {} ({}) x{} = {}฿",
                escape_markdown(&item.name),
                item.selection,
                item.quantity,
                item.subtotal()
            )
        })
        .collect();

    format!(
        "🚀 *NEW ORDER*\n\n👤 TG: {}\n📞 Phone: {}\n\n🛒 *Items:*\n{}\n\n💰 *TOTAL: {}฿*",
        handle,
        phone,
        lines.join("\n"),
        cart.total()
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub message: String,
    pub total: u64,
    pub lines: usize,
}

/// Checkout flow: idle, then sending, then sent (or back to idle on failure).
pub struct CheckoutService {
    notifier: Option<Arc<dyn Notifier>>,
    status: OrderStatus,
}

impl CheckoutService {
    pub fn new(notifier: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            notifier,
            status: OrderStatus::Idle,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_configured(&self) -> bool {
        self.notifier.is_some()
    }

    /// Send the order and clear the cart once delivery is confirmed.
    ///
    /// On a failed send the cart is untouched and the flow returns to idle.
    pub async fn submit(
        &mut self,
        cart: &mut CartService,
        contact: ContactDetails,
    ) -> Result<OrderReceipt, CheckoutError> {
        if self.status != OrderStatus::Idle {
            return Err(CheckoutError::NotIdle(self.status));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        contact.validate()?;
        let notifier = self.notifier.clone().ok_or(CheckoutError::NotConfigured)?;

        let receipt = OrderReceipt {
            message: format_order_message(cart.cart(), &contact),
            total: cart.total(),
            lines: cart.cart().len(),
        };

        self.status = OrderStatus::Loading;
        info!(
            "Sending order with {} lines, total {}",
            receipt.lines, receipt.total
        );

        match notifier.send(&receipt.message).await {
            Ok(()) => {
                self.status = OrderStatus::Success;
                cart.clear().await;
                info!("Order delivered");
                Ok(receipt)
            }
            Err(e) => {
                self.status = OrderStatus::Idle;
                error!("Order not sent: {}", e);
                Err(CheckoutError::NotSent(e))
            }
        }
    }

    /// Return to idle after a successful order has been shown.
    pub fn acknowledge(&mut self) {
        if self.status == OrderStatus::Success {
            self.status = OrderStatus::Idle;
        } else {
            warn!("Acknowledge ignored while checkout is {}", self.status);
        }
    }
}
