//! Cart validation, the first pipeline stage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fulfillment_types::{Address, CartItem, OrderError, OrderInput, ValidatedCart};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored cart as the backing store returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
	pub id: String,
	pub user_id: String,
	pub items: Vec<CartItem>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Read access to stored carts and the owner's address book.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartRepository: Send + Sync {
	async fn find_by_id(&self, cart_id: &str) -> anyhow::Result<Option<Cart>>;
	async fn user_shipping_address(&self, user_id: &str) -> anyhow::Result<Option<Address>>;
}

/// Validates the cart referenced by a checkout request and prices it.
pub struct CartValidator {
	cart_repo: Arc<dyn CartRepository>,
}

impl CartValidator {
	pub fn new(cart_repo: Arc<dyn CartRepository>) -> Self {
		Self { cart_repo }
	}

	/// Checks existence, ownership, non-emptiness and a shipping address on
	/// file, then computes the subtotal over all line items.
	#[tracing::instrument(skip_all, fields(user_id = %input.user_id, cart_id = %input.cart_id))]
	pub async fn validate(&self, input: OrderInput) -> Result<ValidatedCart, OrderError> {
		let cart = self
			.cart_repo
			.find_by_id(&input.cart_id)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to fetch cart: {e}"),
			})?
			.ok_or_else(|| OrderError::CartNotFound {
				cart_id: input.cart_id.clone(),
			})?;

		if cart.user_id != input.user_id {
			return Err(OrderError::InvalidCart {
				reason: "cart does not belong to user".to_string(),
			});
		}
		if cart.items.is_empty() {
			return Err(OrderError::InvalidCart {
				reason: "cart is empty".to_string(),
			});
		}

		let shipping_address = self
			.cart_repo
			.user_shipping_address(&input.user_id)
			.await
			.map_err(|e| OrderError::Unknown {
				message: format!("failed to fetch shipping address: {e}"),
			})?
			.ok_or_else(|| OrderError::InvalidCart {
				reason: "no shipping address on file".to_string(),
			})?;

		let subtotal: Decimal = cart
			.items
			.iter()
			.map(|item| item.price * Decimal::from(item.quantity))
			.sum();

		tracing::debug!(%subtotal, items = cart.items.len(), "cart validated");

		Ok(ValidatedCart {
			user_id: input.user_id,
			cart_items: cart.items,
			shipping_address,
			payment_method: input.payment_method,
			subtotal,
		})
	}
}
