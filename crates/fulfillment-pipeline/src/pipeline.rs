//! The orchestrator: binds each stage to its collaborator subset and runs
//! them left to right, short-circuiting on the first error.

use std::sync::Arc;

use fulfillment_stages::{
	CartRepository, CartValidator, InventoryAllocator, InventoryService, NotificationService,
	OrderCompleter, OrderRepository, OrderUpdateRepository, PaymentProcessor, PaymentService,
	ProductRepository, ShippingCalculator, ShippingService, WarehouseService,
};
use fulfillment_types::{CompletedOrder, FailedOrder, OrderError, OrderInput, OrderProcessingState};

use crate::progress::ProgressSink;

/// Every collaborator the pipeline consumes, bundled for injection.
///
/// Collaborators are expected to be thread-safe; the pipeline imposes no
/// locking of its own and holds no shared mutable state between orders.
#[derive(Clone)]
pub struct Dependencies {
	pub cart_repo: Arc<dyn CartRepository>,
	pub product_repo: Arc<dyn ProductRepository>,
	pub shipping_service: Arc<dyn ShippingService>,
	pub payment_service: Arc<dyn PaymentService>,
	pub order_repo: Arc<dyn OrderRepository>,
	pub inventory_service: Arc<dyn InventoryService>,
	pub warehouse_service: Arc<dyn WarehouseService>,
	pub order_update_repo: Arc<dyn OrderUpdateRepository>,
	pub notification_service: Arc<dyn NotificationService>,
}

/// Runs orders through validation, shipping, payment, allocation and
/// completion.
///
/// Each invocation owns its own state chain; the pipeline itself keeps no
/// per-order state, so one instance can serve concurrent orders. No retry,
/// timeout or cancellation policy lives here - collaborators enforce their
/// own timeouts and the caller owns retries.
pub struct OrderPipeline {
	validator: CartValidator,
	shipping: ShippingCalculator,
	payment: PaymentProcessor,
	allocator: InventoryAllocator,
	completer: OrderCompleter,
}

impl OrderPipeline {
	/// Binds each stage to the subset of collaborators it needs.
	pub fn new(deps: Dependencies) -> Self {
		Self {
			validator: CartValidator::new(deps.cart_repo),
			shipping: ShippingCalculator::new(deps.shipping_service.clone(), deps.product_repo),
			payment: PaymentProcessor::new(deps.payment_service, deps.order_repo),
			allocator: InventoryAllocator::new(deps.inventory_service, deps.warehouse_service),
			completer: OrderCompleter::new(
				deps.shipping_service,
				deps.order_update_repo,
				deps.notification_service,
			),
		}
	}

	/// Runs the full chain, stopping at the first failed stage. The error
	/// passes through untouched from wherever it arose.
	#[tracing::instrument(skip_all, fields(user_id = %input.user_id, cart_id = %input.cart_id))]
	pub async fn process_order(&self, input: OrderInput) -> Result<CompletedOrder, OrderError> {
		let validated = self.validator.validate(input).await?;
		let calculated = self.shipping.calculate(validated).await?;
		let processed = self.payment.process(calculated).await?;
		let allocated = self.allocator.allocate(processed).await?;
		self.completer.complete(allocated).await
	}

	/// Like `process_order`, but failure is folded into the terminal
	/// `Failed` state instead of a separate error channel, so callers
	/// always receive a terminal state.
	pub async fn process_order_with_fallback(&self, input: OrderInput) -> OrderProcessingState {
		let user_id = input.user_id.clone();
		match self.process_order(input).await {
			Ok(completed) => OrderProcessingState::Completed(completed),
			Err(error) => {
				tracing::warn!(%user_id, %error, "order failed");
				// The failure may predate order id assignment, so the
				// terminal state carries none.
				OrderProcessingState::Failed(FailedOrder::from_error(user_id, None, error))
			}
		}
	}

	/// Same chain and fallback as `process_order_with_fallback`, reporting
	/// every state to `progress` as it is reached, the initial input and
	/// the synthesized `Failed` included.
	pub async fn process_order_with_progress(
		&self,
		input: OrderInput,
		progress: &dyn ProgressSink,
	) -> OrderProcessingState {
		let user_id = input.user_id.clone();
		progress.observe(&OrderProcessingState::Input(input.clone()));

		match self.observed_chain(input, progress).await {
			Ok(completed) => {
				let state = OrderProcessingState::Completed(completed);
				progress.observe(&state);
				state
			}
			Err(error) => {
				tracing::warn!(%user_id, %error, "order failed");
				let state =
					OrderProcessingState::Failed(FailedOrder::from_error(user_id, None, error));
				progress.observe(&state);
				state
			}
		}
	}

	async fn observed_chain(
		&self,
		input: OrderInput,
		progress: &dyn ProgressSink,
	) -> Result<CompletedOrder, OrderError> {
		let validated = self.validator.validate(input).await?;
		progress.observe(&OrderProcessingState::ValidatedCart(validated.clone()));

		let calculated = self.shipping.calculate(validated).await?;
		progress.observe(&OrderProcessingState::CalculatedShipping(calculated.clone()));

		let processed = self.payment.process(calculated).await?;
		progress.observe(&OrderProcessingState::ProcessedPayment(processed.clone()));

		let allocated = self.allocator.allocate(processed).await?;
		progress.observe(&OrderProcessingState::AllocatedInventory(allocated.clone()));

		self.completer.complete(allocated).await
	}
}
