//! Stage services for the order fulfillment pipeline.
//!
//! Each stage is a small struct holding only the collaborator handles it
//! needs, with one async transition method that consumes the state it
//! accepts and produces the next one or an [`fulfillment_types::OrderError`].
//! Stages know nothing about their neighbors; only the orchestrator sees
//! the full chain.
//!
//! Collaborator traits are defined next to the stage that introduces them
//! and are consumed, never implemented, here. Apart from the payment
//! gateway, which reports a structured [`payment::PaymentError`],
//! collaborators surface failures as opaque [`anyhow::Error`] values that
//! the stages translate into the taxonomy at the boundary.

pub mod cart;
pub mod completion;
pub mod inventory;
pub mod payment;
pub mod shipping;

pub use cart::{Cart, CartRepository, CartValidator};
pub use completion::{
	NotificationService, OrderCompleter, OrderCompletionMetadata, OrderUpdateRepository,
};
pub use inventory::{InventoryAllocation, InventoryAllocator, InventoryService, WarehouseService};
pub use payment::{
	OrderRecord, OrderRecordStatus, OrderRepository, PaymentError, PaymentProcessor, PaymentResult,
	PaymentService, PaymentStatus,
};
pub use shipping::{
	Dimensions, ProductDetails, ProductRepository, ShipmentLine, ShipmentRequest, ShipmentResult,
	ShippingCalculator, ShippingService,
};
