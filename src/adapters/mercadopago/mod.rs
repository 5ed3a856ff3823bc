//! Mercado Pago payment gateway adapters.

mod api_types;
mod mercadopago_adapter;
mod mock_payment_gateway;

pub use mercadopago_adapter::{MercadoPagoConfig, MercadoPagoGateway};
pub use mock_payment_gateway::{MethodCall, MockPaymentGateway};
