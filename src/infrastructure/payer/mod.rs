//! Payer gateway implementations

mod mock_gateway;

pub use mock_gateway::MockPayerGateway;
