//! Shared test harness for workspace integration tests: a raw WebSocket
//! test client and a helper to spin up a real hub on a random port.

pub mod mock_client;
pub mod test_hub;

pub use mock_client::{MockClient, MockClientError};
pub use test_hub::TestHub;
