//! Recording fakes for every collaborator trait, for use in tests.

pub mod mock_allocator;
pub mod mock_encoder;
pub mod mock_fec_controller;
pub mod mock_rtp_module;
pub mod mock_stats;
pub mod mock_transport;

pub use mock_allocator::MockBitrateAllocator;
pub use mock_encoder::MockVideoStreamEncoder;
pub use mock_fec_controller::MockFecController;
pub use mock_rtp_module::MockRtpSendModule;
pub use mock_stats::{MockFrameSink, MockStats};
pub use mock_transport::MockTransportController;
