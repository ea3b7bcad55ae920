pub mod gateway;
pub mod transport;

pub use gateway::{Gateway, GatewayConfig};
pub use transport::{ChannelTransport, Transport};
