pub mod channel;
pub mod transport;

pub use channel::{ChannelConfig, SocketChannel};
pub use transport::SocketTransport;
