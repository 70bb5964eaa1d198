//! Interactive host adapter and the input handshake behind it.

mod handshake;
mod ui;

pub use handshake::InputHandshake;
pub use ui::BridgeHostUi;
