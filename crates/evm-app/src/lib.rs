//! どこで: driver向けソケット層 / 何を: 長さフレームの5操作プロトコル / なぜ: エンジンをdriverのmessage loopへ繋ぐため

pub mod server;
pub mod wire;

pub use server::{serve, serve_on};
pub use wire::{Request, Response, WireError, MAX_FRAME_LEN};
