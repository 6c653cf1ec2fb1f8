//! どこで: アプリプロトコルのTCPサーバ / 何を: 接続毎FIFOのdispatch / なぜ: driver順序をそのままエンジンへ通すため

use std::io;
use std::sync::Arc;

use evm_core::Engine;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::wire::{
    decode_request, encode_response, Request, Response, MAX_FRAME_LEN, TAG_INFO, TAG_SET_OPTION,
};

/// Binds the application listen address (`tcp://host:port` or bare
/// `host:port`) and serves the driver until the process exits.
pub async fn serve(listen_addr: &str, engine: Arc<Engine>) -> io::Result<()> {
    let addr = listen_addr.strip_prefix("tcp://").unwrap_or(listen_addr);
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "application protocol listening");
    serve_on(listener, engine).await
}

/// Accept loop over an already-bound listener.
pub async fn serve_on(listener: TcpListener, engine: Arc<Engine>) -> io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "driver connected");
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            match handle_connection(stream, engine).await {
                Ok(()) => debug!(%peer, "driver disconnected"),
                Err(err) => error!(%peer, ?err, "connection failed"),
            }
        });
    }
}

/// One request, one response, strictly in order. A clean EOF between frames
/// ends the connection without error.
async fn handle_connection(mut stream: TcpStream, engine: Arc<Engine>) -> io::Result<()> {
    loop {
        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(err) => return Err(err),
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame length {len} out of bounds"),
            ));
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;
        let request = decode_request(&body).map_err(|err| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("failed to decode request: {err:?}"),
            )
        })?;

        let response = dispatch(&engine, request);
        stream.write_all(&encode_response(&response)).await?;
        stream.flush().await?;
    }
}

fn dispatch(engine: &Engine, request: Request) -> Response {
    let tag = request.tag();
    match request {
        Request::Info => Response::ok_log(TAG_INFO, engine.info()),
        Request::SetOption { key, value } => {
            Response::ok_log(TAG_SET_OPTION, engine.set_option(&key, &value))
        }
        Request::CheckTx(tx) => Response::from_app(tag, engine.check_tx(&tx)),
        Request::AppendTx(tx) => Response::from_app(tag, engine.append_tx(&tx)),
        Request::Commit => Response::from_app(tag, engine.commit()),
        Request::Query(query) => Response::from_app(tag, engine.query(&query)),
    }
}
