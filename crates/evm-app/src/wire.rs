//! どこで: アプリプロトコルのwire形式 / 何を: 長さフレーム+タグ付き要求応答 / なぜ: driverとの枠組みを凍結するため

use evm_core::AppResult;

/// Upper bound for one frame body to avoid unbounded allocations from bogus
/// length fields.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

pub const TAG_INFO: u8 = 0x01;
pub const TAG_SET_OPTION: u8 = 0x02;
pub const TAG_CHECK_TX: u8 = 0x03;
pub const TAG_APPEND_TX: u8 = 0x04;
pub const TAG_COMMIT: u8 = 0x05;
pub const TAG_QUERY: u8 = 0x06;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WireError {
    FrameTooLarge(usize),
    UnknownTag(u8),
    Truncated,
    TrailingBytes,
    InvalidUtf8,
}

/// The five driver operations plus `Query`, as they travel on the socket.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    Info,
    SetOption { key: String, value: String },
    CheckTx(Vec<u8>),
    AppendTx(Vec<u8>),
    Commit,
    Query(Vec<u8>),
}

impl Request {
    pub fn tag(&self) -> u8 {
        match self {
            Request::Info => TAG_INFO,
            Request::SetOption { .. } => TAG_SET_OPTION,
            Request::CheckTx(_) => TAG_CHECK_TX,
            Request::AppendTx(_) => TAG_APPEND_TX,
            Request::Commit => TAG_COMMIT,
            Request::Query(_) => TAG_QUERY,
        }
    }
}

/// Tagged response: echoed request tag, result code, payload, log line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    pub tag: u8,
    pub code: u32,
    pub data: Vec<u8>,
    pub log: String,
}

impl Response {
    pub fn from_app(tag: u8, result: AppResult) -> Self {
        Self {
            tag,
            code: result.code.to_u32(),
            data: result.data,
            log: result.log,
        }
    }

    /// Code-zero response carrying only a log line (`Info`, `SetOption`).
    pub fn ok_log(tag: u8, log: impl Into<String>) -> Self {
        Self {
            tag,
            code: 0,
            data: Vec::new(),
            log: log.into(),
        }
    }
}

/// Full request frame: u32 BE body length, then tag + payload.
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut body = vec![request.tag()];
    match request {
        Request::Info | Request::Commit => {}
        Request::SetOption { key, value } => {
            put_bytes(&mut body, key.as_bytes());
            put_bytes(&mut body, value.as_bytes());
        }
        Request::CheckTx(tx) | Request::AppendTx(tx) => put_bytes(&mut body, tx),
        Request::Query(query) => put_bytes(&mut body, query),
    }
    frame(body)
}

/// Decodes one frame body (length prefix already stripped).
pub fn decode_request(body: &[u8]) -> Result<Request, WireError> {
    let mut offset = 0;
    let tag = read_u8(body, &mut offset)?;
    let request = match tag {
        TAG_INFO => Request::Info,
        TAG_SET_OPTION => {
            let key = read_string(body, &mut offset)?;
            let value = read_string(body, &mut offset)?;
            Request::SetOption { key, value }
        }
        TAG_CHECK_TX => Request::CheckTx(read_bytes(body, &mut offset)?),
        TAG_APPEND_TX => Request::AppendTx(read_bytes(body, &mut offset)?),
        TAG_COMMIT => Request::Commit,
        TAG_QUERY => Request::Query(read_bytes(body, &mut offset)?),
        other => return Err(WireError::UnknownTag(other)),
    };
    if offset != body.len() {
        return Err(WireError::TrailingBytes);
    }
    Ok(request)
}

pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut body = vec![response.tag];
    body.extend_from_slice(&response.code.to_be_bytes());
    put_bytes(&mut body, &response.data);
    put_bytes(&mut body, response.log.as_bytes());
    frame(body)
}

pub fn decode_response(body: &[u8]) -> Result<Response, WireError> {
    let mut offset = 0;
    let tag = read_u8(body, &mut offset)?;
    let code = read_u32(body, &mut offset)?;
    let data = read_bytes(body, &mut offset)?;
    let log = read_string(body, &mut offset)?;
    if offset != body.len() {
        return Err(WireError::TrailingBytes);
    }
    Ok(Response {
        tag,
        code,
        data,
        log,
    })
}

fn frame(body: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

fn read_u8(body: &[u8], offset: &mut usize) -> Result<u8, WireError> {
    let byte = *body.get(*offset).ok_or(WireError::Truncated)?;
    *offset += 1;
    Ok(byte)
}

fn read_u32(body: &[u8], offset: &mut usize) -> Result<u32, WireError> {
    let end = offset.checked_add(4).ok_or(WireError::Truncated)?;
    let slice = body.get(*offset..end).ok_or(WireError::Truncated)?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(slice);
    *offset = end;
    Ok(u32::from_be_bytes(buf))
}

fn read_bytes(body: &[u8], offset: &mut usize) -> Result<Vec<u8>, WireError> {
    let len = read_u32(body, offset)? as usize;
    if len > MAX_FRAME_LEN {
        return Err(WireError::FrameTooLarge(len));
    }
    let end = offset.checked_add(len).ok_or(WireError::Truncated)?;
    let slice = body.get(*offset..end).ok_or(WireError::Truncated)?;
    *offset = end;
    Ok(slice.to_vec())
}

fn read_string(body: &[u8], offset: &mut usize) -> Result<String, WireError> {
    let bytes = read_bytes(body, offset)?;
    String::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
}
