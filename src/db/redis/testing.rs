//! A minimal RESP server for exercising the cache without a real Redis.
//!
//! It answers `MGET` from a fixed map and `+OK` to everything else, and
//! counts accepted connections and write commands.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub struct FakeRedis {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl FakeRedis {
    /// Serves `entries` (key to raw stored string)
    pub async fn start(entries: HashMap<String, String>) -> Self {
        Self::spawn(Some(Arc::new(entries))).await
    }

    /// Accepts connections and never replies
    pub async fn stalled() -> Self {
        Self::spawn(None).await
    }

    pub fn url(&self) -> String {
        format!("redis://{}", self.addr)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// `SET`/`SETEX` commands received so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn spawn(entries: Option<Arc<HashMap<String, String>>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let writes = Arc::new(AtomicUsize::new(0));

        let counter = connections.clone();
        let write_counter = writes.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let entries = entries.clone();
                let write_counter = write_counter.clone();
                tokio::spawn(async move {
                    match entries {
                        Some(entries) => serve(socket, &entries, &write_counter).await,
                        None => hold(socket).await,
                    }
                });
            }
        });

        Self {
            addr,
            connections,
            writes,
        }
    }
}

async fn hold(mut socket: TcpStream) {
    let mut buf = [0u8; 1024];
    while let Ok(n) = socket.read(&mut buf).await {
        if n == 0 {
            break;
        }
    }
}

async fn serve(socket: TcpStream, entries: &HashMap<String, String>, writes: &AtomicUsize) {
    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);

    while let Some(command) = read_command(&mut reader).await {
        let reply = match command.first().map(|c| c.to_ascii_uppercase()) {
            Some(name) if name == "MGET" => {
                let mut out = format!("*{}\r\n", command.len() - 1);
                for key in &command[1..] {
                    match entries.get(key) {
                        Some(value) => out.push_str(&format!("${}\r\n{}\r\n", value.len(), value)),
                        None => out.push_str("$-1\r\n"),
                    }
                }
                out
            }
            Some(name) if name == "SET" || name == "SETEX" => {
                writes.fetch_add(1, Ordering::SeqCst);
                "+OK\r\n".to_string()
            }
            _ => "+OK\r\n".to_string(),
        };
        if writer.write_all(reply.as_bytes()).await.is_err() {
            break;
        }
    }
}

async fn read_command<R>(reader: &mut R) -> Option<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let count: usize = read_header(reader, '*').await?;
    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let len: usize = read_header(reader, '$').await?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data).await.ok()?;
        data.truncate(len);
        parts.push(String::from_utf8(data).ok()?);
    }
    Some(parts)
}

async fn read_header<R>(reader: &mut R, prefix: char) -> Option<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    if reader.read_line(&mut line).await.ok()? == 0 {
        return None;
    }
    line.trim_end().strip_prefix(prefix)?.parse().ok()
}
