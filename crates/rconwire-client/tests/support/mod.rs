#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rconwire_client::{ClientConfig, ClientEvent};
use rconwire_frame::{
    Frame, RconCodec, AUTH, AUTH_FAILURE_ID, AUTH_RESPONSE, EXEC_COMMAND, RESPONSE_VALUE,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::codec::Framed;

pub const PASSWORD: &str = "secret";

pub type Conn = Framed<TcpStream, RconCodec>;

/// Accept connections forever, handing each to `handler` with its 0-based
/// index.
pub async fn spawn_server<F, Fut>(handler: F) -> u16
where
    F: Fn(Conn, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut index = 0;
        while let Ok((socket, _)) = listener.accept().await {
            let conn = Framed::new(socket, RconCodec::new());
            tokio::spawn(handler(conn, index));
            index += 1;
        }
    });

    port
}

pub fn config(port: u16) -> ClientConfig {
    ClientConfig::new("127.0.0.1", port).with_timeout(Duration::from_secs(2))
}

/// Answer auth the way Source servers do: an empty value, then the verdict.
pub async fn answer_auth(conn: &mut Conn, frame: &Frame, password: &str) -> bool {
    let accepted = frame.text() == password;
    let id = if accepted {
        frame.request_id
    } else {
        AUTH_FAILURE_ID
    };
    conn.send(Frame::new(frame.request_id, RESPONSE_VALUE, ""))
        .await
        .unwrap();
    conn.send(Frame::new(id, AUTH_RESPONSE, "")).await.unwrap();
    accepted
}

/// Send a response split into `fragments`.
pub async fn answer(conn: &mut Conn, id: i32, fragments: &[String]) {
    for fragment in fragments {
        conn.send(Frame::new(id, RESPONSE_VALUE, fragment.clone()))
            .await
            .unwrap();
    }
}

/// A well-behaved server: checks the password, answers commands through
/// `respond`, and echoes sentinel probes.
pub async fn serve<R>(mut conn: Conn, password: &str, auths: Arc<AtomicUsize>, respond: R)
where
    R: Fn(&str) -> Vec<String>,
{
    while let Some(Ok(frame)) = conn.next().await {
        match frame.packet_type {
            AUTH => {
                auths.fetch_add(1, Ordering::SeqCst);
                answer_auth(&mut conn, &frame, password).await;
            }
            EXEC_COMMAND if frame.payload.is_empty() => {
                answer(&mut conn, frame.request_id, &[String::new()]).await;
            }
            EXEC_COMMAND => {
                let fragments = respond(frame.text().as_ref());
                answer(&mut conn, frame.request_id, &fragments).await;
            }
            _ => {}
        }
    }
}

pub fn standard_responses(command: &str) -> Vec<String> {
    match command {
        "list" => vec!["There are 0 players online".to_string()],
        "help" => vec![
            "a".repeat(4096),
            "b".repeat(4096),
            "end of help".to_string(),
        ],
        other => vec![format!("Unknown command: {other}")],
    }
}

pub async fn standard_server() -> (u16, Arc<AtomicUsize>) {
    let auths = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&auths);
    let port = spawn_server(move |conn, _| {
        let auths = Arc::clone(&counter);
        async move { serve(conn, PASSWORD, auths, standard_responses).await }
    })
    .await;
    (port, auths)
}

/// Wait for the first event matching `pred`, failing the test after 5s.
pub async fn wait_for<P>(rx: &mut broadcast::Receiver<ClientEvent>, pred: P) -> ClientEvent
where
    P: Fn(&ClientEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}
