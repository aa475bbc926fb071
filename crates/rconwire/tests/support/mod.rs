#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Output, Stdio};
use std::thread;

use rconwire_frame::{
    Frame, StreamAssembler, AUTH, AUTH_FAILURE_ID, AUTH_RESPONSE, EXEC_COMMAND, RESPONSE_VALUE,
};

pub const PASSWORD: &str = "secret";

/// Blocking RCON server on an ephemeral port, one thread per connection.
pub fn spawn_stub_server() -> u16 {
    spawn_server(true)
}

/// Like [`spawn_stub_server`], but `list uuids` is never answered.
pub fn spawn_stub_server_without_uuids() -> u16 {
    spawn_server(false)
}

fn spawn_server(uuids: bool) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("stub server should bind");
    let port = listener.local_addr().expect("bound address").port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    thread::spawn(move || serve(stream, uuids));
                }
                Err(_) => break,
            }
        }
    });

    port
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
    listener.local_addr().expect("bound address").port()
}

fn respond(command: &str) -> Vec<String> {
    match command {
        "list" => vec!["There are 0 players online".to_string()],
        "list uuids" => vec![
            "There are 1 of a max of 20 players online: Steve (8667ba71-b85a-4004-af54-457a9734eed7)"
                .to_string(),
        ],
        "version" => vec!["\u{a7}6This server is running Paper 1.21".to_string()],
        "help" => vec!["a".repeat(4096), "end of help".to_string()],
        other => vec![format!("Unknown command: {other}")],
    }
}

fn serve(mut stream: TcpStream, uuids: bool) {
    let mut assembler = StreamAssembler::new();
    let mut buf = [0u8; 4096];
    // Swallowing a command also swallows its trailing empty probe.
    let mut silent_probe = false;
    loop {
        let n = match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        let Ok(frames) = assembler.feed(&buf[..n]) else {
            return;
        };
        for frame in frames {
            let mut replies = Vec::new();
            match frame.packet_type {
                AUTH => {
                    let id = if frame.text() == PASSWORD {
                        frame.request_id
                    } else {
                        AUTH_FAILURE_ID
                    };
                    replies.push(Frame::new(frame.request_id, RESPONSE_VALUE, ""));
                    replies.push(Frame::new(id, AUTH_RESPONSE, ""));
                }
                EXEC_COMMAND if frame.payload.is_empty() => {
                    if !std::mem::take(&mut silent_probe) {
                        replies.push(Frame::new(frame.request_id, RESPONSE_VALUE, ""));
                    }
                }
                EXEC_COMMAND if !uuids && frame.text() == "list uuids" => {
                    silent_probe = true;
                }
                EXEC_COMMAND => {
                    for part in respond(frame.text().as_ref()) {
                        replies.push(Frame::new(frame.request_id, RESPONSE_VALUE, part));
                    }
                }
                _ => {}
            }
            for reply in replies {
                let bytes = reply.encode().expect("reply should encode");
                if stream.write_all(&bytes).is_err() {
                    return;
                }
            }
        }
    }
}

/// The CLI with a clean environment, quiet logs and the given port.
pub fn cli(port: u16) -> Command {
    cli_with_timeout(port, "2s")
}

/// Like [`cli`], with a caller-chosen `--timeout`.
pub fn cli_with_timeout(port: u16, timeout: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rconwire"));
    cmd.env_remove("RCON_HOST")
        .env_remove("RCON_PORT")
        .env_remove("RCON_PASSWORD")
        .env_remove("RCON_TIMEOUT")
        .arg("--log-level")
        .arg("error")
        .arg("--port")
        .arg(port.to_string())
        .arg("--timeout")
        .arg(timeout)
        .stdin(Stdio::null());
    cmd
}

pub fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("cli should run")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
