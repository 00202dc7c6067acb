//! One WebSocket connection to the chat server: authenticate, then chat.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use luconnect_shared::protocol::{ClientFrame, ServerFrame};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::{
    error::ClientError,
    runner::Credentials,
};

use super::{
    domain::{AuthStep, classify_auth_reply, is_exit_command},
    formatter::MessageFormatter,
    ui::{LineInput, redisplay_prompt, ring_bell},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

/// Run one client session until `/exit`, input EOF or a connection failure.
pub async fn run_client_session(
    url: &str,
    credentials: &mut Credentials,
    input: &mut LineInput,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    tracing::info!("Connected to chat server!");

    let (mut write, mut read) = ws_stream.split();
    let username = authenticate(&mut write, &mut read, credentials, input).await?;

    input.set_prompt(format!("{}> ", username));
    let mut read_task = tokio::spawn(read_loop(read, username.clone()));

    loop {
        tokio::select! {
            result = &mut read_task => {
                return result.unwrap_or_else(|e| Err(ClientError::ConnectionError(e.to_string())));
            }
            line = input.next_line() => {
                // Ctrl+C / Ctrl+D leave the chat like /exit
                let line = line.unwrap_or_else(|| "/exit".to_string());
                let exiting = is_exit_command(&line);
                send_frame(&mut write, &ClientFrame::Line { text: line }).await?;
                if exiting {
                    let _ = write.close().await;
                    read_task.abort();
                    println!("Bye.");
                    return Ok(());
                }
            }
        }
    }
}

async fn send_frame(write: &mut WsWrite, frame: &ClientFrame) -> Result<(), ClientError> {
    let json = serde_json::to_string(frame)
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))
}

/// Next server frame, skipping anything that is not a JSON text frame.
async fn next_frame(read: &mut WsRead) -> Result<ServerFrame, ClientError> {
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => return Ok(frame),
                Err(e) => tracing::debug!("Ignoring unknown frame {}: {}", text, e),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
        }
    }
    Err(ClientError::ConnectionError(
        "server closed the connection".to_string(),
    ))
}

async fn prompt_line(input: &mut LineInput, prompt: &str) -> Result<String, ClientError> {
    input.set_prompt(prompt);
    input
        .next_line()
        .await
        .ok_or_else(|| ClientError::InputClosed("no credentials entered".to_string()))
}

/// Log in (or register) until the server accepts the credentials or ends the phase.
async fn authenticate(
    write: &mut WsWrite,
    read: &mut WsRead,
    credentials: &mut Credentials,
    input: &mut LineInput,
) -> Result<String, ClientError> {
    loop {
        if let ServerFrame::AuthStart { max_attempts } = next_frame(read).await? {
            println!("Please sign in ({} attempt(s) allowed).", max_attempts);
            break;
        }
    }

    loop {
        let username = match &credentials.username {
            Some(username) => username.clone(),
            None => prompt_line(input, "username: ").await?,
        };
        let password = match &credentials.password {
            Some(password) => password.clone(),
            None => prompt_line(input, "password: ").await?,
        };

        let frame = if credentials.register {
            ClientFrame::Register {
                username: username.clone(),
                password: password.clone(),
            }
        } else {
            ClientFrame::Login {
                username: username.clone(),
                password: password.clone(),
            }
        };
        send_frame(write, &frame).await?;

        loop {
            let reply = next_frame(read).await?;
            match classify_auth_reply(&reply, &username) {
                AuthStep::Authenticated(name) => {
                    // Reconnects log in with the same credentials
                    credentials.username = Some(name.clone());
                    credentials.password = Some(password);
                    credentials.register = false;
                    return Ok(name);
                }
                AuthStep::Retry { reason, remaining } => {
                    print!("{}", MessageFormatter::format_auth_failed(&reason, remaining));
                    credentials.password = None;
                    if reason != "invalid-credentials" {
                        credentials.username = None;
                    }
                    break;
                }
                AuthStep::Rejected(end) => return Err(end.into()),
                AuthStep::Ignore => {
                    if let Some(text) = MessageFormatter::format_frame(&reply) {
                        print!("{}", text);
                    }
                }
            }
        }
    }
}

/// Print frames until the connection ends. Returns the reason it ended.
async fn read_loop(mut read: WsRead, username: String) -> Result<(), ClientError> {
    loop {
        let frame = next_frame(&mut read).await?;
        match &frame {
            ServerFrame::Notify { .. } => {
                ring_bell();
                continue;
            }
            ServerFrame::ServerShutdown => {
                if let Some(text) = MessageFormatter::format_frame(&frame) {
                    print!("{}", text);
                }
                return Err(ClientError::ServerShutdown);
            }
            _ => {}
        }
        if let Some(text) = MessageFormatter::format_frame(&frame) {
            print!("{}", text);
            redisplay_prompt(&username);
        }
    }
}
