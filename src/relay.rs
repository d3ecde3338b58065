use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::client_to_relay_communication::ClientMessage;
use crate::event::Event;
use crate::filter::{Subscription, SubscriptionId};
use crate::relay_to_client_communication::RelayMessage;

type WsSink =
  futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// [`Relay`] error
#[derive(thiserror::Error, Debug)]
pub enum Error {
  /// The transport handshake failed
  #[error("cannot connect: {0}")]
  CannotConnect(String),
  /// The connection dropped outside of an explicit disconnect
  #[error("socket error: {0}")]
  SocketError(String),
  /// Writing a frame to the transport failed
  #[error("write error: {0}")]
  WriteError(String),
}

/// What a transport reports back to the session: inbound text frames in
/// arrival order, then at most one close notification.
#[derive(Debug)]
pub enum TransportEvent {
  Message(String),
  Closed(Option<Error>),
}

///
/// The minimal transport surface a [`Relay`] session drives. Injected so
/// the session logic can be exercised against a fake; the production
/// implementation is [`WsTransport`].
///
#[allow(async_fn_in_trait)]
pub trait Transport {
  /// Opens the connection and resolves once the handshake finished.
  /// Inbound frames flow through the returned channel.
  async fn connect(&mut self, url: &str) -> Result<UnboundedReceiver<TransportEvent>, Error>;

  /// Writes one text frame, resolving once the transport accepted it.
  async fn write(&mut self, text: String) -> Result<(), Error>;

  /// Closes the connection. Idempotent.
  async fn disconnect(&mut self);
}

/// WebSocket transport over tokio-tungstenite. Owns the write half; the
/// read half is pumped by a background task into the frame channel.
#[derive(Debug, Default)]
pub struct WsTransport {
  sink: Option<WsSink>,
}

impl WsTransport {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Transport for WsTransport {
  async fn connect(&mut self, url: &str) -> Result<UnboundedReceiver<TransportEvent>, Error> {
    let (ws_stream, _) = connect_async(url)
      .await
      .map_err(|err| Error::CannotConnect(err.to_string()))?;
    let (sink, mut stream) = ws_stream.split();
    self.sink = Some(sink);

    let (frames_tx, frames_rx) = unbounded_channel();
    tokio::spawn(async move {
      while let Some(frame) = stream.next().await {
        match frame {
          Ok(Message::Text(text)) => {
            if frames_tx.send(TransportEvent::Message(text)).is_err() {
              break;
            }
          }
          Ok(Message::Close(_)) => {
            let _ = frames_tx.send(TransportEvent::Closed(None));
            break;
          }
          // ping/pong/binary frames carry no protocol messages
          Ok(_) => {}
          Err(err) => {
            let _ = frames_tx.send(TransportEvent::Closed(Some(Error::SocketError(
              err.to_string(),
            ))));
            break;
          }
        }
      }
    });

    Ok(frames_rx)
  }

  async fn write(&mut self, text: String) -> Result<(), Error> {
    match self.sink.as_mut() {
      Some(sink) => sink
        .send(Message::Text(text))
        .await
        .map_err(|err| Error::WriteError(err.to_string())),
      None => Err(Error::WriteError(String::from(
        "transport is not connected",
      ))),
    }
  }

  async fn disconnect(&mut self) {
    if let Some(mut sink) = self.sink.take() {
      let _ = sink.close().await;
    }
  }
}

/// Connection lifecycle of a [`Relay`] session. Terminal on explicit
/// disconnect or an unrecoverable socket error; reconnection is the
/// caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
  Disconnected,
  Connecting,
  Connected,
}

impl RelayState {
  fn as_u8(self) -> u8 {
    match self {
      Self::Disconnected => 0,
      Self::Connecting => 1,
      Self::Connected => 2,
    }
  }

  fn from_u8(value: u8) -> Self {
    match value {
      1 => Self::Connecting,
      2 => Self::Connected,
      _ => Self::Disconnected,
    }
  }
}

///
/// A single persistent connection to one relay.
///
/// `connect` hands back the inbound message stream; `send_event`,
/// `subscribe` and `unsubscribe` are sugar over [`Relay::send_message`],
/// which resolves once the transport accepted the write - a relay's
/// verdict on a published event arrives later as a separate `OK` message
/// on the inbound stream.
///
/// While the session is not connected, `send_message` resolves Ok without
/// touching the transport. Callers that need a hard delivery guarantee
/// must check [`Relay::is_connected`] first.
///
#[derive(Debug)]
pub struct Relay<T: Transport = WsTransport> {
  url: String,
  transport: T,
  state: Arc<AtomicU8>,
}

impl Relay<WsTransport> {
  pub fn new<S: Into<String>>(url: S) -> Self {
    Self::with_transport(url, WsTransport::new())
  }
}

impl<T: Transport> Relay<T> {
  pub fn with_transport<S: Into<String>>(url: S, transport: T) -> Self {
    Self {
      url: url.into(),
      transport,
      state: Arc::new(AtomicU8::new(RelayState::Disconnected.as_u8())),
    }
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  pub fn state(&self) -> RelayState {
    RelayState::from_u8(self.state.load(Ordering::SeqCst))
  }

  pub fn is_connected(&self) -> bool {
    self.state() == RelayState::Connected
  }

  fn set_state(&self, state: RelayState) {
    self.state.store(state.as_u8(), Ordering::SeqCst);
  }

  /// Opens the connection and resolves once the handshake finished. The
  /// decode/dispatch task is installed before the session reports itself
  /// connected, so no frame arriving right after the handshake can be
  /// lost. Returns the inbound stream of decoded relay messages, in
  /// arrival order.
  ///
  /// Malformed inbound frames are dropped (with a debug log), not
  /// surfaced: one bad frame from a relay must not take the session down.
  pub async fn connect(&mut self) -> Result<UnboundedReceiver<RelayMessage>, Error> {
    self.set_state(RelayState::Connecting);

    let mut transport_events = match self.transport.connect(&self.url).await {
      Ok(events) => events,
      Err(err) => {
        self.set_state(RelayState::Disconnected);
        return Err(err);
      }
    };

    let (messages_tx, messages_rx) = unbounded_channel();
    let state = self.state.clone();
    let url = self.url.clone();
    tokio::spawn(async move {
      while let Some(event) = transport_events.recv().await {
        match event {
          TransportEvent::Message(text) => match RelayMessage::from_json(&text) {
            Ok(message) => {
              if messages_tx.send(message).is_err() {
                break;
              }
            }
            Err(err) => debug!("[{url}] dropping inbound frame: {err}"),
          },
          TransportEvent::Closed(cause) => {
            match cause {
              Some(err) => error!("[{url}] connection lost: {err}"),
              None => info!("[{url}] connection closed by relay"),
            }
            break;
          }
        }
      }
      state.store(RelayState::Disconnected.as_u8(), Ordering::SeqCst);
    });

    self.set_state(RelayState::Connected);
    info!("connected to {}", self.url);
    Ok(messages_rx)
  }

  /// Publishes an event. The relay answers with an `OK` message on the
  /// inbound stream.
  pub async fn send_event(&mut self, event: Event) -> Result<(), Error> {
    self.send_message(ClientMessage::Event(event)).await
  }

  /// Opens (or replaces) a subscription.
  pub async fn subscribe(&mut self, subscription: Subscription) -> Result<(), Error> {
    self.send_message(ClientMessage::Req(subscription)).await
  }

  /// Cancels a subscription.
  pub async fn unsubscribe(&mut self, subscription_id: SubscriptionId) -> Result<(), Error> {
    self.send_message(ClientMessage::Close(subscription_id)).await
  }

  /// Encodes and writes one client message, resolving once the transport
  /// accepted it. A no-op that still resolves Ok while not connected.
  pub async fn send_message(&mut self, message: ClientMessage) -> Result<(), Error> {
    if !self.is_connected() {
      debug!("[{}] not connected, message not sent", self.url);
      return Ok(());
    }
    self.transport.write(message.as_json()).await
  }

  /// Closes the transport. In-flight writes complete or fail before the
  /// caller observes the teardown.
  pub async fn disconnect(&mut self) {
    self.transport.disconnect().await;
    self.set_state(RelayState::Disconnected);
    info!("disconnected from {}", self.url);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use serde_json::json;

  use super::*;
  use crate::event::kind::EventKind;
  use crate::filter::Filter;
  use crate::keys::Keys;
  use tokio::sync::mpsc::UnboundedSender;

  #[cfg(test)]
  use pretty_assertions::assert_eq;

  /// Transport spy: records every write, and exposes the frame sender so
  /// tests can play the relay side.
  #[derive(Clone, Default)]
  struct FakeTransport {
    writes: Arc<Mutex<Vec<String>>>,
    frames: Arc<Mutex<Option<UnboundedSender<TransportEvent>>>>,
    refuse_connection: bool,
  }

  impl FakeTransport {
    fn writes(&self) -> Vec<String> {
      self.writes.lock().unwrap().clone()
    }

    fn feed(&self, text: &str) {
      let frames = self.frames.lock().unwrap();
      frames
        .as_ref()
        .expect("transport is not connected")
        .send(TransportEvent::Message(text.to_string()))
        .unwrap();
    }
  }

  impl Transport for FakeTransport {
    async fn connect(&mut self, _url: &str) -> Result<UnboundedReceiver<TransportEvent>, Error> {
      if self.refuse_connection {
        return Err(Error::CannotConnect(String::from("connection refused")));
      }
      let (frames_tx, frames_rx) = unbounded_channel();
      *self.frames.lock().unwrap() = Some(frames_tx);
      Ok(frames_rx)
    }

    async fn write(&mut self, text: String) -> Result<(), Error> {
      self.writes.lock().unwrap().push(text);
      Ok(())
    }

    async fn disconnect(&mut self) {
      self.frames.lock().unwrap().take();
    }
  }

  fn make_sut() -> (Relay<FakeTransport>, FakeTransport) {
    let transport = FakeTransport::default();
    let relay = Relay::with_transport("ws://127.0.0.1:8080/", transport.clone());
    (relay, transport)
  }

  fn mock_event_frame(subscription_id: &str) -> String {
    json!(["EVENT", subscription_id, {
      "content": "potato",
      "created_at": 1684589418,
      "id": "00960bd35499f8c63a4f65e79d6b1a2b7f1b8c97e76652325567b78c496350ae",
      "kind": 1,
      "pubkey": "614a695bab54e8dc98946abdb8ec019599ece6dada0c23890977d0fa128081d6",
      "sig": "bf073c935f71de50ec72bdb79f75b0bf32f9049305c3b22f97c06422c6f2edc86e0d7e07d7d7222678b238b1daee071be5f6fa653c611971395ec0d1c6407caf",
      "tags": []
    }])
    .to_string()
  }

  #[tokio::test]
  async fn sending_while_disconnected_resolves_without_a_write() {
    let (mut relay, transport) = make_sut();
    assert_eq!(relay.state(), RelayState::Disconnected);

    let keys = Keys::generate();
    let event = Event::new(&keys, EventKind::Text, vec![], String::from("hello")).unwrap();

    relay.send_event(event).await.unwrap();
    relay
      .subscribe(Subscription::with_id("sub1", vec![Filter::default()]))
      .await
      .unwrap();

    assert_eq!(transport.writes().len(), 0);
  }

  #[tokio::test]
  async fn failed_handshake_surfaces_cannot_connect_and_stays_disconnected() {
    let transport = FakeTransport {
      refuse_connection: true,
      ..Default::default()
    };
    let mut relay = Relay::with_transport("ws://127.0.0.1:8080/", transport);

    let result = relay.connect().await;
    assert!(matches!(result, Err(Error::CannotConnect(_))));
    assert_eq!(relay.state(), RelayState::Disconnected);
  }

  #[tokio::test]
  async fn subscribe_and_unsubscribe_write_req_and_close_frames() {
    let (mut relay, transport) = make_sut();
    relay.connect().await.unwrap();
    assert_eq!(relay.state(), RelayState::Connected);

    relay
      .subscribe(Subscription::with_id("sub1", vec![Filter::default()]))
      .await
      .unwrap();
    relay.unsubscribe(String::from("sub1")).await.unwrap();

    let writes = transport.writes();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], r#"["REQ","sub1",{}]"#);
    assert_eq!(writes[1], r#"["CLOSE","sub1"]"#);
  }

  #[tokio::test]
  async fn inbound_event_frames_are_decoded_and_delivered_once() {
    let (mut relay, transport) = make_sut();
    let mut messages = relay.connect().await.unwrap();

    transport.feed(&mock_event_frame("sub1"));

    let message = messages.recv().await.unwrap();
    match message {
      RelayMessage::Event {
        subscription_id,
        event,
      } => {
        assert_eq!(subscription_id, "sub1");
        assert_eq!(event.content, "potato");
      }
      other => panic!("expected an EVENT message, got {other:?}"),
    }

    // nothing else was delivered for a single frame
    assert!(messages.try_recv().is_err());
  }

  #[tokio::test]
  async fn malformed_frames_are_dropped_in_order() {
    let (mut relay, transport) = make_sut();
    let mut messages = relay.connect().await.unwrap();

    transport.feed(r#"["PING"]"#);
    transport.feed("not json");
    transport.feed(r#"["NOTICE","still alive"]"#);

    // frames are processed in arrival order, so receiving the NOTICE
    // proves the two malformed frames before it were dropped
    assert_eq!(
      messages.recv().await.unwrap(),
      RelayMessage::Notice(String::from("still alive"))
    );
    assert!(messages.try_recv().is_err());
  }

  #[tokio::test]
  async fn disconnect_flips_state_and_silences_send() {
    let (mut relay, transport) = make_sut();
    relay.connect().await.unwrap();

    relay.unsubscribe(String::from("sub1")).await.unwrap();
    relay.disconnect().await;
    assert_eq!(relay.state(), RelayState::Disconnected);

    relay.unsubscribe(String::from("sub2")).await.unwrap();
    assert_eq!(transport.writes().len(), 1);
  }
}
