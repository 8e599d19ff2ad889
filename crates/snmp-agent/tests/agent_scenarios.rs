//! End-to-end agent behaviour over loopback TCP.

use std::net::SocketAddr;
use std::time::Duration;

use snmp_agent::{AgentConfig, AgentServer, load_store};
use snmp_core::mib::{Access, MibStore, SharedMib};
use snmp_core::protocol::{
    ErrorStatus, FrameReader, MAX_READ_CHUNK, Message, Oid, Pdu, Value, VarBind, write_frame,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

fn oid(text: &str) -> Oid {
    text.parse().unwrap()
}

fn small_store() -> MibStore {
    let mut store = MibStore::new();
    store.insert(
        oid("1.3.6.1.2.1.1.1.0"),
        Value::Text("Router Model X2000".into()),
        Access::ReadOnly,
    );
    store.insert(oid("1.3.6.1.2.1.1.3.0"), Value::Ticks(0), Access::ReadOnly);
    store.insert(
        oid("1.3.6.1.2.1.1.5.0"),
        Value::Text("router-main".into()),
        Access::ReadWrite,
    );
    store
}

async fn spawn_agent(store: MibStore, config: AgentConfig) -> SocketAddr {
    let server = AgentServer::bind(config, SharedMib::new(store)).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

fn loopback_config() -> AgentConfig {
    AgentConfig::new("127.0.0.1:0".parse().unwrap())
}

struct Client {
    stream: TcpStream,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    /// Send `request` and return the decoded reply with its wire size.
    async fn call(&mut self, request: &Message) -> (Message, usize) {
        write_frame(&mut self.stream, &request.encode().unwrap(), IO_TIMEOUT)
            .await
            .unwrap();
        let frame = FrameReader::new(&mut self.stream)
            .read_frame_timeout(IO_TIMEOUT)
            .await
            .unwrap();
        (Message::decode(&frame).unwrap(), frame.len())
    }

    async fn get(&mut self, id: u32, oids: &[&str]) -> (ErrorStatus, Vec<VarBind>) {
        let request = Message::new(
            id,
            Pdu::GetRequest {
                oids: oids.iter().map(|o| oid(o)).collect(),
            },
        );
        let (reply, _) = self.call(&request).await;
        assert_eq!(reply.request_id, id);
        unpack(reply)
    }

    /// Assert the agent has closed the connection.
    async fn expect_closed(&mut self) {
        let mut buf = [0u8; 16];
        let read = tokio::time::timeout(IO_TIMEOUT, self.stream.read(&mut buf))
            .await
            .unwrap()
            .unwrap_or(0);
        assert_eq!(read, 0, "agent should have closed the connection");
    }
}

fn unpack(reply: Message) -> (ErrorStatus, Vec<VarBind>) {
    match reply.pdu {
        Pdu::Response { status, bindings } => (status, bindings),
        other => panic!("expected a response, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_a_get_known_object() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let (status, bindings) = client.get(1001, &["1.3.6.1.2.1.1.1.0"]).await;
    assert_eq!(status, ErrorStatus::Success);
    assert_eq!(
        bindings,
        [VarBind::new(
            oid("1.3.6.1.2.1.1.1.0"),
            Value::Text("Router Model X2000".into())
        )]
    );
}

#[tokio::test]
async fn scenario_b_get_unknown_object() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let (status, bindings) = client.get(1002, &["1.3.6.1.2.1.1.9.0"]).await;
    assert_eq!(status, ErrorStatus::NoSuchObject);
    assert!(bindings.is_empty());
}

#[tokio::test]
async fn scenario_c_set_read_only_object() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let request = Message::new(
        1003,
        Pdu::SetRequest {
            bindings: vec![VarBind::new(oid("1.3.6.1.2.1.1.3.0"), Value::Ticks(999_999))],
        },
    );
    let (reply, _) = client.call(&request).await;
    assert_eq!(reply.request_id, 1003);
    assert_eq!(unpack(reply), (ErrorStatus::ReadOnly, vec![]));

    let (status, bindings) = client.get(1004, &["1.3.6.1.2.1.1.3.0"]).await;
    assert_eq!(status, ErrorStatus::Success);
    let Value::Ticks(ticks) = bindings[0].value else {
        panic!("uptime must stay a ticks value");
    };
    assert!(ticks < 999_999, "read-only write leaked through: {ticks}");
}

#[tokio::test]
async fn scenario_d_bulk_walks_interface_table() {
    let addr = spawn_agent(load_store(None).unwrap(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let request = Message::new(
        1005,
        Pdu::GetBulkRequest {
            oid: oid("1.3.6.1.2.1.2.2.1.10"),
            max_repetitions: 50,
        },
    );
    let (reply, _) = client.call(&request).await;
    let (status, bindings) = unpack(reply);
    assert_eq!(status, ErrorStatus::Success);
    assert_eq!(bindings.len(), 50);

    let oids: Vec<String> = bindings.iter().map(|b| b.oid.to_string()).collect();
    assert_eq!(
        &oids[..6],
        [
            "1.3.6.1.2.1.2.2.1.10.1",
            "1.3.6.1.2.1.2.2.1.10.2",
            "1.3.6.1.2.1.2.2.1.10.3",
            "1.3.6.1.2.1.2.2.1.11.1",
            "1.3.6.1.2.1.2.2.1.11.2",
            "1.3.6.1.2.1.2.2.1.11.3",
        ]
    );
    assert_eq!(bindings[0].value, Value::Counter(3_456_789_012));
    assert!(bindings.windows(2).all(|pair| pair[0].oid < pair[1].oid));
}

#[tokio::test]
async fn scenario_e_large_response_is_reassembled() {
    let addr = spawn_agent(load_store(None).unwrap(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let request = Message::new(
        1006,
        Pdu::GetBulkRequest {
            oid: oid("1.3.6.1.4.1.99"),
            max_repetitions: 50,
        },
    );
    let (reply, wire_size) = client.call(&request).await;
    assert!(
        wire_size > MAX_READ_CHUNK,
        "response of {wire_size} bytes should span several reads"
    );
    let (status, bindings) = unpack(reply);
    assert_eq!(status, ErrorStatus::Success);
    assert_eq!(bindings.len(), 50);
    assert_eq!(bindings[0].oid, oid("1.3.6.1.4.1.99.1.1.0"));
    assert_eq!(
        bindings[0].value,
        Value::Text(
            "Test OID 1 - This is a longer string to help test buffering of large SNMP messages"
                .into()
        )
    );
}

#[tokio::test]
async fn bulk_past_the_end_returns_empty_success() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let request = Message::new(
        1,
        Pdu::GetBulkRequest {
            oid: oid("1.3.6.1.2.1.1.5.0"),
            max_repetitions: 10,
        },
    );
    let (reply, _) = client.call(&request).await;
    assert_eq!(unpack(reply), (ErrorStatus::Success, vec![]));
}

#[tokio::test]
async fn connection_survives_application_errors() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    assert_eq!(
        client.get(1, &["1.3.6.1.2.1.1.9.0"]).await.0,
        ErrorStatus::NoSuchObject
    );
    let request = Message::new(
        2,
        Pdu::SetRequest {
            bindings: vec![VarBind::new(oid("1.3.6.1.2.1.1.5.0"), Value::Integer(3))],
        },
    );
    assert_eq!(unpack(client.call(&request).await.0).0, ErrorStatus::BadValue);

    let request = Message::new(
        3,
        Pdu::SetRequest {
            bindings: vec![VarBind::new(
                oid("1.3.6.1.2.1.1.5.0"),
                Value::Text("core-1".into()),
            )],
        },
    );
    let (status, bindings) = unpack(client.call(&request).await.0);
    assert_eq!(status, ErrorStatus::Success);
    assert_eq!(bindings[0].value, Value::Text("core-1".into()));

    let (status, bindings) = client.get(4, &["1.3.6.1.2.1.1.5.0"]).await;
    assert_eq!(status, ErrorStatus::Success);
    assert_eq!(bindings[0].value, Value::Text("core-1".into()));
}

#[tokio::test]
async fn short_length_prefix_closes_connection() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    client.stream.write_all(&[0, 0, 0, 3]).await.unwrap();
    client.expect_closed().await;

    // The agent keeps serving new connections.
    let mut fresh = Client::connect(addr).await;
    assert_eq!(
        fresh.get(2, &["1.3.6.1.2.1.1.1.0"]).await.0,
        ErrorStatus::Success
    );
}

#[tokio::test]
async fn oversized_length_prefix_closes_connection() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    client
        .stream
        .write_all(&0x0010_0000u32.to_be_bytes())
        .await
        .unwrap();
    client.expect_closed().await;
}

#[tokio::test]
async fn malformed_payload_closes_connection() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    // GetRequest claiming one identifier of length 0.
    client
        .stream
        .write_all(&[0, 0, 0, 11, 0, 0, 0, 9, 0xA0, 1, 0])
        .await
        .unwrap();
    client.expect_closed().await;
}

#[tokio::test]
async fn request_split_across_writes_is_reassembled() {
    let addr = spawn_agent(small_store(), loopback_config()).await;
    let mut client = Client::connect(addr).await;

    let request = Message::new(
        77,
        Pdu::GetRequest {
            oids: vec![oid("1.3.6.1.2.1.1.1.0")],
        },
    )
    .encode()
    .unwrap();
    for byte in request.iter() {
        client.stream.write_all(&[*byte]).await.unwrap();
        client.stream.flush().await.unwrap();
    }
    let frame = FrameReader::new(&mut client.stream)
        .read_frame_timeout(IO_TIMEOUT)
        .await
        .unwrap();
    let reply = Message::decode(&frame).unwrap();
    assert_eq!(reply.request_id, 77);
    assert_eq!(unpack(reply).0, ErrorStatus::Success);
}

#[tokio::test]
async fn concurrent_connections_share_one_store() {
    let addr = spawn_agent(small_store(), loopback_config()).await;

    let tasks: Vec<_> = (0..8u32)
        .map(|worker| {
            tokio::spawn(async move {
                let mut client = Client::connect(addr).await;
                let name = format!("router-{worker}");
                for round in 0..10u32 {
                    let id = worker * 100 + round;
                    let request = Message::new(
                        id,
                        Pdu::SetRequest {
                            bindings: vec![VarBind::new(
                                oid("1.3.6.1.2.1.1.5.0"),
                                Value::Text(name.clone()),
                            )],
                        },
                    );
                    let (reply, _) = client.call(&request).await;
                    assert_eq!(reply.request_id, id);
                    let (status, bindings) = client.get(id + 50, &["1.3.6.1.2.1.1.5.0"]).await;
                    assert_eq!(status, ErrorStatus::Success);
                    let Value::Text(seen) = &bindings[0].value else {
                        panic!("sysName must stay a string");
                    };
                    assert!(seen.starts_with("router-"));
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }
}

#[tokio::test]
async fn single_connection_limit_serves_clients_in_turn() {
    let addr = spawn_agent(small_store(), loopback_config().with_max_connections(1)).await;

    let mut first = Client::connect(addr).await;
    assert_eq!(first.get(1, &["1.3.6.1.2.1.1.1.0"]).await.0, ErrorStatus::Success);

    let second = tokio::spawn(async move {
        let mut client = Client::connect(addr).await;
        client.get(2, &["1.3.6.1.2.1.1.1.0"]).await.0
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!second.is_finished(), "second client must wait for a slot");

    drop(first);
    let status = tokio::time::timeout(IO_TIMEOUT, second).await.unwrap().unwrap();
    assert_eq!(status, ErrorStatus::Success);
}

#[tokio::test]
async fn idle_connection_is_closed_after_read_timeout() {
    let config = loopback_config().with_read_timeout(Duration::from_millis(100));
    let addr = spawn_agent(small_store(), config).await;
    let mut client = Client::connect(addr).await;
    client.expect_closed().await;
}
