//! End-to-end behaviour over a real TCP socket.
//!
//! Each test owns a server, a simulated host, and a client socket, and
//! drives the tick loop by hand so settlement timing stays deterministic.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use serde_json::{Value, json};

use croupier_config::{Config, SocketEndpoint};
use croupierd::{ControlServer, sim::SimHost};

/// Ticks a simulated action needs before its effect is observable.
const SETTLE_DELAY: u64 = 2;

struct Harness {
    server: ControlServer,
    host: SimHost,
    client: TcpStream,
    inbound: Vec<u8>,
    next_id: u64,
}

fn harness() -> Harness {
    let config = Config {
        socket: SocketEndpoint::tcp("127.0.0.1", 0),
        log_filter: "off".to_owned(),
        ..Config::default()
    };
    let server = ControlServer::start(&config).expect("start server");
    let addr = server.local_addr().expect("tcp address");

    let client = TcpStream::connect(addr).expect("connect client");
    client
        .set_read_timeout(Some(Duration::from_millis(20)))
        .expect("read timeout");
    client.set_nodelay(true).expect("nodelay");

    let mut harness = Harness {
        server,
        host: SimHost::new(SETTLE_DELAY),
        client,
        inbound: Vec::new(),
        next_id: 0,
    };
    // Let the server accept the connection.
    harness.pump(3);
    harness
}

impl Harness {
    fn pump(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.host.tick();
            self.server.update(&mut self.host);
        }
    }

    fn send_raw(&mut self, bytes: &[u8]) {
        self.client.write_all(bytes).expect("write request");
        self.client.flush().expect("flush request");
        // Give the loopback a moment to deliver before the next poll.
        std::thread::sleep(Duration::from_millis(20));
    }

    fn send(&mut self, method: &str, params: Value) -> u64 {
        self.next_id += 1;
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id,
        });
        let mut bytes = request.to_string().into_bytes();
        bytes.push(b'\n');
        self.send_raw(&bytes);
        self.next_id
    }

    fn try_read_line(&mut self) -> Option<Value> {
        let mut chunk = [0_u8; 4096];
        loop {
            match self.client.read(&mut chunk) {
                Ok(0) => break,
                Ok(read) => self.inbound.extend_from_slice(&chunk[..read]),
                Err(error)
                    if matches!(
                        error.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    break;
                }
                Err(error) => panic!("client read failed: {error}"),
            }
        }
        let pos = self.inbound.iter().position(|byte| *byte == b'\n')?;
        let line: Vec<u8> = self.inbound.drain(..=pos).collect();
        Some(serde_json::from_slice(&line).expect("response is JSON"))
    }

    fn read_response(&mut self) -> Value {
        for _ in 0..200 {
            if let Some(response) = self.try_read_line() {
                return response;
            }
            self.pump(1);
        }
        panic!("no response arrived");
    }

    fn request(&mut self, method: &str, params: Value) -> Value {
        let id = self.send(method, params);
        let response = self.read_response();
        assert_eq!(response["id"], Value::from(id), "correlation id echoed");
        response
    }

    /// Drives the simulated run into the shop.
    fn enter_shop(&mut self) {
        let response = self.request(
            "start",
            json!({"deck": "RED", "stake": "WHITE", "seed": "TEST123"}),
        );
        assert_eq!(response["result"]["state"], "BLIND_SELECT");

        let response = self.request("select", json!({}));
        assert_eq!(response["result"]["state"], "SELECTING_HAND");

        // Jack the score so one play clears the blind.
        let response = self.request("set", json!({"chips": 100_000}));
        assert_eq!(response["result"]["round"]["chips"], 100_000);

        let response = self.request("play", json!({"cards": [0]}));
        assert_eq!(response["result"]["state"], "ROUND_EVAL");

        let response = self.request("cash_out", json!({}));
        assert_eq!(response["result"]["state"], "SHOP");
    }
}

#[test]
fn health_round_trips_and_is_idempotent() {
    let mut harness = harness();
    let first = harness.request("health", json!({}));
    assert_eq!(first["result"]["status"], "ok");
    assert_eq!(first["jsonrpc"], "2.0");

    let second = harness.request("health", json!({}));
    assert_eq!(first["result"], second["result"], "identical modulo id");
}

#[test]
fn gamestate_works_from_the_menu() {
    let mut harness = harness();
    let response = harness.request("gamestate", json!({}));
    assert_eq!(response["result"]["state"], "MENU");
}

#[test]
fn unknown_endpoint_is_a_bad_request() {
    let mut harness = harness();
    let response = harness.request("nonexistent_endpoint", json!({}));
    assert_eq!(response["error"]["data"]["name"], "BAD_REQUEST");
    assert_eq!(response["error"]["code"], -32001);
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("nonexistent_endpoint"))
    );
}

#[test]
fn shop_gated_endpoint_names_shop_from_the_menu() {
    let mut harness = harness();
    let response = harness.request("buy", json!({"card": 0}));
    assert_eq!(response["error"]["data"]["name"], "STATE_INVALID_STATE");
    assert_eq!(response["error"]["code"], -32002);
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("SHOP"))
    );
}

#[test]
fn full_run_reaches_the_shop_and_buys_a_joker() {
    let mut harness = harness();
    harness.enter_shop();

    // Two mutually exclusive fields: immediate semantic error, no effect.
    let response = harness.request("buy", json!({"card": 0, "voucher": 0}));
    assert_eq!(response["error"]["data"]["name"], "SCHEMA_INVALID_VALUE");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("Cannot provide more than one"))
    );

    let before = harness.request("gamestate", json!({}));
    let money_before = before["result"]["money"].as_i64().expect("money");
    let cost = before["result"]["shop"]["cards"][0]["cost"]
        .as_i64()
        .expect("cost");

    let response = harness.request("buy", json!({"card": 0}));
    assert_eq!(response["result"]["jokers"]["cards"][0]["set"], "JOKER");
    assert_eq!(
        response["result"]["money"].as_i64().expect("money after"),
        money_before - cost
    );
}

#[test]
fn deferred_command_responds_only_after_settlement() {
    let mut harness = harness();
    let response = harness.request(
        "start",
        json!({"deck": "RED", "stake": "WHITE", "seed": "TEST123"}),
    );
    assert_eq!(response["result"]["state"], "BLIND_SELECT");

    harness.send("select", json!({}));
    // One pump dispatches the request; the action has not settled yet.
    harness.pump(1);
    assert!(
        harness.try_read_line().is_none(),
        "no response before the action settles"
    );
    assert_eq!(harness.server.pending_completions(), 1);

    let response = harness.read_response();
    assert_eq!(response["result"]["state"], "SELECTING_HAND");
    assert_eq!(harness.server.pending_completions(), 0);

    // Exactly one response: nothing further arrives.
    harness.pump(5);
    assert!(harness.try_read_line().is_none());
}

#[test]
fn schema_violations_are_rejected_before_execution() {
    let mut harness = harness();
    // Schema is tier 2 and the state gate tier 3: the type error wins even
    // though the menu state would also have been rejected.
    let response = harness.request("play", json!({"cards": "INVALID_CARDS"}));
    assert_eq!(response["error"]["data"]["name"], "SCHEMA_INVALID_TYPE");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("'cards' must be an array"))
    );

    let response = harness.request("play", json!({}));
    assert_eq!(response["error"]["data"]["name"], "SCHEMA_MISSING_REQUIRED");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("Missing required field 'cards'"))
    );
}

#[test]
fn set_outside_a_run_is_not_allowed() {
    let mut harness = harness();
    let response = harness.request("set", json!({"money": 42}));
    assert_eq!(response["error"]["data"]["name"], "GAME_NOT_IN_RUN");
    assert_eq!(response["error"]["code"], -32003);
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("Can only set during an active run"))
    );
}

#[test]
fn oversized_frame_is_rejected_with_null_id() {
    let mut harness = harness();
    let mut frame = vec![b'{'];
    frame.resize(300, b' ');
    frame.push(b'\n');
    harness.send_raw(&frame);

    let response = harness.read_response();
    assert_eq!(response["error"]["data"]["name"], "BAD_REQUEST");
    assert_eq!(response["id"], Value::Null);
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("too large"))
    );
}

#[test]
fn pipelined_frames_are_rejected_not_processed() {
    let mut harness = harness();
    let burst = concat!(
        r#"{"jsonrpc":"2.0","method":"health","params":{},"id":1}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"health","params":{},"id":2}"#,
        "\n"
    );
    harness.send_raw(burst.as_bytes());

    let response = harness.read_response();
    assert_eq!(response["error"]["data"]["name"], "BAD_REQUEST");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("pipelined"))
    );

    // Neither request was processed: the connection is idle again.
    harness.pump(5);
    assert!(harness.try_read_line().is_none());
}

#[test]
fn non_object_line_is_rejected_before_parsing() {
    let mut harness = harness();
    harness.send_raw(b"not json at all\n");
    let response = harness.read_response();
    assert_eq!(response["error"]["data"]["name"], "BAD_REQUEST");
    assert_eq!(response["id"], Value::Null);
}

#[test]
fn missing_params_and_missing_method_are_distinct() {
    let mut harness = harness();

    harness.send_raw(b"{\"jsonrpc\":\"2.0\",\"method\":\"health\",\"id\":9}\n");
    let response = harness.read_response();
    assert_eq!(response["error"]["data"]["name"], "BAD_REQUEST");
    assert_eq!(response["id"], 9);
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("params"))
    );

    harness.send_raw(b"{\"jsonrpc\":\"2.0\",\"params\":{},\"id\":10}\n");
    let response = harness.read_response();
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("method"))
    );
}

#[test]
fn skip_then_boss_refusal() {
    let mut harness = harness();
    let response = harness.request(
        "start",
        json!({"deck": "RED", "stake": "WHITE", "seed": "TEST123"}),
    );
    assert_eq!(response["result"]["state"], "BLIND_SELECT");

    let response = harness.request("skip", json!({}));
    assert_eq!(response["result"]["blinds"]["small"], "SKIPPED");

    let response = harness.request("skip", json!({}));
    assert_eq!(response["result"]["blinds"]["big"], "SKIPPED");

    let response = harness.request("skip", json!({}));
    assert_eq!(response["error"]["data"]["name"], "GAME_INVALID_STATE");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("Cannot skip Boss blind"))
    );
}

#[test]
fn save_and_load_round_trip_over_the_wire() {
    let mut harness = harness();
    harness.enter_shop();

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir
        .path()
        .join("run.json")
        .to_str()
        .expect("utf8 path")
        .to_owned();

    let saved = harness.request("save", json!({"path": path}));
    assert_eq!(saved["result"]["state"], "SHOP");

    // Wreck the run, then restore it.
    let response = harness.request("menu", json!({}));
    assert_eq!(response["result"]["state"], "MENU");

    let restored = harness.request("load", json!({"path": path}));
    assert_eq!(restored["result"]["state"], "SHOP");
    assert_eq!(restored["result"]["seed"], "TEST123");
}

#[test]
fn buy_pack_and_pick_from_it() {
    let mut harness = harness();
    harness.enter_shop();

    let response = harness.request("buy", json!({"pack": 0}));
    assert!(response["result"]["pack"].is_object());
    assert_eq!(response["result"]["state"], "STANDARD_PACK");

    let before_hand = response["result"]["hand"]["cards"]
        .as_array()
        .map_or(0, Vec::len);

    let response = harness.request("pack_select", json!({"card": 0}));
    assert_eq!(response["result"]["state"], "SHOP");
    assert!(response["result"]["pack"].is_null());
    let after_hand = response["result"]["hand"]["cards"]
        .as_array()
        .map_or(0, Vec::len);
    assert_eq!(after_hand, before_hand + 1);
}

#[test]
fn add_spawns_into_the_right_area() {
    let mut harness = harness();
    harness.enter_shop();

    let response = harness.request("add", json!({"key": "j_joker"}));
    assert_eq!(
        response["result"]["jokers"]["cards"]
            .as_array()
            .map_or(0, Vec::len),
        1
    );

    let response = harness.request("add", json!({"key": "x_unknown"}));
    assert_eq!(response["error"]["data"]["name"], "SCHEMA_INVALID_VALUE");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("Unknown key 'x_unknown'"))
    );
}

#[test]
fn use_consumable_after_buying_one() {
    let mut harness = harness();
    harness.enter_shop();

    // Shop slot 1 holds a planet card in the simulated inventory.
    let response = harness.request("buy", json!({"card": 1}));
    assert_eq!(
        response["result"]["consumables"]["cards"][0]["set"],
        "PLANET"
    );

    let response = harness.request("use", json!({"consumable": 0}));
    assert_eq!(
        response["result"]["consumables"]["cards"]
            .as_array()
            .map_or(1, Vec::len),
        0
    );

    let response = harness.request("use", json!({"consumable": 5}));
    assert_eq!(response["error"]["data"]["name"], "SCHEMA_INVALID_VALUE");
    assert!(
        response["error"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("Invalid consumable index: 5"))
    );
}

#[test]
fn reroll_charges_and_restocks() {
    let mut harness = harness();
    harness.enter_shop();

    // Make sure the reroll is affordable regardless of shop prices.
    let response = harness.request("set", json!({"money": 50}));
    assert_eq!(response["result"]["money"], 50);

    let before = harness.request("gamestate", json!({}));
    let reroll_cost = before["result"]["shop"]["reroll_cost"]
        .as_i64()
        .expect("reroll cost");

    let response = harness.request("reroll", json!({}));
    assert_eq!(
        response["result"]["money"].as_i64().expect("money"),
        50 - reroll_cost
    );
}
