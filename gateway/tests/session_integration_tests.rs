//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! End-to-end session tests over in-memory streams

use mudhall_common::UserId;
use mudhall_gateway::{LoginPolicy, ServerContext, Session, SessionError, TelnetConnection};
use mudhall_server::WorldStore;
use mudhall_server::events::EventBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);
const WILL_ECHO: [u8; 3] = [255, 251, 1];
const WONT_ECHO: [u8; 3] = [255, 252, 1];
const DO_NAWS: [u8; 3] = [255, 253, 31];
const DO_TTYPE: [u8; 3] = [255, 253, 24];

/// Helper function to create a context with a fast login policy
fn create_test_context() -> ServerContext {
    let store = Arc::new(WorldStore::new(Arc::new(EventBus::default())).with_password_cost(4));
    store.bootstrap("Default").unwrap();
    let login = LoginPolicy {
        max_attempts: 3,
        retry_delay: Duration::from_millis(10),
    };
    ServerContext::new(store, login)
}

/// Client end of an in-memory connection
struct Client {
    stream: DuplexStream,
    seen: Vec<u8>,
}

impl Client {
    fn connect(context: &ServerContext) -> (Self, JoinHandle<Result<(), SessionError>>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let session = Session::new(context.clone(), TelnetConnection::new(server));
        let handle = tokio::spawn(session.run());
        (
            Self {
                stream: client,
                seen: Vec::new(),
            },
            handle,
        )
    }

    async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    /// Read until `needle` arrives, consuming everything up to and including it
    async fn expect(&mut self, needle: impl AsRef<[u8]>) {
        let needle = needle.as_ref();
        let found = timeout(WAIT, async {
            loop {
                if let Some(position) = find(&self.seen, needle) {
                    self.seen.drain(..position + needle.len());
                    return true;
                }
                let mut buffer = [0u8; 1024];
                let read = self.stream.read(&mut buffer).await.unwrap();
                if read == 0 {
                    return false;
                }
                self.seen.extend_from_slice(&buffer[..read]);
            }
        })
        .await;
        assert!(
            matches!(found, Ok(true)),
            "never saw {:?}; got {:?}",
            String::from_utf8_lossy(needle),
            String::from_utf8_lossy(&self.seen)
        );
    }

    /// Read until the server hangs up
    async fn expect_closed(&mut self) {
        let closed = timeout(WAIT, async {
            let mut buffer = [0u8; 1024];
            loop {
                match self.stream.read(&mut buffer).await {
                    Ok(0) | Err(_) => return,
                    Ok(read) => self.seen.extend_from_slice(&buffer[..read]),
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "connection stayed open");
    }

    /// Log in from the main menu and wait for the character menu
    async fn login(&mut self, name: &str, password: &str) {
        self.expect("> ").await;
        self.send("l").await;
        self.expect("Username: ").await;
        self.send(name).await;
        self.expect("Password: ").await;
        self.send(password).await;
        self.expect(format!("Welcome, {}!", name)).await;
        self.expect("> ").await;
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

async fn wait_until_offline(context: &ServerContext, user: UserId) {
    let offline = timeout(WAIT, async {
        while context.store().user(user).is_some_and(|u| u.online) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(offline.is_ok(), "user stayed online");
}

#[tokio::test]
async fn test_three_wrong_passwords_close_connection() {
    let context = create_test_context();
    let alice = context.store().create_user("Alice", "correct horse").unwrap();
    let (mut client, session) = Client::connect(&context);

    client.expect("> ").await;
    client.send("l").await;
    client.expect("Username: ").await;
    client.send("alice").await;
    for _ in 0..2 {
        client.expect("Password: ").await;
        client.send("wrong").await;
        client.expect("Invalid password").await;
    }
    client.expect("Password: ").await;
    client.send("still wrong").await;
    client.expect("Too many failed login attempts").await;
    client.expect_closed().await;

    let result = timeout(WAIT, session).await.unwrap().unwrap();
    assert!(matches!(result, Err(SessionError::TooManyAttempts(name)) if name == "Alice"));
    assert!(!context.store().user(alice.id).unwrap().online);
}

#[tokio::test]
async fn test_password_prompt_suppresses_echo() {
    let context = create_test_context();
    context.store().create_user("Alice", "correct horse").unwrap();
    let (mut client, _session) = Client::connect(&context);

    client.expect("> ").await;
    client.send("l").await;
    client.expect("Username: ").await;
    client.send("Alice").await;
    client.expect(WILL_ECHO).await;
    client.expect("Password: ").await;
    client.send("correct horse").await;
    client.expect(WONT_ECHO).await;
    client.expect("Welcome, Alice!").await;
}

#[tokio::test]
async fn test_registration_and_window_size() {
    let context = create_test_context();
    let (mut client, _session) = Client::connect(&context);

    client.expect("> ").await;
    client.send("n").await;
    client.expect("Desired username: ").await;
    client.send("bob").await;
    client.expect("Desired password: ").await;
    client.send("short").await;
    client.expect("Passwords must be at least 7 letters in length").await;
    client.expect("Desired password: ").await;
    client.send("long enough").await;
    client.expect("Confirm password: ").await;
    client.send("long enough").await;
    client.expect("Welcome, Bob!").await;
    client.expect(DO_NAWS).await;
    client.expect(DO_TTYPE).await;
    client.expect("> ").await;

    // Accept NAWS and report 100x40, then ask for a new character
    client.send_raw(&[255, 251, 31]).await;
    client.send_raw(&[255, 250, 31, 0, 100, 0, 40, 255, 240]).await;
    client.send("n").await;
    client.expect("Desired character name: ").await;

    let bob = context.store().user_by_name("Bob").unwrap();
    assert!(bob.online);
    assert_eq!(bob.window_size, (100, 40));
}

#[tokio::test]
async fn test_play_and_quit_to_character_menu() {
    let context = create_test_context();
    let alice = context.store().create_user("Alice", "correct horse").unwrap();
    let (mut client, _session) = Client::connect(&context);
    client.login("Alice", "correct horse").await;

    client.send("n").await;
    client.expect("Desired character name: ").await;
    client.send("hero").await;
    client.expect("The Void").await;
    client.expect("> ").await;

    let hero = context.store().character_by_name("Hero").unwrap();
    assert!(hero.online);
    assert!(context.presence().is_in_game(hero.id));

    client.send("/loc").await;
    client.expect("(0, 0, 0) Default - The Void").await;
    client.send("/quit").await;
    client.expect("[1] Hero").await;

    assert!(!context.store().character(hero.id).unwrap().online);
    assert!(!context.presence().is_in_game(hero.id));
    assert!(context.store().user(alice.id).unwrap().online);
}

#[tokio::test]
async fn test_tell_between_sessions() {
    let context = create_test_context();
    for name in ["Alice", "Bob"] {
        let user = context.store().create_user(name, "correct horse").unwrap();
        context.store().create_character(user.id, &format!("{}son", name)).unwrap();
    }
    let (mut alice, _a) = Client::connect(&context);
    let (mut bob, _b) = Client::connect(&context);
    alice.login("Alice", "correct horse").await;
    bob.login("Bob", "correct horse").await;

    alice.send("1").await;
    alice.expect("The Void").await;
    alice.expect("> ").await;
    bob.send("1").await;
    bob.expect("The Void").await;
    bob.expect("> ").await;
    alice.expect("Bobson has entered the game.").await;

    bob.send("/tell aliceson hello there").await;
    bob.expect("You tell Aliceson, \"hello there\"").await;
    alice.expect("Bobson tells you, \"hello there\"").await;

    alice.send("/r hi yourself").await;
    bob.expect("Aliceson tells you, \"hi yourself\"").await;
}

#[tokio::test]
async fn test_watch_mirrors_output() {
    let context = create_test_context();
    // The first user becomes the administrator
    context.store().create_user("Alice", "correct horse").unwrap();
    let bob_user = context.store().create_user("Bob", "correct horse").unwrap();

    let (mut bob, _b) = Client::connect(&context);
    bob.login("Bob", "correct horse").await;

    let (mut alice, _a) = Client::connect(&context);
    alice.login("Alice", "correct horse").await;
    alice.send("a").await;
    alice.expect("-=-=- Admin -=-=-").await;
    alice.expect("> ").await;
    alice.send("u").await;
    alice.expect("[2] Bob*").await;
    alice.expect("> ").await;
    alice.send("2").await;
    alice.expect("[w] Watch").await;
    alice.expect("> ").await;
    alice.send("w").await;
    alice.expect("Type anything to stop watching").await;

    let handle = context.presence().user(bob_user.id).unwrap();
    assert_eq!(handle.output.watcher_count(), 1);

    bob.send("n").await;
    bob.expect("Desired character name: ").await;
    alice.expect("Desired character name: ").await;

    alice.send("").await;
    alice.expect("Stopped watching").await;
    assert_eq!(handle.output.watcher_count(), 0);
}

#[tokio::test]
async fn test_disconnect_releases_user() {
    let context = create_test_context();
    let alice = context.store().create_user("Alice", "correct horse").unwrap();
    let (mut client, session) = Client::connect(&context);
    client.login("Alice", "correct horse").await;
    assert!(context.presence().user(alice.id).is_some());

    drop(client);
    wait_until_offline(&context, alice.id).await;
    assert!(context.presence().user(alice.id).is_none());
    assert!(timeout(WAIT, session).await.unwrap().unwrap().is_err());
}

#[tokio::test]
async fn test_second_login_is_refused() {
    let context = create_test_context();
    context.store().create_user("Alice", "correct horse").unwrap();
    let (mut first, _first) = Client::connect(&context);
    first.login("Alice", "correct horse").await;

    let (mut second, _second) = Client::connect(&context);
    second.expect("> ").await;
    second.send("l").await;
    second.expect("Username: ").await;
    second.send("Alice").await;
    second.expect("That user is already online").await;
}

#[tokio::test]
async fn test_user_deleted_during_password_prompt() {
    let context = create_test_context();
    let alice = context.store().create_user("Alice", "correct horse").unwrap();
    let (mut client, _session) = Client::connect(&context);

    client.expect("> ").await;
    client.send("l").await;
    client.expect("Username: ").await;
    client.send("Alice").await;
    client.expect("Password: ").await;
    context.store().delete_user(alice.id).unwrap();
    client.send("correct horse").await;
    client.expect(WONT_ECHO).await;
    client.expect("User not found").await;
    client.expect("Username: ").await;
}

/// Open the admin user menu and pick entry `index`
async fn open_user_entry(client: &mut Client, entry: &str, index: &str) {
    client.send("a").await;
    client.expect("-=-=- Admin -=-=-").await;
    client.expect("> ").await;
    client.send("u").await;
    client.expect(entry).await;
    client.expect("> ").await;
    client.send(index).await;
    client.expect("[w] Watch").await;
    client.expect("> ").await;
}

#[tokio::test]
async fn test_cannot_watch_self() {
    let context = create_test_context();
    context.store().create_user("Alice", "correct horse").unwrap();
    let (mut alice, _a) = Client::connect(&context);
    alice.login("Alice", "correct horse").await;

    open_user_entry(&mut alice, "[1] Alice*", "1").await;
    alice.send("w").await;
    alice.expect("You can't watch yourself!").await;
    alice.expect("[w] Watch").await;
}

#[tokio::test]
async fn test_in_game_disconnect_releases_character_and_ends_watch() {
    let context = create_test_context();
    context.store().create_user("Alice", "correct horse").unwrap();
    let bob_user = context.store().create_user("Bob", "correct horse").unwrap();
    let bobson = context.store().create_character(bob_user.id, "Bobson").unwrap();

    let (mut bob, bob_session) = Client::connect(&context);
    bob.login("Bob", "correct horse").await;
    bob.send("1").await;
    bob.expect("The Void").await;
    bob.expect("> ").await;
    assert!(context.presence().is_in_game(bobson.id));

    let (mut alice, _a) = Client::connect(&context);
    alice.login("Alice", "correct horse").await;
    open_user_entry(&mut alice, "[2] Bob*", "2").await;
    alice.send("w").await;
    alice.expect("Type anything to stop watching").await;

    drop(bob);
    alice.expect("Stopped watching").await;
    wait_until_offline(&context, bob_user.id).await;

    assert!(!context.store().character(bobson.id).unwrap().online);
    assert!(!context.presence().is_in_game(bobson.id));
    assert!(context.presence().user(bob_user.id).is_none());
    assert!(timeout(WAIT, bob_session).await.unwrap().unwrap().is_err());
}
