//! Behavioural tests for event dispatch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use super::support::{Harness, reaches, settle};
use crate::client::Client;
use crate::envelope::{Envelope, event_type};

struct DispatchWorld {
    harness: Harness,
    counts: HashMap<String, Arc<AtomicUsize>>,
    senders: Arc<Mutex<Vec<String>>>,
}

impl DispatchWorld {
    fn new() -> Self {
        Self {
            harness: Harness::new(),
            counts: HashMap::new(),
            senders: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn watch(&mut self, slot: &str) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let senders = Arc::clone(&self.senders);
        self.harness
            .client
            .register_handler(slot, move |_: &Client, envelope: &mut Envelope| {
                senders.lock().expect("senders lock").push(envelope.path.clone());
                seen.fetch_add(1, Ordering::SeqCst);
            });
        self.counts.insert(slot.to_owned(), count);
    }

    fn count(&self, slot: &str) -> Arc<AtomicUsize> {
        let tag = match slot {
            "error" => event_type::ERROR,
            other => other,
        };
        self.counts
            .get(tag)
            .cloned()
            .unwrap_or_else(|| panic!("no handler watched for {tag}"))
    }
}

#[fixture]
fn world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::new())
}

#[given("a client registered with the master")]
fn given_registered_client(world: &RefCell<DispatchWorld>) {
    let mut world = world.borrow_mut();
    world.watch(event_type::ERROR);
    world.harness.start();
    assert!(
        world.harness.master.wait_for(event_type::CLIENT_ADD, 1),
        "master never saw the registration"
    );
}

#[given("a handler for {tag}")]
fn given_handler(world: &RefCell<DispatchWorld>, tag: String) {
    world.borrow_mut().watch(&tag);
}

#[when("the master sends a ping")]
fn when_master_pings(world: &RefCell<DispatchWorld>) {
    let world = world.borrow();
    world.harness.deliver(&world.harness.from_master(event_type::PING));
}

#[when("the master sends an envelope of type {tag}")]
fn when_master_sends(world: &RefCell<DispatchWorld>, tag: String) {
    let world = world.borrow();
    world.harness.deliver(&world.harness.from_master(&tag));
}

#[when("the master relays a {inner} notification")]
fn when_master_relays(world: &RefCell<DispatchWorld>, inner: String) {
    let world = world.borrow();
    let notification = json!({"event_id": 1, "event_type": inner}).to_string();
    let relay = Envelope::with_payload(
        world.harness.master.path().as_str(),
        event_type::TRACIM_EVENT,
        &notification,
    )
    .expect("relay envelope");
    world.harness.deliver(&relay);
}

#[when("a peer sends malformed bytes")]
fn when_peer_sends_garbage(world: &RefCell<DispatchWorld>) {
    world.borrow().harness.deliver_raw(b"{\"type\": ");
}

#[then("the master receives {count} pong")]
fn then_master_receives_pongs(world: &RefCell<DispatchWorld>, count: usize) {
    let world = world.borrow();
    assert!(world.harness.master.wait_for(event_type::PONG, count));
    settle();
    assert_eq!(world.harness.master.received_of(event_type::PONG).len(), count);
}

#[then("the {slot} handler ran {count} time")]
fn then_handler_ran(world: &RefCell<DispatchWorld>, slot: String, count: usize) {
    let calls = world.borrow().count(&slot);
    assert!(reaches(&calls, count), "{slot} handler never reached {count}");
    settle();
    assert_eq!(calls.load(Ordering::SeqCst), count);
}

#[then("every handled envelope came from the master")]
fn then_all_from_master(world: &RefCell<DispatchWorld>) {
    let world = world.borrow();
    let master = world.harness.master.path().as_str().to_owned();
    let senders = world.senders.lock().expect("senders lock");
    assert!(!senders.is_empty());
    assert!(senders.iter().all(|path| *path == master), "senders: {senders:?}");
}

#[scenario(path = "tests/features/client_dispatch.feature", index = 0)]
fn ping_is_answered(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/client_dispatch.feature", index = 1)]
fn handlers_see_their_own_type(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/client_dispatch.feature", index = 2)]
fn relays_reach_inner_handlers(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}

#[scenario(path = "tests/features/client_dispatch.feature", index = 3)]
fn malformed_messages_are_survivable(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}
