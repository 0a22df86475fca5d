mod support;

use std::thread;
use std::time::Duration;

use krpc_client::{build_call, encode, Client, ClientError, Event, Stream};
use support::StubServer;

fn connect(server: &StubServer) -> Client {
    Client::connect(server.config()).expect("client should connect")
}

fn set_counter(client: &Client, value: i32) {
    client
        .invoke(&build_call("TestService", "SetCounter", [encode(&value)]))
        .expect("SetCounter should succeed");
}

fn counter_call() -> krpc_client::CallDescriptor {
    build_call("TestService", "Counter", Vec::<bytes::Bytes>::new())
}

#[test]
fn stream_observes_ten_then_twenty() {
    let server = StubServer::start();
    let client = connect(&server);

    set_counter(&client, 10);
    let counter: Stream<i32> = client.add_stream(&counter_call()).expect("stream should register");
    assert_eq!(counter.get().expect("first value"), 10);

    let version = counter.version().unwrap();
    set_counter(&client, 20);
    while counter.version().unwrap() == version {
        assert!(counter.wait_timeout(Duration::from_secs(5)).unwrap());
    }
    assert_eq!(counter.get().unwrap(), 20);
}

#[test]
fn first_update_racing_registration_is_kept() {
    // The stub pushes the first value before answering AddStream.
    let server = StubServer::start();
    let client = connect(&server);

    set_counter(&client, 42);
    let counter: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    assert_eq!(counter.get().unwrap(), 42);
}

#[test]
fn get_returns_latest_after_many_updates() {
    let server = StubServer::start();
    let client = connect(&server);
    let counter: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    counter.get().unwrap();

    for n in 1..=25 {
        set_counter(&client, n);
    }
    // Updates are pushed before each SetCounter response, so the last one is
    // already on the wire.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while counter.get().unwrap() != 25 {
        assert!(std::time::Instant::now() < deadline, "stream never caught up");
        counter.wait_timeout(Duration::from_millis(100)).unwrap();
    }
}

#[test]
fn dormant_stream_starts_on_get() {
    let server = StubServer::start();
    let client = connect(&server);
    set_counter(&client, 3);

    let counter: Stream<i32> = Stream::dormant(&client, &counter_call()).unwrap();
    assert!(!counter.is_started().unwrap());
    assert_eq!(counter.try_get().unwrap(), None);

    assert_eq!(counter.get().unwrap(), 3);
    assert!(counter.is_started().unwrap());
}

#[test]
fn same_call_yields_equal_streams() {
    let server = StubServer::start();
    let client = connect(&server);

    let a: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    let b: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    assert_eq!(a, b);
    assert_eq!(client.stream_count(), 1);

    let other: Stream<i32> = client
        .add_stream(&build_call("TestService", "Double", [encode(&1i32)]))
        .unwrap();
    assert_ne!(a, other);
}

#[test]
fn removed_stream_is_not_found() {
    let server = StubServer::start();
    let client = connect(&server);

    let counter: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    let id = counter.id();
    let other_handle = counter.clone();
    counter.remove().expect("remove should succeed");

    assert!(!server.has_stream(id));
    assert!(matches!(
        other_handle.get(),
        Err(ClientError::StreamNotFound(found)) if found == id
    ));
}

#[test]
fn stream_rate_is_recorded() {
    let server = StubServer::start();
    let client = connect(&server);

    let counter: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    assert_eq!(counter.rate().unwrap(), 0.0);
    counter.set_rate(5.0).expect("set_rate should succeed");
    assert_eq!(counter.rate().unwrap(), 5.0);
    assert_eq!(server.stream_rate(counter.id()), Some(5.0));
}

#[test]
fn stream_errors_surface_on_get() {
    let server = StubServer::start();
    let client = connect(&server);

    set_counter(&client, -1);
    let guarded: Stream<i32> = client
        .add_stream(&build_call(
            "TestService",
            "FailWhenCounterNegative",
            Vec::<bytes::Bytes>::new(),
        ))
        .unwrap();
    let err = guarded.get().expect_err("cached error should surface");
    assert_eq!(err.remote_tag(), Some(("TestService", "CustomError")));

    let version = guarded.version().unwrap();
    set_counter(&client, 4);
    while guarded.version().unwrap() == version {
        guarded.wait_timeout(Duration::from_secs(5)).unwrap();
    }
    assert_eq!(guarded.get().unwrap(), 4);
}

#[test]
fn freeze_gives_a_consistent_snapshot() {
    let server = StubServer::start();
    let client = connect(&server);

    let plain: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    let tripled: Stream<i32> = client
        .add_stream(&build_call("TestService", "CounterTimes", [encode(&3i32)]))
        .unwrap();
    plain.get().unwrap();
    tripled.get().unwrap();

    let writer = {
        let client = client.clone();
        thread::spawn(move || {
            for n in 0..200 {
                set_counter(&client, n);
            }
        })
    };

    for _ in 0..50 {
        let _frozen = client.freeze_streams().unwrap();
        let a = plain.try_get().unwrap().unwrap();
        let b = tripled.try_get().unwrap().unwrap();
        assert_eq!(a * 3, b);
    }
    writer.join().unwrap();
}

#[test]
fn event_fires_when_flag_set() {
    let server = StubServer::start();
    let client = connect(&server);

    let event = client
        .add_event(&build_call("TestService", "AddEvent", Vec::<bytes::Bytes>::new()))
        .expect("event should register");
    assert!(!event.wait_timeout(Duration::from_millis(100)).unwrap());

    let setter = {
        let client = client.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            client
                .invoke(&build_call("TestService", "SetFlag", [encode(&true)]))
                .unwrap();
        })
    };
    event.wait().expect("event should fire");
    setter.join().unwrap();

    assert!(event.stream().get().unwrap());
}

#[test]
fn event_from_existing_bool_stream() {
    let server = StubServer::start();
    let client = connect(&server);

    let flag: Stream<bool> = client
        .add_stream(&build_call("TestService", "Flag", Vec::<bytes::Bytes>::new()))
        .unwrap();
    let event = Event::from(flag.clone());
    assert_eq!(event.stream(), &flag);

    client
        .invoke(&build_call("TestService", "SetFlag", [encode(&true)]))
        .unwrap();
    assert!(event.wait_timeout(Duration::from_secs(5)).unwrap());
}

#[test]
fn streams_unavailable_without_stream_channel() {
    let server = StubServer::start_without_streams();
    let client = Client::connect(server.config().without_streams()).unwrap();

    assert!(!client.has_streams());
    let err = client.add_stream::<i32>(&counter_call()).unwrap_err();
    assert!(matches!(err, ClientError::StreamsUnavailable));

    let doubled: i32 = client
        .call(&build_call("TestService", "Double", [encode(&21i32)]))
        .unwrap();
    assert_eq!(doubled, 42);
}

#[test]
fn add_stream_while_frozen_delivers_after_thaw() {
    let server = StubServer::start();
    let client = connect(&server);
    set_counter(&client, 4);

    let frozen = client.freeze_streams().unwrap();
    let counter: Stream<i32> = client
        .add_stream(&counter_call())
        .expect("registration should not wait for the freeze");
    assert_eq!(counter.try_get().unwrap(), None);
    drop(frozen);

    assert_eq!(counter.get().unwrap(), 4);
}

#[test]
fn client_waits_for_any_stream_update() {
    let server = StubServer::start();
    let client = connect(&server);
    let counter: Stream<i32> = client.add_stream(&counter_call()).unwrap();
    counter.get().unwrap();

    assert!(!client
        .wait_for_stream_update(Some(Duration::from_millis(50)))
        .unwrap());

    let setter = {
        let client = client.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            set_counter(&client, 9);
        })
    };
    assert!(client
        .wait_for_stream_update(Some(Duration::from_secs(5)))
        .unwrap());
    setter.join().unwrap();
    assert_eq!(counter.get().unwrap(), 9);
}
