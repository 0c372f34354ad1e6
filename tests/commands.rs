//! Broker command dispatch.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use common::{fixture, wait_for, Fixture, TestService, SRC_URL};
use runvisor::{
    Broker, ItemInfo, ItemKind, Manager, MemoryBroker, RegisterOptions, Registry, Runtime,
    ServeOptions, Server, ServerItem, Service, ServiceItem, ServiceOptions, Status,
    META_STATUS, TOPIC_REGISTRY_COMMAND,
};

async fn built_and_serving(fx: &Fixture, services: &[&Arc<TestService>]) -> Arc<Manager> {
    for svc in services {
        fx.source
            .register(ServiceItem::item((*svc).clone()), RegisterOptions::new())
            .await
            .unwrap();
    }
    let manager = Manager::builder(fx.shared.clone(), SRC_URL, Runtime::new("main"))
        .with_registry_opener(fx.registries.clone())
        .with_server_opener(fx.servers.clone())
        .build()
        .await;
    manager.init(CancellationToken::new()).await.unwrap();
    manager.serve_all(ServeOptions::new());
    manager
}

async fn send(
    broker: &Arc<MemoryBroker>,
    command: &str,
    item: &str,
) -> Result<(), runvisor::BrokerError> {
    broker
        .publish(
            TOPIC_REGISTRY_COMMAND,
            HashMap::from([
                ("command".to_string(), command.to_string()),
                ("itemName".to_string(), item.to_string()),
            ]),
        )
        .await
}

#[tokio::test]
async fn restart_is_stop_then_start_and_idempotent_on_readiness() {
    let fx = fixture();
    let a = TestService::new("a", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&a]).await;
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    send(&broker, "restart", "a").await.unwrap();

    assert_eq!(a.stops(), 1);
    assert_eq!(a.starts(), 2);
    assert!(a.is(Status::Ready));
    // The server never rebooted for a plain service restart.
    assert_eq!(srv.serve_count(), 1);
}

#[tokio::test]
async fn restart_aborts_when_stop_fails() {
    let fx = fixture();
    let a = TestService::new("a", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&a]).await;
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    a.set_fail_stop(true);
    let err = send(&broker, "restart", "a").await.unwrap_err();
    assert!(err.to_string().contains("stop rigged to fail"));
    assert_eq!(a.starts(), 1);
}

#[tokio::test]
async fn unknown_item_is_acknowledged_silently() {
    let fx = fixture();
    let manager = built_and_serving(&fx, &[]).await;
    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    assert!(send(&broker, "start", "ghost").await.is_ok());
}

#[tokio::test]
async fn unsupported_command_errors_back_to_broker() {
    let fx = fixture();
    let a = TestService::new("a", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&a]).await;
    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    let err = send(&broker, "pause", "a").await.unwrap_err();
    assert!(err.to_string().contains("unsupported command pause"));
}

#[tokio::test]
async fn projection_result_falls_back_to_local_handle() {
    let fx = fixture();
    let a = TestService::new("a", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&a]).await;
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);

    // Shadow the live item with a bare projection carrying the same id:
    // resolution must swap the in-memory handle back in.
    fx.shared
        .register(
            ItemInfo::new(ItemKind::Service, "a")
                .with_id(a.id())
                .with_metadata(META_STATUS, Status::Ready.to_string())
                .item(),
            RegisterOptions::new(),
        )
        .await
        .unwrap();

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    send(&broker, "stop", "a").await.unwrap();
    assert_eq!(a.stops(), 1);
    assert!(a.is(Status::Stopped));
}

#[tokio::test]
async fn server_commands_stop_and_restart_the_server() {
    let fx = fixture();
    let a = TestService::new("a", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&a]).await;
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);

    fx.shared
        .register(ServerItem::item(srv.clone()), RegisterOptions::new())
        .await
        .unwrap();

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    send(&broker, "stop", "server-g").await.unwrap();
    assert!(srv.is(Status::Stopped));
    assert!(a.is(Status::Stopped));

    send(&broker, "start", "server-g").await.unwrap();
    assert!(srv.is(Status::Ready));
    assert_eq!(srv.serve_count(), 2);
    assert_eq!(a.starts(), 2);

    send(&broker, "restart", "server-g").await.unwrap();
    assert!(srv.is(Status::Ready));
    assert_eq!(srv.serve_count(), 3);
    assert_eq!(a.stops(), 2);
}

#[tokio::test]
async fn new_service_on_running_server_forces_reboot_when_needed() {
    let fx = fixture();
    let x = TestService::new("x", "g", ServiceOptions::new());
    let y = TestService::new("y", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&x, &y]).await;
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);

    // A new service lands on the running server and demands a reboot.
    let z = TestService::new("z", "g", ServiceOptions::new());
    z.bind_server(srv.clone());
    fx.shared
        .register(ServiceItem::item(z.clone()), RegisterOptions::new())
        .await
        .unwrap();
    srv.set_needs_restart(true);

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    send(&broker, "start", "z").await.unwrap();

    assert!(srv.is(Status::Ready));
    assert!(!srv.needs_restart());
    assert_eq!(srv.serve_count(), 2);
    assert!(x.is(Status::Ready) && y.is(Status::Ready) && z.is(Status::Ready));
    assert_eq!(x.starts(), 2);
    assert_eq!(y.starts(), 2);
    assert_eq!(z.starts(), 1);
}

#[tokio::test]
async fn attach_to_running_server_without_reboot() {
    let fx = fixture();
    let x = TestService::new("x", "g", ServiceOptions::new());
    let manager = built_and_serving(&fx, &[&x]).await;
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);

    let w = TestService::new("w", "g", ServiceOptions::new());
    w.bind_server(srv.clone());
    fx.shared
        .register(ServiceItem::item(w.clone()), RegisterOptions::new())
        .await
        .unwrap();

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    send(&broker, "start", "w").await.unwrap();

    assert!(w.is(Status::Ready));
    assert_eq!(srv.serve_count(), 1);
    assert_eq!(x.starts(), 1);
}

#[tokio::test]
async fn unattached_service_command_errors() {
    let fx = fixture();
    let manager = built_and_serving(&fx, &[]).await;

    let loose = TestService::new("loose", "g", ServiceOptions::new());
    fx.shared
        .register(ServiceItem::item(loose.clone()), RegisterOptions::new())
        .await
        .unwrap();

    let broker = MemoryBroker::new();
    manager
        .watch_broker(CancellationToken::new(), broker.clone())
        .await
        .unwrap();

    let err = send(&broker, "start", "loose").await.unwrap_err();
    assert!(err.to_string().contains("not attached"));
}
