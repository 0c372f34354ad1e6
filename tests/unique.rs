//! Fleet-wide uniqueness arbitration.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use common::{fixture, wait_for, Fixture, TestService, SRC_URL};
use runvisor::{
    ItemInfo, ItemKind, Manager, ManagerConfig, RegisterOptions, Registry, Runtime, ServeOptions,
    Server, Service, ServiceItem, ServiceOptions, Status, META_STATUS,
};

fn fast_config() -> ManagerConfig {
    let mut cfg = ManagerConfig::default();
    cfg.unique_debounce = Duration::from_millis(50);
    cfg
}

async fn built_with_incumbent(fx: &Fixture, svc: &Arc<TestService>) -> Arc<Manager> {
    // A sibling process already runs an instance by this name.
    fx.shared
        .register(
            ItemInfo::new(ItemKind::Service, svc.name())
                .with_id("incumbent")
                .with_metadata(META_STATUS, Status::Ready.to_string())
                .item(),
            RegisterOptions::new(),
        )
        .await
        .unwrap();

    fx.source
        .register(ServiceItem::item(svc.clone()), RegisterOptions::new())
        .await
        .unwrap();

    let manager = Manager::builder(fx.shared.clone(), SRC_URL, Runtime::new("main"))
        .with_config(fast_config())
        .with_registry_opener(fx.registries.clone())
        .with_server_opener(fx.servers.clone())
        .build()
        .await;
    manager.init(CancellationToken::new()).await.unwrap();
    manager
}

#[tokio::test]
async fn losing_candidate_defers_start() {
    let fx = fixture();
    let d = TestService::new("d", "g", ServiceOptions::new().with_unique(true));
    let manager = built_with_incumbent(&fx, &d).await;

    manager.serve_all(ServeOptions::new());

    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);
    // The server came up without the unique service's hooks.
    assert_eq!(d.starts(), 0);
    assert!(d.is(Status::Stopped));
}

#[tokio::test]
async fn arbiter_takes_over_when_incumbent_vanishes() {
    let fx = fixture();
    let d = TestService::new("d", "g", ServiceOptions::new().with_unique(true));
    let manager = built_with_incumbent(&fx, &d).await;

    manager.serve_all(ServeOptions::new());
    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);
    // Let the arbiter's registry watch come up.
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Address the incumbent by its id; the candidate's own registration
    // shares the name.
    fx.shared
        .deregister(
            ItemInfo::new(ItemKind::Service, "d").with_id("incumbent").item(),
            RegisterOptions::new(),
        )
        .await
        .unwrap();

    assert!(wait_for(|| d.starts() == 1 && d.is(Status::Ready)).await);
    // The server itself never rebooted for the takeover.
    assert_eq!(srv.serve_count(), 1);
}

#[tokio::test]
async fn unique_without_incumbent_starts_normally() {
    let fx = fixture();
    let d = TestService::new("d", "g", ServiceOptions::new().with_unique(true));
    fx.source
        .register(ServiceItem::item(d.clone()), RegisterOptions::new())
        .await
        .unwrap();

    let manager = Manager::builder(fx.shared.clone(), SRC_URL, Runtime::new("main"))
        .with_config(fast_config())
        .with_registry_opener(fx.registries.clone())
        .with_server_opener(fx.servers.clone())
        .build()
        .await;
    manager.init(CancellationToken::new()).await.unwrap();
    manager.serve_all(ServeOptions::new());

    let srv = fx.servers.server("g").unwrap();
    assert!(wait_for(|| srv.is(Status::Ready)).await);
    assert_eq!(d.starts(), 1);
    assert!(d.is(Status::Ready));
}
