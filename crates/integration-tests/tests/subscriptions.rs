//! Subscribed queries refetch when a write touches their tags.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use roster_client::{ClientError, Mutation};
use roster_core::{AddressInput, UserInput};
use roster_integration_tests::FakeBackend;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

fn address_input(street: &str) -> AddressInput {
    AddressInput {
        region: "Крым".to_string(),
        city: "Ялта".to_string(),
        street: street.to_string(),
        house: "5".to_string(),
        apartment: None,
    }
}

fn user_input(first_name: &str) -> UserInput {
    UserInput {
        first_name: first_name.to_string(),
        last_name: None,
        middle_name: None,
        phone: None,
        email: None,
        birth_date: None,
        address_id: None,
    }
}

#[tokio::test]
async fn test_unassigned_list_refreshes_after_user_delete() {
    let backend = FakeBackend::spawn().await;
    let client = backend.client();
    let address = backend.seed_address(address_input("Ленина"));
    let mut input = user_input("Иван");
    input.address_id = Some(address.id);
    let user = backend.seed_user(input);

    let mut unassigned = client.watch_unassigned_addresses();
    assert!(unassigned.current().await.unwrap().is_empty());

    client.delete_user(user.id).await.unwrap();

    let refreshed = timeout(WAIT, unassigned.changed()).await.unwrap().unwrap();
    assert_eq!(
        refreshed.iter().map(|a| a.id).collect::<Vec<_>>(),
        vec![address.id]
    );
}

#[tokio::test]
async fn test_unrelated_write_does_not_wake_subscriber() {
    let backend = FakeBackend::spawn().await;
    let client = backend.client();
    let user = backend.seed_user(user_input("Иван"));
    let address = backend.seed_address(address_input("Ленина"));

    let mut watched = client.watch_user(user.id);
    watched.current().await.unwrap();

    let mut changed = address.to_input();
    changed.house = "9".to_string();
    client.update_address(address.id, &changed).await.unwrap();

    assert!(timeout(Duration::from_millis(200), watched.changed()).await.is_err());
    assert_eq!(backend.count("GET", &format!("/users/{}", user.id)), 1);
}

#[tokio::test]
async fn test_user_subscription_sees_update() {
    let backend = FakeBackend::spawn().await;
    let client = backend.client();
    let user = backend.seed_user(user_input("Иван"));

    let mut users = client.watch_users();
    users.current().await.unwrap();

    client.update_user(user.id, &user_input("Пётр")).await.unwrap();

    let refreshed = timeout(WAIT, users.changed()).await.unwrap().unwrap();
    assert_eq!(
        refreshed.first().map(|u| u.first_name.as_str()),
        Some("Пётр")
    );
}

#[tokio::test]
async fn test_invalidation_events_name_their_cause() {
    let backend = FakeBackend::spawn().await;
    let client = backend.client();
    let address = backend.seed_address(address_input("Ленина"));

    let mut events = client.invalidations();
    client.delete_address(address.id).await.unwrap();

    let event = timeout(WAIT, events.recv()).await.unwrap().unwrap();
    assert_eq!(event.cause, Some(Mutation::DeleteAddress(address.id)));
}

#[tokio::test]
async fn test_subscription_reports_refetch_failure() {
    let backend = FakeBackend::spawn().await;
    let client = backend.client();
    let user = backend.seed_user(user_input("Иван"));

    let mut users = client.watch_users();
    users.current().await.unwrap();

    client.delete_user(user.id).await.unwrap();
    backend.fail_next(axum::http::StatusCode::BAD_GATEWAY);

    let err: ClientError = timeout(WAIT, users.changed()).await.unwrap().unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(502));

    // The next read recovers.
    assert!(users.current().await.unwrap().is_empty());
}
