//! Sign-in, restore and credential expiry against the mock API.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use bazaar_integration_tests::{
    MockApi, OTHER_SHOPPER_EMAIL, OTHER_SHOPPER_PASSWORD, SHOPPER_EMAIL, SHOPPER_ID,
    SHOPPER_PASSWORD, secret, sign_in,
};
use bazaar_core::{BearerToken, Email, ProductId};
use bazaar_core::NotificationSeverity;
use bazaar_storefront::models::{NewNotification, SignUp};
use bazaar_storefront::{
    ClientError, CredentialStore, MemoryCredentialStore, Redirect, SessionState,
};

#[tokio::test]
async fn test_restore_without_credential_is_anonymous() {
    let api = MockApi::start().await;
    let shop = api.client();

    assert!(shop.session().is_loading());
    assert_eq!(shop.session().restore().await, SessionState::Anonymous);
    assert_eq!(api.hits(bazaar_integration_tests::Method::GET, "/user/profile"), 0);
}

#[tokio::test]
async fn test_sign_in_persists_credential_and_restores_after_restart() {
    let api = MockApi::start().await;
    let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());

    let shop = api.client_with(Arc::clone(&credentials));
    let identity = shop
        .session()
        .sign_in(SHOPPER_EMAIL, &secret(SHOPPER_PASSWORD))
        .await
        .unwrap();
    assert_eq!(identity.id.as_str(), SHOPPER_ID);
    assert!(shop.session().is_authenticated());
    assert!(credentials.load().unwrap().is_some());

    let restarted = api.client_with(credentials);
    let state = restarted.session().restore().await;
    assert_eq!(state.user_id().map(|id| id.as_str()), Some(SHOPPER_ID));
}

#[tokio::test]
async fn test_wrong_password_keeps_state() {
    let api = MockApi::start().await;
    let shop = api.client();
    shop.session().restore().await;

    let err = shop
        .session()
        .sign_in(SHOPPER_EMAIL, &secret("wrong"))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid email or password");
    assert_eq!(shop.session().state(), SessionState::Anonymous);
    assert!(!shop.api().has_credential());
}

#[tokio::test]
async fn test_restore_with_revoked_token_signs_out() {
    let api = MockApi::start().await;
    let credentials = Arc::new(MemoryCredentialStore::with_token(BearerToken::new("revoked")));
    let shop = api.client_with(credentials.clone());

    assert_eq!(shop.session().restore().await, SessionState::Anonymous);
    assert!(credentials.load().unwrap().is_none());
}

#[tokio::test]
async fn test_expired_token_drops_session_and_redirects() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    let mut redirects = shop.api().subscribe_redirects();

    api.expire_tokens();
    let err = shop.cart().refresh().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(shop.session().state(), SessionState::Anonymous);
    assert!(!shop.api().has_credential());
    let redirect = tokio::time::timeout(Duration::from_secs(1), redirects.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(redirect, Redirect::SignIn);
}

#[tokio::test]
async fn test_sign_up_signs_in_by_default() {
    let api = MockApi::start().await;
    let shop = api.client();
    shop.session().restore().await;

    let request = SignUp {
        email: Email::parse("zeynep@example.com").unwrap(),
        password: secret("new-password"),
        full_name: "Zeynep Kaya".to_string(),
        phone: None,
    };
    let identity = shop.session().sign_up(&request).await.unwrap().unwrap();

    assert_eq!(identity.full_name, "Zeynep Kaya");
    assert!(shop.session().is_authenticated());

    let duplicate = shop.session().sign_up(&request).await.unwrap_err();
    assert_eq!(duplicate.status(), Some(409));
}

#[tokio::test]
async fn test_sign_out_empties_every_container() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;

    shop.cart().add_to_cart(&ProductId::new("p-1"), 1).await.unwrap();
    shop.wishlist().add_to_wishlist(&ProductId::new("p-2")).await.unwrap();
    shop.notifications().fetch_notifications().await.unwrap();
    assert!(!shop.cart().is_empty());
    assert_eq!(shop.wishlist().total_items(), 1);
    assert_eq!(shop.notifications().notifications().len(), 5);

    shop.session().sign_out();

    assert!(shop.cart().is_empty());
    assert_eq!(shop.wishlist().total_items(), 0);
    assert!(shop.notifications().notifications().is_empty());
    assert!(matches!(
        shop.cart().add_to_cart(&ProductId::new("p-1"), 1).await,
        Err(ClientError::NotAuthenticated(_))
    ));
}

#[tokio::test]
async fn test_switching_user_never_shows_previous_cart() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    shop.cart().add_to_cart(&ProductId::new("p-3"), 2).await.unwrap();
    assert_eq!(shop.cart().total_items(), 2);

    shop.session().sign_out();
    sign_in(&shop, OTHER_SHOPPER_EMAIL, OTHER_SHOPPER_PASSWORD).await;

    assert!(shop.cart().is_empty());
    shop.cart().refresh().await.unwrap();
    assert!(shop.cart().is_empty());
}

#[tokio::test]
async fn test_session_sync_loads_containers_after_sign_in() {
    let api = MockApi::start().await;
    api.seed_cart(SHOPPER_ID, "p-1", 3);
    let shop = api.client();
    shop.session().restore().await;
    let tasks = shop.start_session_sync();

    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;

    let loaded = tokio::time::timeout(Duration::from_secs(2), async {
        while shop.cart().total_items() != 3 || shop.notifications().unread_count() != 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(loaded.is_ok(), "containers were not synced after sign-in");

    for task in tasks {
        task.abort();
    }
}

#[tokio::test]
async fn test_signing_back_in_as_same_user_starts_empty() {
    let api = MockApi::start().await;
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    shop.cart().add_to_cart(&ProductId::new("p-1"), 2).await.unwrap();
    shop.wishlist().add_to_wishlist(&ProductId::new("p-2")).await.unwrap();
    shop.notifications().add_notification(NewNotification::new(
        NotificationSeverity::Info,
        "Saved",
        "Added to your wishlist.",
    ));

    // No reads in between: the containers only see the second sign-in.
    shop.session().sign_out();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;

    assert!(shop.cart().is_empty());
    assert_eq!(shop.wishlist().total_items(), 0);
    assert!(shop.notifications().notifications().is_empty());

    shop.cart().refresh().await.unwrap();
    assert_eq!(shop.cart().total_items(), 2);
}

#[tokio::test]
async fn test_session_sync_reloads_after_same_user_signs_back_in() {
    let api = MockApi::start().await;
    api.seed_cart(SHOPPER_ID, "p-1", 3);
    let shop = api.client();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    let tasks = shop.start_session_sync();
    let cart_loaded = |shop: bazaar_storefront::AppState| async move {
        tokio::time::timeout(Duration::from_secs(2), async {
            while shop.cart().total_items() != 3 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    };
    assert!(cart_loaded(shop.clone()).await);

    shop.session().sign_out();
    sign_in(&shop, SHOPPER_EMAIL, SHOPPER_PASSWORD).await;
    let reloaded = cart_loaded(shop.clone()).await;

    for task in tasks {
        task.abort();
    }
    assert!(reloaded, "cart was not reloaded after signing back in");
}
