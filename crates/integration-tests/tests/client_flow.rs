//! The client state layer against a live server on a loopback port.

use std::net::SocketAddr;

use actix_web::{App, HttpServer};
use integration_tests::{png_upload, TestEnv, TEST_PASSWORD};
use ut_api::configure_routes;
use ut_client::{ClientError, Session};
use ut_core::services::{NewItem, ProfilePatch, RegisterInput};

fn serve(env: &TestEnv) -> SocketAddr {
    let state = env.state.clone();
    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(configure_routes))
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind loopback");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    addr
}

fn signup(username: &str, mobile: &str, college: &str) -> RegisterInput {
    RegisterInput {
        username: Some(username.to_string()),
        name: Some(username.to_uppercase()),
        email: Some(format!("{username}@campus.test")),
        password: Some(TEST_PASSWORD.to_string()),
        mobile: Some(mobile.to_string()),
        role: None,
        permanent_college: Some(college.to_string()),
    }
}

fn textbook(title: &str) -> NewItem {
    NewItem {
        title: Some(title.to_string()),
        category: Some("books".to_string()),
        listing_type: Some("sell".to_string()),
        price: Some("275".to_string()),
        ..NewItem::default()
    }
}

#[actix_web::test]
async fn seller_and_buyer_sessions() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let base = format!("http://{}", serve(&env));

    let mut seller = Session::connect(&base).unwrap();
    assert!(seller.auth.is_booting());
    assert!(seller.auth.check(&seller.api).await.is_none());
    assert!(!seller.auth.is_booting());

    let profile = seller
        .auth
        .register(&seller.api, &signup("ravi", "9111111111", &college.id.to_string()))
        .await
        .unwrap();
    assert_eq!(profile.user.username, "ravi");
    assert!(seller.auth.check(&seller.api).await.is_some());

    let colleges = seller.colleges.ensure_loaded(&seller.api).await.unwrap();
    assert_eq!(colleges.len(), 1);
    assert!(seller.colleges.find(college.id).is_some());

    let too_many = (0..6).map(png_upload).collect();
    let err = seller
        .items
        .create(&seller.api, textbook("Too many photos"), too_many)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Rejected(_)));
    assert!(seller.items.mine().is_empty());

    let listed = seller
        .items
        .create(&seller.api, textbook("Control Systems"), vec![png_upload(1)])
        .await
        .unwrap();
    assert_eq!(listed.item.image_urls.len(), 1);
    assert_eq!(seller.items.mine().len(), 1);

    let mut buyer = Session::connect(&base).unwrap();
    buyer
        .auth
        .register(&buyer.api, &signup("asha", "9222222222", &college.id.to_string()))
        .await
        .unwrap();

    let feed = buyer
        .items
        .fetch_college_feed(&buyer.api, college.id, 1, 20)
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(buyer.items.feed_meta().total, 1);
    assert!(buyer.items.feed_status().is_loaded());

    let detail = buyer.items.fetch_item(&buyer.api, listed.item.id).await.unwrap();
    assert_eq!(detail.item.views, 1);
    assert!(detail.seller.as_ref().and_then(|s| s.mobile.as_deref()).is_some());

    let wishlist = buyer.wishlist.add(&buyer.api, listed.item.id).await.unwrap();
    assert_eq!(wishlist.items.len(), 1);
    assert!(buyer.wishlist.contains(listed.item.id));
    assert!(buyer.wishlist.check(&buyer.api, listed.item.id).await.unwrap());
    assert_eq!(buyer.wishlist.count(&buyer.api).await.unwrap(), 1);

    let err = buyer.wishlist.add(&buyer.api, listed.item.id).await.unwrap_err();
    assert_eq!(err.status().map(|s| s.as_u16()), Some(409));

    // Hiding the listing removes it from the buyer's next feed.
    assert!(!seller
        .items
        .toggle_active(&seller.api, listed.item.id, false)
        .await
        .unwrap());
    let feed = buyer
        .items
        .fetch_college_feed(&buyer.api, college.id, 1, 20)
        .await
        .unwrap();
    assert!(feed.is_empty());

    buyer.wishlist.clear(&buyer.api).await.unwrap();
    assert!(buyer.wishlist.is_empty());
}

#[actix_web::test]
async fn logout_then_failed_login_keeps_the_error() {
    let env = TestEnv::new().await;
    let iitb = env.college("IITB").await;
    let iitd = env.college("IITD").await;
    let base = format!("http://{}", serve(&env));

    let mut session = Session::connect(&base).unwrap();
    session
        .auth
        .register(&session.api, &signup("meera", "9333333333", &iitb.id.to_string()))
        .await
        .unwrap();

    let patch = ProfilePatch {
        current_college: Some(iitd.id.to_string()),
        ..ProfilePatch::default()
    };
    let updated = session
        .auth
        .update_profile(&session.api, patch, Some(png_upload(42)))
        .await
        .unwrap();
    assert_eq!(updated.current_college.as_ref().map(|c| c.code.as_str()), Some("IITD"));
    assert!(updated.user.avatar_url.is_some());

    session.auth.logout(&session.api).await.unwrap();
    session.reset_user_state();
    assert!(!session.auth.is_authenticated());
    assert!(session.auth.check(&session.api).await.is_none());

    let err = session
        .auth
        .login(&session.api, "meera@campus.test", "wrong-password")
        .await
        .unwrap_err();
    assert!(err.is_unauthorized());
    assert!(session.auth.status().error().is_some());
    session.auth.clear_error();
    assert!(session.auth.status().error().is_none());

    let user = session
        .auth
        .login(&session.api, "meera@campus.test", TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(user.user.email, "meera@campus.test");

    assert_eq!(session.wishlist.count(&session.api).await.unwrap(), 0);
}
