//! Create, read, update, hide and moderate a single listing.

use integration_tests::{png_upload, TestEnv};
use ut_core::error::AppError;
use ut_core::models::{ItemStatus, Pricing, RentUnit, Upload};
use ut_core::query::AdminItemQuery;
use ut_core::services::{ItemPatch, NewItem};

#[tokio::test]
async fn wrong_branch_price_is_ignored_on_update() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;
    let rental = env.rent_item(&seller, "Tent", 50.0, "day").await;

    let patch = ItemPatch {
        price: Some("999".into()),
        rent_unit: Some("week".into()),
        ..ItemPatch::default()
    };
    let updated = env
        .state
        .items
        .update(rental.item.id, patch, Vec::new(), &seller.actor())
        .await
        .unwrap();

    assert_eq!(
        updated.item.pricing,
        Pricing::Rent {
            rent_price: 50.0,
            rent_unit: RentUnit::Week,
            security_deposit: 0.0,
        }
    );
}

#[tokio::test]
async fn every_detail_fetch_counts_as_a_view() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;
    let item = env.sell_item(&seller, "Desk lamp", 300.0).await;

    for _ in 0..3 {
        env.state.items.get_by_id(item.item.id).await.unwrap();
    }
    let detail = env.state.items.get_by_id(item.item.id).await.unwrap();
    assert_eq!(detail.item.views, 4);

    // Detail fetches expose seller contact and college location.
    let seller_view = detail.seller.expect("seller");
    assert!(seller_view.mobile.is_some());
    assert_eq!(seller_view.email.as_deref(), Some("asha@campus.test"));
    assert_eq!(detail.college.expect("college").city.as_deref(), Some("Pune"));
}

#[tokio::test]
async fn hidden_item_detail_is_unavailable_and_unknown_is_not_found() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;
    let item = env.sell_item(&seller, "Kettle", 400.0).await;

    env.state
        .items
        .toggle_active(item.item.id, false, &seller.actor())
        .await
        .unwrap();
    let err = env.state.items.get_by_id(item.item.id).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));

    let err = env.state.items.get_by_id(uuid::Uuid::now_v7()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}

#[tokio::test]
async fn create_validates_required_fields_then_pricing() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;

    let missing_title = env
        .state
        .items
        .create(None, NewItem::default(), Vec::new())
        .await
        .unwrap_err();
    assert_eq!(missing_title, AppError::invalid("title", "is required"));

    let anonymous = NewItem {
        title: Some("Guitar".into()),
        category: Some("other".into()),
        listing_type: Some("sell".into()),
        price: Some("1000".into()),
        ..NewItem::default()
    };
    let err = env
        .state
        .items
        .create(None, anonymous.clone(), Vec::new())
        .await
        .unwrap_err();
    assert_eq!(err, AppError::AuthRequired);

    let negative = NewItem {
        price: Some("-5".into()),
        ..anonymous.clone()
    };
    let err = env
        .state
        .items
        .create(Some(&seller.actor()), negative, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError { ref field, .. } if field == "price"));

    let rent_without_unit = NewItem {
        listing_type: Some("rent".into()),
        rent_price: Some("20".into()),
        ..anonymous
    };
    let err = env
        .state
        .items
        .create(Some(&seller.actor()), rent_without_unit, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError { ref field, .. } if field == "rentUnit"));
}

#[tokio::test]
async fn create_rejects_a_sixth_image_and_stores_nothing() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;

    let input = NewItem {
        title: Some("Camera".into()),
        category: Some("electronics".into()),
        listing_type: Some("sell".into()),
        price: Some("5000".into()),
        ..NewItem::default()
    };
    let err = env
        .state
        .items
        .create(Some(&seller.actor()), input, (1..=6).map(png_upload).collect())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError { ref field, .. } if field == "images"));

    let stored = std::fs::read_dir(env.media_dir.path()).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn failed_uploads_are_dropped_and_update_truncates_to_five() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;

    let mut uploads: Vec<Upload> = (1..=4).map(png_upload).collect();
    uploads.insert(
        0,
        Upload {
            filename: Some("notes.txt".into()),
            content_type: "text/plain".into(),
            data: b"not an image".to_vec(),
        },
    );
    let input = NewItem {
        title: Some("Camera".into()),
        category: Some("electronics".into()),
        listing_type: Some("sell".into()),
        price: Some("5000".into()),
        ..NewItem::default()
    };
    let created = env
        .state
        .items
        .create(Some(&seller.actor()), input, uploads)
        .await
        .unwrap();

    // The text file fails to decode and is dropped; the four images survive.
    assert_eq!(created.item.image_urls.len(), 4);
    assert!(created
        .item
        .image_urls
        .iter()
        .all(|url| url.starts_with("/static/uploads/") && url.ends_with(".png")));
    assert_eq!(created.item.created_at, created.item.updated_at);

    let removed = created.item.image_urls[0].clone();
    let patch = ItemPatch {
        remove_images: vec![removed.clone()],
        ..ItemPatch::default()
    };
    let updated = env
        .state
        .items
        .update(
            created.item.id,
            patch,
            vec![png_upload(40), png_upload(41), png_upload(42)],
            &seller.actor(),
        )
        .await
        .unwrap();
    assert_eq!(updated.item.image_urls.len(), 5);
    assert!(!updated.item.image_urls.contains(&removed));
}

#[tokio::test]
async fn only_the_seller_or_an_admin_may_update_or_delete() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;
    let stranger = env.student("ravi", &college).await;
    let admin = env.admin(&college).await;
    let item = env.sell_item(&seller, "Mattress", 1500.0).await;

    let retitle = |title: &str| ItemPatch {
        title: Some(title.to_string()),
        ..ItemPatch::default()
    };
    let err = env
        .state
        .items
        .update(item.item.id, retitle("Mine now"), Vec::new(), &stranger.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let moderated = env
        .state
        .items
        .update(item.item.id, retitle("Mattress (moderated)"), Vec::new(), &admin.actor())
        .await
        .unwrap();
    assert_eq!(moderated.item.title, "Mattress (moderated)");

    let err = env
        .state
        .items
        .soft_delete(item.item.id, &stranger.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    env.state.items.soft_delete(item.item.id, &seller.actor()).await.unwrap();
    env.state.items.soft_delete(item.item.id, &seller.actor()).await.unwrap();
    let mine = env
        .state
        .items
        .my_items(&seller.actor(), None, Some("false"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert!(!mine[0].item.is_active);
}

#[tokio::test]
async fn toggle_active_is_reserved_for_the_seller() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;
    let admin = env.admin(&college).await;
    let item = env.sell_item(&seller, "Cooler", 2000.0).await;

    let err = env
        .state
        .items
        .toggle_active(item.item.id, false, &admin.actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    assert!(!env
        .state
        .items
        .admin_set_active(item.item.id, false)
        .await
        .unwrap());
    assert!(env
        .state
        .items
        .toggle_active(item.item.id, true, &seller.actor())
        .await
        .unwrap());
}

#[tokio::test]
async fn admin_listing_sees_everything_and_hard_delete_removes_the_row() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let seller = env.student("asha", &college).await;
    let hidden = env.sell_item(&seller, "Hidden", 1.0).await;
    let sold = env.sell_item(&seller, "Sold", 1.0).await;
    env.state.items.soft_delete(hidden.item.id, &seller.actor()).await.unwrap();
    env.state
        .items
        .update(
            sold.item.id,
            ItemPatch {
                status: Some("sold".into()),
                ..ItemPatch::default()
            },
            Vec::new(),
            &seller.actor(),
        )
        .await
        .unwrap();

    let all = env.state.items.admin_list(&AdminItemQuery::default()).await.unwrap();
    assert_eq!(all.total, 2);

    let only_hidden = env
        .state
        .items
        .admin_list(&AdminItemQuery {
            is_active: Some("false".into()),
            ..AdminItemQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(only_hidden.items.len(), 1);
    assert_eq!(only_hidden.items[0].item.id, hidden.item.id);

    let by_status = env
        .state
        .items
        .admin_list(&AdminItemQuery {
            status: Some("sold".into()),
            ..AdminItemQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(by_status.items[0].item.status, ItemStatus::Sold);

    env.state.items.admin_delete(sold.item.id).await.unwrap();
    let err = env.state.items.admin_delete(sold.item.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(..)));
}
