//! Listing endpoints over HTTP: multipart creation, the gatekeeping order
//! for anonymous posts, visibility and moderation.

use actix_web::http::StatusCode;
use actix_web::test;
use integration_tests::{multipart, png, Part, TestEnv};
use serde_json::{json, Value};

#[actix_web::test]
async fn multipart_listing_stores_images_under_the_public_prefix() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let asha = env.student("asha", &college).await;
    let app = test::init_service(env.app()).await;

    let (content_type, body) = multipart(vec![
        Part::Text("title", "Casio fx-991EX"),
        Part::Text("category", "electronics"),
        Part::Text("listingType", "rent"),
        Part::Text("rentPrice", "40"),
        Part::Text("rentUnit", "week"),
        Part::Text("tags", "Calculator, exams"),
        Part::File {
            name: "images",
            filename: "front.png",
            content_type: "image/png",
            data: png(10),
        },
        Part::File {
            name: "images",
            filename: "notes.txt",
            content_type: "text/plain",
            data: b"not an image".to_vec(),
        },
    ]);
    let req = test::TestRequest::post()
        .uri("/api/item/add")
        .insert_header(asha.bearer())
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let item = &body["item"];
    assert_eq!(body["message"], "Item listed successfully");
    assert_eq!(item["listingType"], "rent");
    assert_eq!(item["rentUnit"], "week");
    assert_eq!(item["securityDeposit"], 0.0);
    assert_eq!(item["tags"], json!(["Calculator", "exams"]));
    assert_eq!(item["college"]["code"], "IITB");

    let urls = item["imageUrls"].as_array().expect("imageUrls");
    assert_eq!(urls.len(), 1);
    assert!(urls[0].as_str().unwrap().starts_with("/static/uploads/"));
}

#[actix_web::test]
async fn listing_form_rejects_a_sixth_image_and_unknown_file_fields() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let asha = env.student("asha", &college).await;
    let app = test::init_service(env.app()).await;

    let fields = || {
        vec![
            Part::Text("title", "Desk lamp"),
            Part::Text("category", "electronics"),
            Part::Text("listingType", "sell"),
            Part::Text("price", "300"),
        ]
    };

    let mut parts = fields();
    parts.extend((1..=6).map(|shade| Part::File {
        name: "images",
        filename: "lamp.png",
        content_type: "image/png",
        data: png(shade),
    }));
    let (content_type, body) = multipart(parts);
    let req = test::TestRequest::post()
        .uri("/api/item/add")
        .insert_header(asha.bearer())
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["field"], "images");

    let mut parts = fields();
    parts.push(Part::File {
        name: "resume",
        filename: "cv.png",
        content_type: "image/png",
        data: png(7),
    });
    let (content_type, body) = multipart(parts);
    let req = test::TestRequest::post()
        .uri("/api/item/add")
        .insert_header(asha.bearer())
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "resume");

    assert_eq!(std::fs::read_dir(env.media_dir.path()).unwrap().count(), 0);
}

#[actix_web::test]
async fn anonymous_posts_fail_on_fields_before_auth() {
    let env = TestEnv::new().await;
    let app = test::init_service(env.app()).await;

    let (content_type, body) = multipart(vec![Part::Text("category", "books")]);
    let req = test::TestRequest::post()
        .uri("/api/item/add")
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "title");

    let (content_type, body) = multipart(vec![
        Part::Text("title", "Drafter"),
        Part::Text("category", "stationery"),
        Part::Text("listingType", "sell"),
        Part::Text("price", "150"),
    ]);
    let req = test::TestRequest::post()
        .uri("/api/item/add")
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_path_ids_are_validation_errors() {
    let env = TestEnv::new().await;
    let app = test::init_service(env.app()).await;

    let req = test::TestRequest::get().uri("/api/item/get/not-a-uuid").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["field"], "id");
}

#[actix_web::test]
async fn feed_filters_arrive_through_the_query_string() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let asha = env.student("asha", &college).await;
    env.sell_item(&asha, "Thermodynamics textbook", 300.0).await;
    env.rent_item(&asha, "Arduino kit", 80.0, "week").await;
    let app = test::init_service(env.app()).await;

    let uri = format!("/api/item/list?college={}&listingType=rent&limit=abc", college.id);
    let req = test::TestRequest::get().uri(&uri).to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 20);
    assert_eq!(body["items"][0]["title"], "Arduino kit");
    assert!(body["items"][0]["seller"].get("mobile").map_or(true, Value::is_null));

    let req = test::TestRequest::get()
        .uri("/api/item/list?category=spaceships")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "category");
}

#[actix_web::test]
async fn sellers_hide_their_listings_and_others_cannot() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let asha = env.student("asha", &college).await;
    let ravi = env.student("ravi", &college).await;
    let listing = env.sell_item(&asha, "Lab coat", 200.0).await;
    let app = test::init_service(env.app()).await;
    let toggle_uri = format!("/api/item/toggle-active/{}", listing.item.id);

    let req = test::TestRequest::patch()
        .uri(&toggle_uri)
        .insert_header(ravi.bearer())
        .set_json(json!({ "isActive": false }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::patch()
        .uri(&toggle_uri)
        .insert_header(asha.bearer())
        .set_json(json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "isActive");

    let req = test::TestRequest::patch()
        .uri(&toggle_uri)
        .insert_header(asha.bearer())
        .set_json(json!({ "isActive": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["isActive"], false);
    assert_eq!(body["message"], "Item is now hidden");

    let req = test::TestRequest::get()
        .uri(&format!("/api/item/get/{}", listing.item.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/item/my-items?isActive=false")
        .insert_header(asha.bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn update_edits_only_the_existing_pricing_branch() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let asha = env.student("asha", &college).await;
    let listing = env.sell_item(&asha, "Drawing board", 500.0).await;
    let app = test::init_service(env.app()).await;

    let (content_type, body) = multipart(vec![
        Part::Text("price", "450"),
        Part::Text("rentPrice", "20"),
        Part::Text("status", "sold"),
    ]);
    let req = test::TestRequest::put()
        .uri(&format!("/api/item/update/{}", listing.item.id))
        .insert_header(asha.bearer())
        .insert_header(("Content-Type", content_type))
        .set_payload(body)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Item updated successfully");
    assert_eq!(body["item"]["price"], 450.0);
    assert!(body["item"].get("rentPrice").is_none());
    assert_eq!(body["item"]["status"], "sold");
}

#[actix_web::test]
async fn moderation_endpoints_see_and_remove_everything() {
    let env = TestEnv::new().await;
    let college = env.college("IITB").await;
    let admin = env.admin(&college).await;
    let asha = env.student("asha", &college).await;
    let visible = env.sell_item(&asha, "Cycle", 2500.0).await;
    let hidden = env.sell_item(&asha, "Helmet", 600.0).await;
    let app = test::init_service(env.app()).await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/item/admin/toggle-active/{}", hidden.item.id))
        .insert_header(admin.bearer())
        .set_json(json!({ "isActive": false }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["isActive"], false);

    let req = test::TestRequest::get()
        .uri("/api/item/admin/list")
        .insert_header(asha.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/item/admin/list?isActive=false")
        .insert_header(admin.bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], hidden.item.id.to_string());

    let remove_uri = format!("/api/item/admin/remove/{}", visible.item.id);
    let req = test::TestRequest::delete()
        .uri(&remove_uri)
        .insert_header(admin.bearer())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["message"], "Item permanently removed");

    let req = test::TestRequest::delete()
        .uri(&remove_uri)
        .insert_header(admin.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
}
