//! unitrade/crates/ut-core/src/lib.rs
//!
//! The central domain logic and interface definitions for UniTrade.

pub mod error;
pub mod models;
pub mod query;
pub mod services;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use query::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use uuid::Uuid;

    #[test]
    fn test_item_serializes_flat_pricing() {
        let id = Uuid::now_v7();
        let item = Item {
            id,
            title: "Engineering Mechanics".to_string(),
            description: None,
            category: Category::Books,
            condition: Condition::LikeNew,
            pricing: Pricing::Rent {
                rent_price: 50.0,
                rent_unit: RentUnit::Week,
                security_deposit: 200.0,
            },
            image_urls: vec![],
            seller_id: Uuid::now_v7(),
            college_id: Uuid::now_v7(),
            is_active: true,
            status: ItemStatus::Available,
            views: 0,
            tags: vec!["mechanics".to_string()],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["listingType"], "rent");
        assert_eq!(json["rentUnit"], "week");
        assert_eq!(json["condition"], "like_new");
        assert!(json.get("price").is_none());

        let back: Item = serde_json::from_value(json).unwrap();
        assert_eq!(back.pricing, item.pricing);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username: "asha".into(),
            name: "Asha".into(),
            email: "asha@iitb.ac.in".into(),
            mobile: "9000000001".into(),
            role: Role::default(),
            password_hash: "$argon2id$secret".into(),
            avatar_url: None,
            permanent_college_id: Uuid::now_v7(),
            current_college_id: None,
            is_blocked: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let text = serde_json::to_string(&user).unwrap();
        assert!(!text.contains("argon2"));
        assert!(text.contains("\"role\":\"student\""));
    }
}
