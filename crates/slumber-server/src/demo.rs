//! Sample models served by the `slumber-server` binary.

use crate::SlumberApp;
use chrono::{TimeZone, Utc};
use slumber_config::AppConfig;
use slumber_core::{FieldMeta, FieldType, ModelSchema, ModelType, Record};
use slumber_rest::controllers::{InMemoryModelStore, InMemoryPermissionSource, UserPermissions};
use std::sync::Arc;

pub fn shop() -> ModelType {
    ModelType::new("slumber_test", "Shop")
}

pub fn pizza() -> ModelType {
    ModelType::new("slumber_test", "Pizza")
}

pub fn user() -> ModelType {
    ModelType::new("django.contrib.auth", "User")
}

/// An application serving a pizza shop and its users.
#[must_use]
pub fn demo_app(config: AppConfig) -> SlumberApp {
    let tonys = Arc::new(
        Record::new(shop(), 1i64, "Tony's")
            .with("name", "Tony's")
            .with("active", true),
    );
    let shops = InMemoryModelStore::new();
    shops.insert(tonys.clone());

    let pizzas = InMemoryModelStore::new()
        .with(
            Record::new(pizza(), 1i64, "Margherita")
                .with("name", "Margherita")
                .with("for_sale", true)
                .with("max_extra_toppings", 3i64)
                .with_object("exclusive_to", tonys),
        )
        .with(
            Record::new(pizza(), 2i64, "Hawaiian")
                .with("name", "Hawaiian")
                .with("for_sale", false)
                .with("max_extra_toppings", Option::<i64>::None)
                .with("exclusive_to", Option::<i64>::None),
        );

    let joined = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single();
    let users = InMemoryModelStore::new()
        .with(demo_user(1, "admin", true, joined))
        .with(demo_user(2, "testuser", false, joined));

    let permissions = InMemoryPermissionSource::new();
    permissions.insert(
        "admin",
        UserPermissions {
            is_superuser: true,
            ..UserPermissions::active()
        },
    );
    permissions.insert(
        "testuser",
        UserPermissions::active()
            .with_permission("slumber_test.add_pizza")
            .with_group_permission("slumber_test.change_pizza"),
    );

    SlumberApp::new(config)
        .expose(shop_schema(), Arc::new(shops))
        .expose(pizza_schema(), Arc::new(pizzas))
        .expose_with_permissions(user_schema(), Arc::new(users), Arc::new(permissions))
}

fn demo_user(pk: i64, username: &str, superuser: bool, joined: Option<chrono::DateTime<Utc>>) -> Record {
    Record::new(user(), pk, username)
        .with("username", username)
        .with("is_active", true)
        .with("is_staff", superuser)
        .with("is_superuser", superuser)
        .with("first_name", "")
        .with("last_name", "")
        .with("email", format!("{username}@example.com"))
        .with("date_joined", joined)
}

fn shop_schema() -> ModelSchema {
    ModelSchema::new(shop())
        .field("id", FieldMeta::value(FieldType::AutoField))
        .field("name", FieldMeta::value(FieldType::char_field()))
        .field("active", FieldMeta::value(FieldType::BooleanField))
}

fn pizza_schema() -> ModelSchema {
    ModelSchema::new(pizza())
        .field("id", FieldMeta::value(FieldType::AutoField))
        .field("name", FieldMeta::value(FieldType::char_field()))
        .field("for_sale", FieldMeta::value(FieldType::BooleanField))
        .field(
            "max_extra_toppings",
            FieldMeta::value(FieldType::from_qualified_name(
                "django.db.models.fields.IntegerField",
            )),
        )
        .field("exclusive_to", FieldMeta::object(FieldType::ForeignKey))
}

fn user_schema() -> ModelSchema {
    ModelSchema::new(user())
        .field("id", FieldMeta::value(FieldType::AutoField))
        .field("username", FieldMeta::value(FieldType::char_field()))
        .field("is_active", FieldMeta::value(FieldType::BooleanField))
        .field("is_staff", FieldMeta::value(FieldType::BooleanField))
        .field("is_superuser", FieldMeta::value(FieldType::BooleanField))
        .field("first_name", FieldMeta::value(FieldType::char_field()))
        .field("last_name", FieldMeta::value(FieldType::char_field()))
        .field("email", FieldMeta::value(FieldType::char_field()))
        .field("date_joined", FieldMeta::value(FieldType::date_time_field()))
}
