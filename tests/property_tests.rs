//! Property-based tests for entity mapping and pagination.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::sync::Arc;

use proptest::prelude::*;

use model_registry::core::value::{Properties, PropertyValue};
use model_registry::registry::mapping::{from_primitive, to_primitive};
use model_registry::registry::{
    ArtifactKind, ArtifactState, ListOptions, ModelArtifact, ModelRegistry, ModelVersion,
    ModelVersionState, RegisteredModel, RegisteredModelState,
};
use model_registry::store::mock::MockStore;
use model_registry::{NodeId, TypeId};

/// Strategy for property values the store can hold exactly.
fn property_value() -> impl Strategy<Value = PropertyValue> {
    prop_oneof![
        any::<i64>().prop_map(PropertyValue::Int),
        // Finite doubles only; NaN never compares equal to itself
        (-1.0e12f64..1.0e12).prop_map(PropertyValue::Double),
        ".{0,24}".prop_map(PropertyValue::String),
        prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 0..4).prop_map(|m| {
            PropertyValue::Struct(
                m.into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            )
        }),
    ]
}

fn custom_properties() -> impl Strategy<Value = Properties> {
    prop::collection::btree_map("[a-z_]{1,12}", property_value(), 0..6)
}

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(".{0,32}")
}

fn timestamps() -> impl Strategy<Value = (Option<i64>, Option<i64>)> {
    (
        prop::option::of(0i64..4_000_000_000_000),
        prop::option::of(0i64..4_000_000_000_000),
    )
}

prop_compose! {
    fn registered_model()(
        id in prop::option::of(1u64..1_000_000),
        name in "[a-zA-Z0-9._-]{1,40}",
        description in optional_text(),
        owner in optional_text(),
        state in prop::option::of(prop::sample::select(RegisteredModelState::all().to_vec())),
        custom_properties in custom_properties(),
        (created, updated) in timestamps(),
    ) -> RegisteredModel {
        RegisteredModel {
            id: id.map(NodeId::new),
            name,
            description,
            owner,
            state,
            custom_properties,
            create_time_since_epoch: created,
            last_update_time_since_epoch: updated,
        }
    }
}

prop_compose! {
    fn model_version()(
        parent in 1u64..1_000_000,
        name in "[a-zA-Z0-9._-]{1,40}",
        description in optional_text(),
        author in optional_text(),
        state in prop::option::of(prop::sample::select(ModelVersionState::all().to_vec())),
        custom_properties in custom_properties(),
    ) -> ModelVersion {
        let mut version = ModelVersion::new(NodeId::new(parent), name);
        version.description = description;
        version.author = author;
        version.state = state;
        version.custom_properties = custom_properties;
        version
    }
}

prop_compose! {
    fn model_artifact()(
        version in 1u64..1_000_000,
        name in "[a-zA-Z0-9._-]{1,40}",
        uri in optional_text(),
        kind in prop::sample::select(ArtifactKind::all().to_vec()),
        state in prop::option::of(prop::sample::select(ArtifactState::all().to_vec())),
        format in prop::option::of(("[a-z]{1,8}", "[0-9.]{1,5}")),
        storage_key in optional_text(),
        storage_path in optional_text(),
        service_account_name in optional_text(),
        external_id in optional_text(),
        custom_properties in custom_properties(),
    ) -> ModelArtifact {
        let mut artifact = ModelArtifact::new(NodeId::new(version), name).with_kind(kind);
        artifact.uri = uri;
        artifact.state = state;
        if let Some((format_name, format_version)) = format {
            artifact = artifact.with_model_format(format_name, format_version);
        }
        artifact.storage_key = storage_key;
        artifact.storage_path = storage_path;
        artifact.service_account_name = service_account_name;
        artifact.external_id = external_id;
        artifact.custom_properties = custom_properties;
        artifact
    }
}

proptest! {
    /// Any registered model survives conversion to a node and back.
    #[test]
    fn registered_model_round_trip(model in registered_model()) {
        let node = to_primitive(&model, TypeId::new(1));
        let back: RegisteredModel = from_primitive(&node, TypeId::new(1)).unwrap();
        prop_assert_eq!(back, model);
    }

    /// Any version with a resolved parent survives conversion.
    #[test]
    fn model_version_round_trip(version in model_version()) {
        let node = to_primitive(&version, TypeId::new(2));
        prop_assert_eq!(node.scope, version.parent.as_id());
        let back: ModelVersion = from_primitive(&node, TypeId::new(2)).unwrap();
        prop_assert_eq!(back, version);
    }

    /// Any artifact survives conversion.
    #[test]
    fn model_artifact_round_trip(artifact in model_artifact()) {
        let node = to_primitive(&artifact, TypeId::new(3));
        let back: ModelArtifact = from_primitive(&node, TypeId::new(3)).unwrap();
        prop_assert_eq!(back, artifact);
    }

    /// Mapped fields never leak into custom properties and vice versa.
    #[test]
    fn custom_properties_stay_custom(model in registered_model()) {
        let node = to_primitive(&model, TypeId::new(1));
        prop_assert_eq!(&node.custom_properties, &model.custom_properties);
        prop_assert!(node.properties.keys().all(|k| ["description", "owner", "state"].contains(&k.as_str())));
    }

    /// u64 conversion succeeds exactly when the value fits in an i64.
    #[test]
    fn u64_conversion_is_exact(v in any::<u64>()) {
        let converted = PropertyValue::try_from(v);
        if v <= i64::MAX as u64 {
            prop_assert_eq!(converted, Ok(PropertyValue::Int(v as i64)));
        } else {
            prop_assert!(converted.is_err());
        }
    }
}

/// Register `count` models and list them back with page size `page_size`.
fn list_all(count: usize, page_size: usize) -> (Vec<String>, Vec<String>, usize) {
    tokio_test::block_on(async {
        let store = MockStore::new();
        let registry = ModelRegistry::new(Arc::new(store.clone()));

        let mut expected = Vec::new();
        for i in 0..count {
            let name = format!("model-{:03}", i);
            registry
                .register_model(&RegisteredModel::new(name.clone()))
                .await
                .unwrap();
            expected.push(name);
        }
        store.clear_operations();

        let listed = registry
            .list_models(ListOptions::default().page_size(page_size))
            .collect_all()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        (expected, listed, store.count("list_nodes"))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every entity is yielded exactly once for page sizes around N.
    #[test]
    fn pagination_is_complete(count in 1usize..30, offset in 0usize..4) {
        // Page sizes 1, N-1, N and N+1
        let page_size = match offset {
            0 => 1,
            1 => count.saturating_sub(1).max(1),
            2 => count,
            _ => count + 1,
        };

        let (expected, listed, calls) = list_all(count, page_size);
        prop_assert_eq!(listed, expected);
        prop_assert_eq!(calls, count.div_ceil(page_size));
    }
}

#[test]
fn empty_listing_makes_one_call() {
    let (expected, listed, calls) = list_all(0, 10);
    assert!(expected.is_empty());
    assert!(listed.is_empty());
    assert_eq!(calls, 1);
}
