//! Property tests for the versioned conversion layer.
//!
//! Generated cluster payloads must survive decode/encode/decode unchanged in
//! every API version, and read-only fields sent by a caller must always be
//! replaced by the stored values.

use hcp_rp_frontend::convert::ApiVersions;
use hcp_rp_frontend::{ProvisioningState, ResourceId, ResourceType};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn cluster_id() -> ResourceId {
    ResourceId::provider_resource("sub", "rg", "hcpOpenShiftClusters", "prop")
}

fn state_strategy() -> impl Strategy<Value = ProvisioningState> {
    prop_oneof![
        Just(ProvisioningState::Pending),
        Just(ProvisioningState::Provisioning),
        Just(ProvisioningState::Updating),
        Just(ProvisioningState::Deleting),
        Just(ProvisioningState::Succeeded),
        Just(ProvisioningState::Failed),
        Just(ProvisioningState::Canceled),
    ]
}

prop_compose! {
    fn cluster_payload()(
        tags in prop::collection::btree_map("[a-z]{1,8}", "[a-z0-9]{0,8}", 0..4),
        channel_group in prop_oneof![Just("stable"), Just("fast"), Just("candidate")],
        host_prefix in 23i32..=26,
        drain in 0i32..=10080,
        private in any::<bool>(),
        prefix in "[a-z]{0,10}",
    ) -> Value {
        json!({
            "location": "eastus",
            "tags": tags,
            "properties": {
                "version": {"id": "4.18", "channelGroup": channel_group},
                "dns": {"baseDomainPrefix": prefix},
                "network": {"hostPrefix": host_prefix},
                "api": {"visibility": if private { "Private" } else { "Public" }},
                "platform": {"subnetId": "/subnets/a"},
                "nodeDrainTimeoutMinutes": drain
            }
        })
    }
}

proptest! {
    #[test]
    fn decode_encode_round_trip(payload in cluster_payload()) {
        let versions = ApiVersions::default();
        for name in versions.names() {
            let version = versions.get(name).unwrap();
            let id = cluster_id();
            let doc = version.decode(&id, ResourceType::Cluster, &payload, None).unwrap();
            let encoded = version.encode(&doc);
            let again = version.decode(&id, ResourceType::Cluster, &encoded, None).unwrap();
            prop_assert_eq!(&doc.properties, &again.properties);
            prop_assert_eq!(&doc.tags, &again.tags);
            prop_assert_eq!(&doc.location, &again.location);
        }
    }

    #[test]
    fn read_only_fields_come_from_stored_copy(
        stored in cluster_payload(),
        incoming in cluster_payload(),
        stored_state in state_strategy(),
        sent_state in state_strategy(),
        console_url in "https://[a-z]{1,12}\\.example\\.com",
    ) {
        let versions = ApiVersions::default();
        for name in versions.names() {
            let version = versions.get(name).unwrap();
            let mut doc = version
                .decode(&cluster_id(), ResourceType::Cluster, &stored, None)
                .unwrap();
            doc.provisioning_state = stored_state;
            let prior = version.encode(&doc);

            let mut request = incoming.clone();
            request["properties"]["provisioningState"] = json!(sent_state);
            request["properties"]["console"] = json!({"url": console_url.clone()});

            let merged = version
                .copy_read_only_fields(ResourceType::Cluster, Some(&prior), &request)
                .unwrap();
            prop_assert_eq!(
                &merged["properties"]["provisioningState"],
                &prior["properties"]["provisioningState"]
            );
            prop_assert_eq!(
                merged["properties"].get("console").and_then(|c| c.get("url")),
                prior["properties"].get("console").and_then(|c| c.get("url"))
            );
            // Caller-settable fields pass through untouched.
            let expected_tags: BTreeMap<String, String> =
                serde_json::from_value(incoming["tags"].clone()).unwrap();
            let merged_tags: BTreeMap<String, String> =
                serde_json::from_value(merged["tags"].clone()).unwrap();
            prop_assert_eq!(expected_tags, merged_tags);
        }
    }
}
