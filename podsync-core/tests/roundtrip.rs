//! Wire roundtrip tests for `podsync-core` types.
//!
//! Encoding then decoding through the JSON wire format must yield an
//! identical SpecList, including nested details/services/containers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use podsync_core::types::{
    RemoteContainer, Service, ServiceList, Spec, SpecDetails, SpecList, Status, STATUS_SYNCING,
};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn empty_list() -> SpecList {
    SpecList::default()
}

fn single_entry_list() -> SpecList {
    let details = SpecDetails {
        name: "web".to_owned(),
        container_name: String::new(),
        pod_name: String::new(),
        selector: String::new(),
        namespace: "default".to_owned(),
        local_path: PathBuf::from("/src"),
        remote_path: PathBuf::from("/app"),
        reload: false,
        local_read_only: false,
        remote_read_only: false,
    };
    let mut items = BTreeMap::new();
    items.insert("web".to_owned(), Spec::new(details));
    SpecList { items }
}

fn full_list() -> SpecList {
    let details = SpecDetails {
        name: "api".to_owned(),
        container_name: "api".to_owned(),
        pod_name: "api-6d4f".to_owned(),
        selector: "app=api".to_owned(),
        namespace: "staging".to_owned(),
        local_path: PathBuf::from("/home/dev/api"),
        remote_path: PathBuf::from("/srv/api"),
        reload: true,
        local_read_only: false,
        remote_read_only: true,
    };
    let spec = Spec {
        details,
        services: ServiceList {
            items: vec![Service {
                spec_key: "api".to_owned(),
                remote_container: RemoteContainer {
                    id: "docker://0ab4".to_owned(),
                    container_name: "api".to_owned(),
                    node_name: "node-1".to_owned(),
                    pod_name: "api-6d4f".to_owned(),
                },
                status: Status::from(STATUS_SYNCING),
            }],
        },
        status: Status::from(STATUS_SYNCING),
    };
    let mut items = BTreeMap::new();
    items.insert("api".to_owned(), spec);
    SpecList { items }
}

fn unicode_list() -> SpecList {
    let details = SpecDetails {
        name: "веб-служба-项目".to_owned(),
        container_name: "nginx".to_owned(),
        pod_name: "веб-0".to_owned(),
        selector: "app=веб".to_owned(),
        namespace: "default".to_owned(),
        local_path: PathBuf::from("/code/アプリ"),
        remote_path: PathBuf::from("/srv/アプリ"),
        reload: false,
        local_read_only: true,
        remote_read_only: false,
    };
    let mut spec = Spec::new(details);
    spec.status = Status::from("ожидание синхронизации");
    let mut items = BTreeMap::new();
    items.insert("веб".to_owned(), spec);
    SpecList { items }
}

// ---------------------------------------------------------------------------
// Cases
// ---------------------------------------------------------------------------

#[rstest]
#[case::empty(empty_list())]
#[case::single(single_entry_list())]
#[case::full(full_list())]
#[case::unicode(unicode_list())]
fn spec_list_roundtrip(#[case] list: SpecList) {
    let json = serde_json::to_string(&list).expect("serialize");
    let decoded: SpecList = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(list, decoded);
}

#[rstest]
#[case::vocab(STATUS_SYNCING)]
#[case::free_text("waiting on operator approval")]
#[case::empty("")]
fn status_roundtrip_preserves_text(#[case] text: &str) {
    let status = Status::from(text);
    let json = serde_json::to_string(&status).expect("serialize");
    let decoded: Status = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded.0, text);
}

#[test]
fn missing_services_field_defaults_to_empty() {
    // Older peers may omit `services`; decoding must not fail.
    let json = r#"{
        "details": {
            "name": "web", "container_name": "", "pod_name": "",
            "selector": "", "namespace": "default",
            "local_path": "/src", "remote_path": "/app",
            "reload": false, "local_read_only": false, "remote_read_only": false
        },
        "status": "init"
    }"#;
    let spec: Spec = serde_json::from_str(json).expect("deserialize");
    assert!(spec.services.items.is_empty());
}
